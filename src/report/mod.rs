//! Reporting: probability → risk category, and terminal formatting.

pub mod format;

pub use format::*;

use serde::Serialize;

/// Ordinal category shown to the clinician.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
pub enum RiskCategory {
    #[serde(rename = "none/insufficient")]
    NoneOrInsufficient,
    #[serde(rename = "possible")]
    Possible,
    #[serde(rename = "probable")]
    Probable,
    #[serde(rename = "certain")]
    Certain,
}

#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
pub enum CategoryError {
    #[error("probability {0} is outside [0, 1]")]
    OutOfRange(f64),
    #[error("probability is NaN")]
    NotANumber,
}

impl RiskCategory {
    /// Map a probability to its category. Thresholds are inclusive-low:
    /// `0.25` is already "possible".
    pub fn from_probability(p: f64) -> Result<Self, CategoryError> {
        if p.is_nan() {
            return Err(CategoryError::NotANumber);
        }
        if !(0.0..=1.0).contains(&p) {
            return Err(CategoryError::OutOfRange(p));
        }
        Ok(if p < 0.25 {
            RiskCategory::NoneOrInsufficient
        } else if p < 0.50 {
            RiskCategory::Possible
        } else if p < 0.75 {
            RiskCategory::Probable
        } else {
            RiskCategory::Certain
        })
    }

    pub fn as_str(self) -> &'static str {
        match self {
            RiskCategory::NoneOrInsufficient => "none/insufficient",
            RiskCategory::Possible => "possible",
            RiskCategory::Probable => "probable",
            RiskCategory::Certain => "certain",
        }
    }

    /// Label used in the clinician-facing French interface.
    pub fn display_fr(self) -> &'static str {
        match self {
            RiskCategory::NoneOrInsufficient => "Pas de Lyme ou informations insuffisantes",
            RiskCategory::Possible => "Lyme possible",
            RiskCategory::Probable => "Lyme probable",
            RiskCategory::Certain => "Lyme sûr",
        }
    }
}

impl std::fmt::Display for RiskCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cat(p: f64) -> &'static str {
        RiskCategory::from_probability(p).unwrap().as_str()
    }

    #[test]
    fn thresholds_are_inclusive_low() {
        assert_eq!(cat(0.0), "none/insufficient");
        assert_eq!(cat(0.24999), "none/insufficient");
        assert_eq!(cat(0.25), "possible");
        assert_eq!(cat(0.4999), "possible");
        assert_eq!(cat(0.5), "probable");
        assert_eq!(cat(0.7499), "probable");
        assert_eq!(cat(0.75), "certain");
        assert_eq!(cat(1.0), "certain");
    }

    #[test]
    fn invalid_probabilities_are_rejected_not_clamped() {
        assert_eq!(RiskCategory::from_probability(f64::NAN), Err(CategoryError::NotANumber));
        assert_eq!(
            RiskCategory::from_probability(1.2),
            Err(CategoryError::OutOfRange(1.2))
        );
        assert_eq!(
            RiskCategory::from_probability(-0.1),
            Err(CategoryError::OutOfRange(-0.1))
        );
    }

    #[test]
    fn categories_are_ordered() {
        assert!(RiskCategory::Possible < RiskCategory::Certain);
        assert_eq!(
            serde_json::to_value(RiskCategory::NoneOrInsufficient).unwrap(),
            "none/insufficient"
        );
    }
}
