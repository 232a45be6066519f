//! Consistency checks between the schema registry and its collaborators.
//!
//! These run before any prediction: a registry that drifted from the model
//! (or from the reference dataset the model was trained on) is a maintenance
//! problem, not something a single request can recover from.

use std::collections::BTreeSet;

use crate::schema::SchemaRegistry;

/// Reference dataset columns that are targets, not features.
pub const REFERENCE_IGNORED: &[&str] = &["target", "y", "label"];

/// Registry vs model comparison.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContractReport {
    /// In the registry but not expected by the model.
    pub missing_in_model: Vec<String>,
    /// Expected by the model but absent from the registry.
    pub extra_in_model: Vec<String>,
    /// Same feature sets, different positions.
    pub order_mismatch: bool,
    /// Features whose categorical flag differs between registry and model.
    pub categorical_mismatch: Vec<String>,
}

impl ContractReport {
    pub fn is_clean(&self) -> bool {
        self.missing_in_model.is_empty()
            && self.extra_in_model.is_empty()
            && !self.order_mismatch
            && self.categorical_mismatch.is_empty()
    }

    pub fn summary(&self) -> String {
        if self.is_clean() {
            return "registry and model agree".to_string();
        }
        let mut parts = Vec::new();
        if !self.missing_in_model.is_empty() {
            parts.push(format!("not in model: {}", self.missing_in_model.join(", ")));
        }
        if !self.extra_in_model.is_empty() {
            parts.push(format!("only in model: {}", self.extra_in_model.join(", ")));
        }
        if self.order_mismatch {
            parts.push("feature order differs".to_string());
        }
        if !self.categorical_mismatch.is_empty() {
            parts.push(format!(
                "categorical flag differs: {}",
                self.categorical_mismatch.join(", ")
            ));
        }
        parts.join("; ")
    }
}

/// Compare the registry with the model's declared inputs.
pub fn check(
    registry: &SchemaRegistry,
    model_features: &[String],
    model_cat_indices: &[usize],
) -> ContractReport {
    let reg: BTreeSet<&str> = registry.feature_names().iter().map(String::as_str).collect();
    let model: BTreeSet<&str> = model_features.iter().map(String::as_str).collect();

    let missing_in_model: Vec<String> = reg.difference(&model).map(|s| s.to_string()).collect();
    let extra_in_model: Vec<String> = model.difference(&reg).map(|s| s.to_string()).collect();

    let order_mismatch = missing_in_model.is_empty()
        && extra_in_model.is_empty()
        && registry.feature_names() != model_features;

    let model_cat: BTreeSet<&str> = model_cat_indices
        .iter()
        .filter_map(|&i| model_features.get(i))
        .map(String::as_str)
        .collect();
    let categorical_mismatch = model_features
        .iter()
        .filter(|f| registry.contains(f))
        .filter(|f| registry.is_categorical(f) != model_cat.contains(f.as_str()))
        .cloned()
        .collect();

    ContractReport {
        missing_in_model,
        extra_in_model,
        order_mismatch,
        categorical_mismatch,
    }
}

/// Registry vs reference dataset header.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReferenceReport {
    /// Reference columns the registry does not know.
    pub missing_in_registry: Vec<String>,
    /// Registry features the reference dataset does not have.
    pub extra_in_registry: Vec<String>,
}

impl ReferenceReport {
    pub fn is_clean(&self) -> bool {
        self.missing_in_registry.is_empty() && self.extra_in_registry.is_empty()
    }
}

pub fn check_reference(registry: &SchemaRegistry, columns: &[String]) -> ReferenceReport {
    let reference: BTreeSet<&str> = columns
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty() && !REFERENCE_IGNORED.contains(c))
        .collect();
    let reg: BTreeSet<&str> = registry.feature_names().iter().map(String::as_str).collect();

    ReferenceReport {
        missing_in_registry: reference.difference(&reg).map(|s| s.to_string()).collect(),
        extra_in_registry: reg.difference(&reference).map(|s| s.to_string()).collect(),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;

    fn registry() -> SchemaRegistry {
        let mut levels = BTreeMap::new();
        levels.insert("Sexe".to_string(), vec!["Jument".to_string()]);
        SchemaRegistry::from_parts(
            vec!["Age".into(), "Sexe".into(), "Boiterie".into()],
            vec!["Sexe".into()],
            levels,
            BTreeMap::new(),
            None,
            vec![],
        )
        .unwrap()
    }

    fn names(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn identical_contract_is_clean() {
        let report = check(&registry(), &names(&["Age", "Sexe", "Boiterie"]), &[1]);
        assert!(report.is_clean(), "{}", report.summary());
    }

    #[test]
    fn detects_missing_and_extra_features() {
        let report = check(&registry(), &names(&["Age", "Sexe", "Uveite"]), &[1]);
        assert_eq!(report.missing_in_model, vec!["Boiterie".to_string()]);
        assert_eq!(report.extra_in_model, vec!["Uveite".to_string()]);
        assert!(!report.order_mismatch);
        assert!(!report.is_clean());
    }

    #[test]
    fn detects_order_and_categorical_drift() {
        let report = check(&registry(), &names(&["Sexe", "Age", "Boiterie"]), &[0, 1]);
        assert!(report.order_mismatch);
        assert_eq!(report.categorical_mismatch, vec!["Age".to_string()]);
    }

    #[test]
    fn reference_header_ignores_target_columns() {
        let report = check_reference(&registry(), &names(&["Age", "Sexe", "Boiterie", "target"]));
        assert!(report.is_clean());

        let report = check_reference(&registry(), &names(&["Age", "Sexe", "Myosis"]));
        assert_eq!(report.missing_in_registry, vec!["Myosis".to_string()]);
        assert_eq!(report.extra_in_registry, vec!["Boiterie".to_string()]);
    }
}
