//! Symmetric (oblivious) decision-tree ensemble evaluation.
//!
//! Every tree applies the same split at each depth, so a leaf index is just
//! the bit pattern of split outcomes: bit `i` is set when split `i` holds.
//!
//! Split semantics:
//! - numeric `{feature, border}`: holds when `value > border`; a missing value
//!   never holds (it sorts below every border)
//! - categorical `{feature, category}`: holds on exact token equality

use std::fs;
use std::path::Path;

use serde::Deserialize;
use tracing::info;

use crate::domain::Coerced;
use crate::models::ModelError;

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Split {
    Numeric { feature: usize, border: f64 },
    Categorical { feature: usize, category: String },
}

impl Split {
    pub fn feature(&self) -> usize {
        match self {
            Split::Numeric { feature, .. } | Split::Categorical { feature, .. } => *feature,
        }
    }

    fn holds(&self, value: &Coerced) -> bool {
        match (self, value) {
            (Split::Numeric { border, .. }, Coerced::Number(v)) => v > border,
            (Split::Categorical { category, .. }, Coerced::Token(t)) => t == category,
            _ => false,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct ObliviousTree {
    pub splits: Vec<Split>,
    pub leaf_values: Vec<f64>,
}

impl ObliviousTree {
    fn leaf_index(&self, row: &[Coerced]) -> usize {
        self.splits
            .iter()
            .enumerate()
            .filter(|(_, s)| s.holds(&row[s.feature()]))
            .fold(0usize, |acc, (i, _)| acc | (1 << i))
    }
}

/// The on-disk model artifact.
#[derive(Debug, Clone, Deserialize)]
pub struct ObliviousForest {
    pub feature_names: Vec<String>,
    #[serde(default)]
    pub cat_feature_indices: Vec<usize>,
    #[serde(default)]
    pub bias: f64,
    #[serde(default = "default_scale")]
    pub scale: f64,
    pub trees: Vec<ObliviousTree>,
}

fn default_scale() -> f64 {
    1.0
}

/// Deepest tree accepted; `2^depth` leaves must fit comfortably in memory.
const MAX_DEPTH: usize = 16;

impl ObliviousForest {
    /// Load a model artifact. The file must exist, be non-empty and be
    /// internally consistent.
    pub fn load(path: &Path) -> Result<Self, ModelError> {
        let meta = fs::metadata(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        if meta.len() == 0 {
            return Err(ModelError::Empty(path.display().to_string()));
        }
        let raw = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let forest = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            trees = forest.trees.len(),
            features = forest.feature_names.len(),
            "loaded classifier artifact"
        );
        Ok(forest)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, ModelError> {
        let forest: Self = serde_json::from_str(raw)?;
        forest.validate()?;
        Ok(forest)
    }

    fn validate(&self) -> Result<(), ModelError> {
        let n = self.feature_names.len();
        if let Some(&i) = self.cat_feature_indices.iter().find(|&&i| i >= n) {
            return Err(ModelError::Invalid(format!(
                "categorical index {i} out of range for {n} features"
            )));
        }
        if !self.bias.is_finite() || !self.scale.is_finite() {
            return Err(ModelError::Invalid("non-finite bias or scale".to_string()));
        }
        for (t, tree) in self.trees.iter().enumerate() {
            let depth = tree.splits.len();
            if depth > MAX_DEPTH {
                return Err(ModelError::Invalid(format!("tree {t} is deeper than {MAX_DEPTH}")));
            }
            if tree.leaf_values.len() != 1 << depth {
                return Err(ModelError::Invalid(format!(
                    "tree {t} has {} leaves, expected {}",
                    tree.leaf_values.len(),
                    1usize << depth
                )));
            }
            if tree.leaf_values.iter().any(|v| !v.is_finite()) {
                return Err(ModelError::Invalid(format!("tree {t} has a non-finite leaf")));
            }
            for split in &tree.splits {
                let f = split.feature();
                if f >= n {
                    return Err(ModelError::Invalid(format!(
                        "tree {t} splits on feature {f}, only {n} declared"
                    )));
                }
                let is_cat = self.cat_feature_indices.contains(&f);
                let cat_split = matches!(split, Split::Categorical { .. });
                if is_cat != cat_split {
                    return Err(ModelError::Invalid(format!(
                        "tree {t} uses a {} split on {} feature '{}'",
                        if cat_split { "categorical" } else { "numeric" },
                        if is_cat { "categorical" } else { "numeric" },
                        self.feature_names[f]
                    )));
                }
            }
        }
        Ok(())
    }

    /// Raw margin: `bias + scale * Σ leaf`.
    pub fn margin(&self, row: &[Coerced]) -> f64 {
        let sum: f64 = self
            .trees
            .iter()
            .map(|tree| tree.leaf_values[tree.leaf_index(row)])
            .sum();
        self.bias + self.scale * sum
    }

    /// Positive-class probability.
    pub fn probability(&self, row: &[Coerced]) -> f64 {
        sigmoid(self.margin(row))
    }
}

pub fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SMALL_MODEL: &str = r#"{
        "feature_names": ["Age", "Sexe", "ELISA_pos"],
        "cat_feature_indices": [1],
        "bias": -0.5,
        "scale": 1.0,
        "trees": [
            {"splits": [{"feature": 2, "border": 0.5}], "leaf_values": [-1.0, 2.0]},
            {"splits": [{"feature": 0, "border": 10.0}, {"feature": 1, "category": "Jument"}],
             "leaf_values": [0.0, 0.25, 0.5, 1.0]}
        ]
    }"#;

    #[test]
    fn leaf_index_follows_split_bits() {
        let forest = ObliviousForest::from_json_str(SMALL_MODEL).unwrap();
        let row = vec![
            Coerced::Number(12.0),
            Coerced::Token("Jument".into()),
            Coerced::Number(1.0),
        ];
        // tree 0: ELISA > 0.5 -> leaf 1 (2.0); tree 1: age>10 (bit0) + Jument (bit1) -> leaf 3 (1.0)
        assert!((forest.margin(&row) - (-0.5 + 2.0 + 1.0)).abs() < 1e-12);
    }

    #[test]
    fn missing_numeric_never_satisfies_a_split() {
        let forest = ObliviousForest::from_json_str(SMALL_MODEL).unwrap();
        let row = vec![
            Coerced::Missing,
            Coerced::Token("__MISSING__".into()),
            Coerced::Missing,
        ];
        assert!((forest.margin(&row) - (-0.5 - 1.0 + 0.0)).abs() < 1e-12);
        let p = forest.probability(&row);
        assert!(p > 0.0 && p < 1.0);
    }

    #[test]
    fn rejects_inconsistent_artifacts() {
        let wrong_leaves = r#"{"feature_names": ["a"], "trees": [{"splits": [{"feature": 0, "border": 1.0}], "leaf_values": [1.0]}]}"#;
        assert!(matches!(
            ObliviousForest::from_json_str(wrong_leaves),
            Err(ModelError::Invalid(_))
        ));

        let bad_feature = r#"{"feature_names": ["a"], "trees": [{"splits": [{"feature": 3, "border": 1.0}], "leaf_values": [1.0, 2.0]}]}"#;
        assert!(matches!(
            ObliviousForest::from_json_str(bad_feature),
            Err(ModelError::Invalid(_))
        ));

        let cat_on_numeric = r#"{"feature_names": ["a"], "trees": [{"splits": [{"feature": 0, "category": "x"}], "leaf_values": [1.0, 2.0]}]}"#;
        assert!(matches!(
            ObliviousForest::from_json_str(cat_on_numeric),
            Err(ModelError::Invalid(_))
        ));
    }

    #[test]
    fn empty_or_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("model.json");
        assert!(matches!(ObliviousForest::load(&path), Err(ModelError::Io { .. })));
        fs::write(&path, "").unwrap();
        assert!(matches!(ObliviousForest::load(&path), Err(ModelError::Empty(_))));
    }

    #[test]
    fn sigmoid_is_centered() {
        assert!((sigmoid(0.0) - 0.5).abs() < 1e-12);
        assert!(sigmoid(40.0) <= 1.0);
        assert!(sigmoid(-40.0) >= 0.0);
    }
}
