//! The schema registry: the fixed feature contract learned at training time.
//!
//! The descriptor is a JSON document with three required keys:
//!
//! - `feature_cols`: ordered feature names (the positional contract)
//! - `cat_cols`: the categorical subset
//! - `factor_levels`: allowed tokens per categorical feature
//!
//! and a few optional ones (`feature_kinds`, `risk_feature`, `open_ended`).
//! Once loaded the registry is immutable.

use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs;
use std::path::Path;

use serde::Deserialize;
use serde_json::Value;
use tracing::info;

use crate::domain::FeatureKind;
use crate::schema::SchemaError;

/// Suffix naming the missingness-indicator companion of a base feature.
pub const MISSING_SUFFIX: &str = "_missing_code";

/// Default name of the geography-derived risk feature.
pub const DEFAULT_RISK_FEATURE: &str = "Classe_de_risque";

#[derive(Debug, Deserialize)]
struct Descriptor {
    feature_cols: Option<Vec<String>>,
    cat_cols: Option<Vec<String>>,
    factor_levels: Option<BTreeMap<String, Vec<Value>>>,
    #[serde(default)]
    feature_kinds: BTreeMap<String, FeatureKind>,
    #[serde(default)]
    risk_feature: Option<String>,
    #[serde(default)]
    open_ended: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct SchemaRegistry {
    feature_names: Vec<String>,
    categorical: BTreeSet<String>,
    category_levels: BTreeMap<String, Vec<String>>,
    kinds: Vec<FeatureKind>,
    risk_feature: String,
    index: HashMap<String, usize>,
}

impl SchemaRegistry {
    /// Load and validate a schema descriptor file.
    pub fn load(path: &Path) -> Result<Self, SchemaError> {
        let raw = fs::read_to_string(path).map_err(|e| SchemaError::Io {
            path: path.display().to_string(),
            source: e,
        })?;
        let registry = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            features = registry.feature_names.len(),
            categorical = registry.categorical.len(),
            "loaded schema descriptor"
        );
        Ok(registry)
    }

    pub fn from_json_str(raw: &str) -> Result<Self, SchemaError> {
        let desc: Descriptor = serde_json::from_str(raw)?;

        let feature_cols = desc.feature_cols.ok_or(SchemaError::MissingKey("feature_cols"))?;
        let cat_cols = desc.cat_cols.ok_or(SchemaError::MissingKey("cat_cols"))?;
        let factor_levels = desc
            .factor_levels
            .ok_or(SchemaError::MissingKey("factor_levels"))?;

        let levels = factor_levels
            .into_iter()
            .map(|(k, vs)| (k, vs.iter().map(level_token).collect()))
            .collect();

        Self::from_parts(
            feature_cols,
            cat_cols,
            levels,
            desc.feature_kinds,
            desc.risk_feature,
            desc.open_ended,
        )
    }

    /// Build a registry from already-parsed parts, enforcing the invariants.
    pub fn from_parts(
        feature_cols: Vec<String>,
        cat_cols: Vec<String>,
        factor_levels: BTreeMap<String, Vec<String>>,
        declared_kinds: BTreeMap<String, FeatureKind>,
        risk_feature: Option<String>,
        open_ended: Vec<String>,
    ) -> Result<Self, SchemaError> {
        let mut index = HashMap::with_capacity(feature_cols.len());
        for (i, name) in feature_cols.iter().enumerate() {
            if index.insert(name.clone(), i).is_some() {
                return Err(SchemaError::DuplicateFeature(name.clone()));
            }
        }

        let mut categorical = BTreeSet::new();
        for c in cat_cols {
            if !index.contains_key(&c) {
                return Err(SchemaError::UnknownCategorical(c));
            }
            categorical.insert(c);
        }

        let open_ended: BTreeSet<String> = open_ended.into_iter().collect();
        for c in &categorical {
            let has_levels = factor_levels.get(c).is_some_and(|lv| !lv.is_empty());
            if !has_levels && !open_ended.contains(c) {
                return Err(SchemaError::MissingLevels(c.clone()));
            }
        }

        let kinds = feature_cols
            .iter()
            .map(|name| {
                if categorical.contains(name) {
                    FeatureKind::Categorical
                } else {
                    match declared_kinds.get(name) {
                        // A categorical kind outside `cat_cols` cannot be honoured:
                        // the classifier expects a number there.
                        Some(FeatureKind::Categorical) | None => FeatureKind::Numeric,
                        Some(kind) => *kind,
                    }
                }
            })
            .collect();

        Ok(Self {
            feature_names: feature_cols,
            categorical,
            category_levels: factor_levels,
            kinds,
            risk_feature: risk_feature.unwrap_or_else(|| DEFAULT_RISK_FEATURE.to_string()),
            index,
        })
    }

    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.index.get(name).copied()
    }

    pub fn is_categorical(&self, name: &str) -> bool {
        self.categorical.contains(name)
    }

    pub fn categorical_features(&self) -> &BTreeSet<String> {
        &self.categorical
    }

    /// Positions of the categorical features, in feature order.
    pub fn categorical_indices(&self) -> Vec<usize> {
        self.feature_names
            .iter()
            .enumerate()
            .filter(|(_, n)| self.categorical.contains(*n))
            .map(|(i, _)| i)
            .collect()
    }

    /// Allowed tokens for a categorical feature (empty when open-ended).
    pub fn levels(&self, name: &str) -> &[String] {
        self.category_levels.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn kind(&self, name: &str) -> Option<FeatureKind> {
        self.position(name).map(|i| self.kinds[i])
    }

    /// The risk feature name, if the schema carries it.
    pub fn risk_feature(&self) -> Option<&str> {
        self.contains(&self.risk_feature)
            .then_some(self.risk_feature.as_str())
    }

    pub fn is_indicator(name: &str) -> bool {
        name.ends_with(MISSING_SUFFIX)
    }

    /// Base (non-indicator) features, in feature order.
    pub fn base_features(&self) -> impl Iterator<Item = &str> {
        self.feature_names
            .iter()
            .map(String::as_str)
            .filter(|n| !Self::is_indicator(n))
    }

    /// `(indicator, base)` pairs for every indicator the schema defines.
    ///
    /// The base may be absent from the schema (drift); callers decide.
    pub fn indicators(&self) -> impl Iterator<Item = (&str, &str)> {
        self.feature_names.iter().filter_map(|n| {
            n.strip_suffix(MISSING_SUFFIX)
                .map(|base| (n.as_str(), base))
        })
    }
}

/// Factor levels exported from R/pandas can be numbers; keep them as tokens.
fn level_token(v: &Value) -> String {
    match v {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DESCRIPTOR: &str = r#"{
        "feature_cols": ["Age_du_cheval", "Sexe", "ELISA_pos", "ELISA_pos_missing_code", "Classe_de_risque"],
        "cat_cols": ["Sexe", "Classe_de_risque"],
        "factor_levels": {
            "Sexe": ["Hongre", "Jument", "Etalon"],
            "Classe_de_risque": ["faible ou méconnu", "intermédiaire", "fort"]
        },
        "feature_kinds": {"ELISA_pos": "binary"}
    }"#;

    #[test]
    fn loads_descriptor_and_derives_kinds() {
        let reg = SchemaRegistry::from_json_str(DESCRIPTOR).unwrap();
        assert_eq!(reg.feature_names().len(), 5);
        assert_eq!(reg.categorical_indices(), vec![1, 4]);
        assert_eq!(reg.kind("Sexe"), Some(FeatureKind::Categorical));
        assert_eq!(reg.kind("ELISA_pos"), Some(FeatureKind::Binary));
        assert_eq!(reg.kind("Age_du_cheval"), Some(FeatureKind::Numeric));
        assert_eq!(reg.risk_feature(), Some("Classe_de_risque"));
        assert_eq!(reg.levels("Sexe").len(), 3);
    }

    #[test]
    fn missing_required_key_is_fatal() {
        let err = SchemaRegistry::from_json_str(r#"{"feature_cols": [], "cat_cols": []}"#).unwrap_err();
        assert!(matches!(err, SchemaError::MissingKey("factor_levels")));
    }

    #[test]
    fn categorical_without_levels_is_rejected_unless_open_ended() {
        let raw = r#"{"feature_cols": ["a"], "cat_cols": ["a"], "factor_levels": {}}"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(raw),
            Err(SchemaError::MissingLevels(_))
        ));

        let raw = r#"{"feature_cols": ["a"], "cat_cols": ["a"], "factor_levels": {}, "open_ended": ["a"]}"#;
        let reg = SchemaRegistry::from_json_str(raw).unwrap();
        assert!(reg.levels("a").is_empty());
    }

    #[test]
    fn duplicate_and_foreign_features_are_rejected() {
        let dup = r#"{"feature_cols": ["a", "a"], "cat_cols": [], "factor_levels": {}}"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(dup),
            Err(SchemaError::DuplicateFeature(_))
        ));
        let foreign = r#"{"feature_cols": ["a"], "cat_cols": ["b"], "factor_levels": {"b": ["x"]}}"#;
        assert!(matches!(
            SchemaRegistry::from_json_str(foreign),
            Err(SchemaError::UnknownCategorical(_))
        ));
    }

    #[test]
    fn numeric_levels_become_tokens() {
        let raw = r#"{"feature_cols": ["a"], "cat_cols": ["a"], "factor_levels": {"a": [1, 2, "3"]}}"#;
        let reg = SchemaRegistry::from_json_str(raw).unwrap();
        assert_eq!(reg.levels("a"), ["1", "2", "3"]);
    }

    #[test]
    fn indicators_pair_with_their_base() {
        let reg = SchemaRegistry::from_json_str(DESCRIPTOR).unwrap();
        let pairs: Vec<_> = reg.indicators().collect();
        assert_eq!(pairs, vec![("ELISA_pos_missing_code", "ELISA_pos")]);
        assert_eq!(reg.base_features().count(), 4);
    }
}
