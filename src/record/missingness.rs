//! Missingness indicators (`<base>_missing_code`).
//!
//! Codes:
//! - `0`: the base value is known
//! - `1`: unknown, general feature ("missing completely at random")
//! - `2`: unknown, analysis/diagnostic feature ("missing not at random")
//!
//! Encoding consumes the `Record` and hands back an `EncodedRecord`, so it can
//! only happen once and only after every answer has been merged.

use crate::domain::{Cell, Record};
use crate::schema::{AnalysisSet, SchemaRegistry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingCode {
    Present = 0,
    AtRandom = 1,
    NotAtRandom = 2,
}

impl MissingCode {
    pub fn value(self) -> f64 {
        self as u8 as f64
    }
}

/// A record whose missingness indicators have been derived.
#[derive(Debug, Clone)]
pub struct EncodedRecord {
    record: Record,
}

impl EncodedRecord {
    pub fn record(&self) -> &Record {
        &self.record
    }

    pub fn into_record(self) -> Record {
        self.record
    }
}

/// Code for one base value.
pub fn missing_code(base: &Cell, in_analysis_set: bool) -> MissingCode {
    match (base.is_unknown(), in_analysis_set) {
        (false, _) => MissingCode::Present,
        (true, true) => MissingCode::NotAtRandom,
        (true, false) => MissingCode::AtRandom,
    }
}

/// Set every indicator the schema defines from the final merged answers.
///
/// Indicators whose base feature is absent from the record stay at `0`.
pub fn encode_missingness(
    mut record: Record,
    registry: &SchemaRegistry,
    analysis: &AnalysisSet,
) -> EncodedRecord {
    for (indicator, base) in registry.indicators() {
        let code = match record.get(base) {
            Some(cell) => missing_code(cell, analysis.contains(base)),
            None => MissingCode::Present,
        };
        record.set(indicator, Cell::Number(code.value()));
    }
    EncodedRecord { record }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::*;
    use crate::schema::FULL_V1;

    fn registry() -> SchemaRegistry {
        SchemaRegistry::from_parts(
            vec![
                "ELISA_pos".into(),
                "ELISA_pos_missing_code".into(),
                "Boiterie".into(),
                "Boiterie_missing_code".into(),
                "Age_du_cheval".into(),
                "Ghost_missing_code".into(),
            ],
            vec![],
            BTreeMap::new(),
            BTreeMap::new(),
            None,
            vec![],
        )
        .unwrap()
    }

    fn code(encoded: &EncodedRecord, name: &str) -> Option<Cell> {
        encoded.record().get(name).cloned()
    }

    #[test]
    fn unanswered_features_get_mcar_or_mnar_codes() {
        let reg = registry();
        let analysis = AnalysisSet::builtin(FULL_V1).unwrap();
        let encoded = encode_missingness(Record::unknown(reg.feature_names()), &reg, &analysis);

        assert_eq!(code(&encoded, "ELISA_pos_missing_code"), Some(Cell::Number(2.0)));
        assert_eq!(code(&encoded, "Boiterie_missing_code"), Some(Cell::Number(1.0)));
        // No base feature: stays at the default.
        assert_eq!(code(&encoded, "Ghost_missing_code"), Some(Cell::Number(0.0)));
        // Features without an indicator are untouched.
        assert_eq!(code(&encoded, "Age_du_cheval"), Some(Cell::Unknown));
        assert!(!encoded.record().contains("Age_du_cheval_missing_code"));
    }

    #[test]
    fn answered_features_are_present_whatever_the_value() {
        let reg = registry();
        let analysis = AnalysisSet::builtin(FULL_V1).unwrap();
        let mut record = Record::unknown(reg.feature_names());
        record.set("ELISA_pos", Cell::Text("Non".into()));
        record.set("Boiterie", Cell::Number(0.0));
        let encoded = encode_missingness(record, &reg, &analysis);

        assert_eq!(code(&encoded, "ELISA_pos_missing_code"), Some(Cell::Number(0.0)));
        assert_eq!(code(&encoded, "Boiterie_missing_code"), Some(Cell::Number(0.0)));
    }

    #[test]
    fn analysis_set_version_changes_the_code() {
        let reg = SchemaRegistry::from_parts(
            vec!["NFS_normale".into(), "NFS_normale_missing_code".into()],
            vec![],
            BTreeMap::new(),
            BTreeMap::new(),
            None,
            vec![],
        )
        .unwrap();
        let full = AnalysisSet::builtin(FULL_V1).unwrap();
        let results = AnalysisSet::builtin(crate::schema::RESULTS_V2).unwrap();

        let a = encode_missingness(Record::unknown(reg.feature_names()), &reg, &full);
        let b = encode_missingness(Record::unknown(reg.feature_names()), &reg, &results);
        assert_eq!(code(&a, "NFS_normale_missing_code"), Some(Cell::Number(2.0)));
        assert_eq!(code(&b, "NFS_normale_missing_code"), Some(Cell::Number(1.0)));
    }
}
