//! Feature vector builder: schema template + caller answers.

use tracing::debug;

use crate::domain::{Answers, Cell, Record};
use crate::record::AliasTable;
use crate::schema::SchemaRegistry;

/// Build an all-unknown record over the registry's features and overlay the
/// caller's answers.
///
/// Keys that are neither features nor aliases are ignored: upstream forms may
/// send a superset of candidate fields. When an answer arrives under both a
/// feature's own name and one of its aliases, the feature's own name wins.
pub fn build_record(registry: &SchemaRegistry, aliases: &AliasTable, answers: &Answers) -> Record {
    let mut record = Record::unknown(registry.feature_names());
    let mut ignored = Vec::new();

    // Aliased keys first so that exact names overwrite them.
    for (key, answer) in answers.iter().filter(|(k, _)| !registry.contains(k)) {
        match aliases.resolve(registry, key) {
            Some(target) => {
                record.set(target, Cell::from_answer(answer));
            }
            None => ignored.push(key.as_str()),
        }
    }
    for (key, answer) in answers.iter().filter(|(k, _)| registry.contains(k)) {
        record.set(key, Cell::from_answer(answer));
    }

    if !ignored.is_empty() {
        debug!(count = ignored.len(), keys = ?ignored, "ignored answers outside the schema");
    }
    record
}

/// Write the geography-derived risk label into the record's risk feature.
///
/// A `None` label leaves the cell untouched. Returns whether the schema has a
/// risk feature at all.
pub fn inject_risk_label(record: &mut Record, registry: &SchemaRegistry, label: Option<&str>) -> bool {
    let Some(feature) = registry.risk_feature() else {
        return false;
    };
    if let Some(label) = label.map(str::trim).filter(|l| !l.is_empty()) {
        record.set(feature, Cell::Text(label.to_string()));
    }
    true
}
