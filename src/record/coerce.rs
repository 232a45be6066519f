//! Schema coercion: every cell into the exact shape the classifier expects.
//!
//! - Categorical features become string tokens; unknown becomes
//!   [`MISSING_TOKEN`]. Tokens outside the trained levels pass through and are
//!   logged for operators.
//! - Every other feature goes through yes/no normalisation and then numeric
//!   parsing; anything unparsable degrades to [`Coerced::Missing`]. Features
//!   declared `binary` only accept `0` and `1`.
//!
//! Coercion never fails. Degradations are counted in the [`CoercionReport`].

use tracing::warn;

use crate::domain::{Cell, Coerced, FeatureKind};
use crate::record::EncodedRecord;
use crate::schema::{AnalysisSet, SchemaRegistry};
use crate::text::fold_lower;

/// Token standing in for an unknown categorical value.
pub const MISSING_TOKEN: &str = "__MISSING__";

const AFFIRMATIVE: &[&str] = &["oui", "yes", "y", "true", "vrai", "1"];
const NEGATIVE: &[&str] = &["non", "no", "n", "false", "faux", "0"];

/// What coercion saw, for the "N of M features present" summary.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoercionReport {
    /// Base (non-indicator) features in the schema.
    pub feature_count: usize,
    /// Base features with a known value after coercion.
    pub present_count: usize,
    /// Base features still unknown after coercion, in schema order.
    pub missing: Vec<String>,
    /// Features that had an answer which could not be parsed.
    pub degraded: Vec<String>,
    /// `(feature, token)` pairs outside the trained category levels.
    pub out_of_vocabulary: Vec<(String, String)>,
}

impl CoercionReport {
    /// Missing features that belong to the analysis set.
    pub fn missing_diagnostics(&self, analysis: &AnalysisSet) -> Vec<String> {
        self.missing
            .iter()
            .filter(|f| analysis.contains(f))
            .cloned()
            .collect()
    }
}

/// The classifier-ready row.
#[derive(Debug, Clone)]
pub struct CoercedRecord {
    names: Vec<String>,
    values: Vec<Coerced>,
    report: CoercionReport,
}

impl CoercedRecord {
    pub fn values(&self) -> &[Coerced] {
        &self.values
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn get(&self, name: &str) -> Option<&Coerced> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.values[i])
    }

    pub fn report(&self) -> &CoercionReport {
        &self.report
    }
}

/// Map yes/no style text to `1`/`0`, then parse as a number.
///
/// Case-, accent- and whitespace-insensitive. Returns `None` for anything that
/// is not a finite number.
pub fn parse_numeric_text(raw: &str) -> Option<f64> {
    let folded = fold_lower(raw);
    if AFFIRMATIVE.contains(&folded.as_str()) {
        return Some(1.0);
    }
    if NEGATIVE.contains(&folded.as_str()) {
        return Some(0.0);
    }
    folded.parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Numeric value of a cell, or `None` when unknown or unparsable.
pub fn numeric_value(cell: &Cell) -> Option<f64> {
    match cell {
        Cell::Unknown => None,
        Cell::Number(v) => v.is_finite().then_some(*v),
        Cell::Text(s) => parse_numeric_text(s),
    }
}

/// Render a cell as a categorical token (`None` when unknown).
pub fn category_token(cell: &Cell) -> Option<String> {
    match cell {
        Cell::Unknown => None,
        Cell::Number(v) => Some(format_number_token(*v)),
        Cell::Text(s) => Some(s.clone()),
    }
}

fn format_number_token(v: f64) -> String {
    if v.fract() == 0.0 && v.abs() < 1e15 {
        format!("{}", v as i64)
    } else {
        v.to_string()
    }
}

pub fn coerce(encoded: EncodedRecord, registry: &SchemaRegistry) -> CoercedRecord {
    let record = encoded.into_record();
    let mut report = CoercionReport::default();
    let mut names = Vec::with_capacity(record.len());
    let mut values = Vec::with_capacity(record.len());

    for (name, cell) in record.iter() {
        let value = if registry.is_categorical(name) {
            match category_token(cell) {
                Some(token) => {
                    let levels = registry.levels(name);
                    if !levels.is_empty() && !levels.iter().any(|l| *l == token) {
                        warn!(feature = name, token = %token, "categorical token outside trained levels");
                        report.out_of_vocabulary.push((name.to_string(), token.clone()));
                    }
                    Coerced::Token(token)
                }
                None => Coerced::Token(MISSING_TOKEN.to_string()),
            }
        } else {
            let parsed = numeric_value(cell);
            let parsed = match registry.kind(name) {
                Some(FeatureKind::Binary) => parsed.filter(|v| *v == 0.0 || *v == 1.0),
                _ => parsed,
            };
            match parsed {
                Some(v) => Coerced::Number(v),
                None => {
                    if !cell.is_unknown() {
                        report.degraded.push(name.to_string());
                    }
                    Coerced::Missing
                }
            }
        };

        if !SchemaRegistry::is_indicator(name) {
            report.feature_count += 1;
            if is_known(&value) {
                report.present_count += 1;
            } else {
                report.missing.push(name.to_string());
            }
        }

        names.push(name.to_string());
        values.push(value);
    }

    if !report.degraded.is_empty() {
        warn!(features = ?report.degraded, "unparsable answers degraded to unknown");
    }

    CoercedRecord {
        names,
        values,
        report,
    }
}

fn is_known(value: &Coerced) -> bool {
    match value {
        Coerced::Token(t) => t != MISSING_TOKEN,
        Coerced::Number(_) => true,
        Coerced::Missing => false,
    }
}
