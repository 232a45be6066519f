//! Shared domain types.
//!
//! These types are kept lightweight and serializable so they can be:
//!
//! - passed between the pipeline stages in-memory
//! - exported to JSON/CSV with the evaluated case
//! - read back from an answers file

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// One caller-supplied answer, as it arrives from a form or an answers file.
///
/// `Null` and blank text are both "not answered".
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Answer {
    Null,
    Flag(bool),
    Number(f64),
    Text(String),
}

impl Answer {
    pub fn text(s: impl Into<String>) -> Self {
        Answer::Text(s.into())
    }
}

/// Answers keyed by field name (possibly an alias of a schema feature).
pub type Answers = BTreeMap<String, Answer>;

/// A record cell before coercion.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Explicitly unknown. Never conflated with `0` or `""`.
    Unknown,
    Number(f64),
    Text(String),
}

impl Cell {
    pub fn is_unknown(&self) -> bool {
        matches!(self, Cell::Unknown)
    }

    /// Convert an answer into a cell; unanswered values become `Unknown`.
    pub fn from_answer(answer: &Answer) -> Self {
        match answer {
            Answer::Null => Cell::Unknown,
            Answer::Flag(b) => Cell::Number(if *b { 1.0 } else { 0.0 }),
            Answer::Number(v) if v.is_finite() => Cell::Number(*v),
            Answer::Number(_) => Cell::Unknown,
            Answer::Text(s) => {
                let trimmed = s.trim();
                if trimmed.is_empty() {
                    Cell::Unknown
                } else {
                    Cell::Text(trimmed.to_string())
                }
            }
        }
    }
}

/// One subject's row, keyed by the schema's ordered feature names.
///
/// Positions follow the registry order, which is the positional contract with
/// the classifier.
#[derive(Debug, Clone)]
pub struct Record {
    names: Vec<String>,
    cells: Vec<Cell>,
    index: HashMap<String, usize>,
}

impl Record {
    /// All-unknown record over the given ordered feature names.
    pub fn unknown(names: &[String]) -> Self {
        let index = names
            .iter()
            .enumerate()
            .map(|(i, n)| (n.clone(), i))
            .collect();
        Self {
            names: names.to_vec(),
            cells: vec![Cell::Unknown; names.len()],
            index,
        }
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(name)
    }

    pub fn get(&self, name: &str) -> Option<&Cell> {
        self.index.get(name).map(|&i| &self.cells[i])
    }

    /// Overwrite a cell. Returns `false` (and changes nothing) when `name` is
    /// not a feature of this record.
    pub fn set(&mut self, name: &str, cell: Cell) -> bool {
        match self.index.get(name) {
            Some(&i) => {
                self.cells[i] = cell;
                true
            }
            None => false,
        }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Cell)> {
        self.names.iter().map(String::as_str).zip(self.cells.iter())
    }
}

/// Declared role of a feature, used instead of guessing from its name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureKind {
    /// Yes/no answer encoded as `1`/`0`.
    Binary,
    /// Token from a trained category set.
    Categorical,
    Numeric,
    /// Free text typed by the user; coerced like a numeric field.
    FreeText,
}

/// A record cell after coercion: the only shapes the classifier ever sees.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Coerced {
    Token(String),
    Number(f64),
    /// Unknown numeric value (the model's missing-value handling applies).
    Missing,
}

/// A resolved location.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
    pub display_name: String,
    pub provider: String,
}

/// Outcome of resolving an address through the provider chain.
///
/// `NotFound` ("the address does not exist") and `ProviderError` ("the
/// service is down") are never collapsed into each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum GeocodeResult {
    Found(GeoPoint),
    NotFound,
    ProviderError {
        /// HTTP status when the provider answered; absent for timeouts and
        /// connection failures.
        status: Option<u16>,
        detail: String,
        provider: String,
    },
}

impl GeocodeResult {
    pub fn point(&self) -> Option<&GeoPoint> {
        match self {
            GeocodeResult::Found(p) => Some(p),
            _ => None,
        }
    }

    /// User-facing message, limited to the two failure kinds users may see.
    pub fn user_message(&self) -> String {
        match self {
            GeocodeResult::Found(p) => format!("Located: {} ({})", p.display_name, p.provider),
            GeocodeResult::NotFound => {
                "Address not found. Try adding the postcode or simplifying the address.".to_string()
            }
            GeocodeResult::ProviderError { status, .. } => match status {
                Some(code) => format!("Geocoding service temporarily unavailable (HTTP {code})."),
                None => "Geocoding service temporarily unavailable.".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_and_null_answers_are_unknown() {
        assert_eq!(Cell::from_answer(&Answer::Null), Cell::Unknown);
        assert_eq!(Cell::from_answer(&Answer::text("   ")), Cell::Unknown);
        assert_eq!(Cell::from_answer(&Answer::Number(f64::NAN)), Cell::Unknown);
        assert_eq!(Cell::from_answer(&Answer::text(" Oui ")), Cell::Text("Oui".into()));
        assert_eq!(Cell::from_answer(&Answer::Flag(true)), Cell::Number(1.0));
    }

    #[test]
    fn answers_deserialize_from_mixed_json() {
        let answers: Answers =
            serde_json::from_str(r#"{"a": null, "b": true, "c": 3.5, "d": "Oui"}"#).unwrap();
        assert_eq!(answers["a"], Answer::Null);
        assert_eq!(answers["b"], Answer::Flag(true));
        assert_eq!(answers["c"], Answer::Number(3.5));
        assert_eq!(answers["d"], Answer::text("Oui"));
    }

    #[test]
    fn record_ignores_unknown_names() {
        let names = vec!["a".to_string(), "b".to_string()];
        let mut record = Record::unknown(&names);
        assert!(record.set("a", Cell::Number(1.0)));
        assert!(!record.set("zzz", Cell::Number(1.0)));
        assert_eq!(record.get("a"), Some(&Cell::Number(1.0)));
        assert_eq!(record.get("b"), Some(&Cell::Unknown));
        assert_eq!(record.len(), 2);
    }

    #[test]
    fn geocode_outcomes_serialize_with_distinct_tags() {
        let not_found = serde_json::to_value(GeocodeResult::NotFound).unwrap();
        let error = serde_json::to_value(GeocodeResult::ProviderError {
            status: Some(503),
            detail: "busy".into(),
            provider: "BAN".into(),
        })
        .unwrap();
        assert_eq!(not_found["outcome"], "not_found");
        assert_eq!(error["outcome"], "provider_error");
        assert_eq!(error["status"], 503);
    }
}
