//! Schema registry and its consistency checks.
//!
//! - `registry`: the trained feature contract (names, categorical subset, levels)
//! - `analysis`: the versioned analysis/diagnostic feature set
//! - `contract`: registry vs model / reference dataset checks

pub mod analysis;
pub mod contract;
pub mod registry;

pub use analysis::*;
pub use contract::*;
pub use registry::*;

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("missing required key '{0}'")]
    MissingKey(&'static str),
    #[error("feature '{0}' is listed twice")]
    DuplicateFeature(String),
    #[error("categorical feature '{0}' is not in feature_cols")]
    UnknownCategorical(String),
    #[error("categorical feature '{0}' has no factor levels")]
    MissingLevels(String),
    #[error("unknown analysis set '{0}' (expected a built-in version or a JSON file path)")]
    UnknownAnalysisSet(String),
}
