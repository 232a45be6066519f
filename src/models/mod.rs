//! The pretrained classifier.
//!
//! - `forest`: oblivious tree ensemble artifact + evaluation
//! - `classifier`: the `Classifier` seam and the registry-checked adapter

pub mod classifier;
pub mod forest;

pub use classifier::*;
pub use forest::*;

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("cannot read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact '{0}' is empty")]
    Empty(String),
    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("inconsistent model artifact: {0}")]
    Invalid(String),
    #[error("schema registry and model disagree: {0}")]
    Contract(String),
    #[error("row does not match the model inputs (expected {expected} values, got {actual})")]
    RowShape { expected: usize, actual: usize },
    #[error("categorical feature '{0}' reached the classifier without a token")]
    UntokenizedCategorical(String),
    #[error("classifier returned an invalid probability {0}")]
    InvalidOutput(f64),
}
