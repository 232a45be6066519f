//! Top-level error type for the `lyrae` binary.
//!
//! Component modules define their own `thiserror` enums; they are folded into
//! `AppError` here so `main` can map every failure to an exit code:
//!
//! - `2`: bad invocation or unreadable user input
//! - `3`: fatal startup artifact problem (model, schema, contract mismatch)
//! - `4`: runtime/external failure that aborts a command

use crate::geo::RasterError;
use crate::models::ModelError;
use crate::report::CategoryError;
use crate::schema::SchemaError;

pub const EXIT_USAGE: u8 = 2;
pub const EXIT_ARTIFACT: u8 = 3;
pub const EXIT_RUNTIME: u8 = 4;

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn usage(message: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, message)
    }

    pub fn artifact(message: impl Into<String>) -> Self {
        Self::new(EXIT_ARTIFACT, message)
    }

    pub fn runtime(message: impl Into<String>) -> Self {
        Self::new(EXIT_RUNTIME, message)
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

impl From<SchemaError> for AppError {
    fn from(err: SchemaError) -> Self {
        AppError::artifact(format!("Schema descriptor error: {err}"))
    }
}

impl From<ModelError> for AppError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::RowShape { .. }
            | ModelError::UntokenizedCategorical(_)
            | ModelError::InvalidOutput(_) => {
                AppError::runtime(format!("Classifier error: {err}"))
            }
            _ => AppError::artifact(format!("Model artifact error: {err}")),
        }
    }
}

impl From<RasterError> for AppError {
    fn from(err: RasterError) -> Self {
        AppError::runtime(format!("Risk raster error: {err}"))
    }
}

impl From<CategoryError> for AppError {
    fn from(err: CategoryError) -> Self {
        AppError::runtime(format!("Risk category error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn schema_errors_are_fatal_artifact_errors() {
        let err: AppError = SchemaError::MissingKey("feature_cols").into();
        assert_eq!(err.exit_code(), EXIT_ARTIFACT);
        assert!(err.message().contains("feature_cols"));
    }

    #[test]
    fn row_shape_errors_are_runtime_errors() {
        let err: AppError = ModelError::RowShape {
            expected: 3,
            actual: 2,
        }
        .into();
        assert_eq!(err.exit_code(), EXIT_RUNTIME);
    }
}
