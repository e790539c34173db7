//! Error types for the studyforge generation pipelines.

use crate::prompt::template::TemplateError;
use crate::schema::ValidationError;
use thiserror::Error;

/// Marker the backend transport leaves in a failure message when the model is overloaded.
pub const OVERLOAD_MARKER: &str = "503";

/// Pipeline-level errors
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("Validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Generation failed: {0}")]
    Generation(String),

    #[error("Flow {flow} returned an empty {field}")]
    EmptyResult {
        flow: &'static str,
        field: &'static str,
    },

    #[error("Asset generation failed for prompt {index}: {message}")]
    AssetGeneration { index: usize, message: String },

    #[error("Template error: {0}")]
    Template(#[from] TemplateError),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

impl ApiError {
    /// True when the failure message carries the backend overload marker.
    pub fn is_overloaded(&self) -> bool {
        match self {
            ApiError::Generation(message) | ApiError::AssetGeneration { message, .. } => {
                message.contains(OVERLOAD_MARKER)
            }
            _ => false,
        }
    }

    /// Failures a composer reports as data rather than propagating.
    ///
    /// Template and configuration errors are programmer mistakes and keep
    /// travelling up the `Err` channel.
    pub fn is_reportable(&self) -> bool {
        matches!(
            self,
            ApiError::Validation(_)
                | ApiError::Generation(_)
                | ApiError::EmptyResult { .. }
                | ApiError::AssetGeneration { .. }
        )
    }
}

impl From<config::ConfigError> for ApiError {
    fn from(err: config::ConfigError) -> Self {
        ApiError::ConfigError(err.to_string())
    }
}
