//! CLI output: error mapping from pipeline errors to the CLI surface.

use crate::error::ApiError;

/// Map pipeline errors to a string for CLI output.
/// Configuration problems are reported without the variant prefix.
pub fn map_error(e: &ApiError) -> String {
    match e {
        ApiError::ConfigError(message) => format!("Invalid configuration: {}", message),
        other => other.to_string(),
    }
}
