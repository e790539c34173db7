//! Merge rules: defaults, override order, conflict handling.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("backend.kind", "gemini")?
        .set_default("pipeline.max_presentation_images", 10)?
        .set_default("pipeline.image_interval_ms", 1000)
}
