//! Configuration System
//!
//! Layered configuration built with the `config` crate: built-in defaults, the global
//! config file, an explicit file, then `STUDYFORGE_*` environment variables. The loaded
//! [`StudioConfig`] is handed to the generation client and the pipelines at construction;
//! nothing below this module reads the environment.

use crate::error::ApiError;
use crate::logging::LoggingConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;

/// Conventional variables holding a Gemini key, checked in order when none is configured.
pub const API_KEY_FALLBACK_VARS: &[&str] = &["GEMINI_API_KEY", "GOOGLE_API_KEY"];

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StudioConfig {
    /// Generation backend selection and credentials
    #[serde(default)]
    pub backend: BackendConfig,

    /// Pipeline tuning
    #[serde(default)]
    pub pipeline: PipelineConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    Gemini,
    /// Offline backend answering with schema-shaped samples
    Mock,
}

/// Generation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendConfig {
    #[serde(default = "default_kind")]
    pub kind: BackendKind,

    /// Model for structured text generation
    #[serde(default = "default_model")]
    pub model: String,

    /// Model for image generation
    #[serde(default = "default_image_model")]
    pub image_model: String,

    /// Model for speech synthesis
    #[serde(default = "default_speech_model")]
    pub speech_model: String,

    /// API base URL
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Whole-request timeout; the only cancellation mechanism for in-flight calls
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_kind() -> BackendKind {
    BackendKind::Gemini
}

fn default_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_image_model() -> String {
    "gemini-2.0-flash-preview-image-generation".to_string()
}

fn default_speech_model() -> String {
    "gemini-2.5-flash-preview-tts".to_string()
}

fn default_endpoint() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            kind: default_kind(),
            model: default_model(),
            image_model: default_image_model(),
            speech_model: default_speech_model(),
            endpoint: default_endpoint(),
            api_key: None,
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Pipeline tuning
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineConfig {
    /// Slides beyond this index never get an image
    #[serde(default = "default_max_presentation_images")]
    pub max_presentation_images: usize,

    /// Pause after each successful slide image request (milliseconds)
    #[serde(default = "default_image_interval_ms")]
    pub image_interval_ms: u64,
}

fn default_max_presentation_images() -> usize {
    10
}

fn default_image_interval_ms() -> u64 {
    1000
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_presentation_images: default_max_presentation_images(),
            image_interval_ms: default_image_interval_ms(),
        }
    }
}

/// Configuration validation problems
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigIssue {
    Backend(String),
    Pipeline(String),
    Logging(String),
}

impl std::fmt::Display for ConfigIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigIssue::Backend(msg) => write!(f, "Backend: {}", msg),
            ConfigIssue::Pipeline(msg) => write!(f, "Pipeline: {}", msg),
            ConfigIssue::Logging(msg) => write!(f, "Logging: {}", msg),
        }
    }
}

impl std::error::Error for ConfigIssue {}

impl BackendConfig {
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();
        for (name, value) in [
            ("model", &self.model),
            ("image_model", &self.image_model),
            ("speech_model", &self.speech_model),
        ] {
            if value.trim().is_empty() {
                issues.push(ConfigIssue::Backend(format!("{} cannot be empty", name)));
            }
        }
        if !(self.endpoint.starts_with("http://") || self.endpoint.starts_with("https://")) {
            issues.push(ConfigIssue::Backend(format!(
                "endpoint must be an http(s) URL, got '{}'",
                self.endpoint
            )));
        }
        if self.kind == BackendKind::Gemini && self.api_key.as_deref().map_or(true, str::is_empty) {
            issues.push(ConfigIssue::Backend(format!(
                "gemini backend requires api_key (set STUDYFORGE_BACKEND__API_KEY or {})",
                API_KEY_FALLBACK_VARS.join("/")
            )));
        }
        if self.timeout_secs == 0 {
            issues.push(ConfigIssue::Backend("timeout_secs must be positive".to_string()));
        }
        issues
    }
}

impl StudioConfig {
    /// Validate the entire configuration, collecting every problem
    pub fn validate(&self) -> Result<(), Vec<ConfigIssue>> {
        let mut issues = self.backend.validate();

        if self.pipeline.max_presentation_images == 0 {
            issues.push(ConfigIssue::Pipeline(
                "max_presentation_images must be at least 1".to_string(),
            ));
        }
        if let Err(e) = self.logging.validate() {
            issues.push(ConfigIssue::Logging(e));
        }

        if issues.is_empty() {
            Ok(())
        } else {
            Err(issues)
        }
    }

    /// Copy safe to print: credentials masked
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        if copy.backend.api_key.is_some() {
            copy.backend.api_key = Some("***".to_string());
        }
        copy
    }

    /// Fill a missing API key from the conventional variables.
    pub fn apply_api_key_fallback<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if self.backend.api_key.as_deref().map_or(false, |k| !k.is_empty()) {
            return;
        }
        self.backend.api_key = API_KEY_FALLBACK_VARS
            .iter()
            .find_map(|var| lookup(var).filter(|v| !v.is_empty()));
    }
}

/// Configuration loader
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration from every layer.
    ///
    /// Precedence (highest first): environment, explicit file, global file, defaults.
    pub fn load(explicit_file: Option<&Path>) -> Result<StudioConfig, ApiError> {
        let mut builder = merge::merge_policy::builder_with_defaults()?;
        builder = sources::global_file::add_to_builder(builder)?;
        if let Some(path) = explicit_file {
            builder = sources::explicit_file::add_to_builder(builder, path)?;
        }
        builder = sources::environment::add_to_builder(builder);

        let mut config: StudioConfig = builder.build()?.try_deserialize()?;
        config.apply_api_key_fallback(|var| std::env::var(var).ok());
        Ok(config)
    }

    /// Load a single file over the defaults, ignoring other layers.
    pub fn load_from_file(path: &Path) -> Result<StudioConfig, ApiError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::explicit_file::add_to_builder(builder, path)?;
        Ok(builder.build()?.try_deserialize()?)
    }
}
