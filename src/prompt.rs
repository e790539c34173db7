//! Prompt definitions.
//!
//! A [`PromptDefinition`] couples a name, an optional system template, a user template and
//! backend options. Rendering validates the typed input against its contract before any
//! template is expanded, so a rendered prompt always comes from a well-formed input.

pub mod template;

use crate::error::ApiError;
use crate::provider::{Modality, SafetySetting};
use crate::schema::{encode, Contract};

/// Backend-specific options attached to a prompt
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PromptConfig {
    pub safety_settings: &'static [SafetySetting],
    /// Empty means text only
    pub modalities: &'static [Modality],
}

/// A named prompt: templates plus backend options. Owns no state between invocations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptDefinition {
    pub name: &'static str,
    pub system: Option<&'static str>,
    pub template: &'static str,
    pub config: PromptConfig,
}

/// Output of rendering a prompt definition against one input
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedPrompt {
    pub name: &'static str,
    pub system: Option<String>,
    pub user: String,
    pub config: PromptConfig,
    /// Prebuilt voice for speech synthesis requests
    pub voice: Option<String>,
}

impl RenderedPrompt {
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }
}

impl PromptDefinition {
    pub const fn new(name: &'static str, template: &'static str) -> Self {
        Self {
            name,
            system: None,
            template,
            config: PromptConfig {
                safety_settings: &[],
                modalities: &[],
            },
        }
    }

    pub const fn with_system(mut self, system: &'static str) -> Self {
        self.system = Some(system);
        self
    }

    pub const fn with_config(mut self, config: PromptConfig) -> Self {
        self.config = config;
        self
    }

    /// Validate `input` against its contract and render both templates.
    pub fn render<I: Contract>(&self, input: &I) -> Result<RenderedPrompt, ApiError> {
        let value = encode(input)?;
        let system = self
            .system
            .map(|system| template::render(system, &value))
            .transpose()?;
        let user = template::render(self.template, &value)?;
        Ok(RenderedPrompt {
            name: self.name,
            system,
            user,
            config: self.config,
            voice: None,
        })
    }
}
