//! Generation Client
//!
//! Sole point of contact with the generative-AI backend. [`GenerationClient`] offers two
//! operations: structured text generation (prompt → schema-conformant object) and asset
//! generation (prompt → opaque asset reference). Transport lives behind the
//! [`ModelBackend`] trait so pipelines can run against Gemini or a scripted mock.

use crate::config::{BackendConfig, BackendKind};
use crate::error::ApiError;
use crate::prompt::RenderedPrompt;
use crate::schema::{decode, Contract};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info};

pub mod gemini;
pub mod mock;

pub use gemini::GeminiBackend;
pub use mock::{MockBackend, MockReply};

/// Response modality requested from the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Modality {
    Text,
    Image,
    Audio,
}

/// Content-safety category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HarmCategory {
    #[serde(rename = "HARM_CATEGORY_DANGEROUS_CONTENT")]
    DangerousContent,
    #[serde(rename = "HARM_CATEGORY_HARASSMENT")]
    Harassment,
    #[serde(rename = "HARM_CATEGORY_HATE_SPEECH")]
    HateSpeech,
    #[serde(rename = "HARM_CATEGORY_SEXUALLY_EXPLICIT")]
    SexuallyExplicit,
}

/// Content-safety blocking threshold
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HarmBlockThreshold {
    BlockLowAndAbove,
    BlockMediumAndAbove,
    BlockOnlyHigh,
    BlockNone,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SafetySetting {
    pub category: HarmCategory,
    pub threshold: HarmBlockThreshold,
}

/// Which configured model serves a request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelRole {
    Text,
    Image,
    Speech,
}

/// Ephemeral request handed to a backend; owned by the call that creates it.
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationRequest {
    pub prompt_name: String,
    pub system: Option<String>,
    pub user: String,
    pub role: ModelRole,
    /// JSON response schema for structured generation
    pub response_schema: Option<Value>,
    pub modalities: Vec<Modality>,
    pub safety_settings: Vec<SafetySetting>,
    pub voice: Option<String>,
}

/// Inline binary part returned by the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineMedia {
    pub mime_type: String,
    /// Base64 payload as delivered on the wire
    pub data: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: Option<String>,
    pub media: Vec<InlineMedia>,
}

/// Opaque reference to a generated asset: a `data:` URI
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetRef(String);

impl AssetRef {
    pub fn from_media(media: &InlineMedia) -> Self {
        AssetRef(format!("data:{};base64,{}", media.mime_type, media.data))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// MIME type embedded in the data URI, if well formed
    pub fn mime_type(&self) -> Option<&str> {
        self.0
            .strip_prefix("data:")
            .and_then(|rest| rest.split(';').next())
            .filter(|mime| !mime.is_empty())
    }
}

impl fmt::Display for AssetRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Backend transport trait
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Perform one round trip to the backend
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ApiError>;

    /// Get the backend name
    fn backend_name(&self) -> &str;

    /// Get the model serving the given role
    fn model_name(&self, role: ModelRole) -> &str;
}

/// Creates backends from configuration
pub struct ProviderFactory;

impl ProviderFactory {
    pub fn create_backend(config: &BackendConfig) -> Result<Arc<dyn ModelBackend>, ApiError> {
        match config.kind {
            BackendKind::Gemini => Ok(Arc::new(GeminiBackend::from_config(config)?)),
            BackendKind::Mock => Ok(Arc::new(MockBackend::canned())),
        }
    }
}

/// Strip a markdown code fence some models wrap around JSON answers.
fn extract_json(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

/// Client over a model backend. Cheap to clone.
#[derive(Clone)]
pub struct GenerationClient {
    backend: Arc<dyn ModelBackend>,
}

impl GenerationClient {
    pub fn new(backend: Arc<dyn ModelBackend>) -> Self {
        Self { backend }
    }

    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        Ok(Self::new(ProviderFactory::create_backend(config)?))
    }

    pub fn backend_name(&self) -> &str {
        self.backend.backend_name()
    }

    /// Invoke the backend once and parse its answer as `T`.
    ///
    /// Fails with [`ApiError::Generation`] when the response has no text, is not JSON, or
    /// does not conform to `T`'s schema. No retry.
    pub async fn generate_structured<T: Contract>(&self, prompt: &RenderedPrompt) -> Result<T, ApiError> {
        let schema = T::schema();
        let request = GenerationRequest {
            prompt_name: prompt.name.to_string(),
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            role: ModelRole::Text,
            response_schema: Some(schema.to_json_schema()),
            modalities: Vec::new(),
            safety_settings: prompt.config.safety_settings.to_vec(),
            voice: None,
        };

        debug!(
            prompt = prompt.name,
            backend = self.backend.backend_name(),
            model = self.backend.model_name(ModelRole::Text),
            "Requesting structured generation"
        );
        let response = self.backend.generate(request).await?;

        let text = response
            .text
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ApiError::Generation(format!("{}: backend returned no text", prompt.name)))?;
        let value: Value = serde_json::from_str(extract_json(&text)).map_err(|e| {
            ApiError::Generation(format!("{}: response is not valid JSON: {}", prompt.name, e))
        })?;

        decode::<T>(value).map_err(|e| match e {
            ApiError::Validation(err) => ApiError::Generation(format!(
                "{}: response does not match schema: {}",
                prompt.name, err
            )),
            other => other,
        })
    }

    /// Invoke the backend requesting a binary asset and return a reference to the first one.
    pub async fn generate_asset(
        &self,
        prompt: &RenderedPrompt,
        modalities: &[Modality],
    ) -> Result<AssetRef, ApiError> {
        let role = if modalities.contains(&Modality::Audio) {
            ModelRole::Speech
        } else {
            ModelRole::Image
        };
        let request = GenerationRequest {
            prompt_name: prompt.name.to_string(),
            system: prompt.system.clone(),
            user: prompt.user.clone(),
            role,
            response_schema: None,
            modalities: modalities.to_vec(),
            safety_settings: prompt.config.safety_settings.to_vec(),
            voice: prompt.voice.clone(),
        };

        info!(
            prompt = prompt.name,
            backend = self.backend.backend_name(),
            model = self.backend.model_name(role),
            "Requesting asset generation"
        );
        let response = self.backend.generate(request).await?;

        response
            .media
            .first()
            .map(AssetRef::from_media)
            .ok_or_else(|| ApiError::Generation(format!("{}: backend returned no media", prompt.name)))
    }
}
