//! Gemini `generateContent` backend.

use super::{
    GenerationRequest, GenerationResponse, InlineMedia, Modality, ModelBackend, ModelRole,
    SafetySetting,
};
use crate::config::BackendConfig;
use crate::error::ApiError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

const GEMINI_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Content {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    #[serde(default)]
    parts: Vec<Part>,
}

/// Variant order matters for untagged decoding.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PrebuiltVoiceConfig {
    voice_name: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct VoiceConfig {
    prebuilt_voice_config: PrebuiltVoiceConfig,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SpeechConfig {
    voice_config: VoiceConfig,
}

#[derive(Debug, Default, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    response_mime_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_schema: Option<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    response_modalities: Vec<Modality>,
    #[serde(skip_serializing_if = "Option::is_none")]
    speech_config: Option<SpeechConfig>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentRequest {
    contents: Vec<Content>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<Content>,
    generation_config: GenerationConfig,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    safety_settings: Vec<SafetySetting>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

fn text_content(role: Option<&str>, text: &str) -> Content {
    Content {
        role: role.map(str::to_string),
        parts: vec![Part::Text {
            text: text.to_string(),
        }],
    }
}

fn build_request_body(request: GenerationRequest) -> GenerateContentRequest {
    let response_mime_type = request
        .response_schema
        .as_ref()
        .map(|_| "application/json".to_string());
    let speech_config = request.voice.map(|voice_name| SpeechConfig {
        voice_config: VoiceConfig {
            prebuilt_voice_config: PrebuiltVoiceConfig { voice_name },
        },
    });

    GenerateContentRequest {
        contents: vec![text_content(Some("user"), &request.user)],
        system_instruction: request.system.as_deref().map(|s| text_content(None, s)),
        generation_config: GenerationConfig {
            response_mime_type,
            response_schema: request.response_schema,
            response_modalities: request.modalities,
            speech_config,
        },
        safety_settings: request.safety_settings,
    }
}

fn collect_response(response: GenerateContentResponse) -> Result<GenerationResponse, ApiError> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|f| f.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ApiError::Generation(format!("Backend returned no content: {}", reason)));
    };

    let mut out = GenerationResponse::default();
    for part in candidate.content.map(|c| c.parts).unwrap_or_default() {
        match part {
            Part::Text { text } => out.text.get_or_insert_with(String::new).push_str(&text),
            Part::InlineData { inline_data } => out.media.push(InlineMedia {
                mime_type: inline_data.mime_type,
                data: inline_data.data,
            }),
            Part::Other(_) => {}
        }
    }
    Ok(out)
}

fn map_http_error(error: reqwest::Error) -> ApiError {
    if let Some(status) = error.status() {
        ApiError::Generation(format!("Request failed with status {}: {}", status, error))
    } else if error.is_timeout() {
        ApiError::Generation(format!("Request timeout: {}", error))
    } else if error.is_connect() {
        ApiError::Generation(format!("Connection error: {}", error))
    } else {
        ApiError::Generation(format!("HTTP error: {}", error))
    }
}

/// Gemini REST client
pub struct GeminiBackend {
    client: Client,
    endpoint: String,
    api_key: String,
    text_model: String,
    image_model: String,
    speech_model: String,
}

impl GeminiBackend {
    pub fn from_config(config: &BackendConfig) -> Result<Self, ApiError> {
        let api_key = config
            .api_key
            .clone()
            .filter(|k| !k.is_empty())
            .ok_or_else(|| ApiError::ConfigError("Gemini backend requires an API key".to_string()))?;
        let client = Client::builder()
            .connect_timeout(GEMINI_CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| ApiError::ConfigError(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            api_key,
            text_model: config.model.clone(),
            image_model: config.image_model.clone(),
            speech_model: config.speech_model.clone(),
        })
    }
}

#[async_trait]
impl ModelBackend for GeminiBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ApiError> {
        let model = self.model_name(request.role).to_string();
        let url = format!("{}/models/{}:generateContent", self.endpoint, model);
        let prompt_name = request.prompt_name.clone();
        let body = build_request_body(request);

        debug!(prompt = %prompt_name, model = %model, "Sending generateContent request");
        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(map_http_error)?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ApiError::Generation(format!(
                "Request failed with status {}: {}",
                status, error_text
            )));
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ApiError::Generation(format!("Failed to parse response: {}", e)))?;
        collect_response(parsed)
    }

    fn backend_name(&self) -> &str {
        "gemini"
    }

    fn model_name(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Text => &self.text_model,
            ModelRole::Image => &self.image_model,
            ModelRole::Speech => &self.speech_model,
        }
    }
}
