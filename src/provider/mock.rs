//! Scripted backend for tests and offline runs.
//!
//! Replies come either from a script consumed in call order or from a handler that
//! inspects each request. Every request is recorded so callers can assert on what
//! reached the backend.

use super::{GenerationRequest, GenerationResponse, InlineMedia, ModelBackend, ModelRole};
use crate::error::ApiError;
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::VecDeque;

/// 1x1 transparent PNG
const PLACEHOLDER_PNG: &str =
    "iVBORw0KGgoAAAANSUhEUgAAAAEAAAABCAYAAAAfFcSJAAAADUlEQVR42mNkYPhfDwAChwGA60e6kgAAAABJRU5ErkJggg==";

/// One scripted backend answer
#[derive(Debug, Clone, PartialEq)]
pub enum MockReply {
    /// Text part carrying the serialized JSON value
    Json(Value),
    Text(String),
    Media { mime_type: String, data: String },
    /// Transport-level failure with this message
    Fail(String),
    /// Successful round trip with no usable content
    Empty,
}

impl MockReply {
    pub fn json(value: Value) -> Self {
        MockReply::Json(value)
    }

    pub fn image(data: &str) -> Self {
        MockReply::Media {
            mime_type: "image/png".to_string(),
            data: data.to_string(),
        }
    }

    pub fn audio(data: &str) -> Self {
        MockReply::Media {
            mime_type: "audio/wav".to_string(),
            data: data.to_string(),
        }
    }

    pub fn fail(message: &str) -> Self {
        MockReply::Fail(message.to_string())
    }

    fn into_response(self) -> Result<GenerationResponse, ApiError> {
        match self {
            MockReply::Json(value) => Ok(GenerationResponse {
                text: Some(value.to_string()),
                media: Vec::new(),
            }),
            MockReply::Text(text) => Ok(GenerationResponse {
                text: Some(text),
                media: Vec::new(),
            }),
            MockReply::Media { mime_type, data } => Ok(GenerationResponse {
                text: None,
                media: vec![InlineMedia { mime_type, data }],
            }),
            MockReply::Fail(message) => Err(ApiError::Generation(message)),
            MockReply::Empty => Ok(GenerationResponse::default()),
        }
    }
}

type Handler = dyn Fn(&GenerationRequest) -> MockReply + Send + Sync;

/// Mock model backend
pub struct MockBackend {
    script: Mutex<VecDeque<MockReply>>,
    handler: Option<Box<Handler>>,
    calls: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    /// Replies are consumed in call order; an exhausted script fails the call.
    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            script: Mutex::new(replies.into()),
            handler: None,
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Replies are computed per request.
    pub fn with_handler<F>(handler: F) -> Self
    where
        F: Fn(&GenerationRequest) -> MockReply + Send + Sync + 'static,
    {
        Self {
            script: Mutex::new(VecDeque::new()),
            handler: Some(Box::new(handler)),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Schema-shaped sample answers for every request; used for offline runs.
    pub fn canned() -> Self {
        Self::with_handler(|request| match request.role {
            ModelRole::Text => match &request.response_schema {
                Some(schema) => MockReply::Json(sample_from_schema(schema, "value")),
                None => MockReply::Text("Sample response".to_string()),
            },
            ModelRole::Image => MockReply::image(PLACEHOLDER_PNG),
            ModelRole::Speech => MockReply::audio("UklGRiQAAABXQVZF"),
        })
    }

    pub fn calls(&self) -> Vec<GenerationRequest> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }
}

const ERROR_FIELD: &str = "error";

/// Build a value that satisfies a rendered response schema.
fn sample_from_schema(schema: &Value, name: &str) -> Value {
    match schema.get("type").and_then(Value::as_str) {
        Some("STRING") => json!(format!("Sample {}", name)),
        Some("BOOLEAN") => json!(false),
        Some("INTEGER") => json!(1),
        Some("NUMBER") => json!(1.0),
        Some("ARRAY") => {
            let item = schema
                .get("items")
                .map(|items| sample_from_schema(items, name))
                .unwrap_or(Value::Null);
            json!([item])
        }
        Some("OBJECT") => {
            let required: Vec<&str> = schema
                .get("required")
                .and_then(Value::as_array)
                .map(|names| names.iter().filter_map(Value::as_str).collect())
                .unwrap_or_default();
            let mut obj = Map::new();
            if let Some(Value::Object(properties)) = schema.get("properties") {
                for (key, prop) in properties {
                    // an optional error channel stays absent so samples read as success
                    if key == ERROR_FIELD && !required.contains(&key.as_str()) {
                        continue;
                    }
                    obj.insert(key.clone(), sample_from_schema(prop, key));
                }
            }
            Value::Object(obj)
        }
        _ => Value::Null,
    }
}

#[async_trait]
impl ModelBackend for MockBackend {
    async fn generate(&self, request: GenerationRequest) -> Result<GenerationResponse, ApiError> {
        self.calls.lock().push(request.clone());

        let reply = match &self.handler {
            Some(handler) => handler(&request),
            None => self
                .script
                .lock()
                .pop_front()
                .unwrap_or_else(|| MockReply::fail("mock script exhausted")),
        };
        reply.into_response()
    }

    fn backend_name(&self) -> &str {
        "mock"
    }

    fn model_name(&self, role: ModelRole) -> &str {
        match role {
            ModelRole::Text => "mock-text",
            ModelRole::Image => "mock-image",
            ModelRole::Speech => "mock-speech",
        }
    }
}
