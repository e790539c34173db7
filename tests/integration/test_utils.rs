//! Shared test utilities for integration tests
//!
//! Builds [`Pipelines`] over a [`MockBackend`] with a virtual clock, and serializes
//! access to process environment variables for configuration tests.

use serde_json::{json, Value};
use std::sync::{Arc, Mutex, MutexGuard};
use studyforge::config::PipelineConfig;
use studyforge::pipelines::Pipelines;
use studyforge::provider::{GenerationClient, GenerationRequest, MockBackend, MockReply};
use studyforge::throttle::ManualClock;

/// Global mutex to serialize environment variable access across tests
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Pipelines wired to `backend`, paced by a manual clock
pub struct Harness {
    pub pipelines: Pipelines,
    pub backend: Arc<MockBackend>,
    pub clock: Arc<ManualClock>,
}

impl Harness {
    pub fn new(backend: MockBackend) -> Self {
        Self::with_config(backend, PipelineConfig::default())
    }

    pub fn with_config(backend: MockBackend, config: PipelineConfig) -> Self {
        let backend = Arc::new(backend);
        let clock = Arc::new(ManualClock::new());
        let pipelines = Pipelines::new(GenerationClient::new(backend.clone()), config)
            .with_clock(clock.clone());
        Self {
            pipelines,
            backend,
            clock,
        }
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self::new(MockBackend::scripted(replies))
    }

    pub fn handled<F>(handler: F) -> Self
    where
        F: Fn(&GenerationRequest) -> MockReply + Send + Sync + 'static,
    {
        Self::new(MockBackend::with_handler(handler))
    }

    /// Requests that asked for an image
    pub fn image_calls(&self) -> Vec<GenerationRequest> {
        self.backend
            .calls()
            .into_iter()
            .filter(|call| call.role == studyforge::provider::ModelRole::Image)
            .collect()
    }
}

/// Slide JSON as the backend would return it
pub fn slide_json(title: &str, image_prompt: Option<&str>) -> Value {
    let mut slide = json!({
        "title": title,
        "content": [format!("{} point", title)],
        "speakerNotes": format!("Talk about {}", title),
    });
    if let Some(prompt) = image_prompt {
        slide["imagePrompt"] = json!(prompt);
    }
    slide
}

/// Lock the environment for the duration of a test
pub fn lock_env() -> MutexGuard<'static, ()> {
    ENV_MUTEX.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Set variables for the life of the guard, restoring previous values on drop
pub struct EnvGuard {
    saved: Vec<(String, Option<String>)>,
}

impl EnvGuard {
    pub fn new() -> Self {
        Self { saved: Vec::new() }
    }

    pub fn set(&mut self, key: &str, value: &str) {
        self.saved.push((key.to_string(), std::env::var(key).ok()));
        std::env::set_var(key, value);
    }

    pub fn remove(&mut self, key: &str) {
        self.saved.push((key.to_string(), std::env::var(key).ok()));
        std::env::remove_var(key);
    }
}

impl Drop for EnvGuard {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..).rev() {
            match value {
                Some(v) => std::env::set_var(&key, v),
                None => std::env::remove_var(&key),
            }
        }
    }
}
