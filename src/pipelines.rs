//! Pipeline Composers
//!
//! One async operation per flow on [`Pipelines`]. Single-step composers wrap one flow
//! invocation; notes and presentations chain a text flow to dependent asset flows.
//!
//! Failures the user can act on (validation, generation, empty results) come back from the
//! tutors and code execution as data in the output's `error` field. Everything else,
//! and every failure from composers whose contract has no `error` field, travels up the
//! `Err` channel.

use crate::config::{PipelineConfig, StudioConfig};
use crate::error::ApiError;
use crate::flow::{FlowId, FlowRuntime};
use crate::provider::GenerationClient;
use crate::schema::{Contract, FieldType, Schema};
use crate::throttle::{Clock, TokioClock};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{error, warn};

pub mod code_execution;
pub mod code_practice;
pub mod math_tutor;
pub mod narration;
pub mod notes;
pub mod presentation;
pub mod security;
pub mod tutor;

pub use code_execution::{CodeExecutionInput, CodeExecutionOutput, TestCaseResult};
pub use code_practice::{CodePracticeInput, CodePracticeOutput};
pub use math_tutor::{MathTutorInput, MathTutorOutput};
pub use narration::{NarrationInput, DEFAULT_VOICE};
pub use notes::{NotesDocument, NotesInput};
pub use presentation::{IllustratedPresentation, Presentation, PresentationInput, Slide};
pub use security::{SecurityCheckInput, SecurityCheckOutput};
pub use tutor::{TutorInput, TutorOutput};

/// Shown when the backend reports it is overloaded
pub const OVERLOADED_MESSAGE: &str =
    "The AI model is temporarily overloaded. Please try again in a few moments.";

/// Category of a failure reported through an output's `error` field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Backend overloaded; retrying later may succeed
    Overloaded,
    /// Backend answered with an empty primary field
    Empty,
    /// Any other failure
    Failed,
}

impl ErrorKind {
    pub fn is_retryable(self) -> bool {
        self == ErrorKind::Overloaded
    }
}

/// Composer-specific wording for reportable failures
pub(crate) struct FailureMessages {
    pub failed: &'static str,
    pub empty: &'static str,
}

impl FailureMessages {
    pub(crate) fn classify(&self, message: &str) -> ErrorKind {
        if message == OVERLOADED_MESSAGE {
            ErrorKind::Overloaded
        } else if message == self.empty {
            ErrorKind::Empty
        } else {
            ErrorKind::Failed
        }
    }

    /// Turn a flow failure into a user-facing message, or hand it back if it is not
    /// something to report as data.
    pub(crate) fn report(&self, flow: FlowId, err: ApiError) -> Result<&'static str, ApiError> {
        if !err.is_reportable() {
            return Err(err);
        }
        let message = if err.is_overloaded() {
            warn!(flow = %flow, error = %err, "Backend overloaded");
            OVERLOADED_MESSAGE
        } else if matches!(err, ApiError::EmptyResult { .. }) {
            warn!(flow = %flow, "Backend returned an empty result");
            self.empty
        } else {
            error!(flow = %flow, error = %err, "Generation failed");
            self.failed
        };
        Ok(message)
    }
}

/// Prompt for a single generated image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImagePrompt {
    pub prompt: String,
}

impl Contract for ImagePrompt {
    fn schema() -> Schema {
        Schema::new("ImagePrompt").field(
            "prompt",
            FieldType::String,
            "What the generated image should show.",
        )
    }
}

/// Entry point for every composer. Cheap to clone.
#[derive(Clone)]
pub struct Pipelines {
    runtime: FlowRuntime,
    config: PipelineConfig,
    clock: Arc<dyn Clock>,
}

impl Pipelines {
    pub fn new(client: GenerationClient, config: PipelineConfig) -> Self {
        Self {
            runtime: FlowRuntime::new(client),
            config,
            clock: Arc::new(TokioClock::new()),
        }
    }

    /// Build the client from configuration and wire it into every composer.
    pub fn from_config(config: &StudioConfig) -> Result<Self, ApiError> {
        let client = GenerationClient::from_config(&config.backend)?;
        Ok(Self::new(client, config.pipeline.clone()))
    }

    /// Replace the clock driving presentation image pacing
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn runtime(&self) -> &FlowRuntime {
        &self.runtime
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }
}
