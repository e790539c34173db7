//! Flow Runtime
//!
//! A flow is a named, schema-typed unit of work: validated input in, validated output out,
//! with exactly one generation step in between. Each invocation walks the state machine
//!
//! ```text
//! Pending -> InputValidated -> Generated -> OutputValidated -> Completed
//! ```
//!
//! and drops to `Failed` from any non-terminal state. There are no retries at this layer.
//!
//! Flows are compile-time values (see [`FlowId`] and the constants in
//! [`crate::pipelines`]); there is no name-keyed registry.

use crate::error::ApiError;
use crate::pipelines::{
    code_execution, code_practice, math_tutor, narration, notes, presentation, security, tutor,
};
use crate::prompt::PromptDefinition;
use crate::provider::{AssetRef, GenerationClient, Modality};
use crate::schema::{encode, Contract, FieldType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::marker::PhantomData;
use tracing::{debug, error};

/// Per-invocation lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlowState {
    Pending,
    InputValidated,
    Generated,
    OutputValidated,
    Completed,
    Failed,
}

impl FlowState {
    pub fn is_terminal(self) -> bool {
        matches!(self, FlowState::Completed | FlowState::Failed)
    }

    pub fn can_advance_to(self, next: FlowState) -> bool {
        use FlowState::*;
        match (self, next) {
            (Pending, InputValidated)
            | (InputValidated, Generated)
            | (Generated, OutputValidated)
            | (OutputValidated, Completed) => true,
            (from, Failed) => !from.is_terminal(),
            _ => false,
        }
    }
}

impl fmt::Display for FlowState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            FlowState::Pending => "pending",
            FlowState::InputValidated => "input_validated",
            FlowState::Generated => "generated",
            FlowState::OutputValidated => "output_validated",
            FlowState::Completed => "completed",
            FlowState::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Identifier of every flow the crate defines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum FlowId {
    Tutor,
    MathTutor,
    SecurityCheck,
    CodePractice,
    CodeExecution,
    NotesContent,
    NotesImage,
    PresentationContent,
    SlideImage,
    Narration,
}

impl FlowId {
    pub const ALL: [FlowId; 10] = [
        FlowId::Tutor,
        FlowId::MathTutor,
        FlowId::SecurityCheck,
        FlowId::CodePractice,
        FlowId::CodeExecution,
        FlowId::NotesContent,
        FlowId::NotesImage,
        FlowId::PresentationContent,
        FlowId::SlideImage,
        FlowId::Narration,
    ];

    pub fn name(self) -> &'static str {
        match self {
            FlowId::Tutor => "tutor",
            FlowId::MathTutor => "math-tutor",
            FlowId::SecurityCheck => "security-check",
            FlowId::CodePractice => "code-practice",
            FlowId::CodeExecution => "code-execution",
            FlowId::NotesContent => "notes-content",
            FlowId::NotesImage => "notes-image",
            FlowId::PresentationContent => "presentation-content",
            FlowId::SlideImage => "slide-image",
            FlowId::Narration => "narration",
        }
    }
}

impl fmt::Display for FlowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A statically typed flow
#[async_trait]
pub trait Flow: Send + Sync {
    type Input: Contract;
    type Output: Contract;

    fn id(&self) -> FlowId;

    /// The generation step. Input has already been validated.
    async fn generate(
        &self,
        client: &GenerationClient,
        input: &Self::Input,
    ) -> Result<Self::Output, ApiError>;
}

/// Flow backed by one structured-generation prompt
pub struct PromptFlow<I, O> {
    id: FlowId,
    prompt: PromptDefinition,
    _contract: PhantomData<fn(I) -> O>,
}

impl<I, O> PromptFlow<I, O> {
    pub const fn new(id: FlowId, prompt: PromptDefinition) -> Self {
        Self {
            id,
            prompt,
            _contract: PhantomData,
        }
    }

    pub fn prompt(&self) -> &PromptDefinition {
        &self.prompt
    }
}

#[async_trait]
impl<I: Contract, O: Contract> Flow for PromptFlow<I, O> {
    type Input = I;
    type Output = O;

    fn id(&self) -> FlowId {
        self.id
    }

    async fn generate(&self, client: &GenerationClient, input: &I) -> Result<O, ApiError> {
        let rendered = self.prompt.render(input)?;
        client.generate_structured(&rendered).await
    }
}

/// Output of every asset flow: one opaque media reference
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetOutput {
    pub media: AssetRef,
}

impl Contract for AssetOutput {
    fn schema() -> Schema {
        Schema::new("AssetOutput").field(
            "media",
            FieldType::String,
            "The generated media as a data URI.",
        )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.media.as_str().is_empty().then_some("media")
    }
}

/// Flow backed by one asset-generation prompt
pub struct AssetFlow<I> {
    id: FlowId,
    prompt: PromptDefinition,
    _contract: PhantomData<fn(I)>,
}

impl<I> AssetFlow<I> {
    pub const fn new(id: FlowId, prompt: PromptDefinition) -> Self {
        Self {
            id,
            prompt,
            _contract: PhantomData,
        }
    }

    pub fn prompt(&self) -> &PromptDefinition {
        &self.prompt
    }
}

#[async_trait]
impl<I: Contract> Flow for AssetFlow<I> {
    type Input = I;
    type Output = AssetOutput;

    fn id(&self) -> FlowId {
        self.id
    }

    async fn generate(&self, client: &GenerationClient, input: &I) -> Result<AssetOutput, ApiError> {
        let rendered = self.prompt.render(input)?;
        let modalities: &[Modality] = if self.prompt.config.modalities.is_empty() {
            &[Modality::Text, Modality::Image]
        } else {
            self.prompt.config.modalities
        };
        let media = client.generate_asset(&rendered, modalities).await?;
        Ok(AssetOutput { media })
    }
}

/// Result of a traced invocation
#[derive(Debug)]
pub struct FlowRun<T> {
    pub result: Result<T, ApiError>,
    /// Every state visited, starting with `Pending`
    pub states: Vec<FlowState>,
}

struct Transitions {
    flow: FlowId,
    states: Vec<FlowState>,
}

impl Transitions {
    fn new(flow: FlowId) -> Self {
        debug!(flow = %flow, state = %FlowState::Pending, "Flow started");
        Self {
            flow,
            states: vec![FlowState::Pending],
        }
    }

    fn current(&self) -> FlowState {
        self.states.last().copied().unwrap_or(FlowState::Pending)
    }

    fn advance(&mut self, next: FlowState) {
        let from = self.current();
        debug_assert!(from.can_advance_to(next), "illegal transition {from} -> {next}");
        debug!(flow = %self.flow, from = %from, to = %next, "Flow transition");
        self.states.push(next);
    }

    fn fail(&mut self, err: &ApiError) {
        let from = self.current();
        error!(flow = %self.flow, from = %from, error = %err, "Flow failed");
        self.advance(FlowState::Failed);
    }
}

/// Executes flows against one generation client
#[derive(Clone)]
pub struct FlowRuntime {
    client: GenerationClient,
}

impl FlowRuntime {
    pub fn new(client: GenerationClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &GenerationClient {
        &self.client
    }

    /// Run one invocation of `flow`.
    pub async fn run<F: Flow>(&self, flow: &F, input: &F::Input) -> Result<F::Output, ApiError> {
        self.run_traced(flow, input).await.result
    }

    /// Run one invocation and keep the visited states.
    pub async fn run_traced<F: Flow>(&self, flow: &F, input: &F::Input) -> FlowRun<F::Output> {
        let mut transitions = Transitions::new(flow.id());
        let result = self.execute(flow, input, &mut transitions).await;
        if let Err(err) = &result {
            transitions.fail(err);
        }
        FlowRun {
            result,
            states: transitions.states,
        }
    }

    async fn execute<F: Flow>(
        &self,
        flow: &F,
        input: &F::Input,
        transitions: &mut Transitions,
    ) -> Result<F::Output, ApiError> {
        encode(input)?;
        transitions.advance(FlowState::InputValidated);

        let output = flow.generate(&self.client, input).await?;
        transitions.advance(FlowState::Generated);

        encode(&output)?;
        if let Some(field) = output.empty_primary_field() {
            return Err(ApiError::EmptyResult {
                flow: flow.id().name(),
                field,
            });
        }
        transitions.advance(FlowState::OutputValidated);

        transitions.advance(FlowState::Completed);
        Ok(output)
    }
}

/// Static description of one flow
#[derive(Debug, Clone)]
pub struct FlowDescriptor {
    pub id: FlowId,
    pub input_schema: Schema,
    pub output_schema: Schema,
}

impl FlowDescriptor {
    pub fn of<F: Flow>(flow: &F) -> Self {
        Self {
            id: flow.id(),
            input_schema: F::Input::schema(),
            output_schema: F::Output::schema(),
        }
    }

    pub fn name(&self) -> &'static str {
        self.id.name()
    }
}

/// Every flow the crate defines, in [`FlowId::ALL`] order
pub fn catalog() -> Vec<FlowDescriptor> {
    vec![
        FlowDescriptor::of(&tutor::TUTOR_FLOW),
        FlowDescriptor::of(&math_tutor::MATH_TUTOR_FLOW),
        FlowDescriptor::of(&security::SECURITY_CHECK_FLOW),
        FlowDescriptor::of(&code_practice::CODE_PRACTICE_FLOW),
        FlowDescriptor::of(&code_execution::CODE_EXECUTION_FLOW),
        FlowDescriptor::of(&notes::NOTES_CONTENT_FLOW),
        FlowDescriptor::of(&notes::NOTES_IMAGE_FLOW),
        FlowDescriptor::of(&presentation::PRESENTATION_CONTENT_FLOW),
        FlowDescriptor::of(&presentation::SLIDE_IMAGE_FLOW),
        FlowDescriptor::of(&narration::NarrationFlow),
    ]
}
