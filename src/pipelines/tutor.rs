//! General-topic tutor.

use super::{ErrorKind, FailureMessages, Pipelines};
use crate::error::ApiError;
use crate::flow::{FlowId, PromptFlow};
use crate::prompt::PromptDefinition;
use crate::schema::{Contract, FieldType, Schema};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Topics answered with [`IDENTITY_EXPLANATION`], compared after trimming and lowercasing
pub const IDENTITY_TOPICS: [&str; 3] = ["who are you", "pydah ai", "who developed you"];

pub const IDENTITY_EXPLANATION: &str = "I am PYDAH AI, an intelligent partner for productivity and learning on this website, developed at Pydah College of Engineering. I can help you master complex topics, practice coding, generate notes, and even create presentations. I'm here to support students, faculty, and administrators in their educational journey at Pydah College of Engineering.";

pub const FAILED_MESSAGE: &str = "An unexpected error occurred while generating the explanation.";
pub const EMPTY_MESSAGE: &str = "Failed to generate a valid explanation.";

const MESSAGES: FailureMessages = FailureMessages {
    failed: FAILED_MESSAGE,
    empty: EMPTY_MESSAGE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorInput {
    pub topic: String,
    pub language: String,
}

impl Contract for TutorInput {
    fn schema() -> Schema {
        Schema::new("TutorInput")
            .field(
                "topic",
                FieldType::String,
                "The educational topic or question to explain.",
            )
            .field(
                "language",
                FieldType::String,
                "The regional Indian language for the explanation.",
            )
    }
}

/// What the backend is asked for
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Explanation {
    pub explanation: String,
}

impl Contract for Explanation {
    fn schema() -> Schema {
        Schema::new("Explanation").field(
            "explanation",
            FieldType::String,
            "The explanation of the educational topic.",
        )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.explanation.is_empty().then_some("explanation")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TutorOutput {
    pub explanation: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl TutorOutput {
    fn answered(explanation: String) -> Self {
        Self {
            explanation,
            error: None,
        }
    }

    fn failed(message: &str) -> Self {
        Self {
            explanation: String::new(),
            error: Some(message.to_string()),
        }
    }

    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_deref().map(|message| MESSAGES.classify(message))
    }
}

impl Contract for TutorOutput {
    fn schema() -> Schema {
        Schema::new("TutorOutput")
            .field(
                "explanation",
                FieldType::String,
                "The explanation of the educational topic.",
            )
            .optional(
                "error",
                FieldType::String,
                "An error message if the generation failed.",
            )
    }
}

const EXPLANATION_TEMPLATE: &str = r#"You are an expert educator and AI Tutor. Your primary goal is to make complex topics simple, engaging, and highly understandable for students of all levels.

When explaining a topic, you must follow these principles:
1.  **Structure and Clarity**: Your explanation must be well-structured and comprehensive. Use the following sections to organize your response if the user query is a general topic. If the user asks a specific question, focus on answering that question directly and clearly.
    *   **Introduction**: Briefly introduce the topic and its importance.
    *   **Core Concepts**: Break down the main principles into simple, digestible points. Use analogies and real-world comparisons to clarify abstract ideas.
    *   **Advantages**: Clearly list the benefits or pros of the concept.
    *   **Disadvantages**: Honestly present the drawbacks or cons.
    *   **Real-World Applications**: Describe practical, everyday uses of the concept to make it relatable.
    *   **Illustrative Example**: Provide a step-by-step, real-time example that walks the user through the concept in action.

2.  **Address the Full Query**: You MUST address the complete user query. If they ask for a list, provide a list. If they ask for a comparison, provide a comparison.

3.  **Simple Language**: Avoid jargon where possible. If technical terms are necessary, explain them immediately in the simplest way.

4.  **Table Formatting for Comparisons**: If the user asks for differences or a comparison between two or more items, you MUST format the core comparison in a table. The table should be enclosed in [TABLE]...[/TABLE] tags. Inside, each row should be on a new line, and columns should be separated by a pipe '|'. Do not use markdown table formatting.
    Example:
    [TABLE]
    Feature | Python | Java
    Typing | Dynamic | Static
    Performance | Slower | Faster
    [/TABLE]

5.  **Formatting**: Your entire response must be in plain text. Do not use any other markdown formatting like '###', '-', '**', or "'''".

6.  **Language**: Always provide your full explanation in the specified language.

Topic/Question: {{{topic}}}
Language: {{{language}}}
"#;

pub const TUTOR_FLOW: PromptFlow<TutorInput, Explanation> = PromptFlow::new(
    FlowId::Tutor,
    PromptDefinition::new("tutorExplanation", EXPLANATION_TEMPLATE),
);

/// Fixed answer for identity questions, if `topic` is one.
pub fn identity_response(topic: &str) -> Option<TutorOutput> {
    let normalized = topic.trim().to_lowercase();
    IDENTITY_TOPICS
        .contains(&normalized.as_str())
        .then(|| TutorOutput::answered(IDENTITY_EXPLANATION.to_string()))
}

impl Pipelines {
    /// Explain a topic in the requested language.
    pub async fn tutor(&self, input: &TutorInput) -> Result<TutorOutput, ApiError> {
        if let Some(output) = identity_response(&input.topic) {
            info!(flow = %FlowId::Tutor, "Answered identity question locally");
            return Ok(output);
        }

        match self.runtime.run(&TUTOR_FLOW, input).await {
            Ok(generated) => Ok(TutorOutput::answered(generated.explanation)),
            Err(err) => MESSAGES.report(FlowId::Tutor, err).map(TutorOutput::failed),
        }
    }
}
