//! Coding exercise generation.
//!
//! The prompt carries its own safety instruction. An unsafe topic is not an error: the
//! backend answers with [`REFUSAL`] and no test cases.

use super::Pipelines;
use crate::error::ApiError;
use crate::flow::{FlowId, PromptFlow};
use crate::prompt::{PromptConfig, PromptDefinition};
use crate::provider::{HarmBlockThreshold, HarmCategory, SafetySetting};
use crate::schema::{Contract, FieldType, Schema};
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const REFUSAL: &str =
    "Due to security concerns, I cannot generate an exercise for the provided topic.";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodePracticeInput {
    pub topic: String,
}

impl Contract for CodePracticeInput {
    fn schema() -> Schema {
        Schema::new("CodePracticeInput").field(
            "topic",
            FieldType::String,
            "The coding topic for which to generate an exercise.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodePracticeOutput {
    pub exercise: String,
    pub test_cases: Vec<String>,
}

impl CodePracticeOutput {
    /// True when the backend declined the topic.
    pub fn is_refusal(&self) -> bool {
        self.exercise.trim() == REFUSAL && self.test_cases.is_empty()
    }
}

impl Contract for CodePracticeOutput {
    fn schema() -> Schema {
        Schema::new("CodePracticeOutput")
            .field(
                "exercise",
                FieldType::String,
                "The generated coding exercise.",
            )
            .field(
                "testCases",
                FieldType::array(FieldType::String),
                "Example test cases for the exercise.",
            )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.exercise.is_empty().then_some("exercise")
    }
}

const SYSTEM: &str = r#"You are an expert coding exercise generator. Given a topic, you will generate a coding exercise and a set of test cases.

You must not generate an exercise for any topic that could be interpreted as a security risk, such as prompts containing SQL, script tags, or shell commands.
If the topic is unsafe, you MUST respond with an exercise field saying "Due to security concerns, I cannot generate an exercise for the provided topic." and an empty testCases array.
Otherwise, generate the coding exercise and test cases.
"#;

const EXERCISE_TEMPLATE: &str = r#"Generate a coding exercise for the following topic: {{{topic}}}.

Your response must be in JSON format.
The "exercise" field must contain the problem statement in plain text only. Do not include any markdown, formatting, or special symbols.
The "testCases" field must be an array of strings. Each string must be a test case in plain text, without any extra formatting or symbols.
"#;

const SAFETY: &[SafetySetting] = &[SafetySetting {
    category: HarmCategory::DangerousContent,
    threshold: HarmBlockThreshold::BlockOnlyHigh,
}];

pub const CODE_PRACTICE_FLOW: PromptFlow<CodePracticeInput, CodePracticeOutput> =
    PromptFlow::new(
        FlowId::CodePractice,
        PromptDefinition::new("codingExercise", EXERCISE_TEMPLATE)
            .with_system(SYSTEM)
            .with_config(PromptConfig {
                safety_settings: SAFETY,
                modalities: &[],
            }),
    );

impl Pipelines {
    /// Generate a practice exercise with test cases for `input.topic`.
    pub async fn code_practice(
        &self,
        input: &CodePracticeInput,
    ) -> Result<CodePracticeOutput, ApiError> {
        let output = self.runtime.run(&CODE_PRACTICE_FLOW, input).await?;
        if output.is_refusal() {
            warn!(flow = %FlowId::CodePractice, "Backend refused the exercise topic");
        }
        Ok(output)
    }
}
