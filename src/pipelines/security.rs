//! Prompt injection screening. The verdict is entirely the backend's judgment.

use super::Pipelines;
use crate::error::ApiError;
use crate::flow::{FlowId, PromptFlow};
use crate::prompt::PromptDefinition;
use crate::schema::{Contract, FieldType, Schema};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityCheckInput {
    pub prompt: String,
}

impl Contract for SecurityCheckInput {
    fn schema() -> Schema {
        Schema::new("SecurityCheckInput").field(
            "prompt",
            FieldType::String,
            "The user-submitted prompt to check for security vulnerabilities.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SecurityCheckOutput {
    pub is_vulnerable: bool,
    pub reason: String,
}

impl Contract for SecurityCheckOutput {
    fn schema() -> Schema {
        Schema::new("SecurityCheckOutput")
            .field(
                "isVulnerable",
                FieldType::Boolean,
                "Whether the prompt is potentially vulnerable to code injection.",
            )
            .field(
                "reason",
                FieldType::String,
                "The reason why the prompt is considered vulnerable, or safe.",
            )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.reason.is_empty().then_some("reason")
    }
}

const SECURITY_TEMPLATE: &str = r#"You are a security expert analyzing user-submitted prompts for potential code injection vulnerabilities.

Analyze the following prompt and determine if it is potentially vulnerable to code injection attacks like SQL injection, cross-site scripting (XSS), or command injection.

Prompt: {{{prompt}}}

Respond with whether the prompt is vulnerable, and the reason for your determination. If the prompt is not vulnerable, the reason should explain why it is safe.

For example, if the prompt is '<script>alert("XSS")</script>', you should identify it as vulnerable because it contains a script tag.
If the prompt is 'binary search', you should identify it as safe because it's a standard algorithm topic.

The output should be in JSON format.
"#;

pub const SECURITY_CHECK_FLOW: PromptFlow<SecurityCheckInput, SecurityCheckOutput> =
    PromptFlow::new(
        FlowId::SecurityCheck,
        PromptDefinition::new("securityCheck", SECURITY_TEMPLATE),
    );

impl Pipelines {
    /// Ask the backend whether `input.prompt` looks like an injection attempt.
    pub async fn check_security(
        &self,
        input: &SecurityCheckInput,
    ) -> Result<SecurityCheckOutput, ApiError> {
        let verdict = self.runtime.run(&SECURITY_CHECK_FLOW, input).await?;
        info!(
            flow = %FlowId::SecurityCheck,
            vulnerable = verdict.is_vulnerable,
            "Security check complete"
        );
        Ok(verdict)
    }
}
