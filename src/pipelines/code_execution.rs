//! Simulated code execution.
//!
//! No interpreter runs here: the backend reads the code and judges each test case. A
//! failure that stops every test case comes back as the top-level `error`.

use super::{FailureMessages, Pipelines};
use crate::error::ApiError;
use crate::flow::{FlowId, PromptFlow};
use crate::prompt::PromptDefinition;
use crate::schema::{Contract, FieldType, Schema};
use serde::{Deserialize, Serialize};

pub const FAILED_MESSAGE: &str = "An unexpected error occurred while running the code.";
pub const EMPTY_MESSAGE: &str = "Failed to evaluate the code against the test cases.";

const MESSAGES: FailureMessages = FailureMessages {
    failed: FAILED_MESSAGE,
    empty: EMPTY_MESSAGE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CodeExecutionInput {
    pub code: String,
    pub test_cases: Vec<String>,
    pub language: String,
}

impl Contract for CodeExecutionInput {
    fn schema() -> Schema {
        Schema::new("CodeExecutionInput")
            .field("code", FieldType::String, "The user-submitted code to execute.")
            .field(
                "testCases",
                FieldType::array(FieldType::String),
                "The test cases to run the code against.",
            )
            .field(
                "language",
                FieldType::String,
                "The programming language of the code.",
            )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCaseResult {
    pub test_case: String,
    pub output: String,
    pub passed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<String>,
}

fn test_case_result_schema() -> Schema {
    Schema::new("TestCaseResult")
        .field("testCase", FieldType::String, "The test case that was run.")
        .field(
            "output",
            FieldType::String,
            "The output of the code for the given test case.",
        )
        .field(
            "passed",
            FieldType::Boolean,
            "Whether the code passed the test case.",
        )
        .optional(
            "expected",
            FieldType::String,
            "The expected output for the test case.",
        )
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CodeExecutionOutput {
    #[serde(default)]
    pub results: Vec<TestCaseResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl CodeExecutionOutput {
    pub fn all_passed(&self) -> bool {
        self.error.is_none() && !self.results.is_empty() && self.results.iter().all(|r| r.passed)
    }

    /// Reorder results to follow `test_cases`; results for unknown cases go last.
    fn align_to(&mut self, test_cases: &[String]) {
        let position = |result: &TestCaseResult| {
            test_cases
                .iter()
                .position(|case| case.trim() == result.test_case.trim())
                .unwrap_or(usize::MAX)
        };
        self.results.sort_by_key(position);
    }
}

impl Contract for CodeExecutionOutput {
    fn schema() -> Schema {
        Schema::new("CodeExecutionOutput")
            .optional(
                "results",
                FieldType::array(FieldType::Object(test_case_result_schema())),
                "The results of running the code against the test cases.",
            )
            .optional(
                "error",
                FieldType::String,
                "Any error that occurred during execution.",
            )
    }

    /// No results and no explanation for their absence.
    fn empty_primary_field(&self) -> Option<&'static str> {
        let no_error = self.error.as_deref().map_or(true, str::is_empty);
        (self.results.is_empty() && no_error).then_some("results")
    }
}

const EXECUTION_TEMPLATE: &str = r#"You are an expert code interpreter. You will be given a piece of code, a list of test cases, and the programming language.
Your task is to execute the code for each test case and determine if the output matches the expected result.

Language: {{{language}}}

Code:
'''
{{{code}}}
'''

Test Cases:
{{#each testCases}}
- {{{this}}}
{{/each}}

For each test case, provide the actual output and whether it passed.
A test case is considered "passed" if the code runs without errors and the output is logically correct for the problem, even if the exact output format isn't specified.
If the code fails to run for a test case (e.g., due to a syntax error or a runtime error), you should set 'passed' to false and provide the error message in the 'output' field.
If there's a general error with the code that prevents any test cases from running (like a syntax error), return a top-level 'error' message.

Return the results in a JSON format. The response must only contain valid JSON. Do not add any extra symbols, markdown, or formatting."#;

pub const CODE_EXECUTION_FLOW: PromptFlow<CodeExecutionInput, CodeExecutionOutput> =
    PromptFlow::new(
        FlowId::CodeExecution,
        PromptDefinition::new("executeCode", EXECUTION_TEMPLATE),
    );

impl Pipelines {
    /// Have the backend judge `input.code` against each test case.
    pub async fn execute_code(
        &self,
        input: &CodeExecutionInput,
    ) -> Result<CodeExecutionOutput, ApiError> {
        match self.runtime.run(&CODE_EXECUTION_FLOW, input).await {
            Ok(mut output) => {
                if output.error.is_none() {
                    output.align_to(&input.test_cases);
                }
                Ok(output)
            }
            Err(err) => {
                let message = MESSAGES.report(FlowId::CodeExecution, err)?;
                Ok(CodeExecutionOutput {
                    results: Vec::new(),
                    error: Some(message.to_string()),
                })
            }
        }
    }
}
