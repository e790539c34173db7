//! Step-by-step math solutions.

use super::{ErrorKind, FailureMessages, Pipelines};
use crate::error::ApiError;
use crate::flow::{FlowId, PromptFlow};
use crate::prompt::PromptDefinition;
use crate::schema::{Contract, FieldType, Schema};
use serde::{Deserialize, Serialize};

pub const FAILED_MESSAGE: &str = "An unexpected error occurred while solving the problem.";
pub const EMPTY_MESSAGE: &str = "Failed to generate a valid solution.";

const MESSAGES: FailureMessages = FailureMessages {
    failed: FAILED_MESSAGE,
    empty: EMPTY_MESSAGE,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathTutorInput {
    pub problem: String,
}

impl Contract for MathTutorInput {
    fn schema() -> Schema {
        Schema::new("MathTutorInput").field(
            "problem",
            FieldType::String,
            "The math problem to solve.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Solution {
    pub solution: String,
}

impl Contract for Solution {
    fn schema() -> Schema {
        Schema::new("Solution").field(
            "solution",
            FieldType::String,
            "The step-by-step solution to the math problem.",
        )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.solution.is_empty().then_some("solution")
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MathTutorOutput {
    pub solution: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl MathTutorOutput {
    pub fn error_kind(&self) -> Option<ErrorKind> {
        self.error.as_deref().map(|message| MESSAGES.classify(message))
    }
}

impl Contract for MathTutorOutput {
    fn schema() -> Schema {
        Schema::new("MathTutorOutput")
            .field(
                "solution",
                FieldType::String,
                "The step-by-step solution to the math problem.",
            )
            .optional(
                "error",
                FieldType::String,
                "An error message if the solution could not be generated.",
            )
    }
}

const SOLUTION_TEMPLATE: &str = r#"You are an expert math tutor specializing in a wide range of topics, including Algebra, Calculus, Discrete Mathematics, and Graph Theory. Your goal is to provide a clear, step-by-step solution to the given math problem, as if you were writing it out for a student.

Your response MUST follow this structure, using plain text for headings:
1.  Problem Statement: Restate the problem you are solving.
2.  Step-by-Step Solution: Break down the solution into numbered steps. For each step, show the mathematical operation and a brief, direct explanation of what is being done.
3.  Final Answer: Clearly state the final answer.

You MUST use LaTeX for all mathematical expressions, equations, and symbols, and you MUST use a double backslash for all LaTeX commands (e.g., $p \\land q$). This is critical for ensuring clarity in topics like Discrete Mathematics and Graph Theory.
- For inline mathematics, wrap the expression in single dollar signs, like $x^2 + y^2 = r^2$.
- For block-level equations, wrap the expression in double dollar signs, like $$ \\int_a^b f(x) \\,dx $$.

If the solution requires a truth table, you MUST format it in a special table format.
- The table should be enclosed in [TABLE]...[/TABLE] tags.
- Inside, each row should be on a new line, and columns should be separated by a pipe '|'.
- The table content itself, including headers with logical symbols, should be plain text with valid LaTeX markup (e.g., '$p \\rightarrow q$'). Do not use markdown for the table itself.
Example:
[TABLE]
$P$ | $Q$ | $P \\land Q$
T | T | T
T | F | F
F | T | F
F | F | F
[/TABLE]

Do not include any conversational filler, introductory sentences, or concluding remarks. Do not use any markdown formatting like '**'. Focus only on providing a direct, clear, step-by-step mathematical solution.

Problem: {{{problem}}}
"#;

pub const MATH_TUTOR_FLOW: PromptFlow<MathTutorInput, Solution> = PromptFlow::new(
    FlowId::MathTutor,
    PromptDefinition::new("mathSolution", SOLUTION_TEMPLATE),
);

impl Pipelines {
    /// Solve a math problem step by step.
    pub async fn solve_math_problem(
        &self,
        input: &MathTutorInput,
    ) -> Result<MathTutorOutput, ApiError> {
        match self.runtime.run(&MATH_TUTOR_FLOW, input).await {
            Ok(generated) => Ok(MathTutorOutput {
                solution: generated.solution,
                error: None,
            }),
            Err(err) => {
                let message = MESSAGES.report(FlowId::MathTutor, err)?;
                Ok(MathTutorOutput {
                    solution: String::new(),
                    error: Some(message.to_string()),
                })
            }
        }
    }
}
