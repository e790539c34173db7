//! CLI domain: parse, route, output, and presentation only.
//! No pipeline logic lives here; the route table dispatches to [`crate::pipelines::Pipelines`].

mod output;
mod parse;
mod presentation;
mod route;

pub use output::map_error;
pub use parse::{Cli, Commands, OutputFormat};
pub use presentation::{
    format_catalog, format_code_execution, format_code_practice, format_math_solution,
    format_narration, format_notes, format_presentation, format_security_verdict,
    format_tutor_output,
};
pub use route::RunContext;
