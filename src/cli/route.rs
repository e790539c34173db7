//! CLI route: single route table and run context. Dispatches to pipelines and presentation.

use crate::cli::parse::{Commands, OutputFormat};
use crate::cli::presentation::{
    format_catalog, format_code_execution, format_code_practice, format_math_solution,
    format_narration, format_notes, format_presentation, format_security_verdict,
    format_tutor_output,
};
use crate::config::{BackendKind, ConfigLoader, StudioConfig};
use crate::error::ApiError;
use crate::flow::catalog;
use crate::pipelines::{
    CodeExecutionInput, CodePracticeInput, MathTutorInput, NarrationInput, NotesInput,
    Pipelines, PresentationInput, SecurityCheckInput, TutorInput,
};
use serde::Serialize;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

/// Runtime context for CLI execution: the effective configuration and output format.
/// The generation client is only built for commands that call the backend.
pub struct RunContext {
    config: StudioConfig,
    format: OutputFormat,
}

impl RunContext {
    /// Load configuration through [`ConfigLoader`]; `mock` swaps in the offline backend.
    pub fn new(config_path: Option<&Path>, mock: bool, format: OutputFormat) -> Result<Self, ApiError> {
        let mut config = ConfigLoader::load(config_path)?;
        if mock {
            config.backend.kind = BackendKind::Mock;
        }
        Ok(Self::from_config(config, format))
    }

    pub fn from_config(config: StudioConfig, format: OutputFormat) -> Self {
        Self { config, format }
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    fn pipelines(&self) -> Result<Pipelines, ApiError> {
        if let Err(issues) = self.config.validate() {
            let joined = issues
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(ApiError::ConfigError(joined));
        }
        Pipelines::from_config(&self.config)
    }

    fn render<T: Serialize>(&self, value: &T, text: impl FnOnce(&T) -> String) -> String {
        match self.format {
            OutputFormat::Json => {
                serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string())
            }
            OutputFormat::Text => text(value),
        }
    }

    /// Execute a command and return its rendered output.
    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        let started = Instant::now();
        let name = command_name(command);
        debug!(command = name, "Executing command");

        let output = match command {
            Commands::Tutor { topic, language } => {
                let input = TutorInput {
                    topic: topic.clone(),
                    language: language.clone(),
                };
                let output = self.pipelines()?.tutor(&input).await?;
                self.render(&output, format_tutor_output)
            }
            Commands::Math { problem } => {
                let input = MathTutorInput {
                    problem: problem.clone(),
                };
                let output = self.pipelines()?.solve_math_problem(&input).await?;
                self.render(&output, format_math_solution)
            }
            Commands::SecurityCheck { prompt } => {
                let input = SecurityCheckInput {
                    prompt: prompt.clone(),
                };
                let output = self.pipelines()?.check_security(&input).await?;
                self.render(&output, format_security_verdict)
            }
            Commands::Practice { topic } => {
                let input = CodePracticeInput {
                    topic: topic.clone(),
                };
                let output = self.pipelines()?.code_practice(&input).await?;
                self.render(&output, format_code_practice)
            }
            Commands::Execute {
                code,
                language,
                test_cases,
                ..
            } => {
                let input = CodeExecutionInput {
                    code: code.clone().unwrap_or_default(),
                    test_cases: test_cases.clone(),
                    language: language.clone(),
                };
                let output = self.pipelines()?.execute_code(&input).await?;
                self.render(&output, format_code_execution)
            }
            Commands::Notes { topic } => {
                let input = NotesInput {
                    topic: topic.clone(),
                };
                let output = self.pipelines()?.generate_notes(&input).await?;
                self.render(&output, format_notes)
            }
            Commands::Presentation { topic, no_images } => {
                let input = PresentationInput {
                    topic: topic.clone(),
                };
                let pipelines = self.pipelines()?;
                let deck = pipelines.generate_presentation_content(&input).await?;
                if *no_images {
                    self.render(&deck, |deck| format_presentation(deck, None))
                } else {
                    let illustrated = pipelines.attach_images(deck.clone()).await?;
                    self.render(&illustrated, |illustrated| {
                        format_presentation(&deck, Some(illustrated))
                    })
                }
            }
            Commands::Narrate { text, voice } => {
                let input = NarrationInput {
                    text: text.clone(),
                    voice_name: voice.clone(),
                };
                let output = self.pipelines()?.narrate(&input).await?;
                self.render(&output, |output| format_narration(&output.media))
            }
            Commands::Flows => {
                let flows = catalog();
                match self.format {
                    OutputFormat::Json => {
                        let names: Vec<serde_json::Value> = flows
                            .iter()
                            .map(|flow| {
                                serde_json::json!({
                                    "name": flow.name(),
                                    "input": flow.input_schema.to_json_schema(),
                                    "output": flow.output_schema.to_json_schema(),
                                })
                            })
                            .collect();
                        serde_json::to_string_pretty(&names).unwrap_or_else(|_| "[]".to_string())
                    }
                    OutputFormat::Text => format_catalog(&flows),
                }
            }
            Commands::Config => {
                let redacted = self.config.redacted();
                match self.format {
                    OutputFormat::Json => serde_json::to_string_pretty(&redacted)
                        .unwrap_or_else(|_| "{}".to_string()),
                    OutputFormat::Text => toml::to_string_pretty(&redacted).map_err(|e| {
                        ApiError::ConfigError(format!("Failed to render config: {}", e))
                    })?,
                }
            }
        };

        info!(
            command = name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Command finished"
        );
        Ok(output)
    }
}

fn command_name(command: &Commands) -> &'static str {
    match command {
        Commands::Tutor { .. } => "tutor",
        Commands::Math { .. } => "math",
        Commands::SecurityCheck { .. } => "security-check",
        Commands::Practice { .. } => "practice",
        Commands::Execute { .. } => "execute",
        Commands::Notes { .. } => "notes",
        Commands::Presentation { .. } => "presentation",
        Commands::Narrate { .. } => "narrate",
        Commands::Flows => "flows",
        Commands::Config => "config",
    }
}
