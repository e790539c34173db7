//! CLI parse: clap types for studyforge. No behavior; definitions only.

use clap::{Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Studyforge CLI - generate tutoring text, exercises, notes and slide decks
#[derive(Parser, Debug)]
#[command(name = "studyforge")]
#[command(about = "Generate explanations, exercises, notes and presentations from a model backend")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (layered over the global config)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Use the offline mock backend instead of the configured one
    #[arg(long, global = true)]
    pub mock: bool,

    /// Enable verbose logging
    #[arg(long, global = true)]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long, global = true)]
    pub log_format: Option<String>,

    /// Output format for command results
    #[arg(long, value_enum, default_value_t = OutputFormat::Text, global = true)]
    pub format: OutputFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Explain a topic or answer a question
    Tutor {
        /// Topic or question
        topic: String,
        /// Language of the explanation
        #[arg(long, default_value = "English")]
        language: String,
    },
    /// Solve a math problem step by step
    Math {
        /// Problem statement
        problem: String,
    },
    /// Check a prompt for code injection
    SecurityCheck {
        /// Prompt to analyze
        prompt: String,
    },
    /// Generate a coding exercise with test cases
    Practice {
        /// Exercise topic
        topic: String,
    },
    /// Judge code against test cases
    Execute {
        /// Source code
        #[arg(long, conflicts_with = "file", required_unless_present = "file")]
        code: Option<String>,
        /// Read source code from a file
        #[arg(long)]
        file: Option<PathBuf>,
        /// Programming language of the code
        #[arg(long, default_value = "python")]
        language: String,
        /// Test case description (repeatable)
        #[arg(long = "test-case")]
        test_cases: Vec<String>,
    },
    /// Write illustrated engineering notes
    Notes {
        /// Engineering topic
        topic: String,
    },
    /// Build a slide deck
    Presentation {
        /// Presentation topic
        topic: String,
        /// Skip slide image generation
        #[arg(long)]
        no_images: bool,
    },
    /// Convert text to speech
    Narrate {
        /// Text to read aloud
        text: String,
        /// Voice name
        #[arg(long)]
        voice: Option<String>,
    },
    /// List every flow with its input and output contracts
    Flows,
    /// Print the effective configuration (credentials redacted)
    Config,
}
