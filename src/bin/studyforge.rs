//! Studyforge CLI Binary
//!
//! Command-line interface for the studyforge generation pipelines.

use anyhow::Context;
use clap::Parser;
use std::process;
use studyforge::cli::{Cli, Commands, RunContext};
use studyforge::config::ConfigLoader;
use studyforge::logging::{init_logging, LoggingConfig};
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let mut cli = Cli::parse();

    // Build logging config from CLI args, env vars, and config file
    let logging_config = build_logging_config(&cli);

    // Initialize logging early
    if let Err(e) = init_logging(Some(&logging_config)) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!("Studyforge CLI starting");

    if let Err(e) = load_source_file(&mut cli.command) {
        error!("Error reading source file: {:#}", e);
        eprintln!("{:#}", e);
        process::exit(1);
    }

    let context = match RunContext::new(cli.config.as_deref(), cli.mock, cli.format) {
        Ok(ctx) => {
            info!("CLI context initialized");
            ctx
        }
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", studyforge::cli::map_error(&e));
            process::exit(1);
        }
    };

    match context.execute(&cli.command).await {
        Ok(output) => {
            info!("Command completed successfully");
            println!("{}", output);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", studyforge::cli::map_error(&e));
            process::exit(1);
        }
    }
}

/// Replace `execute --file` with the file's contents.
fn load_source_file(command: &mut Commands) -> anyhow::Result<()> {
    if let Commands::Execute {
        code,
        file: Some(path),
        ..
    } = command
    {
        let source = std::fs::read_to_string(&*path)
            .with_context(|| format!("Failed to read source file {}", path.display()))?;
        *code = Some(source);
    }
    Ok(())
}

/// Build logging configuration from CLI args, environment, and config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = ConfigLoader::load(cli.config.as_deref())
        .ok()
        .map(|c| c.logging)
        .unwrap_or_default();

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }

    config
}
