//! Integration tests for the studyforge pipelines

mod cli_commands;
mod config_loading;
mod flow_boundaries;
mod notes_pipeline;
mod presentation_pipeline;
mod single_step_pipelines;
mod test_utils;
