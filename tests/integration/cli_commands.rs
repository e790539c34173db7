//! CLI commands against the offline mock backend

use clap::Parser;
use studyforge::cli::{Cli, OutputFormat, RunContext};
use studyforge::config::{BackendKind, StudioConfig};

fn context(format: OutputFormat) -> RunContext {
    let mut config = StudioConfig::default();
    config.backend.kind = BackendKind::Mock;
    config.pipeline.image_interval_ms = 0;
    RunContext::from_config(config, format)
}

async fn run(args: &[&str]) -> String {
    let cli = Cli::try_parse_from(args).unwrap();
    context(cli.format).execute(&cli.command).await.unwrap()
}

#[tokio::test]
async fn test_security_check_text() {
    let out = run(&["studyforge", "security-check", "binary search"]).await;
    assert!(out.contains("SAFE"));
    assert!(out.contains("Sample reason"));
}

#[tokio::test]
async fn test_practice_lists_test_cases() {
    let out = run(&["studyforge", "practice", "linked lists"]).await;
    assert!(out.contains("Sample exercise"));
    assert!(out.contains("1. Sample testCases"));
}

#[tokio::test]
async fn test_notes_json_has_one_image_per_prompt() {
    let out = run(&["studyforge", "--format", "json", "notes", "transistors"]).await;
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert_eq!(
        value["images"].as_array().map(Vec::len),
        value["imagePrompts"].as_array().map(Vec::len)
    );
}

#[tokio::test]
async fn test_presentation_with_and_without_images() {
    let out = run(&["studyforge", "--format", "json", "presentation", "compilers"]).await;
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    let slides = value["slides"].as_array().map(Vec::len);
    assert_eq!(value["images"].as_array().map(Vec::len), slides);

    let text_only = run(&[
        "studyforge",
        "--format",
        "json",
        "presentation",
        "compilers",
        "--no-images",
    ])
    .await;
    let value: serde_json::Value = serde_json::from_str(&text_only).unwrap();
    assert!(value.get("images").is_none());
}

#[tokio::test]
async fn test_narrate_reports_audio() {
    let out = run(&["studyforge", "narrate", "Good morning"]).await;
    assert!(out.starts_with("Audio: audio/wav"));
}

#[tokio::test]
async fn test_flows_table() {
    let out = run(&["studyforge", "flows"]).await;
    for name in ["tutor", "security-check", "slide-image", "narration"] {
        assert!(out.contains(name), "missing {}", name);
    }
}

#[tokio::test]
async fn test_execute_reads_as_success_offline() {
    let out = run(&[
        "studyforge",
        "--format",
        "json",
        "execute",
        "--code",
        "print(1)",
        "--test-case",
        "Sample testCase",
    ])
    .await;
    let value: serde_json::Value = serde_json::from_str(&out).unwrap();
    assert!(value.get("error").is_none());
    assert_eq!(value["results"][0]["testCase"], "Sample testCase");

    let text = run(&["studyforge", "execute", "--code", "print(1)", "--test-case", "x"]).await;
    assert!(!text.contains("Sample error"));
}
