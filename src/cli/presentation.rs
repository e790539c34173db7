//! CLI presentation: text rendering of pipeline outputs.
//!
//! Generated text may carry `[TABLE]` blocks and `[IMAGE_k]` markers; both are rendered
//! for a terminal here. JSON output bypasses this module entirely.

use crate::flow::FlowDescriptor;
use crate::markup::{parse_blocks, substitute_placeholders, Block};
use crate::pipelines::{
    CodeExecutionOutput, CodePracticeOutput, IllustratedPresentation, MathTutorOutput,
    NotesDocument, Presentation, SecurityCheckOutput, TutorOutput,
};
use crate::provider::AssetRef;
use crate::schema::Schema;
use comfy_table::presets::{UTF8_BORDERS_ONLY, UTF8_FULL};
use comfy_table::Table;
use owo_colors::OwoColorize;

/// Format a section heading with bold/underline.
fn format_section_heading(title: &str) -> String {
    format!("{}", title.bold().underline())
}

/// Render text with `[TABLE]` blocks drawn as tables.
fn format_rich_text(text: &str) -> String {
    let mut out = String::new();
    for block in parse_blocks(text) {
        match block {
            Block::Text(text) => out.push_str(&text),
            Block::Table(parsed) => {
                let mut table = Table::new();
                table.load_preset(UTF8_FULL);
                table.set_header(parsed.header.clone());
                for row in &parsed.rows {
                    table.add_row(row.clone());
                }
                out.push_str(&format!("\n{}\n", table));
            }
        }
    }
    out
}

fn format_error_line(message: &str) -> String {
    format!("{} {}\n", "Error:".red().bold(), message)
}

fn describe_asset(asset: &AssetRef) -> String {
    format!(
        "{} ({} bytes)",
        asset.mime_type().unwrap_or("unknown"),
        asset.as_str().len()
    )
}

pub fn format_tutor_output(output: &TutorOutput) -> String {
    match output.error {
        Some(ref message) => format_error_line(message),
        None => format_rich_text(&output.explanation),
    }
}

pub fn format_math_solution(output: &MathTutorOutput) -> String {
    match output.error {
        Some(ref message) => format_error_line(message),
        None => format_rich_text(&output.solution),
    }
}

pub fn format_security_verdict(output: &SecurityCheckOutput) -> String {
    let verdict = if output.is_vulnerable {
        format!("{}", "VULNERABLE".red().bold())
    } else {
        format!("{}", "SAFE".green().bold())
    };
    format!("{}: {}\n", verdict, output.reason)
}

pub fn format_code_practice(output: &CodePracticeOutput) -> String {
    if output.is_refusal() {
        return format!("{}\n", output.exercise.yellow());
    }
    let mut out = String::new();
    out.push_str(&format!("{}\n\n", format_section_heading("Exercise")));
    out.push_str(output.exercise.trim_end());
    out.push_str("\n\n");
    out.push_str(&format!("{}\n\n", format_section_heading("Test cases")));
    for (i, case) in output.test_cases.iter().enumerate() {
        out.push_str(&format!("  {}. {}\n", i + 1, case));
    }
    out
}

pub fn format_code_execution(output: &CodeExecutionOutput) -> String {
    if let Some(ref message) = output.error {
        return format_error_line(message);
    }
    let mut table = Table::new();
    table.load_preset(UTF8_BORDERS_ONLY);
    table.set_header(vec!["Test case", "Output", "Expected", "Result"]);
    for result in &output.results {
        let verdict = if result.passed {
            format!("{}", "pass".green())
        } else {
            format!("{}", "fail".red())
        };
        table.add_row(vec![
            result.test_case.clone(),
            result.output.clone(),
            result.expected.clone().unwrap_or_else(|| "-".to_string()),
            verdict,
        ]);
    }
    let passed = output.results.iter().filter(|r| r.passed).count();
    format!(
        "{}\n\nPassed {} of {} test case(s).\n",
        table,
        passed,
        output.results.len()
    )
}

pub fn format_notes(document: &NotesDocument) -> String {
    let body = substitute_placeholders(&document.notes, &document.images, |number, asset| {
        format!("[Figure {}: {}]", number, describe_asset(asset))
    });
    let mut out = format_rich_text(&body);
    if !document.image_prompts.is_empty() {
        out.push_str(&format!("\n\n{}\n\n", format_section_heading("Figures")));
        for (i, prompt) in document.image_prompts.iter().enumerate() {
            out.push_str(&format!("  {}. {}\n", i + 1, prompt));
        }
    }
    out
}

/// Render a deck. `images` is `None` when image generation was skipped.
pub fn format_presentation(
    presentation: &Presentation,
    images: Option<&IllustratedPresentation>,
) -> String {
    let mut out = format!("{}\n", format_section_heading(&presentation.title));
    for (i, slide) in presentation.slides.iter().enumerate() {
        out.push_str(&format!("\n{} {}\n", format!("{}.", i + 1).bold(), slide.title.bold()));
        for point in &slide.content {
            out.push_str(&format!("  * {}\n", point));
        }
        out.push_str(&format!("  {} {}\n", "Notes:".dimmed(), slide.speaker_notes));
        if let Some(illustrated) = images {
            let image = match illustrated.images.get(i).and_then(Option::as_ref) {
                Some(asset) => describe_asset(asset),
                None => "none".to_string(),
            };
            out.push_str(&format!("  {} {}\n", "Image:".dimmed(), image));
        }
    }
    if let Some(illustrated) = images {
        out.push_str(&format!(
            "\n{} slide(s), {} image(s)\n",
            illustrated.slides.len(),
            illustrated.image_count()
        ));
    }
    out
}

pub fn format_narration(media: &AssetRef) -> String {
    format!("Audio: {}\n", describe_asset(media))
}

fn format_schema_fields(schema: &Schema) -> String {
    schema
        .fields
        .iter()
        .map(|field| {
            if field.optional {
                format!("{}?: {}", field.name, field.ty)
            } else {
                format!("{}: {}", field.name, field.ty)
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Catalog table: one row per flow.
pub fn format_catalog(flows: &[FlowDescriptor]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["Flow", "Input", "Output"]);
    for flow in flows {
        table.add_row(vec![
            flow.name().to_string(),
            format!(
                "{}\n{}",
                flow.input_schema.name,
                format_schema_fields(&flow.input_schema)
            ),
            format!(
                "{}\n{}",
                flow.output_schema.name,
                format_schema_fields(&flow.output_schema)
            ),
        ]);
    }
    format!("{}\n\nTotal: {} flow(s)\n", table, flows.len())
}
