//! Engineering notes with illustrations.
//!
//! Stage one writes the notes body with `[IMAGE_k]` markers and one image prompt per
//! marker. Stage two requests every image at once; any single failure fails the request.

use super::{ImagePrompt, Pipelines};
use crate::error::ApiError;
use crate::flow::{AssetFlow, FlowId, PromptFlow};
use crate::markup::{resolve_placeholders, Segment};
use crate::prompt::{PromptConfig, PromptDefinition};
use crate::provider::{AssetRef, Modality};
use crate::schema::{Contract, FieldType, Schema};
use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotesInput {
    pub topic: String,
}

impl Contract for NotesInput {
    fn schema() -> Schema {
        Schema::new("NotesInput").field(
            "topic",
            FieldType::String,
            "The engineering topic for which to generate notes.",
        )
    }
}

const NOTES_DESCRIPTION: &str = "Detailed, well-structured notes on the engineering topic, up to 10 pages long, with image placeholders like [IMAGE_1], [IMAGE_2].";

/// Stage one output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesContent {
    pub notes: String,
    pub image_prompts: Vec<String>,
}

impl Contract for NotesContent {
    fn schema() -> Schema {
        Schema::new("NotesContent")
            .field("notes", FieldType::String, NOTES_DESCRIPTION)
            .field(
                "imagePrompts",
                FieldType::array(FieldType::String),
                "A list of 3-4 prompts for generating relevant images for the notes.",
            )
    }

    fn empty_primary_field(&self) -> Option<&'static str> {
        self.notes.is_empty().then_some("notes")
    }
}

/// Finished notes: `images[i]` illustrates `image_prompts[i]`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotesDocument {
    pub notes: String,
    pub image_prompts: Vec<String>,
    pub images: Vec<AssetRef>,
}

impl NotesDocument {
    /// Notes body split at resolvable image markers
    pub fn segments(&self) -> Vec<Segment<'_>> {
        resolve_placeholders(&self.notes, &self.images)
    }
}

impl Contract for NotesDocument {
    fn schema() -> Schema {
        Schema::new("NotesDocument")
            .field("notes", FieldType::String, NOTES_DESCRIPTION)
            .field(
                "imagePrompts",
                FieldType::array(FieldType::String),
                "A list of prompts for generating relevant images for the notes.",
            )
            .field(
                "images",
                FieldType::array(FieldType::String),
                "A list of base64 encoded images as data URIs.",
            )
    }
}

const NOTES_TEMPLATE: &str = r#"You are an expert engineering educator. Your task is to generate comprehensive and clear notes on a given engineering topic, along with prompts for generating relevant images.
The notes should be well-structured, easy to understand, and cover the key concepts, principles, and applications of the topic.
The content should be detailed enough to fill approximately 10 A4 pages.
Use headings, subheadings, bullet points, and clear paragraphs to organize the information.

Also provide 3-4 prompts for images that would visually illustrate the key concepts in the notes.
For each image prompt you create, you MUST insert a corresponding placeholder in the notes text where the image should appear. For example: [IMAGE_1], [IMAGE_2], etc. The index in the placeholder should correspond to the index of the prompt in the imagePrompts array.

Your response must be in plain text, without any markdown formatting like '###', '-', '**', or "'''".

Topic: {{{topic}}}
"#;

pub const NOTES_CONTENT_FLOW: PromptFlow<NotesInput, NotesContent> = PromptFlow::new(
    FlowId::NotesContent,
    PromptDefinition::new("notesWithImagePrompts", NOTES_TEMPLATE),
);

pub const NOTES_IMAGE_FLOW: AssetFlow<ImagePrompt> = AssetFlow::new(
    FlowId::NotesImage,
    PromptDefinition::new(
        "notesDiagram",
        "An engineering diagram illustrating the concept of: {{{prompt}}}. Clean, clear, and professional.",
    )
    .with_config(PromptConfig {
        safety_settings: &[],
        modalities: &[Modality::Text, Modality::Image],
    }),
);

impl Pipelines {
    /// Write notes on `input.topic` and illustrate every image prompt.
    pub async fn generate_notes(&self, input: &NotesInput) -> Result<NotesDocument, ApiError> {
        let content = self.runtime.run(&NOTES_CONTENT_FLOW, input).await?;
        info!(
            flow = %FlowId::NotesContent,
            images = content.image_prompts.len(),
            "Notes written, generating illustrations"
        );

        let requests = content
            .image_prompts
            .iter()
            .enumerate()
            .map(move |(index, prompt)| async move {
                let input = ImagePrompt {
                    prompt: prompt.clone(),
                };
                self.runtime
                    .run(&NOTES_IMAGE_FLOW, &input)
                    .await
                    .map(|output| output.media)
                    .map_err(|err| {
                        if err.is_reportable() {
                            ApiError::AssetGeneration {
                                index,
                                message: err.to_string(),
                            }
                        } else {
                            err
                        }
                    })
            });
        let images = try_join_all(requests).await?;

        Ok(NotesDocument {
            notes: content.notes,
            image_prompts: content.image_prompts,
            images,
        })
    }
}
