//! Slide decks.
//!
//! Stage one writes the deck. Stage two walks the first `max_presentation_images` slides
//! in order, one image request at a time through a [`ThrottledQueue`], pausing after
//! every success. A failed slide image becomes `None` and the walk continues.

use super::{ImagePrompt, Pipelines};
use crate::error::ApiError;
use crate::flow::{AssetFlow, FlowId, PromptFlow};
use crate::prompt::{PromptConfig, PromptDefinition};
use crate::provider::{AssetRef, Modality};
use crate::schema::{encode, Contract, FieldType, Schema};
use crate::throttle::ThrottledQueue;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresentationInput {
    pub topic: String,
}

impl Contract for PresentationInput {
    fn schema() -> Schema {
        Schema::new("PresentationInput").field(
            "topic",
            FieldType::String,
            "The topic for which to generate a presentation.",
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Slide {
    pub title: String,
    pub content: Vec<String>,
    pub speaker_notes: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_prompt: Option<String>,
}

impl Slide {
    /// Prompt worth sending to the image model; empty prompts count as absent.
    pub fn usable_image_prompt(&self) -> Option<&str> {
        self.image_prompt.as_deref().filter(|prompt| !prompt.is_empty())
    }
}

fn slide_schema() -> Schema {
    Schema::new("Slide")
        .field("title", FieldType::String, "The title of the slide.")
        .field(
            "content",
            FieldType::array(FieldType::String),
            "An array of bullet points for the slide content.",
        )
        .field(
            "speakerNotes",
            FieldType::String,
            "Detailed speaker notes for the slide.",
        )
        .optional(
            "imagePrompt",
            FieldType::String,
            "A prompt for generating a relevant image for the slide.",
        )
}

/// Deck text without images
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Presentation {
    pub title: String,
    pub slides: Vec<Slide>,
}

impl Contract for Presentation {
    fn schema() -> Schema {
        Schema::new("Presentation")
            .field(
                "title",
                FieldType::String,
                "The title of the overall presentation.",
            )
            .field(
                "slides",
                FieldType::array(FieldType::Object(slide_schema())),
                "A list of slides for the presentation.",
            )
    }
}

/// Deck with one optional image per slide, index-aligned
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IllustratedPresentation {
    pub title: String,
    pub slides: Vec<Slide>,
    pub images: Vec<Option<AssetRef>>,
}

impl IllustratedPresentation {
    pub fn image_count(&self) -> usize {
        self.images.iter().filter(|image| image.is_some()).count()
    }
}

impl Contract for IllustratedPresentation {
    fn schema() -> Schema {
        Schema::new("IllustratedPresentation")
            .field(
                "title",
                FieldType::String,
                "The title of the overall presentation.",
            )
            .field(
                "slides",
                FieldType::array(FieldType::Object(slide_schema())),
                "A list of slides for the presentation.",
            )
            .field(
                "images",
                FieldType::array(FieldType::nullable(FieldType::String)),
                "A list of base64 encoded images as data URIs, corresponding to each slide.",
            )
    }
}

const CONTENT_TEMPLATE: &str = r#"You are an expert presentation creator. Your task is to generate a well-structured and informative presentation on a given topic.

The presentation should include a main title and a series of slides.
Each slide must have a title, content (as an array of bullet points), detailed speaker notes, and a concise prompt for generating a relevant image.
Generate between 10 and 20 content slides, plus a title slide and a concluding slide. For the title and conclusion slides, you can leave the imagePrompt empty.

Your response must be in JSON format.

Topic: {{{topic}}}
"#;

pub const PRESENTATION_CONTENT_FLOW: PromptFlow<PresentationInput, Presentation> =
    PromptFlow::new(
        FlowId::PresentationContent,
        PromptDefinition::new("presentationContent", CONTENT_TEMPLATE),
    );

pub const SLIDE_IMAGE_FLOW: AssetFlow<ImagePrompt> = AssetFlow::new(
    FlowId::SlideImage,
    PromptDefinition::new(
        "slideImage",
        "A professional and clean image for a presentation slide about: {{{prompt}}}.",
    )
    .with_config(PromptConfig {
        safety_settings: &[],
        modalities: &[Modality::Text, Modality::Image],
    }),
);

impl Pipelines {
    /// Write the slide deck for `input.topic`, without images.
    pub async fn generate_presentation_content(
        &self,
        input: &PresentationInput,
    ) -> Result<Presentation, ApiError> {
        self.runtime.run(&PRESENTATION_CONTENT_FLOW, input).await
    }

    /// Generate images for the leading slides of an existing deck.
    ///
    /// Always returns one entry per slide. Only per-slide generation failures are
    /// absorbed; an invalid deck or a programmer error is returned as `Err`.
    pub async fn attach_images(
        &self,
        presentation: Presentation,
    ) -> Result<IllustratedPresentation, ApiError> {
        encode(&presentation)?;

        let queue = ThrottledQueue::new(
            Duration::from_millis(self.config.image_interval_ms),
            self.clock.clone(),
        );
        let cap = self.config.max_presentation_images;
        let mut images = Vec::with_capacity(presentation.slides.len());

        for (index, slide) in presentation.slides.iter().take(cap).enumerate() {
            let Some(prompt) = slide.usable_image_prompt() else {
                images.push(None);
                continue;
            };
            let input = ImagePrompt {
                prompt: prompt.to_string(),
            };
            match queue.submit(self.runtime.run(&SLIDE_IMAGE_FLOW, &input)).await {
                Ok(output) => images.push(Some(output.media)),
                Err(err) if err.is_reportable() => {
                    warn!(slide = index, error = %err, "Slide image generation failed");
                    images.push(None);
                }
                Err(err) => return Err(err),
            }
        }
        images.resize(presentation.slides.len(), None);

        let illustrated = IllustratedPresentation {
            title: presentation.title,
            slides: presentation.slides,
            images,
        };
        info!(
            slides = illustrated.slides.len(),
            images = illustrated.image_count(),
            "Presentation images attached"
        );
        Ok(illustrated)
    }

    /// Write the deck, then illustrate it.
    pub async fn generate_presentation(
        &self,
        input: &PresentationInput,
    ) -> Result<IllustratedPresentation, ApiError> {
        let presentation = self.generate_presentation_content(input).await?;
        self.attach_images(presentation).await
    }
}
