//! Text-to-speech narration.

use super::Pipelines;
use crate::error::ApiError;
use crate::flow::{AssetOutput, Flow, FlowId};
use crate::prompt::{PromptConfig, PromptDefinition};
use crate::provider::{GenerationClient, Modality};
use crate::schema::{Contract, FieldType, Schema};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

pub const DEFAULT_VOICE: &str = "Algenib";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NarrationInput {
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voice_name: Option<String>,
}

impl NarrationInput {
    pub fn voice(&self) -> &str {
        self.voice_name
            .as_deref()
            .filter(|voice| !voice.is_empty())
            .unwrap_or(DEFAULT_VOICE)
    }
}

impl Contract for NarrationInput {
    fn schema() -> Schema {
        Schema::new("NarrationInput")
            .field("text", FieldType::String, "The text to convert to speech.")
            .optional(
                "voiceName",
                FieldType::String,
                "The voice name to use for speech synthesis. Defaults to Algenib.",
            )
    }
}

const NARRATION_PROMPT: PromptDefinition =
    PromptDefinition::new("narration", "{{{text}}}").with_config(PromptConfig {
        safety_settings: &[],
        modalities: &[Modality::Audio],
    });

/// Speech synthesis with a per-request voice
pub struct NarrationFlow;

#[async_trait]
impl Flow for NarrationFlow {
    type Input = NarrationInput;
    type Output = AssetOutput;

    fn id(&self) -> FlowId {
        FlowId::Narration
    }

    async fn generate(
        &self,
        client: &GenerationClient,
        input: &NarrationInput,
    ) -> Result<AssetOutput, ApiError> {
        let rendered = NARRATION_PROMPT.render(input)?.with_voice(input.voice());
        let media = client
            .generate_asset(&rendered, NARRATION_PROMPT.config.modalities)
            .await?;
        Ok(AssetOutput { media })
    }
}

impl Pipelines {
    /// Read `input.text` aloud; the result is an audio data URI.
    pub async fn narrate(&self, input: &NarrationInput) -> Result<AssetOutput, ApiError> {
        self.runtime.run(&NarrationFlow, input).await
    }
}
