//! Schema checks at both ends of a flow

use super::test_utils::Harness;
use serde::{Deserialize, Serialize};
use serde_json::json;
use studyforge::error::ApiError;
use studyforge::flow::{catalog, FlowId, FlowState, PromptFlow};
use studyforge::pipelines::tutor::FAILED_MESSAGE;
use studyforge::pipelines::{PresentationInput, TutorInput};
use studyforge::prompt::PromptDefinition;
use studyforge::provider::MockReply;
use studyforge::schema::{decode, Contract, FieldType, Schema};

#[derive(Debug, Serialize, Deserialize)]
struct Lesson {
    title: Option<String>,
    minutes: i64,
}

impl Contract for Lesson {
    fn schema() -> Schema {
        Schema::new("Lesson")
            .field("title", FieldType::String, "Lesson title")
            .field("minutes", FieldType::Integer, "Length in minutes")
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct Outline {
    outline: String,
}

impl Contract for Outline {
    fn schema() -> Schema {
        Schema::new("Outline").field("outline", FieldType::String, "Lesson outline")
    }
}

const OUTLINE_FLOW: PromptFlow<Lesson, Outline> = PromptFlow::new(
    FlowId::Tutor,
    PromptDefinition::new("outline", "Outline {{{title}}} in {{minutes}} minutes"),
);

#[tokio::test]
async fn test_invalid_input_never_reaches_backend() {
    let harness = Harness::scripted(vec![MockReply::json(json!({ "outline": "1. Intro" }))]);
    let runtime = harness.pipelines.runtime();

    let run = runtime
        .run_traced(
            &OUTLINE_FLOW,
            &Lesson {
                title: None,
                minutes: 30,
            },
        )
        .await;

    match run.result {
        Err(ApiError::Validation(err)) => {
            assert_eq!(err.schema, "Lesson");
            assert_eq!(err.path, "title");
        }
        other => panic!("expected validation error, got {other:?}"),
    }
    assert_eq!(run.states, vec![FlowState::Pending, FlowState::Failed]);
    assert_eq!(harness.backend.call_count(), 0);

    let outline = runtime
        .run(
            &OUTLINE_FLOW,
            &Lesson {
                title: Some("Sorting".into()),
                minutes: 30,
            },
        )
        .await
        .unwrap();
    assert_eq!(outline.outline, "1. Intro");
    assert_eq!(harness.backend.calls()[0].user, "Outline Sorting in 30 minutes");
}

#[test]
fn test_raw_input_is_checked_before_use() {
    let err = decode::<TutorInput>(json!({ "topic": 42, "language": "Hindi" })).unwrap_err();
    match err {
        ApiError::Validation(err) => {
            assert_eq!(err.path, "topic");
            assert_eq!(err.found, "number");
        }
        other => panic!("expected validation error, got {other:?}"),
    }

    assert!(decode::<PresentationInput>(json!({})).is_err());
    assert!(decode::<PresentationInput>(json!({ "topic": "Heaps" })).is_ok());
}

#[tokio::test]
async fn test_malformed_backend_output_is_a_generation_failure() {
    let harness = Harness::scripted(vec![
        MockReply::json(json!({ "explanation": 7 })),
        MockReply::Text("not json at all".into()),
        MockReply::Empty,
    ]);
    let input = TutorInput {
        topic: "heaps".into(),
        language: "English".into(),
    };

    for _ in 0..3 {
        let output = harness.pipelines.tutor(&input).await.unwrap();
        assert_eq!(output.error.as_deref(), Some(FAILED_MESSAGE));
    }
    assert_eq!(harness.backend.call_count(), 3);
}

#[tokio::test]
async fn test_fenced_json_is_accepted() {
    let harness = Harness::scripted(vec![MockReply::Text(
        "```json\n{\"explanation\": \"Heaps keep the smallest item on top.\"}\n```".into(),
    )]);
    let input = TutorInput {
        topic: "heaps".into(),
        language: "English".into(),
    };

    let output = harness.pipelines.tutor(&input).await.unwrap();
    assert_eq!(output.explanation, "Heaps keep the smallest item on top.");
}

#[test]
fn test_catalog_schemas_render_for_the_backend() {
    for descriptor in catalog() {
        let rendered = descriptor.output_schema.to_json_schema();
        assert_eq!(rendered["type"], "OBJECT", "{}", descriptor.name());
        assert!(rendered["properties"].is_object(), "{}", descriptor.name());
    }
}
