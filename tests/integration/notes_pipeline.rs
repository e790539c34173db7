//! Notes generation: text first, then every illustration concurrently

use super::test_utils::Harness;
use serde_json::json;
use studyforge::error::ApiError;
use studyforge::markup::Segment;
use studyforge::pipelines::NotesInput;
use studyforge::provider::{MockReply, ModelRole};

fn notes_reply() -> MockReply {
    MockReply::json(json!({
        "notes": "Diodes conduct one way. [IMAGE_1] Bias changes the depletion region. [IMAGE_2] Summary.",
        "imagePrompts": ["forward biased junction", "reverse biased junction"],
    }))
}

fn input() -> NotesInput {
    NotesInput {
        topic: "PN junction diode".into(),
    }
}

#[tokio::test]
async fn test_one_image_per_prompt_in_prompt_order() {
    let harness = Harness::handled(|request| match request.role {
        ModelRole::Text => notes_reply(),
        _ if request.user.contains("forward") => MockReply::image("FORWARD"),
        _ => MockReply::image("REVERSE"),
    });

    let document = harness.pipelines.generate_notes(&input()).await.unwrap();

    assert_eq!(document.images.len(), document.image_prompts.len());
    assert!(document.images[0].as_str().ends_with("FORWARD"));
    assert!(document.images[1].as_str().ends_with("REVERSE"));

    let resolved: Vec<(usize, &str)> = document
        .segments()
        .into_iter()
        .filter_map(|segment| match segment {
            Segment::Image { number, asset } => Some((number, asset.as_str())),
            Segment::Text(_) => None,
        })
        .collect();
    assert_eq!(resolved.len(), 2);
    assert_eq!(resolved[0].0, 1);
    assert!(resolved[0].1.ends_with("FORWARD"));
    assert_eq!(resolved[1].0, 2);
    assert!(resolved[1].1.ends_with("REVERSE"));
}

#[tokio::test]
async fn test_diagram_prompt_wraps_each_image_prompt() {
    let harness = Harness::handled(|request| match request.role {
        ModelRole::Text => notes_reply(),
        _ => MockReply::image("AAAA"),
    });

    harness.pipelines.generate_notes(&input()).await.unwrap();

    let mut prompts: Vec<String> = harness.image_calls().into_iter().map(|c| c.user).collect();
    prompts.sort();
    assert_eq!(
        prompts,
        vec![
            "An engineering diagram illustrating the concept of: forward biased junction. Clean, clear, and professional.",
            "An engineering diagram illustrating the concept of: reverse biased junction. Clean, clear, and professional.",
        ]
    );
}

#[tokio::test]
async fn test_one_failed_image_fails_the_request() {
    let harness = Harness::handled(|request| match request.role {
        ModelRole::Text => notes_reply(),
        _ if request.user.contains("reverse") => MockReply::fail("Request failed with status 500"),
        _ => MockReply::image("AAAA"),
    });

    let err = harness.pipelines.generate_notes(&input()).await.unwrap_err();

    match err {
        ApiError::AssetGeneration { index, message } => {
            assert_eq!(index, 1);
            assert!(message.contains("500"));
        }
        other => panic!("expected asset generation error, got {other:?}"),
    }
}

#[tokio::test]
async fn test_no_prompts_means_no_images() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "notes": "Plain notes without figures.",
        "imagePrompts": [],
    }))]);

    let document = harness.pipelines.generate_notes(&input()).await.unwrap();

    assert!(document.images.is_empty());
    assert_eq!(harness.backend.call_count(), 1);
}

#[tokio::test]
async fn test_empty_notes_stop_before_images() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "notes": "",
        "imagePrompts": ["unused"],
    }))]);

    let err = harness.pipelines.generate_notes(&input()).await.unwrap_err();

    assert!(matches!(err, ApiError::EmptyResult { field: "notes", .. }));
    assert_eq!(harness.backend.call_count(), 1);
}
