//! Presentation generation: per-slide images, the image cap, and pacing

use super::test_utils::{slide_json, Harness};
use serde_json::json;
use std::time::Duration;
use studyforge::config::PipelineConfig;
use studyforge::error::ApiError;
use studyforge::pipelines::{Presentation, PresentationInput};
use studyforge::provider::{GenerationRequest, MockBackend, MockReply, ModelRole};

fn deck_handler(
    deck: serde_json::Value,
) -> impl Fn(&GenerationRequest) -> MockReply + Send + Sync + 'static {
    move |request| match request.role {
        ModelRole::Text => MockReply::json(deck.clone()),
        _ if request.user.contains("broken") => {
            MockReply::fail("Request failed with status 500 Internal Server Error")
        }
        _ => MockReply::image("iVBORw0KGgo"),
    }
}

fn topic() -> PresentationInput {
    PresentationInput {
        topic: "Graph algorithms".into(),
    }
}

#[tokio::test]
async fn test_images_align_with_slides() {
    let deck = json!({
        "title": "Graphs",
        "slides": [
            slide_json("Title", Some("")),
            slide_json("BFS", Some("queue of nodes")),
            slide_json("DFS", None),
            slide_json("Dijkstra", Some("broken weighted graph")),
            slide_json("A*", Some("heuristic search")),
        ]
    });
    let harness = Harness::handled(deck_handler(deck));

    let result = harness.pipelines.generate_presentation(&topic()).await.unwrap();

    assert_eq!(result.slides.len(), 5);
    assert_eq!(result.images.len(), 5);
    let present: Vec<bool> = result.images.iter().map(Option::is_some).collect();
    assert_eq!(present, vec![false, true, false, false, true]);
    assert!(result.images[1]
        .as_ref()
        .unwrap()
        .as_str()
        .starts_with("data:image/png;base64,"));

    // empty and absent prompts are never sent
    let prompts: Vec<String> = harness.image_calls().into_iter().map(|c| c.user).collect();
    assert_eq!(prompts.len(), 3);
    assert!(prompts[0].contains("queue of nodes"));
    assert!(prompts[1].contains("broken weighted graph"));
    assert!(prompts[2].contains("heuristic search"));
}

#[tokio::test]
async fn test_slides_past_the_cap_get_no_image() {
    let slides: Vec<_> = (0..12)
        .map(|i| slide_json(&format!("Slide {}", i), Some(&format!("picture {}", i))))
        .collect();
    let harness = Harness::handled(deck_handler(json!({ "title": "Long", "slides": slides })));

    let result = harness.pipelines.generate_presentation(&topic()).await.unwrap();

    assert_eq!(result.images.len(), 12);
    assert!(result.images[..10].iter().all(Option::is_some));
    assert!(result.images[10..].iter().all(Option::is_none));
    assert_eq!(harness.image_calls().len(), 10);
    assert_eq!(result.image_count(), 10);
}

#[tokio::test]
async fn test_cap_follows_configuration() {
    let slides: Vec<_> = (0..4)
        .map(|i| slide_json(&format!("Slide {}", i), Some("a chart")))
        .collect();
    let config = PipelineConfig {
        max_presentation_images: 2,
        image_interval_ms: 1000,
    };
    let harness = Harness::with_config(
        MockBackend::with_handler(deck_handler(json!({ "title": "Short", "slides": slides }))),
        config,
    );

    let result = harness.pipelines.generate_presentation(&topic()).await.unwrap();
    let present: Vec<bool> = result.images.iter().map(Option::is_some).collect();
    assert_eq!(present, vec![true, true, false, false]);
}

#[tokio::test]
async fn test_empty_deck_makes_no_calls() {
    let harness = Harness::scripted(Vec::new());
    let deck = Presentation {
        title: "Nothing".into(),
        slides: Vec::new(),
    };

    let result = harness.pipelines.attach_images(deck).await.unwrap();

    assert!(result.images.is_empty());
    assert_eq!(harness.backend.call_count(), 0);
    assert!(harness.clock.sleeps().is_empty());
}

#[tokio::test]
async fn test_pause_follows_each_successful_image() {
    let slides: Vec<_> = (0..3)
        .map(|i| slide_json(&format!("Slide {}", i), Some("a diagram")))
        .collect();
    let harness = Harness::handled(deck_handler(json!({ "title": "Paced", "slides": slides })));

    harness.pipelines.generate_presentation(&topic()).await.unwrap();

    assert_eq!(
        harness.clock.sleeps(),
        vec![Duration::from_millis(1000), Duration::from_millis(1000)]
    );
}

#[tokio::test]
async fn test_failed_image_leaves_no_pause() {
    let deck = json!({
        "title": "Mixed",
        "slides": [
            slide_json("One", Some("broken first")),
            slide_json("Two", Some("fine")),
            slide_json("Three", Some("fine again")),
        ]
    });
    let harness = Harness::handled(deck_handler(deck));

    let result = harness.pipelines.generate_presentation(&topic()).await.unwrap();

    let present: Vec<bool> = result.images.iter().map(Option::is_some).collect();
    assert_eq!(present, vec![false, true, true]);
    assert_eq!(harness.clock.sleeps(), vec![Duration::from_millis(1000)]);
}

#[tokio::test]
async fn test_content_failure_propagates() {
    let harness = Harness::scripted(vec![MockReply::fail("Request failed with status 503")]);
    let err = harness.pipelines.generate_presentation(&topic()).await.unwrap_err();
    assert!(err.is_overloaded());
    assert!(matches!(err, ApiError::Generation(_)));
}

#[tokio::test]
async fn test_text_only_deck() {
    let deck = json!({ "title": "Plain", "slides": [slide_json("Only", Some("art"))] });
    let harness = Harness::scripted(vec![MockReply::json(deck)]);

    let presentation = harness
        .pipelines
        .generate_presentation_content(&topic())
        .await
        .unwrap();

    assert_eq!(presentation.slides[0].image_prompt.as_deref(), Some("art"));
    assert_eq!(harness.backend.call_count(), 1);
}
