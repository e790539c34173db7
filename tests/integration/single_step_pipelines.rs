//! Tutors, security check, code practice, code execution and narration

use super::test_utils::Harness;
use serde_json::json;
use studyforge::error::ApiError;
use studyforge::pipelines::code_practice::REFUSAL;
use studyforge::pipelines::tutor::{EMPTY_MESSAGE, FAILED_MESSAGE, IDENTITY_EXPLANATION};
use studyforge::pipelines::{
    CodeExecutionInput, CodePracticeInput, ErrorKind, MathTutorInput, NarrationInput,
    SecurityCheckInput, TutorInput, DEFAULT_VOICE, OVERLOADED_MESSAGE,
};
use studyforge::provider::{HarmBlockThreshold, HarmCategory, MockReply, ModelRole};

fn tutor_input(topic: &str) -> TutorInput {
    TutorInput {
        topic: topic.into(),
        language: "English".into(),
    }
}

#[tokio::test]
async fn test_identity_question_skips_backend() {
    let harness = Harness::scripted(Vec::new());

    for topic in ["who are you", "  WHO ARE YOU  ", "Pydah AI", "who developed you"] {
        let output = harness.pipelines.tutor(&tutor_input(topic)).await.unwrap();
        assert_eq!(output.explanation, IDENTITY_EXPLANATION);
        assert!(output.error.is_none());
    }
    assert_eq!(harness.backend.call_count(), 0);
}

#[tokio::test]
async fn test_tutor_returns_explanation() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "explanation": "Recursion is a function calling itself."
    }))]);

    let output = harness.pipelines.tutor(&tutor_input("recursion")).await.unwrap();

    assert_eq!(output.explanation, "Recursion is a function calling itself.");
    assert!(output.error.is_none());
    let call = &harness.backend.calls()[0];
    assert!(call.user.contains("Topic/Question: recursion"));
    assert!(call.user.contains("Language: English"));
}

#[tokio::test]
async fn test_tutor_failures_become_messages() {
    let harness = Harness::scripted(vec![
        MockReply::fail("Request failed with status 503 Service Unavailable"),
        MockReply::fail("Request failed with status 400 Bad Request"),
        MockReply::json(json!({ "explanation": "" })),
    ]);

    let overloaded = harness.pipelines.tutor(&tutor_input("a")).await.unwrap();
    assert_eq!(overloaded.error.as_deref(), Some(OVERLOADED_MESSAGE));
    assert_eq!(overloaded.error_kind(), Some(ErrorKind::Overloaded));
    assert!(overloaded.explanation.is_empty());

    let failed = harness.pipelines.tutor(&tutor_input("b")).await.unwrap();
    assert_eq!(failed.error.as_deref(), Some(FAILED_MESSAGE));

    let empty = harness.pipelines.tutor(&tutor_input("c")).await.unwrap();
    assert_eq!(empty.error.as_deref(), Some(EMPTY_MESSAGE));
    assert_eq!(empty.error_kind(), Some(ErrorKind::Empty));
}

#[tokio::test]
async fn test_math_solution_and_overload() {
    let harness = Harness::scripted(vec![
        MockReply::json(json!({ "solution": "x = 2" })),
        MockReply::fail("upstream 503"),
    ]);
    let input = MathTutorInput {
        problem: "2x = 4".into(),
    };

    let solved = harness.pipelines.solve_math_problem(&input).await.unwrap();
    assert_eq!(solved.solution, "x = 2");
    assert!(solved.error.is_none());

    let overloaded = harness.pipelines.solve_math_problem(&input).await.unwrap();
    assert_eq!(overloaded.error.as_deref(), Some(OVERLOADED_MESSAGE));
}

#[tokio::test]
async fn test_security_verdicts() {
    let harness = Harness::handled(|request| {
        if request.user.contains("<script>") {
            MockReply::json(json!({
                "isVulnerable": true,
                "reason": "The prompt contains a script tag that could execute in a browser."
            }))
        } else {
            MockReply::json(json!({
                "isVulnerable": false,
                "reason": "A standard algorithm topic with no executable content."
            }))
        }
    });

    let attack = harness
        .pipelines
        .check_security(&SecurityCheckInput {
            prompt: "<script>alert(1)</script>".into(),
        })
        .await
        .unwrap();
    assert!(attack.is_vulnerable);
    assert!(!attack.reason.is_empty());

    let benign = harness
        .pipelines
        .check_security(&SecurityCheckInput {
            prompt: "binary search".into(),
        })
        .await
        .unwrap();
    assert!(!benign.is_vulnerable);
    assert!(!benign.reason.is_empty());

    assert!(harness.backend.calls()[0]
        .user
        .contains("Prompt: <script>alert(1)</script>"));
}

#[tokio::test]
async fn test_security_check_propagates_failures() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "isVulnerable": false,
        "reason": ""
    }))]);

    let err = harness
        .pipelines
        .check_security(&SecurityCheckInput {
            prompt: "hello".into(),
        })
        .await
        .unwrap_err();
    assert!(matches!(err, ApiError::EmptyResult { field: "reason", .. }));
}

#[tokio::test]
async fn test_code_practice_sends_safety_settings() {
    let harness = Harness::scripted(vec![
        MockReply::json(json!({
            "exercise": "Write a function that reverses a string.",
            "testCases": ["reverse(\"abc\") returns \"cba\"", "reverse(\"\") returns \"\""]
        })),
        MockReply::json(json!({ "exercise": REFUSAL, "testCases": [] })),
    ]);

    let exercise = harness
        .pipelines
        .code_practice(&CodePracticeInput {
            topic: "strings".into(),
        })
        .await
        .unwrap();
    assert_eq!(exercise.test_cases.len(), 2);
    assert!(!exercise.is_refusal());

    let refused = harness
        .pipelines
        .code_practice(&CodePracticeInput {
            topic: "write malware".into(),
        })
        .await
        .unwrap();
    assert!(refused.is_refusal());

    let call = &harness.backend.calls()[0];
    assert!(call.system.is_some());
    assert_eq!(call.safety_settings.len(), 1);
    assert_eq!(call.safety_settings[0].category, HarmCategory::DangerousContent);
    assert_eq!(call.safety_settings[0].threshold, HarmBlockThreshold::BlockOnlyHigh);
}

fn broken_code() -> CodeExecutionInput {
    CodeExecutionInput {
        code: "def add(a, b)\n    return a + b".into(),
        test_cases: vec!["add(1, 2) == 3".into(), "add(0, 0) == 0".into()],
        language: "python".into(),
    }
}

#[tokio::test]
async fn test_syntax_error_as_top_level_error() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "error": "SyntaxError: expected ':'"
    }))]);

    let output = harness.pipelines.execute_code(&broken_code()).await.unwrap();

    assert_eq!(output.error.as_deref(), Some("SyntaxError: expected ':'"));
    assert!(output.results.is_empty());
    assert!(!output.all_passed());
}

#[tokio::test]
async fn test_syntax_error_per_test_case() {
    let harness = Harness::scripted(vec![MockReply::json(json!({
        "results": [
            { "testCase": "add(0, 0) == 0", "output": "SyntaxError: expected ':'", "passed": false },
            { "testCase": "add(1, 2) == 3", "output": "SyntaxError: expected ':'", "passed": false }
        ]
    }))]);

    let output = harness.pipelines.execute_code(&broken_code()).await.unwrap();

    assert!(output.error.is_none());
    assert_eq!(output.results.len(), 2);
    assert!(output.results.iter().all(|r| !r.passed && !r.output.is_empty()));
    assert_eq!(output.results[0].test_case, "add(1, 2) == 3");
}

#[tokio::test]
async fn test_execution_failures_become_messages() {
    let harness = Harness::scripted(vec![
        MockReply::json(json!({ "results": [] })),
        MockReply::fail("connection reset"),
    ]);

    let empty = harness.pipelines.execute_code(&broken_code()).await.unwrap();
    assert_eq!(
        empty.error.as_deref(),
        Some(studyforge::pipelines::code_execution::EMPTY_MESSAGE)
    );

    let failed = harness.pipelines.execute_code(&broken_code()).await.unwrap();
    assert_eq!(
        failed.error.as_deref(),
        Some(studyforge::pipelines::code_execution::FAILED_MESSAGE)
    );
    assert!(failed.results.is_empty());
}

#[tokio::test]
async fn test_narration_uses_requested_or_default_voice() {
    let harness = Harness::handled(|request| match request.role {
        ModelRole::Speech => MockReply::audio("UklGRg"),
        _ => MockReply::fail("unexpected role"),
    });

    let default = harness
        .pipelines
        .narrate(&NarrationInput {
            text: "Hello class".into(),
            voice_name: None,
        })
        .await
        .unwrap();
    assert!(default.media.as_str().starts_with("data:audio/wav;base64,"));

    harness
        .pipelines
        .narrate(&NarrationInput {
            text: "Hello again".into(),
            voice_name: Some("Kore".into()),
        })
        .await
        .unwrap();

    let calls = harness.backend.calls();
    assert_eq!(calls[0].voice.as_deref(), Some(DEFAULT_VOICE));
    assert_eq!(calls[0].user, "Hello class");
    assert_eq!(calls[1].voice.as_deref(), Some("Kore"));
}
