//! Continuation-loop behavior against a scripted backend.

use async_trait::async_trait;
use fableflow_continuation::{
    CancelToken, CompletionStrategy, ContinuationConfig, ContinuationService, Outcome,
};
use fableflow_core::{ChatCompletion, ChatRequest, FinishReason, Message, Role, TokenUsage};
use fableflow_error::{FableFlowResult, GenerationError, GenerationErrorKind};
use fableflow_interface::ChatDriver;
use std::sync::Mutex;

/// Scripted backend: returns queued responses in order and records
/// every request it receives.
struct MockDriver {
    script: Mutex<Vec<FableFlowResult<ChatCompletion>>>,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockDriver {
    fn new(script: Vec<FableFlowResult<ChatCompletion>>) -> Self {
        let mut script = script;
        script.reverse();
        Self {
            script: Mutex::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn completion(content: &str, finish_reason: FinishReason) -> FableFlowResult<ChatCompletion> {
        Ok(ChatCompletion {
            content: content.to_string(),
            finish_reason,
            usage: Some(TokenUsage::new(10, 20)),
        })
    }

    fn failure(message: &str) -> FableFlowResult<ChatCompletion> {
        Err(GenerationError::new(GenerationErrorKind::Request(message.to_string())).into())
    }

    fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn recorded_requests(&self) -> Vec<ChatRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChatDriver for MockDriver {
    async fn generate(&self, req: &ChatRequest) -> FableFlowResult<ChatCompletion> {
        self.requests.lock().unwrap().push(req.clone());
        self.script
            .lock()
            .unwrap()
            .pop()
            .unwrap_or_else(|| MockDriver::failure("script exhausted"))
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }

    fn model_name(&self) -> &str {
        "mock-model"
    }
}

fn prompt() -> Vec<Message> {
    vec![
        Message::system("You are a storyteller."),
        Message::user("Write a story."),
    ]
}

fn service(script: Vec<FableFlowResult<ChatCompletion>>) -> ContinuationService<MockDriver> {
    ContinuationService::new(MockDriver::new(script), ContinuationConfig::default())
}

#[tokio::test]
async fn natural_stop_issues_exactly_one_call() {
    let svc = service(vec![MockDriver::completion(
        "A complete story.",
        FinishReason::Stop,
    )]);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 1);
    assert_eq!(result.text(), "A complete story.");
    assert_eq!(*result.metadata().total_continuations(), 0);
    assert_eq!(*result.metadata().outcome(), Outcome::Complete);
    assert_eq!(
        *result.metadata().strategy(),
        CompletionStrategy::HybridDetection
    );
}

#[tokio::test]
async fn length_twice_then_stop_issues_three_calls_and_merges() {
    let svc = service(vec![
        MockDriver::completion("Part one.", FinishReason::Length),
        MockDriver::completion("Part two.", FinishReason::Length),
        MockDriver::completion("Part three.", FinishReason::Stop),
    ]);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 3);
    assert_eq!(result.text(), "Part one.\n\nPart two.\n\nPart three.");
    assert_eq!(*result.metadata().total_continuations(), 2);
    assert_eq!(*result.metadata().finish_reason(), FinishReason::Stop);
    assert_eq!(*result.metadata().outcome(), Outcome::Complete);
}

#[tokio::test]
async fn continuation_replays_partial_and_requests_resume() {
    let svc = service(vec![
        MockDriver::completion("Part one.", FinishReason::Length),
        MockDriver::completion("Part two.", FinishReason::Stop),
    ]);

    svc.generate(&prompt(), None).await.unwrap();

    let requests = svc.driver().recorded_requests();
    let second = &requests[1];
    assert_eq!(second.messages.len(), 4);
    assert_eq!(second.messages[2].role, Role::Assistant);
    assert_eq!(second.messages[2].content, "Part one.");
    assert_eq!(second.messages[3].role, Role::User);
    assert!(second.messages[3].content.contains("Do not repeat"));
}

#[tokio::test]
async fn self_reported_truncation_under_stop_continues_and_strips_marker() {
    let svc = service(vec![
        MockDriver::completion(
            "Chapter one text.\n\n[Continuing in next response due to length constraints...]",
            FinishReason::Stop,
        ),
        MockDriver::completion("Chapter two text.", FinishReason::Stop),
    ]);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 2);
    assert_eq!(result.text(), "Chapter one text.\n\nChapter two text.");
    assert_eq!(*result.metadata().total_continuations(), 1);
    assert!(!result.text().to_lowercase().contains("continuing in next response"));
}

#[tokio::test]
async fn continuation_count_never_exceeds_configured_maximum() {
    let config = ContinuationConfig {
        max_continuations: 2,
        ..ContinuationConfig::default()
    };
    let script = (0..10)
        .map(|i| MockDriver::completion(&format!("Part {}.", i), FinishReason::Length))
        .collect();
    let svc = ContinuationService::new(MockDriver::new(script), config);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 3);
    assert_eq!(*result.metadata().total_continuations(), 2);
    assert_eq!(*result.metadata().outcome(), Outcome::Truncated);
    assert_eq!(*result.metadata().finish_reason(), FinishReason::Length);
    assert_eq!(result.text(), "Part 0.\n\nPart 1.\n\nPart 2.");
}

#[tokio::test]
async fn preamble_prefix_is_stripped_on_merge() {
    let svc = service(vec![
        MockDriver::completion("Part one.", FinishReason::Length),
        MockDriver::completion("Continuing: part two.", FinishReason::Stop),
    ]);

    let result = svc.generate(&prompt(), None).await.unwrap();
    assert_eq!(result.text(), "Part one.\n\npart two.");
}

#[tokio::test]
async fn content_filter_stops_with_partial_outcome() {
    let svc = service(vec![MockDriver::completion(
        "Some text before the filter.",
        FinishReason::ContentFilter,
    )]);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 1);
    assert_eq!(*result.metadata().outcome(), Outcome::Partial);
    assert_eq!(result.text(), "Some text before the filter.");
}

#[tokio::test]
async fn backend_failure_mid_loop_keeps_accumulated_text() {
    let svc = service(vec![
        MockDriver::completion("Part one.", FinishReason::Length),
        MockDriver::failure("connection reset"),
    ]);

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(result.text(), "Part one.");
    assert_eq!(*result.metadata().outcome(), Outcome::Partial);
}

#[tokio::test]
async fn backend_failure_on_first_call_is_an_error() {
    let svc = service(vec![MockDriver::failure("connection refused")]);
    assert!(svc.generate(&prompt(), None).await.is_err());
}

#[tokio::test]
async fn disabled_config_never_appends_continue_message() {
    let config = ContinuationConfig {
        enabled: false,
        ..ContinuationConfig::default()
    };
    let svc = ContinuationService::new(
        MockDriver::new(vec![MockDriver::completion(
            "One shot.",
            FinishReason::Stop,
        )]),
        config,
    );

    let result = svc.generate(&prompt(), None).await.unwrap();

    assert_eq!(svc.driver().call_count(), 1);
    assert_eq!(*result.metadata().strategy(), CompletionStrategy::Single);
    for request in svc.driver().recorded_requests() {
        for message in &request.messages {
            assert!(!message.content.contains("Please continue"));
        }
    }
    assert_eq!(result.text(), "One shot.");
}

#[tokio::test]
async fn cancellation_between_iterations_is_reported() {
    let svc = service(vec![MockDriver::completion("never", FinishReason::Stop)]);
    let token = CancelToken::new();
    token.cancel();

    let err = svc
        .generate_with_cancel(&prompt(), None, &token)
        .await
        .unwrap_err();
    assert!(format!("{}", err).contains("cancelled"));
    assert_eq!(svc.driver().call_count(), 0);
}

#[tokio::test]
async fn caller_max_tokens_overrides_chunk_size() {
    let svc = service(vec![MockDriver::completion("ok", FinishReason::Stop)]);
    svc.generate(&prompt(), Some(512)).await.unwrap();
    assert_eq!(svc.driver().recorded_requests()[0].max_tokens, Some(512));
}
