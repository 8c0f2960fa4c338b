//! The continuation loop.

use crate::{
    CancelToken, CompletionStrategy, ContinuationConfig, ContinuationMetadata, ContinuationResult,
    IndicatorSet, Outcome,
};
use fableflow_core::{ChatCompletion, ChatRequest, FinishReason, Message};
use fableflow_error::{BuilderError, FableFlowResult, GenerationError, GenerationErrorKind};
use fableflow_interface::ChatDriver;
use tracing::{info, instrument, warn};

/// Message appended after the replayed partial to request resumption.
const CONTINUE_PROMPT: &str =
    "Please continue from exactly where you stopped. Do not repeat any content.";

/// Drives a chat backend through bounded continuation calls, merging
/// chunks into one logical response.
///
/// Truncation is detected two ways, and either alone triggers a
/// continuation: the backend's `finish_reason=length`, and a
/// configured tail phrase the model emits when it self-truncates under
/// `finish_reason=stop`. Relying on finish_reason alone under-detects;
/// pattern matching alone would over-trigger on completed text that
/// merely discusses continuation, so patterns are only consulted on
/// the chunk tail.
#[derive(Debug)]
pub struct ContinuationService<D> {
    driver: D,
    config: ContinuationConfig,
    indicators: IndicatorSet,
}

impl<D: ChatDriver> ContinuationService<D> {
    /// Creates a service over the given driver.
    pub fn new(driver: D, config: ContinuationConfig) -> Self {
        let indicators = IndicatorSet::new(&config.indicator_patterns);
        Self {
            driver,
            config,
            indicators,
        }
    }

    /// The wrapped driver.
    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Generates a complete logical response, continuing past
    /// truncation as needed.
    pub async fn generate(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
    ) -> FableFlowResult<ContinuationResult> {
        self.generate_with_cancel(messages, max_tokens, &CancelToken::new())
            .await
    }

    /// Like [`Self::generate`] but honors a cooperative cancellation
    /// signal, checked between backend calls only.
    ///
    /// # Errors
    ///
    /// Fails if the first backend call fails (there is nothing to
    /// salvage) or if cancellation is observed between iterations.
    /// A backend failure after content has accumulated is not an
    /// error: the accumulated text is returned with
    /// [`Outcome::Partial`].
    #[instrument(skip_all, fields(messages = messages.len(), model = %self.driver.model_name()))]
    pub async fn generate_with_cancel(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
        cancel: &CancelToken,
    ) -> FableFlowResult<ContinuationResult> {
        if !self.config.enabled {
            return self.single_generation(messages, max_tokens).await;
        }

        let chunk_tokens = max_tokens.unwrap_or(self.config.chunk_size);

        let mut accumulated = String::new();
        let mut continuation_count: u32 = 0;
        let mut total_tokens: usize = 0;
        let mut finish_reason = FinishReason::Unknown;
        let mut history: Vec<Message> = messages.to_vec();
        let mut outcome = Outcome::Complete;
        let mut chunk_number: u32 = 0;

        while continuation_count <= self.config.max_continuations {
            if cancel.is_cancelled() {
                return Err(GenerationError::new(GenerationErrorKind::Cancelled(
                    continuation_count,
                ))
                .into());
            }

            let completion = match self.call_backend(&history, chunk_tokens).await {
                Ok(completion) => completion,
                Err(e) if accumulated.is_empty() => return Err(e),
                Err(e) => {
                    // Partial long-form content beats no content here.
                    warn!(error = %e, continuation = continuation_count,
                        "Backend failed mid-continuation; keeping accumulated text");
                    outcome = Outcome::Partial;
                    break;
                }
            };

            total_tokens += completion.token_estimate();
            finish_reason = completion.finish_reason;
            chunk_number += 1;

            let self_reported = finish_reason == FinishReason::Stop
                && self.indicators.detect(&completion.content);

            let chunk = if self_reported {
                self.indicators.clean(&completion.content)
            } else {
                completion.content
            };

            info!(
                chunk = chunk_number,
                chars = chunk.len(),
                finish_reason = %finish_reason,
                "Generated chunk"
            );

            if chunk_number == 1 {
                accumulated = chunk;
            } else {
                accumulated = self.merge_continuation(&accumulated, &chunk);
            }

            match finish_reason {
                FinishReason::Stop if self_reported => {
                    info!("Model self-reported truncation despite stop; continuing");
                    continuation_count += 1;
                    if continuation_count > self.config.max_continuations {
                        warn!(
                            max = self.config.max_continuations,
                            "Maximum continuations reached"
                        );
                        outcome = Outcome::Truncated;
                        break;
                    }
                    history = continuation_messages(messages, &accumulated);
                }
                FinishReason::Stop => {
                    info!(chunks = chunk_number, "Natural completion");
                    outcome = Outcome::Complete;
                    break;
                }
                FinishReason::Length => {
                    continuation_count += 1;
                    if continuation_count > self.config.max_continuations {
                        warn!(
                            max = self.config.max_continuations,
                            "Maximum continuations reached"
                        );
                        outcome = Outcome::Truncated;
                        break;
                    }
                    info!(
                        continuation = continuation_count,
                        max = self.config.max_continuations,
                        "Token limit reached; continuing"
                    );
                    history = continuation_messages(messages, &accumulated);
                }
                FinishReason::ContentFilter | FinishReason::FunctionCall => {
                    info!(finish_reason = %finish_reason, "Generation stopped early");
                    outcome = Outcome::Partial;
                    break;
                }
                FinishReason::Unknown => {
                    warn!("Unknown finish reason; stopping");
                    outcome = Outcome::Partial;
                    break;
                }
            }
        }

        info!(
            chars = accumulated.len(),
            continuations = continuation_count,
            outcome = %outcome,
            "Continuation loop finished"
        );

        Ok(ContinuationResult::new(
            accumulated,
            ContinuationMetadata::new(
                continuation_count,
                finish_reason,
                total_tokens,
                CompletionStrategy::HybridDetection,
                outcome,
            ),
        ))
    }

    /// Single backend call used when continuation is disabled.
    async fn single_generation(
        &self,
        messages: &[Message],
        max_tokens: Option<u32>,
    ) -> FableFlowResult<ContinuationResult> {
        let chunk_tokens = max_tokens.unwrap_or(self.config.chunk_size);
        let completion = self.call_backend(messages, chunk_tokens).await?;

        let outcome = match completion.finish_reason {
            FinishReason::Stop => Outcome::Complete,
            FinishReason::Length => Outcome::Truncated,
            _ => Outcome::Partial,
        };
        let total_tokens = completion.token_estimate();

        Ok(ContinuationResult::new(
            completion.content,
            ContinuationMetadata::new(
                0,
                completion.finish_reason,
                total_tokens,
                CompletionStrategy::Single,
                outcome,
            ),
        ))
    }

    async fn call_backend(
        &self,
        messages: &[Message],
        chunk_tokens: u32,
    ) -> FableFlowResult<ChatCompletion> {
        let request = ChatRequest::builder()
            .messages(messages.to_vec())
            .max_tokens(chunk_tokens)
            .build()
            .map_err(|e| BuilderError::from(e.to_string()))?;
        self.driver.generate(&request).await
    }

    /// Merges a continuation chunk onto the accumulated text, stripping
    /// any known preamble and separating with a blank line unless the
    /// accumulated text already ends in a newline.
    fn merge_continuation(&self, original: &str, continuation: &str) -> String {
        let mut chunk = continuation.trim();
        for prefix in &self.config.preamble_prefixes {
            if let Some(stripped) = chunk.strip_prefix(prefix.as_str()) {
                chunk = stripped.trim_start();
                break;
            }
        }

        if original.ends_with('\n') {
            format!("{}{}", original, chunk)
        } else {
            format!("{}\n\n{}", original, chunk)
        }
    }
}

/// Builds the replay history for a continuation call: the original
/// messages, the assistant's partial so far, then the resume request.
fn continuation_messages(original: &[Message], partial: &str) -> Vec<Message> {
    let mut messages = original.to_vec();
    messages.push(Message::assistant(partial));
    messages.push(Message::user(CONTINUE_PROMPT));
    messages
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn continuation_history_replays_partial_then_requests_resume() {
        let original = vec![Message::system("sys"), Message::user("write a story")];
        let history = continuation_messages(&original, "Once upon a time");
        assert_eq!(history.len(), 4);
        assert_eq!(history[2].content, "Once upon a time");
        assert_eq!(history[3].content, CONTINUE_PROMPT);
    }
}
