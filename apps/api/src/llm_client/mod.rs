//! LLM client: the single point of entry for all Claude API calls in the service.
//!
//! No other module may call the Anthropic API directly.
//! Model: claude-sonnet-4-5 (hardcoded, not configurable)

use std::collections::VecDeque;

use futures::stream::{self, BoxStream, StreamExt};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::summary::decoder::Utf8ChunkDecoder;

pub mod prompts;
pub mod sse;

const ANTHROPIC_API_URL: &str = "https://api.anthropic.com/v1/messages";
const ANTHROPIC_VERSION: &str = "2023-06-01";
/// The model used for all LLM calls.
/// This is intentionally hardcoded to prevent accidental drift.
pub const MODEL: &str = "claude-sonnet-4-5";
const MAX_TOKENS: u32 = 1024;
const MAX_RETRIES: u32 = 3;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error (status {status}): {message}")]
    Api { status: u16, message: String },

    #[error("Rate limited after {retries} retries")]
    RateLimited { retries: u32 },

    #[error("Stream ended before message_stop")]
    Truncated,
}

/// Text deltas in arrival order. Ends after `message_stop` or the first error;
/// a body that ends without `message_stop` yields `LlmError::Truncated`.
pub type TextStream = BoxStream<'static, Result<String, LlmError>>;

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<AnthropicMessage<'a>>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct AnthropicError {
    error: AnthropicErrorBody,
}

#[derive(Debug, Deserialize)]
pub(crate) struct AnthropicErrorBody {
    message: String,
}

/// Server-sent event payloads of the streaming Messages API that we act on.
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum StreamEvent {
    ContentBlockDelta { delta: Delta },
    MessageStop,
    Error { error: AnthropicErrorBody },
    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub(crate) enum Delta {
    TextDelta { text: String },
    #[serde(other)]
    Other,
}

/// The single LLM client used by all services.
/// Wraps the Anthropic Messages API with retry logic and SSE streaming.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    api_key: String,
}

impl LlmClient {
    pub fn new(api_key: String) -> Result<Self, LlmError> {
        Ok(Self {
            client: Client::builder()
                .timeout(std::time::Duration::from_secs(120))
                .build()?,
            api_key,
        })
    }

    /// Starts a streaming call and returns the text deltas as they arrive.
    /// Retries on 429 (rate limit) and 5xx errors with exponential backoff,
    /// but only until the response headers are in; a stream that fails
    /// midway is reported, not replayed.
    pub async fn stream(&self, prompt: &str, system: &str) -> Result<TextStream, LlmError> {
        let request_body = AnthropicRequest {
            model: MODEL,
            max_tokens: MAX_TOKENS,
            system,
            messages: vec![AnthropicMessage {
                role: "user",
                content: prompt,
            }],
            stream: true,
        };

        let mut last_error: Option<LlmError> = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                // Exponential backoff: 1s, 2s
                let delay = std::time::Duration::from_millis(1000 * (1 << (attempt - 1)));
                warn!(
                    "LLM call attempt {} failed, retrying after {}ms...",
                    attempt,
                    delay.as_millis()
                );
                tokio::time::sleep(delay).await;
            }

            let response = self
                .client
                .post(ANTHROPIC_API_URL)
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", ANTHROPIC_VERSION)
                .header("content-type", "application/json")
                .json(&request_body)
                .send()
                .await;

            let response = match response {
                Ok(r) => r,
                Err(e) => {
                    last_error = Some(LlmError::Http(e));
                    continue;
                }
            };

            let status = response.status();

            if status.as_u16() == 429 || status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                warn!("LLM API returned {}: {}", status, body);
                last_error = Some(LlmError::Api {
                    status: status.as_u16(),
                    message: body,
                });
                continue;
            }

            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(LlmError::Api {
                    status: status.as_u16(),
                    message: api_error_message(body),
                });
            }

            debug!("LLM stream opened (attempt {})", attempt + 1);
            return Ok(text_deltas(response));
        }

        Err(last_error.unwrap_or(LlmError::RateLimited {
            retries: MAX_RETRIES,
        }))
    }
}

/// Pulls the human-readable message out of an Anthropic error body, falling
/// back to the raw body.
fn api_error_message(body: String) -> String {
    serde_json::from_str::<AnthropicError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

struct DeltaState<S> {
    bytes: S,
    decoder: Utf8ChunkDecoder,
    buffer: String,
    ready: VecDeque<Result<String, LlmError>>,
    stopped: bool,
    finished: bool,
}

fn text_deltas(response: Response) -> TextStream {
    sse_text_deltas(Box::pin(response.bytes_stream()))
}

/// Turns a raw SSE byte stream from the Messages API into text deltas.
pub(crate) fn sse_text_deltas<S>(bytes: S) -> TextStream
where
    S: futures::Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send + Unpin + 'static,
{
    let state = DeltaState {
        bytes,
        decoder: Utf8ChunkDecoder::default(),
        buffer: String::new(),
        ready: VecDeque::new(),
        stopped: false,
        finished: false,
    };

    stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.ready.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let text = state.decoder.decode(&chunk);
                    state.buffer.push_str(&text);
                    for event in sse::drain_sse_events(&mut state.buffer) {
                        match serde_json::from_value::<StreamEvent>(event) {
                            Ok(StreamEvent::ContentBlockDelta {
                                delta: Delta::TextDelta { text },
                            }) => state.ready.push_back(Ok(text)),
                            Ok(StreamEvent::MessageStop) => {
                                state.stopped = true;
                                state.finished = true;
                                break;
                            }
                            Ok(StreamEvent::Error { error }) => {
                                state.ready.push_back(Err(LlmError::Api {
                                    status: 200,
                                    message: error.message,
                                }));
                                state.finished = true;
                                break;
                            }
                            Ok(_) => {}
                            Err(e) => {
                                debug!("Skipping unrecognised stream event: {e}");
                            }
                        }
                    }
                }
                Some(Err(e)) => {
                    state.ready.push_back(Err(LlmError::Http(e)));
                    state.finished = true;
                }
                None => {
                    if !state.stopped {
                        warn!("LLM stream closed before message_stop");
                        state.ready.push_back(Err(LlmError::Truncated));
                    }
                    state.finished = true;
                }
            }
        }
    })
    .boxed()
}
