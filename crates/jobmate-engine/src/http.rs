//! Streaming HTTP transport for OpenAI-compatible chat completions.

use std::collections::VecDeque;
use std::pin::Pin;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{Stream, StreamExt, TryStreamExt, stream};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::EndpointConfig;
use crate::errors::{EngineError, TransportError};
use crate::message::ChatMessage;
use crate::sse::SseDecoder;
use crate::transport::{EventStream, StreamEvent, TokenUsage, Transport, TransportRequest};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, TransportError>> + Send + 'static>>;

/// [`Transport`] over reqwest against an OpenAI-compatible endpoint.
///
/// One `POST /v1/chat/completions` per run, response consumed as SSE frames.
/// The configured timeout bounds silence between chunks, not the whole
/// stream, so long generations are never cut off while healthy.
pub struct HttpTransport {
    config: EndpointConfig,
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(config: EndpointConfig) -> Result<Self, EngineError> {
        if config.model.is_empty() {
            return Err(EngineError::config("model must not be empty"));
        }
        if config.base_url.is_empty() {
            return Err(EngineError::config("base_url must not be empty"));
        }
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .read_timeout(config.timeout)
            .build()
            .map_err(|err| EngineError::config(format!("failed to build http client: {err}")))?;
        Ok(Self { config, client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn open_stream(&self, request: TransportRequest) -> Result<EventStream, TransportError> {
        let body = build_request_body(&self.config, &request);
        debug!(
            run_id = %request.run_id,
            model = %self.config.model,
            messages = request.messages.len(),
            "opening chat completion stream"
        );

        let mut http = self
            .client
            .post(self.config.chat_completions_url())
            .json(&body);
        if let Some(key) = &self.config.api_key {
            http = http.bearer_auth(key);
        }

        let response = http
            .send()
            .await
            .map_err(|err| TransportError::request(err.to_string()))?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(TransportError::http(status.as_u16(), body));
        }

        let bytes: ByteStream = Box::pin(
            response
                .bytes_stream()
                .map_err(|err| TransportError::read(err.to_string())),
        );
        Ok(Box::pin(event_stream(bytes)))
    }
}

#[derive(Debug, Serialize)]
struct ChatCompletionBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    stream: bool,
    stream_options: StreamOptions,
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

fn build_request_body<'a>(
    config: &'a EndpointConfig,
    request: &'a TransportRequest,
) -> ChatCompletionBody<'a> {
    ChatCompletionBody {
        model: &config.model,
        messages: &request.messages,
        temperature: request.temperature,
        max_tokens: request.max_output_tokens,
        stream: true,
        stream_options: StreamOptions {
            include_usage: true,
        },
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    #[serde(default)]
    prompt_tokens: Option<u32>,
    #[serde(default)]
    completion_tokens: Option<u32>,
}

struct DecodeState {
    bytes: ByteStream,
    decoder: SseDecoder,
    ready: VecDeque<StreamEvent>,
    usage: TokenUsage,
    finished: bool,
    eof: bool,
}

/// Turns the raw response bytes into the transport event sequence.
///
/// Deltas come from `choices[0].delta.content`, the last usage object seen
/// wins, and `[DONE]` maps to the single terminal [`StreamEvent::Done`].
/// End of input before `[DONE]` is malformed framing.
fn event_stream(bytes: ByteStream) -> impl Stream<Item = Result<StreamEvent, TransportError>> {
    let state = DecodeState {
        bytes,
        decoder: SseDecoder::default(),
        ready: VecDeque::new(),
        usage: TokenUsage::default(),
        finished: false,
        eof: false,
    };
    stream::try_unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Ok(Some((event, state)));
            }
            if state.finished {
                return Ok(None);
            }
            if state.eof {
                return Err(TransportError::framing("stream closed before terminal event"));
            }
            match state.bytes.next().await {
                Some(Ok(chunk)) => {
                    let frames = state.decoder.feed(&chunk);
                    absorb_frames(&mut state, frames)?;
                }
                Some(Err(err)) => return Err(err),
                None => {
                    state.eof = true;
                    if let Some(tail) = state.decoder.finish() {
                        absorb_frames(&mut state, vec![tail])?;
                    }
                }
            }
        }
    })
}

fn absorb_frames(state: &mut DecodeState, frames: Vec<String>) -> Result<(), TransportError> {
    for frame in frames {
        if frame.is_empty() {
            continue;
        }
        if frame == "[DONE]" {
            state.ready.push_back(StreamEvent::Done { usage: state.usage });
            state.finished = true;
            break;
        }
        let chunk: ChatChunk = serde_json::from_str(&frame)
            .map_err(|err| TransportError::framing(format!("invalid chunk json: {err}")))?;
        if let Some(usage) = chunk.usage {
            state.usage = TokenUsage {
                prompt_tokens: usage.prompt_tokens,
                completion_tokens: usage.completion_tokens,
            };
        }
        if let Some(text) = chunk
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.delta.content)
            && !text.is_empty()
        {
            state.ready.push_back(StreamEvent::Delta(text));
        }
    }
    Ok(())
}
