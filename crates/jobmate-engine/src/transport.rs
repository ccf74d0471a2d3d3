use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::TransportError;
use crate::message::ChatMessage;

/// Token accounting reported by the endpoint, when it reports any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

/// One event of a streaming model response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// The next fragment of generated text, in arrival order.
    Delta(String),
    /// Terminal event of a completed response; nothing follows it.
    Done { usage: TokenUsage },
}

/// Everything a transport needs to start one streaming completion.
#[derive(Debug, Clone)]
pub struct TransportRequest {
    pub run_id: Uuid,
    pub messages: Vec<ChatMessage>,
    pub temperature: Option<f32>,
    pub max_output_tokens: Option<u32>,
}

/// Pinned, sendable stream of transport events.
pub type EventStream =
    Pin<Box<dyn Stream<Item = Result<StreamEvent, TransportError>> + Send + 'static>>;

/// Connection to a model endpoint, one streamed completion per call.
///
/// The run loop depends only on this seam; tests substitute fakes.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn open_stream(&self, request: TransportRequest) -> Result<EventStream, TransportError>;
}
