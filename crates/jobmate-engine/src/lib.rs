//! Streaming task-execution engine for an LLM-backed job-application
//! assistant.
//!
//! A [`TaskRunner`] assembles a prompt from a task template plus caller
//! context, streams the completion from an OpenAI-compatible endpoint,
//! separates the model's reasoning segment from the final answer while the
//! response is still arriving, measures latency milestones, keeps the host
//! process alive for the duration, and supports graceful mid-flight
//! cancellation.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use jobmate_engine::prelude::*;
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), EngineError> {
//!     let transport = HttpTransport::new(EndpointConfig::new("qwen3-4b"))?;
//!     let runner = TaskRunner::new(Arc::new(transport), RunnerConfig::default());
//!
//!     let task = TaskConfig::new("Draft a short, specific cover letter.")
//!         .context_field("job")
//!         .context_field("profile");
//!     let result = runner
//!         .task(&task)
//!         .context("job", "Senior Rust engineer, backend platform team.")
//!         .context("profile", "Six years of Rust; maintains two parser crates.")
//!         .collect()
//!         .await?;
//!
//!     println!("{}", result.content);
//!     Ok(())
//! }
//! ```

pub mod assemble;
pub mod cancel;
pub mod config;
pub mod demux;
pub mod errors;
pub mod http;
pub mod keepalive;
pub mod message;
pub mod observability;
pub mod prelude;
pub mod result;
pub mod runner;
mod sse;
pub mod timing;
pub mod transport;

pub use assemble::{ContextValues, TaskConfig, assemble_prompt};
pub use cancel::{CancelHandle, CancelSignal, cancel_channel};
pub use config::EndpointConfig;
pub use demux::{DemuxPhase, DemuxSegment, ReasoningDemux, ReasoningMarkers};
pub use errors::{EngineError, TransportError};
pub use http::HttpTransport;
pub use keepalive::{Keepalive, KeepaliveGuard, KeepalivePing, TracePing};
pub use message::{ChatMessage, Role};
pub use observability::init_logging;
pub use result::{RunResult, RunStatus};
pub use runner::{DeltaCallbacks, RunBuilder, RunObserver, RunnerConfig, TaskRunner};
pub use timing::RunTiming;
pub use transport::{EventStream, StreamEvent, TokenUsage, Transport, TransportRequest};
