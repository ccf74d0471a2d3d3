//! Common imports for typical engine usage.

pub use crate::assemble::{ContextValues, TaskConfig};
pub use crate::cancel::{CancelHandle, CancelSignal, cancel_channel};
pub use crate::config::EndpointConfig;
pub use crate::demux::ReasoningMarkers;
pub use crate::errors::{EngineError, TransportError};
pub use crate::http::HttpTransport;
pub use crate::keepalive::KeepalivePing;
pub use crate::message::{ChatMessage, Role};
pub use crate::observability::init_logging;
pub use crate::result::{RunResult, RunStatus};
pub use crate::runner::{DeltaCallbacks, RunObserver, RunnerConfig, TaskRunner};
pub use crate::timing::RunTiming;
pub use crate::transport::{StreamEvent, TokenUsage, Transport};
