use thiserror::Error;

/// Failures raised by the wire transport while opening or reading a stream.
#[derive(Debug, Clone, Error)]
pub enum TransportError {
    /// The request could not be sent.
    #[error("transport request failed: {message}")]
    Request { message: String },

    /// The endpoint answered with a non-success status.
    #[error("endpoint returned status {status}: {body}")]
    Http { status: u16, body: String },

    /// Reading the response body failed mid-stream.
    #[error("stream read failed: {message}")]
    Read { message: String },

    /// The response did not follow the expected framing.
    #[error("malformed stream framing: {message}")]
    Framing { message: String },
}

impl TransportError {
    pub fn request(message: impl Into<String>) -> Self {
        Self::Request {
            message: message.into(),
        }
    }

    pub fn http(status: u16, body: impl Into<String>) -> Self {
        Self::Http {
            status,
            body: body.into(),
        }
    }

    pub fn read(message: impl Into<String>) -> Self {
        Self::Read {
            message: message.into(),
        }
    }

    pub fn framing(message: impl Into<String>) -> Self {
        Self::Framing {
            message: message.into(),
        }
    }
}

/// Errors returned by the engine's run surface.
///
/// Cancellation is not represented here: a cancelled run finishes with a
/// normal [`RunResult`](crate::result::RunResult) carrying the partial text.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A field named by the task template has no value in the supplied context.
    #[error("missing context field `{field}`")]
    MissingContextField { field: String },

    /// The run was built from unusable input.
    #[error("validation error: {0}")]
    Validation(String),

    /// Endpoint or marker configuration is unusable.
    #[error("configuration error: {0}")]
    Config(String),

    /// The runner already has a run in flight.
    #[error("runner is busy with another run")]
    Busy,

    #[error(transparent)]
    Transport(#[from] TransportError),
}

impl EngineError {
    pub fn missing_context_field(field: impl Into<String>) -> Self {
        Self::MissingContextField {
            field: field.into(),
        }
    }

    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }
}
