/// Fixed user-facing message shown when a report session fails.
pub const FAILURE_MESSAGE: &str = "خطا در تولید گزارش. لطفاً دوباره تلاش کنید.";

/// Failure to interpret a single event record.
///
/// Record errors never end a session; the record is logged and skipped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RecordError {
    /// The `data:` payload was not a JSON object.
    #[error("invalid record JSON: {message}")]
    InvalidJson { message: String, payload: String },
}

/// Top-level error type for the public client API.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ReportError {
    /// Invalid client configuration.
    #[error("config error: {0}")]
    Config(String),
    /// Invalid user input (for example an empty query).
    #[error("validation error: {0}")]
    Validation(String),
    /// The request could not be sent or the connection failed.
    #[error("transport error: {0}")]
    Transport(String),
    /// The service answered with a non-success status.
    #[error("service returned status {status}: {message}")]
    Status { status: u16, message: String },
    /// The response carried no readable body.
    #[error("response body is empty")]
    NoBody,
    /// Reading the response stream failed mid-way.
    #[error("stream read failed: {0}")]
    Stream(String),
    /// A JSON response from an auxiliary endpoint could not be decoded.
    #[error("decode error: {0}")]
    Decode(String),
    /// The session was cancelled or superseded by a newer one.
    #[error("session cancelled")]
    Cancelled,
    /// Internal invariant violation (for example a dropped run task).
    #[error("protocol error: {0}")]
    Protocol(String),
}

impl ReportError {
    pub(crate) fn protocol_msg(message: impl Into<String>) -> Self {
        Self::Protocol(message.into())
    }

    /// Returns true for errors that come from the transport rather than from
    /// the caller or from cancellation.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            Self::Transport(_) | Self::Status { .. } | Self::NoBody | Self::Stream(_)
        )
    }
}

impl From<reqwest::Error> for ReportError {
    fn from(value: reqwest::Error) -> Self {
        if value.is_decode() {
            ReportError::Decode(value.to_string())
        } else {
            ReportError::Transport(value.to_string())
        }
    }
}
