use thiserror::Error;

/// Result
///
/// Shorthand used by every fallible console operation.
pub type Result<T> = std::result::Result<T, ConsoleError>;

/// Fallback toast text when the server gave no message.
pub const GENERIC_FAILURE: &str = "Request failed. Please try again.";

/// Toast text for transport and decoding failures.
pub const NETWORK_FAILURE: &str = "Network error. Please check your connection and try again.";

/// ConsoleError
///
/// The failure taxonomy of the console. Only `Unauthorized` is escalated beyond
/// the operation that produced it (the session is cleared and the user is sent
/// back to the login entry point). Everything else is converted into a toast
/// at the call site.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// HTTP 401, or no usable session. Never retried.
    #[error("Session expired or invalid")]
    Unauthorized,

    /// Non-2xx response, or a 2xx envelope carrying `success: false`.
    #[error("Request failed (status {status}): {message}")]
    RequestFailed { status: u16, message: String },

    /// Client-side checks that block a submission before any network call.
    #[error("Validation failed: {}", .0.join("; "))]
    ValidationFailed(Vec<String>),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Parse error: {0}")]
    Parse(String),

    /// Durable token storage could not be read or written.
    #[error("Storage error: {0}")]
    Storage(String),
}

impl ConsoleError {
    pub fn validation(msg: impl Into<String>) -> Self {
        ConsoleError::ValidationFailed(vec![msg.into()])
    }

    /// user_message
    ///
    /// Text surfaced to the user in an error toast. Server-provided messages are
    /// shown verbatim; transport and decoding failures get a generic line.
    pub fn user_message(&self) -> String {
        match self {
            ConsoleError::Unauthorized => "Session expired. Please log in again.".to_string(),
            ConsoleError::RequestFailed { message, .. } if !message.trim().is_empty() => {
                message.clone()
            }
            ConsoleError::RequestFailed { .. } => GENERIC_FAILURE.to_string(),
            ConsoleError::ValidationFailed(errors) => errors.join("\n"),
            ConsoleError::Network(_) | ConsoleError::Parse(_) => NETWORK_FAILURE.to_string(),
            ConsoleError::Storage(_) => GENERIC_FAILURE.to_string(),
        }
    }

    pub fn is_unauthorized(&self) -> bool {
        matches!(self, ConsoleError::Unauthorized)
    }
}

impl From<reqwest::Error> for ConsoleError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            ConsoleError::Parse(err.to_string())
        } else {
            ConsoleError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ConsoleError {
    fn from(err: serde_json::Error) -> Self {
        ConsoleError::Parse(err.to_string())
    }
}

impl From<std::io::Error> for ConsoleError {
    fn from(err: std::io::Error) -> Self {
        ConsoleError::Storage(err.to_string())
    }
}
