//! Error types for gateway control-API calls

/// Errors from gateway control-API calls.
///
/// `SessionExpired` is the highest-priority variant: any HTTP 401 maps to it
/// before the response body is even inspected, and the session runtime reacts
/// with a global teardown. `Remote` carries the server-supplied message
/// verbatim so the operator sees exactly what the gateway said.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("session expired")]
    SessionExpired,

    #[error("{0}")]
    Remote(String),

    #[error("HTTP request failed: {0}")]
    Http(String),

    #[error("invalid response payload: {0}")]
    Decode(String),
}

impl Error {
    /// Whether this error must trigger global session teardown.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::SessionExpired)
    }
}

/// Result alias for gateway API operations.
pub type Result<T> = std::result::Result<T, Error>;
