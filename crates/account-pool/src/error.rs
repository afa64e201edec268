//! Error types for pool and device-flow operations

/// Errors from account-pool operations.
///
/// `Api` is transparent so server-supplied messages reach the operator
/// verbatim (and `SessionExpired` keeps its meaning through the wrapper).
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Api(#[from] gateway_client::Error),

    #[error("removing account {0} requires operator confirmation")]
    ConfirmationRequired(String),

    #[error("a device authorization flow is already in progress")]
    FlowInProgress,

    #[error("no device authorization flow is pending")]
    NoPendingFlow,

    #[error("device authorization flow expired")]
    FlowExpired,
}

impl Error {
    /// Whether this error must trigger global session teardown.
    pub fn is_session_expired(&self) -> bool {
        matches!(self, Error::Api(e) if e.is_session_expired())
    }
}

/// Result alias for pool operations.
pub type Result<T> = std::result::Result<T, Error>;
