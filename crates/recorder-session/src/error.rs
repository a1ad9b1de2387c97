use live_api::ApiError;
use stream_fetch::FetchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    /// Contract violation: `start` may run at most once per session.
    #[error("only one start call allowed per session")]
    AlreadyStarted,

    #[error("session cancelled")]
    Cancelled,

    #[error("quality negotiation failed: {0}")]
    Resolve(#[from] ApiError),

    #[error("stream acquisition failed: {0}")]
    Fetch(#[from] FetchError),
}

impl SessionError {
    /// Whether a fresh session may be worth starting later. `AlreadyStarted`
    /// is a programming error and never retryable.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::AlreadyStarted | Self::Cancelled => false,
            Self::Resolve(e) => e.is_retryable(),
            Self::Fetch(e) => e.is_retryable(),
        }
    }
}
