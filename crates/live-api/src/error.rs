use thiserror::Error;

use crate::qn::StreamCodecQn;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("api rejected request: {0}")]
    Validation(String),
    #[error("upstream offered no codec entries")]
    NoSupportedVariant,
    #[error("no quality matching the configured preference")]
    NoMatchingQuality {
        allowed: Vec<StreamCodecQn>,
        available: Vec<StreamCodecQn>,
    },
}

impl ApiError {
    /// Upstream availability changes over time; most failures here are worth
    /// retrying on a later session rather than treating as fatal.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::NoSupportedVariant | Self::NoMatchingQuality { .. } => true,
            Self::Http(_) | Self::Validation(_) => true,
            Self::Json(_) => false,
        }
    }
}
