use std::time::Duration;

use reqwest::StatusCode;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("invalid url `{input}`: {reason}")]
    InvalidUrl { input: String, reason: String },

    #[error("HTTP request failed: {source}")]
    Network {
        #[from]
        source: reqwest::Error,
    },

    #[error("server returned ({status}) {reason} while fetching the stream")]
    Transfer { status: StatusCode, reason: String },

    #[error("redirect response carried no usable Location header")]
    MalformedRedirect,

    #[error("redirect chain exceeded {limit} hops")]
    TooManyRedirects { limit: usize },

    #[error("DNS returned no address in the allowed family for {host}")]
    DnsResolution { host: String },

    #[error("connect timed out after {timeout:?}")]
    ConnectTimeout { timeout: Duration },

    #[error("fetch cancelled")]
    Cancelled,

    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },
}

impl FetchError {
    pub fn invalid_url(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidUrl {
            input: input.into(),
            reason: reason.into(),
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Cancelled
            | Self::InvalidUrl { .. }
            | Self::MalformedRedirect
            | Self::TooManyRedirects { .. } => false,
            Self::Transfer { status, .. } => {
                status.is_server_error() || *status == StatusCode::TOO_MANY_REQUESTS
            }
            Self::Network { .. }
            | Self::DnsResolution { .. }
            | Self::ConnectTimeout { .. }
            | Self::Io { .. } => true,
        }
    }
}
