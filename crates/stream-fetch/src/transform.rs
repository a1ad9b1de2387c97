use std::net::IpAddr;

/// Result of the URL transform hook: the possibly-rewritten URL and an
/// optional literal address to connect to. When an address is pinned, DNS
/// resolution is skipped and the original hostname is preserved in the
/// `Host` header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedUrl {
    pub url: String,
    pub ip: Option<IpAddr>,
}

impl TransformedUrl {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ip: None,
        }
    }

    pub fn with_ip(mut self, ip: IpAddr) -> Self {
        self.ip = Some(ip);
        self
    }
}

/// Hook allowing an external script to rewrite a resolved stream URL and/or
/// pin the server address. Consulted on every connection attempt, including
/// redirect hops.
pub trait StreamUrlTransform: Send + Sync {
    fn on_transform_stream_url(&self, url: &str) -> Option<TransformedUrl>;
}
