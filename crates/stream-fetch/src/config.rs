use std::time::Duration;

use serde::{Deserialize, Serialize};

// Fixed headers the CDN edge requires for the request to be accepted.
pub const HTTP_ACCEPT: &str = "*/*";
pub const HTTP_ORIGIN: &str = "https://live.bilibili.com";
pub const HTTP_REFERER: &str = "https://live.bilibili.com/";
pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";

pub const DEFAULT_MAX_REDIRECTS: usize = 10;

/// Address families permitted when connecting to a CDN edge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AddressFamily {
    /// Send the request to the hostname and let the platform resolver and
    /// its default family ordering apply.
    #[default]
    System,
    /// Resolve explicitly, keep IPv4 addresses only.
    Ipv4,
    /// Resolve explicitly, keep IPv6 addresses only.
    Ipv6,
    /// Resolve explicitly, accept any family.
    Any,
}

/// Configurable options for stream acquisition.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    pub address_family: AddressFamily,

    /// Whether to honor system proxy settings for the stream connection.
    pub use_system_proxy: bool,

    /// Per-attempt bound on DNS resolution plus connection establishment.
    pub connect_timeout: Duration,

    /// Cap on explicit redirect following before the attempt is abandoned.
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            address_family: AddressFamily::System,
            use_system_proxy: false,
            connect_timeout: Duration::from_secs(5),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}
