use std::time::Duration;

use serde::{Deserialize, Serialize};
use stream_fetch::{AddressFamily, DEFAULT_MAX_REDIRECTS, FetchConfig};

/// Read-only per-room settings snapshot consumed by a recording session.
/// Ownership of the live room state stays with the caller; the session only
/// borrows this copy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomConfig {
    pub room_id: u64,

    /// User quality preference string, e.g. `"10000,400"` or `"hevc10000"`.
    pub recording_quality: String,

    pub address_family: AddressFamily,

    pub use_system_proxy: bool,

    /// Bound on establishing the stream connection, in milliseconds.
    pub stream_connect_timeout_ms: u64,

    /// Maximum duration with zero network bytes before the session
    /// self-terminates, in milliseconds.
    pub watchdog_timeout_ms: u64,
}

impl RoomConfig {
    pub fn new(room_id: u64) -> Self {
        Self {
            room_id,
            recording_quality: "10000".to_string(),
            address_family: AddressFamily::System,
            use_system_proxy: false,
            stream_connect_timeout_ms: 5_000,
            watchdog_timeout_ms: 10_000,
        }
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.stream_connect_timeout_ms)
    }

    pub fn watchdog_timeout(&self) -> Duration {
        Duration::from_millis(self.watchdog_timeout_ms)
    }

    pub fn fetch_config(&self) -> FetchConfig {
        FetchConfig {
            address_family: self.address_family,
            use_system_proxy: self.use_system_proxy,
            connect_timeout: self.connect_timeout(),
            max_redirects: DEFAULT_MAX_REDIRECTS,
        }
    }
}
