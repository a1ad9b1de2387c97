use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// One watchdog interval's aggregated I/O counters. Constructed once per
/// tick, never mutated afterwards.
#[derive(Debug, Clone)]
pub struct IoStatsSnapshot {
    /// Host trail currently in use, including rewritten/pinned variants.
    pub stream_host: Option<String>,
    pub network_bytes: u64,
    pub disk_bytes: u64,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
    pub duration: Duration,
    pub network_mbps: f64,
    pub disk_mbps: f64,
    pub disk_write_duration: Duration,
}

/// Recording progress reported by the stream consumer.
#[derive(Debug, Clone, Default)]
pub struct RecordingStats {
    pub session_duration: Duration,
    pub total_input_bytes: u64,
    pub current_bitrate_kbps: f64,
}

/// Fire-and-forget notifications to session subscribers. Delivery order
/// matches the order of the underlying state transitions.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    StreamOpening {
        host: String,
    },
    StreamClosed {
        host: Option<String>,
    },
    SessionEnded {
        session_id: Uuid,
        /// Set when the stop was self-initiated by the stall watchdog rather
        /// than requested by a user or supervisor.
        stalled: bool,
    },
    IoStats(IoStatsSnapshot),
    RecordingStats(RecordingStats),
}
