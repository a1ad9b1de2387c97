//! Recording session lifecycle for a live-stream recorder.
//!
//! A session negotiates a stream variant, acquires the byte stream, hands
//! it to the container-format consumer and supervises the transfer: periodic
//! I/O statistics, stall detection with self-termination, cooperative
//! cancellation and delayed stream teardown.

pub mod config;
pub mod error;
pub mod events;
pub mod session;
pub mod stats;

pub use config::RoomConfig;
pub use error::SessionError;
pub use events::{IoStatsSnapshot, RecordingStats, SessionEvent};
pub use session::{RecordingSession, SessionByteStream, SessionHandle, StreamConsumer};
pub use stats::{IO_STATS_INTERVAL, IoCounters};
