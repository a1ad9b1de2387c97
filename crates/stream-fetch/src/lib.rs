//! Resilient HTTP live-stream acquisition.
//!
//! Turns a negotiated playback URL into a live byte stream: explicit
//! redirect handling with a bounded hop count, DNS and address-family
//! control, optional script-driven URL rewriting with address pinning, and
//! a non-owning force-close handle for delayed teardown.

pub mod config;
mod dns;
pub mod error;
pub mod fetcher;
pub mod transform;

pub use config::{AddressFamily, DEFAULT_MAX_REDIRECTS, FetchConfig};
pub use error::FetchError;
pub use fetcher::{AcquiredStream, ByteStream, StreamCloser, StreamFetcher};
pub use transform::{StreamUrlTransform, TransformedUrl};
