//! Bilibili live API client and stream quality negotiation.
//!
//! Given a room id and a user quality preference string, this crate talks to
//! the `getRoomPlayInfo` endpoint, selects a codec/quality variant, picks a
//! CDN edge node and produces the playback URL for the download layer.

pub mod client;
pub mod error;
pub mod models;
pub mod qn;
pub mod resolver;

pub use client::{ApiClient, DEFAULT_UA, HTTP_ORIGIN, HTTP_REFERER, HttpApiClient, default_client};
pub use error::ApiError;
pub use models::{CodecItem, StreamCodecItems, UrlInfo};
pub use qn::{StreamCodec, StreamCodecQn, parse_allowed_qn, qn_description};
pub use resolver::{DEFAULT_QN, NegotiationResult, StreamUrlOverride, StreamUrlResolver};
