use std::sync::Arc;

use rand::seq::IndexedRandom;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::ApiError;
use crate::models::UrlInfo;
use crate::qn::{StreamCodecQn, parse_allowed_qn};

/// Hook allowing an external script to supply the stream URL for a room,
/// bypassing quality negotiation entirely.
pub trait StreamUrlOverride: Send + Sync {
    fn on_fetch_stream_url(&self, room_id: u64, allowed_qn: &[StreamCodecQn]) -> Option<String>;
}

/// Outcome of quality negotiation: the playback URL plus the variant
/// actually granted by upstream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NegotiationResult {
    pub full_url: String,
    pub codec_qn: StreamCodecQn,
}

/// Quality sentinel sent on the first query. Upstream answers with its
/// default/highest tier and the full accept list for each codec.
pub const DEFAULT_QN: i32 = 10000;

pub struct StreamUrlResolver {
    api: Arc<dyn ApiClient>,
    url_override: Option<Arc<dyn StreamUrlOverride>>,
}

impl StreamUrlResolver {
    pub fn new(api: Arc<dyn ApiClient>) -> Self {
        Self {
            api,
            url_override: None,
        }
    }

    pub fn with_url_override(mut self, hook: Arc<dyn StreamUrlOverride>) -> Self {
        self.url_override = Some(hook);
        self
    }

    /// Negotiate a playable variant for `room_id` against the configured
    /// quality preference string.
    pub async fn resolve(
        &self,
        room_id: u64,
        recording_quality: &str,
    ) -> Result<NegotiationResult, ApiError> {
        let allowed_qn = parse_allowed_qn(recording_quality);

        if let Some(hook) = &self.url_override
            && let Some(url) = hook.on_fetch_stream_url(room_id, &allowed_qn)
            && !url.is_empty()
        {
            info!(url = %url, "using stream url supplied by user script");
            return Ok(NegotiationResult {
                full_url: url,
                codec_qn: StreamCodecQn::avc(StreamCodecQn::INVALID_QN),
            });
        }

        let mut codec_items = self.api.get_codec_items(room_id, DEFAULT_QN).await?;

        if codec_items.is_empty() {
            return Err(ApiError::NoSupportedVariant);
        }

        let mut available = Vec::new();
        if let Some(avc) = &codec_items.avc {
            available.extend(avc.accept_qn.iter().map(|&qn| StreamCodecQn::avc(qn)));
        }
        if let Some(hevc) = &codec_items.hevc {
            available.extend(hevc.accept_qn.iter().map(|&qn| StreamCodecQn::hevc(qn)));
        }

        // First match in preference order wins, not availability order.
        let Some(selected) = allowed_qn
            .iter()
            .find(|qn| available.contains(qn))
            .copied()
        else {
            info!(
                allowed = ?allowed_qn,
                available = ?available,
                "no quality matching the configured preference, retry later"
            );
            return Err(ApiError::NoMatchingQuality {
                allowed: allowed_qn,
                available,
            });
        };

        debug!(allowed = ?allowed_qn, available = ?available, selected = %selected, "quality selected");

        if selected.qn != DEFAULT_QN {
            // The URL candidates in hand belong to the default-qn query; the
            // selected tier needs its own.
            codec_items = self.api.get_codec_items(room_id, selected.qn).await?;
        }

        let item = codec_items
            .get(selected.codec)
            .ok_or_else(|| ApiError::Validation(format!("no stream url for {selected}")))?;

        if item.current_qn != selected.qn {
            warn!(
                current_qn = item.current_qn,
                selected = %selected,
                "upstream granted a different quality than requested"
            );
        }

        let url_info = pick_edge_node(&item.url_info)
            .ok_or_else(|| ApiError::Validation("no url_info in response".to_string()))?;

        let full_url = concat_url(&url_info.host, &item.base_url, &url_info.extra);

        Ok(NegotiationResult {
            full_url,
            codec_qn: StreamCodecQn::new(selected.codec, item.current_qn),
        })
    }
}

/// Pick uniformly at random among the non-mcdn edges; fall back to the full
/// set only when nothing else is offered.
fn pick_edge_node(url_infos: &[UrlInfo]) -> Option<&UrlInfo> {
    let mut rng = rand::rng();

    let non_mcdn: Vec<&UrlInfo> = url_infos.iter().filter(|u| !u.is_mcdn()).collect();
    if non_mcdn.is_empty() {
        url_infos.choose(&mut rng)
    } else {
        non_mcdn.choose(&mut rng).copied()
    }
}

fn concat_url(host: &str, base_url: &str, extra: &str) -> String {
    let mut url = String::with_capacity(host.len() + base_url.len() + extra.len());
    url.push_str(host);
    url.push_str(base_url);
    url.push_str(extra);
    url
}
