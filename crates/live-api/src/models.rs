use crate::error::ApiError;
use crate::qn::StreamCodec;

/// One CDN delivery endpoint returned by the API for a chosen codec/qn.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlInfo {
    pub host: String,
    pub extra: String,
}

impl UrlInfo {
    /// mcdn edges (e.g. `xy0x0x0x0xy.mcdn.bilivideo.cn`) are known to be
    /// unreliable for sustained capture; they are deprioritized during node
    /// selection, never eliminated.
    pub fn is_mcdn(&self) -> bool {
        self.host.contains(".mcdn.")
    }
}

/// URL candidates for one codec family at the queried quality tier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodecItem {
    pub current_qn: i32,
    pub accept_qn: Vec<i32>,
    pub base_url: String,
    pub url_info: Vec<UrlInfo>,
}

/// The per-codec variant lists for one `getRoomPlayInfo` query. Either leg
/// may be absent when upstream does not offer that codec for the room.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamCodecItems {
    pub avc: Option<CodecItem>,
    pub hevc: Option<CodecItem>,
}

impl StreamCodecItems {
    pub fn get(&self, codec: StreamCodec) -> Option<&CodecItem> {
        match codec {
            StreamCodec::Avc => self.avc.as_ref(),
            StreamCodec::Hevc => self.hevc.as_ref(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.avc.is_none() && self.hevc.is_none()
    }

    pub(crate) fn from_raw(raw: raw::RoomPlayInfo) -> Result<Self, ApiError> {
        if raw.code != 0 {
            return Err(ApiError::Validation(raw.message));
        }

        let Some(playurl) = raw
            .data
            .and_then(|data| data.playurl_info)
            .map(|info| info.playurl)
        else {
            return Ok(Self::default());
        };

        let mut items = Self::default();
        for stream in playurl.stream {
            if stream.protocol_name != "http_stream" {
                continue;
            }
            for format in stream.format {
                if format.format_name != "flv" {
                    continue;
                }
                for codec in format.codec {
                    let item = CodecItem {
                        current_qn: codec.current_qn,
                        accept_qn: codec.accept_qn,
                        base_url: codec.base_url,
                        url_info: codec
                            .url_info
                            .into_iter()
                            .map(|u| UrlInfo {
                                host: u.host,
                                extra: u.extra,
                            })
                            .collect(),
                    };
                    match codec.codec_name.as_str() {
                        "avc" => items.avc = Some(item),
                        "hevc" => items.hevc = Some(item),
                        other => {
                            tracing::debug!(codec = other, "ignoring unknown codec entry");
                        }
                    }
                }
            }
        }

        Ok(items)
    }
}

/// Wire shape of the `getRoomPlayInfo` response, reduced to the fields the
/// engine consumes.
pub(crate) mod raw {
    use serde::Deserialize;

    #[derive(Deserialize, Debug)]
    pub(crate) struct RoomPlayInfo {
        pub code: i64,
        #[serde(default)]
        pub message: String,
        pub data: Option<RoomPlayData>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct RoomPlayData {
        pub playurl_info: Option<PlayUrlInfo>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct PlayUrlInfo {
        pub playurl: PlayUrl,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct PlayUrl {
        #[serde(default)]
        pub stream: Vec<StreamEntry>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct StreamEntry {
        pub protocol_name: String,
        #[serde(default)]
        pub format: Vec<FormatEntry>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct FormatEntry {
        pub format_name: String,
        #[serde(default)]
        pub codec: Vec<CodecEntry>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct CodecEntry {
        pub codec_name: String,
        pub current_qn: i32,
        #[serde(default)]
        pub accept_qn: Vec<i32>,
        #[serde(default)]
        pub base_url: String,
        #[serde(default)]
        pub url_info: Vec<UrlInfoEntry>,
    }

    #[derive(Deserialize, Debug)]
    pub(crate) struct UrlInfoEntry {
        pub host: String,
        #[serde(default)]
        pub extra: String,
    }
}
