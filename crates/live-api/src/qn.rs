use std::fmt;

use serde::{Deserialize, Serialize};

/// Video codec families offered by the live platform.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StreamCodec {
    Avc,
    Hevc,
}

impl StreamCodec {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Avc => "avc",
            Self::Hevc => "hevc",
        }
    }
}

impl fmt::Display for StreamCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One negotiable stream variant: codec family plus upstream quality tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamCodecQn {
    pub codec: StreamCodec,
    pub qn: i32,
}

impl StreamCodecQn {
    /// Sentinel marking an unparsed/invalid variant. Filtered out before use.
    pub const INVALID_QN: i32 = -1;

    pub fn new(codec: StreamCodec, qn: i32) -> Self {
        Self { codec, qn }
    }

    pub fn avc(qn: i32) -> Self {
        Self::new(StreamCodec::Avc, qn)
    }

    pub fn hevc(qn: i32) -> Self {
        Self::new(StreamCodec::Hevc, qn)
    }

    pub fn is_valid(&self) -> bool {
        self.qn >= 0
    }
}

impl fmt::Display for StreamCodecQn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.codec, self.qn)
    }
}

/// Separators accepted in a quality preference string. Half-width and
/// full-width commas, the ideographic comma, and space.
const QN_SEPARATORS: [char; 4] = [',', '，', '、', ' '];

/// Parse a user-configured quality preference string into an ordered list.
///
/// Each token is either a bare tier number (`"400"`, implying AVC),
/// `avc<n>` or `hevc<n>` (case-insensitive). Unrecognized tokens are
/// silently dropped. Order is preserved, it encodes the user's priority.
/// Empty or whitespace input yields an empty list.
pub fn parse_allowed_qn(input: &str) -> Vec<StreamCodecQn> {
    input
        .split(QN_SEPARATORS)
        .filter(|token| !token.is_empty())
        .map(parse_token)
        .filter(StreamCodecQn::is_valid)
        .collect()
}

fn parse_token(token: &str) -> StreamCodecQn {
    if let Ok(qn) = token.parse::<i32>() {
        return StreamCodecQn::avc(qn);
    }

    let lower = token.to_ascii_lowercase();
    if let Some(rest) = lower.strip_prefix("avc")
        && let Ok(qn) = rest.parse::<i32>()
    {
        return StreamCodecQn::avc(qn);
    }
    if let Some(rest) = lower.strip_prefix("hevc")
        && let Ok(qn) = rest.parse::<i32>()
    {
        return StreamCodecQn::hevc(qn);
    }

    StreamCodecQn::avc(StreamCodecQn::INVALID_QN)
}

/// Human-readable upstream names for the well-known quality tiers.
pub fn qn_description(qn: i32) -> &'static str {
    match qn {
        30000 => "杜比视界",
        20000 => "4K",
        10000 => "原画",
        401 => "蓝光(杜比)",
        400 => "蓝光",
        250 => "超清",
        150 => "高清",
        80 => "流畅",
        0 => "最低画质",
        _ => "未知",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_bare_numbers_as_avc() {
        assert_eq!(
            parse_allowed_qn("10000,400"),
            vec![StreamCodecQn::avc(10000), StreamCodecQn::avc(400)]
        );
    }

    #[test]
    fn parses_codec_prefixes_case_insensitively() {
        assert_eq!(
            parse_allowed_qn("AVC250 hevc10000 Hevc400"),
            vec![
                StreamCodecQn::avc(250),
                StreamCodecQn::hevc(10000),
                StreamCodecQn::hevc(400),
            ]
        );
    }

    #[test]
    fn accepts_full_width_separators() {
        assert_eq!(
            parse_allowed_qn("10000，400、250 150"),
            vec![
                StreamCodecQn::avc(10000),
                StreamCodecQn::avc(400),
                StreamCodecQn::avc(250),
                StreamCodecQn::avc(150),
            ]
        );
    }

    #[test]
    fn drops_malformed_tokens() {
        assert_eq!(
            parse_allowed_qn("foo,avc,hevcx,av1_400,400"),
            vec![StreamCodecQn::avc(400)]
        );
    }

    #[test]
    fn never_yields_negative_qn() {
        for input in ["-1", "avc-5", "hevc-10000", "-1,-2 -3", "10000,-1"] {
            assert!(parse_allowed_qn(input).iter().all(StreamCodecQn::is_valid));
        }
    }

    #[test]
    fn empty_input_yields_empty_list() {
        assert!(parse_allowed_qn("").is_empty());
        assert!(parse_allowed_qn("   ").is_empty());
        assert!(parse_allowed_qn(",，、 ").is_empty());
    }

    #[test]
    fn preserves_user_order() {
        assert_eq!(
            parse_allowed_qn("400,10000"),
            vec![StreamCodecQn::avc(400), StreamCodecQn::avc(10000)]
        );
    }

    #[test]
    fn display_round_trip() {
        assert_eq!(StreamCodecQn::avc(10000).to_string(), "avc10000");
        assert_eq!(StreamCodecQn::hevc(400).to_string(), "hevc400");
    }

    #[test]
    fn known_tier_descriptions() {
        assert_eq!(qn_description(10000), "原画");
        assert_eq!(qn_description(400), "蓝光");
        assert_eq!(qn_description(123), "未知");
    }
}
