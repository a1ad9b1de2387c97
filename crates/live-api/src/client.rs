use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use rustls::ClientConfig;
use rustls_platform_verifier::BuilderVerifierExt;
use tracing::debug;

use crate::error::ApiError;
use crate::models::{StreamCodecItems, raw};

pub const DEFAULT_UA: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/126.0.0.0 Safari/537.36";
pub const HTTP_ORIGIN: &str = "https://live.bilibili.com";
pub const HTTP_REFERER: &str = "https://live.bilibili.com/";

const ROOM_PLAY_INFO_URL: &str =
    "https://api.live.bilibili.com/xlive/web-room/v2/index/getRoomPlayInfo";

/// Upstream quality/codec query. `qn` is the requested tier; the response
/// carries the accept list and URL candidates for each codec the room offers.
#[async_trait]
pub trait ApiClient: Send + Sync {
    async fn get_codec_items(
        &self,
        room_id: u64,
        qn: i32,
    ) -> Result<StreamCodecItems, ApiError>;
}

fn api_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(reqwest::header::USER_AGENT, HeaderValue::from_static(DEFAULT_UA));
    headers.insert(reqwest::header::ORIGIN, HeaderValue::from_static(HTTP_ORIGIN));
    headers.insert(reqwest::header::REFERER, HeaderValue::from_static(HTTP_REFERER));
    headers
}

/// Build the reqwest client used for API calls: rustls with the platform
/// certificate verifier and the fixed browser-like headers upstream expects.
pub fn default_client() -> Client {
    let provider = Arc::new(rustls::crypto::aws_lc_rs::default_provider());
    let tls_config = ClientConfig::builder_with_provider(provider)
        .with_safe_default_protocol_versions()
        .expect("Failed to configure default TLS protocol versions")
        .with_platform_verifier()
        .unwrap()
        .with_no_client_auth();

    Client::builder()
        .use_preconfigured_tls(tls_config)
        .default_headers(api_headers())
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to create HTTP client")
}

/// reqwest-backed implementation against the live `getRoomPlayInfo` endpoint.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
}

impl HttpApiClient {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

impl Default for HttpApiClient {
    fn default() -> Self {
        Self::new(default_client())
    }
}

#[async_trait]
impl ApiClient for HttpApiClient {
    async fn get_codec_items(
        &self,
        room_id: u64,
        qn: i32,
    ) -> Result<StreamCodecItems, ApiError> {
        let params = [
            ("room_id", room_id.to_string()),
            ("qn", qn.to_string()),
            ("platform", "web".to_string()),
            ("protocol", "0,1".to_string()),
            ("format", "0".to_string()),
            ("codec", "0,1".to_string()),
        ];

        debug!(room_id, qn, "querying room play info");

        let response = self
            .client
            .get(ROOM_PLAY_INFO_URL)
            .query(&params)
            .send()
            .await?;

        let json = response.json::<raw::RoomPlayInfo>().await?;
        StreamCodecItems::from_raw(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    #[ignore]
    async fn query_live_room() {
        tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .init();
        let client = HttpApiClient::default();
        let items = client.get_codec_items(6, 10000).await.unwrap();
        println!("{items:?}");
    }
}
