use std::net::IpAddr;
use std::sync::Arc;

use bytes::Bytes;
use futures::StreamExt;
use futures::stream::BoxStream;
use reqwest::header::{self, HeaderValue};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::mpsc;
use tokio::time;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;

use crate::config::{
    AddressFamily, DEFAULT_UA, FetchConfig, HTTP_ACCEPT, HTTP_ORIGIN, HTTP_REFERER,
};
use crate::dns::resolve_pinned_addr;
use crate::error::FetchError;
use crate::transform::{StreamUrlTransform, TransformedUrl};

pub type ByteStream = BoxStream<'static, Result<Bytes, FetchError>>;

/// Non-owning handle that force-closes an acquired stream. `close` is
/// idempotent and tolerates a consumer that already dropped the stream.
#[derive(Debug, Clone)]
pub struct StreamCloser {
    token: CancellationToken,
}

impl StreamCloser {
    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }
}

/// A live byte stream handed off to the consumer, plus connection
/// diagnostics.
pub struct AcquiredStream {
    pub stream: ByteStream,
    /// Host of the URL that finally answered 200.
    pub host: String,
    /// Newline-separated `host [ip]` entries across rewrite and redirect
    /// hops, for observability.
    pub host_trail: String,
    closer: StreamCloser,
}

impl AcquiredStream {
    pub fn closer(&self) -> StreamCloser {
        self.closer.clone()
    }
}

impl std::fmt::Debug for AcquiredStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AcquiredStream")
            .field("stream", &"<ByteStream>")
            .field("host", &self.host)
            .field("host_trail", &self.host_trail)
            .field("closer", &self.closer)
            .finish()
    }
}

/// Acquires live HTTP byte streams with explicit redirect handling, DNS and
/// address-family control, and script-driven URL rewriting.
pub struct StreamFetcher {
    client: Client,
    config: FetchConfig,
    transform: Option<Arc<dyn StreamUrlTransform>>,
}

impl StreamFetcher {
    pub fn new(config: FetchConfig) -> Result<Self, FetchError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::ACCEPT, HeaderValue::from_static(HTTP_ACCEPT));
        headers.insert(header::ORIGIN, HeaderValue::from_static(HTTP_ORIGIN));
        headers.insert(header::REFERER, HeaderValue::from_static(HTTP_REFERER));
        headers.insert(header::USER_AGENT, HeaderValue::from_static(DEFAULT_UA));

        // Redirects are followed explicitly in `acquire`, never by the
        // transport.
        let mut builder = Client::builder()
            .default_headers(headers)
            .redirect(reqwest::redirect::Policy::none())
            .connect_timeout(config.connect_timeout);

        if !config.use_system_proxy {
            builder = builder.no_proxy();
        }

        let client = builder.build()?;
        Ok(Self {
            client,
            config,
            transform: None,
        })
    }

    pub fn with_transform(mut self, hook: Arc<dyn StreamUrlTransform>) -> Self {
        self.transform = Some(hook);
        self
    }

    /// Establish the live byte stream for `url`. Each connection attempt is
    /// bounded by the configured connect timeout; cancelling `token`
    /// unblocks DNS and HTTP waits promptly.
    pub async fn acquire(
        &self,
        url: &str,
        token: &CancellationToken,
    ) -> Result<AcquiredStream, FetchError> {
        let mut current = parse_url(url)?;
        let mut trail = String::new();

        for _hop in 0..=self.config.max_redirects {
            let mut pinned_ip = None;

            if let Some(hook) = &self.transform
                && let Some(TransformedUrl { url: new_url, ip }) =
                    hook.on_transform_stream_url(current.as_str())
            {
                debug!(new_url = %new_url, old_url = %current, "user script rewrote the stream url");
                current = parse_url(&new_url)?;
                if let Some(ip) = ip {
                    debug!(%ip, "user script pinned the server address");
                }
                pinned_ip = ip;
            }

            let attempt = self.send_attempt(&current, pinned_ip, &mut trail);
            let response = tokio::select! {
                _ = token.cancelled() => return Err(FetchError::Cancelled),
                outcome = time::timeout(self.config.connect_timeout, attempt) => match outcome {
                    Ok(result) => result?,
                    Err(_) => {
                        return Err(FetchError::ConnectTimeout {
                            timeout: self.config.connect_timeout,
                        });
                    }
                },
            };

            match response.status() {
                StatusCode::OK => {
                    info!(host = %host_of(&current), "stream opened, receiving data");
                    return Ok(self.into_acquired(response, &current, trail));
                }
                StatusCode::MOVED_PERMANENTLY | StatusCode::FOUND => {
                    let location = response
                        .headers()
                        .get(header::LOCATION)
                        .and_then(|value| value.to_str().ok())
                        .ok_or(FetchError::MalformedRedirect)?;

                    // join() resolves both absolute and relative targets
                    let next = current
                        .join(location)
                        .map_err(|e| FetchError::invalid_url(location, e.to_string()))?;
                    debug!(next = %next, location, "following stream redirect");
                    current = next;
                    trail.push('\n');
                }
                status => {
                    let reason = status.canonical_reason().unwrap_or("unknown").to_string();
                    return Err(FetchError::Transfer { status, reason });
                }
            }
        }

        Err(FetchError::TooManyRedirects {
            limit: self.config.max_redirects,
        })
    }

    async fn send_attempt(
        &self,
        url: &Url,
        pinned_ip: Option<IpAddr>,
        trail: &mut String,
    ) -> Result<Response, FetchError> {
        let host = url
            .host_str()
            .ok_or_else(|| FetchError::invalid_url(url.as_str(), "missing host"))?
            .to_string();

        let request = if let Some(ip) = pinned_ip {
            push_trail(trail, &host, Some(&ip.to_string()));
            self.pinned_request(url, ip)?
        } else if self.config.address_family == AddressFamily::System {
            debug!("address family policy is system, using the platform resolver");
            push_trail(trail, &host, None);
            self.client.get(url.clone())
        } else {
            let port = url.port_or_known_default().unwrap_or(443);
            let ip = resolve_pinned_addr(&host, port, self.config.address_family).await?;
            push_trail(trail, &host, Some(&ip.to_string()));
            self.pinned_request(url, ip)?
        };

        Ok(request.send().await?)
    }

    /// Send to a literal address while presenting the original hostname in
    /// the `Host` header.
    fn pinned_request(&self, url: &Url, ip: IpAddr) -> Result<RequestBuilder, FetchError> {
        let host = host_of(url);
        let host_header = match url.port() {
            Some(port) => format!("{host}:{port}"),
            None => host,
        };

        let mut pinned = url.clone();
        pinned
            .set_ip_host(ip)
            .map_err(|_| FetchError::invalid_url(url.as_str(), "cannot pin address"))?;

        Ok(self.client.get(pinned).header(header::HOST, host_header))
    }

    fn into_acquired(&self, response: Response, url: &Url, trail: String) -> AcquiredStream {
        let close_token = CancellationToken::new();
        let mut byte_stream = response.bytes_stream();
        let (tx, rx) = mpsc::channel(2);

        let guard = close_token.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = guard.cancelled() => {
                        debug!("stream force-closed");
                        break;
                    }
                    chunk = byte_stream.next() => match chunk {
                        Some(Ok(bytes)) => {
                            if tx.send(Ok(bytes)).await.is_err() {
                                break;
                            }
                        }
                        Some(Err(e)) => {
                            let _ = tx.send(Err(FetchError::Network { source: e })).await;
                            break;
                        }
                        None => break,
                    },
                }
            }
        });

        AcquiredStream {
            stream: ReceiverStream::new(rx).boxed(),
            host: host_of(url),
            host_trail: trail,
            closer: StreamCloser { token: close_token },
        }
    }
}

fn parse_url(input: &str) -> Result<Url, FetchError> {
    input
        .parse::<Url>()
        .map_err(|e| FetchError::invalid_url(input, e.to_string()))
}

fn host_of(url: &Url) -> String {
    url.host_str().unwrap_or_default().to_string()
}

fn push_trail(trail: &mut String, host: &str, ip: Option<&str>) {
    trail.push_str(host);
    if let Some(ip) = ip {
        trail.push_str(" [");
        trail.push_str(ip);
        trail.push(']');
    }
}
