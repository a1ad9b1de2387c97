use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};
use url::Url;
use uuid::Uuid;

use live_api::{StreamUrlResolver, qn_description};
use stream_fetch::{ByteStream, FetchError, StreamFetcher};

use crate::config::RoomConfig;
use crate::error::SessionError;
use crate::events::{RecordingStats, SessionEvent};
use crate::stats::{IO_STATS_INTERVAL, IoCounters, IoStatsWatchdog};

/// Grace period between cancellation and force-closing the stream. Closing
/// the transport synchronously can race with an in-progress read by the
/// consumer; the delay lets the read observe cancellation cooperatively.
const STREAM_CLOSE_GRACE: Duration = Duration::from_secs(1);

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Byte stream handed to the consumer. Chunks have already been counted
/// into the session's network counter as they arrived.
pub type SessionByteStream = ByteStream;

/// Capabilities the stream consumer receives alongside the byte stream.
#[derive(Clone)]
pub struct SessionHandle {
    counters: Arc<IoCounters>,
    events: broadcast::Sender<SessionEvent>,
    cancel: CancellationToken,
}

impl SessionHandle {
    /// Record one completed disk write.
    pub fn add_disk_write(&self, bytes: u64, duration: Duration) {
        self.counters.add_disk_write(bytes, duration);
    }

    /// Forward recording progress to session subscribers.
    pub fn recording_stats(&self, stats: RecordingStats) {
        let _ = self.events.send(SessionEvent::RecordingStats(stats));
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub async fn cancelled(&self) {
        self.cancel.cancelled().await
    }
}

/// Consumes the acquired byte stream. Owns byte-level parsing and output;
/// invoked once per session. The consumer is responsible for dropping the
/// stream; the session only retains a non-owning close handle.
#[async_trait]
pub trait StreamConsumer: Send + Sync {
    async fn consume(&self, stream: SessionByteStream, session: SessionHandle);

    /// Roll over to a new output unit. Default is a no-op at this layer;
    /// the container-format layer owns the actual implementation.
    fn on_split_request(&self) {}
}

/// One end-to-end attempt to acquire and continuously record a live stream
/// for a room, bounded by `start` and the terminal stop.
pub struct RecordingSession {
    session_id: Uuid,
    room: RoomConfig,
    resolver: StreamUrlResolver,
    fetcher: StreamFetcher,
    consumer: Arc<dyn StreamConsumer>,
    counters: Arc<IoCounters>,
    cancel: CancellationToken,
    events: broadcast::Sender<SessionEvent>,
    started: AtomicBool,
    stream_opened: AtomicBool,
    ended: AtomicBool,
    timeout_triggered: Arc<AtomicBool>,
    stream_host: Arc<Mutex<Option<String>>>,
}

impl RecordingSession {
    pub fn new(
        room: RoomConfig,
        resolver: StreamUrlResolver,
        fetcher: StreamFetcher,
        consumer: Arc<dyn StreamConsumer>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Arc::new(Self {
            session_id: Uuid::new_v4(),
            room,
            resolver,
            fetcher,
            consumer,
            counters: Arc::new(IoCounters::default()),
            cancel: CancellationToken::new(),
            events,
            started: AtomicBool::new(false),
            stream_opened: AtomicBool::new(false),
            ended: AtomicBool::new(false),
            timeout_triggered: Arc::new(AtomicBool::new(false)),
            stream_host: Arc::new(Mutex::new(None)),
        })
    }

    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    pub fn is_ended(&self) -> bool {
        self.ended.load(Ordering::SeqCst)
    }

    /// Whether the stop was self-initiated by the stall watchdog.
    pub fn stalled(&self) -> bool {
        self.timeout_triggered.load(Ordering::SeqCst)
    }

    /// Signal cooperative cancellation. Always safe to call, including
    /// before `start` and after the session ended; a no-op once cancelled.
    pub fn request_stop(&self) {
        self.cancel.cancel();
    }

    /// Ask the consumer to roll over to a new output unit.
    pub fn split_output(&self) {
        self.consumer.on_split_request();
    }

    /// Negotiate, acquire and hand the stream to the consumer. Allowed at
    /// most once per session.
    pub async fn start(self: Arc<Self>) -> Result<(), SessionError> {
        if self.started.swap(true, Ordering::SeqCst) {
            return Err(SessionError::AlreadyStarted);
        }

        match Self::acquire_and_launch(&self).await {
            Ok(()) => Ok(()),
            Err(e) => {
                // fatal before the consumer took over; the session is done
                self.finish();
                Err(e)
            }
        }
    }

    async fn acquire_and_launch(this: &Arc<Self>) -> Result<(), SessionError> {
        let resolved = tokio::select! {
            _ = this.cancel.cancelled() => return Err(SessionError::Cancelled),
            result = this
                .resolver
                .resolve(this.room.room_id, &this.room.recording_quality) => result?,
        };

        let host = Url::parse(&resolved.full_url)
            .ok()
            .and_then(|url| url.host_str().map(str::to_string))
            .unwrap_or_default();

        info!(
            host = %host,
            qn = resolved.codec_qn.qn,
            qn_desc = qn_description(resolved.codec_qn.qn),
            "connecting to live server"
        );
        debug!(url = %resolved.full_url, "stream url");

        let acquired = match this.fetcher.acquire(&resolved.full_url, &this.cancel).await {
            Ok(acquired) => acquired,
            Err(FetchError::Cancelled) => return Err(SessionError::Cancelled),
            Err(e) => return Err(e.into()),
        };

        *this.stream_host.lock() = Some(acquired.host_trail.clone());

        // Deferred force-close through the non-owning handle. Failure modes
        // (consumer already dropped the stream) are swallowed by design of
        // the closer.
        let closer = acquired.closer();
        let close_cancel = this.cancel.clone();
        tokio::spawn(async move {
            close_cancel.cancelled().await;
            tokio::time::sleep(STREAM_CLOSE_GRACE).await;
            closer.close();
        });

        tokio::spawn(
            IoStatsWatchdog {
                counters: this.counters.clone(),
                events: this.events.clone(),
                cancel: this.cancel.clone(),
                timeout_triggered: this.timeout_triggered.clone(),
                stream_host: this.stream_host.clone(),
                interval: IO_STATS_INTERVAL,
                watchdog_timeout: this.room.watchdog_timeout(),
            }
            .run(),
        );

        this.stream_opened.store(true, Ordering::SeqCst);
        let _ = this.events.send(SessionEvent::StreamOpening {
            host: acquired.host.clone(),
        });

        // count network chunks as they arrive, then hand off
        let counters = this.counters.clone();
        let stream = acquired
            .stream
            .inspect(move |chunk| {
                if let Ok(bytes) = chunk {
                    counters.add_network_bytes(bytes.len() as u64);
                }
            })
            .boxed();

        let handle = SessionHandle {
            counters: this.counters.clone(),
            events: this.events.clone(),
            cancel: this.cancel.clone(),
        };
        let consumer = this.consumer.clone();
        let session = this.clone();
        tokio::spawn(async move {
            consumer.consume(stream, handle).await;
            session.finish();
        });

        Ok(())
    }

    /// Terminal transition. Emits the closing events exactly once no matter
    /// how many stop paths fire.
    fn finish(&self) {
        if self.ended.swap(true, Ordering::SeqCst) {
            return;
        }
        self.cancel.cancel();

        if self.stream_opened.load(Ordering::SeqCst) {
            let host = self.stream_host.lock().clone();
            let _ = self.events.send(SessionEvent::StreamClosed { host });
        }

        info!(
            session_id = %self.session_id,
            stalled = self.stalled(),
            "recording session ended"
        );
        let _ = self.events.send(SessionEvent::SessionEnded {
            session_id: self.session_id,
            stalled: self.stalled(),
        });
    }
}
