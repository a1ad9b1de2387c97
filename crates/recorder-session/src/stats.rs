use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::{Duration, Instant};

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::broadcast;
use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::events::{IoStatsSnapshot, SessionEvent};

/// Interval between I/O stats aggregation ticks.
pub const IO_STATS_INTERVAL: Duration = Duration::from_secs(2);

#[derive(Debug, Default)]
struct DiskIo {
    bytes: u64,
    write_duration: Duration,
}

/// Counters shared between the network-read path, the disk-write path and
/// the watchdog tick. Producers only add; the tick is the only reader and
/// zeroes on read.
#[derive(Debug, Default)]
pub struct IoCounters {
    network_bytes: AtomicU64,
    // Disk bytes and write duration must be read together consistently, so
    // they share one lock, kept separate from the hot network counter.
    disk: Mutex<DiskIo>,
}

impl IoCounters {
    pub fn add_network_bytes(&self, bytes: u64) {
        self.network_bytes.fetch_add(bytes, Ordering::Relaxed);
    }

    pub fn add_disk_write(&self, bytes: u64, duration: Duration) {
        let mut disk = self.disk.lock();
        disk.bytes += bytes;
        disk.write_duration += duration;
    }

    fn take_network_bytes(&self) -> u64 {
        self.network_bytes.swap(0, Ordering::Relaxed)
    }

    fn take_disk(&self) -> (u64, Duration) {
        let mut disk = self.disk.lock();
        let taken = (disk.bytes, disk.write_duration);
        disk.bytes = 0;
        disk.write_duration = Duration::ZERO;
        taken
    }
}

/// Periodic I/O aggregation plus stall detection. Owned by the session; the
/// loop runs in a single task, so ticks never overlap, and missed ticks are
/// skipped rather than queued.
pub(crate) struct IoStatsWatchdog {
    pub counters: Arc<IoCounters>,
    pub events: broadcast::Sender<SessionEvent>,
    pub cancel: CancellationToken,
    pub timeout_triggered: Arc<AtomicBool>,
    pub stream_host: Arc<Mutex<Option<String>>>,
    pub interval: Duration,
    pub watchdog_timeout: Duration,
}

impl IoStatsWatchdog {
    pub(crate) async fn run(self) {
        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        // consume the immediate first tick so the first interval has a
        // meaningful length
        ticker.tick().await;

        let mut last_trigger = Instant::now();
        let mut last_wall = Utc::now();
        let mut since_no_data = Duration::ZERO;

        loop {
            tokio::select! {
                _ = self.cancel.cancelled() => return,
                _ = ticker.tick() => {}
            }

            let network_bytes = self.counters.take_network_bytes();
            let (disk_bytes, disk_write_duration) = self.counters.take_disk();

            let now = Instant::now();
            let duration = now - last_trigger;
            last_trigger = now;

            let end_time = Utc::now();
            let start_time = last_wall;
            last_wall = end_time;

            since_no_data = if network_bytes > 0 {
                Duration::ZERO
            } else {
                since_no_data + duration
            };

            let network_mbps = if duration > Duration::ZERO {
                network_bytes as f64 * 8.0 / (1024.0 * 1024.0) / duration.as_secs_f64()
            } else {
                0.0
            };
            let disk_mbps = if disk_write_duration > Duration::ZERO {
                disk_bytes as f64 / (1024.0 * 1024.0) / disk_write_duration.as_secs_f64()
            } else {
                0.0
            };

            let _ = self.events.send(SessionEvent::IoStats(IoStatsSnapshot {
                stream_host: self.stream_host.lock().clone(),
                network_bytes,
                disk_bytes,
                start_time,
                end_time,
                duration,
                network_mbps,
                disk_mbps,
                disk_write_duration,
            }));

            if since_no_data > self.watchdog_timeout
                && !self.timeout_triggered.swap(true, Ordering::SeqCst)
            {
                warn!(
                    stalled_for = ?since_no_data,
                    "recording stalled, likely a network or disk problem; disconnecting"
                );
                self.cancel.cancel();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn watchdog(
        counters: Arc<IoCounters>,
        cancel: CancellationToken,
        flag: Arc<AtomicBool>,
        events: broadcast::Sender<SessionEvent>,
    ) -> IoStatsWatchdog {
        IoStatsWatchdog {
            counters,
            events,
            cancel,
            timeout_triggered: flag,
            stream_host: Arc::new(Mutex::new(Some("cn-edge.example.com".to_string()))),
            interval: Duration::from_millis(100),
            watchdog_timeout: Duration::from_millis(250),
        }
    }

    #[test]
    fn counters_are_zeroed_on_take() {
        let counters = IoCounters::default();
        counters.add_network_bytes(100);
        counters.add_network_bytes(200);
        counters.add_disk_write(50, Duration::from_millis(5));
        counters.add_disk_write(70, Duration::from_millis(7));

        assert_eq!(counters.take_network_bytes(), 300);
        assert_eq!(counters.take_network_bytes(), 0);

        assert_eq!(counters.take_disk(), (120, Duration::from_millis(12)));
        assert_eq!(counters.take_disk(), (0, Duration::ZERO));
    }

    #[tokio::test(start_paused = true)]
    async fn sustained_zero_bytes_triggers_exactly_one_stop() {
        let counters = Arc::new(IoCounters::default());
        let cancel = CancellationToken::new();
        let flag = Arc::new(AtomicBool::new(false));
        let (events, mut rx) = broadcast::channel(64);

        let task = tokio::spawn(watchdog(counters, cancel.clone(), flag.clone(), events).run());

        time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("watchdog should have requested a stop");
        assert!(flag.load(Ordering::SeqCst));
        task.await.unwrap();

        let mut snapshots = 0;
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::IoStats(snapshot) = event {
                assert_eq!(snapshot.network_bytes, 0);
                assert_eq!(snapshot.network_mbps, 0.0);
                assert_eq!(
                    snapshot.stream_host.as_deref(),
                    Some("cn-edge.example.com")
                );
                snapshots += 1;
            }
        }
        // 250ms threshold at a 100ms tick: at least three zero-byte intervals
        assert!(snapshots >= 3, "expected several ticks, saw {snapshots}");
    }

    #[tokio::test(start_paused = true)]
    async fn interval_data_resets_the_stall_clock() {
        let counters = Arc::new(IoCounters::default());
        let cancel = CancellationToken::new();
        let flag = Arc::new(AtomicBool::new(false));
        let (events, _rx) = broadcast::channel(64);

        tokio::spawn(watchdog(
            counters.clone(),
            cancel.clone(),
            flag.clone(),
            events,
        ).run());

        // feed bytes faster than the tick period for ~800ms, well past the
        // 250ms stall threshold
        for _ in 0..10 {
            counters.add_network_bytes(4096);
            time::sleep(Duration::from_millis(80)).await;
        }
        assert!(!cancel.is_cancelled());
        assert!(!flag.load(Ordering::SeqCst));

        // starve it and the stop fires
        time::timeout(Duration::from_secs(5), cancel.cancelled())
            .await
            .expect("watchdog should stop after data dries up");
        assert!(flag.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn external_cancellation_stops_the_loop_without_stall_flag() {
        let counters = Arc::new(IoCounters::default());
        let cancel = CancellationToken::new();
        let flag = Arc::new(AtomicBool::new(false));
        let (events, _rx) = broadcast::channel(64);

        let task = tokio::spawn(watchdog(
            counters,
            cancel.clone(),
            flag.clone(),
            events,
        ).run());

        time::sleep(Duration::from_millis(120)).await;
        cancel.cancel();
        task.await.unwrap();
        assert!(!flag.load(Ordering::SeqCst));
    }

    #[tokio::test(start_paused = true)]
    async fn snapshots_carry_disk_throughput() {
        let counters = Arc::new(IoCounters::default());
        let cancel = CancellationToken::new();
        let flag = Arc::new(AtomicBool::new(false));
        let (events, mut rx) = broadcast::channel(64);

        tokio::spawn(watchdog(
            counters.clone(),
            cancel.clone(),
            flag,
            events,
        ).run());

        counters.add_network_bytes(1024 * 1024);
        counters.add_disk_write(2 * 1024 * 1024, Duration::from_millis(500));
        time::sleep(Duration::from_millis(150)).await;
        cancel.cancel();

        let mut found = false;
        while let Ok(event) = rx.try_recv() {
            if let SessionEvent::IoStats(snapshot) = event
                && snapshot.disk_bytes > 0
            {
                // 2 MiB over half a second of write time is 4 MiB/s
                assert!((snapshot.disk_mbps - 4.0).abs() < 1e-9);
                assert_eq!(snapshot.disk_write_duration, Duration::from_millis(500));
                assert_eq!(snapshot.network_bytes, 1024 * 1024);
                found = true;
            }
        }
        assert!(found);
    }
}
