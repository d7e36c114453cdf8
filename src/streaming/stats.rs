//! Stats simulator
//!
//! Fabricates bitrate, CPU, RAM and viewer figures for the dashboard while
//! a stream is live. Nothing here is measured; the only real input is the
//! negotiated width of the active video track.

use parking_lot::{Mutex, RwLock};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant};

use crate::events::EventBus;
use crate::media::MediaRegistry;
use crate::protocol::{ControlEvent, Health, Resolution, StreamStats, StreamStatus};

const BASE_CPU_PERCENT: f32 = 15.0;
const CPU_JITTER: f32 = 2.0;
const CPU_RANGE: (f32, f32) = (5.0, 95.0);
const CPU_WARNING_PERCENT: f32 = 90.0;
const BASE_RAM_GB: f32 = 1.2;
const RAM_JITTER_GB: f32 = 0.15;
const BITRATE_JITTER_KBPS: i64 = 250;
const BITRATE_DROP_WARNING_KBPS: u32 = 1000;
const VIEWER_WARMUP_SECS: u64 = 60;
const VIEWER_CHECK_SECS: u64 = 30;
const VIEWER_GAIN_CHANCE: f64 = 0.3;

/// Running state of one live session's simulation
#[derive(Debug, Clone, Default)]
pub struct Simulation {
    stats: StreamStats,
    last_viewer_check_secs: u64,
}

impl Simulation {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn stats(&self) -> &StreamStats {
        &self.stats
    }

    /// Produce the figures for `elapsed` time into the session
    pub fn advance<R: Rng>(
        &mut self,
        elapsed: Duration,
        video_width: Option<u32>,
        rng: &mut R,
    ) -> &StreamStats {
        let resolution = Resolution::from_width(video_width);
        let baseline = resolution.base_bitrate_kbps();
        let jitter = rng.gen_range(-BITRATE_JITTER_KBPS..=BITRATE_JITTER_KBPS);
        let bitrate = (baseline as i64 + jitter).max(0) as u32;

        let minutes = elapsed.as_secs_f32() / 60.0;
        let cpu = (BASE_CPU_PERCENT + minutes + rng.gen_range(-CPU_JITTER..=CPU_JITTER))
            .clamp(CPU_RANGE.0, CPU_RANGE.1);

        let hours = elapsed.as_secs_f32() / 3600.0;
        let ram = (BASE_RAM_GB + hours + rng.gen_range(-RAM_JITTER_GB..=RAM_JITTER_GB)).max(0.0);

        let degraded = bitrate + BITRATE_DROP_WARNING_KBPS < baseline;
        let health = if degraded || cpu > CPU_WARNING_PERCENT {
            Health::Warning
        } else {
            Health::Good
        };

        let secs = elapsed.as_secs();
        if secs >= VIEWER_WARMUP_SECS && secs - self.last_viewer_check_secs >= VIEWER_CHECK_SECS {
            self.last_viewer_check_secs = secs;
            if rng.gen_bool(VIEWER_GAIN_CHANCE) {
                self.stats.viewers += 1;
            }
        }

        self.stats = StreamStats {
            bitrate_kbps: bitrate,
            cpu_percent: cpu,
            ram_gb: ram,
            viewers: self.stats.viewers,
            resolution,
            health,
            uptime_secs: secs,
            ticks: self.stats.ticks + 1,
            updated_at: chrono::Utc::now(),
        };
        &self.stats
    }
}

/// Owns the single simulation timer
pub struct StatsSimulator {
    registry: Arc<MediaRegistry>,
    events: EventBus,
    period: Duration,
    stats: Arc<RwLock<StreamStats>>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl StatsSimulator {
    pub fn new(registry: Arc<MediaRegistry>, events: EventBus, period: Duration) -> Self {
        Self {
            registry,
            events,
            period,
            stats: Arc::new(RwLock::new(StreamStats::default())),
            task: Mutex::new(None),
        }
    }

    pub fn current(&self) -> StreamStats {
        self.stats.read().clone()
    }

    pub fn is_running(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Start a fresh simulation if `status` is live.
    ///
    /// Any timer already running is aborted first, so at most one ever runs.
    pub fn simulate_stats_change(&self, status: StreamStatus) {
        if status != StreamStatus::Live {
            return;
        }

        let mut task = self.task.lock();
        if let Some(previous) = task.take() {
            previous.abort();
            tracing::debug!("replaced running stats timer");
        }
        *self.stats.write() = StreamStats::default();

        let registry = Arc::clone(&self.registry);
        let events = self.events.clone();
        let stats = Arc::clone(&self.stats);
        let period = self.period;

        *task = Some(tokio::spawn(async move {
            let started = Instant::now();
            let mut ticker = interval_at(started + period, period);
            let mut rng = StdRng::from_entropy();
            let mut simulation = Simulation::new();

            loop {
                ticker.tick().await;
                let width = registry.video_settings().and_then(|s| s.width);
                let next = simulation.advance(started.elapsed(), width, &mut rng).clone();
                *stats.write() = next.clone();
                events.publish(ControlEvent::Stats(next));
            }
        }));
    }

    /// Stop the timer; the last figures stay readable
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
    }
}

impl Drop for StatsSimulator {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::stream::{MediaStream, MediaTrack, TrackKind, TrackSettings};
    use crate::protocol::Slot;
    use proptest::prelude::*;

    fn rng() -> StdRng {
        StdRng::seed_from_u64(7)
    }

    #[test]
    fn test_resolution_buckets() {
        let mut sim = Simulation::new();
        let mut rng = rng();
        for (width, expected, base) in [
            (Some(640), Resolution::P480, 2500),
            (Some(1280), Resolution::P720, 4500),
            (Some(1920), Resolution::P1080, 6000),
            (None, Resolution::P720, 4500),
        ] {
            let stats = sim.advance(Duration::from_secs(3), width, &mut rng);
            assert_eq!(stats.resolution, expected);
            assert!(stats.bitrate_kbps >= base - 250 && stats.bitrate_kbps <= base + 250);
        }
    }

    #[test]
    fn test_cpu_warning_after_long_session() {
        let mut sim = Simulation::new();
        let stats = sim.advance(Duration::from_secs(90 * 60), Some(1280), &mut rng());
        assert_eq!(stats.cpu_percent, 95.0);
        assert_eq!(stats.health, Health::Warning);
    }

    #[test]
    fn test_fresh_session_is_healthy() {
        let mut sim = Simulation::new();
        let stats = sim.advance(Duration::from_secs(3), Some(1280), &mut rng());
        assert_eq!(stats.health, Health::Good);
        assert!(stats.ram_gb > 1.0 && stats.ram_gb < 1.4);
        assert_eq!(stats.ticks, 1);
    }

    #[test]
    fn test_viewers_wait_for_first_minute() {
        let mut sim = Simulation::new();
        let mut rng = rng();
        for tick in 1..=19 {
            sim.advance(Duration::from_secs(tick * 3), None, &mut rng);
        }
        assert_eq!(sim.stats().viewers, 0);

        for tick in 20..=600 {
            sim.advance(Duration::from_secs(tick * 3), None, &mut rng);
        }
        let viewers = sim.stats().viewers;
        // One check every 30 s between minute 1 and minute 30
        assert!(viewers > 0 && viewers <= 59);
    }

    proptest! {
        #[test]
        fn prop_cpu_stays_in_range(secs in 0u64..(24 * 3600), seed in any::<u64>()) {
            let mut sim = Simulation::new();
            let mut rng = StdRng::seed_from_u64(seed);
            let stats = sim.advance(Duration::from_secs(secs), Some(1920), &mut rng);
            prop_assert!(stats.cpu_percent >= 5.0 && stats.cpu_percent <= 95.0);
            prop_assert!(stats.ram_gb >= 0.0);
        }
    }

    fn simulator() -> (Arc<MediaRegistry>, StatsSimulator) {
        let registry = MediaRegistry::shared();
        let sim = StatsSimulator::new(registry.clone(), EventBus::new(), Duration::from_secs(3));
        (registry, sim)
    }

    #[tokio::test(start_paused = true)]
    async fn test_noop_unless_live() {
        let (_, sim) = simulator();
        sim.simulate_stats_change(StreamStatus::Offline);
        sim.simulate_stats_change(StreamStatus::Recording);
        assert!(!sim.is_running());
        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(sim.current().ticks, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_restart_keeps_single_timer() {
        let (registry, sim) = simulator();
        registry.insert(
            Slot::Camera,
            1,
            MediaStream::new(vec![MediaTrack::new(
                TrackKind::Video,
                "cam",
                TrackSettings::video(1920, 1080, 30.0),
            )]),
        );

        sim.simulate_stats_change(StreamStatus::Live);
        sim.simulate_stats_change(StreamStatus::Live);
        assert!(sim.is_running());

        tokio::time::sleep(Duration::from_secs(10)).await;
        let stats = sim.current();
        assert_eq!(stats.ticks, 3);
        assert_eq!(stats.resolution, Resolution::P1080);
        assert_eq!(stats.uptime_secs, 9);
    }

    #[tokio::test(start_paused = true)]
    async fn test_stop_halts_updates() {
        let (_, sim) = simulator();
        sim.simulate_stats_change(StreamStatus::Live);
        tokio::time::sleep(Duration::from_secs(4)).await;
        sim.stop();
        assert!(!sim.is_running());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(sim.current().ticks, 1);
    }
}
