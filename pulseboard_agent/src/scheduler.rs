//! Background loops: a fixed-period metrics tick and a self-rescheduling log
//! tick with jittered delay. Both stop when the scheduler is stopped or dropped.

use std::sync::Arc;

use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Duration, Instant, MissedTickBehavior};
use tracing::{info, warn};

use crate::hub::Transport;
use crate::pipeline::{Pipeline, CADENCE_STREAM};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchedulerConfig {
    pub metrics_period: Duration,
    /// Log delays are drawn uniformly from `[log_delay_min, log_delay_max)`.
    pub log_delay_min: Duration,
    pub log_delay_max: Duration,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            metrics_period: Duration::from_millis(2000),
            log_delay_min: Duration::from_millis(1000),
            log_delay_max: Duration::from_millis(3000),
        }
    }
}

pub struct BroadcastScheduler {
    shutdown: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl BroadcastScheduler {
    pub fn start<T: Transport>(
        pipeline: Arc<Pipeline>,
        transport: Arc<T>,
        config: SchedulerConfig,
        seed: u64,
    ) -> Self {
        let (shutdown, rx) = watch::channel(false);
        let cadence = Pcg64::seed_from_u64(seed.wrapping_add(CADENCE_STREAM));
        let tasks = vec![
            spawn_metrics_loop(
                pipeline.clone(),
                transport.clone(),
                config.metrics_period,
                rx.clone(),
            ),
            spawn_log_loop(pipeline, transport, config, cadence, rx),
        ];
        info!(
            metrics_ms = config.metrics_period.as_millis() as u64,
            log_min_ms = config.log_delay_min.as_millis() as u64,
            log_max_ms = config.log_delay_max.as_millis() as u64,
            "scheduler started"
        );
        Self { shutdown, tasks }
    }

    /// Cancel both loops and wait for them to exit. No tick fires after this
    /// returns.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        for task in self.tasks {
            if let Err(e) = task.await {
                warn!("scheduler task ended abnormally: {e}");
            }
        }
        info!("scheduler stopped");
    }
}

fn spawn_metrics_loop<T: Transport>(
    pipeline: Arc<Pipeline>,
    transport: Arc<T>,
    period: Duration,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        // first reading one full period after start
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = ticker.tick() => {}
            }
            if *shutdown.borrow() {
                break;
            }
            pipeline.metrics_tick(transport.as_ref()).await;
        }
    })
}

fn spawn_log_loop<T: Transport>(
    pipeline: Arc<Pipeline>,
    transport: Arc<T>,
    config: SchedulerConfig,
    mut cadence: Pcg64,
    mut shutdown: watch::Receiver<bool>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            if *shutdown.borrow() {
                break;
            }
            pipeline.log_tick(transport.as_ref()).await;
            let delay = next_log_delay(&mut cadence, &config);
            tokio::select! {
                biased;
                _ = shutdown.changed() => break,
                _ = sleep(delay) => {}
            }
        }
    })
}

fn next_log_delay<R: Rng>(rng: &mut R, config: &SchedulerConfig) -> Duration {
    let min = config.log_delay_min.as_millis() as u64;
    let max = config.log_delay_max.as_millis() as u64;
    if max > min {
        Duration::from_millis(rng.random_range(min..max))
    } else {
        config.log_delay_min
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hub::ClientId;
    use crate::pipeline::tests::Recorder;
    use crate::types::{ServerEvent, Thresholds};
    use std::sync::Mutex as StdMutex;

    fn count(rec: &Recorder, name: &str) -> usize {
        rec.names().iter().filter(|n| **n == name).count()
    }

    #[tokio::test(start_paused = true)]
    async fn metrics_tick_on_fixed_grid() {
        let pipeline = Arc::new(Pipeline::new(Thresholds::default(), 1));
        let rec = Arc::new(Recorder::default());
        let sched =
            BroadcastScheduler::start(pipeline, rec.clone(), SchedulerConfig::default(), 1);

        sleep(Duration::from_millis(1_900)).await;
        assert_eq!(count(&rec, "metrics-update"), 0);
        sleep(Duration::from_millis(4_600)).await;
        assert_eq!(count(&rec, "metrics-update"), 3);
        let logs = count(&rec, "log");
        assert!((3..=7).contains(&logs), "logs={logs}");

        sched.stop().await;
    }

    #[tokio::test(start_paused = true)]
    async fn stop_cancels_both_loops() {
        let pipeline = Arc::new(Pipeline::new(Thresholds::default(), 2));
        let rec = Arc::new(Recorder::default());
        let sched =
            BroadcastScheduler::start(pipeline, rec.clone(), SchedulerConfig::default(), 2);

        sleep(Duration::from_millis(4_500)).await;
        sched.stop().await;
        let frozen = rec.events().len();
        assert!(count(&rec, "metrics-update") == 2);

        sleep(Duration::from_secs(30)).await;
        assert_eq!(rec.events().len(), frozen);
    }

    #[tokio::test(start_paused = true)]
    async fn dropping_scheduler_also_stops_loops() {
        let pipeline = Arc::new(Pipeline::new(Thresholds::default(), 3));
        let rec = Arc::new(Recorder::default());
        let sched =
            BroadcastScheduler::start(pipeline, rec.clone(), SchedulerConfig::default(), 3);
        sleep(Duration::from_millis(2_100)).await;
        drop(sched);
        // let the loops observe the closed channel
        sleep(Duration::from_millis(10)).await;
        let frozen = rec.events().len();
        sleep(Duration::from_secs(30)).await;
        assert_eq!(rec.events().len(), frozen);
    }

    /// Records when each log frame went out.
    #[derive(Default)]
    struct LogClock {
        at: StdMutex<Vec<Instant>>,
    }

    impl Transport for LogClock {
        fn broadcast_all(&self, event: &ServerEvent) {
            if matches!(event, ServerEvent::Log(_)) {
                self.at.lock().unwrap().push(Instant::now());
            }
        }
        fn unicast(&self, _client: ClientId, _event: &ServerEvent) {}
        fn client_count(&self) -> usize {
            0
        }
    }

    #[tokio::test(start_paused = true)]
    async fn log_cadence_is_jittered_within_bounds() {
        let pipeline = Arc::new(Pipeline::new(Thresholds::default(), 4));
        let clock = Arc::new(LogClock::default());
        let sched =
            BroadcastScheduler::start(pipeline, clock.clone(), SchedulerConfig::default(), 4);
        sleep(Duration::from_secs(60)).await;
        sched.stop().await;

        let at = clock.at.lock().unwrap().clone();
        assert!(at.len() >= 20, "only {} logs", at.len());
        let gaps: Vec<Duration> = at.windows(2).map(|w| w[1] - w[0]).collect();
        for gap in &gaps {
            assert!(
                *gap >= Duration::from_millis(1000) && *gap <= Duration::from_millis(3000),
                "gap {gap:?}"
            );
        }
        assert!(gaps.iter().any(|g| *g != gaps[0]), "log cadence never varied");
    }

    #[test]
    fn degenerate_delay_range_uses_minimum() {
        let cfg = SchedulerConfig {
            log_delay_min: Duration::from_millis(500),
            log_delay_max: Duration::from_millis(500),
            ..SchedulerConfig::default()
        };
        let mut rng = Pcg64::seed_from_u64(0);
        assert_eq!(next_log_delay(&mut rng, &cfg), Duration::from_millis(500));
    }
}
