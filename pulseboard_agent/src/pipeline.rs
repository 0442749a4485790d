//! The simulation core wired to a transport: tick bodies and client events.

use tokio::sync::Mutex;
use tracing::info;

use crate::alerts::AlertEvaluator;
use crate::hub::{ClientId, Transport};
use crate::logs::LogSimulator;
use crate::metrics::MetricsSimulator;
use crate::types::{MetricReading, ServerEvent, Thresholds};

// per-generator offsets so one base seed yields independent streams
const METRICS_STREAM: u64 = 0;
const ALERTS_STREAM: u64 = 1;
const LOGS_STREAM: u64 = 2;
pub(crate) const CADENCE_STREAM: u64 = 3;

pub struct Pipeline {
    metrics: Mutex<MetricsSimulator>,
    alerts: Mutex<AlertEvaluator>,
    logs: Mutex<LogSimulator>,
}

impl Pipeline {
    pub fn new(thresholds: Thresholds, seed: u64) -> Self {
        Self {
            metrics: Mutex::new(MetricsSimulator::from_seed(
                seed.wrapping_add(METRICS_STREAM),
            )),
            alerts: Mutex::new(AlertEvaluator::from_seed(
                thresholds,
                seed.wrapping_add(ALERTS_STREAM),
            )),
            logs: Mutex::new(LogSimulator::from_seed(seed.wrapping_add(LOGS_STREAM))),
        }
    }

    /// One metrics period: generate, evaluate, then emit the reading followed
    /// by its alerts in order.
    ///
    /// The evaluator stays locked until the broadcast is queued, so a client
    /// connecting meanwhile never finds an alert in its history snapshot
    /// before the reading that raised it.
    pub async fn metrics_tick<T: Transport + ?Sized>(&self, transport: &T) -> MetricReading {
        let reading = self.metrics.lock().await.generate_reading();
        let mut evaluator = self.alerts.lock().await;
        let alerts = evaluator.check_metrics(&reading);

        let mut events = Vec::with_capacity(1 + alerts.len());
        events.push(ServerEvent::MetricsUpdate(reading.clone()));
        events.extend(alerts.into_iter().map(ServerEvent::Alert));
        transport.broadcast_seq(&events);
        drop(evaluator);
        reading
    }

    pub async fn log_tick<T: Transport + ?Sized>(&self, transport: &T) {
        let entry = self.logs.lock().await.generate_log();
        transport.broadcast_all(&ServerEvent::Log(entry));
    }

    pub async fn on_client_connected<T: Transport + ?Sized>(&self, transport: &T, client: ClientId) {
        let count = transport.client_count();
        info!(client, count, "client connected");
        transport.broadcast_all(&ServerEvent::UsersCount(count));

        let alerts = self.alerts.lock().await;
        transport.unicast(client, &ServerEvent::Thresholds(alerts.thresholds().clone()));
        transport.unicast(client, &ServerEvent::AlertHistory(alerts.history()));
    }

    pub fn on_client_disconnected<T: Transport + ?Sized>(&self, transport: &T, client: ClientId) {
        let count = transport.client_count();
        info!(client, count, "client disconnected");
        transport.broadcast_all(&ServerEvent::UsersCount(count));
    }

    /// Raise the baselines; the next metrics tick reports the result.
    pub async fn on_spike_requested(&self, client: ClientId) {
        info!(client, "spike requested");
        self.metrics.lock().await.inject_spike();
    }
}
