//! Threshold evaluation and the bounded alert history.
//!
//! Every reading at or above a threshold raises a fresh alert; there is no
//! hysteresis, so a metric pinned above its warning level alerts on every tick.

use std::collections::VecDeque;

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;
use tracing::debug;

use crate::metrics::round2;
use crate::types::{Alert, Metric, MetricReading, Severity, Threshold, Thresholds};

pub const HISTORY_CAPACITY: usize = 20;

pub struct AlertEvaluator<R = Pcg64> {
    thresholds: Thresholds,
    // newest first
    history: VecDeque<Alert>,
    capacity: usize,
    rng: R,
}

impl AlertEvaluator<Pcg64> {
    pub fn from_seed(thresholds: Thresholds, seed: u64) -> Self {
        Self::new(thresholds, Pcg64::seed_from_u64(seed))
    }
}

impl<R: Rng> AlertEvaluator<R> {
    pub fn new(thresholds: Thresholds, rng: R) -> Self {
        Self {
            thresholds,
            history: VecDeque::with_capacity(HISTORY_CAPACITY),
            capacity: HISTORY_CAPACITY,
            rng,
        }
    }

    /// Classify each metric of `reading`; returns the alerts raised, in metric
    /// field order, after recording them in the history.
    pub fn check_metrics(&mut self, reading: &MetricReading) -> Vec<Alert> {
        let mut alerts = Vec::new();
        for (metric, value) in reading.values() {
            let Some(t) = self.thresholds.get(metric).copied() else {
                continue;
            };
            let severity = if value >= t.critical {
                Severity::Critical
            } else if value >= t.warning {
                Severity::Warning
            } else {
                continue;
            };
            let alert = self.create_alert(metric, value, &t, severity);
            self.add_to_history(alert.clone());
            alerts.push(alert);
        }
        if !alerts.is_empty() {
            debug!(count = alerts.len(), "thresholds crossed");
        }
        alerts
    }

    fn create_alert(
        &mut self,
        metric: Metric,
        value: f64,
        bounds: &Threshold,
        severity: Severity,
    ) -> Alert {
        let threshold = bounds.for_severity(severity);
        let value = round2(value);
        let now = Utc::now();
        Alert {
            // millis keep ids roughly sortable; 64 random bits keep them unique
            id: format!("{}-{:016x}", now.timestamp_millis(), self.rng.random::<u64>()),
            metric,
            metric_name: metric.display_name().to_string(),
            value,
            threshold,
            severity,
            message: format!(
                "{}: {} at {} (threshold: {})",
                severity.label(),
                metric.display_name(),
                value,
                threshold
            ),
            timestamp: now,
        }
    }

    fn add_to_history(&mut self, alert: Alert) {
        self.history.push_front(alert);
        self.history.truncate(self.capacity);
    }

    /// Snapshot of recent alerts, newest first.
    pub fn history(&self) -> Vec<Alert> {
        self.history.iter().cloned().collect()
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }
}
