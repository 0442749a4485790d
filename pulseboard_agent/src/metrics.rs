//! Simulated telemetry: one bounded random walk per metric, plus operator spikes.

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::types::{Metric, MetricReading};

/// Walk parameters for a single metric.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricProfile {
    pub initial: f64,
    pub min: f64,
    pub max: f64,
    /// Largest step a single tick may take in either direction.
    pub max_change: f64,
    /// Added to the baseline by `inject_spike`, capped at `max`.
    pub spike: f64,
}

impl MetricProfile {
    pub fn defaults(metric: Metric) -> Self {
        match metric {
            Metric::Cpu => Self {
                initial: 45.0,
                min: 10.0,
                max: 95.0,
                max_change: 8.0,
                spike: 30.0,
            },
            Metric::Memory => Self {
                initial: 60.0,
                min: 30.0,
                max: 90.0,
                max_change: 5.0,
                spike: 0.0,
            },
            Metric::Requests => Self {
                initial: 100.0,
                min: 50.0,
                max: 500.0,
                max_change: 30.0,
                spike: 150.0,
            },
            Metric::ResponseTime => Self {
                initial: 150.0,
                min: 50.0,
                max: 800.0,
                max_change: 50.0,
                spike: 200.0,
            },
        }
    }
}

pub struct MetricsSimulator<R = Pcg64> {
    rng: R,
    profiles: [MetricProfile; 4],
    baselines: [f64; 4],
}

impl MetricsSimulator<Pcg64> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(Pcg64::seed_from_u64(seed))
    }
}

impl<R: Rng> MetricsSimulator<R> {
    pub fn new(rng: R) -> Self {
        let profiles = Metric::ALL.map(MetricProfile::defaults);
        let baselines = profiles.map(|p| p.initial);
        Self {
            rng,
            profiles,
            baselines,
        }
    }

    pub fn profile(&self, metric: Metric) -> &MetricProfile {
        &self.profiles[metric.index()]
    }

    /// Advance every walk by one step and snapshot the result.
    pub fn generate_reading(&mut self) -> MetricReading {
        for metric in Metric::ALL {
            self.step(metric);
        }
        MetricReading {
            cpu: self.baselines[Metric::Cpu.index()],
            memory: self.baselines[Metric::Memory.index()],
            requests: self.baselines[Metric::Requests.index()].round() as u32,
            response_time: self.baselines[Metric::ResponseTime.index()].round() as u32,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    /// Jump baselines upward, bypassing the step limit but never past `max`.
    /// The next `generate_reading` walks on from the raised values.
    pub fn inject_spike(&mut self) {
        for metric in Metric::ALL {
            let p = self.profiles[metric.index()];
            let b = &mut self.baselines[metric.index()];
            *b = (*b + p.spike).min(p.max);
        }
    }

    fn step(&mut self, metric: Metric) {
        let p = self.profiles[metric.index()];
        let delta = if p.max_change > 0.0 {
            self.rng.random_range(-p.max_change..p.max_change)
        } else {
            0.0
        };
        let b = &mut self.baselines[metric.index()];
        *b = round2((*b + delta).clamp(p.min, p.max));
    }
}

pub(crate) fn round2(v: f64) -> f64 {
    (v * 100.0).round() / 100.0
}
