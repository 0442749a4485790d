//! Data types sent to the client over WebSocket.
//! Keep this module minimal and stable: it defines the wire format.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// The closed set of simulated metrics, in wire iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Metric {
    Cpu,
    Memory,
    Requests,
    ResponseTime,
}

impl Metric {
    pub const ALL: [Metric; 4] = [
        Metric::Cpu,
        Metric::Memory,
        Metric::Requests,
        Metric::ResponseTime,
    ];

    /// Wire key, as used in `metrics-update` and `thresholds` payloads.
    pub fn key(self) -> &'static str {
        match self {
            Metric::Cpu => "cpu",
            Metric::Memory => "memory",
            Metric::Requests => "requests",
            Metric::ResponseTime => "responseTime",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Metric::Cpu => "CPU Usage",
            Metric::Memory => "Memory Usage",
            Metric::Requests => "Requests/sec",
            Metric::ResponseTime => "Response Time",
        }
    }

    pub(crate) fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// One snapshot of all metrics. cpu/memory are percentages with two decimals,
/// requests and responseTime are whole numbers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricReading {
    pub cpu: f64,
    pub memory: f64,
    pub requests: u32,
    pub response_time: u32,
    /// Epoch milliseconds.
    pub timestamp: i64,
}

impl MetricReading {
    /// Metric values in field order (timestamp excluded).
    pub fn values(&self) -> [(Metric, f64); 4] {
        [
            (Metric::Cpu, self.cpu),
            (Metric::Memory, self.memory),
            (Metric::Requests, f64::from(self.requests)),
            (Metric::ResponseTime, f64::from(self.response_time)),
        ]
    }

    pub fn get(&self, metric: Metric) -> f64 {
        self.values()[metric.index()].1
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

impl Threshold {
    pub fn new(warning: f64, critical: f64) -> Self {
        Self { warning, critical }
    }

    pub fn for_severity(&self, severity: Severity) -> f64 {
        match severity {
            Severity::Warning => self.warning,
            Severity::Critical => self.critical,
        }
    }
}

/// Per-metric threshold table. Built once at startup and validated eagerly;
/// metrics absent from the table are never alerted on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BTreeMap<Metric, Threshold>", into = "BTreeMap<Metric, Threshold>")]
pub struct Thresholds(BTreeMap<Metric, Threshold>);

impl Thresholds {
    pub fn new(table: BTreeMap<Metric, Threshold>) -> Result<Self, ConfigError> {
        for (metric, t) in &table {
            if !t.warning.is_finite() || !t.critical.is_finite() || t.critical < t.warning {
                return Err(ConfigError::InvalidThreshold {
                    metric: *metric,
                    warning: t.warning,
                    critical: t.critical,
                });
            }
        }
        Ok(Self(table))
    }

    pub fn get(&self, metric: Metric) -> Option<&Threshold> {
        self.0.get(&metric)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self(BTreeMap::from([
            (Metric::Cpu, Threshold::new(70.0, 85.0)),
            (Metric::Memory, Threshold::new(75.0, 90.0)),
            (Metric::Requests, Threshold::new(300.0, 450.0)),
            (Metric::ResponseTime, Threshold::new(500.0, 700.0)),
        ]))
    }
}

impl TryFrom<BTreeMap<Metric, Threshold>> for Thresholds {
    type Error = ConfigError;

    fn try_from(table: BTreeMap<Metric, Threshold>) -> Result<Self, Self::Error> {
        Thresholds::new(table)
    }
}

impl From<Thresholds> for BTreeMap<Metric, Threshold> {
    fn from(t: Thresholds) -> Self {
        t.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Warning,
    Critical,
}

impl Severity {
    pub fn label(self) -> &'static str {
        match self {
            Severity::Warning => "WARNING",
            Severity::Critical => "CRITICAL",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    /// `<epoch millis>-<16 hex digits of randomness>`.
    pub id: String,
    pub metric: Metric,
    pub metric_name: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: Severity,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub level: LogLevel,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

/// Every frame the agent pushes: `{"event": "...", "data": ...}`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerEvent {
    MetricsUpdate(MetricReading),
    Alert(Alert),
    AlertHistory(Vec<Alert>),
    Thresholds(Thresholds),
    Log(LogEntry),
    UsersCount(usize),
}

impl ServerEvent {
    pub fn name(&self) -> &'static str {
        match self {
            ServerEvent::MetricsUpdate(_) => "metrics-update",
            ServerEvent::Alert(_) => "alert",
            ServerEvent::AlertHistory(_) => "alert-history",
            ServerEvent::Thresholds(_) => "thresholds",
            ServerEvent::Log(_) => "log",
            ServerEvent::UsersCount(_) => "users-count",
        }
    }
}

/// Frames a client may send.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(tag = "event", rename_all = "kebab-case")]
pub enum ClientEvent {
    SimulateSpike,
}

impl ClientEvent {
    /// Accepts the bare command text or the JSON envelope.
    pub fn parse(text: &str) -> Option<Self> {
        match text.trim() {
            "simulate-spike" => Some(ClientEvent::SimulateSpike),
            other => serde_json::from_str(other).ok(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn metrics_update_frame_uses_camel_case_keys() {
        let ev = ServerEvent::MetricsUpdate(MetricReading {
            cpu: 45.5,
            memory: 60.0,
            requests: 120,
            response_time: 180,
            timestamp: 1_700_000_000_000,
        });
        let v = serde_json::to_value(&ev).unwrap();
        assert_eq!(v["event"], "metrics-update");
        assert_eq!(v["data"]["responseTime"], 180);
        assert_eq!(v["data"]["cpu"], 45.5);
        assert_eq!(v["data"]["timestamp"], 1_700_000_000_000i64);
    }

    #[test]
    fn thresholds_serialize_as_metric_map() {
        let v = serde_json::to_value(ServerEvent::Thresholds(Thresholds::default())).unwrap();
        assert_eq!(v["event"], "thresholds");
        assert_eq!(v["data"]["cpu"], json!({"warning": 70.0, "critical": 85.0}));
        assert_eq!(v["data"]["responseTime"]["critical"], 700.0);
    }

    #[test]
    fn users_count_is_a_bare_integer() {
        let v = serde_json::to_value(ServerEvent::UsersCount(3)).unwrap();
        assert_eq!(v, json!({"event": "users-count", "data": 3}));
    }

    #[test]
    fn log_level_is_sent_as_type() {
        let entry = LogEntry {
            level: LogLevel::Warning,
            message: "Slow query detected: 1200ms".into(),
            timestamp: Utc::now(),
        };
        let v = serde_json::to_value(ServerEvent::Log(entry)).unwrap();
        assert_eq!(v["data"]["type"], "warning");
    }

    #[test]
    fn thresholds_reject_inverted_bounds() {
        let err = serde_json::from_str::<Thresholds>(r#"{"cpu":{"warning":90,"critical":80}}"#)
            .unwrap_err();
        assert!(err.to_string().contains("cpu"), "{err}");

        let ok: Thresholds =
            serde_json::from_str(r#"{"memory":{"warning":80,"critical":80}}"#).unwrap();
        assert!(ok.get(Metric::Memory).is_some());
        assert!(ok.get(Metric::Cpu).is_none());
    }

    #[test]
    fn client_event_accepts_text_and_json() {
        assert_eq!(
            ClientEvent::parse("simulate-spike"),
            Some(ClientEvent::SimulateSpike)
        );
        assert_eq!(
            ClientEvent::parse(r#"{"event":"simulate-spike"}"#),
            Some(ClientEvent::SimulateSpike)
        );
        assert_eq!(ClientEvent::parse("get_metrics"), None);
    }
}
