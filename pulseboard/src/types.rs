//! Types that mirror the agent's JSON schema.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct MetricsUpdate {
    pub cpu: f64,
    pub memory: f64,
    pub requests: u64,
    pub response_time: u64,
    // epoch millis
    pub timestamp: i64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub id: String,
    pub metric: String,
    pub metric_name: String,
    pub value: f64,
    pub threshold: f64,
    pub severity: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Threshold {
    pub warning: f64,
    pub critical: f64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LogEntry {
    #[serde(rename = "type")]
    pub kind: String,
    pub message: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum Event {
    MetricsUpdate(MetricsUpdate),
    Alert(Alert),
    AlertHistory(Vec<Alert>),
    Thresholds(BTreeMap<String, Threshold>),
    Log(LogEntry),
    UsersCount(u64),
}

fn clock(ts: DateTime<Utc>) -> String {
    ts.format("%H:%M:%S").to_string()
}

impl fmt::Display for Event {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Event::MetricsUpdate(m) => {
                let at = DateTime::<Utc>::from_timestamp_millis(m.timestamp)
                    .map(clock)
                    .unwrap_or_else(|| "--:--:--".into());
                write!(
                    f,
                    "[{at}] metrics  cpu={:.2}% mem={:.2}% req={}/s rt={}ms",
                    m.cpu, m.memory, m.requests, m.response_time
                )
            }
            Event::Alert(a) => write!(f, "[{}] alert    {}", clock(a.timestamp), a.message),
            Event::AlertHistory(h) => write!(f, "alert history: {} recent", h.len()),
            Event::Thresholds(t) => {
                let parts: Vec<String> = t
                    .iter()
                    .map(|(k, v)| format!("{k} {}/{}", v.warning, v.critical))
                    .collect();
                write!(f, "thresholds: {}", parts.join(", "))
            }
            Event::Log(l) => write!(
                f,
                "[{}] {:<8} {}",
                clock(l.timestamp),
                l.kind,
                l.message
            ),
            Event::UsersCount(n) => write!(f, "users online: {n}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_agent_frames() {
        let ev: Event = serde_json::from_str(
            r#"{"event":"metrics-update","data":{"cpu":45.37,"memory":60.1,"requests":103,"responseTime":151,"timestamp":0}}"#,
        )
        .unwrap();
        assert_eq!(
            ev.to_string(),
            "[00:00:00] metrics  cpu=45.37% mem=60.10% req=103/s rt=151ms"
        );

        let ev: Event = serde_json::from_str(r#"{"event":"users-count","data":3}"#).unwrap();
        assert_eq!(ev.to_string(), "users online: 3");

        let ev: Event = serde_json::from_str(
            r#"{"event":"thresholds","data":{"cpu":{"warning":70.0,"critical":85.0},"memory":{"warning":75.0,"critical":90.0}}}"#,
        )
        .unwrap();
        assert_eq!(ev.to_string(), "thresholds: cpu 70/85, memory 75/90");
    }

    #[test]
    fn parses_alert_and_log() {
        let ev: Event = serde_json::from_str(
            r#"{"event":"alert","data":{"id":"1704104430123-9f86d081884c7d65","metric":"cpu","metricName":"CPU Usage","value":85.0,"threshold":85.0,"severity":"critical","message":"CRITICAL: CPU Usage at 85 (threshold: 85)","timestamp":"2024-01-01T10:20:30.123Z"}}"#,
        )
        .unwrap();
        assert_eq!(
            ev.to_string(),
            "[10:20:30] alert    CRITICAL: CPU Usage at 85 (threshold: 85)"
        );

        let ev: Event = serde_json::from_str(
            r#"{"event":"log","data":{"type":"error","message":"File not found: data.csv","timestamp":"2024-01-01T10:20:31Z"}}"#,
        )
        .unwrap();
        assert_eq!(ev.to_string(), "[10:20:31] error    File not found: data.csv");
    }

    #[test]
    fn unknown_event_is_rejected() {
        assert!(serde_json::from_str::<Event>(r#"{"event":"get_metrics","data":null}"#).is_err());
    }
}
