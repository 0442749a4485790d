//! Synthetic application log lines built from weighted templates.

// Template strings use {placeholder} syntax, not format! syntax
#![allow(clippy::literal_string_with_formatting_args)]

use chrono::Utc;
use rand::{Rng, SeedableRng};
use rand_pcg::Pcg64;

use crate::types::{LogEntry, LogLevel};

const INFO_TEMPLATES: &[&str] = &[
    "Request processed successfully from {ip}",
    "User {user} authenticated",
    "Cache hit for key: {key}",
    "Database connection established",
    "API endpoint {endpoint} called",
    "File {file} uploaded successfully",
    "Background job {job} completed",
    "Session created for user {user}",
];

const WARNING_TEMPLATES: &[&str] = &[
    "High memory usage detected: {value}%",
    "Slow query detected: {time}ms",
    "API rate limit approaching for {ip}",
    "Disk space running low: {value}% remaining",
    "Deprecated API endpoint called: {endpoint}",
    "Large payload detected: {size}MB",
    "Connection timeout retry attempt {attempt}",
];

const ERROR_TEMPLATES: &[&str] = &[
    "Database connection failed: {error}",
    "Authentication failed for user {user}",
    "File not found: {file}",
    "Invalid request payload from {ip}",
    "Service {service} unavailable",
    "Failed to process job {job}",
    "Permission denied for user {user}",
    "Unexpected error: {error}",
];

/// Fill tables, keyed by the plural of the placeholder name.
const CATEGORIES: &[(&str, &[&str])] = &[
    ("ips", &["192.168.1.100", "10.0.0.45", "172.16.0.23", "192.168.0.55"]),
    ("users", &["john_doe", "alice_smith", "bob_jones", "carol_white", "dave_brown"]),
    ("keys", &["user:1234", "session:abcd", "cache:xyz", "token:5678"]),
    ("endpoints", &["/api/users", "/api/products", "/api/orders", "/api/dashboard"]),
    ("files", &["report.pdf", "image.jpg", "data.csv", "config.json"]),
    ("jobs", &["email-sender", "data-sync", "backup", "cleanup"]),
    ("services", &["database", "cache", "storage", "auth-service"]),
    ("errors", &["Connection timeout", "Invalid credentials", "Resource not found", "Internal server error"]),
];

// cumulative weights: 70% info, 20% warning, 10% error
const INFO_CUTOFF: f64 = 0.7;
const WARNING_CUTOFF: f64 = 0.9;

fn templates(level: LogLevel) -> &'static [&'static str] {
    match level {
        LogLevel::Info => INFO_TEMPLATES,
        LogLevel::Warning => WARNING_TEMPLATES,
        LogLevel::Error => ERROR_TEMPLATES,
    }
}

fn category(key: &str) -> Option<&'static [&'static str]> {
    let plural = format!("{key}s");
    CATEGORIES
        .iter()
        .find(|(name, _)| *name == plural)
        .map(|(_, items)| *items)
}

pub struct LogSimulator<R = Pcg64> {
    rng: R,
}

impl LogSimulator<Pcg64> {
    pub fn from_seed(seed: u64) -> Self {
        Self::new(Pcg64::seed_from_u64(seed))
    }
}

impl<R: Rng> LogSimulator<R> {
    pub fn new(rng: R) -> Self {
        Self { rng }
    }

    pub fn generate_log(&mut self) -> LogEntry {
        let level = self.pick_level();
        let pool = templates(level);
        let template = pool[self.rng.random_range(0..pool.len())];
        LogEntry {
            level,
            message: self.fill_template(template),
            timestamp: Utc::now(),
        }
    }

    fn pick_level(&mut self) -> LogLevel {
        let r: f64 = self.rng.random();
        if r < INFO_CUTOFF {
            LogLevel::Info
        } else if r < WARNING_CUTOFF {
            LogLevel::Warning
        } else {
            LogLevel::Error
        }
    }

    /// Replace each `{word}` token. Tokens with no table and no generator are
    /// left as written.
    fn fill_template(&mut self, template: &str) -> String {
        let mut out = String::with_capacity(template.len() + 16);
        let mut rest = template;
        while let Some(open) = rest.find('{') {
            out.push_str(&rest[..open]);
            let after = &rest[open + 1..];
            let key_len = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            if key_len > 0 && after[key_len..].starts_with('}') {
                let key = &after[..key_len];
                match self.substitute(key) {
                    Some(v) => out.push_str(&v),
                    None => {
                        out.push('{');
                        out.push_str(key);
                        out.push('}');
                    }
                }
                rest = &after[key_len + 1..];
            } else {
                out.push('{');
                rest = after;
            }
        }
        out.push_str(rest);
        out
    }

    fn substitute(&mut self, key: &str) -> Option<String> {
        if let Some(items) = category(key) {
            return Some(items[self.rng.random_range(0..items.len())].to_string());
        }
        let v = match key {
            "value" => self.rng.random_range(0..100u32).to_string(),
            "time" => self.rng.random_range(100..5100u32).to_string(),
            "size" => format!("{:.2}", self.rng.random_range(0.0..50.0f64)),
            "attempt" => self.rng.random_range(1..=5u32).to_string(),
            _ => return None,
        };
        Some(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn level_distribution_matches_weights() {
        let mut sim = LogSimulator::from_seed(2024);
        let n = 10_000;
        let mut counts: HashMap<LogLevel, usize> = HashMap::new();
        for _ in 0..n {
            *counts.entry(sim.generate_log().level).or_default() += 1;
        }
        let frac = |l| counts.get(&l).copied().unwrap_or(0) as f64 / n as f64;
        assert!((frac(LogLevel::Error) - 0.10).abs() < 0.02, "error {}", frac(LogLevel::Error));
        assert!((frac(LogLevel::Warning) - 0.20).abs() < 0.02, "warning {}", frac(LogLevel::Warning));
        assert!((frac(LogLevel::Info) - 0.70).abs() < 0.02, "info {}", frac(LogLevel::Info));
    }

    #[test]
    fn generated_messages_have_no_known_placeholders_left() {
        let mut sim = LogSimulator::from_seed(8);
        for _ in 0..1_000 {
            let log = sim.generate_log();
            assert!(!log.message.contains('{'), "unfilled: {}", log.message);
        }
    }

    #[test]
    fn unknown_placeholder_is_left_verbatim() {
        let mut sim = LogSimulator::from_seed(1);
        assert_eq!(
            sim.fill_template("node {hostname} went away"),
            "node {hostname} went away"
        );
        assert_eq!(sim.fill_template("broken { brace"), "broken { brace");
        assert_eq!(sim.fill_template("{}"), "{}");
    }

    #[test]
    fn category_placeholders_use_table_values() {
        let mut sim = LogSimulator::from_seed(4);
        let msg = sim.fill_template("from {ip} by {user}");
        let ips = category("ip").unwrap();
        let users = category("user").unwrap();
        assert!(ips.iter().any(|ip| msg.contains(ip)), "{msg}");
        assert!(users.iter().any(|u| msg.ends_with(u)), "{msg}");
    }

    #[test]
    fn numeric_placeholders_stay_in_range() {
        let mut sim = LogSimulator::from_seed(6);
        for _ in 0..500 {
            let v: u32 = sim.fill_template("{value}").parse().unwrap();
            assert!(v < 100);
            let t: u32 = sim.fill_template("{time}").parse().unwrap();
            assert!((100..5100).contains(&t));
            let a: u32 = sim.fill_template("{attempt}").parse().unwrap();
            assert!((1..=5).contains(&a));
            let s = sim.fill_template("{size}");
            let (_, decimals) = s.split_once('.').unwrap();
            assert_eq!(decimals.len(), 2);
            let s: f64 = s.parse().unwrap();
            assert!((0.0..=50.0).contains(&s));
        }
    }
}
