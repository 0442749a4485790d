//! Agent configuration: command-line flags with environment fallbacks.
//!
//! | flag                        | env                              | default      |
//! |-----------------------------|----------------------------------|--------------|
//! | `--port N`, `-p N`          | `PORT`                           | `3000`       |
//! | `--static-dir DIR`          | `PULSEBOARD_STATIC_DIR`          | none         |
//! | `--thresholds FILE`         | `PULSEBOARD_THRESHOLDS`          | built-in     |
//! | `--seed N`                  | `PULSEBOARD_SEED`                | random       |
//! | `--metrics-interval-ms N`   | `PULSEBOARD_METRICS_INTERVAL_MS` | `2000`       |
//! | `--log-min-ms N`            | `PULSEBOARD_LOG_MIN_MS`          | `1000`       |
//! | `--log-max-ms N`            | `PULSEBOARD_LOG_MAX_MS`          | `3000`       |

use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::scheduler::SchedulerConfig;
use crate::types::Thresholds;

pub const DEFAULT_PORT: u16 = 3000;

pub const USAGE: &str = "Usage: pulseboard_agent [--port PORT|-p PORT] [--static-dir DIR] \
[--thresholds FILE] [--seed N] [--metrics-interval-ms N] [--log-min-ms N] [--log-max-ms N]";

#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub port: u16,
    pub static_dir: Option<PathBuf>,
    pub thresholds: Thresholds,
    pub seed: u64,
    pub scheduler: SchedulerConfig,
}

/// Result of argument parsing: either run, or print usage and exit.
#[derive(Debug)]
pub enum Command {
    Run(Box<AgentConfig>),
    Help,
}

#[derive(Debug, Default)]
struct RawArgs {
    port: Option<String>,
    static_dir: Option<String>,
    thresholds: Option<String>,
    seed: Option<String>,
    metrics_interval_ms: Option<String>,
    log_min_ms: Option<String>,
    log_max_ms: Option<String>,
}

impl AgentConfig {
    /// Parse process arguments (program name first) and the environment.
    pub fn from_args<I: IntoIterator<Item = String>>(args: I) -> Result<Command, ConfigError> {
        Self::from_args_with_env(args, |k| std::env::var(k).ok())
    }

    pub fn from_args_with_env<I, E>(args: I, env: E) -> Result<Command, ConfigError>
    where
        I: IntoIterator<Item = String>,
        E: Fn(&str) -> Option<String>,
    {
        let mut raw = RawArgs::default();
        let mut it = args.into_iter();
        let _ = it.next(); // program name
        while let Some(a) = it.next() {
            let (flag, inline) = match a.split_once('=') {
                Some((f, v)) if f.starts_with("--") => (f.to_string(), Some(v.to_string())),
                _ => (a.clone(), None),
            };
            let slot = match flag.as_str() {
                "-h" | "--help" => return Ok(Command::Help),
                "--port" | "-p" => &mut raw.port,
                "--static-dir" => &mut raw.static_dir,
                "--thresholds" => &mut raw.thresholds,
                "--seed" => &mut raw.seed,
                "--metrics-interval-ms" => &mut raw.metrics_interval_ms,
                "--log-min-ms" => &mut raw.log_min_ms,
                "--log-max-ms" => &mut raw.log_max_ms,
                _ => {
                    return Err(ConfigError::InvalidArgument {
                        flag: a,
                        reason: "unknown argument".into(),
                    })
                }
            };
            let value = match inline.or_else(|| it.next()) {
                Some(v) => v,
                None => {
                    return Err(ConfigError::InvalidArgument {
                        flag,
                        reason: "missing value".into(),
                    })
                }
            };
            *slot = Some(value);
        }

        let pick = |cli: Option<String>, key: &str| cli.or_else(|| env(key));

        let port = parse_or(pick(raw.port, "PORT"), "--port", DEFAULT_PORT)?;
        let static_dir = pick(raw.static_dir, "PULSEBOARD_STATIC_DIR").map(PathBuf::from);
        let thresholds = match pick(raw.thresholds, "PULSEBOARD_THRESHOLDS") {
            Some(path) => load_thresholds(Path::new(&path))?,
            None => Thresholds::default(),
        };
        let seed: u64 = match pick(raw.seed, "PULSEBOARD_SEED") {
            Some(s) => parse_value(&s, "--seed")?,
            None => rand::random(),
        };

        let defaults = SchedulerConfig::default();
        let metrics_ms: u64 = parse_or(
            pick(raw.metrics_interval_ms, "PULSEBOARD_METRICS_INTERVAL_MS"),
            "--metrics-interval-ms",
            defaults.metrics_period.as_millis() as u64,
        )?;
        let log_min_ms: u64 = parse_or(
            pick(raw.log_min_ms, "PULSEBOARD_LOG_MIN_MS"),
            "--log-min-ms",
            defaults.log_delay_min.as_millis() as u64,
        )?;
        let log_max_ms: u64 = parse_or(
            pick(raw.log_max_ms, "PULSEBOARD_LOG_MAX_MS"),
            "--log-max-ms",
            defaults.log_delay_max.as_millis() as u64,
        )?;
        if metrics_ms == 0 {
            return Err(ConfigError::InvalidArgument {
                flag: "--metrics-interval-ms".into(),
                reason: "must be greater than zero".into(),
            });
        }
        if log_min_ms >= log_max_ms {
            return Err(ConfigError::InvalidArgument {
                flag: "--log-min-ms".into(),
                reason: format!("{log_min_ms} must be less than --log-max-ms {log_max_ms}"),
            });
        }

        Ok(Command::Run(Box::new(AgentConfig {
            port,
            static_dir,
            thresholds,
            seed,
            scheduler: SchedulerConfig {
                metrics_period: Duration::from_millis(metrics_ms),
                log_delay_min: Duration::from_millis(log_min_ms),
                log_delay_max: Duration::from_millis(log_max_ms),
            },
        })))
    }
}

/// Read a JSON thresholds table; invalid bounds are rejected here, not mid-stream.
pub fn load_thresholds(path: &Path) -> Result<Thresholds, ConfigError> {
    let data = fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&data).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })
}

fn parse_value<T: FromStr>(s: &str, flag: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    s.trim().parse().map_err(|e: T::Err| ConfigError::InvalidArgument {
        flag: flag.to_string(),
        reason: format!("{s:?}: {e}"),
    })
}

fn parse_or<T: FromStr>(s: Option<String>, flag: &str, default: T) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match s {
        Some(s) => parse_value(&s, flag),
        None => Ok(default),
    }
}
