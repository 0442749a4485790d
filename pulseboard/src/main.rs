//! Entry point for the pulseboard tail client. Parses args and prints the agent's events.

use pulseboard::ws::{connect, next_event, send_spike};
use std::env;

const DEFAULT_URL: &str = "ws://127.0.0.1:3000/ws";

struct ParsedArgs {
    url: String,
    spike: bool,
    count: Option<usize>,
}

fn usage(prog: &str) -> String {
    format!("Usage: {prog} [--spike] [--count N|-n N] [ws://HOST:PORT/ws]")
}

fn parse_args<I: IntoIterator<Item = String>>(args: I) -> Result<ParsedArgs, String> {
    let mut it = args.into_iter();
    let prog = it.next().unwrap_or_else(|| "pulseboard".into());
    let mut url: Option<String> = None;
    let mut spike = false; // --spike
    let mut count: Option<usize> = None;

    while let Some(arg) = it.next() {
        match arg.as_str() {
            "-h" | "--help" => return Err(usage(&prog)),
            "--spike" => spike = true,
            "--count" | "-n" => {
                count = it.next().and_then(|v| v.parse().ok());
                if count.is_none() {
                    return Err(usage(&prog));
                }
            }
            _ if arg.starts_with("--count=") => {
                count = arg.split_once('=').and_then(|(_, v)| v.parse().ok());
                if count.is_none() {
                    return Err(usage(&prog));
                }
            }
            _ => {
                if url.is_none() {
                    url = Some(arg);
                } else {
                    return Err(format!("Unexpected argument. {}", usage(&prog)));
                }
            }
        }
    }
    Ok(ParsedArgs {
        url: url.unwrap_or_else(|| DEFAULT_URL.into()),
        spike,
        count,
    })
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let parsed = match parse_args(env::args()) {
        Ok(v) => v,
        Err(msg) => {
            eprintln!("{msg}");
            return Ok(());
        }
    };

    let mut ws = connect(&parsed.url).await?;
    if parsed.spike {
        send_spike(&mut ws).await?;
        eprintln!("spike requested");
    }

    let tail = async {
        let mut seen = 0usize;
        while let Some(ev) = next_event(&mut ws).await {
            println!("{ev}");
            seen += 1;
            if parsed.count.is_some_and(|n| seen >= n) {
                break;
            }
        }
    };
    tokio::select! {
        _ = tail => {}
        _ = tokio::signal::ctrl_c() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(v: &[&str]) -> Vec<String> {
        std::iter::once("pulseboard")
            .chain(v.iter().copied())
            .map(String::from)
            .collect()
    }

    #[test]
    fn defaults_to_local_agent() {
        let p = parse_args(args(&[])).unwrap();
        assert_eq!(p.url, DEFAULT_URL);
        assert!(!p.spike);
        assert_eq!(p.count, None);
    }

    #[test]
    fn flags_and_url() {
        let p = parse_args(args(&["--spike", "-n", "5", "ws://box:9000/ws"])).unwrap();
        assert!(p.spike);
        assert_eq!(p.count, Some(5));
        assert_eq!(p.url, "ws://box:9000/ws");
        assert_eq!(parse_args(args(&["--count=2"])).unwrap().count, Some(2));
    }

    #[test]
    fn rejects_extra_or_malformed() {
        assert!(parse_args(args(&["ws://a/ws", "ws://b/ws"])).is_err());
        assert!(parse_args(args(&["--count", "many"])).is_err());
        assert!(parse_args(args(&["--help"])).is_err());
    }
}
