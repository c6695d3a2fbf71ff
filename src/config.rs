use std::path::PathBuf;

use crate::error::{AppError, Result};

/// Heartbeat ping interval (seconds).
pub const WS_PING_INTERVAL_SECS: u64 = 30;

/// Reconnect backoff values in milliseconds. The last value repeats.
pub const RECONNECT_BACKOFF_MS: &[u64] = &[100, 200, 400, 800];

/// Malformed lines are logged for the first N occurrences, then once every
/// `PARSE_FAILURE_LOG_EVERY` occurrences.
pub const PARSE_FAILURE_LOG_FIRST: u64 = 10;
pub const PARSE_FAILURE_LOG_EVERY: u64 = 1000;

/// Max characters of a rejected line included in a log message.
pub const PARSE_FAILURE_SAMPLE_CHARS: usize = 500;

/// Longest accepted input line, newline excluded. Longer lines are
/// discarded and counted as malformed.
pub const MAX_LINE_BYTES: usize = 16 * 1024 * 1024;

pub const USAGE: &str = "Usage: changes <output_csv>  (or set OUTPUT_CSV)";

/// Where raw change lines come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputSource {
    Stdin,
    File(PathBuf),
    WebSocket {
        url: String,
        /// Text frame sent after every (re)connect, if set.
        subscribe: Option<String>,
    },
}

impl std::fmt::Display for InputSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InputSource::Stdin => write!(f, "stdin"),
            InputSource::File(path) => write!(f, "file {}", path.display()),
            InputSource::WebSocket { url, .. } => write!(f, "websocket {url}"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// CSV file rows are appended to (first CLI argument or OUTPUT_CSV)
    pub output_csv: PathBuf,
    pub input: InputSource,
    pub log_level: String,
    /// Emit a progress line every N input lines; 0 disables (STATS_EVERY_LINES)
    pub stats_every_lines: u64,
}

impl Config {
    /// Reads configuration from the environment. `output_arg` is the first
    /// positional CLI argument and wins over OUTPUT_CSV.
    pub fn from_env(output_arg: Option<String>) -> Result<Self> {
        Self::from_lookup(output_arg, |key| std::env::var(key).ok())
    }

    fn from_lookup<F>(output_arg: Option<String>, var: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let output_csv = output_arg
            .or_else(|| var("OUTPUT_CSV"))
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .ok_or_else(|| AppError::Config(USAGE.to_string()))?;

        let input = match (var("WS_URL"), var("INPUT_PATH")) {
            (Some(url), _) if !url.trim().is_empty() => InputSource::WebSocket {
                url,
                subscribe: var("WS_SUBSCRIBE").filter(|s| !s.is_empty()),
            },
            (_, Some(path)) if !path.trim().is_empty() => InputSource::File(PathBuf::from(path)),
            _ => InputSource::Stdin,
        };

        Ok(Self {
            output_csv,
            input,
            log_level: var("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
            stats_every_lines: var("STATS_EVERY_LINES")
                .unwrap_or_else(|| "10000".to_string())
                .parse::<u64>()
                .map_err(|_| {
                    AppError::Config("STATS_EVERY_LINES must be a non-negative integer".to_string())
                })?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn positional_argument_wins_over_env() {
        let cfg = Config::from_lookup(Some("a.csv".into()), lookup(&[("OUTPUT_CSV", "b.csv")])).unwrap();
        assert_eq!(cfg.output_csv, PathBuf::from("a.csv"));
        assert_eq!(cfg.input, InputSource::Stdin);
        assert_eq!(cfg.log_level, "info");
        assert_eq!(cfg.stats_every_lines, 10_000);
    }

    #[test]
    fn missing_output_is_config_error() {
        let err = Config::from_lookup(None, lookup(&[])).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn websocket_takes_precedence_over_file() {
        let cfg = Config::from_lookup(
            None,
            lookup(&[
                ("OUTPUT_CSV", "out.csv"),
                ("WS_URL", "wss://feed.example/changes"),
                ("WS_SUBSCRIBE", r#"{"op":"subscribe"}"#),
                ("INPUT_PATH", "in.ndjson"),
            ]),
        )
        .unwrap();
        assert_eq!(
            cfg.input,
            InputSource::WebSocket {
                url: "wss://feed.example/changes".into(),
                subscribe: Some(r#"{"op":"subscribe"}"#.into()),
            }
        );
    }

    #[test]
    fn input_path_selects_file_source() {
        let cfg = Config::from_lookup(
            Some("out.csv".into()),
            lookup(&[("INPUT_PATH", "in.ndjson"), ("STATS_EVERY_LINES", "0")]),
        )
        .unwrap();
        assert_eq!(cfg.input, InputSource::File(PathBuf::from("in.ndjson")));
        assert_eq!(cfg.stats_every_lines, 0);
    }

    #[test]
    fn bad_stats_interval_is_rejected() {
        let err = Config::from_lookup(
            Some("out.csv".into()),
            lookup(&[("STATS_EVERY_LINES", "often")]),
        )
        .unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
