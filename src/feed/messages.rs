use std::sync::atomic::{AtomicU64, Ordering};

use serde_json::Value;
use tracing::debug;

use crate::config::{PARSE_FAILURE_LOG_EVERY, PARSE_FAILURE_LOG_FIRST, PARSE_FAILURE_SAMPLE_CHARS};

static PARSE_FAILURES: AtomicU64 = AtomicU64::new(0);

/// Parse one trimmed, non-empty input line into a fragment.
///
/// Returns `None` for anything that is not valid JSON. Such lines are
/// dropped without emitting rows; a sample is logged at debug level.
pub fn parse_change_line(line: &str) -> Option<Value> {
    match serde_json::from_str::<Value>(line) {
        Ok(v) => Some(v),
        Err(e) => {
            let count = PARSE_FAILURES.fetch_add(1, Ordering::Relaxed) + 1;
            if count <= PARSE_FAILURE_LOG_FIRST || count % PARSE_FAILURE_LOG_EVERY == 0 {
                let sample: String = line.chars().take(PARSE_FAILURE_SAMPLE_CHARS).collect();
                debug!(count, error = %e, "[PARSE] skipping malformed line: {sample}");
            }
            None
        }
    }
}

/// Newline-delimited payloads carried by one transport frame. Blank pieces
/// are kept so the caller can count them like any other blank line.
pub fn frame_lines(frame: &str) -> impl Iterator<Item = &str> {
    frame.lines()
}
