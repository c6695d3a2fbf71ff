use tracing::info;

use crate::error::Result;
use crate::feed::parse_change_line;
use crate::output::{flatten_rows, unix_now_secs, ChangeLogger, RowSink};
use crate::state::{EventStore, IngestReport};

/// Lifetime counters for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PipelineStats {
    pub lines_read: u64,
    pub blank_lines: u64,
    pub malformed_lines: u64,
    pub events_merged: u64,
    pub markets_replaced: u64,
    pub fragments_skipped: u64,
    pub rows_flattened: u64,
    pub rows_emitted: u64,
}

impl PipelineStats {
    fn record_ingest(&mut self, report: IngestReport) {
        self.events_merged += report.events_merged as u64;
        self.markets_replaced += report.markets_replaced as u64;
        self.fragments_skipped += report.fragments_skipped as u64;
    }
}

/// One line in, zero or more changed rows out.
///
/// Each line is fully reconciled into the store, flattened and logged before
/// the call returns; the next line sees the result.
pub struct Pipeline<S> {
    store: EventStore,
    logger: ChangeLogger<S>,
    stats: PipelineStats,
    stats_every_lines: u64,
}

impl<S: RowSink> Pipeline<S> {
    pub fn new(sink: S, stats_every_lines: u64) -> Self {
        Self {
            store: EventStore::new(),
            logger: ChangeLogger::new(sink),
            stats: PipelineStats::default(),
            stats_every_lines,
        }
    }

    /// Process one raw input line. Returns the number of rows written.
    ///
    /// Blank and malformed lines are counted and skipped. Only sink failures
    /// are returned as errors.
    pub fn process_line(&mut self, raw: &str) -> Result<usize> {
        self.stats.lines_read += 1;
        let written = self.process_trimmed(raw.trim())?;
        self.maybe_log_progress();
        Ok(written)
    }

    /// Count a line that could not even be decoded as text.
    pub fn record_malformed(&mut self) {
        self.stats.lines_read += 1;
        self.stats.malformed_lines += 1;
        self.maybe_log_progress();
    }

    fn process_trimmed(&mut self, line: &str) -> Result<usize> {
        if line.is_empty() {
            self.stats.blank_lines += 1;
            return Ok(0);
        }
        let Some(payload) = parse_change_line(line) else {
            self.stats.malformed_lines += 1;
            return Ok(0);
        };

        let report = self.store.ingest(&payload);
        self.stats.record_ingest(report);

        let rows = flatten_rows(&self.store, unix_now_secs());
        self.stats.rows_flattened += rows.len() as u64;

        let written = self.logger.log_all(&rows)?;
        self.stats.rows_emitted += written as u64;
        if written > 0 {
            self.logger.flush()?;
        }
        Ok(written)
    }

    fn maybe_log_progress(&self) {
        if self.stats_every_lines > 0 && self.stats.lines_read % self.stats_every_lines == 0 {
            self.log_stats("[PROGRESS]");
        }
    }

    fn log_stats(&self, tag: &str) {
        let s = &self.stats;
        info!(
            lines = s.lines_read,
            blank = s.blank_lines,
            malformed = s.malformed_lines,
            events_merged = s.events_merged,
            markets_replaced = s.markets_replaced,
            skipped_fragments = s.fragments_skipped,
            rows_flattened = s.rows_flattened,
            rows_emitted = s.rows_emitted,
            events = self.store.event_count(),
            markets = self.store.market_count(),
            dedup_keys = self.logger.tracked_keys(),
            "{tag} lines: {} | malformed: {} | emitted: {} | events: {} | markets: {}",
            s.lines_read,
            s.malformed_lines,
            s.rows_emitted,
            self.store.event_count(),
            self.store.market_count(),
        );
    }

    /// Flush the sink and log the run summary.
    pub fn finish(&mut self) -> Result<()> {
        self.logger.flush()?;
        self.log_stats("[DONE]");
        Ok(())
    }

    pub fn stats(&self) -> PipelineStats {
        self.stats
    }

    #[cfg(test)]
    pub fn store(&self) -> &EventStore {
        &self.store
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        self.logger.sink()
    }
}
