use std::collections::HashMap;

use tracing::{enabled, trace, Level};

use crate::error::Result;
use crate::types::{DedupKey, Row};

/// Append-only destination for emitted rows.
pub trait RowSink {
    fn append(&mut self, row: &Row) -> Result<()>;

    fn flush(&mut self) -> Result<()> {
        Ok(())
    }
}

impl RowSink for Vec<Row> {
    fn append(&mut self, row: &Row) -> Result<()> {
        self.push(row.clone());
        Ok(())
    }
}

/// Forwards a row to the sink only when its price differs from the last
/// price emitted for the same [`DedupKey`].
///
/// Per key: unseen → seen(price). Only `odds` is compared, as an exact
/// string; scores, clock, line and handicap may change without emission.
/// Keys live for the lifetime of the logger.
pub struct ChangeLogger<S> {
    sink: S,
    last_logged: HashMap<DedupKey, String>,
}

impl<S: RowSink> ChangeLogger<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            last_logged: HashMap::new(),
        }
    }

    /// Emit `row` if its price changed. Returns whether it was written.
    ///
    /// The key's price is only updated after the sink accepted the row.
    pub fn log(&mut self, row: &Row) -> Result<bool> {
        let key = row.dedup_key();
        if self.last_logged.get(&key).map(String::as_str) == Some(row.odds.as_str()) {
            return Ok(false);
        }

        self.sink.append(row)?;
        if enabled!(Level::TRACE) {
            if let Ok(json) = serde_json::to_string(row) {
                trace!(row = %json, "[EMIT]");
            }
        }
        self.last_logged.insert(key, row.odds.clone());
        Ok(true)
    }

    /// Log every row of one flatten pass. Returns the number written.
    pub fn log_all(&mut self, rows: &[Row]) -> Result<usize> {
        let mut written = 0;
        for row in rows {
            if self.log(row)? {
                written += 1;
            }
        }
        Ok(written)
    }

    pub fn flush(&mut self) -> Result<()> {
        self.sink.flush()
    }

    #[cfg(test)]
    pub fn last_price(&self, key: &DedupKey) -> Option<&str> {
        self.last_logged.get(key).map(String::as_str)
    }

    pub fn tracked_keys(&self) -> usize {
        self.last_logged.len()
    }

    #[cfg(test)]
    pub fn sink(&self) -> &S {
        &self.sink
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use proptest::prelude::*;

    fn row(event_id: &str, market: &str, leg: &str, odds: &str) -> Row {
        Row {
            event_id: event_id.into(),
            market: market.into(),
            leg: leg.into(),
            odds: odds.into(),
            ..Row::default()
        }
    }

    #[test]
    fn first_sighting_is_emitted() {
        let mut logger = ChangeLogger::new(Vec::new());
        assert!(logger.log(&row("42", "", "Home", "1.80")).unwrap());
        assert_eq!(logger.sink().len(), 1);
        assert_eq!(logger.last_price(&row("42", "", "Home", "").dedup_key()), Some("1.80"));
    }

    #[test]
    fn unchanged_price_is_suppressed() {
        let mut logger = ChangeLogger::new(Vec::new());
        logger.log(&row("42", "", "Home", "1.80")).unwrap();
        assert!(!logger.log(&row("42", "", "Home", "1.80")).unwrap());
        assert_eq!(logger.sink().len(), 1);
    }

    #[test]
    fn price_change_is_emitted_once() {
        let mut logger = ChangeLogger::new(Vec::new());
        logger.log(&row("42", "", "Home", "1.80")).unwrap();
        assert!(logger.log(&row("42", "", "Home", "1.95")).unwrap());
        assert!(!logger.log(&row("42", "", "Home", "1.95")).unwrap());
        assert_eq!(logger.sink().len(), 2);
        assert_eq!(logger.sink()[1].odds, "1.95");
    }

    #[test]
    fn comparison_is_exact_string_equality() {
        let mut logger = ChangeLogger::new(Vec::new());
        logger.log(&row("1", "M", "A", "1.8")).unwrap();
        assert!(logger.log(&row("1", "M", "A", "1.80")).unwrap());
    }

    #[test]
    fn non_price_changes_do_not_emit() {
        let mut logger = ChangeLogger::new(Vec::new());
        let mut r = row("1", "M", "A", "2.0");
        logger.log(&r).unwrap();

        r.home_score = "3".into();
        r.line = "1.5".into();
        r.handicap = "-1".into();
        r.clock_event_time = "88:00".into();
        r.current_timestamp = "1800000000".into();
        assert!(!logger.log(&r).unwrap());
    }

    #[test]
    fn keys_are_independent() {
        let mut logger = ChangeLogger::new(Vec::new());
        let written = logger
            .log_all(&[
                row("1", "M", "A", "2.0"),
                row("1", "M", "B", "2.0"),
                row("1", "N", "A", "2.0"),
                row("2", "M", "A", "2.0"),
            ])
            .unwrap();
        assert_eq!(written, 4);
        assert_eq!(logger.tracked_keys(), 4);
    }

    #[test]
    fn outcomes_sharing_a_label_share_a_key() {
        let mut logger = ChangeLogger::new(Vec::new());
        let written = logger
            .log_all(&[row("1", "M", "Draw", "3.0"), row("1", "M", "Draw", "3.4")])
            .unwrap();
        assert_eq!(written, 2);
        assert_eq!(logger.tracked_keys(), 1);
    }

    struct FailingSink;

    impl RowSink for FailingSink {
        fn append(&mut self, _row: &Row) -> Result<()> {
            Err(AppError::Io(std::io::Error::other("disk full")))
        }
    }

    #[test]
    fn failed_write_leaves_key_unseen() {
        let mut logger = ChangeLogger::new(FailingSink);
        assert!(logger.log(&row("1", "M", "A", "2.0")).is_err());
        assert_eq!(logger.last_price(&row("1", "M", "A", "").dedup_key()), None);
        assert_eq!(logger.tracked_keys(), 0);
    }

    proptest! {
        /// Emissions for one key equal the number of positions where the
        /// price differs from the previous one (the first always counts).
        #[test]
        fn emits_exactly_on_price_changes(prices in prop::collection::vec(
            prop::sample::select(vec!["1.50", "1.55", "1.60", "2.00"]), 1..200)
        ) {
            let mut logger = ChangeLogger::new(Vec::new());
            for p in &prices {
                logger.log(&row("1", "M", "A", p)).unwrap();
            }
            let expected = 1 + prices.windows(2).filter(|w| w[0] != w[1]).count();
            prop_assert_eq!(logger.sink().len(), expected);
            let emitted: Vec<&str> = logger.sink().iter().map(|r| r.odds.as_str()).collect();
            prop_assert!(emitted.windows(2).all(|w| w[0] != w[1]));
        }
    }
}
