use serde_json::Value;
use tracing::debug;

use crate::state::event_store::{event_id_of, EventStore};

const EVENTS_KEY: &str = "events";
const EVENT_KEY: &str = "event";

/// What one payload changed in the store.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct IngestReport {
    pub events_merged: usize,
    pub markets_replaced: usize,
    /// Event or market fragments that could not be attributed.
    pub fragments_skipped: usize,
}

impl IngestReport {
    pub fn absorb(&mut self, other: IngestReport) {
        self.events_merged += other.events_merged;
        self.markets_replaced += other.markets_replaced;
        self.fragments_skipped += other.fragments_skipped;
    }
}

impl EventStore {
    /// Reconcile one parsed payload into the store.
    ///
    /// A payload may at the same time be an event record, carry a nested
    /// `event` record, carry an `events` list, and carry root-level
    /// `markets`; each event in `events` may carry its own `markets`. Every
    /// shape that applies is handled. Fragments of the wrong type are treated
    /// as absent.
    pub fn ingest(&mut self, payload: &Value) -> IngestReport {
        let mut report = IngestReport::default();
        if !payload.is_object() {
            return report;
        }

        // The payload itself; absence of an id here just means it is a
        // container, not an unattributable fragment.
        if self.merge_event(payload).is_some() {
            report.events_merged += 1;
        }

        if let Some(event) = payload.get(EVENT_KEY).filter(|v| !v.is_null()) {
            report.absorb(self.ingest_event_record(event));
        }

        if let Some(events) = payload.get(EVENTS_KEY).and_then(Value::as_array) {
            for event in events {
                report.absorb(self.ingest_event_record(event));
            }
        }

        let root_hint = event_id_of(payload);
        let merged = self.merge_markets(payload, root_hint.as_deref());
        report.markets_replaced += merged.replaced;
        report.fragments_skipped += merged.skipped;

        if report.fragments_skipped > 0 {
            debug!(skipped = report.fragments_skipped, "[INGEST] unattributable fragments dropped");
        }
        report
    }

    /// One nested event record: its attributes, then its own markets with
    /// the event's id as the attribution hint.
    fn ingest_event_record(&mut self, event: &Value) -> IngestReport {
        let mut report = IngestReport::default();
        if !event.is_object() {
            report.fragments_skipped += 1;
            return report;
        }

        let event_id = self.merge_event(event);
        match event_id {
            Some(_) => report.events_merged += 1,
            None => report.fragments_skipped += 1,
        }

        let merged = self.merge_markets(event, event_id.as_deref());
        report.markets_replaced += merged.replaced;
        report.fragments_skipped += merged.skipped;
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{EventField, MarketKey};
    use serde_json::json;

    #[test]
    fn payload_that_is_an_event_with_markets() {
        let mut store = EventStore::new();
        let report = store.ingest(&json!({
            "eventId": "42",
            "markets": [{"id": "7", "marketSpecifier": "", "outcomes": [{"name": "Home", "odds": "1.80"}]}]
        }));

        assert_eq!(report, IngestReport { events_merged: 1, markets_replaced: 1, fragments_skipped: 0 });
        assert!(store.event("42").is_some());
        let snap = store.market("42", &MarketKey::new("7", "")).unwrap();
        assert_eq!(snap.outcomes.len(), 1);
    }

    #[test]
    fn events_list_with_nested_markets() {
        let mut store = EventStore::new();
        let report = store.ingest(&json!({
            "events": [
                {"id": "1", "category": "Tennis", "markets": [{"id": "a", "outcomes": []}]},
                {"eventId": "2", "markets": [{"id": "b"}, {"id": "c"}]}
            ]
        }));

        assert_eq!(report.events_merged, 2);
        assert_eq!(report.markets_replaced, 3);
        assert_eq!(store.event("1").unwrap().get(EventField::Category), Some("Tennis"));
        assert!(store.market("1", &MarketKey::new("a", "")).is_some());
        assert!(store.market("2", &MarketKey::new("c", "")).is_some());
    }

    #[test]
    fn all_branches_apply_to_one_payload() {
        let mut store = EventStore::new();
        let report = store.ingest(&json!({
            "eventId": "1",
            "source": "live",
            "event": {"id": "2", "category": "Basketball"},
            "events": [{"id": "3", "markets": [{"id": "m3"}]}],
            "markets": [{"id": "m1"}, {"id": "m9", "eventId": "9"}]
        }));

        assert_eq!(report.events_merged, 3);
        assert_eq!(report.markets_replaced, 3);
        assert_eq!(store.event("1").unwrap().get(EventField::Source), Some("live"));
        assert_eq!(store.event("2").unwrap().get(EventField::Category), Some("Basketball"));
        assert!(store.event("3").is_some());
        assert!(store.market("1", &MarketKey::new("m1", "")).is_some());
        assert!(store.market("3", &MarketKey::new("m3", "")).is_some());
        assert!(store.market("9", &MarketKey::new("m9", "")).is_some());
    }

    #[test]
    fn top_level_scores_in_events_list_are_ignored() {
        let mut store = EventStore::new();
        store.ingest(&json!({"events": [{"id": "5", "homeScore": "1"}]}));
        let ev = store.event("5").unwrap();
        assert_eq!(ev.get(EventField::HomeScore), None);
    }

    #[test]
    fn wrong_types_are_tolerated() {
        let mut store = EventStore::new();
        assert_eq!(store.ingest(&json!([1, 2, 3])), IngestReport::default());
        assert_eq!(store.ingest(&json!("text")), IngestReport::default());

        let report = store.ingest(&json!({
            "events": [null, 5, {"category": "x"}, {"id": "1", "markets": "nope"}],
            "event": "nope",
            "markets": {"id": "7"}
        }));
        assert_eq!(report.events_merged, 1);
        assert_eq!(report.markets_replaced, 0);
        // null, 5, the id-less record and the string `event`
        assert_eq!(report.fragments_skipped, 4);
        assert_eq!(store.event_count(), 1);
        assert_eq!(store.market_count(), 0);
    }

    #[test]
    fn root_markets_without_any_event_id_are_skipped() {
        let mut store = EventStore::new();
        let report = store.ingest(&json!({"markets": [{"id": "7", "outcomes": []}]}));
        assert_eq!(report.fragments_skipped, 1);
        assert_eq!(store.market_count(), 0);
    }

    #[test]
    fn root_market_hint_prefers_event_id_then_id() {
        let mut store = EventStore::new();
        store.ingest(&json!({"id": "5", "markets": [{"id": "7"}]}));
        assert!(store.market("5", &MarketKey::new("7", "")).is_some());

        store.ingest(&json!({"eventId": "6", "id": "5", "markets": [{"id": "8"}]}));
        assert!(store.market("6", &MarketKey::new("8", "")).is_some());
        assert!(store.market("5", &MarketKey::new("8", "")).is_none());
    }

    #[test]
    fn ingesting_the_same_payload_twice_is_idempotent() {
        let payload = json!({
            "events": [{
                "id": "1",
                "eventClockStatus": {"homeScore": 1, "eventClock": {"eventTime": "12:00"}},
                "markets": [{"id": "7", "outcomes": [{"name": "Home", "odds": "1.5"}]}]
            }]
        });
        let mut store = EventStore::new();
        store.ingest(&payload);
        let event = store.event("1").cloned();
        let market = store.market("1", &MarketKey::new("7", "")).cloned();

        store.ingest(&payload);
        assert_eq!(store.event("1").cloned(), event);
        assert_eq!(store.market("1", &MarketKey::new("7", "")).cloned(), market);
        assert_eq!(store.event_count(), 1);
        assert_eq!(store.market_count(), 1);
    }
}
