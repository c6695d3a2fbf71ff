use indexmap::IndexMap;
use serde_json::Value;

use crate::feed::first_present;
use crate::types::{EventAttributes, EventField, MarketKey, MarketSnapshot};

// ---------------------------------------------------------------------------
// Feed key tables
// ---------------------------------------------------------------------------

pub const EVENT_ID_KEYS: &[&str] = &["eventId", "id"];

/// Attributes read from the top level of an event record.
const EVENT_FIELDS: &[(EventField, &[&str])] = &[
    (EventField::Source, &["source", "src"]),
    (EventField::EventPath, &["eventPath"]),
    (EventField::StartTime, &["startTime"]),
    (EventField::ScheduledTimeUtc, &["scheduledTimeUtc"]),
    (EventField::EventDate, &["eventDate"]),
    (EventField::TournamentId, &["tournamentId"]),
    (EventField::TournamentPath, &["tournamentPath"]),
    (EventField::Category, &["category"]),
    (EventField::CategoryId, &["categoryId"]),
];

/// Live scores and status. Only ever read from this block; the same keys
/// elsewhere in a payload are ignored.
const CLOCK_STATUS_KEY: &str = "eventClockStatus";
const CLOCK_STATUS_FIELDS: &[(EventField, &[&str])] = &[
    (EventField::HomeScore, &["homeScore"]),
    (EventField::AwayScore, &["awayScore"]),
    (EventField::TotalScore, &["totalScore"]),
    (EventField::MatchStatus, &["matchStatus"]),
    (EventField::TotalElapsedTime, &["totalElapsedTime"]),
    (EventField::ClockLastUpdate, &["lastUpdate"]),
];

/// Nested inside the clock-status block.
const EVENT_CLOCK_KEY: &str = "eventClock";
const EVENT_CLOCK_FIELDS: &[(EventField, &[&str])] = &[
    (EventField::ClockEventTime, &["eventTime"]),
    (EventField::ClockRemainingTime, &["remainingTime"]),
    (EventField::ClockRemainingTimeInPeriod, &["remainingTimeInPeriod"]),
];

const MARKETS_KEY: &str = "markets";
const MARKET_ID_KEYS: &[&str] = &["id", "marketId"];
const MARKET_EVENT_ID_KEYS: &[&str] = &["eventId"];
const MARKET_SPECIFIER_KEYS: &[&str] = &["marketSpecifier"];
const MARKET_NAME_KEYS: &[&str] = &["marketTemplatePath"];
const OUTCOMES_KEY: &str = "outcomes";

/// Event id of a record, from `eventId` then `id`.
pub fn event_id_of(node: &Value) -> Option<String> {
    first_present(node, EVENT_ID_KEYS)
}

fn collect_fields(node: &Value, table: &[(EventField, &[&str])], into: &mut EventAttributes) {
    for &(field, keys) in table {
        if let Some(value) = first_present(node, keys) {
            into.set(field, value);
        }
    }
}

/// Attribute update carried by one event record. Fields absent, null or
/// empty in the record are absent from the result.
pub fn event_update(node: &Value) -> EventAttributes {
    let mut update = EventAttributes::default();
    collect_fields(node, EVENT_FIELDS, &mut update);

    if let Some(status) = node.get(CLOCK_STATUS_KEY).filter(|v| v.is_object()) {
        collect_fields(status, CLOCK_STATUS_FIELDS, &mut update);
        if let Some(clock) = status.get(EVENT_CLOCK_KEY).filter(|v| v.is_object()) {
            collect_fields(clock, EVENT_CLOCK_FIELDS, &mut update);
        }
    }
    update
}

/// Result of one `merge_markets` call.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MarketMerge {
    /// Snapshots written (new or replaced).
    pub replaced: usize,
    /// Market elements dropped: not an object, no market id, or no event id.
    pub skipped: usize,
}

// ---------------------------------------------------------------------------
// EventStore
// ---------------------------------------------------------------------------

/// Latest merged state for every event, and the latest snapshot per market
/// key within each event.
///
/// Events and markets follow different update rules: event attributes are
/// merged field by field ([`EventStore::merge_event`]), market snapshots are
/// replaced wholesale ([`EventStore::merge_markets`]).
///
/// Both maps keep first-insertion order, so flattening walks events and
/// markets in the order the feed introduced them. Replacing a snapshot keeps
/// its original position.
///
/// Owned by the single processing loop; no interior locking.
#[derive(Debug, Default)]
pub struct EventStore {
    /// event_id → merged attributes
    events: IndexMap<String, EventAttributes>,
    /// event_id → market key → latest snapshot
    markets: IndexMap<String, IndexMap<MarketKey, MarketSnapshot>>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge the attributes of one event record into the store.
    ///
    /// Returns the event id, or `None` (store untouched) when `node` is not
    /// an object or carries no event id.
    pub fn merge_event(&mut self, node: &Value) -> Option<String> {
        if !node.is_object() {
            return None;
        }
        let event_id = event_id_of(node)?;
        let update = event_update(node);
        self.events.entry(event_id.clone()).or_default().merge(update);
        Some(event_id)
    }

    /// Replace the snapshot of every attributable market in
    /// `container["markets"]`.
    ///
    /// A market's owning event comes from its own `eventId`, else from
    /// `event_hint`. Markets that yield no market id or no event id are
    /// skipped individually.
    pub fn merge_markets(&mut self, container: &Value, event_hint: Option<&str>) -> MarketMerge {
        let mut result = MarketMerge::default();
        let Some(markets) = container.get(MARKETS_KEY).and_then(Value::as_array) else {
            return result;
        };

        for market in markets {
            if !market.is_object() {
                result.skipped += 1;
                continue;
            }
            let Some(market_id) = first_present(market, MARKET_ID_KEYS) else {
                result.skipped += 1;
                continue;
            };
            let event_id = first_present(market, MARKET_EVENT_ID_KEYS)
                .or_else(|| event_hint.filter(|h| !h.is_empty()).map(str::to_string));
            let Some(event_id) = event_id else {
                result.skipped += 1;
                continue;
            };

            let specifier = first_present(market, MARKET_SPECIFIER_KEYS).unwrap_or_default();
            let snapshot = MarketSnapshot {
                market_template_path: first_present(market, MARKET_NAME_KEYS),
                outcomes: collect_outcomes(market),
                record: market.clone(),
            };
            self.replace_market(event_id, MarketKey::new(market_id, specifier), snapshot);
            result.replaced += 1;
        }
        result
    }

    /// Overwrite the snapshot stored for `key` under `event_id`.
    pub fn replace_market(&mut self, event_id: String, key: MarketKey, snapshot: MarketSnapshot) {
        self.markets.entry(event_id).or_default().insert(key, snapshot);
    }

    /// Events in the order they were first seen.
    pub fn events(&self) -> impl Iterator<Item = (&str, &EventAttributes)> {
        self.events.iter().map(|(id, attrs)| (id.as_str(), attrs))
    }

    #[cfg(test)]
    pub fn event(&self, event_id: &str) -> Option<&EventAttributes> {
        self.events.get(event_id)
    }

    /// Markets of one event in the order they were first seen. Empty for
    /// unknown events.
    pub fn markets_for<'a>(
        &'a self,
        event_id: &str,
    ) -> impl Iterator<Item = (&'a MarketKey, &'a MarketSnapshot)> + 'a {
        self.markets.get(event_id).into_iter().flat_map(|m| m.iter())
    }

    #[cfg(test)]
    pub fn market(&self, event_id: &str, key: &MarketKey) -> Option<&MarketSnapshot> {
        self.markets.get(event_id)?.get(key)
    }

    pub fn event_count(&self) -> usize {
        self.events.len()
    }

    pub fn market_count(&self) -> usize {
        self.markets.values().map(IndexMap::len).sum()
    }
}

/// Object-shaped entries of `market["outcomes"]`; empty when the list is
/// missing or not a list.
fn collect_outcomes(market: &Value) -> Vec<Value> {
    market
        .get(OUTCOMES_KEY)
        .and_then(Value::as_array)
        .map(|list| list.iter().filter(|oc| oc.is_object()).cloned().collect())
        .unwrap_or_default()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
