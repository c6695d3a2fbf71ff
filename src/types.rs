use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

// ---------------------------------------------------------------------------
// Event attributes
// ---------------------------------------------------------------------------

/// Every per-event attribute the store tracks. Each one is updated
/// independently of the others.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EventField {
    Source,
    EventPath,
    StartTime,
    ScheduledTimeUtc,
    EventDate,
    TournamentId,
    TournamentPath,
    Category,
    CategoryId,
    HomeScore,
    AwayScore,
    TotalScore,
    MatchStatus,
    TotalElapsedTime,
    ClockLastUpdate,
    ClockEventTime,
    ClockRemainingTime,
    ClockRemainingTimeInPeriod,
}

/// Latest known attribute values for one event.
///
/// Updates go through [`EventAttributes::merge`]: a value, once seen, is only
/// ever replaced by a later value for the same field, never cleared.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventAttributes {
    values: BTreeMap<EventField, String>,
}

impl EventAttributes {
    pub fn set(&mut self, field: EventField, value: String) {
        self.values.insert(field, value);
    }

    /// Overlay every field present in `update`; fields absent from it keep
    /// their current value.
    pub fn merge(&mut self, update: EventAttributes) {
        self.values.extend(update.values);
    }

    pub fn get(&self, field: EventField) -> Option<&str> {
        self.values.get(&field).map(String::as_str)
    }

    /// Field value, or "" when it has never been observed.
    pub fn get_or_empty(&self, field: EventField) -> &str {
        self.get(field).unwrap_or("")
    }
}

// ---------------------------------------------------------------------------
// Markets
// ---------------------------------------------------------------------------

/// Identifies a market within an event. `specifier` is "" when the feed
/// omits it.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct MarketKey {
    pub market_id: String,
    pub specifier: String,
}

impl MarketKey {
    pub fn new(market_id: impl Into<String>, specifier: impl Into<String>) -> Self {
        Self {
            market_id: market_id.into(),
            specifier: specifier.into(),
        }
    }
}

/// Latest full state of one market. Replaced wholesale on every update for
/// the same [`MarketKey`].
#[derive(Debug, Clone, PartialEq)]
pub struct MarketSnapshot {
    /// Human-readable market name (`marketTemplatePath`).
    pub market_template_path: Option<String>,
    /// Object-shaped entries of the market's `outcomes` list.
    pub outcomes: Vec<Value>,
    /// The market record as received.
    pub record: Value,
}

// ---------------------------------------------------------------------------
// Output rows
// ---------------------------------------------------------------------------

/// One flattened (event, market, specifier, outcome) tuple. Every value is
/// already a string; absent values are "".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Row {
    pub source: String,
    pub event_id: String,
    #[serde(rename = "eventPath")]
    pub event_path: String,
    pub start_time: String,
    #[serde(rename = "scheduledTimeUtc")]
    pub scheduled_time_utc: String,
    #[serde(rename = "eventDate")]
    pub event_date: String,
    #[serde(rename = "tournamentId")]
    pub tournament_id: String,
    #[serde(rename = "tournamentPath")]
    pub tournament_path: String,
    pub category: String,
    #[serde(rename = "categoryId")]
    pub category_id: String,
    #[serde(rename = "homeScore")]
    pub home_score: String,
    #[serde(rename = "awayScore")]
    pub away_score: String,
    #[serde(rename = "totalScore")]
    pub total_score: String,
    #[serde(rename = "matchStatus")]
    pub match_status: String,
    #[serde(rename = "totalElapsedTime")]
    pub total_elapsed_time: String,
    #[serde(rename = "clockEventTime")]
    pub clock_event_time: String,
    #[serde(rename = "clockRemainingTime")]
    pub clock_remaining_time: String,
    #[serde(rename = "clockRemainingTimeInPeriod")]
    pub clock_remaining_time_in_period: String,
    #[serde(rename = "clockLastUpdate")]
    pub clock_last_update: String,
    pub elapsed: String,
    pub market: String,
    pub specifier: String,
    pub leg: String,
    pub odds: String,
    pub line: String,
    pub handicap: String,
    /// Unix seconds at flatten time. Not part of change detection.
    pub current_timestamp: String,
}

impl Row {
    pub const HEADER: [&'static str; 27] = [
        "source",
        "event_id",
        "eventPath",
        "start_time",
        "scheduledTimeUtc",
        "eventDate",
        "tournamentId",
        "tournamentPath",
        "category",
        "categoryId",
        "homeScore",
        "awayScore",
        "totalScore",
        "matchStatus",
        "totalElapsedTime",
        "clockEventTime",
        "clockRemainingTime",
        "clockRemainingTimeInPeriod",
        "clockLastUpdate",
        "elapsed",
        "market",
        "specifier",
        "leg",
        "odds",
        "line",
        "handicap",
        "current_timestamp",
    ];

    /// Values in [`Row::HEADER`] order.
    pub fn values(&self) -> [&str; 27] {
        [
            self.source.as_str(),
            self.event_id.as_str(),
            self.event_path.as_str(),
            self.start_time.as_str(),
            self.scheduled_time_utc.as_str(),
            self.event_date.as_str(),
            self.tournament_id.as_str(),
            self.tournament_path.as_str(),
            self.category.as_str(),
            self.category_id.as_str(),
            self.home_score.as_str(),
            self.away_score.as_str(),
            self.total_score.as_str(),
            self.match_status.as_str(),
            self.total_elapsed_time.as_str(),
            self.clock_event_time.as_str(),
            self.clock_remaining_time.as_str(),
            self.clock_remaining_time_in_period.as_str(),
            self.clock_last_update.as_str(),
            self.elapsed.as_str(),
            self.market.as_str(),
            self.specifier.as_str(),
            self.leg.as_str(),
            self.odds.as_str(),
            self.line.as_str(),
            self.handicap.as_str(),
            self.current_timestamp.as_str(),
        ]
    }

    pub fn dedup_key(&self) -> DedupKey {
        DedupKey {
            event_id: self.event_id.clone(),
            market: self.market.clone(),
            leg: self.leg.clone(),
        }
    }
}

/// Granularity at which price-change emission is gated.
///
/// Keyed by outcome label, not outcome id: two outcomes sharing a label in
/// the same market share one key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DedupKey {
    pub event_id: String,
    pub market: String,
    pub leg: String,
}
