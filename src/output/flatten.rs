use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::Value;

use crate::feed::OutcomeFields;
use crate::state::EventStore;
use crate::types::{EventAttributes, EventField, MarketKey, MarketSnapshot, Row};

/// `elapsed` mirrors the clock only for events whose source is this value.
const LIVE_SOURCE: &str = "live";

/// Project the whole store into one row per (event, market, specifier,
/// outcome). Stateless: every call walks the full store.
///
/// `generated_at` is the unix-seconds timestamp stamped on every row.
pub fn flatten_rows(store: &EventStore, generated_at: u64) -> Vec<Row> {
    let timestamp = generated_at.to_string();
    let mut rows = Vec::new();

    for (event_id, attrs) in store.events() {
        let base = event_row(event_id, attrs, &timestamp);
        for (key, snapshot) in store.markets_for(event_id) {
            for outcome in outcomes_of(snapshot) {
                rows.push(outcome_row(&base, key, snapshot, outcome));
            }
        }
    }
    rows
}

/// Outcomes to flatten for a market. When the stored list came out empty,
/// re-read the raw `outcomes` list from the market record.
fn outcomes_of(snapshot: &MarketSnapshot) -> &[Value] {
    if !snapshot.outcomes.is_empty() {
        return &snapshot.outcomes;
    }
    snapshot
        .record
        .get("outcomes")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or(&[])
}

/// Event-level columns shared by every row of one event.
fn event_row(event_id: &str, attrs: &EventAttributes, timestamp: &str) -> Row {
    let field = |f: EventField| attrs.get_or_empty(f).to_string();
    let source = field(EventField::Source);
    let clock_event_time = field(EventField::ClockEventTime);
    let elapsed = if source == LIVE_SOURCE {
        clock_event_time.clone()
    } else {
        String::new()
    };

    Row {
        event_id: event_id.to_string(),
        event_path: field(EventField::EventPath),
        start_time: field(EventField::StartTime),
        scheduled_time_utc: field(EventField::ScheduledTimeUtc),
        event_date: field(EventField::EventDate),
        tournament_id: field(EventField::TournamentId),
        tournament_path: field(EventField::TournamentPath),
        category: field(EventField::Category),
        category_id: field(EventField::CategoryId),
        home_score: field(EventField::HomeScore),
        away_score: field(EventField::AwayScore),
        total_score: field(EventField::TotalScore),
        match_status: field(EventField::MatchStatus),
        total_elapsed_time: field(EventField::TotalElapsedTime),
        clock_event_time,
        clock_remaining_time: field(EventField::ClockRemainingTime),
        clock_remaining_time_in_period: field(EventField::ClockRemainingTimeInPeriod),
        clock_last_update: field(EventField::ClockLastUpdate),
        elapsed,
        source,
        current_timestamp: timestamp.to_string(),
        ..Row::default()
    }
}

fn outcome_row(base: &Row, key: &MarketKey, snapshot: &MarketSnapshot, outcome: &Value) -> Row {
    let OutcomeFields { leg, odds, line, handicap } = OutcomeFields::extract(outcome);
    Row {
        market: snapshot.market_template_path.clone().unwrap_or_default(),
        specifier: key.specifier.clone(),
        leg,
        odds,
        line,
        handicap,
        ..base.clone()
    }
}

pub fn unix_now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
