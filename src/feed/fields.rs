use serde_json::Value;

// Ordered alternate keys, first match wins. The order is the feed's
// preferred-field priority across provider variants and must not change.
pub const LABEL_KEYS: &[&str] = &["label", "name", "outcomeName", "selectionName"];
pub const LABEL_FALLBACK_KEYS: &[&str] = &["id"];
pub const PRICE_KEYS: &[&str] = &["odds", "price", "decimalOdds"];
pub const LINE_KEYS: &[&str] = &["line", "lineValue"];
pub const HANDICAP_KEYS: &[&str] = &["handicap", "spread"];

/// String form of a feed value. `None` for null and for the empty string,
/// which the feed uses interchangeably with an absent key.
pub fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) if s.is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        other => Some(other.to_string()),
    }
}

/// First key in `keys` whose value on `node` is present, non-null and
/// non-empty, stringified. `None` if `node` is not an object or nothing
/// matches.
pub fn first_present(node: &Value, keys: &[&str]) -> Option<String> {
    let obj = node.as_object()?;
    keys.iter().find_map(|key| obj.get(*key).and_then(stringify))
}

/// Derived fields of one outcome. Missing values are "".
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OutcomeFields {
    pub leg: String,
    pub odds: String,
    pub line: String,
    pub handicap: String,
}

impl OutcomeFields {
    pub fn extract(outcome: &Value) -> Self {
        Self {
            leg: outcome_label(outcome),
            odds: outcome_price(outcome),
            line: outcome_line(outcome),
            handicap: outcome_handicap(outcome),
        }
    }
}

/// Display label; falls back to the outcome id when no label key is set.
pub fn outcome_label(outcome: &Value) -> String {
    first_present(outcome, LABEL_KEYS)
        .or_else(|| first_present(outcome, LABEL_FALLBACK_KEYS))
        .unwrap_or_default()
}

pub fn outcome_price(outcome: &Value) -> String {
    first_present(outcome, PRICE_KEYS).unwrap_or_default()
}

pub fn outcome_line(outcome: &Value) -> String {
    first_present(outcome, LINE_KEYS).unwrap_or_default()
}

pub fn outcome_handicap(outcome: &Value) -> String {
    first_present(outcome, HANDICAP_KEYS).unwrap_or_default()
}
