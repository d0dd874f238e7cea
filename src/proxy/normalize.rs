//! Reshaping of upstream opportunity records into the frontend schema.

use serde::Serialize;
use serde_json::{Map, Value};

/// Location reported when an opportunity lists none.
pub const UNKNOWN_LOCATION: &str = "Unknown";

/// One opportunity as returned to the frontend.
///
/// Pass-through fields that the upstream omitted are omitted here too.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub objective: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<Value>,
    pub remote: bool,
    pub location: String,
    pub organization: Value,
    pub skills: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub compensation: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deadline: Option<Value>,
}

impl SearchResult {
    /// Map one raw upstream record. Never fails; unexpected shapes fall back to defaults.
    pub fn from_raw(raw: &Value) -> Self {
        let field = |name: &str| raw.get(name).cloned();

        let location = first(raw, "locations")
            .and_then(|loc| loc.get("name"))
            .and_then(Value::as_str)
            .filter(|name| !name.is_empty())
            .unwrap_or(UNKNOWN_LOCATION)
            .to_string();

        let organization = first(raw, "organizations")
            .filter(|org| !org.is_null())
            .cloned()
            .unwrap_or_else(|| Value::Object(Map::new()));

        let skills = raw
            .get("skills")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Self {
            id: field("id"),
            objective: field("objective"),
            kind: field("type"),
            remote: raw.get("remote").and_then(Value::as_bool).unwrap_or(false),
            location,
            organization,
            skills,
            compensation: field("compensation"),
            deadline: field("deadline"),
        }
    }
}

fn first<'a>(raw: &'a Value, list: &str) -> Option<&'a Value> {
    raw.get(list).and_then(Value::as_array).and_then(|items| items.first())
}

/// Normalize an upstream search payload. One output per input record, same order;
/// a payload without a `results` list yields no results.
pub fn normalize_results(payload: &Value) -> Vec<SearchResult> {
    payload
        .get("results")
        .and_then(Value::as_array)
        .map(|results| results.iter().map(SearchResult::from_raw).collect())
        .unwrap_or_default()
}
