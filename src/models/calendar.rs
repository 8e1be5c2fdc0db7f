use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Google Calendar event as relayed by the backend.
///
/// `start`/`end` keep Google's shape: either an RFC 3339 string or an
/// object with `dateTime` (timed) or `date` (all-day).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalendarEvent {
    #[serde(deserialize_with = "super::de_id")]
    pub id: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub start: Option<Value>,
    #[serde(default)]
    pub end: Option<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CalendarEvent {
    pub fn starts_at(&self) -> Option<DateTime<Utc>> {
        self.start.as_ref().and_then(parse_event_time)
    }

    pub fn ends_at(&self) -> Option<DateTime<Utc>> {
        self.end.as_ref().and_then(parse_event_time)
    }

    pub fn is_all_day(&self) -> bool {
        matches!(&self.start, Some(Value::Object(map)) if map.contains_key("date") && !map.contains_key("dateTime"))
    }

    pub fn is_past(&self) -> bool {
        self.ends_at().or_else(|| self.starts_at()).map(|t| t < Utc::now()).unwrap_or(false)
    }
}

fn parse_event_time(value: &Value) -> Option<DateTime<Utc>> {
    match value {
        Value::String(s) => parse_timestamp(s),
        Value::Object(map) => {
            if let Some(Value::String(s)) = map.get("dateTime") {
                parse_timestamp(s)
            } else if let Some(Value::String(s)) = map.get("date") {
                NaiveDate::parse_from_str(s, "%Y-%m-%d")
                    .ok()
                    .and_then(|d| d.and_hms_opt(0, 0, 0))
                    .map(|dt| dt.and_utc())
            } else {
                None
            }
        }
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s).ok().map(|dt| dt.with_timezone(&Utc))
}
