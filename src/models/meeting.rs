use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A transcript-backed meeting (Fireflies, Zoom) as listed by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(deserialize_with = "super::de_id")]
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Meeting {
    pub fn has_transcript(&self) -> bool {
        matches!(self.extra.get("transcript"), Some(Value::String(s)) if !s.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_meeting_from_backend_json() {
        let meeting: Meeting = serde_json::from_value(json!({
            "id": "ff-91",
            "title": "Intro call",
            "source": "fireflies",
            "transcript": "Hi there"
        }))
        .unwrap();

        assert_eq!(meeting.id, "ff-91");
        assert_eq!(meeting.source.as_deref(), Some("fireflies"));
        assert!(meeting.has_transcript());
    }

    #[test]
    fn test_meeting_without_optional_fields() {
        let meeting: Meeting = serde_json::from_value(json!({ "id": 3 })).unwrap();
        assert_eq!(meeting.id, "3");
        assert!(meeting.title.is_none());
        assert!(!meeting.has_transcript());
    }
}
