// Remote resources the gateway and client carry. Only the fields the
// crate reasons about are typed; everything else rides along in `extra`.

pub mod calendar;
pub mod lead;
pub mod meeting;
pub mod sync;

pub use calendar::CalendarEvent;
pub use lead::{Lead, LeadStatus};
pub use meeting::Meeting;
pub use sync::{SyncOutcome, SyncTask, TaskState, TaskStatus};

use serde::{Deserialize, Deserializer};

/// Backend ids arrive as either JSON numbers or strings.
pub(crate) fn de_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum RawId {
        Text(String),
        Number(i64),
    }

    Ok(match RawId::deserialize(deserializer)? {
        RawId::Text(s) => s,
        RawId::Number(n) => n.to_string(),
    })
}

/// List endpoints return either a bare array or `{ "<key>": [...] }`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Wrapped(serde_json::Map<String, serde_json::Value>),
}

impl<T: serde::de::DeserializeOwned> ListEnvelope<T> {
    pub(crate) fn into_items(self, key: &str) -> Result<Vec<T>, serde_json::Error> {
        match self {
            Self::Bare(items) => Ok(items),
            Self::Wrapped(mut map) => match map.remove(key) {
                Some(value) => serde_json::from_value(value),
                None => Ok(Vec::new()),
            },
        }
    }
}
