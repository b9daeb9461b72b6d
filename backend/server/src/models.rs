use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize, de::Error};
use serde_json::Value;

pub const NAME_MAX_CHARS: usize = 100;
pub const COMMENT_MAX_CHARS: usize = 500;
pub const COURSE_MAX_CHARS: usize = 50;

/// A stored guestbook entry.
///
/// The submitter address is kept in the persisted blob under `ip` for
/// throttling and moderation. It must never leave the server, so every
/// response goes through [`PublicEntry`].
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Entry {
    pub id: String,
    pub name: String,
    pub comment: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub location: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "ip", default, skip_serializing_if = "Option::is_none")]
    pub submitter_address: Option<String>,
}

#[derive(Serialize, Clone, Debug, PartialEq)]
pub struct PublicEntry {
    pub id: String,
    pub name: String,
    pub comment: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub course: Option<String>,
    pub location: String,
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

impl From<Entry> for PublicEntry {
    fn from(entry: Entry) -> Self {
        Self {
            id: entry.id,
            name: entry.name,
            comment: entry.comment,
            course: entry.course,
            location: entry.location,
            timestamp: entry.timestamp,
        }
    }
}

/// Submission body. Scalars are accepted in place of strings and stringified,
/// falsy values (`null`, `false`, `0`, `""`) count as absent.
#[derive(Deserialize, Default, Debug)]
pub struct SubmitPayload {
    #[serde(default, deserialize_with = "scalar_string")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub comment: Option<String>,
    #[serde(default, deserialize_with = "scalar_string")]
    pub course: Option<String>,
}

fn scalar_string<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    match Value::deserialize(deserializer)? {
        Value::Null | Value::Bool(false) => Ok(None),
        Value::Bool(true) => Ok(Some("true".to_string())),
        Value::Number(n) if n.as_f64() == Some(0.0) => Ok(None),
        Value::Number(n) => Ok(Some(n.to_string())),
        Value::String(s) if s.is_empty() => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Array(_) | Value::Object(_) => Err(D::Error::custom("expected a string")),
    }
}

/// Last accepted submission of one submitter, stored under `rate_limit_<address>`.
#[derive(Serialize, Deserialize, Debug)]
pub struct RateLimitRecord {
    #[serde(with = "iso_millis")]
    pub timestamp: DateTime<Utc>,
}

#[derive(Clone, Debug, Default)]
pub struct GeoHint {
    pub city: Option<String>,
    pub country: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct Deleted {
    pub success: bool,
    pub message: &'static str,
}

impl Default for Deleted {
    fn default() -> Self {
        Self {
            success: true,
            message: "Entry deleted successfully",
        }
    }
}

/// ISO-8601 with millisecond precision and a `Z` suffix, e.g. `2025-03-01T12:00:00.000Z`.
pub mod iso_millis {
    use chrono::{DateTime, SecondsFormat, Utc};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S: Serializer>(timestamp: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&timestamp.to_rfc3339_opts(SecondsFormat::Millis, true))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let raw = String::deserialize(deserializer)?;

        DateTime::parse_from_rfc3339(&raw)
            .map(|timestamp| timestamp.with_timezone(&Utc))
            .map_err(D::Error::custom)
    }
}
