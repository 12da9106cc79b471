//! Shared JSON decoding helpers used by the gateway record types.
//!
//! Gateway push payloads are not strictly typed: numeric ids sometimes arrive
//! as floats (`1234.0`), and timestamps may be empty strings. These helpers
//! are plugged into records with `#[serde(deserialize_with = "...")]`.

use chrono::{DateTime, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Decode an integer that may be encoded as a JSON float. `null` decodes to 0.
pub fn lenient_i64<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f as i64))
            .ok_or_else(|| D::Error::custom(format!("number {n} out of range"))),
        Value::Null => Ok(0),
        other => Err(D::Error::custom(format!("expected a number, found {other}"))),
    }
}

/// Decode an optional RFC 3339 timestamp.
///
/// `null`, a missing field (with `#[serde(default)]`) and `""` all decode to
/// `None`. Fractional seconds are optional.
pub fn optional_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<String>::deserialize(deserializer)? {
        None => Ok(None),
        Some(text) if text.is_empty() => Ok(None),
        Some(text) => parse_timestamp(&text).map(Some).map_err(D::Error::custom),
    }
}

/// Parse an RFC 3339 timestamp into UTC.
pub fn parse_timestamp(text: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    DateTime::parse_from_rfc3339(text).map(|t| t.with_timezone(&Utc))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Timelike;

    #[derive(Debug, Deserialize)]
    struct Sample {
        #[serde(default, deserialize_with = "lenient_i64")]
        id: i64,
        #[serde(default, deserialize_with = "optional_timestamp")]
        at: Option<DateTime<Utc>>,
    }

    #[test]
    fn float_ids_are_truncated() {
        let s: Sample = serde_json::from_str(r#"{"id": 1234.0}"#).unwrap();
        assert_eq!(s.id, 1234);
        let s: Sample = serde_json::from_str(r#"{"id": 77}"#).unwrap();
        assert_eq!(s.id, 77);
    }

    #[test]
    fn non_numeric_id_is_rejected() {
        assert!(serde_json::from_str::<Sample>(r#"{"id": "abc"}"#).is_err());
    }

    #[test]
    fn timestamps_with_and_without_fraction() {
        let s: Sample = serde_json::from_str(r#"{"at": "2025-03-01T14:30:05Z"}"#).unwrap();
        assert_eq!(s.at.unwrap().second(), 5);
        let s: Sample = serde_json::from_str(r#"{"at": "2025-03-01T14:30:05.123456+00:00"}"#).unwrap();
        assert_eq!(s.at.unwrap().nanosecond(), 123_456_000);
    }

    #[test]
    fn empty_or_missing_timestamp_is_none() {
        let s: Sample = serde_json::from_str(r#"{"at": ""}"#).unwrap();
        assert!(s.at.is_none());
        let s: Sample = serde_json::from_str(r#"{}"#).unwrap();
        assert!(s.at.is_none());
        assert!(serde_json::from_str::<Sample>(r#"{"at": "yesterday"}"#).is_err());
    }
}
