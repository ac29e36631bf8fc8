//! Untyped records as returned by the remote API

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, SecondsFormat, TimeZone, Utc};
use serde_json::Value;
use std::collections::BTreeMap;

/// A record before projection: field name → value.
pub type Record = BTreeMap<String, FieldValue>;

/// A field value. Unlike JSON it keeps date/time values distinguishable so
/// the projector can normalise them.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Number(serde_json::Number),
    String(String),
    Timestamp(DateTime<FixedOffset>),
    List(Vec<FieldValue>),
    Map(Record),
}

impl FieldValue {
    /// Render as JSON. Timestamps become ISO-8601 strings with whole seconds.
    pub fn to_json(&self) -> Value {
        match self {
            Self::Null => Value::Null,
            Self::Bool(b) => Value::Bool(*b),
            Self::Number(n) => Value::Number(n.clone()),
            Self::String(s) => Value::String(s.clone()),
            Self::Timestamp(ts) => Value::String(format_timestamp(ts)),
            Self::List(items) => Value::Array(items.iter().map(FieldValue::to_json).collect()),
            Self::Map(map) => Value::Object(
                map.iter()
                    .map(|(k, v)| (k.clone(), v.to_json()))
                    .collect(),
            ),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_map(&self) -> Option<&Record> {
        match self {
            Self::Map(map) => Some(map),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

impl From<String> for FieldValue {
    fn from(value: String) -> Self {
        Self::String(value)
    }
}

impl From<bool> for FieldValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for FieldValue {
    fn from(value: i64) -> Self {
        Self::Number(value.into())
    }
}

impl From<f64> for FieldValue {
    fn from(value: f64) -> Self {
        serde_json::Number::from_f64(value)
            .map(Self::Number)
            .unwrap_or(Self::Null)
    }
}

impl<Tz: TimeZone> From<DateTime<Tz>> for FieldValue {
    fn from(value: DateTime<Tz>) -> Self {
        Self::Timestamp(value.fixed_offset())
    }
}

impl<T: Into<FieldValue>> From<Option<T>> for FieldValue {
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Self::Null)
    }
}

impl From<Value> for FieldValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => Self::Number(n),
            Value::String(s) => Self::String(s),
            Value::Array(items) => Self::List(items.into_iter().map(Into::into).collect()),
            Value::Object(map) => Self::Map(map.into_iter().map(|(k, v)| (k, v.into())).collect()),
        }
    }
}

/// Format a timestamp as ISO-8601 with whole seconds, e.g.
/// `2020-01-01T06:00:00+00:00`. Sub-second precision is truncated.
pub fn format_timestamp<Tz: TimeZone>(ts: &DateTime<Tz>) -> String
where
    Tz::Offset: std::fmt::Display,
{
    ts.to_rfc3339_opts(SecondsFormat::Secs, false)
}

/// Parse a timestamp from a checkpoint or config value.
///
/// Accepts RFC 3339 (with any offset), a naive `YYYY-MM-DDTHH:MM:SS[.f]`
/// or `YYYY-MM-DD HH:MM:SS` taken as UTC, and a bare date at midnight UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if let Ok(ts) = DateTime::parse_from_rfc3339(value) {
        return Some(ts.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(value, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_format_truncates_subseconds() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 6, 30, 15).unwrap()
            + chrono::Duration::microseconds(987_654);
        assert_eq!(format_timestamp(&ts), "2020-01-01T06:30:15+00:00");
    }

    #[test]
    fn test_format_keeps_offset() {
        let offset = FixedOffset::west_opt(5 * 3600).unwrap();
        let ts = offset.with_ymd_and_hms(2021, 3, 4, 10, 0, 0).unwrap();
        assert_eq!(format_timestamp(&ts), "2021-03-04T10:00:00-05:00");
    }

    #[test]
    fn test_parse_variants() {
        let expected = Utc.with_ymd_and_hms(2017, 1, 1, 0, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2017-01-01T00:00:00Z"), Some(expected));
        assert_eq!(parse_timestamp("2017-01-01T00:00:00+00:00"), Some(expected));
        assert_eq!(parse_timestamp("2017-01-01T00:00:00-00:00"), Some(expected));
        assert_eq!(parse_timestamp("2017-01-01T00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2017-01-01 00:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2017-01-01"), Some(expected));
        assert_eq!(parse_timestamp("yesterday"), None);
    }

    #[test]
    fn test_nested_timestamps_rendered() {
        let ts = Utc.with_ymd_and_hms(2020, 5, 1, 12, 0, 0).unwrap();
        let mut inner = Record::new();
        inner.insert("lastOpenDate".into(), ts.into());
        let value = FieldValue::List(vec![FieldValue::Map(inner), FieldValue::Null]);
        assert_eq!(
            value.to_json(),
            json!([{"lastOpenDate": "2020-05-01T12:00:00+00:00"}, null])
        );
    }

    #[test]
    fn test_from_json() {
        let value: FieldValue = json!({"a": [1, "x"], "b": null}).into();
        let map = value.as_map().unwrap();
        assert_eq!(
            map.get("a"),
            Some(&FieldValue::List(vec![1i64.into(), "x".into()]))
        );
        assert!(map.get("b").unwrap().is_null());
    }
}
