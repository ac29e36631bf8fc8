//! Synthetic record identity for streams without a natural key

use serde_json::{Map, Value};

/// Fields hashed into the identity, in order
pub const IDENTITY_FIELDS: [&str; 7] = [
    "createdDate",
    "activityType",
    "contactId",
    "listId",
    "segmentId",
    "keywordId",
    "messageId",
];

/// MD5 hex digest over the pipe-joined identity fields of a projected record.
///
/// Absent, null and empty-string values count as missing and are skipped.
/// Every other value is hashed, `false` and `0` included.
pub fn synthetic_identity(record: &Map<String, Value>) -> String {
    let parts: Vec<String> = IDENTITY_FIELDS
        .iter()
        .filter_map(|field| record.get(*field))
        .filter_map(|value| match value {
            Value::Null => None,
            Value::String(s) if s.is_empty() => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        })
        .collect();

    format!("{:x}", md5::compute(parts.join("|").as_bytes()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn record(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_identity_is_md5_of_joined_values() {
        let r = record(json!({
            "createdDate": "2020-01-01T00:00:00+00:00",
            "activityType": "open",
            "contactId": "c1",
            "deliveryId": "ignored"
        }));
        let expected = format!(
            "{:x}",
            md5::compute("2020-01-01T00:00:00+00:00|open|c1".as_bytes())
        );
        assert_eq!(synthetic_identity(&r), expected);
    }

    #[test]
    fn test_identity_deterministic_and_skips_empty() {
        let a = record(json!({"activityType": "click", "contactId": "c1", "listId": null, "segmentId": ""}));
        let b = record(json!({"contactId": "c1", "activityType": "click"}));
        assert_eq!(synthetic_identity(&a), synthetic_identity(&b));
        assert_eq!(synthetic_identity(&a), synthetic_identity(&a.clone()));
        assert_eq!(synthetic_identity(&a).len(), 32);
    }

    #[test]
    fn test_identity_hashes_false_and_zero() {
        let r = record(json!({"activityType": "open", "contactId": 0, "listId": false}));
        let expected = format!("{:x}", md5::compute("open|0|false".as_bytes()));
        assert_eq!(synthetic_identity(&r), expected);

        let without = record(json!({"activityType": "open"}));
        assert_ne!(synthetic_identity(&r), synthetic_identity(&without));
    }

    #[test]
    fn test_identity_differs_on_value_change() {
        let a = record(json!({"activityType": "click", "contactId": "c1"}));
        let b = record(json!({"activityType": "click", "contactId": "c2"}));
        assert_ne!(synthetic_identity(&a), synthetic_identity(&b));
    }
}
