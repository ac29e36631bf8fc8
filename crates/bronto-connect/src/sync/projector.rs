//! Field selection and projection
//!
//! Only fields the catalog selects reach the sink. Date/time values are
//! rendered as ISO-8601 strings with whole seconds on the way out.

use crate::traits::catalog::CatalogEntry;
use crate::traits::record::Record;
use serde_json::{Map, Value};
use std::collections::BTreeSet;

/// The set of fields to keep for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    fields: BTreeSet<String>,
}

impl Selection {
    /// Fields marked `selected`, with `automatic` inclusion, or listed as
    /// key properties
    pub fn from_catalog(entry: &CatalogEntry) -> Self {
        let mut candidates: BTreeSet<String> = entry.property_names().into_iter().collect();
        candidates.extend(entry.key_properties.iter().cloned());
        candidates.extend(entry.metadata.iter().filter_map(|m| match m.breadcrumb.as_slice() {
            [kind, field] if kind == "properties" => Some(field.clone()),
            _ => None,
        }));

        Self {
            fields: candidates
                .into_iter()
                .filter(|field| entry.is_field_selected(field))
                .collect(),
        }
    }

    pub fn from_fields<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }

    pub fn contains(&self, field: &str) -> bool {
        self.fields.contains(field)
    }

    /// True when at least one of `fields` is selected
    pub fn any_selected(&self, fields: &[&str]) -> bool {
        fields.iter().any(|f| self.contains(f))
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(String::as_str)
    }
}

/// Keep the selected fields present in `record`, rendering each as JSON.
pub fn project(record: &Record, selection: &Selection) -> Map<String, Value> {
    record
        .iter()
        .filter(|(name, _)| selection.contains(name))
        .map(|(name, value)| (name.clone(), value.to_json()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::record::FieldValue;
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    #[test]
    fn test_projection_keeps_selected_and_formats_dates() {
        let ts = Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap()
            + chrono::Duration::microseconds(250);
        let mut record = Record::new();
        record.insert("a".into(), 1i64.into());
        record.insert("b".into(), 2i64.into());
        record.insert("c".into(), ts.into());

        let projected = project(&record, &Selection::from_fields(["a", "c", "missing"]));
        assert_eq!(
            Value::Object(projected),
            json!({"a": 1, "c": "2020-01-01T06:00:00+00:00"})
        );
    }

    #[test]
    fn test_null_selected_field_is_kept() {
        let mut record = Record::new();
        record.insert("deliveryId".into(), FieldValue::Null);
        let projected = project(&record, &Selection::from_fields(["deliveryId"]));
        assert_eq!(projected.get("deliveryId"), Some(&Value::Null));
    }

    #[test]
    fn test_selection_from_catalog() {
        let entry = CatalogEntry::new(
            "unsubscribe",
            json!({"properties": {"contactId": {}, "method": {}, "complaint": {}}}),
        )
        .field_metadata("contactId", "inclusion", json!("automatic"))
        .field_metadata("method", "selected", json!(true))
        .field_metadata("complaint", "selected", json!(false))
        .field_metadata("created", "inclusion", json!("automatic"));

        let selection = Selection::from_catalog(&entry);
        let fields: Vec<_> = selection.fields().collect();
        assert_eq!(fields, vec!["contactId", "created", "method"]);
        assert!(selection.any_selected(&["complaint", "method"]));
        assert!(!selection.any_selected(&["complaint"]));
    }

    #[test]
    fn test_key_property_without_metadata_is_kept() {
        let entry = CatalogEntry::new(
            "contact",
            json!({"properties": {"id": {}, "email": {}, "status": {}}}),
        )
        .key_properties(&["id"])
        .field_metadata("email", "selected", json!(true));

        let selection = Selection::from_catalog(&entry);
        let mut record = Record::new();
        record.insert("id".into(), "c1".into());
        record.insert("email".into(), "a@example.com".into());
        record.insert("status".into(), "active".into());

        assert_eq!(
            Value::Object(project(&record, &selection)),
            json!({"id": "c1", "email": "a@example.com"})
        );
    }
}
