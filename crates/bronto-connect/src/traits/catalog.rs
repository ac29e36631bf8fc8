//! Catalog types describing which streams and fields to sync
//!
//! The catalog is read-only input. Each entry carries the stream's JSON
//! schema, its key properties and a list of metadata items addressed by
//! breadcrumb: the empty breadcrumb holds stream-level settings such as
//! `selected` and `replication-method`, and `["properties", <field>]`
//! holds field-level `selected` and `inclusion`.

use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::path::Path;

/// Catalog of streams handed to the connector
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub streams: Vec<CatalogEntry>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a catalog from a JSON (or YAML) file
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Add an entry (builder style)
    pub fn add_stream(mut self, entry: CatalogEntry) -> Self {
        self.streams.push(entry);
        self
    }

    /// Find an entry by stream name
    pub fn find_stream(&self, name: &str) -> Option<&CatalogEntry> {
        self.streams.iter().find(|s| s.stream == name)
    }

    /// Entries the user selected for sync, in catalog order
    pub fn selected_streams(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.iter().filter(|s| s.is_selected())
    }
}

/// A single metadata item
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataEntry {
    #[serde(default)]
    pub breadcrumb: Vec<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

/// One stream in the catalog
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Stream name, matched against the registered tables
    pub stream: String,

    #[serde(default)]
    pub tap_stream_id: Option<String>,

    /// JSON schema of the records
    #[serde(default)]
    pub schema: Value,

    #[serde(default)]
    pub key_properties: Vec<String>,

    #[serde(default)]
    pub metadata: Vec<MetadataEntry>,
}

impl CatalogEntry {
    pub fn new(stream: impl Into<String>, schema: Value) -> Self {
        let stream = stream.into();
        Self {
            tap_stream_id: Some(stream.clone()),
            stream,
            schema,
            key_properties: Vec::new(),
            metadata: Vec::new(),
        }
    }

    /// Set key properties (builder style)
    pub fn key_properties(mut self, keys: &[&str]) -> Self {
        self.key_properties = keys.iter().map(|k| k.to_string()).collect();
        self
    }

    /// Set a stream-level metadata value (builder style)
    pub fn stream_metadata(self, key: &str, value: Value) -> Self {
        self.with_metadata(Vec::new(), key, value)
    }

    /// Set a field-level metadata value (builder style)
    pub fn field_metadata(self, field: &str, key: &str, value: Value) -> Self {
        self.with_metadata(vec!["properties".to_string(), field.to_string()], key, value)
    }

    fn with_metadata(mut self, breadcrumb: Vec<String>, key: &str, value: Value) -> Self {
        match self.metadata.iter_mut().find(|m| m.breadcrumb == breadcrumb) {
            Some(entry) => {
                entry.metadata.insert(key.to_string(), value);
            }
            None => {
                let mut metadata = Map::new();
                metadata.insert(key.to_string(), value);
                self.metadata.push(MetadataEntry {
                    breadcrumb,
                    metadata,
                });
            }
        }
        self
    }

    fn metadata_at(&self, breadcrumb: &[&str]) -> Option<&Map<String, Value>> {
        self.metadata
            .iter()
            .find(|m| m.breadcrumb.iter().map(String::as_str).eq(breadcrumb.iter().copied()))
            .map(|m| &m.metadata)
    }

    /// Whether the stream itself is selected for sync.
    ///
    /// Falls back to a top-level `selected` flag in the schema for catalogs
    /// written before stream metadata existed.
    pub fn is_selected(&self) -> bool {
        self.metadata_at(&[])
            .and_then(|m| m.get("selected"))
            .or_else(|| self.schema.get("selected"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Whether a field is selected: explicitly, because its inclusion is
    /// `automatic`, or because it is one of the stream's key properties.
    pub fn is_field_selected(&self, field: &str) -> bool {
        if self.key_properties.iter().any(|key| key == field) {
            return true;
        }
        let Some(metadata) = self.metadata_at(&["properties", field]) else {
            return false;
        };
        let selected = metadata
            .get("selected")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        let automatic = metadata.get("inclusion").and_then(Value::as_str) == Some("automatic");
        selected || automatic
    }

    /// Field names declared by the schema, falling back to those named in
    /// field-level metadata when the schema has no `properties`.
    pub fn property_names(&self) -> Vec<String> {
        if let Some(properties) = self.schema.get("properties").and_then(Value::as_object) {
            return properties.keys().cloned().collect();
        }
        self.metadata
            .iter()
            .filter_map(|m| match m.breadcrumb.as_slice() {
                [kind, field] if kind == "properties" => Some(field.clone()),
                _ => None,
            })
            .collect()
    }

    /// Replication method from stream metadata, `INCREMENTAL` when unset.
    pub fn replication_method(&self) -> ConnectorResult<ReplicationMethod> {
        match self
            .metadata_at(&[])
            .and_then(|m| m.get("replication-method"))
        {
            None | Some(Value::Null) => Ok(ReplicationMethod::Incremental),
            Some(Value::String(method)) => method.parse(),
            Some(other) => Err(ConnectorError::config(format!(
                "Unknown replication method {}!",
                other
            ))),
        }
    }
}

/// How a stream is replicated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReplicationMethod {
    /// Re-read everything since the configured start date
    FullTable,
    /// Resume from the stored checkpoint
    Incremental,
}

impl std::str::FromStr for ReplicationMethod {
    type Err = ConnectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "FULL_TABLE" => Ok(Self::FullTable),
            "INCREMENTAL" => Ok(Self::Incremental),
            other => Err(ConnectorError::config(format!(
                "Unknown replication method {}!",
                other
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn contact_entry() -> CatalogEntry {
        CatalogEntry::new(
            "contact",
            json!({"type": "object", "properties": {"id": {}, "email": {}, "status": {}}}),
        )
        .key_properties(&["id"])
        .stream_metadata("selected", json!(true))
        .field_metadata("id", "inclusion", json!("automatic"))
        .field_metadata("email", "inclusion", json!("available"))
        .field_metadata("email", "selected", json!(true))
        .field_metadata("status", "inclusion", json!("available"))
    }

    #[test]
    fn test_field_selection() {
        let entry = contact_entry();
        assert!(entry.is_field_selected("id"));
        assert!(entry.is_field_selected("email"));
        assert!(!entry.is_field_selected("status"));
        assert!(!entry.is_field_selected("missing"));
    }

    #[test]
    fn test_key_property_is_implicitly_selected() {
        let entry = CatalogEntry::new("list", json!({"properties": {"id": {}, "name": {}}}))
            .key_properties(&["id"]);
        assert!(entry.is_field_selected("id"));
        assert!(!entry.is_field_selected("name"));
    }

    #[test]
    fn test_stream_selection() {
        assert!(contact_entry().is_selected());
        assert!(!CatalogEntry::new("list", json!({})).is_selected());
        assert!(CatalogEntry::new("list", json!({"selected": true})).is_selected());
    }

    #[test]
    fn test_replication_method() {
        let entry = contact_entry();
        assert_eq!(
            entry.replication_method().unwrap(),
            ReplicationMethod::Incremental
        );

        let full = contact_entry().stream_metadata("replication-method", json!("FULL_TABLE"));
        assert_eq!(full.replication_method().unwrap(), ReplicationMethod::FullTable);

        let bogus = contact_entry().stream_metadata("replication-method", json!("LOG_BASED"));
        assert!(matches!(
            bogus.replication_method(),
            Err(ConnectorError::Config(_))
        ));
    }

    #[test]
    fn test_parse_singer_catalog() {
        let raw = json!({
            "streams": [{
                "tap_stream_id": "unsubscribe",
                "stream": "unsubscribe",
                "key_properties": ["contactId", "method", "created"],
                "schema": {"type": "object", "properties": {"contactId": {}, "created": {}}},
                "metadata": [
                    {"breadcrumb": [], "metadata": {"selected": true}},
                    {"breadcrumb": ["properties", "created"], "metadata": {"inclusion": "automatic"}}
                ]
            }]
        });
        let catalog: Catalog = serde_json::from_value(raw).unwrap();
        let entry = catalog.find_stream("unsubscribe").unwrap();
        assert!(entry.is_field_selected("created"));
        assert_eq!(entry.property_names(), vec!["contactId", "created"]);
        assert_eq!(catalog.selected_streams().count(), 1);
    }

    #[test]
    fn test_property_names_from_metadata() {
        let entry = CatalogEntry::new("list", json!({}))
            .field_metadata("id", "inclusion", json!("automatic"))
            .field_metadata("name", "selected", json!(true));
        assert_eq!(entry.property_names(), vec!["id", "name"]);
    }
}
