//! Stream registry
//!
//! Maps a catalog entry's stream name to the strategy that syncs it. Names
//! are matched exactly; a catalog entry with no registered stream is a
//! configuration error.

use super::catalog::CatalogEntry;
use crate::error::{ConnectorError, ConnectorResult};
use crate::streams::StreamStrategy;
use std::collections::BTreeMap;

/// Builds a fresh strategy for one run of a stream
pub type StreamFactory = fn() -> Box<dyn StreamStrategy>;

/// Registry of available streams
#[derive(Debug, Default, Clone)]
pub struct StreamRegistry {
    streams: BTreeMap<String, StreamFactory>,
}

impl StreamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a stream factory under its table name
    pub fn register(&mut self, name: &str, factory: StreamFactory) {
        self.streams.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<&StreamFactory> {
        self.streams.get(name)
    }

    /// Instantiate the strategy registered under `name`
    pub fn create(&self, name: &str) -> Option<Box<dyn StreamStrategy>> {
        self.streams.get(name).map(|factory| factory())
    }

    /// Strategy for a catalog entry
    pub fn resolve(&self, entry: &CatalogEntry) -> ConnectorResult<Box<dyn StreamStrategy>> {
        self.create(&entry.stream).ok_or_else(|| {
            ConnectorError::config(format!(
                "No stream registered for catalog entry '{}' (available: {})",
                entry.stream,
                self.list().join(", ")
            ))
        })
    }

    /// Registered names, sorted
    pub fn list(&self) -> Vec<&str> {
        self.streams.keys().map(String::as_str).collect()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.streams.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.streams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.streams.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::streams::{ListStream, UnsubscribeStream};
    use serde_json::json;

    #[test]
    fn test_register_and_resolve() {
        let mut registry = StreamRegistry::new();
        assert!(registry.is_empty());
        registry.register("list", || Box::new(ListStream));
        registry.register("unsubscribe", || Box::new(UnsubscribeStream));

        assert_eq!(registry.len(), 2);
        assert!(registry.contains("list"));
        assert!(registry.get("contact").is_none());

        let entry = CatalogEntry::new("unsubscribe", json!({}));
        assert_eq!(registry.resolve(&entry).unwrap().table(), "unsubscribe");
    }

    #[test]
    fn test_unknown_stream_is_config_error() {
        let mut registry = StreamRegistry::new();
        registry.register("list", || Box::new(ListStream));

        let err = registry
            .resolve(&CatalogEntry::new("campaign", json!({})))
            .unwrap_err();
        assert!(matches!(err, ConnectorError::Config(_)));
        assert!(err.to_string().contains("campaign"));
        assert!(err.to_string().contains("list"));
    }
}
