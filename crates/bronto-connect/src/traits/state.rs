//! Checkpoint state for incremental sync
//!
//! State maps a stream to its replication key and the last value synced for
//! it. The whole snapshot is written out after every completed window so a
//! crash loses at most the window that was in flight.

use super::metrics::metric_names;
use super::sink::Sink;
use crate::error::{ConnectorError, ConnectorResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::io::AsyncWriteExt;
use tracing::debug;

/// Checkpoint snapshot
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct State {
    /// stream → replication key → last synced value
    #[serde(default)]
    pub bookmarks: BTreeMap<String, BTreeMap<String, String>>,

    /// Keys written by other tools; carried through untouched
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl State {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load state from a JSON file
    pub fn from_file(path: impl AsRef<Path>) -> ConnectorResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Self::new());
        }
        serde_json::from_str(&content).map_err(|e| {
            ConnectorError::state(format!("invalid state file {}: {}", path.display(), e))
        })
    }

    /// Last synced value for a stream's replication key
    pub fn get(&self, stream: &str, key: &str) -> Option<&str> {
        self.bookmarks
            .get(stream)
            .and_then(|keys| keys.get(key))
            .map(String::as_str)
    }

    /// Return a new state with `stream`/`key` set to `value`.
    ///
    /// No monotonicity check is made; callers only ever move forward.
    pub fn merge(
        mut self,
        stream: impl Into<String>,
        key: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        self.bookmarks
            .entry(stream.into())
            .or_default()
            .insert(key.into(), value.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.bookmarks.is_empty() && self.extra.is_empty()
    }

    pub fn stream_names(&self) -> impl Iterator<Item = &str> {
        self.bookmarks.keys().map(String::as_str)
    }
}

/// Holds the run's single state snapshot and persists it on every commit.
///
/// Engines for different streams share one store, so their commits merge
/// into the same snapshot instead of overwriting each other.
#[derive(Debug, Default)]
pub struct CheckpointStore {
    state: State,
    path: Option<PathBuf>,
}

impl CheckpointStore {
    pub fn new(state: State) -> Self {
        Self { state, path: None }
    }

    /// Also rewrite `path` with the full snapshot on each persist
    pub fn with_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.path = Some(path.into());
        self
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn get(&self, stream: &str, key: &str) -> Option<&str> {
        self.state.get(stream, key)
    }

    /// Merge a new checkpoint value and persist the resulting snapshot.
    pub async fn commit(
        &mut self,
        sink: &dyn Sink,
        stream: &str,
        key: &str,
        value: impl Into<String>,
    ) -> ConnectorResult<()> {
        self.state = std::mem::take(&mut self.state).merge(stream, key, value);
        metrics::counter!(metric_names::CHECKPOINTS_COMMITTED).increment(1);
        self.persist(&self.state, sink).await
    }

    /// Write the full snapshot to the state file (if any), replacing its
    /// previous content, then emit it through the sink.
    pub async fn persist(&self, state: &State, sink: &dyn Sink) -> ConnectorResult<()> {
        if let Some(path) = &self.path {
            write_atomically(path, state).await?;
            debug!(path = %path.display(), "State file written");
        }
        sink.write_state(state).await
    }
}

/// Writes a sibling temp file and renames it over `path`.
async fn write_atomically(path: &Path, state: &State) -> ConnectorResult<()> {
    let json = serde_json::to_vec(state)?;
    let tmp = path.with_extension("tmp");

    let mut file = tokio::fs::File::create(&tmp).await?;
    file.write_all(&json).await?;
    file.sync_all().await?;
    drop(file);

    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::testing::MockSink;
    use serde_json::json;

    #[test]
    fn test_merge_returns_new_state() {
        let original = State::new();
        let merged = original
            .clone()
            .merge("contact", "modified", "2020-01-01T00:00:00+00:00");

        assert!(original.is_empty());
        assert_eq!(
            merged.get("contact", "modified"),
            Some("2020-01-01T00:00:00+00:00")
        );
        assert_eq!(merged.get("contact", "created"), None);
        assert_eq!(merged.get("unsubscribe", "modified"), None);
    }

    #[test]
    fn test_merge_keeps_other_streams() {
        let state = State::new()
            .merge("contact", "modified", "2020-01-01T00:00:00+00:00")
            .merge("unsubscribe", "created", "2020-02-01T00:00:00+00:00")
            .merge("contact", "modified", "2020-01-01T06:00:00+00:00");

        assert_eq!(
            state.get("contact", "modified"),
            Some("2020-01-01T06:00:00+00:00")
        );
        assert_eq!(
            state.get("unsubscribe", "created"),
            Some("2020-02-01T00:00:00+00:00")
        );
        let names: Vec<_> = state.stream_names().collect();
        assert_eq!(names, vec!["contact", "unsubscribe"]);
    }

    #[test]
    fn test_serialized_shape_round_trips_unknown_keys() {
        let raw = json!({
            "bookmarks": {"contact": {"modified": "2020-01-01T00:00:00+00:00"}},
            "currently_syncing": null
        });
        let state: State = serde_json::from_value(raw.clone()).unwrap();
        assert_eq!(
            state.get("contact", "modified"),
            Some("2020-01-01T00:00:00+00:00")
        );
        assert_eq!(serde_json::to_value(&state).unwrap(), raw);
    }

    #[tokio::test]
    async fn test_commit_persists_full_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        let sink = MockSink::new();

        let mut store = CheckpointStore::new(
            State::new().merge("list", "unused", "x"),
        )
        .with_path(&path);
        store
            .commit(&sink, "contact", "modified", "2020-01-01T00:00:00+00:00")
            .await
            .unwrap();
        store
            .commit(&sink, "contact", "modified", "2020-01-01T06:00:00+00:00")
            .await
            .unwrap();

        let on_disk = State::from_file(&path).unwrap();
        assert_eq!(&on_disk, store.state());
        assert_eq!(on_disk.get("list", "unused"), Some("x"));
        assert_eq!(
            on_disk.get("contact", "modified"),
            Some("2020-01-01T06:00:00+00:00")
        );
        assert!(!path.with_extension("tmp").exists());

        let states = sink.states();
        assert_eq!(states.len(), 2);
        assert_eq!(
            states[0].get("contact", "modified"),
            Some("2020-01-01T00:00:00+00:00")
        );
    }

    #[tokio::test(flavor = "current_thread")]
    async fn test_persist_replaces_longer_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        tokio::fs::write(&path, " ".repeat(4096)).await.unwrap();
        let sink = MockSink::new();

        let store = CheckpointStore::new(State::new()).with_path(&path);
        let snapshot = State::new().merge("unsubscribe", "created", "2020-01-01T00:00:00+00:00");
        store.persist(&snapshot, &sink).await.unwrap();

        let raw = tokio::fs::read_to_string(&path).await.unwrap();
        assert_eq!(
            serde_json::from_str::<Value>(&raw).unwrap(),
            json!({"bookmarks": {"unsubscribe": {"created": "2020-01-01T00:00:00+00:00"}}})
        );
        assert_eq!(sink.states(), vec![snapshot]);
    }

    #[tokio::test]
    async fn test_persist_fails_loudly() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("state.json");
        let sink = MockSink::new();
        let mut store = CheckpointStore::new(State::new()).with_path(path);

        let result = store.commit(&sink, "contact", "modified", "v").await;
        assert!(matches!(result, Err(ConnectorError::Io(_))));
        assert!(sink.states().is_empty());
    }

    #[test]
    fn test_empty_state_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, "").unwrap();
        assert!(State::from_file(&path).unwrap().is_empty());

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(
            State::from_file(&path),
            Err(ConnectorError::State(_))
        ));
    }
}
