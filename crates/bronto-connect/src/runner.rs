//! Run orchestration
//!
//! Syncs every selected catalog entry, one after another, through a shared
//! [`SyncContext`]. The first fatal error stops the run.

use crate::error::{ConnectError, ConnectorError, Result, StreamStatus};
use crate::sync::{SyncContext, SyncEngine, SyncSummary};
use crate::traits::catalog::Catalog;
use crate::traits::registry::StreamRegistry;
use crate::traits::state::State;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Outcome of one stream within a run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StreamReport {
    pub stream: String,
    #[serde(serialize_with = "serialize_status")]
    pub status: StreamStatus,
    pub summary: SyncSummary,
}

fn serialize_status<S: serde::Serializer>(
    status: &StreamStatus,
    serializer: S,
) -> std::result::Result<S::Ok, S::Error> {
    serializer.collect_str(status)
}

/// Syncs all selected streams of a catalog
pub struct TapRunner {
    catalog: Catalog,
    registry: StreamRegistry,
    ctx: SyncContext,
    statuses: BTreeMap<String, StreamStatus>,
}

impl TapRunner {
    pub fn new(catalog: Catalog, registry: StreamRegistry, ctx: SyncContext) -> Self {
        Self {
            catalog,
            registry,
            ctx,
            statuses: BTreeMap::new(),
        }
    }

    /// Status of every selected stream seen so far
    pub fn statuses(&self) -> &BTreeMap<String, StreamStatus> {
        &self.statuses
    }

    /// Current checkpoint snapshot
    pub async fn state(&self) -> State {
        self.ctx.checkpoints.lock().await.state().clone()
    }

    /// Sync every selected stream in catalog order.
    ///
    /// Every selected entry is resolved against the registry before any
    /// stream starts, so a misnamed stream fails the run up front.
    pub async fn run(&mut self) -> Result<Vec<StreamReport>> {
        let selected: Vec<_> = self.catalog.selected_streams().cloned().collect();
        if selected.is_empty() {
            warn!("No streams selected in catalog");
            return Ok(Vec::new());
        }

        let mut plan = Vec::with_capacity(selected.len());
        for entry in selected {
            let strategy = self.registry.resolve(&entry).map_err(|e| match e {
                ConnectorError::Config(msg) => ConnectError::Config(msg),
                other => ConnectError::Connector(other),
            })?;
            self.statuses.insert(entry.stream.clone(), StreamStatus::Pending);
            plan.push((strategy, entry));
        }

        let mut reports = Vec::with_capacity(plan.len());
        for (strategy, entry) in plan {
            let name = entry.stream.clone();
            self.statuses.insert(name.clone(), StreamStatus::Syncing);

            let mut engine = SyncEngine::new(strategy, entry, self.ctx.clone());
            match engine.sync().await {
                Ok(summary) => {
                    self.statuses.insert(name.clone(), StreamStatus::Done);
                    reports.push(StreamReport {
                        stream: name,
                        status: StreamStatus::Done,
                        summary,
                    });
                }
                Err(e) => {
                    error!(stream = %name, error = %e, "Stream failed");
                    self.statuses.insert(name.clone(), StreamStatus::Failed);
                    return Err(ConnectError::stream(name, e));
                }
            }
        }

        info!(streams = reports.len(), "All streams synced");
        Ok(reports)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RemoteFault;
    use crate::streams::create_stream_registry;
    use crate::traits::catalog::CatalogEntry;
    use crate::traits::state::CheckpointStore;
    use crate::traits::testing::{FixedClock, MockRemote, MockSink};
    use crate::types::SensitiveString;
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use std::sync::Arc;

    fn runner(catalog: Catalog, remote: &MockRemote, sink: &MockSink) -> TapRunner {
        let now = Utc.with_ymd_and_hms(2017, 1, 1, 12, 0, 0).unwrap();
        let ctx = SyncContext::new(
            Arc::new(remote.clone()),
            Arc::new(sink.clone()),
            CheckpointStore::new(State::new()),
            Arc::new(FixedClock::new(now)),
            SensitiveString::new("token"),
        );
        TapRunner::new(catalog, create_stream_registry(), ctx)
    }

    fn selected(stream: &str) -> CatalogEntry {
        CatalogEntry::new(stream, json!({})).stream_metadata("selected", json!(true))
    }

    #[tokio::test]
    async fn test_runs_selected_streams_in_order() {
        let catalog = Catalog::new()
            .add_stream(selected("unsubscribe"))
            .add_stream(CatalogEntry::new("contact", json!({})))
            .add_stream(selected("list"));
        let remote = MockRemote::new();
        let sink = MockSink::new();

        let mut runner = runner(catalog, &remote, &sink);
        let reports = runner.run().await.unwrap();

        let names: Vec<_> = reports.iter().map(|r| r.stream.as_str()).collect();
        assert_eq!(names, vec!["unsubscribe", "list"]);
        assert_eq!(sink.schemas(), vec!["unsubscribe", "list"]);
        assert!(runner
            .statuses()
            .values()
            .all(|s| *s == StreamStatus::Done));

        // two 6h windows before noon, list commits nothing
        let state = runner.state().await;
        assert_eq!(
            state.get("unsubscribe", "created"),
            Some("2017-01-01T06:00:00+00:00")
        );
        assert_eq!(state.get("list", "id"), None);
    }

    #[tokio::test]
    async fn test_unknown_stream_fails_before_syncing() {
        let catalog = Catalog::new()
            .add_stream(selected("list"))
            .add_stream(selected("campaign"));
        let remote = MockRemote::new();
        let sink = MockSink::new();

        let mut runner = runner(catalog, &remote, &sink);
        let err = runner.run().await.unwrap_err();
        assert!(matches!(err, ConnectError::Config(_)));
        assert!(sink.messages().is_empty());
        assert!(remote.requests().is_empty());
    }

    #[tokio::test]
    async fn test_fatal_error_stops_run() {
        let catalog = Catalog::new()
            .add_stream(selected("list"))
            .add_stream(selected("unsubscribe"));
        let remote = MockRemote::new().with_response(Err(RemoteFault::other(None, "server error")));
        let sink = MockSink::new();

        let mut runner = runner(catalog, &remote, &sink);
        let err = runner.run().await.unwrap_err();

        match err {
            ConnectError::Stream { name, source } => {
                assert_eq!(name, "list");
                assert!(matches!(source, ConnectorError::Remote(_)));
            }
            other => panic!("unexpected error: {other}"),
        }
        assert_eq!(runner.statuses()["list"], StreamStatus::Failed);
        assert_eq!(runner.statuses()["unsubscribe"], StreamStatus::Pending);
        assert_eq!(sink.schemas(), vec!["list"]);
    }
}
