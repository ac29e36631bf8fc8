//! The incremental sync loop
//!
//! One engine syncs one stream. It resolves the start date from the
//! checkpoint, walks contiguous time windows up to the current time, pages
//! through each window and commits the window's start once the window is
//! exhausted. Streams without a replication key get a single unbounded pass.
//!
//! Fault handling inside the pagination loop:
//!
//! | Fault | Action |
//! |-------|--------|
//! | timeout | retry the same request, bounded by the retry budget |
//! | session expired | log in again, retry the same request |
//! | end of results | the window is done |
//! | anything else | abort the stream |

use super::clock::Clock;
use super::identity::synthetic_identity;
use super::projector::{project, Selection};
use super::window::{resolve_start, TimeWindow};
use crate::error::{ConnectorError, ConnectorResult};
use crate::session::{
    ContactInclusion, Page, QueryRequest, RemoteApi, RemoteFault, Session, MAX_PAGE_SIZE,
};
use crate::streams::{Incremental, StreamStrategy};
use crate::traits::catalog::CatalogEntry;
use crate::traits::metrics::metric_names;
use crate::traits::record::{format_timestamp, Record};
use crate::traits::retry::{RetryConfig, RetryGuard};
use crate::traits::sink::Sink;
use crate::traits::state::CheckpointStore;
use crate::types::SensitiveString;
use chrono::{DateTime, TimeZone, Utc};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

/// Run-wide engine settings
#[derive(Debug, Clone)]
pub struct EngineSettings {
    /// Start used when there is no checkpoint or for `FULL_TABLE`
    pub start_date: DateTime<Utc>,
    pub page_size: u32,
    pub retry: RetryConfig,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            start_date: Utc
                .with_ymd_and_hms(2017, 1, 1, 0, 0, 0)
                .single()
                .unwrap_or(DateTime::<Utc>::UNIX_EPOCH),
            page_size: MAX_PAGE_SIZE,
            retry: RetryConfig::default(),
        }
    }
}

/// Collaborators shared by every engine of a run
#[derive(Clone)]
pub struct SyncContext {
    pub remote: Arc<dyn RemoteApi>,
    pub sink: Arc<dyn Sink>,
    pub checkpoints: Arc<Mutex<CheckpointStore>>,
    pub clock: Arc<dyn Clock>,
    pub credential: SensitiveString,
    pub settings: EngineSettings,
}

impl SyncContext {
    pub fn new(
        remote: Arc<dyn RemoteApi>,
        sink: Arc<dyn Sink>,
        checkpoints: CheckpointStore,
        clock: Arc<dyn Clock>,
        credential: SensitiveString,
    ) -> Self {
        Self {
            remote,
            sink,
            checkpoints: Arc::new(Mutex::new(checkpoints)),
            clock,
            credential,
            settings: EngineSettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: EngineSettings) -> Self {
        self.settings = settings;
        self
    }
}

/// Counters for one stream's sync
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    pub records: u64,
    pub pages: u64,
    pub windows: u64,
    pub retries: u64,
    pub reauthentications: u64,
}

/// Drives one stream to completion
pub struct SyncEngine {
    strategy: Box<dyn StreamStrategy>,
    entry: CatalogEntry,
    selection: Selection,
    ctx: SyncContext,
    session: Option<Session>,
    summary: SyncSummary,
    time_extracted: String,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine")
            .field("strategy", &self.strategy)
            .field("stream", &self.entry.stream)
            .field("summary", &self.summary)
            .finish()
    }
}

impl SyncEngine {
    pub fn new(strategy: Box<dyn StreamStrategy>, entry: CatalogEntry, ctx: SyncContext) -> Self {
        let selection = Selection::from_catalog(&entry);
        let time_extracted = format_timestamp(&ctx.clock.now());
        Self {
            strategy,
            entry,
            selection,
            ctx,
            session: None,
            summary: SyncSummary::default(),
            time_extracted,
        }
    }

    pub fn table(&self) -> &'static str {
        self.strategy.table()
    }

    pub fn summary(&self) -> &SyncSummary {
        &self.summary
    }

    /// Sync the stream from its checkpoint up to now.
    #[instrument(skip(self), fields(stream = %self.strategy.table()))]
    pub async fn sync(&mut self) -> ConnectorResult<SyncSummary> {
        let table = self.strategy.table();
        let method = self.entry.replication_method()?;

        self.ctx
            .sink
            .write_schema(&self.entry.stream, &self.entry.schema, &self.entry.key_properties)
            .await?;

        let inclusion = self.strategy.inclusion(&self.selection);
        info!("Syncing {}.", table);
        self.authenticate().await?;

        match self.strategy.incremental() {
            None => {
                self.paginate(None, inclusion).await?;
            }
            Some(incremental) => {
                let bookmark = self
                    .ctx
                    .checkpoints
                    .lock()
                    .await
                    .get(table, incremental.replication_key)
                    .map(str::to_string);
                let mut start = resolve_start(
                    table,
                    method,
                    bookmark.as_deref(),
                    self.ctx.settings.start_date,
                )?;
                if let Some(policy) = self.strategy.retention() {
                    start = policy.apply(start, self.ctx.clock.now());
                }
                self.sync_windows(start, incremental, inclusion).await?;
            }
        }

        info!(
            records = self.summary.records,
            pages = self.summary.pages,
            windows = self.summary.windows,
            "Done syncing {}.",
            table
        );
        Ok(self.summary.clone())
    }

    async fn sync_windows(
        &mut self,
        mut start: DateTime<Utc>,
        incremental: Incremental,
        inclusion: ContactInclusion,
    ) -> ConnectorResult<()> {
        let table = self.strategy.table();
        while start < self.ctx.clock.now() {
            let window = TimeWindow::new(start, incremental.interval);
            info!(
                window_start = %format_timestamp(&window.start),
                window_end = %format_timestamp(&window.end),
                "Fetching {} window",
                table
            );

            self.paginate(Some(&window), inclusion).await?;

            self.ctx
                .checkpoints
                .lock()
                .await
                .commit(
                    self.ctx.sink.as_ref(),
                    table,
                    incremental.replication_key,
                    format_timestamp(&window.start),
                )
                .await?;
            self.summary.windows += 1;
            start = window.end;
        }
        Ok(())
    }

    /// Page through one window until an empty page or end of results.
    async fn paginate(
        &mut self,
        window: Option<&TimeWindow>,
        inclusion: ContactInclusion,
    ) -> ConnectorResult<()> {
        let page_size = self.ctx.settings.page_size;
        let mut request = QueryRequest {
            operation: self.strategy.operation(),
            filter: self.strategy.filter(window, page_size),
            cursor: self.strategy.pagination().first_cursor(),
            page_size,
            inclusion,
        };

        loop {
            let Some(page) = self.fetch_page(&request).await? else {
                debug!(cursor = ?request.cursor, "End of results");
                break;
            };
            self.summary.pages += 1;
            metrics::counter!(metric_names::PAGES_FETCHED).increment(1);
            info!(cursor = ?request.cursor, "... {} results", page.len());

            if page.is_empty() {
                break;
            }
            for record in page {
                self.emit(record).await?;
            }
            request.cursor = request.cursor.next();
        }
        Ok(())
    }

    /// Issue one request, absorbing timeouts and session expiry.
    ///
    /// Returns `None` when the remote reports the end of results.
    async fn fetch_page(&mut self, request: &QueryRequest) -> ConnectorResult<Option<Page>> {
        let mut guard = RetryGuard::new(self.ctx.settings.retry.clone());

        loop {
            let session = match &self.session {
                Some(session) => session.clone(),
                None => self.authenticate().await?,
            };

            match self.ctx.remote.query(&session, request).await {
                Ok(page) => return Ok(Some(page)),
                Err(RemoteFault::Timeout) => match guard.record_attempt() {
                    Some(delay) => {
                        warn!(
                            attempt = guard.attempt(),
                            max_retries = guard.max_retries(),
                            "Timeout caught, retrying request"
                        );
                        self.summary.retries += 1;
                        metrics::counter!(metric_names::REQUESTS_RETRIED).increment(1);
                        tokio::time::sleep(delay).await;
                    }
                    None => {
                        error!(
                            retries = guard.max_retries(),
                            "Retried more than {} times, giving up",
                            guard.max_retries()
                        );
                        return Err(ConnectorError::Timeout(format!(
                            "{} timed out after {} retries",
                            request.operation,
                            guard.max_retries()
                        )));
                    }
                },
                Err(RemoteFault::SessionExpired { code }) => {
                    warn!(code, "Got signed out - logging in again and retrying");
                    guard.reset();
                    self.session = None;
                    self.authenticate().await?;
                    self.summary.reauthentications += 1;
                    metrics::counter!(metric_names::SESSION_REAUTHENTICATED).increment(1);
                }
                Err(RemoteFault::EndOfResults { .. }) => return Ok(None),
                Err(fault) => {
                    error!(%fault, operation = %request.operation, "Unrecoverable fault");
                    return Err(fault.into());
                }
            }
        }
    }

    async fn authenticate(&mut self) -> ConnectorResult<Session> {
        info!("Logging in");
        let session = self
            .ctx
            .remote
            .authenticate(&self.ctx.credential)
            .await
            .inspect_err(|e| error!(error = %e, "Login failed!"))?;
        self.session = Some(session.clone());
        Ok(session)
    }

    async fn emit(&mut self, record: Record) -> ConnectorResult<()> {
        let record = self.strategy.map_record(record);
        let mut projected = project(&record, &self.selection);
        if self.strategy.synthesizes_identity() {
            let id = synthetic_identity(&projected);
            projected.insert("id".to_string(), Value::String(id));
        }

        self.ctx
            .sink
            .write_record(&self.entry.stream, projected, &self.time_extracted)
            .await?;
        self.summary.records += 1;
        metrics::counter!(metric_names::RECORDS_EMITTED).increment(1);
        Ok(())
    }
}
