//! bronto-connect - incremental sync connector for the Bronto marketing API
//!
//! Pulls contacts, lists, recent inbound/outbound activity and unsubscribes
//! and emits them as schema-tagged records plus a resumable checkpoint.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────┐   ┌────────────────┐   ┌────────────┐   ┌──────────┐
//! │ Catalog  │──▶│ StreamRegistry │──▶│ SyncEngine │──▶│   Sink   │
//! └──────────┘   └────────────────┘   └─────┬──────┘   └──────────┘
//!                                           │  ▲
//!                                  query    ▼  │ pages / faults
//!                                     ┌────────────┐   ┌─────────────────┐
//!                                     │ RemoteApi  │   │ CheckpointStore │
//!                                     └────────────┘   └─────────────────┘
//! ```
//!
//! The wire client is not part of this crate: embedders provide a
//! [`RemoteApi`] implementation and hand it to a [`TapRunner`].
//!
//! ```rust,ignore
//! use bronto_connect::prelude::*;
//!
//! let ctx = SyncContext::new(remote, Arc::new(StdoutSink::new()), store, Arc::new(SystemClock), token)
//!     .with_settings(config.engine_settings()?);
//! let mut runner = TapRunner::new(catalog, create_stream_registry(), ctx);
//! runner.run().await?;
//! ```

pub mod config;
pub mod error;
pub mod runner;
pub mod session;
pub mod streams;
pub mod sync;
pub mod traits;
pub mod types;

pub use types::SensitiveString;

pub use config::{ConnectConfig, RetrySettings};
pub use error::{ConnectError, ConnectorError, ConnectorResult, Result, StreamStatus};
pub use runner::{StreamReport, TapRunner};
pub use session::{QueryRequest, RemoteApi, RemoteFault, Session};
pub use streams::{create_stream_registry, StreamStrategy};
pub use sync::{EngineSettings, SyncContext, SyncEngine, SyncSummary, SystemClock};
pub use traits::{
    Catalog, CatalogEntry, CheckpointStore, Message, Sink, State, StdoutSink, StreamRegistry,
};

/// Testing utilities
pub mod testing {
    pub use crate::traits::testing::*;
}

/// Prelude for embedding the connector
pub mod prelude {
    pub use crate::config::ConnectConfig;
    pub use crate::error::{ConnectError, ConnectorError, ConnectorResult};
    pub use crate::runner::TapRunner;
    pub use crate::session::{
        Filter, Operation, Page, PageCursor, QueryRequest, RemoteApi, RemoteFault, Session,
    };
    pub use crate::streams::create_stream_registry;
    pub use crate::sync::{Clock, SyncContext, SystemClock};
    pub use crate::traits::{
        Catalog, CheckpointStore, FieldValue, Record, Sink, State, StdoutSink,
    };
    pub use crate::types::SensitiveString;
    pub use async_trait::async_trait;
    pub use std::sync::Arc;
}
