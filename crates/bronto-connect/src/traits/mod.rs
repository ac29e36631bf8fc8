//! Core connector traits and types
//!
//! - `Sink` - where schema, record and state messages go
//! - `Catalog` - which streams and fields to sync
//! - `State` / `CheckpointStore` - resumable checkpoints
//! - `StreamRegistry` - stream name to strategy lookup
//! - `retry` - timeout retry policy
//! - `testing` - mock remote, sink and clock

pub mod catalog;
pub mod event;
pub mod metrics;
pub mod record;
pub mod registry;
pub mod retry;
pub mod sink;
pub mod state;
pub mod testing;

pub use catalog::{Catalog, CatalogEntry, MetadataEntry, ReplicationMethod};
pub use event::Message;
pub use metrics::metric_names;
pub use record::{format_timestamp, parse_timestamp, FieldValue, Record};
pub use registry::{StreamFactory, StreamRegistry};
pub use retry::{RetryConfig, RetryGuard};
pub use sink::{Sink, StdoutSink};
pub use state::{CheckpointStore, State};
