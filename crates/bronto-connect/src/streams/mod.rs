//! Built-in streams
//!
//! Every stream is a [`StreamStrategy`]: a small set of parameters and hooks
//! that the shared [`SyncEngine`](crate::sync::SyncEngine) loop plugs in.
//!
//! | Table | Replication key | Window | Pagination |
//! |-------|-----------------|--------|------------|
//! | `contact` | `modified` | 6h | page number |
//! | `list` | - | - | page number |
//! | `inbound_activity` | `createdDate` | 1h | read direction |
//! | `outbound_activity` | `createdDate` | 1h | read direction |
//! | `unsubscribe` | `created` | 6h | page number |

pub mod activity;
pub mod contact;
pub mod list;
pub mod unsubscribe;

pub use activity::ActivityStream;
pub use contact::ContactStream;
pub use list::ListStream;
pub use unsubscribe::UnsubscribeStream;

use crate::session::{ContactInclusion, Filter, Operation, PageCursor, ReadDirection};
use crate::sync::projector::Selection;
use crate::sync::window::{RetentionPolicy, TimeWindow};
use crate::traits::record::Record;
use crate::traits::registry::StreamRegistry;
use chrono::Duration;

/// How a stream walks through the pages of one window
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pagination {
    /// `pageNumber` starting at 1
    PageNumber,
    /// `readDirection` of `FIRST`, then `NEXT`
    ReadDirection,
}

impl Pagination {
    pub fn first_cursor(&self) -> PageCursor {
        match self {
            Self::PageNumber => PageCursor::Number(1),
            Self::ReadDirection => PageCursor::Direction(ReadDirection::First),
        }
    }
}

/// Checkpointing parameters of an incremental stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Incremental {
    /// Key the checkpoint is stored under
    pub replication_key: &'static str,
    /// Width of each fetched window
    pub interval: Duration,
}

/// Per-stream behavior plugged into the sync engine.
pub trait StreamStrategy: Send + Sync + std::fmt::Debug {
    /// Table name; matches the catalog's `stream` and keys the checkpoint
    fn table(&self) -> &'static str;

    fn operation(&self) -> Operation;

    /// `None` for streams synced in a single unbounded pass
    fn incremental(&self) -> Option<Incremental>;

    fn pagination(&self) -> Pagination {
        Pagination::PageNumber
    }

    fn retention(&self) -> Option<RetentionPolicy> {
        None
    }

    /// Filter for one window (or for the whole stream when not incremental)
    fn filter(&self, window: Option<&TimeWindow>, page_size: u32) -> Filter;

    /// Optional field groups to request, given the selected fields
    fn inclusion(&self, _selection: &Selection) -> ContactInclusion {
        ContactInclusion::default()
    }

    /// Reshape a raw record before projection
    fn map_record(&self, record: Record) -> Record {
        record
    }

    /// Whether records get a synthetic `id`
    fn synthesizes_identity(&self) -> bool {
        false
    }
}

/// Registry with every built-in stream
pub fn create_stream_registry() -> StreamRegistry {
    let mut registry = StreamRegistry::new();
    registry.register(contact::TABLE, || Box::new(ContactStream));
    registry.register(list::TABLE, || Box::new(ListStream));
    registry.register(activity::INBOUND_TABLE, || Box::new(ActivityStream::inbound()));
    registry.register(activity::OUTBOUND_TABLE, || Box::new(ActivityStream::outbound()));
    registry.register(unsubscribe::TABLE, || Box::new(UnsubscribeStream));
    registry
}
