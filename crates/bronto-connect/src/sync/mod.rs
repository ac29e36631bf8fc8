//! Incremental sync engine and its building blocks

pub mod clock;
pub mod engine;
pub mod identity;
pub mod projector;
pub mod window;

pub use clock::{Clock, SystemClock};
pub use engine::{EngineSettings, SyncContext, SyncEngine, SyncSummary};
pub use identity::{synthetic_identity, IDENTITY_FIELDS};
pub use projector::{project, Selection};
pub use window::{resolve_start, windows, RetentionPolicy, TimeWindow};
