//! Unsubscribe events, windowed on `created`

use super::{Incremental, StreamStrategy};
use crate::session::{Filter, Operation};
use crate::sync::window::TimeWindow;
use chrono::{DateTime, Duration, Utc};

pub const TABLE: &str = "unsubscribe";
pub const REPLICATION_KEY: &str = "created";

#[derive(Debug, Clone, Copy, Default)]
pub struct UnsubscribeStream;

impl StreamStrategy for UnsubscribeStream {
    fn table(&self) -> &'static str {
        TABLE
    }

    fn operation(&self) -> Operation {
        Operation::ReadUnsubscribes
    }

    fn incremental(&self) -> Option<Incremental> {
        Some(Incremental {
            replication_key: REPLICATION_KEY,
            interval: Duration::hours(6),
        })
    }

    fn filter(&self, window: Option<&TimeWindow>, _page_size: u32) -> Filter {
        let (start, end) = match window {
            Some(w) => (w.start, w.end),
            None => (DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC),
        };
        Filter::Unsubscribe { start, end }
    }
}
