//! Recent inbound and outbound activity
//!
//! The API keeps 30 days of activity and pages through it with a server-side
//! read cursor. Activities have no key of their own, so each record gets a
//! synthetic `id`.

use super::{Incremental, Pagination, StreamStrategy};
use crate::session::{Filter, Operation};
use crate::sync::window::{RetentionPolicy, TimeWindow};
use chrono::{DateTime, Duration, Utc};

pub const INBOUND_TABLE: &str = "inbound_activity";
pub const OUTBOUND_TABLE: &str = "outbound_activity";
pub const REPLICATION_KEY: &str = "createdDate";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy)]
pub struct ActivityStream {
    direction: Direction,
}

impl ActivityStream {
    pub fn inbound() -> Self {
        Self {
            direction: Direction::Inbound,
        }
    }

    pub fn outbound() -> Self {
        Self {
            direction: Direction::Outbound,
        }
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }
}

impl StreamStrategy for ActivityStream {
    fn table(&self) -> &'static str {
        match self.direction {
            Direction::Inbound => INBOUND_TABLE,
            Direction::Outbound => OUTBOUND_TABLE,
        }
    }

    fn operation(&self) -> Operation {
        match self.direction {
            Direction::Inbound => Operation::ReadRecentInboundActivities,
            Direction::Outbound => Operation::ReadRecentOutboundActivities,
        }
    }

    fn incremental(&self) -> Option<Incremental> {
        Some(Incremental {
            replication_key: REPLICATION_KEY,
            interval: Duration::hours(1),
        })
    }

    fn pagination(&self) -> Pagination {
        Pagination::ReadDirection
    }

    fn retention(&self) -> Option<RetentionPolicy> {
        Some(RetentionPolicy::recent_activity())
    }

    fn filter(&self, window: Option<&TimeWindow>, page_size: u32) -> Filter {
        let (start, end) = match window {
            Some(w) => (w.start, w.end),
            None => (DateTime::<Utc>::MIN_UTC, DateTime::<Utc>::MAX_UTC),
        };
        Filter::RecentActivity {
            start,
            end,
            size: page_size,
        }
    }

    fn synthesizes_identity(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_directions() {
        let inbound = ActivityStream::inbound();
        let outbound = ActivityStream::outbound();
        assert_eq!(inbound.table(), "inbound_activity");
        assert_eq!(outbound.table(), "outbound_activity");
        assert_eq!(inbound.operation(), Operation::ReadRecentInboundActivities);
        assert_eq!(outbound.operation(), Operation::ReadRecentOutboundActivities);
        assert_eq!(outbound.direction(), Direction::Outbound);
    }

    #[test]
    fn test_hourly_windows_with_retention() {
        let stream = ActivityStream::inbound();
        let incremental = stream.incremental().unwrap();
        assert_eq!(incremental.interval, Duration::hours(1));
        assert_eq!(incremental.replication_key, "createdDate");
        assert_eq!(stream.pagination(), Pagination::ReadDirection);
        assert_eq!(stream.retention(), Some(RetentionPolicy::recent_activity()));
        assert!(stream.synthesizes_identity());
    }

    #[test]
    fn test_filter_carries_page_size() {
        let start = Utc.with_ymd_and_hms(2020, 6, 1, 13, 0, 0).unwrap();
        let window = TimeWindow::new(start, Duration::hours(1));
        assert_eq!(
            ActivityStream::outbound().filter(Some(&window), 5000),
            Filter::RecentActivity {
                start,
                end: start + Duration::hours(1),
                size: 5000
            }
        );
    }
}
