//! Time windows and start-date resolution

use crate::error::{ConnectorError, ConnectorResult};
use crate::traits::catalog::ReplicationMethod;
use crate::traits::record::{format_timestamp, parse_timestamp};
use chrono::{DateTime, Duration, Utc};
use std::fmt;
use tracing::{info, warn};

/// Half-open interval `[start, end)` fetched as one unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    pub fn new(start: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            start,
            end: start + interval,
        }
    }

    /// The window directly after this one, of the same length
    pub fn following(&self) -> Self {
        Self::new(self.end, self.end - self.start)
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts < self.end
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}, {})",
            format_timestamp(&self.start),
            format_timestamp(&self.end)
        )
    }
}

/// Consecutive windows from `start` while the window start is before `until`.
pub fn windows(
    start: DateTime<Utc>,
    until: DateTime<Utc>,
    interval: Duration,
) -> impl Iterator<Item = TimeWindow> {
    std::iter::successors(Some(TimeWindow::new(start, interval)), |w| {
        Some(w.following())
    })
    .take_while(move |w| w.start < until)
}

/// Bounded history on the remote side.
///
/// Start dates older than `retention` are moved up to the retention floor,
/// then every start is moved back by `rewind` so records that changed after
/// they were synced are picked up again. There is no second clamp after the
/// rewind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetentionPolicy {
    pub retention: Duration,
    pub rewind: Duration,
}

impl RetentionPolicy {
    /// Recent-activity retention: 30 days kept, 3 days re-read
    pub fn recent_activity() -> Self {
        Self {
            retention: Duration::days(30),
            rewind: Duration::days(3),
        }
    }

    pub fn apply(&self, start: DateTime<Utc>, now: DateTime<Utc>) -> DateTime<Utc> {
        let floor = now - self.retention;
        let start = if start < floor {
            warn!(
                requested = %format_timestamp(&start),
                floor = %format_timestamp(&floor),
                "Start date is before the retention window, using the earliest available date"
            );
            floor
        } else {
            start
        };
        info!(days = self.rewind.num_days(), "Rewinding start date, since activities can change");
        start - self.rewind
    }
}

/// Choose where a stream starts.
///
/// `FULL_TABLE` always starts at `default_start`. `INCREMENTAL` resumes from
/// the bookmark when one exists.
pub fn resolve_start(
    table: &str,
    method: ReplicationMethod,
    bookmark: Option<&str>,
    default_start: DateTime<Utc>,
) -> ConnectorResult<DateTime<Utc>> {
    info!(table, "Choosing start date");
    match (method, bookmark) {
        (ReplicationMethod::FullTable, _) => {
            info!(
                since = %format_timestamp(&default_start),
                "Using FULL_TABLE replication"
            );
            Ok(default_start)
        }
        (ReplicationMethod::Incremental, None) => {
            info!(
                since = %format_timestamp(&default_start),
                "Using INCREMENTAL replication, but no state entry found. Performing full sync"
            );
            Ok(default_start)
        }
        (ReplicationMethod::Incremental, Some(value)) => {
            let start = parse_timestamp(value).ok_or_else(|| {
                ConnectorError::state(format!(
                    "bookmark for {} is not a timestamp: {}",
                    table, value
                ))
            })?;
            info!(bookmark = value, "Using INCREMENTAL replication from last state entry");
            Ok(start)
        }
    }
}
