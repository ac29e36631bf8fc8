//! Metric names
//!
//! Counters go through the `metrics` facade. Nothing is exported unless the
//! embedding application installs a recorder.

pub mod metric_names {
    /// Records emitted to the sink
    pub const RECORDS_EMITTED: &str = "bronto.records.emitted";
    /// Pages fetched from the remote API
    pub const PAGES_FETCHED: &str = "bronto.pages.fetched";
    /// Requests retried after a timeout
    pub const REQUESTS_RETRIED: &str = "bronto.requests.retried";
    /// Logins after the session expired
    pub const SESSION_REAUTHENTICATED: &str = "bronto.session.reauthenticated";
    /// Checkpoints merged and persisted
    pub const CHECKPOINTS_COMMITTED: &str = "bronto.checkpoints.committed";
}
