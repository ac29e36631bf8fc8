//! Remote API contract
//!
//! The sync engine never speaks the wire protocol itself. It drives an
//! implementation of [`RemoteApi`], which owns the authentication handshake
//! and request marshaling, and reports failures as a tagged [`RemoteFault`]
//! so the pagination loop can tell retryable faults from fatal ones without
//! inspecting message text.

use crate::error::ConnectorResult;
use crate::traits::record::Record;
use crate::types::SensitiveString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Fault code the API embeds when the session has been signed out.
pub const SESSION_EXPIRED_CODE: u32 = 103;

/// Fault code the recent-activity operations use instead of an empty page.
pub const END_OF_RESULTS_CODE: u32 = 116;

/// Largest page the API will return.
pub const MAX_PAGE_SIZE: u32 = 5000;

/// Authenticated handle to the remote API.
///
/// A session is a plain value owned by one engine. Re-authentication yields a
/// new `Session` that replaces the old one.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    id: String,
}

impl Session {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    pub fn id(&self) -> &str {
        &self.id
    }
}

/// Read operations exposed by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum Operation {
    ReadContacts,
    ReadLists,
    ReadRecentInboundActivities,
    ReadRecentOutboundActivities,
    ReadUnsubscribes,
}

impl Operation {
    /// Name of the operation on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReadContacts => "readContacts",
            Self::ReadLists => "readLists",
            Self::ReadRecentInboundActivities => "readRecentInboundActivities",
            Self::ReadRecentOutboundActivities => "readRecentOutboundActivities",
            Self::ReadUnsubscribes => "readUnsubscribes",
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Comparison used by a contact date condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum DateOperator {
    AfterOrSameDay,
    Before,
}

/// A single `dateValue` condition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateCondition {
    pub operator: DateOperator,
    pub value: DateTime<Utc>,
}

/// Filter sent with a query. Each stream builds its own shape.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Filter {
    /// No filtering (lists)
    All,
    /// `contactFilter` of type AND over the `modified` field
    ContactModified { conditions: Vec<DateCondition> },
    /// `recent{Inbound,Outbound}ActivitySearchRequest`
    RecentActivity {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        size: u32,
    },
    /// `unsubscribeFilter`
    Unsubscribe {
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    },
}

/// Read direction marker for the recent-activity operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ReadDirection {
    First,
    Next,
}

/// Position within a window's result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum PageCursor {
    /// 1-based page number
    Number(u32),
    /// Server-side cursor advanced by read direction
    Direction(ReadDirection),
}

impl PageCursor {
    /// Cursor for the page following this one
    pub fn next(self) -> Self {
        match self {
            Self::Number(n) => Self::Number(n + 1),
            Self::Direction(_) => Self::Direction(ReadDirection::Next),
        }
    }
}

/// Optional contact field groups that must be requested explicitly.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ContactInclusion {
    pub lists: bool,
    pub sms_keywords: bool,
    pub geo_ip: bool,
    pub technology: bool,
    pub rfm: bool,
    pub engagement: bool,
}

/// A single page request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryRequest {
    pub operation: Operation,
    pub filter: Filter,
    pub cursor: PageCursor,
    pub page_size: u32,
    pub inclusion: ContactInclusion,
}

/// Records returned by one page request
pub type Page = Vec<Record>;

/// Faults raised by [`RemoteApi::query`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RemoteFault {
    /// Network timeout; the same request may be retried
    #[error("request timed out")]
    Timeout,

    /// Session was signed out; re-authenticate and retry the same request
    #[error("session expired (fault {code})")]
    SessionExpired { code: u32 },

    /// No more results in the requested range
    #[error("end of results (fault {code})")]
    EndOfResults { code: u32 },

    /// Anything else, never retried
    #[error("{}", describe_other(.code, .message))]
    Other { code: Option<u32>, message: String },
}

fn describe_other(code: &Option<u32>, message: &str) -> String {
    match code {
        Some(code) => format!("fault {}: {}", code, message),
        None => message.to_string(),
    }
}

impl RemoteFault {
    /// Classify a numeric fault code reported by the API.
    pub fn from_code(code: u32, message: impl Into<String>) -> Self {
        match code {
            SESSION_EXPIRED_CODE => Self::SessionExpired { code },
            END_OF_RESULTS_CODE => Self::EndOfResults { code },
            _ => Self::Other {
                code: Some(code),
                message: message.into(),
            },
        }
    }

    pub fn other(code: Option<u32>, message: impl Into<String>) -> Self {
        Self::Other {
            code,
            message: message.into(),
        }
    }
}

/// Capability surface of the remote API.
#[async_trait]
pub trait RemoteApi: Send + Sync {
    /// Log in with the configured token. Failure is fatal for the run.
    async fn authenticate(&self, credential: &SensitiveString) -> ConnectorResult<Session>;

    /// Issue one page request.
    async fn query(
        &self,
        session: &Session,
        request: &QueryRequest,
    ) -> std::result::Result<Page, RemoteFault>;
}
