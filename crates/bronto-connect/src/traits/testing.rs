//! Testing utilities
//!
//! Mock collaborators for exercising the sync engine without a network:
//! a scripted [`MockRemote`], a capturing [`MockSink`] and a settable
//! [`FixedClock`].
//!
//! # Example
//!
//! ```rust,ignore
//! use bronto_connect::testing::*;
//!
//! let remote = MockRemote::new()
//!     .with_response(Ok(vec![record]))
//!     .with_response(Err(RemoteFault::Timeout));
//! let sink = MockSink::new();
//! // build a SyncContext from Arc::new(remote.clone()), Arc::new(sink.clone()) ...
//! assert_eq!(remote.requests().len(), 3);
//! ```

use super::event::Message;
use super::sink::Sink;
use super::state::State;
use crate::error::{ConnectorError, ConnectorResult};
use crate::session::{Page, QueryRequest, RemoteApi, RemoteFault, Session};
use crate::sync::clock::Clock;
use crate::types::SensitiveString;
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;

// ============================================================================
// Mock Remote
// ============================================================================

type Responder = Box<dyn FnMut(&QueryRequest) -> Result<Page, RemoteFault> + Send>;

/// A scripted remote API.
///
/// Queued responses are served first, in order. Once the queue is empty the
/// responder (if any) answers, otherwise every query returns an empty page.
#[derive(Clone, Default)]
pub struct MockRemote {
    responses: Arc<Mutex<VecDeque<Result<Page, RemoteFault>>>>,
    responder: Arc<Mutex<Option<Responder>>>,
    requests: Arc<Mutex<Vec<(String, QueryRequest)>>>,
    logins: Arc<Mutex<u32>>,
    auth_failure: Arc<Mutex<Option<String>>>,
}

impl MockRemote {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one response
    pub fn with_response(self, response: Result<Page, RemoteFault>) -> Self {
        self.responses.lock().push_back(response);
        self
    }

    /// Queue several responses
    pub fn with_responses(
        self,
        responses: impl IntoIterator<Item = Result<Page, RemoteFault>>,
    ) -> Self {
        self.responses.lock().extend(responses);
        self
    }

    /// Answer queries once the queue is drained
    pub fn with_responder<F>(self, responder: F) -> Self
    where
        F: FnMut(&QueryRequest) -> Result<Page, RemoteFault> + Send + 'static,
    {
        *self.responder.lock() = Some(Box::new(responder));
        self
    }

    /// Make `authenticate` fail
    pub fn fail_auth(self, message: impl Into<String>) -> Self {
        *self.auth_failure.lock() = Some(message.into());
        self
    }

    /// Every request received, in order
    pub fn requests(&self) -> Vec<QueryRequest> {
        self.requests.lock().iter().map(|(_, r)| r.clone()).collect()
    }

    /// Session id each request was sent with
    pub fn sessions_used(&self) -> Vec<String> {
        self.requests.lock().iter().map(|(s, _)| s.clone()).collect()
    }

    pub fn login_count(&self) -> u32 {
        *self.logins.lock()
    }
}

#[async_trait]
impl RemoteApi for MockRemote {
    async fn authenticate(&self, credential: &SensitiveString) -> ConnectorResult<Session> {
        if let Some(message) = self.auth_failure.lock().clone() {
            return Err(ConnectorError::auth(message));
        }
        if credential.is_empty() {
            return Err(ConnectorError::auth("empty token"));
        }
        let mut logins = self.logins.lock();
        *logins += 1;
        Ok(Session::new(format!("session-{}", *logins)))
    }

    async fn query(&self, session: &Session, request: &QueryRequest) -> Result<Page, RemoteFault> {
        self.requests
            .lock()
            .push((session.id().to_string(), request.clone()));

        if let Some(response) = self.responses.lock().pop_front() {
            return response;
        }
        match self.responder.lock().as_mut() {
            Some(responder) => responder(request),
            None => Ok(Vec::new()),
        }
    }
}

// ============================================================================
// Mock Sink
// ============================================================================

/// Captures every message written to it
#[derive(Debug, Clone, Default)]
pub struct MockSink {
    messages: Arc<Mutex<Vec<Message>>>,
    fail_message: Arc<Mutex<Option<String>>>,
}

impl MockSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reject every write
    pub fn fail_with(self, message: impl Into<String>) -> Self {
        *self.fail_message.lock() = Some(message.into());
        self
    }

    pub fn messages(&self) -> Vec<Message> {
        self.messages.lock().clone()
    }

    /// Record payloads written for `stream`
    pub fn records(&self, stream: &str) -> Vec<Map<String, Value>> {
        self.messages
            .lock()
            .iter()
            .filter(|m| m.stream() == Some(stream))
            .filter_map(|m| m.as_record().cloned())
            .collect()
    }

    pub fn states(&self) -> Vec<State> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                Message::State { value } => Some(value.clone()),
                _ => None,
            })
            .collect()
    }

    /// Streams whose schema was written, in order
    pub fn schemas(&self) -> Vec<String> {
        self.messages
            .lock()
            .iter()
            .filter_map(|m| match m {
                Message::Schema { stream, .. } => Some(stream.clone()),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&self) {
        self.messages.lock().clear();
    }
}

#[async_trait]
impl Sink for MockSink {
    async fn write_message(&self, message: Message) -> ConnectorResult<()> {
        if let Some(reason) = self.fail_message.lock().clone() {
            return Err(ConnectorError::sink(reason));
        }
        self.messages.lock().push(message);
        Ok(())
    }
}

// ============================================================================
// Fixed Clock
// ============================================================================

/// A clock that only moves when told to
#[derive(Debug, Clone)]
pub struct FixedClock {
    now: Arc<Mutex<DateTime<Utc>>>,
}

impl FixedClock {
    pub fn new(now: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(Mutex::new(now)),
        }
    }

    pub fn set(&self, now: DateTime<Utc>) {
        *self.now.lock() = now;
    }

    pub fn advance(&self, by: Duration) {
        *self.now.lock() += by;
    }
}

impl Clock for FixedClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.lock()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::{ContactInclusion, Filter, Operation, PageCursor};
    use chrono::TimeZone;

    fn request() -> QueryRequest {
        QueryRequest {
            operation: Operation::ReadLists,
            filter: Filter::All,
            cursor: PageCursor::Number(1),
            page_size: 5000,
            inclusion: ContactInclusion::default(),
        }
    }

    #[tokio::test]
    async fn test_mock_remote_scripted_then_empty() {
        let remote = MockRemote::new().with_response(Err(RemoteFault::Timeout));
        let session = remote
            .authenticate(&SensitiveString::new("token"))
            .await
            .unwrap();
        assert_eq!(session.id(), "session-1");

        assert_eq!(
            remote.query(&session, &request()).await,
            Err(RemoteFault::Timeout)
        );
        assert_eq!(remote.query(&session, &request()).await, Ok(Vec::new()));
        assert_eq!(remote.requests().len(), 2);
        assert_eq!(remote.sessions_used(), vec!["session-1", "session-1"]);
    }

    #[tokio::test]
    async fn test_mock_remote_auth_failure() {
        let remote = MockRemote::new().fail_auth("bad token");
        let err = remote
            .authenticate(&SensitiveString::new("token"))
            .await
            .unwrap_err();
        assert!(err.is_auth());
        assert_eq!(remote.login_count(), 0);
    }

    #[tokio::test]
    async fn test_mock_sink_failure() {
        let sink = MockSink::new().fail_with("disk full");
        assert!(matches!(
            sink.write_state(&State::new()).await,
            Err(ConnectorError::Sink(_))
        ));
        assert!(sink.messages().is_empty());
    }

    #[test]
    fn test_fixed_clock() {
        let clock = FixedClock::new(Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap());
        clock.advance(Duration::hours(6));
        assert_eq!(
            clock.now(),
            Utc.with_ymd_and_hms(2020, 1, 1, 6, 0, 0).unwrap()
        );
    }
}
