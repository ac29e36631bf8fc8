//! Messages emitted to the downstream consumer

use super::state::State;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A message on the output stream.
///
/// Order matters to consumers: a stream's `SCHEMA` comes before any of its
/// `RECORD`s, and each `STATE` follows the records of the window it covers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "UPPERCASE")]
pub enum Message {
    Schema {
        stream: String,
        schema: Value,
        key_properties: Vec<String>,
    },
    Record {
        stream: String,
        record: Map<String, Value>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        time_extracted: Option<String>,
    },
    State {
        value: State,
    },
}

impl Message {
    pub fn schema(stream: impl Into<String>, schema: Value, key_properties: Vec<String>) -> Self {
        Self::Schema {
            stream: stream.into(),
            schema,
            key_properties,
        }
    }

    pub fn record(stream: impl Into<String>, record: Map<String, Value>) -> Self {
        Self::Record {
            stream: stream.into(),
            record,
            time_extracted: None,
        }
    }

    pub fn state(value: State) -> Self {
        Self::State { value }
    }

    /// Stamp the extraction time on a record (builder-style)
    pub fn with_time_extracted(mut self, ts: impl Into<String>) -> Self {
        if let Self::Record { time_extracted, .. } = &mut self {
            *time_extracted = Some(ts.into());
        }
        self
    }

    /// Stream this message belongs to; `None` for state
    pub fn stream(&self) -> Option<&str> {
        match self {
            Self::Schema { stream, .. } | Self::Record { stream, .. } => Some(stream),
            Self::State { .. } => None,
        }
    }

    pub fn is_record(&self) -> bool {
        matches!(self, Self::Record { .. })
    }

    pub fn is_state(&self) -> bool {
        matches!(self, Self::State { .. })
    }

    /// Record payload, if this is a record
    pub fn as_record(&self) -> Option<&Map<String, Value>> {
        match self {
            Self::Record { record, .. } => Some(record),
            _ => None,
        }
    }
}
