//! Sink contract for emitted messages

use super::event::Message;
use super::state::State;
use crate::error::{ConnectorError, ConnectorResult};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::io::Write;

/// Destination for schema, record and state messages.
///
/// Only [`Sink::write_message`] is required; the typed helpers build the
/// message and forward it.
#[async_trait]
pub trait Sink: Send + Sync {
    async fn write_message(&self, message: Message) -> ConnectorResult<()>;

    /// Announce a stream's schema. Called once per stream before its records.
    async fn write_schema(
        &self,
        stream: &str,
        schema: &Value,
        key_properties: &[String],
    ) -> ConnectorResult<()> {
        self.write_message(Message::schema(
            stream,
            schema.clone(),
            key_properties.to_vec(),
        ))
        .await
    }

    async fn write_record(
        &self,
        stream: &str,
        record: Map<String, Value>,
        time_extracted: &str,
    ) -> ConnectorResult<()> {
        self.write_message(Message::record(stream, record).with_time_extracted(time_extracted))
            .await
    }

    async fn write_records(
        &self,
        stream: &str,
        records: Vec<Map<String, Value>>,
    ) -> ConnectorResult<()> {
        for record in records {
            self.write_message(Message::record(stream, record)).await?;
        }
        Ok(())
    }

    async fn write_state(&self, state: &State) -> ConnectorResult<()> {
        self.write_message(Message::state(state.clone())).await
    }
}

/// Writes one JSON message per line to stdout, flushing after each state.
#[derive(Debug, Default)]
pub struct StdoutSink;

impl StdoutSink {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Sink for StdoutSink {
    async fn write_message(&self, message: Message) -> ConnectorResult<()> {
        let line = serde_json::to_string(&message)?;
        let stdout = std::io::stdout();
        let mut out = stdout.lock();
        writeln!(out, "{}", line).map_err(|e| ConnectorError::sink(e.to_string()))?;
        if message.is_state() {
            out.flush().map_err(|e| ConnectorError::sink(e.to_string()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::testing::MockSink;
    use serde_json::json;

    #[tokio::test]
    async fn test_default_helpers_forward_messages() {
        let sink = MockSink::new();
        sink.write_schema("list", &json!({"type": "object"}), &["id".to_string()])
            .await
            .unwrap();

        let mut record = Map::new();
        record.insert("id".into(), json!("1"));
        sink.write_records("list", vec![record.clone(), record])
            .await
            .unwrap();
        sink.write_state(&State::new()).await.unwrap();

        let messages = sink.messages();
        assert_eq!(messages.len(), 4);
        assert!(matches!(messages[0], Message::Schema { .. }));
        assert!(messages[1].is_record());
        assert!(messages[3].is_state());
    }

    #[tokio::test]
    async fn test_stdout_sink_writes() {
        let sink = StdoutSink::new();
        sink.write_state(&State::new()).await.unwrap();
    }
}
