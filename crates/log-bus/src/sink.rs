//! Destinations for published log events.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{LogBusError, Result};
use crate::event::LogEvent;

/// Receives events from the publisher's forwarding task.
#[async_trait]
pub trait LogSink: Send + Sync {
    /// Delivers one event on `topic`.
    async fn publish(&self, topic: &str, event: &LogEvent) -> Result<()>;
}

#[derive(Debug, Default)]
struct InMemoryLogSinkState {
    events: Vec<(String, LogEvent)>,
    fail_on_publish: bool,
}

/// In-memory sink for testing.
#[derive(Debug, Clone, Default)]
pub struct InMemoryLogSink {
    state: Arc<RwLock<InMemoryLogSinkState>>,
}

impl InMemoryLogSink {
    /// Creates an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Configures the sink to reject every event.
    pub async fn set_fail_on_publish(&self, fail: bool) {
        self.state.write().await.fail_on_publish = fail;
    }

    /// Returns the delivered events in arrival order.
    pub async fn events(&self) -> Vec<LogEvent> {
        self.state
            .read()
            .await
            .events
            .iter()
            .map(|(_, event)| event.clone())
            .collect()
    }

    /// Returns the topics events were delivered on, in arrival order.
    pub async fn topics(&self) -> Vec<String> {
        self.state
            .read()
            .await
            .events
            .iter()
            .map(|(topic, _)| topic.clone())
            .collect()
    }

    /// Returns the delivered events whose subject matches.
    pub async fn events_for(&self, subject: &str) -> Vec<LogEvent> {
        self.events()
            .await
            .into_iter()
            .filter(|event| event.subject == subject)
            .collect()
    }
}

#[async_trait]
impl LogSink for InMemoryLogSink {
    async fn publish(&self, topic: &str, event: &LogEvent) -> Result<()> {
        let mut state = self.state.write().await;
        if state.fail_on_publish {
            return Err(LogBusError::Sink("sink unavailable".to_string()));
        }
        state.events.push((topic.to_string(), event.clone()));
        Ok(())
    }
}

/// Sink that writes each event through `tracing` as its JSON wire form.
///
/// Stands in for a log observer when no external bus is wired.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingLogSink;

impl TracingLogSink {
    /// Renders an event the way an external observer would receive it.
    pub fn render(event: &LogEvent) -> Result<String> {
        let bytes = event.to_json()?;
        String::from_utf8(bytes).map_err(|e| LogBusError::Sink(e.to_string()))
    }
}

#[async_trait]
impl LogSink for TracingLogSink {
    async fn publish(&self, topic: &str, event: &LogEvent) -> Result<()> {
        let payload = Self::render(event)?;
        tracing::info!(
            target: "log_bus",
            topic,
            subject = %event.subject,
            %payload,
            "{}",
            event.message
        );
        Ok(())
    }
}
