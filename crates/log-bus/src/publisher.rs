//! Non-blocking publisher backed by a forwarding task.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;

use crate::error::LogBusError;
use crate::event::{LOG_TOPIC, LogEvent};
use crate::sink::LogSink;

/// Default channel capacity between publishers and the forwarding task.
pub const DEFAULT_CAPACITY: usize = 256;

/// Handle for publishing log events; cheap to clone.
///
/// The forwarding task ends once every clone has been dropped and the
/// channel is drained.
#[derive(Debug, Clone)]
pub struct LogPublisher {
    tx: mpsc::Sender<LogEvent>,
}

impl LogPublisher {
    /// Spawns the forwarding task and returns a publisher plus the task handle.
    pub fn spawn(sink: Arc<dyn LogSink>, capacity: usize) -> (Self, JoinHandle<()>) {
        let (tx, mut rx) = mpsc::channel::<LogEvent>(capacity.max(1));

        let handle = tokio::spawn(async move {
            while let Some(event) = rx.recv().await {
                if let Err(e) = sink.publish(LOG_TOPIC, &event).await {
                    metrics::counter!("log_events_dropped_total").increment(1);
                    tracing::warn!(
                        error = %e,
                        subject = %event.subject,
                        "failed to deliver log event"
                    );
                }
            }
            tracing::debug!("log publisher stopped");
        });

        (Self { tx }, handle)
    }

    /// Publishes `event` without waiting.
    ///
    /// Delivery failures are logged locally and never returned.
    pub fn publish(&self, event: LogEvent) {
        let (error, event) = match self.tx.try_send(event) {
            Ok(()) => return,
            Err(TrySendError::Full(event)) => (LogBusError::ChannelFull, event),
            Err(TrySendError::Closed(event)) => (LogBusError::ChannelClosed, event),
        };

        metrics::counter!("log_events_dropped_total").increment(1);
        tracing::warn!(%error, subject = %event.subject, "log event dropped");
    }

    /// Shorthand for publishing a new event.
    pub fn log(&self, subject: impl Into<String>, message: impl Into<String>) {
        self.publish(LogEvent::new(subject, message));
    }
}
