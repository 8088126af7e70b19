//! Log event wire format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Well-known topic every log event is published to.
pub const LOG_TOPIC: &str = "log";

/// A write-once audit record.
///
/// `subject` names the originating operation, e.g. `Orchestrator.run_scenario`
/// or `payment.pay`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogEvent {
    pub message: String,
    pub subject: String,
    pub timestamp: DateTime<Utc>,
}

impl LogEvent {
    /// Creates an event stamped with the current time.
    pub fn new(subject: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            subject: subject.into(),
            timestamp: Utc::now(),
        }
    }

    /// Encodes the event as JSON.
    pub fn to_json(&self) -> crate::Result<Vec<u8>> {
        Ok(serde_json::to_vec(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_shape() {
        let event = LogEvent::new("Client.Scenarios", "run scenario: s1");
        let json: serde_json::Value = serde_json::from_slice(&event.to_json().unwrap()).unwrap();

        assert_eq!(json["message"], "run scenario: s1");
        assert_eq!(json["subject"], "Client.Scenarios");
        assert!(json["timestamp"].as_str().is_some());
    }
}
