//! Side-channel event log.
//!
//! Publishing is best-effort: [`LogPublisher::publish`] never blocks and never
//! fails the caller. Events are handed to a background task over a bounded
//! channel and forwarded to a [`LogSink`]; anything that cannot be delivered
//! is reported through `tracing` and dropped.

pub mod error;
pub mod event;
pub mod publisher;
pub mod sink;

pub use error::{LogBusError, Result};
pub use event::{LOG_TOPIC, LogEvent};
pub use publisher::LogPublisher;
pub use sink::{InMemoryLogSink, LogSink, TracingLogSink};
