//! Service discovery with lease expiry.
//!
//! Every domain service publishes `name -> address` into a shared key-value
//! [`Directory`] with a short time-to-live and keeps re-publishing it from a
//! background [`Heartbeat`]. Callers resolve a name on demand through the
//! [`RegistryClient`]; a lapsed lease is indistinguishable from a service that
//! never registered.

pub mod client;
pub mod directory;
pub mod error;
pub mod heartbeat;

pub use client::{LeaseConfig, RegistryClient, ServiceRecord};
pub use directory::{Directory, DirectoryEntry, InMemoryDirectory};
pub use error::{RegistryError, Result};
pub use heartbeat::Heartbeat;
