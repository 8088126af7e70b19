//! Registry client used by services to publish leases and by callers to
//! resolve them.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::directory::Directory;
use crate::error::{RegistryError, Result};

/// Default lease time-to-live.
pub const DEFAULT_LEASE_TTL: Duration = Duration::from_secs(13);

/// Default refresh period, leaving room for one missed refresh.
pub const DEFAULT_LEASE_REFRESH: Duration = Duration::from_secs(10);

/// Default bound on a single directory call.
pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(1);

/// How long a registration lives and how often it is renewed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LeaseConfig {
    pub ttl: Duration,
    pub refresh: Duration,
}

impl LeaseConfig {
    /// Builds a lease that refreshes at 70% of `ttl`.
    pub fn from_ttl(ttl: Duration) -> Self {
        Self {
            ttl,
            refresh: ttl.mul_f64(0.7),
        }
    }
}

impl Default for LeaseConfig {
    fn default() -> Self {
        Self {
            ttl: DEFAULT_LEASE_TTL,
            refresh: DEFAULT_LEASE_REFRESH,
        }
    }
}

/// A resolved registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceRecord {
    pub name: String,
    pub address: String,
    pub expires_at: Instant,
}

/// Client over a shared [`Directory`].
///
/// Cheap to clone; every directory call is bounded by `call_timeout`.
#[derive(Clone)]
pub struct RegistryClient {
    directory: Arc<dyn Directory>,
    call_timeout: Duration,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("call_timeout", &self.call_timeout)
            .finish_non_exhaustive()
    }
}

impl RegistryClient {
    /// Creates a client with the default call timeout.
    pub fn new(directory: Arc<dyn Directory>) -> Self {
        Self {
            directory,
            call_timeout: DEFAULT_CALL_TIMEOUT,
        }
    }

    /// Overrides the per-call timeout.
    pub fn with_call_timeout(mut self, call_timeout: Duration) -> Self {
        self.call_timeout = call_timeout;
        self
    }

    /// Publishes (or refreshes) `name -> address` for `ttl`.
    ///
    /// Idempotent; the caller must re-register before `ttl` elapses.
    #[tracing::instrument(skip(self), level = "debug")]
    pub async fn register(&self, name: &str, address: &str, ttl: Duration) -> Result<()> {
        if ttl.is_zero() {
            return Err(RegistryError::InvalidLease {
                name: name.to_string(),
            });
        }
        self.bounded("register", self.directory.set(name, address, ttl))
            .await
    }

    /// Returns the live registration for `name`.
    pub async fn lookup(&self, name: &str) -> Result<ServiceRecord> {
        let entry = self.bounded("resolve", self.directory.get(name)).await?;

        match entry {
            Some(entry) => Ok(ServiceRecord {
                name: name.to_string(),
                address: entry.value,
                expires_at: entry.expires_at,
            }),
            None => {
                metrics::counter!("registry_resolve_failures_total").increment(1);
                tracing::warn!(service = name, "no live registration");
                Err(RegistryError::ServiceUnavailable {
                    name: name.to_string(),
                })
            }
        }
    }

    /// Resolves `name` to the address of a live instance.
    pub async fn resolve(&self, name: &str) -> Result<String> {
        self.lookup(name).await.map(|record| record.address)
    }

    async fn bounded<T>(
        &self,
        operation: &'static str,
        call: impl Future<Output = Result<T>>,
    ) -> Result<T> {
        match tokio::time::timeout(self.call_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(RegistryError::Timeout {
                operation,
                elapsed: self.call_timeout,
            }),
        }
    }
}
