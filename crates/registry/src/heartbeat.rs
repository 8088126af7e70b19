//! Background lease renewal.

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use crate::client::{LeaseConfig, RegistryClient};
use crate::error::{RegistryError, Result};

/// A running lease-renewal task for one service instance.
///
/// [`Heartbeat::start`] registers before returning, then re-registers every
/// `lease.refresh`. A failed refresh is logged and retried on the next tick;
/// the task runs until the process exits or [`Heartbeat::stop`] is called.
#[derive(Debug)]
pub struct Heartbeat {
    name: String,
    handle: JoinHandle<()>,
}

impl Heartbeat {
    /// Registers `name -> address`, then spawns the renewal loop on the
    /// current tokio runtime.
    ///
    /// The service is resolvable as soon as this returns. A failed first
    /// registration is returned and no task is spawned.
    pub async fn start(
        registry: RegistryClient,
        name: impl Into<String>,
        address: impl Into<String>,
        lease: LeaseConfig,
    ) -> Result<Self> {
        let name = name.into();
        let address = address.into();
        if lease.refresh.is_zero() {
            return Err(RegistryError::InvalidLease { name });
        }

        registry.register(&name, &address, lease.ttl).await?;
        metrics::counter!("registry_heartbeats_total").increment(1);
        tracing::debug!(service = %name, %address, "registered service");

        let task_name = name.clone();
        let handle = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(Instant::now() + lease.refresh, lease.refresh);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                ticker.tick().await;
                match registry.register(&task_name, &address, lease.ttl).await {
                    Ok(()) => {
                        metrics::counter!("registry_heartbeats_total").increment(1);
                        tracing::debug!(service = %task_name, %address, "lease refreshed");
                    }
                    Err(e) => {
                        tracing::warn!(service = %task_name, error = %e, "lease refresh failed");
                    }
                }
            }
        });

        Ok(Self { name, handle })
    }

    /// The service name this heartbeat keeps alive.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns true once the task has stopped.
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Stops renewing; the registration lapses when its lease expires.
    pub fn stop(self) {
        self.handle.abort();
    }
}
