//! Bootstrap for one service instance: listen, then keep a lease alive.

use registry::{Heartbeat, LeaseConfig, RegistryClient};

use crate::network::{LocalNetwork, ServiceHandle, ServiceKind};

/// A running service instance.
///
/// Binds its handle on the network and registers `kind.name() -> address`
/// through a [`Heartbeat`] for as long as it lives. The service is listening
/// and resolvable once [`ServiceHost::start`] returns.
#[derive(Debug)]
pub struct ServiceHost {
    kind: ServiceKind,
    address: String,
    network: LocalNetwork,
    heartbeat: Heartbeat,
}

impl ServiceHost {
    /// Starts serving `handle` at `address`, registers it and begins
    /// heartbeating.
    ///
    /// If the first registration fails the address is unbound again and the
    /// error is returned.
    pub async fn start(
        network: LocalNetwork,
        registry: RegistryClient,
        address: impl Into<String>,
        handle: ServiceHandle,
        lease: LeaseConfig,
    ) -> registry::Result<Self> {
        let kind = handle.kind();
        let address = address.into();

        network.bind(address.clone(), handle).await;
        let heartbeat =
            match Heartbeat::start(registry, kind.name(), address.clone(), lease).await {
                Ok(heartbeat) => heartbeat,
                Err(error) => {
                    network.unbind(&address).await;
                    tracing::error!(service = %kind, %address, %error, "service registration failed");
                    return Err(error);
                }
            };

        tracing::info!(service = %kind, %address, "service started");
        Ok(Self {
            kind,
            address,
            network,
            heartbeat,
        })
    }

    /// The kind of service hosted.
    pub fn kind(&self) -> ServiceKind {
        self.kind
    }

    /// The address the service listens on.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Stops listening and heartbeating, as a crashed instance would.
    ///
    /// The registry keeps pointing at the dead address until the lease lapses.
    pub async fn stop(self) {
        self.heartbeat.stop();
        self.network.unbind(&self.address).await;
        tracing::info!(service = %self.kind, address = %self.address, "service stopped");
    }
}
