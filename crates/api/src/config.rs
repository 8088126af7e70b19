//! Application configuration loaded from environment variables.

use std::str::FromStr;
use std::time::Duration;

use registry::LeaseConfig;
use saga::OrchestratorConfig;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST`: bind address (default: `"0.0.0.0"`)
/// - `PORT`: listen port (default: `3000`)
/// - `RUST_LOG`: tracing filter directive (default: `"info"`)
/// - `LEASE_TTL_SECS`: registry lease lifetime (default: `13`)
/// - `LEASE_REFRESH_SECS`: heartbeat period (default: `10`)
/// - `CALL_TIMEOUT_MS`: bound on every remote call (default: `1000`)
/// - `LOG_CHANNEL_CAPACITY`: log-bus buffer size (default: `256`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub log_level: String,
    pub lease_ttl: Duration,
    pub lease_refresh: Duration,
    pub call_timeout: Duration,
    pub log_channel_capacity: usize,
}

fn env_or<T: FromStr>(name: &str, default: T) -> T {
    std::env::var(name)
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to defaults.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: env_or("PORT", defaults.port),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            lease_ttl: Duration::from_secs(env_or("LEASE_TTL_SECS", defaults.lease_ttl.as_secs())),
            lease_refresh: Duration::from_secs(env_or(
                "LEASE_REFRESH_SECS",
                defaults.lease_refresh.as_secs(),
            )),
            call_timeout: Duration::from_millis(env_or(
                "CALL_TIMEOUT_MS",
                defaults.call_timeout.as_millis() as u64,
            )),
            log_channel_capacity: env_or("LOG_CHANNEL_CAPACITY", defaults.log_channel_capacity),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Lease settings for the service heartbeats.
    ///
    /// A refresh period that would not beat the TTL falls back to 70% of it.
    pub fn lease(&self) -> LeaseConfig {
        if self.lease_refresh.is_zero() || self.lease_refresh >= self.lease_ttl {
            return LeaseConfig::from_ttl(self.lease_ttl);
        }
        LeaseConfig {
            ttl: self.lease_ttl,
            refresh: self.lease_refresh,
        }
    }

    pub fn orchestrator(&self) -> OrchestratorConfig {
        OrchestratorConfig {
            call_timeout: self.call_timeout,
            ..OrchestratorConfig::default()
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        let lease = LeaseConfig::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            log_level: "info".to_string(),
            lease_ttl: lease.ttl,
            lease_refresh: lease.refresh,
            call_timeout: Duration::from_secs(1),
            log_channel_capacity: log_bus::publisher::DEFAULT_CAPACITY,
        }
    }
}
