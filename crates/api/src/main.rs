//! API server entry point.

use api::config::Config;
use tokio::signal;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Resolves on SIGINT or SIGTERM, naming the signal received.
#[cfg(unix)]
async fn shutdown_signal() -> &'static str {
    let mut sigterm = match signal::unix::signal(signal::unix::SignalKind::terminate()) {
        Ok(sigterm) => sigterm,
        Err(error) => {
            tracing::warn!(%error, "SIGTERM handler unavailable, listening for SIGINT only");
            return wait_for_ctrl_c().await;
        }
    };
    tokio::select! {
        name = wait_for_ctrl_c() => name,
        _ = sigterm.recv() => "SIGTERM",
    }
}

#[cfg(not(unix))]
async fn shutdown_signal() -> &'static str {
    wait_for_ctrl_c().await
}

async fn wait_for_ctrl_c() -> &'static str {
    if let Err(error) = signal::ctrl_c().await {
        tracing::error!(%error, "SIGINT handler unavailable");
        std::future::pending::<()>().await;
    }
    "SIGINT"
}

#[tokio::main]
async fn main() {
    let config = Config::from_env();

    tracing_subscriber::registry()
        .with(EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info")))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let metrics_handle = metrics_exporter_prometheus::PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");

    // Services register themselves and start heartbeating before the first request.
    let (state, hosts) = api::create_default_state(&config)
        .await
        .expect("failed to start domain services");
    let app = api::create_app(state, metrics_handle);

    let addr = config.addr();
    tracing::info!(%addr, services = hosts.len(), "starting API server");

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("failed to bind address");
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let signal = shutdown_signal().await;
            tracing::info!(signal, "draining connections");
        })
        .await
        .expect("server error");

    for host in hosts {
        host.stop().await;
    }

    tracing::info!("server shut down gracefully");
}
