//! Payment proxy server.
//!
//! ```bash
//! RAZORPAY_KEY_ID=rzp_test_... RAZORPAY_KEY_SECRET=... cargo run -p storefront-web
//! ```

use anyhow::Context;
use std::time::Duration;
use storefront_runtime::telemetry;
use storefront_web::{AppState, Config, build_router};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "storefront_web=info,storefront_cart=info,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env();
    info!(
        address = %config.server.bind_address(),
        razorpay = ?config.razorpay,
        "Configuration loaded"
    );
    if !config.razorpay.has_credentials() {
        warn!("Razorpay credentials missing; payment routes will answer 500");
    }

    let metrics = telemetry::install_recorder().context("installing metrics recorder")?;
    let state = AppState::from_config(&config)
        .context("building payment gateway client")?
        .with_metrics(metrics);

    let listener = tokio::net::TcpListener::bind(config.server.bind_address())
        .await
        .with_context(|| format!("binding {}", config.server.bind_address()))?;
    info!(address = %listener.local_addr()?, "Payment proxy listening");

    let grace = config.server.shutdown_timeout();
    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal(grace))
        .await
        .context("serving HTTP")?;

    info!("Server stopped");
    Ok(())
}

/// Resolves on Ctrl+C or SIGTERM, then arms a hard exit after `grace`
async fn shutdown_signal(grace: Duration) {
    let ctrl_c = async {
        if let Err(error) = signal::ctrl_c().await {
            warn!(%error, "Ctrl+C handler unavailable");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            },
            Err(error) => {
                warn!(%error, "SIGTERM handler unavailable");
                std::future::pending::<()>().await;
            },
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, draining connections"),
        () = terminate => info!("Received SIGTERM, draining connections"),
    }

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;
        warn!(?grace, "Shutdown grace period elapsed, exiting");
        std::process::exit(1);
    });
}
