//! Heart Risk Service - Main Entry Point
//!
//! Loads the model artifacts once and serves predictions over HTTP.

use anyhow::{Context, Result};
use heart_risk_service::{
    api::{self, AppState},
    config::{AppConfig, LoggingConfig},
    metrics::MetricsReporter,
    models::inference::InferenceEngine,
};
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

fn init_logging(logging: &LoggingConfig) -> Result<()> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new("info")
            .add_directive(format!("heart_risk_service={}", logging.level).parse()?)
            .add_directive(format!("tower_http={}", logging.level).parse()?),
    };

    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    match logging.format.as_str() {
        "json" => builder.json().init(),
        _ => builder.init(),
    }
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl-C");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => error!(error = %e, "Failed to listen for SIGTERM"),
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    init_logging(&config.logging)?;

    info!("Starting Heart Risk Service");
    info!(
        model_path = %config.artifacts.model_path.display(),
        columns_path = %config.artifacts.columns_path.display(),
        threshold = config.detection.threshold,
        "Configuration loaded successfully"
    );

    let state = match InferenceEngine::new(&config) {
        Ok(engine) => AppState::ready(engine),
        Err(e) if !config.artifacts.required => {
            warn!(error = %e, "Artifacts failed to load, starting in degraded mode");
            AppState::unavailable(e.to_string())
        }
        Err(e) => return Err(e).context("Failed to load model artifacts"),
    };

    if config.metrics.report_interval_secs > 0 {
        let reporter = MetricsReporter::new(state.metrics.clone(), config.metrics.report_interval_secs);
        tokio::spawn(reporter.start());
    }

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Listening");

    let metrics = state.metrics.clone();
    axum::serve(listener, api::router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Service shutting down...");
    metrics.print_summary();

    Ok(())
}
