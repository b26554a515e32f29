//! swarmscaled — the SwarmScale daemon.
//!
//! Scales a single Docker Swarm service up or down one replica at a time,
//! driven by a Prometheus query. Configured entirely through the
//! environment:
//!
//! ```text
//! SERVICE_NAME=web \
//! SCALE_UP_QUERY='avg(rate(container_cpu_usage_seconds_total{service="web"}[1m])) * 100' \
//! SCALE_DOWN_QUERY='avg(rate(container_cpu_usage_seconds_total{service="web"}[1m])) * 100' \
//! swarmscaled
//! ```
//!
//! Runs until SIGINT or SIGTERM; the tick in flight finishes first.

use anyhow::Context;
use tokio::signal::unix::{SignalKind, signal};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use swarmscale_autoscale::Autoscaler;
use swarmscale_core::ScalerConfig;
use swarmscale_docker::DockerClient;
use swarmscale_prometheus::PrometheusClient;

/// Per-tick progress is logged at `debug`; keep it visible by default.
const DEFAULT_LOG_FILTER: &str = "info,swarmscaled=debug,swarmscale_core=debug,swarmscale_prometheus=debug,swarmscale_docker=debug,swarmscale_autoscale=debug";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LogFormat {
    Text,
    Json,
}

impl LogFormat {
    fn from_env_value(value: Option<&str>) -> Self {
        match value.map(str::trim) {
            Some(v) if v.eq_ignore_ascii_case("json") => LogFormat::Json,
            _ => LogFormat::Text,
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match LogFormat::from_env_value(std::env::var("LOG_FORMAT").ok().as_deref()) {
        LogFormat::Json => builder.json().init(),
        LogFormat::Text => builder.init(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let config = ScalerConfig::from_env().context("invalid autoscaler configuration")?;

    info!(service = %config.service_name, "starting autoscaler");
    info!(
        config = %serde_json::to_string(&config)?,
        "effective configuration"
    );

    // ── Collaborators ──────────────────────────────────────────

    let metrics = PrometheusClient::new(config.prometheus_url.as_str())
        .with_timeout(config.request_timeout());

    let docker = DockerClient::from_host(&config.docker_host)
        .with_context(|| format!("invalid DOCKER_HOST {:?}", config.docker_host))?
        .with_timeout(config.request_timeout());
    info!(
        prometheus = %metrics.base_url(),
        docker = %docker.endpoint(),
        "clients initialized"
    );

    let mut autoscaler = Autoscaler::new(
        config.service_name.clone(),
        config.policy.clone(),
        metrics,
        docker,
    );

    // ── Control loop ───────────────────────────────────────────

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let interval = config.check_interval();

    let mut loop_handle = tokio::spawn(async move {
        autoscaler.run(interval, shutdown_rx).await;
    });

    tokio::select! {
        signal = shutdown_signal() => {
            signal?;
            info!("shutdown signal received");
            let _ = shutdown_tx.send(true);
            (&mut loop_handle).await.context("autoscaler task panicked")?;
        }
        joined = &mut loop_handle => {
            joined.context("autoscaler task panicked")?;
            anyhow::bail!("autoscaler loop exited before shutdown was requested");
        }
    }

    info!("autoscaler stopped");
    Ok(())
}

/// Resolve on the first SIGINT or SIGTERM.
async fn shutdown_signal() -> anyhow::Result<()> {
    let mut terminate =
        signal(SignalKind::terminate()).context("failed to install SIGTERM handler")?;

    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                error!(error = %e, "failed to listen for SIGINT");
                // Still honour SIGTERM.
                terminate.recv().await;
            }
        }
        _ = terminate.recv() => {}
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_filter_shows_tick_progress() {
        let filter: EnvFilter = DEFAULT_LOG_FILTER.parse().unwrap();
        let rendered = filter.to_string();
        assert!(rendered.contains("swarmscale_autoscale=debug"), "{rendered}");
        assert!(rendered.contains("swarmscale_prometheus=debug"), "{rendered}");
        assert!(rendered.contains("swarmscale_docker=debug"), "{rendered}");
        assert_eq!(filter.max_level_hint(), Some(tracing::level_filters::LevelFilter::DEBUG));
    }

    #[test]
    fn log_format_selection() {
        assert_eq!(LogFormat::from_env_value(None), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some("text")), LogFormat::Text);
        assert_eq!(LogFormat::from_env_value(Some("JSON")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some(" json ")), LogFormat::Json);
        assert_eq!(LogFormat::from_env_value(Some("yaml")), LogFormat::Text);
    }
}
