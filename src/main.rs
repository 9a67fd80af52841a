//! consult-health binary: watch the consultation backend and log status banner changes.

use std::process::ExitCode;

use anyhow::Context;
use consult_health::{
    HealthMonitor, MonitorConfig,
    services::{banner::Banner, supervisor},
};
use tokio_stream::{StreamExt, wrappers::WatchStream};
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    init_tracing();

    let mut config = MonitorConfig::load();
    info!(
        backend = %config.backend_url,
        poll_interval_ms = config.poll_interval.as_millis() as u64,
        "starting health monitor"
    );

    if config.poll_interval.is_zero() {
        config.auto_check_on_start = false;
        let monitor = HealthMonitor::new(config).context("building health monitor")?;
        monitor.check_health().await;

        let banner = Banner::from_state(&monitor.snapshot());
        return Ok(if monitor.is_healthy() {
            info!(%banner, "backend healthy");
            ExitCode::SUCCESS
        } else {
            error!(%banner, "backend not healthy");
            ExitCode::FAILURE
        });
    }

    let interval = config.poll_interval;
    let backoff = config.failure_backoff;
    // The supervisor drives checks itself when a backoff is configured.
    config.auto_check_on_start = backoff.is_none();

    let monitor = HealthMonitor::new(config).context("building health monitor")?;
    let banners = report_banners(monitor.updates());

    match backoff {
        Some(backoff) => {
            tokio::select! {
                _ = supervisor::run(&monitor, interval, backoff) => {},
                _ = banners => {},
                _ = shutdown_signal() => {},
            }
        }
        None => {
            tokio::select! {
                _ = banners => {},
                _ = shutdown_signal() => {},
            }
        }
    }

    monitor.dispose();
    info!("health monitor stopped");
    Ok(ExitCode::SUCCESS)
}

/// Log every banner transition until the monitor goes away.
async fn report_banners(mut updates: WatchStream<consult_health::MonitorState>) {
    let mut current: Option<Banner> = None;
    while let Some(state) = updates.next().await {
        let banner = Banner::from_state(&state);
        if current.as_ref() == Some(&banner) {
            continue;
        }

        match &banner {
            Banner::Offline { .. } | Banner::Degraded { .. } => warn!(%banner, "status banner"),
            _ => info!(%banner, "status banner"),
        }
        current = Some(banner);
    }
}

/// Configure tracing subscribers so logs include spans by default.
fn init_tracing() {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,consult_health=debug".into());
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

/// Wait for Ctrl+C or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                tokio::select! {
                    _ = tokio::signal::ctrl_c() => {},
                    _ = term.recv() => {},
                }
            }
            Err(err) => {
                warn!(error = %err, "failed to install SIGTERM handler; waiting for Ctrl+C only");
                let _ = tokio::signal::ctrl_c().await;
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }
}
