use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use clap::Parser;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use barman_exporter::api::{ApiServer, AppState};
use barman_exporter::barman::{BarmanClient, BarmanProcess};
use barman_exporter::clock::{Clock, SystemClock};
use barman_exporter::config::{Args, ExporterConfig};
use barman_exporter::logging;
use barman_exporter::metrics::{BarmanMetrics, MetricsCollector, PrometheusExporter};
use barman_exporter::scheduler::{Scheduler, TriggerHandle, trigger_channel};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// How long shutdown waits for an in-flight collection cycle.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    let config = ExporterConfig::from_args(Args::parse())?;
    logging::init_logging(config.log_format)?;

    info!(
        barman = %config.barman_path.display(),
        interval = ?config.interval,
        "barman-exporter {} starting",
        env!("CARGO_PKG_VERSION")
    );

    let metrics = Arc::new(BarmanMetrics::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let barman = BarmanClient::new(Arc::new(BarmanProcess::new(&config.barman_path)));
    let collector = Arc::new(MetricsCollector::new(barman, metrics.clone(), clock.clone()));

    let shutdown = CancellationToken::new();
    let (trigger, trigger_rx) = trigger_channel();
    listen_for_trigger(trigger, shutdown.clone());

    let scheduler = Scheduler::new(
        collector.clone(),
        clock,
        config.interval,
        trigger_rx,
        shutdown.child_token(),
    );
    let mut scheduler_task = tokio::spawn(scheduler.run());

    let state = AppState::new(Arc::new(PrometheusExporter::new(metrics))).with_collector(collector);
    let server = ApiServer::with_state(config.server.clone(), state).with_cancel_token(shutdown.clone());

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            error!(error = %e, "Failed to start web server");
            shutdown.cancel();
            stop_scheduler(scheduler_task).await;
            return Err(e.into());
        }
    };

    info!("Starting web server");
    let mut server_task = tokio::spawn(async move { server.serve(listener).await });

    info!("Waiting for metrics loop to finish");
    let failure: Option<anyhow::Error> = tokio::select! {
        _ = wait_for_shutdown() => {
            info!("Shutdown signal received");
            shutdown.cancel();
            stop_scheduler(scheduler_task).await;
            None
        }
        result = &mut scheduler_task => {
            shutdown.cancel();
            match result {
                Ok(Ok(())) => None,
                Ok(Err(e)) => Some(anyhow::Error::new(e).context("failed to collect metrics")),
                Err(e) => Some(anyhow::Error::new(e).context("metrics loop panicked")),
            }
        }
        result = &mut server_task => {
            shutdown.cancel();
            stop_scheduler(scheduler_task).await;
            return match result {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(anyhow::Error::new(e).context("web server stopped")),
                Err(e) => Err(anyhow::Error::new(e).context("web server panicked")),
            };
        }
    };

    server_task
        .await
        .context("web server panicked")?
        .context("web server shutdown failed")?;

    match failure {
        Some(e) => {
            error!(error = %e, "Exiting after metrics loop failure");
            Err(e)
        }
        None => {
            info!("Shutdown complete");
            Ok(())
        }
    }
}

/// Wait for the scheduler to notice cancellation, letting a running cycle
/// finish within [`SHUTDOWN_TIMEOUT`].
async fn stop_scheduler(task: JoinHandle<barman_exporter::Result<()>>) {
    match tokio::time::timeout(SHUTDOWN_TIMEOUT, task).await {
        Ok(Ok(Ok(()))) => {}
        Ok(Ok(Err(e))) => warn!(error = %e, "Metrics loop failed during shutdown"),
        Ok(Err(e)) => warn!(error = %e, "Metrics loop panicked"),
        Err(_) => warn!("Metrics loop did not stop in time"),
    }
}

/// Forward SIGUSR1 to the scheduler as a manual collection trigger.
#[cfg(unix)]
fn listen_for_trigger(trigger: TriggerHandle, cancel: CancellationToken) {
    use tokio::signal::unix::{SignalKind, signal};

    let mut usr1 = match signal(SignalKind::user_defined1()) {
        Ok(signal) => signal,
        Err(e) => {
            warn!(error = %e, "Cannot listen for SIGUSR1, manual collection disabled");
            return;
        }
    };

    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = cancel.cancelled() => break,
                received = usr1.recv() => {
                    if received.is_none() {
                        break;
                    }
                    info!("Running metrics (SIGUSR1)");
                    trigger.fire();
                }
            }
        }
    });
}

#[cfg(not(unix))]
fn listen_for_trigger(_trigger: TriggerHandle, _cancel: CancellationToken) {}

/// Resolve on Ctrl-C, or SIGTERM on unix.
async fn wait_for_shutdown() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
