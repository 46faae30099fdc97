use std::sync::Arc;

use posture_monitor::camera::SyntheticFrameSource;
use posture_monitor::config::{Config, RuntimeConfig};
use posture_monitor::logging::{init_tracing, LogConfig};
use posture_monitor::oracle::MockPoseOracle;
use posture_monitor::overlay::TracingRenderer;
use posture_monitor::scheduler::FrameScheduler;
use posture_monitor::settings::SettingsStore;
use posture_monitor::sinks::WatchSinks;
use tokio::sync::broadcast;
use tokio_stream::StreamExt;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    let config = Config::from_env();

    init_tracing(&LogConfig::from(&config)).expect("Failed to initialize tracing");
    tracing::info!("Starting posture-monitor");

    let settings = SettingsStore::open(&config.settings_path).expect("Failed to open settings store");
    let check_interval_ms = settings.check_interval_ms().unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Failed to read check interval, using default");
        posture_monitor::constants::DEFAULT_CHECK_INTERVAL_MS
    });
    let runtime = Arc::new(RuntimeConfig::new(
        config.demo.start_focused,
        check_interval_ms,
    ));
    tracing::info!(
        check_interval_ms,
        focused = config.demo.start_focused,
        "Runtime inputs loaded"
    );

    let (shutdown_tx, _) = broadcast::channel::<()>(8);
    let sinks = Arc::new(WatchSinks::new());

    let mut scheduler = FrameScheduler::new(
        SyntheticFrameSource::new(
            config.demo.frame_width,
            config.demo.frame_height,
            config.demo.frame_intensity,
        ),
        MockPoseOracle::new(config.demo.mock_jitter_px, config.demo.mock_absence_rate),
        TracingRenderer,
        sinks.clone(),
        runtime.clone(),
        &config,
    );

    if let Err(e) = scheduler.start().await {
        tracing::error!(error = %e, "Failed to start frame scheduler");
        std::process::exit(1);
    }

    let scheduler_rx = shutdown_tx.subscribe();
    let scheduler_handle = tokio::spawn(async move { scheduler.run(scheduler_rx).await });

    let mut reporter_shutdown = shutdown_tx.subscribe();
    let mut posture_stream = sinks.posture_stream();
    let reporter_sinks = sinks.clone();
    let reporter = tokio::spawn(async move {
        let mut last = None;
        loop {
            tokio::select! {
                next = posture_stream.next() => {
                    let Some(status) = next else { break };
                    if last == Some(status) {
                        continue;
                    }
                    last = Some(status);
                    let lighting = reporter_sinks.lighting();
                    tracing::info!(
                        shoulders = status.shoulders_angle.map(|a| a.as_str()),
                        eyes = status.eyes_angle.map(|a| a.as_str()),
                        distance = status.monitor_distance,
                        view_angle = status.view_angle,
                        lighting = lighting.map(|l| l.status.as_str()),
                        "Posture status changed"
                    );
                }
                _ = reporter_shutdown.recv() => break,
            }
        }
    });

    shutdown_signal(shutdown_tx.clone()).await;

    match scheduler_handle.await {
        Ok(Ok(stats)) => tracing::info!(
            analyzed = stats.analyzed,
            throttled = stats.throttled,
            no_person = stats.no_person,
            abandoned = stats.abandoned,
            "Frame scheduler exited"
        ),
        Ok(Err(e)) => tracing::error!(error = %e, "Frame scheduler failed"),
        Err(e) => tracing::error!(error = %e, "Frame scheduler task panicked"),
    }
    let _ = reporter.await;

    tracing::info!("Flushing settings before exit");
    if let Err(e) = settings.flush() {
        tracing::error!(error = %e, "Failed to flush settings before exit");
    }
    tracing::info!("Shutdown complete");
}

async fn shutdown_signal(shutdown_tx: broadcast::Sender<()>) {
    #[cfg(unix)]
    {
        let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = sigterm.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
    }

    tracing::info!("Shutdown signal received");
    let _ = shutdown_tx.send(());
}
