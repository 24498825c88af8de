mod config;
mod credential;
mod detector;
mod event;
mod journal;
mod logging;
mod model;
mod notify;
mod paths;
mod scheduler;
mod source;
mod status;
mod twitch;

use anyhow::{Context, Result};
use std::time::Duration;
use tokio::sync::watch;

use crate::journal::EventJournal;
use crate::model::ChannelId;
use crate::notify::NotificationFanout;
use crate::scheduler::PollScheduler;
use crate::twitch::{AppTokenProvider, HelixStatusSource};

#[tokio::main]
async fn main() {
    // ── App data directory ────────────────────────────────────────────────────
    let app_dir = paths::app_data_dir();
    if let Err(e) = std::fs::create_dir_all(&app_dir) {
        eprintln!("Failed to create app data directory {}: {e}", app_dir.display());
        std::process::exit(1);
    }

    // ── Configuration ─────────────────────────────────────────────────────────
    let config_path = paths::config_file_path();
    let created = !config_path.exists();
    let (config, config_error) = match config::load_or_create(&config_path) {
        Ok(config) => (config, None),
        Err(e) => {
            eprintln!("[config] Error (using defaults): {e:#}");
            (config::Config::default(), Some(e))
        }
    };

    // ── Logging ───────────────────────────────────────────────────────────────
    logging::init(&config.log_level, &paths::log_file_path());
    if created {
        tracing::info!("created default config at {}", config_path.display());
    }
    let config = config.validate();

    tracing::info!("livewatch v{} started", env!("CARGO_PKG_VERSION"));

    if let Err(e) = run(config).await {
        let diagnostic = exit_diagnostic(&e, config_error.as_ref());
        tracing::error!("{diagnostic}");
        eprintln!("livewatch: {diagnostic}");
        std::process::exit(1);
    }
}

/// Message for a failed startup. When the config file could not be loaded
/// the daemon ran on defaults, so the load error leads.
fn exit_diagnostic(startup: &anyhow::Error, config_error: Option<&anyhow::Error>) -> String {
    match config_error {
        Some(c) => format!("{c:#} (startup with default config failed: {startup:#})"),
        None => format!("{startup:#}"),
    }
}

/// Wires the collaborators together and polls until interrupted.
/// Returns an error only when startup fails.
async fn run(config: config::Config) -> Result<()> {
    if config.channels.is_empty() {
        tracing::warn!("no channels configured; rounds will be empty");
    }

    let http = reqwest::Client::builder()
        .user_agent(concat!("livewatch/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let fanout = NotificationFanout::from_config(&config.sinks, http.clone());
    let sinks = fanout.sink_names();
    if sinks.is_empty() {
        tracing::info!("no notification sinks active");
    } else {
        tracing::info!("notification sinks: {}", sinks.join(", "));
    }

    let mut scheduler = PollScheduler::new(
        config.channels.iter().map(|c| ChannelId::new(c.as_str())),
        Box::new(AppTokenProvider::new(http.clone(), &config.credentials)),
        Box::new(HelixStatusSource::new(http, &config.credentials)),
        fanout,
        EventJournal::new(paths::journal_dir(), config.journal_capacity),
        Duration::from_secs(config.poll_interval_secs),
    )
    .with_status_file(paths::status_file_path());

    scheduler
        .prime()
        .await
        .context("could not obtain a Twitch credential; check client_id and client_secret")?;
    tracing::info!("authenticated with the Twitch API");

    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown_signal().await;
        let _ = stop_tx.send(true);
    });

    scheduler.run(stop_rx).await;
    tracing::info!("livewatch stopped");
    Ok(())
}

/// Resolves on Ctrl+C, or SIGTERM on Unix.
async fn shutdown_signal() {
    let ctrl_c = tokio::signal::ctrl_c();

    #[cfg(unix)]
    {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                tokio::select! {
                    _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
                    _ = sigterm.recv() => tracing::info!("received SIGTERM, shutting down"),
                }
            }
            Err(e) => {
                tracing::warn!("failed to register SIGTERM handler: {e}");
                ctrl_c.await.ok();
                tracing::info!("received ctrl-c, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        ctrl_c.await.ok();
        tracing::info!("received ctrl-c, shutting down");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::anyhow;

    #[test]
    fn exit_diagnostic_leads_with_config_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "channels = [\"kaicenat\"\n[credentials]\nclient_id = \"real\"\n").unwrap();
        let config_err = config::load_or_create(&path).unwrap_err();

        let startup = anyhow!("client id and secret are still the placeholder values");
        let msg = exit_diagnostic(&startup, Some(&config_err));
        assert!(msg.starts_with("Failed to parse config file"));
        assert!(msg.contains("placeholder values"));
    }

    #[test]
    fn exit_diagnostic_without_config_error_is_startup_error() {
        let startup = anyhow!("could not obtain a Twitch credential");
        assert_eq!(exit_diagnostic(&startup, None), "could not obtain a Twitch credential");
    }
}
