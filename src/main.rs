//! drswatch - Process-to-driver-profile reconciliation engine
//!
//! Headless entry point. Initializes:
//! - Logging infrastructure (rotating file + console output)
//! - Tokio async runtime (store access and polling off the interactive path)
//! - Configuration loading ([`ConfigManager`])
//! - The reconciliation [`Engine`] over the real platform sources
//! - The [`Poller`] with its two cadences (focus ~1s, full pass ~10s)
//!
//! A display layer would subscribe to the poller's events and issue mutations
//! through `api::dispatch`; this binary logs the event stream instead, which
//! is also the quickest way to verify a driver installation end to end.
//!
//! # Configuration
//!
//! Expected in `drswatch data/drswatch.yaml` (defaults apply when missing):
//! poll cadences, the store operation deadline, log directory, debug mode.

use std::sync::Arc;

use anyhow::Result;
use drswatch::poller::PollEvent;
use drswatch::{APP_NAME, ConfigManager, Engine, Poller, VERSION};

fn main() -> Result<()> {
    let config_manager = ConfigManager::new("drswatch data")?;
    let config = config_manager.load_user_config()?;
    let settings = config.settings;

    let _log_guard = drswatch::logging::setup_logging(
        &settings.log_dir,
        APP_NAME,
        settings.debug_mode,
        true,
    )?;

    tracing::info!("Starting {} v{}", APP_NAME, VERSION);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .worker_threads(2)
        .thread_name("drswatch-worker")
        .build()?;

    runtime.block_on(async {
        let engine = Arc::new(Engine::with_system_sources(&settings));

        let status = engine.check_driver_status().await;
        if status.available {
            tracing::info!("driver subsystem available");
        } else {
            tracing::warn!(
                "driver subsystem unavailable: {} (will keep re-probing)",
                status.error.as_deref().unwrap_or("unknown")
            );
        }

        let poller = Poller::new(
            Arc::clone(&engine),
            settings.focus_poll_interval(),
            settings.process_poll_interval(),
        );
        let mut events = poller.subscribe();
        let (full_loop, focus_loop) = poller.spawn();

        loop {
            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("shutdown requested");
                    break;
                }
                event = events.recv() => match event {
                    Ok(PollEvent::Processes(view)) => {
                        tracing::info!("{} processes reconciled", view.len());
                        for process in &view {
                            tracing::debug!(
                                "  {} (pid {}): profile={:?} blacklist={:?}",
                                process.process_name,
                                process.process_id,
                                process.profile_name,
                                process.blacklist,
                            );
                        }
                    }
                    Ok(PollEvent::Focus(Some(focus))) => {
                        tracing::debug!(
                            "focus: {} (in store: {}, blacklist {:?})",
                            focus.process_name,
                            focus.is_in_store,
                            focus.blacklist,
                        );
                    }
                    Ok(PollEvent::Focus(None)) => {
                        tracing::debug!("focus: none");
                    }
                    Ok(PollEvent::Driver(status)) if !status.available => {
                        tracing::warn!(
                            "driver unavailable: {}",
                            status.error.as_deref().unwrap_or("unknown")
                        );
                    }
                    Ok(PollEvent::Driver(_)) => {}
                    Ok(PollEvent::PassFailed { source, detail }) => {
                        tracing::warn!("{source} pass failed: {detail}");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                        tracing::warn!("event consumer lagged, {skipped} events skipped");
                    }
                    Err(tokio::sync::broadcast::error::RecvError::Closed) => break,
                },
            }
        }

        poller.shutdown();
        let _ = tokio::join!(full_loop, focus_loop);
        engine.metrics().log_summary();
    });

    tracing::info!("{} stopped", APP_NAME);
    Ok(())
}
