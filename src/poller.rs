//! Poll loops feeding the display layer.
//!
//! Two independent repeating schedules: a fast focus poll and a slow full
//! process/profile poll. Results are published on a broadcast channel; a
//! subscriber that lags or goes away never blocks a loop. Both loops select
//! on a shutdown signal, so cancellation is immediate and an in-flight pass
//! has its result discarded instead of being applied after unmount.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::engine::Engine;
use crate::models::{DriverStatus, FocusedApplication, RunningProcess};

/// Events published to the display layer.
#[derive(Debug, Clone)]
pub enum PollEvent {
    /// A fresh full reconciliation view.
    Processes(Vec<RunningProcess>),

    /// A fresh focus answer.
    Focus(Option<FocusedApplication>),

    /// The gate result for this cycle. Unavailability is a persistent banner
    /// state, re-emitted every cycle it holds.
    Driver(DriverStatus),

    /// A pass failed with nothing servable; per-cycle, non-fatal.
    PassFailed {
        source: &'static str,
        detail: String,
    },
}

pub struct Poller {
    engine: Arc<Engine>,
    focus_interval: Duration,
    process_interval: Duration,
    events_tx: broadcast::Sender<PollEvent>,
    shutdown_tx: watch::Sender<bool>,
}

impl Poller {
    pub fn new(engine: Arc<Engine>, focus_interval: Duration, process_interval: Duration) -> Self {
        let (events_tx, _) = broadcast::channel(64);
        let (shutdown_tx, _) = watch::channel(false);
        Self {
            engine,
            focus_interval,
            process_interval,
            events_tx,
            shutdown_tx,
        }
    }

    /// Subscribe to poll events. Multiple subscribers are fine; events sent
    /// with no subscribers are dropped silently.
    pub fn subscribe(&self) -> broadcast::Receiver<PollEvent> {
        self.events_tx.subscribe()
    }

    /// Spawn both loops. The handles complete after [`shutdown`](Self::shutdown).
    pub fn spawn(&self) -> (JoinHandle<()>, JoinHandle<()>) {
        (self.spawn_full_loop(), self.spawn_focus_loop())
    }

    /// Signal both loops to stop. Idempotent; returns immediately.
    pub fn shutdown(&self) {
        let _ = self.shutdown_tx.send(true);
    }

    fn spawn_full_loop(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let events = self.events_tx.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        let period = self.process_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }

                // Refresh the gate once per cycle; the banner state is
                // re-emitted for as long as it holds.
                let status = tokio::select! {
                    _ = shutdown.changed() => break,
                    status = engine.check_driver_status() => status,
                };
                let _ = events.send(PollEvent::Driver(status.clone()));
                if !status.available {
                    continue;
                }

                let result = tokio::select! {
                    _ = shutdown.changed() => break,
                    result = engine.get_running_processes() => result,
                };
                match result {
                    Ok(view) => {
                        let _ = events.send(PollEvent::Processes(view));
                    }
                    Err(err) => {
                        tracing::warn!("full poll pass failed: {err}");
                        let _ = events.send(PollEvent::PassFailed {
                            source: "processes",
                            detail: err.to_string(),
                        });
                    }
                }
            }

            tracing::debug!("full poll loop stopped");
        })
    }

    fn spawn_focus_loop(&self) -> JoinHandle<()> {
        let engine = Arc::clone(&self.engine);
        let events = self.events_tx.clone();
        let mut shutdown = self.shutdown_tx.subscribe();
        let period = self.focus_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                tokio::select! {
                    _ = shutdown.changed() => break,
                    _ = ticker.tick() => {}
                }

                let result = tokio::select! {
                    _ = shutdown.changed() => break,
                    result = engine.get_focus_application() => result,
                };
                match result {
                    Ok(focus) => {
                        let _ = events.send(PollEvent::Focus(focus));
                    }
                    Err(err) => {
                        // The full loop owns the unavailability banner; a
                        // failed focus poll just waits for the next tick.
                        tracing::debug!("focus poll failed: {err}");
                        let _ = events.send(PollEvent::PassFailed {
                            source: "focus",
                            detail: err.to_string(),
                        });
                    }
                }
            }

            tracing::debug!("focus poll loop stopped");
        })
    }
}
