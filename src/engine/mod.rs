//! The reconciliation engine facade.
//!
//! Owns the gate cache, the store accessor, the OS sources, and the
//! last-good-view fallback. Every boundary operation (see the `api` module)
//! lands here. The engine produces fresh immutable snapshots per call; the
//! only state it keeps is the availability cache and the last successfully
//! reconciled process view.
//!
//! Failure policy:
//! - unavailability of the driver subsystem short-circuits every operation
//!   with `StoreUnavailable`, and is never masked by the cached view;
//! - a transient read failure or timeout during a full pass is answered from
//!   the last good view when one exists;
//! - mutation failures pass through as structured results or errors without
//!   touching the cached view.

use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::EngineError;
use crate::metrics::Metrics;
use crate::models::{
    ApplicationEntry, BlacklistResult, DriverStatus, FocusedApplication, Profile, RunningProcess,
    WatchSettings,
};
use crate::services::drs::{self, ProfileStore, StoreAccessor};
use crate::services::focus::{FocusTracker, ForegroundTracker};
use crate::services::processes::{ProcessEnumerator, WindowEnumerator};
use crate::services::reconcile;

pub struct Engine {
    accessor: StoreAccessor,
    enumerator: Arc<dyn ProcessEnumerator>,
    focus: Arc<dyn FocusTracker>,
    /// Cached gate result. Refreshed by [`check_driver_status`](Self::check_driver_status)
    /// (the poller does this once per full cycle) and dropped after any
    /// connectivity-class failure so the next operation re-probes.
    gate: RwLock<Option<DriverStatus>>,
    /// Last successfully reconciled process view, served when a pass fails
    /// transiently. Never a partial join.
    last_view: RwLock<Option<Vec<RunningProcess>>>,
    op_timeout: Duration,
    metrics: Arc<Metrics>,
}

impl Engine {
    pub fn new(
        store: Box<dyn ProfileStore>,
        enumerator: Arc<dyn ProcessEnumerator>,
        focus: Arc<dyn FocusTracker>,
        op_timeout: Duration,
    ) -> Self {
        Self {
            accessor: StoreAccessor::new(store, op_timeout),
            enumerator,
            focus,
            gate: RwLock::new(None),
            last_view: RwLock::new(None),
            op_timeout,
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Engine over the real platform sources (NVAPI store, window walker,
    /// foreground tracker).
    pub fn with_system_sources(settings: &WatchSettings) -> Self {
        Self::new(
            drs::system_store(),
            Arc::new(WindowEnumerator),
            Arc::new(ForegroundTracker),
            settings.operation_timeout(),
        )
    }

    pub fn metrics(&self) -> Arc<Metrics> {
        Arc::clone(&self.metrics)
    }

    /// Probe the driver subsystem and refresh the gate cache. Never fails;
    /// all failure is encoded in the returned status.
    pub async fn check_driver_status(&self) -> DriverStatus {
        let status = self.accessor.probe().await;
        *self.gate.write().unwrap() = Some(status.clone());
        if !status.available {
            tracing::warn!(
                "driver subsystem unavailable: {}",
                status.error.as_deref().unwrap_or("unknown")
            );
        }
        status
    }

    /// Gate check in front of every operation. Answers from the cache while
    /// it says available; re-probes otherwise, so availability is never
    /// cached forever in either direction.
    async fn ensure_available(&self) -> Result<(), EngineError> {
        if let Some(status) = self.gate.read().unwrap().clone() {
            if status.available {
                return Ok(());
            }
        }

        let status = self.check_driver_status().await;
        if status.available {
            Ok(())
        } else {
            Err(EngineError::StoreUnavailable(
                status
                    .error
                    .unwrap_or_else(|| "driver subsystem unavailable".to_string()),
            ))
        }
    }

    /// Bookkeeping on any failed operation: count timeouts, and drop the gate
    /// cache after connectivity-class failures so the next call re-probes.
    fn observe_err(&self, err: EngineError) -> EngineError {
        if matches!(err, EngineError::Timeout { .. }) {
            self.metrics.record_timeout();
        }
        if err.is_unavailable() {
            *self.gate.write().unwrap() = None;
        }
        err
    }

    /// Run a blocking OS call on the blocking pool with the engine deadline.
    async fn run_os<T, F>(&self, operation: &'static str, f: F) -> Result<T, EngineError>
    where
        T: Send + 'static,
        F: FnOnce() -> Result<T, EngineError> + Send + 'static,
    {
        let task = tokio::task::spawn_blocking(f);
        match tokio::time::timeout(self.op_timeout, task).await {
            Err(_) => Err(EngineError::Timeout {
                operation,
                timeout: self.op_timeout,
            }),
            Ok(Err(join_err)) => Err(EngineError::StoreRead(format!(
                "{operation} task failed: {join_err}"
            ))),
            Ok(Ok(result)) => result,
        }
    }

    pub async fn get_profiles(&self) -> Result<Vec<Profile>, EngineError> {
        self.ensure_available().await?;
        self.accessor
            .list_profiles()
            .await
            .map_err(|err| self.observe_err(err))
    }

    pub async fn get_all_applications(&self) -> Result<Vec<ApplicationEntry>, EngineError> {
        self.ensure_available().await?;
        self.accessor
            .list_applications()
            .await
            .map_err(|err| self.observe_err(err))
    }

    /// Full reconciliation pass: fetch entries and processes concurrently,
    /// join, cache, return. A transient failure serves the prior view; with
    /// nothing cached the error surfaces. Unavailability always surfaces.
    pub async fn get_running_processes(&self) -> Result<Vec<RunningProcess>, EngineError> {
        self.ensure_available().await?;

        let enumerator = Arc::clone(&self.enumerator);
        let (entries, processes) = tokio::join!(
            self.accessor.list_applications(),
            self.run_os("process enumeration", move || enumerator.list_processes()),
        );

        let fetched = match (entries, processes) {
            (Ok(entries), Ok(processes)) => Ok((entries, processes)),
            (Err(err), _) | (_, Err(err)) => Err(err),
        };

        match fetched {
            Ok((entries, processes)) => {
                let view = reconcile::reconcile_processes(processes, &entries);
                *self.last_view.write().unwrap() = Some(view.clone());
                self.metrics.record_full_pass();
                Ok(view)
            }
            Err(err) => {
                let err = self.observe_err(err);
                if err.is_unavailable() {
                    self.metrics.record_failed_pass();
                    return Err(err);
                }

                let cached = self.last_view.read().unwrap().clone();
                match cached {
                    Some(view) => {
                        tracing::warn!("reconciliation pass failed ({err}), serving last good view");
                        self.metrics.record_fallback_pass();
                        Ok(view)
                    }
                    None => {
                        self.metrics.record_failed_pass();
                        Err(err)
                    }
                }
            }
        }
    }

    /// Focus reconciliation: the same join, against the single focused
    /// process, at the fast cadence.
    pub async fn get_focus_application(&self) -> Result<Option<FocusedApplication>, EngineError> {
        self.ensure_available().await?;

        let tracker = Arc::clone(&self.focus);
        let (entries, focus) = tokio::join!(
            self.accessor.list_applications(),
            self.run_os("focus query", move || tracker.current_focus()),
        );

        match (entries, focus) {
            (Ok(entries), Ok(focus)) => {
                self.metrics.record_focus_poll();
                Ok(reconcile::reconcile_focus(focus, &entries))
            }
            (Err(err), _) | (_, Err(err)) => {
                self.metrics.record_focus_failure();
                Err(self.observe_err(err))
            }
        }
    }

    pub async fn create_profile(
        &self,
        executable: &str,
        profile_name: &str,
    ) -> Result<(), EngineError> {
        self.ensure_available().await?;

        match self.accessor.create_profile(executable, profile_name).await {
            Ok(()) => {
                self.metrics.record_mutation();
                Ok(())
            }
            Err(err) => {
                self.metrics.record_mutation_failure();
                Err(self.observe_err(err))
            }
        }
    }

    pub async fn blacklist_application(
        &self,
        executable: &str,
    ) -> Result<BlacklistResult, EngineError> {
        self.set_blacklist(executable, true).await
    }

    pub async fn unblacklist_application(
        &self,
        executable: &str,
    ) -> Result<BlacklistResult, EngineError> {
        self.set_blacklist(executable, false).await
    }

    async fn set_blacklist(
        &self,
        executable: &str,
        blacklisted: bool,
    ) -> Result<BlacklistResult, EngineError> {
        self.ensure_available().await?;

        match self.accessor.set_blacklist(executable, blacklisted).await {
            Ok(result) => {
                if result.success {
                    self.metrics.record_mutation();
                } else {
                    self.metrics.record_mutation_failure();
                }
                Ok(result)
            }
            Err(err) => {
                self.metrics.record_mutation_failure();
                Err(self.observe_err(err))
            }
        }
    }

    pub async fn reload_settings(&self) -> Result<(), EngineError> {
        self.ensure_available().await?;

        match self.accessor.reload().await {
            Ok(()) => {
                self.metrics.record_mutation();
                tracing::info!("driver settings reloaded");
                Ok(())
            }
            Err(err) => {
                self.metrics.record_mutation_failure();
                Err(self.observe_err(err))
            }
        }
    }
}
