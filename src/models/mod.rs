//! Data models for the drswatch engine.
//!
//! This module contains the data structures that cross component boundaries:
//! - [`Profile`] / [`ApplicationEntry`]: the driver profile store's view
//! - [`ProcessInfo`] / [`FocusInfo`]: raw OS enumeration results
//! - [`RunningProcess`] / [`FocusedApplication`]: reconciled (joined) views
//! - [`BlacklistState`]: the tri-state blacklist answer
//! - [`UserConfig`] / [`WatchSettings`]: settings loaded from `drswatch.yaml`
//!
//! # Architecture Note
//!
//! Reconciled views are fresh immutable snapshots, recomputed per pass; the
//! engine never mutates one in place. Boundary-crossing types carry explicit
//! `camelCase` serde mappings for the display layer.

pub mod config;
pub mod types;

pub use config::{UserConfig, WatchSettings};
pub use types::{
    ApplicationEntry, BlacklistResult, BlacklistState, DriverStatus, FocusInfo,
    FocusedApplication, ProcessInfo, Profile, RunningProcess,
};
