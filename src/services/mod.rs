//! Services module - the engine's data sources and its pure core.
//!
//! Everything here is framework-agnostic: no boundary types, no polling, no
//! display concerns. The engine facade composes these pieces.
//!
//! # Components
//!
//! - [`drs`]: the driver profile store: the [`drs::ProfileStore`] trait, the
//!   NVAPI backend (Windows), and [`drs::StoreAccessor`], the serialization
//!   point all reads and mutations go through.
//!
//! - [`processes`]: running-process enumeration ([`processes::ProcessEnumerator`]),
//!   filtered to processes owning a visible titled window.
//!
//! - [`focus`]: foreground-window tracking ([`focus::FocusTracker`]), safe to
//!   poll at sub-second cadence.
//!
//! - [`reconcile`]: the pure join of process data against profile data by
//!   case-folded executable identity.
//!
//! # Design Philosophy
//!
//! - **Pure core**: the join is a pure function; OS and driver access live at
//!   the edges behind traits.
//! - **Blocking edges, async composition**: store and OS calls are blocking
//!   and run on tokio's blocking pool with bounded deadlines.
//! - **Testable**: every external surface is a trait with in-memory test
//!   implementations.

pub mod drs;
pub mod focus;
pub mod processes;
pub mod reconcile;

pub use drs::{ProfileStore, StoreAccessor, StoreError};
pub use focus::{ForegroundTracker, FocusTracker};
pub use processes::{ProcessEnumerator, WindowEnumerator};
pub use reconcile::{reconcile_focus, reconcile_processes};
