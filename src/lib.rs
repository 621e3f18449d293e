// drswatch - Process-to-driver-profile reconciliation engine
//
// This is the library crate containing the reconciliation engine and its
// sources. The binary crate (main.rs) provides a headless polling entry point.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod poller;
pub mod services;

// Re-export commonly used types for convenience
pub use config::ConfigManager;
pub use engine::Engine;
pub use error::EngineError;
pub use models::{
    ApplicationEntry, BlacklistResult, BlacklistState, DriverStatus, FocusedApplication, Profile,
    RunningProcess, UserConfig, WatchSettings,
};
pub use poller::{PollEvent, Poller};

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Application name
pub const APP_NAME: &str = env!("CARGO_PKG_NAME");
