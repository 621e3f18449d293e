use serde::{Deserialize, Serialize};
use std::time::Duration;

/// User configuration from drswatch.yaml
///
/// Contains poll cadences, the store operation deadline, and logging options.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserConfig {
    #[serde(rename = "Drswatch_Settings")]
    pub settings: WatchSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatchSettings {
    /// Cadence of the focus poll. Fast: the focused window changes constantly.
    #[serde(rename = "Focus Poll Ms", default = "default_focus_poll_ms")]
    pub focus_poll_ms: u64,

    /// Cadence of the full process/profile poll.
    #[serde(rename = "Process Poll Ms", default = "default_process_poll_ms")]
    pub process_poll_ms: u64,

    /// Deadline for any single OS or driver-store call. Expired calls report
    /// `Timeout` instead of hanging a poll cycle.
    #[serde(rename = "Operation Timeout Ms", default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    #[serde(rename = "Log Directory", default = "default_log_dir")]
    pub log_dir: String,

    #[serde(rename = "Debug Mode", default)]
    pub debug_mode: bool,
}

impl WatchSettings {
    pub fn focus_poll_interval(&self) -> Duration {
        Duration::from_millis(self.focus_poll_ms)
    }

    pub fn process_poll_interval(&self) -> Duration {
        Duration::from_millis(self.process_poll_ms)
    }

    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

impl Default for WatchSettings {
    fn default() -> Self {
        Self {
            focus_poll_ms: default_focus_poll_ms(),
            process_poll_ms: default_process_poll_ms(),
            operation_timeout_ms: default_operation_timeout_ms(),
            log_dir: default_log_dir(),
            debug_mode: false,
        }
    }
}

impl Default for UserConfig {
    fn default() -> Self {
        Self {
            settings: WatchSettings::default(),
        }
    }
}

fn default_focus_poll_ms() -> u64 {
    1_000
}

fn default_process_poll_ms() -> u64 {
    10_000
}

fn default_operation_timeout_ms() -> u64 {
    5_000
}

fn default_log_dir() -> String {
    "logs".to_string()
}
