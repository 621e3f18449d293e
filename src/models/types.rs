use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};

/// Blacklist status of an executable, as seen through the reconciliation join.
///
/// This is deliberately a three-variant enum rather than `Option<bool>`:
/// `Unknown` means "no application entry exists for this executable, so the
/// question has no answer", which callers must not conflate with "not
/// blacklisted". The invariant maintained by reconciliation is that a process
/// is `Unknown` if and only if it has no matching entry in the store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum BlacklistState {
    Blacklisted,
    NotBlacklisted,
    Unknown,
}

impl BlacklistState {
    /// Lift a concrete stored flag into the tri-state.
    pub fn from_flag(blacklisted: bool) -> Self {
        if blacklisted {
            BlacklistState::Blacklisted
        } else {
            BlacklistState::NotBlacklisted
        }
    }

    /// True for both concrete states, false only for `Unknown`.
    pub fn is_known(&self) -> bool {
        !matches!(self, BlacklistState::Unknown)
    }
}

/// A driver profile: a named bundle of rendering settings.
///
/// Predefined profiles ship with the driver and cannot be created, renamed or
/// deleted through this engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub name: String,
    pub is_predefined: bool,
    pub application_count: u32,
}

/// An executable registered in a driver profile.
///
/// `is_blacklisted` is always a concrete boolean here: an entry that exists in
/// the store resolves to `true` or `false`, never to an unknown state (a
/// missing blacklist setting reads as the driver default, `false`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplicationEntry {
    pub display_name: String,
    pub executable: String,
    pub profile_name: String,
    pub is_predefined: bool,
    pub is_blacklisted: bool,
}

/// A running process before reconciliation, as reported by the OS.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessInfo {
    pub process_id: u32,
    pub process_name: String,
    pub window_title: String,
    /// `None` when the OS refused to resolve the image path (protected
    /// processes); never aborts the enumeration.
    pub executable_path: Option<Utf8PathBuf>,
}

/// The focused process before reconciliation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FocusInfo {
    pub process_id: u32,
    pub process_name: String,
    pub window_title: String,
}

/// A running process enriched with its join against the profile store.
///
/// Recomputed on every enumeration pass; never mutated in place.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunningProcess {
    pub process_name: String,
    pub window_title: String,
    pub process_id: u32,
    pub executable_path: Option<Utf8PathBuf>,
    pub has_profile: bool,
    pub profile_name: Option<String>,
    pub blacklist: BlacklistState,
}

/// The focused process enriched with its join against the profile store.
///
/// `is_in_store` distinguishes "no profile" from "not tracked by the driver
/// subsystem at all".
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FocusedApplication {
    pub process_name: String,
    pub window_title: String,
    pub process_id: u32,
    pub is_in_store: bool,
    pub profile_name: Option<String>,
    pub blacklist: BlacklistState,
}

/// Outcome of a blacklist mutation.
///
/// `success=false` with a message is the structured answer for "no entry for
/// this executable yet": the caller may be racing a stale reconciliation view
/// and gets something it can show, not an error.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlacklistResult {
    pub success: bool,
    pub executable: String,
    pub message: String,
}

/// Availability of the driver subsystem.
///
/// All failure is encoded in the value; probing never raises.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverStatus {
    pub available: bool,
    pub error: Option<String>,
}

impl DriverStatus {
    pub fn available() -> Self {
        Self {
            available: true,
            error: None,
        }
    }

    pub fn unavailable(error: impl Into<String>) -> Self {
        Self {
            available: false,
            error: Some(error.into()),
        }
    }
}
