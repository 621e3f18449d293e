//! Display-layer boundary.
//!
//! The transport in front of this module only marshals bytes; everything that
//! crosses here is plain data. Requests arrive with caller-convention
//! (camelCase) parameter names and are translated to engine-convention
//! (snake_case) by the serde attributes on [`Request`]. That translation
//! covers request parameters only. Payload field names and enum variants are
//! explicitly mapped on their own types (`models`), never implicitly renamed.
//!
//! No error type crosses this boundary: every fallible call answers with a
//! tagged [`Failure`] carrying the class and the full detail. The display
//! layer may flatten that to a null/false/default; the detail is its to
//! discard, not ours to lose.

use serde::{Deserialize, Serialize};

use crate::engine::Engine;
use crate::error::EngineError;
use crate::models::{
    ApplicationEntry, BlacklistResult, DriverStatus, FocusedApplication, Profile, RunningProcess,
};

/// A request from the display layer.
///
/// Tag and parameter names follow the boundary table: snake_case request
/// names, camelCase parameter names.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "request", rename_all = "snake_case")]
pub enum Request {
    GetProfiles,
    GetAllApplications,
    GetRunningProcesses,
    GetFocusApplication,
    #[serde(rename_all = "camelCase")]
    CreateProfile {
        executable: String,
        profile_name: String,
    },
    #[serde(rename_all = "camelCase")]
    BlacklistApplication { executable: String },
    #[serde(rename_all = "camelCase")]
    UnblacklistApplication { executable: String },
    CheckNvapiStatus,
    ReloadSettings,
}

/// Failure classes as the display layer sees them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FailureCode {
    StoreUnavailable,
    StoreRead,
    StoreWrite,
    NotFound,
    Timeout,
    PermissionDenied,
}

/// A failed call, as data. `message` keeps the full underlying detail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Failure {
    pub code: FailureCode,
    pub message: String,
}

impl From<EngineError> for Failure {
    fn from(err: EngineError) -> Self {
        let code = match &err {
            EngineError::StoreUnavailable(_) => FailureCode::StoreUnavailable,
            EngineError::StoreRead(_) => FailureCode::StoreRead,
            EngineError::StoreWrite(_) => FailureCode::StoreWrite,
            EngineError::NotFound(_) => FailureCode::NotFound,
            EngineError::Timeout { .. } => FailureCode::Timeout,
            EngineError::PermissionDenied(_) => FailureCode::PermissionDenied,
        };
        Failure {
            code,
            message: err.to_string(),
        }
    }
}

/// The answer to a [`Request`].
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", content = "body", rename_all = "camelCase")]
pub enum Reply {
    Profiles(Vec<Profile>),
    Applications(Vec<ApplicationEntry>),
    Processes(Vec<RunningProcess>),
    Focus(Option<FocusedApplication>),
    Blacklist(BlacklistResult),
    Status(DriverStatus),
    /// Void success (create_profile, reload_settings).
    Ack,
    Failure(Failure),
}

impl Reply {
    fn from_result<T>(result: Result<T, EngineError>, wrap: impl FnOnce(T) -> Reply) -> Reply {
        match result {
            Ok(value) => wrap(value),
            Err(err) => {
                tracing::debug!("boundary call failed: {err}");
                Reply::Failure(Failure::from(err))
            }
        }
    }
}

/// Dispatch one request against the engine. Never panics, never returns an
/// error type: a failed call is a [`Reply::Failure`].
pub async fn dispatch(engine: &Engine, request: Request) -> Reply {
    match request {
        Request::GetProfiles => Reply::from_result(engine.get_profiles().await, Reply::Profiles),
        Request::GetAllApplications => {
            Reply::from_result(engine.get_all_applications().await, Reply::Applications)
        }
        Request::GetRunningProcesses => {
            Reply::from_result(engine.get_running_processes().await, Reply::Processes)
        }
        Request::GetFocusApplication => {
            Reply::from_result(engine.get_focus_application().await, Reply::Focus)
        }
        Request::CreateProfile {
            executable,
            profile_name,
        } => Reply::from_result(
            engine.create_profile(&executable, &profile_name).await,
            |()| Reply::Ack,
        ),
        Request::BlacklistApplication { executable } => Reply::from_result(
            engine.blacklist_application(&executable).await,
            Reply::Blacklist,
        ),
        Request::UnblacklistApplication { executable } => Reply::from_result(
            engine.unblacklist_application(&executable).await,
            Reply::Blacklist,
        ),
        Request::CheckNvapiStatus => Reply::Status(engine.check_driver_status().await),
        Request::ReloadSettings => {
            Reply::from_result(engine.reload_settings().await, |()| Reply::Ack)
        }
    }
}
