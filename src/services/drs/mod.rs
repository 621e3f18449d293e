//! Driver profile store: the blocking store surface, its error type, and the
//! async accessor that owns scheduling, serialization and deadlines.
//!
//! [`ProfileStore`] is the seam between the engine and the vendor driver:
//! `NvapiStore` implements it over the real DRS interface on Windows, tests
//! implement it in memory. [`StoreAccessor`] is the single owner of the store
//! handle; every mutation goes through its write lock, every read through its
//! read lock, and every call through `spawn_blocking` with a bounded deadline
//! so a wedged driver call reports `Timeout` instead of hanging a poll cycle.

#[cfg(windows)]
pub mod ffi;
#[cfg(windows)]
pub mod nvapi;

use regex::Regex;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::Duration;
use thiserror::Error;

use crate::error::EngineError;
use crate::models::{ApplicationEntry, BlacklistResult, DriverStatus, Profile};

/// Failures at the driver-store level.
///
/// Carries driver status codes and failure sites; the accessor folds these
/// into the engine taxonomy with read/write context.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("driver library not found - ensure NVIDIA drivers are installed")]
    LibraryNotFound,

    #[error("driver api initialization failed: {0}")]
    InitFailed(i32),

    #[error("settings session creation failed: {0}")]
    SessionFailed(i32),

    #[error("failed to load driver settings: {0}")]
    LoadFailed(i32),

    #[error("failed to save driver settings: {0}")]
    SaveFailed(i32),

    #[error("profile not found: {0}")]
    ProfileNotFound(String),

    #[error("application not found: {0}")]
    ApplicationNotFound(String),

    #[error("{executable} is already associated with profile {profile}")]
    AlreadyAssociated { executable: String, profile: String },

    #[error("profile name {0} is reserved by a predefined profile")]
    ReservedProfileName(String),

    #[error("invalid executable name: {0:?}")]
    InvalidExecutable(String),

    #[error("driver api entry point missing: {0}")]
    MissingEntryPoint(&'static str),

    #[error("driver api call failed with status {0}")]
    ApiStatus(i32),

    #[error("driver store not supported on this platform")]
    Unsupported,
}

impl StoreError {
    /// Connectivity-class failures mean the driver subsystem itself is gone;
    /// the gate must re-probe before anything else is attempted.
    pub fn is_connectivity(&self) -> bool {
        matches!(
            self,
            StoreError::LibraryNotFound
                | StoreError::InitFailed(_)
                | StoreError::SessionFailed(_)
                | StoreError::Unsupported
        )
    }
}

/// Blocking surface of the driver profile store.
///
/// All methods are synchronous and may touch the driver; the accessor decides
/// where and for how long they run. Implementations must resolve the
/// blacklist flag of every existing entry to a concrete boolean: a missing
/// setting reads as the driver default (`false`), never as "unknown".
#[cfg_attr(test, mockall::automock)]
pub trait ProfileStore: Send + Sync {
    /// Capability probe: can the store be reached right now?
    fn probe(&self) -> Result<(), StoreError>;

    fn list_profiles(&self) -> Result<Vec<Profile>, StoreError>;

    fn list_applications(&self) -> Result<Vec<ApplicationEntry>, StoreError>;

    fn find_profile(&self, name: &str) -> Result<Option<Profile>, StoreError>;

    fn find_application(&self, executable: &str) -> Result<Option<ApplicationEntry>, StoreError>;

    /// Create `profile_name` if missing (reusing an existing profile of that
    /// name otherwise) and associate `executable` with it.
    fn create_profile(&self, profile_name: &str, executable: &str) -> Result<(), StoreError>;

    /// Set the blacklist flag of an existing entry. Fails with
    /// [`StoreError::ApplicationNotFound`] when no entry exists.
    fn set_blacklist(&self, executable: &str, blacklisted: bool) -> Result<(), StoreError>;

    /// Re-read the backing configuration (after external edits).
    fn reload(&self) -> Result<(), StoreError>;
}

/// The platform store: NVAPI on Windows, a permanently-unavailable stub
/// elsewhere.
pub fn system_store() -> Box<dyn ProfileStore> {
    #[cfg(windows)]
    {
        Box::new(nvapi::NvapiStore::new())
    }
    #[cfg(not(windows))]
    {
        Box::new(UnsupportedStore)
    }
}

/// Stub store for hosts without the vendor driver interface.
#[cfg(not(windows))]
struct UnsupportedStore;

#[cfg(not(windows))]
impl ProfileStore for UnsupportedStore {
    fn probe(&self) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        Err(StoreError::Unsupported)
    }

    fn list_applications(&self) -> Result<Vec<ApplicationEntry>, StoreError> {
        Err(StoreError::Unsupported)
    }

    fn find_profile(&self, _name: &str) -> Result<Option<Profile>, StoreError> {
        Err(StoreError::Unsupported)
    }

    fn find_application(&self, _executable: &str) -> Result<Option<ApplicationEntry>, StoreError> {
        Err(StoreError::Unsupported)
    }

    fn create_profile(&self, _profile_name: &str, _executable: &str) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }

    fn set_blacklist(&self, _executable: &str, _blacklisted: bool) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }

    fn reload(&self) -> Result<(), StoreError> {
        Err(StoreError::Unsupported)
    }
}

static EXECUTABLE_NAME: OnceLock<Regex> = OnceLock::new();

/// A bare filename: non-empty, no path separators, none of the characters
/// Windows forbids in filenames.
fn executable_name_pattern() -> &'static Regex {
    EXECUTABLE_NAME
        .get_or_init(|| Regex::new(r#"^[^\\/:*?"<>|\x00-\x1F]+$"#).expect("invalid executable-name regex"))
}

pub(crate) fn is_valid_executable_name(name: &str) -> bool {
    !name.trim().is_empty() && executable_name_pattern().is_match(name)
}

/// Async accessor over the profile store, the engine's serialization point.
///
/// Reads share the read lock (concurrent with each other, never overlapping a
/// mutation); writes take the write lock (mutually exclusive). Both run on
/// the blocking pool with the configured deadline, so no store call can
/// outlive its poll cycle unnoticed.
#[derive(Clone)]
pub struct StoreAccessor {
    store: Arc<RwLock<Box<dyn ProfileStore>>>,
    op_timeout: Duration,
}

impl StoreAccessor {
    pub fn new(store: Box<dyn ProfileStore>, op_timeout: Duration) -> Self {
        Self {
            store: Arc::new(RwLock::new(store)),
            op_timeout,
        }
    }

    /// Run a store closure on the blocking pool under the requested lock,
    /// bounded by the operation deadline. The outer error is scheduling
    /// (timeout / task failure); the inner result is the store's own.
    async fn run_store<T, F>(
        &self,
        operation: &'static str,
        exclusive: bool,
        f: F,
    ) -> Result<Result<T, StoreError>, EngineError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn ProfileStore) -> Result<T, StoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let task = tokio::task::spawn_blocking(move || {
            if exclusive {
                let guard = store.write().unwrap();
                f(&**guard)
            } else {
                let guard = store.read().unwrap();
                f(&**guard)
            }
        });

        match tokio::time::timeout(self.op_timeout, task).await {
            Err(_) => {
                tracing::warn!("store operation {operation} timed out after {:?}", self.op_timeout);
                Err(EngineError::Timeout {
                    operation,
                    timeout: self.op_timeout,
                })
            }
            Ok(Err(join_err)) => Err(EngineError::StoreRead(format!(
                "store task for {operation} failed: {join_err}"
            ))),
            Ok(Ok(result)) => Ok(result),
        }
    }

    /// Probe the driver subsystem. Never fails: all failure is encoded in the
    /// returned status.
    pub async fn probe(&self) -> DriverStatus {
        match self.run_store("probe", false, |store| store.probe()).await {
            Ok(Ok(())) => DriverStatus::available(),
            Ok(Err(err)) => DriverStatus::unavailable(err.to_string()),
            Err(err) => DriverStatus::unavailable(err.to_string()),
        }
    }

    pub async fn list_profiles(&self) -> Result<Vec<Profile>, EngineError> {
        self.run_store("list_profiles", false, |store| store.list_profiles())
            .await?
            .map_err(EngineError::read)
    }

    pub async fn list_applications(&self) -> Result<Vec<ApplicationEntry>, EngineError> {
        self.run_store("list_applications", false, |store| store.list_applications())
            .await?
            .map_err(EngineError::read)
    }

    /// Create a profile and associate an executable with it.
    ///
    /// Idempotent in effect: an identical existing association short-circuits
    /// to success under the write lock. The underlying store is *not*
    /// idempotent (it rejects duplicate names), which is why the pre-check
    /// lives here rather than trusting the driver.
    pub async fn create_profile(
        &self,
        executable: &str,
        profile_name: &str,
    ) -> Result<(), EngineError> {
        if !is_valid_executable_name(executable) {
            return Err(EngineError::StoreWrite(
                StoreError::InvalidExecutable(executable.to_string()).to_string(),
            ));
        }
        if profile_name.trim().is_empty() {
            return Err(EngineError::StoreWrite("profile name must not be empty".to_string()));
        }

        let exe = executable.to_string();
        let name = profile_name.to_string();

        self.run_store("create_profile", true, move |store| {
            if let Some(entry) = store.find_application(&exe)? {
                if entry.profile_name.eq_ignore_ascii_case(&name) {
                    // Same association already present: no-op success.
                    return Ok(());
                }
                return Err(StoreError::AlreadyAssociated {
                    executable: exe,
                    profile: entry.profile_name,
                });
            }

            if let Some(profile) = store.find_profile(&name)? {
                if profile.is_predefined {
                    return Err(StoreError::ReservedProfileName(name));
                }
            }

            store.create_profile(&name, &exe)
        })
        .await?
        .map_err(EngineError::write)
    }

    /// Toggle the blacklist flag of an existing entry.
    ///
    /// A missing entry is a structured `success=false`, not an error; the
    /// caller may be acting on a reconciliation view the store hasn't synced
    /// into yet.
    pub async fn set_blacklist(
        &self,
        executable: &str,
        blacklisted: bool,
    ) -> Result<BlacklistResult, EngineError> {
        let exe = executable.to_string();

        let outcome = self
            .run_store("set_blacklist", true, move |store| {
                store.set_blacklist(&exe, blacklisted)
            })
            .await?;

        match outcome {
            Ok(()) => Ok(BlacklistResult {
                success: true,
                executable: executable.to_string(),
                message: if blacklisted {
                    "Application blacklisted".to_string()
                } else {
                    "Application removed from blacklist".to_string()
                },
            }),
            Err(StoreError::ApplicationNotFound(_)) => Ok(BlacklistResult {
                success: false,
                executable: executable.to_string(),
                message: "No driver profile entry exists for this executable".to_string(),
            }),
            Err(err) => Err(EngineError::write(err)),
        }
    }

    /// Force the store to re-read its backing configuration.
    pub async fn reload(&self) -> Result<(), EngineError> {
        self.run_store("reload", true, |store| store.reload())
            .await?
            .map_err(EngineError::read)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    fn entry(executable: &str, profile: &str, blacklisted: bool) -> ApplicationEntry {
        ApplicationEntry {
            display_name: profile.to_string(),
            executable: executable.to_string(),
            profile_name: profile.to_string(),
            is_predefined: false,
            is_blacklisted: blacklisted,
        }
    }

    fn accessor(store: MockProfileStore) -> StoreAccessor {
        StoreAccessor::new(Box::new(store), Duration::from_millis(500))
    }

    #[test]
    fn test_executable_name_validation() {
        assert!(is_valid_executable_name("game.exe"));
        assert!(is_valid_executable_name("Some Game Launcher.exe"));
        assert!(!is_valid_executable_name(""));
        assert!(!is_valid_executable_name("   "));
        assert!(!is_valid_executable_name("dir\\game.exe"));
        assert!(!is_valid_executable_name("dir/game.exe"));
        assert!(!is_valid_executable_name("what?.exe"));
    }

    #[tokio::test]
    async fn test_create_profile_is_noop_for_identical_association() {
        let mut store = MockProfileStore::new();
        store
            .expect_find_application()
            .with(eq("game.exe"))
            .returning(|_| Ok(Some(entry("game.exe", "Foo", false))));
        // The underlying create must never run.
        store.expect_create_profile().times(0);

        let accessor = accessor(store);
        accessor.create_profile("game.exe", "Foo").await.unwrap();
    }

    #[tokio::test]
    async fn test_create_profile_rejects_conflicting_association() {
        let mut store = MockProfileStore::new();
        store
            .expect_find_application()
            .returning(|_| Ok(Some(entry("game.exe", "Other", false))));

        let accessor = accessor(store);
        let err = accessor.create_profile("game.exe", "Foo").await.unwrap_err();
        match err {
            EngineError::StoreWrite(msg) => assert!(msg.contains("Other")),
            other => panic!("expected StoreWrite, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_create_profile_rejects_reserved_name() {
        let mut store = MockProfileStore::new();
        store.expect_find_application().returning(|_| Ok(None));
        store.expect_find_profile().with(eq("Quake II")).returning(|name| {
            Ok(Some(Profile {
                name: name.to_string(),
                is_predefined: true,
                application_count: 1,
            }))
        });
        store.expect_create_profile().times(0);

        let accessor = accessor(store);
        let err = accessor.create_profile("game.exe", "Quake II").await.unwrap_err();
        assert!(matches!(err, EngineError::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_create_profile_rejects_invalid_executable() {
        // Validation fails before the store is ever consulted.
        let store = MockProfileStore::new();
        let accessor = accessor(store);

        let err = accessor.create_profile("", "Foo").await.unwrap_err();
        assert!(matches!(err, EngineError::StoreWrite(_)));

        let err = accessor
            .create_profile("C:\\games\\game.exe", "Foo")
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StoreWrite(_)));
    }

    #[tokio::test]
    async fn test_set_blacklist_missing_entry_is_structured_failure() {
        let mut store = MockProfileStore::new();
        store
            .expect_set_blacklist()
            .returning(|exe, _| Err(StoreError::ApplicationNotFound(exe.to_string())));

        let accessor = accessor(store);
        let result = accessor.set_blacklist("ghost.exe", true).await.unwrap();
        assert!(!result.success);
        assert_eq!(result.executable, "ghost.exe");
        assert!(!result.message.is_empty());
    }

    #[tokio::test]
    async fn test_set_blacklist_success() {
        let mut store = MockProfileStore::new();
        store
            .expect_set_blacklist()
            .with(eq("game.exe"), eq(true))
            .returning(|_, _| Ok(()));

        let accessor = accessor(store);
        let result = accessor.set_blacklist("game.exe", true).await.unwrap();
        assert!(result.success);
    }

    #[tokio::test]
    async fn test_slow_store_call_reports_timeout() {
        let mut store = MockProfileStore::new();
        store.expect_list_profiles().returning(|| {
            std::thread::sleep(Duration::from_millis(250));
            Ok(Vec::new())
        });

        let accessor = StoreAccessor::new(Box::new(store), Duration::from_millis(25));
        let err = accessor.list_profiles().await.unwrap_err();
        assert!(matches!(err, EngineError::Timeout { .. }));
    }

    #[tokio::test]
    async fn test_probe_encodes_failure_as_status() {
        let mut store = MockProfileStore::new();
        store.expect_probe().returning(|| Err(StoreError::LibraryNotFound));

        let accessor = accessor(store);
        let status = accessor.probe().await;
        assert!(!status.available);
        assert!(status.error.unwrap().contains("driver library not found"));
    }

    #[tokio::test]
    async fn test_connectivity_error_maps_to_unavailable() {
        let mut store = MockProfileStore::new();
        store
            .expect_list_applications()
            .returning(|| Err(StoreError::SessionFailed(-4)));

        let accessor = accessor(store);
        let err = accessor.list_applications().await.unwrap_err();
        assert!(err.is_unavailable());
    }
}
