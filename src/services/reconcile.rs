//! The reconciliation join.
//!
//! Pure functions only: live process data in, enriched snapshots out. The
//! join key is the case-folded executable name. Driver profiles are keyed by
//! executable, not by process id, so every instance of the same program gets
//! the same (independently computed) answer. All caching and fallback policy
//! lives in the engine facade, never here.

use indexmap::IndexMap;

use crate::models::{
    ApplicationEntry, BlacklistState, FocusInfo, FocusedApplication, ProcessInfo, RunningProcess,
};

/// Case-folded executable name, the join key. Host filename semantics are
/// case-insensitive.
fn join_key(executable: &str) -> String {
    executable.to_lowercase()
}

/// Build the executable -> entry index for one pass. First store occurrence
/// wins on duplicate executables; store order is preserved.
pub fn application_index(entries: &[ApplicationEntry]) -> IndexMap<String, &ApplicationEntry> {
    let mut index = IndexMap::with_capacity(entries.len());
    for entry in entries {
        index.entry(join_key(&entry.executable)).or_insert(entry);
    }
    index
}

/// Join one executable name against the index.
///
/// Returns `(has_entry, profile_name, blacklist)` upholding the tri-state
/// invariant: `blacklist` is `Unknown` exactly when no entry exists, and a
/// concrete boolean otherwise.
fn join(
    index: &IndexMap<String, &ApplicationEntry>,
    executable: &str,
) -> (bool, Option<String>, BlacklistState) {
    match index.get(&join_key(executable)) {
        Some(entry) => (
            true,
            Some(entry.profile_name.clone()),
            BlacklistState::from_flag(entry.is_blacklisted),
        ),
        None => (false, None, BlacklistState::Unknown),
    }
}

/// Reconcile an enumeration pass: every running process, enriched with its
/// profile-store join.
pub fn reconcile_processes(
    processes: Vec<ProcessInfo>,
    entries: &[ApplicationEntry],
) -> Vec<RunningProcess> {
    let index = application_index(entries);

    processes
        .into_iter()
        .map(|process| {
            let (has_profile, profile_name, blacklist) = join(&index, &process.process_name);
            RunningProcess {
                process_name: process.process_name,
                window_title: process.window_title,
                process_id: process.process_id,
                executable_path: process.executable_path,
                has_profile,
                profile_name,
                blacklist,
            }
        })
        .collect()
}

/// Reconcile a focus poll against the same profile data.
pub fn reconcile_focus(
    focus: Option<FocusInfo>,
    entries: &[ApplicationEntry],
) -> Option<FocusedApplication> {
    let focus = focus?;
    let index = application_index(entries);
    let (is_in_store, profile_name, blacklist) = join(&index, &focus.process_name);

    Some(FocusedApplication {
        process_name: focus.process_name,
        window_title: focus.window_title,
        process_id: focus.process_id,
        is_in_store,
        profile_name,
        blacklist,
    })
}
