//! Shared test doubles: an in-memory profile store plus scriptable process
//! and focus sources. All of them share state through `Arc`, so a test keeps
//! a handle for steering while the engine owns its own clone.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use drswatch::engine::Engine;
use drswatch::error::EngineError;
use drswatch::models::{ApplicationEntry, FocusInfo, ProcessInfo, Profile};
use drswatch::services::drs::{ProfileStore, StoreError};
use drswatch::services::focus::FocusTracker;
use drswatch::services::processes::ProcessEnumerator;

#[derive(Default)]
struct MemoryInner {
    profiles: Mutex<Vec<Profile>>,
    entries: Mutex<Vec<ApplicationEntry>>,
    available: AtomicBool,
    fail_reads: AtomicBool,
    read_delay_ms: AtomicU64,
    write_delay_ms: AtomicU64,
    active_writers: AtomicUsize,
    writer_overlap: AtomicBool,
    mutation_count: AtomicUsize,
}

/// In-memory [`ProfileStore`] with availability, failure and latency toggles
/// plus a concurrent-writer detector.
#[derive(Clone)]
pub struct MemoryStore {
    inner: Arc<MemoryInner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        let inner = MemoryInner::default();
        inner.available.store(true, Ordering::SeqCst);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Seed one profile with one entry.
    pub fn seed(&self, profile_name: &str, executable: &str, blacklisted: bool) -> &Self {
        self.seed_full(profile_name, executable, blacklisted, false)
    }

    pub fn seed_full(
        &self,
        profile_name: &str,
        executable: &str,
        blacklisted: bool,
        predefined: bool,
    ) -> &Self {
        let mut profiles = self.inner.profiles.lock().unwrap();
        match profiles
            .iter_mut()
            .find(|p| p.name.eq_ignore_ascii_case(profile_name))
        {
            Some(profile) => profile.application_count += 1,
            None => profiles.push(Profile {
                name: profile_name.to_string(),
                is_predefined: predefined,
                application_count: 1,
            }),
        }

        self.inner.entries.lock().unwrap().push(ApplicationEntry {
            display_name: profile_name.to_string(),
            executable: executable.to_string(),
            profile_name: profile_name.to_string(),
            is_predefined: predefined,
            is_blacklisted: blacklisted,
        });
        self
    }

    pub fn set_available(&self, available: bool) {
        self.inner.available.store(available, Ordering::SeqCst);
    }

    pub fn set_fail_reads(&self, fail: bool) {
        self.inner.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn set_read_delay(&self, delay: Duration) {
        self.inner
            .read_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn set_write_delay(&self, delay: Duration) {
        self.inner
            .write_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    /// True if two mutations ever ran at the same time.
    pub fn saw_writer_overlap(&self) -> bool {
        self.inner.writer_overlap.load(Ordering::SeqCst)
    }

    pub fn mutation_count(&self) -> usize {
        self.inner.mutation_count.load(Ordering::SeqCst)
    }

    fn check_read(&self) -> Result<(), StoreError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::LibraryNotFound);
        }
        let delay = self.inner.read_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }
        if self.inner.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::ApiStatus(-1));
        }
        Ok(())
    }

    /// Mutation prologue/epilogue wrapper tracking writer overlap.
    fn mutate<T>(&self, f: impl FnOnce() -> Result<T, StoreError>) -> Result<T, StoreError> {
        if !self.inner.available.load(Ordering::SeqCst) {
            return Err(StoreError::LibraryNotFound);
        }

        if self.inner.active_writers.fetch_add(1, Ordering::SeqCst) > 0 {
            self.inner.writer_overlap.store(true, Ordering::SeqCst);
        }

        let delay = self.inner.write_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        let result = f();
        if result.is_ok() {
            self.inner.mutation_count.fetch_add(1, Ordering::SeqCst);
        }
        self.inner.active_writers.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

impl ProfileStore for MemoryStore {
    fn probe(&self) -> Result<(), StoreError> {
        if self.inner.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(StoreError::LibraryNotFound)
        }
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.check_read()?;
        Ok(self.inner.profiles.lock().unwrap().clone())
    }

    fn list_applications(&self) -> Result<Vec<ApplicationEntry>, StoreError> {
        self.check_read()?;
        Ok(self.inner.entries.lock().unwrap().clone())
    }

    fn find_profile(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        self.check_read()?;
        Ok(self
            .inner
            .profiles
            .lock()
            .unwrap()
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(name))
            .cloned())
    }

    fn find_application(&self, executable: &str) -> Result<Option<ApplicationEntry>, StoreError> {
        self.check_read()?;
        Ok(self
            .inner
            .entries
            .lock()
            .unwrap()
            .iter()
            .find(|e| e.executable.eq_ignore_ascii_case(executable))
            .cloned())
    }

    fn create_profile(&self, profile_name: &str, executable: &str) -> Result<(), StoreError> {
        self.mutate(|| {
            self.seed(profile_name, executable, false);
            Ok(())
        })
    }

    fn set_blacklist(&self, executable: &str, blacklisted: bool) -> Result<(), StoreError> {
        self.mutate(|| {
            let mut entries = self.inner.entries.lock().unwrap();
            match entries
                .iter_mut()
                .find(|e| e.executable.eq_ignore_ascii_case(executable))
            {
                Some(entry) => {
                    entry.is_blacklisted = blacklisted;
                    Ok(())
                }
                None => Err(StoreError::ApplicationNotFound(executable.to_string())),
            }
        })
    }

    fn reload(&self) -> Result<(), StoreError> {
        self.check_read()
    }
}

/// Process source answering with a settable fixed list.
#[derive(Clone)]
pub struct StaticProcesses {
    processes: Arc<Mutex<Vec<ProcessInfo>>>,
}

impl StaticProcesses {
    pub fn new(processes: Vec<ProcessInfo>) -> Self {
        Self {
            processes: Arc::new(Mutex::new(processes)),
        }
    }

    pub fn set(&self, processes: Vec<ProcessInfo>) {
        *self.processes.lock().unwrap() = processes;
    }
}

impl ProcessEnumerator for StaticProcesses {
    fn list_processes(&self) -> Result<Vec<ProcessInfo>, EngineError> {
        Ok(self.processes.lock().unwrap().clone())
    }
}

/// Focus source answering with a settable scripted value.
#[derive(Clone)]
pub struct ScriptedFocus {
    focus: Arc<Mutex<Option<FocusInfo>>>,
}

impl ScriptedFocus {
    pub fn new(focus: Option<FocusInfo>) -> Self {
        Self {
            focus: Arc::new(Mutex::new(focus)),
        }
    }

    pub fn set(&self, focus: Option<FocusInfo>) {
        *self.focus.lock().unwrap() = focus;
    }
}

impl FocusTracker for ScriptedFocus {
    fn current_focus(&self) -> Result<Option<FocusInfo>, EngineError> {
        Ok(self.focus.lock().unwrap().clone())
    }
}

pub fn process(pid: u32, name: &str) -> ProcessInfo {
    ProcessInfo {
        process_id: pid,
        process_name: name.to_string(),
        window_title: format!("{name} - window"),
        executable_path: None,
    }
}

pub fn focus_info(pid: u32, name: &str) -> FocusInfo {
    FocusInfo {
        process_id: pid,
        process_name: name.to_string(),
        window_title: format!("{name} - window"),
    }
}

/// Engine over the given fakes with a test-friendly deadline.
pub fn build_engine(
    store: &MemoryStore,
    processes: &StaticProcesses,
    focus: &ScriptedFocus,
) -> Engine {
    Engine::new(
        Box::new(store.clone()),
        Arc::new(processes.clone()),
        Arc::new(focus.clone()),
        Duration::from_millis(500),
    )
}
