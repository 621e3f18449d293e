//! NVAPI-backed [`ProfileStore`].
//!
//! Owns the single DRS session handle for the whole process (the accessor is
//! the only caller and serializes access). The session connects lazily on
//! first use and is dropped after any connectivity-class failure so the next
//! call reconnects from scratch, which is what lets a driver installed after
//! launch become visible on re-probe.

use std::ptr;
use std::sync::Mutex;

use crate::models::{ApplicationEntry, Profile};

use super::ffi::{
    self, APPLICATION_VER, BLACKLIST_OFF, BLACKLIST_ON, BLACKLIST_SETTING_ID, DrsLibrary,
    PROFILE_VER, ProfileHandle, RawApplication, RawProfile, RawSetting, SessionHandle,
    STATUS_END_ENUMERATION, STATUS_EXECUTABLE_NOT_FOUND, STATUS_OK, STATUS_PROFILE_NOT_FOUND,
    STATUS_SETTING_NOT_FOUND,
};
use super::{ProfileStore, StoreError};

/// Applications are enumerated from the driver in fixed-size batches.
const APP_BATCH: usize = 32;

struct Session {
    handle: SessionHandle,
}

// SAFETY: the raw session handle is only ever used while the enclosing Mutex
// is held; DRS handles are not thread-affine.
unsafe impl Send for Session {}

pub struct NvapiStore {
    session: Mutex<Option<Session>>,
}

impl NvapiStore {
    pub fn new() -> Self {
        Self {
            session: Mutex::new(None),
        }
    }

    /// Run `f` against a connected session, connecting first if necessary.
    /// Connectivity-class failures disconnect so the next call retries.
    fn with_session<T>(
        &self,
        f: impl FnOnce(&DrsLibrary, SessionHandle) -> Result<T, StoreError>,
    ) -> Result<T, StoreError> {
        let api = ffi::shared()?;
        let mut guard = self.session.lock().unwrap();

        if guard.is_none() {
            let handle = connect(api)?;
            tracing::debug!("DRS session established");
            *guard = Some(Session { handle });
        }

        let handle = guard.as_ref().map(|s| s.handle).unwrap_or(ptr::null_mut());
        let result = f(api, handle);

        if let Err(err) = &result {
            if err.is_connectivity() {
                tracing::warn!("DRS session dropped after connectivity failure: {err}");
                *guard = None;
            }
        }

        result
    }
}

impl Default for NvapiStore {
    fn default() -> Self {
        Self::new()
    }
}

/// Create a session and load the driver's current settings into it.
fn connect(api: &DrsLibrary) -> Result<SessionHandle, StoreError> {
    let create = api.create_session()?;
    let load = api.load_settings()?;

    unsafe {
        let mut handle: SessionHandle = ptr::null_mut();

        let status = create(&mut handle);
        if status != STATUS_OK {
            return Err(StoreError::SessionFailed(status));
        }

        let status = load(handle);
        if status != STATUS_OK {
            if let Ok(destroy) = api.destroy_session() {
                destroy(handle);
            }
            // Load failure during connect means no usable session at all.
            return Err(StoreError::SessionFailed(status));
        }

        Ok(handle)
    }
}

fn profile_info(
    api: &DrsLibrary,
    session: SessionHandle,
    profile: ProfileHandle,
) -> Result<RawProfile, StoreError> {
    let get_info = api.get_profile_info()?;
    let mut info = RawProfile::default();
    let status = unsafe { get_info(session, profile, &mut info) };
    if status != STATUS_OK {
        return Err(StoreError::ApiStatus(status));
    }
    Ok(info)
}

fn find_profile_handle(
    api: &DrsLibrary,
    session: SessionHandle,
    name: &str,
) -> Result<Option<ProfileHandle>, StoreError> {
    let find = api.find_profile_by_name()?;
    let mut wide = [0u16; ffi::UNICODE_STRING_MAX];
    ffi::to_wide(name, &mut wide);

    unsafe {
        let mut handle: ProfileHandle = ptr::null_mut();
        let status = find(session, wide.as_ptr(), &mut handle);
        match status {
            STATUS_OK => Ok(Some(handle)),
            STATUS_PROFILE_NOT_FOUND => Ok(None),
            other => Err(StoreError::ApiStatus(other)),
        }
    }
}

fn find_application_handle(
    api: &DrsLibrary,
    session: SessionHandle,
    executable: &str,
) -> Result<Option<(ProfileHandle, RawApplication)>, StoreError> {
    let find = api.find_application_by_name()?;
    let mut wide = [0u16; ffi::UNICODE_STRING_MAX];
    ffi::to_wide(executable, &mut wide);

    unsafe {
        let mut profile: ProfileHandle = ptr::null_mut();
        let mut app = RawApplication::default();
        let status = find(session, wide.as_ptr(), &mut profile, &mut app);
        match status {
            STATUS_OK => Ok(Some((profile, app))),
            STATUS_EXECUTABLE_NOT_FOUND => Ok(None),
            other => Err(StoreError::ApiStatus(other)),
        }
    }
}

/// Read the blacklist DWORD for a profile. A missing setting is the driver
/// default: not blacklisted.
fn read_blacklist_flag(
    api: &DrsLibrary,
    session: SessionHandle,
    profile: ProfileHandle,
) -> Result<bool, StoreError> {
    let get_setting = api.get_setting()?;
    let mut setting = RawSetting::default();

    let status = unsafe { get_setting(session, profile, BLACKLIST_SETTING_ID, &mut setting) };
    match status {
        STATUS_OK => Ok(unsafe { setting.current_value.dword_value } == BLACKLIST_ON),
        STATUS_SETTING_NOT_FOUND => Ok(false),
        other => Err(StoreError::ApiStatus(other)),
    }
}

fn write_blacklist_flag(
    api: &DrsLibrary,
    session: SessionHandle,
    profile: ProfileHandle,
    blacklisted: bool,
) -> Result<(), StoreError> {
    let set_setting = api.set_setting()?;
    let mut setting = RawSetting {
        setting_id: BLACKLIST_SETTING_ID,
        setting_type: 0, // DWORD
        ..Default::default()
    };
    setting.current_value.dword_value = if blacklisted { BLACKLIST_ON } else { BLACKLIST_OFF };

    let status = unsafe { set_setting(session, profile, &mut setting) };
    if status != STATUS_OK {
        return Err(StoreError::ApiStatus(status));
    }
    Ok(())
}

fn save(api: &DrsLibrary, session: SessionHandle) -> Result<(), StoreError> {
    let save_fn = api.save_settings()?;
    let status = unsafe { save_fn(session) };
    if status != STATUS_OK {
        return Err(StoreError::SaveFailed(status));
    }
    Ok(())
}

/// Enumerate the applications of one profile in driver batches.
fn collect_applications(
    api: &DrsLibrary,
    session: SessionHandle,
    profile: ProfileHandle,
    profile_name: &str,
    blacklisted: bool,
) -> Result<Vec<ApplicationEntry>, StoreError> {
    let enum_apps = api.enum_applications()?;

    let mut entries = Vec::new();
    let mut start: u32 = 0;

    loop {
        let mut batch: [RawApplication; APP_BATCH] = std::array::from_fn(|_| RawApplication::default());
        let mut count = APP_BATCH as u32;

        let status = unsafe { enum_apps(session, profile, start, &mut count, batch.as_mut_ptr()) };
        if status == STATUS_END_ENUMERATION || count == 0 {
            break;
        }
        if status != STATUS_OK {
            // A profile with unreadable apps should not sink the whole pass.
            tracing::debug!(
                "application enumeration stopped for profile {profile_name}: status {status}"
            );
            break;
        }

        for app in batch.iter().take(count as usize) {
            entries.push(ApplicationEntry {
                display_name: ffi::from_wide(&app.user_friendly_name),
                executable: ffi::from_wide(&app.app_name),
                profile_name: profile_name.to_string(),
                is_predefined: app.is_predefined != 0,
                is_blacklisted: blacklisted,
            });
        }

        start += count;
        if (count as usize) < APP_BATCH {
            break;
        }
    }

    Ok(entries)
}

impl ProfileStore for NvapiStore {
    fn probe(&self) -> Result<(), StoreError> {
        self.with_session(|_, _| Ok(()))
    }

    fn list_profiles(&self) -> Result<Vec<Profile>, StoreError> {
        self.with_session(|api, session| {
            let enum_profiles = api.enum_profiles()?;
            let mut profiles = Vec::new();
            let mut index: u32 = 0;

            loop {
                let mut handle: ProfileHandle = ptr::null_mut();
                let status = unsafe { enum_profiles(session, index, &mut handle) };
                if status == STATUS_END_ENUMERATION {
                    break;
                }
                if status != STATUS_OK {
                    return Err(StoreError::ApiStatus(status));
                }

                if let Ok(info) = profile_info(api, session, handle) {
                    profiles.push(Profile {
                        name: ffi::from_wide(&info.profile_name),
                        is_predefined: info.is_predefined != 0,
                        application_count: info.num_of_apps,
                    });
                }

                index += 1;
            }

            Ok(profiles)
        })
    }

    fn list_applications(&self) -> Result<Vec<ApplicationEntry>, StoreError> {
        self.with_session(|api, session| {
            let enum_profiles = api.enum_profiles()?;
            let mut entries = Vec::new();
            let mut index: u32 = 0;

            loop {
                let mut handle: ProfileHandle = ptr::null_mut();
                let status = unsafe { enum_profiles(session, index, &mut handle) };
                if status == STATUS_END_ENUMERATION {
                    break;
                }
                if status != STATUS_OK {
                    return Err(StoreError::ApiStatus(status));
                }
                index += 1;

                let Ok(info) = profile_info(api, session, handle) else {
                    continue;
                };
                if info.num_of_apps == 0 {
                    continue;
                }

                let name = ffi::from_wide(&info.profile_name);
                // The flag lives on the profile; every entry under it shares
                // the same concrete answer.
                let blacklisted = read_blacklist_flag(api, session, handle)?;
                entries.extend(collect_applications(api, session, handle, &name, blacklisted)?);
            }

            Ok(entries)
        })
    }

    fn find_profile(&self, name: &str) -> Result<Option<Profile>, StoreError> {
        self.with_session(|api, session| {
            let Some(handle) = find_profile_handle(api, session, name)? else {
                return Ok(None);
            };
            let info = profile_info(api, session, handle)?;
            Ok(Some(Profile {
                name: ffi::from_wide(&info.profile_name),
                is_predefined: info.is_predefined != 0,
                application_count: info.num_of_apps,
            }))
        })
    }

    fn find_application(&self, executable: &str) -> Result<Option<ApplicationEntry>, StoreError> {
        self.with_session(|api, session| {
            let Some((profile, app)) = find_application_handle(api, session, executable)? else {
                return Ok(None);
            };

            let info = profile_info(api, session, profile)?;
            let blacklisted = read_blacklist_flag(api, session, profile)?;

            Ok(Some(ApplicationEntry {
                display_name: ffi::from_wide(&app.user_friendly_name),
                executable: ffi::from_wide(&app.app_name),
                profile_name: ffi::from_wide(&info.profile_name),
                is_predefined: app.is_predefined != 0,
                is_blacklisted: blacklisted,
            }))
        })
    }

    fn create_profile(&self, profile_name: &str, executable: &str) -> Result<(), StoreError> {
        self.with_session(|api, session| {
            // Reuse an existing profile of that name; create otherwise.
            let profile = match find_profile_handle(api, session, profile_name)? {
                Some(handle) => handle,
                None => {
                    let create = api.create_profile()?;
                    let mut info = RawProfile {
                        version: PROFILE_VER,
                        ..Default::default()
                    };
                    ffi::to_wide(profile_name, &mut info.profile_name);

                    let mut handle: ProfileHandle = ptr::null_mut();
                    let status = unsafe { create(session, &mut info, &mut handle) };
                    if status != STATUS_OK {
                        return Err(StoreError::ApiStatus(status));
                    }
                    handle
                }
            };

            let create_app = api.create_application()?;
            let mut app = RawApplication {
                version: APPLICATION_VER,
                ..Default::default()
            };
            ffi::to_wide(executable, &mut app.app_name);
            ffi::to_wide(profile_name, &mut app.user_friendly_name);

            let status = unsafe { create_app(session, profile, &mut app) };
            if status != STATUS_OK {
                return Err(StoreError::ApiStatus(status));
            }

            save(api, session)?;
            tracing::info!("created profile {profile_name} for {executable}");
            Ok(())
        })
    }

    fn set_blacklist(&self, executable: &str, blacklisted: bool) -> Result<(), StoreError> {
        self.with_session(|api, session| {
            let Some((profile, _)) = find_application_handle(api, session, executable)? else {
                return Err(StoreError::ApplicationNotFound(executable.to_string()));
            };

            write_blacklist_flag(api, session, profile, blacklisted)?;
            save(api, session)?;
            tracing::info!("set blacklist={blacklisted} for {executable}");
            Ok(())
        })
    }

    fn reload(&self) -> Result<(), StoreError> {
        self.with_session(|api, session| {
            let load = api.load_settings()?;
            let status = unsafe { load(session) };
            if status != STATUS_OK {
                return Err(StoreError::LoadFailed(status));
            }
            Ok(())
        })
    }
}
