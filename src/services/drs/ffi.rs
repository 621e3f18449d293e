//! Raw bindings to the NVAPI driver-settings (DRS) interface.
//!
//! NVAPI exports a single C symbol, `nvapi_QueryInterface`; every other entry
//! point is fetched from it by a fixed 32-bit id. [`DrsLibrary`] wraps the
//! loaded library and resolves typed entry points on demand; a missing id
//! (older drivers) surfaces as [`StoreError::MissingEntryPoint`] at the call
//! site instead of failing the whole load.

use libloading::{Library, Symbol};
use std::ffi::c_void;
use std::sync::OnceLock;

use super::StoreError;

/// Opaque DRS session handle.
pub type SessionHandle = *mut c_void;
/// Opaque DRS profile handle.
pub type ProfileHandle = *mut c_void;

// NVAPI status codes this module reacts to.
pub const STATUS_OK: i32 = 0;
pub const STATUS_END_ENUMERATION: i32 = -7;
pub const STATUS_PROFILE_NOT_FOUND: i32 = -175;
pub const STATUS_SETTING_NOT_FOUND: i32 = -179;
pub const STATUS_EXECUTABLE_NOT_FOUND: i32 = -183;

// Entry-point ids, fixed by the driver (nvapi headers).
mod ids {
    pub const INITIALIZE: u32 = 0x0150_E828;
    pub const DRS_CREATE_SESSION: u32 = 0x0694_D52E;
    pub const DRS_DESTROY_SESSION: u32 = 0xDAD9_CFF8;
    pub const DRS_LOAD_SETTINGS: u32 = 0x375D_BD6B;
    pub const DRS_SAVE_SETTINGS: u32 = 0xFCBC_7E14;
    pub const DRS_ENUM_PROFILES: u32 = 0xBC37_1EE0;
    pub const DRS_GET_PROFILE_INFO: u32 = 0x61CD_6FD6;
    pub const DRS_FIND_PROFILE_BY_NAME: u32 = 0x7E4A_9A0B;
    pub const DRS_CREATE_PROFILE: u32 = 0xCC17_6068;
    pub const DRS_ENUM_APPLICATIONS: u32 = 0x7FA2_173A;
    pub const DRS_FIND_APPLICATION_BY_NAME: u32 = 0xEEE5_66B2;
    pub const DRS_CREATE_APPLICATION: u32 = 0x4347_A9DE;
    pub const DRS_GET_SETTING: u32 = 0x73BF_8338;
    pub const DRS_SET_SETTING: u32 = 0x577D_D202;
}

/// Fixed buffer sizes from the NVAPI ABI.
pub const UNICODE_STRING_MAX: usize = 2048;
pub const SETTING_MAX_VALUES: usize = 100;

// Struct versions (MAKE_NVAPI_VERSION of the structs below).
pub const PROFILE_VER: u32 = 0x10028;
pub const APPLICATION_VER: u32 = 0x30038;
pub const SETTING_VER: u32 = 0x10058;

/// The per-application capture-suppression DWORD. This single setting is the
/// blacklist flag this engine manages.
pub const BLACKLIST_SETTING_ID: u32 = 0x809D_5F60;
pub const BLACKLIST_ON: u32 = 0x1000_0000;
pub const BLACKLIST_OFF: u32 = 0x0800_0001;

/// NVDRS_PROFILE, version 1.
#[repr(C)]
#[derive(Clone)]
pub struct RawProfile {
    pub version: u32,
    pub profile_name: [u16; UNICODE_STRING_MAX],
    pub gpu_support: u32,
    pub is_predefined: u32,
    pub num_of_apps: u32,
    pub num_of_settings: u32,
}

impl Default for RawProfile {
    fn default() -> Self {
        Self {
            version: PROFILE_VER,
            profile_name: [0u16; UNICODE_STRING_MAX],
            gpu_support: 0,
            is_predefined: 0,
            num_of_apps: 0,
            num_of_settings: 0,
        }
    }
}

/// NVDRS_APPLICATION, version 3.
#[repr(C)]
#[derive(Clone)]
pub struct RawApplication {
    pub version: u32,
    pub is_predefined: u32,
    pub app_name: [u16; UNICODE_STRING_MAX],
    pub user_friendly_name: [u16; UNICODE_STRING_MAX],
    pub launcher: [u16; UNICODE_STRING_MAX],
}

impl Default for RawApplication {
    fn default() -> Self {
        Self {
            version: APPLICATION_VER,
            is_predefined: 0,
            app_name: [0u16; UNICODE_STRING_MAX],
            user_friendly_name: [0u16; UNICODE_STRING_MAX],
            launcher: [0u16; UNICODE_STRING_MAX],
        }
    }
}

/// NVDRS_SETTING value union (DWORD or binary payload).
#[repr(C)]
#[derive(Clone, Copy)]
pub union RawSettingValue {
    pub dword_value: u32,
    pub binary_value: [u8; SETTING_MAX_VALUES],
}

impl Default for RawSettingValue {
    fn default() -> Self {
        Self { dword_value: 0 }
    }
}

/// NVDRS_SETTING, version 1.
#[repr(C)]
#[derive(Clone)]
pub struct RawSetting {
    pub version: u32,
    pub setting_name: [u16; UNICODE_STRING_MAX],
    pub setting_id: u32,
    pub setting_type: u32,
    pub setting_location: u32,
    pub is_current_predefined: u32,
    pub is_predefined_valid: u32,
    pub predefined_value: RawSettingValue,
    pub current_value: RawSettingValue,
}

impl Default for RawSetting {
    fn default() -> Self {
        Self {
            version: SETTING_VER,
            setting_name: [0u16; UNICODE_STRING_MAX],
            setting_id: 0,
            setting_type: 0,
            setting_location: 0,
            is_current_predefined: 0,
            is_predefined_valid: 0,
            predefined_value: RawSettingValue::default(),
            current_value: RawSettingValue::default(),
        }
    }
}

type QueryInterfaceFn = unsafe extern "C" fn(id: u32) -> *mut c_void;
type InitializeFn = unsafe extern "C" fn() -> i32;
pub type CreateSessionFn = unsafe extern "C" fn(session: *mut SessionHandle) -> i32;
pub type DestroySessionFn = unsafe extern "C" fn(session: SessionHandle) -> i32;
pub type LoadSettingsFn = unsafe extern "C" fn(session: SessionHandle) -> i32;
pub type SaveSettingsFn = unsafe extern "C" fn(session: SessionHandle) -> i32;
pub type EnumProfilesFn =
    unsafe extern "C" fn(session: SessionHandle, index: u32, profile: *mut ProfileHandle) -> i32;
pub type GetProfileInfoFn = unsafe extern "C" fn(
    session: SessionHandle,
    profile: ProfileHandle,
    info: *mut RawProfile,
) -> i32;
pub type FindProfileByNameFn = unsafe extern "C" fn(
    session: SessionHandle,
    name: *const u16,
    profile: *mut ProfileHandle,
) -> i32;
pub type CreateProfileFn = unsafe extern "C" fn(
    session: SessionHandle,
    info: *mut RawProfile,
    profile: *mut ProfileHandle,
) -> i32;
pub type EnumApplicationsFn = unsafe extern "C" fn(
    session: SessionHandle,
    profile: ProfileHandle,
    start: u32,
    count: *mut u32,
    apps: *mut RawApplication,
) -> i32;
pub type FindApplicationByNameFn = unsafe extern "C" fn(
    session: SessionHandle,
    name: *const u16,
    profile: *mut ProfileHandle,
    app: *mut RawApplication,
) -> i32;
pub type CreateApplicationFn = unsafe extern "C" fn(
    session: SessionHandle,
    profile: ProfileHandle,
    app: *mut RawApplication,
) -> i32;
pub type GetSettingFn = unsafe extern "C" fn(
    session: SessionHandle,
    profile: ProfileHandle,
    setting_id: u32,
    setting: *mut RawSetting,
) -> i32;
pub type SetSettingFn = unsafe extern "C" fn(
    session: SessionHandle,
    profile: ProfileHandle,
    setting: *mut RawSetting,
) -> i32;

/// The loaded NVAPI library with its query-interface export.
///
/// Entry points are resolved per call through [`Self::entry`]; the transmute
/// from the returned raw pointer to the typed function pointer is the ABI
/// contract NVAPI documents for `nvapi_QueryInterface`.
pub struct DrsLibrary {
    _library: Library,
    query_interface: QueryInterfaceFn,
}

impl DrsLibrary {
    /// Load `nvapi64.dll` and run `NvAPI_Initialize`.
    pub fn open() -> Result<Self, StoreError> {
        unsafe {
            let library = Library::new("nvapi64.dll").map_err(|_| StoreError::LibraryNotFound)?;

            let query_interface: Symbol<QueryInterfaceFn> = library
                .get(b"nvapi_QueryInterface\0")
                .map_err(|_| StoreError::MissingEntryPoint("nvapi_QueryInterface"))?;
            let query_interface = *query_interface;

            let lib = Self {
                _library: library,
                query_interface,
            };

            let initialize: InitializeFn = lib.entry(ids::INITIALIZE, "NvAPI_Initialize")?;
            let status = initialize();
            if status != STATUS_OK {
                return Err(StoreError::InitFailed(status));
            }

            Ok(lib)
        }
    }

    fn entry<F>(&self, id: u32, name: &'static str) -> Result<F, StoreError> {
        unsafe {
            let ptr = (self.query_interface)(id);
            if ptr.is_null() {
                Err(StoreError::MissingEntryPoint(name))
            } else {
                Ok(std::mem::transmute_copy(&ptr))
            }
        }
    }

    pub fn create_session(&self) -> Result<CreateSessionFn, StoreError> {
        self.entry(ids::DRS_CREATE_SESSION, "NvAPI_DRS_CreateSession")
    }

    pub fn destroy_session(&self) -> Result<DestroySessionFn, StoreError> {
        self.entry(ids::DRS_DESTROY_SESSION, "NvAPI_DRS_DestroySession")
    }

    pub fn load_settings(&self) -> Result<LoadSettingsFn, StoreError> {
        self.entry(ids::DRS_LOAD_SETTINGS, "NvAPI_DRS_LoadSettings")
    }

    pub fn save_settings(&self) -> Result<SaveSettingsFn, StoreError> {
        self.entry(ids::DRS_SAVE_SETTINGS, "NvAPI_DRS_SaveSettings")
    }

    pub fn enum_profiles(&self) -> Result<EnumProfilesFn, StoreError> {
        self.entry(ids::DRS_ENUM_PROFILES, "NvAPI_DRS_EnumProfiles")
    }

    pub fn get_profile_info(&self) -> Result<GetProfileInfoFn, StoreError> {
        self.entry(ids::DRS_GET_PROFILE_INFO, "NvAPI_DRS_GetProfileInfo")
    }

    pub fn find_profile_by_name(&self) -> Result<FindProfileByNameFn, StoreError> {
        self.entry(ids::DRS_FIND_PROFILE_BY_NAME, "NvAPI_DRS_FindProfileByName")
    }

    pub fn create_profile(&self) -> Result<CreateProfileFn, StoreError> {
        self.entry(ids::DRS_CREATE_PROFILE, "NvAPI_DRS_CreateProfile")
    }

    pub fn enum_applications(&self) -> Result<EnumApplicationsFn, StoreError> {
        self.entry(ids::DRS_ENUM_APPLICATIONS, "NvAPI_DRS_EnumApplications")
    }

    pub fn find_application_by_name(&self) -> Result<FindApplicationByNameFn, StoreError> {
        self.entry(
            ids::DRS_FIND_APPLICATION_BY_NAME,
            "NvAPI_DRS_FindApplicationByName",
        )
    }

    pub fn create_application(&self) -> Result<CreateApplicationFn, StoreError> {
        self.entry(ids::DRS_CREATE_APPLICATION, "NvAPI_DRS_CreateApplication")
    }

    pub fn get_setting(&self) -> Result<GetSettingFn, StoreError> {
        self.entry(ids::DRS_GET_SETTING, "NvAPI_DRS_GetSetting")
    }

    pub fn set_setting(&self) -> Result<SetSettingFn, StoreError> {
        self.entry(ids::DRS_SET_SETTING, "NvAPI_DRS_SetSetting")
    }
}

// NvAPI_Initialize is process-global; load the library once and share it.
static SHARED: OnceLock<Result<DrsLibrary, StoreError>> = OnceLock::new();

/// Shared process-wide library handle, loaded on first use.
pub fn shared() -> Result<&'static DrsLibrary, StoreError> {
    SHARED
        .get_or_init(DrsLibrary::open)
        .as_ref()
        .map_err(Clone::clone)
}

/// Decode a NUL-terminated NVAPI wide string.
pub fn from_wide(wide: &[u16]) -> String {
    let end = wide.iter().position(|&c| c == 0).unwrap_or(wide.len());
    String::from_utf16_lossy(&wide[..end])
}

/// Encode into a fixed NVAPI wide-string buffer, truncating if necessary and
/// always NUL-terminating.
pub fn to_wide(s: &str, buffer: &mut [u16]) {
    let encoded: Vec<u16> = s.encode_utf16().collect();
    let len = encoded.len().min(buffer.len() - 1);
    buffer[..len].copy_from_slice(&encoded[..len]);
    buffer[len] = 0;
}
