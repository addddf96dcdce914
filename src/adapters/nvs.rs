//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] by keeping the settings document as one JSON
//! blob under `brewctl::settings`.
//!
//! - Validation: every field is range-checked before anything is written.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`, so a
//!   failed save leaves the previous document intact.
//! - Simulation: off-target the blob lives in an in-memory map, and
//!   [`NvsAdapter::fail_writes`] lets tests exercise the failure path.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::Settings;
use log::{info, warn};

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

const CONFIG_NAMESPACE: &str = "brewctl";
#[cfg(not(target_os = "espidf"))]
const CONFIG_KEY: &str = "settings";

#[cfg(target_os = "espidf")]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
    #[cfg(not(target_os = "espidf"))]
    fail_writes: std::cell::Cell<bool>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// On first boot or after a version mismatch the NVS partition is
    /// erased and re-initialised.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES as i32 || ret == ESP_ERR_NVS_NEW_VERSION_FOUND as i32 {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self::unbacked())
    }

    /// Adapter without flash initialisation.  On target every access fails
    /// and [`load`](ConfigPort::load) falls back to defaults.
    pub fn unbacked() -> Self {
        Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
            #[cfg(not(target_os = "espidf"))]
            fail_writes: std::cell::Cell::new(false),
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key() -> String {
        format!("{}::{}", CONFIG_NAMESPACE, CONFIG_KEY)
    }

    /// Make every following save fail with `StorageFull` (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.set(fail);
    }

    /// Store raw bytes as the settings blob, bypassing validation (simulation only).
    #[cfg(not(target_os = "espidf"))]
    pub fn put_raw(&self, bytes: &[u8]) {
        self.store
            .borrow_mut()
            .insert(Self::composite_key(), bytes.to_vec());
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = CONFIG_NAMESPACE.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }

    #[cfg(target_os = "espidf")]
    fn read_blob() -> Result<Option<Vec<u8>>, i32> {
        let result = Self::with_nvs_handle(false, |handle| {
            let key_cstr = b"settings\0";
            let mut size: usize = 0;

            // First call: get size
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    core::ptr::null_mut(),
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            if size == 0 || size > MAX_BLOB_SIZE {
                return Err(ESP_ERR_NVS_INVALID_LENGTH as i32);
            }

            let mut buf = vec![0u8; size];
            let ret = unsafe {
                nvs_get_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    buf.as_mut_ptr() as *mut _,
                    &mut size,
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(buf)
        });
        match result {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e == ESP_ERR_NVS_NOT_FOUND as i32 => Ok(None),
            Err(e) => Err(e),
        }
    }

    #[cfg(target_os = "espidf")]
    fn write_blob(bytes: &[u8]) -> Result<(), ConfigError> {
        let result = Self::with_nvs_handle(true, |handle| {
            let key_cstr = b"settings\0";
            let ret = unsafe {
                nvs_set_blob(
                    handle,
                    key_cstr.as_ptr() as *const _,
                    bytes.as_ptr() as *const _,
                    bytes.len(),
                )
            };
            if ret != ESP_OK {
                return Err(ret);
            }
            let ret = unsafe { nvs_commit(handle) };
            if ret != ESP_OK {
                return Err(ret);
            }
            Ok(())
        });
        match result {
            Ok(()) => Ok(()),
            Err(e) if e == ESP_ERR_NVS_NOT_ENOUGH_SPACE as i32 => Err(ConfigError::StorageFull),
            Err(e) => {
                warn!("NvsAdapter: NVS write error {}", e);
                Err(ConfigError::IoError)
            }
        }
    }
}

impl Default for NvsAdapter {
    fn default() -> Self {
        Self::unbacked()
    }
}

fn decode(bytes: &[u8]) -> Result<Settings, ConfigError> {
    let settings: Settings = serde_json::from_slice(bytes).map_err(|_| ConfigError::Corrupted)?;
    settings.validate()?;
    Ok(settings)
}

/// Load the stored settings, or the factory defaults if nothing usable is
/// stored.  Never fails; startup always gets a document.
pub fn load_or_default(store: &impl ConfigPort) -> Settings {
    match store.load() {
        Ok(settings) => settings,
        Err(e) => {
            warn!("settings: {}, using defaults", e);
            Settings::default()
        }
    }
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<Settings, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        let stored = self.store.borrow().get(&Self::composite_key()).cloned();

        #[cfg(target_os = "espidf")]
        let stored = Self::read_blob().map_err(|e| {
            warn!("NvsAdapter: NVS read error {}", e);
            ConfigError::IoError
        })?;

        match stored {
            Some(bytes) => {
                let settings = decode(&bytes)?;
                info!("NvsAdapter: loaded settings ({} bytes)", bytes.len());
                Ok(settings)
            }
            None => {
                info!("NvsAdapter: no stored settings, using defaults");
                Ok(Settings::default())
            }
        }
    }

    fn save(&self, settings: &Settings) -> Result<(), ConfigError> {
        settings.validate()?;
        let bytes = serde_json::to_vec(settings).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            if self.fail_writes.get() {
                return Err(ConfigError::StorageFull);
            }
            self.store.borrow_mut().insert(Self::composite_key(), bytes);
            info!("NvsAdapter: settings saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            Self::write_blob(&bytes)?;
            info!("NvsAdapter: settings saved to NVS ({} bytes)", bytes.len());
            Ok(())
        }
    }
}
