//! C ABI entry points exported by the plugin shared object.
//!
//! Plugin hosts drive C functions with no user data, so the crate keeps
//! exactly one process-wide state record: `onload` (re)initialises it,
//! `heimdall_finalize` emits the SBOM and tears the run down. Every setter
//! and processor returns 0 on success and -1 on error.

use crate::adapter::{LinkerFlavor, LinkerHostAdapter};
use crate::config::PluginConfig;
use once_cell::sync::Lazy;
use std::ffi::{c_char, c_int, c_void, CStr};
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::{error, info};

struct PluginState {
    config: PluginConfig,
    adapter: Option<LinkerHostAdapter>,
}

static STATE: Lazy<Mutex<PluginState>> = Lazy::new(|| {
    Mutex::new(PluginState {
        config: PluginConfig::default(),
        adapter: None,
    })
});

fn state() -> std::sync::MutexGuard<'static, PluginState> {
    STATE.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Reads a C string argument; `None` for null pointers.
///
/// # Safety
/// `ptr` must be null or point to a NUL-terminated string.
unsafe fn cstring_arg(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// Plugin initialisation; begins a new SBOM run. Returns 0 on success.
#[no_mangle]
pub extern "C" fn onload(_handle: *mut c_void) -> c_int {
    let mut state = state();
    state.adapter = Some(LinkerHostAdapter::new(LinkerFlavor::Enhanced));
    info!("heimdall plugin activated");
    0
}

/// Selects the output family/version: `spdx`, `spdx-2.3`, `spdx-3.0`,
/// `spdx-3.0.0`, `spdx-3.0.1`, `cyclonedx`, `cyclonedx-1.4`,
/// `cyclonedx-1.6`. Unknown selectors fall back to SPDX 2.3.
#[no_mangle]
pub extern "C" fn heimdall_set_format(format: *const c_char) -> c_int {
    let Some(format) = (unsafe { cstring_arg(format) }) else {
        return -1;
    };
    state().config.set_format(&format);
    0
}

#[no_mangle]
pub extern "C" fn heimdall_set_spdx_version(version: *const c_char) -> c_int {
    let Some(version) = (unsafe { cstring_arg(version) }) else {
        return -1;
    };
    state().config.set_spdx_version(&version);
    0
}

#[no_mangle]
pub extern "C" fn heimdall_set_cyclonedx_version(version: *const c_char) -> c_int {
    let Some(version) = (unsafe { cstring_arg(version) }) else {
        return -1;
    };
    state().config.set_cyclonedx_version(&version);
    0
}

#[no_mangle]
pub extern "C" fn heimdall_set_output_path(path: *const c_char) -> c_int {
    let Some(path) = (unsafe { cstring_arg(path) }) else {
        return -1;
    };
    state().config.output_path = PathBuf::from(path);
    0
}

/// Toggles verbose diagnostics. Installs the log subscriber on first use.
#[no_mangle]
pub extern "C" fn heimdall_set_verbose(verbose: bool) {
    if verbose {
        use tracing_subscriber::EnvFilter;
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));
        let _ = tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init();
    }
    state().config.verbose = verbose;
}

/// Enrols an input file (object, archive, binary). Re-processing the same
/// path merges and is not an error.
#[no_mangle]
pub extern "C" fn heimdall_process_input_file(path: *const c_char) -> c_int {
    let Some(path) = (unsafe { cstring_arg(path) }) else {
        return -1;
    };
    let mut state = state();
    let Some(adapter) = state.adapter.as_mut() else {
        return -1;
    };
    match adapter.enrol_input(PathBuf::from(path).as_path()) {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "failed to process input file");
            -1
        }
    }
}

/// Enrols a library.
#[no_mangle]
pub extern "C" fn heimdall_process_library(path: *const c_char) -> c_int {
    let Some(path) = (unsafe { cstring_arg(path) }) else {
        return -1;
    };
    let mut state = state();
    let Some(adapter) = state.adapter.as_mut() else {
        return -1;
    };
    match adapter.enrol_library(PathBuf::from(path).as_path()) {
        Ok(()) => 0,
        Err(err) => {
            error!(error = %err, "failed to process library");
            -1
        }
    }
}

/// Emits the SBOM and releases the run's resources. Further processing
/// calls fail until the next `onload`.
#[no_mangle]
pub extern "C" fn heimdall_finalize() {
    let (adapter, config) = {
        let mut state = state();
        (state.adapter.take(), state.config.clone())
    };
    let Some(mut adapter) = adapter else {
        return;
    };
    if let Err(err) = adapter.finalize(&config) {
        error!(error = %err, "SBOM generation failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::ffi::CString;
    use std::fs;
    use std::ptr;

    fn c(s: &str) -> CString {
        CString::new(s).unwrap()
    }

    #[test]
    #[serial]
    fn test_null_arguments_are_errors() {
        assert_eq!(heimdall_set_format(ptr::null()), -1);
        assert_eq!(heimdall_set_spdx_version(ptr::null()), -1);
        assert_eq!(heimdall_set_cyclonedx_version(ptr::null()), -1);
        assert_eq!(heimdall_set_output_path(ptr::null()), -1);
        assert_eq!(heimdall_process_input_file(ptr::null()), -1);
        assert_eq!(heimdall_process_library(ptr::null()), -1);
    }

    #[test]
    #[serial]
    fn test_processing_requires_onload() {
        heimdall_finalize(); // ensure no adapter is active
        let input = c("/tmp/whatever.o");
        assert_eq!(heimdall_process_input_file(input.as_ptr()), -1);
    }

    #[test]
    #[serial]
    fn test_unknown_format_falls_back_not_fails() {
        assert_eq!(heimdall_set_format(c("yaml-flavoured").as_ptr()), 0);
    }

    #[test]
    #[serial]
    fn test_full_lifecycle_emits_cyclonedx() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("main.o");
        fs::write(&input, b"not a real object, still enrolled").unwrap();
        let output = dir.path().join("sbom.cdx.json");

        assert_eq!(onload(ptr::null_mut()), 0);
        assert_eq!(heimdall_set_format(c("cyclonedx-1.6").as_ptr()), 0);
        assert_eq!(
            heimdall_set_output_path(c(output.to_str().unwrap()).as_ptr()),
            0
        );
        let input_c = c(input.to_str().unwrap());
        assert_eq!(heimdall_process_input_file(input_c.as_ptr()), 0);
        // Idempotent re-processing.
        assert_eq!(heimdall_process_input_file(input_c.as_ptr()), 0);
        heimdall_finalize();

        let doc: serde_json::Value =
            serde_json::from_slice(&fs::read(&output).unwrap()).unwrap();
        assert_eq!(doc["bomFormat"], "CycloneDX");
        assert_eq!(doc["specVersion"], "1.6");
        assert_eq!(doc["components"].as_array().unwrap().len(), 1);
        assert_eq!(doc["components"][0]["name"], "main.o");

        // The run is over: processing now fails until the next onload.
        assert_eq!(heimdall_process_input_file(input_c.as_ptr()), -1);
    }

    #[test]
    #[serial]
    fn test_second_run_starts_clean() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("solo.o");
        fs::write(&input, b"payload").unwrap();
        let output = dir.path().join("run2.spdx");

        assert_eq!(onload(ptr::null_mut()), 0);
        assert_eq!(heimdall_set_format(c("spdx-2.3").as_ptr()), 0);
        assert_eq!(
            heimdall_set_output_path(c(output.to_str().unwrap()).as_ptr()),
            0
        );
        assert_eq!(
            heimdall_process_input_file(c(input.to_str().unwrap()).as_ptr()),
            0
        );
        heimdall_finalize();

        let doc = fs::read_to_string(&output).unwrap();
        assert!(doc.starts_with("SPDXVersion: SPDX-2.3\n"));
        assert_eq!(doc.matches("FileName: ").count(), 1);
        assert!(doc.contains("FileName: solo.o\n"));
    }
}
