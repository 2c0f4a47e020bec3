//! FFI bindings for Synheart Reps
//!
//! This module provides C-compatible functions for driving a rep engine from
//! other languages. Frames, outputs and configuration cross the boundary as
//! null-terminated JSON strings. Returned strings must be freed with
//! `reps_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::EngineConfig;
use crate::engine::RepEngine;
use crate::exercises::ExerciseMode;
use crate::types::Frame;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

// ============================================================================
// Engine API
// ============================================================================

/// Opaque handle to a RepEngine
pub struct RepEngineHandle {
    engine: RepEngine,
}

/// Create an engine for `mode` (snake_case name such as "pull_up").
///
/// # Safety
/// - `mode` must be a valid null-terminated C string.
/// - `config_json` may be NULL for the default configuration.
/// - Must be freed with `reps_engine_free`.
/// - Returns NULL on error; call `reps_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_new(mode: *const c_char, config_json: *const c_char) -> *mut RepEngineHandle {
    clear_last_error();

    let mode = match cstr_to_string(mode).map(|m| m.parse::<ExerciseMode>()) {
        Some(Ok(mode)) => mode,
        Some(Err(e)) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
        None => {
            set_last_error("Invalid mode string pointer");
            return ptr::null_mut();
        }
    };

    let config = if config_json.is_null() {
        EngineConfig::default()
    } else {
        let parsed = cstr_to_string(config_json)
            .ok_or_else(|| "Invalid config string".to_string())
            .and_then(|json| EngineConfig::from_json(&json).map_err(|e| e.to_string()));
        match parsed {
            Ok(config) => config,
            Err(e) => {
                set_last_error(&e);
                return ptr::null_mut();
            }
        }
    };

    match RepEngine::with_config(mode, config) {
        Ok(engine) => Box::into_raw(Box::new(RepEngineHandle { engine })),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Free an engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_free(engine: *mut RepEngineHandle) {
    if !engine.is_null() {
        drop(Box::from_raw(engine));
    }
}

/// Process one frame given as JSON and return the engine output as JSON.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`.
/// - `frame_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `reps_free_string`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_process(
    engine: *mut RepEngineHandle,
    frame_json: *const c_char,
    now_ms: i64,
) -> *mut c_char {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return ptr::null_mut();
    }
    let handle = &mut *engine;

    let json = match cstr_to_string(frame_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid frame string pointer");
            return ptr::null_mut();
        }
    };
    let frame = match Frame::from_json(&json) {
        Ok(frame) => frame,
        Err(e) => {
            set_last_error(&e.to_string());
            return ptr::null_mut();
        }
    };

    let output = handle.engine.process(&frame, now_ms);
    match serde_json::to_string(&output) {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

/// Select an exercise mode. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`.
/// - `mode` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_set_mode(engine: *mut RepEngineHandle, mode: *const c_char, reset: bool) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    let handle = &mut *engine;

    let Some(name) = cstr_to_string(mode) else {
        set_last_error("Invalid mode string pointer");
        return -1;
    };
    match name.parse::<ExerciseMode>() {
        Ok(mode) => {
            handle.engine.set_mode(mode, reset);
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Reset the selected mode's detectors. Returns 0 on success, -1 on error.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_reset_current(engine: *mut RepEngineHandle) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    (*engine).engine.reset_current();
    0
}

/// Replace the configuration, keeping counted repetitions.
/// Returns 0 on success, -1 on error (the old configuration stays active).
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`.
/// - `config_json` must be a valid null-terminated C string.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_set_config(engine: *mut RepEngineHandle, config_json: *const c_char) -> i32 {
    clear_last_error();

    if engine.is_null() {
        set_last_error("Null engine pointer");
        return -1;
    }
    let handle = &mut *engine;

    let Some(json) = cstr_to_string(config_json) else {
        set_last_error("Invalid config string pointer");
        return -1;
    };
    match EngineConfig::from_json(&json).and_then(|config| handle.engine.set_config(config)) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Repetitions counted for the selected mode, or -1 for a NULL engine.
///
/// # Safety
/// - `engine` must be a valid pointer returned by `reps_engine_new`, or NULL.
#[no_mangle]
pub unsafe extern "C" fn reps_engine_current_reps(engine: *const RepEngineHandle) -> i64 {
    if engine.is_null() {
        return -1;
    }
    i64::from((*engine).engine.current_reps())
}

/// Free a string returned by Reps functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a Reps function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn reps_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next Reps function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn reps_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn reps_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
