//! FFI bindings for turncoder
//!
//! This module provides C-compatible functions for calling the engine from
//! annotation front-ends written in other languages. All functions use C
//! strings (null-terminated) and return allocated memory that must be freed by
//! the caller using `turncoder_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::error::CodingError;
use crate::pipeline::{session_to_statistics, session_to_turn_report, CodingProcessor};
use crate::types::{Classification, CodedTurn};

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Clear the last error message
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
        Err(_) => {
            set_last_error("Output contained an interior NUL byte");
            ptr::null_mut()
        }
    }
}

/// Hand a string result to the caller, recording the error on failure
fn result_to_cstr(result: Result<String, CodingError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_last_error(&e.to_string());
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Stateless API
// ============================================================================

/// Compute the statistics report for a saved session.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `turncoder_free_string`.
/// - Returns NULL on error; call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_session_to_statistics(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(session_to_statistics(json_str))
}

/// Render the plain-text turn log for a saved session.
///
/// # Safety
/// - `json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `turncoder_free_string`.
/// - Returns NULL on error; call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_session_to_turn_report(json: *const c_char) -> *mut c_char {
    clear_last_error();

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return ptr::null_mut();
    };

    result_to_cstr(session_to_turn_report(json_str))
}

// ============================================================================
// Stateful Processor API
// ============================================================================

/// Opaque handle to a CodingProcessor
pub struct CodingProcessorHandle {
    processor: CodingProcessor,
}

/// Create a new CodingProcessor for a video.
///
/// # Safety
/// - `video_filename` must be a valid null-terminated C string.
/// - Returns a pointer to a newly allocated CodingProcessor.
/// - Must be freed with `turncoder_processor_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_new(
    video_filename: *const c_char,
) -> *mut CodingProcessorHandle {
    clear_last_error();

    let Some(filename) = cstr_to_string(video_filename) else {
        set_last_error("Invalid video filename pointer");
        return ptr::null_mut();
    };

    let processor = CodingProcessor::new(filename);
    let handle = Box::new(CodingProcessorHandle { processor });
    Box::into_raw(handle)
}

/// Free a CodingProcessor.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_free(processor: *mut CodingProcessorHandle) {
    if !processor.is_null() {
        drop(Box::from_raw(processor));
    }
}

/// Replace the processor's session with one loaded from JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_load_session(
    processor: *mut CodingProcessorHandle,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    match handle.processor.load_session(&json_str) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Save the processor's session to JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - Returns a newly allocated string that must be freed with `turncoder_free_string`.
/// - Returns NULL on error; call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_save_session(
    processor: *mut CodingProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    result_to_cstr(handle.processor.save_session())
}

/// Record a turn given as turn JSON.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - `out_id` must be NULL or point to writable memory for one `u64`; it
///   receives the id the turn was stored under.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_add_turn_json(
    processor: *mut CodingProcessorHandle,
    json: *const c_char,
    out_id: *mut u64,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    let turn: CodedTurn = match serde_json::from_str(&json_str) {
        Ok(turn) => turn,
        Err(e) => {
            set_last_error(&CodingError::ParseError(e.to_string()).to_string());
            return -1;
        }
    };

    match handle.processor.add_turn(turn) {
        Ok(id) => {
            if !out_id.is_null() {
                *out_id = id;
            }
            0
        }
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Attach a classification, given as classification JSON, to a turn.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - `json` must be a valid null-terminated C string.
/// - Returns 0 on success, non-zero on error.
/// - On error, call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_classify_turn_json(
    processor: *mut CodingProcessorHandle,
    turn_id: u64,
    json: *const c_char,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    let Some(json_str) = cstr_to_string(json) else {
        set_last_error("Invalid JSON string pointer");
        return -1;
    };

    let classification: Classification = match serde_json::from_str(&json_str) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&CodingError::ParseError(e.to_string()).to_string());
            return -1;
        }
    };

    match handle.processor.classify_turn(turn_id, classification) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Delete a turn by id.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - Returns 0 on success, non-zero when the turn does not exist.
/// - On error, call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_delete_turn(
    processor: *mut CodingProcessorHandle,
    turn_id: u64,
) -> i32 {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return -1;
    }

    let handle = &mut *processor;

    match handle.processor.delete_turn(turn_id) {
        Ok(()) => 0,
        Err(e) => {
            set_last_error(&e.to_string());
            -1
        }
    }
}

/// Statistics report JSON over the processor's current turns.
///
/// # Safety
/// - `processor` must be a valid pointer returned by `turncoder_processor_new`.
/// - Returns a newly allocated string that must be freed with `turncoder_free_string`.
/// - Returns NULL on error; call `turncoder_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn turncoder_processor_statistics(
    processor: *mut CodingProcessorHandle,
) -> *mut c_char {
    clear_last_error();

    if processor.is_null() {
        set_last_error("Null processor pointer");
        return ptr::null_mut();
    }

    let handle = &*processor;
    result_to_cstr(handle.processor.statistics_json())
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by turncoder functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a turncoder function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn turncoder_free_string(ptr: *mut c_char) {
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
/// - The returned pointer is valid until the next turncoder call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn turncoder_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn turncoder_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
