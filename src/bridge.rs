//! Plumbing for the C ABI: the error struct, panic containment and string
//! conversion helpers shared by every exported function.

use crate::error::{Error, Result};
use std::any::Any;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::panic::{self, AssertUnwindSafe};
use std::ptr;
use std::slice;
use std::sync::Once;
use tracing::error;

/// Mirrors `struct pyfrac_error` in `include/pyfrac.h`
#[repr(C)]
#[derive(Debug)]
pub struct PyfracError {
    pub message: *mut c_char,
    pub failed: c_int,
    pub code: c_int,
}

impl Default for PyfracError {
    fn default() -> Self {
        PyfracError {
            message: ptr::null_mut(),
            failed: 0,
            code: 0,
        }
    }
}

/// Value returned to C when a call fails
pub trait ErrorValue {
    fn error_value() -> Self;
}

impl<T> ErrorValue for *mut T {
    fn error_value() -> Self {
        ptr::null_mut()
    }
}

impl<T> ErrorValue for *const T {
    fn error_value() -> Self {
        ptr::null()
    }
}

impl ErrorValue for c_int {
    fn error_value() -> Self {
        0
    }
}

impl ErrorValue for () {
    fn error_value() -> Self {}
}

fn message_ptr(message: String) -> *mut c_char {
    CString::new(message.replace('\0', "\\0"))
        .map(CString::into_raw)
        .unwrap_or(ptr::null_mut())
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

unsafe fn report(err: *mut PyfracError, e: &Error) {
    if let Some(err) = err.as_mut() {
        err.message = message_ptr(e.to_string());
        err.failed = 1;
        err.code = e.code();
    }
}

unsafe fn report_success(err: *mut PyfracError) {
    if let Some(err) = err.as_mut() {
        err.message = ptr::null_mut();
        err.failed = 0;
        err.code = 0;
    }
}

/// Run `f`, turning errors and panics into the error struct.
///
/// `err` may be null, in which case failures are only visible through the
/// error value.
pub unsafe fn landingpad<F, T>(err: *mut PyfracError, f: F) -> T
where
    F: FnOnce() -> Result<T>,
    T: ErrorValue,
{
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(Ok(value)) => {
            report_success(err);
            value
        }
        Ok(Err(e)) => {
            report(err, &e);
            T::error_value()
        }
        Err(payload) => {
            report(err, &Error::Panic(panic_message(payload)));
            T::error_value()
        }
    }
}

/// Release the message held by an error struct and reset it
pub unsafe fn clear_error(err: *mut PyfracError) {
    if let Some(err) = err.as_mut() {
        if !err.message.is_null() {
            drop(CString::from_raw(err.message));
        }
        *err = PyfracError::default();
    }
}

/// Install a panic hook that logs through `tracing` instead of printing.
pub fn set_panic_hook() {
    static HOOK: Once = Once::new();
    HOOK.call_once(|| {
        panic::set_hook(Box::new(|info| {
            error!(panic = %info, "panic in pyfrac");
        }));
    });
}

/// Borrow a NUL-terminated UTF-8 argument
pub unsafe fn c_str<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        return Err(Error::NullPointer(what));
    }
    Ok(CStr::from_ptr(ptr).to_str()?)
}

/// Like [`c_str`], with null meaning an empty string
pub unsafe fn c_str_or_empty<'a>(ptr: *const c_char, what: &'static str) -> Result<&'a str> {
    if ptr.is_null() {
        Ok("")
    } else {
        c_str(ptr, what)
    }
}

/// Borrow a byte buffer; a null pointer is allowed when `len` is zero
pub unsafe fn byte_slice<'a>(ptr: *const u8, len: usize, what: &'static str) -> Result<&'a [u8]> {
    if len == 0 {
        return Ok(&[]);
    }
    if ptr.is_null() {
        return Err(Error::NullPointer(what));
    }
    Ok(slice::from_raw_parts(ptr, len))
}

/// Hand a string to C; release it with `pyfrac_free`
pub fn into_c_string(s: String) -> Result<*mut c_char> {
    Ok(CString::new(s)?.into_raw())
}

/// Declare an exported function that reports failures through a trailing
/// `*mut PyfracError` argument.
macro_rules! export (
    (
        $(#[$attr:meta])*
        $name:ident($($aname:ident: $aty:ty),* $(,)?) -> Result<$rv:ty> $body:block
    ) => (
        $(#[$attr])*
        #[no_mangle]
        pub unsafe extern "C" fn $name($($aname: $aty,)* err: *mut $crate::bridge::PyfracError) -> $rv {
            $crate::bridge::landingpad(err, move || $body)
        }
    );
);
