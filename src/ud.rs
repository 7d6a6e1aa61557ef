//! `LabJackUD` driver binding.
//!
//! Thin [`Driver`] implementation over the `ljud-sys` FFI declarations. Every
//! call into the vendor library is serialized through a process-wide lock: the
//! UD library keeps one result list per handle and is not documented as
//! reentrant.
//!
//! Without the `hardware` feature the `ljud-sys` stand-ins are linked instead,
//! and every call reports [`ErrorCode::USB_DRIVER_NOT_FOUND`].

use std::ffi::{CStr, CString};

use libc::{c_char, c_double, c_long};

use parking_lot::Mutex;
use tracing::debug;

use crate::driver::{Driver, Handle, OpenTarget, RawResult};
use crate::error::ErrorCode;
use crate::request::{IoType, Operation};

static FFI_LOCK: Mutex<()> = parking_lot::const_mutex(());

/// Driver backed by the vendor `LabJackUD` library.
#[derive(Debug, Default)]
pub struct LabJackUd {
    _private: (),
}

impl LabJackUd {
    /// Create the binding. The library itself is loaded by the linker.
    pub fn new() -> Self {
        Self::default()
    }
}

fn code(raw: c_long) -> ErrorCode {
    ErrorCode(raw as i32)
}

type ResultFn = unsafe extern "system" fn(
    ljud_sys::LJ_HANDLE,
    *mut c_long,
    *mut c_long,
    *mut c_double,
    *mut c_long,
    *mut c_double,
) -> ljud_sys::LJ_ERROR;

fn fetch(handle: Handle, f: ResultFn) -> RawResult {
    let mut io_type: c_long = 0;
    let mut channel: c_long = 0;
    let mut value: c_double = 0.0;
    let mut x1: c_long = 0;
    let mut user_data: c_double = 0.0;

    let _guard = FFI_LOCK.lock();
    // SAFETY: every out-pointer refers to a live local of the declared type.
    let status = unsafe {
        f(
            handle as ljud_sys::LJ_HANDLE,
            &mut io_type,
            &mut channel,
            &mut value,
            &mut x1,
            &mut user_data,
        )
    };

    RawResult {
        code: code(status),
        io_type: IoType::from_raw(io_type as i32),
        channel: channel as i32,
        value,
    }
}

impl Driver for LabJackUd {
    fn driver_version(&self) -> f64 {
        let _guard = FFI_LOCK.lock();
        // SAFETY: no arguments, no preconditions.
        unsafe { ljud_sys::GetDriverVersion() }
    }

    fn open(&mut self, target: &OpenTarget) -> (ErrorCode, Handle) {
        let Ok(address) = CString::new(target.address.as_str()) else {
            return (ErrorCode::INVALID_PARAMETER, 0);
        };
        let mut handle: ljud_sys::LJ_HANDLE = 0;

        let _guard = FFI_LOCK.lock();
        // SAFETY: address is NUL-terminated and outlives the call; handle is a
        // live out-pointer.
        let status = unsafe {
            ljud_sys::OpenLabJack(
                target.device_type.raw() as c_long,
                target.connection.raw() as c_long,
                address.as_ptr(),
                c_long::from(target.first_found),
                &mut handle,
            )
        };
        debug!(status, handle, "OpenLabJack");
        (code(status), Handle::from(handle))
    }

    fn add_request(&mut self, handle: Handle, operation: &Operation) -> ErrorCode {
        let _guard = FFI_LOCK.lock();
        // SAFETY: plain value arguments.
        let status = unsafe {
            ljud_sys::AddRequest(
                handle as ljud_sys::LJ_HANDLE,
                operation.io_type.raw() as c_long,
                operation.channel as c_long,
                operation.value,
                operation.extra1 as c_long,
                operation.user_data as c_double,
            )
        };
        code(status)
    }

    fn go_one(&mut self, handle: Handle) -> ErrorCode {
        let _guard = FFI_LOCK.lock();
        // SAFETY: plain value argument.
        code(unsafe { ljud_sys::GoOne(handle as ljud_sys::LJ_HANDLE) })
    }

    fn first_result(&mut self, handle: Handle) -> RawResult {
        fetch(handle, ljud_sys::GetFirstResult)
    }

    fn next_result(&mut self, handle: Handle) -> RawResult {
        fetch(handle, ljud_sys::GetNextResult)
    }

    fn error_to_string(&self, code: ErrorCode) -> String {
        let mut buf = [0 as c_char; ljud_sys::LJ_ERROR_STRING_LEN];
        {
            let _guard = FFI_LOCK.lock();
            // SAFETY: buf holds LJ_ERROR_STRING_LEN bytes as the API requires.
            unsafe { ljud_sys::ErrorToString(code.value() as ljud_sys::LJ_ERROR, buf.as_mut_ptr()) };
        }
        // Force termination in case the library filled the whole buffer.
        buf[ljud_sys::LJ_ERROR_STRING_LEN - 1] = 0;
        // SAFETY: buf is NUL-terminated.
        let text = unsafe { CStr::from_ptr(buf.as_ptr()) };
        text.to_string_lossy().into_owned()
    }

    fn close(&mut self, handle: Handle) {
        debug!(handle, "Closing LabJackUD devices");
        let _guard = FFI_LOCK.lock();
        // SAFETY: no arguments; releases every device opened by this process.
        unsafe { ljud_sys::Close() }
    }
}
