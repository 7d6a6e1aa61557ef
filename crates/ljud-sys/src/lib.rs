//! Low-level FFI bindings for the LabJack UD (Universal Driver) library.
//!
//! This crate provides raw, unsafe bindings to the `LabJackUD` C library,
//! the high-level driver used by the U3, U6 and UE9 devices.
//!
//! # The add/go/get model
//!
//! The UD driver batches requests per device handle:
//!
//! 1. `AddRequest` queues an operation on the handle.
//! 2. `GoOne` executes every queued request on that handle in one transaction.
//! 3. `GetFirstResult` / `GetNextResult` walk the produced results until
//!    they return [`LJE_NO_MORE_DATA_AVAILABLE`].
//!
//! # Safety
//!
//! All functions in this crate are `unsafe` as they are direct FFI bindings.
//! For a safe wrapper, use `ud_daq::ud::LabJackUd` instead.
//!
//! # Features
//!
//! - `ud-sdk`: Link against the installed `LabJackUD` library. Without this
//!   feature, stand-in functions are compiled that report
//!   [`LJE_USB_DRIVER_NOT_FOUND`] from every call.
//!
//! # Example (unsafe)
//!
//! ```no_run
//! use ljud_sys::*;
//! use std::ffi::CString;
//!
//! unsafe {
//!     let address = CString::new("1").unwrap();
//!     let mut handle: LJ_HANDLE = 0;
//!     let err = OpenLabJack(LJ_dtU3, LJ_ctUSB, address.as_ptr(), 1, &mut handle);
//!     if err == LJE_NOERROR {
//!         AddRequest(handle, LJ_ioPUT_DAC, 0, 2.5, 0, 0.0);
//!         GoOne(handle);
//!     }
//! }
//! ```

#![allow(non_upper_case_globals)]
#![allow(non_camel_case_types)]
#![allow(non_snake_case)]
#![allow(clippy::all)]

use libc::{c_char, c_double, c_long};

/// Device handle returned by `OpenLabJack`.
pub type LJ_HANDLE = c_long;

/// Error code returned by every UD function.
pub type LJ_ERROR = c_long;

/// Size of the buffer `ErrorToString` writes into.
pub const LJ_ERROR_STRING_LEN: usize = 256;

// Device types
pub const LJ_dtUE9: c_long = 9;
pub const LJ_dtU3: c_long = 3;
pub const LJ_dtU6: c_long = 6;

// Connection types
pub const LJ_ctUSB: c_long = 1;
pub const LJ_ctETHERNET: c_long = 2;

// IO types
pub const LJ_ioGET_AIN: c_long = 10;
pub const LJ_ioGET_AIN_DIFF: c_long = 15;
pub const LJ_ioPUT_DAC: c_long = 20;
pub const LJ_ioGET_DIGITAL_BIT: c_long = 30;
pub const LJ_ioGET_DIGITAL_BIT_DIR: c_long = 31;
pub const LJ_ioGET_DIGITAL_BIT_STATE: c_long = 32;
pub const LJ_ioGET_DIGITAL_PORT: c_long = 35;
pub const LJ_ioPUT_DIGITAL_BIT: c_long = 40;
pub const LJ_ioPUT_DIGITAL_PORT: c_long = 45;
pub const LJ_ioGET_COUNTER: c_long = 50;
pub const LJ_ioPUT_CONFIG: c_long = 1000;
pub const LJ_ioGET_CONFIG: c_long = 1001;
pub const LJ_ioPUT_COUNTER_ENABLE: c_long = 2008;
pub const LJ_ioPUT_ANALOG_ENABLE_BIT: c_long = 2013;
pub const LJ_ioPUT_ANALOG_ENABLE_PORT: c_long = 2015;
pub const LJ_ioPIN_CONFIGURATION_RESET: c_long = 2017;

// Error codes. Negative values are warnings.
pub const LJE_NOERROR: LJ_ERROR = 0;
pub const LJE_COMMAND_LIST_ERROR: LJ_ERROR = 1;
pub const LJE_INVALID_CHANNEL_NUMBER: LJ_ERROR = 2;
pub const LJE_INVALID_RAW_INOUT_PARAMETER: LJ_ERROR = 3;
pub const LJE_INVALID_PARAMETER: LJ_ERROR = 10;
pub const LJE_INVALID_AIN_RANGE: LJ_ERROR = 12;
pub const LJE_REQUEST_NOT_PROCESSED: LJ_ERROR = 17;

/// Codes at or above this value affect the whole device/driver, not one request.
pub const LJE_MIN_GROUP_ERROR: LJ_ERROR = 1000;
pub const LJE_UNKNOWN_ERROR: LJ_ERROR = 1001;
pub const LJE_INVALID_DEVICE_TYPE: LJ_ERROR = 1002;
pub const LJE_INVALID_HANDLE: LJ_ERROR = 1003;
pub const LJE_DEVICE_NOT_OPEN: LJ_ERROR = 1004;
pub const LJE_NO_DATA_AVAILABLE: LJ_ERROR = 1005;
pub const LJE_NO_MORE_DATA_AVAILABLE: LJ_ERROR = 1006;
pub const LJE_LABJACK_NOT_FOUND: LJ_ERROR = 1007;
pub const LJE_COMM_FAILURE: LJ_ERROR = 1008;
pub const LJE_CHECKSUM_ERROR: LJ_ERROR = 1009;
pub const LJE_DEVICE_ALREADY_OPEN: LJ_ERROR = 1010;
pub const LJE_COMM_TIMEOUT: LJ_ERROR = 1011;
pub const LJE_USB_DRIVER_NOT_FOUND: LJ_ERROR = 1012;
pub const LJE_INVALID_CONNECTION_TYPE: LJ_ERROR = 1013;
pub const LJE_INVALID_MODE: LJ_ERROR = 1014;

#[cfg(feature = "ud-sdk")]
extern "system" {
    pub fn GetDriverVersion() -> c_double;

    pub fn OpenLabJack(
        DeviceType: c_long,
        ConnectionType: c_long,
        pAddress: *const c_char,
        FirstFound: c_long,
        pHandle: *mut LJ_HANDLE,
    ) -> LJ_ERROR;

    pub fn AddRequest(
        Handle: LJ_HANDLE,
        IOType: c_long,
        Channel: c_long,
        Value: c_double,
        x1: c_long,
        UserData: c_double,
    ) -> LJ_ERROR;

    pub fn GoOne(Handle: LJ_HANDLE) -> LJ_ERROR;

    pub fn GetFirstResult(
        Handle: LJ_HANDLE,
        pIOType: *mut c_long,
        pChannel: *mut c_long,
        pValue: *mut c_double,
        px1: *mut c_long,
        pUserData: *mut c_double,
    ) -> LJ_ERROR;

    pub fn GetNextResult(
        Handle: LJ_HANDLE,
        pIOType: *mut c_long,
        pChannel: *mut c_long,
        pValue: *mut c_double,
        px1: *mut c_long,
        pUserData: *mut c_double,
    ) -> LJ_ERROR;

    pub fn ErrorToString(ErrorCode: LJ_ERROR, pString: *mut c_char);

    /// Closes every device opened by this process.
    pub fn Close();
}

#[cfg(not(feature = "ud-sdk"))]
pub use stand_in::*;

// Stand-in implementations compiled without the `ud-sdk` feature. They allow
// the workspace to build and test without the vendor library, and report the
// missing driver through the normal error channel at runtime.
#[cfg(not(feature = "ud-sdk"))]
mod stand_in {
    use super::*;

    const UD_SDK_MISSING_MSG: &[u8] =
        b"LabJackUD library not linked (enable the ud-sdk feature)\0";

    pub unsafe extern "system" fn GetDriverVersion() -> c_double {
        0.0
    }

    pub unsafe extern "system" fn OpenLabJack(
        _DeviceType: c_long,
        _ConnectionType: c_long,
        _pAddress: *const c_char,
        _FirstFound: c_long,
        _pHandle: *mut LJ_HANDLE,
    ) -> LJ_ERROR {
        LJE_USB_DRIVER_NOT_FOUND
    }

    pub unsafe extern "system" fn AddRequest(
        _Handle: LJ_HANDLE,
        _IOType: c_long,
        _Channel: c_long,
        _Value: c_double,
        _x1: c_long,
        _UserData: c_double,
    ) -> LJ_ERROR {
        LJE_USB_DRIVER_NOT_FOUND
    }

    pub unsafe extern "system" fn GoOne(_Handle: LJ_HANDLE) -> LJ_ERROR {
        LJE_USB_DRIVER_NOT_FOUND
    }

    pub unsafe extern "system" fn GetFirstResult(
        _Handle: LJ_HANDLE,
        _pIOType: *mut c_long,
        _pChannel: *mut c_long,
        _pValue: *mut c_double,
        _px1: *mut c_long,
        _pUserData: *mut c_double,
    ) -> LJ_ERROR {
        LJE_USB_DRIVER_NOT_FOUND
    }

    pub unsafe extern "system" fn GetNextResult(
        _Handle: LJ_HANDLE,
        _pIOType: *mut c_long,
        _pChannel: *mut c_long,
        _pValue: *mut c_double,
        _px1: *mut c_long,
        _pUserData: *mut c_double,
    ) -> LJ_ERROR {
        LJE_USB_DRIVER_NOT_FOUND
    }

    /// Writes a fixed message; `pString` must hold [`LJ_ERROR_STRING_LEN`] bytes.
    pub unsafe extern "system" fn ErrorToString(_ErrorCode: LJ_ERROR, pString: *mut c_char) {
        if pString.is_null() {
            return;
        }
        let len = UD_SDK_MISSING_MSG.len().min(LJ_ERROR_STRING_LEN);
        std::ptr::copy_nonoverlapping(UD_SDK_MISSING_MSG.as_ptr() as *const c_char, pString, len);
    }

    pub unsafe extern "system" fn Close() {}
}
