//! Driver seam between the batching protocol and the vendor library.
//!
//! The [`Driver`] trait mirrors the UD C API one call per method and speaks in
//! raw [`ErrorCode`]s; interpretation of those codes belongs to the session and
//! the result cursor. Two implementations exist:
//!
//! - [`crate::ud::LabJackUd`] - the real `LabJackUD` library through `ljud-sys`
//! - [`crate::mock::MockDriver`] - a simulated U3 for tests and dry runs

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::ErrorCode;
use crate::request::{IoType, Operation};

/// Opaque device handle issued by the driver.
pub type Handle = i64;

/// Device family to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    #[default]
    U3,
    U6,
    Ue9,
}

impl DeviceType {
    /// Raw driver value.
    pub fn raw(self) -> i32 {
        let raw = match self {
            Self::U3 => ljud_sys::LJ_dtU3,
            Self::U6 => ljud_sys::LJ_dtU6,
            Self::Ue9 => ljud_sys::LJ_dtUE9,
        };
        raw as i32
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::U3 => write!(f, "U3"),
            Self::U6 => write!(f, "U6"),
            Self::Ue9 => write!(f, "UE9"),
        }
    }
}

/// Transport used to reach the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionType {
    #[default]
    Usb,
    Ethernet,
}

impl ConnectionType {
    /// Raw driver value.
    pub fn raw(self) -> i32 {
        let raw = match self {
            Self::Usb => ljud_sys::LJ_ctUSB,
            Self::Ethernet => ljud_sys::LJ_ctETHERNET,
        };
        raw as i32
    }
}

/// Which device to open.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenTarget {
    /// Device family
    pub device_type: DeviceType,
    /// Transport
    pub connection: ConnectionType,
    /// Local ID, serial number or IP address
    pub address: String,
    /// Ignore `address` and open the first device found
    pub first_found: bool,
}

impl Default for OpenTarget {
    fn default() -> Self {
        Self {
            device_type: DeviceType::U3,
            connection: ConnectionType::Usb,
            address: "1".to_string(),
            first_found: true,
        }
    }
}

/// One entry of the driver's result list, exactly as the driver reported it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RawResult {
    /// Status of this entry (or the end-of-results sentinel)
    pub code: ErrorCode,
    /// Request kind this entry belongs to
    pub io_type: IoType,
    /// Channel of the request
    pub channel: i32,
    /// Measured value (reads) or echoed value (writes)
    pub value: f64,
}

impl RawResult {
    /// The end-of-results sentinel entry.
    pub fn end_of_results() -> Self {
        Self {
            code: ErrorCode::NO_MORE_DATA_AVAILABLE,
            io_type: IoType::Other(0),
            channel: 0,
            value: 0.0,
        }
    }
}

/// Device driver layer consumed by the batching protocol.
///
/// Every call may block for a bounded, device-dependent time. Implementations
/// are not required to be thread-safe; callers serialize access through the
/// owning [`crate::session::DeviceSession`].
pub trait Driver {
    /// Version of the installed driver.
    fn driver_version(&self) -> f64;

    /// Open a device, returning the status and the issued handle.
    fn open(&mut self, target: &OpenTarget) -> (ErrorCode, Handle);

    /// Queue one request on `handle`.
    fn add_request(&mut self, handle: Handle, operation: &Operation) -> ErrorCode;

    /// Execute every queued request on `handle` as one transaction.
    fn go_one(&mut self, handle: Handle) -> ErrorCode;

    /// Rewind the result cursor and return the first entry.
    fn first_result(&mut self, handle: Handle) -> RawResult;

    /// Advance the result cursor.
    fn next_result(&mut self, handle: Handle) -> RawResult;

    /// Human-readable description of `code`.
    fn error_to_string(&self, code: ErrorCode) -> String;

    /// Release `handle`.
    fn close(&mut self, handle: Handle);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_raw() {
        assert_eq!(DeviceType::U3.raw(), 3);
        assert_eq!(DeviceType::U6.raw(), 6);
        assert_eq!(DeviceType::Ue9.raw(), 9);
        assert_eq!(ConnectionType::Usb.raw(), 1);
    }

    #[test]
    fn test_end_of_results_entry() {
        let raw = RawResult::end_of_results();
        assert!(raw.code.is_end_of_results());
    }
}
