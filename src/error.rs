//! Error codes and error types for UD device operations.
//!
//! Every call into the UD driver layer returns a signed [`ErrorCode`]. The
//! numeric value carries two tiers of meaning:
//!
//! - **negative** codes are advisory warnings; the operation still succeeded.
//! - **`0 < code < 1000`** codes are recoverable errors tied to one request.
//! - **`code >= 1000`** codes are group errors: the session or driver is unusable.
//!
//! One group code, [`ErrorCode::NO_MORE_DATA_AVAILABLE`], is not an error at
//! all but the end-of-results sentinel of the result cursor. [`ErrorCode::classify`]
//! turns a raw code into an [`ErrorClass`] so callers never branch on integers.
//!
//! [`UdError`] is the error type propagated through the crate. It always carries
//! the driver-decoded description of the code alongside the raw value.

use std::fmt;
use thiserror::Error;

use crate::request::IoType;

/// Result type alias for UD operations.
pub type Result<T> = std::result::Result<T, UdError>;

/// Raw error code returned by the UD driver layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct ErrorCode(pub i32);

impl ErrorCode {
    /// No error.
    pub const NOERROR: Self = Self(ljud_sys::LJE_NOERROR as i32);
    /// Invalid channel number for the requested IO type.
    pub const INVALID_CHANNEL_NUMBER: Self = Self(ljud_sys::LJE_INVALID_CHANNEL_NUMBER as i32);
    /// Invalid request parameter (value out of range, bad x1, ...).
    pub const INVALID_PARAMETER: Self = Self(ljud_sys::LJE_INVALID_PARAMETER as i32);
    /// First code that applies to the whole device instead of one request.
    pub const MIN_GROUP_ERROR: Self = Self(ljud_sys::LJE_MIN_GROUP_ERROR as i32);
    /// The handle does not refer to an open device.
    pub const INVALID_HANDLE: Self = Self(ljud_sys::LJE_INVALID_HANDLE as i32);
    /// End of the result list produced by the last execute.
    pub const NO_MORE_DATA_AVAILABLE: Self = Self(ljud_sys::LJE_NO_MORE_DATA_AVAILABLE as i32);
    /// No device matched the open request.
    pub const LABJACK_NOT_FOUND: Self = Self(ljud_sys::LJE_LABJACK_NOT_FOUND as i32);
    /// USB communication with the device failed.
    pub const COMM_FAILURE: Self = Self(ljud_sys::LJE_COMM_FAILURE as i32);
    /// The vendor driver is not installed or not linked.
    pub const USB_DRIVER_NOT_FOUND: Self = Self(ljud_sys::LJE_USB_DRIVER_NOT_FOUND as i32);

    /// Raw integer value.
    pub fn value(self) -> i32 {
        self.0
    }

    /// Classify this code. Pure; performs no logging.
    pub fn classify(self) -> ErrorClass {
        // The sentinel lies above the group threshold, so it is tested first.
        if self == Self::NO_MORE_DATA_AVAILABLE {
            ErrorClass::EndOfResults
        } else if self.0 < 0 {
            ErrorClass::Advisory
        } else if self.0 == 0 {
            ErrorClass::Success
        } else if self < Self::MIN_GROUP_ERROR {
            ErrorClass::Recoverable
        } else {
            ErrorClass::Fatal
        }
    }

    /// True for negative (warning) codes.
    pub fn is_advisory(self) -> bool {
        self.classify() == ErrorClass::Advisory
    }

    /// True for group-level codes other than the end-of-results sentinel.
    pub fn is_fatal(self) -> bool {
        self.classify() == ErrorClass::Fatal
    }

    /// True for the end-of-results sentinel.
    pub fn is_end_of_results(self) -> bool {
        self == Self::NO_MORE_DATA_AVAILABLE
    }
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        Self(code)
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Classification of a raw [`ErrorCode`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorClass {
    /// Negative code: log it, the operation succeeded.
    Advisory,
    /// Zero: no error.
    Success,
    /// Error tied to a single request; the current cycle is abandoned.
    Recoverable,
    /// Group error; the session is unusable and no further cycles may run.
    Fatal,
    /// The result cursor has no more entries.
    EndOfResults,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Advisory => write!(f, "advisory"),
            Self::Success => write!(f, "success"),
            Self::Recoverable => write!(f, "recoverable"),
            Self::Fatal => write!(f, "fatal"),
            Self::EndOfResults => write!(f, "end of results"),
        }
    }
}

/// Errors that can occur when working with a UD device.
#[derive(Error, Debug)]
pub enum UdError {
    /// A request-level error reported by the driver.
    #[error("{context} failed (code {code}): {message}")]
    Recoverable {
        code: ErrorCode,
        message: String,
        context: String,
    },

    /// A group-level error; the session and driver must not be used again.
    #[error("Fatal driver error (code {code}): {message}")]
    Fatal { code: ErrorCode, message: String },

    /// The session previously observed a fatal error.
    #[error("Session is unusable after fatal error (code {code})")]
    SessionPoisoned { code: ErrorCode },

    /// `first_result` was called after results were already requested.
    #[error("Result cursor already started; first result can only be requested once")]
    CursorStarted,

    /// A single-request read produced no matching entry.
    #[error("No result for {io_type} on channel {channel}")]
    MissingResult { io_type: IoType, channel: i32 },

    /// Device address could not be passed to the driver.
    #[error("Invalid device address '{address}'")]
    InvalidAddress { address: String },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] Box<figment::Error>),

    /// Configuration loaded but failed validation.
    #[error("Configuration validation error: {0}")]
    InvalidConfig(String),
}

impl UdError {
    /// Build the error matching a non-success, non-advisory code.
    ///
    /// `message` must be the driver-decoded text for `code`.
    pub fn from_code(code: ErrorCode, message: String, context: impl Into<String>) -> Self {
        match code.classify() {
            ErrorClass::Fatal => Self::Fatal { code, message },
            _ => Self::Recoverable {
                code,
                message,
                context: context.into(),
            },
        }
    }

    /// The raw driver code, when this error came from the driver.
    pub fn code(&self) -> Option<ErrorCode> {
        match self {
            Self::Recoverable { code, .. }
            | Self::Fatal { code, .. }
            | Self::SessionPoisoned { code } => Some(*code),
            _ => None,
        }
    }

    /// Check if this error ends all further device use.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal { .. } | Self::SessionPoisoned { .. })
    }

    /// Check if this error only affects the current request or cycle.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::Recoverable { .. })
    }
}

impl From<figment::Error> for UdError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_boundaries() {
        assert_eq!(ErrorCode(-1).classify(), ErrorClass::Advisory);
        assert_eq!(ErrorCode(i32::MIN).classify(), ErrorClass::Advisory);
        assert_eq!(ErrorCode(0).classify(), ErrorClass::Success);
        assert_eq!(ErrorCode(1).classify(), ErrorClass::Recoverable);
        assert_eq!(ErrorCode(999).classify(), ErrorClass::Recoverable);
        assert_eq!(ErrorCode(1000).classify(), ErrorClass::Fatal);
        assert_eq!(ErrorCode(1007).classify(), ErrorClass::Fatal);
    }

    #[test]
    fn test_sentinel_wins_over_group_threshold() {
        assert!(ErrorCode::NO_MORE_DATA_AVAILABLE >= ErrorCode::MIN_GROUP_ERROR);
        assert_eq!(
            ErrorCode::NO_MORE_DATA_AVAILABLE.classify(),
            ErrorClass::EndOfResults
        );
        assert!(!ErrorCode::NO_MORE_DATA_AVAILABLE.is_fatal());
    }

    #[test]
    fn test_from_code_picks_tier() {
        let err = UdError::from_code(ErrorCode(2), "Invalid channel number".into(), "execute");
        assert!(err.is_recoverable());
        assert!(err.to_string().contains("Invalid channel number"));

        let err = UdError::from_code(ErrorCode::COMM_FAILURE, "Comm failure".into(), "execute");
        assert!(err.is_fatal());
        assert_eq!(err.code(), Some(ErrorCode::COMM_FAILURE));
    }

    #[test]
    fn test_error_display_includes_decoded_message() {
        let err = UdError::Fatal {
            code: ErrorCode::LABJACK_NOT_FOUND,
            message: "LabJack not found".to_string(),
        };
        let text = err.to_string();
        assert!(text.contains("1007"));
        assert!(text.contains("LabJack not found"));
    }
}
