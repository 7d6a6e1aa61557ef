//! Owned device session.
//!
//! [`DeviceSession`] pairs a [`Driver`] with the handle it issued. The handle
//! is released when the session is dropped, on every exit path including
//! fatal aborts. All device access goes through `&mut DeviceSession`, which
//! serializes batches and keeps the result cursor from being re-entered.

use tracing::{debug, error, info, warn};

use crate::driver::{Driver, Handle, OpenTarget};
use crate::error::{ErrorClass, ErrorCode, Result, UdError};

/// A safe wrapper around an open device handle.
pub struct DeviceSession<D: Driver> {
    driver: D,
    handle: Handle,
    target: OpenTarget,
    /// Set once a group error has been observed.
    poisoned: Option<ErrorCode>,
}

impl<D: Driver> DeviceSession<D> {
    /// Open the device described by `target`.
    ///
    /// # Errors
    ///
    /// Returns [`UdError::InvalidAddress`] if the address cannot be handed to
    /// the driver, and a recoverable or fatal error if the driver refuses to
    /// open the device.
    pub fn open(mut driver: D, target: OpenTarget) -> Result<Self> {
        if target.address.contains('\0') {
            return Err(UdError::InvalidAddress {
                address: target.address,
            });
        }

        let (code, handle) = driver.open(&target);
        match code.classify() {
            ErrorClass::Success => {}
            ErrorClass::Advisory => {
                warn!(code = code.value(), "Warning: {}", driver.error_to_string(code));
            }
            _ => {
                let message = driver.error_to_string(code);
                error!(
                    code = code.value(),
                    device = %target.device_type,
                    address = %target.address,
                    "Failed to open device: {}",
                    message
                );
                return Err(UdError::from_code(code, message, "open device"));
            }
        }

        info!(
            device = %target.device_type,
            address = %target.address,
            handle,
            "Opened device"
        );

        Ok(Self {
            driver,
            handle,
            target,
            poisoned: None,
        })
    }

    /// Handle issued by the driver.
    pub fn handle(&self) -> Handle {
        self.handle
    }

    /// Target this session was opened with.
    pub fn target(&self) -> &OpenTarget {
        &self.target
    }

    /// Version of the underlying driver.
    pub fn driver_version(&self) -> f64 {
        self.driver.driver_version()
    }

    /// Driver-provided description of `code`.
    pub fn describe(&self, code: ErrorCode) -> String {
        self.driver.error_to_string(code).trim().to_string()
    }

    /// The group error that made this session unusable, if any.
    pub fn poisoned(&self) -> Option<ErrorCode> {
        self.poisoned
    }

    /// Fail fast if a previous call observed a group error.
    pub(crate) fn ensure_usable(&self) -> Result<()> {
        match self.poisoned {
            Some(code) => Err(UdError::SessionPoisoned { code }),
            None => Ok(()),
        }
    }

    /// Classify a status code from a device call.
    ///
    /// Advisory codes are logged with their decoded text and absorbed.
    /// Recoverable and fatal codes become errors; a fatal code also poisons
    /// the session. The end-of-results sentinel is returned as a class.
    pub(crate) fn check(&mut self, code: ErrorCode, context: &str) -> Result<ErrorClass> {
        let class = code.classify();
        match class {
            ErrorClass::Success | ErrorClass::EndOfResults => Ok(class),
            ErrorClass::Advisory => {
                warn!(code = code.value(), context, "Warning: {}", self.describe(code));
                Ok(class)
            }
            ErrorClass::Recoverable => Err(UdError::from_code(code, self.describe(code), context)),
            ErrorClass::Fatal => Err(self.fatal(code)),
        }
    }

    /// Record a group error and build the matching error value.
    pub(crate) fn fatal(&mut self, code: ErrorCode) -> UdError {
        let message = self.describe(code);
        error!(code = code.value(), handle = self.handle, "Fatal driver error: {}", message);
        self.poisoned = Some(code);
        UdError::Fatal { code, message }
    }

    pub(crate) fn driver_mut(&mut self) -> &mut D {
        &mut self.driver
    }
}

impl<D: Driver> Drop for DeviceSession<D> {
    fn drop(&mut self) {
        debug!(handle = self.handle, "Closing device session");
        self.driver.close(self.handle);
    }
}

impl<D: Driver> std::fmt::Debug for DeviceSession<D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DeviceSession")
            .field("handle", &self.handle)
            .field("target", &self.target)
            .field("poisoned", &self.poisoned)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{MockDriver, MockScenario};

    #[test]
    fn test_open_and_close_on_drop() {
        let mock = MockDriver::new();
        {
            let session = DeviceSession::open(mock.clone(), OpenTarget::default()).unwrap();
            assert_eq!(mock.open_handles(), vec![session.handle()]);
        }
        assert!(mock.open_handles().is_empty());
        assert_eq!(mock.close_count(), 1);
    }

    #[test]
    fn test_open_not_found_is_fatal() {
        let mock = MockDriver::new().with_scenario(MockScenario::DeviceNotFound);
        let err = DeviceSession::open(mock.clone(), OpenTarget::default()).unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(err.code(), Some(ErrorCode::LABJACK_NOT_FOUND));
        assert!(err.to_string().contains("LabJack not found"));
        // Nothing was opened, so nothing is closed.
        assert_eq!(mock.close_count(), 0);
    }

    #[test]
    fn test_open_rejects_nul_in_address() {
        let target = OpenTarget {
            address: "1\0".to_string(),
            ..OpenTarget::default()
        };
        let err = DeviceSession::open(MockDriver::new(), target).unwrap_err();
        assert!(matches!(err, UdError::InvalidAddress { .. }));
    }

    #[test]
    fn test_check_poisons_on_fatal() {
        let mut session = DeviceSession::open(MockDriver::new(), OpenTarget::default()).unwrap();
        assert!(session.check(ErrorCode(-3), "test").is_ok());
        assert!(session.check(ErrorCode(2), "test").unwrap_err().is_recoverable());
        assert!(session.poisoned().is_none());

        let err = session.check(ErrorCode::COMM_FAILURE, "test").unwrap_err();
        assert!(err.is_fatal());
        assert_eq!(session.poisoned(), Some(ErrorCode::COMM_FAILURE));
        assert!(session.ensure_usable().is_err());
    }
}
