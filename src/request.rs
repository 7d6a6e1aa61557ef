//! Request batches.
//!
//! A [`RequestBatch`] accumulates the [`Operation`]s of one execution cycle in
//! submission order. It knows nothing about the device: channels and values are
//! not validated here, the device reports problems through error codes when
//! the batch is executed and drained.
//!
//! Batches are append-only. Executing a batch consumes it, so a batch can never
//! be submitted twice.

use std::fmt;

/// Kind of I/O request understood by the UD driver.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IoType {
    /// Read a single-ended analog input.
    GetAin,
    /// Read a differential analog input; `extra1` selects the negative channel.
    GetAinDiff,
    /// Set an analog output voltage.
    PutDac,
    /// Read one digital line (switches the line to input).
    GetDigitalBit,
    /// Read a group of digital lines; `extra1` is the number of lines.
    GetDigitalPort,
    /// Drive one digital line as output with the given state.
    PutDigitalBit,
    /// Drive a group of digital lines; `extra1` is the number of lines.
    PutDigitalPort,
    /// Read a counter.
    GetCounter,
    /// Enable or disable a counter.
    PutCounterEnable,
    /// Set a configuration channel.
    PutConfig,
    /// Read a configuration channel.
    GetConfig,
    /// Set analog/digital mode for a block of flexible lines.
    PutAnalogEnablePort,
    /// Reset all pin assignments to the factory default.
    PinConfigurationReset,
    /// Any other raw driver IO type.
    Other(i32),
}

impl IoType {
    /// Raw driver value.
    pub fn raw(self) -> i32 {
        let raw = match self {
            Self::GetAin => ljud_sys::LJ_ioGET_AIN,
            Self::GetAinDiff => ljud_sys::LJ_ioGET_AIN_DIFF,
            Self::PutDac => ljud_sys::LJ_ioPUT_DAC,
            Self::GetDigitalBit => ljud_sys::LJ_ioGET_DIGITAL_BIT,
            Self::GetDigitalPort => ljud_sys::LJ_ioGET_DIGITAL_PORT,
            Self::PutDigitalBit => ljud_sys::LJ_ioPUT_DIGITAL_BIT,
            Self::PutDigitalPort => ljud_sys::LJ_ioPUT_DIGITAL_PORT,
            Self::GetCounter => ljud_sys::LJ_ioGET_COUNTER,
            Self::PutCounterEnable => ljud_sys::LJ_ioPUT_COUNTER_ENABLE,
            Self::PutConfig => ljud_sys::LJ_ioPUT_CONFIG,
            Self::GetConfig => ljud_sys::LJ_ioGET_CONFIG,
            Self::PutAnalogEnablePort => ljud_sys::LJ_ioPUT_ANALOG_ENABLE_PORT,
            Self::PinConfigurationReset => ljud_sys::LJ_ioPIN_CONFIGURATION_RESET,
            Self::Other(raw) => return raw,
        };
        raw as i32
    }

    /// Convert from a raw driver value. Unknown values map to [`IoType::Other`].
    pub fn from_raw(raw: i32) -> Self {
        match raw as libc::c_long {
            ljud_sys::LJ_ioGET_AIN => Self::GetAin,
            ljud_sys::LJ_ioGET_AIN_DIFF => Self::GetAinDiff,
            ljud_sys::LJ_ioPUT_DAC => Self::PutDac,
            ljud_sys::LJ_ioGET_DIGITAL_BIT => Self::GetDigitalBit,
            ljud_sys::LJ_ioGET_DIGITAL_PORT => Self::GetDigitalPort,
            ljud_sys::LJ_ioPUT_DIGITAL_BIT => Self::PutDigitalBit,
            ljud_sys::LJ_ioPUT_DIGITAL_PORT => Self::PutDigitalPort,
            ljud_sys::LJ_ioGET_COUNTER => Self::GetCounter,
            ljud_sys::LJ_ioPUT_COUNTER_ENABLE => Self::PutCounterEnable,
            ljud_sys::LJ_ioPUT_CONFIG => Self::PutConfig,
            ljud_sys::LJ_ioGET_CONFIG => Self::GetConfig,
            ljud_sys::LJ_ioPUT_ANALOG_ENABLE_PORT => Self::PutAnalogEnablePort,
            ljud_sys::LJ_ioPIN_CONFIGURATION_RESET => Self::PinConfigurationReset,
            _ => Self::Other(raw),
        }
    }

    /// True for requests whose result carries a measured value.
    pub fn is_read(self) -> bool {
        matches!(
            self,
            Self::GetAin
                | Self::GetAinDiff
                | Self::GetDigitalBit
                | Self::GetDigitalPort
                | Self::GetCounter
                | Self::GetConfig
        )
    }
}

impl fmt::Display for IoType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GetAin => write!(f, "GET_AIN"),
            Self::GetAinDiff => write!(f, "GET_AIN_DIFF"),
            Self::PutDac => write!(f, "PUT_DAC"),
            Self::GetDigitalBit => write!(f, "GET_DIGITAL_BIT"),
            Self::GetDigitalPort => write!(f, "GET_DIGITAL_PORT"),
            Self::PutDigitalBit => write!(f, "PUT_DIGITAL_BIT"),
            Self::PutDigitalPort => write!(f, "PUT_DIGITAL_PORT"),
            Self::GetCounter => write!(f, "GET_COUNTER"),
            Self::PutCounterEnable => write!(f, "PUT_COUNTER_ENABLE"),
            Self::PutConfig => write!(f, "PUT_CONFIG"),
            Self::GetConfig => write!(f, "GET_CONFIG"),
            Self::PutAnalogEnablePort => write!(f, "PUT_ANALOG_ENABLE_PORT"),
            Self::PinConfigurationReset => write!(f, "PIN_CONFIGURATION_RESET"),
            Self::Other(raw) => write!(f, "IO_{}", raw),
        }
    }
}

/// One queued request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Operation {
    /// Request kind
    pub io_type: IoType,
    /// Channel (line, DAC index, counter index, or config channel)
    pub channel: i32,
    /// Value to write; ignored by reads
    pub value: f64,
    /// Request-specific extra argument (line count, negative channel, ...)
    pub extra1: f64,
    /// Opaque caller data echoed by the driver
    pub user_data: i64,
}

/// Ordered, append-only sequence of operations for one execution cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestBatch {
    operations: Vec<Operation>,
}

impl RequestBatch {
    /// Create an empty batch.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operation.
    pub fn add(&mut self, io_type: IoType, channel: i32, value: f64, extra1: f64, user_data: i64) {
        self.operations.push(Operation {
            io_type,
            channel,
            value,
            extra1,
            user_data,
        });
    }

    /// Set a DAC output voltage.
    pub fn put_dac(&mut self, channel: i32, volts: f64) -> &mut Self {
        self.add(IoType::PutDac, channel, volts, 0.0, 0);
        self
    }

    /// Drive a digital line as output.
    pub fn put_digital_bit(&mut self, channel: i32, state: bool) -> &mut Self {
        self.add(IoType::PutDigitalBit, channel, f64::from(u8::from(state)), 0.0, 0);
        self
    }

    /// Read a digital line. The line becomes an input.
    pub fn get_digital_bit(&mut self, channel: i32) -> &mut Self {
        self.add(IoType::GetDigitalBit, channel, 0.0, 0.0, 0);
        self
    }

    /// Read `count` digital lines starting at `channel`.
    pub fn get_digital_port(&mut self, channel: i32, count: u32) -> &mut Self {
        self.add(IoType::GetDigitalPort, channel, 0.0, f64::from(count), 0);
        self
    }

    /// Read a single-ended analog input.
    pub fn get_ain(&mut self, channel: i32) -> &mut Self {
        self.add(IoType::GetAin, channel, 0.0, 0.0, 0);
        self
    }

    /// Read a differential analog input against `negative_channel`.
    pub fn get_ain_diff(&mut self, channel: i32, negative_channel: i32) -> &mut Self {
        self.add(IoType::GetAinDiff, channel, 0.0, f64::from(negative_channel), 0);
        self
    }

    /// Read a counter.
    pub fn get_counter(&mut self, channel: i32) -> &mut Self {
        self.add(IoType::GetCounter, channel, 0.0, 0.0, 0);
        self
    }

    /// Set a configuration channel.
    pub fn put_config(&mut self, channel: i32, value: f64) -> &mut Self {
        self.add(IoType::PutConfig, channel, value, 0.0, 0);
        self
    }

    /// Reset pin assignments to the factory default.
    pub fn pin_configuration_reset(&mut self) -> &mut Self {
        self.add(IoType::PinConfigurationReset, 0, 0.0, 0.0, 0);
        self
    }

    /// Queued operations in submission order.
    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Number of queued operations.
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// True if nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Number of queued operations that produce a measured value.
    pub fn read_count(&self) -> usize {
        self.operations
            .iter()
            .filter(|op| op.io_type.is_read())
            .count()
    }
}

impl<'a> IntoIterator for &'a RequestBatch {
    type Item = &'a Operation;
    type IntoIter = std::slice::Iter<'a, Operation>;

    fn into_iter(self) -> Self::IntoIter {
        self.operations.iter()
    }
}
