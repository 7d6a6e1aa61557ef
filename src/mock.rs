//! Simulated UD driver.
//!
//! [`MockDriver`] behaves like a U3 behind the UD add/go/get model: requests
//! are queued per handle, executed together by `go_one`, and walked by the
//! result cursor until the end-of-results sentinel. It is used by the test
//! suites and by the `--simulate` CLI flag.
//!
//! # Simulated hardware
//!
//! - 2 DACs accepting 0-5 V
//! - 20 digital lines (FIO0-7, EIO0-7, CIO0-3) with direction and state; an
//!   input line reads high through its pull-up unless an external level is set
//! - 16 analog inputs returning configurable voltages
//! - 2 counters
//!
//! Invalid channels and out-of-range values are reported per request through
//! the result list, never at queue time.
//!
//! # Error injection
//!
//! [`MockScenario`] entries inject advisory, recoverable and fatal codes,
//! extra or missing result entries, and open failures. The driver state is
//! shared through `Arc<Mutex<_>>`, so a test keeps a clone of the driver to
//! inspect calls and outputs after handing the original to a session.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::driver::{Driver, Handle, OpenTarget, RawResult};
use crate::error::ErrorCode;
use crate::request::{IoType, Operation};

/// Number of DAC outputs.
pub const DAC_CHANNELS: i32 = 2;
/// Number of digital lines.
pub const DIGITAL_LINES: i32 = 20;
/// Number of analog inputs.
pub const AIN_CHANNELS: i32 = 16;
/// Number of counters.
pub const COUNTERS: i32 = 2;
/// DAC output limit in volts.
pub const DAC_MAX_VOLTS: f64 = 5.0;

/// Injected failure or result-list distortion.
///
/// `execute` is the zero-based index of the `go_one` call the scenario applies
/// to, `index` the zero-based position in that call's result list.
#[derive(Debug, Clone, PartialEq)]
pub enum MockScenario {
    /// `open` reports that no device was found.
    DeviceNotFound,
    /// `add_request` number `request` (zero-based, counted across the whole
    /// session) returns `code` and the request is not queued.
    FailAddRequest { request: usize, code: ErrorCode },
    /// `go_one` returns `code` instead of executing.
    FailExecute { execute: usize, code: ErrorCode },
    /// Result entry `index` carries a negative warning code.
    AdvisoryOnResult {
        execute: usize,
        index: usize,
        code: ErrorCode,
    },
    /// Result entry `index` carries an error code.
    ErrorOnResult {
        execute: usize,
        index: usize,
        code: ErrorCode,
    },
    /// A diagnostic entry is appended to the result list.
    AppendDiagnostic { execute: usize, io_type: IoType },
    /// Result entry `index` is coalesced away.
    DropResult { execute: usize, index: usize },
}

/// Driver call recorded by the mock.
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// `open`
    Open,
    /// `add_request`
    AddRequest(Operation),
    /// `go_one`
    GoOne,
    /// `first_result`
    FirstResult,
    /// `next_result`
    NextResult,
    /// `close`
    Close(Handle),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Line {
    output: bool,
    state: bool,
}

impl Default for Line {
    fn default() -> Self {
        Self {
            output: false,
            state: true,
        }
    }
}

#[derive(Debug)]
struct MockState {
    next_handle: Handle,
    open_handles: Vec<Handle>,
    close_count: usize,
    pending: Vec<Operation>,
    results: Vec<RawResult>,
    cursor: usize,
    sentinel_reached: bool,
    add_requests: usize,
    executes: usize,
    dac: [f64; DAC_CHANNELS as usize],
    lines: [Line; DIGITAL_LINES as usize],
    external_levels: HashMap<i32, bool>,
    ain: HashMap<i32, f64>,
    counters: [u32; COUNTERS as usize],
    scenarios: Vec<MockScenario>,
    calls: Vec<MockCall>,
}

impl Default for MockState {
    fn default() -> Self {
        Self {
            next_handle: 1,
            open_handles: Vec::new(),
            close_count: 0,
            pending: Vec::new(),
            results: Vec::new(),
            cursor: 0,
            sentinel_reached: false,
            add_requests: 0,
            executes: 0,
            dac: [0.0; DAC_CHANNELS as usize],
            lines: [Line::default(); DIGITAL_LINES as usize],
            external_levels: HashMap::new(),
            ain: HashMap::new(),
            counters: [0; COUNTERS as usize],
            scenarios: Vec::new(),
            calls: Vec::new(),
        }
    }
}

impl MockState {
    fn simulate(&mut self, op: &Operation) -> (ErrorCode, f64) {
        let in_range = |limit: i32| op.channel >= 0 && op.channel < limit;
        match op.io_type {
            IoType::PutDac => {
                if !in_range(DAC_CHANNELS) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, op.value);
                }
                if !(0.0..=DAC_MAX_VOLTS).contains(&op.value) {
                    return (ErrorCode::INVALID_PARAMETER, op.value);
                }
                self.dac[op.channel as usize] = op.value;
                (ErrorCode::NOERROR, op.value)
            }
            IoType::PutDigitalBit => {
                if !in_range(DIGITAL_LINES) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, op.value);
                }
                self.lines[op.channel as usize] = Line {
                    output: true,
                    state: op.value != 0.0,
                };
                (ErrorCode::NOERROR, op.value)
            }
            IoType::GetDigitalBit => {
                if !in_range(DIGITAL_LINES) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, 0.0);
                }
                let level = self.read_line(op.channel);
                (ErrorCode::NOERROR, f64::from(u8::from(level)))
            }
            IoType::GetDigitalPort => {
                let Some(count) = port_width(op) else {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, 0.0);
                };
                let bits = (0..count).fold(0u32, |acc, i| {
                    acc | (u32::from(self.read_line(op.channel + i)) << i)
                });
                (ErrorCode::NOERROR, f64::from(bits))
            }
            IoType::PutDigitalPort => {
                let Some(count) = port_width(op) else {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, op.value);
                };
                let bits = op.value as u32;
                for i in 0..count {
                    self.lines[(op.channel + i) as usize] = Line {
                        output: true,
                        state: bits & (1 << i) != 0,
                    };
                }
                (ErrorCode::NOERROR, op.value)
            }
            IoType::GetAin | IoType::GetAinDiff => {
                if !in_range(AIN_CHANNELS) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, 0.0);
                }
                let volts = self.ain.get(&op.channel).copied().unwrap_or(0.0);
                (ErrorCode::NOERROR, volts)
            }
            IoType::GetCounter => {
                if !in_range(COUNTERS) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, 0.0);
                }
                (ErrorCode::NOERROR, f64::from(self.counters[op.channel as usize]))
            }
            IoType::PutCounterEnable => {
                if !in_range(COUNTERS) {
                    return (ErrorCode::INVALID_CHANNEL_NUMBER, op.value);
                }
                (ErrorCode::NOERROR, op.value)
            }
            IoType::PinConfigurationReset => {
                self.lines = [Line::default(); DIGITAL_LINES as usize];
                (ErrorCode::NOERROR, 0.0)
            }
            IoType::PutConfig | IoType::GetConfig | IoType::PutAnalogEnablePort => {
                (ErrorCode::NOERROR, op.value)
            }
            IoType::Other(_) => (ErrorCode::INVALID_PARAMETER, op.value),
        }
    }

    /// Reading a line turns it into an input.
    fn read_line(&mut self, channel: i32) -> bool {
        let line = &mut self.lines[channel as usize];
        line.output = false;
        line.state = self.external_levels.get(&channel).copied().unwrap_or(true);
        line.state
    }

    fn apply_scenarios(&mut self, execute: usize) {
        for scenario in self.scenarios.clone() {
            match scenario {
                MockScenario::AdvisoryOnResult {
                    execute: e,
                    index,
                    code,
                }
                | MockScenario::ErrorOnResult {
                    execute: e,
                    index,
                    code,
                } if e == execute => {
                    if let Some(entry) = self.results.get_mut(index) {
                        entry.code = code;
                    }
                }
                MockScenario::AppendDiagnostic { execute: e, io_type } if e == execute => {
                    self.results.push(RawResult {
                        code: ErrorCode::NOERROR,
                        io_type,
                        channel: 0,
                        value: 0.0,
                    });
                }
                MockScenario::DropResult { execute: e, index }
                    if e == execute && index < self.results.len() =>
                {
                    self.results.remove(index);
                }
                _ => {}
            }
        }
    }

    fn take_result(&mut self) -> RawResult {
        match self.results.get(self.cursor) {
            Some(&raw) => {
                self.cursor += 1;
                raw
            }
            None => {
                self.sentinel_reached = true;
                RawResult::end_of_results()
            }
        }
    }
}

/// Line count of a digital port request (`extra1`), if the lines starting at
/// `channel` exist.
fn port_width(op: &Operation) -> Option<i32> {
    let count = op.extra1 as i32;
    let available = DIGITAL_LINES.checked_sub(op.channel)?;
    (op.channel >= 0 && count >= 1 && count <= available).then_some(count)
}

/// Simulated U3-like UD driver.
#[derive(Debug, Clone, Default)]
pub struct MockDriver {
    state: Arc<Mutex<MockState>>,
}

impl MockDriver {
    /// Create a driver with one attached device and no injected errors.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an error-injection scenario.
    pub fn with_scenario(self, scenario: MockScenario) -> Self {
        self.state.lock().scenarios.push(scenario);
        self
    }

    /// Set the voltage an analog input reads.
    pub fn set_ain(&self, channel: i32, volts: f64) {
        self.state.lock().ain.insert(channel, volts);
    }

    /// Drive an input line externally.
    pub fn set_external_level(&self, channel: i32, high: bool) {
        self.state.lock().external_levels.insert(channel, high);
    }

    /// Set a counter value.
    pub fn set_counter(&self, channel: i32, count: u32) {
        if let Some(c) = self.state.lock().counters.get_mut(channel as usize) {
            *c = count;
        }
    }

    /// Last voltage written to a DAC.
    pub fn dac(&self, channel: i32) -> Option<f64> {
        self.state.lock().dac.get(channel as usize).copied()
    }

    /// `(is_output, state)` of a digital line.
    pub fn line(&self, channel: i32) -> Option<(bool, bool)> {
        self.state
            .lock()
            .lines
            .get(channel as usize)
            .map(|l| (l.output, l.state))
    }

    /// Recorded driver calls, oldest first.
    pub fn calls(&self) -> Vec<MockCall> {
        self.state.lock().calls.clone()
    }

    /// Handles currently open.
    pub fn open_handles(&self) -> Vec<Handle> {
        self.state.lock().open_handles.clone()
    }

    /// Number of `close` calls.
    pub fn close_count(&self) -> usize {
        self.state.lock().close_count
    }

    /// Number of `go_one` calls.
    pub fn execute_count(&self) -> usize {
        self.state.lock().executes
    }

    /// True if the last result list was walked up to the sentinel.
    pub fn sentinel_reached(&self) -> bool {
        self.state.lock().sentinel_reached
    }
}

impl Driver for MockDriver {
    fn driver_version(&self) -> f64 {
        3.48
    }

    fn open(&mut self, target: &OpenTarget) -> (ErrorCode, Handle) {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Open);
        if state.scenarios.contains(&MockScenario::DeviceNotFound) {
            return (ErrorCode::LABJACK_NOT_FOUND, 0);
        }
        let handle = state.next_handle;
        state.next_handle += 1;
        state.open_handles.push(handle);
        debug!(handle, device = %target.device_type, "Mock device opened");
        (ErrorCode::NOERROR, handle)
    }

    fn add_request(&mut self, handle: Handle, operation: &Operation) -> ErrorCode {
        let mut state = self.state.lock();
        state.calls.push(MockCall::AddRequest(*operation));
        if !state.open_handles.contains(&handle) {
            return ErrorCode::INVALID_HANDLE;
        }
        let request = state.add_requests;
        state.add_requests += 1;
        let failure = state.scenarios.iter().find_map(|s| match s {
            MockScenario::FailAddRequest { request: r, code } if *r == request => Some(*code),
            _ => None,
        });
        if let Some(code) = failure {
            return code;
        }
        state.pending.push(*operation);
        ErrorCode::NOERROR
    }

    fn go_one(&mut self, handle: Handle) -> ErrorCode {
        let mut state = self.state.lock();
        state.calls.push(MockCall::GoOne);
        if !state.open_handles.contains(&handle) {
            return ErrorCode::INVALID_HANDLE;
        }

        let execute = state.executes;
        state.executes += 1;
        state.results.clear();
        state.cursor = 0;
        state.sentinel_reached = false;
        let pending = std::mem::take(&mut state.pending);

        let failure = state.scenarios.iter().find_map(|s| match s {
            MockScenario::FailExecute { execute: e, code } if *e == execute => Some(*code),
            _ => None,
        });
        if let Some(code) = failure {
            return code;
        }

        for op in &pending {
            let (code, value) = state.simulate(op);
            state.results.push(RawResult {
                code,
                io_type: op.io_type,
                channel: op.channel,
                value,
            });
        }
        state.apply_scenarios(execute);
        ErrorCode::NOERROR
    }

    fn first_result(&mut self, handle: Handle) -> RawResult {
        let mut state = self.state.lock();
        state.calls.push(MockCall::FirstResult);
        if !state.open_handles.contains(&handle) {
            return RawResult {
                code: ErrorCode::INVALID_HANDLE,
                ..RawResult::end_of_results()
            };
        }
        state.cursor = 0;
        state.take_result()
    }

    fn next_result(&mut self, handle: Handle) -> RawResult {
        let mut state = self.state.lock();
        state.calls.push(MockCall::NextResult);
        if !state.open_handles.contains(&handle) {
            return RawResult {
                code: ErrorCode::INVALID_HANDLE,
                ..RawResult::end_of_results()
            };
        }
        state.take_result()
    }

    fn error_to_string(&self, code: ErrorCode) -> String {
        let text = match code.value() {
            0 => "No error",
            1 => "Command list error",
            2 => "Invalid channel number",
            10 => "Invalid parameter",
            1001 => "Unknown error",
            1003 => "Invalid handle",
            1004 => "Device not open",
            1006 => "No more data available",
            1007 => "LabJack not found",
            1008 => "Comm failure",
            1011 => "Comm timeout",
            1012 => "USB driver not found",
            c if c < 0 => return format!("Warning {}", c),
            c => return format!("Unknown error code {}", c),
        };
        text.to_string()
    }

    fn close(&mut self, handle: Handle) {
        let mut state = self.state.lock();
        state.calls.push(MockCall::Close(handle));
        state.close_count += 1;
        state.open_handles.retain(|&h| h != handle);
        state.pending.clear();
        state.results.clear();
        state.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opened() -> (MockDriver, Handle) {
        let mut mock = MockDriver::new();
        let (code, handle) = mock.open(&OpenTarget::default());
        assert_eq!(code, ErrorCode::NOERROR);
        (mock, handle)
    }

    fn op(io_type: IoType, channel: i32, value: f64) -> Operation {
        Operation {
            io_type,
            channel,
            value,
            extra1: 0.0,
            user_data: 0,
        }
    }

    #[test]
    fn test_results_follow_submission_order() {
        let (mut mock, h) = opened();
        mock.add_request(h, &op(IoType::PutDac, 0, 1.0));
        mock.add_request(h, &op(IoType::GetAin, 4, 0.0));
        assert_eq!(mock.go_one(h), ErrorCode::NOERROR);

        assert_eq!(mock.first_result(h).io_type, IoType::PutDac);
        assert_eq!(mock.next_result(h).io_type, IoType::GetAin);
        assert!(mock.next_result(h).code.is_end_of_results());
        assert!(mock.sentinel_reached());
    }

    #[test]
    fn test_reading_a_line_makes_it_an_input() {
        let (mut mock, h) = opened();
        mock.add_request(h, &op(IoType::PutDigitalBit, 5, 0.0));
        mock.go_one(h);
        assert_eq!(mock.line(5), Some((true, false)));

        mock.add_request(h, &op(IoType::GetDigitalBit, 5, 0.0));
        mock.go_one(h);
        let raw = mock.first_result(h);
        assert_eq!(raw.value, 1.0);
        assert_eq!(mock.line(5), Some((false, true)));
    }

    #[test]
    fn test_invalid_dac_value_is_reported_per_request() {
        let (mut mock, h) = opened();
        assert_eq!(mock.add_request(h, &op(IoType::PutDac, 0, 7.5)), ErrorCode::NOERROR);
        mock.go_one(h);
        assert_eq!(mock.first_result(h).code, ErrorCode::INVALID_PARAMETER);
        assert_eq!(mock.dac(0), Some(0.0));
    }

    #[test]
    fn test_scenarios_distort_result_list() {
        let mut mock = MockDriver::new()
            .with_scenario(MockScenario::DropResult { execute: 0, index: 0 })
            .with_scenario(MockScenario::AppendDiagnostic {
                execute: 0,
                io_type: IoType::Other(9999),
            });
        let (_, h) = mock.open(&OpenTarget::default());
        mock.add_request(h, &op(IoType::GetAin, 0, 0.0));
        mock.add_request(h, &op(IoType::GetAin, 1, 0.0));
        mock.go_one(h);

        assert_eq!(mock.first_result(h).channel, 1);
        assert_eq!(mock.next_result(h).io_type, IoType::Other(9999));
        assert!(mock.next_result(h).code.is_end_of_results());
    }

    #[test]
    fn test_first_result_rewinds_the_cursor() {
        let (mut mock, h) = opened();
        mock.add_request(h, &op(IoType::GetAin, 2, 0.0));
        mock.add_request(h, &op(IoType::GetAin, 3, 0.0));
        mock.go_one(h);

        assert_eq!(mock.first_result(h).channel, 2);
        assert_eq!(mock.next_result(h).channel, 3);
        assert_eq!(mock.first_result(h).channel, 2);
        assert_eq!(mock.next_result(h).channel, 3);
        assert!(mock.next_result(h).code.is_end_of_results());
    }

    #[test]
    fn test_oversized_port_width_is_an_invalid_channel() {
        let (mut mock, h) = opened();
        for (io_type, channel, width) in [
            (IoType::GetDigitalPort, 5, 1e10),
            (IoType::PutDigitalPort, 5, 1e10),
            (IoType::GetDigitalPort, 18, 3.0),
            (IoType::GetDigitalPort, -1, 2.0),
            (IoType::PutDigitalPort, 0, 0.0),
        ] {
            let mut request = op(io_type, channel, 0.0);
            request.extra1 = width;
            mock.add_request(h, &request);
            mock.go_one(h);
            assert_eq!(
                mock.first_result(h).code,
                ErrorCode::INVALID_CHANNEL_NUMBER,
                "{} ch{} width {}",
                io_type,
                channel,
                width
            );
        }
    }

    #[test]
    fn test_failed_add_request_is_not_queued() {
        let mut mock = MockDriver::new().with_scenario(MockScenario::FailAddRequest {
            request: 0,
            code: ErrorCode::INVALID_PARAMETER,
        });
        let (_, h) = mock.open(&OpenTarget::default());
        assert_eq!(
            mock.add_request(h, &op(IoType::GetAin, 0, 0.0)),
            ErrorCode::INVALID_PARAMETER
        );
        assert_eq!(mock.add_request(h, &op(IoType::GetAin, 1, 0.0)), ErrorCode::NOERROR);
        mock.go_one(h);

        assert_eq!(mock.first_result(h).channel, 1);
        assert!(mock.next_result(h).code.is_end_of_results());
    }

    #[test]
    fn test_digital_port_read_packs_bits() {
        let (mut mock, h) = opened();
        mock.set_external_level(6, false);
        let mut read = op(IoType::GetDigitalPort, 5, 0.0);
        read.extra1 = 2.0;
        mock.add_request(h, &read);
        mock.go_one(h);
        // FIO5 high (pull-up), FIO6 held low
        assert_eq!(mock.first_result(h).value, 1.0);
    }
}
