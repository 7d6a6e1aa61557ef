//! Batch execution and the result cursor.
//!
//! [`BatchExecutor::execute`] queues every operation of a [`RequestBatch`] with
//! the driver and submits them in one transaction. It hands back a
//! [`ResultCursor`] that holds the session exclusively until it is dropped, so
//! no second batch can be submitted while results are pending.
//!
//! # Drain state machine
//!
//! ```text
//!                 record / advisory
//!                  +-----------+
//!                  v           |
//! AwaitingFirst -> Iterating --+--> Done      (end-of-results sentinel)
//!       |              |
//!       |              +----------> Aborted   (recoverable code)
//!       +----------------+--------> Fatal     (group code, poisons the session)
//! ```
//!
//! The end of the stream is the sentinel, never a count: the device may
//! coalesce, skip or append entries. Once the cursor leaves `Iterating` it
//! never calls the driver again. A cursor dropped before reaching `Done` or
//! `Fatal` discards the remaining entries so the next batch cannot observe
//! stale results.

use std::iter::FusedIterator;

use tracing::{debug, info, warn};

use crate::driver::{Driver, RawResult};
use crate::error::{ErrorClass, ErrorCode, Result, UdError};
use crate::request::{IoType, RequestBatch};
use crate::session::DeviceSession;

/// Upper bound on entries discarded when an undrained cursor is dropped.
const MAX_DISCARDED_RESULTS: usize = 4096;

/// One result produced by an executed batch.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ResultRecord {
    /// Request kind
    pub io_type: IoType,
    /// Channel of the request
    pub channel: i32,
    /// Measured value (reads) or echoed value (writes)
    pub value: f64,
}

impl From<RawResult> for ResultRecord {
    fn from(raw: RawResult) -> Self {
        Self {
            io_type: raw.io_type,
            channel: raw.channel,
            value: raw.value,
        }
    }
}

/// Position of a [`ResultCursor`] in the drain protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DrainState {
    /// Batch executed, first result not yet requested.
    AwaitingFirst,
    /// At least one entry consumed, more may follow.
    Iterating,
    /// End-of-results sentinel observed.
    Done,
    /// A request-level error ended consumption of this batch.
    Aborted,
    /// A group error was observed; the session is unusable.
    Fatal,
}

impl DrainState {
    /// True once the cursor will no longer call the driver.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Fatal)
    }
}

/// Fully drained batch.
#[derive(Debug, Clone, PartialEq)]
pub struct DrainOutcome {
    /// Status returned by the execute call
    pub batch_code: ErrorCode,
    /// Records in production order
    pub records: Vec<ResultRecord>,
    /// Advisory codes observed while draining
    pub advisories: Vec<ErrorCode>,
}

impl DrainOutcome {
    /// First record matching `io_type` and `channel`.
    pub fn find(&self, io_type: IoType, channel: i32) -> Option<&ResultRecord> {
        self.records
            .iter()
            .find(|r| r.io_type == io_type && r.channel == channel)
    }
}

/// Pull-based cursor over the results of one executed batch.
pub struct ResultCursor<'s, D: Driver> {
    session: &'s mut DeviceSession<D>,
    state: DrainState,
    batch_code: ErrorCode,
    advisories: Vec<ErrorCode>,
    consumed: usize,
}

impl<'s, D: Driver> ResultCursor<'s, D> {
    /// Current drain state.
    pub fn state(&self) -> DrainState {
        self.state
    }

    /// Status returned by the execute call.
    pub fn batch_code(&self) -> ErrorCode {
        self.batch_code
    }

    /// Number of entries consumed so far, including the failing one.
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Advisory codes observed so far.
    pub fn advisories(&self) -> &[ErrorCode] {
        &self.advisories
    }

    /// Fetch the first result.
    ///
    /// Returns `None` once the sentinel is reached, which for an empty batch
    /// happens on this first call.
    ///
    /// # Errors
    ///
    /// [`UdError::CursorStarted`] if results were already requested.
    pub fn first_result(&mut self) -> Option<Result<ResultRecord>> {
        if self.state != DrainState::AwaitingFirst {
            return Some(Err(UdError::CursorStarted));
        }
        self.step()
    }

    /// Fetch the next result.
    ///
    /// Called in [`DrainState::AwaitingFirst`] this fetches the first result.
    /// After the cursor reaches a terminal state it returns `None` without
    /// touching the driver.
    pub fn next_result(&mut self) -> Option<Result<ResultRecord>> {
        self.step()
    }

    /// Consume the cursor, collecting every record.
    ///
    /// # Errors
    ///
    /// Returns the first recoverable or fatal error observed.
    pub fn drain(mut self) -> Result<DrainOutcome> {
        let mut records = Vec::new();
        while let Some(item) = self.step() {
            records.push(item?);
        }
        Ok(DrainOutcome {
            batch_code: self.batch_code,
            records,
            advisories: std::mem::take(&mut self.advisories),
        })
    }

    fn fetch(&mut self) -> RawResult {
        let handle = self.session.handle();
        match self.state {
            DrainState::AwaitingFirst => self.session.driver_mut().first_result(handle),
            _ => self.session.driver_mut().next_result(handle),
        }
    }

    fn step(&mut self) -> Option<Result<ResultRecord>> {
        if self.state.is_terminal() {
            return None;
        }

        let raw = self.fetch();
        match raw.code.classify() {
            ErrorClass::EndOfResults => {
                debug!(consumed = self.consumed, "No more results");
                self.state = DrainState::Done;
                None
            }
            ErrorClass::Fatal => {
                self.consumed += 1;
                self.state = DrainState::Fatal;
                Some(Err(self.session.fatal(raw.code)))
            }
            ErrorClass::Recoverable => {
                self.consumed += 1;
                self.state = DrainState::Aborted;
                let context = format!("{} on channel {}", raw.io_type, raw.channel);
                let message = self.session.describe(raw.code);
                warn!(code = raw.code.value(), %context, "Request failed: {}", message);
                Some(Err(UdError::from_code(raw.code, message, context)))
            }
            ErrorClass::Advisory | ErrorClass::Success => {
                if raw.code.is_advisory() {
                    warn!(
                        code = raw.code.value(),
                        io_type = %raw.io_type,
                        channel = raw.channel,
                        "Warning: {}",
                        self.session.describe(raw.code)
                    );
                    self.advisories.push(raw.code);
                }
                self.consumed += 1;
                self.state = DrainState::Iterating;
                let record = ResultRecord::from(raw);
                info!(
                    io_type = %record.io_type,
                    channel = record.channel,
                    value = record.value,
                    "Result"
                );
                Some(Ok(record))
            }
        }
    }

    /// Walk the remaining entries without reporting them.
    fn discard_remaining(&mut self) {
        let mut discarded = 0usize;
        while !matches!(self.state, DrainState::Done | DrainState::Fatal)
            && discarded < MAX_DISCARDED_RESULTS
        {
            let raw = self.fetch();
            match raw.code.classify() {
                ErrorClass::EndOfResults => self.state = DrainState::Done,
                ErrorClass::Fatal => {
                    self.session.fatal(raw.code);
                    self.state = DrainState::Fatal;
                }
                _ => {
                    self.state = DrainState::Iterating;
                    discarded += 1;
                }
            }
        }
        if discarded > 0 {
            debug!(discarded, "Discarded undrained results");
        }
    }
}

impl<D: Driver> Iterator for ResultCursor<'_, D> {
    type Item = Result<ResultRecord>;

    fn next(&mut self) -> Option<Self::Item> {
        self.step()
    }
}

impl<D: Driver> FusedIterator for ResultCursor<'_, D> {}

impl<D: Driver> Drop for ResultCursor<'_, D> {
    fn drop(&mut self) {
        if !matches!(self.state, DrainState::Done | DrainState::Fatal) {
            self.discard_remaining();
        }
    }
}

/// Submits request batches and exposes their results.
pub trait BatchExecutor {
    /// Driver behind the executor.
    type Driver: Driver;

    /// Submit `batch` as one transaction.
    ///
    /// Advisory and request-level codes from queueing or executing are logged
    /// and reported through [`ResultCursor::batch_code`]; per-request errors
    /// surface while draining.
    ///
    /// # Errors
    ///
    /// Returns a fatal error on a group code, or [`UdError::SessionPoisoned`]
    /// if the session already observed one.
    fn execute(&mut self, batch: RequestBatch) -> Result<ResultCursor<'_, Self::Driver>>;

    /// Execute `batch` and drain every result.
    fn run(&mut self, batch: RequestBatch) -> Result<DrainOutcome> {
        self.execute(batch)?.drain()
    }

    /// Single-request write: add, execute and drain one operation.
    fn e_put(&mut self, io_type: IoType, channel: i32, value: f64, extra1: f64) -> Result<()> {
        let mut batch = RequestBatch::new();
        batch.add(io_type, channel, value, extra1, 0);
        self.run(batch).map(|_| ())
    }

    /// Single-request read: add, execute and drain one operation.
    ///
    /// # Errors
    ///
    /// [`UdError::MissingResult`] if the device produced no matching entry.
    fn e_get(&mut self, io_type: IoType, channel: i32, extra1: f64) -> Result<f64> {
        let mut batch = RequestBatch::new();
        batch.add(io_type, channel, 0.0, extra1, 0);
        let outcome = self.run(batch)?;
        outcome
            .find(io_type, channel)
            .map(|r| r.value)
            .ok_or(UdError::MissingResult { io_type, channel })
    }
}

impl<D: Driver> BatchExecutor for DeviceSession<D> {
    type Driver = D;

    fn execute(&mut self, batch: RequestBatch) -> Result<ResultCursor<'_, D>> {
        self.ensure_usable()?;

        let handle = self.handle();
        let mut batch_code = ErrorCode::NOERROR;

        for operation in &batch {
            let code = self.driver_mut().add_request(handle, operation);
            match self.check(code, "add request") {
                Ok(_) => {}
                Err(err) if err.is_recoverable() => {
                    warn!(
                        io_type = %operation.io_type,
                        channel = operation.channel,
                        "{}",
                        err
                    );
                    if batch_code == ErrorCode::NOERROR {
                        batch_code = code;
                    }
                }
                Err(err) => return Err(err),
            }
        }

        let code = self.driver_mut().go_one(handle);
        debug!(operations = batch.len(), code = code.value(), "Executed batch");
        match self.check(code, "execute") {
            Ok(_) => {}
            Err(err) if err.is_recoverable() => warn!("{}", err),
            Err(err) => return Err(err),
        }
        if code != ErrorCode::NOERROR {
            batch_code = code;
        }

        Ok(ResultCursor {
            session: self,
            state: DrainState::AwaitingFirst,
            batch_code,
            advisories: Vec::new(),
            consumed: 0,
        })
    }
}
