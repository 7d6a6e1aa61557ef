//! Relay port sweep.
//!
//! Each cycle drives the configured DAC channels to a voltage proportional to
//! the port number, energizes the relay on digital line `port` (output-high)
//! and releases the previous relay by reading line `port - 1`, which turns the
//! line back into an input. The relays are open-collector loads, so an input
//! line leaves the relay off.
//!
//! The controller owns the policy for request-level errors and the pause
//! between cycles; the batching protocol itself lives in [`crate::executor`].

use std::future::Future;
use std::ops::RangeInclusive;
use std::time::Duration;

use tracing::{info, info_span, warn};

use crate::config::{OnRecoverable, SweepConfig};
use crate::error::{ErrorCode, Result};
use crate::executor::{BatchExecutor, DrainOutcome, ResultRecord};
use crate::request::{IoType, RequestBatch};

/// Outcome of one completed cycle.
#[derive(Debug, Clone, PartialEq)]
pub struct CycleReport {
    /// Port energized in this cycle
    pub port: u32,
    /// Voltage written to every DAC channel
    pub voltage: f64,
    /// Status returned by the execute call
    pub batch_code: ErrorCode,
    /// Every record drained from the cycle's batch
    pub records: Vec<ResultRecord>,
    /// Level read back from line `port - 1`, if the cycle read one
    pub readback: Option<f64>,
    /// Advisory codes observed while draining
    pub advisories: Vec<ErrorCode>,
}

/// Outcome of a sweep that did not hit a fatal error.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SweepSummary {
    /// Completed cycles in port order
    pub reports: Vec<CycleReport>,
    /// Ports whose cycle was abandoned on a request-level error
    pub skipped: Vec<u32>,
    /// The sweep was cancelled before the last port
    pub cancelled: bool,
    /// Port released after the sweep, if any
    pub released: Option<u32>,
}

/// Port sweep controller.
#[derive(Debug, Clone)]
pub struct PortSweep {
    config: SweepConfig,
}

impl PortSweep {
    /// Create a controller for `config`.
    pub fn new(config: SweepConfig) -> Self {
        Self { config }
    }

    /// Sweep parameters.
    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    /// Ports visited, in order.
    pub fn ports(&self) -> RangeInclusive<u32> {
        0..=self.config.max_port
    }

    /// DAC voltage for `port`: linear from 0 V at port 0 to full scale at
    /// `max_port`.
    pub fn voltage(&self, port: u32) -> f64 {
        if self.config.max_port == 0 {
            return 0.0;
        }
        f64::from(port) / f64::from(self.config.max_port) * self.config.full_scale_volts
    }

    /// Batch for one cycle.
    pub fn plan_cycle(&self, port: u32) -> RequestBatch {
        let voltage = self.voltage(port);
        let mut batch = RequestBatch::new();
        for &channel in &self.config.dac_channels {
            batch.put_dac(channel, voltage);
        }
        batch.put_digital_bit(port as i32, true);
        if port > 0 {
            batch.get_digital_bit(port as i32 - 1);
        }
        batch
    }

    /// Execute and drain one cycle.
    ///
    /// # Errors
    ///
    /// Propagates recoverable and fatal errors from the batch; applying the
    /// recoverable policy is left to [`PortSweep::run`].
    pub fn run_cycle<E: BatchExecutor>(&self, executor: &mut E, port: u32) -> Result<CycleReport> {
        let span = info_span!("cycle", port);
        let _enter = span.enter();

        let voltage = self.voltage(port);
        info!(voltage, "Port {} voltage {:.3} V", port, voltage);

        let DrainOutcome {
            batch_code,
            records,
            advisories,
        } = executor.run(self.plan_cycle(port))?;
        info!(code = batch_code.value(), records = records.len(), "Batch executed");

        let readback = port.checked_sub(1).and_then(|previous| {
            records
                .iter()
                .find(|r| r.io_type == IoType::GetDigitalBit && r.channel == previous as i32)
                .map(|r| r.value)
        });

        Ok(CycleReport {
            port,
            voltage,
            batch_code,
            records,
            readback,
            advisories,
        })
    }

    /// Turn the relay on `port` off by returning its line to input.
    pub fn release_relay<E: BatchExecutor>(
        &self,
        executor: &mut E,
        port: u32,
    ) -> Result<DrainOutcome> {
        let mut batch = RequestBatch::new();
        batch.get_digital_bit(port as i32);
        let outcome = executor.run(batch)?;
        info!(
            port,
            code = outcome.batch_code.value(),
            "Released last relay"
        );
        Ok(outcome)
    }

    /// Run every cycle, pausing `cycle_delay_ms` after each one.
    ///
    /// `shutdown` is polled only while pausing; when it completes the sweep
    /// stops before the next cycle. The last energized relay is released
    /// afterwards when `release_last_relay` is set, including on cancellation.
    ///
    /// # Errors
    ///
    /// Returns the first fatal error, or the first recoverable error when the
    /// policy is [`OnRecoverable::Abort`]. Both apply to the release step too;
    /// a skipped release leaves [`SweepSummary::released`] unset.
    pub async fn run<E, F>(&self, executor: &mut E, shutdown: F) -> Result<SweepSummary>
    where
        E: BatchExecutor,
        F: Future<Output = ()>,
    {
        let delay = Duration::from_millis(self.config.cycle_delay_ms);
        let mut summary = SweepSummary::default();
        let mut last_port = None;
        tokio::pin!(shutdown);

        for port in self.ports() {
            match self.run_cycle(executor, port) {
                Ok(report) => summary.reports.push(report),
                Err(err) if err.is_recoverable() => match self.config.on_recoverable {
                    OnRecoverable::Skip => {
                        warn!(port, "Skipping cycle: {}", err);
                        summary.skipped.push(port);
                    }
                    OnRecoverable::Abort => return Err(err),
                },
                Err(err) => return Err(err),
            }
            last_port = Some(port);

            tokio::select! {
                biased;
                () = &mut shutdown => {
                    if port < self.config.max_port {
                        info!(port, "Sweep cancelled");
                        summary.cancelled = true;
                    }
                    break;
                }
                () = tokio::time::sleep(delay) => {}
            }
        }

        if self.config.release_last_relay {
            if let Some(port) = last_port {
                match self.release_relay(executor, port) {
                    Ok(_) => summary.released = Some(port),
                    Err(err) if err.is_recoverable() => match self.config.on_recoverable {
                        OnRecoverable::Skip => warn!(port, "Relay left energized: {}", err),
                        OnRecoverable::Abort => return Err(err),
                    },
                    Err(err) => return Err(err),
                }
            }
        }

        info!(
            cycles = summary.reports.len(),
            skipped = summary.skipped.len(),
            cancelled = summary.cancelled,
            "Sweep finished"
        );
        Ok(summary)
    }
}
