//! # ud_daq
//!
//! Client for data-acquisition devices driven through the LabJack UD
//! add/go/get protocol: operations are accumulated into a [`RequestBatch`],
//! submitted as one transaction, and their results are drained through a
//! cursor whose end is the driver's "no more data" sentinel, never a count.
//!
//! ## Crate Structure
//!
//! - **`request`**: typed I/O operations and the append-only [`RequestBatch`].
//! - **`executor`**: [`BatchExecutor`], the [`ResultCursor`] drain state machine
//!   and the single-request `e_put`/`e_get` helpers.
//! - **`error`**: the [`ErrorCode`] classifier and the [`UdError`] type.
//! - **`session`**: [`DeviceSession`], an owned handle closed on drop.
//! - **`driver`**: the [`Driver`] trait seam over the vendor API.
//! - **`ud`**: the `LabJackUD` binding (`hardware` feature for the real library).
//! - **`mock`**: a simulated U3 with error injection.
//! - **`sweep`**: the relay port sweep run by the binary.
//! - **`config`** / **`logging`**: Figment configuration and tracing setup.
//!
//! ```
//! use ud_daq::{BatchExecutor, DeviceSession, MockDriver, OpenTarget, RequestBatch};
//!
//! let mut session = DeviceSession::open(MockDriver::new(), OpenTarget::default())?;
//! let mut batch = RequestBatch::new();
//! batch.put_dac(0, 2.5).put_digital_bit(3, true).get_digital_bit(2);
//!
//! for record in session.execute(batch)? {
//!     let record = record?;
//!     println!("{} ch{} = {}", record.io_type, record.channel, record.value);
//! }
//! # Ok::<(), ud_daq::UdError>(())
//! ```

pub mod config;
pub mod driver;
pub mod error;
pub mod executor;
pub mod logging;
pub mod mock;
pub mod request;
pub mod session;
pub mod sweep;
pub mod ud;

pub use driver::{ConnectionType, DeviceType, Driver, Handle, OpenTarget, RawResult};
pub use error::{ErrorClass, ErrorCode, Result, UdError};
pub use executor::{BatchExecutor, DrainOutcome, DrainState, ResultCursor, ResultRecord};
pub use mock::{MockCall, MockDriver, MockScenario};
pub use request::{IoType, Operation, RequestBatch};
pub use session::DeviceSession;
pub use sweep::{CycleReport, PortSweep, SweepSummary};
pub use ud::LabJackUd;
