//! Configuration loading using Figment.
//!
//! Configuration is layered, later sources overriding earlier ones:
//! 1. built-in defaults (a U3 on USB, a 16-port sweep)
//! 2. `config/ud_daq.toml` or the file passed with `--config`
//! 3. environment variables prefixed with `UD_DAQ_`, sections split by `__`
//!
//! ```no_run
//! use ud_daq::config::UdDaqConfig;
//!
//! // UD_DAQ_SWEEP__CYCLE_DELAY_MS=500 shortens the pause between cycles.
//! let config = UdDaqConfig::load()?;
//! config.validate()?;
//! println!("Sweeping ports 0..={}", config.sweep.max_port);
//! # Ok::<(), ud_daq::UdError>(())
//! ```

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::driver::{ConnectionType, DeviceType, OpenTarget};
use crate::error::{Result, UdError};

/// Default configuration file, relative to the working directory.
pub const DEFAULT_CONFIG_PATH: &str = "config/ud_daq.toml";

/// Environment variable prefix.
pub const ENV_PREFIX: &str = "UD_DAQ_";

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct UdDaqConfig {
    /// Which device to open
    pub device: DeviceConfig,
    /// Port sweep parameters
    pub sweep: SweepConfig,
    /// Log output
    pub logging: LoggingConfig,
}

/// Device selection
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Device family (u3, u6, ue9)
    pub device_type: DeviceType,
    /// Transport (usb, ethernet)
    pub connection: ConnectionType,
    /// Local ID, serial number or IP address
    pub address: String,
    /// Open the first device found instead of matching `address`
    pub first_found: bool,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        let target = OpenTarget::default();
        Self {
            device_type: target.device_type,
            connection: target.connection,
            address: target.address,
            first_found: target.first_found,
        }
    }
}

/// What a cycle does after a request-level error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OnRecoverable {
    /// Abandon the cycle and continue with the next one
    #[default]
    Skip,
    /// End the sweep
    Abort,
}

/// Port sweep parameters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SweepConfig {
    /// Last port of the sweep; ports run `0..=max_port`
    pub max_port: u32,
    /// DAC voltage at `max_port`
    pub full_scale_volts: f64,
    /// DAC channels driven each cycle
    pub dac_channels: Vec<i32>,
    /// Pause between cycles in milliseconds
    pub cycle_delay_ms: u64,
    /// Policy for request-level errors
    pub on_recoverable: OnRecoverable,
    /// Return the last port's line to input after the sweep
    pub release_last_relay: bool,
}

impl Default for SweepConfig {
    fn default() -> Self {
        Self {
            max_port: 15,
            full_scale_volts: 5.0,
            dac_channels: vec![0, 1],
            cycle_delay_ms: 2000,
            on_recoverable: OnRecoverable::Skip,
            release_last_relay: true,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Multi-line, colored output
    #[default]
    Pretty,
    /// Single-line output without colors
    Compact,
    /// One JSON object per event
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Logging level (trace, debug, info, warn, error)
    pub level: String,
    /// Output format
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Pretty,
        }
    }
}

impl UdDaqConfig {
    /// Load from [`DEFAULT_CONFIG_PATH`] and the environment.
    ///
    /// A missing file is not an error; defaults apply.
    pub fn load() -> Result<Self> {
        Self::load_from(DEFAULT_CONFIG_PATH)
    }

    /// Load from a specific file path and the environment.
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self> {
        Ok(Self::figment(path).extract()?)
    }

    /// The provider stack used by [`UdDaqConfig::load_from`].
    pub fn figment<P: AsRef<Path>>(path: P) -> Figment {
        Figment::from(Serialized::defaults(Self::default()))
            .merge(Toml::file(path.as_ref()))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<()> {
        self.check().map_err(UdError::InvalidConfig)
    }

    fn check(&self) -> std::result::Result<(), String> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.logging.level,
                valid_levels.join(", ")
            ));
        }

        if self.device.address.is_empty() && !self.device.first_found {
            return Err("device.address must be set when first_found is false".to_string());
        }

        if self.sweep.max_port == 0 {
            return Err("sweep.max_port must be at least 1".to_string());
        }

        if !self.sweep.full_scale_volts.is_finite() || self.sweep.full_scale_volts < 0.0 {
            return Err(format!(
                "Invalid sweep.full_scale_volts {}. Must be a non-negative number",
                self.sweep.full_scale_volts
            ));
        }

        if self.sweep.dac_channels.is_empty() {
            return Err("sweep.dac_channels must name at least one channel".to_string());
        }

        let mut seen = std::collections::HashSet::new();
        for channel in &self.sweep.dac_channels {
            if !seen.insert(channel) {
                return Err(format!("Duplicate DAC channel: {}", channel));
            }
        }

        Ok(())
    }

    /// Device to open.
    pub fn open_target(&self) -> OpenTarget {
        OpenTarget {
            device_type: self.device.device_type,
            connection: self.device.connection,
            address: self.device.address.clone(),
            first_found: self.device.first_found,
        }
    }
}
