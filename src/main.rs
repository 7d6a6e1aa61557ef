//! CLI entry point for ud_daq
//!
//! Runs the relay port sweep against a LabJack device:
//!
//! ```bash
//! ud_daq                          # hardware, config/ud_daq.toml
//! ud_daq --config bench.toml      # explicit configuration file
//! ud_daq --simulate               # simulated U3, no hardware needed
//! ud_daq --dump-config            # print the effective configuration
//! ```
//!
//! Exits non-zero after a fatal driver error. The device session is closed
//! before the process exits on every path.

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{bail, Context, Result};
use clap::Parser;
use tracing::{error, info};

use ud_daq::config::{UdDaqConfig, DEFAULT_CONFIG_PATH};
use ud_daq::{logging, DeviceSession, Driver, LabJackUd, MockDriver, PortSweep};

#[derive(Parser)]
#[command(name = "ud_daq")]
#[command(about = "Relay port sweep over the LabJack UD batch protocol", long_about = None)]
struct Cli {
    /// Configuration file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Use the simulated U3 instead of the LabJackUD library
    #[arg(long)]
    simulate: bool,

    /// Print the effective configuration as TOML and exit
    #[arg(long)]
    dump_config: bool,

    /// Override the pause between cycles, in milliseconds
    #[arg(long)]
    cycle_delay_ms: Option<u64>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    match run(Cli::parse()).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            error!("{:#}", err);
            eprintln!("Error: {:#}", err);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;

    if cli.dump_config {
        print!("{}", toml::to_string_pretty(&config)?);
        return Ok(());
    }

    logging::init_from_config(&config).map_err(anyhow::Error::msg)?;

    if cli.simulate {
        sweep(MockDriver::new(), &config).await
    } else {
        sweep(LabJackUd::new(), &config).await
    }
}

fn load_config(cli: &Cli) -> Result<UdDaqConfig> {
    let path = match &cli.config {
        Some(path) => {
            if !path.exists() {
                bail!("Configuration file {} not found", path.display());
            }
            path.clone()
        }
        None => PathBuf::from(DEFAULT_CONFIG_PATH),
    };

    let mut config = UdDaqConfig::load_from(&path)
        .with_context(|| format!("Failed to load {}", path.display()))?;
    if let Some(delay) = cli.cycle_delay_ms {
        config.sweep.cycle_delay_ms = delay;
    }
    config.validate()?;
    Ok(config)
}

async fn sweep<D: Driver>(driver: D, config: &UdDaqConfig) -> Result<()> {
    println!("UD Driver Version = {:.3}", driver.driver_version());

    let mut session = DeviceSession::open(driver, config.open_target())?;
    let controller = PortSweep::new(config.sweep.clone());

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            // No signal handler available; never cancel.
            std::future::pending::<()>().await;
        }
    };

    let outcome = controller.run(&mut session, shutdown).await;
    // Close the device before reporting, including after a fatal error.
    drop(session);
    let summary = outcome?;

    info!(
        cycles = summary.reports.len(),
        skipped = ?summary.skipped,
        cancelled = summary.cancelled,
        "Done"
    );
    Ok(())
}
