use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;

use scs_rs::vendors::Quantity;
use scs_rs::{
    init_logger, log_info, MeterModel, ProbeType, ScsDevice, ScsDeviceHandle, SecurityCode,
    SerialConfig,
};

#[derive(Parser)]
#[command(name = "scs")]
#[command(about = "CLI tool for SCS legacy electricity meters")]
struct Cli {
    /// Serial port the probe is attached to
    #[arg(short, long)]
    port: String,
    #[arg(short, long, default_value = "9600")]
    baud: u32,
    #[arg(long, value_enum, default_value = "optical")]
    probe: ProbeArg,
    /// Meter family; detected from the identify code when omitted
    #[arg(short, long)]
    model: Option<MeterModel>,
    #[arg(short, long, default_value = "0")]
    security_code: String,
    /// Print results as JSON
    #[arg(long)]
    json: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum ProbeArg {
    Optical,
    Direct,
}

impl From<ProbeArg> for ProbeType {
    fn from(arg: ProbeArg) -> Self {
        match arg {
            ProbeArg::Optical => ProbeType::Optical,
            ProbeArg::Direct => ProbeType::Direct,
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Meter family, serial number and firmware revision
    Identify,
    /// Read the meter clock
    Clock,
    /// Move the meter clock
    AdjustClock {
        #[arg(long, allow_hyphen_values = true)]
        seconds: i64,
    },
    /// Read every item in the display lists
    Display,
    /// Read the TOU schedule
    Tou,
    /// Read energy and max demand of every quantity the meter has
    Quantity,
}

#[derive(Serialize)]
struct Identity {
    model: MeterModel,
    serial_number: String,
    firmware: String,
}

fn emit<T: Serialize + std::fmt::Debug>(json: bool, value: &T) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(value)?);
    } else {
        println!("{value:#?}");
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger();
    let cli = Cli::parse();

    let config = SerialConfig {
        baudrate: cli.baud,
        probe: cli.probe.into(),
        ..SerialConfig::default()
    };
    let code = SecurityCode::parse(&cli.security_code).context("invalid security code")?;
    let mut handle = ScsDeviceHandle::open(&cli.port, config)
        .await
        .with_context(|| format!("failed to open {}", cli.port))?;
    let identify = handle.log_on(&code).await.context("log on failed")?;

    let model = match cli.model {
        Some(model) => model,
        None => MeterModel::from_identify(&identify)
            .with_context(|| format!("unknown meter identify code '{identify}'"))?,
    };
    log_info(&format!("Logged on to {model}"));

    let mut device = ScsDevice::new(handle, model);
    let outcome = run(&mut device, cli.command, cli.json).await;

    let mut handle = device.into_transport();
    if let Err(e) = handle.log_off().await {
        log::warn!("Log off failed: {e}");
    }
    handle.close().await?;
    outcome
}

async fn run(device: &mut ScsDevice<ScsDeviceHandle>, command: Commands, json: bool) -> Result<()> {
    match command {
        Commands::Identify => {
            let identity = Identity {
                model: device.model(),
                serial_number: device.serial_number().await?,
                firmware: device.firmware_revision().await?,
            };
            if json {
                println!("{}", serde_json::to_string_pretty(&identity)?);
            } else {
                println!(
                    "{} serial {} firmware {}",
                    identity.model, identity.serial_number, identity.firmware
                );
            }
        }
        Commands::Clock => {
            let time = device.read_clock().await.context("reading clock")?;
            emit(json, &time)?;
        }
        Commands::AdjustClock { seconds } => {
            let result = device
                .adjust_clock(chrono::Duration::seconds(seconds))
                .await
                .context("adjusting clock")?;
            emit(json, &result)?;
        }
        Commands::Display => {
            let lists = device.read_display_lists().await.context("reading display table")?;
            let mut values = Vec::with_capacity(lists.len());
            for item in lists.iter() {
                match device.read_display_item(item).await {
                    Ok(value) => values.push(value),
                    Err(e) => log::warn!("Skipping {:?}: {e}", item.class),
                }
            }
            emit(json, &values)?;
        }
        Commands::Tou => {
            let schedule = device.read_tou_schedule().await.context("reading TOU schedule")?;
            emit(json, &schedule)?;
        }
        Commands::Quantity => {
            let mut readings = Vec::new();
            for quantity in Quantity::ALL {
                match device.read_quantity(quantity).await {
                    Ok(reading) => readings.push((quantity, reading)),
                    Err(e) if e.kind() == scs_rs::ErrorKind::UnsupportedByModel => {}
                    Err(e) => return Err(e.into()),
                }
            }
            emit(json, &readings)?;
        }
    }
    Ok(())
}
