//! Station runner
//!
//! Runs one station role over a line-oriented link: frames are read from
//! stdin (or a replay file) as `PAYLOAD|RSSI` lines and transmitted frames
//! are written to stdout. The coordinator also writes position fixes to
//! stdout. Logs go to stderr; `RUST_LOG` overrides the default `info` level.
//!
//! ```bash
//! rssi-station --config deployment.json --role coordinator < frames.txt
//! rssi-station --config deployment.json --role relay --id STATION_B
//! rssi-station --config deployment.json --role beacon --sos
//! ```

use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;

use clap::{Parser, ValueEnum};
use env_logger::Env;
use log::info;

use rssi_trilateration::api::{OutputFormat, WriterSink};
use rssi_trilateration::core::StationId;
use rssi_trilateration::hardware::{CommError, CommResult, LineTransceiver, TransceiverConfig};
use rssi_trilateration::node::{self, Beacon, Coordinator, NodeError, NodeResult, Relay};
use rssi_trilateration::utils::{ConfigError, ConfigurationManager};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Role {
    /// Fuse readings into position fixes
    Coordinator,
    /// Report beacon signal strength to the coordinator
    Relay,
    /// Transmit PING/SOS beacons
    Beacon,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
enum Format {
    Json,
    Text,
    Csv,
}

impl From<Format> for OutputFormat {
    fn from(format: Format) -> Self {
        match format {
            Format::Json => OutputFormat::Json,
            Format::Text => OutputFormat::Text,
            Format::Csv => OutputFormat::Csv,
        }
    }
}

#[derive(Parser)]
#[command(name = "rssi-station")]
#[command(about = "RSSI trilateration station: coordinator, relay or beacon")]
struct Args {
    /// Deployment configuration (JSON)
    #[arg(short, long)]
    config: PathBuf,

    /// Station role
    #[arg(short, long, value_enum)]
    role: Role,

    /// Station label (relay) or device id (beacon, overrides the config)
    #[arg(long)]
    id: Option<String>,

    /// Replay frames from a file instead of stdin
    #[arg(short, long)]
    input: Option<PathBuf>,

    /// Coordinator output format
    #[arg(long, value_enum, default_value = "json")]
    format: Format,

    /// Start the beacon with distress latched
    #[arg(long)]
    sos: bool,
}

fn main() {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    if let Err(e) = run(&args) {
        log::error!("{}", e);
        std::process::exit(1);
    }
}

fn run(args: &Args) -> NodeResult<()> {
    let config = ConfigurationManager::from_file(&args.config)?;
    info!(
        "loaded {} stations from {}",
        config.stations().len(),
        args.config.display()
    );

    let input: Box<dyn BufRead + Send> = match &args.input {
        Some(path) => {
            let file = File::open(path).map_err(|e| ConfigError::IoError {
                message: format!("Failed to open replay file '{}': {}", path.display(), e),
            })?;
            Box::new(BufReader::new(file))
        }
        None => Box::new(BufReader::new(io::stdin())),
    };

    let link_config = TransceiverConfig::default();
    link_config.validate()?;

    // Never raised: a closed link ends the loop and Ctrl-C ends the process
    let stop = AtomicBool::new(false);

    match args.role {
        Role::Coordinator => {
            let id = config.coordinator()?.id;
            let link = LineTransceiver::new(id.as_str(), input, io::stdout(), link_config.clone());
            let sink = WriterSink::new(io::stdout(), args.format.into());

            let mut coordinator = Coordinator::from_config(&config, link, Box::new(sink))?;
            let result = node::run(&mut coordinator, &stop);

            let (stats, delivery) = coordinator.shutdown();
            info!("coordinator: {:?}", stats);
            info!("delivery: {:?}", delivery);
            link_closed_is_ok(result)
        }
        Role::Relay => {
            let id = args.id.as_deref().ok_or_else(|| ConfigError::MissingParameter {
                parameter: "--id".to_string(),
            })?;
            let id = StationId::new(id);
            let link = LineTransceiver::new(id.as_str(), input, io::stdout(), link_config.clone());

            let mut relay = Relay::from_config(&config, id, link)?;
            let result = node::run(&mut relay, &stop);
            info!("relay: {:?}", relay.stats());
            link_closed_is_ok(result)
        }
        Role::Beacon => {
            let mut beacon_config = config.beacon().clone();
            if let Some(id) = &args.id {
                beacon_config.device_id = id.clone();
            }
            let link = LineTransceiver::new(
                beacon_config.device_id.as_str(),
                input,
                io::stdout(),
                link_config,
            );

            let mut beacon = Beacon::from_config(&beacon_config, link);
            if args.sos {
                beacon.set_distress(true);
            }
            let result = node::run(&mut beacon, &stop);
            info!("beacon: {:?}", beacon.stats());
            link_closed_is_ok(result)
        }
    }
}

/// End of input is the normal way a replay finishes
fn link_closed_is_ok(result: CommResult<()>) -> NodeResult<()> {
    match result {
        Ok(()) | Err(CommError::ConnectionLost { .. }) => Ok(()),
        Err(e) => Err(NodeError::from(e)),
    }
}
