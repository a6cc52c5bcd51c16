use clap::{Parser, Subcommand};
use log::{error, info, warn};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serial_ack::hardware::{find_usb_port, list_ports};
use serial_ack::protocol::{open_receiver, SendResult};
use serial_ack::{LinkConfig, ReceiverMode, ReliableSender, SendError, SerialOpener};

/// Serial acknowledgment link - send lines until they are echoed back
#[derive(Parser, Debug)]
#[command(name = "serial-ack", version, long_about = None)]
struct Args {
    /// JSON link configuration file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true, default_value_t = false)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args, Debug)]
struct LinkArgs {
    /// Serial port, e.g. /dev/ttyUSB0 or COM11
    #[arg(short, long)]
    port: Option<String>,

    /// Baud rate (both ends must match)
    #[arg(short, long)]
    baud: Option<u32>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Send a payload and wait for it to be echoed back
    Send {
        payload: String,

        #[command(flatten)]
        link: LinkArgs,

        /// Maximum round trips before giving up
        #[arg(short, long)]
        attempts: Option<u32>,
    },
    /// Echo every received line back to the sender
    Echo {
        #[command(flatten)]
        link: LinkArgs,
    },
    /// Print received lines without answering
    Monitor {
        #[command(flatten)]
        link: LinkArgs,
    },
    /// List serial ports present on this machine
    Ports {
        /// Only ports with this USB vendor id (hex, e.g. 0403)
        #[arg(long, value_parser = parse_hex_u16)]
        vid: Option<u16>,

        /// Only ports with this USB product id (hex, e.g. 6014)
        #[arg(long, value_parser = parse_hex_u16, requires = "vid")]
        pid: Option<u16>,

        /// Print only the name of the first matching port
        #[arg(long, default_value_t = false, requires = "vid")]
        first: bool,

        /// Print as JSON
        #[arg(long, default_value_t = false)]
        json: bool,
    },
}

fn parse_hex_u16(s: &str) -> Result<u16, String> {
    let digits = s.trim_start_matches("0x").trim_start_matches("0X");
    u16::from_str_radix(digits, 16).map_err(|e| format!("invalid hex id '{}': {}", s, e))
}

fn load_config(path: Option<&PathBuf>, link: &LinkArgs) -> CliResult<LinkConfig> {
    let mut config = match path {
        Some(path) => {
            info!("Loading link configuration from {}", path.display());
            LinkConfig::load_from_file(path)?
        }
        None => LinkConfig::default(),
    };

    if let Some(port) = &link.port {
        config.port = port.clone();
    }
    if let Some(baud) = link.baud {
        config.baud_rate = baud;
    }
    Ok(config)
}

fn check_config(config: &LinkConfig) -> CliResult<()> {
    let validation = config.validate();
    for warning in &validation.warnings {
        warn!("{}", warning);
    }
    match validation.errors.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

/// Payload acknowledged
const EXIT_DELIVERED: u8 = 0;
/// Every attempt came back mismatched or empty
const EXIT_EXHAUSTED: u8 = 1;
/// Port unusable, bad configuration or bad input
const EXIT_INVALID: u8 = 2;

type CliResult<T> = Result<T, Box<dyn std::error::Error>>;

fn send_exit_code(result: &SendResult) -> u8 {
    match result {
        Ok(_) => EXIT_DELIVERED,
        Err(SendError::RetriesExhausted { .. }) => EXIT_EXHAUSTED,
        Err(_) => EXIT_INVALID,
    }
}

fn run_send(config: &LinkConfig, payload: &str) -> u8 {
    let mut sender = ReliableSender::new(SerialOpener);
    let result = sender.send_with(config, payload);
    match &result {
        Ok(delivery) => println!("{}", delivery),
        Err(e @ SendError::RetriesExhausted { .. }) => println!("{}", e),
        Err(e) => eprintln!("{}", e),
    }
    send_exit_code(&result)
}

fn run_receiver(config: &LinkConfig, mode: ReceiverMode) -> CliResult<u8> {
    let stop = Arc::new(AtomicBool::new(false));
    let s = stop.clone();
    ctrlc::set_handler(move || {
        info!("Shutdown signal received...");
        s.store(true, Ordering::SeqCst);
    })?;

    let mut receiver = open_receiver(&mut SerialOpener, &config.transport(), mode)?;
    match receiver.run(&stop) {
        Ok(stats) => {
            info!(
                "Stopped: {} line(s) received, {} echoed",
                stats.received, stats.echoed
            );
            Ok(EXIT_DELIVERED)
        }
        Err(e) => {
            error!("Receiver failed: {}", e);
            Ok(EXIT_INVALID)
        }
    }
}

fn run_ports(vid: Option<u16>, pid: Option<u16>, first: bool, json: bool) -> CliResult<u8> {
    if first {
        let vid = vid.ok_or("--first needs --vid")?;
        return match find_usb_port(vid, pid)? {
            Some(name) => {
                println!("{}", name);
                Ok(EXIT_DELIVERED)
            }
            None => {
                eprintln!("No port with USB id {:04x}", vid);
                Ok(EXIT_INVALID)
            }
        };
    }

    let mut ports = list_ports()?;
    if let Some(vid) = vid {
        ports.retain(|port| port.is_usb_device(vid, pid));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&ports)?);
    } else if ports.is_empty() {
        println!("No serial ports found");
    } else {
        for port in &ports {
            println!("{}", port);
        }
    }
    Ok(EXIT_DELIVERED)
}

fn dispatch(args: &Args) -> CliResult<u8> {
    match &args.command {
        Command::Send { payload, link, attempts } => {
            let mut config = load_config(args.config.as_ref(), link)?;
            if let Some(attempts) = attempts {
                config.max_attempts = *attempts;
            }
            check_config(&config)?;
            Ok(run_send(&config, payload))
        }
        Command::Echo { link } => {
            let config = load_config(args.config.as_ref(), link)?;
            check_config(&config)?;
            run_receiver(&config, ReceiverMode::Echo)
        }
        Command::Monitor { link } => {
            let config = load_config(args.config.as_ref(), link)?;
            check_config(&config)?;
            run_receiver(&config, ReceiverMode::Monitor)
        }
        Command::Ports { vid, pid, first, json } => run_ports(*vid, *pid, *first, *json),
    }
}

/// Run a parsed command line and return its exit code
fn run(args: &Args) -> u8 {
    match dispatch(args) {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}", e);
            EXIT_INVALID
        }
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_default_env()
        .filter_level(if args.verbose {
            log::LevelFilter::Debug
        } else {
            log::LevelFilter::Info
        })
        .init();

    ExitCode::from(run(&args))
}
