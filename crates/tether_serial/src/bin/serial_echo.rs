//! # Serial Echo
//!
//! Brings up the bridge on the loopback driver, writes each message, and
//! prints what comes back through the listeners.
//!
//! ## Usage
//!
//! ```bash
//! RUST_LOG=debug serial_echo --device loop0 --baud 9600 hello world
//! serial_echo --config serial.toml ping
//! ```

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{bounded, RecvTimeoutError};
use tether_core::BridgeResult;
use tether_serial::{LoopbackInterface, SerialConfig, SerialEvent, SerialManager};
use tracing_subscriber::EnvFilter;

/// How long to wait for each echo before giving up.
const ECHO_TIMEOUT: Duration = Duration::from_secs(2);

fn print_usage() {
    println!("Usage: serial_echo [OPTIONS] [MESSAGE]...");
    println!();
    println!("Options:");
    println!("  -c, --config <PATH>     TOML config file");
    println!("  -d, --device <DEVICE>   Device to open (default: from config)");
    println!("  -b, --baud <BAUD>       Line speed (default: from config)");
    println!("  -h, --help              Show this help");
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Simple parsing, no external deps
    let args: Vec<String> = std::env::args().collect();
    let mut config_path: Option<String> = None;
    let mut device: Option<String> = None;
    let mut baud: Option<u32> = None;
    let mut messages: Vec<String> = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" | "-c" => {
                if i + 1 < args.len() {
                    config_path = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--device" | "-d" => {
                if i + 1 < args.len() {
                    device = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--baud" | "-b" => {
                if i + 1 < args.len() {
                    baud = args[i + 1].parse().ok();
                    i += 1;
                }
            }
            "--help" | "-h" => {
                print_usage();
                return ExitCode::SUCCESS;
            }
            other => messages.push(other.to_string()),
        }
        i += 1;
    }
    if messages.is_empty() {
        messages.push("PING".to_string());
    }

    let mut config = match config_path {
        Some(path) => match SerialConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("error: {e}");
                return ExitCode::FAILURE;
            }
        },
        None => SerialConfig::default(),
    };
    if let Some(device) = device {
        config.link.device = device;
    }
    if let Some(baud) = baud {
        config.link.baud = baud;
    }

    match run(config, &messages) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn run(config: SerialConfig, messages: &[String]) -> BridgeResult<()> {
    let (echo_tx, echo_rx) = bounded::<String>(messages.len());
    let mut manager = SerialManager::new(config, LoopbackInterface::discovery())?;

    if !manager.is_supported() {
        println!("No serial hardware on this platform");
        return Ok(());
    }

    manager.add_status_listener(Arc::new(|event: SerialEvent| -> BridgeResult<()> {
        println!("[status] {event:?}");
        Ok(())
    }));
    manager.add_message_listener(Arc::new(move |message: &str| -> BridgeResult<()> {
        // Full channel only means the sender is done waiting.
        let _ = echo_tx.try_send(message.to_string());
        Ok(())
    }));

    manager.begin_configured()?;
    println!(
        "Opened {} at {} baud",
        manager.config().link.device,
        manager.config().link.baud
    );

    for message in messages {
        manager.print(message)?;
        match echo_rx.recv_timeout(ECHO_TIMEOUT) {
            Ok(echo) => println!("{message} -> {echo}"),
            Err(RecvTimeoutError::Timeout) => println!("{message} -> (no echo)"),
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }

    if let Some(stats) = manager.stats() {
        println!(
            "Reports: {} status, {} message, {} superseded, {} truncated",
            stats.status_reports, stats.message_reports, stats.superseded, stats.truncated_messages
        );
    }

    manager.end()
}
