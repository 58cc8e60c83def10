//! DrinkMaster Dispense Test Tool
//!
//! Builds a frame from recipe and inventory JSON files and, unless told
//! otherwise, sends it to the controller and waits for `received`/`done`.
//!
//! Usage:
//!   cargo run --example dispense_test -- [OPTIONS] RECIPE.json INVENTORY.json
//!
//! Options:
//!   --port PORT       Serial port (default: $UART_PORT)
//!   --baud RATE       Baud rate (default: $UART_BAUD or 115200)
//!   --timeout MS      Overall handshake deadline in ms (default: $UART_DONE_TIMEOUT or 60000)
//!   --dry-run         Only print the frame
//!   --list            List serial ports and exit
//!
//! Set RUST_LOG=drinkmaster_core=debug to see handshake transitions.

use anyhow::{bail, Context, Result};
use drinkmaster_core::prelude::*;
use drinkmaster_core::protocol::list_ports;
use std::fs;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args: Vec<String> = std::env::args().collect();

    let mut config = TransportConfig::from_env().context("reading UART_* environment")?;
    let mut dry_run = false;
    let mut files = Vec::new();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--port" | "-p" => {
                i += 1;
                if i < args.len() {
                    config.port_name = Some(args[i].clone());
                }
            }
            "--baud" | "-b" => {
                i += 1;
                if i < args.len() {
                    config.baud_rate = args[i].parse().context("parsing --baud")?;
                }
            }
            "--timeout" | "-t" => {
                i += 1;
                if i < args.len() {
                    config.handshake_timeout_ms = args[i].parse().context("parsing --timeout")?;
                }
            }
            "--dry-run" | "-n" => {
                dry_run = true;
            }
            "--list" | "-l" => {
                for port in list_ports() {
                    println!(
                        "{:<20} {}",
                        port.name,
                        port.product.as_deref().unwrap_or("")
                    );
                }
                return Ok(());
            }
            "--help" | "-h" => {
                print_help();
                return Ok(());
            }
            arg if !arg.starts_with('-') => {
                files.push(arg.to_string());
            }
            other => {
                eprintln!("Unknown option: {}", other);
            }
        }
        i += 1;
    }

    let [recipe_path, inventory_path] = files.as_slice() else {
        print_help();
        bail!("expected RECIPE.json and INVENTORY.json");
    };

    let recipe: Vec<RecipeLine> = serde_json::from_str(
        &fs::read_to_string(recipe_path).with_context(|| format!("reading {}", recipe_path))?,
    )
    .with_context(|| format!("parsing {}", recipe_path))?;
    let inventory: Inventory = serde_json::from_str(
        &fs::read_to_string(inventory_path)
            .with_context(|| format!("reading {}", inventory_path))?,
    )
    .with_context(|| format!("parsing {}", inventory_path))?;

    if let Err(problems) = inventory.check() {
        for problem in problems {
            eprintln!("⚠ inventory: {}", problem);
        }
    }

    let plan = build_frame(&recipe, &inventory);
    println!("{}", serde_json::to_string(&plan.frame)?);
    for ingredient in &plan.resolution.unresolved {
        eprintln!("⚠ not stocked, left out: {}", ingredient);
    }

    if dry_run {
        return Ok(());
    }

    match send_frame(&config, &plan.frame, None) {
        Ok(()) => {
            println!("✓ Dispense confirmed");
            Ok(())
        }
        Err(e) => {
            eprintln!("❌ Dispense failed ({:?}): {}", e.kind(), e);
            Err(e.into())
        }
    }
}

fn print_help() {
    println!("DrinkMaster Dispense Test Tool");
    println!();
    println!("Usage: dispense_test [OPTIONS] RECIPE.json INVENTORY.json");
    println!();
    println!("Options:");
    println!("  --port, -p PORT     Serial port (default: $UART_PORT)");
    println!("  --baud, -b RATE     Baud rate (default: 115200)");
    println!("  --timeout, -t MS    Overall handshake deadline in ms");
    println!("  --dry-run, -n       Only print the frame");
    println!("  --list, -l          List serial ports");
    println!("  --help, -h          Show this help");
}
