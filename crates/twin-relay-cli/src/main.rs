//! # Twin Relay CLI
//!
//! Offline debugging for the translation rule: parse a message file and
//! print the patch list it would produce, without touching the store.

use anyhow::{Context, Result};
use std::env;
use std::fs;
use twin_relay_core::{translate, DeviceMessage, RuleSet, Translation};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        print_help();
        return Ok(());
    }

    match args[1].as_str() {
        "translate" => {
            if args.len() < 4 {
                eprintln!("Usage: twin-relay translate <telemetry|properties|envelope> <file>");
                std::process::exit(1);
            }
            let shape = &args[2];
            let raw = fs::read(&args[3]).with_context(|| format!("Failed to read {}", args[3]))?;

            let msg = match shape.as_str() {
                "telemetry" => DeviceMessage::from_telemetry_json(&raw),
                "properties" => DeviceMessage::from_properties_json(&raw),
                "envelope" => DeviceMessage::from_hub_envelope(&raw),
                other => {
                    eprintln!("Unknown shape: {other}");
                    std::process::exit(1);
                }
            }
            .context("Failed to parse message")?;

            match translate(&msg, &RuleSet::standard()).context("Translation failed")? {
                Translation::Patches(patches) => {
                    println!("{}", serde_json::to_string_pretty(&patches)?);
                }
                Translation::UnknownDeviceType => {
                    println!(
                        "no rule for device type {:?}",
                        msg.device_type.unwrap_or_default()
                    );
                }
            }
        }
        "help" | "--help" | "-h" => {
            print_help();
        }
        cmd => {
            eprintln!("Unknown command: {cmd}");
            print_help();
            std::process::exit(1);
        }
    }

    Ok(())
}

fn print_help() {
    println!(
        r#"Twin Relay CLI

USAGE:
    twin-relay <COMMAND> [OPTIONS]

COMMANDS:
    translate <shape> <file>  Parse a message file (shape: telemetry,
                              properties, or envelope) and print the twin
                              patches it would produce
    help                      Show this help message

EXAMPLES:
    twin-relay translate telemetry sensor1.json
    twin-relay translate envelope hub-event.json
"#
    );
}
