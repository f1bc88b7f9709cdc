//! Config validation CLI tool
//!
//! Validates a focusd configuration file and reports any errors.

use focus_config::{ConfigError, CURRENT_CONFIG_VERSION};
use focus_util::{DayKey, default_config_path};
use std::path::PathBuf;
use std::process::ExitCode;

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let config_path = match args.get(1) {
        Some(path) => PathBuf::from(path),
        None => {
            let default_path = default_config_path();
            eprintln!("Usage: validate-config [config-file]");
            eprintln!();
            eprintln!("Validates a focusd configuration file.");
            eprintln!();
            eprintln!("If no path is provided, uses: {}", default_path.display());
            return ExitCode::from(2);
        }
    };

    if !config_path.exists() {
        eprintln!("Error: Configuration file not found: {}", config_path.display());
        return ExitCode::from(1);
    }

    match focus_config::load_config(&config_path) {
        Ok(policy) => {
            println!("✓ Configuration is valid");
            println!();
            println!("Summary:");
            println!("  Config version: {}", CURRENT_CONFIG_VERSION);
            println!(
                "  Enforcement every {}s, overlay every {}s, collaborator timeout {}ms",
                policy.engine.enforcement_interval.as_secs(),
                policy.engine.overlay_interval.as_secs(),
                policy.engine.collaborator_timeout.as_millis()
            );
            println!("  Daily target: {} minutes", policy.engine.daily_target);
            println!("  Allow-list: {} apps", policy.restrictions.allow_list.len());
            println!("  Overlay command: {}", policy.host.overlay_command.join(" "));

            if !policy.initial_schedule.is_empty() {
                println!();
                println!("Initial schedule:");
                for day in DayKey::ALL {
                    let hours = policy.initial_schedule.hours(day);
                    if hours.is_empty() {
                        continue;
                    }
                    let hours: Vec<String> =
                        hours.iter().map(|h| format!("{:02}:00", h)).collect();
                    println!("  - {}: {}", day, hours.join(", "));
                }
            }

            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("✗ Configuration validation failed");
            eprintln!();
            match &e {
                ConfigError::ReadError(io_err) => {
                    eprintln!("Failed to read file: {}", io_err);
                }
                ConfigError::ParseError(parse_err) => {
                    eprintln!("TOML parse error:");
                    eprintln!("  {}", parse_err);
                }
                ConfigError::ValidationFailed { errors } => {
                    eprintln!("Validation errors ({}):", errors.len());
                    for err in errors {
                        eprintln!("  - {}", err);
                    }
                }
                ConfigError::UnsupportedVersion(ver) => {
                    eprintln!(
                        "Unsupported config version: {} (expected {})",
                        ver, CURRENT_CONFIG_VERSION
                    );
                }
            }
            ExitCode::from(1)
        }
    }
}
