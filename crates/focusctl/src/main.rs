//! focusctl - control client for focusd
//!
//! Sends one command over the daemon socket and prints the result, or
//! streams events with `watch`.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use focus_api::{
    Command, EngineStatus, Event, EventPayload, InstalledApp, ResponsePayload, ResponseResult,
};
use focus_ipc::IpcClient;
use focus_util::{AppId, DayKey, socket_path_without_env};
use std::path::PathBuf;

/// focusctl - Control the focusguard daemon
#[derive(Parser, Debug)]
#[command(name = "focusctl")]
#[command(about = "Control the focusguard daemon", long_about = None)]
struct Args {
    /// Socket path (or set FOCUSGUARD_SOCKET env var)
    #[arg(short, long, env = "FOCUSGUARD_SOCKET", default_value_os_t = socket_path_without_env())]
    socket: PathBuf,

    /// Print raw JSON instead of a summary
    #[arg(long)]
    json: bool,

    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand, Debug)]
enum Cmd {
    /// Show engine status, schedule and restricted apps
    Status,

    /// List installed apps and whether each is restricted
    Apps,

    /// Flip one hour of the weekly schedule
    ToggleSlot {
        /// Day name or abbreviation (monday, mon, ...)
        day: DayKey,

        /// Hour of day, 0-23
        #[arg(value_parser = clap::value_parser!(u8).range(0..24))]
        hour: u8,
    },

    /// Flip whether an app is restricted
    ToggleRestriction { app_id: String },

    /// Flip the manual debug override
    Debug,

    /// Re-run the overlay permission request flow
    RequestPermission,

    /// Stream daemon events until interrupted
    Watch,

    /// Check that the daemon is reachable
    Ping,
}

impl Cmd {
    fn to_command(&self) -> Command {
        match self {
            Cmd::Status => Command::GetState,
            Cmd::Apps => Command::ListApps,
            Cmd::ToggleSlot { day, hour } => Command::ToggleSlot {
                day: *day,
                hour: *hour,
            },
            Cmd::ToggleRestriction { app_id } => Command::ToggleRestriction {
                app_id: AppId::new(app_id.clone()),
            },
            Cmd::Debug => Command::ToggleDebug,
            Cmd::RequestPermission => Command::RequestPermission,
            Cmd::Watch => Command::SubscribeEvents,
            Cmd::Ping => Command::Ping,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let mut client = IpcClient::connect(&args.socket)
        .await
        .with_context(|| format!("Failed to connect to focusd at {:?}", args.socket))?;

    if matches!(args.command, Cmd::Watch) {
        return watch(client, args.json).await;
    }

    let response = client
        .send(args.command.to_command())
        .await
        .context("Request failed")?;

    let payload = match response.result {
        ResponseResult::Ok(payload) => payload,
        ResponseResult::Err(e) => bail!("focusd returned {:?}: {}", e.code, e.message),
    };

    if args.json {
        println!("{}", serde_json::to_string_pretty(&payload)?);
        return Ok(());
    }

    match payload {
        ResponsePayload::State(status) => print_status(&status),
        ResponsePayload::Apps { apps } => {
            // Restriction marks come from the planner
            let status = match client.send(Command::GetState).await?.result {
                ResponseResult::Ok(ResponsePayload::State(status)) => Some(status),
                _ => None,
            };
            print_apps(&apps, status.as_ref());
        }
        ResponsePayload::SlotToggled {
            day,
            hour,
            scheduled,
        } => println!(
            "{} {:02}:00 {}",
            day,
            hour,
            if scheduled { "scheduled" } else { "cleared" }
        ),
        ResponsePayload::RestrictionToggled { app_id, restricted } => println!(
            "{} {}",
            app_id,
            if restricted { "restricted" } else { "allowed" }
        ),
        ResponsePayload::DebugToggled { enabled } => {
            println!("debug override {}", on_off(enabled))
        }
        ResponsePayload::PermissionStatus { granted } => {
            if granted {
                println!("overlay permission granted");
            } else {
                println!("overlay permission not granted; grant flow started");
            }
        }
        ResponsePayload::Subscribed => println!("subscribed"),
        ResponsePayload::Pong => println!("pong"),
    }
    Ok(())
}

async fn watch(client: IpcClient, json: bool) -> Result<()> {
    let mut events = client.subscribe().await.context("Subscribe failed")?;
    loop {
        let event = events.next().await.context("Event stream ended")?;
        if json {
            println!("{}", serde_json::to_string(&event)?);
        } else {
            println!("{}", describe_event(&event));
        }
    }
}

fn on_off(value: bool) -> &'static str {
    if value { "on" } else { "off" }
}

fn describe_event(event: &Event) -> String {
    let time = event.timestamp.format("%H:%M:%S");
    let text = match &event.payload {
        EventPayload::SessionChanged { active } => {
            format!("session {}", if *active { "started" } else { "ended" })
        }
        EventPayload::OverlayChanged { visibility } => {
            format!("overlay {}", if visibility.is_shown() { "shown" } else { "hidden" })
        }
        EventPayload::FocusMinute { day, minutes } => {
            format!("focus minutes on {}: {}", day, minutes)
        }
        EventPayload::DebugOverrideChanged { enabled } => {
            format!("debug override {}", on_off(*enabled))
        }
        EventPayload::PermissionChanged { granted } => {
            format!("overlay permission {}", if *granted { "granted" } else { "revoked" })
        }
        EventPayload::TerminationSweep { attempted, failed } => {
            format!("swept {} restricted apps ({} failed)", attempted, failed)
        }
        EventPayload::PlannerChanged => "planner changed".to_string(),
    };
    format!("[{}] {}", time, text)
}

fn print_status(status: &EngineStatus) {
    println!("engine:       {}", if status.running { "running" } else { "stopped" });
    println!("session:      {}", if status.session_active { "active" } else { "inactive" });
    println!("debug:        {}", on_off(status.debug_override));
    println!(
        "overlay:      {}",
        if status.overlay.is_shown() { "shown" } else { "hidden" }
    );
    println!(
        "permission:   {}",
        if status.permission_granted { "granted" } else { "missing" }
    );
    println!(
        "focus today:  {}/{} min",
        status.focus_minutes, status.daily_target
    );

    println!();
    println!("schedule:");
    for day in DayKey::ALL {
        let hours = status.planner.schedule.hours(day);
        let listed = if hours.is_empty() {
            "-".to_string()
        } else {
            hours
                .iter()
                .map(|h| format!("{:02}", h))
                .collect::<Vec<_>>()
                .join(" ")
        };
        println!("  {:<10} {}", day.name(), listed);
    }

    println!();
    println!("restricted ({}):", status.planner.restricted.len());
    for id in status.planner.restricted.iter() {
        println!("  {}", id);
    }
}

fn print_apps(apps: &[InstalledApp], status: Option<&EngineStatus>) {
    for app in apps {
        let restricted = status.is_some_and(|s| s.planner.restricted.contains(&app.id));
        println!(
            "{} {:<30} {}",
            if restricted { "x" } else { " " },
            app.display_name,
            app.id
        );
    }
}
