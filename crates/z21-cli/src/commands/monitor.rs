//! `z21 monitor`: print broadcast events as they arrive.

use owo_colors::OwoColorize;

use z21_core::Session;
use z21_proto::message::{BroadcastFlags, Event};

use crate::cli::{GlobalOpts, OutputFormat};
use crate::error::CliError;

use super::confirm;

pub async fn run(global: &GlobalOpts, session: &mut Session) -> Result<(), CliError> {
    // Subscribe broadly; the point of monitoring is to see everything the
    // station is willing to push.
    session
        .set_broadcast_flags(
            BroadcastFlags::default()
                .with(BroadcastFlags::TRACK_UPDATES)
                .with(BroadcastFlags::SYSTEM_UPDATES)
                .with(BroadcastFlags::CAN_DETECTOR_UPDATES),
        )
        .await?;

    confirm(global, "Watching broadcasts (Ctrl-C to stop)");

    while let Some(event) = session.events().next().await {
        print_event(global.output, &event)?;
    }
    Ok(())
}

fn print_event(format: OutputFormat, event: &Event) -> Result<(), CliError> {
    if format == OutputFormat::Json {
        let line = match event {
            Event::TrackPower(p) => serde_json::json!({"event": "track_power", "on": p.on}),
            Event::ShortCircuit => serde_json::json!({"event": "short_circuit"}),
            Event::Stopped => serde_json::json!({"event": "emergency_stop"}),
            Event::StatusChanged(s) => serde_json::json!({"event": "status", "raw": s.0}),
            Event::SystemState(s) => serde_json::json!({
                "event": "system_state",
                "main_current_ma": s.main_current_ma,
                "temperature_c": s.temperature_c,
                "supply_voltage_mv": s.supply_voltage_mv,
            }),
            Event::CanDetector(d) => serde_json::json!({
                "event": "can_detector",
                "network_id": format!("0x{:04X}", d.network_id),
                "address": d.address,
                "port": d.port,
                "kind": d.kind,
                "value1": d.value1,
                "value2": d.value2,
            }),
            other => serde_json::json!({"event": "other", "detail": format!("{other:?}")}),
        };
        println!("{line}");
        return Ok(());
    }

    match event {
        Event::TrackPower(p) => {
            println!(
                "{}  track power {}",
                "power".green().bold(),
                if p.on { "on" } else { "off" }
            );
        }
        Event::ShortCircuit => println!("{}  short circuit", "fault".red().bold()),
        Event::Stopped => println!("{}  emergency stop", "power".green().bold()),
        Event::StatusChanged(s) => println!("{}  track status 0x{:02X}", "state".cyan(), s.0),
        Event::SystemState(s) => println!(
            "{}  main {} mA, {} C, supply {} mV",
            "state".cyan(),
            s.main_current_ma,
            s.temperature_c,
            s.supply_voltage_mv
        ),
        Event::CanDetector(d) => println!(
            "{}  0x{:04X} addr {} port {} kind 0x{:02X} value 0x{:04X}",
            "can".yellow(),
            d.network_id,
            d.address,
            u16::from(d.port) + 1,
            d.kind,
            d.value1
        ),
        Event::Unknown { header, data } => {
            println!("{}  header 0x{header:04X} ({} bytes)", "other".dimmed(), data.len());
        }
        other => println!("{}  {other:?}", "other".dimmed()),
    }
    Ok(())
}
