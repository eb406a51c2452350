//! `z21 can`: CAN-bus detector discovery and occupancy.

use serde::Serialize;
use tabled::Tabled;

use z21_core::{format_port_ranges, Detector, Session};
use z21_proto::message::{occupancy, BroadcastFlags};

use crate::cli::{CanCommand, GlobalOpts};
use crate::error::CliError;
use crate::output;

#[derive(Tabled, Serialize)]
struct DeviceRow {
    #[tabled(rename = "NETID")]
    netid: String,
    #[tabled(rename = "ADDRESS")]
    address: u16,
    #[tabled(rename = "PORTS")]
    ports: String,
}

#[derive(Tabled, Serialize)]
struct PortRow {
    #[tabled(rename = "PORT")]
    port: u16,
    #[tabled(rename = "STATUS")]
    status: String,
}

/// Parse a network id, accepting `0xD123` hex or plain decimal.
fn parse_network_id(raw: &str) -> Result<u16, CliError> {
    let parsed = match raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        Some(hex) => u16::from_str_radix(hex, 16),
        None => raw.parse(),
    };
    parsed.map_err(|_| CliError::Validation {
        field: "netid".into(),
        reason: format!("'{raw}' is not a network id (expected e.g. 0xD123)"),
    })
}

fn status_label(value: u16) -> String {
    match value {
        occupancy::FREE => "free".to_string(),
        occupancy::FREE_NO_VOLTAGE => "free (no voltage)".to_string(),
        occupancy::BUSY => "busy".to_string(),
        occupancy::BUSY_NO_VOLTAGE => "busy (no voltage)".to_string(),
        other => format!("0x{other:04X}"),
    }
}

fn device_row(device: &Detector) -> DeviceRow {
    let indices: Vec<u8> = device.ports.iter().map(|p| p.index).collect();
    DeviceRow {
        netid: format!("0x{:04X}", device.network_id),
        address: device.address,
        ports: format_port_ranges(&indices),
    }
}

pub async fn run(
    command: CanCommand,
    global: &GlobalOpts,
    session: &mut Session,
) -> Result<(), CliError> {
    // Detector reports only flow to subscribed clients.
    session
        .set_broadcast_flags(
            BroadcastFlags::default().with(BroadcastFlags::CAN_DETECTOR_UPDATES),
        )
        .await?;

    match command {
        CanCommand::Discover { timeout } => {
            let devices = session.discover_all(timeout).await?;
            let rows: Vec<DeviceRow> = devices.values().map(device_row).collect();
            output::print_rows(global.output, &rows)
        }
        CanCommand::Info { netid, timeout } => {
            let network_id = parse_network_id(&netid)?;
            let device = session.discover_one(network_id, timeout).await?;
            let rows: Vec<PortRow> = device
                .ports
                .iter()
                .map(|p| PortRow {
                    port: u16::from(p.index) + 1,
                    status: status_label(p.status),
                })
                .collect();
            output::print_rows(global.output, &rows)
        }
    }
}
