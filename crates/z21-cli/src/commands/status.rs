//! `z21 status`: track state and system telemetry.

use serde::Serialize;
use tabled::Tabled;

use z21_core::Session;
use z21_proto::message::{GetStatus, GetSystemState, TrackStatus};

use crate::cli::{GlobalOpts, StatusCommand};
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct TrackReport {
    power: &'static str,
    emergency_stop: &'static str,
    short_circuit: &'static str,
    programming_mode: &'static str,
}

impl From<TrackStatus> for TrackReport {
    fn from(status: TrackStatus) -> Self {
        Self {
            power: if status.has(TrackStatus::TRACK_VOLTAGE_OFF) {
                "off"
            } else {
                "on"
            },
            emergency_stop: output::yes_no(status.has(TrackStatus::EMERGENCY_STOP)),
            short_circuit: output::yes_no(status.has(TrackStatus::SHORT_CIRCUIT)),
            programming_mode: output::yes_no(status.has(TrackStatus::PROGRAMMING_MODE)),
        }
    }
}

#[derive(Tabled, Serialize)]
struct TelemetryRow {
    #[tabled(rename = "METRIC")]
    metric: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

pub async fn run(
    command: Option<StatusCommand>,
    global: &GlobalOpts,
    session: &mut Session,
) -> Result<(), CliError> {
    let (track, system) = match command {
        None => (true, true),
        Some(StatusCommand::Track) => (true, false),
        Some(StatusCommand::System) => (false, true),
    };

    if track {
        let status = session.request(&GetStatus).await?;
        output::print_object(global.output, &TrackReport::from(status))?;
    }

    if system {
        let state = session.request(&GetSystemState).await?;
        let rows = vec![
            TelemetryRow {
                metric: "main current",
                value: format!("{} mA", state.main_current_ma),
            },
            TelemetryRow {
                metric: "filtered main current",
                value: format!("{} mA", state.filtered_main_current_ma),
            },
            TelemetryRow {
                metric: "prog current",
                value: format!("{} mA", state.prog_current_ma),
            },
            TelemetryRow {
                metric: "temperature",
                value: format!("{} C", state.temperature_c),
            },
            TelemetryRow {
                metric: "supply voltage",
                value: format!("{} mV", state.supply_voltage_mv),
            },
            TelemetryRow {
                metric: "vcc voltage",
                value: format!("{} mV", state.vcc_voltage_mv),
            },
        ];
        if track && global.output == crate::cli::OutputFormat::Table {
            println!();
        }
        output::print_rows(global.output, &rows)?;
    }

    Ok(())
}
