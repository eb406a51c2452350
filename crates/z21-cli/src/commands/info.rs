//! `z21 info`: identity and version queries.

use serde::Serialize;
use tabled::Tabled;

use z21_core::Session;
use z21_proto::message::{GetCode, GetHwInfo, GetSerialNumber, GetXBusVersion, LockCode};

use crate::cli::{GlobalOpts, InfoArgs};
use crate::error::CliError;
use crate::output;

#[derive(Tabled, Serialize)]
struct InfoRow {
    #[tabled(rename = "FIELD")]
    field: &'static str,
    #[tabled(rename = "VALUE")]
    value: String,
}

fn scope_label(code: LockCode) -> String {
    match code {
        LockCode::NoLock => "all features unlocked".to_string(),
        LockCode::StartLocked => "z21 start: drive/switch locked".to_string(),
        LockCode::StartUnlocked => "z21 start: drive/switch unlocked".to_string(),
        LockCode::Unknown(code) => format!("unknown (0x{code:02X})"),
    }
}

pub async fn run(
    args: InfoArgs,
    global: &GlobalOpts,
    session: &mut Session,
) -> Result<(), CliError> {
    let none_selected = !(args.device_family
        || args.hardware_platform
        || args.serial
        || args.xbus_version
        || args.firmware_version
        || args.scope);
    let all = args.all || none_selected;

    let mut rows = Vec::new();

    if all || args.device_family || args.xbus_version {
        let version = session.request(&GetXBusVersion).await?;
        if all || args.device_family {
            rows.push(InfoRow {
                field: "device family",
                value: version.station.to_string(),
            });
        }
        if all || args.xbus_version {
            rows.push(InfoRow {
                field: "x-bus version",
                value: version.xbus,
            });
        }
    }

    if all || args.hardware_platform || args.firmware_version {
        let hw = session.request(&GetHwInfo).await?;
        if all || args.hardware_platform {
            rows.push(InfoRow {
                field: "hardware platform",
                value: hw.hardware.to_string(),
            });
        }
        if all || args.firmware_version {
            rows.push(InfoRow {
                field: "firmware version",
                value: hw.firmware,
            });
        }
    }

    if all || args.serial {
        let sn = session.request(&GetSerialNumber).await?;
        rows.push(InfoRow {
            field: "serial number",
            value: sn.to_string(),
        });
    }

    if all || args.scope {
        let code = session.request(&GetCode).await?;
        rows.push(InfoRow {
            field: "feature scope",
            value: scope_label(code),
        });
    }

    output::print_rows(global.output, &rows)
}
