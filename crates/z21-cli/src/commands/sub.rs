//! `z21 sub`: broadcast subscription management.
//!
//! Subscriptions are a per-client bitmask on the station, keyed by our UDP
//! endpoint. They survive across invocations only when the session is
//! resumed on the same local port.

use serde::Serialize;
use tabled::Tabled;

use z21_core::Session;
use z21_proto::message::{BroadcastFlags, GetBroadcastFlags};

use crate::cli::{GlobalOpts, SubCommand};
use crate::error::CliError;
use crate::output;

use super::confirm;

struct Subscription {
    name: &'static str,
    flag: u32,
    description: &'static str,
}

const SUBSCRIPTIONS: &[Subscription] = &[
    Subscription {
        name: "track",
        flag: BroadcastFlags::TRACK_UPDATES,
        description: "track power, stop and locomotive/accessory changes",
    },
    Subscription {
        name: "feedback",
        flag: BroadcastFlags::FEEDBACK_UPDATES,
        description: "R-Bus feedback bus changes",
    },
    Subscription {
        name: "railcom-sub",
        flag: BroadcastFlags::RAILCOM_SUB_UPDATES,
        description: "RailCom data for subscribed locomotives",
    },
    Subscription {
        name: "fastclock",
        flag: BroadcastFlags::FAST_CLOCK_UPDATES,
        description: "fast clock time changes",
    },
    Subscription {
        name: "system",
        flag: BroadcastFlags::SYSTEM_UPDATES,
        description: "system telemetry (currents, voltages, temperature)",
    },
    Subscription {
        name: "loco",
        flag: BroadcastFlags::LOCO_UPDATES,
        description: "all locomotive changes, not only subscribed ones",
    },
    Subscription {
        name: "can-booster",
        flag: BroadcastFlags::CAN_BOOSTER_UPDATES,
        description: "CAN-bus booster status changes",
    },
    Subscription {
        name: "railcom",
        flag: BroadcastFlags::RAILCOM_UPDATES,
        description: "RailCom data for all locomotives",
    },
    Subscription {
        name: "can-detector",
        flag: BroadcastFlags::CAN_DETECTOR_UPDATES,
        description: "CAN-bus occupancy detector reports",
    },
    Subscription {
        name: "loconet",
        flag: BroadcastFlags::LOCONET_UPDATES,
        description: "LocoNet bus traffic (without loco and switch)",
    },
    Subscription {
        name: "loconet-loco",
        flag: BroadcastFlags::LOCONET_LOCO_UPDATES,
        description: "LocoNet locomotive changes",
    },
    Subscription {
        name: "loconet-switch",
        flag: BroadcastFlags::LOCONET_SWITCH_UPDATES,
        description: "LocoNet switch changes",
    },
    Subscription {
        name: "loconet-detector",
        flag: BroadcastFlags::LOCONET_DETECTOR_UPDATES,
        description: "LocoNet occupancy detector reports",
    },
];

fn lookup(name: &str) -> Result<&'static Subscription, CliError> {
    SUBSCRIPTIONS
        .iter()
        .find(|s| s.name == name)
        .ok_or_else(|| CliError::UnknownSubscription {
            name: name.to_string(),
        })
}

#[derive(Tabled, Serialize)]
struct SubRow {
    #[tabled(rename = "ACTIVE")]
    active: &'static str,
    #[tabled(rename = "NAME")]
    name: &'static str,
    #[tabled(rename = "DESCRIPTION")]
    description: &'static str,
}

pub async fn run(
    command: SubCommand,
    global: &GlobalOpts,
    session: &mut Session,
) -> Result<(), CliError> {
    match command {
        SubCommand::List => {
            let flags = session.request(&GetBroadcastFlags).await?;
            let rows: Vec<SubRow> = SUBSCRIPTIONS
                .iter()
                .map(|s| SubRow {
                    active: if flags.has(s.flag) { "*" } else { "" },
                    name: s.name,
                    description: s.description,
                })
                .collect();
            output::print_rows(global.output, &rows)
        }
        SubCommand::Add { name } => {
            let sub = lookup(&name)?;
            let flags = session.request(&GetBroadcastFlags).await?;
            let confirmed = session.set_broadcast_flags(flags.with(sub.flag)).await?;
            if !confirmed.has(sub.flag) {
                return Err(CliError::Validation {
                    field: "subscription".into(),
                    reason: format!("station did not accept '{name}'"),
                });
            }
            confirm(global, format!("Subscribed to '{name}'"));
            Ok(())
        }
        SubCommand::Rm { name } => {
            let sub = lookup(&name)?;
            let flags = session.request(&GetBroadcastFlags).await?;
            let confirmed = session.set_broadcast_flags(flags.without(sub.flag)).await?;
            if confirmed.has(sub.flag) {
                return Err(CliError::Validation {
                    field: "subscription".into(),
                    reason: format!("station did not release '{name}'"),
                });
            }
            confirm(global, format!("Unsubscribed from '{name}'"));
            Ok(())
        }
    }
}
