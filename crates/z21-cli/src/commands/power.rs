//! `z21 power`: track power and emergency stop.

use z21_core::Session;
use z21_proto::message::{BroadcastFlags, EmergencyStop, SetTrackPower};

use crate::cli::{GlobalOpts, PowerCommand};
use crate::error::CliError;

use super::confirm;

pub async fn run(
    command: PowerCommand,
    global: &GlobalOpts,
    session: &mut Session,
) -> Result<(), CliError> {
    // Power acknowledgements arrive as track-update broadcasts, so the
    // subscription has to be in place before the command is sent.
    session
        .set_broadcast_flags(BroadcastFlags::default().with(BroadcastFlags::TRACK_UPDATES))
        .await?;

    match command {
        PowerCommand::On | PowerCommand::Off => {
            let on = matches!(command, PowerCommand::On);
            let wanted = if on { "on" } else { "off" };
            let state = session.request(&SetTrackPower { on }).await?;
            if state.on != on {
                return Err(CliError::PowerUnchanged { wanted });
            }
            confirm(global, format!("Track power {wanted}"));
        }
        PowerCommand::Stop => {
            session.request(&EmergencyStop).await?;
            confirm(global, "All locomotives stopped (track voltage stays on)");
        }
    }
    Ok(())
}
