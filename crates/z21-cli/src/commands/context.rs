//! `z21 context` subcommands.

use std::path::Path;
use std::time::Duration;

use serde::Serialize;
use tabled::Tabled;

use z21_core::{Session, SessionDescriptor};

use crate::cli::{ContextCommand, GlobalOpts};
use crate::config::Store;
use crate::error::CliError;
use crate::output;

use super::confirm;

#[derive(Tabled, Serialize)]
struct ContextRow {
    #[tabled(rename = "CURRENT")]
    current: &'static str,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "HOST")]
    host: String,
    #[tabled(rename = "PORT")]
    port: u16,
    #[tabled(rename = "SESSION")]
    session: String,
}

#[derive(Serialize)]
struct ContextDetail {
    name: String,
    host: String,
    port: u16,
    session_host: Option<String>,
    session_port: Option<u16>,
}

pub async fn run(
    command: ContextCommand,
    global: &GlobalOpts,
    config_path: &Path,
    store: &mut Store,
) -> Result<(), CliError> {
    match command {
        ContextCommand::Add { name, host, port } => {
            store.add(&name, host, port)?;
            store.save(config_path)?;
            confirm(global, format!("Context '{name}' added"));
            Ok(())
        }
        ContextCommand::List => {
            let rows: Vec<ContextRow> = store
                .contexts
                .iter()
                .map(|(name, profile)| ContextRow {
                    current: if store.current.as_deref() == Some(name) {
                        "*"
                    } else {
                        ""
                    },
                    name: name.clone(),
                    host: profile.host.clone(),
                    port: profile.port,
                    session: profile
                        .session
                        .as_ref()
                        .map_or_else(|| "-".to_string(), |s| s.local_port.to_string()),
                })
                .collect();
            output::print_rows(global.output, &rows)
        }
        ContextCommand::Show => {
            let (name, profile) = store.resolve(global.context.as_deref())?;
            let detail = ContextDetail {
                name: name.to_string(),
                host: profile.host.clone(),
                port: profile.port,
                session_host: profile.session.as_ref().map(|s| s.local_host.clone()),
                session_port: profile.session.as_ref().map(|s| s.local_port),
            };
            output::print_object(global.output, &detail)
        }
        ContextCommand::Use { name } => {
            store.select(&name)?;
            store.save(config_path)?;
            confirm(global, format!("Switched to context '{name}'"));
            Ok(())
        }
        ContextCommand::Rm { name } => {
            store.remove(&name)?;
            store.save(config_path)?;
            confirm(global, format!("Context '{name}' removed"));
            Ok(())
        }
        ContextCommand::Reset => {
            let (name, profile) = store.resolve(global.context.as_deref())?;
            let name = name.to_string();
            let descriptor: Option<SessionDescriptor> =
                profile.session.as_ref().map(SessionDescriptor::from);

            // Best effort: tell the station we are leaving, but clear the
            // stored session even when it is unreachable. The operator
            // asked for a clean slate either way.
            match Session::connect(&profile.host, profile.port, descriptor.as_ref()).await {
                Ok(session) => {
                    let session =
                        session.with_reply_timeout(Duration::from_millis(global.reply_timeout_ms));
                    session.logoff().await;
                    session.close();
                }
                Err(e) => tracing::warn!(error = %e, "logoff skipped, station unreachable"),
            }

            store.clear_session(&name);
            store.save(config_path)?;
            confirm(global, format!("Session for context '{name}' reset"));
            Ok(())
        }
    }
}
