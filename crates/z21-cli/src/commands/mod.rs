//! Command dispatch and shared session plumbing.

use std::path::Path;
use std::time::Duration;

use clap::CommandFactory;

use z21_core::{Session, SessionDescriptor};

use crate::cli::{Cli, Command, GlobalOpts};
use crate::config::{self, Store};
use crate::error::CliError;

mod can;
mod context;
mod info;
mod monitor;
mod power;
mod status;
mod sub;

pub async fn run(cli: Cli) -> Result<(), CliError> {
    let config_path = config::config_path()?;
    let mut store = Store::load(&config_path)?;
    let global = cli.global;

    match cli.command {
        Command::Context(args) => {
            context::run(args.command, &global, &config_path, &mut store).await
        }
        Command::Completions(args) => {
            clap_complete::generate(
                args.shell,
                &mut Cli::command(),
                "z21",
                &mut std::io::stdout(),
            );
            Ok(())
        }
        Command::Info(args) => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = info::run(args, &global, &mut session).await;
            session.close();
            result
        }
        Command::Status(args) => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = status::run(args.command, &global, &mut session).await;
            session.close();
            result
        }
        Command::Power(args) => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = power::run(args.command, &global, &mut session).await;
            session.close();
            result
        }
        Command::Sub(args) => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = sub::run(args.command, &global, &mut session).await;
            session.close();
            result
        }
        Command::Monitor => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = monitor::run(&global, &mut session).await;
            session.close();
            result
        }
        Command::Can(args) => {
            let mut session = open_session(&global, &config_path, &mut store).await?;
            let result = can::run(args.command, &global, &mut session).await;
            session.close();
            result
        }
    }
}

/// Connect using the active context, resuming its stored session if any.
///
/// A fresh connection writes the actually-bound local endpoint back into the
/// context so the next invocation can resume it. A resumed connection leaves
/// the stored endpoint untouched.
async fn open_session(
    global: &GlobalOpts,
    config_path: &Path,
    store: &mut Store,
) -> Result<Session, CliError> {
    let (name, profile) = store.resolve(global.context.as_deref())?;
    let name = name.to_string();
    let descriptor: Option<SessionDescriptor> =
        profile.session.as_ref().map(SessionDescriptor::from);

    let session = Session::connect(&profile.host, profile.port, descriptor.as_ref())
        .await?
        .with_reply_timeout(Duration::from_millis(global.reply_timeout_ms));

    if !session.resumed() {
        store.set_session(&name, session.local_endpoint());
        store.save(config_path)?;
    }
    Ok(session)
}

/// Confirmation line, silenced by `--quiet`.
fn confirm(global: &GlobalOpts, message: impl std::fmt::Display) {
    if !global.quiet {
        println!("{message}");
    }
}
