//! Argument definitions for the `z21` binary.

use std::time::Duration;

use clap::{ArgAction, Args, Parser, Subcommand, ValueEnum};

#[derive(Parser, Debug)]
#[command(
    name = "z21",
    about = "CLI for the Roco Z21 control station",
    version,
    propagate_version = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
pub struct GlobalOpts {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    pub verbose: u8,

    /// Context to use instead of the currently selected one
    #[arg(long, global = true, env = "Z21_CONTEXT")]
    pub context: Option<String>,

    /// Output format
    #[arg(short, long, global = true, value_enum, default_value_t = OutputFormat::Table)]
    pub output: OutputFormat,

    /// Per-request reply deadline in milliseconds
    #[arg(long, global = true, default_value_t = 500)]
    pub reply_timeout_ms: u64,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Table,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Manage connection contexts
    #[command(alias = "ctx")]
    Context(ContextArgs),

    /// Query system information from the control station
    Info(InfoArgs),

    /// Show current station status
    Status(StatusArgs),

    /// Manage track and booster power
    Power(PowerArgs),

    /// Manage broadcast subscriptions
    Sub(SubArgs),

    /// Watch broadcast events
    #[command(alias = "mon")]
    Monitor,

    /// Manage the CAN bus
    Can(CanArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── context ─────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct ContextArgs {
    #[command(subcommand)]
    pub command: ContextCommand,
}

#[derive(Subcommand, Debug)]
pub enum ContextCommand {
    /// Add a new context
    Add {
        name: String,
        /// Station host address
        #[arg(long, default_value = "127.0.0.1")]
        host: String,
        /// Station UDP port
        #[arg(long, default_value_t = z21_proto::DEFAULT_STATION_PORT)]
        port: u16,
    },
    /// List all saved contexts
    #[command(alias = "ls")]
    List,
    /// Show the current context
    Show,
    /// Select a saved context
    Use { name: String },
    /// Remove a saved context
    Rm { name: String },
    /// Log off the station session and clear the context's session data
    Reset,
}

// ── info ────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct InfoArgs {
    /// Print all information: device family, hardware platform, serial
    /// number, X-Bus protocol version, firmware version, feature scope
    #[arg(short = 'a', long)]
    pub all: bool,

    /// Print the device family
    #[arg(short = 'd', long)]
    pub device_family: bool,

    /// Print the hardware platform
    #[arg(short = 'i', long)]
    pub hardware_platform: bool,

    /// Print the serial number
    #[arg(short = 'S', long)]
    pub serial: bool,

    /// Print the X-Bus protocol version
    #[arg(short = 'x', long)]
    pub xbus_version: bool,

    /// Print the firmware version
    #[arg(short = 'f', long)]
    pub firmware_version: bool,

    /// Print the software feature scope
    #[arg(short = 's', long)]
    pub scope: bool,
}

// ── status ──────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct StatusArgs {
    #[command(subcommand)]
    pub command: Option<StatusCommand>,
}

#[derive(Subcommand, Debug)]
pub enum StatusCommand {
    /// Show track status only
    Track,
    /// Show system telemetry only
    System,
}

// ── power ───────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct PowerArgs {
    #[command(subcommand)]
    pub command: PowerCommand,
}

#[derive(Subcommand, Debug)]
pub enum PowerCommand {
    /// Turn track power on
    On,
    /// Turn track power off
    Off,
    /// Emergency stop all locomotives (track voltage stays on)
    #[command(alias = "halt")]
    Stop,
}

// ── sub ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct SubArgs {
    #[command(subcommand)]
    pub command: SubCommand,
}

#[derive(Subcommand, Debug)]
pub enum SubCommand {
    /// List all broadcast subscriptions
    #[command(alias = "ls")]
    List,
    /// Subscribe to a specific event group
    Add { name: String },
    /// Unsubscribe from a specific event group
    Rm { name: String },
}

// ── can ─────────────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CanArgs {
    #[command(subcommand)]
    pub command: CanCommand,
}

#[derive(Subcommand, Debug)]
pub enum CanCommand {
    /// Discover and list all CAN detector devices
    #[command(alias = "d")]
    Discover {
        /// Observation window for collecting reports
        #[arg(short = 't', long, value_parser = humantime::parse_duration, default_value = "2s")]
        timeout: Duration,
    },
    /// Show one CAN device's port occupancy
    #[command(alias = "i")]
    Info {
        /// Network id, e.g. 0xD123
        netid: String,
        /// Observation window for collecting reports
        #[arg(short = 't', long, value_parser = humantime::parse_duration, default_value = "2s")]
        timeout: Duration,
    },
}

// ── completions ─────────────────────────────────────────────────────

#[derive(Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
