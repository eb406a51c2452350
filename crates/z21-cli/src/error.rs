//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` variants into user-facing errors with actionable help
//! text and stable process exit codes.

use miette::Diagnostic;
use thiserror::Error;

use z21_core::CoreError;

/// Exit codes for process termination.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const NOT_FOUND: i32 = 4;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("could not connect to station at {host}")]
    #[diagnostic(
        code(z21::connection_failed),
        help("Check that the Z21 is powered on and reachable.\nReason: {reason}")
    )]
    ConnectionFailed { host: String, reason: String },

    #[error("could not bind local port {port} to resume the session")]
    #[diagnostic(
        code(z21::bind_failed),
        help(
            "Another process owns that port. The stored session was left\n\
             untouched; clear it explicitly with: z21 context reset"
        )
    )]
    BindFailed { port: u16, reason: String },

    #[error("station did not reply within {timeout_ms}ms")]
    #[diagnostic(
        code(z21::timeout),
        help("Increase --reply-timeout-ms or check the network path to the station.")
    )]
    Timeout { timeout_ms: u64 },

    // ── Resources ────────────────────────────────────────────────────
    #[error("CAN device 0x{network_id:04X} did not answer")]
    #[diagnostic(
        code(z21::device_not_found),
        help("Run: z21 can discover to list the devices on the bus")
    )]
    DeviceNotFound { network_id: u16 },

    // ── Contexts ─────────────────────────────────────────────────────
    #[error("no context selected")]
    #[diagnostic(
        code(z21::no_context),
        help("Add one with: z21 context add NAME --host HOST\nThen select it: z21 context use NAME")
    )]
    NoContext,

    #[error("context '{name}' not found")]
    #[diagnostic(code(z21::context_not_found), help("Available contexts: {available}"))]
    ContextNotFound { name: String, available: String },

    #[error("context '{name}' already exists")]
    #[diagnostic(code(z21::context_exists))]
    ContextExists { name: String },

    // ── Subscriptions / power ────────────────────────────────────────
    #[error("unsupported subscription '{name}'")]
    #[diagnostic(
        code(z21::unknown_subscription),
        help("Run: z21 sub list to see the supported subscription names")
    )]
    UnknownSubscription { name: String },

    #[error("failed to turn track power {wanted}")]
    #[diagnostic(
        code(z21::power_unchanged),
        help("The station reported a different power state than requested.")
    )]
    PowerUnchanged { wanted: &'static str },

    // ── Validation ───────────────────────────────────────────────────
    #[error("invalid value for {field}: {reason}")]
    #[diagnostic(code(z21::validation))]
    Validation { field: String, reason: String },

    // ── Configuration / IO ───────────────────────────────────────────
    #[error(transparent)]
    #[diagnostic(code(z21::config))]
    Config(Box<figment::Error>),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("could not serialize output: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<figment::Error> for CliError {
    fn from(err: figment::Error) -> Self {
        Self::Config(Box::new(err))
    }
}

impl CliError {
    /// Map this error to a process exit code.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } | Self::BindFailed { .. } => exit_code::CONNECTION,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::DeviceNotFound { .. } | Self::ContextNotFound { .. } => exit_code::NOT_FOUND,
            Self::Validation { .. } | Self::UnknownSubscription { .. } => exit_code::USAGE,
            _ => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ConnectionUnavailable => CliError::ConnectionFailed {
                host: "(none)".into(),
                reason: "no active station connection".into(),
            },
            CoreError::ConnectionFailed { host, reason } => {
                CliError::ConnectionFailed { host, reason }
            }
            CoreError::BindFailure { port, reason } => CliError::BindFailed { port, reason },
            CoreError::Timeout { timeout_ms } => CliError::Timeout { timeout_ms },
            CoreError::NotFound { network_id } => CliError::DeviceNotFound { network_id },
            CoreError::TriggerSendFailure { reason } => CliError::ConnectionFailed {
                host: "(active)".into(),
                reason,
            },
        }
    }
}
