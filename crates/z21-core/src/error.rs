// ── Core error types ──
//
// User-facing failures of the core layer. Transport errors from z21-proto
// are translated at this boundary; consumers never match on socket errors
// directly. No variant is ever retried silently.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    /// No active connection for the command.
    #[error("no active station connection")]
    ConnectionUnavailable,

    /// Opening the connection failed for a non-bind reason.
    #[error("cannot connect to station at {host}: {reason}")]
    ConnectionFailed { host: String, reason: String },

    /// A previously stored local port could not be bound for resumption.
    /// The stored descriptor is left untouched; the operator must reset
    /// the session explicitly.
    #[error("cannot bind stored local port {port} for session resume: {reason}")]
    BindFailure { port: u16, reason: String },

    /// No matching reply arrived within the per-request deadline.
    #[error("no reply from station within {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// A targeted scan produced zero matching reports. A normal outcome,
    /// distinct from any transport failure.
    #[error("no CAN device 0x{network_id:04X} answered during the scan window")]
    NotFound { network_id: u16 },

    /// The fire-and-forget scan trigger could not be sent; discovery
    /// aborts before any folding begins.
    #[error("failed to send scan trigger: {reason}")]
    TriggerSendFailure { reason: String },
}

impl From<z21_proto::Error> for CoreError {
    fn from(err: z21_proto::Error) -> Self {
        match err {
            z21_proto::Error::Bind { port, source } => CoreError::BindFailure {
                port,
                reason: source.to_string(),
            },
            z21_proto::Error::Closed => CoreError::ConnectionUnavailable,
            other => CoreError::ConnectionFailed {
                host: String::new(),
                reason: other.to_string(),
            },
        }
    }
}
