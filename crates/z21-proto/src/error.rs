use thiserror::Error;

/// Transport and wire-format errors for the `z21-proto` crate.
///
/// `z21-core` translates these into its own taxonomy; consumers of the
/// core never match on these variants directly.
#[derive(Debug, Error)]
pub enum Error {
    /// Binding the requested local UDP port failed. The port is reported
    /// so the caller can tell a session-resume bind from an ephemeral one.
    #[error("failed to bind local UDP port {port}: {source}")]
    Bind {
        port: u16,
        #[source]
        source: std::io::Error,
    },

    /// Socket-level send/receive/connect failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The connection has been closed; no sends or events remain possible.
    #[error("connection closed")]
    Closed,
}
