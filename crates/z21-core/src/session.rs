//! Station session with local-endpoint resumption.
//!
//! A Z21 keeps per-client subscription state keyed by the client's UDP
//! endpoint. Re-binding the same local port on the next invocation lets a
//! new process re-attach to that server-side session instead of tearing it
//! down and starting over. The client cannot verify in advance that the
//! remote session is still alive; it simply returns on the old endpoint and
//! expects the station to recognize it.

use std::time::Duration;

use z21_proto::connection::{Connection, EventStream, LocalBind};
use z21_proto::message::{BroadcastFlags, Encode, GetBroadcastFlags, Logoff, SetBroadcastFlags};

use crate::error::CoreError;

/// Default bounded wait for one request/reply exchange. Deliberately much
/// shorter than any discovery window: ordinary turnaround is near-instant.
pub const DEFAULT_REPLY_TIMEOUT: Duration = Duration::from_millis(500);

/// The persisted local endpoint of an established session.
///
/// Stored alongside a connection profile; absence means "nothing to
/// resume". Once written it is only ever replaced by an explicit reset,
/// never silently rewritten by a resumed connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionDescriptor {
    pub local_host: String,
    pub local_port: u16,
}

/// One command invocation's connection to the station.
///
/// Owns both halves of the connection: the send side and the sole
/// [`EventStream`]. Exactly one reader is active at any time -- the
/// correlator during a request, the discovery fold during its window, or a
/// monitor loop -- enforced by `&mut self` on all of them.
pub struct Session {
    conn: Connection,
    pub(crate) events: EventStream,
    pub(crate) reply_timeout: Duration,
    resumed: bool,
    local: SessionDescriptor,
}

impl Session {
    /// Connect to `host:port`, resuming on the descriptor's local port when
    /// one is stored.
    ///
    /// Resume-path bind failures surface as [`CoreError::BindFailure`] and
    /// never fall back to an ephemeral port: the operator decides whether
    /// to reset the stored session.
    pub async fn connect(
        host: &str,
        port: u16,
        descriptor: Option<&SessionDescriptor>,
    ) -> Result<Self, CoreError> {
        let resume_port = descriptor
            .filter(|d| d.local_port > 0)
            .map(|d| d.local_port);

        let bind = match resume_port {
            Some(p) => {
                tracing::debug!(local_port = p, "resuming session");
                LocalBind::Port(p)
            }
            None => {
                tracing::debug!("starting new session");
                LocalBind::Ephemeral
            }
        };

        let (conn, events) =
            Connection::open(host, port, bind)
                .await
                .map_err(|e| match (e, resume_port) {
                    (z21_proto::Error::Bind { port, source }, Some(_)) => CoreError::BindFailure {
                        port,
                        reason: source.to_string(),
                    },
                    (other, _) => CoreError::ConnectionFailed {
                        host: host.to_string(),
                        reason: other.to_string(),
                    },
                })?;

        let addr = conn.local_addr().map_err(|e| CoreError::ConnectionFailed {
            host: host.to_string(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            conn,
            events,
            reply_timeout: DEFAULT_REPLY_TIMEOUT,
            resumed: resume_port.is_some(),
            local: SessionDescriptor {
                local_host: addr.ip().to_string(),
                local_port: addr.port(),
            },
        })
    }

    /// Override the per-request reply deadline.
    #[must_use]
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }

    /// Whether this session re-used a stored local endpoint.
    pub fn resumed(&self) -> bool {
        self.resumed
    }

    /// The actually-bound local endpoint of this session.
    pub fn local_endpoint(&self) -> &SessionDescriptor {
        &self.local
    }

    /// Fire-and-forget send with no reply correlation.
    pub async fn send(&self, msg: &impl Encode) -> Result<(), CoreError> {
        Ok(self.conn.send(msg).await?)
    }

    pub(crate) fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Hand out the event stream for a long-lived consumer (monitor loop).
    pub fn events(&mut self) -> &mut EventStream {
        &mut self.events
    }

    /// Update the broadcast subscription mask and confirm it.
    ///
    /// The set message has no wire reply, so confirmation is a follow-up
    /// flags query; a timeout there aborts the caller's command rather than
    /// proceeding with unknown subscription state.
    pub async fn set_broadcast_flags(
        &mut self,
        flags: BroadcastFlags,
    ) -> Result<BroadcastFlags, CoreError> {
        self.send(&SetBroadcastFlags(flags)).await?;
        self.request(&GetBroadcastFlags).await
    }

    /// Best-effort logoff notification. The station sends no reply and the
    /// caller usually proceeds to discard the session either way.
    pub async fn logoff(&self) {
        if let Err(e) = self.conn.send(&Logoff).await {
            tracing::warn!(error = %e, "logoff notification failed");
        }
    }

    /// Close the connection, releasing the bound local port.
    pub fn close(self) {
        self.conn.close();
    }
}
