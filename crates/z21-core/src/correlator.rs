//! Request/reply correlation over the shared event stream.
//!
//! Replies and unsolicited broadcasts arrive interleaved; a request is
//! answered by the next event its [`Request::match_reply`] accepts. While a
//! request is in flight the correlator owns the stream exclusively, and
//! events it skips are consumed, not buffered for redelivery -- there is no
//! other consumer to deliver them to within one command invocation.

use tokio::time::{timeout_at, Instant};

use z21_proto::message::Request;

use crate::error::CoreError;
use crate::session::Session;

impl Session {
    /// Send `req` once and wait for its matching reply.
    ///
    /// The wait is bounded by the session's reply timeout, measured from
    /// the send. Overlapping requests are impossible by construction:
    /// `&mut self` serializes callers.
    pub async fn request<R: Request>(&mut self, req: &R) -> Result<R::Reply, CoreError> {
        self.connection()
            .send(req)
            .await
            .map_err(CoreError::from)?;

        let deadline = Instant::now() + self.reply_timeout;
        loop {
            match timeout_at(deadline, self.events.next()).await {
                Err(_elapsed) => {
                    return Err(CoreError::Timeout {
                        timeout_ms: self.reply_timeout.as_millis() as u64,
                    })
                }
                Ok(None) => return Err(CoreError::ConnectionUnavailable),
                Ok(Some(event)) => {
                    if let Some(reply) = req.match_reply(&event) {
                        return Ok(reply);
                    }
                    tracing::trace!(?event, "skipping non-matching event while waiting");
                }
            }
        }
    }
}
