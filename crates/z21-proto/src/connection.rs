//! UDP connection to a Z21 control station.
//!
//! A background reader task decodes every inbound datagram and forwards the
//! resulting events through a bounded mpsc channel. The receiving half is
//! wrapped in [`EventStream`], handed out exactly once: whichever component
//! holds it owns the inbound stream, which keeps the one-consumer-at-a-time
//! rule visible in the type system instead of implicit in shared state.

use std::net::{Ipv4Addr, SocketAddr};
use std::sync::Arc;

use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::codec;
use crate::error::Error;
use crate::message::{Encode, Event};

/// UDP port the Z21 listens on.
pub const DEFAULT_STATION_PORT: u16 = 21105;

const EVENT_CHANNEL_CAPACITY: usize = 256;
const MAX_DATAGRAM: usize = 1500;

/// Local bind strategy for the connection's UDP socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocalBind {
    /// Let the network stack pick an ephemeral port.
    Ephemeral,
    /// Bind exactly this port; fail if it is unavailable.
    Port(u16),
}

/// Inbound event stream of a [`Connection`].
///
/// There is exactly one of these per connection. `&mut` access is the
/// capability to read events; transferring it transfers stream ownership.
pub struct EventStream {
    rx: mpsc::Receiver<Event>,
}

impl EventStream {
    /// Next event, in arrival order. `None` once the connection is closed.
    pub async fn next(&mut self) -> Option<Event> {
        self.rx.recv().await
    }
}

/// Handle to an open station connection.
///
/// Closing (explicitly or on drop) stops the reader task and releases the
/// bound local port.
pub struct Connection {
    socket: Arc<UdpSocket>,
    cancel: CancellationToken,
}

impl Connection {
    /// Bind a local UDP socket per `bind`, connect it to the station, and
    /// spawn the reader task.
    pub async fn open(
        host: &str,
        port: u16,
        bind: LocalBind,
    ) -> Result<(Self, EventStream), Error> {
        let local_port = match bind {
            LocalBind::Ephemeral => 0,
            LocalBind::Port(p) => p,
        };
        let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, local_port))
            .await
            .map_err(|source| Error::Bind {
                port: local_port,
                source,
            })?;
        socket.connect((host, port)).await?;

        let socket = Arc::new(socket);
        let (tx, rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();

        tokio::spawn(read_loop(Arc::clone(&socket), tx, cancel.clone()));

        tracing::debug!(
            local = %socket.local_addr().map(|a| a.to_string()).unwrap_or_default(),
            remote = %format_args!("{host}:{port}"),
            "connection open"
        );

        Ok((Self { socket, cancel }, EventStream { rx }))
    }

    /// Send one message. No reply handling happens here; correlation is the
    /// caller's concern. Fails with [`Error::Closed`] once the connection
    /// has been closed.
    pub async fn send(&self, msg: &impl Encode) -> Result<(), Error> {
        if self.cancel.is_cancelled() {
            return Err(Error::Closed);
        }
        let wire = codec::encode(&msg.frame());
        self.socket.send(&wire).await?;
        Ok(())
    }

    /// The actually-bound local endpoint.
    pub fn local_addr(&self) -> Result<SocketAddr, Error> {
        Ok(self.socket.local_addr()?)
    }

    /// Stop the reader task. Idempotent; also invoked on drop.
    pub fn close(&self) {
        self.cancel.cancel();
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn read_loop(
    socket: Arc<UdpSocket>,
    tx: mpsc::Sender<Event>,
    cancel: CancellationToken,
) {
    let mut buf = [0u8; MAX_DATAGRAM];
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            received = socket.recv(&mut buf) => {
                match received {
                    Ok(n) => {
                        for frame in codec::decode_datagram(&buf[..n]) {
                            let event = Event::decode(frame);
                            if tx.send(event).await.is_err() {
                                // Stream receiver dropped; nothing left to feed.
                                return;
                            }
                        }
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "UDP receive failed, stopping reader");
                        break;
                    }
                }
            }
        }
    }
    tracing::debug!("reader task exiting");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::{GetSerialNumber, LAN_GET_SERIAL_NUMBER};
    use crate::Frame;

    async fn fake_station() -> (UdpSocket, SocketAddr) {
        let socket = UdpSocket::bind((Ipv4Addr::LOCALHOST, 0)).await.expect("bind");
        let addr = socket.local_addr().expect("local addr");
        (socket, addr)
    }

    #[tokio::test]
    async fn send_reaches_the_station() {
        let (station, addr) = fake_station().await;
        let (conn, _events) = Connection::open("127.0.0.1", addr.port(), LocalBind::Ephemeral)
            .await
            .expect("open");

        conn.send(&GetSerialNumber).await.expect("send");

        let mut buf = [0u8; 64];
        let (n, _) = station.recv_from(&mut buf).await.expect("recv");
        assert_eq!(&buf[..n], &[0x04, 0x00, 0x10, 0x00]);
    }

    #[tokio::test]
    async fn events_arrive_in_order() {
        let (station, addr) = fake_station().await;
        let (conn, mut events) = Connection::open("127.0.0.1", addr.port(), LocalBind::Ephemeral)
            .await
            .expect("open");
        let local = conn.local_addr().expect("local addr");
        let client = SocketAddr::new(Ipv4Addr::LOCALHOST.into(), local.port());

        // Two frames in one datagram, then one more.
        let mut wire = codec::encode(&Frame::new(LAN_GET_SERIAL_NUMBER, vec![1, 0, 0, 0]));
        wire.extend(codec::encode(&Frame::new(LAN_GET_SERIAL_NUMBER, vec![2, 0, 0, 0])));
        station.send_to(&wire, client).await.expect("send");
        station
            .send_to(
                &codec::encode(&Frame::new(LAN_GET_SERIAL_NUMBER, vec![3, 0, 0, 0])),
                client,
            )
            .await
            .expect("send");

        for expected in 1..=3u32 {
            let event = events.next().await.expect("event");
            assert_eq!(event, Event::SerialNumber(expected));
        }
    }

    #[tokio::test]
    async fn close_ends_the_stream() {
        let (_station, addr) = fake_station().await;
        let (conn, mut events) = Connection::open("127.0.0.1", addr.port(), LocalBind::Ephemeral)
            .await
            .expect("open");

        conn.close();
        drop(conn);
        assert!(events.next().await.is_none());
    }

    #[tokio::test]
    async fn send_after_close_is_rejected() {
        let (_station, addr) = fake_station().await;
        let (conn, _events) = Connection::open("127.0.0.1", addr.port(), LocalBind::Ephemeral)
            .await
            .expect("open");

        conn.close();
        let result = conn.send(&GetSerialNumber).await;
        assert!(matches!(result, Err(Error::Closed)));
    }

    #[tokio::test]
    async fn pinned_bind_uses_that_port() {
        let (_station, addr) = fake_station().await;

        // Grab a free port, release it, then pin to it.
        let probe = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.expect("probe");
        let pinned = probe.local_addr().expect("probe addr").port();
        drop(probe);

        let (conn, _events) = Connection::open("127.0.0.1", addr.port(), LocalBind::Port(pinned))
            .await
            .expect("open pinned");
        assert_eq!(conn.local_addr().expect("local").port(), pinned);
    }

    #[tokio::test]
    async fn bind_conflict_is_reported() {
        let (_station, addr) = fake_station().await;
        let holder = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).await.expect("holder");
        let taken = holder.local_addr().expect("holder addr").port();

        let result = Connection::open("127.0.0.1", addr.port(), LocalBind::Port(taken)).await;
        match result {
            Err(Error::Bind { port, .. }) => assert_eq!(port, taken),
            Err(other) => panic!("expected bind error, got {other:?}"),
            Ok(_) => panic!("expected bind error, got a connection"),
        }
    }
}
