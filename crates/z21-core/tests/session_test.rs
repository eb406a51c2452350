//! End-to-end core tests against an in-process fake station.
//!
//! The fake binds a real UDP socket and answers frames per test, so these
//! exercise the actual bind/resume, correlation, and discovery paths.

use std::net::SocketAddr;
use std::time::Duration;

use tokio::net::UdpSocket;

use z21_core::{CoreError, Session, SessionDescriptor};
use z21_proto::codec;
use z21_proto::message::{occupancy, BroadcastFlags, GetSerialNumber, CAN_KIND_OCCUPANCY};
use z21_proto::Frame;

const LAN_GET_SERIAL_NUMBER: u16 = 0x10;
const LAN_GET_BROADCASTFLAGS: u16 = 0x51;
const LAN_SYSTEMSTATE_DATACHANGED: u16 = 0x84;
const LAN_CAN_DETECTOR: u16 = 0xC4;

/// Spawn a fake station that maps each received frame to reply frames.
async fn spawn_station<F>(behavior: F) -> SocketAddr
where
    F: Fn(&Frame) -> Vec<Frame> + Send + 'static,
{
    let socket = UdpSocket::bind(("127.0.0.1", 0)).await.expect("bind fake");
    let addr = socket.local_addr().expect("fake addr");

    tokio::spawn(async move {
        let mut buf = [0u8; 1500];
        while let Ok((n, peer)) = socket.recv_from(&mut buf).await {
            for frame in codec::decode_datagram(&buf[..n]) {
                for reply in behavior(&frame) {
                    let _ = socket.send_to(&codec::encode(&reply), peer).await;
                }
            }
        }
    });

    addr
}

fn serial_frame(sn: u32) -> Frame {
    Frame::new(LAN_GET_SERIAL_NUMBER, sn.to_le_bytes().to_vec())
}

fn system_state_frame() -> Frame {
    Frame::new(LAN_SYSTEMSTATE_DATACHANGED, vec![0u8; 16])
}

fn detector_frame(network_id: u16, address: u16, port: u8, status: u16) -> Frame {
    let mut data = Vec::new();
    data.extend(network_id.to_le_bytes());
    data.extend(address.to_le_bytes());
    data.push(port);
    data.push(CAN_KIND_OCCUPANCY);
    data.extend(status.to_le_bytes());
    data.extend(0u16.to_le_bytes());
    Frame::new(LAN_CAN_DETECTOR, data)
}

async fn connect(addr: SocketAddr) -> Session {
    Session::connect("127.0.0.1", addr.port(), None)
        .await
        .expect("connect")
}

// ── Correlator ──────────────────────────────────────────────────────

#[tokio::test]
async fn request_receives_matching_reply() {
    let addr = spawn_station(|frame| match frame.header {
        // An unrelated broadcast arrives before the actual reply; the
        // correlator must skip it.
        LAN_GET_SERIAL_NUMBER => vec![system_state_frame(), serial_frame(424242)],
        _ => vec![],
    })
    .await;

    let mut session = connect(addr).await;
    let sn = session.request(&GetSerialNumber).await.expect("reply");
    assert_eq!(sn, 424242);
    session.close();
}

#[tokio::test]
async fn request_times_out_within_deadline() {
    let addr = spawn_station(|_| vec![]).await;
    let mut session = connect(addr).await.with_reply_timeout(Duration::from_millis(100));

    let started = tokio::time::Instant::now();
    let result = session.request(&GetSerialNumber).await;
    let elapsed = started.elapsed();

    assert!(matches!(result, Err(CoreError::Timeout { timeout_ms: 100 })));
    assert!(elapsed >= Duration::from_millis(100), "returned early: {elapsed:?}");
    assert!(
        elapsed < Duration::from_millis(250),
        "overshot the deadline: {elapsed:?}"
    );
    session.close();
}

// ── Session resumption ──────────────────────────────────────────────

#[tokio::test]
async fn fresh_connect_reports_bound_endpoint() {
    let addr = spawn_station(|_| vec![]).await;
    let session = connect(addr).await;

    assert!(!session.resumed());
    let local = session.local_endpoint();
    assert!(local.local_port > 0);
    session.close();
}

#[tokio::test]
async fn resume_binds_exactly_the_stored_port() {
    let addr = spawn_station(|_| vec![]).await;

    // Learn a currently-free port the way a prior invocation would have.
    let probe = UdpSocket::bind(("0.0.0.0", 0)).await.expect("probe");
    let stored_port = probe.local_addr().expect("probe addr").port();
    drop(probe);

    let descriptor = SessionDescriptor {
        local_host: "0.0.0.0".into(),
        local_port: stored_port,
    };
    let session = Session::connect("127.0.0.1", addr.port(), Some(&descriptor))
        .await
        .expect("resume");

    assert!(session.resumed());
    assert_eq!(session.local_endpoint().local_port, stored_port);
    session.close();
}

#[tokio::test]
async fn resume_bind_conflict_fails_without_fallback() {
    let addr = spawn_station(|_| vec![]).await;

    // Another process already owns the stored port.
    let holder = UdpSocket::bind(("0.0.0.0", 0)).await.expect("holder");
    let taken = holder.local_addr().expect("holder addr").port();

    let descriptor = SessionDescriptor {
        local_host: "0.0.0.0".into(),
        local_port: taken,
    };
    let result = Session::connect("127.0.0.1", addr.port(), Some(&descriptor)).await;

    match result {
        Err(CoreError::BindFailure { port, .. }) => assert_eq!(port, taken),
        Err(other) => panic!("expected BindFailure, got {other}"),
        Ok(_) => panic!("expected BindFailure, got a session"),
    }
}

// ── Broadcast flags (setup-phase confirmation) ──────────────────────

#[tokio::test]
async fn set_broadcast_flags_confirms_via_readback() {
    let addr = spawn_station(|frame| match frame.header {
        LAN_GET_BROADCASTFLAGS => vec![Frame::new(
            LAN_GET_BROADCASTFLAGS,
            BroadcastFlags::TRACK_UPDATES.to_le_bytes().to_vec(),
        )],
        _ => vec![],
    })
    .await;

    let mut session = connect(addr).await;
    let flags = session
        .set_broadcast_flags(BroadcastFlags(BroadcastFlags::TRACK_UPDATES))
        .await
        .expect("flags");
    assert!(flags.has(BroadcastFlags::TRACK_UPDATES));
    session.close();
}

#[tokio::test]
async fn set_broadcast_flags_times_out_without_confirmation() {
    let addr = spawn_station(|_| vec![]).await;
    let mut session = connect(addr).await.with_reply_timeout(Duration::from_millis(80));

    let result = session
        .set_broadcast_flags(BroadcastFlags(BroadcastFlags::TRACK_UPDATES))
        .await;
    assert!(matches!(result, Err(CoreError::Timeout { .. })));
    session.close();
}

// ── Discovery ───────────────────────────────────────────────────────

#[tokio::test]
async fn discover_all_folds_reports_per_device() {
    let addr = spawn_station(|frame| match frame.header {
        LAN_CAN_DETECTOR => vec![
            detector_frame(0xD002, 9, 0, occupancy::FREE),
            detector_frame(0xD001, 4, 0, occupancy::BUSY),
            detector_frame(0xD001, 4, 1, occupancy::FREE),
            // Same port reported twice: both rows must survive.
            detector_frame(0xD001, 4, 1, occupancy::BUSY),
        ],
        _ => vec![],
    })
    .await;

    let mut session = connect(addr).await;
    let devices = session
        .discover_all(Duration::from_millis(300))
        .await
        .expect("discover");

    assert_eq!(devices.len(), 2);
    let order: Vec<u16> = devices.keys().copied().collect();
    assert_eq!(order, vec![0xD002, 0xD001], "first-seen order");
    assert_eq!(devices[&0xD002].ports.len(), 1);
    assert_eq!(devices[&0xD001].ports.len(), 3, "duplicates are appended");
    assert_eq!(devices[&0xD001].address, 4);
    session.close();
}

#[tokio::test]
async fn discover_one_returns_only_the_requested_device() {
    let addr = spawn_station(|frame| match frame.header {
        LAN_CAN_DETECTOR => vec![
            detector_frame(0xD001, 4, 0, occupancy::FREE),
            // A chatty neighbor on the bus must not leak into the result.
            detector_frame(0xD009, 2, 0, occupancy::BUSY),
            detector_frame(0xD001, 4, 1, occupancy::BUSY),
        ],
        _ => vec![],
    })
    .await;

    let mut session = connect(addr).await;
    let device = session
        .discover_one(0xD001, Duration::from_millis(300))
        .await
        .expect("device");

    assert_eq!(device.network_id, 0xD001);
    assert_eq!(device.ports.len(), 2);
    session.close();
}

#[tokio::test]
async fn discover_one_without_reports_is_not_found() {
    let addr = spawn_station(|_| vec![]).await;
    let mut session = connect(addr).await;

    let result = session.discover_one(0xDEAD, Duration::from_millis(150)).await;
    assert!(matches!(result, Err(CoreError::NotFound { network_id: 0xDEAD })));
    session.close();
}

#[tokio::test]
async fn discovery_window_closes_on_time_not_on_events() {
    let addr = spawn_station(|_| vec![]).await;
    let mut session = connect(addr).await;

    let started = tokio::time::Instant::now();
    let devices = session
        .discover_all(Duration::from_millis(200))
        .await
        .expect("discover");
    let elapsed = started.elapsed();

    assert!(devices.is_empty());
    assert!(elapsed >= Duration::from_millis(200));
    assert!(elapsed < Duration::from_millis(400), "window overshoot: {elapsed:?}");
}
