// z21-proto: Z21 LAN protocol messages and the UDP transport beneath them.

pub mod codec;
pub mod connection;
pub mod error;
pub mod message;

pub use codec::Frame;
pub use connection::{Connection, EventStream, LocalBind, DEFAULT_STATION_PORT};
pub use error::Error;
pub use message::{
    BroadcastFlags, CanDetector, CommandStation, Encode, Event, HardwareType, HwInfo, LockCode,
    Request, SystemState, TrackPower, TrackStatus, XBusVersion,
};
