//! Z21 LAN message set.
//!
//! Inbound traffic is one closed sum type, [`Event`]: replies to requests
//! and unsolicited broadcasts share the same tag space on the wire, so they
//! share it here too. Outbound messages implement [`Encode`]; the subset
//! that has a defined reply also implements [`Request`], which ties each
//! request type to exactly one reply type.

use crate::codec::{self, Frame};

// ── LAN headers ──────────────────────────────────────────────────────

pub(crate) const LAN_GET_SERIAL_NUMBER: u16 = 0x10;
pub(crate) const LAN_GET_CODE: u16 = 0x18;
pub(crate) const LAN_GET_HWINFO: u16 = 0x1A;
pub(crate) const LAN_LOGOFF: u16 = 0x30;
pub(crate) const LAN_X: u16 = 0x40;
pub(crate) const LAN_SET_BROADCASTFLAGS: u16 = 0x50;
pub(crate) const LAN_GET_BROADCASTFLAGS: u16 = 0x51;
pub(crate) const LAN_SYSTEMSTATE_DATACHANGED: u16 = 0x84;
pub(crate) const LAN_SYSTEMSTATE_GETDATA: u16 = 0x85;
pub(crate) const LAN_CAN_DETECTOR: u16 = 0xC4;

/// CAN network id that addresses every detector on the bus.
pub const NETWORK_ID_ALL: u16 = 0x0000;

/// CAN detector message kind carrying an occupancy status report.
pub const CAN_KIND_OCCUPANCY: u8 = 0x01;

/// Occupancy values reported in `value1` of an occupancy report.
pub mod occupancy {
    /// Port free, track voltage present.
    pub const FREE: u16 = 0x0100;
    /// Port free, no track voltage.
    pub const FREE_NO_VOLTAGE: u16 = 0x0000;
    /// Port busy, track voltage present.
    pub const BUSY: u16 = 0x1100;
    /// Port busy, no track voltage.
    pub const BUSY_NO_VOLTAGE: u16 = 0x1000;
}

// ── Supporting wire types ────────────────────────────────────────────

/// Track status bitmask from `LAN_X_STATUS_CHANGED` / system state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TrackStatus(pub u8);

impl TrackStatus {
    pub const EMERGENCY_STOP: u8 = 0x01;
    pub const TRACK_VOLTAGE_OFF: u8 = 0x02;
    pub const SHORT_CIRCUIT: u8 = 0x04;
    pub const PROGRAMMING_MODE: u8 = 0x20;

    pub fn has(self, flag: u8) -> bool {
        self.0 & flag != 0
    }
}

/// Broadcast subscription bitmask (`LAN_SET/GET_BROADCASTFLAGS`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BroadcastFlags(pub u32);

impl BroadcastFlags {
    pub const TRACK_UPDATES: u32 = 0x0000_0001;
    pub const FEEDBACK_UPDATES: u32 = 0x0000_0002;
    pub const RAILCOM_SUB_UPDATES: u32 = 0x0000_0004;
    pub const FAST_CLOCK_UPDATES: u32 = 0x0000_0010;
    pub const SYSTEM_UPDATES: u32 = 0x0000_0100;
    pub const LOCO_UPDATES: u32 = 0x0001_0000;
    pub const CAN_BOOSTER_UPDATES: u32 = 0x0002_0000;
    pub const RAILCOM_UPDATES: u32 = 0x0004_0000;
    pub const CAN_DETECTOR_UPDATES: u32 = 0x0008_0000;
    pub const LOCONET_UPDATES: u32 = 0x0100_0000;
    pub const LOCONET_LOCO_UPDATES: u32 = 0x0200_0000;
    pub const LOCONET_SWITCH_UPDATES: u32 = 0x0400_0000;
    pub const LOCONET_DETECTOR_UPDATES: u32 = 0x0800_0000;

    pub fn has(self, flag: u32) -> bool {
        self.0 & flag == flag
    }

    #[must_use]
    pub fn with(self, flag: u32) -> Self {
        Self(self.0 | flag)
    }

    #[must_use]
    pub fn without(self, flag: u32) -> Self {
        Self(self.0 & !flag)
    }
}

/// Feature scope lock reported by `LAN_GET_CODE`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockCode {
    NoLock,
    StartLocked,
    StartUnlocked,
    Unknown(u8),
}

impl From<u8> for LockCode {
    fn from(code: u8) -> Self {
        match code {
            0x00 => Self::NoLock,
            0x01 => Self::StartLocked,
            0x02 => Self::StartUnlocked,
            other => Self::Unknown(other),
        }
    }
}

/// Hardware platform reported by `LAN_GET_HWINFO`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HardwareType(pub u32);

impl HardwareType {
    pub fn name(self) -> &'static str {
        match self.0 {
            0x0000_0200 => "Z21 (black, 2012)",
            0x0000_0201 => "Z21 (black, 2013)",
            0x0000_0202 => "SmartRail",
            0x0000_0203 => "z21 (white)",
            0x0000_0204 => "z21 start",
            0x0000_0205 => "Z21 Single Booster",
            0x0000_0206 => "Z21 Dual Booster",
            0x0000_0211 => "Z21 XL Series",
            0x0000_0212 => "Z21 XL Booster",
            _ => "unknown hardware",
        }
    }
}

impl std::fmt::Display for HardwareType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Command station family byte from the X-Bus version reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandStation {
    Z21,
    Unknown(u8),
}

impl std::fmt::Display for CommandStation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Z21 => f.write_str("Z21"),
            Self::Unknown(id) => write!(f, "unknown (0x{id:02X})"),
        }
    }
}

// ── Reply / broadcast payloads ───────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HwInfo {
    pub hardware: HardwareType,
    /// Firmware version, e.g. `"1.43"` (decoded from BCD).
    pub firmware: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XBusVersion {
    /// X-Bus protocol version, e.g. `"3.0"`.
    pub xbus: String,
    pub station: CommandStation,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TrackPower {
    pub on: bool,
}

/// Telemetry snapshot from `LAN_SYSTEMSTATE_DATACHANGED`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SystemState {
    pub main_current_ma: i16,
    pub prog_current_ma: i16,
    pub filtered_main_current_ma: i16,
    pub temperature_c: i16,
    pub supply_voltage_mv: u16,
    pub vcc_voltage_mv: u16,
    pub central_state: TrackStatus,
    pub central_state_ex: u8,
    pub capabilities: u8,
}

/// One CAN-bus detector report (reply and broadcast alike).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CanDetector {
    pub network_id: u16,
    pub address: u16,
    pub port: u8,
    pub kind: u8,
    pub value1: u16,
    pub value2: u16,
}

impl CanDetector {
    /// Whether this report carries a port occupancy status.
    pub fn is_occupancy(&self) -> bool {
        self.kind == CAN_KIND_OCCUPANCY
    }
}

// ── Event ────────────────────────────────────────────────────────────

/// Everything the station can push at us, replies and broadcasts alike.
///
/// Consumption sites match exhaustively; frames we cannot interpret are
/// preserved as [`Event::Unknown`] rather than dropped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    SerialNumber(u32),
    Code(LockCode),
    HwInfo(HwInfo),
    XBusVersion(XBusVersion),
    TrackPower(TrackPower),
    ShortCircuit,
    Stopped,
    StatusChanged(TrackStatus),
    BroadcastFlags(BroadcastFlags),
    SystemState(SystemState),
    CanDetector(CanDetector),
    Unknown { header: u16, data: Vec<u8> },
}

impl Event {
    /// Decode a wire frame into an event.
    pub fn decode(frame: Frame) -> Self {
        match frame.header {
            LAN_GET_SERIAL_NUMBER => match read_u32_le(&frame.data) {
                Some(sn) => Self::SerialNumber(sn),
                None => Self::unknown(frame),
            },
            LAN_GET_CODE => match frame.data.first() {
                Some(&code) => Self::Code(LockCode::from(code)),
                None => Self::unknown(frame),
            },
            LAN_GET_HWINFO => decode_hwinfo(&frame.data).unwrap_or_else(|| Self::unknown(frame)),
            LAN_X => decode_xbus(&frame.data).unwrap_or_else(|| Self::unknown(frame)),
            LAN_GET_BROADCASTFLAGS => match read_u32_le(&frame.data) {
                Some(flags) => Self::BroadcastFlags(BroadcastFlags(flags)),
                None => Self::unknown(frame),
            },
            LAN_SYSTEMSTATE_DATACHANGED => {
                decode_system_state(&frame.data).unwrap_or_else(|| Self::unknown(frame))
            }
            LAN_CAN_DETECTOR => {
                decode_can_detector(&frame.data).unwrap_or_else(|| Self::unknown(frame))
            }
            _ => Self::unknown(frame),
        }
    }

    fn unknown(frame: Frame) -> Self {
        tracing::debug!(header = format_args!("0x{:04X}", frame.header), "unhandled frame");
        Self::Unknown {
            header: frame.header,
            data: frame.data,
        }
    }
}

fn read_u32_le(data: &[u8]) -> Option<u32> {
    Some(u32::from_le_bytes(data.get(..4)?.try_into().ok()?))
}

fn read_u16_le(data: &[u8], at: usize) -> Option<u16> {
    Some(u16::from_le_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

fn read_i16_le(data: &[u8], at: usize) -> Option<i16> {
    Some(i16::from_le_bytes(data.get(at..at + 2)?.try_into().ok()?))
}

/// Render a BCD byte pair as `major.minor`, e.g. `0x01 0x43` → `"1.43"`.
fn bcd_version(major: u8, minor: u8) -> String {
    format!("{major:x}.{minor:02x}")
}

fn decode_hwinfo(data: &[u8]) -> Option<Event> {
    let hardware = HardwareType(read_u32_le(data)?);
    let fw = u32::from_le_bytes(data.get(4..8)?.try_into().ok()?);
    let firmware = bcd_version(((fw >> 8) & 0xFF) as u8, (fw & 0xFF) as u8);
    Some(Event::HwInfo(HwInfo { hardware, firmware }))
}

fn decode_xbus(data: &[u8]) -> Option<Event> {
    let payload = codec::xbus_payload(data)?;
    match payload {
        [0x63, 0x21, version, station] => Some(Event::XBusVersion(XBusVersion {
            xbus: format!("{:x}.{:x}", version >> 4, version & 0x0F),
            station: match station {
                0x12 => CommandStation::Z21,
                other => CommandStation::Unknown(*other),
            },
        })),
        [0x61, 0x00] => Some(Event::TrackPower(TrackPower { on: false })),
        [0x61, 0x01] => Some(Event::TrackPower(TrackPower { on: true })),
        [0x61, 0x08] => Some(Event::ShortCircuit),
        [0x62, 0x22, status] => Some(Event::StatusChanged(TrackStatus(*status))),
        [0x81, 0x00] => Some(Event::Stopped),
        _ => None,
    }
}

fn decode_system_state(data: &[u8]) -> Option<Event> {
    if data.len() < 16 {
        return None;
    }
    Some(Event::SystemState(SystemState {
        main_current_ma: read_i16_le(data, 0)?,
        prog_current_ma: read_i16_le(data, 2)?,
        filtered_main_current_ma: read_i16_le(data, 4)?,
        temperature_c: read_i16_le(data, 6)?,
        supply_voltage_mv: read_u16_le(data, 8)?,
        vcc_voltage_mv: read_u16_le(data, 10)?,
        central_state: TrackStatus(data[12]),
        central_state_ex: data[13],
        capabilities: data[15],
    }))
}

fn decode_can_detector(data: &[u8]) -> Option<Event> {
    if data.len() < 10 {
        return None;
    }
    Some(Event::CanDetector(CanDetector {
        network_id: read_u16_le(data, 0)?,
        address: read_u16_le(data, 2)?,
        port: data[4],
        kind: data[5],
        value1: read_u16_le(data, 6)?,
        value2: read_u16_le(data, 8)?,
    }))
}

// ── Outbound messages ────────────────────────────────────────────────

/// Anything that can be serialized onto the connection.
pub trait Encode {
    fn frame(&self) -> Frame;
}

/// A request with a statically associated reply type.
///
/// `match_reply` decides whether an inbound event answers this request;
/// requests with a more specific match key (e.g. a network id) enforce it
/// here. Exactly one reply type exists per request type.
pub trait Request: Encode {
    type Reply;

    fn match_reply(&self, event: &Event) -> Option<Self::Reply>;
}

macro_rules! empty_request {
    ($name:ident, $header:expr) => {
        #[derive(Debug, Clone, Copy, Default)]
        pub struct $name;

        impl Encode for $name {
            fn frame(&self) -> Frame {
                Frame::new($header, Vec::new())
            }
        }
    };
}

empty_request!(GetSerialNumber, LAN_GET_SERIAL_NUMBER);
empty_request!(GetCode, LAN_GET_CODE);
empty_request!(GetHwInfo, LAN_GET_HWINFO);
empty_request!(GetBroadcastFlags, LAN_GET_BROADCASTFLAGS);
empty_request!(GetSystemState, LAN_SYSTEMSTATE_GETDATA);
empty_request!(Logoff, LAN_LOGOFF);

impl Request for GetSerialNumber {
    type Reply = u32;

    fn match_reply(&self, event: &Event) -> Option<u32> {
        match event {
            Event::SerialNumber(sn) => Some(*sn),
            _ => None,
        }
    }
}

impl Request for GetCode {
    type Reply = LockCode;

    fn match_reply(&self, event: &Event) -> Option<LockCode> {
        match event {
            Event::Code(code) => Some(*code),
            _ => None,
        }
    }
}

impl Request for GetHwInfo {
    type Reply = HwInfo;

    fn match_reply(&self, event: &Event) -> Option<HwInfo> {
        match event {
            Event::HwInfo(info) => Some(info.clone()),
            _ => None,
        }
    }
}

impl Request for GetBroadcastFlags {
    type Reply = BroadcastFlags;

    fn match_reply(&self, event: &Event) -> Option<BroadcastFlags> {
        match event {
            Event::BroadcastFlags(flags) => Some(*flags),
            _ => None,
        }
    }
}

impl Request for GetSystemState {
    type Reply = SystemState;

    fn match_reply(&self, event: &Event) -> Option<SystemState> {
        match event {
            Event::SystemState(state) => Some(*state),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetXBusVersion;

impl Encode for GetXBusVersion {
    fn frame(&self) -> Frame {
        Frame::xbus(LAN_X, &[0x21, 0x21])
    }
}

impl Request for GetXBusVersion {
    type Reply = XBusVersion;

    fn match_reply(&self, event: &Event) -> Option<XBusVersion> {
        match event {
            Event::XBusVersion(version) => Some(version.clone()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct GetStatus;

impl Encode for GetStatus {
    fn frame(&self) -> Frame {
        Frame::xbus(LAN_X, &[0x21, 0x24])
    }
}

impl Request for GetStatus {
    type Reply = TrackStatus;

    fn match_reply(&self, event: &Event) -> Option<TrackStatus> {
        match event {
            Event::StatusChanged(status) => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SetTrackPower {
    pub on: bool,
}

impl Encode for SetTrackPower {
    fn frame(&self) -> Frame {
        Frame::xbus(LAN_X, &[0x21, if self.on { 0x81 } else { 0x80 }])
    }
}

impl Request for SetTrackPower {
    type Reply = TrackPower;

    fn match_reply(&self, event: &Event) -> Option<TrackPower> {
        // Any track-power broadcast answers; the caller compares the
        // resulting state against what it asked for.
        match event {
            Event::TrackPower(power) => Some(*power),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct EmergencyStop;

impl Encode for EmergencyStop {
    fn frame(&self) -> Frame {
        Frame::xbus(LAN_X, &[0x80])
    }
}

impl Request for EmergencyStop {
    type Reply = ();

    fn match_reply(&self, event: &Event) -> Option<()> {
        match event {
            Event::Stopped => Some(()),
            _ => None,
        }
    }
}

/// Fire-and-forget subscription update; the station sends no reply.
#[derive(Debug, Clone, Copy)]
pub struct SetBroadcastFlags(pub BroadcastFlags);

impl Encode for SetBroadcastFlags {
    fn frame(&self) -> Frame {
        Frame::new(LAN_SET_BROADCASTFLAGS, self.0 .0.to_le_bytes().to_vec())
    }
}

/// Fire-and-forget CAN detector scan trigger.
///
/// [`NETWORK_ID_ALL`] addresses every device on the bus; the number and
/// timing of resulting reports is unbounded, so this is deliberately not a
/// [`Request`].
#[derive(Debug, Clone, Copy)]
pub struct CanDetectorScan {
    pub network_id: u16,
}

impl Encode for CanDetectorScan {
    fn frame(&self) -> Frame {
        let mut data = vec![0x00];
        data.extend(self.network_id.to_le_bytes());
        Frame::new(LAN_CAN_DETECTOR, data)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn decode_serial_number() {
        let frame = Frame::new(LAN_GET_SERIAL_NUMBER, vec![0x39, 0x30, 0x00, 0x00]);
        assert_eq!(Event::decode(frame), Event::SerialNumber(12345));
    }

    #[test]
    fn decode_hwinfo_bcd_firmware() {
        let mut data = 0x0000_0201u32.to_le_bytes().to_vec();
        data.extend(0x0000_0143u32.to_le_bytes());
        let event = Event::decode(Frame::new(LAN_GET_HWINFO, data));
        assert_eq!(
            event,
            Event::HwInfo(HwInfo {
                hardware: HardwareType(0x0000_0201),
                firmware: "1.43".into(),
            })
        );
    }

    #[test]
    fn decode_xbus_version() {
        let frame = Frame::xbus(LAN_X, &[0x63, 0x21, 0x30, 0x12]);
        assert_eq!(
            Event::decode(frame),
            Event::XBusVersion(XBusVersion {
                xbus: "3.0".into(),
                station: CommandStation::Z21,
            })
        );
    }

    #[test]
    fn decode_track_power_broadcasts() {
        let off = Event::decode(Frame::xbus(LAN_X, &[0x61, 0x00]));
        let on = Event::decode(Frame::xbus(LAN_X, &[0x61, 0x01]));
        assert_eq!(off, Event::TrackPower(TrackPower { on: false }));
        assert_eq!(on, Event::TrackPower(TrackPower { on: true }));
    }

    #[test]
    fn xbus_checksum_failure_yields_unknown() {
        let frame = Frame::new(LAN_X, vec![0x61, 0x01, 0xFF]);
        assert!(matches!(Event::decode(frame), Event::Unknown { header: LAN_X, .. }));
    }

    #[test]
    fn decode_status_changed() {
        let frame = Frame::xbus(LAN_X, &[0x62, 0x22, 0x02]);
        let Event::StatusChanged(status) = Event::decode(frame) else {
            panic!("expected StatusChanged");
        };
        assert!(status.has(TrackStatus::TRACK_VOLTAGE_OFF));
        assert!(!status.has(TrackStatus::SHORT_CIRCUIT));
    }

    #[test]
    fn decode_system_state_telemetry() {
        let mut data = Vec::new();
        data.extend(1250i16.to_le_bytes()); // main current
        data.extend(15i16.to_le_bytes()); // prog current
        data.extend(1200i16.to_le_bytes()); // filtered
        data.extend(34i16.to_le_bytes()); // temperature
        data.extend(18200u16.to_le_bytes()); // supply
        data.extend(17900u16.to_le_bytes()); // vcc
        data.extend([0x00, 0x00, 0x00, 0x01]); // state, state_ex, reserved, caps

        let Event::SystemState(state) = Event::decode(Frame::new(LAN_SYSTEMSTATE_DATACHANGED, data))
        else {
            panic!("expected SystemState");
        };
        assert_eq!(state.main_current_ma, 1250);
        assert_eq!(state.temperature_c, 34);
        assert_eq!(state.supply_voltage_mv, 18200);
        assert_eq!(state.capabilities, 0x01);
    }

    #[test]
    fn decode_can_detector_report() {
        let mut data = Vec::new();
        data.extend(0xD123u16.to_le_bytes());
        data.extend(7u16.to_le_bytes());
        data.push(2); // port
        data.push(CAN_KIND_OCCUPANCY);
        data.extend(occupancy::BUSY.to_le_bytes());
        data.extend(0u16.to_le_bytes());

        let Event::CanDetector(report) = Event::decode(Frame::new(LAN_CAN_DETECTOR, data)) else {
            panic!("expected CanDetector");
        };
        assert_eq!(report.network_id, 0xD123);
        assert_eq!(report.address, 7);
        assert_eq!(report.port, 2);
        assert!(report.is_occupancy());
        assert_eq!(report.value1, occupancy::BUSY);
    }

    #[test]
    fn truncated_payload_yields_unknown() {
        let frame = Frame::new(LAN_GET_SERIAL_NUMBER, vec![0x01]);
        assert!(matches!(Event::decode(frame), Event::Unknown { .. }));
    }

    #[test]
    fn requests_match_only_their_reply_type() {
        let status = Event::StatusChanged(TrackStatus(0));
        let serial = Event::SerialNumber(99);

        assert!(GetSerialNumber.match_reply(&status).is_none());
        assert_eq!(GetSerialNumber.match_reply(&serial), Some(99));
        assert!(GetStatus.match_reply(&serial).is_none());
        assert!(GetStatus.match_reply(&status).is_some());
    }

    #[test]
    fn scan_trigger_encodes_network_id() {
        let frame = CanDetectorScan { network_id: 0xD123 }.frame();
        assert_eq!(frame.header, LAN_CAN_DETECTOR);
        assert_eq!(frame.data, vec![0x00, 0x23, 0xD1]);
    }

    #[test]
    fn broadcast_flag_arithmetic() {
        let flags = BroadcastFlags::default()
            .with(BroadcastFlags::TRACK_UPDATES)
            .with(BroadcastFlags::CAN_DETECTOR_UPDATES);
        assert!(flags.has(BroadcastFlags::TRACK_UPDATES));
        assert!(!flags.has(BroadcastFlags::SYSTEM_UPDATES));
        assert!(!flags
            .without(BroadcastFlags::TRACK_UPDATES)
            .has(BroadcastFlags::TRACK_UPDATES));
    }
}
