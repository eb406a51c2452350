//! Time-windowed CAN-bus detector discovery.
//!
//! A scan trigger is fire-and-forget: the number and timing of the
//! occupancy reports it provokes is unknown in advance, so there is no
//! single reply to correlate against. Instead the session drains its event
//! stream for a fixed observation window and folds every occupancy report
//! into per-device records.

use std::time::Duration;

use indexmap::IndexMap;
use tokio::time::{timeout_at, Instant};

use z21_proto::message::{CanDetector, CanDetectorScan, Event, NETWORK_ID_ALL};

use crate::error::CoreError;
use crate::session::Session;

/// Default observation window for a bus scan.
pub const DEFAULT_SCAN_WINDOW: Duration = Duration::from_secs(2);

/// One reported detector port. Multiple sightings of the same port within
/// a window produce multiple entries; deduplication is deliberately not
/// performed at this layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DetectorPort {
    /// Zero-based port index as reported on the bus.
    pub index: u8,
    /// Raw occupancy status value.
    pub status: u16,
}

/// A CAN detector device, accumulated from its per-port reports.
///
/// Identity is the 16-bit `network_id`; reports sharing it merge into one
/// record, appending ports in arrival order. Records live only for the
/// duration of one command invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Detector {
    pub network_id: u16,
    pub address: u16,
    pub ports: Vec<DetectorPort>,
}

/// Fold one report into the device map.
///
/// Creates the device on first sighting (capturing network id and address
/// from that event) and appends a port entry on every sighting. Reports
/// that are not occupancy status are ignored.
fn fold_report(devices: &mut IndexMap<u16, Detector>, report: &CanDetector) {
    if !report.is_occupancy() {
        return;
    }
    let device = devices
        .entry(report.network_id)
        .or_insert_with(|| Detector {
            network_id: report.network_id,
            address: report.address,
            ports: Vec::new(),
        });
    device.ports.push(DetectorPort {
        index: report.port,
        status: report.value1,
    });
}

impl Session {
    /// Enumerate every detector on the bus.
    ///
    /// Map iteration order is first-seen order.
    pub async fn discover_all(
        &mut self,
        window: Duration,
    ) -> Result<IndexMap<u16, Detector>, CoreError> {
        self.scan(NETWORK_ID_ALL, window).await
    }

    /// Query a single known network id.
    ///
    /// Zero matching reports within the window is [`CoreError::NotFound`],
    /// not an empty device.
    pub async fn discover_one(
        &mut self,
        network_id: u16,
        window: Duration,
    ) -> Result<Detector, CoreError> {
        let mut devices = self.scan(network_id, window).await?;
        devices
            .swap_remove(&network_id)
            .ok_or(CoreError::NotFound { network_id })
    }

    /// Trigger a scan and drain the event stream until the window closes.
    ///
    /// The window starts at the trigger send and closes purely on elapsed
    /// time; the total port count of a bus is not known a priori, so there
    /// is no early exit. A failed trigger aborts before any folding.
    async fn scan(
        &mut self,
        network_id: u16,
        window: Duration,
    ) -> Result<IndexMap<u16, Detector>, CoreError> {
        self.send(&CanDetectorScan { network_id })
            .await
            .map_err(|e| CoreError::TriggerSendFailure {
                reason: e.to_string(),
            })?;

        let deadline = Instant::now() + window;
        let mut devices = IndexMap::new();

        loop {
            match timeout_at(deadline, self.events.next()).await {
                // Window closed; an event still in flight is not applied.
                Err(_elapsed) => break,
                // Connection closed mid-window: nothing more can arrive,
                // the accumulated records are already complete.
                Ok(None) => break,
                Ok(Some(Event::CanDetector(report))) => fold_report(&mut devices, &report),
                Ok(Some(other)) => {
                    tracing::trace!(?other, "ignoring non-detector event during scan");
                }
            }
        }

        tracing::debug!(devices = devices.len(), "scan window closed");
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use z21_proto::message::{occupancy, CAN_KIND_OCCUPANCY};

    fn report(network_id: u16, address: u16, port: u8, status: u16) -> CanDetector {
        CanDetector {
            network_id,
            address,
            port,
            kind: CAN_KIND_OCCUPANCY,
            value1: status,
            value2: 0,
        }
    }

    #[test]
    fn folds_reports_per_network_id() {
        let mut devices = IndexMap::new();
        fold_report(&mut devices, &report(0xD001, 1, 0, occupancy::FREE));
        fold_report(&mut devices, &report(0xD002, 2, 0, occupancy::BUSY));
        fold_report(&mut devices, &report(0xD001, 1, 1, occupancy::FREE));

        assert_eq!(devices.len(), 2);
        assert_eq!(devices[&0xD001].ports.len(), 2);
        assert_eq!(devices[&0xD002].ports.len(), 1);
        assert_eq!(devices[&0xD001].address, 1);
    }

    #[test]
    fn first_seen_order_is_preserved() {
        let mut devices = IndexMap::new();
        for nid in [0xD005u16, 0xD001, 0xD003] {
            fold_report(&mut devices, &report(nid, 0, 0, occupancy::FREE));
        }
        let order: Vec<u16> = devices.keys().copied().collect();
        assert_eq!(order, vec![0xD005, 0xD001, 0xD003]);
    }

    #[test]
    fn duplicate_reports_append_not_dedup() {
        // Repeated sightings of the same port within one window are all
        // kept; no layer below presentation deduplicates them.
        let mut devices = IndexMap::new();
        fold_report(&mut devices, &report(0xD001, 1, 3, occupancy::FREE));
        fold_report(&mut devices, &report(0xD001, 1, 3, occupancy::BUSY));

        let ports = &devices[&0xD001].ports;
        assert_eq!(ports.len(), 2);
        assert_eq!(ports[0], DetectorPort { index: 3, status: occupancy::FREE });
        assert_eq!(ports[1], DetectorPort { index: 3, status: occupancy::BUSY });
    }

    #[test]
    fn non_occupancy_reports_are_ignored() {
        let mut devices = IndexMap::new();
        let mut other = report(0xD001, 1, 0, occupancy::FREE);
        other.kind = 0x11;
        fold_report(&mut devices, &other);
        assert!(devices.is_empty());
    }
}
