//! Session segmentation.
//!
//! Groups [`SignalRecord`]s by device and splits each device's time-ordered
//! readings wherever two consecutive readings are more than
//! [`SESSION_GAP_SECS`] apart.

use chrono::TimeDelta;
use session_core::models::{NoResultReason, SignalRecord, SESSION_GAP_SECS};
use tracing::{debug, info};

/// Devices with fewer readings than this contribute no sessions.
pub const MIN_DEVICE_RECORDS: usize = 2;

// ── DeviceGroup ───────────────────────────────────────────────────────────────

/// All readings of one device, ordered by timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviceGroup {
    pub mac: String,
    pub records: Vec<SignalRecord>,
}

// ── SessionSegmenter ──────────────────────────────────────────────────────────

/// Splits device readings into sessions on the fixed reconnection gap.
pub struct SessionSegmenter {
    gap: TimeDelta,
}

impl Default for SessionSegmenter {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionSegmenter {
    pub fn new() -> Self {
        Self {
            gap: TimeDelta::seconds(SESSION_GAP_SECS),
        }
    }

    /// Sort `records` by (device, timestamp) and cut them into per-device
    /// groups.
    ///
    /// The sort is stable, so readings sharing a timestamp keep their input
    /// order. Records without a device identifier belong to no group.
    pub fn group_by_device(
        &self,
        mut records: Vec<SignalRecord>,
    ) -> Result<Vec<DeviceGroup>, NoResultReason> {
        records.retain(|r| !r.mac.is_empty());
        records.sort_by(|a, b| a.mac.cmp(&b.mac).then(a.timestamp.cmp(&b.timestamp)));

        let mut groups: Vec<DeviceGroup> = Vec::new();
        for record in records {
            match groups.last_mut() {
                Some(group) if group.mac == record.mac => group.records.push(record),
                _ => groups.push(DeviceGroup {
                    mac: record.mac.clone(),
                    records: vec![record],
                }),
            }
        }

        info!("Distinct devices: {}", groups.len());
        if groups.is_empty() {
            return Err(NoResultReason::NoMacAddresses);
        }
        Ok(groups)
    }

    /// Split one device's time-ordered readings into sessions.
    ///
    /// A device with fewer than [`MIN_DEVICE_RECORDS`] readings yields
    /// nothing. Otherwise a new session starts at every reading that follows
    /// its predecessor by more than the gap. The trailing session is always
    /// emitted, even when it holds a single reading.
    pub fn split_sessions<'a>(&self, records: &'a [SignalRecord]) -> Vec<&'a [SignalRecord]> {
        if records.len() < MIN_DEVICE_RECORDS {
            return Vec::new();
        }

        let mut segments = Vec::new();
        let mut start = 0;
        for i in 1..records.len() {
            if records[i].timestamp - records[i - 1].timestamp > self.gap {
                segments.push(&records[start..i]);
                start = i;
            }
        }
        segments.push(&records[start..]);

        if let Some(first) = records.first() {
            debug!("Device {}: {} session(s)", first.mac, segments.len());
        }
        segments
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
