//! Point-in-time view of the device topology.
//!
//! A [`Snapshot`] is an **owned**, read-only map of `id → Device`. It is taken
//! from the gateway in one listing and never patched afterwards; a refresh
//! produces a whole new snapshot.
//!
//! # Semantics
//! - Keys are device ids, which are unique within one listing.
//! - Ids are reused by the X server after a device is removed, so an id only
//!   identifies a device inside a single snapshot.
//! - [`diff`] compares ids only. A device whose id exists in both snapshots is
//!   never reported, even if its attributes changed.

use super::types::{Device, DeviceRole, DeviceType, RecordError};
use crate::backend::{GatewayError, InputGateway};
use log::debug;
use serde::Serialize;
use std::collections::BTreeMap;
use thiserror::Error;

/// Failure to obtain a snapshot
#[derive(Debug, Error)]
pub enum QueryError {
    #[error("device listing failed: {0}")]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    MalformedRecord(#[from] RecordError),

    #[error("device id {0} listed twice")]
    DuplicateId(u32),
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Snapshot(BTreeMap<u32, Device>);

impl Snapshot {
    /// List all devices through the gateway.
    ///
    /// Fails if the listing fails or if any single record is malformed; a
    /// record is never skipped.
    pub fn capture<G: InputGateway + ?Sized>(gateway: &G) -> Result<Self, QueryError> {
        let records = gateway.list_devices()?;
        let snapshot = Self::from_devices(
            records
                .iter()
                .map(Device::from_record)
                .collect::<Result<Vec<_>, _>>()?,
        )?;
        debug!("captured snapshot with {} devices", snapshot.len());
        Ok(snapshot)
    }

    pub fn from_devices(devices: impl IntoIterator<Item = Device>) -> Result<Self, QueryError> {
        let mut map = BTreeMap::new();
        for device in devices {
            let id = device.id;
            if map.insert(id, device).is_some() {
                return Err(QueryError::DuplicateId(id));
            }
        }
        Ok(Self(map))
    }

    #[inline]
    pub fn get(&self, id: u32) -> Option<&Device> {
        self.0.get(&id)
    }

    #[inline]
    pub fn contains(&self, id: u32) -> bool {
        self.0.contains_key(&id)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Devices in ascending id order.
    pub fn devices(&self) -> impl Iterator<Item = &Device> {
        self.0.values()
    }

    /// Secondary devices currently routed through `primary_id`.
    pub fn attached_to(&self, primary_id: u32) -> Vec<&Device> {
        self.devices()
            .filter(|d| d.role == DeviceRole::Secondary && d.primary_id == primary_id)
            .collect()
    }
}

/// Devices whose id is in `new` but not in `old`.
pub fn diff(old: &Snapshot, new: &Snapshot) -> Vec<Device> {
    new.devices()
        .filter(|d| !old.contains(d.id))
        .cloned()
        .collect()
}

/// Keep the devices matching `role` and `device_type`; `None` matches any.
///
/// An empty result is not an error here.
pub fn filter<'a, I>(devices: I, role: Option<DeviceRole>, device_type: Option<DeviceType>) -> Vec<Device>
where
    I: IntoIterator<Item = &'a Device>,
{
    devices
        .into_iter()
        .filter(|d| role.map_or(true, |r| d.role == r))
        .filter(|d| device_type.map_or(true, |t| d.device_type == t))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{DeviceRecord, MockGateway};

    fn baseline() -> Snapshot {
        Snapshot::from_devices(vec![
            Device::primary("A", 1, DeviceType::Pointer, 2),
            Device::primary("A kbd", 2, DeviceType::Keyboard, 1),
        ])
        .unwrap()
    }

    #[test]
    fn test_diff_with_itself_is_empty() {
        let snap = baseline();
        assert!(diff(&snap, &snap).is_empty());
        assert!(diff(&Snapshot::default(), &Snapshot::default()).is_empty());
    }

    #[test]
    fn test_diff_reports_new_ids_only() {
        let old = baseline();
        let new = Snapshot::from_devices(vec![
            // same id, different attributes: not new
            Device::primary("renamed", 1, DeviceType::Pointer, 2),
            Device::primary("A kbd", 2, DeviceType::Keyboard, 1),
            Device::secondary("USB Mouse", 7, DeviceType::Pointer, 1),
        ])
        .unwrap();

        let added = diff(&old, &new);
        assert_eq!(added.len(), 1);
        assert_eq!(added[0].id, 7);
    }

    #[test]
    fn test_diff_ignores_removed_devices() {
        let new = Snapshot::from_devices(vec![Device::primary("A", 1, DeviceType::Pointer, 2)]).unwrap();
        assert!(diff(&baseline(), &new).is_empty());
    }

    #[test]
    fn test_filter_wildcards() {
        let snap = Snapshot::from_devices(vec![
            Device::primary("A", 1, DeviceType::Pointer, 2),
            Device::primary("A kbd", 2, DeviceType::Keyboard, 1),
            Device::secondary("Mouse", 3, DeviceType::Pointer, 1),
            Device::secondary("Keys", 4, DeviceType::Keyboard, 2),
        ])
        .unwrap();

        assert_eq!(filter(snap.devices(), None, None).len(), 4);
        assert_eq!(filter(snap.devices(), Some(DeviceRole::Primary), None).len(), 2);
        let mice = filter(snap.devices(), Some(DeviceRole::Secondary), Some(DeviceType::Pointer));
        assert_eq!(mice.len(), 1);
        assert_eq!(mice[0].name, "Mouse");
        assert_eq!(filter(snap.devices(), None, Some(DeviceType::Keyboard)).len(), 2);
        assert!(filter(Vec::<Device>::new().iter(), Some(DeviceRole::Primary), None).is_empty());
    }

    #[test]
    fn test_duplicate_ids_rejected() {
        let result = Snapshot::from_devices(vec![
            Device::primary("A", 1, DeviceType::Pointer, 2),
            Device::secondary("B", 1, DeviceType::Pointer, 1),
        ]);
        assert!(matches!(result, Err(QueryError::DuplicateId(1))));
    }

    #[test]
    fn test_capture_rejects_malformed_record() {
        let gateway = MockGateway::new();
        gateway.push_raw_record(DeviceRecord {
            name: "Half a device".to_string(),
            id: "12".to_string(),
            role: "slave".to_string(),
            ..DeviceRecord::default()
        });
        assert!(matches!(
            Snapshot::capture(&gateway),
            Err(QueryError::MalformedRecord(_))
        ));
    }

    #[test]
    fn test_capture_and_attached_to() {
        let snap = Snapshot::capture(&MockGateway::new()).unwrap();
        assert_eq!(snap.len(), 4);
        let attached = snap.attached_to(2);
        assert_eq!(attached.len(), 1);
        assert_eq!(attached[0].name, "Virtual core XTEST pointer");
    }
}
