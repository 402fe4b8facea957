//! High-level device manager
//!
//! This module keeps the last known device snapshot and composes the gateway
//! calls, snapshot diffing and pair validation into the operations the seat
//! workflow needs. Every mutating operation takes a fresh snapshot afterwards
//! so the next diff starts from the real topology.

use crate::backend::{GatewayError, InputGateway};
use crate::xinput::{
    diff, filter, validate_pair, Device, DeviceRole, DeviceType, PairingError, PrimaryPair,
    QueryError, ServerVersion, Snapshot, VersionError,
};
use log::{debug, info, warn};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ManagerError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Query(#[from] QueryError),

    #[error(transparent)]
    Pairing(#[from] PairingError),

    #[error(transparent)]
    Version(#[from] VersionError),

    /// Reattachment stopped at `device_id`; the devices in `reattached` were
    /// already moved and stay where they are.
    #[error("reattaching device {device_id} failed after {} succeeded: {source}", .reattached.len())]
    Reattach {
        device_id: u32,
        reattached: Vec<u32>,
        #[source]
        source: GatewayError,
    },
}

/// Manager for X input devices, holding the last known [`Snapshot`]
pub struct DeviceManager<G: InputGateway> {
    gateway: G,
    state: Snapshot,
}

impl<G: InputGateway> DeviceManager<G> {
    /// Create a manager and take the baseline snapshot.
    pub fn new(gateway: G) -> Result<Self, ManagerError> {
        let state = Snapshot::capture(&gateway)?;
        info!("Loaded {} input devices", state.len());
        Ok(Self { gateway, state })
    }

    /// Like [`new`](Self::new), but refuses X servers older than `required`.
    pub fn connect(gateway: G, required: &ServerVersion) -> Result<Self, ManagerError> {
        let found: ServerVersion = gateway.server_version()?.parse()?;
        debug!("X server version {} (required {})", found, required);
        found.check_at_least(required)?;
        Self::new(gateway)
    }

    /// Last known snapshot (for listing and debugging)
    pub fn state(&self) -> &Snapshot {
        &self.state
    }

    pub fn gateway(&self) -> &G {
        &self.gateway
    }

    /// Replace the snapshot with a fresh listing.
    pub fn refresh_state(&mut self) -> Result<(), ManagerError> {
        self.state = Snapshot::capture(&self.gateway)?;
        Ok(())
    }

    pub fn list_primaries(&self) -> Vec<Device> {
        filter(self.state.devices(), Some(DeviceRole::Primary), None)
    }

    /// Primary pair whose device names contain `name` (case-sensitive).
    ///
    /// Uses the current snapshot; call [`refresh_state`](Self::refresh_state)
    /// first for a live answer.
    pub fn find_primary_pair_by_name(&self, name: &str) -> Result<PrimaryPair, PairingError> {
        let matches: Vec<Device> = self
            .list_primaries()
            .into_iter()
            .filter(|d| d.name.contains(name))
            .collect();
        validate_pair(&matches)
    }

    /// Create a new primary pair named `name` and return it once validated.
    pub fn create_primary_pair(&mut self, name: &str) -> Result<PrimaryPair, ManagerError> {
        self.gateway.create_primary(name)?;
        let created = self.detect_new_primaries()?;
        let pair = validate_pair(&created)?;
        info!(
            "Created primary pair '{}' (pointer {}, keyboard {})",
            name, pair.pointer.id, pair.keyboard.id
        );
        Ok(pair)
    }

    /// Remove the primary pair containing `id`. The partner device is removed
    /// by the X server along with it.
    pub fn remove_primary_pair(&mut self, id: u32) -> Result<(), ManagerError> {
        self.gateway.remove_primary(id)?;
        info!("Removed primary pair containing device {}", id);
        self.refresh_state()
    }

    /// Primary devices that appeared since the last snapshot.
    pub fn detect_new_primaries(&mut self) -> Result<Vec<Device>, ManagerError> {
        let added = self.detect_new()?;
        Ok(filter(&added, Some(DeviceRole::Primary), None))
    }

    /// Secondary devices of `device_type` that appeared since the last
    /// snapshot. An empty result is returned as-is.
    pub fn detect_new_secondaries(&mut self, device_type: DeviceType) -> Result<Vec<Device>, ManagerError> {
        let added = self.detect_new()?;
        Ok(filter(&added, Some(DeviceRole::Secondary), Some(device_type)))
    }

    /// Route every device in `devices` through `primary_id`, in order.
    ///
    /// Stops at the first failure without undoing earlier reattachments and
    /// without refreshing the snapshot.
    pub fn reattach(&mut self, devices: &[Device], primary_id: u32) -> Result<(), ManagerError> {
        let mut reattached = Vec::with_capacity(devices.len());
        for device in devices {
            debug!("reattaching {} to {}", device.id, primary_id);
            if let Err(source) = self.gateway.reattach(device.id, primary_id) {
                if !reattached.is_empty() {
                    warn!("Devices {:?} stay attached to {}", reattached, primary_id);
                }
                return Err(ManagerError::Reattach {
                    device_id: device.id,
                    reattached,
                    source,
                });
            }
            reattached.push(device.id);
        }
        self.refresh_state()
    }

    fn detect_new(&mut self) -> Result<Vec<Device>, ManagerError> {
        let old = std::mem::take(&mut self.state);
        match Snapshot::capture(&self.gateway) {
            Ok(new) => {
                let added = diff(&old, &new);
                debug!("{} new devices since last snapshot", added.len());
                self.state = new;
                Ok(added)
            }
            Err(e) => {
                self.state = old;
                Err(e.into())
            }
        }
    }
}
