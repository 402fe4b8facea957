//! Mock gateway for testing.
//!
//! Simulates an X server device tree in memory instead of spawning `xinput`.
//! Clones share the same tree, so a test can keep a handle while the device
//! manager owns another one. Every call is recorded and individual operations
//! can be told to fail.

use super::{DeviceRecord, GatewayError, InputGateway};
use crate::xinput::{Device, DeviceRole, DeviceType};
use log::info;
use std::sync::{Arc, Mutex, MutexGuard};

/// A call received by the mock, in order of arrival.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GatewayCall {
    ListDevices,
    CreatePrimary(String),
    RemovePrimary(u32),
    Reattach { device_id: u32, primary_id: u32 },
    ServerVersion,
}

/// Operation the mock should reject.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailOn {
    List,
    Create,
    Remove,
    /// Reattaching this device id
    Reattach(u32),
}

#[derive(Debug, Default)]
struct MockState {
    devices: Vec<Device>,
    raw_records: Vec<DeviceRecord>,
    create_result: Option<Vec<Device>>,
    failures: Vec<FailOn>,
    calls: Vec<GatewayCall>,
    server_version: String,
}

#[derive(Clone, Debug)]
pub struct MockGateway {
    state: Arc<Mutex<MockState>>,
}

impl MockGateway {
    /// A tree holding only the virtual core pair and its XTEST devices.
    pub fn new() -> Self {
        Self::with_devices(vec![
            Device::primary("Virtual core pointer", 2, DeviceType::Pointer, 3),
            Device::primary("Virtual core keyboard", 3, DeviceType::Keyboard, 2),
            Device::secondary("Virtual core XTEST pointer", 4, DeviceType::Pointer, 2),
            Device::secondary("Virtual core XTEST keyboard", 5, DeviceType::Keyboard, 3),
        ])
    }

    pub fn with_devices(devices: Vec<Device>) -> Self {
        Self {
            state: Arc::new(Mutex::new(MockState {
                devices,
                server_version: "1.20.13".to_string(),
                ..MockState::default()
            })),
        }
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Simulate plugging in a physical device; it lands on the first primary
    /// of its type. Returns the id it was given.
    pub fn plug(&self, name: &str, device_type: DeviceType) -> u32 {
        let mut state = self.lock();
        let primary = state
            .devices
            .iter()
            .filter(|d| d.role == DeviceRole::Primary && d.device_type == device_type)
            .map(|d| d.id)
            .min()
            .unwrap_or(0);
        let id = free_id(&state.devices, &[]);
        state
            .devices
            .push(Device::secondary(name, id, device_type, primary));
        info!("[MOCK GATEWAY] plugged '{}' as id {}", name, id);
        id
    }

    pub fn unplug(&self, id: u32) {
        self.lock().devices.retain(|d| d.id != id);
    }

    /// Add a record that is listed verbatim after the simulated devices.
    pub fn push_raw_record(&self, record: DeviceRecord) {
        self.lock().raw_records.push(record);
    }

    /// Devices the next `create_primary` call adds, instead of the usual
    /// pointer/keyboard pair with XTEST devices.
    pub fn set_create_result(&self, devices: Vec<Device>) {
        self.lock().create_result = Some(devices);
    }

    pub fn set_server_version(&self, version: &str) {
        self.lock().server_version = version.to_string();
    }

    pub fn fail_on(&self, op: FailOn) {
        self.lock().failures.push(op);
    }

    pub fn clear_failures(&self) {
        self.lock().failures.clear();
    }

    pub fn calls(&self) -> Vec<GatewayCall> {
        self.lock().calls.clone()
    }

    pub fn devices(&self) -> Vec<Device> {
        self.lock().devices.clone()
    }

    pub fn device(&self, id: u32) -> Option<Device> {
        self.lock().devices.iter().find(|d| d.id == id).cloned()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

impl InputGateway for MockGateway {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ListDevices);
        if state.failures.contains(&FailOn::List) {
            return Err(failed("xinput list", "unable to connect to X server"));
        }
        let mut records: Vec<DeviceRecord> = state.devices.iter().map(Device::to_record).collect();
        records.extend(state.raw_records.iter().cloned());
        Ok(records)
    }

    fn create_primary(&self, name: &str) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::CreatePrimary(name.to_string()));
        if state.failures.contains(&FailOn::Create) {
            return Err(failed("xinput create-master", "BadAlloc"));
        }

        if let Some(devices) = state.create_result.take() {
            state.devices.extend(devices);
            return Ok(());
        }

        let pointer = free_id(&state.devices, &[]);
        let keyboard = free_id(&state.devices, &[pointer]);
        let xtest_pointer = free_id(&state.devices, &[pointer, keyboard]);
        let xtest_keyboard = free_id(&state.devices, &[pointer, keyboard, xtest_pointer]);
        state.devices.extend([
            Device::primary(&format!("{name} pointer"), pointer, DeviceType::Pointer, keyboard),
            Device::primary(&format!("{name} keyboard"), keyboard, DeviceType::Keyboard, pointer),
            Device::secondary(
                &format!("{name} XTEST pointer"),
                xtest_pointer,
                DeviceType::Pointer,
                pointer,
            ),
            Device::secondary(
                &format!("{name} XTEST keyboard"),
                xtest_keyboard,
                DeviceType::Keyboard,
                keyboard,
            ),
        ]);
        info!("[MOCK GATEWAY] created primary pair '{}' ({}, {})", name, pointer, keyboard);
        Ok(())
    }

    fn remove_primary(&self, id: u32) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::RemovePrimary(id));
        if state.failures.contains(&FailOn::Remove) {
            return Err(failed("xinput remove-master", "BadDevice"));
        }

        let partner = match state.devices.iter().find(|d| d.id == id) {
            Some(d) if d.role == DeviceRole::Primary => d.primary_id,
            _ => return Err(failed("xinput remove-master", "BadDevice")),
        };
        let removed = [id, partner];

        // XTEST devices die with their primary, the rest fall back to the
        // remaining primary of their type.
        state.devices.retain(|d| {
            !removed.contains(&d.id) && !(removed.contains(&d.primary_id) && d.name.contains("XTEST"))
        });
        let fallbacks: Vec<(DeviceType, u32)> = [DeviceType::Pointer, DeviceType::Keyboard]
            .into_iter()
            .filter_map(|t| {
                state
                    .devices
                    .iter()
                    .filter(|d| d.role == DeviceRole::Primary && d.device_type == t)
                    .map(|d| d.id)
                    .min()
                    .map(|id| (t, id))
            })
            .collect();
        for device in state.devices.iter_mut() {
            if device.role == DeviceRole::Secondary && removed.contains(&device.primary_id) {
                if let Some((_, fallback)) = fallbacks.iter().find(|(t, _)| *t == device.device_type) {
                    device.primary_id = *fallback;
                }
            }
        }
        info!("[MOCK GATEWAY] removed primary pair ({}, {})", id, partner);
        Ok(())
    }

    fn reattach(&self, device_id: u32, primary_id: u32) -> Result<(), GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::Reattach {
            device_id,
            primary_id,
        });
        if state.failures.contains(&FailOn::Reattach(device_id)) {
            return Err(failed("xinput reattach", "BadDevice"));
        }

        let target_type = match state.devices.iter().find(|d| d.id == primary_id) {
            Some(d) if d.role == DeviceRole::Primary => d.device_type,
            _ => return Err(failed("xinput reattach", "BadDevice")),
        };
        match state.devices.iter_mut().find(|d| d.id == device_id) {
            Some(d) if d.role == DeviceRole::Secondary && d.device_type == target_type => {
                d.primary_id = primary_id;
                Ok(())
            }
            _ => Err(failed("xinput reattach", "BadDevice")),
        }
    }

    fn server_version(&self) -> Result<String, GatewayError> {
        let mut state = self.lock();
        state.calls.push(GatewayCall::ServerVersion);
        Ok(state.server_version.clone())
    }
}

/// Lowest id from 2 upward that is neither live nor reserved.
fn free_id(devices: &[Device], reserved: &[u32]) -> u32 {
    (2..)
        .find(|id| !reserved.contains(id) && devices.iter().all(|d| d.id != *id))
        .unwrap_or(u32::MAX)
}

fn failed(command: &str, stderr: &str) -> GatewayError {
    GatewayError::CommandFailed {
        command: command.to_string(),
        stderr: stderr.to_string(),
    }
}
