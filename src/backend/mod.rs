//! Gateway abstraction over the X input device tooling
//!
//! This module provides a unified interface for listing, creating, removing
//! and reattaching X input devices. The device manager only talks to the
//! [`InputGateway`] trait, so it can be driven by the real `xinput` tool or by
//! the scripted [`MockGateway`] in tests.

pub mod mock_gateway;
pub mod xinput_cli;

pub use mock_gateway::{FailOn, GatewayCall, MockGateway};
pub use xinput_cli::XinputCli;

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("{command} failed with output '{stderr}'")]
    CommandFailed { command: String, stderr: String },

    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    #[error("unreadable output from {command}: {reason}")]
    InvalidOutput { command: String, reason: String },
}

/// One device line as reported by the gateway, before validation.
///
/// Every field is kept as raw text. A field the gateway could not find is an
/// empty string; turning a record into a [`Device`](crate::xinput::Device)
/// rejects it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceRecord {
    pub name: String,
    pub id: String,
    pub role: String,
    pub kind: String,
    pub link: String,
}

impl fmt::Display for DeviceRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "'{}' id={} [{} {} ({})]",
            self.name, self.id, self.role, self.kind, self.link
        )
    }
}

/// Operations the device manager issues to the operating environment.
///
/// All calls are blocking and single-shot. None of them is idempotent:
/// calling [`create_primary`](InputGateway::create_primary) twice creates two
/// pairs.
pub trait InputGateway {
    /// List every pointer and keyboard device currently known to the X server
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, GatewayError>;

    /// Create a new primary pointer/keyboard pair
    fn create_primary(&self, name: &str) -> Result<(), GatewayError>;

    /// Remove a primary device; its paired partner goes with it
    fn remove_primary(&self, id: u32) -> Result<(), GatewayError>;

    /// Route a secondary device through another primary
    fn reattach(&self, device_id: u32, primary_id: u32) -> Result<(), GatewayError>;

    /// Installed X server version string, e.g. `1.20.13`
    fn server_version(&self) -> Result<String, GatewayError>;
}

impl<G: InputGateway + ?Sized> InputGateway for &G {
    fn list_devices(&self) -> Result<Vec<DeviceRecord>, GatewayError> {
        (**self).list_devices()
    }

    fn create_primary(&self, name: &str) -> Result<(), GatewayError> {
        (**self).create_primary(name)
    }

    fn remove_primary(&self, id: u32) -> Result<(), GatewayError> {
        (**self).remove_primary(id)
    }

    fn reattach(&self, device_id: u32, primary_id: u32) -> Result<(), GatewayError> {
        (**self).reattach(device_id, primary_id)
    }

    fn server_version(&self) -> Result<String, GatewayError> {
        (**self).server_version()
    }
}
