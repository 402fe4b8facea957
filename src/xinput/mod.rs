//! X input device model
//!
//! This module holds everything the device manager reasons about:
//! - Device types and raw record validation
//! - Snapshots, differencing and classification
//! - Primary pair validation
//! - The X server version gate

pub mod pairing;
pub mod snapshot;
pub mod types;
pub mod version;

// Re-export commonly used items
pub use pairing::{validate_pair, PairingError, PrimaryPair};
pub use snapshot::{diff, filter, QueryError, Snapshot};
pub use types::{Device, DeviceRole, DeviceType, RecordError};
pub use version::{ServerVersion, VersionError, REQUIRED_SERVER_VERSION};
