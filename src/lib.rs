//! secondseat: a second mouse and keyboard on one X display
//!
//! This library creates an extra primary pointer/keyboard pair through the
//! X input extension and moves one physical mouse and keyboard onto it, so two
//! people can work on the same screen with independent input.

pub mod backend;
pub mod config;
pub mod manager;
pub mod session;
pub mod xinput;

// Re-export commonly used items
pub use backend::{GatewayError, InputGateway, MockGateway, XinputCli};
pub use config::{Config, ConfigError};
pub use manager::{DeviceManager, ManagerError};
pub use session::{AddStage, SeatAssignment, Session, SessionError};
pub use xinput::{Device, DeviceRole, DeviceType, PairingError, PrimaryPair, Snapshot};
