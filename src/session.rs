//! Interactive second-seat workflow
//!
//! Walks the operator through unplugging and replugging the second mouse and
//! keyboard, creates the second seat's primary pair and moves both devices
//! onto it. Prompts go to any [`Write`], answers come from any [`BufRead`],
//! so the whole flow runs against a [`MockGateway`](crate::backend::MockGateway)
//! in tests.

use crate::backend::InputGateway;
use crate::config::Settings;
use crate::manager::{DeviceManager, ManagerError};
use crate::xinput::{Device, DeviceRole, DeviceType, PrimaryPair, Snapshot};
use log::{debug, info, warn};
use std::fmt;
use std::io::{self, BufRead, Write};
use std::thread;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error(transparent)]
    Manager(#[from] ManagerError),

    #[error("expected exactly one new {device_type}, detected {found}")]
    Detection { device_type: DeviceType, found: usize },

    #[error("operator input failed: {0}")]
    Io(#[from] io::Error),
}

/// Progress of the add workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddStage {
    Idle,
    BaselineCaptured,
    AwaitingPointerDisconnect,
    AwaitingPointerReconnect,
    PointerDetected,
    AwaitingKeyboardDisconnect,
    AwaitingKeyboardReconnect,
    KeyboardDetected,
    PrimaryPairCreated,
    PointerReattached,
    KeyboardReattached,
    Done,
}

impl AddStage {
    fn awaiting_disconnect(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Pointer => AddStage::AwaitingPointerDisconnect,
            DeviceType::Keyboard => AddStage::AwaitingKeyboardDisconnect,
        }
    }

    fn awaiting_reconnect(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Pointer => AddStage::AwaitingPointerReconnect,
            DeviceType::Keyboard => AddStage::AwaitingKeyboardReconnect,
        }
    }

    fn detected(device_type: DeviceType) -> Self {
        match device_type {
            DeviceType::Pointer => AddStage::PointerDetected,
            DeviceType::Keyboard => AddStage::KeyboardDetected,
        }
    }
}

impl fmt::Display for AddStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self, f)
    }
}

/// Devices handed to the second seat
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SeatAssignment {
    pub pair: PrimaryPair,
    pub pointer: Device,
    pub keyboard: Device,
}

pub struct Session<'m, G: InputGateway, R: BufRead, W: Write> {
    manager: &'m mut DeviceManager<G>,
    input: R,
    output: W,
    settle_delay: Duration,
    cleanup_on_failure: bool,
    stage: AddStage,
}

impl<'m, G: InputGateway, R: BufRead, W: Write> Session<'m, G, R, W> {
    pub fn new(manager: &'m mut DeviceManager<G>, input: R, output: W, settings: &Settings) -> Self {
        Self {
            manager,
            input,
            output,
            settle_delay: settings.settle_delay(),
            cleanup_on_failure: settings.cleanup_on_failure,
            stage: AddStage::Idle,
        }
    }

    pub fn stage(&self) -> AddStage {
        self.stage
    }

    /// Detect the second pointer and keyboard, create the primary pair
    /// `name` and reattach both devices to it.
    ///
    /// Detection must find exactly one device each time; there is no retry.
    pub fn add_seat(&mut self, name: &str) -> Result<SeatAssignment, SessionError> {
        // the manager took its snapshot when it was built
        self.advance(AddStage::BaselineCaptured);

        let pointer = self.detect_input(DeviceType::Pointer)?;
        let keyboard = self.detect_input(DeviceType::Keyboard)?;

        let pair = self.manager.create_primary_pair(name)?;
        self.advance(AddStage::PrimaryPairCreated);
        writeln!(self.output, "\nSuccessfully created a new primary device for second seat.")?;
        debug!("New primary pointer: {}", pair.pointer);
        debug!("New primary keyboard: {}", pair.keyboard);

        if let Err(e) = self.attach_both(&pair, &pointer, &keyboard) {
            self.cleanup(&pair);
            return Err(e);
        }
        writeln!(self.output, "Successfully reattached devices to second seat.")?;
        writeln!(self.output, "\nHave fun together! ( •ヮ•)八(•ヮ• )")?;
        self.advance(AddStage::Done);

        Ok(SeatAssignment {
            pair,
            pointer,
            keyboard,
        })
    }

    /// Remove the primary pair named `name`, sending its devices back to the
    /// remaining primaries.
    pub fn remove_seat(&mut self, name: &str) -> Result<PrimaryPair, SessionError> {
        self.manager.refresh_state()?;
        let pair = self
            .manager
            .find_primary_pair_by_name(name)
            .map_err(ManagerError::from)?;
        self.manager.remove_primary_pair(pair.pointer.id)?;
        writeln!(self.output, "Second seat successfully removed.")?;
        Ok(pair)
    }

    fn detect_input(&mut self, device_type: DeviceType) -> Result<Device, SessionError> {
        self.advance(AddStage::awaiting_disconnect(device_type));
        write!(
            self.output,
            "\nMake sure the {} for the second seat is disconnected. [↵]",
            device_type
        )?;
        self.confirm()?;
        self.manager.refresh_state()?;

        self.advance(AddStage::awaiting_reconnect(device_type));
        write!(self.output, "Now connect the second {}. [↵]", device_type)?;
        self.confirm()?;
        if !self.settle_delay.is_zero() {
            thread::sleep(self.settle_delay);
        }

        let mut found = self.manager.detect_new_secondaries(device_type)?;
        if found.len() != 1 {
            return Err(SessionError::Detection {
                device_type,
                found: found.len(),
            });
        }
        let device = found.remove(0);
        writeln!(self.output, "Detected new {}: {}", device_type, device.name)?;
        self.advance(AddStage::detected(device_type));
        Ok(device)
    }

    fn attach_both(
        &mut self,
        pair: &PrimaryPair,
        pointer: &Device,
        keyboard: &Device,
    ) -> Result<(), SessionError> {
        self.manager
            .reattach(std::slice::from_ref(pointer), pair.pointer.id)?;
        self.advance(AddStage::PointerReattached);
        self.manager
            .reattach(std::slice::from_ref(keyboard), pair.keyboard.id)?;
        self.advance(AddStage::KeyboardReattached);
        Ok(())
    }

    fn cleanup(&mut self, pair: &PrimaryPair) {
        if !self.cleanup_on_failure {
            return;
        }
        warn!(
            "Reattachment failed, removing primary pair {} / {}",
            pair.pointer.id, pair.keyboard.id
        );
        if let Err(e) = self.manager.remove_primary_pair(pair.pointer.id) {
            warn!("Failed to remove primary pair {}: {}", pair.pointer.id, e);
        }
    }

    /// Wait for the operator to press enter
    fn confirm(&mut self) -> Result<(), SessionError> {
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(io::Error::new(io::ErrorKind::UnexpectedEof, "input closed").into());
        }
        Ok(())
    }

    fn advance(&mut self, stage: AddStage) {
        info!("{} -> {}", self.stage, stage);
        self.stage = stage;
    }
}

/// Print primaries with the secondaries routed through them.
pub fn write_device_tree<W: Write>(snapshot: &Snapshot, out: &mut W) -> io::Result<()> {
    for primary in snapshot.devices().filter(|d| d.role == DeviceRole::Primary) {
        writeln!(
            out,
            "{} (id={}, {}, paired with {})",
            primary.name, primary.id, primary.device_type, primary.primary_id
        )?;
        for device in snapshot.attached_to(primary.id) {
            writeln!(out, "  ↳ {} (id={})", device.name, device.id)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::MockGateway;
    use std::io::Cursor;

    fn settings() -> Settings {
        Settings {
            settle_delay_ms: 0,
            ..Settings::default()
        }
    }

    #[test]
    fn test_nothing_plugged_is_detection_failure() {
        let gateway = MockGateway::new();
        let mut manager = DeviceManager::new(gateway.clone()).unwrap();
        let mut out = Vec::new();
        let mut session = Session::new(&mut manager, Cursor::new("\n\n"), &mut out, &settings());

        let err = session.add_seat("secondseat").unwrap_err();
        assert!(matches!(
            err,
            SessionError::Detection {
                device_type: DeviceType::Pointer,
                found: 0
            }
        ));
        assert_eq!(session.stage(), AddStage::AwaitingPointerReconnect);
        assert!(gateway
            .calls()
            .iter()
            .all(|c| !matches!(c, crate::backend::GatewayCall::CreatePrimary(_))));
    }

    #[test]
    fn test_closed_input_fails() {
        let mut manager = DeviceManager::new(MockGateway::new()).unwrap();
        let mut session = Session::new(&mut manager, Cursor::new(""), Vec::new(), &settings());
        assert!(matches!(session.add_seat("secondseat"), Err(SessionError::Io(_))));
        assert_eq!(session.stage(), AddStage::AwaitingPointerDisconnect);
    }

    #[test]
    fn test_write_device_tree() {
        let gateway = MockGateway::new();
        gateway.plug("USB Mouse", DeviceType::Pointer);
        let manager = DeviceManager::new(gateway).unwrap();

        let mut out = Vec::new();
        write_device_tree(manager.state(), &mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert_eq!(
            text,
            "Virtual core pointer (id=2, pointer, paired with 3)\n\
             \u{20} ↳ Virtual core XTEST pointer (id=4)\n\
             \u{20} ↳ USB Mouse (id=6)\n\
             Virtual core keyboard (id=3, keyboard, paired with 2)\n\
             \u{20} ↳ Virtual core XTEST keyboard (id=5)\n"
        );
    }
}
