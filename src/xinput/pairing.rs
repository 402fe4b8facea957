//! Primary pair validation
//!
//! The X server gives no guarantee that `create-master` yields one consistent
//! pointer/keyboard pair, and a lookup by name can match anything. Every path
//! that produces a primary pair goes through [`validate_pair`].

use super::types::{Device, DeviceType};
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PairingError {
    #[error("expected 2 primary devices, got {0}")]
    WrongCount(usize),

    #[error("primary devices have invalid types: {first} and {second}")]
    TypeMismatch { first: DeviceType, second: DeviceType },

    #[error("primary devices do not point to each other: pointer {pointer} -> {pointer_link}, keyboard {keyboard} -> {keyboard_link}")]
    LinkMismatch {
        pointer: u32,
        pointer_link: u32,
        keyboard: u32,
        keyboard_link: u32,
    },
}

/// A validated primary pointer and its primary keyboard.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrimaryPair {
    pub pointer: Device,
    pub keyboard: Device,
}

/// Check that `candidates` is exactly one primary pointer and one primary
/// keyboard referencing each other, and return them as (pointer, keyboard).
///
/// The two candidates are ordered by a single swap; there is no search over
/// larger inputs.
pub fn validate_pair(candidates: &[Device]) -> Result<PrimaryPair, PairingError> {
    let [first, second] = candidates else {
        return Err(PairingError::WrongCount(candidates.len()));
    };

    let (mut pointer, mut keyboard) = (first, second);
    if pointer.device_type != DeviceType::Pointer {
        std::mem::swap(&mut pointer, &mut keyboard);
    }
    if pointer.device_type != DeviceType::Pointer || keyboard.device_type != DeviceType::Keyboard {
        return Err(PairingError::TypeMismatch {
            first: first.device_type,
            second: second.device_type,
        });
    }

    if pointer.primary_id != keyboard.id || keyboard.primary_id != pointer.id {
        return Err(PairingError::LinkMismatch {
            pointer: pointer.id,
            pointer_link: pointer.primary_id,
            keyboard: keyboard.id,
            keyboard_link: keyboard.primary_id,
        });
    }

    Ok(PrimaryPair {
        pointer: pointer.clone(),
        keyboard: keyboard.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pointer() -> Device {
        Device::primary("B pointer", 3, DeviceType::Pointer, 4)
    }

    fn keyboard() -> Device {
        Device::primary("B keyboard", 4, DeviceType::Keyboard, 3)
    }

    #[test]
    fn test_order_independent() {
        let a = validate_pair(&[pointer(), keyboard()]).unwrap();
        let b = validate_pair(&[keyboard(), pointer()]).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.pointer.id, 3);
        assert_eq!(a.keyboard.id, 4);
    }

    #[test]
    fn test_wrong_count() {
        assert_eq!(validate_pair(&[]), Err(PairingError::WrongCount(0)));
        assert_eq!(validate_pair(&[pointer()]), Err(PairingError::WrongCount(1)));
        let extra = Device::primary("C pointer", 5, DeviceType::Pointer, 6);
        assert_eq!(
            validate_pair(&[pointer(), keyboard(), extra]),
            Err(PairingError::WrongCount(3))
        );
    }

    #[test]
    fn test_same_type_rejected() {
        let other = Device::primary("C pointer", 4, DeviceType::Pointer, 3);
        assert!(matches!(
            validate_pair(&[pointer(), other]),
            Err(PairingError::TypeMismatch { .. })
        ));
        let other = Device::primary("C keyboard", 3, DeviceType::Keyboard, 4);
        assert!(matches!(
            validate_pair(&[other, keyboard()]),
            Err(PairingError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_broken_link_rejected() {
        let stray = Device::primary("C keyboard", 6, DeviceType::Keyboard, 5);
        assert!(matches!(
            validate_pair(&[pointer(), stray]),
            Err(PairingError::LinkMismatch { pointer: 3, keyboard: 6, .. })
        ));

        let half = Device::primary("B keyboard", 4, DeviceType::Keyboard, 9);
        assert!(matches!(
            validate_pair(&[half, pointer()]),
            Err(PairingError::LinkMismatch { .. })
        ));
    }
}
