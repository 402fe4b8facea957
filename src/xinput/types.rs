//! Device data types

use crate::backend::DeviceRecord;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Semantic class of an input device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    Pointer,
    Keyboard,
}

impl DeviceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeviceType::Pointer => "pointer",
            DeviceType::Keyboard => "keyboard",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeviceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pointer" => Ok(DeviceType::Pointer),
            "keyboard" => Ok(DeviceType::Keyboard),
            other => Err(format!("unknown device type '{}'", other)),
        }
    }
}

/// Ownership role of a device.
///
/// Primary devices are the virtual endpoints (X "master" devices). Secondary
/// devices are physical hardware routed into a primary (X "slave" devices).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceRole {
    Primary,
    Secondary,
}

impl DeviceRole {
    /// Token used by `xinput list`
    pub fn token(&self) -> &'static str {
        match self {
            DeviceRole::Primary => "master",
            DeviceRole::Secondary => "slave",
        }
    }
}

impl fmt::Display for DeviceRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeviceRole::Primary => f.write_str("primary"),
            DeviceRole::Secondary => f.write_str("secondary"),
        }
    }
}

impl FromStr for DeviceRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "master" => Ok(DeviceRole::Primary),
            "slave" => Ok(DeviceRole::Secondary),
            other => Err(format!("unknown device role '{}'", other)),
        }
    }
}

#[derive(Debug, Error)]
#[error("malformed device record {record}: {reason}")]
pub struct RecordError {
    pub record: String,
    pub reason: String,
}

/// One input device as seen in a single snapshot.
///
/// `id` is only unique within one snapshot; the X server hands out freed ids
/// again. For a primary device `primary_id` is its paired partner, for a
/// secondary device it is the primary it is routed through.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    pub name: String,
    pub id: u32,
    pub device_type: DeviceType,
    pub role: DeviceRole,
    pub primary_id: u32,
}

impl Device {
    pub fn primary(name: &str, id: u32, device_type: DeviceType, partner_id: u32) -> Self {
        Self {
            name: name.to_string(),
            id,
            device_type,
            role: DeviceRole::Primary,
            primary_id: partner_id,
        }
    }

    pub fn secondary(name: &str, id: u32, device_type: DeviceType, primary_id: u32) -> Self {
        Self {
            name: name.to_string(),
            id,
            device_type,
            role: DeviceRole::Secondary,
            primary_id,
        }
    }

    pub fn is_primary(&self) -> bool {
        self.role == DeviceRole::Primary
    }

    /// Validate a raw gateway record. Any missing or unreadable field rejects
    /// the whole record.
    pub fn from_record(record: &DeviceRecord) -> Result<Self, RecordError> {
        let reject = |reason: String| RecordError {
            record: record.to_string(),
            reason,
        };

        if record.name.trim().is_empty() {
            return Err(reject("missing name".to_string()));
        }
        let id = record
            .id
            .parse::<u32>()
            .map_err(|_| reject(format!("invalid id '{}'", record.id)))?;
        let role = record.role.parse::<DeviceRole>().map_err(reject)?;
        let device_type = record.kind.parse::<DeviceType>().map_err(reject)?;
        let primary_id = record
            .link
            .parse::<u32>()
            .map_err(|_| reject(format!("invalid primary link '{}'", record.link)))?;

        Ok(Self {
            name: record.name.clone(),
            id,
            device_type,
            role,
            primary_id,
        })
    }

    pub fn to_record(&self) -> DeviceRecord {
        DeviceRecord {
            name: self.name.clone(),
            id: self.id.to_string(),
            role: self.role.token().to_string(),
            kind: self.device_type.as_str().to_string(),
            link: self.primary_id.to_string(),
        }
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} (id={}, {} {}, linked to {})",
            self.name, self.id, self.role, self.device_type, self.primary_id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, id: &str, role: &str, kind: &str, link: &str) -> DeviceRecord {
        DeviceRecord {
            name: name.to_string(),
            id: id.to_string(),
            role: role.to_string(),
            kind: kind.to_string(),
            link: link.to_string(),
        }
    }

    #[test]
    fn test_from_record() {
        let device = Device::from_record(&record("USB Mouse", "9", "slave", "pointer", "2")).unwrap();
        assert_eq!(device, Device::secondary("USB Mouse", 9, DeviceType::Pointer, 2));
    }

    #[test]
    fn test_from_record_rejects_missing_fields() {
        assert!(Device::from_record(&record("", "9", "slave", "pointer", "2")).is_err());
        assert!(Device::from_record(&record("Mouse", "", "slave", "pointer", "2")).is_err());
        assert!(Device::from_record(&record("Mouse", "9", "", "pointer", "2")).is_err());
        assert!(Device::from_record(&record("Mouse", "9", "slave", "", "2")).is_err());
        assert!(Device::from_record(&record("Mouse", "9", "slave", "pointer", "")).is_err());
    }

    #[test]
    fn test_from_record_rejects_unknown_tokens() {
        let err = Device::from_record(&record("Pen", "9", "slave", "tablet", "2")).unwrap_err();
        assert!(err.reason.contains("tablet"));
        assert!(Device::from_record(&record("Pen", "9", "floating", "pointer", "2")).is_err());
    }

    #[test]
    fn test_record_conversion_keeps_fields() {
        let device = Device::primary("Virtual core keyboard", 3, DeviceType::Keyboard, 2);
        assert_eq!(Device::from_record(&device.to_record()).unwrap(), device);
    }
}
