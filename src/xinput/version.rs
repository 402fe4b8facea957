//! X server version gate.
//!
//! Multiple primary pairs need a reasonably recent server; anything below the
//! configured minimum is refused before any device is touched.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Server version required unless the configuration says otherwise
pub const REQUIRED_SERVER_VERSION: &str = "1.20";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VersionError {
    #[error("invalid version '{0}'")]
    Invalid(String),

    #[error("installed X version {found} is lower than required version {required}")]
    Unsupported {
        found: ServerVersion,
        required: ServerVersion,
    },
}

/// Dotted numeric version such as `1.20.13`.
///
/// Missing trailing components compare as zero, so `1.20 == 1.20.0`.
#[derive(Debug, Clone, Eq)]
pub struct ServerVersion(Vec<u64>);

impl ServerVersion {
    /// Fail unless `self` is at least `required`
    pub fn check_at_least(&self, required: &ServerVersion) -> Result<(), VersionError> {
        if self < required {
            return Err(VersionError::Unsupported {
                found: self.clone(),
                required: required.clone(),
            });
        }
        Ok(())
    }

    fn component(&self, i: usize) -> u64 {
        self.0.get(i).copied().unwrap_or(0)
    }
}

impl FromStr for ServerVersion {
    type Err = VersionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if trimmed.is_empty() {
            return Err(VersionError::Invalid(s.to_string()));
        }
        trimmed
            .split('.')
            .map(|part| part.parse::<u64>())
            .collect::<Result<Vec<_>, _>>()
            .map(ServerVersion)
            .map_err(|_| VersionError::Invalid(s.to_string()))
    }
}

impl Ord for ServerVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialOrd for ServerVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ServerVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl fmt::Display for ServerVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(u64::to_string).collect();
        f.write_str(&parts.join("."))
    }
}
