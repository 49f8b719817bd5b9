// src/registry/state.rs

//! Package install state stored in a package record
//!
//! ```text
//! NotInstalled -> Unpacked -> Installed
//! Installed | Unpacked -> ConfigFiles
//! ```

use crate::error::{Error, Result};
use crate::plist::Dictionary;
use std::fmt;
use std::str::FromStr;

/// Record key holding the install state
pub const STATE_KEY: &str = "state";

/// Install state of a package
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PkgState {
    NotInstalled,
    Unpacked,
    Installed,
    /// Removed, configuration files kept
    ConfigFiles,
}

impl PkgState {
    pub fn as_str(&self) -> &str {
        match self {
            PkgState::NotInstalled => "not-installed",
            PkgState::Unpacked => "unpacked",
            PkgState::Installed => "installed",
            PkgState::ConfigFiles => "config-files",
        }
    }

    /// Whether the package's files are on disk and satisfy an install query
    pub fn is_installed(&self) -> bool {
        matches!(self, PkgState::Unpacked | PkgState::Installed)
    }

    /// Whether moving from this state to `next` is a lifecycle step
    pub fn can_transition_to(&self, next: PkgState) -> bool {
        matches!(
            (self, next),
            (PkgState::NotInstalled, PkgState::Unpacked)
                | (PkgState::Unpacked, PkgState::Installed)
                | (PkgState::Unpacked, PkgState::ConfigFiles)
                | (PkgState::Installed, PkgState::ConfigFiles)
        )
    }
}

impl fmt::Display for PkgState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PkgState {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "not-installed" => Ok(PkgState::NotInstalled),
            "unpacked" => Ok(PkgState::Unpacked),
            "installed" => Ok(PkgState::Installed),
            "config-files" => Ok(PkgState::ConfigFiles),
            _ => Err(format!("Invalid package state: {}", s)),
        }
    }
}

/// Read the install state of a package record
pub fn get_state(record: &Dictionary) -> Result<PkgState> {
    let value = record.get_str(STATE_KEY).ok_or_else(|| {
        Error::InvalidState(format!(
            "record {} has no state",
            record.get_str("pkgname").unwrap_or("<unnamed>")
        ))
    })?;
    value.parse().map_err(Error::InvalidState)
}

/// Store the install state in a package record
pub fn set_state(record: &mut Dictionary, state: PkgState) -> Result<()> {
    record.set(STATE_KEY, state.as_str())?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_strings() {
        for state in [
            PkgState::NotInstalled,
            PkgState::Unpacked,
            PkgState::Installed,
            PkgState::ConfigFiles,
        ] {
            assert_eq!(state.as_str().parse::<PkgState>(), Ok(state));
        }
        assert!("half-installed".parse::<PkgState>().is_err());
    }

    #[test]
    fn test_transitions() {
        assert!(PkgState::NotInstalled.can_transition_to(PkgState::Unpacked));
        assert!(PkgState::Unpacked.can_transition_to(PkgState::Installed));
        assert!(PkgState::Installed.can_transition_to(PkgState::ConfigFiles));
        assert!(!PkgState::NotInstalled.can_transition_to(PkgState::Installed));
        assert!(!PkgState::ConfigFiles.can_transition_to(PkgState::Installed));
        assert!(!PkgState::Installed.can_transition_to(PkgState::Unpacked));
    }

    #[test]
    fn test_get_and_set_state() {
        let mut record = Dictionary::new();
        record.set("pkgname", "foo").unwrap();
        assert!(matches!(get_state(&record), Err(Error::InvalidState(_))));

        set_state(&mut record, PkgState::Unpacked).unwrap();
        assert_eq!(record.get_str(STATE_KEY), Some("unpacked"));
        assert_eq!(get_state(&record).unwrap(), PkgState::Unpacked);

        record.set(STATE_KEY, "bogus").unwrap();
        assert!(matches!(get_state(&record), Err(Error::InvalidState(_))));
    }

    #[test]
    fn test_set_state_on_immutable_record() {
        let mut record = Dictionary::new();
        record.make_immutable();
        assert!(set_state(&mut record, PkgState::Installed).is_err());
    }
}
