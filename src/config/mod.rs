pub mod path;

use std::{collections::BTreeMap, io, path::Path};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::FEATURE_REPORT_SIZE;

/// Payload index of the optional SET_REPORT command byte
pub const SET_COMMAND_OFFSET: usize = 1;

/// Represents all possible errors loading a [ManufacturerProfile]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
    #[error("Invalid profile '{name}': {reason}")]
    InvalidProfile { name: String, reason: String },
}

/// Errors looking up a manufacturer in the [ProfileRegistry]
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Manufacturer '{0}' is not registered")]
    UnsupportedManufacturer(String),
}

/// Touch controller parameters for one manufacturer. The layout of the touch
/// mode feature report differs between manufacturers, so everything the codec
/// needs to address the mode byte is carried here.
#[derive(Debug, Deserialize, Serialize, Clone, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct ManufacturerProfile {
    /// Manufacturer string descriptor of the device (e.g. "NanoTS")
    pub name: String,
    /// Report id of the touch mode feature report
    pub touch_mode_report_id: u8,
    /// Byte index of the mode field inside the 8-byte feature report
    pub touch_mode_offset: usize,
    /// Byte placed at payload index 1 of a SET_REPORT, if the controller
    /// expects one
    #[serde(default)]
    pub set_command: Option<u8>,
    /// Marker byte denoting a valid touch in the interrupt report, if known
    #[serde(default)]
    pub valid_touch_marker: Option<u8>,
    /// Human readable label for every mode code the device can report
    #[serde(default)]
    pub mode_labels: BTreeMap<u8, String>,
}

impl ManufacturerProfile {
    /// Load a [ManufacturerProfile] from the given YAML string
    pub fn from_yaml(content: String) -> Result<ManufacturerProfile, LoadError> {
        let profile: ManufacturerProfile = serde_yaml::from_str(content.as_str())?;
        profile.validate()?;
        Ok(profile)
    }

    /// Load a [ManufacturerProfile] from the given YAML file
    pub fn from_yaml_file<P>(path: P) -> Result<ManufacturerProfile, LoadError>
    where
        P: AsRef<Path>,
    {
        let file = std::fs::File::open(path)?;
        let profile: ManufacturerProfile = serde_yaml::from_reader(file)?;
        profile.validate()?;
        Ok(profile)
    }

    /// Check that the report layout fits the 8-byte feature report. Byte 0
    /// always carries the report id.
    pub fn validate(&self) -> Result<(), LoadError> {
        let invalid = |reason: String| LoadError::InvalidProfile {
            name: self.name.clone(),
            reason,
        };
        if self.name.trim().is_empty() {
            return Err(invalid("name must not be empty".to_string()));
        }
        if self.touch_mode_offset == 0 || self.touch_mode_offset >= FEATURE_REPORT_SIZE {
            return Err(invalid(format!(
                "touch_mode_offset {} must be within 1..{FEATURE_REPORT_SIZE}",
                self.touch_mode_offset
            )));
        }
        if self.set_command.is_some() && self.touch_mode_offset == SET_COMMAND_OFFSET {
            return Err(invalid(format!(
                "set_command collides with touch_mode_offset {SET_COMMAND_OFFSET}"
            )));
        }
        Ok(())
    }

    /// Returns the label for the given mode code
    pub fn label(&self, code: u8) -> Option<&str> {
        self.mode_labels.get(&code).map(|label| label.as_str())
    }
}

/// Profiles compiled into the binary.
///
/// Only the "NanoTS" and "Gamesman" control layouts have been observed on
/// hardware. Gamesman has no known mode labels, so its codes are shown raw.
pub fn builtin_profiles() -> Vec<ManufacturerProfile> {
    vec![
        ManufacturerProfile {
            name: "NanoTS".to_string(),
            touch_mode_report_id: 0xA3,
            touch_mode_offset: 2,
            set_command: None,
            valid_touch_marker: None,
            mode_labels: BTreeMap::from([
                (0x00, "Single Touch (Mouse)".to_string()),
                (0x01, "Multi Touch (Digitizer)".to_string()),
            ]),
        },
        ManufacturerProfile {
            name: "Gamesman".to_string(),
            touch_mode_report_id: 0xA0,
            touch_mode_offset: 3,
            set_command: Some(0x3A),
            valid_touch_marker: None,
            mode_labels: BTreeMap::new(),
        },
    ]
}

/// Authoritative set of [ManufacturerProfile] keyed by manufacturer name.
/// Built once at startup and read-only afterwards.
#[derive(Debug, Clone, Default)]
pub struct ProfileRegistry {
    profiles: BTreeMap<String, ManufacturerProfile>,
}

impl ProfileRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a registry holding the built-in profiles
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for profile in builtin_profiles() {
            if let Err(e) = registry.insert(profile) {
                log::error!("Invalid built-in profile: {e}");
            }
        }
        registry
    }

    /// Create a registry from the built-in profiles followed by every profile
    /// file found in the given directories. Files that fail to load are skipped.
    pub fn load(paths: &[std::path::PathBuf]) -> Self {
        let mut registry = Self::builtin();
        let files = path::get_multidir_sorted_files(paths, |entry| {
            let name = entry.file_name();
            let name = name.to_string_lossy();
            name.ends_with(".yaml") || name.ends_with(".yml")
        });
        for file in files {
            match ManufacturerProfile::from_yaml_file(&file) {
                Ok(profile) => {
                    log::debug!("Loaded manufacturer profile '{}' from {file:?}", profile.name);
                    match registry.insert(profile) {
                        Ok(Some(old)) => {
                            log::debug!("Replaced manufacturer profile '{}'", old.name)
                        }
                        Ok(None) => (),
                        Err(e) => log::warn!("Skipping manufacturer profile {file:?}: {e}"),
                    }
                }
                Err(e) => log::warn!("Failed to load manufacturer profile {file:?}: {e}"),
            }
        }

        registry
    }

    /// Add a profile, replacing and returning any profile with the same name.
    /// The name is stored trimmed. Fails if the profile does not validate.
    pub fn insert(
        &mut self,
        mut profile: ManufacturerProfile,
    ) -> Result<Option<ManufacturerProfile>, LoadError> {
        profile.name = profile.name.trim().to_string();
        profile.validate()?;
        Ok(self.profiles.insert(profile.name.clone(), profile))
    }

    /// Look up the profile for the given manufacturer string
    pub fn lookup(&self, name: &str) -> Result<&ManufacturerProfile, RegistryError> {
        self.profiles
            .get(name.trim())
            .ok_or_else(|| RegistryError::UnsupportedManufacturer(name.to_string()))
    }

    /// Names of all registered manufacturers in sorted order
    pub fn names(&self) -> Vec<&str> {
        self.profiles.keys().map(|name| name.as_str()).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = &ManufacturerProfile> {
        self.profiles.values()
    }
}
