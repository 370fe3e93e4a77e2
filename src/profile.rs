//! Machine Profiles
//!
//! A profile holds the machine constants a compensation run depends on:
//! stepper resolution, split length, fixture position and the slicer's layer
//! markers. Profiles are TOML files; one default profile is embedded in the
//! binary and user profiles are loaded from profile directories.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::compensation::layerwise::DEFAULT_Z_RESOLUTION;
use crate::compensation::surface::DEFAULT_FIXTURE_OFFSET;
use crate::compensation::{RapidPolicy, ensure_positive};
use crate::core::assembler::{DEFAULT_LAYER_MARKER, DEFAULT_RAFT_END_MARKER, ParseOptions};
use crate::error::{ProfileError, Result};
use crate::split::DEFAULT_SEGMENT_LENGTH;

pub const DEFAULT_PROFILE_NAME: &str = "default";

const EMBEDDED_DEFAULT: &str = include_str!("../resources/profiles/default.toml");

/// Root profile file structure (matches TOML)
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProfileFile {
    pub profile: ProfileMeta,
    #[serde(default)]
    pub stepper: StepperSettings,
    #[serde(default)]
    pub splitting: SplitSettings,
    #[serde(default)]
    pub surface: SurfaceSettings,
    #[serde(default)]
    pub layers: LayerSettings,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProfileMeta {
    pub name: String,
    pub description: Option<String>,
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct StepperSettings {
    /// Z travel of one full motor step (mm)
    pub z_resolution: f64,
}

impl Default for StepperSettings {
    fn default() -> Self {
        Self {
            z_resolution: DEFAULT_Z_RESOLUTION,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SplitSettings {
    pub enabled: bool,
    pub segment_length: f64,
    /// Write every destination axis into layer motion commands
    pub explicit: bool,
}

impl Default for SplitSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            segment_length: DEFAULT_SEGMENT_LENGTH,
            explicit: true,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct SurfaceSettings {
    pub fixture_offset_x: f64,
    pub fixture_offset_y: f64,
    /// Height below which the planar model applies no correction
    pub reference_plane_offset: f64,
    pub rapid_policy: RapidPolicy,
}

impl Default for SurfaceSettings {
    fn default() -> Self {
        Self {
            fixture_offset_x: DEFAULT_FIXTURE_OFFSET.0,
            fixture_offset_y: DEFAULT_FIXTURE_OFFSET.1,
            reference_plane_offset: 0.0,
            rapid_policy: RapidPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct LayerSettings {
    pub marker: String,
    pub raft_end_marker: String,
}

impl Default for LayerSettings {
    fn default() -> Self {
        Self {
            marker: DEFAULT_LAYER_MARKER.to_string(),
            raft_end_marker: DEFAULT_RAFT_END_MARKER.to_string(),
        }
    }
}

/// Runtime machine profile
#[derive(Debug, Clone, PartialEq)]
pub struct MachineProfile {
    pub name: String,
    pub description: Option<String>,
    pub stepper: StepperSettings,
    pub splitting: SplitSettings,
    pub surface: SurfaceSettings,
    pub layers: LayerSettings,
}

impl Default for MachineProfile {
    fn default() -> Self {
        Self {
            name: DEFAULT_PROFILE_NAME.to_string(),
            description: None,
            stepper: StepperSettings::default(),
            splitting: SplitSettings::default(),
            surface: SurfaceSettings::default(),
            layers: LayerSettings::default(),
        }
    }
}

impl From<ProfileFile> for MachineProfile {
    fn from(file: ProfileFile) -> Self {
        Self {
            name: file.profile.name,
            description: file.profile.description,
            stepper: file.stepper,
            splitting: file.splitting,
            surface: file.surface,
            layers: file.layers,
        }
    }
}

impl MachineProfile {
    /// Parse a profile from TOML text; `origin` names the source in errors
    pub fn from_toml(text: &str, origin: &str) -> std::result::Result<Self, ProfileError> {
        toml::from_str::<ProfileFile>(text)
            .map(Self::from)
            .map_err(|source| ProfileError::Parse {
                name: origin.to_string(),
                source,
            })
    }

    /// Load a profile file
    pub fn load(path: &Path) -> std::result::Result<Self, ProfileError> {
        let text = fs::read_to_string(path).map_err(|source| ProfileError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&text, &path.display().to_string())
    }

    /// Reject settings that cannot drive a compensation run
    pub fn validate(&self) -> Result<()> {
        ensure_positive("Z resolution", self.stepper.z_resolution)?;
        if self.splitting.enabled {
            ensure_positive("segment length", self.splitting.segment_length)?;
        }
        Ok(())
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            segment_length: self
                .splitting
                .enabled
                .then_some(self.splitting.segment_length),
            explicit: self.splitting.explicit,
            layer_marker: self.layers.marker.clone(),
            raft_end_marker: self.layers.raft_end_marker.clone(),
        }
    }

    pub fn fixture_offset(&self) -> (f64, f64) {
        (self.surface.fixture_offset_x, self.surface.fixture_offset_y)
    }
}

/// In-memory profile registry
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: HashMap<String, MachineProfile>,
}

impl Default for ProfileRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ProfileRegistry {
    /// Empty registry
    pub fn new() -> Self {
        Self {
            profiles: HashMap::new(),
        }
    }

    /// Registry holding the embedded default profile
    pub fn with_embedded() -> Self {
        let mut registry = Self::new();
        registry.add_embedded_default();
        registry
    }

    /// Add a profile, replacing any profile of the same name
    pub fn add_profile(&mut self, profile: MachineProfile) {
        self.profiles.insert(profile.name.clone(), profile);
    }

    pub fn get(&self, name: &str) -> Option<&MachineProfile> {
        self.profiles.get(name)
    }

    pub fn list_profiles(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    /// Add the profile compiled into the binary
    pub fn add_embedded_default(&mut self) {
        match MachineProfile::from_toml(EMBEDDED_DEFAULT, "embedded default") {
            Ok(profile) => self.add_profile(profile),
            Err(e) => {
                log::warn!("Failed to parse embedded default profile: {e}. Using built-in constants.");
                self.add_profile(MachineProfile::default());
            }
        }
    }

    /// Load every `*.toml` profile in `dir`. A missing directory loads nothing.
    pub fn load_dir(&mut self, dir: &Path) -> std::result::Result<usize, ProfileError> {
        let read_error = |source| ProfileError::Read {
            path: dir.to_path_buf(),
            source,
        };

        if !dir.is_dir() {
            log::debug!("profile directory {} not found", dir.display());
            return Ok(0);
        }

        let mut loaded = 0;
        for entry in fs::read_dir(dir).map_err(read_error)? {
            let path = entry.map_err(read_error)?.path();
            if path.extension().is_some_and(|ext| ext == "toml") {
                let profile = MachineProfile::load(&path)?;
                log::debug!("loaded profile '{}' from {}", profile.name, path.display());
                self.add_profile(profile);
                loaded += 1;
            }
        }

        Ok(loaded)
    }

    /// Find a profile by registered name, or load it when `name` is a file path
    pub fn resolve(&self, name: &str) -> std::result::Result<MachineProfile, ProfileError> {
        if let Some(profile) = self.get(name) {
            return Ok(profile.clone());
        }

        let path = Path::new(name);
        if path.is_file() {
            return MachineProfile::load(path);
        }

        Err(ProfileError::Unknown(name.to_string()))
    }
}
