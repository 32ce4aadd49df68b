use fxhash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

use super::error::ProfileError;

/// Load the bundled detector table for windows
#[cfg(target_family = "windows")]
fn load_default_profiles() -> &'static str {
    include_str!("data\\detectors.yml")
}

/// Load the bundled detector table for macos and linux
#[cfg(target_family = "unix")]
fn load_default_profiles() -> &'static str {
    include_str!("data/detectors.yml")
}

/// Which axis of the data frame runs along the cylinder.
///
/// Everything downstream works in the `z`-up frame; `y`-up data is rotated by
/// +90 degrees around the x axis before projection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VerticalAxis {
    #[default]
    Z,
    Y,
}

impl VerticalAxis {
    /// Rotate a data-frame position into the `z`-up detector frame
    pub fn to_detector_frame(&self, position: [f64; 3]) -> [f64; 3] {
        match self {
            Self::Z => position,
            Self::Y => [position[0], -position[2], position[1]],
        }
    }

    /// Inverse of `to_detector_frame`
    pub fn to_data_frame(&self, position: [f64; 3]) -> [f64; 3] {
        match self {
            Self::Z => position,
            Self::Y => [position[0], position[2], -position[1]],
        }
    }
}

fn default_cap_tolerance() -> f64 {
    1.0
}

fn default_surface_tolerance() -> f64 {
    50.0
}

/// Geometric description of one cylindrical water Cherenkov detector. All lengths are in cm.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectorProfile {
    #[serde(skip)]
    pub name: String,
    pub height: f64,
    pub radius: f64,
    pub pmt_radius: f64,
    #[serde(default)]
    pub marker_radius: Option<f64>,
    #[serde(default)]
    pub vertical_axis: VerticalAxis,
    #[serde(default = "default_cap_tolerance")]
    pub cap_tolerance: f64,
    #[serde(default = "default_surface_tolerance")]
    pub surface_tolerance: f64,
    #[serde(default)]
    pub variant: Option<String>,
}

impl DetectorProfile {
    pub fn half_height(&self) -> f64 {
        self.height / 2.0
    }

    /// Vertical chart coordinate of the cap centres (the cap discs sit just outside the barrel band)
    pub fn cap_offset_y(&self) -> f64 {
        self.half_height() + self.radius
    }

    /// Radius used to draw a photodetector marker
    pub fn display_radius(&self) -> f64 {
        self.marker_radius.unwrap_or(self.pmt_radius)
    }

    fn validate(&self) -> Result<(), ProfileError> {
        let invalid = |msg: &str| Err(ProfileError::InvalidProfile(self.name.clone(), msg.to_string()));
        if !(self.height > 0.0) || !(self.radius > 0.0) {
            return invalid("height and radius must be positive");
        }
        if !(self.pmt_radius > 0.0) || self.marker_radius.is_some_and(|r| !(r > 0.0)) {
            return invalid("photodetector and marker radii must be positive");
        }
        if !(self.cap_tolerance >= 0.0) || !(self.surface_tolerance >= 0.0) {
            return invalid("tolerances must not be negative");
        }
        if self.cap_tolerance >= self.half_height() {
            return invalid("cap tolerance must be smaller than half the height");
        }
        Ok(())
    }
}

/// The set of known detectors, keyed by experiment name.
///
/// The registry starts from the table bundled with the code base. A user YAML file with
/// the same layout can add experiments or replace bundled ones:
///
/// ```yml
/// MY_TANK:
///   height: 300.0
///   radius: 150.0
///   pmt_radius: 4.0
///   vertical_axis: z
/// ```
#[derive(Debug, Clone)]
pub struct ProfileRegistry {
    profiles: FxHashMap<String, DetectorProfile>,
}

impl ProfileRegistry {
    /// Create a registry holding only the bundled detectors
    pub fn new() -> Result<Self, ProfileError> {
        let mut registry = Self {
            profiles: FxHashMap::default(),
        };
        registry.merge_yaml(load_default_profiles())?;
        Ok(registry)
    }

    /// Create a registry from the bundled detectors plus an optional user file
    pub fn with_overrides(path: Option<&Path>) -> Result<Self, ProfileError> {
        let mut registry = Self::new()?;
        if let Some(p) = path {
            if !p.exists() {
                return Err(ProfileError::BadFilePath(p.to_path_buf()));
            }
            let yaml_str = std::fs::read_to_string(p)?;
            let n_added = registry.merge_yaml(&yaml_str)?;
            log::info!("Loaded {n_added} detector profile(s) from {}", p.display());
        }
        Ok(registry)
    }

    fn merge_yaml(&mut self, yaml_str: &str) -> Result<usize, ProfileError> {
        let table: BTreeMap<String, DetectorProfile> = serde_yaml::from_str(yaml_str)?;
        let n_entries = table.len();
        for (name, mut profile) in table {
            profile.name = name.clone();
            profile.validate()?;
            if self.profiles.insert(name.clone(), profile).is_some() {
                log::info!("Detector profile {name} was replaced");
            }
        }
        Ok(n_entries)
    }

    /// Look up a detector by experiment name
    pub fn get(&self, experiment: &str) -> Result<&DetectorProfile, ProfileError> {
        self.profiles.get(experiment).ok_or_else(|| {
            ProfileError::UnknownExperiment(experiment.to_string(), self.names().join(", "))
        })
    }

    /// Sorted experiment names
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.profiles.keys().cloned().collect();
        names.sort();
        names
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_bundled_profiles() {
        let registry = ProfileRegistry::new().unwrap();
        for name in ["SK", "HK", "HK_realistic", "WCTE", "WCTE_r", "DEMO"] {
            let profile = registry.get(name).unwrap();
            assert_eq!(profile.name, name);
        }
        let sk = registry.get("SK").unwrap();
        assert_eq!(sk.half_height(), 1810.0);
        assert_eq!(sk.display_radius(), 25.4);
        assert_eq!(registry.get("WCTE").unwrap().display_radius(), 2.0);
        assert_eq!(registry.get("WCTE_r").unwrap().vertical_axis, VerticalAxis::Y);
        assert_eq!(
            registry.get("HK_realistic").unwrap().variant.as_deref(),
            Some("realistic")
        );
    }

    #[test]
    fn test_unknown_experiment() {
        let registry = ProfileRegistry::new().unwrap();
        match registry.get("KM3NeT") {
            Err(ProfileError::UnknownExperiment(name, known)) => {
                assert_eq!(name, "KM3NeT");
                assert!(known.contains("SK"));
            }
            _ => panic!(),
        }
    }

    #[test]
    fn test_user_profiles() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("profiles.yml");
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(b"TANK:\n  height: 300.0\n  radius: 150.0\n  pmt_radius: 4.0\nSK:\n  height: 100.0\n  radius: 50.0\n  pmt_radius: 1.0\n")
            .unwrap();
        let registry = ProfileRegistry::with_overrides(Some(&path)).unwrap();
        let tank = registry.get("TANK").unwrap();
        assert_eq!(tank.vertical_axis, VerticalAxis::Z);
        assert_eq!(tank.cap_tolerance, 1.0);
        assert_eq!(registry.get("SK").unwrap().height, 100.0);
        assert!(registry.get("HK").is_ok());
    }

    #[test]
    fn test_invalid_profile() {
        let mut registry = ProfileRegistry::new().unwrap();
        let result = registry.merge_yaml("BAD:\n  height: -1.0\n  radius: 10.0\n  pmt_radius: 1.0\n");
        assert!(matches!(result, Err(ProfileError::InvalidProfile(_, _))));
    }

    #[test]
    fn test_y_axis_rotation() {
        let rotated = VerticalAxis::Y.to_detector_frame([1.0, 2.0, 3.0]);
        assert_eq!(rotated, [1.0, -3.0, 2.0]);
    }
}
