use serde::{Deserialize, Serialize};

/// A single photodetector activation
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Hit {
    pub position: [f64; 3],
    pub charge: f64,
    pub time: f64,
}

impl Hit {
    pub fn new(position: [f64; 3], charge: f64, time: f64) -> Self {
        Self {
            position,
            charge,
            time,
        }
    }

    /// The value of this hit for a color channel
    pub fn value(&self, channel: ColorChannel) -> f64 {
        match channel {
            ColorChannel::Charge => self.charge,
            ColorChannel::Time => self.time,
        }
    }
}

/// A named event-level scalar requested by the user, e.g. `energy` in `MeV`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AnnotationSpec {
    pub field: String,
    #[serde(default)]
    pub unit: String,
}

impl AnnotationSpec {
    pub fn new(field: &str, unit: &str) -> Self {
        Self {
            field: field.to_string(),
            unit: unit.to_string(),
        }
    }
}

impl std::str::FromStr for AnnotationSpec {
    type Err = std::convert::Infallible;

    /// Parse `field` or `field:unit`
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s.split_once(':') {
            Some((field, unit)) => Self::new(field.trim(), unit.trim()),
            None => Self::new(s.trim(), ""),
        })
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Annotation {
    pub label: String,
    pub unit: String,
    pub value: f64,
}

impl std::fmt::Display for Annotation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.unit.is_empty() {
            write!(f, "{} = {:.2}", self.label, self.value)
        } else {
            write!(f, "{} = {:.2} {}", self.label, self.value, self.unit)
        }
    }
}

/// Particle code the simulation gives Cherenkov photons
pub const OPTICAL_PHOTON_PID: i32 = 0;

/// A particle of the simulation truth, from its creation vertex to where it stopped.
///
/// `parent_id` refers to the `track_id` of the particle that created it; primaries have 0.
#[derive(Debug, Clone, PartialEq)]
pub struct Track {
    pub track_id: i32,
    pub parent_id: i32,
    pub pid: i32,
    pub start: [f64; 3],
    pub stop: [f64; 3],
}

impl Track {
    pub fn is_optical_photon(&self) -> bool {
        self.pid == OPTICAL_PHOTON_PID
    }
}

/// One detector trigger: its hits plus optional event-level metadata.
///
/// `index` is the position of the event in the file, not in the user's selection.
#[derive(Debug, Clone, PartialEq)]
pub struct Event {
    pub index: usize,
    pub hits: Vec<Hit>,
    pub annotations: Vec<Annotation>,
    pub tracks: Vec<Track>,
}

impl Event {
    /// Earliest and latest hit time. None for an event without hits
    pub fn time_range(&self) -> Option<(f64, f64)> {
        self.hits.iter().fold(None, |range, hit| match range {
            None => Some((hit.time, hit.time)),
            Some((lo, hi)) => Some((lo.min(hit.time), hi.max(hit.time))),
        })
    }
}

/// Which hit quantity drives the marker color
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorChannel {
    #[default]
    Charge,
    Time,
}

impl std::fmt::Display for ColorChannel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Charge => write!(f, "charge"),
            Self::Time => write!(f, "time"),
        }
    }
}

impl std::str::FromStr for ColorChannel {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "charge" => Ok(Self::Charge),
            "time" => Ok(Self::Time),
            _ => Err(format!("Invalid color channel {s}; expected charge or time")),
        }
    }
}

/// 2D unrolled chart or 3D view
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderMode {
    #[default]
    Unrolled,
    Volume,
}

impl std::fmt::Display for RenderMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Unrolled => write!(f, "2D"),
            Self::Volume => write!(f, "3D"),
        }
    }
}

impl std::str::FromStr for RenderMode {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "2d" | "unrolled" => Ok(Self::Unrolled),
            "3d" | "volume" => Ok(Self::Volume),
            _ => Err(format!("Invalid render mode {s}; expected 2d or 3d")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_range() {
        let mut event = Event {
            index: 0,
            hits: vec![],
            annotations: vec![],
            tracks: vec![],
        };
        assert_eq!(event.time_range(), None);
        event.hits.push(Hit::new([0.0; 3], 2.0, 5.0));
        event.hits.push(Hit::new([0.0; 3], 3.0, -1.5));
        event.hits.push(Hit::new([0.0; 3], 1.0, 12.0));
        assert_eq!(event.time_range(), Some((-1.5, 12.0)));
    }

    #[test]
    fn test_annotation_spec_parsing() {
        let spec: AnnotationSpec = "energy:MeV".parse().unwrap();
        assert_eq!(spec, AnnotationSpec::new("energy", "MeV"));
        let spec: AnnotationSpec = "n_hits".parse().unwrap();
        assert_eq!(spec.unit, "");
    }

    #[test]
    fn test_annotation_display() {
        let annotation = Annotation {
            label: String::from("energy"),
            unit: String::from("MeV"),
            value: 512.3456,
        };
        assert_eq!(annotation.to_string(), "energy = 512.35 MeV");
    }

    #[test]
    fn test_parse_channel_and_mode() {
        assert_eq!("Time".parse::<ColorChannel>(), Ok(ColorChannel::Time));
        assert!("energy".parse::<ColorChannel>().is_err());
        assert_eq!("3D".parse::<RenderMode>(), Ok(RenderMode::Volume));
        assert_eq!("unrolled".parse::<RenderMode>(), Ok(RenderMode::Unrolled));
    }
}
