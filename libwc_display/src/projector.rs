//! Projection of photodetector positions onto the unrolled cylinder chart.
//!
//! The chart places the barrel as a band of width `2πR` and height `2h` centred on the
//! origin, with the top and bottom caps drawn as discs above and below the band:
//!
//! ```text
//!              ( top )          centre (0,  h + R)
//!   +---------------------+     y =  h
//!   |       barrel        |
//!   +---------------------+     y = -h
//!              (bottom)         centre (0, -h - R)
//!  x = -πR              x = πR
//! ```
//!
//! The barrel is cut along the negative x axis (azimuth π). Points on that seam land on
//! the right edge of the band; points just below it land on the left edge.
use std::f64::consts::PI;

use super::event::Event;
use super::geometry::DetectorProfile;

// Chart padding around the detector silhouette, cm
const CHART_MARGIN: f64 = 10.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SurfaceRegion {
    Barrel,
    Top,
    Bottom,
}

impl std::fmt::Display for SurfaceRegion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Barrel => write!(f, "barrel"),
            Self::Top => write!(f, "top"),
            Self::Bottom => write!(f, "bottom"),
        }
    }
}

/// Result of projecting one position
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projection {
    pub chart: (f64, f64),
    pub region: SurfaceRegion,
    pub off_surface: bool,
}

/// Classify a `z`-up detector frame position by height
pub fn classify(position: &[f64; 3], profile: &DetectorProfile) -> SurfaceRegion {
    let cap_plane = profile.half_height() - profile.cap_tolerance;
    if position[2] >= cap_plane {
        SurfaceRegion::Top
    } else if position[2] <= -cap_plane {
        SurfaceRegion::Bottom
    } else {
        SurfaceRegion::Barrel
    }
}

/// Azimuth in (-π, π]
fn azimuth(x: f64, y: f64) -> f64 {
    let angle = y.atan2(x);
    // atan2(-0.0, x<0) gives -π, which belongs on the seam at +π
    if angle <= -PI {
        PI
    } else {
        angle
    }
}

/// Project a data-frame position onto the 2D chart of the given detector.
///
/// Positions that do not sit on the detector wall (within the profile's surface
/// tolerance) are still projected, but flagged as off-surface.
pub fn project(position: [f64; 3], profile: &DetectorProfile) -> Projection {
    let p = profile.vertical_axis.to_detector_frame(position);
    let region = classify(&p, profile);
    let r = p[0].hypot(p[1]);
    let (chart, off_surface) = match region {
        SurfaceRegion::Barrel => (
            (profile.radius * azimuth(p[0], p[1]), p[2]),
            (r - profile.radius).abs() > profile.surface_tolerance,
        ),
        SurfaceRegion::Top => (
            (p[1], profile.cap_offset_y() - p[0]),
            r > profile.radius + profile.surface_tolerance,
        ),
        SurfaceRegion::Bottom => (
            (p[1], -profile.cap_offset_y() + p[0]),
            r > profile.radius + profile.surface_tolerance,
        ),
    };
    Projection {
        chart,
        region,
        off_surface,
    }
}

/// An event together with the projection of each of its hits
#[derive(Debug, Clone)]
pub struct ProjectedEvent {
    pub event: Event,
    pub projections: Vec<Projection>,
    pub n_off_surface: usize,
}

/// Project every hit of an event. Off-surface hits are counted and reported once per event.
pub fn project_event(event: Event, profile: &DetectorProfile) -> ProjectedEvent {
    let projections: Vec<Projection> = event
        .hits
        .iter()
        .map(|hit| project(hit.position, profile))
        .collect();
    let n_off_surface = projections.iter().filter(|p| p.off_surface).count();
    if n_off_surface > 0 {
        log::warn!(
            "Event {} has {} of {} hits off the {} detector surface (tolerance {} cm)",
            event.index,
            n_off_surface,
            projections.len(),
            profile.name,
            profile.surface_tolerance
        );
    }
    ProjectedEvent {
        event,
        projections,
        n_off_surface,
    }
}

/// Static chart geometry of a detector: the barrel band, the cap discs and the chart extents
#[derive(Debug, Clone, PartialEq)]
pub struct ChartLayout {
    pub barrel_min: (f64, f64),
    pub barrel_max: (f64, f64),
    pub top_cap_center: (f64, f64),
    pub bottom_cap_center: (f64, f64),
    pub cap_radius: f64,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
}

impl ChartLayout {
    pub fn new(profile: &DetectorProfile) -> Self {
        let half_width = PI * profile.radius;
        let h = profile.half_height();
        let r = profile.radius;
        Self {
            barrel_min: (-half_width, -h),
            barrel_max: (half_width, h),
            top_cap_center: (0.0, profile.cap_offset_y()),
            bottom_cap_center: (0.0, -profile.cap_offset_y()),
            cap_radius: r,
            x_range: (-half_width - CHART_MARGIN, half_width + CHART_MARGIN),
            y_range: (-h - 2.0 * r - CHART_MARGIN, h + 2.0 * r + CHART_MARGIN),
        }
    }
}
