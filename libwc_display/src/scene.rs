use fxhash::FxHashMap;

use super::color::{ColorScale, Rgb};
use super::event::{ColorChannel, RenderMode, Track};
use super::geometry::{DetectorProfile, VerticalAxis};
use super::projector::{ChartLayout, ProjectedEvent, SurfaceRegion};

// Number of labelled colorbar ticks
const N_COLORBAR_TICKS: usize = 4;

/// Inclusive hit time window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeWindow {
    pub lo: f64,
    pub hi: f64,
}

impl TimeWindow {
    pub fn new(lo: f64, hi: f64) -> Self {
        Self { lo, hi }
    }

    /// The window covering every hit of an event; [0, 1] for an event without hits
    pub fn full(event: &ProjectedEvent) -> Self {
        match event.event.time_range() {
            Some((lo, hi)) => Self { lo, hi },
            None => Self { lo: 0.0, hi: 1.0 },
        }
    }

    pub fn contains(&self, time: f64) -> bool {
        time >= self.lo && time <= self.hi
    }
}

/// View settings that are kept when moving between events
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct DisplayOptions {
    pub channel: ColorChannel,
    pub mode: RenderMode,
    /// Draw the optical photon tracks in 3D
    pub show_photon_tracks: bool,
}

/// What the browser is currently showing
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewState {
    /// Position within the resolved selection
    pub position: usize,
    /// Index of the event in the file
    pub event_index: usize,
    pub channel: ColorChannel,
    pub time_window: TimeWindow,
    pub mode: RenderMode,
    pub show_photon_tracks: bool,
}

impl ViewState {
    /// Show all of an event's hits with the given options
    pub fn new(position: usize, event: &ProjectedEvent, options: DisplayOptions) -> Self {
        Self {
            position,
            event_index: event.event.index,
            channel: options.channel,
            time_window: TimeWindow::full(event),
            mode: options.mode,
            show_photon_tracks: options.show_photon_tracks,
        }
    }

    pub fn options(&self) -> DisplayOptions {
        DisplayOptions {
            channel: self.channel,
            mode: self.mode,
            show_photon_tracks: self.show_photon_tracks,
        }
    }
}

/// Marker glyph of a hit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerShape {
    Circle,
    Square,
    Triangle,
    /// Hollow circle, for hits away from the detector surface
    Ring,
}

/// A drawable hit
#[derive(Debug, Clone, PartialEq)]
pub struct Marker {
    pub chart: (f64, f64),
    pub world: [f64; 3],
    pub region: SurfaceRegion,
    pub color: Rgb,
    pub time: f64,
    pub off_surface: bool,
}

impl Marker {
    /// Barrel hits are circles, top cap hits squares and bottom cap hits triangles
    pub fn shape(&self) -> MarkerShape {
        if self.off_surface {
            return MarkerShape::Ring;
        }
        match self.region {
            SurfaceRegion::Barrel => MarkerShape::Circle,
            SurfaceRegion::Top => MarkerShape::Square,
            SurfaceRegion::Bottom => MarkerShape::Triangle,
        }
    }
}

/// How a truth track is drawn
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackStyle {
    pub color: Rgb,
    pub dashed: bool,
    pub opacity: f64,
    pub width: f64,
}

impl TrackStyle {
    /// Style keyed on the PDG particle code
    pub fn for_pid(pid: i32) -> Self {
        let solid = |color: Rgb| Self {
            color,
            dashed: false,
            opacity: 1.0,
            width: 2.0,
        };
        match pid {
            11 => solid(Rgb(0, 0, 255)),
            -11 => solid(Rgb(255, 0, 0)),
            13 => solid(Rgb(0, 128, 0)),
            -13 => solid(Rgb(128, 0, 128)),
            22 => Self {
                color: Rgb(255, 165, 0),
                dashed: true,
                opacity: 0.3,
                width: 0.5,
            },
            // optical photon
            0 => Self {
                color: Rgb(255, 215, 0),
                dashed: false,
                opacity: 0.05,
                width: 0.2,
            },
            _ => Self {
                color: Rgb(128, 128, 128),
                dashed: false,
                opacity: 0.6,
                width: 1.0,
            },
        }
    }
}

/// A drawable track, as a polyline in the detector frame
#[derive(Debug, Clone, PartialEq)]
pub struct TrackSegment {
    pub pid: i32,
    pub track_id: i32,
    pub points: Vec<[f64; 3]>,
    pub style: TrackStyle,
}

/// Turn truth tracks into polylines.
///
/// A track runs from its start through the start vertex of each of its non-photon
/// daughters, in file order, to its stop. Optical photons are straight lines and only
/// kept with `show_photons`; they never bend their parent's line.
pub fn track_polylines(
    tracks: &[Track],
    axis: VerticalAxis,
    show_photons: bool,
) -> Vec<TrackSegment> {
    let mut daughter_vertices: FxHashMap<i32, Vec<[f64; 3]>> = FxHashMap::default();
    for track in tracks.iter().filter(|t| !t.is_optical_photon()) {
        daughter_vertices
            .entry(track.parent_id)
            .or_default()
            .push(track.start);
    }

    tracks
        .iter()
        .filter(|track| show_photons || !track.is_optical_photon())
        .map(|track| {
            let mut points = vec![track.start];
            if !track.is_optical_photon() {
                if let Some(vertices) = daughter_vertices.get(&track.track_id) {
                    points.extend_from_slice(vertices);
                }
            }
            points.push(track.stop);
            TrackSegment {
                pid: track.pid,
                track_id: track.track_id,
                points: points
                    .into_iter()
                    .map(|p| axis.to_detector_frame(p))
                    .collect(),
                style: TrackStyle::for_pid(track.pid),
            }
        })
        .collect()
}

/// Orthographic camera used to flatten 3D scenes onto a painter
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Camera {
    /// Rotation around the vertical axis, radians
    pub yaw: f64,
    /// Elevation of the view direction, radians
    pub pitch: f64,
}

impl Default for Camera {
    fn default() -> Self {
        Self {
            yaw: 0.6,
            pitch: 0.35,
        }
    }
}

impl Camera {
    /// Screen coordinates (right, up) and depth (towards the viewer) of a detector frame point
    pub fn project(&self, p: [f64; 3]) -> (f64, f64, f64) {
        let (sy, cy) = self.yaw.sin_cos();
        let (sp, cp) = self.pitch.sin_cos();
        let right = cy * p[0] - sy * p[1];
        let depth_flat = sy * p[0] + cy * p[1];
        let up = cp * p[2] - sp * depth_flat;
        let depth = sp * p[2] + cp * depth_flat;
        (right, up, depth)
    }

    pub fn rotate(&mut self, d_yaw: f64, d_pitch: f64) {
        self.yaw = (self.yaw + d_yaw).rem_euclid(std::f64::consts::TAU);
        self.pitch = (self.pitch + d_pitch).clamp(-1.5, 1.5);
    }
}

/// Everything needed to draw one view of one event, in detector units.
///
/// Built from a projected event and the view state; renderers never look at the event
/// itself.
#[derive(Debug, Clone, PartialEq)]
pub struct Scene {
    pub title: String,
    pub subtitle: String,
    pub event_index: usize,
    pub mode: RenderMode,
    pub channel: ColorChannel,
    pub layout: ChartLayout,
    pub radius: f64,
    pub half_height: f64,
    pub marker_radius: f64,
    pub markers: Vec<Marker>,
    pub tracks: Vec<TrackSegment>,
    pub colorbar: Vec<(f64, f64)>,
    pub n_hits_total: usize,
}

impl Scene {
    pub fn build(event: &ProjectedEvent, profile: &DetectorProfile, view: &ViewState) -> Self {
        let hits = &event.event.hits;
        let values: Vec<f64> = hits.iter().map(|hit| hit.value(view.channel)).collect();
        let scale = ColorScale::fit(&values);

        let mut markers: Vec<Marker> = hits
            .iter()
            .zip(event.projections.iter())
            .filter(|(hit, _)| view.time_window.contains(hit.time))
            .map(|(hit, projection)| Marker {
                chart: projection.chart,
                world: profile.vertical_axis.to_detector_frame(hit.position),
                region: projection.region,
                color: scale.color(hit.value(view.channel)),
                time: hit.time,
                off_surface: projection.off_surface,
            })
            .collect();
        // Later hits are drawn on top
        markers.sort_by(|a, b| a.time.total_cmp(&b.time));

        let tracks = match view.mode {
            RenderMode::Volume => track_polylines(
                &event.event.tracks,
                profile.vertical_axis,
                view.show_photon_tracks,
            ),
            RenderMode::Unrolled => Vec::new(),
        };

        let mut info = vec![
            format!("event {}", event.event.index),
            format!("{}/{} hits", markers.len(), hits.len()),
        ];
        info.extend(event.event.annotations.iter().map(|a| a.to_string()));

        Self {
            title: format!("{} Event Display", profile.name),
            subtitle: info.join(", "),
            event_index: event.event.index,
            mode: view.mode,
            channel: view.channel,
            layout: ChartLayout::new(profile),
            radius: profile.radius,
            half_height: profile.half_height(),
            marker_radius: profile.display_radius(),
            markers,
            tracks,
            colorbar: scale.ticks(N_COLORBAR_TICKS),
            n_hits_total: hits.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::event::{Annotation, Event, Hit, Track};
    use crate::geometry::ProfileRegistry;
    use crate::projector::project_event;

    fn projected(profile: &DetectorProfile) -> ProjectedEvent {
        let r = profile.radius;
        let event = Event {
            index: 12,
            hits: vec![
                Hit::new([r, 0.0, 0.0], 3.0, 20.0),
                Hit::new([0.0, r, 100.0], 1.0, 5.0),
                Hit::new([0.0, 0.0, profile.half_height()], 8.0, 50.0),
            ],
            annotations: vec![Annotation {
                label: String::from("energy"),
                unit: String::from("MeV"),
                value: 250.0,
            }],
            tracks: vec![Track {
                track_id: 1,
                parent_id: 0,
                pid: 11,
                start: [0.0; 3],
                stop: [100.0, 0.0, 0.0],
            }],
        };
        project_event(event, profile)
    }

    fn view(event: &ProjectedEvent, mode: RenderMode) -> ViewState {
        let options = DisplayOptions {
            mode,
            ..Default::default()
        };
        ViewState::new(0, event, options)
    }

    fn track(track_id: i32, parent_id: i32, pid: i32, start: f64, stop: f64) -> Track {
        Track {
            track_id,
            parent_id,
            pid,
            start: [start, 0.0, 0.0],
            stop: [stop, 0.0, 0.0],
        }
    }

    #[test]
    fn test_scene_contents() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap();
        let event = projected(profile);
        let scene = Scene::build(&event, profile, &view(&event, RenderMode::Unrolled));
        assert_eq!(scene.title, "SK Event Display");
        assert_eq!(scene.subtitle, "event 12, 3/3 hits, energy = 250.00 MeV");
        assert_eq!(scene.markers.len(), 3);
        let times: Vec<f64> = scene.markers.iter().map(|m| m.time).collect();
        assert_eq!(times, vec![5.0, 20.0, 50.0]);
        assert_eq!(scene.markers[2].region, SurfaceRegion::Top);
        assert_eq!(scene.markers[2].shape(), MarkerShape::Square);
        assert_eq!(scene.markers[0].shape(), MarkerShape::Circle);
        assert!(scene.tracks.is_empty());
        assert_eq!(scene.colorbar.len(), 4);
    }

    #[test]
    fn test_time_window_filters_markers() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap();
        let event = projected(profile);
        let mut state = view(&event, RenderMode::Unrolled);
        state.time_window = TimeWindow::new(0.0, 20.0);
        let scene = Scene::build(&event, profile, &state);
        assert_eq!(scene.markers.len(), 2);
        assert_eq!(scene.n_hits_total, 3);
        // colors do not depend on the window
        let full = Scene::build(&event, profile, &view(&event, RenderMode::Unrolled));
        assert_eq!(scene.markers[0].color, full.markers[0].color);
    }

    #[test]
    fn test_volume_scene_has_tracks() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap();
        let event = projected(profile);
        let scene = Scene::build(&event, profile, &view(&event, RenderMode::Volume));
        assert_eq!(scene.tracks.len(), 1);
        assert_eq!(scene.tracks[0].style.color, Rgb(0, 0, 255));
        assert_eq!(scene.tracks[0].points, vec![[0.0; 3], [100.0, 0.0, 0.0]]);
    }

    #[test]
    fn test_marker_shapes_per_region() {
        let marker = |region, off_surface| Marker {
            chart: (0.0, 0.0),
            world: [0.0; 3],
            region,
            color: Rgb(0, 0, 0),
            time: 0.0,
            off_surface,
        };
        let shapes = [
            marker(SurfaceRegion::Barrel, false).shape(),
            marker(SurfaceRegion::Top, false).shape(),
            marker(SurfaceRegion::Bottom, false).shape(),
            marker(SurfaceRegion::Barrel, true).shape(),
        ];
        for (i, a) in shapes.iter().enumerate() {
            for b in shapes[i + 1..].iter() {
                assert_ne!(a, b);
            }
        }
        assert_eq!(marker(SurfaceRegion::Bottom, true).shape(), MarkerShape::Ring);
    }

    #[test]
    fn test_tracks_bend_at_daughters() {
        let tracks = vec![
            track(1, 0, 13, 0.0, 500.0),
            track(2, 1, 11, 100.0, 120.0),
            track(3, 1, 22, 300.0, 400.0),
            track(4, 1, 0, 200.0, 1690.0),
            track(5, 2, 11, 110.0, 115.0),
        ];
        let polylines = track_polylines(&tracks, VerticalAxis::Z, false);
        let ids: Vec<i32> = polylines.iter().map(|t| t.track_id).collect();
        assert_eq!(ids, vec![1, 2, 3, 5]);
        let xs = |t: &TrackSegment| t.points.iter().map(|p| p[0]).collect::<Vec<f64>>();
        assert_eq!(xs(&polylines[0]), vec![0.0, 100.0, 300.0, 500.0]);
        assert_eq!(xs(&polylines[1]), vec![100.0, 110.0, 120.0]);
        assert_eq!(xs(&polylines[3]), vec![110.0, 115.0]);
        assert!(polylines[2].style.dashed);
    }

    #[test]
    fn test_photon_tracks_are_optional() {
        let tracks = vec![track(1, 0, 13, 0.0, 500.0), track(2, 1, 0, 50.0, 1690.0)];
        assert_eq!(track_polylines(&tracks, VerticalAxis::Z, false).len(), 1);
        let with_photons = track_polylines(&tracks, VerticalAxis::Z, true);
        assert_eq!(with_photons.len(), 2);
        // photons do not bend their parent
        assert_eq!(with_photons[0].points.len(), 2);
        assert_eq!(with_photons[1].style, TrackStyle::for_pid(0));

        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap();
        let mut event = projected(profile);
        event.event.tracks = tracks;
        let mut state = view(&event, RenderMode::Volume);
        assert_eq!(Scene::build(&event, profile, &state).tracks.len(), 1);
        state.show_photon_tracks = true;
        assert_eq!(Scene::build(&event, profile, &state).tracks.len(), 2);
    }

    #[test]
    fn test_y_up_tracks_in_detector_frame() {
        let tracks = vec![Track {
            track_id: 1,
            parent_id: 0,
            pid: 11,
            start: [1.0, 2.0, 3.0],
            stop: [4.0, 5.0, 6.0],
        }];
        let polylines = track_polylines(&tracks, VerticalAxis::Y, false);
        assert_eq!(
            polylines[0].points,
            vec![
                VerticalAxis::Y.to_detector_frame([1.0, 2.0, 3.0]),
                VerticalAxis::Y.to_detector_frame([4.0, 5.0, 6.0])
            ]
        );
    }

    #[test]
    fn test_camera_front_view() {
        let camera = Camera {
            yaw: 0.0,
            pitch: 0.0,
        };
        assert_eq!(camera.project([1.0, 2.0, 3.0]), (1.0, 3.0, 2.0));
    }
}
