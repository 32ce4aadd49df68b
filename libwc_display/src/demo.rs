//! Synthetic Cherenkov ring events.
//!
//! Each event is a single charged particle starting near the centre of the tank. Photons
//! are emitted on a 42 degree cone around its direction and traced straight to the wall,
//! where they become hits. Charge falls off with the photon path length and the hit time
//! is the path length divided by the speed of light in water. The truth tracks are the
//! primary, one knock-on electron and the first few optical photons. Generation is
//! deterministic for a given seed.
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::f64::consts::TAU;

use super::event::{Event, Hit, Track, OPTICAL_PHOTON_PID};
use super::geometry::DetectorProfile;
use super::source::MemorySource;

/// Cherenkov angle in water, degrees
const CHERENKOV_ANGLE: f64 = 42.0;
/// Speed of light in water, cm/ns
const C_WATER: f64 = 22.5;
/// Fraction of the tank, radially and vertically, in which vertices are placed
const VERTEX_FRACTION: f64 = 0.3;
/// Photons emitted per MeV
const PHOTONS_PER_MEV: f64 = 0.4;
/// Energy lost per cm by the primary, MeV
const DEDX: f64 = 2.0;
const MAX_PHOTONS: usize = 2000;
/// Optical photons kept as truth tracks
const N_PHOTON_TRACKS: usize = 40;
/// Longest knock-on electron, cm
const MAX_DELTA_LENGTH: f64 = 60.0;

fn dot(a: [f64; 3], b: [f64; 3]) -> f64 {
    a[0] * b[0] + a[1] * b[1] + a[2] * b[2]
}

fn cross(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [
        a[1] * b[2] - a[2] * b[1],
        a[2] * b[0] - a[0] * b[2],
        a[0] * b[1] - a[1] * b[0],
    ]
}

fn normalized(a: [f64; 3]) -> [f64; 3] {
    let norm = dot(a, a).sqrt();
    [a[0] / norm, a[1] / norm, a[2] / norm]
}

fn along(origin: [f64; 3], direction: [f64; 3], distance: f64) -> [f64; 3] {
    [
        origin[0] + distance * direction[0],
        origin[1] + distance * direction[1],
        origin[2] + distance * direction[2],
    ]
}

/// Distance from a point inside the cylinder to its wall along a unit direction
fn distance_to_wall(origin: [f64; 3], direction: [f64; 3], radius: f64, half_height: f64) -> f64 {
    let a = direction[0].powi(2) + direction[1].powi(2);
    let barrel = if a > 0.0 {
        let b = 2.0 * (origin[0] * direction[0] + origin[1] * direction[1]);
        let c = origin[0].powi(2) + origin[1].powi(2) - radius.powi(2);
        (-b + (b * b - 4.0 * a * c).max(0.0).sqrt()) / (2.0 * a)
    } else {
        f64::INFINITY
    };
    let cap = if direction[2] > 0.0 {
        (half_height - origin[2]) / direction[2]
    } else if direction[2] < 0.0 {
        (-half_height - origin[2]) / direction[2]
    } else {
        f64::INFINITY
    };
    barrel.min(cap)
}

/// Two unit vectors completing a right-handed frame with `direction`
fn orthonormal_basis(direction: [f64; 3]) -> ([f64; 3], [f64; 3]) {
    let helper = if direction[2].abs() < 0.9 {
        [0.0, 0.0, 1.0]
    } else {
        [1.0, 0.0, 0.0]
    };
    let u = normalized(cross(direction, helper));
    let v = cross(direction, u);
    (u, v)
}

/// The scalars of one generated event
struct Truth {
    energy: f64,
    dwall: f64,
    towall: f64,
}

fn generate_event(
    profile: &DetectorProfile,
    index: usize,
    n_events: usize,
    rng: &mut StdRng,
) -> (Event, Truth) {
    let radius = profile.radius;
    let half_height = profile.half_height();

    let vertex_r = VERTEX_FRACTION * radius * rng.gen::<f64>().sqrt();
    let vertex_phi = TAU * rng.gen::<f64>();
    let vertex = [
        vertex_r * vertex_phi.cos(),
        vertex_r * vertex_phi.sin(),
        VERTEX_FRACTION * half_height * rng.gen_range(-1.0_f64..1.0),
    ];

    // Sweep the azimuth with the event index so consecutive events look different
    let phi = TAU * index as f64 / n_events.max(1) as f64 + rng.gen_range(-0.2_f64..0.2);
    let cos_theta: f64 = rng.gen_range(-0.6..0.6);
    let sin_theta = (1.0 - cos_theta * cos_theta).sqrt();
    let direction = [sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta];

    let energy: f64 = rng.gen_range(100.0..1000.0);
    let towall = distance_to_wall(vertex, direction, radius, half_height);
    let dwall = (radius - vertex_r).min(half_height - vertex[2].abs());
    let track_length = (energy / DEDX).min(0.9 * towall);

    let (u, v) = orthonormal_basis(direction);
    let (sin_c, cos_c) = CHERENKOV_ANGLE.to_radians().sin_cos();
    let n_photons = ((energy * PHOTONS_PER_MEV) as usize).min(MAX_PHOTONS);
    let mut hits = Vec::with_capacity(n_photons);
    let mut photon_paths = Vec::with_capacity(N_PHOTON_TRACKS);
    for _ in 0..n_photons {
        // Photons leave from anywhere along the track
        let emitted = rng.gen::<f64>() * track_length;
        let origin = along(vertex, direction, emitted);
        let a = TAU * rng.gen::<f64>();
        let ray = normalized([
            cos_c * direction[0] + sin_c * (a.cos() * u[0] + a.sin() * v[0]),
            cos_c * direction[1] + sin_c * (a.cos() * u[1] + a.sin() * v[1]),
            cos_c * direction[2] + sin_c * (a.cos() * u[2] + a.sin() * v[2]),
        ]);
        let path = distance_to_wall(origin, ray, radius, half_height);
        let position = along(origin, ray, path);
        if photon_paths.len() < N_PHOTON_TRACKS {
            photon_paths.push((origin, position));
        }
        let charge = (radius / path.max(1.0)) * rng.gen_range(0.5_f64..1.5);
        let time = (emitted + path) / C_WATER + rng.gen_range(-0.5_f64..0.5);
        hits.push(Hit::new(
            profile.vertical_axis.to_data_frame(position),
            charge,
            time,
        ));
    }

    let axis = profile.vertical_axis;
    let pid = if index % 2 == 0 { 13 } else { 11 };
    let mut tracks = vec![Track {
        track_id: 1,
        parent_id: 0,
        pid,
        start: axis.to_data_frame(vertex),
        stop: axis.to_data_frame(along(vertex, direction, track_length)),
    }];

    let delta_start = along(vertex, direction, rng.gen::<f64>() * track_length);
    let a = TAU * rng.gen::<f64>();
    let delta_direction = normalized([
        direction[0] + a.cos() * u[0] + a.sin() * v[0],
        direction[1] + a.cos() * u[1] + a.sin() * v[1],
        direction[2] + a.cos() * u[2] + a.sin() * v[2],
    ]);
    let delta_length = (rng.gen::<f64>() * MAX_DELTA_LENGTH)
        .min(0.9 * distance_to_wall(delta_start, delta_direction, radius, half_height));
    tracks.push(Track {
        track_id: 2,
        parent_id: 1,
        pid: 11,
        start: axis.to_data_frame(delta_start),
        stop: axis.to_data_frame(along(delta_start, delta_direction, delta_length)),
    });

    tracks.extend(
        photon_paths
            .into_iter()
            .zip(3..)
            .map(|((start, stop), track_id)| Track {
                track_id,
                parent_id: 1,
                pid: OPTICAL_PHOTON_PID,
                start: axis.to_data_frame(start),
                stop: axis.to_data_frame(stop),
            }),
    );

    let event = Event {
        index,
        hits,
        annotations: vec![],
        tracks,
    };
    (
        event,
        Truth {
            energy,
            dwall,
            towall,
        },
    )
}

/// Generate `n_events` events for a detector, with `energy`, `dwall` and `towall` scalars
pub fn generate(profile: &DetectorProfile, n_events: usize, seed: u64) -> MemorySource {
    let mut events = Vec::with_capacity(n_events);
    let mut energy = Vec::with_capacity(n_events);
    let mut dwall = Vec::with_capacity(n_events);
    let mut towall = Vec::with_capacity(n_events);
    for index in 0..n_events {
        let mut rng =
            StdRng::seed_from_u64(seed ^ (index as u64).wrapping_mul(0x9E37_79B9_7F4A_7C15));
        let (event, truth) = generate_event(profile, index, n_events, &mut rng);
        events.push(event);
        energy.push(truth.energy);
        dwall.push(truth.dwall);
        towall.push(truth.towall);
    }
    log::info!(
        "Generated {} {} events with {} hits",
        n_events,
        profile.name,
        events.iter().map(|e| e.hits.len()).sum::<usize>()
    );
    MemorySource::new(events)
        .with_scalar("energy", energy)
        .with_scalar("dwall", dwall)
        .with_scalar("towall", towall)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geometry::ProfileRegistry;
    use crate::projector::project_event;
    use crate::source::EventSource;

    #[test]
    fn test_deterministic() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("DEMO").unwrap();
        let first = generate(profile, 3, 7);
        let second = generate(profile, 3, 7);
        assert_eq!(first.events(), second.events());
        assert_eq!(
            first.read_scalar("energy", 1).unwrap(),
            second.read_scalar("energy", 1).unwrap()
        );
        let other = generate(profile, 3, 8);
        assert_ne!(first.events(), other.events());
    }

    #[test]
    fn test_hits_on_wall() {
        let registry = ProfileRegistry::new().unwrap();
        for name in ["DEMO", "WCTE_r"] {
            let profile = registry.get(name).unwrap();
            let source = generate(profile, 4, 1);
            assert_eq!(source.n_events(), 4);
            for event in source.events() {
                assert!(!event.hits.is_empty());
                assert!(event.hits.iter().all(|h| h.charge > 0.0));
                let projected = project_event(event.clone(), profile);
                assert_eq!(projected.n_off_surface, 0);
            }
        }
    }

    #[test]
    fn test_scalars() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("SK").unwrap();
        let source = generate(profile, 5, 3);
        assert_eq!(source.scalar_names(), vec!["energy", "dwall", "towall"]);
        for index in 0..5 {
            let dwall = source.read_scalar("dwall", index).unwrap();
            let towall = source.read_scalar("towall", index).unwrap();
            assert!(dwall > 0.0);
            assert!(towall >= dwall);
            let track = &source.events()[index].tracks[0];
            assert_eq!(track.parent_id, 0);
        }
    }

    #[test]
    fn test_truth_tracks() {
        let registry = ProfileRegistry::new().unwrap();
        let profile = registry.get("DEMO").unwrap();
        let source = generate(profile, 2, 5);
        for event in source.events() {
            let tracks = &event.tracks;
            assert_eq!(tracks[1].parent_id, tracks[0].track_id);
            assert!(!tracks[1].is_optical_photon());
            let photons: Vec<&Track> = tracks.iter().filter(|t| t.is_optical_photon()).collect();
            assert_eq!(photons.len(), N_PHOTON_TRACKS.min(event.hits.len()));
            assert!(photons.iter().all(|t| t.parent_id == 1));
            // the primary bends at the knock-on electron only
            let polylines =
                crate::scene::track_polylines(tracks, profile.vertical_axis, false);
            assert_eq!(polylines.len(), 2);
            assert_eq!(polylines[0].points.len(), 3);
        }
    }

    #[test]
    fn test_distance_to_wall() {
        let d = distance_to_wall([0.0, 0.0, 0.0], [1.0, 0.0, 0.0], 100.0, 50.0);
        assert!((d - 100.0).abs() < 1e-9);
        let d = distance_to_wall([0.0, 0.0, 10.0], [0.0, 0.0, 1.0], 100.0, 50.0);
        assert!((d - 40.0).abs() < 1e-9);
    }
}
