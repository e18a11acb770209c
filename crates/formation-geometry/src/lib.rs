//! Formation Geometry Library
//!
//! Builds the local orbital (LVLH) frame, computes triangle metrics for the
//! three-spacecraft formation, projects ground tracks and discovers the
//! formation window over a propagated series.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use orbit_propagation::constants::{EARTH_FLATTENING, OMEGA_EARTH, R_EARTH};
use orbit_propagation::{PropagationError, StateVector};

pub mod design;
pub mod frame;
pub mod geometry;
pub mod resample;
pub mod window;

pub use design::{design_formation, FormationDesign};
pub use frame::LvlhFrame;
pub use geometry::{geometry_series, FormationGeometry};
pub use resample::{CubicHermiteResampler, LinearResampler, ResampleStrategy, ResamplingChoice};
pub use window::{find_formation_window, FormationWindow, WindowCriteria};

#[derive(Error, Debug)]
pub enum GeometryError {
    #[error("State timestamps differ: {0} s vs {1} s")]
    TimestampMismatch(f64, f64),
    #[error("Resample time {0} s lies outside the sampled interval")]
    ResampleOutOfRange(f64),
    #[error("Geometry series is empty")]
    EmptySeries,
    #[error(transparent)]
    Propagation(#[from] PropagationError),
}

pub type Result<T> = std::result::Result<T, GeometryError>;

/// Geodetic ground point, degrees.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GeodeticPoint {
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

/// Project an inertial state onto the rotating Earth.
///
/// The Earth-fixed frame is aligned with ECI at the run epoch (t = 0) and
/// rotates at the sidereal rate; geodetic latitude uses the WGS-84
/// flattening correction.
pub fn ground_point(state: &StateVector) -> GeodeticPoint {
    let theta = OMEGA_EARTH * state.t;
    let (sin_t, cos_t) = theta.sin_cos();

    // ECI -> ECEF rotation about z
    let x = cos_t * state.position.x + sin_t * state.position.y;
    let y = -sin_t * state.position.x + cos_t * state.position.y;
    let z = state.position.z;

    let r_xy = (x * x + y * y).sqrt();
    let geocentric_lat = z.atan2(r_xy);
    // Geocentric -> geodetic, first-order flattening correction
    let geodetic_lat =
        (geocentric_lat.tan() / (1.0 - EARTH_FLATTENING).powi(2)).atan();

    GeodeticPoint {
        latitude_deg: geodetic_lat.to_degrees(),
        longitude_deg: y.atan2(x).to_degrees(),
    }
}

/// Great-circle distance between two ground points, m.
pub fn haversine_m(a: &GeodeticPoint, b: &GeodeticPoint) -> f64 {
    let lat1 = a.latitude_deg.to_radians();
    let lat2 = b.latitude_deg.to_radians();
    let dlat = (b.latitude_deg - a.latitude_deg).to_radians();
    let dlon = (b.longitude_deg - a.longitude_deg).to_radians();

    let h = (dlat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (dlon / 2.0).sin().powi(2);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    R_EARTH * c
}

/// Initial bearing from `a` to `b`, radians east of north.
pub fn initial_bearing_rad(a: &GeodeticPoint, b: &GeodeticPoint) -> f64 {
    let lat1 = a.latitude_deg.to_radians();
    let lat2 = b.latitude_deg.to_radians();
    let dlon = (b.longitude_deg - a.longitude_deg).to_radians();

    let y = dlon.sin() * lat2.cos();
    let x = lat1.cos() * lat2.sin() - lat1.sin() * lat2.cos() * dlon.cos();
    y.atan2(x)
}

/// Perpendicular distance from `target` to the great-circle ground track
/// through `track_a` and `track_b`, m.
pub fn cross_track_distance_m(
    track_a: &GeodeticPoint,
    track_b: &GeodeticPoint,
    target: &GeodeticPoint,
) -> f64 {
    let delta13 = haversine_m(track_a, target) / R_EARTH;
    let theta13 = initial_bearing_rad(track_a, target);
    let theta12 = initial_bearing_rad(track_a, track_b);

    (delta13.sin() * (theta13 - theta12).sin()).asin().abs() * R_EARTH
}
