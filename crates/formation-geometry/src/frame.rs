//! Local-Vertical-Local-Horizontal frame.

use nalgebra::Vector3;
use orbit_propagation::StateVector;

/// Orthonormal LVLH triad centred on a reference spacecraft.
///
/// Axes: radial (zenith), along-track (completing the triad, close to the
/// velocity direction for near-circular orbits), cross-track (orbit normal).
#[derive(Debug, Clone, Copy)]
pub struct LvlhFrame {
    pub radial: Vector3<f64>,
    pub along_track: Vector3<f64>,
    pub cross_track: Vector3<f64>,
}

impl LvlhFrame {
    pub fn from_state(reference: &StateVector) -> Self {
        let radial = reference.position.normalize();
        let cross_track = reference.position.cross(&reference.velocity).normalize();
        let along_track = cross_track.cross(&radial);
        Self { radial, along_track, cross_track }
    }

    /// Express an ECI-relative vector in LVLH components
    /// (radial, along-track, cross-track).
    pub fn project(&self, relative_eci: &Vector3<f64>) -> Vector3<f64> {
        Vector3::new(
            self.radial.dot(relative_eci),
            self.along_track.dot(relative_eci),
            self.cross_track.dot(relative_eci),
        )
    }

    /// Map LVLH components back to an ECI vector.
    pub fn to_eci(&self, local: &Vector3<f64>) -> Vector3<f64> {
        self.radial * local.x + self.along_track * local.y + self.cross_track * local.z
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circular_state() -> StateVector {
        let r = 6_898_137.0;
        let v = (orbit_propagation::constants::MU_EARTH / r).sqrt();
        StateVector {
            t: 0.0,
            position: Vector3::new(r, 0.0, 0.0),
            velocity: Vector3::new(0.0, v * 0.5, v * 0.866),
        }
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let frame = LvlhFrame::from_state(&circular_state());
        assert!((frame.radial.norm() - 1.0).abs() < 1e-12);
        assert!((frame.along_track.norm() - 1.0).abs() < 1e-12);
        assert!((frame.cross_track.norm() - 1.0).abs() < 1e-12);
        assert!(frame.radial.dot(&frame.along_track).abs() < 1e-12);
        assert!(frame.radial.dot(&frame.cross_track).abs() < 1e-12);
        assert!(frame.along_track.dot(&frame.cross_track).abs() < 1e-12);
    }

    #[test]
    fn test_project_roundtrip() {
        let frame = LvlhFrame::from_state(&circular_state());
        let local = Vector3::new(120.0, -3000.0, 450.0);
        let eci = frame.to_eci(&local);
        let back = frame.project(&eci);
        assert!((back - local).norm() < 1e-9);
    }

    #[test]
    fn test_along_track_tracks_velocity() {
        let state = circular_state();
        let frame = LvlhFrame::from_state(&state);
        // Circular orbit: along-track axis is parallel to velocity
        let v_hat = state.velocity.normalize();
        assert!((frame.along_track - v_hat).norm() < 1e-9);
    }
}
