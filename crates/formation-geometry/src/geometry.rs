//! Per-timestep triangle metrics for the three-spacecraft formation.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use orbit_propagation::StateVector;

use crate::{ground_point, GeodeticPoint, GeometryError, Result};

/// Timestamps closer than this are considered concurrent, s.
const TIMESTAMP_EPSILON_S: f64 = 1e-6;

/// Triangle metrics and ground projections at one timestep.
///
/// Derived from exactly three concurrent state vectors; construction fails
/// if the timestamps differ.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationGeometry {
    pub t: f64,
    /// Pairwise distances: A–B, B–C, C–A, m.
    pub side_lengths_m: [f64; 3],
    pub area_m2: f64,
    /// Max side ÷ min side; 1.0 is perfectly equilateral.
    pub aspect_ratio: f64,
    pub centroid_eci: Vector3<f64>,
    pub ground_points: [GeodeticPoint; 3],
}

impl FormationGeometry {
    pub fn from_states(states: &[StateVector; 3]) -> Result<Self> {
        for s in &states[1..] {
            if (s.t - states[0].t).abs() > TIMESTAMP_EPSILON_S {
                return Err(GeometryError::TimestampMismatch(states[0].t, s.t));
            }
        }

        let [a, b, c] = states;
        let side_lengths_m = [
            (b.position - a.position).norm(),
            (c.position - b.position).norm(),
            (a.position - c.position).norm(),
        ];
        let area_m2 =
            0.5 * (b.position - a.position).cross(&(c.position - a.position)).norm();

        let max_side = side_lengths_m.iter().cloned().fold(f64::MIN, f64::max);
        let min_side = side_lengths_m.iter().cloned().fold(f64::MAX, f64::min);
        let aspect_ratio = if min_side > 0.0 { max_side / min_side } else { f64::INFINITY };

        Ok(Self {
            t: a.t,
            side_lengths_m,
            area_m2,
            aspect_ratio,
            centroid_eci: (a.position + b.position + c.position) / 3.0,
            ground_points: [ground_point(a), ground_point(b), ground_point(c)],
        })
    }

    /// Ground projection of the formation centroid.
    pub fn centroid_ground(&self) -> GeodeticPoint {
        let centroid_state = StateVector {
            t: self.t,
            position: self.centroid_eci,
            velocity: Vector3::zeros(),
        };
        ground_point(&centroid_state)
    }
}

/// Build the geometry series from three equally sampled state histories.
///
/// The first history is the reference spacecraft.
pub fn geometry_series(histories: [&[StateVector]; 3]) -> Result<Vec<FormationGeometry>> {
    let len = histories[0].len();
    if len == 0 || histories[1].len() != len || histories[2].len() != len {
        return Err(GeometryError::EmptySeries);
    }

    (0..len)
        .map(|i| FormationGeometry::from_states(&[histories[0][i], histories[1][i], histories[2][i]]))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn state(t: f64, x: f64, y: f64, z: f64) -> StateVector {
        StateVector {
            t,
            position: Vector3::new(6_900_000.0 + x, y, z),
            velocity: Vector3::new(0.0, 7600.0, 0.0),
        }
    }

    #[test]
    fn test_equilateral_triangle_metrics() {
        let l = 6000.0;
        let states = [
            state(0.0, 0.0, 0.0, 0.0),
            state(0.0, 0.0, l, 0.0),
            state(0.0, 0.0, l / 2.0, l * 3.0_f64.sqrt() / 2.0),
        ];
        let geo = FormationGeometry::from_states(&states).unwrap();

        for side in geo.side_lengths_m {
            assert!((side - l).abs() < 1e-6, "side {side}");
        }
        assert!((geo.aspect_ratio - 1.0).abs() < 1e-12);
        let expected_area = 3.0_f64.sqrt() / 4.0 * l * l;
        assert!((geo.area_m2 - expected_area).abs() / expected_area < 1e-9);
    }

    #[test]
    fn test_degenerate_line_has_infinite_aspect() {
        let states = [
            state(0.0, 0.0, 0.0, 0.0),
            state(0.0, 0.0, 1000.0, 0.0),
            state(0.0, 0.0, 2000.0, 0.0),
        ];
        let geo = FormationGeometry::from_states(&states).unwrap();
        assert!(geo.area_m2 < 1e-3);
        assert!(geo.aspect_ratio > 1.9, "collinear triangle should be far from equilateral");
    }

    #[test]
    fn test_timestamp_mismatch_rejected() {
        let states = [
            state(0.0, 0.0, 0.0, 0.0),
            state(0.5, 0.0, 1000.0, 0.0),
            state(0.0, 0.0, 2000.0, 0.0),
        ];
        assert!(matches!(
            FormationGeometry::from_states(&states),
            Err(GeometryError::TimestampMismatch(_, _))
        ));
    }

    #[test]
    fn test_series_length_mismatch_rejected() {
        let a = vec![state(0.0, 0.0, 0.0, 0.0)];
        let b = vec![state(0.0, 0.0, 1.0, 0.0)];
        let c: Vec<StateVector> = Vec::new();
        assert!(geometry_series([&a, &b, &c]).is_err());
    }
}
