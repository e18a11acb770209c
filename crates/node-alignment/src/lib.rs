//! Node Alignment Library
//!
//! Bounded, derivative-free search for the RAAN that carries the formation
//! centroid over the ground target: golden-section minimisation of the
//! absolute centroid cross-track distance at the evaluation time. Each
//! candidate evaluation re-runs the propagator and geometry engine.

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use formation_geometry::{
    cross_track_distance_m, design_formation, FormationGeometry, GeodeticPoint, GeometryError,
};
use orbit_propagation::{propagation, OrbitalElements, PropagationSettings};

/// Inverse golden ratio.
const INV_PHI: f64 = 0.618_033_988_749_894_8;

/// Spacing used to sample the centroid track direction, s.
const TRACK_SAMPLE_DT_S: f64 = 10.0;

#[derive(Error, Debug)]
pub enum SolverError {
    #[error("RAAN search did not converge after {iterations} iterations; best candidate {best_raan_deg:.6}° with residual {residual_m:.1} m")]
    NonConvergence {
        best_raan_deg: f64,
        residual_m: f64,
        iterations: usize,
    },
    #[error(transparent)]
    Geometry(#[from] GeometryError),
}

impl From<orbit_propagation::PropagationError> for SolverError {
    fn from(err: orbit_propagation::PropagationError) -> Self {
        SolverError::Geometry(GeometryError::Propagation(err))
    }
}

pub type Result<T> = std::result::Result<T, SolverError>;

/// Bounded search configuration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RaanSearchConfig {
    pub lower_deg: f64,
    pub upper_deg: f64,
    /// Bracket width at which the search is considered converged, deg.
    pub tolerance_deg: f64,
    pub max_iterations: usize,
}

impl Default for RaanSearchConfig {
    fn default() -> Self {
        Self {
            lower_deg: 0.0,
            upper_deg: 360.0,
            tolerance_deg: 1e-4,
            max_iterations: 60,
        }
    }
}

/// Converged (or best-found) node orientation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct RaanSolution {
    pub raan_deg: f64,
    pub residual_m: f64,
    pub iterations: usize,
}

/// Centroid cross-track distance to the target for one candidate RAAN.
///
/// Re-runs formation design, propagation and geometry for the candidate.
fn evaluate_candidate(
    reference: &OrbitalElements,
    raan_deg: f64,
    side_length_m: f64,
    target: &GeodeticPoint,
    evaluation_time_s: f64,
    settings: &PropagationSettings,
) -> Result<f64> {
    let candidate = OrbitalElements { raan_deg, ..*reference }.normalized();
    let design = design_formation(&candidate, side_length_m, evaluation_time_s, settings)?;

    let mut centroid_track = [GeodeticPoint { latitude_deg: 0.0, longitude_deg: 0.0 }; 2];
    for (i, t) in [evaluation_time_s, evaluation_time_s + TRACK_SAMPLE_DT_S]
        .iter()
        .enumerate()
    {
        let states = [
            propagation::state_at(&design.elements[0], *t, settings)?,
            propagation::state_at(&design.elements[1], *t, settings)?,
            propagation::state_at(&design.elements[2], *t, settings)?,
        ];
        centroid_track[i] = FormationGeometry::from_states(&states)?.centroid_ground();
    }

    Ok(cross_track_distance_m(&centroid_track[0], &centroid_track[1], target))
}

/// Golden-section search over the RAAN interval.
///
/// Deterministic: among equally good residuals the earlier candidate in
/// search order is kept. Returns `NonConvergence` with the best candidate
/// found when the iteration cap is reached before the bracket closes.
pub fn align_raan(
    reference: &OrbitalElements,
    side_length_m: f64,
    target: &GeodeticPoint,
    evaluation_time_s: f64,
    search: &RaanSearchConfig,
    settings: &PropagationSettings,
) -> Result<RaanSolution> {
    let mut lo = search.lower_deg;
    let mut hi = search.upper_deg;

    let eval = |raan: f64| {
        evaluate_candidate(reference, raan, side_length_m, target, evaluation_time_s, settings)
    };

    let mut x1 = hi - INV_PHI * (hi - lo);
    let mut x2 = lo + INV_PHI * (hi - lo);
    let mut f1 = eval(x1)?;
    let mut f2 = eval(x2)?;

    // Best candidate in search order; strict comparison keeps the first
    let mut best = if f1 <= f2 { (x1, f1) } else { (x2, f2) };

    let mut iterations = 0;
    while hi - lo > search.tolerance_deg {
        if iterations >= search.max_iterations {
            return Err(SolverError::NonConvergence {
                best_raan_deg: best.0,
                residual_m: best.1,
                iterations,
            });
        }
        iterations += 1;

        if f1 <= f2 {
            hi = x2;
            x2 = x1;
            f2 = f1;
            x1 = hi - INV_PHI * (hi - lo);
            f1 = eval(x1)?;
        } else {
            lo = x1;
            x1 = x2;
            f1 = f2;
            x2 = lo + INV_PHI * (hi - lo);
            f2 = eval(x2)?;
        }

        let (cand, f_cand) = if f1 <= f2 { (x1, f1) } else { (x2, f2) };
        if f_cand < best.1 {
            best = (cand, f_cand);
        }

        debug!(
            iteration = iterations,
            bracket_deg = hi - lo,
            candidate_deg = cand,
            residual_m = f_cand,
            "raan search step"
        );
    }

    Ok(RaanSolution {
        raan_deg: best.0,
        residual_m: best.1,
        iterations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use chrono::{DateTime, Utc};

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 21, 12, 0, 0).unwrap()
    }

    fn reference(raan_deg: f64) -> OrbitalElements {
        OrbitalElements {
            semi_major_axis_m: 6_898_137.0,
            eccentricity: 0.0,
            inclination_deg: 97.7,
            raan_deg,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            epoch: epoch(),
        }
    }

    /// Sub-centroid point for a known-good RAAN, used as the search target.
    fn target_for(raan_deg: f64, t_eval: f64, settings: &PropagationSettings) -> GeodeticPoint {
        let design = design_formation(&reference(raan_deg), 6000.0, t_eval, settings).unwrap();
        let states = [
            propagation::state_at(&design.elements[0], t_eval, settings).unwrap(),
            propagation::state_at(&design.elements[1], t_eval, settings).unwrap(),
            propagation::state_at(&design.elements[2], t_eval, settings).unwrap(),
        ];
        FormationGeometry::from_states(&states).unwrap().centroid_ground()
    }

    #[test]
    fn test_search_recovers_known_node() {
        let settings = PropagationSettings::default();
        let t_eval = 900.0;
        let truth = 51.4;
        let target = target_for(truth, t_eval, &settings);

        let search = RaanSearchConfig {
            lower_deg: truth - 2.0,
            upper_deg: truth + 2.0,
            tolerance_deg: 1e-4,
            max_iterations: 60,
        };
        let solution =
            align_raan(&reference(truth), 6000.0, &target, t_eval, &search, &settings).unwrap();

        assert!(
            (solution.raan_deg - truth).abs() < 0.01,
            "solved RAAN {:.4}° vs truth {truth}°",
            solution.raan_deg
        );
        assert!(
            solution.residual_m < 1000.0,
            "cross-track residual too large: {:.1} m",
            solution.residual_m
        );
    }

    #[test]
    fn test_iteration_cap_reports_best_candidate() {
        let settings = PropagationSettings::default();
        let t_eval = 900.0;
        let target = target_for(51.4, t_eval, &settings);

        let search = RaanSearchConfig {
            lower_deg: 49.4,
            upper_deg: 53.4,
            tolerance_deg: 1e-9,
            max_iterations: 3,
        };
        let err = align_raan(&reference(51.4), 6000.0, &target, t_eval, &search, &settings)
            .unwrap_err();

        match err {
            SolverError::NonConvergence { best_raan_deg, residual_m, iterations } => {
                assert_eq!(iterations, 3);
                assert!((49.4..=53.4).contains(&best_raan_deg));
                assert!(residual_m.is_finite());
            }
            other => panic!("expected NonConvergence, got {other:?}"),
        }
    }

    #[test]
    fn test_residual_improves_with_tighter_tolerance() {
        let settings = PropagationSettings::default();
        let t_eval = 900.0;
        let target = target_for(120.0, t_eval, &settings);

        let coarse = RaanSearchConfig {
            lower_deg: 118.0,
            upper_deg: 122.0,
            tolerance_deg: 0.5,
            max_iterations: 60,
        };
        let fine = RaanSearchConfig { tolerance_deg: 1e-4, ..coarse };

        let sol_coarse =
            align_raan(&reference(120.0), 6000.0, &target, t_eval, &coarse, &settings).unwrap();
        let sol_fine =
            align_raan(&reference(120.0), 6000.0, &target, t_eval, &fine, &settings).unwrap();
        assert!(
            sol_fine.residual_m <= sol_coarse.residual_m,
            "finer tolerance should not worsen the residual"
        );
    }
}
