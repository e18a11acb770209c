//! Classical orbital elements and element ↔ Cartesian transforms.

use chrono::{DateTime, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

use crate::constants::MU_EARTH;
use crate::{PropagationError, Result, StateVector};

/// Classical Keplerian elements at an epoch.
///
/// Angles are degrees; the semi-major axis is metres. Invariants:
/// eccentricity in [0, 1), inclination in [0°, 180°], angles normalised to
/// [0°, 360°). Use [`OrbitalElements::validate`] before propagating.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct OrbitalElements {
    pub semi_major_axis_m: f64,
    pub eccentricity: f64,
    pub inclination_deg: f64,
    pub raan_deg: f64,
    pub arg_perigee_deg: f64,
    pub mean_anomaly_deg: f64,
    pub epoch: DateTime<Utc>,
}

impl OrbitalElements {
    /// Check the data-model invariants.
    pub fn validate(&self) -> Result<()> {
        if !self.semi_major_axis_m.is_finite() || self.semi_major_axis_m <= 0.0 {
            return Err(PropagationError::InvalidOrbitalElements(format!(
                "semi-major axis must be positive, got {} m",
                self.semi_major_axis_m
            )));
        }
        if !(0.0..1.0).contains(&self.eccentricity) {
            return Err(PropagationError::InvalidOrbitalElements(format!(
                "eccentricity must be in [0, 1), got {}",
                self.eccentricity
            )));
        }
        if !(0.0..=180.0).contains(&self.inclination_deg) {
            return Err(PropagationError::InvalidOrbitalElements(format!(
                "inclination must be in [0°, 180°], got {}°",
                self.inclination_deg
            )));
        }
        Ok(())
    }

    /// Return a copy with RAAN, argument of perigee and mean anomaly wrapped
    /// into [0°, 360°).
    pub fn normalized(&self) -> Self {
        Self {
            raan_deg: self.raan_deg.rem_euclid(360.0),
            arg_perigee_deg: self.arg_perigee_deg.rem_euclid(360.0),
            mean_anomaly_deg: self.mean_anomaly_deg.rem_euclid(360.0),
            ..*self
        }
    }

    /// Mean motion, rad/s.
    pub fn mean_motion(&self) -> f64 {
        (MU_EARTH / self.semi_major_axis_m.powi(3)).sqrt()
    }

    /// Orbital period, s.
    pub fn period_s(&self) -> f64 {
        2.0 * PI / self.mean_motion()
    }

    /// ECI position/velocity at a given true anomaly (radians).
    ///
    /// Standard perifocal-to-inertial transform; the caller supplies the true
    /// anomaly from a solved Kepler equation.
    pub fn cartesian_at_true_anomaly(&self, true_anomaly_rad: f64) -> (Vector3<f64>, Vector3<f64>) {
        let ecc = self.eccentricity;
        let p = self.semi_major_axis_m * (1.0 - ecc * ecc);
        let r = p / (1.0 + ecc * true_anomaly_rad.cos());

        let r_pqw = Vector3::new(
            r * true_anomaly_rad.cos(),
            r * true_anomaly_rad.sin(),
            0.0,
        );
        let sqrt_mu_p = (MU_EARTH / p).sqrt();
        let v_pqw = Vector3::new(
            -sqrt_mu_p * true_anomaly_rad.sin(),
            sqrt_mu_p * (ecc + true_anomaly_rad.cos()),
            0.0,
        );

        let cos_raan = self.raan_deg.to_radians().cos();
        let sin_raan = self.raan_deg.to_radians().sin();
        let cos_argp = self.arg_perigee_deg.to_radians().cos();
        let sin_argp = self.arg_perigee_deg.to_radians().sin();
        let cos_inc = self.inclination_deg.to_radians().cos();
        let sin_inc = self.inclination_deg.to_radians().sin();

        let rot = |v: &Vector3<f64>| -> Vector3<f64> {
            Vector3::new(
                (cos_raan * cos_argp - sin_raan * sin_argp * cos_inc) * v.x
                    + (-cos_raan * sin_argp - sin_raan * cos_argp * cos_inc) * v.y,
                (sin_raan * cos_argp + cos_raan * sin_argp * cos_inc) * v.x
                    + (-sin_raan * sin_argp + cos_raan * cos_argp * cos_inc) * v.y,
                (sin_argp * sin_inc) * v.x + (cos_argp * sin_inc) * v.y,
            )
        };

        (rot(&r_pqw), rot(&v_pqw))
    }

    /// Recover elements from an ECI state vector.
    ///
    /// Degenerate angles (equatorial or circular orbits) collapse to zero,
    /// matching the convention of the forward transform.
    pub fn from_state_vector(state: &StateVector, epoch: DateTime<Utc>) -> Self {
        let pos = state.position;
        let vel = state.velocity;
        let r = pos.norm();
        let v = vel.norm();

        let h = pos.cross(&vel);
        let h_mag = h.norm();

        let node = Vector3::new(-h.y, h.x, 0.0);
        let node_mag = node.norm();

        let e_vec = ((v * v - MU_EARTH / r) * pos - pos.dot(&vel) * vel) / MU_EARTH;
        let ecc = e_vec.norm();

        let energy = 0.5 * v * v - MU_EARTH / r;
        let sma = -MU_EARTH / (2.0 * energy);

        let inc = (h.z / h_mag).clamp(-1.0, 1.0).acos();

        let raan = if node_mag > 1e-10 {
            let a = (node.x / node_mag).clamp(-1.0, 1.0).acos();
            if node.y < 0.0 { 2.0 * PI - a } else { a }
        } else {
            0.0
        };

        let argp = if node_mag > 1e-10 && ecc > 1e-11 {
            let cos_argp = (node.dot(&e_vec) / (node_mag * ecc)).clamp(-1.0, 1.0);
            let w = cos_argp.acos();
            if e_vec.z < 0.0 { 2.0 * PI - w } else { w }
        } else {
            0.0
        };

        let true_anom = if ecc > 1e-11 {
            let cos_nu = (e_vec.dot(&pos) / (ecc * r)).clamp(-1.0, 1.0);
            let nu = cos_nu.acos();
            if pos.dot(&vel) < 0.0 { 2.0 * PI - nu } else { nu }
        } else if node_mag > 1e-10 {
            // Circular inclined: measure from the ascending node
            let cos_u = (node.dot(&pos) / (node_mag * r)).clamp(-1.0, 1.0);
            let u = cos_u.acos();
            if pos.z < 0.0 { 2.0 * PI - u } else { u }
        } else {
            // Circular equatorial: measure from the x axis
            let l = (pos.x / r).clamp(-1.0, 1.0).acos();
            if pos.y < 0.0 { 2.0 * PI - l } else { l }
        };

        // True anomaly -> eccentric -> mean
        let ecc_anom = 2.0
            * ((1.0 - ecc).sqrt() * (true_anom / 2.0).sin())
                .atan2((1.0 + ecc).sqrt() * (true_anom / 2.0).cos());
        let mean_anom = (ecc_anom - ecc * ecc_anom.sin()).rem_euclid(2.0 * PI);

        Self {
            semi_major_axis_m: sma,
            eccentricity: ecc,
            inclination_deg: inc.to_degrees(),
            raan_deg: raan.to_degrees(),
            arg_perigee_deg: argp.to_degrees(),
            mean_anomaly_deg: mean_anom.to_degrees(),
            epoch,
        }
        .normalized()
    }

    /// Circular orbit at a given altitude, inclination and RAAN.
    pub fn circular(altitude_m: f64, inclination_deg: f64, raan_deg: f64, epoch: DateTime<Utc>) -> Self {
        Self {
            semi_major_axis_m: crate::constants::R_EARTH + altitude_m,
            eccentricity: 0.0,
            inclination_deg,
            raan_deg,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            epoch,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 21, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_validate_rejects_hyperbolic() {
        let mut el = OrbitalElements::circular(500_000.0, 97.7, 0.0, epoch());
        el.eccentricity = 1.2;
        assert!(el.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_retrograde_overflow() {
        let mut el = OrbitalElements::circular(500_000.0, 97.7, 0.0, epoch());
        el.inclination_deg = 185.0;
        assert!(el.validate().is_err());
    }

    #[test]
    fn test_normalized_wraps_angles() {
        let mut el = OrbitalElements::circular(500_000.0, 97.7, -10.0, epoch());
        el.mean_anomaly_deg = 725.0;
        let n = el.normalized();
        assert!((n.raan_deg - 350.0).abs() < 1e-9);
        assert!((n.mean_anomaly_deg - 5.0).abs() < 1e-9);
    }

    #[test]
    fn test_circular_state_speed() {
        let el = OrbitalElements::circular(500_000.0, 0.0, 0.0, epoch());
        let (pos, vel) = el.cartesian_at_true_anomaly(0.0);
        let expected = (MU_EARTH / el.semi_major_axis_m).sqrt();
        assert!((vel.norm() - expected).abs() < 1e-6, "circular speed mismatch");
        assert!((pos.norm() - el.semi_major_axis_m).abs() < 1e-6);
    }

    #[test]
    fn test_element_roundtrip() {
        let el = OrbitalElements {
            semi_major_axis_m: 6_898_137.0,
            eccentricity: 0.0012,
            inclination_deg: 97.7,
            raan_deg: 51.4,
            arg_perigee_deg: 30.0,
            mean_anomaly_deg: 0.0,
            epoch: epoch(),
        };
        // nu = 0 at perigee when M = 0
        let (pos, vel) = el.cartesian_at_true_anomaly(0.0);
        let state = StateVector { t: 0.0, position: pos, velocity: vel };
        let back = OrbitalElements::from_state_vector(&state, epoch());

        assert!((back.semi_major_axis_m - el.semi_major_axis_m).abs() < 1.0, "sma");
        assert!((back.eccentricity - el.eccentricity).abs() < 1e-8, "ecc");
        assert!((back.inclination_deg - el.inclination_deg).abs() < 1e-8, "inc");
        assert!((back.raan_deg - el.raan_deg).abs() < 1e-7, "raan");
        assert!((back.arg_perigee_deg - el.arg_perigee_deg).abs() < 1e-5, "argp");
        assert!(back.mean_anomaly_deg < 1e-4 || back.mean_anomaly_deg > 359.999, "mean anomaly");
    }

    #[test]
    fn test_period_leo() {
        let el = OrbitalElements::circular(520_000.0, 97.7, 0.0, epoch());
        let period = el.period_s();
        assert!(
            period > 5600.0 && period < 5800.0,
            "sun-synchronous LEO period should be ~95 min, got {:.0} s",
            period
        );
    }
}
