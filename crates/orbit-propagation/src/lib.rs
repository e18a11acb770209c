//! Orbit Propagation Library
//!
//! Classical element handling, Kepler's equation, and two-body / J2+drag
//! state propagation for the three-satellite formation mission.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod atmosphere;
pub mod elements;
pub mod propagation;

pub use atmosphere::AtmosphereModel;
pub use elements::OrbitalElements;
pub use propagation::{
    propagate_perturbed, propagate_two_body, solve_kepler, PropagationSettings,
    SpacecraftProperties,
};

#[derive(Error, Debug)]
pub enum PropagationError {
    #[error("Invalid orbital elements: {0}")]
    InvalidOrbitalElements(String),
    #[error("Kepler solve did not converge after {iterations} iterations (residual {residual:.3e} rad)")]
    PropagationDivergence { iterations: usize, residual: f64 },
}

pub type Result<T> = std::result::Result<T, PropagationError>;

pub mod constants {
    //! Physical constants (WGS-84 / EGM96 values).

    /// Earth gravitational parameter, m³/s²
    pub const MU_EARTH: f64 = 3.986_004_418e14;
    /// Earth equatorial radius, m
    pub const R_EARTH: f64 = 6_378_137.0;
    /// Second zonal harmonic (oblateness)
    pub const J2: f64 = 1.082_626_68e-3;
    /// Earth rotation rate, rad/s
    pub const OMEGA_EARTH: f64 = 7.292_115_855_3e-5;
    /// Earth flattening (WGS-84)
    pub const EARTH_FLATTENING: f64 = 1.0 / 298.257_223_563;
}

/// Inertial state at a propagation time tag.
///
/// `t` is seconds since the run epoch; position and velocity are ECI metres
/// and metres per second. A state vector is immutable once produced by the
/// propagation run that owns it.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StateVector {
    pub t: f64,
    pub position: Vector3<f64>,
    pub velocity: Vector3<f64>,
}

impl StateVector {
    pub fn radius_m(&self) -> f64 {
        self.position.norm()
    }

    pub fn speed_ms(&self) -> f64 {
        self.velocity.norm()
    }

    pub fn altitude_m(&self) -> f64 {
        self.radius_m() - constants::R_EARTH
    }

    /// Specific angular momentum vector, m²/s.
    pub fn angular_momentum(&self) -> Vector3<f64> {
        self.position.cross(&self.velocity)
    }

    /// Specific mechanical energy, J/kg. Negative for bound orbits.
    pub fn specific_energy(&self) -> f64 {
        0.5 * self.speed_ms().powi(2) - constants::MU_EARTH / self.radius_m()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_vector_energy_sign() {
        // Circular LEO state: bound orbit, negative energy
        let r = constants::R_EARTH + 500_000.0;
        let v = (constants::MU_EARTH / r).sqrt();
        let state = StateVector {
            t: 0.0,
            position: Vector3::new(r, 0.0, 0.0),
            velocity: Vector3::new(0.0, v, 0.0),
        };
        assert!(state.specific_energy() < 0.0, "LEO orbit must be bound");
        assert!((state.altitude_m() - 500_000.0).abs() < 1.0);
    }
}
