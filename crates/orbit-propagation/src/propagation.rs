//! Two-body and perturbed (J2 + drag) propagation.
//!
//! Two-body mode is closed form: Kepler's equation solved by Newton–Raphson
//! per target time. Perturbed mode integrates the equations of motion with
//! fixed-step RK4, adding J2 oblateness and atmospheric drag accelerations.

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use crate::atmosphere::AtmosphereModel;
use crate::constants::{J2, MU_EARTH, OMEGA_EARTH, R_EARTH};
use crate::elements::OrbitalElements;
use crate::{PropagationError, Result, StateVector};

/// Solver and integrator knobs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct PropagationSettings {
    /// Newton–Raphson convergence tolerance on eccentric anomaly, rad.
    pub kepler_tolerance: f64,
    /// Iteration cap for the anomaly solve.
    pub kepler_max_iterations: usize,
    /// RK4 step for perturbed propagation, s.
    pub integration_step_s: f64,
}

impl Default for PropagationSettings {
    fn default() -> Self {
        Self {
            kepler_tolerance: 1e-12,
            kepler_max_iterations: 50,
            integration_step_s: 10.0,
        }
    }
}

/// Ballistic properties used by the drag acceleration.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SpacecraftProperties {
    pub mass_kg: f64,
    pub drag_area_m2: f64,
    pub drag_coefficient: f64,
}

impl Default for SpacecraftProperties {
    fn default() -> Self {
        Self {
            mass_kg: 150.0,
            drag_area_m2: 1.5,
            drag_coefficient: 2.2,
        }
    }
}

impl SpacecraftProperties {
    /// C_D·A/m, m²/kg.
    pub fn drag_factor(&self) -> f64 {
        self.drag_coefficient * self.drag_area_m2 / self.mass_kg
    }
}

/// Solve Kepler's equation M = E - e·sin(E) for the eccentric anomaly.
pub fn solve_kepler(
    mean_anomaly_rad: f64,
    eccentricity: f64,
    tolerance: f64,
    max_iterations: usize,
) -> Result<f64> {
    // Starting guess: M itself for low eccentricity, M + e·sin(M) otherwise
    let mut e_anom = if eccentricity < 0.8 {
        mean_anomaly_rad
    } else {
        mean_anomaly_rad + eccentricity * mean_anomaly_rad.sin()
    };

    let mut residual = f64::MAX;
    for _ in 0..max_iterations {
        let f = e_anom - eccentricity * e_anom.sin() - mean_anomaly_rad;
        let f_prime = 1.0 - eccentricity * e_anom.cos();
        let delta = f / f_prime;
        e_anom -= delta;
        residual = delta.abs();
        if residual <= tolerance {
            return Ok(e_anom);
        }
    }

    Err(PropagationError::PropagationDivergence {
        iterations: max_iterations,
        residual,
    })
}

/// True anomaly from eccentric anomaly, rad.
pub fn true_anomaly_from_eccentric(eccentric_anomaly_rad: f64, eccentricity: f64) -> f64 {
    2.0 * ((1.0 + eccentricity).sqrt() * (eccentric_anomaly_rad / 2.0).sin())
        .atan2((1.0 - eccentricity).sqrt() * (eccentric_anomaly_rad / 2.0).cos())
}

/// Closed-form two-body state at `t` seconds past the element epoch.
pub fn state_at(
    elements: &OrbitalElements,
    t: f64,
    settings: &PropagationSettings,
) -> Result<StateVector> {
    let mean_anomaly =
        elements.mean_anomaly_deg.to_radians() + elements.mean_motion() * t;
    let ecc_anom = solve_kepler(
        mean_anomaly,
        elements.eccentricity,
        settings.kepler_tolerance,
        settings.kepler_max_iterations,
    )?;
    let true_anom = true_anomaly_from_eccentric(ecc_anom, elements.eccentricity);
    let (position, velocity) = elements.cartesian_at_true_anomaly(true_anom);
    Ok(StateVector { t, position, velocity })
}

/// One state vector per target time, two-body dynamics.
pub fn propagate_two_body(
    elements: &OrbitalElements,
    times_s: &[f64],
    settings: &PropagationSettings,
) -> Result<Vec<StateVector>> {
    elements.validate()?;
    times_s.iter().map(|&t| state_at(elements, t, settings)).collect()
}

fn perturbed_acceleration(
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
) -> Vector3<f64> {
    let r = position.norm();
    let r3 = r.powi(3);
    let mut accel = -MU_EARTH / r3 * position;

    // J2 oblateness
    let z2_r2 = (position.z / r).powi(2);
    let factor = -1.5 * J2 * MU_EARTH * R_EARTH.powi(2) / r.powi(5);
    accel.x += factor * position.x * (1.0 - 5.0 * z2_r2);
    accel.y += factor * position.y * (1.0 - 5.0 * z2_r2);
    accel.z += factor * position.z * (3.0 - 5.0 * z2_r2);

    // Drag against the co-rotating atmosphere
    let altitude = r - R_EARTH;
    if altitude < 1_000_000.0 {
        let rho = atmosphere.density_kg_m3(altitude);
        let omega = Vector3::new(0.0, 0.0, OMEGA_EARTH);
        let v_rel = velocity - omega.cross(position);
        let v_rel_mag = v_rel.norm();
        if v_rel_mag > 1e-10 {
            accel -= 0.5 * rho * spacecraft.drag_factor() * v_rel_mag * v_rel;
        }
    }

    accel
}

fn rk4_step(
    t: f64,
    position: &Vector3<f64>,
    velocity: &Vector3<f64>,
    dt: f64,
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
) -> (f64, Vector3<f64>, Vector3<f64>) {
    let accel = |p: &Vector3<f64>, v: &Vector3<f64>| perturbed_acceleration(p, v, spacecraft, atmosphere);

    let k1_r = *velocity;
    let k1_v = accel(position, velocity);
    let k2_r = velocity + k1_v * (dt * 0.5);
    let k2_v = accel(&(position + k1_r * (dt * 0.5)), &(velocity + k1_v * (dt * 0.5)));
    let k3_r = velocity + k2_v * (dt * 0.5);
    let k3_v = accel(&(position + k2_r * (dt * 0.5)), &(velocity + k2_v * (dt * 0.5)));
    let k4_r = velocity + k3_v * dt;
    let k4_v = accel(&(position + k3_r * dt), &(velocity + k3_v * dt));

    (
        t + dt,
        position + (k1_r + 2.0 * k2_r + 2.0 * k3_r + k4_r) * (dt / 6.0),
        velocity + (k1_v + 2.0 * k2_v + 2.0 * k3_v + k4_v) * (dt / 6.0),
    )
}

/// One state vector per target time, two-body + J2 + drag dynamics.
///
/// Target times must be non-negative and ascending; integration starts from
/// the element epoch and samples each target exactly.
pub fn propagate_perturbed(
    elements: &OrbitalElements,
    times_s: &[f64],
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
    settings: &PropagationSettings,
) -> Result<Vec<StateVector>> {
    elements.validate()?;

    let initial = state_at(elements, 0.0, settings)?;
    let mut t = 0.0;
    let mut position = initial.position;
    let mut velocity = initial.velocity;

    let mut out = Vec::with_capacity(times_s.len());
    for &target in times_s {
        while t < target {
            let dt = settings.integration_step_s.min(target - t);
            let (nt, np, nv) = rk4_step(t, &position, &velocity, dt, spacecraft, atmosphere);
            t = nt;
            position = np;
            velocity = nv;
        }
        out.push(StateVector { t: target, position, velocity });
    }
    Ok(out)
}
