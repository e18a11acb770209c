//! Injection-error recovery campaign.
//!
//! Each trial perturbs the nominal injection state with Gaussian position,
//! velocity, drag-coefficient and density errors, re-runs the perturbed
//! propagator, and estimates the impulsive delta-v needed to restore the
//! nominal relative geometry within the recovery horizon. A trial whose
//! recovery cost exceeds the budget is a `RecoveryFailure`: recorded in the
//! failure rate, never a campaign abort.

use nalgebra::Vector3;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};
use rand_pcg::Pcg64Mcg;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use formation_geometry::{ground_point, haversine_m};
use orbit_propagation::{
    propagate_perturbed, AtmosphereModel, OrbitalElements, PropagationSettings,
    SpacecraftProperties, StateVector,
};

use crate::{CancellationToken, DispersionError, DispersionStatistics, Result};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct InjectionDispersionConfig {
    pub trial_count: usize,
    /// Total-RMS injection position error, m; split per axis as σ/√3.
    pub position_sigma_m: f64,
    /// Total-RMS injection velocity error, m/s; split per axis as σ/√3.
    pub velocity_sigma_ms: f64,
    /// Relative drag-coefficient error (1σ).
    pub drag_coefficient_sigma: f64,
    /// Relative atmospheric-density error (1σ).
    pub density_sigma: f64,
    pub recovery_horizon_s: f64,
    pub delta_v_budget_ms: f64,
    pub seed: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InjectionDispersionResult {
    pub trial_count: usize,
    /// Trials whose recovery stayed within budget and horizon.
    pub success_fraction: f64,
    pub failure_count: usize,
    pub recovery_delta_v_ms: DispersionStatistics,
    pub ground_distance_delta_m: DispersionStatistics,
}

/// Per-trial perturbation, generated sequentially from the seed.
/// Ephemeral: consumed by its trial and dropped after aggregation.
#[derive(Debug, Clone, Copy)]
struct TrialPerturbation {
    position_error: Vector3<f64>,
    velocity_error: Vector3<f64>,
    drag_coefficient_scale: f64,
    density_scale: f64,
}

fn gaussian(config_sigma: f64, label: &str) -> Result<Normal<f64>> {
    Normal::new(0.0, config_sigma)
        .map_err(|e| DispersionError::InvalidSigma(format!("{label}: {e}")))
}

fn generate_perturbations(
    config: &InjectionDispersionConfig,
) -> Result<Vec<TrialPerturbation>> {
    let mut rng = Pcg64Mcg::seed_from_u64(config.seed);
    let axis_pos = gaussian(config.position_sigma_m / 3.0_f64.sqrt(), "position")?;
    let axis_vel = gaussian(config.velocity_sigma_ms / 3.0_f64.sqrt(), "velocity")?;
    let cd = gaussian(config.drag_coefficient_sigma, "drag coefficient")?;
    let rho = gaussian(config.density_sigma, "density")?;

    Ok((0..config.trial_count)
        .map(|_| TrialPerturbation {
            position_error: Vector3::new(
                axis_pos.sample(&mut rng),
                axis_pos.sample(&mut rng),
                axis_pos.sample(&mut rng),
            ),
            velocity_error: Vector3::new(
                axis_vel.sample(&mut rng),
                axis_vel.sample(&mut rng),
                axis_vel.sample(&mut rng),
            ),
            drag_coefficient_scale: 1.0 + cd.sample(&mut rng),
            density_scale: 1.0 + rho.sample(&mut rng),
        })
        .collect())
}

struct TrialOutcome {
    recovery_delta_v_ms: f64,
    ground_distance_delta_m: f64,
    recovered: bool,
}

fn evaluate_trial(
    perturbation: &TrialPerturbation,
    nominal_injection: &StateVector,
    nominal_at_horizon: &StateVector,
    config: &InjectionDispersionConfig,
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
    settings: &PropagationSettings,
    epoch: chrono::DateTime<chrono::Utc>,
) -> Result<TrialOutcome> {
    let perturbed_state = StateVector {
        t: 0.0,
        position: nominal_injection.position + perturbation.position_error,
        velocity: nominal_injection.velocity + perturbation.velocity_error,
    };
    let perturbed_elements = OrbitalElements::from_state_vector(&perturbed_state, epoch);

    let trial_spacecraft = SpacecraftProperties {
        drag_coefficient: spacecraft.drag_coefficient * perturbation.drag_coefficient_scale,
        ..*spacecraft
    };
    let trial_atmosphere = AtmosphereModel::with_solar_activity(
        atmosphere.solar_activity * perturbation.density_scale,
    );

    let dispersed = propagate_perturbed(
        &perturbed_elements,
        &[config.recovery_horizon_s],
        &trial_spacecraft,
        &trial_atmosphere,
        settings,
    )?;

    let ground_distance_delta_m = haversine_m(
        &ground_point(&dispersed[0]),
        &ground_point(nominal_at_horizon),
    );

    // Impulsive two-burn estimate: null the velocity error now, close the
    // position error over the horizon
    let recovery_delta_v_ms = perturbation.velocity_error.norm()
        + 2.0 * perturbation.position_error.norm() / config.recovery_horizon_s;

    Ok(TrialOutcome {
        recovery_delta_v_ms,
        ground_distance_delta_m,
        recovered: recovery_delta_v_ms <= config.delta_v_budget_ms,
    })
}

/// Run the campaign: sequential generation, parallel evaluation, one
/// join-barrier reduction.
pub fn run_injection_dispersion(
    nominal: &OrbitalElements,
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
    config: &InjectionDispersionConfig,
    settings: &PropagationSettings,
    token: &CancellationToken,
) -> Result<InjectionDispersionResult> {
    if config.trial_count == 0 {
        return Err(DispersionError::EmptyCampaign);
    }
    nominal.validate()?;

    info!(
        trials = config.trial_count,
        seed = config.seed,
        "injection dispersion campaign"
    );

    let perturbations = generate_perturbations(config)?;
    let nominal_injection =
        orbit_propagation::propagation::state_at(nominal, 0.0, settings)?;
    let nominal_at_horizon = propagate_perturbed(
        nominal,
        &[config.recovery_horizon_s],
        spacecraft,
        atmosphere,
        settings,
    )?[0];

    let outcomes: Vec<Result<Option<TrialOutcome>>> = perturbations
        .par_iter()
        .map(|perturbation| {
            if token.is_cancelled() {
                return Ok(None);
            }
            evaluate_trial(
                perturbation,
                &nominal_injection,
                &nominal_at_horizon,
                config,
                spacecraft,
                atmosphere,
                settings,
                nominal.epoch,
            )
            .map(Some)
        })
        .collect();

    // Join barrier: all trials are in before the accumulator is touched
    let mut delta_vs = Vec::with_capacity(config.trial_count);
    let mut ground_deltas = Vec::with_capacity(config.trial_count);
    let mut failure_count = 0;
    for outcome in outcomes {
        match outcome? {
            Some(trial) => {
                if !trial.recovered {
                    failure_count += 1;
                    debug!(
                        delta_v_ms = trial.recovery_delta_v_ms,
                        "recovery failure recorded"
                    );
                }
                delta_vs.push(trial.recovery_delta_v_ms);
                ground_deltas.push(trial.ground_distance_delta_m);
            }
            None => {
                return Err(DispersionError::Cancelled {
                    completed: delta_vs.len(),
                    requested: config.trial_count,
                })
            }
        }
    }

    Ok(InjectionDispersionResult {
        trial_count: config.trial_count,
        success_fraction: 1.0 - failure_count as f64 / config.trial_count as f64,
        failure_count,
        recovery_delta_v_ms: DispersionStatistics::from_samples(&delta_vs),
        ground_distance_delta_m: DispersionStatistics::from_samples(&ground_deltas),
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

    fn nominal() -> OrbitalElements {
        OrbitalElements {
            semi_major_axis_m: 6_898_137.0,
            eccentricity: 0.001,
            inclination_deg: 97.7,
            raan_deg: 51.4,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            epoch: epoch(),
        }
    }

    fn config(seed: u64) -> InjectionDispersionConfig {
        InjectionDispersionConfig {
            trial_count: 300,
            position_sigma_m: 250.0,
            velocity_sigma_ms: 0.005,
            drag_coefficient_sigma: 0.1,
            density_sigma: 0.2,
            recovery_horizon_s: 43_200.0,
            delta_v_budget_ms: 15.0,
            seed,
        }
    }

    fn fast_settings() -> PropagationSettings {
        PropagationSettings { integration_step_s: 120.0, ..Default::default() }
    }

    #[test]
    fn test_nominal_campaign_all_recover() {
        let result = run_injection_dispersion(
            &nominal(),
            &SpacecraftProperties::default(),
            &AtmosphereModel::default(),
            &config(42),
            &fast_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(result.trial_count, 300);
        assert!(
            (result.success_fraction - 1.0).abs() < 1e-12,
            "sub-budget sigmas must all recover, got {}",
            result.success_fraction
        );
        assert!(
            result.recovery_delta_v_ms.p95 < 15.0,
            "p95 delta-v {} must stay below budget",
            result.recovery_delta_v_ms.p95
        );
        assert!(result.recovery_delta_v_ms.mean > 0.0);
        assert!(result.ground_distance_delta_m.max > 0.0);
    }

    #[test]
    fn test_campaign_reproducible_from_seed() {
        let run = || {
            run_injection_dispersion(
                &nominal(),
                &SpacecraftProperties::default(),
                &AtmosphereModel::default(),
                &InjectionDispersionConfig { trial_count: 40, ..config(7) },
                &fast_settings(),
                &CancellationToken::new(),
            )
            .unwrap()
        };
        let a = run();
        let b = run();
        assert_eq!(a.recovery_delta_v_ms.p95, b.recovery_delta_v_ms.p95);
        assert_eq!(a.ground_distance_delta_m.mean, b.ground_distance_delta_m.mean);
    }

    #[test]
    fn test_different_seeds_differ() {
        let run = |seed| {
            run_injection_dispersion(
                &nominal(),
                &SpacecraftProperties::default(),
                &AtmosphereModel::default(),
                &InjectionDispersionConfig { trial_count: 40, ..config(seed) },
                &fast_settings(),
                &CancellationToken::new(),
            )
            .unwrap()
        };
        assert_ne!(run(1).recovery_delta_v_ms.mean, run(2).recovery_delta_v_ms.mean);
    }

    #[test]
    fn test_tiny_budget_records_failures() {
        let mut cfg = InjectionDispersionConfig { trial_count: 50, ..config(42) };
        cfg.delta_v_budget_ms = 1e-9;
        let result = run_injection_dispersion(
            &nominal(),
            &SpacecraftProperties::default(),
            &AtmosphereModel::default(),
            &cfg,
            &fast_settings(),
            &CancellationToken::new(),
        )
        .unwrap();

        assert_eq!(result.failure_count, 50, "every trial should miss a zero budget");
        assert!(result.success_fraction.abs() < 1e-12);
    }

    #[test]
    fn test_pre_cancelled_campaign_reports_cancellation() {
        let token = CancellationToken::new();
        token.cancel();
        let err = run_injection_dispersion(
            &nominal(),
            &SpacecraftProperties::default(),
            &AtmosphereModel::default(),
            &InjectionDispersionConfig { trial_count: 10, ..config(42) },
            &fast_settings(),
            &token,
        )
        .unwrap_err();
        assert!(matches!(err, DispersionError::Cancelled { .. }));
    }

    #[test]
    fn test_zero_trials_rejected() {
        let err = run_injection_dispersion(
            &nominal(),
            &SpacecraftProperties::default(),
            &AtmosphereModel::default(),
            &InjectionDispersionConfig { trial_count: 0, ..config(42) },
            &fast_settings(),
            &CancellationToken::new(),
        )
        .unwrap_err();
        assert!(matches!(err, DispersionError::EmptyCampaign));
    }
}
