//! Station-keeping drift and delta-v budgeting.
//!
//! Drift accumulated over one correction cadence is measured by propagating
//! the full J2+drag dynamics against a J2-only baseline; the per-burn
//! delta-v restores the drag-induced semi-major-axis decay, estimated from
//! the ring-decay rate of the same atmosphere model.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use orbit_propagation::{
    propagate_perturbed, AtmosphereModel, OrbitalElements, PropagationSettings,
    SpacecraftProperties,
};

use crate::Result;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// One scheduled correction burn.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceEvent {
    pub spacecraft: String,
    pub delta_v_ms: f64,
    pub scheduled: DateTime<Utc>,
}

/// Station-keeping budget for one spacecraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MaintenanceAssessment {
    pub spacecraft: String,
    /// Position drift accumulated over one cadence, m.
    pub drift_per_cadence_m: f64,
    pub delta_v_per_burn_ms: f64,
    pub annual_delta_v_ms: f64,
    pub cadence_s: f64,
}

impl MaintenanceAssessment {
    /// Correction schedule starting one cadence after the epoch.
    pub fn scheduled_events(&self, epoch: DateTime<Utc>, count: usize) -> Vec<MaintenanceEvent> {
        (1..=count)
            .map(|k| MaintenanceEvent {
                spacecraft: self.spacecraft.clone(),
                delta_v_ms: self.delta_v_per_burn_ms,
                scheduled: epoch
                    + Duration::milliseconds((k as f64 * self.cadence_s * 1000.0).round() as i64),
            })
            .collect()
    }
}

/// Analyze one spacecraft over a single correction cadence.
pub fn analyze_station_keeping(
    spacecraft_id: &str,
    elements: &OrbitalElements,
    spacecraft: &SpacecraftProperties,
    atmosphere: &AtmosphereModel,
    cadence_s: f64,
    settings: &PropagationSettings,
) -> Result<MaintenanceAssessment> {
    // Drag vs J2-only baseline isolates the secular drag drift
    let times = [cadence_s];
    let with_drag = propagate_perturbed(elements, &times, spacecraft, atmosphere, settings)?;
    let baseline_props = SpacecraftProperties { drag_area_m2: 0.0, ..*spacecraft };
    let baseline = propagate_perturbed(elements, &times, &baseline_props, atmosphere, settings)?;

    let drift_per_cadence_m = (with_drag[0].position - baseline[0].position).norm();

    // Ring-decay rate at the mean altitude: da per orbit = -2π (C_D A/m) ρ a²
    let a = elements.semi_major_axis_m;
    let n = elements.mean_motion();
    let density = atmosphere.density_kg_m3(a - orbit_propagation::constants::R_EARTH);
    let decay_per_orbit_m =
        2.0 * std::f64::consts::PI * spacecraft.drag_factor() * density * a * a;
    let orbits_per_cadence = cadence_s / elements.period_s();
    let decay_per_cadence_m = decay_per_orbit_m * orbits_per_cadence;

    // Small-correction Hohmann estimate: dv = n·da/2
    let delta_v_per_burn_ms = 0.5 * n * decay_per_cadence_m;
    let annual_delta_v_ms = delta_v_per_burn_ms * (SECONDS_PER_YEAR / cadence_s);

    Ok(MaintenanceAssessment {
        spacecraft: spacecraft_id.to_string(),
        drift_per_cadence_m,
        delta_v_per_burn_ms,
        annual_delta_v_ms,
        cadence_s,
    })
}
