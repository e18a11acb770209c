//! Mission configuration.
//!
//! Every externally supplied field, validated once at construction. The
//! pipeline never re-validates mid-flight; a bad field surfaces here before
//! any computation begins.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use dispersion_engine::{DragDispersionConfig, InjectionDispersionConfig};
use formation_geometry::{GeodeticPoint, ResamplingChoice};
use ground_contact::GroundStation;
use orbit_propagation::constants::EARTH_FLATTENING;
use orbit_propagation::{AtmosphereModel, OrbitalElements, PropagationSettings, SpacecraftProperties};

#[derive(Error, Debug)]
#[error("Configuration error in {field}: {reason}")]
pub struct ConfigurationError {
    pub field: &'static str,
    pub reason: String,
}

fn invalid(field: &'static str, reason: impl Into<String>) -> ConfigurationError {
    ConfigurationError { field, reason: reason.into() }
}

/// Triangle vertex roles for the three spacecraft.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TriangleVertex {
    Reference,
    AlongTrack,
    Apex,
}

/// Plane/vertex assignment for one spacecraft.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpacecraftPlane {
    pub name: String,
    pub vertex: TriangleVertex,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationConfig {
    pub reference: OrbitalElements,
    /// Exactly three entries, one per triangle vertex.
    pub spacecraft: Vec<SpacecraftPlane>,

    // Formation geometry
    pub side_length_m: f64,
    pub requested_window_duration_s: f64,
    pub time_step_s: f64,
    pub aspect_ratio_tolerance: f64,
    pub ground_distance_tolerance_m: f64,
    pub target: GeodeticPoint,
    pub analysis_horizon_s: f64,

    // Dynamics
    pub spacecraft_properties: SpacecraftProperties,
    pub atmosphere: AtmosphereModel,
    pub propagation: PropagationSettings,
    /// Interpolation used to evaluate geometry between propagation samples.
    pub resampling: ResamplingChoice,

    // Node alignment
    pub raan_search_half_width_deg: f64,
    pub raan_tolerance_deg: f64,
    pub raan_max_iterations: usize,

    // Maintenance
    pub maintenance_cadence_s: f64,
    pub annual_delta_v_budget_ms: f64,

    // Ground contact
    pub ground_station: GroundStation,
    pub latency_ceiling_s: f64,

    // Dispersion
    pub injection: InjectionDispersionConfig,
    pub drag: DragDispersionConfig,
    pub failure_rate_ceiling: f64,
}

impl FormationConfig {
    /// Validate the whole field set. Called once, up front.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.reference
            .validate()
            .map_err(|e| invalid("reference", e.to_string()))?;

        if self.spacecraft.len() != 3 {
            return Err(invalid(
                "spacecraft",
                format!("exactly three spacecraft required, got {}", self.spacecraft.len()),
            ));
        }
        for vertex in [TriangleVertex::Reference, TriangleVertex::AlongTrack, TriangleVertex::Apex] {
            if self.spacecraft.iter().filter(|s| s.vertex == vertex).count() != 1 {
                return Err(invalid("spacecraft", format!("vertex {vertex:?} must be assigned exactly once")));
            }
        }
        for (i, a) in self.spacecraft.iter().enumerate() {
            if a.name.trim().is_empty() {
                return Err(invalid("spacecraft", "spacecraft names must be non-empty"));
            }
            if self.spacecraft[i + 1..].iter().any(|b| b.name == a.name) {
                return Err(invalid("spacecraft", format!("duplicate spacecraft name {:?}", a.name)));
            }
        }

        if self.side_length_m <= 0.0 {
            return Err(invalid("side_length_m", "must be positive"));
        }
        if self.time_step_s <= 0.0 {
            return Err(invalid("time_step_s", "must be positive"));
        }
        if self.analysis_horizon_s < self.time_step_s {
            return Err(invalid("analysis_horizon_s", "must cover at least one time step"));
        }
        if self.requested_window_duration_s <= 0.0 {
            return Err(invalid("requested_window_duration_s", "must be positive"));
        }
        if self.aspect_ratio_tolerance < 1.0 {
            return Err(invalid("aspect_ratio_tolerance", "must be at least 1.0"));
        }
        if self.ground_distance_tolerance_m <= 0.0 {
            return Err(invalid("ground_distance_tolerance_m", "must be positive"));
        }
        if !(-90.0..=90.0).contains(&self.target.latitude_deg) {
            return Err(invalid("target", "latitude must be in [-90°, 90°]"));
        }

        // The orbit must actually reach the target latitude
        let inc = self.reference.inclination_deg.to_radians();
        let lat_gc = ((1.0 - EARTH_FLATTENING).powi(2)
            * self.target.latitude_deg.to_radians().tan())
        .atan();
        if lat_gc.sin().abs() > inc.sin().abs() {
            return Err(invalid(
                "target",
                format!(
                    "latitude {:.3}° is outside the ground-track band of a {:.2}° inclination orbit",
                    self.target.latitude_deg, self.reference.inclination_deg
                ),
            ));
        }

        if self.raan_search_half_width_deg <= 0.0 || self.raan_search_half_width_deg > 180.0 {
            return Err(invalid("raan_search_half_width_deg", "must be in (0°, 180°]"));
        }
        if self.raan_tolerance_deg <= 0.0 {
            return Err(invalid("raan_tolerance_deg", "must be positive"));
        }
        if self.raan_max_iterations == 0 {
            return Err(invalid("raan_max_iterations", "must be positive"));
        }

        if self.maintenance_cadence_s <= 0.0 {
            return Err(invalid("maintenance_cadence_s", "must be positive"));
        }
        if self.annual_delta_v_budget_ms <= 0.0 {
            return Err(invalid("annual_delta_v_budget_ms", "must be positive"));
        }
        if self.latency_ceiling_s <= 0.0 {
            return Err(invalid("latency_ceiling_s", "must be positive"));
        }

        if self.injection.trial_count == 0 {
            return Err(invalid("injection", "trial count must be positive"));
        }
        if self.injection.recovery_horizon_s <= 0.0 {
            return Err(invalid("injection", "recovery horizon must be positive"));
        }
        if self.injection.delta_v_budget_ms <= 0.0 {
            return Err(invalid("injection", "delta-v budget must be positive"));
        }
        if self.drag.trial_count == 0 {
            return Err(invalid("drag", "trial count must be positive"));
        }
        if self.drag.horizon_s <= 0.0 {
            return Err(invalid("drag", "horizon must be positive"));
        }
        if !(0.0..=1.0).contains(&self.failure_rate_ceiling) {
            return Err(invalid("failure_rate_ceiling", "must be in [0, 1]"));
        }

        Ok(())
    }

    /// Spacecraft name for a vertex. Valid after `validate`.
    pub fn spacecraft_for(&self, vertex: TriangleVertex) -> &SpacecraftPlane {
        self.spacecraft
            .iter()
            .find(|s| s.vertex == vertex)
            .expect("validated configuration has one spacecraft per vertex")
    }
}
