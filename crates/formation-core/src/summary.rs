//! The immutable formation summary.
//!
//! Assembled once per run after every analysis stage has finished; never
//! mutated afterwards. Compliance findings are data carried on the summary,
//! not errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use dispersion_engine::{DragDispersionResult, InjectionDispersionResult};
use formation_geometry::FormationWindow;
use ground_contact::{ContactWindow, LatencyStatistics, MaintenanceAssessment, MaintenanceEvent};
use node_alignment::RaanSolution;

/// Non-fatal findings against the configured thresholds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ComplianceFlag {
    NoQualifyingWindow,
    MaintenanceBudgetExceeded {
        spacecraft: String,
        annual_delta_v_ms: f64,
        budget_ms: f64,
    },
    LatencyBudgetExceeded {
        max_gap_s: f64,
        ceiling_s: f64,
    },
    DispersionFailureRateExceeded {
        failure_rate: f64,
        ceiling: f64,
    },
}

/// Triangle extrema over the formation window (or the full horizon when no
/// window qualified).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct GeometryExtrema {
    pub mean_area_m2: f64,
    pub max_aspect_ratio: f64,
    pub min_side_m: f64,
    pub max_side_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationSummary {
    pub run_id: Uuid,
    pub epoch: DateTime<Utc>,

    pub raan_solution: RaanSolution,
    /// Seconds past epoch at which the triangle is exact over the target.
    pub evaluation_time_s: f64,

    pub window: FormationWindow,
    pub requested_window_duration_s: f64,
    pub geometry: GeometryExtrema,
    /// Triangle aspect ratio resampled exactly at the evaluation instant;
    /// absent when the evaluation time falls outside the analysis horizon.
    pub aspect_ratio_at_evaluation: Option<f64>,

    /// Reported separately, never conflated.
    pub ground_distance_window_max_m: f64,
    pub ground_distance_full_horizon_max_m: f64,

    pub maintenance: Vec<MaintenanceAssessment>,
    pub fleet_max_annual_delta_v_ms: f64,
    pub maintenance_events: Vec<MaintenanceEvent>,

    pub latency: LatencyStatistics,
    pub contact_windows: Vec<ContactWindow>,

    pub injection_dispersion: InjectionDispersionResult,
    pub drag_dispersion: DragDispersionResult,

    pub compliance: Vec<ComplianceFlag>,
}

impl FormationSummary {
    pub fn is_compliant(&self) -> bool {
        self.compliance.is_empty()
    }
}
