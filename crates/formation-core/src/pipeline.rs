//! The synchronous analysis pipeline.
//!
//! Stages run strictly downstream: node alignment wraps the propagator and
//! geometry engine as its inner evaluation, then the aligned formation is
//! designed, propagated and analysed. The summary is assembled once, after
//! every stage has finished; export (a separate crate) runs strictly after
//! that.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use dispersion_engine::CancellationToken;
use formation_geometry::{
    design_formation, find_formation_window, geometry_series, ground_point,
    window::ground_distance_extrema, FormationGeometry, GeodeticPoint, WindowCriteria,
};
use ground_contact::{find_contact_windows, latency_statistics, analyze_station_keeping};
use node_alignment::{align_raan, RaanSearchConfig};
use orbit_propagation::constants::EARTH_FLATTENING;
use orbit_propagation::{propagate_two_body, propagation, OrbitalElements, StateVector};

use crate::config::{FormationConfig, TriangleVertex};
use crate::summary::{ComplianceFlag, FormationSummary, GeometryExtrema};
use crate::Result;

const SECONDS_PER_YEAR: f64 = 365.25 * 86_400.0;

/// The unit of lifetime: one analysed formation run.
///
/// Owns the retained state histories, the geometry series and the finalized
/// summary. Artefact export reads from a finished run and never writes back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormationRun {
    pub id: Uuid,
    pub epoch: DateTime<Utc>,
    /// Retained histories in configuration order: (spacecraft name, states).
    pub histories: Vec<(String, Vec<StateVector>)>,
    pub geometry: Vec<FormationGeometry>,
    pub summary: FormationSummary,
}

fn wrap_deg_180(x: f64) -> f64 {
    (x + 180.0).rem_euclid(360.0) - 180.0
}

/// First ascending crossing of the target latitude after epoch, s.
///
/// Uses the argument-of-latitude geometry of the (near-circular) reference
/// orbit; the geocentric target latitude accounts for the ellipsoid.
fn first_ascending_overpass_s(elements: &OrbitalElements, target: &GeodeticPoint) -> f64 {
    let inc = elements.inclination_deg.to_radians();
    let lat_gc = ((1.0 - EARTH_FLATTENING).powi(2)
        * target.latitude_deg.to_radians().tan())
    .atan();
    let sin_u = (lat_gc.sin() / inc.sin()).clamp(-1.0, 1.0);
    let u_target = sin_u.asin();

    let u0 = (elements.arg_perigee_deg + elements.mean_anomaly_deg).to_radians();
    let du = (u_target - u0).rem_euclid(2.0 * std::f64::consts::PI);
    du / elements.mean_motion()
}

/// Analytic RAAN guess: shift the node by the longitude offset between the
/// sub-satellite point at the overpass time and the target.
fn raan_initial_guess(
    config: &FormationConfig,
    evaluation_time_s: f64,
) -> Result<f64> {
    let state = propagation::state_at(&config.reference, evaluation_time_s, &config.propagation)?;
    let sub_point = ground_point(&state);
    let dlon = wrap_deg_180(config.target.longitude_deg - sub_point.longitude_deg);
    Ok(config.reference.raan_deg + dlon)
}

/// Run the full analysis and return the finalized run.
pub fn run_formation_analysis(config: &FormationConfig) -> Result<FormationRun> {
    config.validate()?;

    let run_id = Uuid::new_v4();
    let epoch = config.reference.epoch;
    info!(%run_id, "formation analysis started");

    // Node alignment: find the overpass, then search RAAN around the
    // analytic guess to null the centroid cross-track distance.
    let evaluation_time_s = first_ascending_overpass_s(&config.reference, &config.target);
    let guess_deg = raan_initial_guess(config, evaluation_time_s)?;
    let search = RaanSearchConfig {
        lower_deg: guess_deg - config.raan_search_half_width_deg,
        upper_deg: guess_deg + config.raan_search_half_width_deg,
        tolerance_deg: config.raan_tolerance_deg,
        max_iterations: config.raan_max_iterations,
    };
    let raan_solution = align_raan(
        &config.reference,
        config.side_length_m,
        &config.target,
        evaluation_time_s,
        &search,
        &config.propagation,
    )?;
    let aligned = OrbitalElements {
        raan_deg: raan_solution.raan_deg,
        ..config.reference
    }
    .normalized();
    info!(
        raan_deg = raan_solution.raan_deg,
        residual_m = raan_solution.residual_m,
        evaluation_time_s,
        "node aligned"
    );

    // Formation design and propagation over the analysis horizon
    let design = design_formation(
        &aligned,
        config.side_length_m,
        evaluation_time_s,
        &config.propagation,
    )?;

    let steps = (config.analysis_horizon_s / config.time_step_s).floor() as usize;
    let times: Vec<f64> = (0..=steps).map(|i| i as f64 * config.time_step_s).collect();

    let mut design_histories = Vec::with_capacity(3);
    for elements in &design.elements {
        design_histories.push(propagate_two_body(elements, &times, &config.propagation)?);
    }

    let geometry = geometry_series([
        &design_histories[0],
        &design_histories[1],
        &design_histories[2],
    ])?;

    // Window discovery and geometry extrema
    let criteria = WindowCriteria {
        aspect_ratio_tolerance: config.aspect_ratio_tolerance,
        ground_distance_limit_m: config.ground_distance_tolerance_m,
    };
    let window = find_formation_window(&geometry, &config.target, &criteria);
    let (ground_window_max, ground_full_max) =
        ground_distance_extrema(&geometry, &config.target, &window);

    let in_scope: Vec<&FormationGeometry> = if window.is_empty() {
        geometry.iter().collect()
    } else {
        geometry.iter().filter(|g| window.contains(g.t)).collect()
    };
    let mut extrema = GeometryExtrema {
        mean_area_m2: in_scope.iter().map(|g| g.area_m2).sum::<f64>() / in_scope.len() as f64,
        max_aspect_ratio: 0.0,
        min_side_m: f64::MAX,
        max_side_m: 0.0,
    };
    for g in &in_scope {
        extrema.max_aspect_ratio = extrema.max_aspect_ratio.max(g.aspect_ratio);
        for side in g.side_lengths_m {
            extrema.min_side_m = extrema.min_side_m.min(side);
            extrema.max_side_m = extrema.max_side_m.max(side);
        }
    }
    info!(
        window_duration_s = window.duration_s,
        max_aspect_ratio = extrema.max_aspect_ratio,
        "formation window scanned"
    );

    // Exact geometry at the design instant, between propagation samples.
    // The strategy is fixed at construction; no call-site branching.
    let resampler = config.resampling.build();
    let horizon_end = times.last().copied().unwrap_or(0.0);
    let aspect_ratio_at_evaluation = if evaluation_time_s <= horizon_end {
        let resampled = [
            resampler.state_at(&design_histories[0], evaluation_time_s)?,
            resampler.state_at(&design_histories[1], evaluation_time_s)?,
            resampler.state_at(&design_histories[2], evaluation_time_s)?,
        ];
        Some(FormationGeometry::from_states(&resampled)?.aspect_ratio)
    } else {
        None
    };

    // Maintenance per spacecraft
    let vertex_order = [TriangleVertex::Reference, TriangleVertex::AlongTrack, TriangleVertex::Apex];
    let mut maintenance = Vec::with_capacity(3);
    let mut maintenance_events = Vec::new();
    let event_count = (SECONDS_PER_YEAR / config.maintenance_cadence_s).floor() as usize;
    for (i, vertex) in vertex_order.iter().enumerate() {
        let plane = config.spacecraft_for(*vertex);
        let assessment = analyze_station_keeping(
            &plane.name,
            &design.elements[i],
            &config.spacecraft_properties,
            &config.atmosphere,
            config.maintenance_cadence_s,
            &config.propagation,
        )?;
        maintenance_events.extend(assessment.scheduled_events(epoch, event_count));
        maintenance.push(assessment);
    }
    let fleet_max_annual_delta_v_ms = maintenance
        .iter()
        .map(|m| m.annual_delta_v_ms)
        .fold(0.0, f64::max);

    // Ground contact and command latency (reference spacecraft)
    let reference_name = &config.spacecraft_for(TriangleVertex::Reference).name;
    let contact_windows =
        find_contact_windows(&config.ground_station, reference_name, &design_histories[0], epoch);
    let latency =
        latency_statistics(&contact_windows, &config.ground_station, config.analysis_horizon_s);

    // Monte Carlo campaigns
    let token = CancellationToken::new();
    let injection_dispersion = dispersion_engine::run_injection_dispersion(
        &aligned,
        &config.spacecraft_properties,
        &config.atmosphere,
        &config.injection,
        &config.propagation,
        &token,
    )?;
    let drag_dispersion = dispersion_engine::run_drag_dispersion(
        &aligned,
        &config.spacecraft_properties,
        &config.atmosphere,
        &config.drag,
        &config.propagation,
        &token,
    )?;

    // Compliance findings: data, not faults
    let mut compliance = Vec::new();
    if window.is_empty() {
        compliance.push(ComplianceFlag::NoQualifyingWindow);
    }
    for m in &maintenance {
        if m.annual_delta_v_ms > config.annual_delta_v_budget_ms {
            compliance.push(ComplianceFlag::MaintenanceBudgetExceeded {
                spacecraft: m.spacecraft.clone(),
                annual_delta_v_ms: m.annual_delta_v_ms,
                budget_ms: config.annual_delta_v_budget_ms,
            });
        }
    }
    if latency.max_gap_s > config.latency_ceiling_s {
        compliance.push(ComplianceFlag::LatencyBudgetExceeded {
            max_gap_s: latency.max_gap_s,
            ceiling_s: config.latency_ceiling_s,
        });
    }
    let failure_rate = 1.0 - injection_dispersion.success_fraction;
    if failure_rate > config.failure_rate_ceiling {
        compliance.push(ComplianceFlag::DispersionFailureRateExceeded {
            failure_rate,
            ceiling: config.failure_rate_ceiling,
        });
    }

    let summary = FormationSummary {
        run_id,
        epoch,
        raan_solution,
        evaluation_time_s,
        window,
        requested_window_duration_s: config.requested_window_duration_s,
        geometry: extrema,
        aspect_ratio_at_evaluation,
        ground_distance_window_max_m: ground_window_max,
        ground_distance_full_horizon_max_m: ground_full_max,
        maintenance,
        fleet_max_annual_delta_v_ms,
        maintenance_events,
        latency,
        contact_windows,
        injection_dispersion,
        drag_dispersion,
        compliance,
    };

    // Histories keyed by configured name, in configuration order
    let histories = config
        .spacecraft
        .iter()
        .map(|plane| {
            let design_index = vertex_order
                .iter()
                .position(|v| *v == plane.vertex)
                .expect("validated vertex");
            (plane.name.clone(), design_histories[design_index].clone())
        })
        .collect();

    info!(%run_id, compliant = summary.is_compliant(), "formation analysis finished");

    Ok(FormationRun { id: run_id, epoch, histories, geometry, summary })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 21, 12, 0, 0).unwrap()
    }

    fn reference() -> OrbitalElements {
        OrbitalElements {
            semi_major_axis_m: 6_898_137.0,
            eccentricity: 0.001,
            inclination_deg: 97.7,
            raan_deg: 0.0,
            arg_perigee_deg: 0.0,
            mean_anomaly_deg: 0.0,
            epoch: epoch(),
        }
    }

    #[test]
    fn test_overpass_before_one_period() {
        let target = GeodeticPoint { latitude_deg: 35.6892, longitude_deg: 51.3890 };
        let t = first_ascending_overpass_s(&reference(), &target);
        assert!(t > 0.0 && t < reference().period_s(), "overpass at {t} s");
    }

    #[test]
    fn test_overpass_latitude_matches_target() {
        let target = GeodeticPoint { latitude_deg: 35.6892, longitude_deg: 51.3890 };
        let t = first_ascending_overpass_s(&reference(), &target);
        let state = propagation::state_at(
            &reference(),
            t,
            &orbit_propagation::PropagationSettings::default(),
        )
        .unwrap();
        let sub = ground_point(&state);
        assert!(
            (sub.latitude_deg - target.latitude_deg).abs() < 0.2,
            "sub-satellite latitude {:.4}° vs target {:.4}°",
            sub.latitude_deg,
            target.latitude_deg
        );
    }

    #[test]
    fn test_wrap_deg() {
        assert!((wrap_deg_180(190.0) - (-170.0)).abs() < 1e-12);
        assert!((wrap_deg_180(-190.0) - 170.0).abs() < 1e-12);
        assert!((wrap_deg_180(45.0) - 45.0).abs() < 1e-12);
    }
}
