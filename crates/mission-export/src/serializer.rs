//! Artefact assembly.
//!
//! Single-threaded, run strictly after the formation summary and the
//! retained state histories are finalized. Rendering is deterministic: the
//! only content that may differ between re-exports of the same run is the
//! scenario's `generated_at` field.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use tracing::info;

use formation_core::FormationRun;
use formation_geometry::ground_point;
use ground_contact::{ContactWindow, GroundStation};

use crate::schema::{
    AnimationBounds, AssetFile, ContactInterval, ContactIntervalsFile, EphemerisFile,
    EphemerisRow, EventsFile, FacilityFile, GroundTrackFile, GroundTrackPoint, ManeuverEvent,
    ScenarioFile, ASSET_SCHEMA, CONTACTS_SCHEMA, EPHEMERIS_FRAME, EPHEMERIS_SCHEMA,
    EVENTS_SCHEMA, FACILITY_SCHEMA, GROUND_TRACK_SCHEMA, SCENARIO_SCHEMA,
};
use crate::{reserve_name, ArtifactKind, ArtifactSet, ExportArtifact, ExportError, Result};

fn rfc3339(stamp: DateTime<Utc>) -> String {
    stamp.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn offset_stamp(epoch: DateTime<Utc>, t_s: f64) -> String {
    rfc3339(epoch + Duration::milliseconds((t_s * 1000.0).round() as i64))
}

fn render<T: serde::Serialize>(
    name: &str,
    kind: ArtifactKind,
    body: &T,
) -> Result<ExportArtifact> {
    let mut content = serde_json::to_string_pretty(body)?;
    content.push('\n');
    Ok(ExportArtifact {
        name: name.to_string(),
        kind,
        file_name: format!("{name}.json"),
        content,
    })
}

/// Every name a scenario refers to must be present in the emitted set.
pub fn verify_references(scenario: &ScenarioFile, emitted: &HashSet<String>) -> Result<()> {
    let refs = scenario
        .assets
        .iter()
        .chain(scenario.ground_tracks.iter())
        .chain(scenario.facilities.iter())
        .chain(scenario.contact_intervals.iter())
        .chain(scenario.events.iter());
    for reference in refs {
        if !emitted.contains(reference) {
            return Err(ExportError::DanglingReference {
                reference: reference.clone(),
            });
        }
    }
    Ok(())
}

/// Serialise one finalized run into the full artefact set.
///
/// `generated_at` is recorded verbatim in the scenario artefact; passing the
/// same value reproduces the previous export byte for byte.
pub fn export_run(
    run: &FormationRun,
    facility: &GroundStation,
    scenario_name: &str,
    generated_at: DateTime<Utc>,
) -> Result<ArtifactSet> {
    // Time tags must be strictly increasing before anything is rendered
    for (spacecraft, history) in &run.histories {
        for (row, pair) in history.windows(2).enumerate() {
            if pair[1].t <= pair[0].t {
                return Err(ExportError::NonMonotonicEphemeris {
                    spacecraft: spacecraft.clone(),
                    row: row + 1,
                });
            }
        }
    }

    let mut used = HashSet::new();
    let mut artifacts = Vec::new();

    // Per-spacecraft ephemeris, asset and ground track
    let mut asset_names = Vec::new();
    let mut ground_track_names = Vec::new();
    let mut asset_by_spacecraft: HashMap<&str, String> = HashMap::new();

    for (spacecraft, history) in &run.histories {
        let asset_name = reserve_name(spacecraft, &mut used)?;
        let ephemeris_name = reserve_name(&format!("{asset_name}_ephemeris"), &mut used)?;
        let track_name = reserve_name(&format!("{asset_name}_groundtrack"), &mut used)?;

        let rows: Vec<EphemerisRow> = history
            .iter()
            .map(|s| EphemerisRow {
                t_s: s.t,
                position_m: [s.position.x, s.position.y, s.position.z],
                velocity_ms: [s.velocity.x, s.velocity.y, s.velocity.z],
            })
            .collect();
        artifacts.push(render(
            &ephemeris_name,
            ArtifactKind::Ephemeris,
            &EphemerisFile {
                schema: EPHEMERIS_SCHEMA.to_string(),
                spacecraft: spacecraft.clone(),
                frame: EPHEMERIS_FRAME.to_string(),
                epoch: rfc3339(run.epoch),
                rows,
            },
        )?);

        artifacts.push(render(
            &asset_name,
            ArtifactKind::Asset,
            &AssetFile {
                schema: ASSET_SCHEMA.to_string(),
                name: asset_name.clone(),
                central_body: "Earth".to_string(),
                ephemeris: ephemeris_name.clone(),
            },
        )?);

        let points: Vec<GroundTrackPoint> = history
            .iter()
            .map(|s| {
                let gp = ground_point(s);
                GroundTrackPoint {
                    t_s: s.t,
                    latitude_deg: gp.latitude_deg,
                    longitude_deg: gp.longitude_deg,
                }
            })
            .collect();
        artifacts.push(render(
            &track_name,
            ArtifactKind::GroundTrack,
            &GroundTrackFile {
                schema: GROUND_TRACK_SCHEMA.to_string(),
                spacecraft: spacecraft.clone(),
                points,
            },
        )?);

        asset_by_spacecraft.insert(spacecraft.as_str(), asset_name.clone());
        asset_names.push(asset_name);
        ground_track_names.push(track_name);
    }

    // Facility
    let facility_name = reserve_name(&facility.name, &mut used)?;
    artifacts.push(render(
        &facility_name,
        ArtifactKind::Facility,
        &FacilityFile {
            schema: FACILITY_SCHEMA.to_string(),
            name: facility_name.clone(),
            latitude_deg: facility.latitude_deg,
            longitude_deg: facility.longitude_deg,
            altitude_m: facility.altitude_m,
        },
    )?);

    // Contact intervals, one file per spacecraft that has windows
    let mut windows_by_spacecraft: HashMap<&str, Vec<&ContactWindow>> = HashMap::new();
    for window in &run.summary.contact_windows {
        windows_by_spacecraft
            .entry(window.spacecraft.as_str())
            .or_default()
            .push(window);
    }
    let mut contact_names = Vec::new();
    // Deterministic emission order: follow the history order
    for (spacecraft, _) in &run.histories {
        let Some(windows) = windows_by_spacecraft.get(spacecraft.as_str()) else {
            continue;
        };
        let asset_name = asset_by_spacecraft
            .get(spacecraft.as_str())
            .cloned()
            .unwrap_or_else(|| crate::sanitize_name(spacecraft));
        let contacts_name =
            reserve_name(&format!("{facility_name}_{asset_name}_contacts"), &mut used)?;
        let intervals: Vec<ContactInterval> = windows
            .iter()
            .map(|w| ContactInterval {
                start: rfc3339(w.start),
                end: rfc3339(w.end),
                duration_s: w.duration_s,
                max_elevation_deg: w.max_elevation_deg,
            })
            .collect();
        artifacts.push(render(
            &contacts_name,
            ArtifactKind::ContactIntervals,
            &ContactIntervalsFile {
                schema: CONTACTS_SCHEMA.to_string(),
                facility: facility_name.clone(),
                asset: asset_name,
                intervals,
            },
        )?);
        contact_names.push(contacts_name);
    }

    // Optional manoeuvre events
    let events_name = if run.summary.maintenance_events.is_empty() {
        None
    } else {
        let name = reserve_name(&format!("{scenario_name}_events"), &mut used)?;
        let events: Vec<ManeuverEvent> = run
            .summary
            .maintenance_events
            .iter()
            .map(|e| ManeuverEvent {
                spacecraft: e.spacecraft.clone(),
                time: rfc3339(e.scheduled),
                delta_v_ms: e.delta_v_ms,
            })
            .collect();
        artifacts.push(render(
            &name,
            ArtifactKind::Events,
            &EventsFile { schema: EVENTS_SCHEMA.to_string(), events },
        )?);
        Some(name)
    };

    // Top-level scenario referencing everything above
    let stop_t = run
        .histories
        .first()
        .and_then(|(_, h)| h.last())
        .map(|s| s.t)
        .unwrap_or(0.0);
    let window = &run.summary.window;
    let animation = if window.is_empty() {
        AnimationBounds {
            start: rfc3339(run.epoch),
            stop: offset_stamp(run.epoch, stop_t),
        }
    } else {
        AnimationBounds {
            start: offset_stamp(run.epoch, window.start_s),
            stop: offset_stamp(run.epoch, window.end_s),
        }
    };

    let scenario_artifact_name = reserve_name(scenario_name, &mut used)?;
    let scenario = ScenarioFile {
        schema: SCENARIO_SCHEMA.to_string(),
        name: scenario_artifact_name.clone(),
        start: rfc3339(run.epoch),
        stop: offset_stamp(run.epoch, stop_t),
        animation,
        assets: asset_names,
        ground_tracks: ground_track_names,
        facilities: vec![facility_name],
        contact_intervals: contact_names,
        events: events_name,
        generated_at: rfc3339(generated_at),
    };

    let emitted: HashSet<String> = artifacts.iter().map(|a| a.name.clone()).collect();
    verify_references(&scenario, &emitted)?;
    for artifact in &artifacts {
        if artifact.kind == ArtifactKind::Asset {
            let asset: AssetFile = serde_json::from_str(&artifact.content)?;
            if !emitted.contains(&asset.ephemeris) {
                return Err(ExportError::DanglingReference { reference: asset.ephemeris });
            }
        }
    }

    artifacts.push(render(&scenario_artifact_name, ArtifactKind::Scenario, &scenario)?);

    info!(
        run_id = %run.id,
        artifacts = artifacts.len(),
        scenario = scenario_artifact_name.as_str(),
        "artefact set rendered"
    );

    Ok(ArtifactSet { artifacts })
}
