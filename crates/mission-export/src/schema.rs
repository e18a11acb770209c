//! Artefact schemas.
//!
//! Each artefact body is one of these serde structures rendered with
//! `serde_json::to_string_pretty`. Schema tags let the visualisation tool
//! version its readers independently of this crate.

use serde::{Deserialize, Serialize};

pub const EPHEMERIS_SCHEMA: &str = "sx9.formation.ephemeris.v1";
pub const ASSET_SCHEMA: &str = "sx9.formation.asset.v1";
pub const GROUND_TRACK_SCHEMA: &str = "sx9.formation.groundtrack.v1";
pub const FACILITY_SCHEMA: &str = "sx9.formation.facility.v1";
pub const CONTACTS_SCHEMA: &str = "sx9.formation.contacts.v1";
pub const EVENTS_SCHEMA: &str = "sx9.formation.events.v1";
pub const SCENARIO_SCHEMA: &str = "sx9.formation.scenario.v1";

/// Reference frame tag carried by every ephemeris: ECI, axes aligned with
/// the Earth-fixed frame at the run epoch.
pub const EPHEMERIS_FRAME: &str = "ECI/epoch-aligned";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemerisRow {
    pub t_s: f64,
    pub position_m: [f64; 3],
    pub velocity_ms: [f64; 3],
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EphemerisFile {
    pub schema: String,
    pub spacecraft: String,
    pub frame: String,
    /// RFC 3339 run epoch; `t_s` values are offsets from it.
    pub epoch: String,
    pub rows: Vec<EphemerisRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetFile {
    pub schema: String,
    pub name: String,
    pub central_body: String,
    /// Name of the ephemeris artefact backing this asset.
    pub ephemeris: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTrackPoint {
    pub t_s: f64,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundTrackFile {
    pub schema: String,
    pub spacecraft: String,
    pub points: Vec<GroundTrackPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FacilityFile {
    pub schema: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactInterval {
    pub start: String,
    pub end: String,
    pub duration_s: f64,
    pub max_elevation_deg: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactIntervalsFile {
    pub schema: String,
    pub facility: String,
    pub asset: String,
    pub intervals: Vec<ContactInterval>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ManeuverEvent {
    pub spacecraft: String,
    pub time: String,
    pub delta_v_ms: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventsFile {
    pub schema: String,
    pub events: Vec<ManeuverEvent>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnimationBounds {
    pub start: String,
    pub stop: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScenarioFile {
    pub schema: String,
    pub name: String,
    pub start: String,
    pub stop: String,
    pub animation: AnimationBounds,
    pub assets: Vec<String>,
    pub ground_tracks: Vec<String>,
    pub facilities: Vec<String>,
    pub contact_intervals: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub events: Option<String>,
    /// The only field allowed to differ between re-exports of the same run.
    pub generated_at: String,
}
