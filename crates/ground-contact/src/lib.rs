//! Ground Contact Library
//!
//! Fixed ground-station model, satellite visibility and contact-window
//! discovery, command-latency statistics, and station-keeping (drift /
//! delta-v) analysis for the formation spacecraft.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod contact;
pub mod maintenance;

pub use contact::{
    find_contact_windows, latency_statistics, look_angles, ContactWindow, LatencyStatistics,
    LookAngles,
};
pub use maintenance::{analyze_station_keeping, MaintenanceAssessment, MaintenanceEvent};

#[derive(Error, Debug)]
pub enum ContactError {
    #[error("Analysis horizon contains no samples")]
    EmptyHorizon,
    #[error(transparent)]
    Propagation(#[from] orbit_propagation::PropagationError),
}

pub type Result<T> = std::result::Result<T, ContactError>;

/// A fixed ground station with its visibility constraints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GroundStation {
    pub id: String,
    pub name: String,
    pub latitude_deg: f64,
    pub longitude_deg: f64,
    pub altitude_m: f64,
    /// Elevation mask for a geometric pass, deg.
    pub min_elevation_deg: f64,
    /// Slant-range threshold for a captured pass, m.
    pub max_range_m: f64,
    /// Shortest usable pass, s.
    pub min_contact_duration_s: f64,
}

impl GroundStation {
    pub fn new(id: &str, name: &str, latitude_deg: f64, longitude_deg: f64, altitude_m: f64) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            latitude_deg,
            longitude_deg,
            altitude_m,
            min_elevation_deg: 5.0,
            max_range_m: 2_500_000.0,
            min_contact_duration_s: 60.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_station_defaults() {
        let station = GroundStation::new("GS-TEH", "Tehran", 35.6892, 51.3890, 1200.0);
        assert_eq!(station.id, "GS-TEH");
        assert!(station.min_elevation_deg > 0.0);
        assert!(station.max_range_m > 0.0);
    }
}
