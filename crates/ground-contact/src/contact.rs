//! Look angles, contact-window discovery and latency statistics.
//!
//! Windows are found by a single AOS/LOS scan over a sampled state history,
//! tracking maximum elevation and the time of closest approach. A pass is
//! *captured* when its peak elevation clears the mask, the slant range at
//! closest approach is inside the threshold and the pass lasts long enough.

use chrono::{DateTime, Duration, Utc};
use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

use orbit_propagation::constants::{EARTH_FLATTENING, OMEGA_EARTH, R_EARTH};
use orbit_propagation::StateVector;

use crate::GroundStation;

/// Topocentric pointing to a satellite.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LookAngles {
    pub elevation_deg: f64,
    pub azimuth_deg: f64,
    pub range_m: f64,
}

/// Station position in the Earth-fixed frame, m (WGS-84 ellipsoid).
fn station_ecef(station: &GroundStation) -> Vector3<f64> {
    let lat = station.latitude_deg.to_radians();
    let lon = station.longitude_deg.to_radians();
    let e2 = 2.0 * EARTH_FLATTENING - EARTH_FLATTENING * EARTH_FLATTENING;
    let n = R_EARTH / (1.0 - e2 * lat.sin().powi(2)).sqrt();

    Vector3::new(
        (n + station.altitude_m) * lat.cos() * lon.cos(),
        (n + station.altitude_m) * lat.cos() * lon.sin(),
        (n * (1.0 - e2) + station.altitude_m) * lat.sin(),
    )
}

/// Satellite ECI position rotated into the Earth-fixed frame.
///
/// The Earth-fixed frame is aligned with ECI at t = 0, consistent with the
/// ground-track projection used by the geometry engine.
fn satellite_ecef(state: &StateVector) -> Vector3<f64> {
    let theta = OMEGA_EARTH * state.t;
    let (sin_t, cos_t) = theta.sin_cos();
    Vector3::new(
        cos_t * state.position.x + sin_t * state.position.y,
        -sin_t * state.position.x + cos_t * state.position.y,
        state.position.z,
    )
}

/// Elevation, azimuth and slant range from a station to a satellite state.
pub fn look_angles(station: &GroundStation, state: &StateVector) -> LookAngles {
    let sta = station_ecef(station);
    let sat = satellite_ecef(state);
    let rho = sat - sta;

    let lat = station.latitude_deg.to_radians();
    let lon = station.longitude_deg.to_radians();

    // ECEF -> ENU topocentric components
    let east = -lon.sin() * rho.x + lon.cos() * rho.y;
    let north =
        -lat.sin() * lon.cos() * rho.x - lat.sin() * lon.sin() * rho.y + lat.cos() * rho.z;
    let up = lat.cos() * lon.cos() * rho.x + lat.cos() * lon.sin() * rho.y + lat.sin() * rho.z;

    let range_m = rho.norm();
    LookAngles {
        elevation_deg: (up / range_m).asin().to_degrees(),
        azimuth_deg: east.atan2(north).to_degrees().rem_euclid(360.0),
        range_m,
    }
}

/// A satellite pass over one station.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactWindow {
    pub station_id: String,
    pub spacecraft: String,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub duration_s: f64,
    pub max_elevation_deg: f64,
    /// Time of closest approach (peak elevation).
    pub tca: DateTime<Utc>,
    pub range_at_tca_m: f64,
}

impl ContactWindow {
    /// Capture test: peak elevation clears the mask, TCA range inside the
    /// threshold, duration above the configured minimum.
    pub fn is_captured(&self, station: &GroundStation) -> bool {
        self.max_elevation_deg >= station.min_elevation_deg
            && self.range_at_tca_m <= station.max_range_m
            && self.duration_s >= station.min_contact_duration_s
    }
}

/// AOS/LOS scan over a sampled history.
pub fn find_contact_windows(
    station: &GroundStation,
    spacecraft: &str,
    history: &[StateVector],
    epoch: DateTime<Utc>,
) -> Vec<ContactWindow> {
    let mut windows = Vec::new();
    let mut in_view = false;
    let mut aos_t = 0.0;
    let mut max_el = f64::MIN;
    let mut tca_t = 0.0;
    let mut tca_range = 0.0;

    let stamp = |t: f64| epoch + Duration::milliseconds((t * 1000.0).round() as i64);

    for state in history {
        let angles = look_angles(station, state);
        let visible = angles.elevation_deg >= station.min_elevation_deg;

        if visible && !in_view {
            in_view = true;
            aos_t = state.t;
            max_el = angles.elevation_deg;
            tca_t = state.t;
            tca_range = angles.range_m;
        } else if visible && in_view {
            if angles.elevation_deg > max_el {
                max_el = angles.elevation_deg;
                tca_t = state.t;
                tca_range = angles.range_m;
            }
        } else if !visible && in_view {
            in_view = false;
            windows.push(ContactWindow {
                station_id: station.id.clone(),
                spacecraft: spacecraft.to_string(),
                start: stamp(aos_t),
                end: stamp(state.t),
                duration_s: state.t - aos_t,
                max_elevation_deg: max_el,
                tca: stamp(tca_t),
                range_at_tca_m: tca_range,
            });
        }
    }

    // Pass still in progress at the end of the horizon
    if in_view {
        if let Some(last) = history.last() {
            windows.push(ContactWindow {
                station_id: station.id.clone(),
                spacecraft: spacecraft.to_string(),
                start: stamp(aos_t),
                end: stamp(last.t),
                duration_s: last.t - aos_t,
                max_elevation_deg: max_el,
                tca: stamp(tca_t),
                range_at_tca_m: tca_range,
            });
        }
    }

    windows
}

/// Command-latency statistics across an analysis horizon.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LatencyStatistics {
    pub passes_per_day: f64,
    /// Captured passes ÷ geometric passes; 0.0 when no pass exists.
    pub contact_probability: f64,
    pub max_gap_s: f64,
    pub mean_gap_s: f64,
    pub total_contact_s: f64,
}

/// Derive latency statistics from the windows found over `horizon_s`.
///
/// Gaps are measured between the end of one captured window and the start of
/// the next. Fewer than two captured windows degrade conservatively to the
/// full horizon.
pub fn latency_statistics(
    windows: &[ContactWindow],
    station: &GroundStation,
    horizon_s: f64,
) -> LatencyStatistics {
    let captured: Vec<&ContactWindow> =
        windows.iter().filter(|w| w.is_captured(station)).collect();

    let passes_per_day = windows.len() as f64 / (horizon_s / 86_400.0);
    let contact_probability = if windows.is_empty() {
        0.0
    } else {
        captured.len() as f64 / windows.len() as f64
    };
    let total_contact_s = captured.iter().map(|w| w.duration_s).sum();

    let (max_gap_s, mean_gap_s) = if captured.len() < 2 {
        (horizon_s, horizon_s)
    } else {
        let mut gaps = Vec::with_capacity(captured.len() - 1);
        for pair in captured.windows(2) {
            let gap = (pair[1].start - pair[0].end).num_milliseconds() as f64 / 1000.0;
            gaps.push(gap.max(0.0));
        }
        let max = gaps.iter().cloned().fold(f64::MIN, f64::max);
        let mean = gaps.iter().sum::<f64>() / gaps.len() as f64;
        (max, mean)
    };

    LatencyStatistics {
        passes_per_day,
        contact_probability,
        max_gap_s,
        mean_gap_s,
        total_contact_s,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn epoch() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 21, 12, 0, 0).unwrap()
    }

    fn equatorial_station() -> GroundStation {
        GroundStation::new("GS-EQ", "Equator", 0.0, 0.0, 0.0)
    }

    /// History sweeping the sub-satellite point across the station meridian.
    /// ECEF longitude runs from -40° to +40°; altitude 520 km.
    fn overflight_history() -> Vec<StateVector> {
        let r = R_EARTH + 520_000.0;
        (0..=80)
            .map(|i| {
                let t = i as f64 * 10.0;
                let ecef_lon = (-40.0 + i as f64).to_radians();
                let theta = ecef_lon + OMEGA_EARTH * t;
                StateVector {
                    t,
                    position: Vector3::new(r * theta.cos(), r * theta.sin(), 0.0),
                    velocity: Vector3::new(0.0, 7600.0, 0.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_overhead_look_angles() {
        let station = equatorial_station();
        let state = StateVector {
            t: 0.0,
            position: Vector3::new(R_EARTH + 520_000.0, 0.0, 0.0),
            velocity: Vector3::zeros(),
        };
        let angles = look_angles(&station, &state);
        assert!(angles.elevation_deg > 89.0, "overhead pass, got {}", angles.elevation_deg);
        assert!((angles.range_m - 520_000.0).abs() < 25_000.0, "range {}", angles.range_m);
    }

    #[test]
    fn test_antipodal_satellite_not_visible() {
        let station = equatorial_station();
        let state = StateVector {
            t: 0.0,
            position: Vector3::new(-(R_EARTH + 520_000.0), 0.0, 0.0),
            velocity: Vector3::zeros(),
        };
        let angles = look_angles(&station, &state);
        assert!(angles.elevation_deg < 0.0);
    }

    #[test]
    fn test_single_overflight_yields_one_window() {
        let station = equatorial_station();
        let windows = find_contact_windows(&station, "FORM-A", &overflight_history(), epoch());

        assert_eq!(windows.len(), 1, "one pass expected");
        let w = &windows[0];
        assert!(w.duration_s > 60.0, "pass too short: {}", w.duration_s);
        assert!(w.max_elevation_deg > 80.0, "peak elevation {}", w.max_elevation_deg);
        assert!(w.end > w.start);
        assert!(w.tca >= w.start && w.tca <= w.end);
        assert!(w.is_captured(&station));
    }

    #[test]
    fn test_latency_statistics_gap() {
        let station = equatorial_station();
        let mk = |start_s: f64, end_s: f64| ContactWindow {
            station_id: station.id.clone(),
            spacecraft: "FORM-A".to_string(),
            start: epoch() + Duration::seconds(start_s as i64),
            end: epoch() + Duration::seconds(end_s as i64),
            duration_s: end_s - start_s,
            max_elevation_deg: 45.0,
            tca: epoch() + Duration::seconds(((start_s + end_s) / 2.0) as i64),
            range_at_tca_m: 900_000.0,
        };
        let windows = vec![mk(0.0, 300.0), mk(6000.0, 6400.0), mk(12_000.0, 12_200.0)];
        let stats = latency_statistics(&windows, &station, 86_400.0);

        assert!((stats.max_gap_s - 5700.0).abs() < 1.0);
        assert!((stats.mean_gap_s - (5700.0 + 5600.0) / 2.0).abs() < 1.0);
        assert!((stats.contact_probability - 1.0).abs() < 1e-12);
        assert!((stats.total_contact_s - 900.0).abs() < 1.0);
    }

    #[test]
    fn test_no_windows_degrades_to_horizon() {
        let station = equatorial_station();
        let stats = latency_statistics(&[], &station, 43_200.0);
        assert_eq!(stats.max_gap_s, 43_200.0);
        assert_eq!(stats.contact_probability, 0.0);
        assert_eq!(stats.passes_per_day, 0.0);
    }

    #[test]
    fn test_uncaptured_short_pass_lowers_probability() {
        let mut station = equatorial_station();
        station.min_contact_duration_s = 1000.0;
        let windows = find_contact_windows(&station, "FORM-A", &overflight_history(), epoch());
        assert_eq!(windows.len(), 1);
        // Geometric pass exists but is shorter than the capture minimum
        let stats = latency_statistics(&windows, &station, 86_400.0);
        assert!(stats.contact_probability < 1e-12);
    }
}
