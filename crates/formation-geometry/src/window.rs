//! Formation-window discovery.
//!
//! The formation window is the maximal contiguous interval over which the
//! triangle aspect ratio stays within tolerance and the reference ground
//! point stays within the configured distance of the target. A single scan
//! over the propagated series records first/last qualifying timestamps.

use serde::{Deserialize, Serialize};

use crate::{haversine_m, FormationGeometry, GeodeticPoint};

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WindowCriteria {
    pub aspect_ratio_tolerance: f64,
    pub ground_distance_limit_m: f64,
}

/// A qualifying interval. `duration_s` is zero when nothing qualified; the
/// caller records a `NoQualifyingWindow` compliance flag rather than an
/// error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct FormationWindow {
    pub start_s: f64,
    pub end_s: f64,
    pub duration_s: f64,
}

impl FormationWindow {
    pub fn is_empty(&self) -> bool {
        self.duration_s <= 0.0
    }

    pub fn contains(&self, t: f64) -> bool {
        !self.is_empty() && t >= self.start_s && t <= self.end_s
    }
}

/// Scan the series once and return the longest qualifying window.
pub fn find_formation_window(
    series: &[FormationGeometry],
    target: &GeodeticPoint,
    criteria: &WindowCriteria,
) -> FormationWindow {
    let mut best = FormationWindow::default();
    let mut current: Option<(f64, f64)> = None;

    for geo in series {
        let ground_distance = haversine_m(&geo.ground_points[0], target);
        let qualifies = geo.aspect_ratio <= criteria.aspect_ratio_tolerance
            && ground_distance <= criteria.ground_distance_limit_m;

        match (qualifies, current) {
            (true, None) => current = Some((geo.t, geo.t)),
            (true, Some((start, _))) => current = Some((start, geo.t)),
            (false, Some((start, end))) => {
                if end - start > best.duration_s {
                    best = FormationWindow { start_s: start, end_s: end, duration_s: end - start };
                }
                current = None;
            }
            (false, None) => {}
        }
    }

    if let Some((start, end)) = current {
        if end - start > best.duration_s {
            best = FormationWindow { start_s: start, end_s: end, duration_s: end - start };
        }
    }

    best
}

/// Maximum reference-to-target ground distance over the whole series and
/// over the window only, reported separately (never conflated).
pub fn ground_distance_extrema(
    series: &[FormationGeometry],
    target: &GeodeticPoint,
    window: &FormationWindow,
) -> (f64, f64) {
    let mut full_horizon_max: f64 = 0.0;
    let mut window_max: f64 = 0.0;
    for geo in series {
        let d = haversine_m(&geo.ground_points[0], target);
        full_horizon_max = full_horizon_max.max(d);
        if window.contains(geo.t) {
            window_max = window_max.max(d);
        }
    }
    (window_max, full_horizon_max)
}
