//! Exponential upper-atmosphere density model.
//!
//! Band-interpolated exponential profile with a solar-activity scale factor,
//! sufficient for LEO drag budgeting. Densities follow the standard-model
//! reference table for the 200–700 km bands.

use serde::{Deserialize, Serialize};

/// Reference bands: (base altitude m, base density kg/m³, scale height m).
const DENSITY_BANDS: [(f64, f64, f64); 7] = [
    (200_000.0, 2.789e-10, 37_105.0),
    (250_000.0, 7.248e-11, 45_546.0),
    (300_000.0, 2.418e-11, 53_628.0),
    (350_000.0, 9.518e-12, 53_298.0),
    (400_000.0, 3.725e-12, 58_515.0),
    (450_000.0, 1.585e-12, 60_828.0),
    (500_000.0, 6.967e-13, 63_822.0),
];

/// Exponential atmosphere scaled by a solar-activity index.
///
/// `solar_activity` of 1.0 corresponds to mean solar flux; the Monte Carlo
/// drag-dispersion engine perturbs it directly.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct AtmosphereModel {
    pub solar_activity: f64,
}

impl Default for AtmosphereModel {
    fn default() -> Self {
        Self { solar_activity: 1.0 }
    }
}

impl AtmosphereModel {
    pub fn with_solar_activity(solar_activity: f64) -> Self {
        Self { solar_activity }
    }

    /// Density at a geometric altitude, kg/m³.
    ///
    /// Below the lowest band the profile continues with the first band's
    /// scale height; above the highest band with the last.
    pub fn density_kg_m3(&self, altitude_m: f64) -> f64 {
        let (h0, rho0, scale) = *DENSITY_BANDS
            .iter()
            .rev()
            .find(|(h0, _, _)| altitude_m >= *h0)
            .unwrap_or(&DENSITY_BANDS[0]);
        self.solar_activity * rho0 * (-(altitude_m - h0) / scale).exp()
    }
}
