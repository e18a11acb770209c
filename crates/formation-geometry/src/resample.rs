//! Frame-consistent resampling of state histories.
//!
//! The strategy is chosen at construction time: linear blending is always
//! available, and a cubic Hermite variant uses the stored velocities for
//! higher-order accuracy. Call sites never branch on strategy availability.

use serde::{Deserialize, Serialize};

use orbit_propagation::StateVector;

use crate::{GeometryError, Result};

pub trait ResampleStrategy: Send + Sync {
    /// State at `t`, interpolated from an ascending-time series.
    fn state_at(&self, series: &[StateVector], t: f64) -> Result<StateVector>;
}

/// Strategy selection, resolved once at construction. Call sites hold the
/// trait object and never branch on the choice again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResamplingChoice {
    Linear,
    CubicHermite,
}

impl ResamplingChoice {
    pub fn build(&self) -> Box<dyn ResampleStrategy> {
        match self {
            ResamplingChoice::Linear => Box::new(LinearResampler),
            ResamplingChoice::CubicHermite => Box::new(CubicHermiteResampler),
        }
    }
}

/// Locate the bracketing pair for `t`.
fn bracket(series: &[StateVector], t: f64) -> Result<(usize, usize)> {
    if series.is_empty() {
        return Err(GeometryError::EmptySeries);
    }
    let first = series[0].t;
    let last = series[series.len() - 1].t;
    if t < first || t > last {
        return Err(GeometryError::ResampleOutOfRange(t));
    }
    let hi = series
        .iter()
        .position(|s| s.t >= t)
        .unwrap_or(series.len() - 1);
    Ok((hi.saturating_sub(1), hi))
}

/// Straight-line blend of position and velocity.
#[derive(Debug, Clone, Copy, Default)]
pub struct LinearResampler;

impl ResampleStrategy for LinearResampler {
    fn state_at(&self, series: &[StateVector], t: f64) -> Result<StateVector> {
        let (lo, hi) = bracket(series, t)?;
        if lo == hi {
            return Ok(series[lo]);
        }
        let a = &series[lo];
        let b = &series[hi];
        let dt = b.t - a.t;
        if dt <= 0.0 {
            return Ok(*a);
        }
        let alpha = (t - a.t) / dt;
        Ok(StateVector {
            t,
            position: a.position * (1.0 - alpha) + b.position * alpha,
            velocity: a.velocity * (1.0 - alpha) + b.velocity * alpha,
        })
    }
}

/// Cubic Hermite blend using the stored velocities as position tangents.
#[derive(Debug, Clone, Copy, Default)]
pub struct CubicHermiteResampler;

impl ResampleStrategy for CubicHermiteResampler {
    fn state_at(&self, series: &[StateVector], t: f64) -> Result<StateVector> {
        let (lo, hi) = bracket(series, t)?;
        if lo == hi {
            return Ok(series[lo]);
        }
        let a = &series[lo];
        let b = &series[hi];
        let dt = b.t - a.t;
        if dt <= 0.0 {
            return Ok(*a);
        }
        let s = (t - a.t) / dt;
        let s2 = s * s;
        let s3 = s2 * s;

        let h00 = 2.0 * s3 - 3.0 * s2 + 1.0;
        let h10 = s3 - 2.0 * s2 + s;
        let h01 = -2.0 * s3 + 3.0 * s2;
        let h11 = s3 - s2;

        let position = a.position * h00
            + a.velocity * (h10 * dt)
            + b.position * h01
            + b.velocity * (h11 * dt);

        // Derivative of the Hermite basis gives the blended velocity
        let dh00 = (6.0 * s2 - 6.0 * s) / dt;
        let dh10 = 3.0 * s2 - 4.0 * s + 1.0;
        let dh01 = (-6.0 * s2 + 6.0 * s) / dt;
        let dh11 = 3.0 * s2 - 2.0 * s;

        let velocity = a.position * dh00
            + a.velocity * dh10
            + b.position * dh01
            + b.velocity * dh11;

        Ok(StateVector { t, position, velocity })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    fn linear_series() -> Vec<StateVector> {
        // Constant-velocity motion: both strategies must be exact
        (0..5)
            .map(|i| {
                let t = i as f64 * 10.0;
                StateVector {
                    t,
                    position: Vector3::new(100.0 * t, -50.0 * t, 7.0 * t),
                    velocity: Vector3::new(100.0, -50.0, 7.0),
                }
            })
            .collect()
    }

    #[test]
    fn test_linear_exact_on_linear_motion() {
        let series = linear_series();
        let s = LinearResampler.state_at(&series, 25.0).unwrap();
        assert!((s.position - Vector3::new(2500.0, -1250.0, 175.0)).norm() < 1e-9);
    }

    #[test]
    fn test_hermite_exact_on_linear_motion() {
        let series = linear_series();
        let s = CubicHermiteResampler.state_at(&series, 25.0).unwrap();
        assert!((s.position - Vector3::new(2500.0, -1250.0, 175.0)).norm() < 1e-6);
        assert!((s.velocity - Vector3::new(100.0, -50.0, 7.0)).norm() < 1e-6);
    }

    #[test]
    fn test_sample_point_passthrough() {
        let series = linear_series();
        let s = LinearResampler.state_at(&series, 20.0).unwrap();
        assert!((s.position - series[2].position).norm() < 1e-9);
    }

    #[test]
    fn test_out_of_range_rejected() {
        let series = linear_series();
        assert!(matches!(
            LinearResampler.state_at(&series, 41.0),
            Err(GeometryError::ResampleOutOfRange(_))
        ));
        assert!(matches!(
            CubicHermiteResampler.state_at(&series, -1.0),
            Err(GeometryError::ResampleOutOfRange(_))
        ));
    }
}
