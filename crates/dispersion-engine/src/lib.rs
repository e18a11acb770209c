//! Dispersion Engine Library
//!
//! Monte Carlo robustness analysis for the formation: injection-error
//! recovery campaigns and drag-only dispersion campaigns. Perturbations are
//! generated sequentially from a seeded PCG generator, trials are evaluated
//! in parallel, and a single join-barrier reduction produces the aggregate
//! statistics, so results are reproducible from the seed alone.

use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;

pub mod drag;
pub mod injection;

pub use drag::{run_drag_dispersion, DragDispersionConfig, DragDispersionResult};
pub use injection::{
    run_injection_dispersion, InjectionDispersionConfig, InjectionDispersionResult,
};

#[derive(Error, Debug)]
pub enum DispersionError {
    #[error("Campaign requires at least one trial")]
    EmptyCampaign,
    #[error("Invalid sigma: {0}")]
    InvalidSigma(String),
    #[error("Campaign cancelled after {completed} of {requested} trials")]
    Cancelled { completed: usize, requested: usize },
    #[error(transparent)]
    Propagation(#[from] orbit_propagation::PropagationError),
    #[error(transparent)]
    Geometry(#[from] formation_geometry::GeometryError),
}

pub type Result<T> = std::result::Result<T, DispersionError>;

/// Cooperative cancellation flag, examined once per completed trial.
/// There is no mid-trial cancellation.
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// Mean / 95th percentile / maximum over a sample set.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct DispersionStatistics {
    pub mean: f64,
    pub p95: f64,
    pub max: f64,
}

impl DispersionStatistics {
    pub fn from_samples(samples: &[f64]) -> Self {
        if samples.is_empty() {
            return Self::default();
        }
        let mut sorted = samples.to_vec();
        sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
        Self {
            mean: sorted.iter().sum::<f64>() / sorted.len() as f64,
            p95: percentile(&sorted, 0.95),
            max: sorted[sorted.len() - 1],
        }
    }
}

/// Quantile by linear interpolation between order statistics
/// (Hyndman–Fan type 7): h = (n-1)·q, blended between x[⌊h⌋] and x[⌈h⌉].
///
/// `sorted` must be ascending.
pub fn percentile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let q = q.clamp(0.0, 1.0);
    let h = (sorted.len() - 1) as f64 * q;
    let lo = h.floor() as usize;
    let hi = h.ceil() as usize;
    if lo == hi {
        sorted[lo]
    } else {
        sorted[lo] + (h - lo as f64) * (sorted[hi] - sorted[lo])
    }
}
