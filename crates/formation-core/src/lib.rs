//! Formation Core Library
//!
//! Typed, validated mission configuration, the synchronous analysis
//! pipeline (node alignment → formation design → propagation → geometry →
//! maintenance/latency → Monte Carlo), the immutable formation summary and
//! the run registry.

use thiserror::Error;

pub mod config;
pub mod pipeline;
pub mod registry;
pub mod summary;

pub use config::{ConfigurationError, FormationConfig, SpacecraftPlane, TriangleVertex};
pub use pipeline::{run_formation_analysis, FormationRun};
pub use registry::RunRegistry;
pub use summary::{ComplianceFlag, FormationSummary, GeometryExtrema};

#[derive(Error, Debug)]
pub enum PipelineError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Propagation(#[from] orbit_propagation::PropagationError),
    #[error(transparent)]
    Geometry(#[from] formation_geometry::GeometryError),
    #[error(transparent)]
    Solver(#[from] node_alignment::SolverError),
    #[error(transparent)]
    Contact(#[from] ground_contact::ContactError),
    #[error(transparent)]
    Dispersion(#[from] dispersion_engine::DispersionError),
}

pub type Result<T> = std::result::Result<T, PipelineError>;
