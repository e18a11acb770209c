//! Mission Export Library
//!
//! Serialises a finalized formation run into the artefact set consumed by
//! the external mission-visualisation tool: per-spacecraft ephemerides,
//! asset definitions, ground tracks, the facility, contact intervals, the
//! manoeuvre event list and a top-level scenario that references everything
//! by sanitised name. All cross-references must resolve within the emitted
//! set, and re-exporting an unchanged run is byte-identical except for the
//! scenario's generation timestamp.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod schema;
pub mod serializer;

pub use serializer::export_run;

/// Bounded collision-resolution attempts before giving up.
const MAX_SUFFIX_ATTEMPTS: u32 = 100;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Name collision for {name:?} could not be resolved within {attempts} attempts")]
    NameCollisionUnresolved { name: String, attempts: u32 },
    #[error("Ephemeris time tags for {spacecraft:?} are not strictly increasing at row {row}")]
    NonMonotonicEphemeris { spacecraft: String, row: usize },
    #[error("Scenario references {reference:?} which is not in the emitted artefact set")]
    DanglingReference { reference: String },
    #[error("Artefact serialization failed: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Artefact write failed: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ExportError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ArtifactKind {
    Ephemeris,
    Asset,
    GroundTrack,
    Facility,
    ContactIntervals,
    Events,
    Scenario,
}

/// One named artefact. Immutable once rendered; never feeds back into
/// simulation state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportArtifact {
    pub name: String,
    pub kind: ArtifactKind,
    pub file_name: String,
    pub content: String,
}

/// The full cross-referenced artefact set of one export.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactSet {
    pub artifacts: Vec<ExportArtifact>,
}

impl ArtifactSet {
    pub fn get(&self, name: &str) -> Option<&ExportArtifact> {
        self.artifacts.iter().find(|a| a.name == name)
    }

    pub fn names(&self) -> HashSet<&str> {
        self.artifacts.iter().map(|a| a.name.as_str()).collect()
    }

    /// Terminal persistence step: write every artefact into `dir`.
    /// No other part of the pipeline touches the filesystem.
    pub fn write_to_dir(&self, dir: &Path) -> Result<()> {
        fs::create_dir_all(dir)?;
        for artifact in &self.artifacts {
            fs::write(dir.join(&artifact.file_name), &artifact.content)?;
        }
        Ok(())
    }
}

/// Restrict a human-supplied name to `[A-Za-z0-9_-]`.
pub fn sanitize_name(raw: &str) -> String {
    let cleaned: String = raw
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "unnamed".to_string()
    } else {
        cleaned
    }
}

/// Reserve a unique sanitised name, suffixing `_2`, `_3`, … on collision.
pub fn reserve_name(raw: &str, used: &mut HashSet<String>) -> Result<String> {
    let base = sanitize_name(raw);
    if used.insert(base.clone()) {
        return Ok(base);
    }
    for attempt in 2..=MAX_SUFFIX_ATTEMPTS {
        let candidate = format!("{base}_{attempt}");
        if used.insert(candidate.clone()) {
            return Ok(candidate);
        }
    }
    Err(ExportError::NameCollisionUnresolved {
        name: base,
        attempts: MAX_SUFFIX_ATTEMPTS,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_replaces_disallowed() {
        assert_eq!(sanitize_name("FORM A/1"), "FORM_A_1");
        assert_eq!(sanitize_name("Tehran (primary)"), "Tehran__primary_");
        assert_eq!(sanitize_name("ok-name_9"), "ok-name_9");
        assert_eq!(sanitize_name(""), "unnamed");
        assert_eq!(sanitize_name("πλξ"), "___");
    }

    #[test]
    fn test_reserve_name_suffixes_deterministically() {
        let mut used = HashSet::new();
        assert_eq!(reserve_name("FORM.A", &mut used).unwrap(), "FORM_A");
        // Different raw name, identical after sanitisation
        assert_eq!(reserve_name("FORM_A", &mut used).unwrap(), "FORM_A_2");
        assert_eq!(reserve_name("FORM A", &mut used).unwrap(), "FORM_A_3");
    }

    #[test]
    fn test_reserve_name_bounded_attempts() {
        let mut used = HashSet::new();
        used.insert("X".to_string());
        for attempt in 2..=MAX_SUFFIX_ATTEMPTS {
            used.insert(format!("X_{attempt}"));
        }
        let err = reserve_name("X", &mut used).unwrap_err();
        assert!(matches!(err, ExportError::NameCollisionUnresolved { .. }));
    }
}
