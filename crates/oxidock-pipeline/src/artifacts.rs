//! Artifact roles and the role → path mapping threaded between stages.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Semantic role of a file produced by one stage and consumed by a later
/// stage or by the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactRole {
    FixedStructure,
    PreparedReceptor,
    PreparationLog,
    DockingBox,
    EmbeddedLigands,
    DockedPoses,
    ScoreTable,
}

impl ArtifactRole {
    pub fn describe(&self) -> &'static str {
        match self {
            ArtifactRole::FixedStructure => "fixed receptor structure",
            ArtifactRole::PreparedReceptor => "prepared receptor",
            ArtifactRole::PreparationLog => "receptor preparation log",
            ArtifactRole::DockingBox => "docking box parameters",
            ArtifactRole::EmbeddedLigands => "embedded ligand conformers",
            ArtifactRole::DockedPoses => "docked poses",
            ArtifactRole::ScoreTable => "score table",
        }
    }
}

/// A file-system path with its semantic role.
#[derive(Debug, Clone, Serialize)]
pub struct ArtifactReference {
    pub role: ArtifactRole,
    pub path: PathBuf,
}

impl ArtifactReference {
    pub fn new<P: AsRef<Path>>(role: ArtifactRole, path: P) -> Self {
        Self {
            role,
            path: path.as_ref().to_path_buf(),
        }
    }
}

/// Role → path map. The orchestrator is the sole holder of this mapping
/// across stage boundaries; each role is produced by exactly one stage.
#[derive(Debug, Default)]
pub struct ArtifactSet {
    inner: BTreeMap<ArtifactRole, PathBuf>,
}

impl ArtifactSet {
    pub fn record(&mut self, artifact: ArtifactReference) {
        self.inner.insert(artifact.role, artifact.path);
    }

    pub fn get(&self, role: ArtifactRole) -> Option<&Path> {
        self.inner.get(&role).map(|p| p.as_path())
    }

    pub fn references(&self) -> Vec<ArtifactReference> {
        self.inner
            .iter()
            .map(|(role, path)| ArtifactReference::new(*role, path))
            .collect()
    }
}
