//! Per-run configuration for the docking pipeline.
//! Reads oxidock.toml from the current directory or path in OXIDOCK_CONFIG env var.
//!
//! A `RunConfig` is constructed once per pipeline invocation and passed by
//! reference into the configuration builders and the orchestrator. It is
//! never mutated after loading.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{OxidockError, Result};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunConfig {
    pub paths: PathsConfig,
    pub tools: ToolsConfig,
    #[serde(default)]
    pub fixer: FixerConfig,
    #[serde(default)]
    pub ligand_prep: LigandPrepConfig,
    #[serde(default)]
    pub docking: DockingParams,
    #[serde(default)]
    pub execution: ExecutionConfig,
}

// ── Input and output paths ───────────────────────────────────────────────────

/// Resolved file-system paths for a run. All paths must be absolute.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PathsConfig {
    /// Apo receptor structure (PDB).
    pub receptor_pdb: PathBuf,
    /// Reference ligand (PDB) used solely to derive the docking search box.
    pub reference_ligand_pdb: PathBuf,
    /// Flat list of SMILES, one per line.
    pub smiles: PathBuf,
    /// Run-exclusive output directory, cleared and recreated at run start.
    pub output_dir: PathBuf,
}

// ── External tool entry points ───────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Interpreter the stage entry points run under.
    pub interpreter: PathBuf,
    /// Receptor-preparation entry point.
    pub target_preparator: PathBuf,
    /// Docking entry point.
    pub docker: PathBuf,
    /// Directory containing the vina binary.
    pub vina_binary_dir: PathBuf,
}

// ── Receptor fix-up toggles ──────────────────────────────────────────────────

/// Structure fix-up options, each independently toggleable.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    #[serde(default = "bool_true")]
    pub standardize: bool,
    #[serde(default = "bool_true")]
    pub remove_heterogens: bool,
    #[serde(default = "bool_true")]
    pub fix_missing_heavy_atoms: bool,
    #[serde(default = "bool_true")]
    pub fix_missing_hydrogens: bool,
    #[serde(default)]
    pub fix_missing_loops: bool,
    #[serde(default)]
    pub add_water_box: bool,
}

fn bool_true() -> bool { true }

impl Default for FixerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            standardize: true,
            remove_heterogens: true,
            fix_missing_heavy_atoms: true,
            fix_missing_hydrogens: true,
            fix_missing_loops: false,
            add_water_box: false,
        }
    }
}

// ── Ligand embedding parameters ──────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LigandPrepConfig {
    #[serde(default = "bool_true")]
    pub add_hydrogens: bool,
    #[serde(default = "default_embedding_method")]
    pub embedding_method: String,
    #[serde(default = "default_max_iterations")]
    pub maximum_iterations: u32,
}

fn default_embedding_method() -> String { "UFF".to_string() }
fn default_max_iterations()   -> u32    { 300 }

impl Default for LigandPrepConfig {
    fn default() -> Self {
        Self {
            add_hydrogens: true,
            embedding_method: default_embedding_method(),
            maximum_iterations: default_max_iterations(),
        }
    }
}

// ── Docking parameters ───────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingParams {
    #[serde(default = "default_ph")]
    pub ph: f64,
    #[serde(default = "default_number_poses")]
    pub number_poses: u32,
    #[serde(default = "default_number_cores")]
    pub number_cores: u32,
    /// Fixed seed for reproducible docking runs.
    #[serde(default = "default_seed")]
    pub seed: u64,
    /// Explicit search box. When absent the box is read back from the
    /// receptor-preparation log.
    #[serde(default)]
    pub search_box: Option<BoxSpec>,
}

fn default_ph()           -> f64 { 7.4 }
fn default_number_poses() -> u32 { 10 }
fn default_number_cores() -> u32 { 32 }
fn default_seed()         -> u64 { 42 }

impl Default for DockingParams {
    fn default() -> Self {
        Self {
            ph: default_ph(),
            number_poses: default_number_poses(),
            number_cores: default_number_cores(),
            seed: default_seed(),
            search_box: None,
        }
    }
}

// ── Execution options ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ExecutionConfig {
    /// Deadline per external stage, in seconds. Unset means no deadline:
    /// a hung tool blocks the run, matching the plain subprocess behaviour.
    #[serde(default)]
    pub stage_timeout_secs: Option<u64>,
}

// ── Search box ───────────────────────────────────────────────────────────────

/// A complete six-scalar search-space box (cavity definition).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SearchBox {
    pub center_x: f64,
    pub center_y: f64,
    pub center_z: f64,
    pub size_x: f64,
    pub size_y: f64,
    pub size_z: f64,
}

/// Config-facing box where each axis field may be given independently.
/// Resolution enforces that the box is specified either completely or not
/// at all; a partial box is a configuration error.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct BoxSpec {
    pub center_x: Option<f64>,
    pub center_y: Option<f64>,
    pub center_z: Option<f64>,
    pub size_x: Option<f64>,
    pub size_y: Option<f64>,
    pub size_z: Option<f64>,
}

impl BoxSpec {
    /// Resolve into a complete box. Returns Ok(None) when no field is set,
    /// an error when only some fields are set.
    pub fn resolve(&self) -> Result<Option<SearchBox>> {
        if let (Some(center_x), Some(center_y), Some(center_z), Some(size_x), Some(size_y), Some(size_z)) = (
            self.center_x,
            self.center_y,
            self.center_z,
            self.size_x,
            self.size_y,
            self.size_z,
        ) {
            return Ok(Some(SearchBox {
                center_x,
                center_y,
                center_z,
                size_x,
                size_y,
                size_z,
            }));
        }

        let fields = [
            ("search_box.center_x", self.center_x),
            ("search_box.center_y", self.center_y),
            ("search_box.center_z", self.center_z),
            ("search_box.size_x", self.size_x),
            ("search_box.size_y", self.size_y),
            ("search_box.size_z", self.size_z),
        ];

        if fields.iter().all(|(_, v)| v.is_none()) {
            return Ok(None);
        }

        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, v)| v.is_none())
            .map(|(name, _)| *name)
            .collect();
        Err(OxidockError::Configuration(format!(
            "search box is incomplete, missing: {}",
            missing.join(", ")
        )))
    }
}

// ── Loading ──────────────────────────────────────────────────────────────────

impl RunConfig {
    /// Load configuration from oxidock.toml.
    /// Checks OXIDOCK_CONFIG env var first, then current directory.
    pub fn load() -> anyhow::Result<Self> {
        let path = std::env::var("OXIDOCK_CONFIG")
            .unwrap_or_else(|_| "oxidock.toml".to_string());
        Self::load_from(Path::new(&path))
    }

    /// Load configuration from an explicit TOML file.
    pub fn load_from(path: &Path) -> anyhow::Result<Self> {
        if !path.exists() {
            anyhow::bail!(
                "Config file not found: {}\n\
                 Copy oxidock.example.toml to oxidock.toml and edit it.",
                path.display()
            );
        }

        let content = std::fs::read_to_string(path)?;
        let config: RunConfig = toml::from_str(&content)?;
        Ok(config)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn minimal_toml() -> &'static str {
        r#"
            [paths]
            receptor_pdb = "/data/input/Grp94.pdb"
            reference_ligand_pdb = "/data/input/ligand.pdb"
            smiles = "/data/input/smiles.txt"
            output_dir = "/data/output/Grp94"

            [tools]
            interpreter = "/envs/dockstream/bin/python"
            target_preparator = "/opt/DockStream/target_preparator.py"
            docker = "/opt/DockStream/docker.py"
            vina_binary_dir = "/opt/vina/bin"
        "#
    }

    #[test]
    fn test_minimal_config_uses_defaults() {
        let config: RunConfig = toml::from_str(minimal_toml()).unwrap();
        assert!(config.fixer.enabled);
        assert!(!config.fixer.fix_missing_loops);
        assert_eq!(config.ligand_prep.embedding_method, "UFF");
        assert_eq!(config.docking.number_poses, 10);
        assert_eq!(config.docking.seed, 42);
        assert!(config.docking.search_box.is_none());
        assert!(config.execution.stage_timeout_secs.is_none());
    }

    #[test]
    fn test_full_box_resolves() {
        let spec = BoxSpec {
            center_x: Some(17.8),
            center_y: Some(-19.3),
            center_z: Some(53.3),
            size_x: Some(17.0),
            size_y: Some(17.3),
            size_z: Some(18.0),
        };
        let resolved = spec.resolve().unwrap().unwrap();
        assert_eq!(resolved.center_y, -19.3);
        assert_eq!(resolved.size_z, 18.0);
    }

    #[test]
    fn test_empty_box_resolves_to_none() {
        let spec = BoxSpec::default();
        assert!(spec.resolve().unwrap().is_none());
    }

    #[test]
    fn test_partial_box_is_rejected() {
        let spec = BoxSpec {
            center_x: Some(17.8),
            center_y: Some(-19.3),
            ..Default::default()
        };
        let err = spec.resolve().unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("search_box.center_z"), "missing fields named: {msg}");
        assert!(msg.contains("search_box.size_x"));
    }

    #[test]
    fn test_load_from_missing_file_fails() {
        let err = RunConfig::load_from(Path::new("/nonexistent/oxidock.toml")).unwrap_err();
        assert!(err.to_string().contains("Config file not found"));
    }

    #[test]
    fn test_load_from_file_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("oxidock.toml");
        std::fs::write(&path, minimal_toml()).unwrap();

        let config = RunConfig::load_from(&path).unwrap();
        assert_eq!(
            config.paths.output_dir,
            PathBuf::from("/data/output/Grp94")
        );
        assert_eq!(
            config.tools.interpreter,
            PathBuf::from("/envs/dockstream/bin/python")
        );
    }
}
