//! Typed configuration documents for the external stages.
//!
//! Each stage consumes one self-contained JSON document. The structs here
//! mirror the tools' schemas field for field; building one validates every
//! path up front so a bad path fails here instead of opaquely inside the
//! external tool. Serialization order follows struct declaration order, so
//! identical inputs always produce byte-identical documents.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use oxidock_common::{OutputLayout, OxidockError, Result, RunConfig, SearchBox};

/// Backend identifier shared by both stage documents.
pub const VINA_BACKEND: &str = "AutoDockVina";

/// Identifier of the single embedding pool the docking run consumes.
pub const RDKIT_POOL_ID: &str = "RDkit_pool";

// ── Receptor preparation document ─────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPrepConfig {
    pub target_preparation: TargetPreparation,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetPreparation {
    pub header: Header,
    pub input_path: PathBuf,
    pub fixer: FixerBlock,
    pub runs: Vec<PrepRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Header {
    pub logging: Logging,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Logging {
    pub logfile: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FixerBlock {
    pub enabled: bool,
    pub standardize: bool,
    pub remove_heterogens: bool,
    pub fix_missing_heavy_atoms: bool,
    pub fix_missing_hydrogens: bool,
    pub fix_missing_loops: bool,
    pub add_water_box: bool,
    pub fixed_pdb_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepRun {
    pub backend: String,
    pub output: PrepOutput,
    pub parameters: PrepParameters,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepOutput {
    pub receptor_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PrepParameters {
    #[serde(rename = "pH")]
    pub ph: f64,
    pub extract_box: ExtractBox,
}

/// Names the reference ligand used to derive the search cavity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractBox {
    pub reference_ligand_path: PathBuf,
    pub reference_ligand_format: String,
}

// ── Docking document ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingStageConfig {
    pub docking: DockingBlock,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingBlock {
    pub ligand_preparation: LigandPreparation,
    pub docking_runs: Vec<DockingRun>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LigandPreparation {
    pub embedding_pools: Vec<EmbeddingPool>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingPool {
    pub pool_id: String,
    #[serde(rename = "type")]
    pub pool_type: String,
    pub parameters: EmbeddingParameters,
    pub input: PoolInput,
    pub output: PoolOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmbeddingParameters {
    #[serde(rename = "addHs")]
    pub add_hs: bool,
    pub coordinate_generation: CoordinateGeneration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinateGeneration {
    pub method: String,
    pub maximum_iterations: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolInput {
    pub standardize_smiles: bool,
    #[serde(rename = "type")]
    pub format: String,
    pub input_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolOutput {
    pub conformer_path: PathBuf,
    pub format: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingRun {
    pub backend: String,
    pub run_id: String,
    pub input_pools: Vec<String>,
    pub parameters: DockingRunParameters,
    pub output: DockingOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingRunParameters {
    pub binary_location: PathBuf,
    pub parallelization: Parallelization,
    pub seed: u64,
    pub receptor_pdbqt_path: Vec<PathBuf>,
    pub number_poses: u32,
    pub search_space: SearchSpace,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Parallelization {
    pub number_cores: u32,
}

/// Search cavity in the docking engine's flag-keyed form.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SearchSpace {
    #[serde(rename = "--center_x")]
    pub center_x: f64,
    #[serde(rename = "--center_y")]
    pub center_y: f64,
    #[serde(rename = "--center_z")]
    pub center_z: f64,
    #[serde(rename = "--size_x")]
    pub size_x: f64,
    #[serde(rename = "--size_y")]
    pub size_y: f64,
    #[serde(rename = "--size_z")]
    pub size_z: f64,
}

impl From<SearchBox> for SearchSpace {
    fn from(b: SearchBox) -> Self {
        Self {
            center_x: b.center_x,
            center_y: b.center_y,
            center_z: b.center_z,
            size_x: b.size_x,
            size_y: b.size_y,
            size_z: b.size_z,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DockingOutput {
    pub poses: PosesOutput,
    pub scores: ScoresOutput,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PosesOutput {
    pub poses_path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoresOutput {
    pub scores_path: PathBuf,
}

// ── Path validation ───────────────────────────────────────────────────────────

/// Reject empty, placeholder, and relative paths before any process starts.
fn require_path(field: &str, path: &Path) -> Result<()> {
    let text = path.to_string_lossy();
    if text.is_empty() {
        return Err(OxidockError::Configuration(format!(
            "required path '{field}' is empty"
        )));
    }
    if text.contains("PLACEHOLDER") {
        return Err(OxidockError::Configuration(format!(
            "required path '{field}' still holds a placeholder value: {text}"
        )));
    }
    if !path.is_absolute() {
        return Err(OxidockError::Configuration(format!(
            "required path '{field}' must be absolute: {text}"
        )));
    }
    Ok(())
}

// ── Builders ──────────────────────────────────────────────────────────────────

/// Build the receptor-preparation document for a run.
pub fn build_target_prep_config(
    config: &RunConfig,
    layout: &OutputLayout,
) -> Result<TargetPrepConfig> {
    require_path("paths.receptor_pdb", &config.paths.receptor_pdb)?;
    require_path("paths.reference_ligand_pdb", &config.paths.reference_ligand_pdb)?;
    require_path("paths.output_dir", layout.output_dir())?;
    require_path("tools.target_preparator", &config.tools.target_preparator)?;

    Ok(TargetPrepConfig {
        target_preparation: TargetPreparation {
            header: Header {
                logging: Logging {
                    logfile: layout.target_prep_log(),
                },
            },
            input_path: config.paths.receptor_pdb.clone(),
            fixer: FixerBlock {
                enabled: config.fixer.enabled,
                standardize: config.fixer.standardize,
                remove_heterogens: config.fixer.remove_heterogens,
                fix_missing_heavy_atoms: config.fixer.fix_missing_heavy_atoms,
                fix_missing_hydrogens: config.fixer.fix_missing_hydrogens,
                fix_missing_loops: config.fixer.fix_missing_loops,
                add_water_box: config.fixer.add_water_box,
                fixed_pdb_path: layout.fixed_pdb(),
            },
            runs: vec![PrepRun {
                backend: VINA_BACKEND.to_string(),
                output: PrepOutput {
                    receptor_path: layout.receptor_pdbqt(),
                },
                parameters: PrepParameters {
                    ph: config.docking.ph,
                    extract_box: ExtractBox {
                        reference_ligand_path: config.paths.reference_ligand_pdb.clone(),
                        reference_ligand_format: "PDB".to_string(),
                    },
                },
            }],
        },
    })
}

/// Build the docking document, threading in the receptor produced by the
/// preparation stage and the resolved search box.
pub fn build_docking_config(
    config: &RunConfig,
    layout: &OutputLayout,
    receptor_pdbqt: &Path,
    search_box: SearchBox,
) -> Result<DockingStageConfig> {
    require_path("paths.smiles", &config.paths.smiles)?;
    require_path("tools.vina_binary_dir", &config.tools.vina_binary_dir)?;
    require_path("receptor_pdbqt", receptor_pdbqt)?;

    Ok(DockingStageConfig {
        docking: DockingBlock {
            ligand_preparation: LigandPreparation {
                embedding_pools: vec![EmbeddingPool {
                    pool_id: RDKIT_POOL_ID.to_string(),
                    pool_type: "RDkit".to_string(),
                    parameters: EmbeddingParameters {
                        add_hs: config.ligand_prep.add_hydrogens,
                        coordinate_generation: CoordinateGeneration {
                            method: config.ligand_prep.embedding_method.clone(),
                            maximum_iterations: config.ligand_prep.maximum_iterations,
                        },
                    },
                    input: PoolInput {
                        standardize_smiles: false,
                        format: "smi".to_string(),
                        input_path: config.paths.smiles.clone(),
                    },
                    output: PoolOutput {
                        conformer_path: layout.embedded_ligands(),
                        format: "sdf".to_string(),
                    },
                }],
            },
            docking_runs: vec![DockingRun {
                backend: VINA_BACKEND.to_string(),
                run_id: VINA_BACKEND.to_string(),
                input_pools: vec![RDKIT_POOL_ID.to_string()],
                parameters: DockingRunParameters {
                    binary_location: config.tools.vina_binary_dir.clone(),
                    parallelization: Parallelization {
                        number_cores: config.docking.number_cores,
                    },
                    seed: config.docking.seed,
                    receptor_pdbqt_path: vec![receptor_pdbqt.to_path_buf()],
                    number_poses: config.docking.number_poses,
                    search_space: search_box.into(),
                },
                output: DockingOutput {
                    poses: PosesOutput {
                        poses_path: layout.ligands_docked(),
                    },
                    scores: ScoresOutput {
                        scores_path: layout.scores(),
                    },
                },
            }],
        },
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
