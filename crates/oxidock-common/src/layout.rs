//! Output-file layout of a pipeline run.
//!
//! Every file a run produces lives under the run's output directory with a
//! fixed name, so a re-run against the same directory replaces the previous
//! run wholesale.

use std::path::{Path, PathBuf};

/// Receptor-preparation configuration document
pub const TARGET_PREP_CONFIG_FILE: &str = "ADV_target_prep.json";

/// Fixed (repaired) receptor structure
pub const FIXED_PDB_FILE: &str = "ADV_fixed_target.pdb";

/// Prepared receptor in docking-ready format
pub const RECEPTOR_PDBQT_FILE: &str = "ADV_receptor.pdbqt";

/// Receptor-preparation log (carries the derived docking box)
pub const TARGET_PREP_LOG_FILE: &str = "ADV_target_prep.log";

/// Docking configuration document
pub const DOCKING_CONFIG_FILE: &str = "ADV_docking.json";

/// Embedded ligand conformers
pub const EMBEDDED_LIGANDS_FILE: &str = "ADV_embedded_ligands.sdf";

/// Docked poses
pub const LIGANDS_DOCKED_FILE: &str = "ADV_ligands_docked.sdf";

/// Per-pose score table
pub const SCORES_FILE: &str = "ADV_scores.csv";

/// The derived locations of every artifact a run reads and writes.
#[derive(Debug, Clone)]
pub struct OutputLayout {
    output_dir: PathBuf,
}

impl OutputLayout {
    pub fn new<P: AsRef<Path>>(output_dir: P) -> Self {
        Self {
            output_dir: output_dir.as_ref().to_path_buf(),
        }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    pub fn target_prep_config(&self) -> PathBuf {
        self.output_dir.join(TARGET_PREP_CONFIG_FILE)
    }

    pub fn fixed_pdb(&self) -> PathBuf {
        self.output_dir.join(FIXED_PDB_FILE)
    }

    pub fn receptor_pdbqt(&self) -> PathBuf {
        self.output_dir.join(RECEPTOR_PDBQT_FILE)
    }

    pub fn target_prep_log(&self) -> PathBuf {
        self.output_dir.join(TARGET_PREP_LOG_FILE)
    }

    pub fn docking_config(&self) -> PathBuf {
        self.output_dir.join(DOCKING_CONFIG_FILE)
    }

    pub fn embedded_ligands(&self) -> PathBuf {
        self.output_dir.join(EMBEDDED_LIGANDS_FILE)
    }

    pub fn ligands_docked(&self) -> PathBuf {
        self.output_dir.join(LIGANDS_DOCKED_FILE)
    }

    pub fn scores(&self) -> PathBuf {
        self.output_dir.join(SCORES_FILE)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_paths_live_under_output_dir() {
        let layout = OutputLayout::new("/runs/grp94");
        assert_eq!(
            layout.receptor_pdbqt(),
            PathBuf::from("/runs/grp94/ADV_receptor.pdbqt")
        );
        assert_eq!(
            layout.scores(),
            PathBuf::from("/runs/grp94/ADV_scores.csv")
        );
        assert_eq!(layout.output_dir(), Path::new("/runs/grp94"));
    }
}
