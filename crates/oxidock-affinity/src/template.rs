//! Per-molecule input configs for the affinity prediction tool.
//!
//! The tool takes one YAML document per molecule. All documents are
//! identical except for the ligand SMILES, so they are stamped out from a
//! single user-supplied template with the SMILES substituted per row of the
//! molecule table.

use serde::Serialize;
use serde_yaml::Value;
use std::path::PathBuf;
use tracing::{info, warn};

use oxidock_common::{OxidockError, Result};

use crate::merge::ID_COLUMN;

/// SMILES column expected in the molecule table.
pub const SMILES_COLUMN: &str = "SMILES";

/// Parameters for one generation run.
#[derive(Debug, Clone)]
pub struct TemplateJob {
    /// Molecule table providing ID and SMILES per row.
    pub table_path: PathBuf,
    /// Template YAML document for the prediction tool.
    pub template_path: PathBuf,
    /// Directory receiving one `<label>_<ID>.yaml` per row.
    pub output_dir: PathBuf,
    /// Target label, e.g. "grp" or "hsp".
    pub label: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct RowFailure {
    pub molecule_id: String,
    pub reason: String,
}

/// Summary of a completed generation run.
#[derive(Debug, Clone, Serialize)]
pub struct TemplateReport {
    pub written: usize,
    pub failures: Vec<RowFailure>,
}

/// Substitute the SMILES into the template's ligand sequence entry.
/// The ligand is the second entry of `sequences` (the first names the
/// protein target).
fn set_ligand_smiles(document: &mut Value, smiles: &str) -> bool {
    let Some(sequences) = document
        .get_mut("sequences")
        .and_then(|s| s.as_sequence_mut())
    else {
        return false;
    };
    let Some(ligand) = sequences
        .get_mut(1)
        .and_then(|entry| entry.get_mut("ligand"))
        .and_then(|l| l.as_mapping_mut())
    else {
        return false;
    };
    ligand.insert(
        Value::String("smiles".to_string()),
        Value::String(smiles.to_string()),
    );
    true
}

/// Generate one config per table row. Row-level problems (missing SMILES,
/// unwritable file) are collected per row; a template that has no ligand
/// sequence entry at all is a fatal configuration error.
pub async fn generate_affinity_configs(job: &TemplateJob) -> Result<TemplateReport> {
    let template_text = tokio::fs::read_to_string(&job.template_path).await?;
    let template: Value = serde_yaml::from_str(&template_text).map_err(|e| {
        OxidockError::Configuration(format!(
            "template {:?} is not valid YAML: {e}",
            job.template_path
        ))
    })?;

    // validate the template shape once, before touching any row
    let mut probe = template.clone();
    if !set_ligand_smiles(&mut probe, "C") {
        return Err(OxidockError::Configuration(format!(
            "template {:?} has no ligand entry under 'sequences'",
            job.template_path
        )));
    }

    let content = tokio::fs::read_to_string(&job.table_path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| OxidockError::Configuration(format!("molecule table has no header: {e}")))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let id_index = headers.iter().position(|h| h == ID_COLUMN).ok_or_else(|| {
        OxidockError::Configuration(format!(
            "molecule table {:?} has no '{ID_COLUMN}' column",
            job.table_path
        ))
    })?;
    let smiles_index = headers
        .iter()
        .position(|h| h == SMILES_COLUMN)
        .ok_or_else(|| {
            OxidockError::Configuration(format!(
                "molecule table {:?} has no '{SMILES_COLUMN}' column",
                job.table_path
            ))
        })?;

    tokio::fs::create_dir_all(&job.output_dir).await?;

    let mut written = 0usize;
    let mut failures = Vec::new();

    for record in reader.records() {
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                failures.push(RowFailure {
                    molecule_id: String::new(),
                    reason: format!("unreadable row: {e}"),
                });
                continue;
            }
        };

        let molecule_id = record.get(id_index).unwrap_or_default().to_string();
        let smiles = record.get(smiles_index).unwrap_or_default();
        if molecule_id.is_empty() || smiles.is_empty() {
            warn!(id = %molecule_id, "Row lacks ID or SMILES, skipping");
            failures.push(RowFailure {
                molecule_id,
                reason: "row lacks ID or SMILES".to_string(),
            });
            continue;
        }

        let mut document = template.clone();
        set_ligand_smiles(&mut document, smiles);

        let path = job
            .output_dir
            .join(format!("{}_{}.yaml", job.label, molecule_id));
        let rendered = match serde_yaml::to_string(&document) {
            Ok(text) => text,
            Err(e) => {
                failures.push(RowFailure {
                    molecule_id,
                    reason: format!("failed to render YAML: {e}"),
                });
                continue;
            }
        };
        if let Err(e) = tokio::fs::write(&path, rendered).await {
            failures.push(RowFailure {
                molecule_id,
                reason: format!("failed to write {path:?}: {e}"),
            });
            continue;
        }
        written += 1;
    }

    info!(
        written,
        failed = failures.len(),
        output_dir = ?job.output_dir,
        "Affinity configs generated"
    );

    Ok(TemplateReport { written, failures })
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const TEMPLATE: &str = "\
version: 1
sequences:
  - protein:
      id: A
      sequence: MVLSPADKTN
  - ligand:
      id: B
      smiles: CCO
properties:
  - affinity:
      binder: B
";

    #[test]
    fn test_substitution_replaces_only_the_smiles() {
        let mut document: Value = serde_yaml::from_str(TEMPLATE).unwrap();
        assert!(set_ligand_smiles(&mut document, "c1ccccc1"));

        let rendered = serde_yaml::to_string(&document).unwrap();
        assert!(rendered.contains("smiles: c1ccccc1"));
        assert!(!rendered.contains("smiles: CCO"));
        assert!(rendered.contains("sequence: MVLSPADKTN"));
        assert!(rendered.contains("binder: B"));
    }

    #[test]
    fn test_template_without_ligand_is_detected() {
        let mut document: Value = serde_yaml::from_str("sequences:\n  - protein:\n      id: A\n").unwrap();
        assert!(!set_ligand_smiles(&mut document, "C"));
    }
}
