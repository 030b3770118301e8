//! Merge per-molecule affinity predictions into the master molecule table.
//!
//! One prediction artifact per molecule ID is expected at
//! `<predictions_dir>/<label>_<ID>/affinity_<label>_<ID>.json`. The table is
//! read once, a single column is appended (or overwritten, when re-merging),
//! and the whole file is rewritten in place: same path, same row order,
//! same IDs.

use serde::Serialize;
use std::path::PathBuf;
use tracing::{info, warn};

use oxidock_common::{OxidockError, Result};

/// ID column expected in the molecule table.
pub const ID_COLUMN: &str = "ID";

/// JSON field holding the predicted value inside each artifact.
pub const PREDICTION_FIELD: &str = "affinity_pred_value";

// ── Job ───────────────────────────────────────────────────────────────────────

/// Parameters for one merge run.
#[derive(Debug, Clone)]
pub struct MergeJob {
    /// Molecule table, rewritten in place.
    pub table_path: PathBuf,
    /// Root directory holding one prediction artifact per molecule.
    pub predictions_dir: PathBuf,
    /// Target label, e.g. "grp" or "hsp"; selects the artifact sub-paths and
    /// names the merged column.
    pub label: String,
}

impl MergeJob {
    /// Name of the column the merge writes.
    pub fn column_name(&self) -> String {
        format!("affinity_with_{}(boltz)", self.label)
    }

    /// Deterministic artifact location for one molecule ID.
    pub fn artifact_path(&self, molecule_id: &str) -> PathBuf {
        self.predictions_dir
            .join(format!("{}_{}", self.label, molecule_id))
            .join(format!("affinity_{}_{}.json", self.label, molecule_id))
    }
}

// ── Per-row outcome ───────────────────────────────────────────────────────────

/// Why a row received the missing-value marker instead of a prediction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MergeSkipReason {
    /// No artifact at the derived path.
    ArtifactMissing,
    /// The artifact exists but could not be read.
    Unreadable(String),
    /// The artifact is not valid JSON.
    Malformed(String),
    /// Valid JSON without a numeric prediction field.
    FieldAbsent,
}

/// One row's merge result. A skipped row never aborts the run; the skip
/// reason is data, not an error.
#[derive(Debug, Clone, Serialize)]
pub struct MergeRowOutcome {
    pub molecule_id: String,
    pub value: Option<f64>,
    pub skip_reason: Option<MergeSkipReason>,
}

/// Summary of a completed merge.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub column: String,
    pub merged: usize,
    pub missing: usize,
    pub rows: Vec<MergeRowOutcome>,
}

// ── Merge ─────────────────────────────────────────────────────────────────────

/// Run the merge. Fatal errors are limited to the table itself (unreadable,
/// no ID column); every per-artifact problem degrades to a missing value on
/// that row only.
pub async fn merge_affinity(job: &MergeJob) -> Result<MergeReport> {
    let content = tokio::fs::read_to_string(&job.table_path).await?;
    let mut reader = csv::Reader::from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| OxidockError::Configuration(format!("molecule table has no header: {e}")))?
        .iter()
        .map(|s| s.to_string())
        .collect();

    let id_index = headers
        .iter()
        .position(|h| h == ID_COLUMN)
        .ok_or_else(|| {
            OxidockError::Configuration(format!(
                "molecule table {:?} has no '{ID_COLUMN}' column",
                job.table_path
            ))
        })?;

    let records = reader
        .records()
        .collect::<std::result::Result<Vec<_>, _>>()
        .map_err(|e| OxidockError::Configuration(format!("molecule table is malformed: {e}")))?;

    info!(
        rows = records.len(),
        table = ?job.table_path,
        "Merging '{}' predictions",
        job.label
    );

    let column = job.column_name();
    // re-merging overwrites the previous result instead of appending a twin
    let existing = headers.iter().position(|h| h == &column);

    let mut rows = Vec::with_capacity(records.len());
    for record in &records {
        let molecule_id = record.get(id_index).unwrap_or_default().to_string();
        let outcome = read_prediction(job, &molecule_id).await;
        if let Some(reason) = &outcome.skip_reason {
            warn!(id = %outcome.molecule_id, ?reason, "No prediction merged for row");
        }
        rows.push(outcome);
    }

    // rewrite the table wholesale
    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut out_headers = headers.clone();
    match existing {
        Some(i) => out_headers[i] = column.clone(),
        None => out_headers.push(column.clone()),
    }
    writer
        .write_record(&out_headers)
        .map_err(|e| OxidockError::Configuration(format!("failed to write table header: {e}")))?;

    for (record, outcome) in records.iter().zip(&rows) {
        let value = outcome
            .value
            .map(|v| v.to_string())
            .unwrap_or_default();
        let mut fields: Vec<String> = record.iter().map(|s| s.to_string()).collect();
        match existing {
            Some(i) => fields[i] = value,
            None => fields.push(value),
        }
        writer
            .write_record(&fields)
            .map_err(|e| OxidockError::Configuration(format!("failed to write table row: {e}")))?;
    }

    let bytes = writer
        .into_inner()
        .map_err(|e| OxidockError::Configuration(format!("failed to flush table: {e}")))?;
    tokio::fs::write(&job.table_path, bytes).await?;

    let merged = rows.iter().filter(|r| r.value.is_some()).count();
    let missing = rows.len() - merged;
    info!(column = %column, merged, missing, "Merge complete");

    Ok(MergeReport {
        column,
        merged,
        missing,
        rows,
    })
}

/// Read one molecule's prediction; all failures collapse into a per-row
/// skip reason.
async fn read_prediction(job: &MergeJob, molecule_id: &str) -> MergeRowOutcome {
    let path = job.artifact_path(molecule_id);

    let outcome = |value, skip_reason| MergeRowOutcome {
        molecule_id: molecule_id.to_string(),
        value,
        skip_reason,
    };

    if !path.exists() {
        return outcome(None, Some(MergeSkipReason::ArtifactMissing));
    }

    let content = match tokio::fs::read_to_string(&path).await {
        Ok(c) => c,
        Err(e) => return outcome(None, Some(MergeSkipReason::Unreadable(e.to_string()))),
    };

    let document: serde_json::Value = match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => return outcome(None, Some(MergeSkipReason::Malformed(e.to_string()))),
    };

    match document.get(PREDICTION_FIELD).and_then(|v| v.as_f64()) {
        Some(value) => outcome(Some(value), None),
        None => outcome(None, Some(MergeSkipReason::FieldAbsent)),
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
