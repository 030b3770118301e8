//! End-to-end merge and config-generation tests over a real temp table.

use std::fs;
use std::path::PathBuf;

use oxidock_affinity::{
    generate_affinity_configs, merge_affinity, MergeJob, MergeSkipReason, TemplateJob,
};

const TABLE: &str = "\
ID,SMILES,mw
mol1,CCO,46.07
mol2,c1ccccc1,78.11
mol3,CC(=O)O,60.05
";

fn write_table(dir: &std::path::Path) -> PathBuf {
    let path = dir.join("mols.csv");
    fs::write(&path, TABLE).unwrap();
    path
}

fn write_prediction(dir: &std::path::Path, label: &str, id: &str, value: f64) {
    let sub = dir.join(format!("{label}_{id}"));
    fs::create_dir_all(&sub).unwrap();
    fs::write(
        sub.join(format!("affinity_{label}_{id}.json")),
        format!(r#"{{"affinity_pred_value": {value}, "affinity_probability_binary": 0.7}}"#),
    )
    .unwrap();
}

#[tokio::test]
async fn test_merge_two_valid_one_missing() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path());
    let preds = dir.path().join("grp_predictions");
    write_prediction(&preds, "grp", "mol1", -6.42);
    write_prediction(&preds, "grp", "mol2", -5.13);
    // mol3 has no artifact

    let job = MergeJob {
        table_path: table.clone(),
        predictions_dir: preds,
        label: "grp".to_string(),
    };
    let report = merge_affinity(&job).await.unwrap();

    assert_eq!(report.merged, 2);
    assert_eq!(report.missing, 1);
    assert_eq!(report.column, "affinity_with_grp(boltz)");
    assert_eq!(
        report.rows[2].skip_reason,
        Some(MergeSkipReason::ArtifactMissing)
    );

    let rewritten = fs::read_to_string(&table).unwrap();
    let mut lines = rewritten.lines();
    assert_eq!(lines.next().unwrap(), "ID,SMILES,mw,affinity_with_grp(boltz)");
    assert_eq!(lines.next().unwrap(), "mol1,CCO,46.07,-6.42");
    assert_eq!(lines.next().unwrap(), "mol2,c1ccccc1,78.11,-5.13");
    // missing marker is an empty cell, never zero
    assert_eq!(lines.next().unwrap(), "mol3,CC(=O)O,60.05,");
}

#[tokio::test]
async fn test_remerge_overwrites_column_without_duplicating() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path());
    let preds = dir.path().join("hsp_predictions");
    write_prediction(&preds, "hsp", "mol1", -4.0);
    write_prediction(&preds, "hsp", "mol2", -4.5);
    write_prediction(&preds, "hsp", "mol3", -5.0);

    let job = MergeJob {
        table_path: table.clone(),
        predictions_dir: preds.clone(),
        label: "hsp".to_string(),
    };

    let first = merge_affinity(&job).await.unwrap();
    assert_eq!(first.merged, 3);

    // prediction for mol3 regenerated between merges
    write_prediction(&preds, "hsp", "mol3", -9.9);
    let second = merge_affinity(&job).await.unwrap();
    assert_eq!(second.merged, 3);

    let rewritten = fs::read_to_string(&table).unwrap();
    let header = rewritten.lines().next().unwrap();
    assert_eq!(
        header.matches("affinity_with_hsp(boltz)").count(),
        1,
        "column duplicated: {header}"
    );
    assert!(rewritten.contains("mol3,CC(=O)O,60.05,-9.9"));
}

#[tokio::test]
async fn test_malformed_artifact_only_skips_its_row() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path());
    let preds = dir.path().join("grp_predictions");
    write_prediction(&preds, "grp", "mol1", -6.0);

    // mol2: invalid JSON
    let bad = preds.join("grp_mol2");
    fs::create_dir_all(&bad).unwrap();
    fs::write(bad.join("affinity_grp_mol2.json"), "{not json").unwrap();

    // mol3: valid JSON, wrong field
    let wrong = preds.join("grp_mol3");
    fs::create_dir_all(&wrong).unwrap();
    fs::write(wrong.join("affinity_grp_mol3.json"), r#"{"score": 1.0}"#).unwrap();

    let job = MergeJob {
        table_path: table,
        predictions_dir: preds,
        label: "grp".to_string(),
    };
    let report = merge_affinity(&job).await.unwrap();

    assert_eq!(report.merged, 1);
    assert_eq!(report.missing, 2);
    assert!(matches!(
        report.rows[1].skip_reason,
        Some(MergeSkipReason::Malformed(_))
    ));
    assert_eq!(report.rows[2].skip_reason, Some(MergeSkipReason::FieldAbsent));
}

#[tokio::test]
async fn test_generate_configs_per_row() {
    let dir = tempfile::tempdir().unwrap();
    let table = write_table(dir.path());

    let template = dir.path().join("hsp_1.yaml");
    fs::write(
        &template,
        "\
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
",
    )
    .unwrap();

    let out = dir.path().join("hsp_config");
    let job = TemplateJob {
        table_path: table,
        template_path: template,
        output_dir: out.clone(),
        label: "hsp".to_string(),
    };
    let report = generate_affinity_configs(&job).await.unwrap();

    assert_eq!(report.written, 3);
    assert!(report.failures.is_empty());

    let mol2 = fs::read_to_string(out.join("hsp_mol2.yaml")).unwrap();
    assert!(mol2.contains("smiles: c1ccccc1"));
    assert!(mol2.contains("sequence: MVLSPADKTN"));
    assert!(!out.join("hsp_mol4.yaml").exists());
}
