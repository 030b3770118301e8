//! Orchestrator for the docking pipeline.
//!
//! Strictly sequential: each stage blocks on the full completion of its
//! subordinate process, because every stage's inputs are artifacts of the
//! one before it. Any stage failure, or any declared artifact missing after
//! a reported success, moves the pipeline to `Failed` and halts it; there
//! is no partial recovery and no skip-ahead.

use serde::Serialize;
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};
use uuid::Uuid;

use oxidock_common::{OutputLayout, OxidockError, Result, RunConfig, SearchBox};

use crate::artifacts::{ArtifactReference, ArtifactRole, ArtifactSet};
use crate::config;
use crate::preplog;
use crate::runner::StageRunner;

/// Receptor-preparation stage name, as reported in errors and logs.
pub const TARGET_PREP_STAGE: &str = "target_preparation";

/// Docking stage name.
pub const DOCKING_STAGE: &str = "docking";

// ── State machine ─────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineState {
    Uninitialized,
    ReceptorPrepared,
    LigandsPrepared,
    Docked,
    Finished,
    Failed,
}

// ── Run summary ───────────────────────────────────────────────────────────────

/// Final result of a pipeline run, exposed to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub artifacts: Vec<ArtifactReference>,
    /// Score block echoed by the docking engine on stdout.
    pub score_output: String,
    pub duration_ms: u64,
}

// ── Orchestrator ──────────────────────────────────────────────────────────────

pub struct DockingPipeline<'a> {
    config: &'a RunConfig,
    layout: OutputLayout,
    runner: StageRunner,
    artifacts: ArtifactSet,
    state: PipelineState,
    run_id: Uuid,
}

impl<'a> DockingPipeline<'a> {
    pub fn new(config: &'a RunConfig) -> Self {
        let layout = OutputLayout::new(&config.paths.output_dir);
        let deadline = config.execution.stage_timeout_secs.map(Duration::from_secs);
        let runner = StageRunner::new(&config.tools.interpreter, deadline);
        Self {
            config,
            layout,
            runner,
            artifacts: ArtifactSet::default(),
            state: PipelineState::Uninitialized,
            run_id: Uuid::new_v4(),
        }
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Path recorded for a role, if the producing stage has completed.
    pub fn artifact(&self, role: ArtifactRole) -> Option<&Path> {
        self.artifacts.get(role)
    }

    /// Drive the pipeline to completion. Any error leaves the pipeline in
    /// the terminal `Failed` state.
    pub async fn run(&mut self) -> Result<RunSummary> {
        let t0 = std::time::Instant::now();
        info!(run_id = %self.run_id, "Starting docking pipeline");

        match self.drive().await {
            Ok(score_output) => {
                let summary = RunSummary {
                    run_id: self.run_id,
                    artifacts: self.artifacts.references(),
                    score_output,
                    duration_ms: t0.elapsed().as_millis() as u64,
                };
                info!(
                    run_id = %self.run_id,
                    artifacts = summary.artifacts.len(),
                    duration_ms = summary.duration_ms,
                    "Docking pipeline finished"
                );
                Ok(summary)
            }
            Err(e) => {
                self.state = PipelineState::Failed;
                Err(e)
            }
        }
    }

    async fn drive(&mut self) -> Result<String> {
        // A re-run must not mix stale artifacts with fresh ones: the run
        // owns its output directory exclusively and starts from empty.
        self.reset_output_dir().await?;

        // ── Receptor preparation ──────────────────────────────────────────
        self.check_input("paths.receptor_pdb", &self.config.paths.receptor_pdb)?;
        self.check_input(
            "paths.reference_ligand_pdb",
            &self.config.paths.reference_ligand_pdb,
        )?;

        let prep_doc = config::build_target_prep_config(self.config, &self.layout)?;
        let prep = self
            .runner
            .run_stage(
                TARGET_PREP_STAGE,
                &self.config.tools.target_preparator,
                &prep_doc,
                &self.layout.target_prep_config(),
                &[],
                vec![
                    ArtifactReference::new(ArtifactRole::FixedStructure, self.layout.fixed_pdb()),
                    ArtifactReference::new(
                        ArtifactRole::PreparedReceptor,
                        self.layout.receptor_pdbqt(),
                    ),
                    ArtifactReference::new(
                        ArtifactRole::PreparationLog,
                        self.layout.target_prep_log(),
                    ),
                ],
            )
            .await?;
        for artifact in prep.verify_artifacts()? {
            self.artifacts.record(artifact);
        }
        self.state = PipelineState::ReceptorPrepared;
        info!(run_id = %self.run_id, "Receptor prepared");

        // ── Ligand pool ───────────────────────────────────────────────────
        // The embedding pool is consumed by the docking invocation itself,
        // but it is a distinct preparation phase: the SMILES input is
        // validated here, before anything else is built on top of it.
        self.check_input("paths.smiles", &self.config.paths.smiles)?;
        self.state = PipelineState::LigandsPrepared;
        debug!(run_id = %self.run_id, "Ligand pool validated");

        // ── Docking ───────────────────────────────────────────────────────
        let search_box = self.resolve_search_box().await?;
        let receptor = self
            .artifacts
            .get(ArtifactRole::PreparedReceptor)
            .ok_or_else(|| {
                OxidockError::Configuration("prepared receptor artifact not recorded".to_string())
            })?
            .to_path_buf();

        let docking_doc =
            config::build_docking_config(self.config, &self.layout, &receptor, search_box)?;
        let docked = self
            .runner
            .run_stage(
                DOCKING_STAGE,
                &self.config.tools.docker,
                &docking_doc,
                &self.layout.docking_config(),
                &["-print_scores"],
                vec![
                    ArtifactReference::new(
                        ArtifactRole::EmbeddedLigands,
                        self.layout.embedded_ligands(),
                    ),
                    ArtifactReference::new(ArtifactRole::DockedPoses, self.layout.ligands_docked()),
                    ArtifactReference::new(ArtifactRole::ScoreTable, self.layout.scores()),
                ],
            )
            .await?;
        self.state = PipelineState::Docked;

        // ── Verify and finish ─────────────────────────────────────────────
        for artifact in docked.verify_artifacts()? {
            self.artifacts.record(artifact);
        }
        self.state = PipelineState::Finished;
        info!(run_id = %self.run_id, "Poses and scores verified");

        Ok(docked.stdout)
    }

    /// Explicit box from the run configuration wins; otherwise the box the
    /// preparation tool derived from the reference ligand is read back from
    /// its log. Neither present is a configuration error, raised before the
    /// docking stage starts.
    async fn resolve_search_box(&mut self) -> Result<SearchBox> {
        if let Some(spec) = &self.config.docking.search_box {
            if let Some(explicit) = spec.resolve()? {
                debug!("Using explicit search box from run configuration");
                return Ok(explicit);
            }
        }

        let log_path = self
            .artifacts
            .get(ArtifactRole::PreparationLog)
            .ok_or_else(|| {
                OxidockError::Configuration("receptor preparation log not recorded".to_string())
            })?
            .to_path_buf();

        let text = tokio::fs::read_to_string(&log_path).await?;
        match preplog::extract_search_box(&text) {
            Some(derived) => {
                info!("Search box read back from receptor preparation log");
                self.artifacts
                    .record(ArtifactReference::new(ArtifactRole::DockingBox, &log_path));
                Ok(derived)
            }
            None => Err(OxidockError::Configuration(format!(
                "no search box configured and none found in {log_path:?}"
            ))),
        }
    }

    fn check_input(&self, field: &str, path: &Path) -> Result<()> {
        if !path.exists() {
            return Err(OxidockError::Configuration(format!(
                "input '{field}' does not exist: {path:?}"
            )));
        }
        Ok(())
    }

    async fn reset_output_dir(&self) -> Result<()> {
        let dir = self.layout.output_dir();
        match tokio::fs::remove_dir_all(dir).await {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }
        tokio::fs::create_dir_all(dir).await?;
        debug!("Output directory reset: {:?}", dir);
        Ok(())
    }
}
