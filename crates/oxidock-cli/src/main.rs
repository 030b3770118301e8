//! Oxidock - docking pipeline orchestration and affinity merging.
//! Entry point for the `oxidock` binary.

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use oxidock_affinity::{generate_affinity_configs, merge_affinity, MergeJob, TemplateJob};
use oxidock_common::RunConfig;
use oxidock_pipeline::DockingPipeline;

#[derive(Parser)]
#[command(name = "oxidock", version, about = "Multi-stage docking pipeline orchestrator")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the full docking pipeline (receptor prep → ligand prep → docking)
    Dock {
        /// Run configuration TOML (default: OXIDOCK_CONFIG env var, then ./oxidock.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Merge per-molecule affinity predictions into the molecule table
    Merge {
        /// Target label, e.g. "grp" or "hsp"
        #[arg(long)]
        label: String,
        /// Molecule table (CSV with an ID column), rewritten in place
        #[arg(long)]
        table: PathBuf,
        /// Root directory of per-molecule prediction artifacts
        #[arg(long)]
        predictions: PathBuf,
    },
    /// Generate per-molecule YAML configs for the affinity prediction tool
    GenConfigs {
        /// Target label, e.g. "grp" or "hsp"
        #[arg(long)]
        label: String,
        /// Molecule table (CSV with ID and SMILES columns)
        #[arg(long)]
        table: PathBuf,
        /// Template YAML document
        #[arg(long)]
        template: PathBuf,
        /// Output directory for the generated configs
        #[arg(long)]
        output: PathBuf,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialise structured logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("oxidock=debug,info")),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Command::Dock { config } => {
            let run_config = match config {
                Some(path) => RunConfig::load_from(&path),
                None => RunConfig::load(),
            };
            let run_config = match run_config {
                Ok(c) => c,
                Err(e) => {
                    warn!("Could not load run configuration: {e}");
                    return Ok(());
                }
            };

            let mut pipeline = DockingPipeline::new(&run_config);
            let summary = pipeline
                .run()
                .await
                .context("docking pipeline failed")?;

            info!("Run {} finished in {}ms", summary.run_id, summary.duration_ms);
            for artifact in &summary.artifacts {
                info!("  {}: {:?}", artifact.role.describe(), artifact.path);
            }
            if !summary.score_output.is_empty() {
                println!("{}", summary.score_output);
            }
        }
        Command::Merge {
            label,
            table,
            predictions,
        } => {
            let job = MergeJob {
                table_path: table,
                predictions_dir: predictions,
                label,
            };
            let report = merge_affinity(&job)
                .await
                .context("affinity merge failed")?;
            info!(
                "Added column '{}': {} merged, {} missing",
                report.column, report.merged, report.missing
            );
            for row in &report.rows {
                if let Some(reason) = &row.skip_reason {
                    warn!("  {}: {:?}", row.molecule_id, reason);
                }
            }
        }
        Command::GenConfigs {
            label,
            table,
            template,
            output,
        } => {
            let job = TemplateJob {
                table_path: table,
                template_path: template,
                output_dir: output,
                label,
            };
            let report = generate_affinity_configs(&job)
                .await
                .context("config generation failed")?;
            info!(
                "Wrote {} configs ({} rows failed)",
                report.written,
                report.failures.len()
            );
            for failure in &report.failures {
                warn!("  {}: {}", failure.molecule_id, failure.reason);
            }
        }
    }

    Ok(())
}
