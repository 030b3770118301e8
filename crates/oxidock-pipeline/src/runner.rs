//! Subordinate-process execution for pipeline stages.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::ExitStatus;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, info, warn};

use oxidock_common::{OxidockError, Result};

use crate::artifacts::ArtifactReference;

/// A completed stage invocation: exit status, captured streams, and the
/// output artifacts the stage was expected to produce.
#[derive(Debug)]
pub struct StageResult {
    pub stage: String,
    pub status: ExitStatus,
    pub stdout: String,
    pub stderr: String,
    pub declared: Vec<ArtifactReference>,
}

impl StageResult {
    /// A declared artifact is valid only if the stage reported success AND
    /// the path exists afterwards. A tool exiting 0 while leaving an output
    /// missing is a silent partial failure and is treated as fatal.
    pub fn verify_artifacts(&self) -> Result<Vec<ArtifactReference>> {
        for artifact in &self.declared {
            if !artifact.path.exists() {
                return Err(OxidockError::ArtifactMissing {
                    stage: self.stage.clone(),
                    role: artifact.role.describe().to_string(),
                    path: artifact.path.clone(),
                });
            }
        }
        Ok(self.declared.clone())
    }
}

/// Runs one external tool per call: writes exactly one configuration file,
/// starts exactly one subordinate process, waits for it, and never retries.
pub struct StageRunner {
    interpreter: PathBuf,
    deadline: Option<Duration>,
}

impl StageRunner {
    pub fn new<P: AsRef<Path>>(interpreter: P, deadline: Option<Duration>) -> Self {
        Self {
            interpreter: interpreter.as_ref().to_path_buf(),
            deadline,
        }
    }

    /// Serialize `document` to `config_path`, then invoke
    /// `<interpreter> <entry> -conf <config_path> [extra_args...]`.
    ///
    /// The runner never interprets the tool's domain output; it only
    /// observes the exit status and captures both streams. A non-zero exit
    /// surfaces the captured stderr verbatim.
    pub async fn run_stage<D: Serialize>(
        &self,
        stage: &str,
        entry: &Path,
        document: &D,
        config_path: &Path,
        extra_args: &[&str],
        declared: Vec<ArtifactReference>,
    ) -> Result<StageResult> {
        let payload = serde_json::to_string_pretty(document)?;
        tokio::fs::write(config_path, payload).await?;

        info!("Running stage '{}' with config {:?}", stage, config_path);

        let mut command = Command::new(&self.interpreter);
        command
            .arg(entry)
            .arg("-conf")
            .arg(config_path)
            .args(extra_args)
            .kill_on_drop(true);

        let output = match self.deadline {
            Some(limit) => match timeout(limit, command.output()).await {
                Ok(finished) => finished?,
                Err(_) => {
                    // kill_on_drop reaps the child when the future is dropped
                    warn!(
                        "Stage '{}' exceeded its {}s deadline, terminating",
                        stage,
                        limit.as_secs()
                    );
                    return Err(OxidockError::StageExecution {
                        stage: stage.to_string(),
                        status: format!("timed out after {}s", limit.as_secs()),
                        stderr: String::new(),
                    });
                }
            },
            None => command.output().await?,
        };

        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        if !output.status.success() {
            return Err(OxidockError::StageExecution {
                stage: stage.to_string(),
                status: output.status.to_string(),
                stderr,
            });
        }

        debug!("Stage '{}' completed successfully", stage);
        Ok(StageResult {
            stage: stage.to_string(),
            status: output.status,
            stdout,
            stderr,
            declared,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::ArtifactRole;
    use serde_json::json;

    #[tokio::test]
    async fn test_run_stage_writes_config_and_captures_stdout() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("stage.json");

        // interpreter is `sh`, the stage entry a script that echoes its args
        let script = dir.path().join("tool.sh");
        std::fs::write(&script, "#!/bin/sh\necho tool ran with: \"$@\"\n").unwrap();

        let runner = StageRunner::new("/bin/sh", None);
        let result = runner
            .run_stage("echo", &script, &json!({"a": 1}), &config_path, &[], vec![])
            .await
            .unwrap();

        assert!(result.status.success());
        assert!(result.stdout.contains("tool ran with"));
        assert!(result.stdout.contains("-conf"));
        let written = std::fs::read_to_string(&config_path).unwrap();
        assert!(written.contains("\"a\": 1"));
    }

    #[tokio::test]
    async fn test_nonzero_exit_surfaces_stderr() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("stage.json");
        let script = dir.path().join("fail.sh");
        std::fs::write(&script, "#!/bin/sh\necho boom >&2\nexit 3\n").unwrap();

        let runner = StageRunner::new("/bin/sh", None);
        let err = runner
            .run_stage("failing", &script, &json!({}), &config_path, &[], vec![])
            .await
            .unwrap_err();

        match err {
            OxidockError::StageExecution { stage, stderr, .. } => {
                assert_eq!(stage, "failing");
                assert!(stderr.contains("boom"));
            }
            other => panic!("expected StageExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_deadline_kills_hung_stage() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("stage.json");
        let script = dir.path().join("hang.sh");
        std::fs::write(&script, "#!/bin/sh\nsleep 30\n").unwrap();

        let runner = StageRunner::new("/bin/sh", Some(Duration::from_millis(200)));
        let err = runner
            .run_stage("hung", &script, &json!({}), &config_path, &[], vec![])
            .await
            .unwrap_err();

        match err {
            OxidockError::StageExecution { status, .. } => {
                assert!(status.contains("timed out"), "{status}");
            }
            other => panic!("expected StageExecution, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_artifacts_flags_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let present = dir.path().join("present.sdf");
        std::fs::write(&present, "x").unwrap();

        let script = dir.path().join("ok.sh");
        std::fs::write(&script, "#!/bin/sh\nexit 0\n").unwrap();

        let runner = StageRunner::new("/bin/sh", None);
        let result = runner
            .run_stage(
                "docking",
                &script,
                &serde_json::json!({}),
                &dir.path().join("c.json"),
                &[],
                vec![
                    ArtifactReference::new(ArtifactRole::DockedPoses, &present),
                    ArtifactReference::new(
                        ArtifactRole::ScoreTable,
                        dir.path().join("never_written.csv"),
                    ),
                ],
            )
            .await
            .unwrap();

        let err = result.verify_artifacts().unwrap_err();
        match err {
            OxidockError::ArtifactMissing { role, .. } => {
                assert_eq!(role, "score table");
            }
            other => panic!("expected ArtifactMissing, got {other:?}"),
        }
    }
}
