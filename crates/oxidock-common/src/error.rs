use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OxidockError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Stage '{stage}' failed ({status}): {stderr}")]
    StageExecution {
        stage: String,
        status: String,
        stderr: String,
    },

    #[error("Stage '{stage}' reported success but '{role}' is missing at {path:?}")]
    ArtifactMissing {
        stage: String,
        role: String,
        path: PathBuf,
    },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, OxidockError>;
