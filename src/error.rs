use std::path::PathBuf;

use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ReplayError {
    #[error("invalid store key: {0}")]
    InvalidStoreKey(String),

    #[error("invalid package type: {0} (expected maven or npm)")]
    InvalidPackageType(String),

    #[error("invalid build type: {0} (expected MVN or NPM)")]
    InvalidBuildType(String),

    #[error("invalid scratch build name: {0}")]
    InvalidBuildName(String),

    #[error("invalid server URL: {0}")]
    InvalidUrl(String),

    #[error("failed to read config file at {0}")]
    ConfigRead(PathBuf),

    #[error("failed to parse JSON config: {0}")]
    ConfigParse(String),

    #[error("failed to parse {path}: {message}")]
    DatasetParse { path: String, message: String },

    #[error("dataset entry not found: {0}")]
    DatasetNotFound(String),

    #[error("Indy request failed: {0}")]
    IndyHttp(String),

    #[error("Indy returned status {status} for {url}: {message}")]
    IndyStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("PNC request failed: {0}")]
    PncHttp(String),

    #[error("PNC returned status {status} for {url}: {message}")]
    PncStatus {
        status: u16,
        url: String,
        message: String,
    },

    #[error("{phase} failed: {failed} of {total} jobs did not succeed")]
    #[diagnostic(help("see the log above for the individual transfer errors"))]
    PhaseFailed {
        phase: String,
        failed: usize,
        total: usize,
    },

    #[error("repository setup failed: {0}")]
    RepoSetup(String),

    #[error("dependency graph contains a cycle between: {0}")]
    DependencyCycle(String),

    #[error("required tool not found: {0}")]
    MissingTool(String),

    #[error("git clone failed: {0}")]
    GitClone(String),

    #[error("filesystem error: {0}")]
    Filesystem(String),
}
