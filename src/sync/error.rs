use std::path::PathBuf;
use thiserror::Error;

/// Why a repository could not be measured against its remote
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProbeError {
    /// Needs the clone bootstrap step again; never retried automatically
    #[error("local folder not found: {}", .0.display())]
    MissingLocalCopy(PathBuf),

    #[error("not a git working tree: {}", .0.display())]
    NotAVersionControlledCopy(PathBuf),

    /// Retried on the next pass
    #[error("fetch failed: {0}")]
    FetchFailed(String),

    #[error("could not resolve {0}")]
    RevisionResolutionFailed(String),
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SyncError {
    #[error(transparent)]
    Probe(#[from] ProbeError),

    /// Unmerged paths, an unfinished merge or unrelated histories. The only
    /// failure that may lead to a hard reset.
    #[error("structural conflict ({state}): {output}")]
    StructuralConflict { state: String, output: String },

    #[error("update failed: {0}")]
    NonStructuralUpdateFailure(String),

    /// Carries the last command's output for manual diagnosis
    #[error("recovery failed: {0}")]
    RecoveryFailed(String),
}

impl SyncError {
    pub fn is_structural(&self) -> bool {
        matches!(self, SyncError::StructuralConflict { .. })
    }
}
