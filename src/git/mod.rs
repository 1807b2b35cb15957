//! Git integration layer for gitsync
//!
//! The sync engine talks to repositories only through the [`Vcs`] trait.
//! [`SystemGit`] is the production binding: mutations and network access go
//! through the `git` executable, read-only structured queries through git2.

pub mod credentials;
pub mod input;
mod system;

pub use credentials::{CredentialScope, RemoteAuth};
pub use input::{RepoId, parse_repo_input};
pub use system::SystemGit;

use std::fmt;
use std::path::Path;

/// Result of one git command: success flag plus combined stdout/stderr
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub success: bool,
    pub output: String,
}

impl CommandOutput {
    pub fn ok(output: impl Into<String>) -> Self {
        Self {
            success: true,
            output: output.into(),
        }
    }

    pub fn failed(output: impl Into<String>) -> Self {
        Self {
            success: false,
            output: output.into(),
        }
    }
}

/// Commit counts between local `HEAD` and the remote branch tip
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AheadBehind {
    /// Reachable from local but not from remote
    pub ahead: usize,
    /// Reachable from remote but not from local
    pub behind: usize,
}

/// Working-tree conditions that block a normal update regardless of file
/// contents
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConflictState {
    pub unmerged_paths: Vec<String>,
    /// Name of an unfinished operation (merge, rebase, cherry-pick, ...)
    pub operation_in_progress: Option<String>,
    pub unrelated_histories: bool,
}

impl ConflictState {
    pub fn is_structural(&self) -> bool {
        !self.unmerged_paths.is_empty()
            || self.operation_in_progress.is_some()
            || self.unrelated_histories
    }
}

impl fmt::Display for ConflictState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut parts = Vec::new();
        if !self.unmerged_paths.is_empty() {
            parts.push(format!("{} unmerged path(s)", self.unmerged_paths.len()));
        }
        if let Some(operation) = &self.operation_in_progress {
            parts.push(format!("{operation} in progress"));
        }
        if self.unrelated_histories {
            parts.push("unrelated histories".to_string());
        }
        if parts.is_empty() {
            write!(f, "clean")
        } else {
            write!(f, "{}", parts.join(", "))
        }
    }
}

/// Version-control operations the sync engine needs against one working
/// tree. Implementations must never touch the working tree from `fetch`.
pub trait Vcs: Send + Sync {
    /// Refresh remote-tracking refs from `origin`
    fn fetch(&self, workdir: &Path) -> CommandOutput;

    /// Full commit id for a revision expression such as `HEAD` or `origin/main`
    fn resolve_revision(&self, workdir: &Path, revision: &str) -> Option<String>;

    fn count_ahead_behind(&self, workdir: &Path, local: &str, upstream: &str) -> Option<AheadBehind>;

    /// Fast-forward the checked-out branch to `origin/<branch>`
    fn merge_update(&self, workdir: &Path, branch: &str) -> CommandOutput;

    fn abort_merge(&self, workdir: &Path) -> CommandOutput;

    /// Force index and working tree to `target`
    fn hard_reset(&self, workdir: &Path, target: &str) -> CommandOutput;

    /// Delete untracked files and directories
    fn remove_untracked(&self, workdir: &Path) -> CommandOutput;

    /// Check out `branch` at `origin/<branch>`, discarding local state
    fn force_checkout(&self, workdir: &Path, branch: &str) -> CommandOutput;

    /// Structured status query used to classify update failures
    fn conflict_state(&self, workdir: &Path, branch: &str) -> ConflictState;

    fn set_remote_url(&self, workdir: &Path, url: &str) -> CommandOutput;

    /// Short human-readable status for diagnostics, if available
    fn status_summary(&self, _workdir: &Path) -> Option<String> {
        None
    }
}

/// First seven characters of a revision id
pub fn short_revision(revision: &str) -> &str {
    revision.get(..7).unwrap_or(revision)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conflict_state_structural() {
        assert!(!ConflictState::default().is_structural());
        assert_eq!(ConflictState::default().to_string(), "clean");

        let state = ConflictState {
            unmerged_paths: vec!["a.txt".into(), "b.txt".into()],
            operation_in_progress: Some("merge".into()),
            unrelated_histories: false,
        };
        assert!(state.is_structural());
        assert_eq!(state.to_string(), "2 unmerged path(s), merge in progress");

        let unrelated = ConflictState {
            unrelated_histories: true,
            ..Default::default()
        };
        assert!(unrelated.is_structural());
    }

    #[test]
    fn test_short_revision() {
        assert_eq!(short_revision("0123456789abcdef"), "0123456");
        assert_eq!(short_revision("abc"), "abc");
    }
}
