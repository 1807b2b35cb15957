use anyhow::{Context, Result};
use git2::{ErrorCode, Oid, Repository, RepositoryState, StatusOptions};
use std::path::{Path, PathBuf};
use std::process::Command;

use super::{AheadBehind, CommandOutput, ConflictState, Vcs};

/// Lines of `git status` kept for diagnostics
const STATUS_PREVIEW_LINES: usize = 10;

/// [`Vcs`] backed by the system `git` executable and git2
#[derive(Debug, Clone)]
pub struct SystemGit {
    binary: PathBuf,
}

impl SystemGit {
    /// Locate `binary` on `PATH` (or use it as a path)
    pub fn new(binary: &str) -> Result<Self> {
        let binary = which::which(binary)
            .with_context(|| format!("git executable '{binary}' not found"))?;
        tracing::trace!("Using git at {}", binary.display());
        Ok(Self { binary })
    }

    fn run(&self, workdir: &Path, args: &[&str]) -> CommandOutput {
        tracing::debug!("git {} ({})", args.join(" "), workdir.display());
        self.execute(workdir, args)
    }

    fn execute(&self, workdir: &Path, args: &[&str]) -> CommandOutput {
        let result = Command::new(&self.binary)
            .args(args)
            .current_dir(workdir)
            .env("GIT_TERMINAL_PROMPT", "0")
            .env("LC_ALL", "C")
            .output();

        match result {
            Ok(output) => {
                let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
                text.push_str(&String::from_utf8_lossy(&output.stderr));
                let text = text.trim().to_string();
                if !output.status.success() {
                    tracing::trace!("git {} failed: {}", args.first().unwrap_or(&""), text);
                }
                CommandOutput {
                    success: output.status.success(),
                    output: text,
                }
            }
            Err(e) => CommandOutput::failed(format!("failed to run git: {e}")),
        }
    }

    fn open(workdir: &Path) -> Option<Repository> {
        Repository::open(workdir)
            .map_err(|e| tracing::debug!("git2 cannot open {}: {}", workdir.display(), e))
            .ok()
    }

    fn commit_id(repo: &Repository, revision: &str) -> Option<Oid> {
        repo.revparse_single(revision)
            .and_then(|object| object.peel_to_commit())
            .map(|commit| commit.id())
            .ok()
    }
}

/// Unfinished operation names; bisect does not block a merge
fn operation_name(state: RepositoryState) -> Option<&'static str> {
    match state {
        RepositoryState::Clean | RepositoryState::Bisect => None,
        RepositoryState::Merge => Some("merge"),
        RepositoryState::Revert | RepositoryState::RevertSequence => Some("revert"),
        RepositoryState::CherryPick | RepositoryState::CherryPickSequence => Some("cherry-pick"),
        RepositoryState::Rebase
        | RepositoryState::RebaseInteractive
        | RepositoryState::RebaseMerge => Some("rebase"),
        RepositoryState::ApplyMailbox | RepositoryState::ApplyMailboxOrRebase => Some("am"),
    }
}

impl Vcs for SystemGit {
    fn fetch(&self, workdir: &Path) -> CommandOutput {
        self.run(workdir, &["fetch", "origin"])
    }

    fn resolve_revision(&self, workdir: &Path, revision: &str) -> Option<String> {
        let repo = Self::open(workdir)?;
        Self::commit_id(&repo, revision).map(|id| id.to_string())
    }

    fn count_ahead_behind(&self, workdir: &Path, local: &str, upstream: &str) -> Option<AheadBehind> {
        let repo = Self::open(workdir)?;
        let local = Self::commit_id(&repo, local)?;
        let upstream = Self::commit_id(&repo, upstream)?;

        repo.graph_ahead_behind(local, upstream)
            .map(|(ahead, behind)| AheadBehind { ahead, behind })
            .map_err(|e| tracing::debug!("ahead/behind failed: {}", e))
            .ok()
    }

    fn merge_update(&self, workdir: &Path, branch: &str) -> CommandOutput {
        self.run(workdir, &["merge", "--ff-only", &format!("origin/{branch}")])
    }

    fn abort_merge(&self, workdir: &Path) -> CommandOutput {
        self.run(workdir, &["merge", "--abort"])
    }

    fn hard_reset(&self, workdir: &Path, target: &str) -> CommandOutput {
        self.run(workdir, &["reset", "--hard", target])
    }

    fn remove_untracked(&self, workdir: &Path) -> CommandOutput {
        self.run(workdir, &["clean", "-fd"])
    }

    fn force_checkout(&self, workdir: &Path, branch: &str) -> CommandOutput {
        self.run(
            workdir,
            &["checkout", "-f", "-B", branch, &format!("origin/{branch}")],
        )
    }

    fn conflict_state(&self, workdir: &Path, branch: &str) -> ConflictState {
        let Some(repo) = Self::open(workdir) else {
            return ConflictState::default();
        };

        let mut options = StatusOptions::new();
        options.include_untracked(false).include_ignored(false);
        let unmerged_paths = match repo.statuses(Some(&mut options)) {
            Ok(statuses) => statuses
                .iter()
                .filter(|entry| entry.status().is_conflicted())
                .filter_map(|entry| entry.path().map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::debug!("git2 status failed for {}: {}", workdir.display(), e);
                Vec::new()
            }
        };

        let unrelated_histories = match (
            Self::commit_id(&repo, "HEAD"),
            Self::commit_id(&repo, &format!("origin/{branch}")),
        ) {
            (Some(head), Some(remote)) => matches!(
                repo.merge_base(head, remote),
                Err(e) if e.code() == ErrorCode::NotFound
            ),
            _ => false,
        };

        ConflictState {
            unmerged_paths,
            operation_in_progress: operation_name(repo.state()).map(str::to_string),
            unrelated_histories,
        }
    }

    fn set_remote_url(&self, workdir: &Path, url: &str) -> CommandOutput {
        // The URL may carry a token; keep it out of the logs
        tracing::debug!("git remote set-url origin <url> ({})", workdir.display());
        self.execute(workdir, &["remote", "set-url", "origin", url])
    }

    fn status_summary(&self, workdir: &Path) -> Option<String> {
        let status = self.run(workdir, &["status", "--short", "--branch"]);
        if !status.success || status.output.is_empty() {
            return None;
        }

        let lines: Vec<&str> = status.output.lines().collect();
        let mut summary = lines
            .iter()
            .take(STATUS_PREVIEW_LINES)
            .copied()
            .collect::<Vec<_>>()
            .join("\n");
        if lines.len() > STATUS_PREVIEW_LINES {
            summary.push_str("\n...");
        }
        Some(summary)
    }
}
