use super::{DivergenceInfo, ProbeError};
use crate::git::{RemoteAuth, Vcs};
use crate::registry::TrackedRepository;

/// Fetches a clone's remote and measures how far the two histories are
/// apart. Only remote-tracking refs change; the working tree is untouched.
pub struct RemoteProber<'a> {
    vcs: &'a dyn Vcs,
    auth: &'a RemoteAuth,
}

impl<'a> RemoteProber<'a> {
    pub fn new(vcs: &'a dyn Vcs, auth: &'a RemoteAuth) -> Self {
        Self { vcs, auth }
    }

    pub fn probe(&self, repo: &TrackedRepository, branch: &str) -> Result<DivergenceInfo, ProbeError> {
        let workdir = repo.local_path.as_path();

        if !workdir.exists() {
            return Err(ProbeError::MissingLocalCopy(workdir.to_path_buf()));
        }
        // `.git` is a file in linked worktrees and submodules
        if !workdir.join(".git").exists() {
            return Err(ProbeError::NotAVersionControlledCopy(workdir.to_path_buf()));
        }

        let fetched = self.auth.fetch(self.vcs, workdir, &repo.identity);
        if !fetched.success {
            let detail = if fetched.output.is_empty() {
                "git fetch exited with an error".to_string()
            } else {
                fetched.output
            };
            return Err(ProbeError::FetchFailed(detail));
        }

        let upstream = format!("origin/{branch}");
        let local_revision = self
            .vcs
            .resolve_revision(workdir, "HEAD")
            .ok_or_else(|| ProbeError::RevisionResolutionFailed("HEAD".to_string()))?;
        let remote_revision = self
            .vcs
            .resolve_revision(workdir, &upstream)
            .ok_or_else(|| ProbeError::RevisionResolutionFailed(upstream.clone()))?;

        let counts = self
            .vcs
            .count_ahead_behind(workdir, &local_revision, &remote_revision)
            .ok_or_else(|| {
                ProbeError::RevisionResolutionFailed(format!("HEAD...{upstream}"))
            })?;

        tracing::debug!(
            "{}: HEAD {} / {} {} (ahead {}, behind {})",
            repo.identity,
            &local_revision,
            upstream,
            &remote_revision,
            counts.ahead,
            counts.behind
        );

        Ok(DivergenceInfo {
            local_revision,
            remote_revision,
            behind: counts.behind,
            ahead: counts.ahead,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sync::fake::{FakeVcs, LOCAL, REMOTE};
    use std::fs;
    use tempfile::TempDir;

    fn clone_dir() -> TempDir {
        let temp = TempDir::new().unwrap();
        fs::create_dir(temp.path().join(".git")).unwrap();
        temp
    }

    #[test]
    fn test_probe_measures_divergence() {
        let temp = clone_dir();
        let vcs = FakeVcs::diverged(1, 3);
        let auth = RemoteAuth::anonymous();
        let repo = TrackedRepository::new("acme/widgets", temp.path());

        let info = RemoteProber::new(&vcs, &auth).probe(&repo, "main").unwrap();
        assert_eq!(
            info,
            DivergenceInfo {
                local_revision: LOCAL.into(),
                remote_revision: REMOTE.into(),
                behind: 3,
                ahead: 1,
            }
        );
        assert_eq!(vcs.calls(), vec!["fetch"]);
    }

    #[test]
    fn test_missing_path_never_fetches() {
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs::behind(1);
        let auth = RemoteAuth::anonymous();
        let repo = TrackedRepository::new("acme/widgets", temp.path().join("gone"));

        let error = RemoteProber::new(&vcs, &auth).probe(&repo, "main").unwrap_err();
        assert!(matches!(error, ProbeError::MissingLocalCopy(_)));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_plain_directory_is_not_a_repository() {
        let temp = TempDir::new().unwrap();
        let vcs = FakeVcs::behind(1);
        let auth = RemoteAuth::anonymous();
        let repo = TrackedRepository::new("acme/widgets", temp.path());

        let error = RemoteProber::new(&vcs, &auth).probe(&repo, "main").unwrap_err();
        assert!(matches!(error, ProbeError::NotAVersionControlledCopy(_)));
        assert!(vcs.calls().is_empty());
    }

    #[test]
    fn test_fetch_failure_carries_output() {
        let temp = clone_dir();
        let vcs = FakeVcs::behind(1).with_fetch_failure();
        let auth = RemoteAuth::new(Some("tok"), "github.com");
        let repo = TrackedRepository::new("acme/widgets", temp.path());

        let error = RemoteProber::new(&vcs, &auth).probe(&repo, "main").unwrap_err();
        match error {
            ProbeError::FetchFailed(detail) => assert!(detail.contains("Could not resolve host")),
            other => panic!("unexpected {other:?}"),
        }
        // Token removed even though fetch failed
        assert_eq!(
            vcs.calls().last().map(String::as_str),
            Some("set-url https://github.com/acme/widgets.git")
        );
    }
}
