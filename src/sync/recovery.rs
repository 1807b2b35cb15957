//! Least-destructive-first conflict recovery
//!
//! ```text
//! abort merge -> retry update -> still structural? -> backup -> fetch
//!   -> reset --hard origin/<branch> + clean -> checkout -> final update
//! ```
//!
//! A transient or already-resolved conflict ends after the retry with no
//! data touched. Backup is best-effort; fetch and reset failures are fatal.

use super::update::attempt_update;
use super::{BackupManager, BackupOutcome, EventSink, RecoveryStep, SyncError};
use crate::git::{RemoteAuth, Vcs};
use crate::registry::TrackedRepository;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecoveryReport {
    /// `None` when recovery ended before the backup step
    pub backup: Option<BackupOutcome>,
    /// Whether the working tree was reset
    pub destructive: bool,
    pub detail: String,
}

pub struct RecoveryOrchestrator<'a> {
    vcs: &'a dyn Vcs,
    auth: &'a RemoteAuth,
    backups: &'a BackupManager,
    events: &'a EventSink,
}

impl<'a> RecoveryOrchestrator<'a> {
    pub fn new(
        vcs: &'a dyn Vcs,
        auth: &'a RemoteAuth,
        backups: &'a BackupManager,
        events: &'a EventSink,
    ) -> Self {
        Self {
            vcs,
            auth,
            backups,
            events,
        }
    }

    /// Full sequence, entered after an update failed with a structural
    /// conflict
    pub fn recover(&self, repo: &TrackedRepository, branch: &str) -> Result<RecoveryReport, SyncError> {
        let workdir = repo.local_path.as_path();

        // Failure here usually just means no merge was in progress
        let aborted = self.vcs.abort_merge(workdir);
        self.events.step(
            &repo.identity,
            RecoveryStep::MergeAborted {
                success: aborted.success,
                output: aborted.output,
            },
        );

        match attempt_update(self.vcs, workdir, branch) {
            Ok(output) => Ok(RecoveryReport {
                backup: None,
                destructive: false,
                detail: output,
            }),
            Err(e) if e.is_structural() => {
                self.events.step(&repo.identity, RecoveryStep::RetryFailed(e.to_string()));
                self.force_reconcile(repo, branch)
            }
            Err(e) => Err(SyncError::RecoveryFailed(e.to_string())),
        }
    }

    /// Back up, then force the clone onto `origin/<branch>`. Also the direct
    /// path for clones that are ahead of or diverged from their remote.
    pub fn force_reconcile(&self, repo: &TrackedRepository, branch: &str) -> Result<RecoveryReport, SyncError> {
        let workdir = repo.local_path.as_path();
        let identity = repo.identity.as_str();

        let backup = match self.backups.backup(workdir) {
            Ok(BackupOutcome::Created(path)) => {
                self.events.step(identity, RecoveryStep::BackupCreated(path.clone()));
                BackupOutcome::Created(path)
            }
            Ok(outcome) => {
                self.events.step(identity, RecoveryStep::BackupSkipped(outcome.to_string()));
                outcome
            }
            Err(e) => {
                tracing::warn!("Backup of {} failed: {:#}", workdir.display(), e);
                let reason = format!("{e:#}");
                self.events.step(identity, RecoveryStep::BackupFailed(reason.clone()));
                BackupOutcome::Failed(reason)
            }
        };

        let fetched = self.auth.fetch(self.vcs, workdir, identity);
        if !fetched.success {
            return Err(SyncError::RecoveryFailed(format!("fetch: {}", fetched.output)));
        }
        self.events.step(identity, RecoveryStep::Fetched);

        let target = format!("origin/{branch}");
        let reset = self.vcs.hard_reset(workdir, &target);
        if !reset.success {
            return Err(SyncError::RecoveryFailed(format!("reset: {}", reset.output)));
        }
        let cleaned = self.vcs.remove_untracked(workdir);
        if !cleaned.success {
            return Err(SyncError::RecoveryFailed(format!("clean: {}", cleaned.output)));
        }
        self.events.step(identity, RecoveryStep::ResetTo(target));

        let checkout = self.vcs.force_checkout(workdir, branch);
        if !checkout.success {
            tracing::warn!("Checkout of {} in {} failed: {}", branch, workdir.display(), checkout.output);
        }
        self.events.step(
            identity,
            RecoveryStep::CheckedOut {
                branch: branch.to_string(),
                success: checkout.success,
            },
        );

        match attempt_update(self.vcs, workdir, branch) {
            Ok(output) => Ok(RecoveryReport {
                backup: Some(backup),
                destructive: true,
                detail: output,
            }),
            Err(e) => Err(SyncError::RecoveryFailed(e.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::git::ConflictState;
    use crate::sync::fake::FakeVcs;
    use std::fs;
    use std::path::Path;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        repo: TrackedRepository,
        auth: RemoteAuth,
        backups: BackupManager,
        events: EventSink,
    }

    fn fixture() -> Fixture {
        let temp = TempDir::new().unwrap();
        let clone = temp.path().join("widgets");
        fs::create_dir_all(clone.join(".git")).unwrap();
        fs::write(clone.join("notes.txt"), "<<<<<<< HEAD\n").unwrap();
        Fixture {
            repo: TrackedRepository::new("acme/widgets", clone),
            _temp: temp,
            auth: RemoteAuth::anonymous(),
            backups: BackupManager::default(),
            events: EventSink::disabled(),
        }
    }

    fn unmerged() -> ConflictState {
        ConflictState {
            unmerged_paths: vec!["notes.txt".into()],
            operation_in_progress: Some("merge".into()),
            unrelated_histories: false,
        }
    }

    impl Fixture {
        fn orchestrator<'a>(&'a self, vcs: &'a FakeVcs) -> RecoveryOrchestrator<'a> {
            RecoveryOrchestrator::new(vcs, &self.auth, &self.backups, &self.events)
        }
    }

    #[test]
    fn test_persistent_conflict_resets_to_remote() {
        let f = fixture();
        let vcs = FakeVcs::behind(2).with_merge_failures(1).with_conflict(unmerged());

        let report = f.orchestrator(&vcs).recover(&f.repo, "main").unwrap();

        assert!(report.destructive);
        let backup = report.backup.as_ref().and_then(BackupOutcome::path).unwrap();
        assert_eq!(fs::read_to_string(backup.join("notes.txt")).unwrap(), "<<<<<<< HEAD\n");
        assert_eq!(vcs.head(), vcs.remote_tip());
        assert_eq!(
            vcs.calls(),
            vec![
                "abort-merge",
                "merge main",
                "fetch",
                "reset origin/main",
                "clean",
                "checkout main",
                "merge main",
            ]
        );
    }

    #[test]
    fn test_transient_conflict_resolved_without_backup() {
        let f = fixture();
        let vcs = FakeVcs::behind(2).with_conflict(ConflictState {
            operation_in_progress: Some("merge".into()),
            ..Default::default()
        });

        let report = f.orchestrator(&vcs).recover(&f.repo, "main").unwrap();

        assert!(!report.destructive);
        assert_eq!(report.backup, None);
        assert!(vcs.destructive_calls().is_empty());
    }

    #[test]
    fn test_recovery_is_idempotent() {
        let f = fixture();
        let vcs = FakeVcs::behind(2).with_merge_failures(1).with_conflict(unmerged());
        let orchestrator = f.orchestrator(&vcs);

        orchestrator.recover(&f.repo, "main").unwrap();
        vcs.clear_calls();

        let again = orchestrator.recover(&f.repo, "main").unwrap();
        assert!(!again.destructive);
        assert!(vcs.destructive_calls().is_empty());
        assert_eq!(vcs.head(), vcs.remote_tip());
    }

    #[test]
    fn test_non_structural_retry_failure_stops_before_backup() {
        let f = fixture();
        // Abort clears the merge, then the retry fails on a clean tree
        let vcs = FakeVcs::behind(2)
            .with_merge_failures(1)
            .with_conflict(ConflictState {
                operation_in_progress: Some("merge".into()),
                ..Default::default()
            });

        let error = f.orchestrator(&vcs).recover(&f.repo, "main").unwrap_err();

        assert!(matches!(error, SyncError::RecoveryFailed(_)));
        assert!(vcs.destructive_calls().is_empty());
        assert!(!vcs.calls().contains(&"fetch".to_string()));
        let siblings = fs::read_dir(f.repo.local_path.parent().unwrap()).unwrap().count();
        assert_eq!(siblings, 1, "no backup expected");
    }

    #[test]
    fn test_fetch_failure_is_fatal() {
        let f = fixture();
        let vcs = FakeVcs::ahead(1).with_fetch_failure();

        let error = f.orchestrator(&vcs).force_reconcile(&f.repo, "main").unwrap_err();
        assert!(error.to_string().contains("Could not resolve host"));
        assert!(vcs.destructive_calls().is_empty());
    }

    #[test]
    fn test_reset_failure_is_fatal() {
        let f = fixture();
        let vcs = FakeVcs::ahead(1).with_reset_failure();

        let error = f.orchestrator(&vcs).force_reconcile(&f.repo, "main").unwrap_err();
        assert!(error.to_string().contains("index.lock"));
        assert!(!vcs.calls().contains(&"clean".to_string()));
    }

    #[test]
    fn test_checkout_failure_is_not_fatal() {
        let f = fixture();
        let vcs = FakeVcs::diverged(1, 1).with_checkout_failure();

        let report = f.orchestrator(&vcs).force_reconcile(&f.repo, "main").unwrap();
        assert!(report.destructive);
        assert_eq!(vcs.head(), vcs.remote_tip());
    }

    #[test]
    fn test_backup_failure_is_not_fatal() {
        let f = fixture();
        let vcs = FakeVcs::ahead(2);
        let root = TrackedRepository::new("acme/widgets", Path::new("/"));

        let report = f.orchestrator(&vcs).force_reconcile(&root, "main").unwrap();
        assert!(matches!(report.backup, Some(BackupOutcome::Failed(_))));
        assert!(report.destructive);
    }

    #[test]
    fn test_disabled_backup_is_reported_as_skipped() {
        let mut f = fixture();
        let (sink, mut receiver) = EventSink::channel();
        f.events = sink;
        f.backups = BackupManager::new(false);
        let vcs = FakeVcs::ahead(1);

        let report = f.orchestrator(&vcs).force_reconcile(&f.repo, "main").unwrap();

        assert_eq!(report.backup, Some(BackupOutcome::Disabled));
        match receiver.try_recv() {
            Ok(crate::sync::SyncEvent::Step { step, .. }) => {
                assert_eq!(step, RecoveryStep::BackupSkipped("(backups disabled)".into()));
                assert_eq!(step.to_string(), "backup skipped (backups disabled)");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_dangling_symlink_still_gets_a_backup() {
        let f = fixture();
        std::os::unix::fs::symlink("build/out.bin", f.repo.local_path.join("latest")).unwrap();
        fs::write(f.repo.local_path.join("scratch.txt"), "untracked\n").unwrap();
        let vcs = FakeVcs::diverged(1, 2);

        let report = f.orchestrator(&vcs).force_reconcile(&f.repo, "main").unwrap();

        let backup = report.backup.as_ref().and_then(BackupOutcome::path).unwrap();
        assert!(backup.join("latest").is_symlink());
        assert_eq!(fs::read_to_string(backup.join("scratch.txt")).unwrap(), "untracked\n");
    }

    #[test]
    fn test_steps_are_reported() {
        let mut f = fixture();
        let (sink, mut receiver) = EventSink::channel();
        f.events = sink;
        let vcs = FakeVcs::behind(2).with_merge_failures(1).with_conflict(unmerged());

        f.orchestrator(&vcs).recover(&f.repo, "main").unwrap();

        let mut steps = Vec::new();
        while let Ok(crate::sync::SyncEvent::Step { step, .. }) = receiver.try_recv() {
            steps.push(step);
        }
        assert!(matches!(steps[0], RecoveryStep::MergeAborted { success: true, .. }));
        assert!(matches!(steps[1], RecoveryStep::RetryFailed(_)));
        assert!(matches!(steps[2], RecoveryStep::BackupCreated(_)));
        assert_eq!(steps[3], RecoveryStep::Fetched);
        assert_eq!(steps[4], RecoveryStep::ResetTo("origin/main".into()));
        assert!(matches!(steps[5], RecoveryStep::CheckedOut { success: true, .. }));
        assert_eq!(steps.len(), 6);
    }
}
