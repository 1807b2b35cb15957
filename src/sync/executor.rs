//! Per-repository dispatch and whole-registry passes

use anyhow::Result;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use super::update::attempt_update;
use super::{
    BackupManager, BackupOutcome, DivergenceInfo, EventSink, RecoveryOrchestrator, RecoveryReport, RemoteProber,
    SyncError, SyncEvent, SyncOutcome, SyncState, classify,
};
use crate::config::GitSyncConfig;
use crate::git::{RemoteAuth, SystemGit, Vcs, short_revision};
use crate::registry::{DEFAULT_BRANCH, RegistryStore, TrackedRepository};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassMode {
    Sync,
    /// Probe and classify only
    Check,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection {
    /// Every record with auto-sync on; the rest are reported as skipped
    AutoSync,
    All,
    Only(Vec<String>),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PassSummary {
    counts: BTreeMap<SyncState, usize>,
}

impl PassSummary {
    pub fn from_outcomes(outcomes: &[SyncOutcome]) -> Self {
        let mut summary = Self::default();
        for outcome in outcomes {
            *summary.counts.entry(outcome.state).or_default() += 1;
        }
        summary
    }

    pub fn count(&self, state: SyncState) -> usize {
        self.counts.get(&state).copied().unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.values().sum()
    }

    pub fn failures(&self) -> usize {
        self.counts
            .iter()
            .filter(|(state, _)| state.is_failure())
            .map(|(_, count)| count)
            .sum()
    }

    pub fn has_failures(&self) -> bool {
        self.failures() > 0
    }
}

impl fmt::Display for PassSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.counts.is_empty() {
            return write!(f, "no repositories");
        }
        let parts: Vec<String> = self
            .counts
            .iter()
            .map(|(state, count)| format!("{count} {state}"))
            .collect();
        write!(f, "{}", parts.join(", "))
    }
}

#[derive(Debug, Clone)]
pub struct PassReport {
    pub outcomes: Vec<SyncOutcome>,
    pub summary: PassSummary,
}

pub struct SyncExecutor {
    vcs: Arc<dyn Vcs>,
    store: RegistryStore,
    auth: RemoteAuth,
    backups: BackupManager,
    default_branch: String,
    events: EventSink,
}

impl SyncExecutor {
    pub fn new(vcs: Arc<dyn Vcs>, store: RegistryStore) -> Self {
        Self {
            vcs,
            store,
            auth: RemoteAuth::anonymous(),
            backups: BackupManager::default(),
            default_branch: DEFAULT_BRANCH.to_string(),
            events: EventSink::disabled(),
        }
    }

    pub fn from_config(config: &GitSyncConfig) -> Result<Self> {
        let git = SystemGit::new(&config.git_binary)?;
        Ok(Self::new(Arc::new(git), RegistryStore::new(&config.registry_path))
            .with_auth(RemoteAuth::new(config.token(), &config.remote_host))
            .with_backups(BackupManager::new(config.backup.enabled))
            .with_default_branch(&config.default_branch))
    }

    pub fn with_auth(mut self, auth: RemoteAuth) -> Self {
        self.auth = auth;
        self
    }

    pub fn with_backups(mut self, backups: BackupManager) -> Self {
        self.backups = backups;
        self
    }

    pub fn with_default_branch(mut self, branch: impl Into<String>) -> Self {
        self.default_branch = branch.into();
        self
    }

    pub fn with_events(mut self, events: EventSink) -> Self {
        self.events = events;
        self
    }

    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Probe, classify and reconcile one clone. Updates `lastKnownRevision`
    /// only when the clone actually moved.
    pub fn sync_one(&self, repo: &TrackedRepository) -> SyncOutcome {
        self.started(repo);
        let outcome = self.reconcile(repo);

        if outcome.state.persists_revision() {
            if let Some(revision) = &outcome.local_revision {
                if let Err(e) = self.store.update_revision(&repo.identity, revision) {
                    tracing::warn!("Could not record revision for {}: {}", repo.identity, e);
                }
            }
        }

        self.finished(outcome)
    }

    /// Probe and classify without touching the working tree or registry
    pub fn check(&self, repo: &TrackedRepository) -> SyncOutcome {
        self.started(repo);
        let branch = repo.branch_or(&self.default_branch);

        let outcome = match self.prober().probe(repo, branch) {
            Ok(info) => {
                let state = classify(&info);
                let message = match state {
                    SyncState::UpToDate => format!("up to date at {}", short_revision(&info.local_revision)),
                    SyncState::Behind => format!("{} new commit(s) on origin/{}", info.behind, branch),
                    SyncState::Ahead => format!("{} local commit(s) not on origin/{}", info.ahead, branch),
                    _ => format!("{} local / {} remote commit(s) apart", info.ahead, info.behind),
                };
                SyncOutcome::new(repo, state, message)
                    .with_revisions(Some(info.local_revision), Some(info.remote_revision))
            }
            Err(e) => SyncOutcome::from_probe_error(repo, &e),
        };

        self.finished(outcome)
    }

    /// Strictly sequential; every registry write is a read-modify-write
    pub fn sync_many(&self, repos: &[TrackedRepository]) -> Vec<SyncOutcome> {
        repos.iter().map(|repo| self.sync_one(repo)).collect()
    }

    /// One pass over the registry in its stored order. A failing repository
    /// never stops the pass.
    pub fn run_pass(&self, mode: PassMode, selection: &Selection) -> PassReport {
        let records = self.store.load();
        let mut outcomes = Vec::new();

        match selection {
            Selection::AutoSync | Selection::All => {
                for repo in &records {
                    if *selection == Selection::AutoSync && !repo.auto_sync() {
                        let skipped = SyncOutcome::new(repo, SyncState::Skipped, "auto-sync disabled");
                        outcomes.push(self.finished(skipped));
                        continue;
                    }
                    outcomes.push(self.run_one(mode, repo));
                }
            }
            Selection::Only(identities) => {
                for identity in identities {
                    match records.iter().find(|repo| &repo.identity == identity) {
                        Some(repo) => outcomes.push(self.run_one(mode, repo)),
                        None => {
                            let unknown = SyncOutcome {
                                identity: identity.clone(),
                                state: SyncState::Error,
                                local_revision: None,
                                remote_revision: None,
                                message: "not in registry".to_string(),
                            };
                            outcomes.push(self.finished(unknown));
                        }
                    }
                }
            }
        }

        let summary = PassSummary::from_outcomes(&outcomes);
        tracing::info!("Pass finished: {}", summary);
        self.events.emit(SyncEvent::PassCompleted(summary.clone()));
        PassReport { outcomes, summary }
    }

    /// Run a pass on a blocking worker. Events stream through the returned
    /// receiver, which may be dropped at any time.
    pub fn spawn_pass(
        mut self,
        mode: PassMode,
        selection: Selection,
    ) -> (JoinHandle<PassReport>, UnboundedReceiver<SyncEvent>) {
        let (sink, receiver) = EventSink::channel();
        self.events = sink;
        let handle = tokio::task::spawn_blocking(move || self.run_pass(mode, &selection));
        (handle, receiver)
    }

    fn run_one(&self, mode: PassMode, repo: &TrackedRepository) -> SyncOutcome {
        match mode {
            PassMode::Sync => self.sync_one(repo),
            PassMode::Check => self.check(repo),
        }
    }

    fn prober(&self) -> RemoteProber<'_> {
        RemoteProber::new(self.vcs.as_ref(), &self.auth)
    }

    fn orchestrator(&self) -> RecoveryOrchestrator<'_> {
        RecoveryOrchestrator::new(self.vcs.as_ref(), &self.auth, &self.backups, &self.events)
    }

    fn started(&self, repo: &TrackedRepository) {
        self.events.emit(SyncEvent::Started {
            identity: repo.identity.clone(),
        });
    }

    fn finished(&self, outcome: SyncOutcome) -> SyncOutcome {
        if outcome.state.is_failure() {
            tracing::warn!("{}: {} ({})", outcome.identity, outcome.state, outcome.message);
        } else {
            tracing::info!("{}: {} ({})", outcome.identity, outcome.state, outcome.message);
        }
        self.events.emit(SyncEvent::Finished(outcome.clone()));
        outcome
    }

    fn reconcile(&self, repo: &TrackedRepository) -> SyncOutcome {
        let branch = repo.branch_or(&self.default_branch);
        let info = match self.prober().probe(repo, branch) {
            Ok(info) => info,
            Err(e) => return SyncOutcome::from_probe_error(repo, &e),
        };

        match classify(&info) {
            SyncState::UpToDate => SyncOutcome::new(
                repo,
                SyncState::UpToDate,
                format!("up to date at {}", short_revision(&info.local_revision)),
            )
            .with_revisions(Some(info.local_revision), Some(info.remote_revision)),

            SyncState::Behind => match attempt_update(self.vcs.as_ref(), &repo.local_path, branch) {
                Ok(_) => self.moved(repo, branch, &info, SyncState::Updated, String::new()),
                Err(e) if e.is_structural() => {
                    tracing::warn!("{}: {}", repo.identity, e);
                    let result = self.orchestrator().recover(repo, branch);
                    self.recovered(repo, branch, &info, result, String::new())
                }
                Err(e) => SyncOutcome::new(repo, SyncState::Error, e.to_string())
                    .with_revisions(Some(info.local_revision.clone()), Some(info.remote_revision.clone())),
            },

            // One-way mirror: local-only commits are discarded after a backup
            _ => {
                let note = format!(", discarded {} local commit(s)", info.ahead);
                tracing::warn!(
                    "{}: {} local commit(s) not on origin/{}, resetting",
                    repo.identity,
                    info.ahead,
                    branch
                );
                let result = self.orchestrator().force_reconcile(repo, branch);
                self.recovered(repo, branch, &info, result, note)
            }
        }
    }

    fn recovered(
        &self,
        repo: &TrackedRepository,
        branch: &str,
        info: &DivergenceInfo,
        result: Result<RecoveryReport, SyncError>,
        note: String,
    ) -> SyncOutcome {
        match result {
            Ok(report) => {
                let backup = match &report.backup {
                    Some(BackupOutcome::Created(path)) => format!(" (backup: {})", path.display()),
                    Some(skipped) => format!(" {skipped}"),
                    None => String::new(),
                };
                self.moved(repo, branch, info, SyncState::Recovered, format!("{note}{backup}"))
            }
            Err(e) => {
                if let Some(status) = self.vcs.status_summary(&repo.local_path) {
                    tracing::warn!("{}: working tree after failed recovery:\n{}", repo.identity, status);
                }
                SyncOutcome::new(repo, SyncState::RecoveryFailed, e.to_string())
                    .with_revisions(Some(info.local_revision.clone()), Some(info.remote_revision.clone()))
            }
        }
    }

    /// Outcome for a clone whose HEAD moved; revisions are re-read since
    /// recovery fetches again
    fn moved(
        &self,
        repo: &TrackedRepository,
        branch: &str,
        info: &DivergenceInfo,
        state: SyncState,
        suffix: String,
    ) -> SyncOutcome {
        let workdir = repo.local_path.as_path();
        let remote = self
            .vcs
            .resolve_revision(workdir, &format!("origin/{branch}"))
            .unwrap_or_else(|| info.remote_revision.clone());
        let local = self
            .vcs
            .resolve_revision(workdir, "HEAD")
            .unwrap_or_else(|| remote.clone());

        let message = format!("{}{}", SyncOutcome::transition(&info.local_revision, &local), suffix);
        SyncOutcome::new(repo, state, message).with_revisions(Some(local), Some(remote))
    }
}
