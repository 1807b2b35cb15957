//! Synchronization reconciliation engine
//!
//! A pass walks the registry in order. For each tracked clone the prober
//! fetches and measures divergence, the classifier names the state, and the
//! executor either fast-forwards, hands a structural failure to the
//! recovery orchestrator, or resets a clone whose history left the remote's.

pub mod backup;
pub mod classify;
pub mod error;
pub mod events;
pub mod executor;
pub mod probe;
pub mod recovery;
mod update;

#[cfg(test)]
pub(crate) mod fake;

pub use backup::{BackupManager, BackupOutcome};
pub use classify::classify;
pub use error::{ProbeError, SyncError};
pub use events::{EventSink, RecoveryStep, SyncEvent};
pub use executor::{PassMode, PassReport, PassSummary, Selection, SyncExecutor};
pub use probe::RemoteProber;
pub use recovery::{RecoveryOrchestrator, RecoveryReport};

use serde::Serialize;
use std::fmt;

use crate::git::short_revision;
use crate::registry::TrackedRepository;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum SyncState {
    Missing,
    NotARepository,
    FetchFailed,
    UpToDate,
    Ahead,
    Behind,
    Diverged,
    Updated,
    Recovered,
    RecoveryFailed,
    /// Auto-sync disabled for this record during an unattended pass
    Skipped,
    /// Update failed for a reason recovery must not touch (auth, network, disk)
    Error,
}

impl SyncState {
    pub fn as_str(&self) -> &'static str {
        match self {
            SyncState::Missing => "missing",
            SyncState::NotARepository => "not-a-repository",
            SyncState::FetchFailed => "fetch-failed",
            SyncState::UpToDate => "up-to-date",
            SyncState::Ahead => "ahead",
            SyncState::Behind => "behind",
            SyncState::Diverged => "diverged",
            SyncState::Updated => "updated",
            SyncState::Recovered => "recovered",
            SyncState::RecoveryFailed => "recovery-failed",
            SyncState::Skipped => "skipped",
            SyncState::Error => "error",
        }
    }

    /// States that leave the clone unsynchronized for a reason other than
    /// "nothing to do"
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncState::Missing
                | SyncState::NotARepository
                | SyncState::FetchFailed
                | SyncState::RecoveryFailed
                | SyncState::Error
        )
    }

    /// Only these write `lastKnownRevision` back to the registry
    pub fn persists_revision(&self) -> bool {
        matches!(self, SyncState::Updated | SyncState::Recovered)
    }
}

impl fmt::Display for SyncState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Local/remote relationship measured by one probe
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DivergenceInfo {
    pub local_revision: String,
    pub remote_revision: String,
    pub behind: usize,
    pub ahead: usize,
}

/// Result of one probe/update cycle for one repository. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncOutcome {
    pub identity: String,
    pub state: SyncState,
    pub local_revision: Option<String>,
    pub remote_revision: Option<String>,
    pub message: String,
}

impl SyncOutcome {
    pub fn new(repo: &TrackedRepository, state: SyncState, message: impl Into<String>) -> Self {
        Self {
            identity: repo.identity.clone(),
            state,
            local_revision: None,
            remote_revision: None,
            message: message.into(),
        }
    }

    pub fn with_revisions(mut self, local: Option<String>, remote: Option<String>) -> Self {
        self.local_revision = local;
        self.remote_revision = remote;
        self
    }

    pub(crate) fn from_probe_error(repo: &TrackedRepository, error: &ProbeError) -> Self {
        Self::new(repo, SyncState::from(error), error.to_string())
    }

    /// `abc1234 → def5678`, or the single revision when nothing moved
    pub(crate) fn transition(from: &str, to: &str) -> String {
        if from == to {
            short_revision(to).to_string()
        } else {
            format!("{} → {}", short_revision(from), short_revision(to))
        }
    }
}
