//! Progress events published while a pass runs

use std::fmt;
use std::path::PathBuf;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use super::{PassSummary, SyncOutcome};

/// Intermediate steps of a destructive recovery, reported for auditing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryStep {
    MergeAborted { success: bool, output: String },
    RetryFailed(String),
    BackupCreated(PathBuf),
    /// Disabled, or nothing on disk to copy
    BackupSkipped(String),
    BackupFailed(String),
    Fetched,
    ResetTo(String),
    CheckedOut { branch: String, success: bool },
}

impl fmt::Display for RecoveryStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryStep::MergeAborted { success: true, .. } => write!(f, "merge aborted"),
            RecoveryStep::MergeAborted { output, .. } => write!(f, "merge abort skipped: {output}"),
            RecoveryStep::RetryFailed(reason) => write!(f, "retry failed: {reason}"),
            RecoveryStep::BackupCreated(path) => write!(f, "backup: {}", path.display()),
            RecoveryStep::BackupSkipped(reason) => write!(f, "backup skipped {reason}"),
            RecoveryStep::BackupFailed(reason) => write!(f, "backup failed, continuing: {reason}"),
            RecoveryStep::Fetched => write!(f, "fetched origin"),
            RecoveryStep::ResetTo(target) => write!(f, "reset to {target}"),
            RecoveryStep::CheckedOut { branch, success: true } => write!(f, "checked out {branch}"),
            RecoveryStep::CheckedOut { branch, .. } => write!(f, "checkout of {branch} failed, continuing"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    Started { identity: String },
    Step { identity: String, step: RecoveryStep },
    Finished(SyncOutcome),
    PassCompleted(PassSummary),
}

/// Sending half of the progress channel. Events are dropped silently when
/// nobody listens.
#[derive(Debug, Clone, Default)]
pub struct EventSink {
    sender: Option<UnboundedSender<SyncEvent>>,
}

impl EventSink {
    pub fn channel() -> (Self, UnboundedReceiver<SyncEvent>) {
        let (sender, receiver) = mpsc::unbounded_channel();
        (Self { sender: Some(sender) }, receiver)
    }

    pub fn disabled() -> Self {
        Self::default()
    }

    pub fn emit(&self, event: SyncEvent) {
        if let Some(sender) = &self.sender {
            let _ = sender.send(event);
        }
    }

    pub(crate) fn step(&self, identity: &str, step: RecoveryStep) {
        tracing::info!("{}: {}", identity, step);
        self.emit(SyncEvent::Step {
            identity: identity.to_string(),
            step,
        });
    }
}
