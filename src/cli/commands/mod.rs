//! Command implementations for the gitsync CLI

pub mod auto_sync;
pub mod check;
pub mod list;
pub mod remove;
pub mod reorder;
pub mod sync;

use anyhow::{Context, Result};
use std::process::ExitCode;
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::task::JoinHandle;

use crate::cli::Output;
use crate::config::GitSyncConfig;
use crate::git::parse_repo_input;
use crate::registry::RegistryStore;
use crate::sync::{PassReport, RecoveryStep, SyncEvent};

fn load_config(custom_config: Option<&str>) -> Result<GitSyncConfig> {
    GitSyncConfig::load_with_custom_config(custom_config)
}

fn open_store(custom_config: Option<&str>) -> Result<RegistryStore> {
    Ok(RegistryStore::new(load_config(custom_config)?.registry_path))
}

/// Canonical `owner/name` identities for user-supplied references
fn identities(inputs: &[String]) -> Result<Vec<String>> {
    inputs
        .iter()
        .map(|input| -> Result<String> { Ok(parse_repo_input(input)?.to_string()) })
        .collect()
}

/// Like [`identities`], but every entry must already be tracked
fn tracked_identities(store: &RegistryStore, inputs: &[String]) -> Result<Vec<String>> {
    let identities = identities(inputs)?;
    for identity in &identities {
        store
            .find(identity)
            .with_context(|| format!("'{identity}' is not tracked in {}", store.path().display()))?;
    }
    Ok(identities)
}

/// Render events until the worker finishes, then collect its report
async fn follow_pass(
    handle: JoinHandle<PassReport>,
    mut events: UnboundedReceiver<SyncEvent>,
    output: &Output,
) -> Result<ExitCode> {
    while let Some(event) = events.recv().await {
        match event {
            SyncEvent::Started { identity } => output.verbose_step("❯", &identity),
            SyncEvent::Step {
                identity,
                step: step @ RecoveryStep::BackupFailed(_),
            } => output.warning(&format!("{identity}: {step}")),
            SyncEvent::Step { step, .. } => output.verbose_step("↳", &step.to_string()),
            SyncEvent::Finished(outcome) => output.outcome(&outcome),
            SyncEvent::PassCompleted(summary) => output.summary(&summary),
        }
    }

    let report = handle.await.context("Sync worker stopped unexpectedly")?;
    Ok(if report.summary.has_failures() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}
