//! Stop tracking a repository, optionally deleting its clone

use anyhow::{Context, Result, bail};
use std::fs;
use std::path::Path;
use std::process::ExitCode;

use super::{open_store, tracked_identities};
use crate::cli::Output;

pub async fn execute(
    repo: &str,
    delete_local: bool,
    custom_config: Option<&str>,
    output: &Output,
) -> Result<ExitCode> {
    let store = open_store(custom_config)?;
    let identity = tracked_identities(&store, &[repo.to_string()])?.remove(0);
    let Some(record) = store.find(&identity) else {
        bail!("'{identity}' is not tracked");
    };

    if delete_local && record.local_path.exists() {
        delete_clone(&record.local_path)?;
        output.step(&format!("Deleted {}", record.local_path.display()));
    }

    store.remove(&identity)?;
    output.success(&format!("Stopped tracking {identity}"));
    Ok(ExitCode::SUCCESS)
}

/// Git marks pack files read-only, which blocks removal on some platforms
fn delete_clone(path: &Path) -> Result<()> {
    make_writable(path).with_context(|| format!("Failed to prepare {} for deletion", path.display()))?;
    fs::remove_dir_all(path).with_context(|| format!("Failed to delete {}", path.display()))
}

fn make_writable(path: &Path) -> std::io::Result<()> {
    let metadata = fs::symlink_metadata(path)?;
    if metadata.file_type().is_symlink() {
        return Ok(());
    }

    let mut permissions = metadata.permissions();
    if permissions.readonly() {
        #[allow(clippy::permissions_set_readonly_false)]
        permissions.set_readonly(false);
        fs::set_permissions(path, permissions)?;
    }

    if metadata.is_dir() {
        for entry in fs::read_dir(path)? {
            make_writable(&entry?.path())?;
        }
    }
    Ok(())
}
