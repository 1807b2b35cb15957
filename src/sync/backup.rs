//! Best-effort snapshot of a working tree before destructive recovery

use anyhow::{Context, Result};
use chrono::Local;
use std::fmt;
use std::fs;
use std::io::{self, ErrorKind};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackupOutcome {
    Created(PathBuf),
    /// Nothing to copy
    NoLocalCopy,
    Disabled,
    /// Recovery went ahead without a snapshot
    Failed(String),
}

impl BackupOutcome {
    pub fn path(&self) -> Option<&Path> {
        match self {
            BackupOutcome::Created(path) => Some(path),
            _ => None,
        }
    }
}

impl fmt::Display for BackupOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackupOutcome::Created(path) => write!(f, "{}", path.display()),
            BackupOutcome::NoLocalCopy => write!(f, "(no local copy)"),
            BackupOutcome::Disabled => write!(f, "(backups disabled)"),
            BackupOutcome::Failed(reason) => write!(f, "(backup failed: {reason})"),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackupManager {
    enabled: bool,
}

impl Default for BackupManager {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl BackupManager {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    /// Copy `local_path` recursively to a sibling
    /// `<name>_backup_<YYYYmmdd_HHMMSS>` directory. The original is never
    /// modified.
    ///
    /// Symlinks are recreated as links, never followed, so dangling links
    /// copy fine. An entry that cannot be copied is logged and skipped; the
    /// rest of the snapshot is kept.
    pub fn backup(&self, local_path: &Path) -> Result<BackupOutcome> {
        if !self.enabled {
            return Ok(BackupOutcome::Disabled);
        }
        if !local_path.exists() {
            return Ok(BackupOutcome::NoLocalCopy);
        }

        let target = reserve_target(local_path)?;
        let skipped = copy_tree(local_path, &target);
        if skipped > 0 {
            tracing::warn!(
                "Backed up {} to {} with {} entries skipped",
                local_path.display(),
                target.display(),
                skipped
            );
        } else {
            tracing::info!("Backed up {} to {}", local_path.display(), target.display());
        }
        Ok(BackupOutcome::Created(target))
    }
}

/// Returns the number of entries that could not be copied
fn copy_tree(source: &Path, target: &Path) -> usize {
    let mut skipped = 0;
    for entry in WalkDir::new(source).follow_links(false).min_depth(1) {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!("Skipping unreadable entry during backup: {}", e);
                skipped += 1;
                continue;
            }
        };
        let Ok(relative) = entry.path().strip_prefix(source) else {
            continue;
        };
        let destination = target.join(relative);
        if let Err(e) = copy_entry(&entry, &destination) {
            tracing::warn!("Skipping {} during backup: {}", entry.path().display(), e);
            skipped += 1;
        }
    }
    skipped
}

fn copy_entry(entry: &walkdir::DirEntry, destination: &Path) -> io::Result<()> {
    let file_type = entry.file_type();
    if file_type.is_symlink() {
        copy_link(entry.path(), destination)
    } else if file_type.is_dir() {
        fs::create_dir_all(destination)
    } else {
        fs::copy(entry.path(), destination).map(|_| ())
    }
}

#[cfg(unix)]
fn copy_link(source: &Path, destination: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(fs::read_link(source)?, destination)
}

#[cfg(windows)]
fn copy_link(source: &Path, destination: &Path) -> io::Result<()> {
    use std::os::windows::fs::{symlink_dir, symlink_file};

    let link = fs::read_link(source)?;
    if source.is_dir() {
        symlink_dir(link, destination)
    } else {
        symlink_file(link, destination)
    }
}

/// Create the empty target directory. Two backups inside the same second get
/// a numeric suffix instead of colliding.
fn reserve_target(local_path: &Path) -> Result<PathBuf> {
    let name = local_path
        .file_name()
        .with_context(|| format!("Cannot back up {}", local_path.display()))?
        .to_string_lossy();
    let parent = local_path.parent().unwrap_or_else(|| Path::new("."));
    let stem = format!("{name}_backup_{}", Local::now().format(TIMESTAMP_FORMAT));

    let mut candidate = parent.join(&stem);
    let mut counter = 1;
    loop {
        match fs::create_dir(&candidate) {
            Ok(()) => return Ok(candidate),
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                candidate = parent.join(format!("{stem}_{counter}"));
                counter += 1;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to create {}", candidate.display()));
            }
        }
    }
}
