//! Tracked-repository registry
//!
//! The registry is a single JSON document holding the ordered list of
//! tracked clones. Every mutation re-reads the file, applies the change and
//! writes the whole document back, so edits made by other tools between two
//! writes are never lost. List order is the processing order.

mod order;

pub use order::{group_by_auto_sync, move_within_group, reorder};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Branch assumed when a record does not name one
pub const DEFAULT_BRANCH: &str = "main";

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to write registry {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to serialize registry: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("'{0}' is not a tracked repository")]
    UnknownRepository(String),

    #[error("'{0}' appears more than once")]
    DuplicateRepository(String),

    #[error("'{source_id}' and '{target_id}' are in different auto-sync groups")]
    CrossGroupMove {
        source_id: String,
        target_id: String,
    },
}

/// One tracked clone.
///
/// Optional fields stay optional on disk so that loading and saving a
/// document never adds or drops keys; the accessors supply the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrackedRepository {
    /// `<owner>/<name>`, unique across the registry
    #[serde(rename = "repo")]
    pub identity: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    pub local_path: PathBuf,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branch: Option<String>,

    /// Creation date, never rewritten
    #[serde(default, rename = "added", skip_serializing_if = "Option::is_none")]
    pub added_at: Option<String>,

    #[serde(default, rename = "last_commit", skip_serializing_if = "Option::is_none")]
    pub last_known_revision: Option<String>,

    #[serde(default, rename = "auto_update", skip_serializing_if = "Option::is_none")]
    pub auto_sync: Option<bool>,

    /// Keys written by other tools, carried through untouched
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl TrackedRepository {
    /// New record as the clone bootstrap step registers it
    pub fn new(identity: impl Into<String>, local_path: impl Into<PathBuf>) -> Self {
        let identity = identity.into();
        let (owner, name) = match identity.split_once('/') {
            Some((owner, name)) => (Some(owner.to_string()), Some(name.to_string())),
            None => (None, None),
        };

        Self {
            identity,
            owner,
            name,
            local_path: local_path.into(),
            branch: Some(DEFAULT_BRANCH.to_string()),
            added_at: Some(chrono::Local::now().format("%Y-%m-%d").to_string()),
            last_known_revision: Some(String::new()),
            auto_sync: Some(true),
            extra: Map::new(),
        }
    }

    pub fn with_branch(mut self, branch: impl Into<String>) -> Self {
        self.branch = Some(branch.into());
        self
    }

    pub fn with_auto_sync(mut self, auto_sync: bool) -> Self {
        self.auto_sync = Some(auto_sync);
        self
    }

    /// Tracked branch, or `fallback` when the record names none
    pub fn branch_or<'a>(&'a self, fallback: &'a str) -> &'a str {
        self.branch
            .as_deref()
            .filter(|branch| !branch.is_empty())
            .unwrap_or(fallback)
    }

    /// Records without the flag take part in unattended passes
    pub fn auto_sync(&self) -> bool {
        self.auto_sync.unwrap_or(true)
    }

    pub fn last_known_revision(&self) -> Option<&str> {
        self.last_known_revision
            .as_deref()
            .filter(|revision| !revision.is_empty())
    }
}

/// On-disk document. Unknown top-level keys survive a rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryDocument {
    #[serde(default)]
    subscriptions: Vec<TrackedRepository>,

    #[serde(flatten)]
    extra: Map<String, Value>,
}

/// Handle on the registry file. Holds no records in memory.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current records. A missing or unreadable file yields an empty list.
    pub fn load(&self) -> Vec<TrackedRepository> {
        self.load_document().subscriptions
    }

    /// Replace the full record list. Identities must be unique.
    pub fn save(&self, records: &[TrackedRepository]) -> Result<(), RegistryError> {
        let mut seen = HashSet::new();
        if let Some(duplicate) = records.iter().find(|record| !seen.insert(record.identity.as_str())) {
            return Err(RegistryError::DuplicateRepository(duplicate.identity.clone()));
        }

        let mut document = self.load_document();
        document.subscriptions = records.to_vec();
        self.save_document(&document)
    }

    pub fn find(&self, identity: &str) -> Option<TrackedRepository> {
        self.load()
            .into_iter()
            .find(|record| record.identity == identity)
    }

    /// Update the mutable fields of a matching record, or append a new one.
    /// `added_at` of an existing record is never touched.
    pub fn upsert(&self, record: TrackedRepository) -> Result<(), RegistryError> {
        self.modify(|records| {
            match records.iter_mut().find(|r| r.identity == record.identity) {
                Some(existing) => {
                    existing.local_path = record.local_path;
                    existing.branch = record.branch.or(existing.branch.take());
                    existing.auto_sync = record.auto_sync.or(existing.auto_sync);
                    existing.last_known_revision = record
                        .last_known_revision
                        .filter(|revision| !revision.is_empty())
                        .or(existing.last_known_revision.take());
                }
                None => records.push(record),
            }
        })
    }

    /// Returns whether a record existed
    pub fn remove(&self, identity: &str) -> Result<bool, RegistryError> {
        self.modify(|records| {
            let before = records.len();
            records.retain(|record| record.identity != identity);
            records.len() < before
        })
    }

    /// Persist the revision observed after a successful sync
    pub fn update_revision(&self, identity: &str, revision: &str) -> Result<bool, RegistryError> {
        self.modify(|records| {
            match records.iter_mut().find(|record| record.identity == identity) {
                Some(record) => {
                    record.last_known_revision = Some(revision.to_string());
                    true
                }
                None => false,
            }
        })
    }

    /// Toggle one record and move it to the end of its new group
    pub fn toggle_auto_sync(&self, identity: &str) -> Result<bool, RegistryError> {
        self.try_modify(|records| {
            let record = records
                .iter()
                .find(|record| record.identity == identity)
                .ok_or_else(|| RegistryError::UnknownRepository(identity.to_string()))?;
            let value = !record.auto_sync();
            *records = reorder(std::mem::take(records), identity, value);
            Ok(value)
        })
    }

    /// Set the flag on every named record, then regroup stably.
    /// Returns how many records actually changed.
    pub fn set_auto_sync(&self, identities: &[&str], value: bool) -> Result<usize, RegistryError> {
        self.modify(|records| {
            let mut changed = 0;
            for record in records.iter_mut() {
                if identities.contains(&record.identity.as_str()) && record.auto_sync() != value {
                    record.auto_sync = Some(value);
                    changed += 1;
                }
            }
            if changed > 0 {
                group_by_auto_sync(records);
            }
            changed
        })
    }

    /// Move `source` to `target`'s position within the same auto-sync group
    pub fn move_within_group(&self, source: &str, target: &str) -> Result<bool, RegistryError> {
        self.try_modify(|records| move_within_group(records, source, target))
    }

    fn modify<T>(&self, change: impl FnOnce(&mut Vec<TrackedRepository>) -> T) -> Result<T, RegistryError> {
        self.try_modify(|records| Ok(change(records)))
    }

    /// Read-modify-write against the latest file contents. Nothing is
    /// written when the change leaves the records as they were.
    fn try_modify<T>(
        &self,
        change: impl FnOnce(&mut Vec<TrackedRepository>) -> Result<T, RegistryError>,
    ) -> Result<T, RegistryError> {
        let mut document = self.load_document();
        let before = document.subscriptions.clone();
        let result = change(&mut document.subscriptions)?;
        if document.subscriptions != before {
            self.save_document(&document)?;
        }
        Ok(result)
    }

    fn load_document(&self) -> RegistryDocument {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(e) => {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Cannot read registry {}: {}", self.path.display(), e);
                }
                return RegistryDocument::default();
            }
        };

        serde_json::from_str(&content).unwrap_or_else(|e| {
            tracing::warn!("Registry {} is corrupt, treating as empty: {}", self.path.display(), e);
            RegistryDocument::default()
        })
    }

    /// Write to a sibling temp file, then rename over the registry
    fn save_document(&self, document: &RegistryDocument) -> Result<(), RegistryError> {
        let io_error = |source| RegistryError::Io {
            path: self.path.clone(),
            source,
        };

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let mut content = serde_json::to_string_pretty(document)?;
        content.push('\n');

        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        let staging = PathBuf::from(staging);

        fs::write(&staging, content).map_err(io_error)?;
        fs::rename(&staging, &self.path).map_err(io_error)?;

        tracing::trace!("Saved registry {}", self.path.display());
        Ok(())
    }
}
