//! # gitsync - mirror tracked repositories onto their remotes
//!
//! gitsync keeps a list of local clones in step with their upstream
//! branches. Each pass fetches, measures divergence, fast-forwards where it
//! can and recovers from structural conflicts without user input, taking a
//! backup before anything destructive happens.
//!
//! ## Layout
//!
//! - [`registry`]: the JSON document listing tracked clones
//! - [`git`]: the `Vcs` capability interface and its `git`/git2 binding
//! - [`sync`]: prober, classifier, backups, recovery and the executor
//! - [`config`]: layered configuration
//!
//! ## Quick Start
//!
//! ```bash
//! gitsync list
//! gitsync sync
//! gitsync check acme/widgets
//! ```

pub mod cli;
pub mod config;
pub mod git;
pub mod registry;
pub mod sync;

pub use cli::{Cli, Output};
pub use config::GitSyncConfig;

/// Result type alias for gitsync operations
pub type Result<T> = anyhow::Result<T>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const PKG_NAME: &str = env!("CARGO_PKG_NAME");
