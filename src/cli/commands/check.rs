//! Check tracked repositories for upstream changes without touching them

use anyhow::Result;
use std::process::ExitCode;

use super::{follow_pass, identities, load_config};
use crate::cli::{Output, RepoArgs};
use crate::sync::{PassMode, Selection, SyncExecutor};

pub async fn execute(args: RepoArgs, custom_config: Option<&str>, output: &Output) -> Result<ExitCode> {
    let config = load_config(custom_config)?;
    let executor = SyncExecutor::from_config(&config)?;

    if executor.store().load().is_empty() {
        output.info(&format!(
            "No repositories tracked in {}",
            executor.store().path().display()
        ));
        return Ok(ExitCode::SUCCESS);
    }

    let selection = if args.repos.is_empty() {
        Selection::All
    } else {
        Selection::Only(identities(&args.repos)?)
    };

    output.header("Checking for updates");
    let (handle, events) = executor.spawn_pass(PassMode::Check, selection);
    follow_pass(handle, events, output).await
}
