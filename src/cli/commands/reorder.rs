//! Reorder repositories within their auto-sync group

use anyhow::Result;
use std::process::ExitCode;

use super::{open_store, tracked_identities};
use crate::cli::Output;

pub async fn execute(
    source: &str,
    target: &str,
    custom_config: Option<&str>,
    output: &Output,
) -> Result<ExitCode> {
    let store = open_store(custom_config)?;
    let ids = tracked_identities(&store, &[source.to_string(), target.to_string()])?;

    if store.move_within_group(&ids[0], &ids[1])? {
        output.success(&format!("Moved {} to the position of {}", ids[0], ids[1]));
    } else {
        output.info("Nothing to move");
    }
    Ok(ExitCode::SUCCESS)
}
