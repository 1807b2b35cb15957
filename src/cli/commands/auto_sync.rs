//! Enable or disable unattended synchronization

use anyhow::Result;
use std::process::ExitCode;

use super::{open_store, tracked_identities};
use crate::cli::{AutoSyncArgs, Output};

pub async fn execute(args: AutoSyncArgs, custom_config: Option<&str>, output: &Output) -> Result<ExitCode> {
    let store = open_store(custom_config)?;
    let identities = tracked_identities(&store, &args.repos)?;
    let enable = args.enable && !args.disable;

    let names: Vec<&str> = identities.iter().map(String::as_str).collect();
    let changed = store.set_auto_sync(&names, enable)?;

    let state = if enable { "enabled" } else { "disabled" };
    if changed == 0 {
        output.info(&format!("Auto-sync already {state} for {}", names.join(", ")));
    } else {
        output.success(&format!("Auto-sync {state} for {changed} repositor{}", plural(changed)));
    }
    Ok(ExitCode::SUCCESS)
}

fn plural(count: usize) -> &'static str {
    if count == 1 { "y" } else { "ies" }
}
