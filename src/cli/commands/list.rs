//! List tracked repositories in processing order

use anyhow::Result;
use console::style;
use std::process::ExitCode;

use super::open_store;
use crate::cli::Output;
use crate::git::short_revision;

pub async fn execute(custom_config: Option<&str>, output: &Output) -> Result<ExitCode> {
    let store = open_store(custom_config)?;
    let records = store.load();

    if records.is_empty() {
        output.info(&format!("No repositories tracked in {}", store.path().display()));
        return Ok(ExitCode::SUCCESS);
    }

    for record in &records {
        let marker = if record.local_path.exists() {
            style("●").green()
        } else {
            style("○").red()
        };
        let auto = if record.auto_sync() {
            style("auto").cyan()
        } else {
            style("manual").dim()
        };
        println!(
            "{} {:<32} {:<12} {:<10} {:<7} {:<6} {}",
            marker,
            style(&record.identity).bold(),
            record.branch_or("-"),
            record.added_at.as_deref().unwrap_or("-"),
            record.last_known_revision().map(short_revision).unwrap_or("-"),
            auto,
            style(record.local_path.display()).dim()
        );
    }

    Ok(ExitCode::SUCCESS)
}
