//! Command-line interface for gitsync
//!
//! The CLI is a thin driver over the sync engine: it loads configuration,
//! builds an executor, and renders the events a pass publishes.

use anyhow::Result;
use clap::{ArgAction, Args, CommandFactory, Parser, Subcommand};
use std::process::ExitCode;

mod commands;
mod output;

pub use output::Output;

/// gitsync - keep local clones mirrored to their remotes
#[derive(Parser)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Configuration file path
    #[arg(short, long, value_name = "FILE", global = true)]
    pub config: Option<String>,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only report failures
    #[arg(short, long, global = true)]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Synchronize auto-sync repositories, or the named ones
    Sync(RepoArgs),
    /// Fetch and report divergence without changing anything
    Check(RepoArgs),
    /// List tracked repositories
    List,
    /// Stop tracking a repository
    Remove {
        /// owner/repo or GitHub URL
        repo: String,
        /// Also delete the local clone
        #[arg(long)]
        delete_local: bool,
    },
    /// Turn unattended synchronization on or off
    AutoSync(AutoSyncArgs),
    /// Move a repository to another's position within its auto-sync group
    Move {
        source: String,
        target: String,
    },
}

#[derive(Args, Debug, Default)]
pub struct RepoArgs {
    /// owner/repo or GitHub URL; defaults to every tracked repository
    pub repos: Vec<String>,
}

#[derive(Args, Debug)]
pub struct AutoSyncArgs {
    #[arg(required = true)]
    pub repos: Vec<String>,

    #[arg(long, conflicts_with = "disable", required_unless_present = "disable")]
    pub enable: bool,

    #[arg(long)]
    pub disable: bool,
}

impl Cli {
    pub async fn run(self) -> Result<ExitCode> {
        setup_logging(self.verbose, self.quiet);
        let output = Output::new(self.verbose > 0, self.quiet);
        let config = self.config.as_deref();

        match self.command {
            Some(Commands::Sync(args)) => commands::sync::execute(args, config, &output).await,
            Some(Commands::Check(args)) => commands::check::execute(args, config, &output).await,
            Some(Commands::List) => commands::list::execute(config, &output).await,
            Some(Commands::Remove { repo, delete_local }) => {
                commands::remove::execute(&repo, delete_local, config, &output).await
            }
            Some(Commands::AutoSync(args)) => commands::auto_sync::execute(args, config, &output).await,
            Some(Commands::Move { source, target }) => {
                commands::reorder::execute(&source, &target, config, &output).await
            }
            None => {
                Cli::command().print_help()?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}

fn setup_logging(verbose: u8, quiet: bool) {
    if quiet {
        return;
    }

    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        match verbose {
            0 => tracing_subscriber::EnvFilter::new("warn"),
            1 => tracing_subscriber::EnvFilter::new("info"),
            2 => tracing_subscriber::EnvFilter::new("debug"),
            _ => tracing_subscriber::EnvFilter::new("trace"),
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
