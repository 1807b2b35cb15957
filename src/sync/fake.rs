//! Scripted in-memory `Vcs` for engine tests

use std::path::Path;
use std::sync::Mutex;

use crate::git::{AheadBehind, CommandOutput, ConflictState, Vcs};

pub(crate) const LOCAL: &str = "1111111aaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaaa";
pub(crate) const REMOTE: &str = "2222222bbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbbb";

#[derive(Debug, Clone)]
struct State {
    head: String,
    remote_tip: String,
    ahead: usize,
    behind: usize,
    fetch_fails: bool,
    /// Number of upcoming `merge_update` calls that fail
    merge_failures: usize,
    conflict: ConflictState,
    reset_fails: bool,
    checkout_fails: bool,
    calls: Vec<String>,
}

/// Models one clone and its remote. `merge_update` fast-forwards `head` to
/// the remote tip unless a failure is scripted; `hard_reset` always lands on
/// the remote tip and clears any conflict.
#[derive(Debug)]
pub(crate) struct FakeVcs {
    state: Mutex<State>,
}

impl FakeVcs {
    fn with_counts(ahead: usize, behind: usize) -> Self {
        let remote_tip = if ahead == 0 && behind == 0 { LOCAL } else { REMOTE };
        Self {
            state: Mutex::new(State {
                head: LOCAL.to_string(),
                remote_tip: remote_tip.to_string(),
                ahead,
                behind,
                fetch_fails: false,
                merge_failures: 0,
                conflict: ConflictState::default(),
                reset_fails: false,
                checkout_fails: false,
                calls: Vec::new(),
            }),
        }
    }

    pub fn up_to_date() -> Self {
        Self::with_counts(0, 0)
    }

    pub fn behind(count: usize) -> Self {
        Self::with_counts(0, count)
    }

    pub fn ahead(count: usize) -> Self {
        Self::with_counts(count, 0)
    }

    pub fn diverged(ahead: usize, behind: usize) -> Self {
        Self::with_counts(ahead, behind)
    }

    fn edit(self, change: impl FnOnce(&mut State)) -> Self {
        change(&mut *self.state.lock().unwrap());
        self
    }

    pub fn with_fetch_failure(self) -> Self {
        self.edit(|s| s.fetch_fails = true)
    }

    pub fn with_merge_failures(self, count: usize) -> Self {
        self.edit(|s| s.merge_failures = count)
    }

    pub fn with_conflict(self, conflict: ConflictState) -> Self {
        self.edit(|s| s.conflict = conflict)
    }

    pub fn with_reset_failure(self) -> Self {
        self.edit(|s| s.reset_fails = true)
    }

    pub fn with_checkout_failure(self) -> Self {
        self.edit(|s| s.checkout_fails = true)
    }

    pub fn head(&self) -> String {
        self.state.lock().unwrap().head.clone()
    }

    pub fn remote_tip(&self) -> String {
        self.state.lock().unwrap().remote_tip.clone()
    }

    pub fn calls(&self) -> Vec<String> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }

    /// Calls that discard local state
    pub fn destructive_calls(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter(|call| call.starts_with("reset") || call == "clean" || call.starts_with("checkout"))
            .collect()
    }

    fn record(&self, call: impl Into<String>) -> std::sync::MutexGuard<'_, State> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call.into());
        state
    }
}

impl Vcs for FakeVcs {
    fn fetch(&self, _: &Path) -> CommandOutput {
        let state = self.record("fetch");
        if state.fetch_fails {
            CommandOutput::failed("fatal: unable to access 'https://github.com/': Could not resolve host")
        } else {
            CommandOutput::ok("")
        }
    }

    fn resolve_revision(&self, _: &Path, revision: &str) -> Option<String> {
        let state = self.state.lock().unwrap();
        match revision {
            "HEAD" => Some(state.head.clone()),
            other if other.starts_with("origin/") => Some(state.remote_tip.clone()),
            _ => None,
        }
    }

    fn count_ahead_behind(&self, _: &Path, _: &str, _: &str) -> Option<AheadBehind> {
        let state = self.state.lock().unwrap();
        Some(AheadBehind {
            ahead: state.ahead,
            behind: state.behind,
        })
    }

    fn merge_update(&self, _: &Path, branch: &str) -> CommandOutput {
        let mut state = self.record(format!("merge {branch}"));
        if state.merge_failures > 0 {
            state.merge_failures -= 1;
            return CommandOutput::failed("error: Merging is not possible because you have unmerged files.");
        }
        if state.ahead > 0 {
            return CommandOutput::failed("fatal: Not possible to fast-forward, aborting.");
        }
        state.head = state.remote_tip.clone();
        state.behind = 0;
        CommandOutput::ok("Fast-forward")
    }

    fn abort_merge(&self, _: &Path) -> CommandOutput {
        let mut state = self.record("abort-merge");
        if state.conflict.operation_in_progress.take().is_some() {
            CommandOutput::ok("")
        } else {
            CommandOutput::failed("fatal: There is no merge to abort (MERGE_HEAD missing).")
        }
    }

    fn hard_reset(&self, _: &Path, target: &str) -> CommandOutput {
        let mut state = self.record(format!("reset {target}"));
        if state.reset_fails {
            return CommandOutput::failed("fatal: Unable to create '.git/index.lock': File exists.");
        }
        state.head = state.remote_tip.clone();
        state.ahead = 0;
        state.behind = 0;
        state.conflict = ConflictState::default();
        CommandOutput::ok(format!("HEAD is now at {}", &state.remote_tip[..7]))
    }

    fn remove_untracked(&self, _: &Path) -> CommandOutput {
        drop(self.record("clean"));
        CommandOutput::ok("")
    }

    fn force_checkout(&self, _: &Path, branch: &str) -> CommandOutput {
        let state = self.record(format!("checkout {branch}"));
        if state.checkout_fails {
            CommandOutput::failed(format!("fatal: '{branch}' is not a commit"))
        } else {
            CommandOutput::ok(format!("Switched to branch '{branch}'"))
        }
    }

    fn conflict_state(&self, _: &Path, _: &str) -> ConflictState {
        self.state.lock().unwrap().conflict.clone()
    }

    fn set_remote_url(&self, _: &Path, url: &str) -> CommandOutput {
        drop(self.record(format!("set-url {url}")));
        CommandOutput::ok("")
    }
}
