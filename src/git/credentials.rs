//! Token injection for network operations.
//!
//! The token lives in `origin`'s URL only while a fetch is running: the
//! [`CredentialScope`] guard writes the authenticated URL and restores the
//! clean one when it is dropped.

use std::fmt;
use std::path::Path;

use super::{CommandOutput, Vcs};

#[derive(Clone, Default)]
pub struct RemoteAuth {
    token: Option<String>,
    host: String,
}

impl fmt::Debug for RemoteAuth {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RemoteAuth")
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("host", &self.host)
            .finish()
    }
}

impl RemoteAuth {
    pub fn new(token: Option<&str>, host: impl Into<String>) -> Self {
        Self {
            token: token
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .map(str::to_string),
            host: host.into(),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn has_token(&self) -> bool {
        self.token.is_some()
    }

    /// `https://<host>/<identity>.git`
    pub fn clean_url(&self, identity: &str) -> String {
        format!("https://{}/{}.git", self.host, identity)
    }

    fn authenticated_url(&self, token: &str, identity: &str) -> String {
        format!("https://{}@{}/{}.git", token, self.host, identity)
    }

    /// Install the token for `identity`'s clone. `None` when there is no
    /// token or the URL could not be changed.
    pub fn scope<'a>(
        &self,
        vcs: &'a dyn Vcs,
        workdir: &'a Path,
        identity: &str,
    ) -> Option<CredentialScope<'a>> {
        let token = self.token.as_deref()?;

        let result = vcs.set_remote_url(workdir, &self.authenticated_url(token, identity));
        if !result.success {
            tracing::warn!("Could not set authenticated remote for {}: {}", identity, result.output);
            return None;
        }

        Some(CredentialScope {
            vcs,
            workdir,
            clean_url: self.clean_url(identity),
        })
    }

    /// `git fetch` with the token installed for exactly its duration
    pub fn fetch(&self, vcs: &dyn Vcs, workdir: &Path, identity: &str) -> CommandOutput {
        let _scope = self.scope(vcs, workdir, identity);
        vcs.fetch(workdir)
    }
}

/// Restores the clean `origin` URL on drop
pub struct CredentialScope<'a> {
    vcs: &'a dyn Vcs,
    workdir: &'a Path,
    clean_url: String,
}

impl Drop for CredentialScope<'_> {
    fn drop(&mut self) {
        let result = self.vcs.set_remote_url(self.workdir, &self.clean_url);
        if !result.success {
            tracing::error!(
                "Failed to remove token from origin URL in {}: {}",
                self.workdir.display(),
                result.output
            );
        }
    }
}
