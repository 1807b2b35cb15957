//! Parsing of user-supplied repository references

use regex::Regex;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;

static GITHUB_URL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://github\.com/([^/]+)/([^/]+?)(?:\.git)?(?:/.*)?$")
        .expect("valid repository URL pattern")
});

static OWNER_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^([^/\s]+)/([^/\s]+)$").expect("valid owner/name pattern"));

#[derive(Debug, Error, PartialEq, Eq)]
#[error("'{0}' is not a repository reference (expected owner/repo or https://github.com/owner/repo)")]
pub struct InvalidRepoInput(pub String);

/// `<owner>/<name>` pair identifying a tracked repository
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RepoId {
    pub owner: String,
    pub name: String,
}

impl fmt::Display for RepoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// Accepts `owner/repo`, `https://github.com/owner/repo`, a `.git` suffix,
/// and URLs with trailing path segments (`/tree/main`, ...)
pub fn parse_repo_input(input: &str) -> Result<RepoId, InvalidRepoInput> {
    let input = input.trim();

    let captures = GITHUB_URL
        .captures(input)
        .or_else(|| OWNER_NAME.captures(input))
        .ok_or_else(|| InvalidRepoInput(input.to_string()))?;

    let name = captures[2].trim_end_matches(".git");
    if name.is_empty() {
        return Err(InvalidRepoInput(input.to_string()));
    }

    Ok(RepoId {
        owner: captures[1].to_string(),
        name: name.to_string(),
    })
}
