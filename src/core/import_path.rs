//! Derives an import path from a clone URL.
//!
//! An import path is the `host/owner/repo`-shaped string that names a project
//! inside the workspace, mirroring its remote location. Examples:
//!
//! - `https://github.com/owner/repo.git` -> `github.com/owner/repo`
//! - `git@github.com:owner/repo.git`     -> `github.com/owner/repo`
//! - `file:///tmp/mirror/github.com/owner/repo` -> `github.com/owner/repo`

use crate::core::error::CodeError;

/// Parses `url` into an import path, or `CodeError::InvalidUrl` if the URL
/// cannot be normalized into the `host/owner/repo` shape.
pub fn from_url(url: &str) -> Result<String, CodeError> {
    let invalid = || CodeError::InvalidUrl(url.to_string());
    let trimmed = url.trim();
    if trimmed.is_empty() {
        return Err(invalid());
    }
    let trimmed = trimmed.strip_suffix(".git").unwrap_or(trimmed);

    if let Some((scheme, rest)) = trimmed.split_once("://") {
        if scheme.is_empty() || !scheme.chars().all(|c| c.is_ascii_alphanumeric() || c == '+') {
            return Err(invalid());
        }
        let (authority, path) = rest.split_once('/').unwrap_or((rest, ""));
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if authority.is_empty() {
            // Scheme without an authority, e.g. file:///path/to/a/mirror.
            // The trailing three path segments must themselves form an
            // import path.
            return join_shaped(segments.iter().rev().take(3).rev().copied()).ok_or_else(invalid);
        }
        // Drop userinfo and port from the authority.
        let host = authority.rsplit('@').next().unwrap_or(authority);
        let host = host.split(':').next().unwrap_or(host);
        if segments.len() < 2 {
            return Err(invalid());
        }
        return join_shaped([host, segments[0], segments[1]].into_iter()).ok_or_else(invalid);
    }

    // scp-like syntax: user@host:owner/repo
    if let Some((userhost, path)) = trimmed.split_once(':') {
        let host = userhost.rsplit('@').next().unwrap_or(userhost);
        let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
        if segments.len() != 2 {
            return Err(invalid());
        }
        return join_shaped([host, segments[0], segments[1]].into_iter()).ok_or_else(invalid);
    }

    Err(invalid())
}

/// Returns true for a segment that can stand in the host position: a dotted
/// hostname such as `github.com`, but not a hidden directory like
/// `.snapshots`.
pub fn host_shaped(segment: &str) -> bool {
    !segment.starts_with('.')
        && !segment.ends_with('.')
        && segment.contains('.')
        && segment
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '-')
}

/// Returns true for an owner or repo segment.
fn name_shaped(segment: &str) -> bool {
    !segment.is_empty() && segment != "." && segment != ".."
}

fn join_shaped<'a>(segments: impl Iterator<Item = &'a str>) -> Option<String> {
    let parts: Vec<&str> = segments.collect();
    match parts.as_slice() {
        [host, owner, repo] if host_shaped(host) && name_shaped(owner) && name_shaped(repo) => {
            Some(format!("{host}/{owner}/{repo}"))
        }
        _ => None,
    }
}

/// Splits an import path into its `(host, owner, repo)` components.
pub fn components(import_path: &str) -> Option<(&str, &str, &str)> {
    let mut it = import_path.split('/');
    match (it.next(), it.next(), it.next(), it.next()) {
        (Some(host), Some(owner), Some(repo), None) => Some((host, owner, repo)),
        _ => None,
    }
}
