//! GitHub capability used by `Project::list_pull_requests`.
//!
//! The core only supplies the `owner/repo` lookup key; the heavy lifting is
//! delegated to the `gh` CLI, whose `--json` output is parsed here.

use crate::core::error::CodeError;
use serde::{Deserialize, Serialize};
use std::process::Command;

/// An open pull request as reported by GitHub.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PullRequest {
    pub number: u64,
    pub title: String,
    pub url: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
}

pub trait GithubClient: Send + Sync {
    fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, CodeError>;
}

/// Drives the `gh` binary found on PATH. Authentication is whatever `gh`
/// itself is configured with; the core never handles tokens.
#[derive(Debug, Default, Clone, Copy)]
pub struct GhCli;

impl GithubClient for GhCli {
    fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, CodeError> {
        let slug = format!("{owner}/{repo}");
        let output = Command::new("gh")
            .args([
                "pr",
                "list",
                "--repo",
                &slug,
                "--state",
                "open",
                "--json",
                "number,title,url,createdAt",
            ])
            .output()?;
        if !output.status.success() {
            return Err(CodeError::Github(format!(
                "gh pr list --repo {} failed: {}",
                slug,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        serde_json::from_slice(&output.stdout)
            .map_err(|e| CodeError::Github(format!("unexpected gh output: {e}")))
    }
}
