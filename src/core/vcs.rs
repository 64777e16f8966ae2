//! Version-control capability.
//!
//! The core never speaks the git protocol itself; cloning and branch
//! management are delegated here. `GitCli` is the production implementation
//! and shells out to `git`.

use crate::core::error::CodeError;
use std::path::Path;
use std::process::Command;

pub trait Vcs: Send + Sync {
    /// Clones `url` into `destination`.
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), CodeError>;

    /// Checks out an existing branch in the working copy at `path`.
    fn checkout(&self, path: &Path, branch: &str) -> Result<(), CodeError>;

    /// Returns true if `branch` exists in the repository at `path`.
    fn branch_exists(&self, path: &Path, branch: &str) -> bool;

    /// Creates `branch` at `start_point` in the repository at `path`.
    fn create_branch(&self, path: &Path, branch: &str, start_point: &str)
    -> Result<(), CodeError>;

    /// Returns the commit the current branch of `path` points at.
    fn current_branch_tip(&self, path: &Path) -> Result<String, CodeError>;
}

/// Drives the `git` binary found on PATH.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitCli;

impl GitCli {
    fn run(&self, args: &[&str]) -> Result<String, CodeError> {
        let output = Command::new("git").args(args).output()?;
        if !output.status.success() {
            return Err(CodeError::Vcs(format!(
                "git {} failed: {}",
                args.join(" "),
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

impl Vcs for GitCli {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), CodeError> {
        let dst = destination.to_string_lossy();
        self.run(&["clone", url, &dst]).map(|_| ())
    }

    fn checkout(&self, path: &Path, branch: &str) -> Result<(), CodeError> {
        let dir = path.to_string_lossy();
        self.run(&["-C", &dir, "checkout", branch]).map(|_| ())
    }

    fn branch_exists(&self, path: &Path, branch: &str) -> bool {
        let dir = path.to_string_lossy();
        let reference = format!("refs/heads/{branch}");
        Command::new("git")
            .args(["-C", &dir, "show-ref", "--verify", "--quiet", &reference])
            .status()
            .map(|s| s.success())
            .unwrap_or(false)
    }

    fn create_branch(
        &self,
        path: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), CodeError> {
        let dir = path.to_string_lossy();
        self.run(&["-C", &dir, "branch", branch, start_point])
            .map(|_| ())
    }

    fn current_branch_tip(&self, path: &Path) -> Result<String, CodeError> {
        let dir = path.to_string_lossy();
        self.run(&["-C", &dir, "rev-parse", "HEAD"])
    }
}
