//! storied: local checkouts organized under one workspace root.
//!
//! A workspace root keeps one canonical clone per project under
//! `repositories/<host>/<owner>/<repo>` and isolated per-story working copies
//! under `stories/<story>/<host>/<owner>/<repo>`. The crate scans the root,
//! builds an in-memory registry keyed by import path, resolves filesystem
//! locations back to projects, and clones new projects into place.
//!
//! Nothing is persisted between runs; every invocation re-scans the root.
//!
//! # Layout
//!
//! - [`core::code::Code`]: the workspace root façade (scan, clone, resolve)
//! - [`core::project::Project`]: one project identity and its paths
//! - [`core::registry`]: profile/story grouping over shared projects
//! - [`core::fs`] / [`core::vcs`] / [`core::github`]: injected capabilities
//! - [`cli`]: the command-line surface
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use storied::core::code::Code;
//! use storied::core::fs::OsFilesystem;
//! use storied::core::github::GhCli;
//! use storied::core::vcs::GitCli;
//!
//! let code = Code::new(
//!     "/home/dev/code",
//!     None,
//!     Arc::new(OsFilesystem),
//!     Arc::new(GitCli),
//!     Arc::new(GhCli),
//! );
//! code.scan()?;
//! let project = code.get_project_by_relative_path("github.com/owner/repo")?;
//! println!("{}", project.repository_path().display());
//! # Ok::<(), storied::core::error::CodeError>(())
//! ```

pub mod cli;
pub mod core;
