//! The workspace root: scanner, registry, resolver, and clone logic.
//!
//! `Code` composes the injected capabilities with the keyed registry and is
//! the only surface collaborators talk to. The on-disk convention it scans
//! and re-derives on every run:
//!
//! ```text
//! <root>/repositories/<host>/<owner>/<repo>         canonical clone
//! <root>/stories/<story>/<host>/<owner>/<repo>      per-story working copy
//! ```

use crate::core::error::CodeError;
use crate::core::fs::{DirEntry, Filesystem};
use crate::core::github::GithubClient;
use crate::core::import_path;
use crate::core::project::Project;
use crate::core::registry::{BASE_STORY, Profile, Story};
use crate::core::vcs::Vcs;
use rayon::prelude::*;
use regex::Regex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tracing::{debug, info, warn};

/// Directory under the root holding canonical clones.
pub const REPOSITORIES_DIR: &str = "repositories";
/// Directory under the root holding story working copies.
pub const STORIES_DIR: &str = "stories";

/// A workspace root.
///
/// Constructed empty; `scan` must run before any query succeeds. The flat
/// import-path map is the authoritative registry (import paths are unique per
/// workspace); profiles and stories group the same shared instances.
pub struct Code {
    path: PathBuf,
    exclude_pattern: Option<Regex>,
    story_name: Option<String>,
    story_branch_name: Option<String>,
    scanned: AtomicBool,
    projects: RwLock<HashMap<String, Arc<Project>>>,
    profiles: RwLock<HashMap<String, Arc<Profile>>>,
    fs: Arc<dyn Filesystem>,
    vcs: Arc<dyn Vcs>,
    github: Arc<dyn GithubClient>,
}

impl Code {
    pub fn new(
        path: impl Into<PathBuf>,
        exclude_pattern: Option<Regex>,
        fs: Arc<dyn Filesystem>,
        vcs: Arc<dyn Vcs>,
        github: Arc<dyn GithubClient>,
    ) -> Self {
        Self {
            path: path.into(),
            exclude_pattern,
            story_name: None,
            story_branch_name: None,
            scanned: AtomicBool::new(false),
            projects: RwLock::new(HashMap::new()),
            profiles: RwLock::new(HashMap::new()),
            fs,
            vcs,
            github,
        }
    }

    /// The absolute path of this workspace root.
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn repositories_dir(&self) -> PathBuf {
        self.path.join(REPOSITORIES_DIR)
    }

    pub fn stories_dir(&self) -> PathBuf {
        self.path.join(STORIES_DIR)
    }

    /// Sets the story context reported by new and resolved projects. Takes
    /// effect for projects registered after the call; set it before `scan`.
    pub fn set_story_name(&mut self, name: impl Into<String>) {
        self.story_name = Some(name.into());
    }

    pub fn set_story_branch_name(&mut self, branch: impl Into<String>) {
        self.story_branch_name = Some(branch.into());
    }

    pub fn story_name(&self) -> Option<&str> {
        self.story_name.as_deref()
    }

    /// The branch story working copies are kept on; falls back to the story
    /// name when no explicit branch was configured.
    pub fn story_branch_name(&self) -> Option<&str> {
        self.story_branch_name.as_deref().or(self.story_name())
    }

    /// Walks the workspace root and populates the registry.
    ///
    /// Fails with `CodePathEmpty` before any traversal if the root is empty
    /// or missing. Every other failure is per-namespace: logged, skipped, and
    /// never fatal, so a partially unreadable workspace still yields its
    /// recoverable fraction. Each top-level namespace is scanned as an
    /// independent task; the call returns once all of them joined. Repeat
    /// scans are idempotent merges.
    pub fn scan(&self) -> Result<(), CodeError> {
        self.validate()?;
        self.scanned.store(true, Ordering::Release);

        let entries = match self.fs.read_dir(&self.path) {
            Ok(entries) => entries,
            Err(err) => {
                warn!(path = ?self.path, %err, "error reading the workspace root");
                return Ok(());
            }
        };
        // `stories/` holds working copies of already-registered projects; a
        // story named like a hostname would otherwise register spurious
        // import paths.
        let namespaces: Vec<String> = entries
            .into_iter()
            .filter(|e| e.is_dir && e.name != STORIES_DIR && !self.excluded(&e.name))
            .map(|e| e.name)
            .collect();

        namespaces.par_iter().for_each(|name| {
            debug!(namespace = %name, "scanning namespace");
            self.scan_namespace(name);
        });
        Ok(())
    }

    fn validate(&self) -> Result<(), CodeError> {
        if self.path.as_os_str().is_empty() {
            return Err(CodeError::CodePathEmpty);
        }
        match self.fs.is_dir(&self.path) {
            Ok(true) => Ok(()),
            _ => Err(CodeError::CodePathEmpty),
        }
    }

    fn excluded(&self, name: &str) -> bool {
        self.exclude_pattern
            .as_ref()
            .is_some_and(|re| re.is_match(name))
    }

    /// Scans one top-level namespace for `host/owner/repo`-shaped leaves.
    fn scan_namespace(&self, namespace: &str) {
        let profile = self.add_profile(namespace);
        let story = profile.add_story(self.story_name().unwrap_or(BASE_STORY));

        let root = self.path.join(namespace);
        for host in self.subdirectories(&root) {
            if !import_path::host_shaped(&host.name) {
                continue;
            }
            for owner in self.subdirectories(&root.join(&host.name)) {
                for repo in self.subdirectories(&root.join(&host.name).join(&owner.name)) {
                    let import_path = format!("{}/{}/{}", host.name, owner.name, repo.name);
                    debug!(%import_path, namespace, "found project");
                    self.add_project(&story, &import_path);
                }
            }
        }
    }

    /// The non-excluded directory entries of `path`. Read failures are
    /// logged and yield an empty list, per the best-effort scan policy.
    fn subdirectories(&self, path: &Path) -> Vec<DirEntry> {
        match self.fs.read_dir(path) {
            Ok(entries) => entries
                .into_iter()
                .filter(|e| e.is_dir && !self.excluded(&e.name))
                .collect(),
            Err(err) => {
                warn!(path = ?path, %err, "error reading the directory, skipping");
                Vec::new()
            }
        }
    }

    /// Get-or-create a profile by name.
    fn add_profile(&self, name: &str) -> Arc<Profile> {
        let mut profiles = self.profiles.write().expect("profile lock poisoned");
        Arc::clone(
            profiles
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Profile::new(name))),
        )
    }

    /// Get-or-create a project in the flat map, then register it with the
    /// story. The write lock covers only the map mutation.
    fn add_project(&self, story: &Story, import_path: &str) -> Arc<Project> {
        let project = {
            let mut projects = self.projects.write().expect("project lock poisoned");
            Arc::clone(projects.entry(import_path.to_string()).or_insert_with(|| {
                Arc::new(Project::new(
                    import_path,
                    self.path.clone(),
                    self.story_name.clone(),
                    self.story_branch_name.clone(),
                    Arc::clone(&self.fs),
                    Arc::clone(&self.vcs),
                    Arc::clone(&self.github),
                ))
            }))
        };
        story.add_project(Arc::clone(&project));
        project
    }

    fn ensure_scanned(&self) -> Result<(), CodeError> {
        if self.scanned.load(Ordering::Acquire) {
            Ok(())
        } else {
            Err(CodeError::NotScanned)
        }
    }

    /// Exact-name profile lookup.
    pub fn profile(&self, name: &str) -> Result<Arc<Profile>, CodeError> {
        self.ensure_scanned()?;
        let profiles = self.profiles.read().expect("profile lock poisoned");
        profiles
            .get(name)
            .cloned()
            .ok_or_else(|| CodeError::ProfileNotFound(name.to_string()))
    }

    /// Exact-key lookup of an import path.
    pub fn get_project_by_relative_path(&self, p: &str) -> Result<Arc<Project>, CodeError> {
        self.ensure_scanned()?;
        let projects = self.projects.read().expect("project lock poisoned");
        projects
            .get(p)
            .cloned()
            .ok_or_else(|| CodeError::ProjectNotFound(p.to_string()))
    }

    /// Resolves an absolute path under `<root>/repositories` back to its
    /// project. The residual path must match a registered import path
    /// exactly: a path deeper inside a project's tree, or outside the
    /// repositories root, is an error, not a prefix match.
    pub fn get_project_by_absolute_path(&self, p: &str) -> Result<Arc<Project>, CodeError> {
        self.ensure_scanned()?;
        let relative = Path::new(p)
            .strip_prefix(self.repositories_dir())
            .map_err(|_| CodeError::ProjectNotFound(p.to_string()))?;
        let relative = relative
            .to_str()
            .ok_or_else(|| CodeError::ProjectNotFound(p.to_string()))?;
        self.get_project_by_relative_path(relative)
            .map_err(|_| CodeError::ProjectNotFound(p.to_string()))
    }

    /// Every registered project across all namespaces; order is unspecified,
    /// callers needing determinism sort by import path.
    pub fn projects(&self) -> Result<Vec<Arc<Project>>, CodeError> {
        self.ensure_scanned()?;
        let projects = self.projects.read().expect("project lock poisoned");
        Ok(projects.values().cloned().collect())
    }

    /// Clones `url` into the workspace and registers the new project exactly
    /// as the scanner would, making it visible to queries without a re-scan.
    ///
    /// Fails with `InvalidUrl` when no import path can be derived and with
    /// `ProjectAlreadyExists` (before any filesystem action) when the import
    /// path is taken. The clone itself runs outside the registry lock.
    pub fn clone_project(&self, url: &str) -> Result<Arc<Project>, CodeError> {
        self.ensure_scanned()?;
        let import_path = import_path::from_url(url)?;
        {
            let projects = self.projects.read().expect("project lock poisoned");
            if projects.contains_key(&import_path) {
                return Err(CodeError::ProjectAlreadyExists(import_path));
            }
        }

        let destination = self.repositories_dir().join(&import_path);
        info!(%url, %import_path, "cloning new project");
        self.vcs.clone_repository(url, &destination)?;

        let profile = self.add_profile(REPOSITORIES_DIR);
        let story = profile.add_story(self.story_name().unwrap_or(BASE_STORY));
        Ok(self.add_project(&story, &import_path))
    }
}
