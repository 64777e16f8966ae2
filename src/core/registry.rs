//! Keyed containers for the in-memory registry.
//!
//! Each scope guards its own map with a reader-writer lock and registers via
//! get-or-create: adding a name that already exists returns the existing
//! instance, never a duplicate. That makes concurrent, overlapping, or
//! repeated discovery by the scanner safe.

use crate::core::error::CodeError;
use crate::core::project::Project;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Name of the story projects belong to when no story is configured.
pub const BASE_STORY: &str = "base";

/// A named unit of work owning a set of projects keyed by import path.
pub struct Story {
    name: String,
    projects: RwLock<HashMap<String, Arc<Project>>>,
}

impl Story {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            projects: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Registers a project, returning the already-registered instance if the
    /// import path is taken.
    pub(crate) fn add_project(&self, project: Arc<Project>) -> Arc<Project> {
        let mut projects = self.projects.write().expect("story lock poisoned");
        Arc::clone(
            projects
                .entry(project.import_path().to_string())
                .or_insert(project),
        )
    }

    pub fn project(&self, import_path: &str) -> Result<Arc<Project>, CodeError> {
        let projects = self.projects.read().expect("story lock poisoned");
        projects
            .get(import_path)
            .cloned()
            .ok_or_else(|| CodeError::ProjectNotFound(import_path.to_string()))
    }

    /// Every project in this story; order is unspecified.
    pub fn projects(&self) -> Vec<Arc<Project>> {
        let projects = self.projects.read().expect("story lock poisoned");
        projects.values().cloned().collect()
    }
}

/// A top-level namespace under the workspace root, owning stories.
pub struct Profile {
    name: String,
    stories: RwLock<HashMap<String, Arc<Story>>>,
}

impl Profile {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stories: RwLock::new(HashMap::new()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Get-or-create a story by name.
    pub(crate) fn add_story(&self, name: &str) -> Arc<Story> {
        let mut stories = self.stories.write().expect("profile lock poisoned");
        Arc::clone(
            stories
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(Story::new(name))),
        )
    }

    pub fn story(&self, name: &str) -> Result<Arc<Story>, CodeError> {
        let stories = self.stories.read().expect("profile lock poisoned");
        stories
            .get(name)
            .cloned()
            .ok_or_else(|| CodeError::StoryNotFound(name.to_string()))
    }

    /// Every story in this profile; order is unspecified.
    pub fn stories(&self) -> Vec<Arc<Story>> {
        let stories = self.stories.read().expect("profile lock poisoned");
        stories.values().cloned().collect()
    }
}
