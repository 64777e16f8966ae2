//! The leaf identity of the workspace: one canonical repository plus
//! zero-or-one per-story working copy.

use crate::core::error::CodeError;
use crate::core::fs::Filesystem;
use crate::core::github::{GithubClient, PullRequest};
use crate::core::import_path;
use crate::core::vcs::Vcs;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// A project keyed by its import path. Instances are shared: the registry
/// hands out the same `Arc<Project>` to every query.
///
/// The story context is inherited from the owning workspace root at creation
/// time and never changes afterwards, nor does the import path.
pub struct Project {
    import_path: String,
    root: PathBuf,
    story_name: Option<String>,
    story_branch_name: Option<String>,
    fs: Arc<dyn Filesystem>,
    vcs: Arc<dyn Vcs>,
    github: Arc<dyn GithubClient>,
}

impl Project {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        import_path: impl Into<String>,
        root: impl Into<PathBuf>,
        story_name: Option<String>,
        story_branch_name: Option<String>,
        fs: Arc<dyn Filesystem>,
        vcs: Arc<dyn Vcs>,
        github: Arc<dyn GithubClient>,
    ) -> Self {
        Self {
            import_path: import_path.into(),
            root: root.into(),
            story_name,
            story_branch_name,
            fs,
            vcs,
            github,
        }
    }

    pub fn import_path(&self) -> &str {
        &self.import_path
    }

    pub fn story_name(&self) -> Option<&str> {
        self.story_name.as_deref()
    }

    /// The branch a story working copy is kept on. Falls back to the story
    /// name when no explicit branch name was configured.
    pub fn story_branch_name(&self) -> Option<&str> {
        self.story_branch_name.as_deref().or(self.story_name())
    }

    /// Location of the canonical clone: `<root>/repositories/<import_path>`.
    pub fn repository_path(&self) -> PathBuf {
        self.root.join("repositories").join(&self.import_path)
    }

    /// Location of the story working copy:
    /// `<root>/stories/<story>/<import_path>`. Errors when the workspace has
    /// no story configured.
    pub fn story_path(&self) -> Result<PathBuf, CodeError> {
        let story = self
            .story_name
            .as_deref()
            .ok_or_else(|| CodeError::NoStory(self.import_path.clone()))?;
        Ok(self.root.join("stories").join(story).join(&self.import_path))
    }

    /// Materializes the story working copy from the canonical repository if
    /// it does not already exist. Idempotent: an already-materialized story
    /// path is a no-op success.
    ///
    /// If the story branch does not yet exist in the working copy it is
    /// created from the canonical branch tip, then checked out. VCS failures
    /// surface unwrapped; a partially materialized path is not rolled back.
    pub fn ensure(&self) -> Result<(), CodeError> {
        let story = self.story_path()?;
        if self.story_materialized(&story)? {
            return Ok(());
        }

        let canonical = self.repository_path();
        if let Some(parent) = story.parent() {
            self.fs.mkdir_all(parent)?;
        }
        debug!(import_path = %self.import_path, story = ?story, "materializing story working copy");
        self.vcs
            .clone_repository(&canonical.to_string_lossy(), &story)?;

        if let Some(branch) = self.story_branch_name() {
            if !self.vcs.branch_exists(&story, branch) {
                let tip = self.vcs.current_branch_tip(&canonical)?;
                self.vcs.create_branch(&story, branch, &tip)?;
            }
            self.vcs.checkout(&story, branch)?;
        }
        Ok(())
    }

    /// Links the canonical clone into the story directory without a working
    /// copy of its own. Used for projects that a story touches read-only.
    pub fn link_into_story(&self) -> Result<(), CodeError> {
        let story = self.story_path()?;
        if self.story_materialized(&story)? {
            return Ok(());
        }
        if let Some(parent) = story.parent() {
            self.fs.mkdir_all(parent)?;
        }
        self.fs.symlink_or_copy(&self.repository_path(), &story)?;
        Ok(())
    }

    /// Whether the story path is already materialized. A missing path means
    /// "not yet"; any other stat failure surfaces rather than risking a
    /// clone into a directory we cannot inspect.
    fn story_materialized(&self, story: &Path) -> Result<bool, CodeError> {
        match self.fs.is_dir(story) {
            Ok(is_dir) => Ok(is_dir),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    /// Lists open pull requests for this project, keyed by its import path.
    pub fn list_pull_requests(&self) -> Result<Vec<PullRequest>, CodeError> {
        let (_, owner, repo) = import_path::components(&self.import_path)
            .ok_or_else(|| CodeError::ProjectNotFound(self.import_path.clone()))?;
        self.github.list_pull_requests(owner, repo)
    }
}

impl fmt::Display for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.import_path)
    }
}

impl fmt::Debug for Project {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Project")
            .field("import_path", &self.import_path)
            .field("root", &self.root)
            .field("story_name", &self.story_name)
            .finish()
    }
}
