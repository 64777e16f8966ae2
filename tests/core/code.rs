use regex::Regex;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use storied::core::code::Code;
use storied::core::error::CodeError;
use storied::core::fs::{DirEntry, Filesystem, OsFilesystem};
use storied::core::github::{GithubClient, PullRequest};
use storied::core::vcs::Vcs;
use tempfile::tempdir;

/// Delegates to the real filesystem but denies access to configured paths,
/// standing in for a workspace with unreadable corners.
#[derive(Default)]
struct FailingFs {
    deny_read_dir: Option<PathBuf>,
    deny_is_dir: Option<PathBuf>,
}

impl FailingFs {
    fn denied<T>(&self) -> io::Result<T> {
        Err(io::Error::new(io::ErrorKind::PermissionDenied, "denied"))
    }
}

impl Filesystem for FailingFs {
    fn is_dir(&self, path: &Path) -> io::Result<bool> {
        if self.deny_is_dir.as_deref() == Some(path) {
            return self.denied();
        }
        OsFilesystem.is_dir(path)
    }

    fn read_dir(&self, path: &Path) -> io::Result<Vec<DirEntry>> {
        if self.deny_read_dir.as_deref() == Some(path) {
            return self.denied();
        }
        OsFilesystem.read_dir(path)
    }

    fn mkdir_all(&self, path: &Path) -> io::Result<()> {
        OsFilesystem.mkdir_all(path)
    }

    fn symlink_or_copy(&self, src: &Path, dst: &Path) -> io::Result<()> {
        OsFilesystem.symlink_or_copy(src, dst)
    }
}

/// Records every mutating call and materializes clone destinations on disk,
/// so `ensure` idempotence is observable without a git binary.
#[derive(Default)]
struct MockVcs {
    calls: Mutex<Vec<String>>,
}

impl MockVcs {
    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("calls lock").clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().expect("calls lock").push(call);
    }
}

impl Vcs for MockVcs {
    fn clone_repository(&self, url: &str, destination: &Path) -> Result<(), CodeError> {
        fs::create_dir_all(destination)?;
        self.record(format!("clone {url}"));
        Ok(())
    }

    fn checkout(&self, _path: &Path, branch: &str) -> Result<(), CodeError> {
        self.record(format!("checkout {branch}"));
        Ok(())
    }

    fn branch_exists(&self, _path: &Path, _branch: &str) -> bool {
        false
    }

    fn create_branch(
        &self,
        _path: &Path,
        branch: &str,
        start_point: &str,
    ) -> Result<(), CodeError> {
        self.record(format!("branch {branch} {start_point}"));
        Ok(())
    }

    fn current_branch_tip(&self, _path: &Path) -> Result<String, CodeError> {
        Ok("deadbeef".to_string())
    }
}

struct MockGithub;

impl GithubClient for MockGithub {
    fn list_pull_requests(&self, owner: &str, repo: &str) -> Result<Vec<PullRequest>, CodeError> {
        Ok(vec![PullRequest {
            number: 42,
            title: format!("PR for {owner}/{repo}"),
            url: format!("https://github.com/{owner}/{repo}/pull/42"),
            created_at: "2026-01-02T03:04:05Z".to_string(),
        }])
    }
}

const IMPORT_PATHS: [&str; 3] = [
    "github.com/owner1/repo1",
    "github.com/owner2/repo2",
    "github.com/owner3/repo3",
];

/// Lays out the canonical fixture workspace: three projects under
/// `repositories/` plus a fourth hidden inside the excluded `.snapshots/`.
fn create_projects(root: &Path) {
    for import_path in IMPORT_PATHS {
        fs::create_dir_all(root.join("repositories").join(import_path)).expect("fixture dirs");
    }
    fs::create_dir_all(root.join(".snapshots/github.com/owner4/repo4")).expect("fixture dirs");
}

fn new_code(root: &Path, story_name: Option<&str>) -> (Code, Arc<MockVcs>) {
    let vcs = Arc::new(MockVcs::default());
    let mut code = Code::new(
        root,
        Some(Regex::new(r"^\.snapshots$").expect("pattern")),
        Arc::new(OsFilesystem),
        vcs.clone(),
        Arc::new(MockGithub),
    );
    if let Some(story) = story_name {
        code.set_story_name(story);
    }
    (code, vcs)
}

fn sorted_import_paths(code: &Code) -> Vec<String> {
    let mut paths: Vec<String> = code
        .projects()
        .expect("projects")
        .iter()
        .map(|p| p.import_path().to_string())
        .collect();
    paths.sort();
    paths
}

#[test]
fn scan_discovers_projects_and_derives_paths() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    assert_eq!(sorted_import_paths(&code), IMPORT_PATHS);
    for import_path in IMPORT_PATHS {
        let project = code
            .get_project_by_relative_path(import_path)
            .expect("lookup");
        assert_eq!(project.to_string(), import_path);
        assert_eq!(
            project.repository_path(),
            tmp.path().join("repositories").join(import_path)
        );
        // no story configured, so no story path
        assert!(matches!(project.story_path(), Err(CodeError::NoStory(_))));
    }
}

#[test]
fn excluded_directories_contribute_no_projects() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    assert_eq!(code.projects().expect("projects").len(), 3);
    assert!(matches!(
        code.get_project_by_relative_path("github.com/owner4/repo4"),
        Err(CodeError::ProjectNotFound(_))
    ));
}

#[test]
fn lookups_return_the_registered_instance() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let from_lookup = code
        .get_project_by_relative_path("github.com/owner1/repo1")
        .expect("lookup");
    let from_all = code
        .projects()
        .expect("projects")
        .into_iter()
        .find(|p| p.import_path() == "github.com/owner1/repo1")
        .expect("present");
    assert!(Arc::ptr_eq(&from_lookup, &from_all));
}

#[test]
fn rescan_is_an_idempotent_merge() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");
    let before = code
        .get_project_by_relative_path("github.com/owner1/repo1")
        .expect("lookup");

    code.scan().expect("second scan");
    assert_eq!(code.projects().expect("projects").len(), 3);
    let after = code
        .get_project_by_relative_path("github.com/owner1/repo1")
        .expect("lookup");
    assert!(Arc::ptr_eq(&before, &after));
}

#[test]
fn scan_skips_unreadable_namespaces() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());
    fs::create_dir_all(tmp.path().join("mirrors/github.com/owner5/repo5")).expect("fixture dirs");

    let fs_cap = FailingFs {
        deny_read_dir: Some(tmp.path().join("mirrors")),
        ..FailingFs::default()
    };
    let code = Code::new(
        tmp.path(),
        Some(Regex::new(r"^\.snapshots$").expect("pattern")),
        Arc::new(fs_cap),
        Arc::new(MockVcs::default()),
        Arc::new(MockGithub),
    );

    // the unreadable namespace is skipped, everything readable survives
    code.scan().expect("scan");
    assert_eq!(sorted_import_paths(&code), IMPORT_PATHS);
    assert!(matches!(
        code.get_project_by_relative_path("github.com/owner5/repo5"),
        Err(CodeError::ProjectNotFound(_))
    ));
}

#[test]
fn stories_directory_is_never_a_namespace() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());
    // a story named like a hostname must not yield import paths of its own
    fs::create_dir_all(tmp.path().join("stories/v1.2/github.com/owner1/repo1"))
        .expect("fixture dirs");

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    assert_eq!(sorted_import_paths(&code), IMPORT_PATHS);
    assert!(matches!(
        code.get_project_by_relative_path("v1.2/github.com/owner1"),
        Err(CodeError::ProjectNotFound(_))
    ));
    assert!(matches!(
        code.profile("stories"),
        Err(CodeError::ProfileNotFound(_))
    ));
}

#[test]
fn absolute_path_resolution_is_exact() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    for import_path in ["github.com/owner1/repo1", "github.com/owner2/repo2"] {
        let abs = tmp.path().join("repositories").join(import_path);
        let project = code
            .get_project_by_absolute_path(&abs.to_string_lossy())
            .expect("resolve");
        assert_eq!(project.import_path(), import_path);
    }

    // outside the repositories root
    assert!(
        code.get_project_by_absolute_path("/code/not-existing/base")
            .is_err()
    );
    // not a registered import path
    let unregistered = tmp.path().join("repositories/github.com/user/repo");
    assert!(
        code.get_project_by_absolute_path(&unregistered.to_string_lossy())
            .is_err()
    );
    // inside a project's tree, beyond the import-path boundary
    let inside = tmp.path().join("repositories/github.com/owner1/repo1/src");
    assert!(
        code.get_project_by_absolute_path(&inside.to_string_lossy())
            .is_err()
    );
}

#[test]
fn queries_before_scan_fail_with_not_scanned() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    assert!(matches!(code.projects(), Err(CodeError::NotScanned)));
    assert!(matches!(
        code.get_project_by_relative_path("github.com/owner1/repo1"),
        Err(CodeError::NotScanned)
    ));
    assert!(matches!(
        code.get_project_by_absolute_path("/anywhere"),
        Err(CodeError::NotScanned)
    ));
    assert!(matches!(
        code.clone_project("https://github.com/owner9/repo9"),
        Err(CodeError::NotScanned)
    ));
}

#[test]
fn profiles_group_scanned_projects() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let profile = code.profile("repositories").expect("profile");
    assert_eq!(profile.name(), "repositories");
    let story = profile.story("base").expect("base story");
    assert_eq!(story.projects().len(), 3);

    assert!(matches!(
        code.profile("missing"),
        Err(CodeError::ProfileNotFound(_))
    ));
    assert!(matches!(
        profile.story("STORY-999"),
        Err(CodeError::StoryNotFound(_))
    ));
}

#[test]
fn clone_registers_the_new_project() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, vcs) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let url = format!(
        "file://{}",
        tmp.path().join(".snapshots/github.com/owner4/repo4").display()
    );
    let project = code.clone_project(&url).expect("clone");

    assert_eq!(project.import_path(), "github.com/owner4/repo4");
    assert_eq!(
        project.repository_path(),
        tmp.path().join("repositories/github.com/owner4/repo4")
    );
    assert_eq!(vcs.calls(), vec![format!("clone {url}")]);

    // visible to queries without a re-scan
    let resolved = code
        .get_project_by_relative_path("github.com/owner4/repo4")
        .expect("lookup after clone");
    assert!(Arc::ptr_eq(&project, &resolved));
    assert_eq!(code.projects().expect("projects").len(), 4);
}

#[test]
fn clone_of_a_registered_project_changes_nothing() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, vcs) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let err = code
        .clone_project("https://github.com/owner1/repo1")
        .expect_err("duplicate clone");
    assert!(matches!(err, CodeError::ProjectAlreadyExists(_)));
    assert!(vcs.calls().is_empty());
    assert_eq!(code.projects().expect("projects").len(), 3);
}

#[test]
fn clone_with_a_malformed_url_does_nothing() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, vcs) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let err = code.clone_project("not a url").expect_err("invalid url");
    assert!(matches!(err, CodeError::InvalidUrl(_)));
    assert!(vcs.calls().is_empty());
    assert_eq!(code.projects().expect("projects").len(), 3);
}

#[test]
fn story_context_flows_into_scanned_projects() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), Some("STORY-123"));
    code.scan().expect("scan");

    for import_path in IMPORT_PATHS {
        let project = code
            .get_project_by_relative_path(import_path)
            .expect("lookup");
        assert_eq!(
            project.story_path().expect("story path"),
            tmp.path().join("stories/STORY-123").join(import_path)
        );
        assert_eq!(project.story_branch_name(), Some("STORY-123"));
    }

    let profile = code.profile("repositories").expect("profile");
    assert!(profile.story("STORY-123").is_ok());
}

#[test]
fn ensure_materializes_the_story_once() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, vcs) = new_code(tmp.path(), Some("STORY-123"));
    code.scan().expect("scan");

    let project = code
        .get_project_by_relative_path("github.com/owner1/repo1")
        .expect("lookup");
    project.ensure().expect("ensure");

    let story_path = tmp.path().join("stories/STORY-123/github.com/owner1/repo1");
    assert!(story_path.is_dir());
    let canonical = tmp.path().join("repositories/github.com/owner1/repo1");
    assert_eq!(
        vcs.calls(),
        vec![
            format!("clone {}", canonical.display()),
            "branch STORY-123 deadbeef".to_string(),
            "checkout STORY-123".to_string(),
        ]
    );

    // already materialized: a no-op success
    project.ensure().expect("second ensure");
    assert_eq!(vcs.calls().len(), 3);
}

#[test]
fn ensure_surfaces_stat_failures_instead_of_cloning() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let story_path = tmp.path().join("stories/STORY-123/github.com/owner1/repo1");
    let fs_cap = FailingFs {
        deny_is_dir: Some(story_path),
        ..FailingFs::default()
    };
    let vcs = Arc::new(MockVcs::default());
    let mut code = Code::new(
        tmp.path(),
        Some(Regex::new(r"^\.snapshots$").expect("pattern")),
        Arc::new(fs_cap),
        vcs.clone(),
        Arc::new(MockGithub),
    );
    code.set_story_name("STORY-123");
    code.scan().expect("scan");

    let project = code
        .get_project_by_relative_path("github.com/owner1/repo1")
        .expect("lookup");
    let err = project.ensure().expect_err("stat failure surfaces");
    assert!(matches!(err, CodeError::Io(_)));
    assert!(vcs.calls().is_empty());
}

#[test]
fn link_into_story_shares_the_canonical_clone() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());
    fs::write(
        tmp.path().join("repositories/github.com/owner2/repo2/marker"),
        b"x",
    )
    .expect("marker");

    let (code, vcs) = new_code(tmp.path(), Some("STORY-123"));
    code.scan().expect("scan");

    let project = code
        .get_project_by_relative_path("github.com/owner2/repo2")
        .expect("lookup");
    project.link_into_story().expect("link");

    let story_path = tmp.path().join("stories/STORY-123/github.com/owner2/repo2");
    assert!(story_path.join("marker").exists());
    assert!(vcs.calls().is_empty());
}

#[test]
fn list_pull_requests_is_keyed_by_import_path() {
    let tmp = tempdir().expect("tempdir");
    create_projects(tmp.path());

    let (code, _) = new_code(tmp.path(), None);
    code.scan().expect("scan");

    let project = code
        .get_project_by_relative_path("github.com/owner3/repo3")
        .expect("lookup");
    let prs = project.list_pull_requests().expect("list prs");
    assert_eq!(prs.len(), 1);
    assert_eq!(prs[0].number, 42);
    assert_eq!(prs[0].title, "PR for owner3/repo3");
}
