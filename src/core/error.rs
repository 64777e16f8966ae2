use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CodeError {
    #[error("code path is empty or does not exist")]
    CodePathEmpty,
    #[error("code was not scanned")]
    NotScanned,
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    #[error("story not found: {0}")]
    StoryNotFound(String),
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("invalid URL given: {0}")]
    InvalidUrl(String),
    #[error("project already exists: {0}")]
    ProjectAlreadyExists(String),
    #[error("no story configured for project {0}")]
    NoStory(String),
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
    #[error("vcs error: {0}")]
    Vcs(String),
    #[error("github error: {0}")]
    Github(String),
    #[error("configuration error: {0}")]
    Config(String),
}
