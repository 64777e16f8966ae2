pub mod code;
pub mod config;
pub mod error;
pub mod fs;
pub mod github;
pub mod import_path;
pub mod project;
pub mod registry;
pub mod vcs;
