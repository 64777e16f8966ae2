//! Workspace configuration: CLI flags layered over an optional TOML file.
//!
//! The file lives at `~/.config/storied/config.toml` (overridable with
//! `STORIED_CONFIG`). A missing or unreadable file falls back to defaults;
//! flags and environment variables always win over the file.

use crate::core::error::CodeError;
use regex::Regex;
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Directory names the scanner skips when no pattern is configured: hidden
/// directories such as `.snapshots` or `.cache`.
pub const DEFAULT_EXCLUDE_PATTERN: &str = r"^\.";

/// The raw file layer; every field optional.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub code_path: Option<PathBuf>,
    pub exclude_pattern: Option<String>,
    pub story_name: Option<String>,
    pub story_branch_name: Option<String>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Self {
        let Ok(content) = std::fs::read_to_string(path) else {
            return Self::default();
        };
        toml::from_str(&content).unwrap_or_default()
    }

    fn default_location() -> Option<PathBuf> {
        if let Ok(explicit) = env::var("STORIED_CONFIG") {
            return Some(PathBuf::from(explicit));
        }
        let home = env::var_os("HOME")?;
        Some(
            PathBuf::from(home)
                .join(".config")
                .join("storied")
                .join("config.toml"),
        )
    }
}

/// The resolved configuration handed to `Code`.
#[derive(Debug)]
pub struct Config {
    pub code_path: PathBuf,
    pub exclude_pattern: Regex,
    pub story_name: Option<String>,
    pub story_branch_name: Option<String>,
}

/// Flag-level overrides, each winning over the file layer.
#[derive(Debug, Default)]
pub struct Overrides {
    pub code_path: Option<PathBuf>,
    pub exclude_pattern: Option<String>,
    pub story_name: Option<String>,
    pub story_branch_name: Option<String>,
}

impl Config {
    pub fn resolve(overrides: Overrides) -> Result<Self, CodeError> {
        let file = FileConfig::default_location()
            .map(|p| FileConfig::load(&p))
            .unwrap_or_default();
        Self::merge(overrides, file)
    }

    fn merge(overrides: Overrides, file: FileConfig) -> Result<Self, CodeError> {
        let code_path = overrides
            .code_path
            .or(file.code_path)
            .or_else(|| env::var_os("HOME").map(|h| PathBuf::from(h).join("code")))
            .ok_or_else(|| CodeError::Config("no code path configured".to_string()))?;

        let pattern = overrides
            .exclude_pattern
            .or(file.exclude_pattern)
            .unwrap_or_else(|| DEFAULT_EXCLUDE_PATTERN.to_string());
        let exclude_pattern = Regex::new(&pattern)
            .map_err(|e| CodeError::Config(format!("invalid exclude pattern {pattern:?}: {e}")))?;

        Ok(Self {
            code_path,
            exclude_pattern,
            story_name: overrides.story_name.or(file.story_name),
            story_branch_name: overrides.story_branch_name.or(file.story_branch_name),
        })
    }
}
