//! Clap-derived CLI types and dispatch.
//!
//! The CLI is a thin collaborator over the core's `Code`/`Project` contract:
//! it builds the workspace from configuration, scans, runs one command, and
//! reports the returned error verbatim.

use crate::core::code::Code;
use crate::core::config::{Config, Overrides};
use crate::core::fs::OsFilesystem;
use crate::core::github::GhCli;
use crate::core::project::Project;
use crate::core::vcs::GitCli;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser, Debug)]
#[clap(
    name = "storied",
    version = env!("CARGO_PKG_VERSION"),
    about = "Organizes local checkouts under a single workspace root, with per-story working copies"
)]
pub struct Cli {
    /// Workspace root holding repositories/ and stories/.
    #[clap(long, env = "STORIED_CODE_PATH", global = true)]
    pub code_path: Option<PathBuf>,
    /// Regex of directory names the scanner never descends into.
    #[clap(long, env = "STORIED_EXCLUDE_PATTERN", global = true)]
    pub exclude_pattern: Option<String>,
    /// Active story name (e.g. a ticket identifier).
    #[clap(long, short = 's', env = "STORIED_STORY", global = true)]
    pub story: Option<String>,
    /// Branch for story working copies (defaults to the story name).
    #[clap(long, env = "STORIED_STORY_BRANCH", global = true)]
    pub story_branch: Option<String>,

    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List every project under the workspace root
    #[clap(alias = "ls")]
    List,
    /// Clone a new project into the workspace
    Clone {
        /// URL to clone, e.g. https://github.com/owner/repo
        url: String,
    },
    /// Resolve the project owning a path (defaults to the working directory)
    Resolve { path: Option<PathBuf> },
    /// Story working copies
    Story {
        #[clap(subcommand)]
        command: StoryCommand,
    },
    /// GitHub pull requests
    #[clap(alias = "pull-request")]
    Pr {
        #[clap(subcommand)]
        command: PrCommand,
    },
}

#[derive(Subcommand, Debug)]
pub enum StoryCommand {
    /// Materialize the story working copy of a project
    Ensure {
        /// Import path; omitted, the project owning the working directory.
        import_path: Option<String>,
    },
    /// Link the canonical clone into the story directory read-only
    Link { import_path: String },
}

#[derive(Subcommand, Debug)]
pub enum PrCommand {
    /// List the open pull requests of the current project
    #[clap(alias = "ls")]
    List,
}

pub fn run(cli: Cli) -> anyhow::Result<()> {
    let config = Config::resolve(Overrides {
        code_path: cli.code_path,
        exclude_pattern: cli.exclude_pattern,
        story_name: cli.story,
        story_branch_name: cli.story_branch,
    })?;

    let mut code = Code::new(
        config.code_path,
        Some(config.exclude_pattern),
        Arc::new(OsFilesystem),
        Arc::new(GitCli),
        Arc::new(GhCli),
    );
    if let Some(story) = config.story_name {
        code.set_story_name(story);
    }
    if let Some(branch) = config.story_branch_name {
        code.set_story_branch_name(branch);
    }
    code.scan()?;

    match cli.command {
        Command::List => {
            let mut projects = code.projects()?;
            projects.sort_by(|a, b| a.import_path().cmp(b.import_path()));
            for project in projects {
                println!("{project}");
            }
        }
        Command::Clone { url } => {
            let project = code.clone_project(&url)?;
            println!("{}", project.repository_path().display());
        }
        Command::Resolve { path } => {
            let project = match path {
                Some(path) => code.get_project_by_absolute_path(&path.to_string_lossy())?,
                None => current_project(&code)?,
            };
            println!("{project}");
        }
        Command::Story { command } => match command {
            StoryCommand::Ensure { import_path } => {
                let project = match import_path {
                    Some(ip) => code.get_project_by_relative_path(&ip)?,
                    None => current_project(&code)?,
                };
                project.ensure()?;
                println!("{}", project.story_path()?.display());
            }
            StoryCommand::Link { import_path } => {
                let project = code.get_project_by_relative_path(&import_path)?;
                project.link_into_story()?;
                println!("{}", project.story_path()?.display());
            }
        },
        Command::Pr { command } => match command {
            PrCommand::List => {
                let project = current_project(&code)?;
                let prs = project.list_pull_requests()?;
                if prs.is_empty() {
                    println!("No pull requests found for {project}.");
                    return Ok(());
                }
                println!("{:<8} {:<60} {}", "NUMBER", "TITLE", "URL");
                for pr in prs {
                    println!("{:<8} {:<60} {}", pr.number, pr.title, pr.url);
                }
            }
        },
    }
    Ok(())
}

/// The project owning the current working directory.
fn current_project(code: &Code) -> anyhow::Result<Arc<Project>> {
    let cwd = std::env::current_dir().context("error finding the current working directory")?;
    code.get_project_by_absolute_path(&cwd.to_string_lossy())
        .context("error finding the project for the current directory")
}
