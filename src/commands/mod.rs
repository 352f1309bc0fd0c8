pub mod completions;
pub mod config;
pub mod deps;
pub mod doctor;
pub mod export;
pub mod handoff;
pub mod hook;
pub mod init;
pub mod lifecycle;
pub mod message;
pub mod plan;
pub mod search;
pub mod transition;
pub mod uuid;
pub mod validate;
pub mod version;

use chrono::{Local, NaiveDate};
use eyre::{Context as _, Result};
use std::path::{Path, PathBuf};

use crate::config::{Config, ProjectConfig};
use crate::design::store::DesignStore;

/// Everything a command needs to know about where it runs
pub struct Context {
    pub project_root: PathBuf,
    pub project: ProjectConfig,
    pub config: Config,
    pub verbose: bool,
    pub quiet: bool,
}

impl Context {
    pub fn new(project_root: Option<&Path>, verbose: bool, quiet: bool, config: Config) -> Result<Self> {
        let project_root = match project_root {
            Some(path) => Config::expand_path(path),
            None => std::env::current_dir().context("Failed to determine current directory")?,
        };
        let project = ProjectConfig::load(&project_root)?;
        log::debug!(
            "Project root {} ({}, design root {})",
            project_root.display(),
            project.mode.as_str(),
            project.design_root.display()
        );

        Ok(Self {
            project_root,
            project,
            config,
            verbose,
            quiet,
        })
    }

    pub fn design_root(&self) -> PathBuf {
        self.project.design_root(&self.project_root)
    }

    pub fn store(&self) -> DesignStore {
        DesignStore::open(&self.project_root, &self.project)
    }

    pub fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}
