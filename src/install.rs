// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Full install sequence.
//!
//! An install runs three steps strictly in order: link dotfiles, render
//! templates, then bootstrap the configured clone. The first failure aborts
//! everything after it. Nothing already done is rolled back.

use crate::{
    clone::{Bootstrap, CloneOutcome, Cloner, Git2Cloner, GitBinary},
    config::{CloneBackend, InstallerConfig},
    link::{LinkOutcome, Linker, RepoEntry},
    template::{RenderContext, Renderer},
};

use indicatif::ProgressBar;
use std::path::PathBuf;
use tracing::{debug, info, instrument};

/// Summary of a finished install.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct InstallReport {
    /// Linked dotfiles in processing order.
    pub links: Vec<(RepoEntry, LinkOutcome)>,

    /// Rendered output paths in processing order.
    pub rendered: Vec<PathBuf>,

    /// Result of bootstrap clone, if one is configured.
    pub clone: Option<CloneOutcome>,
}

/// Install dotfiles of a repository into a home directory.
#[derive(Debug, Clone)]
pub struct Installer {
    repo_root: PathBuf,
    home: PathBuf,
    config: InstallerConfig,
    skip_templates: bool,
    skip_clone: bool,
}

impl Installer {
    /// Construct new installer.
    ///
    /// Both `repo_root` and `home` are expected to be absolute.
    pub fn new(
        repo_root: impl Into<PathBuf>,
        home: impl Into<PathBuf>,
        config: InstallerConfig,
    ) -> Self {
        Self {
            repo_root: repo_root.into(),
            home: home.into(),
            config,
            skip_templates: false,
            skip_clone: false,
        }
    }

    /// Do not render templates.
    pub fn skip_templates(mut self, skip: bool) -> Self {
        self.skip_templates = skip;
        self
    }

    /// Do not bootstrap the configured clone.
    pub fn skip_clone(mut self, skip: bool) -> Self {
        self.skip_clone = skip;
        self
    }

    /// Run full install sequence with configured clone backend.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError`] variant of the first failed step.
    pub fn run(&self) -> Result<InstallReport> {
        let backend = self
            .config
            .clone
            .as_ref()
            .map(|clone| clone.backend)
            .unwrap_or_default();

        match backend {
            CloneBackend::Git => self.run_with_cloner(GitBinary),
            CloneBackend::Libgit2 => self.run_with_cloner(Git2Cloner::new(ProgressBar::new(0))),
        }
    }

    /// Run full install sequence with given cloner.
    ///
    /// # Errors
    ///
    /// - Return [`InstallError`] variant of the first failed step.
    #[instrument(skip(self, cloner), fields(repo_root = %self.repo_root.display(), home = %self.home.display()))]
    pub fn run_with_cloner(&self, cloner: impl Cloner) -> Result<InstallReport> {
        let mut report = InstallReport::default();

        let linker = Linker::new(&self.repo_root, &self.home)
            .exclude(self.config.link.exclude.iter().cloned());
        report.links = linker.link_all()?;
        info!("linked {} dotfiles", report.links.len());

        if self.skip_templates {
            debug!("skip template rendering");
        } else {
            let renderer = Renderer::new(
                &self.repo_root,
                &self.home,
                &self.config.templates.extension,
            );
            let context = RenderContext::new(&self.home, &self.repo_root)
                .with_variables(self.config.variables.clone());
            report.rendered = renderer.render_all(&context)?;
            info!("rendered {} templates", report.rendered.len());
        }

        match &self.config.clone {
            Some(_) if self.skip_clone => debug!("skip bootstrap clone"),
            Some(settings) => {
                let bootstrap =
                    Bootstrap::new(&settings.url, settings.destination(&self.home), cloner);
                report.clone = Some(bootstrap.run()?);
            }
            None => debug!("no bootstrap clone configured"),
        }

        Ok(report)
    }
}

/// Install error types.
#[derive(Debug, thiserror::Error)]
pub enum InstallError {
    /// Dotfile linking fails.
    #[error(transparent)]
    Link(#[from] crate::link::LinkError),

    /// Template rendering fails.
    #[error(transparent)]
    Render(#[from] crate::template::RenderError),

    /// Bootstrap clone fails.
    #[error(transparent)]
    Clone(#[from] crate::clone::CloneError),
}

/// Friendly result alias :3
pub type Result<T, E = InstallError> = std::result::Result<T, E>;
