// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use dotlink::{
    config::InstallerConfig,
    install::Installer,
    path::{absolute, home_dir, repo_root},
};

use anyhow::{Context, Result};
use clap::Parser;
use std::{path::PathBuf, process::exit};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Link dotfiles of a repository into your home directory.
///
/// Every top-level entry `name` of the repository becomes a symbolic link at
/// `~/.name`, templates under `templates/` are rendered into the home
/// directory, and the clone configured in `dotlink.toml` is bootstrapped.
#[derive(Debug, Clone, Parser)]
#[command(version)]
struct Cli {
    /// Path to dotfile repository [default: current directory].
    #[arg(short, long, value_name = "path")]
    pub repo: Option<PathBuf>,

    /// Path to install into [default: user's home directory].
    #[arg(long, value_name = "path")]
    pub home: Option<PathBuf>,

    /// Do not render templates.
    #[arg(long)]
    pub skip_templates: bool,

    /// Do not bootstrap the configured clone.
    #[arg(long)]
    pub skip_clone: bool,
}

impl Cli {
    fn run(self) -> Result<()> {
        let repo_root = repo_root(self.repo.as_deref())?;
        let home = match self.home {
            Some(path) => absolute(path)?,
            None => absolute(home_dir()?)?,
        };
        let config = InstallerConfig::load(&repo_root)
            .with_context(|| format!("cannot load configuration of {:?}", repo_root.display()))?;

        let report = Installer::new(repo_root, home, config)
            .skip_templates(self.skip_templates)
            .skip_clone(self.skip_clone)
            .run()?;
        info!(
            "install done: {} linked, {} rendered",
            report.links.len(),
            report.rendered.len()
        );

        Ok(())
    }
}

fn main() {
    let layer = fmt::layer()
        .compact()
        .with_target(false)
        .without_time();
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .unwrap();
    tracing_subscriber::registry()
        .with(layer)
        .with(filter)
        .init();

    if let Err(error) = run() {
        error!("{error:?}");
        exit(1);
    }

    exit(0)
}

fn run() -> Result<()> {
    Cli::parse().run()
}
