// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Configuration layout.
//!
//! Specify the layout of the optional installer configuration file that lives
//! at the top-level of a dotfile repository. The file is named `dotlink.toml`,
//! and doubles as the installer's own entry point inside the repository, so it
//! is never linked into the home directory itself.
//!
//! # General Layout
//!
//! ```toml
//! [templates]
//! extension = "j2"
//!
//! [link]
//! exclude = ["README.md"]
//!
//! [clone]
//! name = "tool"
//! url = "https://github.com/someone/tool.git"
//! backend = "git"
//!
//! [variables]
//! email = "me@example.com"
//! ```
//!
//! Every section is optional. A repository without any configuration file at
//! all is installed with the defaults.

use serde::Deserialize;
use std::{
    collections::BTreeMap,
    fs::read_to_string,
    path::{Path, PathBuf},
    str::FromStr,
};

/// Name of installer configuration file at top-level of repository.
pub const CONFIG_FILE_NAME: &str = "dotlink.toml";

/// Installer configuration layout.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct InstallerConfig {
    /// Template rendering settings.
    pub templates: TemplateSettings,

    /// Dotfile linking settings.
    pub link: LinkSettings,

    /// Third-party repository to bootstrap, if any.
    pub clone: Option<CloneSettings>,

    /// Extra bindings exposed to templates.
    pub variables: BTreeMap<String, String>,
}

impl InstallerConfig {
    /// Load configuration from repository root.
    ///
    /// Falls back to defaults if the repository has no configuration file.
    ///
    /// # Errors
    ///
    /// - Return [`ConfigError::Read`] if configuration file cannot be read.
    /// - Return [`ConfigError::Deserialize`] if configuration is malformed.
    /// - Return [`ConfigError::ShellExpansion`] if a path cannot be expanded.
    pub fn load(repo_root: impl AsRef<Path>) -> Result<Self> {
        let path = repo_root.as_ref().join(CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }

        read_to_string(&path)
            .map_err(|err| ConfigError::Read { source: err, path })?
            .parse()
    }
}

impl FromStr for InstallerConfig {
    type Err = ConfigError;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let mut config: InstallerConfig =
            toml::de::from_str(data).map_err(ConfigError::Deserialize)?;

        // INVARIANT: Perform shell expansion on clone destination override.
        if let Some(clone) = config.clone.as_mut() {
            if let Some(path) = clone.path.take() {
                clone.path = Some(PathBuf::from(
                    shellexpand::full(path.to_string_lossy().as_ref())
                        .map_err(ConfigError::ShellExpansion)?
                        .into_owned(),
                ));
            }
        }

        Ok(config)
    }
}

/// Template rendering settings.
#[derive(Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct TemplateSettings {
    /// Extension marking files under `templates/` for rendering, without the
    /// leading dot.
    pub extension: String,
}

impl Default for TemplateSettings {
    fn default() -> Self {
        Self {
            extension: "j2".into(),
        }
    }
}

/// Dotfile linking settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
#[serde(default)]
pub struct LinkSettings {
    /// Extra top-level entries that should never be linked.
    pub exclude: Vec<String>,
}

/// Bootstrap clone settings.
#[derive(Default, Debug, PartialEq, Eq, Clone, Deserialize)]
pub struct CloneSettings {
    /// Name of the tool, used as the clone directory name.
    pub name: String,

    /// Remote URL to clone from.
    pub url: String,

    /// Clone destination overriding `<home>/projects/github/other/<name>`.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Clone backend to use.
    #[serde(default)]
    pub backend: CloneBackend,
}

impl CloneSettings {
    /// Determine absolute clone destination relative to home directory.
    pub fn destination(&self, home: impl AsRef<Path>) -> PathBuf {
        match &self.path {
            Some(path) if path.is_absolute() => path.clone(),
            Some(path) => home.as_ref().join(path),
            None => home
                .as_ref()
                .join("projects")
                .join("github")
                .join("other")
                .join(&self.name),
        }
    }
}

/// Ways to clone a remote repository.
#[derive(Default, Debug, PartialEq, Eq, Clone, Copy, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CloneBackend {
    /// Invoke the Git binary.
    #[default]
    Git,

    /// Clone through libgit2.
    Libgit2,
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Configuration file cannot be read.
    #[error("failed to read configuration at {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Failed to deserialize configuration.
    #[error(transparent)]
    Deserialize(#[from] toml::de::Error),

    /// Failed to perform shell expansion on configuration.
    #[error(transparent)]
    ShellExpansion(#[from] shellexpand::LookupError<std::env::VarError>),
}

/// Friendly result alias :3
type Result<T, E = ConfigError> = std::result::Result<T, E>;
