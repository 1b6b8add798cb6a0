// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Template rendering.
//!
//! Files under the `templates` directory of a repository whose names end in
//! the template extension are rendered through [minijinja], and written into
//! the home directory. The path of a template relative to `templates`, minus
//! the extension, names the output relative to the home directory with its
//! leading component turned into a dotfile:
//!
//! ```text
//! templates/gitconfig.j2       -> ~/.gitconfig
//! templates/config/app.conf.j2 -> ~/.config/app.conf
//! ```
//!
//! Rendered output always replaces whatever was at the output path before.
//! Unlike linking, no backup is taken.
//!
//! # Render Context
//!
//! Templates only see the bindings of a [`RenderContext`]: `home`,
//! `repo_root`, `target_dir` (same as `repo_root`), plus any user variables
//! from configuration. Referencing anything else is a render error.

use minijinja::{AutoEscape, Environment, UndefinedBehavior};
use serde::Serialize;
use std::{
    collections::BTreeMap,
    ffi::{OsStr, OsString},
    fs::{read_to_string, remove_file, write},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{info, instrument, warn};
use walkdir::WalkDir;

/// Name of template directory at top-level of repository.
pub const TEMPLATE_DIR_NAME: &str = "templates";

const RESERVED_BINDINGS: [&str; 3] = ["home", "repo_root", "target_dir"];

/// Named values visible to templates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderContext {
    home: String,
    repo_root: String,
    target_dir: String,
    #[serde(flatten)]
    variables: BTreeMap<String, String>,
}

impl RenderContext {
    /// Construct new render context.
    pub fn new(home: impl AsRef<Path>, repo_root: impl AsRef<Path>) -> Self {
        let repo_root = repo_root.as_ref().to_string_lossy().into_owned();
        Self {
            home: home.as_ref().to_string_lossy().into_owned(),
            target_dir: repo_root.clone(),
            repo_root,
            variables: BTreeMap::new(),
        }
    }

    /// Add user variables.
    ///
    /// Variables named after a built-in binding are dropped.
    pub fn with_variables(
        mut self,
        variables: impl IntoIterator<Item = (impl Into<String>, impl Into<String>)>,
    ) -> Self {
        for (name, value) in variables {
            let name = name.into();
            if RESERVED_BINDINGS.contains(&name.as_str()) {
                warn!("variable {name:?} shadows built-in binding, ignoring it");
                continue;
            }
            self.variables.insert(name, value.into());
        }

        self
    }
}

/// Template file found under the template directory.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct TemplateEntry {
    path: PathBuf,
    relative: PathBuf,
}

impl TemplateEntry {
    /// Absolute path of template file.
    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// Path of output relative to template directory, without extension.
    pub fn relative(&self) -> &Path {
        self.relative.as_path()
    }

    /// Path rendered output gets written to.
    pub fn output_path(&self, home: impl AsRef<Path>) -> PathBuf {
        // INVARIANT: Only the leading component gets dotted.
        let mut dotted = OsString::from(".");
        dotted.push(self.relative.as_os_str());
        home.as_ref().join(dotted)
    }
}

/// Render templates of a repository into a home directory.
#[derive(Debug)]
pub struct Renderer {
    template_dir: PathBuf,
    home: PathBuf,
    extension: String,
    env: Environment<'static>,
}

impl Renderer {
    /// Construct new renderer.
    ///
    /// Expects absolute `repo_root` and `home`, and a template extension
    /// without the leading dot.
    pub fn new(
        repo_root: impl AsRef<Path>,
        home: impl Into<PathBuf>,
        extension: impl Into<String>,
    ) -> Self {
        let mut env = Environment::new();
        env.set_undefined_behavior(UndefinedBehavior::Strict);
        env.set_keep_trailing_newline(true);
        env.set_auto_escape_callback(|_| AutoEscape::None);

        Self {
            template_dir: repo_root.as_ref().join(TEMPLATE_DIR_NAME),
            home: home.into(),
            extension: extension.into(),
            env,
        }
    }

    /// List templates in sorted order.
    ///
    /// A repository without a template directory simply has no templates.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError::Walk`] if template directory cannot be walked.
    /// - Return [`RenderError::Unmapped`] if a template has no usable output
    ///   path.
    pub fn entries(&self) -> Result<Vec<TemplateEntry>> {
        if !self.template_dir.is_dir() {
            return Ok(Vec::new());
        }

        let suffix = format!(".{}", self.extension);
        let mut entries = Vec::new();
        for entry in WalkDir::new(&self.template_dir).min_depth(1) {
            let path = entry?.into_path();
            let Some(file_name) = path.file_name() else {
                continue;
            };
            let Some(stem) = file_name.as_encoded_bytes().strip_suffix(suffix.as_bytes()) else {
                continue;
            };
            if !path.is_file() {
                continue;
            }

            let unmapped = || RenderError::Unmapped { path: path.clone() };
            if stem.is_empty() {
                return Err(unmapped());
            }
            let stem = bytes_to_os_str(stem).ok_or_else(unmapped)?.to_os_string();
            let relative = path
                .parent()
                .and_then(|parent| parent.strip_prefix(&self.template_dir).ok())
                .ok_or_else(unmapped)?
                .join(stem);

            entries.push(TemplateEntry { path, relative });
        }
        entries.sort();

        Ok(entries)
    }

    /// Render all templates.
    ///
    /// Stops at the first failure, leaving remaining templates unrendered.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError`] variant of first failed template.
    #[instrument(skip(self, context), fields(template_dir = %self.template_dir.display()), level = "debug")]
    pub fn render_all(&self, context: &RenderContext) -> Result<Vec<PathBuf>> {
        let mut outputs = Vec::new();
        for entry in self.entries()? {
            outputs.push(self.render(&entry, context)?);
        }

        Ok(outputs)
    }

    /// Render one template into home directory.
    ///
    /// Returns the path the output was written to.
    ///
    /// # Errors
    ///
    /// - Return [`RenderError::CreateDir`] if output directory cannot be made.
    /// - Return [`RenderError::Remove`] if old output cannot be deleted.
    /// - Return [`RenderError::Read`] if template cannot be read.
    /// - Return [`RenderError::Template`] if template fails to render.
    /// - Return [`RenderError::Write`] if output cannot be written.
    pub fn render(&self, entry: &TemplateEntry, context: &RenderContext) -> Result<PathBuf> {
        let output = entry.output_path(&self.home);

        if let Some(parent) = output.parent() {
            mkdirp::mkdirp(parent).map_err(|err| RenderError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        match remove_file(&output) {
            Err(err) if err.kind() != ErrorKind::NotFound => {
                return Err(RenderError::Remove {
                    source: err,
                    path: output,
                })
            }
            _ => {}
        }

        let source = read_to_string(entry.path()).map_err(|err| RenderError::Read {
            source: err,
            path: entry.path().to_path_buf(),
        })?;
        let rendered = self
            .env
            .render_named_str(&entry.relative().to_string_lossy(), &source, context)
            .map_err(|err| RenderError::Template {
                source: err,
                path: entry.path().to_path_buf(),
            })?;

        write(&output, rendered).map_err(|err| RenderError::Write {
            source: err,
            path: output.clone(),
        })?;
        info!("render {:?} to {:?}", entry.path().display(), output.display());

        Ok(output)
    }
}

// Stripped file names are a suffix cut of OS-encoded bytes, so they always
// came from a valid `OsStr` on Unix.
#[cfg(unix)]
fn bytes_to_os_str(bytes: &[u8]) -> Option<&OsStr> {
    use std::os::unix::ffi::OsStrExt;
    Some(OsStr::from_bytes(bytes))
}

#[cfg(windows)]
fn bytes_to_os_str(bytes: &[u8]) -> Option<&OsStr> {
    std::str::from_utf8(bytes).ok().map(OsStr::new)
}

/// Template rendering error types.
#[derive(Debug, thiserror::Error)]
pub enum RenderError {
    /// Template directory cannot be walked.
    #[error(transparent)]
    Walk(#[from] walkdir::Error),

    /// Template path cannot be turned into an output path.
    #[error("cannot determine output path of template {:?}", path.display())]
    Unmapped { path: PathBuf },

    /// Template cannot be read.
    #[error("failed to read template {:?}", path.display())]
    Read {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Template syntax is invalid, or references unknown binding.
    #[error("failed to render template {:?}", path.display())]
    Template {
        #[source]
        source: minijinja::Error,
        path: PathBuf,
    },

    /// Output directory cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Previous output cannot be removed.
    #[error("failed to remove old output {:?}", path.display())]
    Remove {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// Rendered output cannot be written.
    #[error("failed to write rendered output {:?}", path.display())]
    Write {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = RenderError> = std::result::Result<T, E>;
