// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Dotfile linking.
//!
//! Every top-level entry of a dotfile repository is a candidate __dotfile__.
//! Linking a candidate named `vimrc` means making `~/.vimrc` a symbolic link
//! to `<repo_root>/vimrc`. Entries belonging to the repository itself rather
//! than to the user's configuration are excluded: the `.git` directory, the
//! installer configuration file, and the `templates` directory.
//!
//! # Backups
//!
//! Whatever already sits at a link target is handled in one of two ways. A
//! symbolic link is assumed to be left over from an earlier install, and is
//! simply removed. Anything else is renamed to `<target>.bak` before the new
//! link is created. There is only one backup slot per target, so installing
//! twice over a real file replaces the first backup with the second.

use crate::config::CONFIG_FILE_NAME;

use std::{
    ffi::{OsStr, OsString},
    fs::{read_dir, remove_file, rename, symlink_metadata},
    io::ErrorKind,
    path::{Path, PathBuf},
};
use tracing::{debug, info, instrument};

/// Entries of a repository root that are never linked.
pub const FIXED_EXCLUSIONS: [&str; 3] = [".git", CONFIG_FILE_NAME, "templates"];

/// Candidate dotfile at the top-level of the repository.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct RepoEntry {
    name: OsString,
}

impl RepoEntry {
    /// Construct new repository entry.
    pub fn new(name: impl Into<OsString>) -> Self {
        Self { name: name.into() }
    }

    /// Name of entry relative to repository root.
    pub fn name(&self) -> &OsStr {
        self.name.as_os_str()
    }

    /// Absolute path of entry inside repository.
    pub fn source(&self, repo_root: impl AsRef<Path>) -> PathBuf {
        repo_root.as_ref().join(&self.name)
    }

    /// Path of link target inside home directory.
    pub fn link_target(&self, home: impl AsRef<Path>) -> PathBuf {
        // INVARIANT: Keep raw name bytes, never lossy convert.
        let mut dotfile = OsString::from(".");
        dotfile.push(&self.name);
        home.as_ref().join(dotfile)
    }
}

/// What happened to a link target while linking it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkOutcome {
    /// Nothing was at the link target.
    Created,

    /// Old symbolic link was replaced.
    Relinked,

    /// Existing file was moved to backup path first.
    BackedUp(PathBuf),
}

/// Link dotfiles of a repository into a home directory.
#[derive(Debug, Clone)]
pub struct Linker {
    repo_root: PathBuf,
    home: PathBuf,
    exclusions: Vec<String>,
}

impl Linker {
    /// Construct new linker.
    ///
    /// Both `repo_root` and `home` are expected to be absolute.
    pub fn new(repo_root: impl Into<PathBuf>, home: impl Into<PathBuf>) -> Self {
        Self {
            repo_root: repo_root.into(),
            home: home.into(),
            exclusions: FIXED_EXCLUSIONS.iter().map(ToString::to_string).collect(),
        }
    }

    /// Exclude additional top-level entries on top of the fixed set.
    pub fn exclude(mut self, names: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.exclusions.extend(names.into_iter().map(Into::into));
        self
    }

    /// List candidate dotfiles in sorted order.
    ///
    /// Hidden entries are never candidates.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::ReadRepo`] if repository root cannot be listed.
    pub fn entries(&self) -> Result<Vec<RepoEntry>> {
        let read_err = |err: std::io::Error| LinkError::ReadRepo {
            source: err,
            repo_root: self.repo_root.clone(),
        };

        let mut entries = Vec::new();
        for entry in read_dir(&self.repo_root).map_err(read_err)? {
            let name = entry.map_err(read_err)?.file_name();
            if name.as_encoded_bytes().starts_with(b".") || self.is_excluded(&name) {
                debug!("skip {name:?}");
                continue;
            }

            entries.push(RepoEntry::new(name));
        }
        entries.sort();

        Ok(entries)
    }

    /// Link all candidate dotfiles.
    ///
    /// Stops at the first failure, leaving remaining entries untouched.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError`] variant of first failed entry.
    #[instrument(skip(self), fields(repo_root = %self.repo_root.display()), level = "debug")]
    pub fn link_all(&self) -> Result<Vec<(RepoEntry, LinkOutcome)>> {
        let mut outcomes = Vec::new();
        for entry in self.entries()? {
            let outcome = self.link(&entry)?;
            outcomes.push((entry, outcome));
        }

        Ok(outcomes)
    }

    /// Link one dotfile into home directory.
    ///
    /// # Errors
    ///
    /// - Return [`LinkError::RemoveLink`] if an old link cannot be removed.
    /// - Return [`LinkError::Backup`] if an existing file cannot be moved.
    /// - Return [`LinkError::Symlink`] if the new link cannot be created.
    pub fn link(&self, entry: &RepoEntry) -> Result<LinkOutcome> {
        let source = entry.source(&self.repo_root);
        let target = entry.link_target(&self.home);

        let outcome = match symlink_metadata(&target) {
            Ok(meta) if meta.file_type().is_symlink() => {
                remove_file(&target).map_err(|err| LinkError::RemoveLink {
                    source: err,
                    target: target.clone(),
                })?;
                LinkOutcome::Relinked
            }
            Ok(_) => {
                let backup = backup_path(&target);
                rename(&target, &backup).map_err(|err| LinkError::Backup {
                    source: err,
                    target: target.clone(),
                    backup: backup.clone(),
                })?;
                info!("backup {:?} to {:?}", target.display(), backup.display());
                LinkOutcome::BackedUp(backup)
            }
            Err(err) if err.kind() == ErrorKind::NotFound => LinkOutcome::Created,
            Err(err) => {
                return Err(LinkError::Inspect {
                    source: err,
                    target,
                })
            }
        };

        symlink(&source, &target).map_err(|err| LinkError::Symlink {
            source: err,
            link: target.clone(),
            original: source.clone(),
        })?;
        info!("link {:?} -> {:?}", target.display(), source.display());

        Ok(outcome)
    }

    fn is_excluded(&self, name: &OsStr) -> bool {
        self.exclusions
            .iter()
            .any(|excluded| name == excluded.as_str())
    }
}

/// Determine backup path of a link target.
pub fn backup_path(target: impl AsRef<Path>) -> PathBuf {
    let mut backup = target.as_ref().as_os_str().to_owned();
    backup.push(".bak");
    PathBuf::from(backup)
}

#[cfg(unix)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

#[cfg(windows)]
fn symlink(original: &Path, link: &Path) -> std::io::Result<()> {
    if original.is_dir() {
        std::os::windows::fs::symlink_dir(original, link)
    } else {
        std::os::windows::fs::symlink_file(original, link)
    }
}

/// Dotfile linking error types.
#[derive(Debug, thiserror::Error)]
pub enum LinkError {
    /// Repository root cannot be listed.
    #[error("failed to list repository root {:?}", repo_root.display())]
    ReadRepo {
        #[source]
        source: std::io::Error,
        repo_root: PathBuf,
    },

    /// Link target cannot be inspected.
    #[error("failed to inspect {:?}", target.display())]
    Inspect {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Old symbolic link cannot be removed.
    #[error("failed to remove old link {:?}", target.display())]
    RemoveLink {
        #[source]
        source: std::io::Error,
        target: PathBuf,
    },

    /// Existing file cannot be moved to its backup path.
    #[error("failed to backup {:?} to {:?}", target.display(), backup.display())]
    Backup {
        #[source]
        source: std::io::Error,
        target: PathBuf,
        backup: PathBuf,
    },

    /// Symbolic link cannot be created.
    #[error("failed to link {:?} to {:?}", link.display(), original.display())]
    Symlink {
        #[source]
        source: std::io::Error,
        link: PathBuf,
        original: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = LinkError> = std::result::Result<T, E>;
