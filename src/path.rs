// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Path resolution utilities.
//!
//! Determine the two anchors every install step works against: the user's
//! home directory, and the dotfile repository root. Both must be absolute
//! before anything touches the file system.

use std::{
    env::current_dir,
    path::{Path, PathBuf},
};

/// Determine absolute path to user's home directory.
///
/// Does not check if the path returned actually exists.
///
/// # Errors
///
/// - Return [`PathError::NoWayHome`] if home directory path cannot be
///   determined.
pub fn home_dir() -> Result<PathBuf> {
    dirs::home_dir().ok_or(PathError::NoWayHome)
}

/// Determine absolute path to the dotfile repository root.
///
/// The installer is run from inside the repository it installs, so the
/// current working directory is used when no explicit root is given.
///
/// # Errors
///
/// - Return [`PathError::CurrentDir`] if the working directory is unreadable.
/// - Return [`PathError::Canonicalize`] if the root does not resolve.
pub fn repo_root(explicit: Option<&Path>) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => current_dir().map_err(PathError::CurrentDir)?,
    };

    absolute(root)
}

/// Resolve path to an absolute, symlink free form.
///
/// # Errors
///
/// - Return [`PathError::Canonicalize`] if the path does not resolve.
pub fn absolute(path: impl AsRef<Path>) -> Result<PathBuf> {
    path.as_ref()
        .canonicalize()
        .map_err(|err| PathError::Canonicalize {
            source: err,
            path: path.as_ref().to_path_buf(),
        })
}

/// Path resolution error types.
#[derive(Debug, thiserror::Error)]
pub enum PathError {
    /// No way to determine user's home directory.
    ///
    /// # See Also
    ///
    /// - [`dirs::home_dir`](https://docs.rs/dirs/latest/dirs/fn.home_dir.html)
    #[error("cannot determine absolute path to user's home directory")]
    NoWayHome,

    /// Current working directory cannot be read.
    #[error("cannot determine current working directory")]
    CurrentDir(#[source] std::io::Error),

    /// Path cannot be made absolute.
    #[error("cannot resolve absolute path of {:?}", path.display())]
    Canonicalize {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },
}

/// Friendly result alias :3
pub type Result<T, E = PathError> = std::result::Result<T, E>;
