// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Personal dotfile installer.
//!
//! A dotfile repository is a plain directory whose top-level entries are
//! the user's configuration files without their leading dot. Installing it
//! means:
//!
//! 1. Linking every entry `name` to `~/.name`, see [`link`].
//! 2. Rendering everything under `templates/` into the home directory, see
//!    [`template`].
//! 3. Cloning one extra repository if it is not there yet, see [`clone`].
//!
//! Configuration is optional, and lives in `dotlink.toml` at the top-level of
//! the repository, see [`config`].

pub mod clone;
pub mod config;
pub mod install;
pub mod link;
pub mod path;
pub mod template;
