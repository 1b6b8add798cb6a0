// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

//! Bootstrap clone of a third-party repository.
//!
//! After dotfiles are linked and rendered, the installer can make sure that
//! one extra repository is cloned to a fixed place under the home directory,
//! by default `~/projects/github/other/<name>`. The clone only happens when
//! that place does not exist yet. A destination that already exists is never
//! touched, even if it holds something other than a clone of the configured
//! remote.
//!
//! Cloning itself is delegated to a [`Cloner`]. Either the Git binary is
//! invoked through [`GitBinary`], or libgit2 does the work through
//! [`Git2Cloner`]. Both report a failed clone as an error.

use auth_git2::{GitAuthenticator, Prompter};
use git2::{build::RepoBuilder, Config, FetchOptions, RemoteCallbacks};
use indicatif::{ProgressBar, ProgressStyle};
use inquire::{Password, Text};
use std::{
    ffi::OsStr,
    fs::symlink_metadata,
    path::{Path, PathBuf},
    process::Command,
    time,
};
use tracing::{debug, info, instrument};

/// Layer of indirection for cloning remote repositories.
pub trait Cloner {
    /// Clone remote repository at `url` into `destination`.
    ///
    /// On failure the destination may be left absent or partially populated.
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()>;
}

impl<C> Cloner for &C
where
    C: Cloner + ?Sized,
{
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        (**self).clone_repo(url, destination)
    }
}

/// Clone through the Git binary.
#[derive(Debug, Default, Clone, Copy)]
pub struct GitBinary;

impl Cloner for GitBinary {
    #[instrument(skip(self), level = "debug")]
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        let output = syscall_non_interactive(
            "git",
            [OsStr::new("clone"), OsStr::new(url), destination.as_os_str()],
        )?;
        if !output.is_empty() {
            debug!("{output}");
        }

        Ok(())
    }
}

/// Clone through libgit2.
///
/// The progress of the clone is displayed through a progress bar. If any
/// credentials are required for the clone to continue, then the user will be
/// prompted for them. The progress bar is suspended for user input.
#[derive(Debug, Clone)]
pub struct Git2Cloner {
    bar: ProgressBar,
}

impl Git2Cloner {
    /// Construct new libgit2 cloner reporting to progress bar.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Cloner for Git2Cloner {
    #[instrument(skip(self), level = "debug")]
    fn clone_repo(&self, url: &str, destination: &Path) -> Result<()> {
        let style = ProgressStyle::with_template(
            "{elapsed_precise:.green}  {msg:<50}  [{wide_bar:.yellow/blue}]",
        )?
        .progress_chars("-Cco.");
        self.bar.set_style(style);
        self.bar.set_message(url.to_string());
        self.bar.enable_steady_tick(time::Duration::from_millis(100));

        let prompter = IndicatifPrompter::new(self.bar.clone());
        let authenticator = GitAuthenticator::default().set_prompter(prompter.clone());
        let config = Config::open_default()?;

        let mut throttle = time::Instant::now();
        let mut rc = RemoteCallbacks::new();
        rc.credentials(authenticator.credentials(&config));
        rc.transfer_progress(|progress| {
            let bar_size = progress.total_objects() as u64;
            let bar_pos = progress.received_objects() as u64;
            if throttle.elapsed() > time::Duration::from_millis(10) {
                throttle = time::Instant::now();
                prompter.bar.set_length(bar_size);
                prompter.bar.set_position(bar_pos);
            }
            true
        });

        let mut fo = FetchOptions::new();
        fo.remote_callbacks(rc);
        let result = RepoBuilder::new()
            .fetch_options(fo)
            .clone(url, destination);
        self.bar.finish_and_clear();
        result?;

        Ok(())
    }
}

/// Git2 authentication prompter for progress bar.
#[derive(Debug, Clone)]
pub struct IndicatifPrompter {
    pub(crate) bar: ProgressBar,
}

impl IndicatifPrompter {
    /// Construct new progress bar authenticator.
    pub fn new(bar: ProgressBar) -> Self {
        Self { bar }
    }
}

impl Prompter for IndicatifPrompter {
    #[instrument(skip(self, url, _config), level = "debug")]
    fn prompt_username_password(
        &mut self,
        url: &str,
        _config: &git2::Config,
    ) -> Option<(String, String)> {
        info!("authentication required at {url}");
        self.bar.suspend(|| {
            let username = Text::new("username").prompt().ok()?;
            Some((username, ask_secret("password")?))
        })
    }

    #[instrument(skip(self, username, url, _config), level = "debug")]
    fn prompt_password(
        &mut self,
        username: &str,
        url: &str,
        _config: &git2::Config,
    ) -> Option<String> {
        info!("authentication required at {url} for user {username}");
        self.bar.suspend(|| ask_secret("password"))
    }

    #[instrument(skip(self, ssh_key_path, _config), level = "debug")]
    fn prompt_ssh_key_passphrase(
        &mut self,
        ssh_key_path: &Path,
        _config: &git2::Config,
    ) -> Option<String> {
        info!(
            "authentication required with ssh key at {}",
            ssh_key_path.display()
        );
        self.bar.suspend(|| ask_secret("passphrase"))
    }
}

// Cancelled prompts give up on authentication.
fn ask_secret(prompt: &str) -> Option<String> {
    Password::new(prompt).without_confirmation().prompt().ok()
}

/// What the bootstrap step did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloneOutcome {
    /// Destination already existed, cloner was never invoked.
    Skipped,

    /// Remote was cloned into destination.
    Cloned,
}

/// Bootstrap one remote repository into a fixed destination.
#[derive(Debug, Clone)]
pub struct Bootstrap<C>
where
    C: Cloner,
{
    url: String,
    destination: PathBuf,
    cloner: C,
}

impl<C> Bootstrap<C>
where
    C: Cloner,
{
    /// Construct new bootstrap step.
    pub fn new(url: impl Into<String>, destination: impl Into<PathBuf>, cloner: C) -> Self {
        Self {
            url: url.into(),
            destination: destination.into(),
            cloner,
        }
    }

    /// Clone remote unless destination already exists.
    ///
    /// Parent directories of the destination are created first.
    ///
    /// # Errors
    ///
    /// - Return [`CloneError::CreateDir`] if parent directories cannot be
    ///   created.
    /// - Return [`CloneError`] variant of the cloner if the clone fails.
    #[instrument(skip(self), fields(url = %self.url, destination = %self.destination.display()), level = "debug")]
    pub fn run(&self) -> Result<CloneOutcome> {
        if let Some(parent) = self.destination.parent() {
            mkdirp::mkdirp(parent).map_err(|err| CloneError::CreateDir {
                source: err,
                path: parent.to_path_buf(),
            })?;
        }

        // INVARIANT: Anything at destination counts, even a dangling symlink.
        if symlink_metadata(&self.destination).is_ok() {
            debug!("{:?} already exists, skip clone", self.destination.display());
            return Ok(CloneOutcome::Skipped);
        }

        info!("clone {} into {:?}", self.url, self.destination.display());
        self.cloner.clone_repo(&self.url, &self.destination)?;

        Ok(CloneOutcome::Cloned)
    }
}

fn syscall_non_interactive(
    cmd: impl AsRef<OsStr>,
    args: impl IntoIterator<Item = impl AsRef<OsStr>>,
) -> Result<String> {
    let output = Command::new(cmd.as_ref())
        .args(args)
        .output()
        .map_err(|err| CloneError::Spawn {
            source: err,
            command: cmd.as_ref().to_string_lossy().into_owned(),
        })?;
    let stdout = String::from_utf8_lossy(output.stdout.as_slice()).into_owned();
    let stderr = String::from_utf8_lossy(output.stderr.as_slice()).into_owned();
    let mut message = String::new();

    if !stdout.is_empty() {
        message.push_str(format!("stdout: {stdout}").as_str());
    }

    if !stderr.is_empty() {
        message.push_str(format!("stderr: {stderr}").as_str());
    }

    // INVARIANT: Chomp trailing newlines.
    let message = message
        .strip_suffix("\r\n")
        .or(message.strip_suffix('\n'))
        .map(ToString::to_string)
        .unwrap_or(message);

    if !output.status.success() {
        return Err(CloneError::ExitStatus {
            command: cmd.as_ref().to_string_lossy().into_owned(),
            status: output.status,
            message,
        });
    }

    Ok(message)
}

/// Bootstrap clone error types.
#[derive(Debug, thiserror::Error)]
pub enum CloneError {
    /// Parent directories of destination cannot be created.
    #[error("failed to create directory {:?}", path.display())]
    CreateDir {
        #[source]
        source: std::io::Error,
        path: PathBuf,
    },

    /// External command cannot be started.
    #[error("failed to run command {command:?}")]
    Spawn {
        #[source]
        source: std::io::Error,
        command: String,
    },

    /// External command exited unsuccessfully.
    #[error("command {command:?} failed with {status}:\n{message}")]
    ExitStatus {
        command: String,
        status: std::process::ExitStatus,
        message: String,
    },

    /// Style template cannot be set for progress bars.
    #[error(transparent)]
    IndicatifStyleTemplate(#[from] indicatif::style::TemplateError),

    /// Operations from libgit2 fail.
    #[error(transparent)]
    Git2(#[from] git2::Error),
}

/// Friendly result alias :3
pub type Result<T, E = CloneError> = std::result::Result<T, E>;
