// SPDX-FileCopyrightText: 2025 Jason Pena <jasonpena@awkless.com>
// SPDX-License-Identifier: MIT

use crate::{InstallFixture, RepoFixture};

use dotlink::{
    clone::{CloneError, CloneOutcome, Cloner, Git2Cloner, GitBinary},
    config::{CloneSettings, InstallerConfig, CONFIG_FILE_NAME},
    install::{InstallError, Installer},
    link::LinkOutcome,
};

use anyhow::Result;
use indicatif::ProgressBar;
use indoc::{formatdoc, indoc};
use pretty_assertions::assert_eq;
use sealed_test::prelude::*;
use std::{
    cell::Cell,
    ffi::OsString,
    fs::{read_link, read_to_string, remove_file, symlink_metadata},
    os::unix::fs::symlink,
    path::Path,
    process::Command,
};

#[derive(Debug, Default)]
struct CountingCloner {
    calls: Cell<usize>,
}

impl Cloner for CountingCloner {
    fn clone_repo(&self, _url: &str, _destination: &Path) -> Result<(), CloneError> {
        self.calls.set(self.calls.get() + 1);
        Ok(())
    }
}

fn clone_settings(name: &str, url: &str) -> CloneSettings {
    CloneSettings {
        name: name.into(),
        url: url.into(),
        ..Default::default()
    }
}

#[sealed_test]
fn install_links_into_clean_home() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("vimrc", "set number")?;
    fixture.repo_file("bashrc", "export EDITOR=vim")?;

    let report = Installer::new(&fixture.repo, &fixture.home, InstallerConfig::default()).run()?;

    let outcomes = report
        .links
        .iter()
        .map(|(entry, outcome)| (entry.name().to_os_string(), outcome.clone()))
        .collect::<Vec<_>>();
    assert_eq!(
        outcomes,
        vec![
            (OsString::from("bashrc"), LinkOutcome::Created),
            (OsString::from("vimrc"), LinkOutcome::Created),
        ]
    );
    assert_eq!(read_link(fixture.home.join(".vimrc"))?, fixture.repo.join("vimrc"));
    assert_eq!(read_link(fixture.home.join(".bashrc"))?, fixture.repo.join("bashrc"));
    assert!(!fixture.home.join(".vimrc.bak").exists());
    assert!(!fixture.home.join(".bashrc.bak").exists());
    assert_eq!(report.clone, None);

    Ok(())
}

#[sealed_test]
fn install_never_links_excluded_entries() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file(".git/HEAD", "ref: refs/heads/main")?;
    fixture.repo_file("templates/zshrc.j2", "export HOME={{ home }}")?;
    fixture.repo_file(CONFIG_FILE_NAME, "[link]\nexclude = [\"README.md\"]\n")?;
    fixture.repo_file("README.md", "my dotfiles")?;
    fixture.repo_file("tmux.conf", "set -g mouse on")?;

    let config = InstallerConfig::load(&fixture.repo)?;
    Installer::new(&fixture.repo, &fixture.home, config).run()?;

    for excluded in [".git", ".templates", ".dotlink.toml", ".README.md"] {
        assert!(symlink_metadata(fixture.home.join(excluded)).is_err(), "{excluded} linked");
    }
    assert_eq!(
        read_link(fixture.home.join(".tmux.conf"))?,
        fixture.repo.join("tmux.conf")
    );

    Ok(())
}

#[sealed_test]
fn install_backs_up_regular_file_and_replaces_symlink() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("bashrc", "new bashrc")?;
    fixture.repo_file("vimrc", "new vimrc")?;
    fixture.home_file(".bashrc", "old bashrc")?;
    fixture.home_file("old-vimrc", "old vimrc")?;
    symlink(fixture.home.join("old-vimrc"), fixture.home.join(".vimrc"))?;

    Installer::new(&fixture.repo, &fixture.home, InstallerConfig::default()).run()?;

    assert_eq!(read_to_string(fixture.home.join(".bashrc.bak"))?, "old bashrc");
    assert_eq!(read_link(fixture.home.join(".bashrc"))?, fixture.repo.join("bashrc"));
    assert_eq!(read_to_string(fixture.home.join(".bashrc"))?, "new bashrc");

    assert!(symlink_metadata(fixture.home.join(".vimrc.bak")).is_err());
    assert_eq!(read_link(fixture.home.join(".vimrc"))?, fixture.repo.join("vimrc"));
    assert_eq!(read_to_string(fixture.home.join("old-vimrc"))?, "old vimrc");

    Ok(())
}

#[sealed_test]
fn install_twice_keeps_links_and_reuses_backup_slot() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("bashrc", "repo bashrc")?;
    fixture.home_file(".bashrc", "first")?;
    let installer = Installer::new(&fixture.repo, &fixture.home, InstallerConfig::default());

    installer.run()?;
    assert_eq!(read_to_string(fixture.home.join(".bashrc.bak"))?, "first");

    let report = installer.run()?;
    assert_eq!(report.links[0].1, LinkOutcome::Relinked);
    assert_eq!(read_link(fixture.home.join(".bashrc"))?, fixture.repo.join("bashrc"));
    assert_eq!(read_to_string(fixture.home.join(".bashrc.bak"))?, "first");

    // Single backup slot gets overwritten once a real file shows up again.
    remove_file(fixture.home.join(".bashrc"))?;
    fixture.home_file(".bashrc", "second")?;
    installer.run()?;
    assert_eq!(read_to_string(fixture.home.join(".bashrc.bak"))?, "second");
    assert_eq!(read_link(fixture.home.join(".bashrc"))?, fixture.repo.join("bashrc"));

    Ok(())
}

#[sealed_test]
fn install_renders_templates_with_home_path() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file(
        "templates/gitconfig.j2",
        indoc! {r#"
            [core]
                excludesfile = {{ home }}/.gitignore_global
                hooksPath = {{ target_dir }}/hooks
        "#},
    )?;
    fixture.repo_file("templates/config/app/app.conf.j2", "user = {{ user }}\n")?;
    fixture.home_file(".config/app/app.conf", "stale output that must vanish\n")?;

    let mut config = InstallerConfig::default();
    config.variables.insert("user".into(), "blah".into());
    let report = Installer::new(&fixture.repo, &fixture.home, config).run()?;

    assert_eq!(
        report.rendered,
        vec![
            fixture.home.join(".config/app/app.conf"),
            fixture.home.join(".gitconfig"),
        ]
    );
    let expect = formatdoc! {r#"
            [core]
                excludesfile = {}/.gitignore_global
                hooksPath = {}/hooks
        "#,
        fixture.home.display(),
        fixture.repo.display(),
    };
    assert_eq!(read_to_string(fixture.home.join(".gitconfig"))?, expect);
    assert!(!symlink_metadata(fixture.home.join(".gitconfig"))?.file_type().is_symlink());
    assert_eq!(read_to_string(fixture.home.join(".config/app/app.conf"))?, "user = blah\n");

    Ok(())
}

#[sealed_test]
fn install_skips_clone_when_destination_exists() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.home_file("projects/github/other/tool/README", "already here")?;

    let mut config = InstallerConfig::default();
    config.clone = Some(clone_settings("tool", "https://blah.org/tool.git"));
    let cloner = CountingCloner::default();
    let report = Installer::new(&fixture.repo, &fixture.home, config).run_with_cloner(&cloner)?;

    assert_eq!(report.clone, Some(CloneOutcome::Skipped));
    assert_eq!(cloner.calls.get(), 0);

    Ok(())
}

#[sealed_test]
fn install_clones_missing_destination_through_libgit2() -> Result<()> {
    let fixture = InstallFixture::new()?;
    let remote = RepoFixture::new(fixture.home.parent().unwrap().join("remote"))?;
    remote.stage_and_commit("README.md", "tool readme")?;

    let mut config = InstallerConfig::default();
    config.clone = Some(clone_settings("tool", &remote.url()));
    let report = Installer::new(&fixture.repo, &fixture.home, config)
        .run_with_cloner(Git2Cloner::new(ProgressBar::hidden()))?;

    let destination = fixture.home.join("projects/github/other/tool");
    assert_eq!(report.clone, Some(CloneOutcome::Cloned));
    assert_eq!(read_to_string(destination.join("README.md"))?, "tool readme");

    Ok(())
}

#[sealed_test]
fn install_clones_missing_destination_through_git_binary() -> Result<()> {
    let fixture = InstallFixture::new()?;
    let remote = RepoFixture::new(fixture.home.parent().unwrap().join("remote"))?;
    remote.stage_and_commit("README.md", "tool readme")?;

    let mut config = InstallerConfig::default();
    config.clone = Some(CloneSettings {
        path: Some("src/tool".into()),
        ..clone_settings("tool", &remote.url())
    });
    let report = Installer::new(&fixture.repo, &fixture.home, config).run_with_cloner(GitBinary)?;

    let destination = fixture.home.join("src/tool");
    assert_eq!(report.clone, Some(CloneOutcome::Cloned));
    assert_eq!(read_to_string(destination.join("README.md"))?, "tool readme");
    assert!(destination.join(".git").is_dir());

    Ok(())
}

#[sealed_test]
fn install_skip_flags_leave_templates_and_clone_alone() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("templates/gitconfig.j2", "{{ home }}")?;

    let mut config = InstallerConfig::default();
    config.clone = Some(clone_settings("tool", "https://blah.org/tool.git"));
    let cloner = CountingCloner::default();
    let report = Installer::new(&fixture.repo, &fixture.home, config)
        .skip_templates(true)
        .skip_clone(true)
        .run_with_cloner(&cloner)?;

    assert!(report.rendered.is_empty());
    assert_eq!(report.clone, None);
    assert!(!fixture.home.join(".gitconfig").exists());
    assert_eq!(cloner.calls.get(), 0);

    Ok(())
}

#[sealed_test]
fn install_aborts_on_render_failure() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("vimrc", "set number")?;
    fixture.repo_file("templates/a.j2", "{{ missing }}")?;
    fixture.repo_file("templates/b.j2", "{{ home }}")?;

    let mut config = InstallerConfig::default();
    config.clone = Some(clone_settings("tool", "https://blah.org/tool.git"));
    let cloner = CountingCloner::default();
    let result = Installer::new(&fixture.repo, &fixture.home, config).run_with_cloner(&cloner);

    assert!(matches!(result, Err(InstallError::Render(_))));
    assert_eq!(read_link(fixture.home.join(".vimrc"))?, fixture.repo.join("vimrc"));
    assert!(!fixture.home.join(".b").exists());
    assert_eq!(cloner.calls.get(), 0);

    Ok(())
}

#[sealed_test]
fn cli_exits_zero_after_install() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("vimrc", "set number")?;
    fixture.repo_file("templates/gitconfig.j2", "{{ home }}")?;

    let output = Command::new(env!("CARGO_BIN_EXE_dotlink"))
        .arg("--repo")
        .arg(&fixture.repo)
        .arg("--home")
        .arg(&fixture.home)
        .arg("--skip-clone")
        .output()?;

    assert_eq!(output.status.code(), Some(0));
    assert_eq!(read_link(fixture.home.join(".vimrc"))?, fixture.repo.join("vimrc"));
    assert_eq!(
        read_to_string(fixture.home.join(".gitconfig"))?,
        fixture.home.display().to_string()
    );

    Ok(())
}

#[sealed_test]
fn cli_exits_one_on_render_failure() -> Result<()> {
    let fixture = InstallFixture::new()?;
    fixture.repo_file("vimrc", "set number")?;
    fixture.repo_file("templates/gitconfig.j2", "{{ missing }}")?;

    let output = Command::new(env!("CARGO_BIN_EXE_dotlink"))
        .arg("--repo")
        .arg(&fixture.repo)
        .arg("--home")
        .arg(&fixture.home)
        .output()?;

    assert_eq!(output.status.code(), Some(1));
    assert!(!fixture.home.join(".gitconfig").exists());

    Ok(())
}
