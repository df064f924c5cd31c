//! Local git fixtures: bare "remotes" on disk standing in for hosted destinations.
#![allow(dead_code)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use chrono::Utc;
use doc_sync_core::compose::{format_document, DocMeta, RenderedDoc};
use doc_sync_core::config::PublishConfig;

pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .output()
        .expect("git should be installed for publisher tests");
    assert!(
        output.status.success(),
        "git {:?} failed in {}: {}",
        args,
        dir.display(),
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// Empty bare repository.
pub fn bare_remote(root: &Path, name: &str) -> PathBuf {
    let remote = root.join(format!("{name}.git"));
    fs::create_dir_all(&remote).unwrap();
    git(&remote, &["init", "--bare", "--quiet"]);
    remote
}

/// Bare repository whose default branch `branch` holds one commit with `files`.
pub fn seeded_remote(root: &Path, name: &str, branch: &str, files: &[(&str, &str)]) -> PathBuf {
    let remote = bare_remote(root, name);
    push_branch(root, &remote, branch, files);
    git(&remote, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
    remote
}

/// Add a branch with one commit holding `files` to `remote`.
pub fn push_branch(root: &Path, remote: &Path, branch: &str, files: &[(&str, &str)]) {
    let seed = root.join(format!("seed-{branch}-{}", uuid::Uuid::new_v4()));
    fs::create_dir_all(&seed).unwrap();
    git(&seed, &["init", "--quiet"]);
    git(&seed, &["symbolic-ref", "HEAD", &format!("refs/heads/{branch}")]);
    for (name, content) in files {
        let path = seed.join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }
    git(&seed, &["add", "--all"]);
    git(
        &seed,
        &["-c", "user.name=seed", "-c", "user.email=seed@example.com", "commit", "--quiet", "-m", "seed"],
    );
    git(&seed, &["push", "--quiet", remote.to_str().unwrap(), branch]);
    fs::remove_dir_all(seed).unwrap();
}

/// Content of `file` on `branch` of a bare repository, if present.
pub fn remote_file(remote: &Path, branch: &str, file: &str) -> Option<String> {
    let output = Command::new("git")
        .args(["show", &format!("{branch}:{file}")])
        .current_dir(remote)
        .output()
        .ok()?;
    output
        .status
        .success()
        .then(|| String::from_utf8_lossy(&output.stdout).into_owned())
}

pub fn remote_branches(remote: &Path) -> Vec<String> {
    git(remote, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
        .lines()
        .map(str::to_string)
        .collect()
}

pub fn last_commit(remote: &Path, branch: &str) -> String {
    git(remote, &["log", "-1", "--format=%an <%ae> %s", branch])
        .trim()
        .to_string()
}

#[cfg(unix)]
pub fn reject_pushes(remote: &Path) {
    use std::os::unix::fs::PermissionsExt;
    let hook = remote.join("hooks").join("pre-receive");
    fs::create_dir_all(hook.parent().unwrap()).unwrap();
    fs::write(&hook, "#!/bin/sh\necho rejected by test >&2\nexit 1\n").unwrap();
    fs::set_permissions(&hook, fs::Permissions::from_mode(0o755)).unwrap();
}

pub fn publish_config(root: &Path) -> PublishConfig {
    PublishConfig {
        tmp_base: root.join("work"),
        ..Default::default()
    }
}

pub fn doc(sha: &str, content: &str) -> RenderedDoc {
    format_document(
        content,
        &DocMeta {
            sha: sha.to_string(),
            repo_full_name: "acme/shop".to_string(),
        },
        Utc::now(),
    )
}

/// Number of leftover ephemeral checkouts under `<tmp_base>/<prefix>`.
pub fn leftover_checkouts(config: &PublishConfig, prefix: &str) -> usize {
    match fs::read_dir(config.tmp_base.join(prefix)) {
        Ok(entries) => entries.count(),
        Err(_) => 0,
    }
}
