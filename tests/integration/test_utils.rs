//! Shared test utilities for integration tests
//!
//! Scratch trees, scratch git repositories, an in-memory backend, and
//! isolation of the environment variables configuration loading reads.

#![allow(dead_code)]

use docforest::backend::{guard_path, DirEntry, FileMeta, SourceBackend};
use docforest::config::SourceConfig;
use docforest::error::BackendError;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Mutex;
use tempfile::TempDir;

/// Serializes tests that touch process-wide environment variables.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

/// Run `f` with `XDG_CONFIG_HOME` and `HOME` pointed into `test_dir`, plus
/// any extra variables, restoring everything afterwards.
pub fn with_isolated_env<F, R>(test_dir: &TempDir, vars: &[(&str, &str)], f: F) -> R
where
    F: FnOnce() -> R,
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());

    let mut names: Vec<&str> = vec!["HOME", "XDG_CONFIG_HOME"];
    names.extend(vars.iter().map(|(k, _)| *k));
    let saved: Vec<(String, Option<String>)> = names
        .iter()
        .map(|k| (k.to_string(), std::env::var(k).ok()))
        .collect();

    let home = test_dir.path().join("home");
    let config_home = test_dir.path().join("config");
    std::fs::create_dir_all(&home).unwrap();
    std::fs::create_dir_all(&config_home).unwrap();
    std::env::set_var("HOME", &home);
    std::env::set_var("XDG_CONFIG_HOME", &config_home);
    for (k, v) in vars {
        std::env::set_var(k, v);
    }

    let result = f();

    for (k, v) in saved {
        match v {
            Some(v) => std::env::set_var(&k, v),
            None => std::env::remove_var(&k),
        }
    }
    result
}

/// Write `body` to `root/rel`, creating parent directories.
pub fn write_file(root: &Path, rel: &str, body: &str) {
    let path = root.join(rel);
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).unwrap();
    }
    std::fs::write(path, body).unwrap();
}

pub fn source(path: &Path, alias: &str, git_ref: Option<&str>) -> SourceConfig {
    SourceConfig {
        path: path.to_path_buf(),
        alias: alias.to_string(),
        git_ref: git_ref.map(|r| r.to_string()),
        sub_path: None,
        exclude: Vec::new(),
    }
}

/// True when a usable `git` binary is on PATH.
pub fn git_available() -> bool {
    Command::new("git")
        .arg("--version")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A throwaway git repository with `main` as its initial branch.
pub struct GitRepo {
    dir: TempDir,
}

impl GitRepo {
    pub fn init() -> Self {
        let dir = TempDir::new().unwrap();
        let repo = Self { dir };
        repo.git(&["init", "-q"]);
        repo.git(&["symbolic-ref", "HEAD", "refs/heads/main"]);
        repo
    }

    pub fn path(&self) -> PathBuf {
        dunce::canonicalize(self.dir.path()).unwrap()
    }

    pub fn write(&self, rel: &str, body: &str) {
        write_file(self.dir.path(), rel, body);
    }

    pub fn remove(&self, rel: &str) {
        std::fs::remove_file(self.dir.path().join(rel)).unwrap();
    }

    /// Stage everything and commit; returns the new commit id.
    pub fn commit_all(&self, message: &str) -> String {
        self.git(&["add", "-A"]);
        self.git(&[
            "-c",
            "user.name=Docforest Tests",
            "-c",
            "user.email=tests@docforest.invalid",
            "-c",
            "commit.gpgsign=false",
            "commit",
            "-q",
            "-m",
            message,
        ]);
        self.git(&["rev-parse", "HEAD"]).trim().to_string()
    }

    pub fn git(&self, args: &[&str]) -> String {
        let output = Command::new("git")
            .arg("-C")
            .arg(self.dir.path())
            .args(args)
            .output()
            .unwrap();
        assert!(
            output.status.success(),
            "git {:?} failed: {}",
            args,
            String::from_utf8_lossy(&output.stderr)
        );
        String::from_utf8_lossy(&output.stdout).to_string()
    }
}

/// In-memory source: a set of file paths with contents. Directories exist
/// implicitly as prefixes of file paths.
#[derive(Debug, Clone, Default)]
pub struct MemoryBackend {
    files: BTreeMap<String, Vec<u8>>,
}

impl MemoryBackend {
    pub fn new<'a>(files: impl IntoIterator<Item = &'a str>) -> Self {
        Self {
            files: files
                .into_iter()
                .map(|p| (p.to_string(), p.as_bytes().to_vec()))
                .collect(),
        }
    }

    fn is_dir(&self, rel: &str) -> bool {
        if rel.is_empty() {
            return true;
        }
        let prefix = format!("{}/", rel);
        self.files.keys().any(|k| k.starts_with(&prefix))
    }
}

impl SourceBackend for MemoryBackend {
    fn read(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let rel = guard_path(path)?;
        self.files
            .get(&rel)
            .cloned()
            .ok_or(BackendError::NotFound(rel))
    }

    fn stat(&self, path: &str) -> Result<FileMeta, BackendError> {
        let rel = guard_path(path)?;
        let name = rel.rsplit('/').next().unwrap_or_default().to_string();
        if let Some(body) = self.files.get(&rel) {
            return Ok(FileMeta {
                name,
                is_dir: false,
                size: body.len() as u64,
                mod_time: None,
            });
        }
        if self.is_dir(&rel) {
            return Ok(FileMeta {
                name,
                is_dir: true,
                size: 0,
                mod_time: None,
            });
        }
        Err(BackendError::NotFound(rel))
    }

    fn list(&self, path: &str) -> Result<Vec<DirEntry>, BackendError> {
        let rel = guard_path(path)?;
        if !self.is_dir(&rel) {
            return Err(BackendError::NotFound(rel));
        }
        let prefix = if rel.is_empty() {
            String::new()
        } else {
            format!("{}/", rel)
        };

        let mut children: BTreeMap<String, bool> = BTreeMap::new();
        for key in self.files.keys() {
            if let Some(rest) = key.strip_prefix(&prefix) {
                match rest.split_once('/') {
                    Some((dir, _)) => {
                        children.insert(dir.to_string(), true);
                    }
                    None => {
                        children.entry(rest.to_string()).or_insert(false);
                    }
                }
            }
        }
        Ok(children
            .into_iter()
            .map(|(name, is_dir)| DirEntry { name, is_dir })
            .collect())
    }
}
