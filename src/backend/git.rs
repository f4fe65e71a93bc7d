//! Git snapshot backend
//!
//! Serves a source out of a git object database at a fixed ref without a
//! checkout. Every call shells out to `git` and parses its textual output:
//!
//! - `read`  -> `git cat-file blob <ref>:<path>`
//! - `stat`  -> `git rev-parse --verify <ref>` for the root, otherwise
//!   `git ls-tree -z <ref> <path>` (retried as `<path>/` when empty) plus
//!   `git cat-file -s` for blob sizes
//! - `list`  -> `git ls-tree -z <ref> [<path>/]`
//! - mod time -> `git log -1 --format=%ct <ref> -- [<path>]`
//!
//! Listings are NUL-terminated so names git would otherwise C-quote come
//! through verbatim.
//!
//! Spawn failures are `Unavailable`; exit-coded failures are `NotFound` where
//! the protocol uses them to signal absence.

use crate::backend::{base_name, guard_path, DirEntry, FileMeta, SourceBackend};
use crate::error::BackendError;
use chrono::{DateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::{debug, instrument, trace};

/// Stderr fragments git prints when an object or path does not exist.
const NOT_FOUND_PHRASES: &[&str] = &[
    "does not exist",
    "not exist",
    "invalid object name",
    "not a valid object name",
    "bad revision",
    "bad file",
    "unknown revision",
];

/// Raw result of one git invocation that managed to run.
#[derive(Debug, Clone, Default)]
pub(crate) struct GitOutput {
    pub success: bool,
    pub stdout: Vec<u8>,
    pub stderr: String,
}

/// Runs git against a repository. Split out so the output parsing can be
/// exercised against scripted responses.
pub(crate) trait GitInvoker: Send + Sync {
    fn invoke(&self, repo: &Path, args: &[String]) -> Result<GitOutput, BackendError>;
}

/// Invokes the `git` binary found on `PATH`.
struct SystemGit;

impl GitInvoker for SystemGit {
    fn invoke(&self, repo: &Path, args: &[String]) -> Result<GitOutput, BackendError> {
        let output = Command::new("git")
            .arg("-C")
            .arg(repo)
            .args(["-c", "core.quotePath=false"])
            .args(args)
            .env("GIT_TERMINAL_PROMPT", "0")
            .output()
            .map_err(|e| {
                BackendError::Unavailable(format!("git {} execution failed: {}", args.join(" "), e))
            })?;
        Ok(GitOutput {
            success: output.status.success(),
            stdout: output.stdout,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        })
    }
}

/// Why a git call did not yield stdout.
enum GitFailure {
    /// Could not run git at all.
    Transport(BackendError),
    /// git ran and exited non-zero.
    Exit(String),
}

impl GitFailure {
    /// Collapse into `NotFound` unless git could not be run.
    fn absent(self, what: &str) -> BackendError {
        match self {
            GitFailure::Transport(err) => err,
            GitFailure::Exit(stderr) => {
                trace!(what, stderr = %stderr, "git reported failure, treating as absent");
                BackendError::NotFound(what.to_string())
            }
        }
    }
}

/// The parts of a `git ls-tree` line (`<mode> <type> <object>\t<path>`) we use.
#[derive(Debug, Clone, PartialEq, Eq)]
struct TreeRecord {
    kind: String,
    path: String,
}

impl TreeRecord {
    fn is_tree(&self) -> bool {
        self.kind == "tree"
    }
}

fn parse_tree_line(line: &str) -> Result<TreeRecord, BackendError> {
    let (meta, path) = line
        .split_once('\t')
        .ok_or_else(|| BackendError::MalformedOutput(format!("no tab in ls-tree line: {:?}", line)))?;
    let fields: Vec<&str> = meta.split_whitespace().collect();
    if fields.len() < 3 || path.is_empty() {
        return Err(BackendError::MalformedOutput(format!(
            "unexpected ls-tree line: {:?}",
            line
        )));
    }
    Ok(TreeRecord {
        kind: fields[1].to_string(),
        path: path.to_string(),
    })
}

/// Non-empty NUL-terminated records of `ls-tree -z` output.
fn tree_records(out: &str) -> impl Iterator<Item = &str> {
    out.split('\0').filter(|record| !record.trim().is_empty())
}

fn is_not_found_message(stderr: &str) -> bool {
    let lower = stderr.to_lowercase();
    NOT_FOUND_PHRASES.iter().any(|phrase| lower.contains(phrase))
}

/// Serves one ref of one repository.
pub struct GitBackend {
    repo: PathBuf,
    git_ref: String,
    invoker: Box<dyn GitInvoker>,
}

impl std::fmt::Debug for GitBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GitBackend")
            .field("repo", &self.repo)
            .field("git_ref", &self.git_ref)
            .finish()
    }
}

impl GitBackend {
    pub fn new(repo: PathBuf, git_ref: String) -> Self {
        Self::with_invoker(repo, git_ref, Box::new(SystemGit))
    }

    pub(crate) fn with_invoker(repo: PathBuf, git_ref: String, invoker: Box<dyn GitInvoker>) -> Self {
        Self {
            repo,
            git_ref,
            invoker,
        }
    }

    pub fn repo(&self) -> &Path {
        &self.repo
    }

    pub fn git_ref(&self) -> &str {
        &self.git_ref
    }

    fn run(&self, args: &[&str]) -> Result<Vec<u8>, GitFailure> {
        let args: Vec<String> = args.iter().map(|a| a.to_string()).collect();
        debug!(repo = %self.repo.display(), args = %args.join(" "), "Running git");
        let output = self
            .invoker
            .invoke(&self.repo, &args)
            .map_err(GitFailure::Transport)?;
        if output.success {
            Ok(output.stdout)
        } else {
            Err(GitFailure::Exit(output.stderr))
        }
    }

    fn run_text(&self, args: &[&str]) -> Result<String, GitFailure> {
        self.run(args)
            .map(|out| String::from_utf8_lossy(&out).to_string())
    }

    /// Refs beginning with `-` would be parsed as options.
    fn checked_ref(&self) -> Result<&str, BackendError> {
        if self.git_ref.is_empty() || self.git_ref.starts_with('-') {
            return Err(BackendError::NotFound(format!("ref {:?}", self.git_ref)));
        }
        Ok(&self.git_ref)
    }

    /// Commit time of the latest commit on the ref touching `path`.
    /// Unset when there is no such history or git cannot tell us.
    fn mod_time(&self, git_ref: &str, path: &str) -> Option<DateTime<Utc>> {
        let result = if path.is_empty() {
            self.run_text(&["log", "-1", "--format=%ct", git_ref, "--"])
        } else {
            self.run_text(&["log", "-1", "--format=%ct", git_ref, "--", path])
        };
        let out = result.ok()?;
        let secs: i64 = out.trim().parse().ok()?;
        Utc.timestamp_opt(secs, 0).single()
    }

    fn blob_size(&self, git_ref: &str, path: &str) -> u64 {
        let spec = format!("{}:{}", git_ref, path);
        self.run_text(&["cat-file", "-s", &spec])
            .ok()
            .and_then(|out| out.trim().parse().ok())
            .unwrap_or(0)
    }

    fn ls_tree(&self, git_ref: &str, path: &str) -> Result<String, GitFailure> {
        if path.is_empty() {
            self.run_text(&["ls-tree", "-z", git_ref])
        } else {
            self.run_text(&["ls-tree", "-z", git_ref, path])
        }
    }
}

impl SourceBackend for GitBackend {
    #[instrument(skip(self), fields(git_ref = %self.git_ref))]
    fn read(&self, path: &str) -> Result<Vec<u8>, BackendError> {
        let rel = guard_path(path)?;
        let git_ref = self.checked_ref()?;
        if rel.is_empty() {
            return Err(BackendError::NotFound("cannot read the root as a file".to_string()));
        }

        let spec = format!("{}:{}", git_ref, rel);
        match self.run(&["cat-file", "blob", &spec]) {
            Ok(bytes) => Ok(bytes),
            Err(GitFailure::Transport(err)) => Err(err),
            Err(GitFailure::Exit(stderr)) if is_not_found_message(&stderr) => {
                Err(BackendError::NotFound(rel))
            }
            Err(GitFailure::Exit(stderr)) => Err(BackendError::Unavailable(format!(
                "git cat-file blob {}: {}",
                spec, stderr
            ))),
        }
    }

    #[instrument(skip(self), fields(git_ref = %self.git_ref))]
    fn stat(&self, path: &str) -> Result<FileMeta, BackendError> {
        let rel = guard_path(path)?;
        let git_ref = self.checked_ref()?;

        if rel.is_empty() {
            self.run(&["rev-parse", "--verify", "--quiet", git_ref])
                .map_err(|f| f.absent(git_ref))?;
            return Ok(FileMeta {
                name: git_ref.to_string(),
                is_dir: true,
                size: 0,
                mod_time: self.mod_time(git_ref, ""),
            });
        }

        let out = self.ls_tree(git_ref, &rel).map_err(|f| f.absent(&rel))?;

        let Some(first) = tree_records(&out).next() else {
            // Nothing listed under the exact name: probe for a directory by
            // listing its contents instead.
            let probe = format!("{}/", rel);
            let contents = self.ls_tree(git_ref, &probe).map_err(|f| f.absent(&rel))?;
            if tree_records(&contents).next().is_none() {
                return Err(BackendError::NotFound(rel));
            }
            return Ok(FileMeta {
                name: base_name(&rel).to_string(),
                is_dir: true,
                size: 0,
                mod_time: self.mod_time(git_ref, &rel),
            });
        };

        let record = match parse_tree_line(first) {
            Ok(record) => record,
            Err(err) => {
                debug!(error = %err, "Unparseable ls-tree output, treating as absent");
                return Err(BackendError::NotFound(rel));
            }
        };

        let mod_time = self.mod_time(git_ref, &rel);
        if record.is_tree() {
            return Ok(FileMeta {
                name: base_name(&rel).to_string(),
                is_dir: true,
                size: 0,
                mod_time,
            });
        }

        Ok(FileMeta {
            name: base_name(&rel).to_string(),
            is_dir: false,
            size: self.blob_size(git_ref, &rel),
            mod_time,
        })
    }

    #[instrument(skip(self), fields(git_ref = %self.git_ref))]
    fn list(&self, path: &str) -> Result<Vec<DirEntry>, BackendError> {
        let rel = guard_path(path)?;
        let git_ref = self.checked_ref()?;

        let query = if rel.is_empty() {
            String::new()
        } else {
            format!("{}/", rel)
        };
        let out = self.ls_tree(git_ref, &query).map_err(|f| f.absent(&rel))?;

        // Trees are never stored empty, so a listing with no records means
        // the path is absent or names a blob.
        let mut records = tree_records(&out).peekable();
        if !rel.is_empty() && records.peek().is_none() {
            return Err(BackendError::NotFound(rel));
        }

        let mut entries = Vec::new();
        for record in records {
            match parse_tree_line(record) {
                Ok(record) => entries.push(DirEntry {
                    name: base_name(&record.path).to_string(),
                    is_dir: record.is_tree(),
                }),
                Err(err) => trace!(error = %err, "Skipping ls-tree line"),
            }
        }
        Ok(entries)
    }
}
