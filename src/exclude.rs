//! Exclusion rules shared by tree construction and change watching.
//!
//! Three tiers are evaluated in a fixed order: global patterns against the
//! bare name, then the merged list (repo-shared patterns followed by
//! folder-specific ones) against the path relative to the source root.
//! The first match excludes. Files must also carry a recognized extension.

use glob::{MatchOptions, Pattern};
use tracing::debug;

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

/// One configured pattern, compiled once.
#[derive(Debug, Clone)]
struct Rule {
    raw: String,
    /// Cleaned form used for exact and directory-prefix matching
    clean: String,
    /// Absent when the pattern is not a valid glob; only exact matching applies then
    glob: Option<Pattern>,
}

impl Rule {
    fn compile(raw: &str) -> Self {
        let glob = match Pattern::new(raw) {
            Ok(p) => Some(p),
            Err(e) => {
                debug!(pattern = raw, error = %e, "Exclusion is not a valid glob");
                None
            }
        };
        Self {
            raw: raw.to_string(),
            clean: clean_pattern(raw),
            glob,
        }
    }

    fn glob_matches(&self, candidate: &str) -> bool {
        self.glob
            .as_ref()
            .map_or(false, |p| p.matches_with(candidate, MATCH_OPTIONS))
    }
}

fn clean_pattern(raw: &str) -> String {
    let mut clean = raw;
    while let Some(rest) = clean.strip_prefix("./") {
        clean = rest;
    }
    clean.trim_end_matches('/').to_string()
}

fn base_name(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    match trimmed.rfind('/') {
        Some(idx) => &trimmed[idx + 1..],
        None => trimmed,
    }
}

/// Process-wide filters: global exclusions and recognized extensions.
#[derive(Debug, Clone)]
pub struct GlobalRules {
    patterns: Vec<Rule>,
    extensions: Vec<String>,
}

impl GlobalRules {
    pub fn new(patterns: &[String], extensions: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| Rule::compile(p)).collect(),
            extensions: extensions.to_vec(),
        }
    }

    /// True when the final segment of `path` matches a global pattern.
    pub fn is_excluded(&self, path: &str) -> bool {
        let name = base_name(path);
        self.patterns
            .iter()
            .any(|rule| rule.glob_matches(name) || (rule.glob.is_none() && rule.raw == name))
    }

    /// True when the file name carries one of the configured extensions.
    ///
    /// The extension is everything from the last `.` of the final segment,
    /// compared case-sensitively.
    pub fn has_recognized_extension(&self, path: &str) -> bool {
        let name = base_name(path);
        match name.rfind('.') {
            Some(idx) => {
                let ext = &name[idx..];
                self.extensions.iter().any(|e| e == ext)
            }
            None => false,
        }
    }
}

/// Repo-shared plus folder-specific patterns for one source.
#[derive(Debug, Clone, Default)]
pub struct FolderRules {
    patterns: Vec<Rule>,
}

impl FolderRules {
    pub fn new(patterns: &[String]) -> Self {
        Self {
            patterns: patterns.iter().map(|p| Rule::compile(p)).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.patterns.is_empty()
    }

    /// Match a path relative to the source root against every pattern: as a
    /// glob over the whole path, as a glob over the bare name, or as an exact
    /// path or directory prefix.
    pub fn is_excluded(&self, rel_path: &str) -> bool {
        let name = base_name(rel_path);
        self.patterns.iter().any(|rule| {
            if rule.glob_matches(rel_path) || rule.glob_matches(name) {
                return true;
            }
            !rule.clean.is_empty()
                && (rel_path == rule.clean
                    || rel_path
                        .strip_prefix(rule.clean.as_str())
                        .map_or(false, |rest| rest.starts_with('/')))
        })
    }
}
