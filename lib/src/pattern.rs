//! Glob pattern compilation and ignore-directory detection (module B).
//!
//! Path arguments are shell-glob patterns (`?`, `*`, `[abc]`), escapable
//! with backslash, matched component-by-component against repo-relative
//! paths. `**` is rejected: sod patterns are never recursive (spec.md §4.B,
//! §9 — this is a deliberate, documented limitation, not an oversight).

use std::path::Path;

use globset::Glob;
use globset::GlobMatcher;
use thiserror::Error;

use crate::repo_path::RepoPathBuf;

#[derive(Debug, Error)]
pub enum PatternError {
    #[error("invalid glob pattern `{pattern}`: {source}")]
    InvalidGlob {
        pattern: String,
        #[source]
        source: globset::Error,
    },
    #[error("recursive `**` is not supported in pattern `{0}`")]
    Recursive(String),
}

/// A compiled repository pattern. Matches are performed component-by-
/// component: `dir1/*.jpg` matches `dir1/a.jpg` but not `dir1/sub/a.jpg`.
/// A pattern naming a directory (no glob metacharacters past a path
/// prefix that happens to be a real directory) additionally matches every
/// path underneath it, which callers test for directly.
pub struct Pattern {
    raw: String,
    matcher: GlobMatcher,
}

impl Pattern {
    pub fn compile(raw: &str) -> Result<Self, PatternError> {
        if raw.contains("**") {
            return Err(PatternError::Recursive(raw.to_string()));
        }
        let unescaped = unescape(raw);
        let glob = Glob::new(&unescaped).map_err(|source| PatternError::InvalidGlob {
            pattern: raw.to_string(),
            source,
        })?;
        Ok(Self { raw: raw.to_string(), matcher: glob.compile_matcher() })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Matches `path` literally against the compiled glob.
    pub fn matches_exact(&self, path: &RepoPathBuf) -> bool {
        self.matcher.is_match(path.as_internal_str_lossy().as_ref())
    }

    /// Matches `path` either directly, or as a descendant of a path that
    /// matches directly (so a pattern naming a directory expands to every
    /// file under it, per spec.md §4.B: "A directory pattern expands to
    /// all files under it").
    pub fn matches(&self, path: &RepoPathBuf) -> bool {
        if self.matches_exact(path) {
            return true;
        }
        let mut current = path.parent();
        while let Some(ancestor) = current {
            if self.matches_exact(&ancestor) {
                return true;
            }
            current = ancestor.parent();
        }
        false
    }
}

/// Processes backslash escapes ahead of glob compilation, so a user can
/// pass `foo\?.txt` to match the literal filename `foo?.txt` (spec.md §9,
/// scenario S4).
fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c == '\\' {
            if let Some(&next) = chars.peek() {
                if matches!(next, '?' | '*' | '[' | ']' | '\\') {
                    out.push('[');
                    out.push(next);
                    out.push(']');
                    chars.next();
                    continue;
                }
            }
        }
        out.push(c);
    }
    out
}

/// Names that mark a directory as ignored when present as an immediate
/// child (spec.md §4.B).
const IGNORE_MARKERS: &[&str] = &[".git", ".svn", ".snapshots"];
const IGNORE_FILE_MARKER: &str = ".sodignore";

/// Returns true if `dir` contains an immediate child that marks it (and
/// everything beneath it) as ignored. Ignoring applies to directories
/// only; per-file ignore is not supported.
pub fn is_ignored_directory(dir: &Path) -> bool {
    for marker in IGNORE_MARKERS {
        if dir.join(marker).exists() {
            return true;
        }
    }
    dir.join(IGNORE_FILE_MARKER).is_file()
}
