//! Discovery skip rules
//!
//! Fixed deny-list of tool and build directories plus the root `.gitignore`.

use ignore::gitignore::{Gitignore, GitignoreBuilder};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Directory names never descended into during discovery
pub const DENY_LIST: &[&str] = &[
    ".git",
    ".hg",
    ".svn",
    "node_modules",
    "target",
    "build",
    "dist",
    "out",
    ".venv",
    "venv",
    "__pycache__",
    ".idea",
    ".vscode",
];

/// Skip rules for workspace discovery: the fixed deny-list plus the
/// workspace root's `.gitignore`, if any.
#[derive(Clone)]
pub struct IgnoreFilter {
    gitignore: Option<Gitignore>,
    workspace_root: PathBuf,
}

impl IgnoreFilter {
    /// Create a filter for `workspace_root`, loading its `.gitignore` when present
    pub fn new(workspace_root: &Path) -> Self {
        let gitignore_path = workspace_root.join(".gitignore");

        let gitignore = if gitignore_path.is_file() {
            let mut builder = GitignoreBuilder::new(workspace_root);
            // add() returns Option<Error>, not Result
            if let Some(e) = builder.add(&gitignore_path) {
                debug!("[Ignore] failed to load .gitignore: {}", e);
                None
            } else {
                match builder.build() {
                    Ok(gi) => Some(gi),
                    Err(e) => {
                        // fail open
                        debug!("[Ignore] failed to build gitignore matcher: {}", e);
                        None
                    }
                }
            }
        } else {
            None
        };

        Self {
            gitignore,
            workspace_root: workspace_root.to_path_buf(),
        }
    }

    /// Whether discovery should skip `path`
    pub fn should_skip(&self, path: &Path, is_dir: bool) -> bool {
        if is_dir
            && path
                .file_name()
                .and_then(|n| n.to_str())
                .is_some_and(|n| DENY_LIST.contains(&n))
        {
            return true;
        }

        let Some(gitignore) = &self.gitignore else {
            return false;
        };
        let Ok(rel_path) = path.strip_prefix(&self.workspace_root) else {
            // outside the workspace; nothing to match against
            return false;
        };

        match gitignore.matched(rel_path, is_dir) {
            ignore::Match::Ignore(_) => true,
            ignore::Match::Whitelist(_) | ignore::Match::None => false,
        }
    }
}
