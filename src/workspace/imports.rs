//! Import path resolution

use std::path::{Path, PathBuf};

use tracing::debug;

use super::discovery::is_source_file;
use crate::language::SOURCE_EXTENSION;
use crate::utils::normalize_path;

/// Rules that bound where an import may point
#[derive(Debug, Clone, Copy)]
pub struct ImportPolicy<'a> {
    pub workspace_root: Option<&'a Path>,
    pub allow_external: bool,
}

/// Candidate files for `import_path` written inside `importer`: the literal
/// path, then the path with `.mdr` appended when it has no extension.
pub fn import_candidates(import_path: &str, importer: &Path) -> Vec<PathBuf> {
    let import_path = import_path.trim();
    if import_path.is_empty() {
        return Vec::new();
    }
    let raw = Path::new(import_path);
    let joined = if raw.is_absolute() {
        raw.to_path_buf()
    } else {
        importer
            .parent()
            .map(|dir| dir.join(raw))
            .unwrap_or_else(|| raw.to_path_buf())
    };
    let literal = normalize_path(&joined);

    let mut candidates = vec![literal.clone()];
    if literal.extension().is_none() {
        let mut with_ext = literal.into_os_string();
        with_ext.push(".");
        with_ext.push(SOURCE_EXTENSION);
        candidates.push(PathBuf::from(with_ext));
    }
    candidates
}

/// Canonical form of `path`, or its lexical normalisation when it does not exist
pub async fn canonical(path: &Path) -> PathBuf {
    tokio::fs::canonicalize(path)
        .await
        .unwrap_or_else(|_| normalize_path(path))
}

/// Resolve an import to an existing source file, or `None`.
///
/// Candidates outside the workspace root are rejected unless the policy
/// allows external imports, as is anything without the `.mdr` extension.
pub async fn resolve_import(
    import_path: &str,
    importer: &Path,
    policy: ImportPolicy<'_>,
) -> Option<PathBuf> {
    for candidate in import_candidates(import_path, importer) {
        if !is_source_file(&candidate) {
            continue;
        }
        let Ok(meta) = tokio::fs::metadata(&candidate).await else {
            continue;
        };
        if !meta.is_file() {
            continue;
        }
        let resolved = canonical(&candidate).await;
        if let (Some(root), false) = (policy.workspace_root, policy.allow_external) {
            if !resolved.starts_with(canonical(root).await) {
                debug!(
                    "[Imports] {} resolves outside the workspace; ignoring",
                    candidate.display()
                );
                continue;
            }
        }
        return Some(resolved);
    }
    None
}
