//! Go to definition, find references and rename
//!
//! References are found textually and then confirmed by resolving every
//! occurrence again: an occurrence counts only when it resolves to the same
//! declaration (owning file and offset) as the target.

use std::collections::{HashMap, HashSet};

use lazy_static::lazy_static;
use regex::Regex;
use tracing::debug;

use crate::language::scanner::mask_non_code;
use crate::language::text::is_ident_char;
use crate::language::is_keyword;
use crate::protocol::{Location, PrepareRename, TextEdit, WorkspaceEdit};
use crate::workspace::{Candidate, ReferenceTarget};

use super::analysis::{Analysis, FileKey, SourceFile};
use super::resolve::{resolve_at, resolve_name, Definition};

lazy_static! {
    static ref IDENTIFIER_RE: Regex =
        Regex::new(r"^[\p{L}_][\p{L}\p{N}_]*$").expect("identifier regex");
}

pub fn is_valid_identifier(name: &str) -> bool {
    IDENTIFIER_RE.is_match(name) && !is_keyword(name)
}

/// Whole-word occurrences of `name` in live code within `[from, to)`
fn occurrences(text: &str, name: &str, from: usize, to: usize) -> Vec<usize> {
    let masked = mask_non_code(text);
    let to = to.min(masked.len());
    masked
        .match_indices(name)
        .map(|(i, _)| i)
        .filter(|&i| i >= from && i + name.len() <= to)
        .filter(|&i| {
            let before = masked[..i].chars().next_back();
            let after = masked[i + name.len()..].chars().next();
            !before.is_some_and(is_ident_char) && !after.is_some_and(is_ident_char)
        })
        .collect()
}

pub async fn definition(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
) -> Option<Location> {
    let (_, def) = resolve_at(analysis, file, offset).await?;
    def.location()
}

/// Occurrences in `file` that resolve to `target`
async fn matches_in(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    name: &str,
    target: &(FileKey, usize),
    span: (usize, usize),
) -> Vec<Location> {
    let mut out = Vec::new();
    for start in occurrences(&file.text, name, span.0, span.1) {
        let Some(def) = resolve_name(analysis, file, name, start).await else {
            continue;
        };
        if def.identity().as_ref() == Some(target) {
            out.push(Location {
                uri: file.uri.clone(),
                range: file.range(start, start + name.len()),
            });
        }
    }
    out
}

async fn load_candidate(analysis: &Analysis<'_>, candidate: &Candidate) -> Option<SourceFile> {
    match candidate {
        Candidate::Open(uri) => analysis.file_for_uri(uri).await,
        Candidate::Disk(path) => analysis.file_for_path(path).await,
    }
}

async fn collect_references(
    analysis: &Analysis<'_>,
    def: &Definition,
    include_declaration: bool,
) -> Vec<Location> {
    let Definition::Symbol { file: owner, symbol } = def else {
        return Vec::new();
    };
    let Some(target) = def.identity() else {
        return Vec::new();
    };

    let mut locations = if symbol.kind.is_function_local() {
        let function = symbol
            .container
            .as_deref()
            .and_then(|name| owner.index.functions.iter().find(|f| f.name == name));
        let span = match function.and_then(|f| f.body_range.map(|b| (f.offset, b.end + 1))) {
            Some(span) => span,
            None => (0, owner.text.len()),
        };
        matches_in(analysis, owner, &symbol.name, &target, span).await
    } else {
        let open = analysis.open_file_handles().await;
        let candidates = analysis
            .workspace()
            .reference_candidates(
                ReferenceTarget {
                    uri: &owner.uri,
                    path: owner.path.as_deref(),
                    function_local: false,
                },
                &open,
            )
            .await;

        let mut seen: HashSet<FileKey> = HashSet::new();
        let mut out = Vec::new();
        for candidate in &candidates {
            let Some(file) = load_candidate(analysis, candidate).await else {
                continue;
            };
            if !seen.insert(file.key()) {
                continue;
            }
            let span = (0, file.text.len());
            out.extend(matches_in(analysis, &file, &symbol.name, &target, span).await);
        }
        out
    };

    if !include_declaration {
        let declaration = owner.location(symbol);
        locations.retain(|l| *l != declaration);
    }
    debug!(
        "[References] {} reference(s) to {}",
        locations.len(),
        symbol.name
    );
    locations
}

pub async fn references(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
    include_declaration: bool,
) -> Vec<Location> {
    match resolve_at(analysis, file, offset).await {
        Some((_, def)) => collect_references(analysis, &def, include_declaration).await,
        None => Vec::new(),
    }
}

/// Range and current name of a renameable symbol at `offset`
pub async fn prepare_rename(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
) -> Option<PrepareRename> {
    let (word, def) = resolve_at(analysis, file, offset).await?;
    match def {
        Definition::Symbol { .. } => Some(PrepareRename {
            range: word.range(file),
            placeholder: word.name,
        }),
        Definition::Builtin(_) | Definition::Keyword(_) => None,
    }
}

pub async fn rename(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
    new_name: &str,
) -> WorkspaceEdit {
    if !is_valid_identifier(new_name) {
        debug!("[Rename] rejected new name {:?}", new_name);
        return WorkspaceEdit::default();
    }
    let Some((_, def)) = resolve_at(analysis, file, offset).await else {
        return WorkspaceEdit::default();
    };
    if !matches!(def, Definition::Symbol { .. }) {
        return WorkspaceEdit::default();
    }

    let mut changes: HashMap<String, Vec<TextEdit>> = HashMap::new();
    for location in collect_references(analysis, &def, true).await {
        changes.entry(location.uri).or_default().push(TextEdit {
            range: location.range,
            new_text: new_name.to_string(),
        });
    }
    for edits in changes.values_mut() {
        edits.sort_by_key(|e| std::cmp::Reverse(e.range.start));
        edits.dedup();
    }
    WorkspaceEdit { changes }
}
