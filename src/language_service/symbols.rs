//! Document outline and workspace symbol search

use std::collections::HashSet;

use futures::future::join_all;
use tracing::debug;

use crate::language::{Symbol, SymbolKind};
use crate::protocol::{DocumentSymbol, SymbolInformation};

use super::analysis::{Analysis, FileKey, SourceFile};

/// Upper bound on workspace symbol results
pub const MAX_WORKSPACE_SYMBOLS: usize = 256;

fn outline_entry(file: &SourceFile, symbol: &Symbol, children: Vec<DocumentSymbol>) -> DocumentSymbol {
    let end = symbol
        .body_range
        .map(|b| b.end + 1)
        .unwrap_or_else(|| symbol.end_offset());
    let mut children = children;
    children.sort_by_key(|c| c.range.start);
    DocumentSymbol {
        name: symbol.name.clone(),
        kind: symbol.kind.lsp_symbol_kind(),
        range: file.range(symbol.offset, end),
        selection_range: symbol.range,
        detail: Some(symbol.detail()),
        children,
    }
}

fn members<'a>(
    list: &'a [Symbol],
    owner: &'a Symbol,
) -> impl Iterator<Item = &'a Symbol> + 'a {
    list.iter().filter(move |s| {
        s.container.as_deref() == Some(owner.name.as_str())
            && owner.offset <= s.offset
            && owner.body_range.map_or(true, |b| s.offset <= b.end)
    })
}

/// Hierarchical outline: parameters and locals under their function,
/// fields under structs, variants under enums, methods under traits
pub fn document_symbols(file: &SourceFile) -> Vec<DocumentSymbol> {
    let index = &file.index;
    let leaf = |s: &Symbol| outline_entry(file, s, Vec::new());
    let mut out = Vec::new();

    for function in &index.functions {
        let children = members(&index.params, function)
            .chain(members(&index.locals, function))
            .map(leaf)
            .collect();
        out.push(outline_entry(file, function, children));
    }
    for parent in &index.structs {
        let children = members(&index.fields, parent).map(leaf).collect();
        out.push(outline_entry(file, parent, children));
    }
    for parent in &index.enums {
        let children = members(&index.variants, parent).map(leaf).collect();
        out.push(outline_entry(file, parent, children));
    }
    for parent in &index.traits {
        let children = members(&index.methods, parent).map(leaf).collect();
        out.push(outline_entry(file, parent, children));
    }
    out.extend(index.extern_functions.iter().map(leaf));
    out.extend(index.errors.iter().map(leaf));

    out.sort_by_key(|s| s.range.start);
    out
}

fn searchable(file: &SourceFile) -> impl Iterator<Item = &Symbol> {
    let index = &file.index;
    index
        .top_level_symbols()
        .chain(&index.fields)
        .chain(&index.methods)
}

fn matching_symbols(file: &SourceFile, needle: &str, out: &mut Vec<SymbolInformation>) {
    for symbol in searchable(file) {
        if out.len() >= MAX_WORKSPACE_SYMBOLS {
            return;
        }
        if !needle.is_empty() && !symbol.name.to_lowercase().contains(needle) {
            continue;
        }
        out.push(SymbolInformation {
            name: symbol.name.clone(),
            kind: symbol.kind.lsp_symbol_kind(),
            location: file.location(symbol),
            container_name: match symbol.kind {
                SymbolKind::Field | SymbolKind::Method | SymbolKind::Variant => {
                    symbol.container.clone()
                }
                _ => None,
            },
        });
    }
}

/// Case-insensitive substring search over open documents and workspace files
pub async fn workspace_symbols(analysis: &Analysis<'_>, query: &str) -> Vec<SymbolInformation> {
    let needle = query.to_lowercase();
    let mut out = Vec::new();
    let mut seen: HashSet<FileKey> = HashSet::new();

    for file in analysis.open_files().await {
        if seen.insert(file.key()) {
            matching_symbols(&file, &needle, &mut out);
        }
    }

    let paths = analysis.workspace().discover_files().await;
    let loaded = join_all(paths.iter().map(|p| analysis.file_for_path(p))).await;
    for file in loaded.into_iter().flatten() {
        if out.len() >= MAX_WORKSPACE_SYMBOLS {
            break;
        }
        if seen.insert(file.key()) {
            matching_symbols(&file, &needle, &mut out);
        }
    }

    debug!(
        "[WorkspaceSymbols] {:?}: {} result(s) from {} file(s)",
        query,
        out.len(),
        seen.len()
    );
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::language::index_document;
    use std::sync::Arc;

    fn source(text: &str) -> SourceFile {
        SourceFile {
            uri: "file:///outline.mdr".to_string(),
            path: None,
            text: Arc::from(text),
            index: Arc::new(index_document(text)),
        }
    }

    #[test]
    fn test_outline_nests_members() {
        let file = source(
            "struct User {\n  id: Int\n  name: String\n}\n\
             enum Shape { Circle(r: Float), Square }\n\
             fn area(s: Shape) -> Float {\n  let x := 1\n  x\n}\n",
        );
        let outline = document_symbols(&file);
        let names: Vec<_> = outline.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["User", "Shape", "area"]);

        let fields: Vec<_> = outline[0].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(fields, vec!["id", "name"]);
        let variants: Vec<_> = outline[1].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(variants, vec!["Circle", "Square"]);
        let locals: Vec<_> = outline[2].children.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(locals, vec!["s", "x"]);
    }

    #[test]
    fn test_outline_range_covers_body() {
        let file = source("fn main() {\n  print(1)\n}");
        let outline = document_symbols(&file);
        assert_eq!(outline.len(), 1);
        assert_eq!(outline[0].selection_range, file.index.functions[0].range);
        assert_eq!(outline[0].range.end.line, 2);
    }

    #[test]
    fn test_matching_symbols_is_case_insensitive() {
        let file = source("fn getUser() {}\nfn get_order() {}\nstruct UserRecord { id: Int }");
        let mut out = Vec::new();
        matching_symbols(&file, "user", &mut out);
        let names: Vec<_> = out.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["getUser", "UserRecord"]);
    }
}
