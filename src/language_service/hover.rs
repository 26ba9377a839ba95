use crate::language::{Symbol, SymbolKind};
use crate::protocol::{Hover, MarkupContent};

use super::analysis::{Analysis, SourceFile};
use super::resolve::{resolve_at, Definition};

fn code_block(code: &str) -> String {
    format!("```midori\n{}\n```", code)
}

/// One-line rendering of a symbol for hover
pub fn describe(symbol: &Symbol) -> String {
    let typed = |prefix: &str| match &symbol.ty {
        Some(ty) => format!("{} {}: {}", prefix, symbol.name, ty),
        None => format!("{} {}", prefix, symbol.name),
    };
    match symbol.kind {
        SymbolKind::Parameter => typed("(parameter)"),
        SymbolKind::Local => typed("let"),
        SymbolKind::Field => match &symbol.container {
            Some(owner) => format!(
                "{}.{}: {}",
                owner,
                symbol.name,
                symbol.ty.as_deref().unwrap_or("?")
            ),
            None => symbol.detail(),
        },
        SymbolKind::Variant => match &symbol.container {
            Some(owner) => format!("{}.{}", owner, symbol.detail()),
            None => symbol.detail(),
        },
        _ => symbol.detail(),
    }
}

fn symbol_markdown(current: &SourceFile, file: &SourceFile, symbol: &Symbol) -> String {
    let mut value = code_block(&describe(symbol));
    let mut notes = Vec::new();
    match (&symbol.container, symbol.kind) {
        (Some(owner), SymbolKind::Parameter | SymbolKind::Local) => {
            notes.push(format!("{} in `{}`", symbol.kind, owner))
        }
        (Some(owner), SymbolKind::Method) => notes.push(format!("method of trait `{}`", owner)),
        _ => notes.push(symbol.kind.to_string()),
    }
    if file.key() != current.key() {
        let name = file
            .path
            .as_deref()
            .and_then(|p| p.file_name())
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| file.uri.clone());
        notes.push(format!("defined in `{}`", name));
    }
    value.push_str("\n\n");
    value.push_str(&notes.join(" · "));
    value
}

pub async fn hover(analysis: &Analysis<'_>, file: &SourceFile, offset: usize) -> Option<Hover> {
    let (word, def) = resolve_at(analysis, file, offset).await?;
    let value = match &def {
        Definition::Symbol { file: owner, symbol } => symbol_markdown(file, owner, symbol),
        Definition::Builtin(b) => format!("{}\n\n{}", code_block(b.signature), b.doc),
        Definition::Keyword(k) => format!("{}\n\n{}", code_block(k.keyword), k.doc),
    };
    Some(Hover {
        contents: MarkupContent::markdown(value),
        range: Some(word.range(file)),
    })
}
