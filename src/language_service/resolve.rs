//! Name resolution shared by hover, definition, references and rename
//!
//! Lookup order for an identifier:
//! 1. a declaration exactly at the identifier (the name being declared)
//! 2. the most recent parameter or local of the enclosing function declared
//!    at or before the identifier (lexical shadowing approximation)
//! 3. after `.`, fields, methods and variants of this file and its imports
//! 4. top-level symbols of this file
//! 5. top-level symbols of transitively imported files
//! 6. built-in functions and constructors
//! 7. keyword documentation

use crate::language::keywords::KeywordDoc;
use crate::language::scanner::is_code_at;
use crate::language::text::is_member_access;
use crate::language::{builtin, keyword_doc, word_at, Builtin, Symbol};
use crate::protocol::{Location, Range};

use super::analysis::{Analysis, FileKey, SourceFile};

/// What an identifier refers to
#[derive(Debug, Clone)]
pub enum Definition {
    Symbol { file: SourceFile, symbol: Symbol },
    Builtin(&'static Builtin),
    Keyword(&'static KeywordDoc),
}

impl Definition {
    pub fn location(&self) -> Option<Location> {
        match self {
            Definition::Symbol { file, symbol } => Some(file.location(symbol)),
            _ => None,
        }
    }

    /// Identity of a symbol definition: owning file and declaration offset
    pub fn identity(&self) -> Option<(FileKey, usize)> {
        match self {
            Definition::Symbol { file, symbol } => Some((file.key(), symbol.offset)),
            _ => None,
        }
    }
}

/// The identifier under a cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Word {
    pub start: usize,
    pub end: usize,
    pub name: String,
}

impl Word {
    pub fn range(&self, file: &SourceFile) -> Range {
        file.range(self.start, self.end)
    }
}

/// Identifier at `offset`, unless it sits inside a comment or literal
pub fn word_at_offset(file: &SourceFile, offset: usize) -> Option<Word> {
    let (start, end, name) = word_at(&file.text, offset)?;
    // the byte after `start` must be code for the word itself to be code
    if !is_code_at(&file.text, start + 1) {
        return None;
    }
    Some(Word {
        start,
        end,
        name: name.to_string(),
    })
}

/// Most recent parameter or local named `name` visible at `offset`
pub fn local_at<'f>(file: &'f SourceFile, name: &str, offset: usize) -> Option<&'f Symbol> {
    let function = file.index.function_scope_at(offset)?;
    file.index
        .locals_of(&function.name)
        .filter(|s| s.name == name && s.offset <= offset)
        .filter(|s| function.offset <= s.offset)
        .max_by_key(|s| s.offset)
}

fn symbol_def(file: &SourceFile, symbol: &Symbol) -> Definition {
    Definition::Symbol {
        file: file.clone(),
        symbol: symbol.clone(),
    }
}

/// Resolve `name` appearing at byte `start` of `file`
pub async fn resolve_name(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    name: &str,
    start: usize,
) -> Option<Definition> {
    if let Some(declared) = file
        .index
        .all_symbols()
        .find(|s| s.offset == start && s.name == name)
    {
        return Some(symbol_def(file, declared));
    }

    let member = is_member_access(&file.text, start);
    if !member {
        if let Some(local) = local_at(file, name, start) {
            return Some(symbol_def(file, local));
        }
    }

    let mut imports: Option<Vec<SourceFile>> = None;
    if member {
        if let Some(sym) = file.index.find_member(name) {
            return Some(symbol_def(file, sym));
        }
        let imported = analysis.imported_files(file).await;
        for other in &imported {
            if let Some(sym) = other.index.find_member(name) {
                return Some(symbol_def(other, sym));
            }
        }
        imports = Some(imported);
    }

    if let Some(sym) = file.index.find_top_level(name) {
        return Some(symbol_def(file, sym));
    }

    let imported = match imports {
        Some(imported) => imported,
        None => analysis.imported_files(file).await,
    };
    for other in &imported {
        if let Some(sym) = other.index.find_top_level(name) {
            return Some(symbol_def(other, sym));
        }
    }

    if let Some(b) = builtin(name) {
        return Some(Definition::Builtin(b));
    }
    keyword_doc(name).map(Definition::Keyword)
}

/// Resolve the identifier at `offset`
pub async fn resolve_at(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
) -> Option<(Word, Definition)> {
    let word = word_at_offset(file, offset)?;
    let def = resolve_name(analysis, file, &word.name, word.start).await?;
    Some((word, def))
}
