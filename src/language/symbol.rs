//! Symbol table types
//!
//! A `SymbolIndex` is the complete result of indexing one document: every
//! declared name the scanner could classify, partitioned by kind, plus the
//! document's import statements.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::text::LineIndex;
use crate::protocol::{completion_kind, symbol_kind, Range};

/// Kinds of symbols the indexer extracts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SymbolKind {
    Function,
    ExternFunction,
    Parameter,
    Local,
    Struct,
    Field,
    Enum,
    Variant,
    Trait,
    Method,
    CustomError,
    Import,
}

impl SymbolKind {
    /// Parameters and local bindings; everything else is file scoped
    pub fn is_function_local(self) -> bool {
        matches!(self, SymbolKind::Parameter | SymbolKind::Local)
    }

    pub fn is_callable(self) -> bool {
        matches!(
            self,
            SymbolKind::Function
                | SymbolKind::ExternFunction
                | SymbolKind::Method
                | SymbolKind::Variant
        )
    }

    pub fn lsp_symbol_kind(self) -> i32 {
        match self {
            SymbolKind::Function | SymbolKind::ExternFunction => symbol_kind::FUNCTION,
            SymbolKind::Parameter | SymbolKind::Local => symbol_kind::VARIABLE,
            SymbolKind::Struct => symbol_kind::STRUCT,
            SymbolKind::Field => symbol_kind::FIELD,
            SymbolKind::Enum => symbol_kind::ENUM,
            SymbolKind::Variant => symbol_kind::ENUM_MEMBER,
            SymbolKind::Trait => symbol_kind::INTERFACE,
            SymbolKind::Method => symbol_kind::METHOD,
            SymbolKind::CustomError => symbol_kind::EVENT,
            SymbolKind::Import => symbol_kind::MODULE,
        }
    }

    pub fn completion_kind(self) -> i32 {
        match self {
            SymbolKind::Function | SymbolKind::ExternFunction => completion_kind::FUNCTION,
            SymbolKind::Parameter | SymbolKind::Local => completion_kind::VARIABLE,
            SymbolKind::Struct => completion_kind::STRUCT,
            SymbolKind::Field => completion_kind::FIELD,
            SymbolKind::Enum => completion_kind::ENUM,
            SymbolKind::Variant => completion_kind::ENUM_MEMBER,
            SymbolKind::Trait => completion_kind::INTERFACE,
            SymbolKind::Method => completion_kind::METHOD,
            SymbolKind::CustomError => completion_kind::EVENT,
            SymbolKind::Import => completion_kind::MODULE,
        }
    }
}

impl fmt::Display for SymbolKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SymbolKind::Function => "function",
            SymbolKind::ExternFunction => "extern function",
            SymbolKind::Parameter => "parameter",
            SymbolKind::Local => "local",
            SymbolKind::Struct => "struct",
            SymbolKind::Field => "field",
            SymbolKind::Enum => "enum",
            SymbolKind::Variant => "variant",
            SymbolKind::Trait => "trait",
            SymbolKind::Method => "method",
            SymbolKind::CustomError => "error",
            SymbolKind::Import => "import",
        };
        write!(f, "{}", s)
    }
}

/// A typed name in a parameter list or variant payload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Param {
    pub name: String,
    pub ty: Option<String>,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.ty {
            Some(ty) => write!(f, "{}: {}", self.name, ty),
            None => write!(f, "{}", self.name),
        }
    }
}

/// Byte span `[start, end]` of a `{ ... }` block, braces included
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyRange {
    pub start: usize,
    pub end: usize,
}

impl BodyRange {
    pub fn contains(&self, offset: usize) -> bool {
        self.start <= offset && offset <= self.end
    }
}

/// One declared or bound name
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Symbol {
    pub name: String,
    pub kind: SymbolKind,
    /// Byte offset of `name` in the document text
    pub offset: usize,
    /// Exact bounds of `name`
    pub range: Range,
    /// Enclosing function, struct, enum or trait
    pub container: Option<String>,
    /// Declared type annotation (fields, params, typed bindings)
    pub ty: Option<String>,
    pub params: Option<Vec<Param>>,
    pub signature: Option<String>,
    pub return_type: Option<String>,
    pub is_extern: bool,
    pub body_range: Option<BodyRange>,
}

impl Symbol {
    pub fn new(name: &str, kind: SymbolKind, offset: usize, range: Range) -> Self {
        Self {
            name: name.to_string(),
            kind,
            offset,
            range,
            container: None,
            ty: None,
            params: None,
            signature: None,
            return_type: None,
            is_extern: false,
            body_range: None,
        }
    }

    pub fn end_offset(&self) -> usize {
        self.offset + self.name.len()
    }

    /// Best one-line description for hover and completion detail
    pub fn detail(&self) -> String {
        if let Some(sig) = &self.signature {
            return sig.clone();
        }
        match &self.ty {
            Some(ty) => format!("{}: {}", self.name, ty),
            None => self.name.clone(),
        }
    }
}

/// A textual `import "path"` statement
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Import {
    /// Path exactly as written between the quotes
    pub path: String,
    /// Byte offset of the path text (just after the opening quote)
    pub offset: usize,
}

/// All symbols and imports extracted from one document version
#[derive(Debug, Clone, Default)]
pub struct SymbolIndex {
    pub functions: Vec<Symbol>,
    pub extern_functions: Vec<Symbol>,
    pub params: Vec<Symbol>,
    pub locals: Vec<Symbol>,
    pub structs: Vec<Symbol>,
    pub fields: Vec<Symbol>,
    pub enums: Vec<Symbol>,
    pub variants: Vec<Symbol>,
    pub traits: Vec<Symbol>,
    pub methods: Vec<Symbol>,
    pub errors: Vec<Symbol>,
    pub imports: Vec<Import>,
    pub line_index: LineIndex,
}

impl SymbolIndex {
    /// Functions, extern functions, structs, enums, traits, variants and
    /// custom errors, in that order
    pub fn top_level_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.functions
            .iter()
            .chain(&self.extern_functions)
            .chain(&self.structs)
            .chain(&self.enums)
            .chain(&self.traits)
            .chain(&self.variants)
            .chain(&self.errors)
    }

    /// Top-level symbols followed by fields, methods, params and locals
    pub fn all_symbols(&self) -> impl Iterator<Item = &Symbol> {
        self.top_level_symbols()
            .chain(&self.fields)
            .chain(&self.methods)
            .chain(&self.params)
            .chain(&self.locals)
    }

    pub fn find_top_level(&self, name: &str) -> Option<&Symbol> {
        self.top_level_symbols().find(|s| s.name == name)
    }

    /// Fields, methods and variants named `name` (member-access targets)
    pub fn find_member(&self, name: &str) -> Option<&Symbol> {
        self.fields
            .iter()
            .chain(&self.methods)
            .chain(&self.variants)
            .find(|s| s.name == name)
    }

    /// Function whose body contains `offset`
    pub fn function_at(&self, offset: usize) -> Option<&Symbol> {
        self.functions
            .iter()
            .find(|f| f.body_range.is_some_and(|b| b.contains(offset)))
    }

    /// Function whose header or body contains `offset`. The header starts at
    /// the function name, so parameters are covered too.
    pub fn function_scope_at(&self, offset: usize) -> Option<&Symbol> {
        self.functions.iter().find(|f| {
            f.body_range
                .is_some_and(|b| f.offset <= offset && offset <= b.end)
        })
    }

    /// Parameters and locals belonging to the function `name`
    pub fn locals_of<'a>(&'a self, function: &'a str) -> impl Iterator<Item = &'a Symbol> {
        self.params
            .iter()
            .chain(&self.locals)
            .filter(move |s| s.container.as_deref() == Some(function))
    }
}
