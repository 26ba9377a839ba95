//! Midori source analysis
//!
//! Pure, synchronous text processing: lexical masking, the heuristic symbol
//! indexer and the language's static tables. Nothing here touches the file
//! system or shared state.

pub mod indexer;
pub mod keywords;
pub mod scanner;
pub mod symbol;
pub mod text;

pub use indexer::index_document;
pub use keywords::{builtin, is_keyword, keyword_doc, Builtin, BUILTINS, BUILTIN_TYPES, KEYWORDS};
pub use symbol::{BodyRange, Import, Param, Symbol, SymbolIndex, SymbolKind};
pub use text::{word_at, LineIndex};

/// File extension of Midori sources, without the dot
pub const SOURCE_EXTENSION: &str = "mdr";
