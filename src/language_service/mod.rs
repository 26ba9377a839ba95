//! Language service for Midori
//!
//! Open-document bookkeeping plus the editor queries: hover, completion,
//! signature help, definition, references, rename and symbol search. All
//! queries go through `Analysis`, which prefers open buffers over disk.

pub mod analysis;
pub mod completion;
pub mod documents;
pub mod hover;
pub mod navigation;
pub mod resolve;
pub mod signature_help;
pub mod symbols;
mod service;

pub use analysis::{Analysis, FileKey, SourceFile, MAX_IMPORTED_FILES};
pub use documents::{Document, DocumentCache, DocumentStore};
pub use navigation::is_valid_identifier;
pub use resolve::Definition;
pub use service::LanguageService;
pub use symbols::MAX_WORKSPACE_SYMBOLS;
