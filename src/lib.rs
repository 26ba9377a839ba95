pub mod config;
pub mod diagnostics;
pub mod fuzzy;
pub mod language;
pub mod language_service;
pub mod protocol;
pub mod utils;
pub mod workspace;

pub use config::{load_settings, ConfigError, Settings};
pub use diagnostics::{ChannelSink, DiagnosticsSink, RunOutcome, RunState, Trigger};
pub use language::{index_document, Symbol, SymbolIndex, SymbolKind};
pub use language_service::LanguageService;
