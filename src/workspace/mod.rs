//! Workspace layer: discovery, import resolution and caches for files that
//! are not open in the editor.

pub mod cache;
pub mod discovery;
pub mod ignore;
pub mod imports;
pub mod references;
pub mod service;

pub use cache::{CacheStats, CachedFile, ExternalIndexCache};
pub use discovery::{discover_files, Discovery, FileListCache, FILE_LIST_TTL};
pub use imports::{resolve_import, ImportPolicy};
pub use references::{Candidate, OpenFile, ReferenceTarget};
pub use service::WorkspaceService;
