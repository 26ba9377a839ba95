//! Language service façade
//!
//! Owns the open documents, their per-version indexes, the workspace layer
//! and the diagnostics orchestrator, and exposes one method per editor
//! request. Queries never fail: "nothing here" is an empty or `None` result.

use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info};

use super::analysis::{Analysis, SourceFile};
use super::documents::{DocumentCache, DocumentStore};
use super::{completion, hover, navigation, signature_help, symbols};
use crate::config::{shared, ConfigError, RawSettings, Settings, SharedSettings};
use crate::diagnostics::{DiagnosticsOrchestrator, DiagnosticsSink, RunState, Trigger};
use crate::protocol::{
    CompletionItem, DocumentSymbol, Hover, Location, Position, PrepareRename, SignatureHelp,
    SymbolInformation, WorkspaceEdit,
};
use crate::workspace::WorkspaceService;

pub struct LanguageService {
    /// Live settings shared with the workspace layer and the orchestrator
    settings: SharedSettings,
    /// Open editor buffers
    documents: RwLock<DocumentStore>,
    /// Symbol indexes of open buffers, one per version
    cache: Mutex<DocumentCache>,
    workspace: WorkspaceService,
    diagnostics: DiagnosticsOrchestrator,
}

impl LanguageService {
    pub fn new(settings: Settings, sink: Arc<dyn DiagnosticsSink>) -> Self {
        let settings = shared(settings);
        Self {
            workspace: WorkspaceService::new(Arc::clone(&settings)),
            diagnostics: DiagnosticsOrchestrator::new(Arc::clone(&settings), sink),
            documents: RwLock::new(DocumentStore::new()),
            cache: Mutex::new(DocumentCache::new()),
            settings,
        }
    }

    pub fn settings(&self) -> Settings {
        self.settings.read().clone()
    }

    pub fn workspace(&self) -> &WorkspaceService {
        &self.workspace
    }

    pub fn diagnostics_state(&self, uri: &str) -> RunState {
        self.diagnostics.state(uri)
    }

    /// Replace all settings
    pub fn set_settings(&self, settings: Settings) {
        let root = settings.workspace_root.clone();
        let (root_changed, cap_changed) = {
            let mut current = self.settings.write();
            let changes = (
                current.workspace_root != settings.workspace_root,
                current.max_workspace_files != settings.max_workspace_files,
            );
            *current = settings;
            changes
        };
        if root_changed {
            self.workspace.set_root(root);
        } else if cap_changed {
            self.workspace.invalidate_file_list();
        }
    }

    /// Resource-limit notice for the user, e.g. the workspace file cap
    pub fn workspace_notice(&self) -> Option<String> {
        self.workspace.file_cap_notice()
    }

    /// Apply a partial settings object from the editor. Options missing
    /// from `value` keep their current values.
    pub fn update_settings(&self, value: &serde_json::Value) -> Result<Settings, ConfigError> {
        let raw: RawSettings = serde_json::from_value(value.clone())?;
        let updated = raw.apply_to(&self.settings());
        self.set_settings(updated.clone());
        info!("[LanguageService] settings updated");
        Ok(updated)
    }

    fn analysis(&self) -> Analysis<'_> {
        Analysis::new(&self.documents, &self.cache, &self.workspace, self.settings())
    }

    /// Must be called from within a tokio runtime.
    pub fn did_open(&self, uri: &str, version: i32, text: &str) {
        let doc = self.documents.write().open(uri, version, text);
        self.cache.lock().invalidate(uri);
        if let Some(path) = &doc.path {
            // the buffer now shadows the file on disk
            self.workspace.forget(path);
            if let Ok(canonical) = std::fs::canonicalize(path) {
                self.workspace.forget(&canonical);
            }
        }
        self.workspace.invalidate_file_list();
        debug!("[LanguageService] opened {} v{}", uri, version);
        self.diagnostics
            .schedule(uri, version, text.to_string(), doc.path, Trigger::Open);
    }

    /// Full-text change. Older versions than the one held are ignored.
    pub fn did_change(&self, uri: &str, version: i32, text: &str) {
        let Some(doc) = self.documents.write().change(uri, version, text) else {
            return;
        };
        self.cache.lock().invalidate(uri);
        self.diagnostics
            .schedule(uri, version, text.to_string(), doc.path, Trigger::Edit);
    }

    /// A save re-checks the held text, or `text` when the client sends it
    pub fn did_save(&self, uri: &str, text: Option<&str>) {
        let doc = {
            let mut documents = self.documents.write();
            let Some(current) = documents.get(uri).cloned() else {
                return;
            };
            match text {
                Some(text) if text != &*current.text => {
                    match documents.change(uri, current.version, text) {
                        Some(doc) => {
                            self.cache.lock().invalidate(uri);
                            doc
                        }
                        None => current,
                    }
                }
                _ => current,
            }
        };
        // a save may have created a file the cached listing does not know
        self.workspace.invalidate_file_list();
        self.diagnostics.schedule(
            uri,
            doc.version,
            doc.text.to_string(),
            doc.path,
            Trigger::Save,
        );
    }

    pub fn did_close(&self, uri: &str) {
        self.documents.write().close(uri);
        self.cache.lock().remove(uri);
        self.diagnostics.close(uri);
        debug!("[LanguageService] closed {}", uri);
    }

    async fn source(&self, analysis: &Analysis<'_>, uri: &str) -> Option<SourceFile> {
        analysis.file_for_uri(uri).await
    }

    pub async fn hover(&self, uri: &str, position: Position) -> Option<Hover> {
        let analysis = self.analysis();
        let file = self.source(&analysis, uri).await?;
        hover::hover(&analysis, &file, file.offset_at(position)).await
    }

    pub async fn completion(&self, uri: &str, position: Position) -> Vec<CompletionItem> {
        let analysis = self.analysis();
        let Some(file) = self.source(&analysis, uri).await else {
            return Vec::new();
        };
        completion::completion(&analysis, &file, file.offset_at(position)).await
    }

    pub async fn signature_help(&self, uri: &str, position: Position) -> Option<SignatureHelp> {
        let analysis = self.analysis();
        let file = self.source(&analysis, uri).await?;
        signature_help::signature_help(&analysis, &file, file.offset_at(position)).await
    }

    pub async fn definition(&self, uri: &str, position: Position) -> Option<Location> {
        let analysis = self.analysis();
        let file = self.source(&analysis, uri).await?;
        navigation::definition(&analysis, &file, file.offset_at(position)).await
    }

    pub async fn references(
        &self,
        uri: &str,
        position: Position,
        include_declaration: bool,
    ) -> Vec<Location> {
        let analysis = self.analysis();
        let Some(file) = self.source(&analysis, uri).await else {
            return Vec::new();
        };
        let offset = file.offset_at(position);
        navigation::references(&analysis, &file, offset, include_declaration).await
    }

    pub async fn prepare_rename(&self, uri: &str, position: Position) -> Option<PrepareRename> {
        let analysis = self.analysis();
        let file = self.source(&analysis, uri).await?;
        navigation::prepare_rename(&analysis, &file, file.offset_at(position)).await
    }

    pub async fn rename(&self, uri: &str, position: Position, new_name: &str) -> WorkspaceEdit {
        let analysis = self.analysis();
        let Some(file) = self.source(&analysis, uri).await else {
            return WorkspaceEdit::default();
        };
        navigation::rename(&analysis, &file, file.offset_at(position), new_name).await
    }

    pub async fn document_symbols(&self, uri: &str) -> Vec<DocumentSymbol> {
        let analysis = self.analysis();
        match self.source(&analysis, uri).await {
            Some(file) => symbols::document_symbols(&file),
            None => Vec::new(),
        }
    }

    pub async fn workspace_symbols(&self, query: &str) -> Vec<SymbolInformation> {
        symbols::workspace_symbols(&self.analysis(), query).await
    }

    /// Cancel outstanding diagnostics runs
    pub fn shutdown(&self) {
        info!("[LanguageService] shutting down");
        self.diagnostics.shutdown();
    }
}

impl Drop for LanguageService {
    fn drop(&mut self) {
        self.diagnostics.shutdown();
    }
}
