//! Editor protocol types
//!
//! LSP-shaped result types returned by the query handlers and the
//! diagnostics orchestrator. They serialize with the field names a
//! language client expects, so a server binary can forward them as-is.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Position in a document (0-indexed line, UTF-16 character offset)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
pub struct Position {
    pub line: u32,
    pub character: u32,
}

impl Position {
    pub fn new(line: u32, character: u32) -> Self {
        Self { line, character }
    }
}

/// Half-open range in a document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct Range {
    pub start: Position,
    pub end: Position,
}

impl Range {
    pub fn new(start: Position, end: Position) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, pos: Position) -> bool {
        self.start <= pos && pos <= self.end
    }
}

/// A range inside a specific document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    pub uri: String,
    pub range: Range,
}

/// Diagnostic severity
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum DiagnosticSeverity {
    Error = 1,
    Warning = 2,
    Information = 3,
    Hint = 4,
}

/// A compiler (or synthetic) diagnostic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub range: Range,
    pub severity: Option<DiagnosticSeverity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    pub source: Option<String>,
    pub message: String,
}

impl Diagnostic {
    pub fn new(range: Range, severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self {
            range,
            severity: Some(severity),
            code: None,
            source: Some(DIAGNOSTIC_SOURCE.to_string()),
            message: message.into(),
        }
    }

    /// Diagnostic anchored at the start of the document
    pub fn at_document_start(severity: DiagnosticSeverity, message: impl Into<String>) -> Self {
        Self::new(Range::default(), severity, message)
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
}

/// `source` field attached to every diagnostic we publish
pub const DIAGNOSTIC_SOURCE: &str = "midori";

/// Notification payload for a finished diagnostics run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublishDiagnostics {
    pub uri: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<i32>,
    pub diagnostics: Vec<Diagnostic>,
}

/// Markup payload for hover and documentation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MarkupContent {
    pub kind: String,
    pub value: String,
}

impl MarkupContent {
    pub fn markdown(value: impl Into<String>) -> Self {
        Self {
            kind: "markdown".to_string(),
            value: value.into(),
        }
    }
}

/// Hover result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hover {
    pub contents: MarkupContent,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub range: Option<Range>,
}

/// Completion item kinds (numeric values from the LSP specification)
pub mod completion_kind {
    pub const METHOD: i32 = 2;
    pub const FUNCTION: i32 = 3;
    pub const CONSTRUCTOR: i32 = 4;
    pub const FIELD: i32 = 5;
    pub const VARIABLE: i32 = 6;
    pub const CLASS: i32 = 7;
    pub const INTERFACE: i32 = 8;
    pub const MODULE: i32 = 9;
    pub const KEYWORD: i32 = 14;
    pub const ENUM: i32 = 13;
    pub const ENUM_MEMBER: i32 = 20;
    pub const STRUCT: i32 = 22;
    pub const EVENT: i32 = 23;
}

/// Completion item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompletionItem {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kind: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<MarkupContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub insert_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub filter_text: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub preselect: Option<bool>,
}

impl CompletionItem {
    pub fn new(label: impl Into<String>, kind: i32) -> Self {
        Self {
            label: label.into(),
            kind: Some(kind),
            detail: None,
            documentation: None,
            insert_text: None,
            sort_text: None,
            filter_text: None,
            preselect: None,
        }
    }
}

/// Signature help result
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureHelp {
    pub signatures: Vec<SignatureInformation>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_signature: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub active_parameter: Option<u32>,
}

/// One callable signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SignatureInformation {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<MarkupContent>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<ParameterInformation>,
}

/// One parameter of a signature
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterInformation {
    pub label: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub documentation: Option<MarkupContent>,
}

/// Text edit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TextEdit {
    pub range: Range,
    pub new_text: String,
}

/// Edits across documents, keyed by URI
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WorkspaceEdit {
    #[serde(default)]
    pub changes: HashMap<String, Vec<TextEdit>>,
}

impl WorkspaceEdit {
    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }
}

/// Result of a rename-prepare request
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrepareRename {
    pub range: Range,
    pub placeholder: String,
}

/// Symbol kinds for outlines (numeric values from the LSP specification)
pub mod symbol_kind {
    pub const MODULE: i32 = 2;
    pub const CLASS: i32 = 5;
    pub const METHOD: i32 = 6;
    pub const FIELD: i32 = 8;
    pub const ENUM: i32 = 10;
    pub const INTERFACE: i32 = 11;
    pub const FUNCTION: i32 = 12;
    pub const VARIABLE: i32 = 13;
    pub const ENUM_MEMBER: i32 = 22;
    pub const STRUCT: i32 = 23;
    pub const EVENT: i32 = 24;
}

/// Hierarchical outline entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocumentSymbol {
    pub name: String,
    pub kind: i32,
    pub range: Range,
    pub selection_range: Range,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<DocumentSymbol>,
}

/// Flat workspace symbol entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SymbolInformation {
    pub name: String,
    pub kind: i32,
    pub location: Location,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub container_name: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_serialization() {
        let pos = Position::new(10, 5);
        let json = serde_json::to_string(&pos).unwrap();
        assert_eq!(json, r#"{"line":10,"character":5}"#);
    }

    #[test]
    fn test_text_edit_uses_camel_case() {
        let edit = TextEdit {
            range: Range::default(),
            new_text: "renamed".to_string(),
        };
        let json = serde_json::to_value(&edit).unwrap();
        assert_eq!(json["newText"], "renamed");
    }

    #[test]
    fn test_range_contains_is_inclusive() {
        let range = Range::new(Position::new(1, 2), Position::new(1, 6));
        assert!(range.contains(Position::new(1, 2)));
        assert!(range.contains(Position::new(1, 6)));
        assert!(!range.contains(Position::new(2, 0)));
    }
}
