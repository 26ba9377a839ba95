use std::fs;
use std::sync::Arc;
use std::time::Duration;

use midori_ide::diagnostics::ChannelSink;
use midori_ide::protocol::{PublishDiagnostics, Position};
use midori_ide::utils::path_to_uri;
use midori_ide::{LanguageService, RunState, Settings};
use tempfile::TempDir;
use tokio::sync::mpsc::UnboundedReceiver;

const LIB: &str = "pub fn helper(a: Int, b: Int) -> Int {\n  a + b\n}\n";
const MAIN: &str = "import \"./lib\"\n\nfn main() -> Int {\n  let total := helper(1, 2)\n  total\n}\n";

/// Position of the first `needle` in `text`, plus `extra` characters
fn position_of(text: &str, needle: &str, extra: u32) -> Position {
    let offset = text.find(needle).expect("needle present");
    let before = &text[..offset];
    let line = before.matches('\n').count() as u32;
    let character = (offset - before.rfind('\n').map(|i| i + 1).unwrap_or(0)) as u32;
    Position::new(line, character + extra)
}

struct Fixture {
    _temp: TempDir,
    service: LanguageService,
    diagnostics: UnboundedReceiver<PublishDiagnostics>,
    main_uri: String,
    lib_uri: String,
}

fn fixture() -> Fixture {
    let temp = TempDir::new().unwrap();
    let root = fs::canonicalize(temp.path()).unwrap();
    fs::write(root.join("lib.mdr"), LIB).unwrap();
    fs::write(root.join("main.mdr"), MAIN).unwrap();

    let settings = Settings {
        command: "midori-compiler-not-installed".to_string(),
        workspace_root: Some(root.clone()),
        ..Settings::default()
    };
    let (sink, diagnostics) = ChannelSink::new();
    let service = LanguageService::new(settings, Arc::new(sink));
    let main_uri = path_to_uri(&root.join("main.mdr"));
    service.did_open(&main_uri, 1, MAIN);

    Fixture {
        lib_uri: path_to_uri(&root.join("lib.mdr")),
        main_uri,
        service,
        diagnostics,
        _temp: temp,
    }
}

#[tokio::test]
async fn test_definition_follows_imports() {
    let f = fixture();
    let location = f
        .service
        .definition(&f.main_uri, position_of(MAIN, "helper", 2))
        .await
        .expect("helper resolves");
    assert_eq!(location.uri, f.lib_uri);
    assert_eq!(location.range.start, position_of(LIB, "helper", 0));
}

#[tokio::test]
async fn test_hover_names_defining_file() {
    let f = fixture();
    let hover = f
        .service
        .hover(&f.main_uri, position_of(MAIN, "helper", 0))
        .await
        .expect("hover");
    assert!(hover.contents.value.contains("helper(a: Int, b: Int) -> Int"));
    assert!(hover.contents.value.contains("defined in `lib.mdr`"));

    let keyword = f
        .service
        .hover(&f.main_uri, position_of(MAIN, "fn main", 0))
        .await
        .expect("keyword hover");
    assert!(keyword.contents.value.contains("```midori\nfn\n```"));
}

#[tokio::test]
async fn test_references_span_files() {
    let f = fixture();
    let refs = f
        .service
        .references(&f.main_uri, position_of(MAIN, "helper", 1), true)
        .await;
    assert_eq!(refs.len(), 2);
    assert!(refs.iter().any(|l| l.uri == f.main_uri));
    assert!(refs.iter().any(|l| l.uri == f.lib_uri));

    let without_decl = f
        .service
        .references(&f.main_uri, position_of(MAIN, "helper", 1), false)
        .await;
    assert_eq!(without_decl.len(), 1);
    assert_eq!(without_decl[0].uri, f.main_uri);
}

#[tokio::test]
async fn test_rename_local_and_invalid_names() {
    let f = fixture();
    let at_usage = position_of(MAIN, "total\n}", 0);

    let edit = f.service.rename(&f.main_uri, at_usage, "sum").await;
    let edits = &edit.changes[&f.main_uri];
    assert_eq!(edit.changes.len(), 1);
    assert_eq!(edits.len(), 2);
    // reverse document order
    assert!(edits[0].range.start > edits[1].range.start);
    assert!(edits.iter().all(|e| e.new_text == "sum"));

    assert!(f.service.rename(&f.main_uri, at_usage, "").await.is_empty());
    assert!(f.service.rename(&f.main_uri, at_usage, "while").await.is_empty());
    assert!(f.service.rename(&f.main_uri, at_usage, "9lives").await.is_empty());

    let prepared = f
        .service
        .prepare_rename(&f.main_uri, at_usage)
        .await
        .expect("renameable");
    assert_eq!(prepared.placeholder, "total");
    assert!(f
        .service
        .prepare_rename(&f.main_uri, position_of(MAIN, "fn main", 0))
        .await
        .is_none());
}

#[tokio::test]
async fn test_signature_help_tracks_argument() {
    let f = fixture();
    let help = f
        .service
        .signature_help(&f.main_uri, position_of(MAIN, "2)", 0))
        .await
        .expect("inside a call");
    assert_eq!(help.active_parameter, Some(1));
    let signature = &help.signatures[0];
    assert!(signature.label.contains("helper("));
    let params: Vec<_> = signature.parameters.iter().map(|p| p.label.as_str()).collect();
    assert_eq!(params, vec!["a: Int", "b: Int"]);
}

#[tokio::test]
async fn test_completion_suggests_keyword_for_typo() {
    let f = fixture();
    let text = "fn main() {\n  retrun\n}\n";
    f.service.did_change(&f.main_uri, 2, text);

    let items = f
        .service
        .completion(&f.main_uri, position_of(text, "retrun", 6))
        .await;
    let best = items
        .iter()
        .find(|i| i.preselect == Some(true))
        .expect("a preselected suggestion");
    assert_eq!(best.label, "return");
}

#[tokio::test]
async fn test_completion_offers_locals_and_imports() {
    let f = fixture();
    let text = "import \"./lib\"\n\nfn main() {\n  let held := 1\n  he\n}\n";
    f.service.did_change(&f.main_uri, 2, text);

    let items = f
        .service
        .completion(&f.main_uri, position_of(text, "he\n}", 2))
        .await;
    let labels: Vec<_> = items.iter().map(|i| i.label.as_str()).collect();
    assert!(labels.contains(&"held"));
    assert!(labels.contains(&"helper"));
}

#[tokio::test]
async fn test_completion_ranks_locals_above_keyword_typos() {
    let f = fixture();
    let text = "fn main() {\n  let held := 1\n  he\n}\n";
    f.service.did_change(&f.main_uri, 2, text);

    let mut items = f
        .service
        .completion(&f.main_uri, position_of(text, "he\n}", 2))
        .await;
    items.sort_by(|a, b| a.sort_text.cmp(&b.sort_text));
    assert_eq!(items[0].label, "held");
    assert!(items.iter().all(|i| i.preselect != Some(true)));
    // typo suggestions stay behind everything else
    let first_keyword = items
        .iter()
        .position(|i| i.detail.as_deref().is_some_and(|d| d.starts_with("did you mean")))
        .expect("a keyword suggestion");
    assert!(items[first_keyword..]
        .iter()
        .all(|i| i.sort_text.as_deref().is_some_and(|s| s.starts_with("5_"))));
}

#[tokio::test]
async fn test_document_and_workspace_symbols() {
    let f = fixture();
    let outline = f.service.document_symbols(&f.main_uri).await;
    assert_eq!(outline.len(), 1);
    assert_eq!(outline[0].name, "main");
    assert_eq!(outline[0].children[0].name, "total");

    let found = f.service.workspace_symbols("HELP").await;
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].location.uri, f.lib_uri);
}

#[tokio::test]
async fn test_missing_compiler_is_reported_then_cleared_on_close() {
    let mut f = fixture();
    let published = tokio::time::timeout(Duration::from_secs(10), f.diagnostics.recv())
        .await
        .expect("published in time")
        .expect("channel open");
    assert_eq!(published.uri, f.main_uri);
    assert_eq!(published.diagnostics.len(), 1);
    assert_eq!(f.service.diagnostics_state(&f.main_uri), RunState::Idle);
    assert!(published.diagnostics[0]
        .message
        .contains("midori-compiler-not-installed"));

    f.service.did_close(&f.main_uri);
    let cleared = tokio::time::timeout(Duration::from_secs(10), f.diagnostics.recv())
        .await
        .expect("published in time")
        .expect("channel open");
    assert!(cleared.diagnostics.is_empty());
    assert_eq!(f.service.diagnostics_state(&f.main_uri), RunState::Idle);
    // closed documents are read back from disk
    assert_eq!(f.service.document_symbols(&f.main_uri).await.len(), 1);
}

#[tokio::test]
async fn test_settings_update_is_partial() {
    let f = fixture();
    let before = f.service.settings();
    let updated = f
        .service
        .update_settings(&serde_json::json!({ "debounceMs": 5, "runOnType": false }))
        .unwrap();
    assert!(!updated.run_on_type);
    assert_eq!(updated.debounce_ms, 50);
    assert_eq!(updated.command, before.command);
    assert_eq!(updated.workspace_root, before.workspace_root);
}

#[tokio::test]
async fn test_shadowed_local_keeps_its_own_references() {
    let f = fixture();
    let text = "fn main() -> Int {\n  let x := 1\n  let y := x\n  let x := y + 1\n  x\n}\n";
    f.service.did_change(&f.main_uri, 2, text);

    let second = f
        .service
        .references(&f.main_uri, position_of(text, "x\n}", 0), true)
        .await;
    let mut lines: Vec<_> = second.iter().map(|l| l.range.start.line).collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![3, 4]);

    let edit = f
        .service
        .rename(&f.main_uri, position_of(text, "x := 1", 0), "first")
        .await;
    let mut lines: Vec<_> = edit.changes[&f.main_uri]
        .iter()
        .map(|e| e.range.start.line)
        .collect();
    lines.sort_unstable();
    assert_eq!(lines, vec![1, 2]);
}

#[tokio::test]
async fn test_signature_help_clamps_extra_arguments() {
    let f = fixture();
    let text = "import \"./lib\"\n\nfn main() -> Int {\n  helper(1, 2, 3, \n}\n";
    f.service.did_change(&f.main_uri, 2, text);

    let help = f
        .service
        .signature_help(&f.main_uri, position_of(text, "3, ", 3))
        .await
        .expect("inside a call");
    assert_eq!(help.signatures[0].parameters.len(), 2);
    assert_eq!(help.active_parameter, Some(1));
}

#[tokio::test]
async fn test_builtins_cannot_be_renamed() {
    let f = fixture();
    let text = "fn main() {\n  print(1)\n}\n";
    f.service.did_change(&f.main_uri, 2, text);
    let at_print = position_of(text, "print", 1);

    assert!(f.service.prepare_rename(&f.main_uri, at_print).await.is_none());
    assert!(f.service.rename(&f.main_uri, at_print, "show").await.is_empty());
}

#[tokio::test]
async fn test_opening_a_file_drops_its_external_index() {
    let f = fixture();
    assert_eq!(f.service.workspace_symbols("helper").await.len(), 1);
    let before = f.service.workspace().cached_file_count();
    assert!(before >= 1);

    f.service.did_open(&f.lib_uri, 1, LIB);
    assert_eq!(f.service.workspace().cached_file_count(), before - 1);
}

#[tokio::test]
async fn test_workspace_root_change_rescans() {
    let f = fixture();
    assert_eq!(f.service.workspace_symbols("helper").await.len(), 1);

    let other = TempDir::new().unwrap();
    let other_root = fs::canonicalize(other.path()).unwrap();
    fs::write(other_root.join("tools.mdr"), "fn tooling() {}\n").unwrap();
    f.service
        .update_settings(&serde_json::json!({ "workspaceRoot": other_root.to_string_lossy() }))
        .unwrap();

    assert_eq!(f.service.workspace().root(), Some(other_root));
    assert_eq!(f.service.workspace().cached_file_count(), 0);
    assert_eq!(f.service.workspace_symbols("tooling").await.len(), 1);
    // the open document is still searched
    assert_eq!(f.service.workspace_symbols("main").await.len(), 1);
}

#[tokio::test]
async fn test_file_cap_surfaces_notice() {
    let f = fixture();
    assert!(f.service.workspace_notice().is_none());

    f.service.set_settings(Settings {
        max_workspace_files: 1,
        ..f.service.settings()
    });
    f.service.workspace_symbols("").await;
    let notice = f.service.workspace_notice().expect("cap reached");
    assert!(notice.contains("maxWorkspaceFiles"));
}
