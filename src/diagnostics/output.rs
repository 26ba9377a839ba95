//! Compiler output parsing
//!
//! The check command reports problems one per line as
//! `path:line:col: error[CODE]: message`, 1-based, optionally followed by
//! indented `hint: text` lines. Everything else is ignored.

use std::path::Path;

use lazy_static::lazy_static;
use regex::Regex;

use crate::language::{word_at, LineIndex};
use crate::protocol::{Diagnostic, DiagnosticSeverity, Position, Range};

lazy_static! {
    static ref DIAGNOSTIC_RE: Regex =
        Regex::new(r"^(.*?):(\d+):(\d+): (error|warning)(?:\[([^\]]+)\])?: (.*)$")
            .expect("diagnostic pattern must compile");
    static ref HINT_RE: Regex = Regex::new(r"^\s+hint: (.*)$").expect("hint pattern must compile");
}

/// One parsed output line, before it is placed in a document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompilerMessage {
    pub path: String,
    /// 1-based
    pub line: u32,
    /// 1-based
    pub column: u32,
    pub severity: DiagnosticSeverity,
    pub code: Option<String>,
    pub message: String,
}

pub fn parse_line(line: &str) -> Option<CompilerMessage> {
    let caps = DIAGNOSTIC_RE.captures(line.trim_end_matches('\r'))?;
    let severity = match caps.get(4)?.as_str() {
        "warning" => DiagnosticSeverity::Warning,
        _ => DiagnosticSeverity::Error,
    };
    Some(CompilerMessage {
        path: caps.get(1)?.as_str().to_string(),
        line: caps.get(2)?.as_str().parse().ok()?,
        column: caps.get(3)?.as_str().parse().ok()?,
        severity,
        code: caps.get(5).map(|c| c.as_str().to_string()),
        message: caps.get(6)?.as_str().trim().to_string(),
    })
}

/// Options controlling which lines become diagnostics
#[derive(Debug, Clone, Copy)]
pub struct ParseOptions<'a> {
    /// Keep only lines whose path ends in this file name
    pub file_name: Option<&'a str>,
    pub max_count: usize,
}

fn names_file(path: &str, file_name: &str) -> bool {
    Path::new(path.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| n == file_name)
}

/// Range of the identifier at a 1-based line/column, or a single character
pub fn diagnostic_range(text: &str, line_index: &LineIndex, line: u32, column: u32) -> Range {
    let pos = Position::new(line.saturating_sub(1), column.saturating_sub(1));
    let offset = line_index.offset(text, pos);

    if let Some((start, end, _)) = word_at(text, offset).filter(|(start, _, _)| *start == offset) {
        return line_index.range(text, start, end);
    }
    let end = text[offset..]
        .chars()
        .next()
        .filter(|c| *c != '\n')
        .map(|c| offset + c.len_utf8())
        .unwrap_or(offset);
    line_index.range(text, offset, end)
}

/// Turn compiler output into diagnostics for `text`
pub fn parse_check_output(output: &str, text: &str, options: ParseOptions<'_>) -> Vec<Diagnostic> {
    let line_index = LineIndex::new(text);
    let mut diagnostics: Vec<Diagnostic> = Vec::new();
    // whether the previous diagnostic line was kept, so hints attach correctly
    let mut attach_hints = false;

    for line in output.lines() {
        if let Some(caps) = HINT_RE.captures(line.trim_end_matches('\r')) {
            if attach_hints {
                if let (Some(last), Some(hint)) = (diagnostics.last_mut(), caps.get(1)) {
                    last.message.push_str("\nhint: ");
                    last.message.push_str(hint.as_str().trim());
                }
            }
            continue;
        }

        let Some(msg) = parse_line(line) else {
            continue;
        };
        attach_hints = false;
        if let Some(file_name) = options.file_name {
            if !names_file(&msg.path, file_name) {
                continue;
            }
        }
        if diagnostics.len() >= options.max_count {
            continue;
        }

        let range = diagnostic_range(text, &line_index, msg.line, msg.column);
        diagnostics.push(Diagnostic::new(range, msg.severity, msg.message).with_code(msg.code));
        attach_hints = true;
    }
    diagnostics
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTS: ParseOptions<'static> = ParseOptions {
        file_name: None,
        max_count: 100,
    };

    #[test]
    fn test_parse_line() {
        let msg = parse_line("/tmp/midori-check-1.mdr:3:5: error[MD3101]: unknown name `x`").unwrap();
        assert_eq!(msg.path, "/tmp/midori-check-1.mdr");
        assert_eq!((msg.line, msg.column), (3, 5));
        assert_eq!(msg.severity, DiagnosticSeverity::Error);
        assert_eq!(msg.code.as_deref(), Some("MD3101"));
        assert_eq!(msg.message, "unknown name `x`");

        let warning = parse_line("a.mdr:1:1: warning: unused").unwrap();
        assert_eq!(warning.severity, DiagnosticSeverity::Warning);
        assert_eq!(warning.code, None);

        assert!(parse_line("Compiling a.mdr").is_none());
        assert!(parse_line("a.mdr:x:1: error: nope").is_none());
    }

    #[test]
    fn test_identifier_range_and_hints() {
        let text = "fn main() -> Int {\n  missing_name\n}";
        let output = "a.mdr:2:3: error[MD2001]: unknown name\n  hint: did you mean `main`?\nnoise line\n";
        let diagnostics = parse_check_output(output, text, OPTS);

        assert_eq!(diagnostics.len(), 1);
        let d = &diagnostics[0];
        assert_eq!(d.range, Range::new(Position::new(1, 2), Position::new(1, 14)));
        assert_eq!(d.message, "unknown name\nhint: did you mean `main`?");
        assert_eq!(d.code.as_deref(), Some("MD2001"));
    }

    #[test]
    fn test_single_character_range_and_clamping() {
        let text = "let x := (1 + 2";
        let d = &parse_check_output("a.mdr:1:10: error: unclosed", text, OPTS)[0];
        assert_eq!(d.range, Range::new(Position::new(0, 9), Position::new(0, 10)));

        // past the end of the document collapses to the last position
        let d = &parse_check_output("a.mdr:40:1: error: eof", text, OPTS)[0];
        assert_eq!(d.range.start, d.range.end);
    }

    #[test]
    fn test_file_filter_and_orphan_hints() {
        let output = "other.mdr:1:1: error: elsewhere\n  hint: not ours\nscratch.mdr:1:1: error: ours\n";
        let diagnostics = parse_check_output(
            output,
            "x",
            ParseOptions {
                file_name: Some("scratch.mdr"),
                max_count: 10,
            },
        );
        assert_eq!(diagnostics.len(), 1);
        assert_eq!(diagnostics[0].message, "ours");
    }

    #[test]
    fn test_count_cap() {
        let output: String = (1..=10)
            .map(|i| format!("a.mdr:1:1: error: e{}\n", i))
            .collect();
        let diagnostics = parse_check_output(
            &output,
            "x",
            ParseOptions {
                file_name: None,
                max_count: 3,
            },
        );
        assert_eq!(diagnostics.len(), 3);
        assert_eq!(diagnostics[2].message, "e3");
    }
}
