//! Signature help
//!
//! Walks the masked text from the start of the enclosing function (or the
//! document) up to the cursor, keeping a stack of open brackets. Each `(`
//! frame remembers the identifier right before it and counts its top-level
//! commas; the innermost frame whose callee resolves to something callable
//! supplies the signature and active parameter.

use crate::language::scanner::mask_non_code;
use crate::language::text::is_ident_char;
use crate::language::{is_keyword, SymbolKind};
use crate::protocol::{MarkupContent, ParameterInformation, SignatureHelp, SignatureInformation};

use super::analysis::{Analysis, SourceFile};
use super::resolve::{resolve_name, Definition};

#[derive(Debug, Clone, PartialEq, Eq)]
struct Frame {
    is_call: bool,
    callee: Option<(usize, String)>,
    commas: usize,
}

/// Identifier ending right before `paren`, skipping whitespace
fn callee_before(masked: &str, paren: usize) -> Option<(usize, String)> {
    let before = masked[..paren].trim_end();
    let end = before.len();
    let start = before
        .char_indices()
        .rev()
        .take_while(|(_, c)| is_ident_char(*c))
        .last()
        .map(|(i, _)| i)?;
    let name = &before[start..end];
    if name.starts_with(|c: char| c.is_ascii_digit()) || is_keyword(name) {
        return None;
    }
    Some((start, name.to_string()))
}

/// Open call frames at `offset`, innermost last
fn open_calls(masked: &str, from: usize, offset: usize) -> Vec<Frame> {
    let mut stack: Vec<Frame> = Vec::new();
    let end = offset.min(masked.len());
    for (i, b) in masked.bytes().enumerate().take(end).skip(from) {
        match b {
            b'(' => stack.push(Frame {
                is_call: true,
                callee: callee_before(masked, i),
                commas: 0,
            }),
            b'[' | b'{' => stack.push(Frame {
                is_call: false,
                callee: None,
                commas: 0,
            }),
            b')' | b']' | b'}' => {
                stack.pop();
            }
            b',' => {
                if let Some(top) = stack.last_mut() {
                    top.commas += 1;
                }
            }
            _ => {}
        }
    }
    stack
}

pub async fn signature_help(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
) -> Option<SignatureHelp> {
    let masked = mask_non_code(&file.text);
    // outside any function body, e.g. in a header, scan from the document start
    let from = file
        .index
        .function_at(offset)
        .and_then(|f| f.body_range)
        .map(|b| b.start)
        .unwrap_or(0);

    for frame in open_calls(&masked, from, offset).iter().rev() {
        if !frame.is_call {
            continue;
        }
        let Some((start, name)) = &frame.callee else {
            continue;
        };
        let Some(def) = resolve_name(analysis, file, name, *start).await else {
            continue;
        };

        let (label, params, documentation) = match &def {
            Definition::Symbol { symbol, .. } if symbol.kind.is_callable() => {
                let params: Vec<String> = symbol
                    .params
                    .as_ref()
                    .map(|ps| ps.iter().map(ToString::to_string).collect())
                    .unwrap_or_default();
                let label = symbol.signature.clone().unwrap_or_else(|| symbol.name.clone());
                let doc = match (&symbol.container, symbol.kind) {
                    (Some(owner), SymbolKind::Variant) => Some(format!("variant of `{}`", owner)),
                    (Some(owner), SymbolKind::Method) => Some(format!("method of `{}`", owner)),
                    _ => None,
                };
                (label, params, doc)
            }
            Definition::Builtin(b) => (
                b.signature.to_string(),
                b.param_labels(),
                Some(b.doc.to_string()),
            ),
            _ => continue,
        };

        let active = if params.is_empty() {
            0
        } else {
            frame.commas.min(params.len() - 1)
        };
        return Some(SignatureHelp {
            signatures: vec![SignatureInformation {
                label,
                documentation: documentation.map(MarkupContent::markdown),
                parameters: params
                    .into_iter()
                    .map(|label| ParameterInformation {
                        label,
                        documentation: None,
                    })
                    .collect(),
            }],
            active_signature: Some(0),
            active_parameter: Some(active as u32),
        });
    }
    None
}
