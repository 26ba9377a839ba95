//! Heuristic symbol indexer
//!
//! Turns one document's text into a `SymbolIndex` by matching declaration
//! shapes against a masked copy of the text (comments and literal contents
//! blanked out). This is a lexical approximation, not a parse: anything the
//! patterns cannot place confidently is left out, so the index is a lower
//! bound of what the compiler would see.

use lazy_static::lazy_static;
use regex::Regex;

use super::keywords::is_keyword;
use super::scanner::{find_matching_delimiter, mask_non_code, split_top_level};
use super::symbol::{BodyRange, Import, Param, Symbol, SymbolIndex, SymbolKind};
use super::text::LineIndex;

const IDENT: &str = r"[\p{L}_][\p{L}\p{N}_]*";

fn re(pattern: &str) -> Regex {
    Regex::new(&pattern.replace("IDENT", IDENT)).expect("indexer pattern must compile")
}

lazy_static! {
    static ref IMPORT_RE: Regex = re(r#"\bimport\s+"([^"\n]*)""#);
    static ref EXTERN_RE: Regex = re(r#"\bextern\s*(?:"[^"\n]*"\s*)?fn\s+(IDENT)\s*\("#);
    static ref FN_RE: Regex = re(r"\bfn\s+(IDENT)\s*(\[[^\]\n]*\])?\s*\(");
    static ref STRUCT_RE: Regex = re(r"\bstruct\s+(IDENT)\s*(?:\[[^\]\n]*\])?\s*\{");
    static ref ENUM_RE: Regex = re(r"\benum\s+(IDENT)\s*(?:\[[^\]\n]*\])?\s*\{");
    static ref TRAIT_RE: Regex = re(r"\btrait\s+(IDENT)\s*(?:\[[^\]\n]*\])?\s*\{");
    static ref ERROR_RE: Regex = re(r"\berror\s+(IDENT)\b");
    static ref BINDING_RE: Regex = re(r"\b(?:let|var)\s+(IDENT)\s*(:=|:|=)");
    static ref FOR_RE: Regex = re(r"\bfor\s+(IDENT)\s+in\b");
    static ref TYPED_NAME_RE: Regex = re(r"(?s)^(IDENT)\s*(?::\s*(.+))?$");
    static ref VARIANT_RE: Regex = re(r"^(IDENT)");
}

/// Index one document. Never fails; malformed input yields fewer symbols.
pub fn index_document(text: &str) -> SymbolIndex {
    let masked = mask_non_code(text);
    let mut builder = IndexBuilder {
        text,
        masked: &masked,
        line_index: LineIndex::new(text),
        index: SymbolIndex::default(),
    };

    builder.scan_imports();
    let extern_spans = builder.scan_externs();
    let trait_spans = builder.scan_traits(&extern_spans);

    let mut excluded = extern_spans;
    excluded.extend(trait_spans);
    let body_spans = builder.scan_functions(&excluded);
    excluded.extend(body_spans);

    builder.scan_structs(&excluded);
    builder.scan_enums(&excluded);
    builder.scan_errors(&excluded);

    builder.finish()
}

type Span = (usize, usize);

fn in_spans(spans: &[Span], offset: usize) -> bool {
    spans.iter().any(|&(start, end)| start <= offset && offset <= end)
}

/// Collapse runs of whitespace so multi-line type text reads on one line
fn normalize_ws(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn render_params(params: &[Param]) -> String {
    params
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

struct IndexBuilder<'a> {
    text: &'a str,
    masked: &'a str,
    line_index: LineIndex,
    index: SymbolIndex,
}

/// Parameter list and return type following a declaration name
struct Header {
    params: Vec<Param>,
    param_offsets: Vec<usize>,
    return_type: Option<String>,
    /// First byte after the return type (or after `)` when there is none)
    end: usize,
}

impl<'a> IndexBuilder<'a> {
    fn finish(mut self) -> SymbolIndex {
        self.index.line_index = self.line_index;
        self.index
    }

    fn symbol(&self, name: &str, kind: SymbolKind, offset: usize) -> Symbol {
        let range = self.line_index.range(self.text, offset, offset + name.len());
        Symbol::new(name, kind, offset, range)
    }

    fn scan_imports(&mut self) {
        for caps in IMPORT_RE.captures_iter(self.text) {
            let (Some(whole), Some(path)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            // the keyword itself must be live code, not comment or string text
            if self.masked.get(whole.start()..whole.start() + 6) != Some("import") {
                continue;
            }
            self.index.imports.push(Import {
                path: path.as_str().to_string(),
                offset: path.start(),
            });
        }
    }

    /// Parse `( params ) [-> Ret]` starting at the opening parenthesis.
    /// The return type runs until `{`, a newline or `stop` bytes.
    fn parse_header(&self, open: usize, stop_at_brace: bool) -> Option<Header> {
        let close = find_matching_delimiter(self.masked, open)?;

        let mut params = Vec::new();
        let mut param_offsets = Vec::new();
        for seg in split_top_level(self.masked, open + 1, close, b",") {
            let Some(caps) = TYPED_NAME_RE.captures(seg.text) else {
                continue;
            };
            let Some(name) = caps.get(1) else { continue };
            if is_keyword(name.as_str()) {
                continue;
            }
            params.push(Param {
                name: name.as_str().to_string(),
                ty: caps.get(2).map(|t| normalize_ws(t.as_str())),
            });
            param_offsets.push(seg.offset);
        }

        let after = close + 1;
        let rest = &self.masked[after..];
        let trimmed = rest.trim_start_matches([' ', '\t']);
        let mut return_type = None;
        let mut end = after;
        if let Some(ret) = trimmed.strip_prefix("->") {
            let ret_start = after + (rest.len() - trimmed.len()) + 2;
            let stop = ret
                .find(|c: char| c == '\n' || (stop_at_brace && c == '{') || c == '}')
                .unwrap_or(ret.len());
            let ty = normalize_ws(&ret[..stop]);
            if !ty.is_empty() {
                return_type = Some(ty);
            }
            end = ret_start + stop;
        }

        Some(Header {
            params,
            param_offsets,
            return_type,
            end,
        })
    }

    fn scan_externs(&mut self) -> Vec<Span> {
        let mut spans = Vec::new();
        for caps in EXTERN_RE.captures_iter(self.masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            let line_end = self.masked[whole.end()..]
                .find('\n')
                .map(|i| whole.end() + i)
                .unwrap_or(self.masked.len());

            let Some(header) = self.parse_header(whole.end() - 1, false) else {
                spans.push((whole.start(), line_end));
                continue;
            };
            spans.push((whole.start(), header.end.max(line_end)));

            let mut sym = self.symbol(name.as_str(), SymbolKind::ExternFunction, name.start());
            let mut signature = format!(
                "extern fn {}({})",
                name.as_str(),
                render_params(&header.params)
            );
            if let Some(ret) = &header.return_type {
                signature.push_str(&format!(" -> {}", ret));
            }
            sym.signature = Some(signature);
            sym.return_type = header.return_type;
            sym.params = Some(header.params);
            sym.is_extern = true;
            self.index.extern_functions.push(sym);
        }
        spans
    }

    /// Returns the `{ ... }` span of every trait body
    fn scan_traits(&mut self, excluded: &[Span]) -> Vec<Span> {
        let mut spans = Vec::new();
        for caps in TRAIT_RE.captures_iter(self.masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if in_spans(excluded, whole.start()) {
                continue;
            }
            let open = whole.end() - 1;
            let Some(close) = find_matching_delimiter(self.masked, open) else {
                continue;
            };
            spans.push((open, close));

            let trait_name = name.as_str().to_string();
            let mut sym = self.symbol(&trait_name, SymbolKind::Trait, name.start());
            sym.signature = Some(format!("trait {}", trait_name));
            sym.body_range = Some(BodyRange { start: open, end: close });
            self.index.traits.push(sym);

            let body = &self.masked[open..close];
            for m_caps in FN_RE.captures_iter(body) {
                let (Some(m_whole), Some(m_name)) = (m_caps.get(0), m_caps.get(1)) else {
                    continue;
                };
                let paren = open + m_whole.end() - 1;
                let Some(header) = self.parse_header(paren, false) else {
                    continue;
                };
                let offset = open + m_name.start();
                let mut method = self.symbol(m_name.as_str(), SymbolKind::Method, offset);
                let mut signature = format!(
                    "fn {}({})",
                    m_name.as_str(),
                    render_params(&header.params)
                );
                if let Some(ret) = &header.return_type {
                    signature.push_str(&format!(" -> {}", ret));
                }
                method.signature = Some(signature);
                method.return_type = header.return_type;
                method.params = Some(header.params);
                method.container = Some(trait_name.clone());
                self.index.methods.push(method);
            }
        }
        spans
    }

    /// Returns the `{ ... }` span of every function body
    fn scan_functions(&mut self, excluded: &[Span]) -> Vec<Span> {
        let matches: Vec<_> = FN_RE
            .captures_iter(self.masked)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let name = caps.get(1)?;
                let generics = caps.get(2).map(|g| normalize_ws(g.as_str()));
                Some((whole.start(), whole.end(), name.start(), name.as_str(), generics))
            })
            .filter(|(start, ..)| !in_spans(excluded, *start))
            .collect();

        let mut bodies = Vec::new();
        for (i, &(_, end, name_offset, name, ref generics)) in matches.iter().enumerate() {
            if is_keyword(name) {
                continue;
            }
            let Some(header) = self.parse_header(end - 1, true) else {
                continue;
            };

            let rest = &self.masked[header.end..];
            let body_open = rest
                .find(|c: char| !c.is_whitespace())
                .filter(|&at| rest.as_bytes()[at] == b'{')
                .map(|at| header.end + at);

            let body_range = body_open.map(|open| {
                let close = find_matching_delimiter(self.masked, open).unwrap_or_else(|| {
                    // unterminated body: assume it runs until the next function
                    matches
                        .get(i + 1)
                        .map(|next| next.0.saturating_sub(1))
                        .unwrap_or(self.masked.len())
                        .max(open)
                });
                BodyRange { start: open, end: close }
            });

            let mut sym = self.symbol(name, SymbolKind::Function, name_offset);
            let mut signature = format!(
                "fn {}{}({})",
                name,
                generics.as_deref().unwrap_or(""),
                render_params(&header.params)
            );
            if let Some(ret) = &header.return_type {
                signature.push_str(&format!(" -> {}", ret));
            }
            sym.signature = Some(signature);
            sym.return_type = header.return_type.clone();
            sym.body_range = body_range;

            for (param, &offset) in header.params.iter().zip(&header.param_offsets) {
                let mut p = self.symbol(&param.name, SymbolKind::Parameter, offset);
                p.container = Some(name.to_string());
                p.ty = param.ty.clone();
                self.index.params.push(p);
            }
            sym.params = Some(header.params);
            self.index.functions.push(sym);

            if let Some(body) = body_range {
                bodies.push((body.start, body.end));
                self.scan_locals(name, body);
            }
        }
        bodies
    }

    fn scan_locals(&mut self, function: &str, body: BodyRange) {
        let end = (body.end + 1).min(self.masked.len());
        let slice = &self.masked[body.start..end];

        let mut found: Vec<(usize, String, Option<String>)> = Vec::new();
        for caps in BINDING_RE.captures_iter(slice) {
            let (Some(name), Some(op)) = (caps.get(1), caps.get(2)) else {
                continue;
            };
            if is_keyword(name.as_str()) {
                continue;
            }
            let ty = if op.as_str() == ":" {
                let after = &slice[op.end()..];
                let stop = after.find(['=', '\n']).unwrap_or(after.len());
                Some(normalize_ws(&after[..stop])).filter(|t| !t.is_empty())
            } else {
                None
            };
            found.push((body.start + name.start(), name.as_str().to_string(), ty));
        }
        for caps in FOR_RE.captures_iter(slice) {
            let Some(name) = caps.get(1) else { continue };
            if is_keyword(name.as_str()) {
                continue;
            }
            found.push((body.start + name.start(), name.as_str().to_string(), None));
        }
        found.sort_by_key(|(offset, ..)| *offset);

        for (offset, name, ty) in found {
            let mut local = self.symbol(&name, SymbolKind::Local, offset);
            local.container = Some(function.to_string());
            local.ty = ty;
            self.index.locals.push(local);
        }
    }

    fn scan_structs(&mut self, excluded: &[Span]) {
        for caps in STRUCT_RE.captures_iter(self.masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if in_spans(excluded, whole.start()) {
                continue;
            }
            let open = whole.end() - 1;
            let Some(close) = find_matching_delimiter(self.masked, open) else {
                continue;
            };

            let struct_name = name.as_str().to_string();
            let mut sym = self.symbol(&struct_name, SymbolKind::Struct, name.start());
            sym.signature = Some(format!("struct {}", struct_name));
            sym.body_range = Some(BodyRange { start: open, end: close });
            self.index.structs.push(sym);

            for seg in split_top_level(self.masked, open + 1, close, b",\n") {
                let Some(field_caps) = TYPED_NAME_RE.captures(seg.text) else {
                    continue;
                };
                let (Some(f_name), Some(f_ty)) = (field_caps.get(1), field_caps.get(2)) else {
                    continue;
                };
                let ty = normalize_ws(f_ty.as_str());
                let mut field = self.symbol(f_name.as_str(), SymbolKind::Field, seg.offset);
                field.signature = Some(format!("{}: {}", f_name.as_str(), ty));
                field.ty = Some(ty);
                field.container = Some(struct_name.clone());
                self.index.fields.push(field);
            }
        }
    }

    fn scan_enums(&mut self, excluded: &[Span]) {
        for caps in ENUM_RE.captures_iter(self.masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if in_spans(excluded, whole.start()) {
                continue;
            }
            let open = whole.end() - 1;
            let Some(close) = find_matching_delimiter(self.masked, open) else {
                continue;
            };

            let enum_name = name.as_str().to_string();
            let mut sym = self.symbol(&enum_name, SymbolKind::Enum, name.start());
            sym.signature = Some(format!("enum {}", enum_name));
            sym.body_range = Some(BodyRange { start: open, end: close });
            self.index.enums.push(sym);

            for seg in split_top_level(self.masked, open + 1, close, b",\n") {
                let Some(v_name) = VARIANT_RE.find(seg.text) else {
                    continue;
                };
                let mut variant = self.symbol(v_name.as_str(), SymbolKind::Variant, seg.offset);
                variant.container = Some(enum_name.clone());

                let tail = seg.text[v_name.end()..].trim_start();
                if tail.starts_with('(') {
                    let paren = seg.offset + (seg.text.len() - tail.len());
                    if let Some(header) = self.parse_header(paren, false) {
                        variant.signature = Some(format!(
                            "{}({})",
                            v_name.as_str(),
                            render_params(&header.params)
                        ));
                        variant.params = Some(header.params);
                    }
                } else if !tail.is_empty() {
                    // not a variant shape
                    continue;
                }
                if variant.signature.is_none() {
                    variant.signature = Some(v_name.as_str().to_string());
                }
                self.index.variants.push(variant);
            }
        }
    }

    fn scan_errors(&mut self, excluded: &[Span]) {
        for caps in ERROR_RE.captures_iter(self.masked) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            if in_spans(excluded, whole.start()) || is_keyword(name.as_str()) {
                continue;
            }
            let mut sym = self.symbol(name.as_str(), SymbolKind::CustomError, name.start());
            sym.signature = Some(format!("error {}", name.as_str()));
            self.index.errors.push(sym);
        }
    }
}
