//! Completion
//!
//! After `.` only members (fields, methods, variants) are offered. Otherwise
//! the list is: visible locals and parameters, top-level symbols of this file
//! and its imports, built-ins, built-in types and keywords. Keywords are
//! fuzzy-ranked within their group when enabled; the best one is preselected
//! when it is a prefix match or no local or symbol matched.

use std::collections::HashSet;

use crate::fuzzy::rank_keywords;
use crate::language::scanner::is_code_at;
use crate::language::text::{is_member_access, prefix_before};
use crate::language::{Symbol, BUILTINS, BUILTIN_TYPES, KEYWORDS};
use crate::protocol::{completion_kind, CompletionItem, MarkupContent};

use super::analysis::{Analysis, SourceFile};

const SORT_LOCAL: &str = "1";
const SORT_SYMBOL: &str = "2";
const SORT_BUILTIN: &str = "3";
const SORT_TYPE: &str = "4";
const SORT_KEYWORD: &str = "5";

fn matches_prefix(label: &str, prefix: &str) -> bool {
    prefix.is_empty() || label.to_lowercase().starts_with(&prefix.to_lowercase())
}

fn symbol_item(symbol: &Symbol, sort_group: &str) -> CompletionItem {
    let mut item = CompletionItem::new(&symbol.name, symbol.kind.completion_kind());
    item.detail = Some(symbol.detail());
    item.sort_text = Some(format!("{}_{}", sort_group, symbol.name));
    item
}

struct Collector<'p> {
    prefix: &'p str,
    seen: HashSet<String>,
    items: Vec<CompletionItem>,
}

impl<'p> Collector<'p> {
    fn push_symbol(&mut self, symbol: &Symbol, sort_group: &str) {
        if matches_prefix(&symbol.name, self.prefix) && self.seen.insert(symbol.name.clone()) {
            self.items.push(symbol_item(symbol, sort_group));
        }
    }
}

pub async fn completion(
    analysis: &Analysis<'_>,
    file: &SourceFile,
    offset: usize,
) -> Vec<CompletionItem> {
    if !is_code_at(&file.text, offset) {
        return Vec::new();
    }
    let (start, prefix) = prefix_before(&file.text, offset);
    let imported = analysis.imported_files(file).await;
    let mut collector = Collector {
        prefix,
        seen: HashSet::new(),
        items: Vec::new(),
    };

    if is_member_access(&file.text, start) {
        for source in std::iter::once(file).chain(imported.iter()) {
            let index = &source.index;
            for member in index.fields.iter().chain(&index.methods).chain(&index.variants) {
                collector.push_symbol(member, SORT_SYMBOL);
            }
        }
        return collector.items;
    }

    if let Some(function) = file.index.function_scope_at(start) {
        let mut visible: Vec<&Symbol> = file
            .index
            .locals_of(&function.name)
            .filter(|s| s.offset < start && function.offset <= s.offset)
            .collect();
        // most recent declaration of a name wins
        visible.sort_by(|a, b| b.offset.cmp(&a.offset));
        for local in visible {
            collector.push_symbol(local, SORT_LOCAL);
        }
    }

    for source in std::iter::once(file).chain(imported.iter()) {
        for symbol in source.index.top_level_symbols() {
            collector.push_symbol(symbol, SORT_SYMBOL);
        }
    }

    let named_matches = collector.items.len();

    for b in BUILTINS {
        if matches_prefix(b.name, prefix) && collector.seen.insert(b.name.to_string()) {
            let kind = if b.name.starts_with(char::is_uppercase) {
                completion_kind::CONSTRUCTOR
            } else {
                completion_kind::FUNCTION
            };
            let mut item = CompletionItem::new(b.name, kind);
            item.detail = Some(b.signature.to_string());
            item.documentation = Some(MarkupContent::markdown(b.doc));
            item.sort_text = Some(format!("{}_{}", SORT_BUILTIN, b.name));
            collector.items.push(item);
        }
    }

    for ty in BUILTIN_TYPES {
        if matches_prefix(ty, prefix) && collector.seen.insert(ty.to_string()) {
            let mut item = CompletionItem::new(*ty, completion_kind::CLASS);
            item.detail = Some("built-in type".to_string());
            item.sort_text = Some(format!("{}_{}", SORT_TYPE, ty));
            collector.items.push(item);
        }
    }

    let settings = &analysis.settings;
    let mut items = collector.items;
    if settings.fuzzy_keyword_suggestions && !prefix.is_empty() {
        let ranked = rank_keywords(prefix, settings.fuzzy_max_edit_distance);
        for (rank, m) in ranked.iter().enumerate() {
            let mut item = CompletionItem::new(m.keyword, completion_kind::KEYWORD);
            item.sort_text = Some(format!("{}_{:02}_{}", SORT_KEYWORD, rank, m.keyword));
            if !m.is_prefix {
                // keep typo matches visible to client-side filtering
                item.filter_text = Some(prefix.to_string());
                item.detail = Some(format!("did you mean `{}`?", m.keyword));
            }
            // a typo fix must not win over a name the user is spelling out
            if rank == 0 && (m.is_prefix || named_matches == 0) {
                item.preselect = Some(true);
            }
            items.push(item);
        }
    } else {
        for kw in KEYWORDS {
            if kw.starts_with(prefix) {
                let mut item = CompletionItem::new(*kw, completion_kind::KEYWORD);
                item.sort_text = Some(format!("{}_{}", SORT_KEYWORD, kw));
                items.push(item);
            }
        }
    }
    items
}
