//! Offset and position conversion
//!
//! Symbols carry byte offsets into the document text; editors address
//! text by line and UTF-16 column. `LineIndex` converts between the two.

use crate::protocol::{Position, Range};

/// Line-start table for one text
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LineIndex {
    line_starts: Vec<usize>,
    len: usize,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        for (i, b) in text.bytes().enumerate() {
            if b == b'\n' {
                line_starts.push(i + 1);
            }
        }
        Self {
            line_starts,
            len: text.len(),
        }
    }

    /// Byte offset of the first character of `line`, if it exists
    pub fn line_start(&self, line: u32) -> Option<usize> {
        self.line_starts.get(line as usize).copied()
    }

    /// Convert a byte offset to a position. Offsets past the end clamp to
    /// the end of the text; offsets inside a multi-byte character snap back
    /// to its start.
    pub fn position(&self, text: &str, offset: usize) -> Position {
        let offset = floor_char_boundary(text, offset.min(self.len));
        let line = match self.line_starts.binary_search(&offset) {
            Ok(line) => line,
            Err(next) => next - 1,
        };
        let start = self.line_starts[line];
        let character: usize = text[start..offset].chars().map(char::len_utf16).sum();
        Position::new(line as u32, character as u32)
    }

    /// Convert a position back to a byte offset, clamping columns past the
    /// end of the line and lines past the end of the text.
    pub fn offset(&self, text: &str, pos: Position) -> usize {
        let Some(start) = self.line_start(pos.line) else {
            return self.len;
        };
        let end = self
            .line_starts
            .get(pos.line as usize + 1)
            .map(|next| next - 1)
            .unwrap_or(self.len);

        let mut units = 0u32;
        for (i, ch) in text[start..end].char_indices() {
            if units >= pos.character {
                return start + i;
            }
            units += ch.len_utf16() as u32;
        }
        end
    }

    pub fn range(&self, text: &str, start: usize, end: usize) -> Range {
        Range::new(self.position(text, start), self.position(text, end))
    }
}

fn floor_char_boundary(text: &str, mut offset: usize) -> usize {
    while offset > 0 && !text.is_char_boundary(offset) {
        offset -= 1;
    }
    offset
}

pub fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

pub fn is_ident_char(ch: char) -> bool {
    ch == '_' || ch.is_alphanumeric()
}

/// Identifier touching `offset` (cursor directly before, inside or right
/// after it) together with its byte span.
pub fn word_at(text: &str, offset: usize) -> Option<(usize, usize, &str)> {
    let offset = floor_char_boundary(text, offset.min(text.len()));

    let mut start = offset;
    for (i, ch) in text[..offset].char_indices().rev() {
        if is_ident_char(ch) {
            start = i;
        } else {
            break;
        }
    }
    let mut end = offset;
    for (i, ch) in text[offset..].char_indices() {
        if is_ident_char(ch) {
            end = offset + i + ch.len_utf8();
        } else {
            break;
        }
    }

    if start == end {
        return None;
    }
    let word = &text[start..end];
    let first = word.chars().next()?;
    if !is_ident_start(first) {
        return None;
    }
    Some((start, end, word))
}

/// Identifier characters immediately before `offset` (the completion prefix)
pub fn prefix_before(text: &str, offset: usize) -> (usize, &str) {
    let offset = floor_char_boundary(text, offset.min(text.len()));
    let mut start = offset;
    for (i, ch) in text[..offset].char_indices().rev() {
        if is_ident_char(ch) {
            start = i;
        } else {
            break;
        }
    }
    (start, &text[start..offset])
}

/// Whether the identifier starting at `start` is a member access (`x.name`)
pub fn is_member_access(text: &str, start: usize) -> bool {
    text[..start]
        .chars()
        .rev()
        .find(|c| !c.is_whitespace())
        .is_some_and(|c| c == '.')
        && !text[..start].trim_end().ends_with("..")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_position_round_trip() {
        let text = "fn main() {\n  let x := 1\n}\n";
        let index = LineIndex::new(text);
        let offset = text.find("x :=").unwrap();
        let pos = index.position(text, offset);
        assert_eq!(pos, Position::new(1, 6));
        assert_eq!(index.offset(text, pos), offset);
    }

    #[test]
    fn test_utf16_columns() {
        let text = "let s := \"日本\" + name";
        let index = LineIndex::new(text);
        let offset = text.find("name").unwrap();
        let pos = index.position(text, offset);
        // each CJK character is three UTF-8 bytes but one UTF-16 unit
        assert_eq!(pos.character, 16);
        assert_eq!(index.offset(text, pos), offset);
    }

    #[test]
    fn test_clamping() {
        let text = "ab\ncd";
        let index = LineIndex::new(text);
        assert_eq!(index.offset(text, Position::new(0, 99)), 2);
        assert_eq!(index.offset(text, Position::new(9, 0)), text.len());
        assert_eq!(index.position(text, 999), Position::new(1, 2));
    }

    #[test]
    fn test_word_at() {
        let text = "print(user_id)";
        assert_eq!(word_at(text, 8), Some((6, 13, "user_id")));
        assert_eq!(word_at(text, 13), Some((6, 13, "user_id")));
        assert_eq!(word_at(text, 0), Some((0, 5, "print")));
        assert_eq!(word_at("1234", 2), None);
        assert_eq!(word_at("  ", 1), None);
    }

    #[test]
    fn test_member_access() {
        let text = "user.name + 0..end";
        assert!(is_member_access(text, 5));
        assert!(!is_member_access(text, 0));
        assert!(!is_member_access(text, text.find("end").unwrap()));
    }
}
