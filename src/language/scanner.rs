//! Lexical scanning helpers
//!
//! The indexer never tokenizes Midori properly. It only needs to know, for
//! every byte, whether it is live code or part of a comment or literal, so
//! that declaration patterns and delimiter counting ignore text inside
//! `// ...`, `/* ... */`, `"..."` and `'...'`.

/// Lexical context of a byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LexState {
    Code,
    LineComment,
    BlockComment,
    Str,
    Char,
}

/// Walks text byte by byte tracking comment/literal state.
///
/// Delimiters of a literal or comment (`"`, `'`, `//`, `/*`, `*/`) are
/// reported as the inner state except for the opening and closing quote,
/// which are reported as `Code` so callers can keep them when masking.
pub struct LexCursor<'a> {
    bytes: &'a [u8],
    pos: usize,
    state: LexState,
}

impl<'a> LexCursor<'a> {
    pub fn new(text: &'a str) -> Self {
        Self::starting_at(text, 0)
    }

    /// Start scanning at `pos`, assuming that position is live code
    pub fn starting_at(text: &'a str, pos: usize) -> Self {
        Self {
            bytes: text.as_bytes(),
            pos: pos.min(text.len()),
            state: LexState::Code,
        }
    }
}

impl Iterator for LexCursor<'_> {
    type Item = (usize, u8, LexState);

    fn next(&mut self) -> Option<Self::Item> {
        let i = self.pos;
        let b = *self.bytes.get(i)?;
        let next = self.bytes.get(i + 1).copied();
        self.pos += 1;

        let reported = match self.state {
            LexState::Code => match (b, next) {
                (b'/', Some(b'/')) => {
                    self.state = LexState::LineComment;
                    LexState::LineComment
                }
                (b'/', Some(b'*')) => {
                    // consume the '*' so "/*/" does not close immediately
                    self.state = LexState::BlockComment;
                    self.pos += 1;
                    return Some((i, b, LexState::BlockComment));
                }
                (b'"', _) => {
                    self.state = LexState::Str;
                    LexState::Code
                }
                (b'\'', _) => {
                    self.state = LexState::Char;
                    LexState::Code
                }
                _ => LexState::Code,
            },
            LexState::LineComment => {
                if b == b'\n' {
                    self.state = LexState::Code;
                    LexState::Code
                } else {
                    LexState::LineComment
                }
            }
            LexState::BlockComment => {
                if b == b'*' && next == Some(b'/') {
                    self.state = LexState::Code;
                    self.pos += 1;
                }
                LexState::BlockComment
            }
            LexState::Str | LexState::Char => {
                let quote = if self.state == LexState::Str { b'"' } else { b'\'' };
                if b == b'\\' {
                    self.pos = (self.pos + 1).min(self.bytes.len());
                    self.state
                } else if b == quote {
                    self.state = LexState::Code;
                    LexState::Code
                } else if b == b'\n' {
                    // unterminated literal; recover at end of line
                    self.state = LexState::Code;
                    LexState::Code
                } else {
                    self.state
                }
            }
        };
        Some((i, b, reported))
    }
}

/// Copy of `text` in which comment bodies and literal contents are replaced
/// by spaces. Newlines and quote characters survive, and every byte keeps
/// its offset, so matches against the mask map straight back to `text`.
pub fn mask_non_code(text: &str) -> String {
    let mut out = text.as_bytes().to_vec();
    let mut cursor = LexCursor::new(text);
    while let Some((i, _, state)) = cursor.next() {
        // escapes and comment terminators advance more than one byte
        let consumed_to = cursor.pos.min(out.len());
        if state != LexState::Code {
            for slot in &mut out[i..consumed_to] {
                if *slot != b'\n' {
                    *slot = b' ';
                }
            }
        }
    }
    // non-code bytes were replaced wholesale (all bytes of any multi-byte
    // character), so the result is still valid UTF-8
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

/// Whether the gap just before `offset` (where a cursor sits) is live code
/// rather than the inside of a comment or literal
pub fn is_code_at(text: &str, offset: usize) -> bool {
    let offset = offset.min(text.len());
    let mut cursor = LexCursor::new(text);
    while cursor.pos < offset {
        if cursor.next().is_none() {
            break;
        }
    }
    cursor.state == LexState::Code
}

fn closing_for(open: u8) -> Option<u8> {
    match open {
        b'(' => Some(b')'),
        b'[' => Some(b']'),
        b'{' => Some(b'}'),
        _ => None,
    }
}

/// Offset of the delimiter that closes the one at `open`, skipping
/// delimiters inside comments and literals. Only the opening kind is
/// counted, so `{ ( }` still closes the brace.
pub fn find_matching_delimiter(text: &str, open: usize) -> Option<usize> {
    let open_byte = *text.as_bytes().get(open)?;
    let close_byte = closing_for(open_byte)?;

    let mut depth = 0usize;
    for (i, b, state) in LexCursor::starting_at(text, open) {
        if state != LexState::Code {
            continue;
        }
        if b == open_byte {
            depth += 1;
        } else if b == close_byte {
            depth -= 1;
            if depth == 0 {
                return Some(i);
            }
        }
    }
    None
}

/// A trimmed piece of text with its absolute byte offset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'a> {
    pub text: &'a str,
    pub offset: usize,
}

/// Split `text[start..end]` on any of `separators` that occur at bracket
/// depth zero and outside comments and literals. Empty segments are dropped.
pub fn split_top_level<'a>(
    text: &'a str,
    start: usize,
    end: usize,
    separators: &[u8],
) -> Vec<Segment<'a>> {
    let end = end.min(text.len());
    let mut segments = Vec::new();
    if start >= end {
        return segments;
    }

    let mut depth = 0i32;
    let mut seg_start = start;
    for (i, b, state) in LexCursor::starting_at(text, start) {
        if i >= end {
            break;
        }
        if state != LexState::Code {
            continue;
        }
        match b {
            b'(' | b'[' | b'{' => depth += 1,
            b')' | b']' | b'}' => depth = (depth - 1).max(0),
            _ if depth == 0 && separators.contains(&b) => {
                push_segment(text, seg_start, i, &mut segments);
                seg_start = i + 1;
            }
            _ => {}
        }
    }
    push_segment(text, seg_start, end, &mut segments);
    segments
}

fn push_segment<'a>(text: &'a str, start: usize, end: usize, out: &mut Vec<Segment<'a>>) {
    let Some(raw) = text.get(start..end) else {
        return;
    };
    let trimmed_start = raw.len() - raw.trim_start().len();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return;
    }
    out.push(Segment {
        text: trimmed,
        offset: start + trimmed_start,
    });
}
