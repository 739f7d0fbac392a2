//! Entity tokenizer
//!
//! Splits object-literal text into `key: value` declarations without a syntax
//! tree. One left-to-right pass drives a small state machine
//! ([`ScanState`]) while a [`Lexer`] tracks bracket depth, string literals and
//! regex literals, so commas and braces nested inside values, quotes or
//! patterns never end a declaration. Only a comma at depth zero does.

use std::borrow::Cow;

/// One `key: value` declaration found at depth zero
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Declaration<'a> {
    /// Key with quotes removed
    pub key: &'a str,
    /// Value text, trimmed
    pub value: &'a str,
}

/// Result of splitting a block
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Split<'a> {
    /// Declarations in source order
    pub declarations: Vec<Declaration<'a>>,
    /// Depth-zero fragments without an `identifier:` key
    pub skipped: Vec<&'a str>,
}

impl<'a> Split<'a> {
    /// Value of the first declaration named `key`
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.declarations
            .iter()
            .find(|d| d.key == key)
            .map(|d| d.value)
    }

    /// Value of the first declaration matching any of `keys`
    #[must_use]
    pub fn get_any(&self, keys: &[&str]) -> Option<&'a str> {
        keys.iter().find_map(|k| self.get(k))
    }

    /// Whether a declaration named `key` exists
    #[inline]
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// No declarations and nothing skipped
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty() && self.skipped.is_empty()
    }
}

/// Token class of one byte fed to the lexer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Token {
    /// Comma at depth zero
    Separator,
    /// Opening bracket outside strings
    Open,
    /// Closing bracket outside strings; carries the depth after closing
    Close(u32),
    /// Anything else
    Other,
}

/// Lexical state shared by all scanners
#[derive(Debug, Clone, Default)]
pub(crate) struct Lexer {
    depth: u32,
    quote: Option<u8>,
    regex: bool,
    class: bool,
    escaped: bool,
    prev: u8,
}

impl Lexer {
    /// Lexer positioned right after a `:`
    pub(crate) fn after_colon() -> Self {
        Self {
            prev: b':',
            ..Self::default()
        }
    }

    /// Feed one byte
    pub(crate) fn feed(&mut self, b: u8) -> Token {
        if self.escaped {
            self.escaped = false;
            return Token::Other;
        }
        if let Some(q) = self.quote {
            if b == b'\\' {
                self.escaped = true;
            } else if b == q {
                self.quote = None;
                self.prev = b;
            }
            return Token::Other;
        }
        if self.regex {
            match b {
                b'\\' => self.escaped = true,
                b'[' => self.class = true,
                b']' => self.class = false,
                b'/' if !self.class => {
                    self.regex = false;
                    self.prev = b;
                }
                _ => {}
            }
            return Token::Other;
        }

        let token = match b {
            b'\'' | b'"' | b'`' => {
                self.quote = Some(b);
                Token::Other
            }
            b'/' if matches!(self.prev, 0 | b':' | b',' | b'[' | b'(' | b'=' | b'{') => {
                self.regex = true;
                Token::Other
            }
            b'{' | b'[' | b'(' => {
                self.depth += 1;
                Token::Open
            }
            b'}' | b']' | b')' => {
                self.depth = self.depth.saturating_sub(1);
                Token::Close(self.depth)
            }
            b',' if self.depth == 0 => Token::Separator,
            _ => Token::Other,
        };
        if !b.is_ascii_whitespace() {
            self.prev = b;
        }
        token
    }
}

/// Scanner state while splitting declarations
#[derive(Debug, Clone, Copy)]
enum ScanState {
    /// Between declarations
    Outside,
    /// Reading a bare identifier key
    Key { start: usize },
    /// Reading a quoted key
    QuotedKey { start: usize, quote: u8 },
    /// Key read, waiting for `:`
    AfterKey { frag: usize, key: (usize, usize) },
    /// Inside a declaration's value
    Value { key: (usize, usize), start: usize },
    /// Inside a fragment with no usable key
    Skip { start: usize },
}

#[inline]
fn is_ident_start(b: u8) -> bool {
    b.is_ascii_alphabetic() || b == b'_' || b == b'$'
}

#[inline]
fn is_ident(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$'
}

/// Split the inside of an object literal into declarations
///
/// The input must already be free of comments (see [`strip_comments`]).
#[must_use]
pub fn split_declarations<'a>(block: &'a str) -> Split<'a> {
    let bytes = block.as_bytes();
    let mut out = Split::default();
    let mut state = ScanState::Outside;
    let mut lexer = Lexer::default();

    let push_skip = |out: &mut Split<'a>, start: usize, end: usize| {
        let text = block[start..end].trim();
        if !text.is_empty() {
            out.skipped.push(text);
        }
    };

    for (i, &b) in bytes.iter().enumerate() {
        state = match state {
            ScanState::Outside => {
                if b.is_ascii_whitespace() || b == b',' {
                    ScanState::Outside
                } else if matches!(b, b'\'' | b'"' | b'`') {
                    ScanState::QuotedKey { start: i + 1, quote: b }
                } else if is_ident_start(b) {
                    ScanState::Key { start: i }
                } else {
                    lexer = Lexer::default();
                    if lexer.feed(b) == Token::Separator {
                        ScanState::Outside
                    } else {
                        ScanState::Skip { start: i }
                    }
                }
            }
            ScanState::Key { start } => {
                if is_ident(b) {
                    ScanState::Key { start }
                } else if b == b',' {
                    push_skip(&mut out, start, i);
                    ScanState::Outside
                } else if b == b':' {
                    lexer = Lexer::after_colon();
                    ScanState::Value {
                        key: (start, i),
                        start: i + 1,
                    }
                } else if b.is_ascii_whitespace() {
                    ScanState::AfterKey {
                        frag: start,
                        key: (start, i),
                    }
                } else {
                    skip_from(&mut lexer, b, start)
                }
            }
            ScanState::QuotedKey { start, quote } => {
                if b == quote {
                    ScanState::AfterKey {
                        frag: start - 1,
                        key: (start, i),
                    }
                } else {
                    ScanState::QuotedKey { start, quote }
                }
            }
            ScanState::AfterKey { frag, key } => {
                if b.is_ascii_whitespace() {
                    ScanState::AfterKey { frag, key }
                } else if b == b',' {
                    push_skip(&mut out, frag, i);
                    ScanState::Outside
                } else if b == b':' {
                    lexer = Lexer::after_colon();
                    ScanState::Value { key, start: i + 1 }
                } else {
                    skip_from(&mut lexer, b, frag)
                }
            }
            ScanState::Value { key, start } => {
                if lexer.feed(b) == Token::Separator {
                    out.declarations.push(Declaration {
                        key: &block[key.0..key.1],
                        value: block[start..i].trim(),
                    });
                    ScanState::Outside
                } else {
                    ScanState::Value { key, start }
                }
            }
            ScanState::Skip { start } => {
                if lexer.feed(b) == Token::Separator {
                    push_skip(&mut out, start, i);
                    ScanState::Outside
                } else {
                    ScanState::Skip { start }
                }
            }
        };
    }

    match state {
        ScanState::Outside => {}
        ScanState::Value { key, start } => out.declarations.push(Declaration {
            key: &block[key.0..key.1],
            value: block[start..].trim(),
        }),
        ScanState::Key { start } | ScanState::Skip { start } => push_skip(&mut out, start, bytes.len()),
        ScanState::QuotedKey { start, .. } => push_skip(&mut out, start - 1, bytes.len()),
        ScanState::AfterKey { frag, .. } => push_skip(&mut out, frag, bytes.len()),
    }

    out
}

/// Enter the skip state at `start`, feeding the byte that caused it
fn skip_from(lexer: &mut Lexer, b: u8, start: usize) -> ScanState {
    *lexer = Lexer::default();
    let _ = lexer.feed(b);
    ScanState::Skip { start }
}

/// Split the inside of an array literal into its elements
#[must_use]
pub fn split_items(inner: &str) -> Vec<&str> {
    let mut items = Vec::new();
    let mut lexer = Lexer::after_colon();
    let mut start = 0;
    for (i, &b) in inner.as_bytes().iter().enumerate() {
        if lexer.feed(b) == Token::Separator {
            items.push(inner[start..i].trim());
            start = i + 1;
        }
    }
    items.push(inner[start..].trim());
    items.retain(|s| !s.is_empty());
    items
}

/// Bounds of a bracketed block
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// Index of the opening bracket
    pub open: usize,
    /// Index of the matching closing bracket (or text length if unterminated)
    pub close: usize,
    /// Whether the closing bracket was found
    pub terminated: bool,
}

impl Block {
    /// Text between the brackets
    #[must_use]
    pub fn inner<'a>(&self, text: &'a str) -> &'a str {
        &text[(self.open + 1).min(self.close)..self.close]
    }

    /// Index just past the block
    #[inline]
    #[must_use]
    pub fn end(&self) -> usize {
        if self.terminated {
            self.close + 1
        } else {
            self.close
        }
    }
}

/// Find the block opened by the bracket at `open`
///
/// Returns `None` when `text[open]` is not an opening bracket. An unterminated
/// block runs to the end of the text.
#[must_use]
pub fn find_block(text: &str, open: usize) -> Option<Block> {
    let bytes = text.as_bytes();
    if !matches!(bytes.get(open), Some(b'{' | b'[' | b'(')) {
        return None;
    }
    let mut lexer = Lexer::after_colon();
    for (i, &b) in bytes.iter().enumerate().skip(open) {
        if lexer.feed(b) == Token::Close(0) {
            return Some(Block {
                open,
                close: i,
                terminated: true,
            });
        }
    }
    Some(Block {
        open,
        close: bytes.len(),
        terminated: false,
    })
}

/// Object literals not nested inside any bracket
#[must_use]
pub fn top_level_objects(text: &str) -> Vec<Block> {
    let mut blocks = Vec::new();
    let mut lexer = Lexer::default();
    for (i, &b) in text.as_bytes().iter().enumerate() {
        let token = lexer.feed(b);
        if b == b'{' && token == Token::Open && lexer.depth == 1 {
            if let Some(block) = find_block(text, i).filter(|b| b.terminated) {
                blocks.push(block);
            }
        }
    }
    blocks
}

/// Index of the first non-whitespace byte at or after `from`
#[must_use]
pub fn skip_ws(text: &str, from: usize) -> usize {
    text.as_bytes()
        .iter()
        .skip(from)
        .position(|b| !b.is_ascii_whitespace())
        .map_or(text.len(), |p| from + p)
}

/// Remove `//` and `/* */` comments outside string literals
///
/// Comment bytes become spaces (newlines kept) so offsets stay valid.
#[must_use]
pub fn strip_comments(source: &str) -> Cow<'_, str> {
    if !source.contains("//") && !source.contains("/*") {
        return Cow::Borrowed(source);
    }

    let bytes = source.as_bytes();
    let mut out = bytes.to_vec();
    let mut quote: Option<u8> = None;
    let mut regex = false;
    let mut class = false;
    let mut prev = 0u8;
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if quote.is_some() || regex {
            if b == b'\\' {
                i += 2;
                continue;
            }
            match quote {
                Some(q) if b == q => quote = None,
                Some(_) => {}
                None => match b {
                    b'[' => class = true,
                    b']' => class = false,
                    b'/' if !class => regex = false,
                    _ => {}
                },
            }
            prev = b;
            i += 1;
            continue;
        }
        match (b, bytes.get(i + 1)) {
            (b'\'' | b'"' | b'`', _) => quote = Some(b),
            (b'/', Some(b'/')) => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out[i] = b' ';
                    i += 1;
                }
                continue;
            }
            (b'/', Some(b'*')) => {
                let end = source[i + 2..].find("*/").map_or(bytes.len(), |p| i + 2 + p + 2);
                for slot in &mut out[i..end] {
                    if *slot != b'\n' {
                        *slot = b' ';
                    }
                }
                i = end;
                continue;
            }
            (b'/', _) if matches!(prev, 0 | b':' | b',' | b'[' | b'(' | b'=' | b'{') => regex = true,
            _ => {}
        }
        if !b.is_ascii_whitespace() {
            prev = b;
        }
        i += 1;
    }

    // Only ASCII bytes were replaced, so UTF-8 stays valid
    Cow::Owned(String::from_utf8_lossy(&out).into_owned())
}
