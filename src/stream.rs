//! The preprocessing character stream.
//!
//! Sits below the lexer: decodes UTF-8 from an in-memory source file,
//! folds trigraph sequences, deletes line continuations, strips a
//! leading byte-order-mark, and keeps `{line, column, line-begin}` in
//! sync with every read. `unget` is exact: each `get` records the full
//! positional state before the read, so a returned character replays
//! through the same folding on the next read.

use std::path::PathBuf;

/// A source file held whole in memory. Diagnostics slice source lines
/// straight out of `text`.
pub struct SourceFile {
    pub path: PathBuf,
    pub text: String,
}

impl SourceFile {
    pub fn new(path: impl Into<PathBuf>, text: impl Into<String>) -> Self {
        SourceFile {
            path: path.into(),
            text: text.into(),
        }
    }

    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let text = std::fs::read_to_string(&path)?;
        Ok(SourceFile { path, text })
    }

    /// The literal text of the line starting at byte offset `line_begin`,
    /// without its terminating newline.
    pub fn line_text(&self, line_begin: usize) -> &str {
        let rest = &self.text[line_begin.min(self.text.len())..];
        match rest.find('\n') {
            Some(end) => &rest[..end],
            None => rest,
        }
    }
}

/// Position of a token or node in its source file. Line and column are
/// 1-based; `length` is the number of bytes the item consumed;
/// `line_begin` is the byte offset of the start of the line, used by the
/// diagnostic renderer.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub struct SourceLoc {
    pub line: u32,
    pub column: u32,
    pub length: u32,
    pub line_begin: usize,
}

/// Full positional state of the stream; saved before every read so that
/// `unget` can restore it exactly.
#[derive(Clone, Copy, Debug)]
pub struct StreamState {
    pos: usize,
    line: u32,
    column: u32,
    line_begin: usize,
}

pub struct Stream<'s> {
    text: &'s str,
    pos: usize,
    line: u32,
    column: u32,
    line_begin: usize,
    history: Vec<StreamState>,
}

fn trigraph(c: char) -> Option<char> {
    Some(match c {
        '=' => '#',
        '(' => '[',
        ')' => ']',
        '/' => '\\',
        '\'' => '^',
        '<' => '{',
        '>' => '}',
        '!' => '|',
        '-' => '~',
        _ => return None,
    })
}

impl<'s> Stream<'s> {
    pub fn new(file: &'s SourceFile) -> Self {
        let mut pos = 0;
        if file.text.starts_with('\u{feff}') {
            pos = '\u{feff}'.len_utf8();
        }
        Stream {
            text: &file.text,
            pos,
            line: 1,
            column: 1,
            line_begin: pos,
            history: Vec::new(),
        }
    }

    pub fn state(&self) -> StreamState {
        StreamState {
            pos: self.pos,
            line: self.line,
            column: self.column,
            line_begin: self.line_begin,
        }
    }

    fn restore(&mut self, s: StreamState) {
        self.pos = s.pos;
        self.line = s.line;
        self.column = s.column;
        self.line_begin = s.line_begin;
    }

    /// Byte offset into the file.
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Drop the unget history and return the state a new token starts
    /// from.
    pub fn start_token(&mut self) -> StreamState {
        self.history.clear();
        self.state()
    }

    /// Location spanning from `start` to the current position.
    pub fn loc_from(&self, start: StreamState) -> SourceLoc {
        SourceLoc {
            line: start.line,
            column: start.column,
            length: (self.pos - start.pos) as u32,
            line_begin: start.line_begin,
        }
    }

    /// Location of the current position with zero length.
    pub fn here(&self) -> SourceLoc {
        SourceLoc {
            line: self.line,
            column: self.column,
            length: 1,
            line_begin: self.line_begin,
        }
    }

    fn read_raw(&mut self) -> Option<char> {
        let ch = self.text[self.pos..].chars().next()?;
        self.pos += ch.len_utf8();
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
            self.line_begin = self.pos;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn peek_raw(&self) -> Option<char> {
        self.text[self.pos..].chars().next()
    }

    fn read_folded(&mut self) -> Option<char> {
        loop {
            let ch = self.read_raw()?;
            match ch {
                '\\' if self.peek_raw() == Some('\n') => {
                    self.read_raw();
                }
                '?' if self.peek_raw() == Some('?') => {
                    let mark = self.state();
                    self.read_raw();
                    match self.read_raw().and_then(trigraph) {
                        // a folded `??/` still participates in line splicing
                        Some('\\') if self.peek_raw() == Some('\n') => {
                            self.read_raw();
                        }
                        Some(folded) => return Some(folded),
                        None => {
                            self.restore(mark);
                            return Some('?');
                        }
                    }
                }
                _ => return Some(ch),
            }
        }
    }

    pub fn get(&mut self) -> Option<char> {
        let before = self.state();
        let ch = self.read_folded()?;
        self.history.push(before);
        Some(ch)
    }

    pub fn peek(&mut self) -> Option<char> {
        let before = self.state();
        let ch = self.read_folded();
        self.restore(before);
        ch
    }

    pub fn want(&mut self, ch: char) -> bool {
        if self.peek() == Some(ch) {
            self.get();
            true
        } else {
            false
        }
    }

    pub fn unget(&mut self) {
        if let Some(state) = self.history.pop() {
            self.restore(state);
        }
    }

    fn ignore_until(&mut self, ch: char) {
        while let Some(c) = self.get() {
            if c == ch {
                break;
            }
        }
    }

    fn skip_block_comment(&mut self) {
        // the opening "/*" has already been consumed
        loop {
            self.ignore_until('*');
            if self.want('/') || self.peek().is_none() {
                return;
            }
        }
    }

    /// Consume whitespace, newlines, and `//` / `/* */` comments.
    /// Bit 0 of the result: any non-newline whitespace or comment seen;
    /// bit 1: any newline seen.
    pub fn skip_space(&mut self) -> u8 {
        let mut ret = 0;
        loop {
            match self.get() {
                Some('/') => {
                    if self.want('*') {
                        self.skip_block_comment();
                        ret |= 1;
                    } else if self.want('/') {
                        self.ignore_until('\n');
                        ret |= 2;
                    } else {
                        self.unget();
                        return ret;
                    }
                }
                Some(' ') | Some('\t') | Some('\r') | Some('\x0b') | Some('\x0c') => ret |= 1,
                Some('\n') => ret |= 2,
                Some(_) => {
                    self.unget();
                    return ret;
                }
                None => return ret,
            }
        }
    }
}

/// Hexadecimal digit value, if any.
pub fn to_hex(c: char) -> Option<u32> {
    c.to_digit(16)
}

/// Octal digit value, if any.
pub fn to_oct(c: char) -> Option<u32> {
    c.to_digit(8)
}

/// First character of an identifier: ASCII letter, `_`, `$`, or any
/// non-ASCII codepoint.
pub fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_' || c == '$' || !c.is_ascii()
}

/// Subsequent character of an identifier.
pub fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_' || c == '$' || !c.is_ascii()
}
