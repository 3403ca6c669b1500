//! The tokenizer.
//!
//! Greedy single-character dispatch over the preprocessing stream.
//! Punctuators are matched to their longest legal form; the digraphs
//! `<:`, `:>`, `<%`, `%>`, `%:` and `%:%:` fold into `[ ] { } # ##`
//! here. Literal *value* parsing of numbers is deferred until the token
//! is consumed as an expression; escape sequences in character and
//! string literals are decoded immediately.

use crate::diag::{Diag, ErrorKind, PResult};
use crate::intern::Interner;
use crate::stream::{is_ident_continue, is_ident_start, to_hex, to_oct, SourceFile, Stream, StreamState};
use crate::token::{keyword, Token, TokenKind};

pub struct Lexer<'s, 'i> {
    src: Stream<'s>,
    interner: &'i mut Interner,
}

impl<'s, 'i> Lexer<'s, 'i> {
    pub fn new(file: &'s SourceFile, interner: &'i mut Interner) -> Self {
        Lexer {
            src: Stream::new(file),
            interner,
        }
    }

    fn token(&self, start: StreamState, kind: TokenKind) -> Token {
        Token::new(self.src.loc_from(start), kind)
    }

    fn err(&self, kind: ErrorKind, msg: impl Into<String>) -> Diag {
        Diag::new(kind, self.src.here(), msg)
    }

    /// Lex the entire stream, ending with exactly one EOF token.
    pub fn lex_all(mut self) -> PResult<Vec<Token>> {
        let mut out = Vec::new();
        loop {
            let tok = self.next_token()?;
            let done = tok.is(TokenKind::Eof);
            out.push(tok);
            if done {
                return Ok(out);
            }
        }
    }

    /// The next raw token, including whitespace and newline tokens.
    pub fn next_token(&mut self) -> PResult<Token> {
        use TokenKind::*;

        let start = self.src.start_token();
        match self.src.skip_space() {
            0 => {}
            mask if mask & 2 != 0 => return Ok(self.token(start, Newline)),
            _ => return Ok(self.token(start, Space)),
        }

        let Some(ch) = self.src.get() else {
            return Ok(self.token(start, Eof));
        };

        match ch {
            '0'..='9' => self.number(start, ch),
            'L' => {
                if self.src.want('\'') {
                    self.char_lit(start, true)
                } else if self.src.want('"') {
                    self.string_lit(start, true)
                } else {
                    self.identifier(start, ch)
                }
            }
            '\'' => self.char_lit(start, false),
            '"' => self.string_lit(start, false),
            '\\' => {
                if self.src.want('u') {
                    let first = self.ucn(4)?;
                    self.identifier(start, first)
                } else if self.src.want('U') {
                    let first = self.ucn(8)?;
                    self.identifier(start, first)
                } else {
                    Err(self.err(ErrorKind::UnknownChar, "stray '\\' in program"))
                }
            }
            '=' => { let k = if self.src.want('=') { EqEq } else { Assign }; Ok(self.token(start, k)) }
            '+' => {
                if self.src.want('+') {
                    Ok(self.token(start, Inc))
                } else if self.src.want('=') {
                    Ok(self.token(start, PlusAssign))
                } else {
                    Ok(self.token(start, Plus))
                }
            }
            '-' => {
                if self.src.want('-') {
                    Ok(self.token(start, Dec))
                } else if self.src.want('=') {
                    Ok(self.token(start, MinusAssign))
                } else if self.src.want('>') {
                    Ok(self.token(start, Arrow))
                } else {
                    Ok(self.token(start, Minus))
                }
            }
            '*' => { let k = if self.src.want('=') { StarAssign } else { Star }; Ok(self.token(start, k)) }
            '/' => { let k = if self.src.want('=') { SlashAssign } else { Slash }; Ok(self.token(start, k)) }
            '%' => {
                // digraphs %> %: %:%:
                if self.src.want('>') {
                    Ok(self.token(start, RBrace))
                } else if self.src.want(':') {
                    if self.src.want('%') {
                        if self.src.want(':') {
                            return Ok(self.token(start, HashHash));
                        }
                        self.src.unget();
                    }
                    Ok(self.token(start, Hash))
                } else if self.src.want('=') {
                    Ok(self.token(start, PercentAssign))
                } else {
                    Ok(self.token(start, Percent))
                }
            }
            '&' => {
                if self.src.want('&') {
                    Ok(self.token(start, AmpAmp))
                } else if self.src.want('=') {
                    Ok(self.token(start, AmpAssign))
                } else {
                    Ok(self.token(start, Amp))
                }
            }
            '|' => {
                if self.src.want('|') {
                    Ok(self.token(start, PipePipe))
                } else if self.src.want('=') {
                    Ok(self.token(start, PipeAssign))
                } else {
                    Ok(self.token(start, Pipe))
                }
            }
            '^' => { let k = if self.src.want('=') { CaretAssign } else { Caret }; Ok(self.token(start, k)) }
            '~' => Ok(self.token(start, Tilde)),
            '!' => { let k = if self.src.want('=') { BangEq } else { Bang }; Ok(self.token(start, k)) }
            '<' => {
                // digraphs <: <%
                if self.src.want(':') {
                    Ok(self.token(start, LBracket))
                } else if self.src.want('%') {
                    Ok(self.token(start, LBrace))
                } else if self.src.want('<') {
                    let k = if self.src.want('=') { ShlAssign } else { Shl };
                    Ok(self.token(start, k))
                } else if self.src.want('=') {
                    Ok(self.token(start, Le))
                } else {
                    Ok(self.token(start, Lt))
                }
            }
            '>' => {
                if self.src.want('>') {
                    let k = if self.src.want('=') { ShrAssign } else { Shr };
                    Ok(self.token(start, k))
                } else if self.src.want('=') {
                    Ok(self.token(start, Ge))
                } else {
                    Ok(self.token(start, Gt))
                }
            }
            ':' => {
                // digraph :>
                if self.src.want('>') {
                    Ok(self.token(start, RBracket))
                } else {
                    Ok(self.token(start, Colon))
                }
            }
            '#' => { let k = if self.src.want('#') { HashHash } else { Hash }; Ok(self.token(start, k)) }
            '(' => Ok(self.token(start, LParen)),
            ')' => Ok(self.token(start, RParen)),
            '{' => Ok(self.token(start, LBrace)),
            '}' => Ok(self.token(start, RBrace)),
            '[' => Ok(self.token(start, LBracket)),
            ']' => Ok(self.token(start, RBracket)),
            ';' => Ok(self.token(start, Semicolon)),
            ',' => Ok(self.token(start, Comma)),
            '?' => Ok(self.token(start, Question)),
            '.' => {
                if self.src.peek().map_or(false, |c| c.is_ascii_digit()) {
                    return self.number(start, '.');
                }
                if self.src.want('.') {
                    if self.src.want('.') {
                        return Ok(self.token(start, Ellipsis));
                    }
                    self.src.unget();
                }
                Ok(self.token(start, Dot))
            }
            c if is_ident_start(c) => self.identifier(start, c),
            c => Err(Diag::new(
                ErrorKind::UnknownChar,
                self.src.loc_from(start),
                format!("unknown character '{}'", c),
            )),
        }
    }

    fn identifier(&mut self, start: StreamState, first: char) -> PResult<Token> {
        let mut text = String::new();
        text.push(first);
        while let Some(ch) = self.src.get() {
            if is_ident_continue(ch) {
                text.push(ch);
            } else if ch == '\\' {
                if self.src.want('u') {
                    text.push(self.ucn(4)?);
                } else if self.src.want('U') {
                    text.push(self.ucn(8)?);
                } else {
                    self.src.unget();
                    break;
                }
            } else {
                self.src.unget();
                break;
            }
        }
        let kind = match keyword(&text) {
            Some(kw) => kw,
            None => TokenKind::Ident(self.interner.intern(&text)),
        };
        Ok(self.token(start, kind))
    }

    /// A preprocessing number: a leading digit (or `.` digit) extended
    /// over identifier characters, dots, and signs following an
    /// exponent letter.
    fn number(&mut self, start: StreamState, first: char) -> PResult<Token> {
        let mut text = String::new();
        text.push(first);
        let mut last = first;
        loop {
            let Some(ch) = self.src.get() else { break };
            let exponent_sign = matches!(last, 'e' | 'E' | 'p' | 'P') && matches!(ch, '+' | '-');
            if ch.is_ascii_alphanumeric() || ch == '.' || ch == '_' || exponent_sign {
                text.push(ch);
                last = ch;
            } else {
                self.src.unget();
                break;
            }
        }
        let hex = text.starts_with("0x") || text.starts_with("0X");
        let floating = text.contains('.')
            || (hex && (text.contains('p') || text.contains('P')))
            || (!hex && text[1..].contains(['e', 'E']));
        let sym = self.interner.intern(&text);
        let kind = if floating {
            TokenKind::PpFloat(sym)
        } else {
            TokenKind::PpNumber(sym)
        };
        Ok(self.token(start, kind))
    }

    fn char_lit(&mut self, start: StreamState, wide: bool) -> PResult<Token> {
        // fold the bytes of the content MSB-first, as multi-character
        // constants do
        let mut value: u32 = 0;
        loop {
            match self.src.get() {
                None | Some('\n') => {
                    return Err(Diag::new(
                        ErrorKind::UnterminatedLiteral,
                        self.src.loc_from(start),
                        "unterminated character constant",
                    ))
                }
                Some('\'') => break,
                Some('\\') => {
                    let v = self.escape()?;
                    value = fold_char(value, v);
                }
                Some(c) => {
                    value = fold_char(value, c as u32);
                }
            }
        }
        Ok(self.token(start, TokenKind::CharLit { value, wide }))
    }

    fn string_lit(&mut self, start: StreamState, wide: bool) -> PResult<Token> {
        let mut text = String::new();
        loop {
            match self.src.get() {
                None | Some('\n') => {
                    return Err(Diag::new(
                        ErrorKind::UnterminatedLiteral,
                        self.src.loc_from(start),
                        "unterminated string literal",
                    ))
                }
                Some('"') => break,
                Some('\\') => {
                    let v = self.escape()?;
                    match char::from_u32(v) {
                        Some(c) => text.push(c),
                        None => {
                            return Err(self.err(
                                ErrorKind::UnknownEscape,
                                format!("escape value {:#x} is out of range", v),
                            ))
                        }
                    }
                }
                Some(c) => text.push(c),
            }
        }
        let sym = self.interner.intern(&text);
        Ok(self.token(start, TokenKind::Str { sym, wide }))
    }

    fn escape(&mut self) -> PResult<u32> {
        let Some(ch) = self.src.get() else {
            return Err(self.err(ErrorKind::UnterminatedLiteral, "unterminated literal"));
        };
        Ok(match ch {
            '\'' | '"' | '\\' | '?' => ch as u32,
            'a' => 0x07,
            'b' => 0x08,
            'f' => 0x0c,
            'n' => b'\n' as u32,
            'r' => b'\r' as u32,
            't' => b'\t' as u32,
            'v' => 0x0b,
            'x' => self.hex_escape()?,
            'u' => self.ucn(4)? as u32,
            'U' => self.ucn(8)? as u32,
            '0'..='7' => self.oct_escape(ch),
            c => {
                return Err(self.err(
                    ErrorKind::UnknownEscape,
                    format!("unknown escape sequence '\\{}'", c),
                ))
            }
        })
    }

    fn hex_escape(&mut self) -> PResult<u32> {
        let mut value: u32 = 0;
        let mut digits = 0;
        while let Some(d) = self.src.peek().and_then(to_hex) {
            self.src.get();
            value = (value << 4) | d;
            digits += 1;
            if digits == 8 {
                break;
            }
        }
        if digits == 0 {
            return Err(self.err(
                ErrorKind::UnknownEscape,
                "\\x used with no following hex digits",
            ));
        }
        Ok(value)
    }

    // the first octal digit has already been consumed
    fn oct_escape(&mut self, first: char) -> u32 {
        let mut value = to_oct(first).unwrap_or(0);
        for _ in 1..3 {
            match self.src.peek().and_then(to_oct) {
                Some(d) => {
                    self.src.get();
                    value = (value << 3) | d;
                }
                None => break,
            }
        }
        value
    }

    /// Universal character name: exactly `len` hex digits.
    fn ucn(&mut self, len: u32) -> PResult<char> {
        let mut value: u32 = 0;
        for _ in 0..len {
            match self.src.get().and_then(to_hex) {
                Some(d) => value = (value << 4) | d,
                None => {
                    return Err(self.err(
                        ErrorKind::InvalidUcn,
                        "universal character name requires hexadecimal digits",
                    ))
                }
            }
        }
        char::from_u32(value).ok_or_else(|| {
            self.err(
                ErrorKind::InvalidUcn,
                format!("invalid universal character name \\u{:x}", value),
            )
        })
    }
}

fn fold_char(acc: u32, v: u32) -> u32 {
    let mut acc = acc;
    let mut bytes = [0u8; 4];
    match char::from_u32(v) {
        Some(c) => {
            let s = c.encode_utf8(&mut bytes);
            for b in s.bytes() {
                acc = (acc << 8) | b as u32;
            }
        }
        None => acc = (acc << 8) | (v & 0xff),
    }
    acc
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SourceFile;

    fn lex(text: &str) -> (Vec<Token>, Interner) {
        let file = SourceFile::new("t.c", text);
        let mut interner = Interner::new();
        let toks = Lexer::new(&file, &mut interner).lex_all().unwrap();
        (toks, interner)
    }

    fn kinds(text: &str) -> Vec<TokenKind> {
        lex(text)
            .0
            .into_iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_space())
            .collect()
    }

    #[test]
    fn empty_source_is_one_eof_token() {
        let (toks, _) = lex("");
        assert_eq!(toks.len(), 1);
        assert_eq!(toks[0].kind, TokenKind::Eof);
    }

    #[test]
    fn longest_punctuator_wins() {
        use TokenKind::*;
        assert_eq!(kinds("<<="), vec![ShlAssign, Eof]);
        assert_eq!(kinds(">>= >> >"), vec![ShrAssign, Shr, Gt, Eof]);
        assert_eq!(kinds("->-"), vec![Arrow, Minus, Eof]);
        assert_eq!(kinds("... . .."), vec![Ellipsis, Dot, Dot, Dot, Eof]);
        assert_eq!(kinds("++ +="), vec![Inc, PlusAssign, Eof]);
    }

    #[test]
    fn digraphs_fold_to_brackets() {
        use TokenKind::*;
        assert_eq!(
            kinds("<: :> <% %> %: %:%:"),
            vec![LBracket, RBracket, LBrace, RBrace, Hash, HashHash, Eof]
        );
    }

    #[test]
    fn trigraph_line_folds_to_hash_define() {
        // the stream folds ??= to # and ??( ??) to [ ]
        let (toks, interner) = lex("??= define FOO ??(??)");
        let kinds: Vec<TokenKind> = toks
            .iter()
            .map(|t| t.kind)
            .filter(|k| !k.is_space())
            .collect();
        assert_eq!(kinds[0], TokenKind::Hash);
        match kinds[1] {
            TokenKind::Ident(s) => assert_eq!(interner.resolve(s), "define"),
            other => panic!("expected identifier, got {:?}", other),
        }
        match kinds[2] {
            TokenKind::Ident(s) => assert_eq!(interner.resolve(s), "FOO"),
            other => panic!("expected identifier, got {:?}", other),
        }
        assert_eq!(kinds[3], TokenKind::LBracket);
        assert_eq!(kinds[4], TokenKind::RBracket);
    }

    #[test]
    fn keywords_and_identifiers() {
        let (toks, interner) = lex("while whileme");
        let sig: Vec<&TokenKind> = toks.iter().map(|t| &t.kind).filter(|k| !k.is_space()).collect();
        assert_eq!(*sig[0], TokenKind::KwWhile);
        match sig[1] {
            TokenKind::Ident(s) => assert_eq!(interner.resolve(*s), "whileme"),
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn pp_number_classification() {
        let (toks, interner) = lex("42 0x1f 1.5 1e9 0x1p3 077 3f");
        let nums: Vec<(bool, String)> = toks
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::PpNumber(s) => Some((false, interner.resolve(s).to_string())),
                TokenKind::PpFloat(s) => Some((true, interner.resolve(s).to_string())),
                _ => None,
            })
            .collect();
        assert_eq!(
            nums,
            vec![
                (false, "42".to_string()),
                (false, "0x1f".to_string()),
                (true, "1.5".to_string()),
                (true, "1e9".to_string()),
                (true, "0x1p3".to_string()),
                (false, "077".to_string()),
                (false, "3f".to_string()),
            ]
        );
    }

    #[test]
    fn pp_number_swallows_exponent_signs() {
        let (toks, interner) = lex("1e+9 1.5e-3");
        let nums: Vec<String> = toks
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::PpFloat(s) => Some(interner.resolve(s).to_string()),
                _ => None,
            })
            .collect();
        assert_eq!(nums, vec!["1e+9".to_string(), "1.5e-3".to_string()]);
    }

    #[test]
    fn char_literal_escapes() {
        let (toks, _) = lex(r"'a' '\n' '\x41' '\101'");
        let vals: Vec<u32> = toks
            .iter()
            .filter_map(|t| match t.kind {
                TokenKind::CharLit { value, .. } => Some(value),
                _ => None,
            })
            .collect();
        assert_eq!(vals, vec![97, 10, 0x41, 0o101]);
    }

    #[test]
    fn multi_char_constant_folds_bytes() {
        let (toks, _) = lex("'ab'");
        match toks[0].kind {
            TokenKind::CharLit { value, .. } => assert_eq!(value, (b'a' as u32) << 8 | b'b' as u32),
            other => panic!("expected char constant, got {:?}", other),
        }
    }

    #[test]
    fn wide_prefix_is_recognized() {
        let (toks, _) = lex("L'a' L\"xy\" Lx");
        assert!(matches!(toks[0].kind, TokenKind::CharLit { wide: true, .. }));
        let rest: Vec<&TokenKind> = toks.iter().map(|t| &t.kind).filter(|k| !k.is_space()).collect();
        assert!(matches!(rest[1], TokenKind::Str { wide: true, .. }));
        assert!(matches!(rest[2], TokenKind::Ident(_)));
    }

    #[test]
    fn string_contents_are_decoded() {
        let (toks, interner) = lex(r#""he\tllo""#);
        match toks[0].kind {
            TokenKind::Str { sym, .. } => assert_eq!(interner.resolve(sym), "he\tllo"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn string_continues_across_spliced_line() {
        let (toks, interner) = lex("\"ab\\\ncd\"");
        match toks[0].kind {
            TokenKind::Str { sym, .. } => assert_eq!(interner.resolve(sym), "abcd"),
            other => panic!("expected string, got {:?}", other),
        }
    }

    #[test]
    fn unterminated_string_is_fatal() {
        let file = SourceFile::new("t.c", "\"abc\nx");
        let mut interner = Interner::new();
        let err = Lexer::new(&file, &mut interner).lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnterminatedLiteral);
    }

    #[test]
    fn unknown_escape_is_fatal() {
        let file = SourceFile::new("t.c", r"'\q'");
        let mut interner = Interner::new();
        let err = Lexer::new(&file, &mut interner).lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::UnknownEscape);
    }

    #[test]
    fn ucn_in_identifier() {
        let (toks, interner) = lex("a\\u0041b");
        match toks[0].kind {
            TokenKind::Ident(s) => assert_eq!(interner.resolve(s), "aAb"),
            other => panic!("expected identifier, got {:?}", other),
        }
    }

    #[test]
    fn ucn_with_bad_digits_is_fatal() {
        let file = SourceFile::new("t.c", r"a\u00zz");
        let mut interner = Interner::new();
        let err = Lexer::new(&file, &mut interner).lex_all().unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidUcn);
    }

    #[test]
    fn token_locations_cover_their_text() {
        let (toks, _) = lex("int  foo;");
        let int_tok = toks[0];
        assert_eq!(int_tok.loc.line, 1);
        assert_eq!(int_tok.loc.column, 1);
        assert_eq!(int_tok.loc.length, 3);
        let sig: Vec<&Token> = toks.iter().filter(|t| !t.kind.is_space()).collect();
        let foo_tok = sig[1];
        assert_eq!(foo_tok.loc.column, 6);
        assert_eq!(foo_tok.loc.length, 3);
    }

    #[test]
    fn comments_lex_as_whitespace() {
        use TokenKind::*;
        // three identifiers and eof, nothing else
        let ks = kinds("a /* x */ b // y\nc");
        assert_eq!(ks.len(), 4);
        assert!(ks[..3].iter().all(|k| matches!(k, Ident(_))));
        assert_eq!(ks[3], Eof);
    }
}
