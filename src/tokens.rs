//! The token source: the seam between the lexical layer and the parser.
//!
//! `TokenSource` is the interface a preprocessor would implement — any
//! implementation that yields tokens in source order works. The
//! provided [`Tokens`] facade serves tokens out of a pre-lexed vector
//! with a LIFO pushback list; whitespace and newline tokens never reach
//! the parser.

use crate::diag::{Diag, ErrorKind, PResult};
use crate::token::{Token, TokenKind};

pub trait TokenSource {
    /// The next significant token. At the end of input this keeps
    /// returning the EOF token.
    fn get(&mut self) -> Token;

    /// Push a token back; the next `get` returns it. Pushbacks are
    /// LIFO.
    fn unget(&mut self, tok: Token);

    fn peek(&mut self) -> Token {
        let tok = self.get();
        self.unget(tok);
        tok
    }

    /// Consume the next token if it has the given kind.
    fn want(&mut self, kind: TokenKind) -> Option<Token> {
        let tok = self.get();
        if tok.kind == kind {
            Some(tok)
        } else {
            self.unget(tok);
            None
        }
    }

    fn test(&mut self, kind: TokenKind) -> bool {
        self.want(kind).is_some()
    }

    /// Consume the next token, requiring the given kind.
    fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        let tok = self.get();
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(Diag::new(
                ErrorKind::ExpectedToken,
                tok.loc,
                format!(
                    "expecting {}, but got {}",
                    kind.describe(),
                    tok.kind.describe()
                ),
            ))
        }
    }
}

pub struct Tokens {
    toks: Vec<Token>,
    pos: usize,
    pushback: Vec<Token>,
}

impl Tokens {
    /// Wrap a lexed token vector. Whitespace and newline tokens are
    /// discarded here; the vector is expected to end with EOF.
    pub fn new(toks: Vec<Token>) -> Self {
        let toks: Vec<Token> = toks.into_iter().filter(|t| !t.kind.is_space()).collect();
        Tokens {
            toks,
            pos: 0,
            pushback: Vec::new(),
        }
    }
}

impl TokenSource for Tokens {
    fn get(&mut self) -> Token {
        if let Some(tok) = self.pushback.pop() {
            return tok;
        }
        match self.toks.get(self.pos) {
            Some(&tok) => {
                self.pos += 1;
                tok
            }
            // lex_all always ends with an EOF token, so this only
            // triggers for hand-built vectors
            None => Token::new(Default::default(), TokenKind::Eof),
        }
    }

    fn unget(&mut self, tok: Token) {
        self.pushback.push(tok);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SourceLoc;

    fn tok(kind: TokenKind) -> Token {
        Token::new(SourceLoc::default(), kind)
    }

    fn source(kinds: &[TokenKind]) -> Tokens {
        let mut v: Vec<Token> = kinds.iter().map(|&k| tok(k)).collect();
        v.push(tok(TokenKind::Eof));
        Tokens::new(v)
    }

    #[test]
    fn get_yields_in_order_then_eof_forever() {
        let mut src = source(&[TokenKind::KwInt, TokenKind::Semicolon]);
        assert_eq!(src.get().kind, TokenKind::KwInt);
        assert_eq!(src.get().kind, TokenKind::Semicolon);
        assert_eq!(src.get().kind, TokenKind::Eof);
        assert_eq!(src.get().kind, TokenKind::Eof);
    }

    #[test]
    fn whitespace_never_surfaces() {
        let mut src = Tokens::new(vec![
            tok(TokenKind::Space),
            tok(TokenKind::KwInt),
            tok(TokenKind::Newline),
            tok(TokenKind::Eof),
        ]);
        assert_eq!(src.get().kind, TokenKind::KwInt);
        assert_eq!(src.get().kind, TokenKind::Eof);
    }

    #[test]
    fn unget_is_lifo() {
        let mut src = source(&[TokenKind::Plus]);
        let a = tok(TokenKind::Star);
        let b = tok(TokenKind::Slash);
        src.unget(a);
        src.unget(b);
        assert_eq!(src.get().kind, TokenKind::Slash);
        assert_eq!(src.get().kind, TokenKind::Star);
        assert_eq!(src.get().kind, TokenKind::Plus);
    }

    #[test]
    fn peek_does_not_consume() {
        let mut src = source(&[TokenKind::Comma]);
        assert_eq!(src.peek().kind, TokenKind::Comma);
        assert_eq!(src.peek().kind, TokenKind::Comma);
        assert_eq!(src.get().kind, TokenKind::Comma);
    }

    #[test]
    fn want_consumes_only_on_match() {
        let mut src = source(&[TokenKind::Colon, TokenKind::Semicolon]);
        assert!(src.want(TokenKind::Semicolon).is_none());
        assert!(src.want(TokenKind::Colon).is_some());
        assert!(src.test(TokenKind::Semicolon));
    }

    #[test]
    fn expect_reports_both_kinds() {
        let mut src = source(&[TokenKind::RParen]);
        let err = src.expect(TokenKind::Semicolon).unwrap_err();
        assert_eq!(err.kind, ErrorKind::ExpectedToken);
        assert!(err.msg.contains("';'"));
        assert!(err.msg.contains("')'"));
    }
}
