//! The recursive-descent parser.
//!
//! Grammar productions live in `expr`, `decl` and `stmt`; this module
//! holds the parser state, the token helpers, and the translation-unit
//! entry point. The parser performs no type checking of its own: it
//! assembles operands and calls the constructors in [`crate::sema`],
//! which either produce a typed node or abort the parse with a fatal
//! diagnostic.

mod decl;
mod expr;
mod stmt;


use crate::arena_ctx::AstContext;
use crate::ast::{Decl, Jump, LabelStmt};
use crate::diag::{Diag, Diagnostics, ErrorKind, PResult};
use crate::intern::{Interner, Symbol};
use crate::scope::ScopeTree;
use crate::sema::Sema;
use crate::stream::SourceLoc;
use crate::token::{Token, TokenKind};
use crate::tokens::TokenSource;
use crate::types::{QualType, Storage, Type};
use std::collections::HashMap;

pub(crate) struct SwitchFrame<'a> {
    pub cases: Vec<(i64, &'a LabelStmt)>,
    pub default: Option<&'a LabelStmt>,
}

pub struct Parser<'a, 'i, S: TokenSource> {
    toks: S,
    pub(crate) sema: Sema<'a, 'i>,
    pub(crate) scopes: ScopeTree<'a>,
    pub diags: Diagnostics,
    // lowering state: innermost break/continue targets
    pub(crate) brk: Option<&'a LabelStmt>,
    pub(crate) cont: Option<&'a LabelStmt>,
    // the return type of the function being defined
    pub(crate) ret_ty: Option<QualType<'a>>,
    // per-function label namespace and unresolved forward gotos
    pub(crate) labels: HashMap<Symbol, &'a LabelStmt>,
    pub(crate) pending_gotos: Vec<(Symbol, SourceLoc, &'a Jump<'a>)>,
    pub(crate) switch_frame: Option<SwitchFrame<'a>>,
    label_seq: u32,
}

impl<'a, 'i, S: TokenSource> Parser<'a, 'i, S> {
    pub fn new(toks: S, interner: &'i Interner, ctx: AstContext<'a>) -> Self {
        Parser {
            toks,
            sema: Sema::new(ctx, interner),
            scopes: ScopeTree::new(),
            diags: Diagnostics::new(),
            brk: None,
            cont: None,
            ret_ty: None,
            labels: HashMap::new(),
            pending_gotos: Vec::new(),
            switch_frame: None,
            label_seq: 0,
        }
    }

    pub(crate) fn ctx(&self) -> AstContext<'a> {
        self.sema.ctx
    }

    // ---- token plumbing -------------------------------------------

    pub(crate) fn next(&mut self) -> Token {
        self.toks.get()
    }

    pub(crate) fn peek(&mut self) -> Token {
        self.toks.peek()
    }

    pub(crate) fn unget(&mut self, tok: Token) {
        self.toks.unget(tok);
    }

    pub(crate) fn want(&mut self, kind: TokenKind) -> Option<Token> {
        self.toks.want(kind)
    }

    pub(crate) fn test(&mut self, kind: TokenKind) -> bool {
        self.toks.test(kind)
    }

    pub(crate) fn expect(&mut self, kind: TokenKind) -> PResult<Token> {
        self.toks.expect(kind)
    }

    pub(crate) fn describe(&self, tok: &Token) -> String {
        match tok.kind {
            TokenKind::Ident(sym) => {
                format!("identifier '{}'", self.sema.interner.resolve(sym))
            }
            kind => kind.describe().to_string(),
        }
    }

    pub(crate) fn unexpected(&self, tok: &Token, wanted: &str) -> Diag {
        let kind = if tok.kind == TokenKind::Eof {
            ErrorKind::UnexpectedEof
        } else {
            ErrorKind::UnexpectedToken
        };
        Diag::new(
            kind,
            tok.loc,
            format!("expecting {}, but got {}", wanted, self.describe(tok)),
        )
    }

    pub(crate) fn new_label(&mut self) -> &'a LabelStmt {
        let id = self.label_seq;
        self.label_seq += 1;
        self.ctx().alloc_label(LabelStmt { id })
    }

    // ---- lookahead classification ---------------------------------

    /// Does this token start a type (specifier keyword, qualifier, or
    /// a typedef name in scope)?
    pub(crate) fn is_specifier_tok(&self, tok: &Token) -> bool {
        match tok.kind {
            k if k.is_type_specifier() || k.is_qualifier() => true,
            TokenKind::Ident(sym) => self
                .scopes
                .find(sym, true)
                .map_or(false, |d| d.is_typedef()),
            _ => false,
        }
    }

    /// Does this token start a declaration?
    pub(crate) fn is_decl_start(&self, tok: &Token) -> bool {
        tok.kind.is_storage_class() || self.is_specifier_tok(tok)
    }

    // ---- entry point ----------------------------------------------

    /// Parse a whole translation unit: a sequence of declarations and
    /// function definitions at file scope.
    pub fn translation_unit(&mut self) -> PResult<Vec<&'a Decl<'a>>> {
        let mut unit = Vec::new();
        loop {
            if self.test(TokenKind::Eof) {
                break;
            }
            if self.test(TokenKind::Semicolon) {
                continue;
            }

            let mut storage = Storage::empty();
            let base = self.decl_specifiers(&mut storage)?;

            if self.test(TokenKind::Semicolon) {
                // a bare struct/union/enum declaration declares its tag
                if matches!(base.get(), Type::Struct(_) | Type::Enum(_)) && storage.is_empty() {
                    continue;
                }
                let tok = self.peek();
                return Err(self.unexpected(&tok, "a declarator"));
            }

            let mut ty = self.fresh_base(base);
            let name = self.try_declarator(&mut ty)?;
            let Some(name_tok) = name else {
                let tok = self.peek();
                return Err(self.unexpected(&tok, "a declarator name"));
            };

            if ty.get().is_func() {
                if self.test(TokenKind::LBrace) {
                    unit.push(self.function_definition(name_tok, ty, storage)?);
                } else {
                    unit.push(self.declare_object(name_tok, ty, storage)?);
                    self.expect(TokenKind::Semicolon)?;
                }
            } else {
                unit.push(self.finish_init_declarator(name_tok, ty, storage)?);
                if self.test(TokenKind::Comma) {
                    unit.extend(self.init_declarators(storage, base)?);
                }
                self.expect(TokenKind::Semicolon)?;
            }
        }
        Ok(unit)
    }
}
