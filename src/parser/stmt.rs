//! Statement grammar and control-flow lowering.
//!
//! `if` stays structural; `while`, `do-while`, `for`, `switch`,
//! `break`, `continue`, `goto` and labels lower to a uniform shape of
//! labels, conditional jumps and unconditional jumps. Each loop keeps
//! a continue-target and a break-target on the parser; `switch` keeps a
//! case frame and lowers to an equality-dispatch chain over its
//! controlling expression.

use crate::ast::{BinaryOp, CompoundStmt, Expr, Jump, LabelStmt, Stmt};
use crate::diag::{Diag, ErrorKind, PResult};
use crate::eval::eval_long;
use crate::scope::ScopeKind;
use crate::stream::SourceLoc;
use crate::token::TokenKind;
use crate::tokens::TokenSource;
use crate::types::QualType;

use super::{Parser, SwitchFrame};

impl<'a, 'i, S: TokenSource> Parser<'a, 'i, S> {
    pub(crate) fn statement(&mut self) -> PResult<&'a Stmt<'a>> {
        use TokenKind::*;
        let tok = self.next();
        match tok.kind {
            Semicolon => Ok(self.ctx().alloc_stmt(Stmt::Empty)),
            LBrace => self.compound_stmt(None),
            KwIf => self.if_stmt(),
            KwSwitch => self.switch_stmt(),
            KwWhile => self.while_loop(),
            KwDo => self.do_while_loop(),
            KwFor => self.for_loop(tok.loc),
            KwGoto | KwContinue | KwBreak | KwReturn => {
                self.unget(tok);
                self.jump_stmt()
            }
            KwCase | KwDefault => {
                self.unget(tok);
                self.case_stmt()
            }
            Ident(sym) => {
                if self.peek().kind == Colon {
                    self.next();
                    self.label_stmt(sym, tok.loc)
                } else {
                    self.unget(tok);
                    self.expr_stmt()
                }
            }
            Eof => Err(Diag::new(
                ErrorKind::UnexpectedEof,
                tok.loc,
                "unexpected end of file, expecting a statement",
            )),
            _ => {
                self.unget(tok);
                self.expr_stmt()
            }
        }
    }

    fn expr_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        let expr = self.expr()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(self.ctx().alloc_stmt(Stmt::Expr(expr)))
    }

    fn jump_to(&self, label: &'a LabelStmt) -> &'a Stmt<'a> {
        self.ctx().alloc_stmt(Stmt::Jump(Jump::new(Some(label))))
    }

    fn label_marker(&self, label: &'a LabelStmt) -> &'a Stmt<'a> {
        self.ctx().alloc_stmt(Stmt::Label(label))
    }

    fn make_if(
        &self,
        cond: &'a Expr<'a>,
        then_branch: &'a Stmt<'a>,
        else_branch: Option<&'a Stmt<'a>>,
    ) -> PResult<&'a Stmt<'a>> {
        if !cond.ty.decay(self.ctx()).get().is_scalar() {
            return Err(Diag::new(
                ErrorKind::ScalarRequired,
                cond.loc,
                "the controlling expression must have scalar type",
            ));
        }
        Ok(self.ctx().alloc_stmt(Stmt::If {
            condition: cond,
            then_branch,
            else_branch,
        }))
    }

    /// The compound statement; `{` has been consumed. A function
    /// definition passes its type here so the parameters are bound in
    /// the body's scope before anything else.
    pub(crate) fn compound_stmt(&mut self, func: Option<QualType<'a>>) -> PResult<&'a Stmt<'a>> {
        let scope = self.scopes.enter(ScopeKind::Block);
        if let Some(f) = func {
            if let Some(ft) = f.get().as_func() {
                for &param in &ft.params {
                    self.scopes.insert(param);
                }
            }
        }
        let mut body: Vec<&'a Stmt<'a>> = Vec::new();
        loop {
            let p = self.peek();
            match p.kind {
                TokenKind::RBrace => {
                    self.next();
                    break;
                }
                TokenKind::Eof => {
                    return Err(Diag::new(
                        ErrorKind::UnexpectedEof,
                        p.loc,
                        "unexpected end of file, expecting '}'",
                    ))
                }
                _ if self.is_decl_start(&p) => {
                    for decl in self.declaration()? {
                        body.push(self.ctx().alloc_stmt(Stmt::Decl(decl)));
                    }
                }
                _ => body.push(self.statement()?),
            }
        }
        self.scopes.leave();
        Ok(self
            .ctx()
            .alloc_stmt(Stmt::Compound(CompoundStmt { scope, body })))
    }

    fn if_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        self.expect(TokenKind::LParen)?;
        let cond = self.expr()?;
        self.expect(TokenKind::RParen)?;
        let then_branch = self.statement()?;
        let else_branch = if self.test(TokenKind::KwElse) {
            Some(self.statement()?)
        } else {
            None
        };
        self.make_if(cond, then_branch, else_branch)
    }

    /// `while (c) s` lowers to:
    /// `cont: if (c) goto body; else goto brk; body: s; goto cont; brk:`
    fn while_loop(&mut self) -> PResult<&'a Stmt<'a>> {
        self.expect(TokenKind::LParen)?;
        let scope = self.scopes.enter(ScopeKind::Block);
        let saved = (self.brk, self.cont);
        let brk = self.new_label();
        let cont = self.new_label();
        self.brk = Some(brk);
        self.cont = Some(cont);

        let cond = self.expr()?;
        self.expect(TokenKind::RParen)?;
        let body = self.statement()?;
        let body_label = self.new_label();
        let test = self.make_if(cond, self.jump_to(body_label), Some(self.jump_to(brk)))?;

        let stmts = vec![
            self.label_marker(cont),
            test,
            self.label_marker(body_label),
            body,
            self.jump_to(cont),
            self.label_marker(brk),
        ];

        (self.brk, self.cont) = saved;
        self.scopes.leave();
        Ok(self
            .ctx()
            .alloc_stmt(Stmt::Compound(CompoundStmt { scope, body: stmts })))
    }

    /// `do s while (c);` lowers to:
    /// `top: s; cont: if (c) goto top; else goto brk; brk:`
    fn do_while_loop(&mut self) -> PResult<&'a Stmt<'a>> {
        let scope = self.scopes.enter(ScopeKind::Block);
        let saved = (self.brk, self.cont);
        let brk = self.new_label();
        let cont = self.new_label();
        let top = self.new_label();
        self.brk = Some(brk);
        self.cont = Some(cont);

        let body = self.statement()?;
        self.expect(TokenKind::KwWhile)?;
        self.expect(TokenKind::LParen)?;
        let cond = self.expr()?;
        self.expect(TokenKind::RParen)?;
        self.expect(TokenKind::Semicolon)?;
        let test = self.make_if(cond, self.jump_to(top), Some(self.jump_to(brk)))?;

        let stmts = vec![
            self.label_marker(top),
            body,
            self.label_marker(cont),
            test,
            self.label_marker(brk),
        ];

        (self.brk, self.cont) = saved;
        self.scopes.leave();
        Ok(self
            .ctx()
            .alloc_stmt(Stmt::Compound(CompoundStmt { scope, body: stmts })))
    }

    /// `for (init; c; step) s` lowers to:
    /// `init; test: if (c) goto body; else goto brk;
    ///  body: s; cont: step; goto test; brk:`
    fn for_loop(&mut self, kw_loc: SourceLoc) -> PResult<&'a Stmt<'a>> {
        self.expect(TokenKind::LParen)?;
        let scope = self.scopes.enter(ScopeKind::Block);
        let saved = (self.brk, self.cont);
        let brk = self.new_label();
        let cont = self.new_label();
        self.brk = Some(brk);
        self.cont = Some(cont);

        let mut stmts: Vec<&'a Stmt<'a>> = Vec::new();
        let p = self.peek();
        if self.is_decl_start(&p) {
            for decl in self.declaration()? {
                stmts.push(self.ctx().alloc_stmt(Stmt::Decl(decl)));
            }
        } else if !self.test(TokenKind::Semicolon) {
            let init = self.expr()?;
            self.expect(TokenKind::Semicolon)?;
            stmts.push(self.ctx().alloc_stmt(Stmt::Expr(init)));
        }

        let cond = if self.test(TokenKind::Semicolon) {
            self.sema.make_int(kw_loc, 1, self.ctx().int_qt())
        } else {
            let c = self.expr()?;
            self.expect(TokenKind::Semicolon)?;
            c
        };

        let step = if self.test(TokenKind::RParen) {
            self.ctx().alloc_stmt(Stmt::Empty)
        } else {
            let e = self.expr()?;
            self.expect(TokenKind::RParen)?;
            self.ctx().alloc_stmt(Stmt::Expr(e))
        };

        let body = self.statement()?;
        let test_label = self.new_label();
        let body_label = self.new_label();
        let test = self.make_if(cond, self.jump_to(body_label), Some(self.jump_to(brk)))?;

        stmts.extend([
            self.label_marker(test_label),
            test,
            self.label_marker(body_label),
            body,
            self.label_marker(cont),
            step,
            self.jump_to(test_label),
            self.label_marker(brk),
        ]);

        (self.brk, self.cont) = saved;
        self.scopes.leave();
        Ok(self
            .ctx()
            .alloc_stmt(Stmt::Compound(CompoundStmt { scope, body: stmts })))
    }

    /// `switch (c) s` lowers to a chain of `if (c == case_i) goto l_i`
    /// followed by a jump to the default (or past the end), then the
    /// body with its case labels materialized inline.
    fn switch_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        self.expect(TokenKind::LParen)?;
        let cond = self.expr()?;
        if !cond.ty.decay(self.ctx()).get().is_integer() {
            return Err(Diag::new(
                ErrorKind::IntegerRequired,
                cond.loc,
                "the switch expression must have integer type",
            ));
        }
        self.expect(TokenKind::RParen)?;

        let scope = self.scopes.enter(ScopeKind::Block);
        let brk = self.new_label();
        let saved_brk = self.brk;
        self.brk = Some(brk);
        let saved_frame = self.switch_frame.take();
        self.switch_frame = Some(SwitchFrame {
            cases: Vec::new(),
            default: None,
        });

        let body = self.statement()?;

        let frame = match self.switch_frame.take() {
            Some(frame) => frame,
            None => SwitchFrame {
                cases: Vec::new(),
                default: None,
            },
        };
        self.switch_frame = saved_frame;
        self.brk = saved_brk;

        let mut stmts: Vec<&'a Stmt<'a>> = Vec::new();
        for &(value, label) in &frame.cases {
            let case_const = self.sema.make_int(cond.loc, value, cond.ty);
            let matches = self
                .sema
                .make_binary(cond.loc, BinaryOp::Eq, cond, case_const)?;
            stmts.push(self.ctx().alloc_stmt(Stmt::If {
                condition: matches,
                then_branch: self.jump_to(label),
                else_branch: None,
            }));
        }
        stmts.push(self.jump_to(frame.default.unwrap_or(brk)));
        stmts.push(body);
        stmts.push(self.label_marker(brk));

        self.scopes.leave();
        Ok(self
            .ctx()
            .alloc_stmt(Stmt::Compound(CompoundStmt { scope, body: stmts })))
    }

    /// `case`/`default` labels; only valid under a switch. The labelled
    /// statement is emitted inline, marked with a fresh label recorded
    /// in the switch frame.
    fn case_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        let tok = self.next();
        let label = self.new_label();
        match tok.kind {
            TokenKind::KwCase => {
                let expr = self.conditional_expr()?;
                let value = eval_long(expr)?;
                self.expect(TokenKind::Colon)?;
                let Some(frame) = self.switch_frame.as_mut() else {
                    return Err(Diag::new(
                        ErrorKind::CaseOutsideSwitch,
                        tok.loc,
                        "'case' label outside of a switch",
                    ));
                };
                if frame.cases.iter().any(|&(v, _)| v == value) {
                    return Err(Diag::new(
                        ErrorKind::Redefinition,
                        expr.loc,
                        format!("duplicate case value {}", value),
                    ));
                }
                frame.cases.push((value, label));
            }
            _ => {
                self.expect(TokenKind::Colon)?;
                let Some(frame) = self.switch_frame.as_mut() else {
                    return Err(Diag::new(
                        ErrorKind::CaseOutsideSwitch,
                        tok.loc,
                        "'default' label outside of a switch",
                    ));
                };
                if frame.default.is_some() {
                    return Err(Diag::new(
                        ErrorKind::Redefinition,
                        tok.loc,
                        "multiple default labels in one switch",
                    ));
                }
                frame.default = Some(label);
            }
        }
        let inner = self.statement()?;
        let stmts = vec![self.label_marker(label), inner];
        Ok(self.ctx().alloc_stmt(Stmt::Compound(CompoundStmt {
            scope: self.scopes.current(),
            body: stmts,
        })))
    }

    /// A named label. Duplicates within one function are fatal; the
    /// name lives in the per-function label namespace, not the
    /// ordinary one.
    fn label_stmt(
        &mut self,
        sym: crate::intern::Symbol,
        loc: SourceLoc,
    ) -> PResult<&'a Stmt<'a>> {
        if self.labels.contains_key(&sym) {
            return Err(Diag::new(
                ErrorKind::Redefinition,
                loc,
                format!(
                    "redefinition of label '{}'",
                    self.sema.interner.resolve(sym)
                ),
            ));
        }
        let label = self.new_label();
        self.labels.insert(sym, label);
        let inner = self.statement()?;
        let stmts = vec![self.label_marker(label), inner];
        Ok(self.ctx().alloc_stmt(Stmt::Compound(CompoundStmt {
            scope: self.scopes.current(),
            body: stmts,
        })))
    }

    /// goto / continue / break / return, all ending in `;`.
    fn jump_stmt(&mut self) -> PResult<&'a Stmt<'a>> {
        let tok = self.next();
        let result: &'a Stmt<'a> = match tok.kind {
            TokenKind::KwGoto => {
                let ltok = self.next();
                let TokenKind::Ident(sym) = ltok.kind else {
                    return Err(self.unexpected(&ltok, "a label name"));
                };
                let target = self.labels.get(&sym).copied();
                let stmt = self.ctx().alloc_stmt(Stmt::Jump(Jump::new(target)));
                if let Stmt::Jump(jump) = stmt {
                    if jump.target().is_none() {
                        self.pending_gotos.push((sym, ltok.loc, jump));
                    }
                }
                stmt
            }
            TokenKind::KwContinue => {
                let Some(cont) = self.cont else {
                    return Err(Diag::new(
                        ErrorKind::ContinueOutsideLoop,
                        tok.loc,
                        "'continue' outside of a loop",
                    ));
                };
                self.jump_to(cont)
            }
            TokenKind::KwBreak => {
                let Some(brk) = self.brk else {
                    return Err(Diag::new(
                        ErrorKind::BreakOutsideLoop,
                        tok.loc,
                        "'break' outside of a loop or switch",
                    ));
                };
                self.jump_to(brk)
            }
            _ => {
                // return
                let Some(ret) = self.ret_ty else {
                    return Err(Diag::new(
                        ErrorKind::ReturnOutsideFunction,
                        tok.loc,
                        "'return' outside of a function",
                    ));
                };
                if self.peek().kind == TokenKind::Semicolon {
                    if !ret.get().is_void() {
                        self.diags.warn(Diag::new(
                            ErrorKind::ReturnValueInVoid,
                            tok.loc,
                            "return with no value in a function returning non-void",
                        ));
                    }
                    self.ctx().alloc_stmt(Stmt::Return(None))
                } else {
                    let value = self.expr()?;
                    if ret.get().is_void() {
                        return Err(Diag::new(
                            ErrorKind::ReturnValueInVoid,
                            value.loc,
                            "return with a value in a function returning void",
                        ));
                    }
                    let value = self.sema.convert(value, ret)?;
                    self.ctx().alloc_stmt(Stmt::Return(Some(value)))
                }
            }
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(result)
    }
}
