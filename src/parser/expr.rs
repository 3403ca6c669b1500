//! Expression grammar.
//!
//! Binary operators use precedence climbing; assignment and the
//! conditional operator are right-associative and handled outside the
//! climb. The `( type-name )` ambiguity in casts and `sizeof` is
//! resolved by peeking for a specifier and pushing the `(` back on
//! mismatch.

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::diag::{Diag, ErrorKind, PResult};
use crate::token::{Token, TokenKind};
use crate::tokens::TokenSource;

use super::Parser;

/// Binding strength of the climbing binary operators; 0 for anything
/// that ends the climb.
fn precedence(kind: TokenKind) -> u32 {
    use TokenKind::*;
    match kind {
        Star | Slash | Percent => 10,
        Plus | Minus => 9,
        Shl | Shr => 8,
        Lt | Gt | Le | Ge => 7,
        EqEq | BangEq => 6,
        Amp => 5,
        Caret => 4,
        Pipe => 3,
        AmpAmp => 2,
        PipePipe => 1,
        _ => 0,
    }
}

fn binary_op(kind: TokenKind) -> BinaryOp {
    use TokenKind::*;
    match kind {
        Star => BinaryOp::Mul,
        Slash => BinaryOp::Div,
        Percent => BinaryOp::Rem,
        Plus => BinaryOp::Add,
        Minus => BinaryOp::Sub,
        Shl => BinaryOp::Shl,
        Shr => BinaryOp::Shr,
        Lt => BinaryOp::Lt,
        Gt => BinaryOp::Gt,
        Le => BinaryOp::Le,
        Ge => BinaryOp::Ge,
        EqEq => BinaryOp::Eq,
        BangEq => BinaryOp::Ne,
        Amp => BinaryOp::BitAnd,
        Caret => BinaryOp::BitXor,
        Pipe => BinaryOp::BitOr,
        AmpAmp => BinaryOp::LogicalAnd,
        _ => BinaryOp::LogicalOr,
    }
}

impl<'a, 'i, S: TokenSource> Parser<'a, 'i, S> {
    /// expression: assignment-expressions chained with the comma
    /// operator.
    pub(crate) fn expr(&mut self) -> PResult<&'a Expr<'a>> {
        let mut result = self.assignment_expr()?;
        while let Some(tok) = self.want(TokenKind::Comma) {
            let rhs = self.assignment_expr()?;
            result = self.sema.make_binary(tok.loc, BinaryOp::Comma, result, rhs)?;
        }
        Ok(result)
    }

    pub(crate) fn assignment_expr(&mut self) -> PResult<&'a Expr<'a>> {
        let result = self.binary_expr()?;
        let tok = self.next();
        if tok.kind == TokenKind::Question {
            let yes = self.expr()?;
            self.expect(TokenKind::Colon)?;
            let no = self.conditional_expr()?;
            self.sema.make_ternary(tok.loc, result, yes, no)
        } else if tok.kind.is_assignment() {
            let rhs = self.assignment_expr()?;
            self.sema.make_assignment(tok.loc, tok.kind, result, rhs)
        } else {
            self.unget(tok);
            Ok(result)
        }
    }

    pub(crate) fn conditional_expr(&mut self) -> PResult<&'a Expr<'a>> {
        let result = self.binary_expr()?;
        if let Some(tok) = self.want(TokenKind::Question) {
            let yes = self.expr()?;
            self.expect(TokenKind::Colon)?;
            let no = self.conditional_expr()?;
            return self.sema.make_ternary(tok.loc, result, yes, no);
        }
        Ok(result)
    }

    fn binary_expr(&mut self) -> PResult<&'a Expr<'a>> {
        let lhs = self.cast_expr()?;
        self.binary_expr_prec(lhs, 0)
    }

    /// Precedence climbing over the binary operators.
    fn binary_expr_prec(
        &mut self,
        mut lhs: &'a Expr<'a>,
        min_prec: u32,
    ) -> PResult<&'a Expr<'a>> {
        let mut lop = self.next();
        let mut lprec = precedence(lop.kind);
        while lprec != 0 && lprec >= min_prec {
            let mut rhs = self.cast_expr()?;
            loop {
                let rop = self.peek();
                let rprec = precedence(rop.kind);
                if rprec == 0 || rprec <= lprec {
                    break;
                }
                rhs = self.binary_expr_prec(rhs, rprec)?;
            }
            lhs = self
                .sema
                .make_binary(lop.loc, binary_op(lop.kind), lhs, rhs)?;
            lop = self.next();
            lprec = precedence(lop.kind);
        }
        self.unget(lop);
        Ok(lhs)
    }

    fn cast_expr(&mut self) -> PResult<&'a Expr<'a>> {
        if let Some(paren) = self.want(TokenKind::LParen) {
            let p = self.peek();
            if self.is_specifier_tok(&p) {
                let ty = self.type_name()?;
                self.expect(TokenKind::RParen)?;
                let operand = self.cast_expr()?;
                return self.sema.make_cast(paren.loc, ty, operand);
            }
            self.unget(paren);
        }
        self.unary_expr()
    }

    fn unary_expr(&mut self) -> PResult<&'a Expr<'a>> {
        use TokenKind::*;
        let tok = self.next();
        match tok.kind {
            Inc | Dec => {
                let op = if tok.kind == Inc {
                    UnaryOp::PreInc
                } else {
                    UnaryOp::PreDec
                };
                let operand = self.unary_expr()?;
                self.sema.make_unary(tok.loc, op, operand)
            }
            Amp | Star | Plus | Minus | Tilde | Bang => {
                let op = match tok.kind {
                    Amp => UnaryOp::AddrOf,
                    Star => UnaryOp::Deref,
                    Plus => UnaryOp::Arith,
                    Minus => UnaryOp::Negate,
                    Tilde => UnaryOp::BitNot,
                    _ => UnaryOp::LogicalNot,
                };
                let operand = self.cast_expr()?;
                self.sema.make_unary(tok.loc, op, operand)
            }
            KwSizeof => self.sizeof_expr(tok),
            _ => {
                self.unget(tok);
                self.postfix_expr()
            }
        }
    }

    /// `sizeof unary-expression` or `sizeof ( type-name )`.
    fn sizeof_expr(&mut self, kw: Token) -> PResult<&'a Expr<'a>> {
        if let Some(paren) = self.want(TokenKind::LParen) {
            let p = self.peek();
            if self.is_specifier_tok(&p) {
                let ty = self.type_name()?;
                self.expect(TokenKind::RParen)?;
                return self.sema.make_sizeof(kw.loc, ty);
            }
            self.unget(paren);
        }
        let operand = self.unary_expr()?;
        self.sema.make_sizeof(kw.loc, operand.ty)
    }

    fn postfix_expr(&mut self) -> PResult<&'a Expr<'a>> {
        use TokenKind::*;
        let mut result = self.primary_expr()?;
        loop {
            let tok = self.next();
            match tok.kind {
                LBracket => {
                    let index = self.expr()?;
                    self.expect(RBracket)?;
                    result = self.sema.make_subscript(tok.loc, result, index)?;
                }
                LParen => {
                    let args = self.argument_list()?;
                    result = self.sema.make_call(tok.loc, result, args)?;
                }
                Inc => result = self.sema.make_unary(tok.loc, UnaryOp::PostInc, result)?,
                Dec => result = self.sema.make_unary(tok.loc, UnaryOp::PostDec, result)?,
                Dot | Arrow => {
                    let mtok = self.next();
                    let TokenKind::Ident(sym) = mtok.kind else {
                        return Err(self.unexpected(&mtok, "a member name"));
                    };
                    result =
                        self.sema
                            .make_member(tok.loc, result, sym, mtok.loc, tok.kind == Arrow)?;
                }
                _ => {
                    self.unget(tok);
                    return Ok(result);
                }
            }
        }
    }

    /// argument-expression-list, consuming the closing `)`.
    fn argument_list(&mut self) -> PResult<Vec<&'a Expr<'a>>> {
        let mut args = Vec::new();
        loop {
            if self.test(TokenKind::RParen) {
                break;
            }
            args.push(self.assignment_expr()?);
            if !self.test(TokenKind::Comma) {
                self.expect(TokenKind::RParen)?;
                break;
            }
        }
        Ok(args)
    }

    fn primary_expr(&mut self) -> PResult<&'a Expr<'a>> {
        use TokenKind::*;
        let tok = self.next();
        match tok.kind {
            Ident(sym) => {
                let Some(decl) = self.scopes.find(sym, true) else {
                    return Err(Diag::new(
                        ErrorKind::Undeclared,
                        tok.loc,
                        format!(
                            "use of undeclared identifier '{}'",
                            self.sema.interner.resolve(sym)
                        ),
                    ));
                };
                if decl.is_typedef() {
                    return Err(self.unexpected(&tok, "a primary expression"));
                }
                Ok(self.sema.make_object(tok.loc, decl))
            }
            Str { sym, wide } => Ok(self.sema.make_string(tok.loc, sym, wide)),
            CharLit { value, .. } => Ok(self.sema.make_char(tok.loc, value)),
            PpNumber(sym) => {
                self.sema
                    .make_number(tok.loc, self.sema.interner.resolve(sym), false)
            }
            PpFloat(sym) => {
                self.sema
                    .make_number(tok.loc, self.sema.interner.resolve(sym), true)
            }
            LParen => {
                let inner = self.expr()?;
                self.expect(RParen)?;
                Ok(inner)
            }
            KwTrue => Ok(self.sema.make_bool(tok.loc, true)),
            KwFalse => Ok(self.sema.make_bool(tok.loc, false)),
            _ => Err(self.unexpected(&tok, "a primary expression")),
        }
    }
}
