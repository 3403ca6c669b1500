//! Construction-time semantic checking.
//!
//! The parser never type-checks inline: it assembles operands and calls
//! a `make_*` constructor here, which enforces the C99 constraints and
//! produces a typed node or a fatal diagnostic. Implicit conversions
//! are materialized as cast nodes, and pointer arithmetic is scaled by
//! the element size at construction time, so the tree carries no hidden
//! semantics.

use crate::arena_ctx::AstContext;
use crate::ast::{BinaryOp, Decl, DeclKind, Expr, ExprKind, UnaryOp, Value};
use crate::diag::{Diag, ErrorKind, PResult};
use crate::intern::{Interner, Symbol};
use crate::stream::SourceLoc;
use crate::token::TokenKind;
use crate::types::{Qual, QualType, Spec};

#[derive(Clone, Copy)]
pub struct Sema<'a, 'i> {
    pub ctx: AstContext<'a>,
    pub interner: &'i Interner,
}

impl<'a, 'i> Sema<'a, 'i> {
    pub fn new(ctx: AstContext<'a>, interner: &'i Interner) -> Self {
        Sema { ctx, interner }
    }

    fn rvalue(&self, loc: SourceLoc, ty: QualType<'a>, kind: ExprKind<'a>) -> &'a Expr<'a> {
        self.ctx.alloc_expr(Expr {
            loc,
            ty,
            lvalue: false,
            kind,
        })
    }

    fn lvalue(&self, loc: SourceLoc, ty: QualType<'a>, kind: ExprKind<'a>) -> &'a Expr<'a> {
        self.ctx.alloc_expr(Expr {
            loc,
            ty,
            lvalue: true,
            kind,
        })
    }

    fn type_name(&self, qt: QualType<'a>) -> String {
        qt.to_string(self.interner)
    }

    // ---- constants ------------------------------------------------

    pub fn make_int(&self, loc: SourceLoc, value: i64, ty: QualType<'a>) -> &'a Expr<'a> {
        self.rvalue(loc, ty, ExprKind::Constant(Value::Int(value)))
    }

    /// A synthesized zero of the given type, used for missing trailing
    /// initializer elements.
    pub fn zero_literal(&self, loc: SourceLoc, ty: QualType<'a>) -> &'a Expr<'a> {
        self.rvalue(loc, ty, ExprKind::Constant(Value::Int(0)))
    }

    pub fn make_bool(&self, loc: SourceLoc, is_true: bool) -> &'a Expr<'a> {
        self.make_int(loc, is_true as i64, self.ctx.bool_qt())
    }

    /// Character constants have type `int`; `wchar_t` is an alias for
    /// `int` as well, so wide constants do too.
    pub fn make_char(&self, loc: SourceLoc, value: u32) -> &'a Expr<'a> {
        self.make_int(loc, value as i64, self.ctx.int_qt())
    }

    pub fn make_string(&self, loc: SourceLoc, sym: Symbol, wide: bool) -> &'a Expr<'a> {
        let elem = if wide {
            self.ctx.int_qt()
        } else {
            self.ctx.char_qt()
        };
        let ty = QualType::unqual(self.ctx.pointer_to(elem.with_qual(Qual::CONST)));
        self.rvalue(loc, ty, ExprKind::Constant(Value::Str(sym)))
    }

    /// Decode a preprocessing number into a constant: base detection,
    /// suffix parsing, and value conversion happen here, when the token
    /// is consumed as an expression.
    pub fn make_number(&self, loc: SourceLoc, text: &str, floating: bool) -> PResult<&'a Expr<'a>> {
        if floating {
            self.make_float_constant(loc, text)
        } else {
            self.make_int_constant(loc, text)
        }
    }

    fn make_int_constant(&self, loc: SourceLoc, text: &str) -> PResult<&'a Expr<'a>> {
        let malformed =
            |msg: String| -> Diag { Diag::new(ErrorKind::MalformedNumber, loc, msg) };

        let body = text.trim_end_matches(['u', 'U', 'l', 'L']);
        let suffix = &text[body.len()..];
        let mut unsigned = false;
        let mut longs = 0;
        for c in suffix.chars() {
            match c {
                'u' | 'U' if !unsigned => unsigned = true,
                'l' | 'L' if longs < 2 => longs += 1,
                _ => return Err(malformed(format!("invalid integer suffix '{}'", suffix))),
            }
        }
        let mut spec = match longs {
            0 => Spec::INT,
            1 => Spec::LONG,
            _ => Spec::LLONG,
        };
        if unsigned {
            spec |= Spec::UNSIGNED;
        }

        let (digits, radix) = if body.starts_with("0x") || body.starts_with("0X") {
            (&body[2..], 16)
        } else if body.starts_with("0b") || body.starts_with("0B") {
            (&body[2..], 2)
        } else if body.len() > 1 && body.starts_with('0') {
            (&body[1..], 8)
        } else {
            (body, 10)
        };
        if digits.is_empty() {
            return Err(malformed(format!("malformed number '{}'", text)));
        }
        match u64::from_str_radix(digits, radix) {
            Ok(v) => Ok(self.make_int(loc, v as i64, self.ctx.number_qt(spec))),
            Err(_) if digits.chars().all(|c| c.to_digit(radix).is_some()) => Err(malformed(
                format!("number '{}' is too large for its type", text),
            )),
            Err(_) => Err(malformed(format!("malformed number '{}'", text))),
        }
    }

    fn make_float_constant(&self, loc: SourceLoc, text: &str) -> PResult<&'a Expr<'a>> {
        let body = text.trim_end_matches(['f', 'F', 'l', 'L']);
        let suffix = &text[body.len()..];
        let spec = match suffix {
            "" => Spec::DOUBLE,
            "f" | "F" => Spec::FLOAT,
            "l" | "L" => Spec::LONG.union(Spec::DOUBLE),
            _ => {
                return Err(Diag::new(
                    ErrorKind::MalformedNumber,
                    loc,
                    format!("invalid floating suffix '{}'", suffix),
                ))
            }
        };
        let value = if body.starts_with("0x") || body.starts_with("0X") {
            parse_hex_float(body)
        } else {
            body.parse::<f64>().ok()
        };
        match value {
            Some(v) => Ok(self.rvalue(
                loc,
                self.ctx.number_qt(spec),
                ExprKind::Constant(Value::Float(v)),
            )),
            None => Err(Diag::new(
                ErrorKind::MalformedNumber,
                loc,
                format!("malformed floating constant '{}'", text),
            )),
        }
    }

    /// C99 6.5.3.4: `sizeof` rejects function and incomplete types;
    /// the result is an `unsigned long` constant.
    pub fn make_sizeof(&self, loc: SourceLoc, ty: QualType<'a>) -> PResult<&'a Expr<'a>> {
        if ty.get().is_func() || !ty.get().is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                loc,
                format!(
                    "cannot take the size of function or incomplete type '{}'",
                    self.type_name(ty)
                ),
            ));
        }
        Ok(self.make_int(loc, ty.get().size() as i64, self.ctx.ulong_qt()))
    }

    // ---- references -----------------------------------------------

    /// A use of a declared name. Objects are lvalues; function
    /// designators are lvalues of function type; enumeration constants
    /// are `int` rvalues.
    pub fn make_object(&self, loc: SourceLoc, decl: &'a Decl<'a>) -> &'a Expr<'a> {
        match decl.kind {
            DeclKind::EnumConst(_) => self.rvalue(loc, decl.ty(), ExprKind::Object(decl)),
            _ => self.lvalue(loc, decl.ty(), ExprKind::Object(decl)),
        }
    }

    // ---- conversions ----------------------------------------------

    fn cast_to(&self, expr: &'a Expr<'a>, ty: QualType<'a>) -> &'a Expr<'a> {
        if std::ptr::eq(expr.ty.get(), ty.get()) {
            return expr;
        }
        self.rvalue(expr.loc, ty, ExprKind::Cast(expr))
    }

    /// Integer-promote an arithmetic expression, materializing the
    /// conversion when the type changes.
    fn promote(&self, expr: &'a Expr<'a>) -> &'a Expr<'a> {
        match expr.ty.get().number_spec() {
            Some(spec) => self.cast_to(expr, QualType::unqual(self.ctx.promote(spec))),
            None => expr,
        }
    }

    /// The default argument promotions: `float` to `double`, integers
    /// promoted; applied to variadic and unprototyped arguments. No
    /// parameter conversion will look at these arguments, so the
    /// no-void-values rule is enforced here: an argument whose type is
    /// `void` (a cast to void, a call returning void) has no value to
    /// pass.
    pub fn default_promote(&self, expr: &'a Expr<'a>) -> PResult<&'a Expr<'a>> {
        if expr.ty.get().is_void() {
            return Err(Diag::new(
                ErrorKind::ScalarRequired,
                expr.loc,
                "a void expression cannot be used as an argument",
            ));
        }
        Ok(match expr.ty.decay(self.ctx).get().number_spec() {
            Some(s) if s == Spec::FLOAT => self.cast_to(expr, self.ctx.double_qt()),
            Some(_) => self.promote(expr),
            None => expr,
        })
    }

    /// Implicit conversion as in simple assignment (C99 6.5.16.1);
    /// also used for initializers, arguments and `return`.
    pub fn convert(&self, expr: &'a Expr<'a>, dest: QualType<'a>) -> PResult<&'a Expr<'a>> {
        let src = expr.ty.decay(self.ctx);
        let dt = dest.get();
        if dt.is_arith() {
            if !src.get().is_arith() && !(dt.is_bool() && src.get().is_pointer()) {
                return Err(Diag::new(
                    ErrorKind::ArithmeticRequired,
                    expr.loc,
                    format!(
                        "cannot convert '{}' to arithmetic type '{}'",
                        self.type_name(expr.ty),
                        self.type_name(dest)
                    ),
                ));
            }
        } else if dt.is_pointer() {
            if src.get().is_pointer() {
                let lp = dt.as_pointer().unwrap_or(dest);
                let rp = src.get().as_pointer().unwrap_or(src);
                // the left pointee must carry every qualifier of the right
                if !lp.qual().contains(rp.qual()) {
                    return Err(Diag::new(
                        ErrorKind::QualifierLoss,
                        expr.loc,
                        format!(
                            "conversion from '{}' to '{}' discards qualifiers",
                            self.type_name(expr.ty),
                            self.type_name(dest)
                        ),
                    ));
                }
                if !lp.get().is_compatible(rp.get())
                    && !lp.get().is_void()
                    && !rp.get().is_void()
                {
                    return Err(Diag::new(
                        ErrorKind::BadOperand,
                        expr.loc,
                        format!(
                            "incompatible pointer types: '{}' and '{}'",
                            self.type_name(expr.ty),
                            self.type_name(dest)
                        ),
                    ));
                }
            } else if !expr.is_null_constant() {
                return Err(Diag::new(
                    ErrorKind::PointerRequired,
                    expr.loc,
                    format!(
                        "cannot convert '{}' to pointer type '{}'",
                        self.type_name(expr.ty),
                        self.type_name(dest)
                    ),
                ));
            }
        } else if !dt.is_compatible(src.get()) {
            return Err(Diag::new(
                ErrorKind::BadOperand,
                expr.loc,
                format!(
                    "cannot convert '{}' to '{}'",
                    self.type_name(expr.ty),
                    self.type_name(dest)
                ),
            ));
        }
        if dt.is_compatible(src.get()) {
            Ok(expr)
        } else {
            Ok(self.cast_to(expr, dest.unqualified()))
        }
    }

    // ---- operators ------------------------------------------------

    fn check_modifiable(&self, loc: SourceLoc, expr: &'a Expr<'a>) -> PResult<()> {
        if !expr.lvalue || expr.ty.get().is_array() || expr.ty.get().is_func() {
            return Err(Diag::new(
                ErrorKind::LvalueRequired,
                loc,
                "expression is not a modifiable lvalue",
            ));
        }
        if expr.ty.is_const() {
            return Err(Diag::new(
                ErrorKind::AssignToConst,
                loc,
                "cannot assign to a const-qualified expression",
            ));
        }
        if !expr.ty.get().is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                loc,
                "expression has incomplete type",
            ));
        }
        Ok(())
    }

    pub fn make_unary(
        &self,
        loc: SourceLoc,
        op: UnaryOp,
        operand: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        use UnaryOp::*;
        match op {
            Arith | Negate => {
                let Some(spec) = operand.ty.get().number_spec() else {
                    return Err(Diag::new(
                        ErrorKind::ArithmeticRequired,
                        loc,
                        format!(
                            "unary operand has non-arithmetic type '{}'",
                            self.type_name(operand.ty)
                        ),
                    ));
                };
                let ty = QualType::unqual(self.ctx.promote(spec));
                let operand = self.cast_to(operand, ty);
                Ok(self.rvalue(loc, ty, ExprKind::Unary(op, operand)))
            }
            BitNot => {
                if !operand.ty.get().is_integer() {
                    return Err(Diag::new(
                        ErrorKind::IntegerRequired,
                        loc,
                        format!(
                            "operand of '~' has non-integer type '{}'",
                            self.type_name(operand.ty)
                        ),
                    ));
                }
                let operand = self.promote(operand);
                Ok(self.rvalue(loc, operand.ty, ExprKind::Unary(op, operand)))
            }
            LogicalNot => {
                if !operand.ty.decay(self.ctx).get().is_scalar() {
                    return Err(Diag::new(
                        ErrorKind::ScalarRequired,
                        loc,
                        "operand of '!' must have scalar type",
                    ));
                }
                Ok(self.rvalue(loc, self.ctx.int_qt(), ExprKind::Unary(op, operand)))
            }
            Deref => {
                let decayed = operand.ty.decay(self.ctx);
                let Some(pointee) = decayed.get().as_pointer() else {
                    return Err(Diag::new(
                        ErrorKind::PointerRequired,
                        loc,
                        format!(
                            "indirection requires a pointer operand, got '{}'",
                            self.type_name(operand.ty)
                        ),
                    ));
                };
                Ok(self.lvalue(loc, pointee, ExprKind::Unary(op, operand)))
            }
            AddrOf => {
                if !operand.lvalue && !operand.ty.get().is_func() {
                    return Err(Diag::new(
                        ErrorKind::LvalueRequired,
                        loc,
                        "cannot take the address of an rvalue",
                    ));
                }
                if let ExprKind::Object(decl) = operand.kind {
                    if decl.is_register() {
                        return Err(Diag::new(
                            ErrorKind::BadOperand,
                            loc,
                            "cannot take the address of a register variable",
                        ));
                    }
                }
                let ty = QualType::unqual(self.ctx.pointer_to(operand.ty));
                Ok(self.rvalue(loc, ty, ExprKind::Unary(op, operand)))
            }
            PreInc | PreDec | PostInc | PostDec => {
                self.check_modifiable(loc, operand)?;
                if !operand.ty.get().is_scalar() {
                    return Err(Diag::new(
                        ErrorKind::ScalarRequired,
                        loc,
                        "increment/decrement requires a scalar operand",
                    ));
                }
                Ok(self.rvalue(loc, operand.ty, ExprKind::Unary(op, operand)))
            }
        }
    }

    /// C99 6.5.4: the cast target is void or scalar, the operand
    /// scalar. A cast to void discards its operand's value: the node
    /// itself is always buildable, and every context that would consume
    /// the value — an operator, an implicit conversion, default
    /// argument promotion — rejects the void type. A bare `(void)x;`
    /// statement is therefore legal while any use of the cast's value
    /// draws a diagnostic.
    pub fn make_cast(
        &self,
        loc: SourceLoc,
        dest: QualType<'a>,
        operand: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        if dest.get().is_void() {
            return Ok(self.rvalue(loc, dest, ExprKind::Cast(operand)));
        }
        if !dest.get().is_scalar() {
            return Err(Diag::new(
                ErrorKind::ScalarRequired,
                loc,
                format!("cast target '{}' is not a scalar type", self.type_name(dest)),
            ));
        }
        if !operand.ty.decay(self.ctx).get().is_scalar() {
            return Err(Diag::new(
                ErrorKind::ScalarRequired,
                loc,
                format!(
                    "cast operand has non-scalar type '{}'",
                    self.type_name(operand.ty)
                ),
            ));
        }
        Ok(self.rvalue(loc, dest, ExprKind::Cast(operand)))
    }

    fn arith_pair(
        &self,
        loc: SourceLoc,
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
        integer_only: bool,
    ) -> PResult<(&'a Expr<'a>, &'a Expr<'a>, QualType<'a>)> {
        let (ls, rs) = match (lhs.ty.get().number_spec(), rhs.ty.get().number_spec()) {
            (Some(l), Some(r)) => (l, r),
            _ => {
                return Err(Diag::new(
                    if integer_only {
                        ErrorKind::IntegerRequired
                    } else {
                        ErrorKind::ArithmeticRequired
                    },
                    loc,
                    format!(
                        "invalid operands to binary {:?}: '{}' and '{}'",
                        op,
                        self.type_name(lhs.ty),
                        self.type_name(rhs.ty)
                    ),
                ))
            }
        };
        if integer_only
            && (!lhs.ty.get().is_integer() || !rhs.ty.get().is_integer())
        {
            return Err(Diag::new(
                ErrorKind::IntegerRequired,
                loc,
                format!("operands of {:?} must have integer type", op),
            ));
        }
        let ty = QualType::unqual(self.ctx.usual_arith(ls, rs));
        Ok((self.cast_to(lhs, ty), self.cast_to(rhs, ty), ty))
    }

    /// Multiply an index by the pointee size; pointer arithmetic keeps
    /// its scaling explicit in the tree.
    fn scale_index(
        &self,
        loc: SourceLoc,
        pointer: QualType<'a>,
        index: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        let pointee = pointer.get().as_pointer().unwrap_or(pointer);
        if !pointee.get().is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                loc,
                format!(
                    "arithmetic on pointer to incomplete type '{}'",
                    self.type_name(pointee)
                ),
            ));
        }
        let index = self.promote(index);
        let size = self.make_int(loc, pointee.get().size() as i64, index.ty);
        Ok(self.rvalue(
            loc,
            index.ty,
            ExprKind::Binary(BinaryOp::Mul, index, size),
        ))
    }

    pub fn make_binary(
        &self,
        loc: SourceLoc,
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        use BinaryOp::*;
        let lt = lhs.ty.decay(self.ctx);
        let rt = rhs.ty.decay(self.ctx);
        let bad = |msg: String| Diag::new(ErrorKind::BadOperand, loc, msg);

        match op {
            Mul | Div => {
                let (l, r, ty) = self.arith_pair(loc, op, lhs, rhs, false)?;
                Ok(self.rvalue(loc, ty, ExprKind::Binary(op, l, r)))
            }
            Rem => {
                let (l, r, ty) = self.arith_pair(loc, op, lhs, rhs, true)?;
                Ok(self.rvalue(loc, ty, ExprKind::Binary(op, l, r)))
            }
            Add => {
                if lt.get().is_arith() && rt.get().is_arith() {
                    let (l, r, ty) = self.arith_pair(loc, op, lhs, rhs, false)?;
                    return Ok(self.rvalue(loc, ty, ExprKind::Binary(op, l, r)));
                }
                if lt.get().is_pointer() && rt.get().is_integer() {
                    let offset = self.scale_index(loc, lt, rhs)?;
                    return Ok(self.rvalue(loc, lt, ExprKind::Binary(op, lhs, offset)));
                }
                if lt.get().is_integer() && rt.get().is_pointer() {
                    let offset = self.scale_index(loc, rt, lhs)?;
                    return Ok(self.rvalue(loc, rt, ExprKind::Binary(op, offset, rhs)));
                }
                Err(bad(format!(
                    "invalid operands to binary +: '{}' and '{}'",
                    self.type_name(lhs.ty),
                    self.type_name(rhs.ty)
                )))
            }
            Sub => {
                if lt.get().is_arith() && rt.get().is_arith() {
                    let (l, r, ty) = self.arith_pair(loc, op, lhs, rhs, false)?;
                    return Ok(self.rvalue(loc, ty, ExprKind::Binary(op, l, r)));
                }
                if lt.get().is_pointer() && rt.get().is_integer() {
                    let offset = self.scale_index(loc, lt, rhs)?;
                    return Ok(self.rvalue(loc, lt, ExprKind::Binary(op, lhs, offset)));
                }
                if lt.get().is_pointer() && rt.get().is_pointer() {
                    let lp = lt.get().as_pointer().unwrap_or(lt);
                    let rp = rt.get().as_pointer().unwrap_or(rt);
                    if !lp.get().is_compatible(rp.get()) {
                        return Err(bad(format!(
                            "cannot subtract incompatible pointers '{}' and '{}'",
                            self.type_name(lhs.ty),
                            self.type_name(rhs.ty)
                        )));
                    }
                    return Ok(self.rvalue(loc, self.ctx.long_qt(), ExprKind::Binary(op, lhs, rhs)));
                }
                Err(bad(format!(
                    "invalid operands to binary -: '{}' and '{}'",
                    self.type_name(lhs.ty),
                    self.type_name(rhs.ty)
                )))
            }
            Shl | Shr => {
                if !lt.get().is_integer() || !rt.get().is_integer() {
                    return Err(Diag::new(
                        ErrorKind::IntegerRequired,
                        loc,
                        "shift operands must have integer type",
                    ));
                }
                let l = self.promote(lhs);
                let r = self.promote(rhs);
                // the result has the type of the promoted left operand
                Ok(self.rvalue(loc, l.ty, ExprKind::Binary(op, l, r)))
            }
            Lt | Gt | Le | Ge | Eq | Ne => self.make_comparison(loc, op, lhs, rhs),
            BitAnd | BitXor | BitOr => {
                let (l, r, ty) = self.arith_pair(loc, op, lhs, rhs, true)?;
                Ok(self.rvalue(loc, ty, ExprKind::Binary(op, l, r)))
            }
            LogicalAnd | LogicalOr => {
                if !lt.get().is_scalar() || !rt.get().is_scalar() {
                    return Err(Diag::new(
                        ErrorKind::ScalarRequired,
                        loc,
                        "logical operands must have scalar type",
                    ));
                }
                Ok(self.rvalue(loc, self.ctx.int_qt(), ExprKind::Binary(op, lhs, rhs)))
            }
            Comma => Ok(self.rvalue(loc, rhs.ty, ExprKind::Binary(op, lhs, rhs))),
            // checked in make_assignment
            Assign => Ok(self.rvalue(loc, lhs.ty, ExprKind::Binary(op, lhs, rhs))),
        }
    }

    fn make_comparison(
        &self,
        loc: SourceLoc,
        op: BinaryOp,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        let lt = lhs.ty.decay(self.ctx);
        let rt = rhs.ty.decay(self.ctx);
        let int = self.ctx.int_qt();
        if lt.get().is_arith() && rt.get().is_arith() {
            let (l, r, _) = self.arith_pair(loc, op, lhs, rhs, false)?;
            return Ok(self.rvalue(loc, int, ExprKind::Binary(op, l, r)));
        }
        if lt.get().is_pointer() && rt.get().is_pointer() {
            let lp = lt.get().as_pointer().unwrap_or(lt);
            let rp = rt.get().as_pointer().unwrap_or(rt);
            let equality = matches!(op, BinaryOp::Eq | BinaryOp::Ne);
            let voidish = equality && (lp.get().is_void() || rp.get().is_void());
            if !lp.get().is_compatible(rp.get()) && !voidish {
                return Err(Diag::new(
                    ErrorKind::BadOperand,
                    loc,
                    format!(
                        "comparison of incompatible pointers '{}' and '{}'",
                        self.type_name(lhs.ty),
                        self.type_name(rhs.ty)
                    ),
                ));
            }
            return Ok(self.rvalue(loc, int, ExprKind::Binary(op, lhs, rhs)));
        }
        // pointer against the null constant
        if (lt.get().is_pointer() && rhs.is_null_constant())
            || (rt.get().is_pointer() && lhs.is_null_constant())
        {
            return Ok(self.rvalue(loc, int, ExprKind::Binary(op, lhs, rhs)));
        }
        Err(Diag::new(
            ErrorKind::BadOperand,
            loc,
            format!(
                "invalid comparison between '{}' and '{}'",
                self.type_name(lhs.ty),
                self.type_name(rhs.ty)
            ),
        ))
    }

    /// `a[b]` is `*((a)+(b))` after decay.
    pub fn make_subscript(
        &self,
        loc: SourceLoc,
        base: &'a Expr<'a>,
        index: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        let sum = self.make_binary(loc, BinaryOp::Add, base, index)?;
        self.make_unary(loc, UnaryOp::Deref, sum)
    }

    /// Assignment and compound assignment. The compound forms decode
    /// their base operator from the token and desugar into
    /// `lhs = lhs op rhs`.
    pub fn make_assignment(
        &self,
        loc: SourceLoc,
        tok: TokenKind,
        lhs: &'a Expr<'a>,
        rhs: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        self.check_modifiable(loc, lhs)?;
        let rhs = match compound_base_op(tok) {
            Some(op) => self.make_binary(loc, op, lhs, rhs)?,
            None => rhs,
        };
        let rhs = self.convert(rhs, lhs.ty)?;
        Ok(self.rvalue(loc, lhs.ty, ExprKind::Binary(BinaryOp::Assign, lhs, rhs)))
    }

    /// C99 6.5.15: scalar condition; arithmetic branches unify by the
    /// usual conversion, pointer branches by compatibility or the null
    /// constant; struct branches must be the same type; both may be
    /// void.
    pub fn make_ternary(
        &self,
        loc: SourceLoc,
        cond: &'a Expr<'a>,
        yes: &'a Expr<'a>,
        no: &'a Expr<'a>,
    ) -> PResult<&'a Expr<'a>> {
        if !cond.ty.decay(self.ctx).get().is_scalar() {
            return Err(Diag::new(
                ErrorKind::ScalarRequired,
                loc,
                "the condition of '?:' must have scalar type",
            ));
        }
        let yt = yes.ty.decay(self.ctx);
        let nt = no.ty.decay(self.ctx);
        let (yes, no, ty) = if yt.get().is_arith() && nt.get().is_arith() {
            let (y, n, ty) = self.arith_pair(loc, BinaryOp::Comma, yes, no, false)?;
            (y, n, ty)
        } else if yt.get().is_void() && nt.get().is_void() {
            (yes, no, self.ctx.void_qt())
        } else if yt.get().is_pointer() && nt.get().is_pointer() {
            let yp = yt.get().as_pointer().unwrap_or(yt);
            let np = nt.get().as_pointer().unwrap_or(nt);
            if !yp.get().is_compatible(np.get()) && !yp.get().is_void() && !np.get().is_void() {
                return Err(Diag::new(
                    ErrorKind::BadOperand,
                    loc,
                    "incompatible pointer branches in '?:'",
                ));
            }
            (yes, no, yt)
        } else if yt.get().is_pointer() && no.is_null_constant() {
            (yes, no, yt)
        } else if nt.get().is_pointer() && yes.is_null_constant() {
            (yes, no, nt)
        } else if yt.get().is_struct() && yt.get().is_compatible(nt.get()) {
            (yes, no, yes.ty)
        } else {
            return Err(Diag::new(
                ErrorKind::BadOperand,
                loc,
                format!(
                    "incompatible branch types '{}' and '{}' in '?:'",
                    self.type_name(yes.ty),
                    self.type_name(no.ty)
                ),
            ));
        };
        Ok(self.rvalue(
            loc,
            ty,
            ExprKind::Ternary {
                cond,
                then_branch: yes,
                else_branch: no,
            },
        ))
    }

    /// C99 6.5.2.2: the callee (after decay) must be a pointer to
    /// function; arguments convert to parameter types; variadic extras
    /// get the default promotions.
    pub fn make_call(
        &self,
        loc: SourceLoc,
        callee: &'a Expr<'a>,
        args: Vec<&'a Expr<'a>>,
    ) -> PResult<&'a Expr<'a>> {
        let ct = callee.ty.decay(self.ctx);
        let func = ct
            .get()
            .as_pointer()
            .and_then(|p| p.get().as_func())
            .ok_or_else(|| {
                Diag::new(
                    ErrorKind::NotCallable,
                    loc,
                    format!(
                        "called object has type '{}', which is not a function",
                        self.type_name(callee.ty)
                    ),
                )
            })?;

        let mut converted = Vec::with_capacity(args.len());
        if func.unspecified {
            for a in args {
                converted.push(self.default_promote(a)?);
            }
        } else {
            if args.len() < func.params.len() {
                return Err(Diag::new(
                    ErrorKind::TooFewArguments,
                    loc,
                    format!(
                        "too few arguments: expected {}, got {}",
                        func.params.len(),
                        args.len()
                    ),
                ));
            }
            if args.len() > func.params.len() && !func.variadic {
                return Err(Diag::new(
                    ErrorKind::TooManyArguments,
                    loc,
                    format!(
                        "too many arguments: expected {}, got {}",
                        func.params.len(),
                        args.len()
                    ),
                ));
            }
            for (i, a) in args.into_iter().enumerate() {
                if let Some(param) = func.params.get(i) {
                    converted.push(self.convert(a, param.ty())?);
                } else {
                    converted.push(self.default_promote(a)?);
                }
            }
        }
        Ok(self.rvalue(
            loc,
            func.ret,
            ExprKind::Call {
                callee,
                args: converted,
            },
        ))
    }

    /// C99 6.5.2.3: `.` requires a struct/union, `->` a pointer to one;
    /// the member's type picks up the base's qualifiers.
    pub fn make_member(
        &self,
        loc: SourceLoc,
        base: &'a Expr<'a>,
        member: Symbol,
        member_loc: SourceLoc,
        arrow: bool,
    ) -> PResult<&'a Expr<'a>> {
        let base_ty = if arrow {
            let decayed = base.ty.decay(self.ctx);
            decayed.get().as_pointer().ok_or_else(|| {
                Diag::new(
                    ErrorKind::PointerRequired,
                    loc,
                    format!(
                        "'->' requires a pointer to struct or union, got '{}'",
                        self.type_name(base.ty)
                    ),
                )
            })?
        } else {
            base.ty
        };
        let Some(st) = base_ty.get().as_struct() else {
            return Err(Diag::new(
                ErrorKind::BadOperand,
                loc,
                format!(
                    "member access requires a struct or union, got '{}'",
                    self.type_name(base_ty)
                ),
            ));
        };
        if !st.is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                loc,
                format!(
                    "member access into incomplete type '{}'",
                    self.type_name(base_ty)
                ),
            ));
        }
        let Some(decl) = st.find_member(member) else {
            return Err(Diag::new(
                ErrorKind::NotAMember,
                member_loc,
                format!(
                    "'{}' is not a member of '{}'",
                    self.interner.resolve(member),
                    self.type_name(base_ty)
                ),
            ));
        };
        let mut ty = decl.ty();
        ty.add_qual(base_ty.qual());
        let lvalue = arrow || base.lvalue;
        let expr = self.ctx.alloc_expr(Expr {
            loc,
            ty,
            lvalue,
            kind: ExprKind::Member {
                base,
                member: decl,
                arrow,
            },
        });
        Ok(expr)
    }
}

/// The base operator of a compound assignment token, `None` for plain
/// `=`.
fn compound_base_op(tok: TokenKind) -> Option<BinaryOp> {
    use TokenKind::*;
    Some(match tok {
        PlusAssign => BinaryOp::Add,
        MinusAssign => BinaryOp::Sub,
        StarAssign => BinaryOp::Mul,
        SlashAssign => BinaryOp::Div,
        PercentAssign => BinaryOp::Rem,
        AmpAssign => BinaryOp::BitAnd,
        PipeAssign => BinaryOp::BitOr,
        CaretAssign => BinaryOp::BitXor,
        ShlAssign => BinaryOp::Shl,
        ShrAssign => BinaryOp::Shr,
        _ => return None,
    })
}

/// Hexadecimal floating constant: mantissa in hex, binary exponent
/// after `p`.
fn parse_hex_float(text: &str) -> Option<f64> {
    let body = &text[2..];
    let (mantissa, exponent) = body.split_once(['p', 'P'])?;
    let exponent: i32 = exponent.parse().ok()?;
    let (int_part, frac_part) = match mantissa.split_once('.') {
        Some((i, f)) => (i, f),
        None => (mantissa, ""),
    };
    if int_part.is_empty() && frac_part.is_empty() {
        return None;
    }
    let mut value = 0f64;
    for c in int_part.chars() {
        value = value * 16.0 + c.to_digit(16)? as f64;
    }
    let mut scale = 1.0 / 16.0;
    for c in frac_part.chars() {
        value += c.to_digit(16)? as f64 * scale;
        scale /= 16.0;
    }
    Some(value * 2f64.powi(exponent))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::{LabelStmt, Stmt};
    use crate::types::{Spec, Storage, SIZE_INT, SIZE_POINTER};

    fn with_sema<R>(f: impl for<'a> FnOnce(Sema<'a, '_>) -> R) -> R {
        let types = Arena::new();
        let exprs = Arena::new();
        let stmts: Arena<Stmt> = Arena::new();
        let decls = Arena::new();
        let labels: Arena<LabelStmt> = Arena::new();
        let interner = Interner::new();
        let ctx = AstContext::new(&types, &exprs, &stmts, &decls, &labels);
        f(Sema::new(ctx, &interner))
    }

    fn loc() -> SourceLoc {
        SourceLoc::default()
    }

    fn int_var<'a>(sema: &Sema<'a, '_>) -> &'a Expr<'a> {
        let decl = sema.ctx.alloc_decl(Decl::new(
            None,
            loc(),
            sema.ctx.int_qt(),
            Storage::empty(),
            DeclKind::Object,
        ));
        sema.make_object(loc(), decl)
    }

    fn ptr_var<'a>(sema: &Sema<'a, '_>) -> &'a Expr<'a> {
        let ty = QualType::unqual(sema.ctx.pointer_to(sema.ctx.int_qt()));
        let decl = sema.ctx.alloc_decl(Decl::new(
            None,
            loc(),
            ty,
            Storage::empty(),
            DeclKind::Object,
        ));
        sema.make_object(loc(), decl)
    }

    #[test]
    fn number_decoding_handles_bases_and_suffixes() {
        with_sema(|s| {
            assert_eq!(s.make_number(loc(), "42", false).unwrap().int_value(), Some(42));
            assert_eq!(
                s.make_number(loc(), "0x1f", false).unwrap().int_value(),
                Some(31)
            );
            assert_eq!(
                s.make_number(loc(), "077", false).unwrap().int_value(),
                Some(63)
            );
            assert_eq!(
                s.make_number(loc(), "0b101", false).unwrap().int_value(),
                Some(5)
            );
            let ul = s.make_number(loc(), "7ul", false).unwrap();
            assert_eq!(
                ul.ty.get().number_spec(),
                Some(Spec::UNSIGNED.union(Spec::LONG))
            );
            let ll = s.make_number(loc(), "7ll", false).unwrap();
            assert_eq!(ll.ty.get().number_spec(), Some(Spec::LLONG));
        });
    }

    #[test]
    fn float_decoding_handles_suffix_and_hex() {
        with_sema(|s| {
            let d = s.make_number(loc(), "1.5", true).unwrap();
            assert_eq!(d.ty.get().number_spec(), Some(Spec::DOUBLE));
            let f = s.make_number(loc(), "1.5f", true).unwrap();
            assert_eq!(f.ty.get().number_spec(), Some(Spec::FLOAT));
            let h = s.make_number(loc(), "0x1.8p1", true).unwrap();
            match h.kind {
                ExprKind::Constant(Value::Float(v)) => assert_eq!(v, 3.0),
                _ => panic!("expected float constant"),
            }
        });
    }

    #[test]
    fn malformed_number_is_fatal() {
        with_sema(|s| {
            let err = s.make_number(loc(), "1x2", false).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedNumber);
            let err = s.make_number(loc(), "3q", false).unwrap_err();
            assert_eq!(err.kind, ErrorKind::MalformedNumber);
        });
    }

    #[test]
    fn deref_requires_a_pointer() {
        with_sema(|s| {
            let n = s.make_int(loc(), 1, s.ctx.int_qt());
            let err = s.make_unary(loc(), UnaryOp::Deref, n).unwrap_err();
            assert_eq!(err.kind, ErrorKind::PointerRequired);
            let p = ptr_var(&s);
            let e = s.make_unary(loc(), UnaryOp::Deref, p).unwrap();
            assert!(e.lvalue);
            assert!(e.ty.get().is_integer());
        });
    }

    #[test]
    fn address_of_requires_an_lvalue() {
        with_sema(|s| {
            let n = s.make_int(loc(), 1, s.ctx.int_qt());
            let err = s.make_unary(loc(), UnaryOp::AddrOf, n).unwrap_err();
            assert_eq!(err.kind, ErrorKind::LvalueRequired);
            let v = int_var(&s);
            let e = s.make_unary(loc(), UnaryOp::AddrOf, v).unwrap();
            assert!(e.ty.get().is_pointer());
            assert!(!e.lvalue);
        });
    }

    #[test]
    fn address_of_register_variable_is_rejected() {
        with_sema(|s| {
            let decl = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                s.ctx.int_qt(),
                Storage::REGISTER,
                DeclKind::Object,
            ));
            let v = s.make_object(loc(), decl);
            let err = s.make_unary(loc(), UnaryOp::AddrOf, v).unwrap_err();
            assert_eq!(err.kind, ErrorKind::BadOperand);
        });
    }

    #[test]
    fn negation_promotes_small_integers() {
        with_sema(|s| {
            let c = s.make_int(loc(), 7, s.ctx.char_qt());
            let e = s.make_unary(loc(), UnaryOp::Negate, c).unwrap();
            assert_eq!(e.ty.get().number_spec(), Some(Spec::INT));
        });
    }

    #[test]
    fn logical_not_yields_int() {
        with_sema(|s| {
            let p = ptr_var(&s);
            let e = s.make_unary(loc(), UnaryOp::LogicalNot, p).unwrap();
            assert_eq!(e.ty.get().number_spec(), Some(Spec::INT));
        });
    }

    #[test]
    fn increment_requires_modifiable_lvalue() {
        with_sema(|s| {
            let n = s.make_int(loc(), 3, s.ctx.int_qt());
            let err = s.make_unary(loc(), UnaryOp::PreInc, n).unwrap_err();
            assert_eq!(err.kind, ErrorKind::LvalueRequired);
        });
    }

    #[test]
    fn pointer_plus_integer_scales_by_element_size() {
        with_sema(|s| {
            let p = ptr_var(&s);
            let i = s.make_int(loc(), 2, s.ctx.int_qt());
            let e = s.make_binary(loc(), BinaryOp::Add, p, i).unwrap();
            assert!(e.ty.get().is_pointer());
            // the right operand is index * sizeof(int)
            match e.kind {
                ExprKind::Binary(BinaryOp::Add, _, off) => match off.kind {
                    ExprKind::Binary(BinaryOp::Mul, _, size) => {
                        assert_eq!(size.int_value(), Some(SIZE_INT as i64));
                    }
                    _ => panic!("offset is not scaled"),
                },
                _ => panic!("expected binary add"),
            }
        });
    }

    #[test]
    fn pointer_difference_is_long() {
        with_sema(|s| {
            let a = ptr_var(&s);
            let b = ptr_var(&s);
            let e = s.make_binary(loc(), BinaryOp::Sub, a, b).unwrap();
            assert_eq!(e.ty.get().number_spec(), Some(Spec::LONG));
        });
    }

    #[test]
    fn shift_keeps_promoted_left_type() {
        with_sema(|s| {
            let l = s.make_int(loc(), 1, s.ctx.ulong_qt());
            let r = s.make_int(loc(), 2, s.ctx.int_qt());
            let e = s.make_binary(loc(), BinaryOp::Shl, l, r).unwrap();
            assert_eq!(
                e.ty.get().number_spec(),
                Some(Spec::UNSIGNED.union(Spec::LONG))
            );
        });
    }

    #[test]
    fn comparison_against_null_constant() {
        with_sema(|s| {
            let p = ptr_var(&s);
            let z = s.make_int(loc(), 0, s.ctx.int_qt());
            let e = s.make_binary(loc(), BinaryOp::Eq, p, z).unwrap();
            assert_eq!(e.ty.get().number_spec(), Some(Spec::INT));
        });
    }

    #[test]
    fn comparison_of_pointer_and_nonzero_integer_fails() {
        with_sema(|s| {
            let p = ptr_var(&s);
            let one = s.make_int(loc(), 1, s.ctx.int_qt());
            assert!(s.make_binary(loc(), BinaryOp::Eq, p, one).is_err());
        });
    }

    #[test]
    fn subscript_lowers_to_deref_of_sum() {
        with_sema(|s| {
            let arr_ty = QualType::unqual(s.ctx.array_of(s.ctx.int_qt(), Some(4)));
            let decl = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                arr_ty,
                Storage::empty(),
                DeclKind::Object,
            ));
            let base = s.make_object(loc(), decl);
            let idx = s.make_int(loc(), 1, s.ctx.int_qt());
            let e = s.make_subscript(loc(), base, idx).unwrap();
            assert!(e.lvalue);
            assert!(matches!(e.kind, ExprKind::Unary(UnaryOp::Deref, _)));
            assert_eq!(e.ty.get().number_spec(), Some(Spec::INT));
        });
    }

    #[test]
    fn assignment_to_const_is_rejected() {
        with_sema(|s| {
            let decl = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                s.ctx.int_qt().with_qual(Qual::CONST),
                Storage::empty(),
                DeclKind::Object,
            ));
            let v = s.make_object(loc(), decl);
            let one = s.make_int(loc(), 1, s.ctx.int_qt());
            let err = s
                .make_assignment(loc(), TokenKind::Assign, v, one)
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::AssignToConst);
        });
    }

    #[test]
    fn compound_assignment_desugars() {
        with_sema(|s| {
            let v = int_var(&s);
            let one = s.make_int(loc(), 1, s.ctx.int_qt());
            let e = s
                .make_assignment(loc(), TokenKind::PlusAssign, v, one)
                .unwrap();
            match e.kind {
                ExprKind::Binary(BinaryOp::Assign, _, rhs) => {
                    assert!(matches!(rhs.kind, ExprKind::Binary(BinaryOp::Add, _, _)));
                }
                _ => panic!("expected assignment"),
            }
        });
    }

    #[test]
    fn assignment_discarding_qualifiers_is_rejected() {
        with_sema(|s| {
            // int *p; const int *q; p = q; loses const
            let p_ty = QualType::unqual(s.ctx.pointer_to(s.ctx.int_qt()));
            let q_ty = QualType::unqual(
                s.ctx
                    .pointer_to(s.ctx.int_qt().with_qual(Qual::CONST)),
            );
            let p = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                p_ty,
                Storage::empty(),
                DeclKind::Object,
            ));
            let q = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                q_ty,
                Storage::empty(),
                DeclKind::Object,
            ));
            let pe = s.make_object(loc(), p);
            let qe = s.make_object(loc(), q);
            let err = s
                .make_assignment(loc(), TokenKind::Assign, pe, qe)
                .unwrap_err();
            assert_eq!(err.kind, ErrorKind::QualifierLoss);
        });
    }

    #[test]
    fn ternary_unifies_arithmetic_branches() {
        with_sema(|s| {
            let c = s.make_int(loc(), 1, s.ctx.int_qt());
            let a = s.make_int(loc(), 1, s.ctx.int_qt());
            let b = s.make_number(loc(), "2.0", true).unwrap();
            let e = s.make_ternary(loc(), c, a, b).unwrap();
            assert_eq!(e.ty.get().number_spec(), Some(Spec::DOUBLE));
        });
    }

    #[test]
    fn call_checks_argument_count() {
        with_sema(|s| {
            let param = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                s.ctx.int_qt(),
                Storage::empty(),
                DeclKind::Object,
            ));
            let fty = QualType::unqual(s.ctx.func_type(s.ctx.int_qt(), vec![param], false, false));
            let fdecl = s.ctx.alloc_decl(Decl::new(
                None,
                loc(),
                fty,
                Storage::empty(),
                DeclKind::Func(crate::ast::FuncDecl::new(vec![param])),
            ));
            let f = s.make_object(loc(), fdecl);
            let err = s.make_call(loc(), f, vec![]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::TooFewArguments);

            let a = s.make_int(loc(), 1, s.ctx.int_qt());
            let b = s.make_int(loc(), 2, s.ctx.int_qt());
            let err = s.make_call(loc(), f, vec![a, b]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::TooManyArguments);

            let ok = s.make_call(loc(), f, vec![a]).unwrap();
            assert_eq!(ok.ty.get().number_spec(), Some(Spec::INT));
        });
    }

    #[test]
    fn call_on_non_function_is_rejected() {
        with_sema(|s| {
            let v = int_var(&s);
            let err = s.make_call(loc(), v, vec![]).unwrap_err();
            assert_eq!(err.kind, ErrorKind::NotCallable);
        });
    }

    #[test]
    fn sizeof_rejects_function_and_incomplete_types() {
        with_sema(|s| {
            let fty = QualType::unqual(s.ctx.func_type(s.ctx.int_qt(), vec![], false, false));
            assert_eq!(
                s.make_sizeof(loc(), fty).unwrap_err().kind,
                ErrorKind::IncompleteType
            );
            let open = QualType::unqual(s.ctx.struct_type(None, false));
            assert_eq!(
                s.make_sizeof(loc(), open).unwrap_err().kind,
                ErrorKind::IncompleteType
            );
            let arr = QualType::unqual(s.ctx.array_of(s.ctx.int_qt(), Some(3)));
            assert_eq!(
                s.make_sizeof(loc(), arr).unwrap().int_value(),
                Some(3 * SIZE_INT as i64)
            );
        });
    }

    #[test]
    fn sizeof_of_pointer_is_pointer_size() {
        with_sema(|s| {
            let p = QualType::unqual(s.ctx.pointer_to(s.ctx.int_qt()));
            assert_eq!(
                s.make_sizeof(loc(), p).unwrap().int_value(),
                Some(SIZE_POINTER as i64)
            );
        });
    }

    #[test]
    fn cast_rejects_non_scalar_target() {
        with_sema(|s| {
            let st = QualType::unqual(s.ctx.struct_type(None, false));
            let one = s.make_int(loc(), 1, s.ctx.int_qt());
            let err = s.make_cast(loc(), st, one).unwrap_err();
            assert_eq!(err.kind, ErrorKind::ScalarRequired);
            let v = s.make_cast(loc(), s.ctx.void_qt(), one).unwrap();
            assert!(v.ty.get().is_void());
        });
    }

    #[test]
    fn void_cast_value_is_rejected_when_consumed() {
        with_sema(|s| {
            let one = s.make_int(loc(), 1, s.ctx.int_qt());
            let discarded = s.make_cast(loc(), s.ctx.void_qt(), one).unwrap();
            // as an operand
            assert!(s.make_unary(loc(), UnaryOp::Negate, discarded).is_err());
            // converted to a value
            assert!(s.convert(discarded, s.ctx.int_qt()).is_err());
            // as a promoted (variadic / unprototyped) argument
            assert_eq!(
                s.default_promote(discarded).unwrap_err().kind,
                ErrorKind::ScalarRequired
            );
        });
    }
}
