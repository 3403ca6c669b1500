//! Integer constant expression folding.
//!
//! Evaluates the expressions C99 requires to be integer constant
//! expressions: enumerator values, array bounds, case labels, bit-field
//! widths. Arithmetic is carried out in the widest signed host integer
//! with wrapping semantics; unsignedness propagates through the
//! expression's type where division, remainder, right shift and
//! ordering differ. The result is truncated to the expression's type on
//! use.

use crate::ast::{BinaryOp, Expr, ExprKind, UnaryOp, Value};
use crate::diag::{Diag, ErrorKind, PResult};
use crate::types::Type;

fn not_constant(expr: &Expr, what: &str) -> Diag {
    Diag::new(
        ErrorKind::NotConstant,
        expr.loc,
        format!("{} is not permitted in a constant expression", what),
    )
}

/// Truncate a folded value to the width and signedness of `ty`.
fn truncate(value: i64, ty: &Type) -> i64 {
    let Some(_) = ty.number_spec() else { return value };
    let size = ty.size();
    let unsigned = ty.is_unsigned();
    match (size, unsigned) {
        (1, false) => value as i8 as i64,
        (1, true) => value as u8 as i64,
        (2, false) => value as i16 as i64,
        (2, true) => value as u16 as i64,
        (4, false) => value as i32 as i64,
        (4, true) => value as u32 as i64,
        _ => value,
    }
}

pub fn eval_long(expr: &Expr) -> PResult<i64> {
    let v = eval(expr)?;
    Ok(truncate(v, expr.ty.get()))
}

fn eval(expr: &Expr) -> PResult<i64> {
    match &expr.kind {
        ExprKind::Constant(Value::Int(v)) => Ok(*v),
        ExprKind::Constant(Value::Float(_)) => {
            Err(not_constant(expr, "a floating constant"))
        }
        ExprKind::Constant(Value::Str(_)) => Err(not_constant(expr, "a string literal")),
        ExprKind::Object(decl) => decl
            .enum_value()
            .ok_or_else(|| not_constant(expr, "an object reference")),
        ExprKind::Unary(op, operand) => {
            use UnaryOp::*;
            let v = match op {
                Negate => eval(operand)?.wrapping_neg(),
                Arith => eval(operand)?,
                BitNot => !eval(operand)?,
                LogicalNot => (eval(operand)? == 0) as i64,
                Deref => return Err(not_constant(expr, "a dereference")),
                AddrOf => return Err(not_constant(expr, "taking an address")),
                PreInc | PreDec | PostInc | PostDec => {
                    return Err(not_constant(expr, "increment or decrement"))
                }
            };
            Ok(v)
        }
        ExprKind::Binary(op, lhs, rhs) => {
            use BinaryOp::*;
            match op {
                Assign => return Err(not_constant(expr, "assignment")),
                Comma => return Err(not_constant(expr, "the comma operator")),
                _ => {}
            }
            // operands are truncated to their own type first, giving
            // modular semantics for narrow unsigned intermediates
            let l = eval_long(lhs)?;
            let r = eval_long(rhs)?;
            let unsigned = lhs.ty.get().is_unsigned() || rhs.ty.get().is_unsigned();
            let v = match op {
                Add => l.wrapping_add(r),
                Sub => l.wrapping_sub(r),
                Mul => l.wrapping_mul(r),
                Div | Rem => {
                    if r == 0 {
                        return Err(Diag::new(
                            ErrorKind::NotConstant,
                            expr.loc,
                            "division by zero in constant expression",
                        ));
                    }
                    if unsigned {
                        let (lu, ru) = (l as u64, r as u64);
                        if matches!(op, Div) {
                            (lu / ru) as i64
                        } else {
                            (lu % ru) as i64
                        }
                    } else if matches!(op, Div) {
                        l.wrapping_div(r)
                    } else {
                        l.wrapping_rem(r)
                    }
                }
                Shl => l.wrapping_shl(r as u32 & 63),
                Shr => {
                    if unsigned {
                        ((l as u64).wrapping_shr(r as u32 & 63)) as i64
                    } else {
                        l.wrapping_shr(r as u32 & 63)
                    }
                }
                BitAnd => l & r,
                BitXor => l ^ r,
                BitOr => l | r,
                Lt | Gt | Le | Ge => {
                    let ord = if unsigned {
                        (l as u64).cmp(&(r as u64))
                    } else {
                        l.cmp(&r)
                    };
                    let hold = match op {
                        Lt => ord.is_lt(),
                        Gt => ord.is_gt(),
                        Le => ord.is_le(),
                        _ => ord.is_ge(),
                    };
                    hold as i64
                }
                Eq => (l == r) as i64,
                Ne => (l != r) as i64,
                LogicalAnd => (l != 0 && r != 0) as i64,
                LogicalOr => (l != 0 || r != 0) as i64,
                // rejected before evaluation of the operands
                Assign | Comma => 0,
            };
            Ok(v)
        }
        ExprKind::Ternary {
            cond,
            then_branch,
            else_branch,
        } => {
            if eval(cond)? != 0 {
                eval(then_branch)
            } else {
                eval(else_branch)
            }
        }
        ExprKind::Cast(operand) => {
            if !expr.ty.get().is_integer() {
                return Err(not_constant(expr, "a cast to a non-integer type"));
            }
            Ok(truncate(eval(operand)?, expr.ty.get()))
        }
        ExprKind::Call { .. } => Err(not_constant(expr, "a function call")),
        ExprKind::Member { .. } => Err(not_constant(expr, "member access")),
    }
}
