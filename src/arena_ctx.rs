//! The arena bundle handed to the parser and the node constructors.
//!
//! `AstContext` is a `Copy` bundle of arena references plus the
//! memoised singletons for `void` and the fifteen canonical arithmetic
//! types; derived types (pointer, array, struct, enum, function) are
//! fresh arena nodes.

use crate::arena::Arena;
use crate::ast::{Decl, Expr, LabelStmt, Stmt};
use crate::intern::Symbol;
use crate::types::{
    canonical, promote_spec, usual_arith_spec, ArrayType, EnumType, FuncType, QualType, Spec,
    StructType, Type,
};

#[derive(Clone, Copy)]
struct Primitives<'a> {
    void_: &'a Type<'a>,
    bool_: &'a Type<'a>,
    char_: &'a Type<'a>,
    schar: &'a Type<'a>,
    uchar: &'a Type<'a>,
    short_: &'a Type<'a>,
    ushort: &'a Type<'a>,
    int_: &'a Type<'a>,
    uint: &'a Type<'a>,
    long_: &'a Type<'a>,
    ulong: &'a Type<'a>,
    llong: &'a Type<'a>,
    ullong: &'a Type<'a>,
    float_: &'a Type<'a>,
    double_: &'a Type<'a>,
    ldouble: &'a Type<'a>,
}

#[derive(Clone, Copy)]
pub struct AstContext<'a> {
    pub types: &'a Arena<Type<'a>>,
    pub exprs: &'a Arena<Expr<'a>>,
    pub stmts: &'a Arena<Stmt<'a>>,
    pub decls: &'a Arena<Decl<'a>>,
    pub labels: &'a Arena<LabelStmt>,
    prims: Primitives<'a>,
}

impl<'a> AstContext<'a> {
    pub fn new(
        types: &'a Arena<Type<'a>>,
        exprs: &'a Arena<Expr<'a>>,
        stmts: &'a Arena<Stmt<'a>>,
        decls: &'a Arena<Decl<'a>>,
        labels: &'a Arena<LabelStmt>,
    ) -> Self {
        let prims = Primitives {
            void_: types.alloc(Type::Void),
            bool_: types.alloc(Type::Number(Spec::BOOL)),
            char_: types.alloc(Type::Number(Spec::CHAR)),
            schar: types.alloc(Type::Number(Spec::SIGNED.union(Spec::CHAR))),
            uchar: types.alloc(Type::Number(Spec::UNSIGNED.union(Spec::CHAR))),
            short_: types.alloc(Type::Number(Spec::SHORT)),
            ushort: types.alloc(Type::Number(Spec::UNSIGNED.union(Spec::SHORT))),
            int_: types.alloc(Type::Number(Spec::INT)),
            uint: types.alloc(Type::Number(Spec::UNSIGNED.union(Spec::INT))),
            long_: types.alloc(Type::Number(Spec::LONG)),
            ulong: types.alloc(Type::Number(Spec::UNSIGNED.union(Spec::LONG))),
            llong: types.alloc(Type::Number(Spec::LLONG)),
            ullong: types.alloc(Type::Number(Spec::UNSIGNED.union(Spec::LLONG))),
            float_: types.alloc(Type::Number(Spec::FLOAT)),
            double_: types.alloc(Type::Number(Spec::DOUBLE)),
            ldouble: types.alloc(Type::Number(Spec::LONG.union(Spec::DOUBLE))),
        };
        AstContext {
            types,
            exprs,
            stmts,
            decls,
            labels,
            prims,
        }
    }

    pub fn void_type(&self) -> &'a Type<'a> {
        self.prims.void_
    }

    pub fn void_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.void_)
    }

    /// The canonical singleton for an arithmetic specifier set. The
    /// set is expected to have passed specifier combination; anything
    /// unrecognized falls back to `int` after combination reported the
    /// error.
    pub fn number_type(&self, spec: Spec) -> &'a Type<'a> {
        let c = canonical(spec).unwrap_or(Spec::INT);
        let p = &self.prims;
        if c == Spec::BOOL {
            p.bool_
        } else if c == Spec::CHAR {
            p.char_
        } else if c == Spec::SIGNED.union(Spec::CHAR) {
            p.schar
        } else if c == Spec::UNSIGNED.union(Spec::CHAR) {
            p.uchar
        } else if c == Spec::SHORT {
            p.short_
        } else if c == Spec::UNSIGNED.union(Spec::SHORT) {
            p.ushort
        } else if c == Spec::INT {
            p.int_
        } else if c == Spec::UNSIGNED.union(Spec::INT) {
            p.uint
        } else if c == Spec::LONG {
            p.long_
        } else if c == Spec::UNSIGNED.union(Spec::LONG) {
            p.ulong
        } else if c == Spec::LLONG {
            p.llong
        } else if c == Spec::UNSIGNED.union(Spec::LLONG) {
            p.ullong
        } else if c == Spec::FLOAT {
            p.float_
        } else if c == Spec::DOUBLE {
            p.double_
        } else {
            p.ldouble
        }
    }

    pub fn number_qt(&self, spec: Spec) -> QualType<'a> {
        QualType::unqual(self.number_type(spec))
    }

    pub fn int_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.int_)
    }

    pub fn uint_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.uint)
    }

    /// The pointer difference type.
    pub fn long_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.long_)
    }

    /// The `sizeof` result type.
    pub fn ulong_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.ulong)
    }

    pub fn char_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.char_)
    }

    pub fn bool_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.bool_)
    }

    pub fn double_qt(&self) -> QualType<'a> {
        QualType::unqual(self.prims.double_)
    }

    pub fn pointer_to(&self, base: QualType<'a>) -> &'a Type<'a> {
        self.types.alloc(Type::Pointer(base))
    }

    pub fn array_of(&self, elem: QualType<'a>, bound: Option<u64>) -> &'a Type<'a> {
        self.types.alloc(Type::Array(ArrayType::new(elem, bound)))
    }

    pub fn struct_type(&self, tag: Option<Symbol>, is_union: bool) -> &'a Type<'a> {
        self.types.alloc(Type::Struct(StructType::new(tag, is_union)))
    }

    pub fn enum_type(&self, tag: Option<Symbol>) -> &'a Type<'a> {
        self.types.alloc(Type::Enum(EnumType::new(tag)))
    }

    pub fn func_type(
        &self,
        ret: QualType<'a>,
        params: Vec<&'a Decl<'a>>,
        variadic: bool,
        unspecified: bool,
    ) -> &'a Type<'a> {
        self.types.alloc(Type::Func(FuncType {
            ret,
            params,
            variadic,
            unspecified,
        }))
    }

    /// Integer promotion to the canonical singleton.
    pub fn promote(&self, spec: Spec) -> &'a Type<'a> {
        self.number_type(promote_spec(spec))
    }

    pub fn usual_arith(&self, a: Spec, b: Spec) -> &'a Type<'a> {
        self.number_type(usual_arith_spec(a, b))
    }

    pub fn alloc_expr(&self, expr: Expr<'a>) -> &'a Expr<'a> {
        self.exprs.alloc(expr)
    }

    pub fn alloc_stmt(&self, stmt: Stmt<'a>) -> &'a Stmt<'a> {
        self.stmts.alloc(stmt)
    }

    pub fn alloc_decl(&self, decl: Decl<'a>) -> &'a Decl<'a> {
        self.decls.alloc(decl)
    }

    pub fn alloc_label(&self, label: LabelStmt) -> &'a LabelStmt {
        self.labels.alloc(label)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Qual, SIZE_INT, SIZE_POINTER};

    fn with_ctx<R>(f: impl for<'a> FnOnce(AstContext<'a>) -> R) -> R {
        let types = Arena::new();
        let exprs = Arena::new();
        let stmts = Arena::new();
        let decls = Arena::new();
        let labels = Arena::new();
        let ctx = AstContext::new(&types, &exprs, &stmts, &decls, &labels);
        f(ctx)
    }

    #[test]
    fn number_types_are_memoised() {
        with_ctx(|ctx| {
            let a = ctx.number_type(Spec::INT);
            let b = ctx.number_type(Spec::SIGNED.union(Spec::INT));
            assert!(std::ptr::eq(a, b));
        });
    }

    #[test]
    fn pointer_types_are_fresh() {
        with_ctx(|ctx| {
            let a = ctx.pointer_to(ctx.int_qt());
            let b = ctx.pointer_to(ctx.int_qt());
            assert!(!std::ptr::eq(a, b));
            assert!(a.is_compatible(b));
        });
    }

    #[test]
    fn decay_is_idempotent() {
        with_ctx(|ctx| {
            let arr = QualType::unqual(ctx.array_of(ctx.int_qt(), Some(4)));
            let once = arr.decay(ctx);
            let twice = once.decay(ctx);
            assert!(once.get().is_pointer());
            assert!(once.get().is_compatible(twice.get()));
            assert_eq!(once.qual(), twice.qual());
        });
    }

    #[test]
    fn array_decay_carries_element_qualifiers() {
        with_ctx(|ctx| {
            let elem = ctx.int_qt().with_qual(Qual::CONST);
            let arr = QualType::unqual(ctx.array_of(elem, Some(2)));
            let ptr = arr.decay(ctx);
            let base = ptr.get().as_pointer().unwrap();
            assert!(base.is_const());
        });
    }

    #[test]
    fn function_decay_builds_pointer_to_function() {
        with_ctx(|ctx| {
            let f = QualType::unqual(ctx.func_type(ctx.int_qt(), vec![], false, false));
            let p = f.decay(ctx);
            let base = p.get().as_pointer().unwrap();
            assert!(base.get().is_func());
        });
    }

    #[test]
    fn sizeof_matches_single_element_array() {
        with_ctx(|ctx| {
            let int_ty = ctx.number_type(Spec::INT);
            let arr = ctx.array_of(ctx.int_qt(), Some(1));
            assert_eq!(int_ty.size(), arr.size());
            assert_eq!(int_ty.size(), SIZE_INT);
        });
    }

    #[test]
    fn function_size_is_pointer_size() {
        with_ctx(|ctx| {
            let f = ctx.func_type(ctx.int_qt(), vec![], false, false);
            assert_eq!(f.size(), SIZE_POINTER);
        });
    }

    #[test]
    fn compatibility_is_reflexive_and_symmetric() {
        with_ctx(|ctx| {
            let a = ctx.pointer_to(ctx.int_qt());
            let b = ctx.pointer_to(ctx.int_qt());
            assert!(a.is_compatible(a));
            assert!(a.is_compatible(b));
            assert!(b.is_compatible(a));
        });
    }

    #[test]
    fn unknown_bound_array_compatible_with_known() {
        with_ctx(|ctx| {
            let open = ctx.array_of(ctx.int_qt(), None);
            let three = ctx.array_of(ctx.int_qt(), Some(3));
            let four = ctx.array_of(ctx.int_qt(), Some(4));
            assert!(open.is_compatible(three));
            assert!(three.is_compatible(open));
            assert!(!three.is_compatible(four));
        });
    }

    #[test]
    fn unspecified_parameter_list_is_a_wildcard() {
        with_ctx(|ctx| {
            let unspec = ctx.func_type(ctx.int_qt(), vec![], false, true);
            let nullary = ctx.func_type(ctx.int_qt(), vec![], false, false);
            assert!(unspec.is_compatible(nullary));
            assert!(nullary.is_compatible(unspec));
        });
    }

    #[test]
    fn distinct_incomplete_structs_are_incompatible() {
        with_ctx(|ctx| {
            let a = ctx.struct_type(None, false);
            let b = ctx.struct_type(None, false);
            assert!(a.is_compatible(a));
            assert!(!a.is_compatible(b));
        });
    }
}
