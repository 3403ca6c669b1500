//! Declaration grammar: specifier sequences, struct/union/enum
//! specifiers, declarators (concrete and abstract), parameter lists,
//! initializers, and function definitions.

use crate::arena_ctx::AstContext;
use crate::ast::{Decl, DeclKind, Expr, FuncDecl};
use crate::diag::{Diag, ErrorKind, PResult};
use crate::eval::eval_long;
use crate::scope::ScopeKind;
use crate::token::{Token, TokenKind};
use crate::tokens::TokenSource;
use crate::types::{
    add_qualifier, add_specifier, add_storage_class, canonical, ArrayType, Qual, QualType, Spec,
    Storage, StructType, Type,
};

use super::Parser;

fn spec_of(kind: TokenKind) -> Spec {
    use TokenKind::*;
    match kind {
        KwVoid => Spec::VOID,
        KwBool => Spec::BOOL,
        KwChar => Spec::CHAR,
        KwShort => Spec::SHORT,
        KwInt => Spec::INT,
        KwLong => Spec::LONG,
        KwFloat => Spec::FLOAT,
        KwDouble => Spec::DOUBLE,
        KwComplex | KwImaginary => Spec::COMPLEX,
        KwSigned => Spec::SIGNED,
        _ => Spec::UNSIGNED,
    }
}

fn qual_of(kind: TokenKind) -> Qual {
    match kind {
        TokenKind::KwConst => Qual::CONST,
        TokenKind::KwVolatile => Qual::VOLATILE,
        _ => Qual::RESTRICT,
    }
}

fn storage_of(kind: TokenKind) -> Storage {
    use TokenKind::*;
    match kind {
        KwTypedef => Storage::TYPEDEF,
        KwStatic => Storage::STATIC,
        KwInline => Storage::INLINE,
        KwRegister => Storage::REGISTER,
        KwExtern => Storage::EXTERN,
        _ => Storage::AUTO,
    }
}

/// Replace `old` with `new` at the base of a freshly built derived-type
/// chain. Used to re-anchor a parenthesised declarator once the suffix
/// after the closing `)` is known.
fn rebase<'a>(
    ctx: AstContext<'a>,
    ty: QualType<'a>,
    old: QualType<'a>,
    new: QualType<'a>,
) -> QualType<'a> {
    if ty == old {
        return new;
    }
    match ty.get() {
        Type::Pointer(base) => {
            QualType::new(ctx.pointer_to(rebase(ctx, *base, old, new)), ty.qual())
        }
        Type::Array(a) => QualType::new(
            ctx.array_of(rebase(ctx, a.elem, old, new), a.bound()),
            ty.qual(),
        ),
        Type::Func(f) => QualType::new(
            ctx.func_type(
                rebase(ctx, f.ret, old, new),
                f.params.clone(),
                f.variadic,
                f.unspecified,
            ),
            ty.qual(),
        ),
        _ => ty,
    }
}

impl<'a, 'i, S: TokenSource> Parser<'a, 'i, S> {
    /// A fresh copy of an incomplete array type, so an initializer can
    /// complete this declarator's bound without touching the typedef or
    /// specifier it came from.
    pub(crate) fn fresh_base(&self, base: QualType<'a>) -> QualType<'a> {
        match base.get() {
            Type::Array(a) if a.bound().is_none() => {
                QualType::new(self.ctx().array_of(a.elem, None), base.qual())
            }
            _ => base,
        }
    }

    pub(crate) fn decl_specifiers(&mut self, storage: &mut Storage) -> PResult<QualType<'a>> {
        self.type_specifier(Some(storage))
    }

    /// declaration-specifiers / specifier-qualifier-list. Storage-class
    /// tokens are only legal when the caller provides a slot for them.
    pub(crate) fn type_specifier(
        &mut self,
        mut storage: Option<&mut Storage>,
    ) -> PResult<QualType<'a>> {
        let mut qual = Qual::empty();
        let mut spec = Spec::empty();
        let mut base: Option<QualType<'a>> = None;
        let mut last_loc;

        loop {
            let tok = self.next();
            last_loc = tok.loc;
            match tok.kind {
                k if k.is_qualifier() => {
                    qual = add_qualifier(qual, qual_of(k), tok.loc, &mut self.diags);
                }
                k if k.is_storage_class() => match storage.as_deref_mut() {
                    Some(slot) => {
                        *slot = add_storage_class(*slot, storage_of(k), tok.loc, &mut self.diags)?;
                    }
                    None => {
                        return Err(Diag::new(
                            ErrorKind::BadStorageClass,
                            tok.loc,
                            format!("unexpected storage class specifier {}", k.describe()),
                        ))
                    }
                },
                TokenKind::KwStruct | TokenKind::KwUnion => {
                    if base.is_some() || !spec.is_empty() {
                        return Err(multiple_types(tok.loc));
                    }
                    let ty = self.struct_union_specifier(tok.kind == TokenKind::KwUnion)?;
                    base = Some(QualType::unqual(ty));
                }
                TokenKind::KwEnum => {
                    if base.is_some() || !spec.is_empty() {
                        return Err(multiple_types(tok.loc));
                    }
                    base = Some(QualType::unqual(self.enum_specifier()?));
                }
                k if k.is_type_specifier() => {
                    if base.is_some() {
                        return Err(multiple_types(tok.loc));
                    }
                    spec = add_specifier(spec, spec_of(k), tok.loc)?;
                }
                TokenKind::Ident(sym) if spec.is_empty() && base.is_none() => {
                    match self.scopes.find(sym, true) {
                        Some(decl) if decl.is_typedef() => {
                            let named = self.fresh_base(decl.ty());
                            base = Some(named);
                        }
                        _ => {
                            self.unget(tok);
                            break;
                        }
                    }
                }
                _ => {
                    self.unget(tok);
                    break;
                }
            }
        }

        let mut ty = match base {
            Some(b) => {
                if !spec.is_empty() {
                    return Err(multiple_types(last_loc));
                }
                b
            }
            None if spec.is_empty() => {
                let tok = self.peek();
                return Err(self.unexpected(&tok, "a type specifier"));
            }
            None if spec == Spec::VOID => self.ctx().void_qt(),
            None => {
                if canonical(spec).is_none() {
                    return Err(Diag::new(
                        ErrorKind::BadSpecifier,
                        last_loc,
                        format!(
                            "'{}' does not name a type",
                            crate::types::spec_to_string(spec)
                        ),
                    ));
                }
                self.ctx().number_qt(spec)
            }
        };
        ty.add_qual(qual);
        Ok(ty)
    }

    fn declare_tag(&mut self, tok: &Token, sym: crate::intern::Symbol, ty: &'a Type<'a>) -> PResult<()> {
        let decl = self.ctx().alloc_decl(Decl::new(
            Some(sym),
            tok.loc,
            QualType::unqual(ty),
            Storage::empty(),
            DeclKind::Object,
        ));
        self.scopes.declare_tag(decl, self.sema.interner)
    }

    /// struct-or-union-specifier; the `struct`/`union` keyword has been
    /// consumed.
    fn struct_union_specifier(&mut self, is_union: bool) -> PResult<&'a Type<'a>> {
        let kw = if is_union { "union" } else { "struct" };
        let tok = self.next();
        match tok.kind {
            TokenKind::Ident(sym) => {
                let prev = self.scopes.find_tag(sym, false);
                if self.test(TokenKind::LBrace) {
                    // a definition: completes or declares the tag in
                    // the current scope
                    let ty = match prev {
                        None => {
                            let ty = self.ctx().struct_type(Some(sym), is_union);
                            self.declare_tag(&tok, sym, ty)?;
                            ty
                        }
                        Some(decl) => decl.ty().get(),
                    };
                    let st = match ty.as_struct() {
                        Some(st) if st.is_union == is_union => st,
                        _ => {
                            return Err(Diag::new(
                                ErrorKind::TagMismatch,
                                tok.loc,
                                format!(
                                    "'{}' is declared as a different kind of tag",
                                    self.sema.interner.resolve(sym)
                                ),
                            ))
                        }
                    };
                    if st.is_complete() {
                        return Err(Diag::new(
                            ErrorKind::Redefinition,
                            tok.loc,
                            format!("redefinition of {} '{}'", kw, self.sema.interner.resolve(sym)),
                        ));
                    }
                    let members = self.struct_decl_list()?;
                    self.expect(TokenKind::RBrace)?;
                    st.set_members(members);
                    Ok(ty)
                } else {
                    // a reference: resolve outward, or declare an
                    // incomplete tag here
                    let found = prev.or_else(|| self.scopes.find_tag(sym, true));
                    match found {
                        Some(decl)
                            if decl
                                .ty()
                                .get()
                                .as_struct()
                                .map_or(false, |st| st.is_union == is_union) =>
                        {
                            Ok(decl.ty().get())
                        }
                        Some(_) if prev.is_some() => Err(Diag::new(
                            ErrorKind::TagMismatch,
                            tok.loc,
                            format!(
                                "'{}' is declared as a different kind of tag",
                                self.sema.interner.resolve(sym)
                            ),
                        )),
                        _ => {
                            let ty = self.ctx().struct_type(Some(sym), is_union);
                            self.declare_tag(&tok, sym, ty)?;
                            Ok(ty)
                        }
                    }
                }
            }
            TokenKind::LBrace => {
                let ty = self.ctx().struct_type(None, is_union);
                let members = self.struct_decl_list()?;
                self.expect(TokenKind::RBrace)?;
                if let Some(st) = ty.as_struct() {
                    st.set_members(members);
                }
                Ok(ty)
            }
            _ => Err(self.unexpected(&tok, "a tag name or '{'")),
        }
    }

    fn struct_decl_list(&mut self) -> PResult<Vec<&'a Decl<'a>>> {
        self.scopes.enter(ScopeKind::Block);
        let mut members = Vec::new();
        loop {
            let p = self.peek();
            if !self.is_specifier_tok(&p) {
                break;
            }
            let base = self.type_specifier(None)?;
            loop {
                if let Some(member) = self.struct_declarator(base)? {
                    members.push(member);
                }
                if !self.test(TokenKind::Comma) {
                    break;
                }
            }
            self.expect(TokenKind::Semicolon)?;
        }
        self.scopes.leave();
        Ok(members)
    }

    /// One member declarator, with optional bit-field width. The width
    /// is validated as an integer constant expression but layout is not
    /// modelled. An unnamed bit-field contributes no member.
    fn struct_declarator(&mut self, base: QualType<'a>) -> PResult<Option<&'a Decl<'a>>> {
        let mut ty = self.fresh_base(base);
        let name = self.try_declarator(&mut ty)?;
        let mut has_width = false;
        if let Some(colon) = self.want(TokenKind::Colon) {
            let width = eval_long(self.conditional_expr()?)?;
            if width < 0 {
                return Err(Diag::new(
                    ErrorKind::BadDeclarator,
                    colon.loc,
                    "bit-field width is negative",
                ));
            }
            has_width = true;
        }
        let Some(name_tok) = name else {
            if has_width {
                return Ok(None);
            }
            let tok = self.peek();
            return Err(self.unexpected(&tok, "a member declarator"));
        };
        let TokenKind::Ident(sym) = name_tok.kind else {
            return Err(self.unexpected(&name_tok, "a member name"));
        };
        if ty.get().is_func() {
            return Err(Diag::new(
                ErrorKind::BadDeclarator,
                name_tok.loc,
                format!(
                    "member '{}' declared as a function",
                    self.sema.interner.resolve(sym)
                ),
            ));
        }
        if !ty.get().is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                name_tok.loc,
                format!(
                    "member '{}' has incomplete type '{}'",
                    self.sema.interner.resolve(sym),
                    ty.to_string(self.sema.interner)
                ),
            ));
        }
        let decl = self.ctx().alloc_decl(Decl::new(
            Some(sym),
            name_tok.loc,
            ty,
            Storage::empty(),
            DeclKind::Object,
        ));
        let decl = self.scopes.declare(decl, self.sema.interner)?;
        Ok(Some(decl))
    }

    /// enum-specifier; the `enum` keyword has been consumed.
    fn enum_specifier(&mut self) -> PResult<&'a Type<'a>> {
        let tok = self.next();
        match tok.kind {
            TokenKind::Ident(sym) => {
                let prev = self.scopes.find_tag(sym, false);
                if self.test(TokenKind::LBrace) {
                    let ty = match prev {
                        None => {
                            let ty = self.ctx().enum_type(Some(sym));
                            self.declare_tag(&tok, sym, ty)?;
                            ty
                        }
                        Some(decl) => decl.ty().get(),
                    };
                    let Some(en) = ty.as_enum() else {
                        return Err(Diag::new(
                            ErrorKind::TagMismatch,
                            tok.loc,
                            format!(
                                "'{}' is declared as a different kind of tag",
                                self.sema.interner.resolve(sym)
                            ),
                        ));
                    };
                    if en.is_complete() {
                        return Err(Diag::new(
                            ErrorKind::Redefinition,
                            tok.loc,
                            format!("redefinition of enum '{}'", self.sema.interner.resolve(sym)),
                        ));
                    }
                    self.enumerator_list()?;
                    en.set_complete();
                    Ok(ty)
                } else {
                    let found = prev.or_else(|| self.scopes.find_tag(sym, true));
                    match found {
                        Some(decl) if decl.ty().get().as_enum().is_some() => Ok(decl.ty().get()),
                        Some(_) if prev.is_some() => Err(Diag::new(
                            ErrorKind::TagMismatch,
                            tok.loc,
                            format!(
                                "'{}' is declared as a different kind of tag",
                                self.sema.interner.resolve(sym)
                            ),
                        )),
                        _ => {
                            let ty = self.ctx().enum_type(Some(sym));
                            self.declare_tag(&tok, sym, ty)?;
                            Ok(ty)
                        }
                    }
                }
            }
            TokenKind::LBrace => {
                let ty = self.ctx().enum_type(None);
                self.enumerator_list()?;
                if let Some(en) = ty.as_enum() {
                    en.set_complete();
                }
                Ok(ty)
            }
            _ => Err(self.unexpected(&tok, "an enum tag or '{'")),
        }
    }

    /// enumerator-list, consuming the closing `}`. Each enumerator is
    /// an ordinary-namespace `int` constant; an explicit value resets
    /// the running counter.
    fn enumerator_list(&mut self) -> PResult<()> {
        let mut value: i64 = 0;
        loop {
            if self.test(TokenKind::RBrace) {
                break;
            }
            let tok = self.next();
            let TokenKind::Ident(sym) = tok.kind else {
                return Err(self.unexpected(&tok, "an enumerator name"));
            };
            if self.test(TokenKind::Assign) {
                value = eval_long(self.conditional_expr()?)?;
            }
            let decl = self.ctx().alloc_decl(Decl::new(
                Some(sym),
                tok.loc,
                self.ctx().int_qt(),
                Storage::empty(),
                DeclKind::EnumConst(value),
            ));
            self.scopes.declare(decl, self.sema.interner)?;
            value = value.wrapping_add(1);
            if !self.test(TokenKind::Comma) {
                self.expect(TokenKind::RBrace)?;
                break;
            }
        }
        Ok(())
    }

    /// pointer: a run of `*` with interleaved qualifiers, each `*`
    /// deriving from what came before.
    fn pointer(&mut self, mut base: QualType<'a>) -> QualType<'a> {
        loop {
            let tok = self.next();
            match tok.kind {
                k if k.is_qualifier() => {
                    let q = add_qualifier(base.qual(), qual_of(k), tok.loc, &mut self.diags);
                    base = base.with_qual(q);
                }
                TokenKind::Star => {
                    base = QualType::unqual(self.ctx().pointer_to(base));
                }
                _ => {
                    self.unget(tok);
                    return base;
                }
            }
        }
    }

    /// declarator / abstract-declarator unification. Returns the name
    /// token, or `None` for an abstract declarator, leaving the fully
    /// derived type in `base`. A parenthesised sub-declarator binds
    /// tighter than the suffixes after the `)`, so the outer type is
    /// re-anchored at the inner chain's base.
    pub(crate) fn try_declarator(&mut self, base: &mut QualType<'a>) -> PResult<Option<Token>> {
        *base = self.pointer(*base);
        let tok = self.next();
        if tok.kind == TokenKind::LParen {
            let p = self.peek();
            if self.is_specifier_tok(&p) || p.kind == TokenKind::RParen {
                // `(` opening a parameter list, not a sub-declarator
                self.unget(tok);
                *base = self.array_func_declarator(*base)?;
                return Ok(None);
            }
            let backup = *base;
            let name = self.try_declarator(base)?;
            self.expect(TokenKind::RParen)?;
            let new_base = self.array_func_declarator(backup)?;
            *base = rebase(self.ctx(), *base, backup, new_base);
            Ok(name)
        } else {
            let name = if matches!(tok.kind, TokenKind::Ident(_)) {
                Some(tok)
            } else {
                self.unget(tok);
                None
            };
            *base = self.array_func_declarator(*base)?;
            Ok(name)
        }
    }

    /// Array and function declarator suffixes, innermost first.
    fn array_func_declarator(&mut self, mut base: QualType<'a>) -> PResult<QualType<'a>> {
        loop {
            let tok = self.next();
            match tok.kind {
                TokenKind::LBracket => {
                    if !base.get().is_complete() || base.get().is_func() {
                        return Err(Diag::new(
                            ErrorKind::BadArrayElement,
                            tok.loc,
                            format!(
                                "declaration of an array of invalid type '{}'",
                                base.to_string(self.sema.interner)
                            ),
                        ));
                    }
                    let bound = if self.test(TokenKind::RBracket) {
                        None
                    } else {
                        let expr = self.conditional_expr()?;
                        let n = eval_long(expr)?;
                        if n < 0 {
                            return Err(Diag::new(
                                ErrorKind::BadArrayElement,
                                expr.loc,
                                "array bound is negative",
                            ));
                        }
                        self.expect(TokenKind::RBracket)?;
                        Some(n as u64)
                    };
                    base = QualType::unqual(self.ctx().array_of(base, bound));
                }
                TokenKind::LParen => {
                    if base.get().is_array() || base.get().is_func() {
                        return Err(Diag::new(
                            ErrorKind::BadReturnType,
                            tok.loc,
                            "a function cannot return an array or function type",
                        ));
                    }
                    base = self.param_type_list(base)?;
                }
                _ => {
                    self.unget(tok);
                    return Ok(base);
                }
            }
        }
    }

    /// parameter-type-list, consuming through the closing `)`.
    /// Parameters are declared in a prototype scope and stored in their
    /// decayed form; `(void)` yields zero parameters; `()` yields an
    /// unspecified list.
    fn param_type_list(&mut self, ret: QualType<'a>) -> PResult<QualType<'a>> {
        if self.test(TokenKind::RParen) {
            return Ok(QualType::unqual(
                self.ctx().func_type(ret, Vec::new(), false, true),
            ));
        }
        self.scopes.enter(ScopeKind::Proto);
        let mut params = Vec::new();
        let mut variadic = false;
        loop {
            if self.test(TokenKind::Ellipsis) {
                variadic = true;
                break;
            }
            let mut ty = self.type_specifier(None)?;
            let name = self.try_declarator(&mut ty)?;
            let ty = ty.decay(self.ctx());
            if name.is_none() && ty.get().is_void() && params.is_empty() {
                let tok = self.peek();
                if tok.kind != TokenKind::RParen {
                    return Err(Diag::new(
                        ErrorKind::BadDeclarator,
                        tok.loc,
                        "'void' must be the only parameter",
                    ));
                }
                break;
            }
            if !ty.get().is_complete() {
                let tok = self.peek();
                return Err(Diag::new(
                    ErrorKind::IncompleteType,
                    tok.loc,
                    format!(
                        "parameter has incomplete type '{}'",
                        ty.to_string(self.sema.interner)
                    ),
                ));
            }
            let (sym, loc) = match &name {
                Some(tok) => match tok.kind {
                    TokenKind::Ident(sym) => (Some(sym), tok.loc),
                    _ => (None, tok.loc),
                },
                None => (None, self.peek().loc),
            };
            let decl = self.ctx().alloc_decl(Decl::new(
                sym,
                loc,
                ty,
                Storage::empty(),
                DeclKind::Object,
            ));
            let decl = self.scopes.declare(decl, self.sema.interner)?;
            params.push(decl);
            if !self.test(TokenKind::Comma) {
                break;
            }
        }
        self.scopes.leave();
        self.expect(TokenKind::RParen)?;
        Ok(QualType::unqual(
            self.ctx().func_type(ret, params, variadic, false),
        ))
    }

    /// type-name: specifier-qualifier-list with an optional abstract
    /// declarator; used by casts and `sizeof`.
    pub(crate) fn type_name(&mut self) -> PResult<QualType<'a>> {
        let base = self.type_specifier(None)?;
        match self.peek().kind {
            TokenKind::Star | TokenKind::LParen | TokenKind::LBracket => {
                self.abstract_declarator(base)
            }
            _ => Ok(base),
        }
    }

    fn abstract_declarator(&mut self, base: QualType<'a>) -> PResult<QualType<'a>> {
        let mut ty = base;
        let name = self.try_declarator(&mut ty)?;
        if let Some(tok) = name {
            return Err(self.unexpected(&tok, "an abstract declarator"));
        }
        Ok(ty)
    }

    // ---- declarations with initializers ---------------------------

    /// A full declaration inside a block or a `for` head. Returns the
    /// declared entities; a bare tag declaration returns none.
    pub(crate) fn declaration(&mut self) -> PResult<Vec<&'a Decl<'a>>> {
        let mut storage = Storage::empty();
        let base = self.decl_specifiers(&mut storage)?;
        if let Some(tok) = self.want(TokenKind::Semicolon) {
            if !matches!(base.get(), Type::Struct(_) | Type::Enum(_)) {
                return Err(Diag::new(
                    ErrorKind::BadDeclarator,
                    tok.loc,
                    "declaration does not declare anything",
                ));
            }
            return Ok(Vec::new());
        }
        let decls = self.init_declarators(storage, base)?;
        self.expect(TokenKind::Semicolon)?;
        Ok(decls)
    }

    /// init-declarator-list after the first declarator's comma (or from
    /// the start, in block declarations).
    pub(crate) fn init_declarators(
        &mut self,
        storage: Storage,
        base: QualType<'a>,
    ) -> PResult<Vec<&'a Decl<'a>>> {
        let mut out = Vec::new();
        loop {
            let mut ty = self.fresh_base(base);
            let name = self.try_declarator(&mut ty)?;
            let Some(name_tok) = name else {
                let tok = self.peek();
                return Err(self.unexpected(&tok, "a declarator name"));
            };
            out.push(self.finish_init_declarator(name_tok, ty, storage)?);
            if !self.test(TokenKind::Comma) {
                break;
            }
        }
        Ok(out)
    }

    /// Attach an optional initializer and declare. Initializing first
    /// lets an unknown array bound complete before the declaration is
    /// checked against any earlier one.
    pub(crate) fn finish_init_declarator(
        &mut self,
        name_tok: Token,
        ty: QualType<'a>,
        storage: Storage,
    ) -> PResult<&'a Decl<'a>> {
        let inits = if let Some(eq) = self.want(TokenKind::Assign) {
            if storage.contains(Storage::TYPEDEF) {
                return Err(Diag::new(
                    ErrorKind::BadInitializer,
                    eq.loc,
                    "a typedef cannot have an initializer",
                ));
            }
            Some(self.initializer(ty)?)
        } else {
            None
        };
        let decl = self.declare_object(name_tok, ty, storage)?;
        if let Some(inits) = inits {
            if decl.has_init() {
                return Err(Diag::new(
                    ErrorKind::Redefinition,
                    name_tok.loc,
                    format!("redefinition of '{}'", self.describe(&name_tok)),
                ));
            }
            decl.set_init(inits);
        }
        Ok(decl)
    }

    pub(crate) fn declare_object(
        &mut self,
        name_tok: Token,
        ty: QualType<'a>,
        storage: Storage,
    ) -> PResult<&'a Decl<'a>> {
        let TokenKind::Ident(sym) = name_tok.kind else {
            return Err(self.unexpected(&name_tok, "a declarator name"));
        };
        let kind = match ty.get().as_func() {
            Some(f) => DeclKind::Func(FuncDecl::new(f.params.clone())),
            None => DeclKind::Object,
        };
        let decl = self
            .ctx()
            .alloc_decl(Decl::new(Some(sym), name_tok.loc, ty, storage, kind));
        self.scopes.declare(decl, self.sema.interner)
    }

    // ---- initializers ---------------------------------------------

    /// initializer: a converted assignment-expression for scalars, a
    /// brace list for aggregates, or a string literal for a char array.
    pub(crate) fn initializer(&mut self, ty: QualType<'a>) -> PResult<Vec<&'a Expr<'a>>> {
        let tok = self.next();
        if tok.kind == TokenKind::LBrace {
            return match ty.get() {
                Type::Array(a) => self.array_initializer(tok, ty, a),
                Type::Struct(st) => self.struct_initializer(tok, ty, st),
                _ => Err(Diag::new(
                    ErrorKind::BadInitializer,
                    tok.loc,
                    format!(
                        "braced initializer for non-aggregate type '{}'",
                        ty.to_string(self.sema.interner)
                    ),
                )),
            };
        }
        if let TokenKind::Str { sym, wide } = tok.kind {
            if let Type::Array(a) = ty.get() {
                return self.string_initializer(tok, ty, a, sym, wide);
            }
        }
        self.unget(tok);
        let expr = self.assignment_expr()?;
        Ok(vec![self.sema.convert(expr, ty)?])
    }

    /// A string literal initializing a character array. An unknown
    /// bound becomes string length + 1; a known bound must leave room
    /// for the terminator.
    fn string_initializer(
        &mut self,
        tok: Token,
        ty: QualType<'a>,
        a: &'a ArrayType<'a>,
        sym: crate::intern::Symbol,
        wide: bool,
    ) -> PResult<Vec<&'a Expr<'a>>> {
        let elem_ok = if wide {
            a.elem.get().is_integer()
        } else {
            a.elem.get().is_char()
        };
        if !elem_ok {
            return Err(Diag::new(
                ErrorKind::BadInitializer,
                tok.loc,
                format!(
                    "cannot initialize '{}' with a string literal",
                    ty.to_string(self.sema.interner)
                ),
            ));
        }
        let text = self.sema.interner.resolve(sym);
        let len = if wide {
            text.chars().count() as u64
        } else {
            text.len() as u64
        };
        match a.bound() {
            Some(bound) if bound <= len => {
                return Err(Diag::new(
                    ErrorKind::ExcessInitializer,
                    tok.loc,
                    format!(
                        "initializer string is too long for '{}'",
                        ty.to_string(self.sema.interner)
                    ),
                ));
            }
            None => a.set_bound(len + 1),
            _ => {}
        }
        Ok(vec![self.sema.make_string(tok.loc, sym, wide)])
    }

    /// Brace-enclosed array initializer with `[index]` designators.
    /// Elements are flattened in order; skipped and missing trailing
    /// positions are zero-filled; an unknown bound is inherited from
    /// the element count.
    fn array_initializer(
        &mut self,
        open: Token,
        ty: QualType<'a>,
        a: &'a ArrayType<'a>,
    ) -> PResult<Vec<&'a Expr<'a>>> {
        let elem = a.elem;
        let mut items: Vec<&'a Expr<'a>> = Vec::new();
        let mut index: u64 = 0;
        loop {
            if self.test(TokenKind::RBrace) {
                break;
            }
            if let Some(dot) = self.want(TokenKind::Dot) {
                return Err(Diag::new(
                    ErrorKind::BadInitializer,
                    dot.loc,
                    "member designator in an array initializer",
                ));
            }
            if self.test(TokenKind::LBracket) {
                let expr = self.conditional_expr()?;
                let n = eval_long(expr)?;
                self.expect(TokenKind::RBracket)?;
                self.expect(TokenKind::Assign)?;
                if n < 0 || (n as u64) < index {
                    return Err(Diag::new(
                        ErrorKind::BadInitializer,
                        expr.loc,
                        "array designator goes backwards",
                    ));
                }
                while index < n as u64 {
                    items.push(self.sema.zero_literal(expr.loc, elem));
                    index += 1;
                }
            }
            items.extend(self.initializer(elem)?);
            index += 1;
            if !self.test(TokenKind::Comma) {
                self.expect(TokenKind::RBrace)?;
                break;
            }
        }
        match a.bound() {
            None => a.set_bound(index),
            Some(bound) if bound < index => {
                return Err(Diag::new(
                    ErrorKind::ExcessInitializer,
                    open.loc,
                    format!(
                        "too many initializers for '{}'",
                        ty.to_string(self.sema.interner)
                    ),
                ));
            }
            Some(bound) => {
                while index < bound {
                    items.push(self.sema.zero_literal(open.loc, elem));
                    index += 1;
                }
            }
        }
        Ok(items)
    }

    /// Brace-enclosed struct/union initializer with `.member`
    /// designators. Members are gathered into per-member slots so a
    /// designator can jump, then flattened in member order with
    /// zero-fill for anything left unset.
    fn struct_initializer(
        &mut self,
        open: Token,
        ty: QualType<'a>,
        st: &'a StructType<'a>,
    ) -> PResult<Vec<&'a Expr<'a>>> {
        if !st.is_complete() {
            return Err(Diag::new(
                ErrorKind::IncompleteType,
                open.loc,
                format!(
                    "initializer for incomplete type '{}'",
                    ty.to_string(self.sema.interner)
                ),
            ));
        }
        let members = st.members().unwrap_or_default();
        let mut slots: Vec<Option<Vec<&'a Expr<'a>>>> = vec![None; members.len()];
        let mut cursor = 0usize;
        loop {
            if self.test(TokenKind::RBrace) {
                break;
            }
            if self.test(TokenKind::Dot) {
                let mtok = self.next();
                let TokenKind::Ident(sym) = mtok.kind else {
                    return Err(self.unexpected(&mtok, "a member name"));
                };
                let Some(idx) = members.iter().position(|m| m.name == Some(sym)) else {
                    return Err(Diag::new(
                        ErrorKind::NotAMember,
                        mtok.loc,
                        format!(
                            "'{}' is not a member of '{}'",
                            self.sema.interner.resolve(sym),
                            ty.to_string(self.sema.interner)
                        ),
                    ));
                };
                cursor = idx;
                self.expect(TokenKind::Assign)?;
            }
            if cursor >= members.len() {
                let tok = self.peek();
                return Err(Diag::new(
                    ErrorKind::ExcessInitializer,
                    tok.loc,
                    format!(
                        "too many initializers for '{}'",
                        ty.to_string(self.sema.interner)
                    ),
                ));
            }
            slots[cursor] = Some(self.initializer(members[cursor].ty())?);
            cursor += 1;
            if !self.test(TokenKind::Comma) {
                self.expect(TokenKind::RBrace)?;
                break;
            }
        }
        let mut items = Vec::new();
        for (i, member) in members.iter().enumerate() {
            match slots[i].take() {
                Some(exprs) => items.extend(exprs),
                None => items.push(self.sema.zero_literal(open.loc, member.ty())),
            }
        }
        Ok(items)
    }

    // ---- function definitions -------------------------------------

    /// A function definition; the opening `{` has been consumed. A
    /// prior prototype is completed; parameters are re-bound in the
    /// body's block scope (whose parent is file scope); forward gotos
    /// resolve against the per-function label map when the body ends.
    pub(crate) fn function_definition(
        &mut self,
        name_tok: Token,
        ty: QualType<'a>,
        storage: Storage,
    ) -> PResult<&'a Decl<'a>> {
        let TokenKind::Ident(sym) = name_tok.kind else {
            return Err(self.unexpected(&name_tok, "a function name"));
        };
        let Some(func_ty) = ty.get().as_func() else {
            return Err(Diag::new(
                ErrorKind::BadDeclarator,
                name_tok.loc,
                "expected a function declarator",
            ));
        };

        let decl = match self.scopes.find(sym, false) {
            Some(existing) => {
                let Some(fd) = existing.as_func() else {
                    return Err(Diag::new(
                        ErrorKind::Redeclaration,
                        name_tok.loc,
                        format!(
                            "'{}' was not declared as a function",
                            self.sema.interner.resolve(sym)
                        ),
                    ));
                };
                if fd.body().is_some() {
                    return Err(Diag::new(
                        ErrorKind::Redefinition,
                        name_tok.loc,
                        format!(
                            "redefinition of '{}'",
                            self.sema.interner.resolve(sym)
                        ),
                    ));
                }
                if !existing.ty().is_compatible(ty) {
                    return Err(Diag::new(
                        ErrorKind::Redeclaration,
                        name_tok.loc,
                        format!(
                            "conflicting signature for '{}'",
                            self.sema.interner.resolve(sym)
                        ),
                    ));
                }
                // the definition's declarator wins: named parameters
                existing.set_ty(ty);
                fd.set_params(func_ty.params.clone());
                existing
            }
            None => self.declare_object(name_tok, ty, storage)?,
        };

        self.ret_ty = Some(func_ty.ret);
        self.labels.clear();
        self.pending_gotos.clear();

        let body = self.compound_stmt(Some(ty))?;

        for (label_sym, loc, jump) in std::mem::take(&mut self.pending_gotos) {
            match self.labels.get(&label_sym) {
                Some(label) => jump.resolve(label),
                None => {
                    return Err(Diag::new(
                        ErrorKind::UnresolvedLabel,
                        loc,
                        format!(
                            "unresolved label '{}'",
                            self.sema.interner.resolve(label_sym)
                        ),
                    ))
                }
            }
        }
        self.labels.clear();
        self.ret_ty = None;

        if let Some(fd) = decl.as_func() {
            fd.set_body(body);
        }
        Ok(decl)
    }
}

fn multiple_types(loc: crate::stream::SourceLoc) -> Diag {
    Diag::new(
        ErrorKind::BadSpecifier,
        loc,
        "multiple data type specification",
    )
}
