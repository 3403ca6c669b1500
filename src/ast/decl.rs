//! Declarations.

use crate::ast::{Expr, Stmt};
use crate::intern::Symbol;
use crate::stream::SourceLoc;
use crate::types::{QualType, Storage};
use std::cell::{Cell, Ref, RefCell};

#[derive(Debug)]
pub enum DeclKind<'a> {
    /// An object, a typedef name, or a struct/union/enum tag entry.
    Object,
    Func(FuncDecl<'a>),
    /// An enumeration constant with its folded value.
    EnumConst(i64),
}

#[derive(Debug)]
pub struct FuncDecl<'a> {
    params: RefCell<Vec<&'a Decl<'a>>>,
    body: RefCell<Option<&'a Stmt<'a>>>,
}

impl<'a> FuncDecl<'a> {
    pub fn new(params: Vec<&'a Decl<'a>>) -> Self {
        FuncDecl {
            params: RefCell::new(params),
            body: RefCell::new(None),
        }
    }

    pub fn params(&self) -> Vec<&'a Decl<'a>> {
        self.params.borrow().clone()
    }

    /// A definition may rename the parameters of an earlier prototype.
    pub fn set_params(&self, params: Vec<&'a Decl<'a>>) {
        *self.params.borrow_mut() = params;
    }

    pub fn body(&self) -> Option<&'a Stmt<'a>> {
        *self.body.borrow()
    }

    pub fn set_body(&self, body: &'a Stmt<'a>) {
        *self.body.borrow_mut() = Some(body);
    }
}

/// A declared entity. The name is the intern of the defining token's
/// content; anonymous entities (abstract parameters, unnamed
/// bit-fields) carry `None`.
#[derive(Debug)]
pub struct Decl<'a> {
    pub name: Option<Symbol>,
    pub loc: SourceLoc,
    ty: Cell<QualType<'a>>,
    pub storage: Storage,
    init: RefCell<Option<Vec<&'a Expr<'a>>>>,
    pub kind: DeclKind<'a>,
}

impl<'a> Decl<'a> {
    pub fn new(
        name: Option<Symbol>,
        loc: SourceLoc,
        ty: QualType<'a>,
        storage: Storage,
        kind: DeclKind<'a>,
    ) -> Self {
        Decl {
            name,
            loc,
            ty: Cell::new(ty),
            storage,
            init: RefCell::new(None),
            kind,
        }
    }

    pub fn ty(&self) -> QualType<'a> {
        self.ty.get()
    }

    /// A function definition may complete the type of an earlier
    /// prototype (named parameters, completed arrays).
    pub fn set_ty(&self, ty: QualType<'a>) {
        self.ty.set(ty);
    }

    pub fn is_typedef(&self) -> bool {
        self.storage.contains(Storage::TYPEDEF)
    }

    pub fn is_register(&self) -> bool {
        self.storage.contains(Storage::REGISTER)
    }

    pub fn has_init(&self) -> bool {
        self.init.borrow().is_some()
    }

    pub fn init(&self) -> Ref<'_, Option<Vec<&'a Expr<'a>>>> {
        self.init.borrow()
    }

    pub fn set_init(&self, exprs: Vec<&'a Expr<'a>>) {
        *self.init.borrow_mut() = Some(exprs);
    }

    pub fn as_func(&self) -> Option<&FuncDecl<'a>> {
        match &self.kind {
            DeclKind::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn enum_value(&self) -> Option<i64> {
        match self.kind {
            DeclKind::EnumConst(v) => Some(v),
            _ => None,
        }
    }
}
