//! Lexically nested symbol tables.
//!
//! Scopes form a tree rooted at the file scope; the parser's cursor
//! advances and retreats with block entry and exit. Ordinary
//! identifiers and struct/union/enum tags live in disjoint namespaces.

use crate::ast::Decl;
use crate::diag::{Diag, ErrorKind, PResult};
use crate::intern::{Interner, Symbol};
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct ScopeId(usize);

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ScopeKind {
    File,
    Function,
    Block,
    /// Holds a function declarator's parameter names; dies at the
    /// closing `)`.
    Proto,
}

struct Scope<'a> {
    kind: ScopeKind,
    parent: Option<ScopeId>,
    names: HashMap<Symbol, &'a Decl<'a>>,
    tags: HashMap<Symbol, &'a Decl<'a>>,
}

pub struct ScopeTree<'a> {
    scopes: Vec<Scope<'a>>,
    current: ScopeId,
}

impl<'a> ScopeTree<'a> {
    pub fn new() -> Self {
        ScopeTree {
            scopes: vec![Scope {
                kind: ScopeKind::File,
                parent: None,
                names: HashMap::new(),
                tags: HashMap::new(),
            }],
            current: ScopeId(0),
        }
    }

    pub fn enter(&mut self, kind: ScopeKind) -> ScopeId {
        let id = ScopeId(self.scopes.len());
        self.scopes.push(Scope {
            kind,
            parent: Some(self.current),
            names: HashMap::new(),
            tags: HashMap::new(),
        });
        self.current = id;
        id
    }

    pub fn leave(&mut self) {
        if let Some(parent) = self.scopes[self.current.0].parent {
            self.current = parent;
        }
    }

    pub fn current(&self) -> ScopeId {
        self.current
    }

    pub fn kind(&self) -> ScopeKind {
        self.scopes[self.current.0].kind
    }

    pub fn is(&self, kind: ScopeKind) -> bool {
        self.kind() == kind
    }

    pub fn find(&self, name: Symbol, recursive: bool) -> Option<&'a Decl<'a>> {
        self.lookup(name, recursive, false)
    }

    pub fn find_tag(&self, name: Symbol, recursive: bool) -> Option<&'a Decl<'a>> {
        self.lookup(name, recursive, true)
    }

    fn lookup(&self, name: Symbol, recursive: bool, tags: bool) -> Option<&'a Decl<'a>> {
        let mut id = Some(self.current);
        while let Some(i) = id {
            let scope = &self.scopes[i.0];
            let table = if tags { &scope.tags } else { &scope.names };
            if let Some(&decl) = table.get(&name) {
                return Some(decl);
            }
            if !recursive {
                return None;
            }
            id = scope.parent;
        }
        None
    }

    /// Declare into the current scope. A redeclaration whose type is
    /// compatible with the existing entity resolves to that entity
    /// (file-scope objects and functions anywhere); any other duplicate
    /// in the same scope is fatal. Shadowing in inner scopes is
    /// ordinary insertion.
    pub fn declare(
        &mut self,
        decl: &'a Decl<'a>,
        interner: &Interner,
    ) -> PResult<&'a Decl<'a>> {
        let Some(name) = decl.name else {
            return Ok(decl);
        };
        let kind = self.kind();
        let scope = &mut self.scopes[self.current.0];
        if let Some(&existing) = scope.names.get(&name) {
            let entities = decl.enum_value().is_none() && existing.enum_value().is_none();
            let redeclarable = kind == ScopeKind::File || decl.ty().get().is_func();
            if entities
                && redeclarable
                && decl.is_typedef() == existing.is_typedef()
                && existing.ty().is_compatible(decl.ty())
            {
                return Ok(existing);
            }
            return if existing.ty().is_compatible(decl.ty()) {
                Err(Diag::new(
                    ErrorKind::Redefinition,
                    decl.loc,
                    format!("redefinition of '{}'", interner.resolve(name)),
                ))
            } else {
                Err(Diag::new(
                    ErrorKind::Redeclaration,
                    decl.loc,
                    format!(
                        "redeclaration of '{}' with a different type",
                        interner.resolve(name)
                    ),
                ))
            };
        }
        scope.names.insert(name, decl);
        Ok(decl)
    }

    /// Declare a struct/union/enum tag in the current scope.
    pub fn declare_tag(&mut self, decl: &'a Decl<'a>, interner: &Interner) -> PResult<()> {
        let Some(name) = decl.name else {
            return Ok(());
        };
        let scope = &mut self.scopes[self.current.0];
        if scope.tags.contains_key(&name) {
            return Err(Diag::new(
                ErrorKind::Redefinition,
                decl.loc,
                format!("redefinition of tag '{}'", interner.resolve(name)),
            ));
        }
        scope.tags.insert(name, decl);
        Ok(())
    }

    /// Insert without duplicate checking; used to re-bind prototype
    /// parameters into a function body's scope.
    pub fn insert(&mut self, decl: &'a Decl<'a>) {
        if let Some(name) = decl.name {
            self.scopes[self.current.0].names.insert(name, decl);
        }
    }
}

impl<'a> Default for ScopeTree<'a> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arena::Arena;
    use crate::ast::{Decl, DeclKind};
    use crate::stream::SourceLoc;
    use crate::types::{QualType, Spec, Storage, Type};

    fn decl<'a>(
        arena: &'a Arena<Decl<'a>>,
        ty: &'a Type<'a>,
        name: Symbol,
    ) -> &'a Decl<'a> {
        arena.alloc(Decl::new(
            Some(name),
            SourceLoc::default(),
            QualType::unqual(ty),
            Storage::empty(),
            DeclKind::Object,
        ))
    }

    #[test]
    fn find_walks_outward() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let mut tree = ScopeTree::new();
        tree.declare(decl(&decls, int_ty, x), &interner).unwrap();
        tree.enter(ScopeKind::Block);
        assert!(tree.find(x, true).is_some());
        assert!(tree.find(x, false).is_none());
        tree.leave();
        assert!(tree.find(x, false).is_some());
    }

    #[test]
    fn shadowing_in_inner_scope_is_allowed() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let long_ty = types.alloc(Type::Number(Spec::LONG));
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let mut tree = ScopeTree::new();
        let outer = decl(&decls, int_ty, x);
        tree.declare(outer, &interner).unwrap();
        tree.enter(ScopeKind::Block);
        let inner = decl(&decls, long_ty, x);
        tree.declare(inner, &interner).unwrap();
        let found = tree.find(x, true).unwrap();
        assert!(std::ptr::eq(found, inner));
    }

    #[test]
    fn compatible_file_scope_redeclaration_resolves_to_first() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let mut tree = ScopeTree::new();
        let first = tree.declare(decl(&decls, int_ty, x), &interner).unwrap();
        let second = tree.declare(decl(&decls, int_ty, x), &interner).unwrap();
        assert!(std::ptr::eq(first, second));
    }

    #[test]
    fn conflicting_redeclaration_is_fatal() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let float_ty = types.alloc(Type::Number(Spec::FLOAT));
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let mut tree = ScopeTree::new();
        tree.declare(decl(&decls, int_ty, x), &interner).unwrap();
        let err = tree.declare(decl(&decls, float_ty, x), &interner).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Redeclaration);
    }

    #[test]
    fn block_scope_duplicate_is_fatal_even_when_compatible() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let mut interner = Interner::new();
        let x = interner.intern("x");

        let mut tree = ScopeTree::new();
        tree.enter(ScopeKind::Block);
        tree.declare(decl(&decls, int_ty, x), &interner).unwrap();
        let err = tree.declare(decl(&decls, int_ty, x), &interner).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Redefinition);
    }

    #[test]
    fn tags_do_not_collide_with_ordinary_names() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let mut interner = Interner::new();
        let s = interner.intern("s");

        let mut tree = ScopeTree::new();
        tree.declare(decl(&decls, int_ty, s), &interner).unwrap();
        tree.declare_tag(decl(&decls, int_ty, s), &interner).unwrap();
        assert!(tree.find(s, true).is_some());
        assert!(tree.find_tag(s, true).is_some());
    }

    #[test]
    fn proto_scope_dies_at_leave() {
        let types: Arena<Type> = Arena::new();
        let decls: Arena<Decl> = Arena::new();
        let int_ty = types.alloc(Type::Number(Spec::INT));
        let mut interner = Interner::new();
        let p = interner.intern("p");

        let mut tree = ScopeTree::new();
        tree.enter(ScopeKind::Proto);
        assert!(tree.is(ScopeKind::Proto));
        tree.declare(decl(&decls, int_ty, p), &interner).unwrap();
        tree.leave();
        assert!(tree.is(ScopeKind::File));
        assert!(tree.find(p, true).is_none());
    }
}
