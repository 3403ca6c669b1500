//! The C99 type system.
//!
//! `Type` is a tagged sum allocated in the type arena; `QualType` is
//! the plain `(type, qualifiers)` pair handed around by value.
//! Specifier, qualifier and storage-class sets are bit-sets whose
//! combination rules are encoded as compatibility masks.

use crate::arena_ctx::AstContext;
use crate::ast::Decl;
use crate::diag::{Diag, Diagnostics, ErrorKind, PResult};
use crate::intern::Interner;
use crate::stream::SourceLoc;
use bitflags::bitflags;
use std::cell::{Cell, RefCell};

bitflags! {
    /// Type specifier set accumulated while parsing a
    /// declaration-specifier sequence.
    #[derive(Clone, Copy, PartialEq, Eq, Debug)]
    pub struct Spec: u32 {
        const VOID     = 1 << 0;
        const BOOL     = 1 << 1;
        const CHAR     = 1 << 2;
        const SHORT    = 1 << 3;
        const INT      = 1 << 4;
        const LONG     = 1 << 5;
        const LLONG    = 1 << 6;
        const FLOAT    = 1 << 7;
        const DOUBLE   = 1 << 8;
        const COMPLEX  = 1 << 9;
        const UNSIGNED = 1 << 10;
        const SIGNED   = 1 << 11;

        const SIGN = Self::SIGNED.bits() | Self::UNSIGNED.bits();
        const INTEGER = Self::BOOL.bits()
            | Self::CHAR.bits()
            | Self::SHORT.bits()
            | Self::INT.bits()
            | Self::LONG.bits()
            | Self::LLONG.bits()
            | Self::SIGN.bits();
        const FLOATING = Self::FLOAT.bits() | Self::DOUBLE.bits();
    }
}

bitflags! {
    /// `{const, volatile, restrict}`.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Qual: u8 {
        const CONST    = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

bitflags! {
    /// Storage-class specifiers. `static` and `inline` are the only
    /// compatible pair.
    #[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
    pub struct Storage: u8 {
        const TYPEDEF  = 1 << 0;
        const STATIC   = 1 << 1;
        const INLINE   = 1 << 2;
        const REGISTER = 1 << 3;
        const EXTERN   = 1 << 4;
        const AUTO     = 1 << 5;
    }
}

pub const SIZE_BOOL: u64 = 1;
pub const SIZE_CHAR: u64 = 1;
pub const SIZE_SHORT: u64 = 2;
pub const SIZE_INT: u64 = 4;
pub const SIZE_LONG: u64 = 4;
pub const SIZE_LLONG: u64 = 8;
pub const SIZE_FLOAT: u64 = 4;
pub const SIZE_DOUBLE: u64 = 8;
pub const SIZE_LDOUBLE: u64 = 8;
pub const SIZE_POINTER: u64 = 4;

/// Words of a specifier set, sign first.
pub fn spec_to_string(spec: Spec) -> String {
    const WORDS: &[(Spec, &str)] = &[
        (Spec::SIGNED, "signed"),
        (Spec::UNSIGNED, "unsigned"),
        (Spec::VOID, "void"),
        (Spec::BOOL, "_Bool"),
        (Spec::CHAR, "char"),
        (Spec::SHORT, "short"),
        (Spec::LLONG, "long long"),
        (Spec::LONG, "long"),
        (Spec::INT, "int"),
        (Spec::FLOAT, "float"),
        (Spec::DOUBLE, "double"),
        (Spec::COMPLEX, "_Complex"),
    ];
    let mut out = String::new();
    for &(bit, word) in WORDS {
        if spec.contains(bit) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

pub fn qual_to_string(qual: Qual) -> String {
    let mut out = String::new();
    for (bit, word) in [
        (Qual::CONST, "const"),
        (Qual::VOLATILE, "volatile"),
        (Qual::RESTRICT, "restrict"),
    ] {
        if qual.contains(bit) {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(word);
        }
    }
    out
}

pub fn storage_to_string(stor: Storage) -> &'static str {
    if stor.contains(Storage::TYPEDEF) {
        "typedef"
    } else if stor.contains(Storage::STATIC) {
        "static"
    } else if stor.contains(Storage::INLINE) {
        "inline"
    } else if stor.contains(Storage::REGISTER) {
        "register"
    } else if stor.contains(Storage::EXTERN) {
        "extern"
    } else {
        "auto"
    }
}

/// C99 6.7.2: which specifiers may accompany each specifier.
fn spec_compat_mask(spec: Spec) -> Spec {
    if spec == Spec::CHAR {
        Spec::SIGN
    } else if spec == Spec::SHORT {
        Spec::SIGN.union(Spec::INT)
    } else if spec == Spec::INT {
        Spec::SIGN
            .union(Spec::SHORT)
            .union(Spec::LONG)
            .union(Spec::LLONG)
    } else if spec == Spec::LONG {
        Spec::SIGN.union(Spec::LONG).union(Spec::INT)
    } else if spec == Spec::LLONG {
        Spec::SIGN.union(Spec::INT)
    } else if spec == Spec::FLOAT {
        Spec::COMPLEX
    } else if spec == Spec::DOUBLE {
        Spec::LONG.union(Spec::COMPLEX)
    } else if spec == Spec::COMPLEX {
        Spec::FLOAT.union(Spec::DOUBLE).union(Spec::LONG)
    } else if spec == Spec::UNSIGNED || spec == Spec::SIGNED {
        Spec::CHAR
            .union(Spec::SHORT)
            .union(Spec::INT)
            .union(Spec::LONG)
            .union(Spec::LLONG)
    } else {
        // void, _Bool, and anything else combine with nothing
        Spec::empty()
    }
}

/// Fold one more specifier into the accumulated set. `long long` is
/// produced by a second `long`; any other illegal combination is fatal.
pub fn add_specifier(acc: Spec, new: Spec, loc: SourceLoc) -> PResult<Spec> {
    if acc.intersects(!spec_compat_mask(new)) {
        return Err(Diag::new(
            ErrorKind::BadSpecifier,
            loc,
            format!(
                "cannot combine '{}' with '{}'",
                spec_to_string(new),
                spec_to_string(acc)
            ),
        ));
    }
    if acc.contains(Spec::LONG) && new.contains(Spec::LONG) {
        Ok(acc.difference(Spec::LONG).union(Spec::LLONG))
    } else {
        Ok(acc.union(new))
    }
}

/// C99 6.7.3: a duplicate qualifier behaves as if it appeared once, but
/// deserves a warning.
pub fn add_qualifier(acc: Qual, new: Qual, loc: SourceLoc, diags: &mut Diagnostics) -> Qual {
    if acc.intersects(new) {
        diags.warn(Diag::new(
            ErrorKind::BadSpecifier,
            loc,
            format!("duplicate qualifier '{}'", qual_to_string(new)),
        ));
    }
    acc.union(new)
}

fn storage_compat_mask(stor: Storage) -> Storage {
    if stor == Storage::STATIC {
        Storage::INLINE
    } else if stor == Storage::INLINE {
        Storage::STATIC
    } else {
        Storage::empty()
    }
}

/// Only `static` and `inline` may combine; `register` is accepted with
/// a deprecation warning.
pub fn add_storage_class(
    acc: Storage,
    new: Storage,
    loc: SourceLoc,
    diags: &mut Diagnostics,
) -> PResult<Storage> {
    if acc.intersects(!storage_compat_mask(new)) {
        return Err(Diag::new(
            ErrorKind::BadStorageClass,
            loc,
            format!(
                "cannot apply storage class '{}' to previous '{}'",
                storage_to_string(new),
                storage_to_string(acc)
            ),
        ));
    }
    if new.contains(Storage::REGISTER) {
        diags.warn(Diag::new(
            ErrorKind::BadStorageClass,
            loc,
            "storage class 'register' is deprecated and has no effect",
        ));
    }
    Ok(acc.union(new))
}

/// Reduce a legal specifier set to one of the fifteen canonical
/// arithmetic types. `None` means the combination does not name an
/// arithmetic type (for instance `_Complex` alone, or `void`).
pub fn canonical(spec: Spec) -> Option<Spec> {
    let mut s = spec;
    if s.intersects(Spec::COMPLEX) || s.contains(Spec::VOID) {
        return None;
    }
    // `short int`, `long int`, `long long int` drop the `int`
    if s.intersects(Spec::SHORT.union(Spec::LONG).union(Spec::LLONG)) && !s.contains(Spec::DOUBLE) {
        s.remove(Spec::INT);
    }
    // bare `signed` / `unsigned` mean `int`
    if s == Spec::SIGNED || s == Spec::UNSIGNED || s.is_empty() {
        s.insert(Spec::INT);
    }
    // `signed` is redundant except on `char`
    if s != Spec::SIGNED.union(Spec::CHAR) {
        s.remove(Spec::SIGNED);
    }
    let ok = matches!(
        s.difference(Spec::UNSIGNED),
        x if x == Spec::BOOL
            || x == Spec::CHAR
            || x == Spec::SHORT
            || x == Spec::INT
            || x == Spec::LONG
            || x == Spec::LLONG
    ) || s == Spec::SIGNED.union(Spec::CHAR)
        || s == Spec::FLOAT
        || s == Spec::DOUBLE
        || s == Spec::LONG.union(Spec::DOUBLE);
    // unsigned floating types do not exist
    if s.contains(Spec::UNSIGNED) && s.intersects(Spec::FLOATING) {
        return None;
    }
    if ok {
        Some(s)
    } else {
        None
    }
}

/// Integer conversion rank: the specifier bits with the sign stripped.
/// Bit order makes the numeric comparison match C99 6.3.1.1.
pub fn rank(spec: Spec) -> u32 {
    spec.difference(Spec::SIGN).bits()
}

pub fn size_of_spec(spec: Spec) -> u64 {
    let s = spec.difference(Spec::SIGN);
    if s == Spec::BOOL {
        SIZE_BOOL
    } else if s == Spec::CHAR {
        SIZE_CHAR
    } else if s == Spec::SHORT {
        SIZE_SHORT
    } else if s == Spec::INT || s.is_empty() {
        SIZE_INT
    } else if s == Spec::LONG {
        SIZE_LONG
    } else if s == Spec::LLONG {
        SIZE_LLONG
    } else if s == Spec::FLOAT {
        SIZE_FLOAT
    } else if s == Spec::DOUBLE {
        SIZE_DOUBLE
    } else {
        // long double
        SIZE_LDOUBLE
    }
}

/// C99 6.3.1.1 integer promotion on a canonical specifier set. Types
/// whose values all fit in `int` go to `int`; `unsigned int` stays
/// itself; everything of higher rank is unchanged.
pub fn promote_spec(spec: Spec) -> Spec {
    if !spec.intersects(Spec::INTEGER) && !spec.is_empty() {
        return spec;
    }
    if spec.intersects(Spec::FLOATING) {
        return spec;
    }
    let int_rank = rank(Spec::INT);
    if rank(spec) < int_rank {
        Spec::INT
    } else {
        spec
    }
}

/// C99 6.3.1.8 usual arithmetic conversion over canonical specifier
/// sets.
pub fn usual_arith_spec(a: Spec, b: Spec) -> Spec {
    let ldouble = Spec::LONG.union(Spec::DOUBLE);
    if a == ldouble || b == ldouble {
        return ldouble;
    }
    if a == Spec::DOUBLE || b == Spec::DOUBLE {
        return Spec::DOUBLE;
    }
    if a == Spec::FLOAT || b == Spec::FLOAT {
        return Spec::FLOAT;
    }
    let pa = promote_spec(a);
    let pb = promote_spec(b);
    if pa == pb {
        return pa;
    }
    let (ra, rb) = (rank(pa), rank(pb));
    let (ua, ub) = (pa.contains(Spec::UNSIGNED), pb.contains(Spec::UNSIGNED));
    if ua == ub {
        return if ra >= rb { pa } else { pb };
    }
    let (uns, sig) = if ua { (pa, pb) } else { (pb, pa) };
    if rank(uns) >= rank(sig) {
        uns
    } else if size_of_spec(sig) > size_of_spec(uns) {
        sig
    } else {
        sig.union(Spec::UNSIGNED)
    }
}

#[derive(Debug)]
pub struct ArrayType<'a> {
    pub elem: QualType<'a>,
    bound: Cell<Option<u64>>,
}

impl<'a> ArrayType<'a> {
    pub fn new(elem: QualType<'a>, bound: Option<u64>) -> Self {
        ArrayType {
            elem,
            bound: Cell::new(bound),
        }
    }

    pub fn bound(&self) -> Option<u64> {
        self.bound.get()
    }

    /// Complete an unknown bound from an initializer. Completion is
    /// monotonic; a known bound is never replaced.
    pub fn set_bound(&self, bound: u64) {
        if self.bound.get().is_none() {
            self.bound.set(Some(bound));
        }
    }
}

#[derive(Debug)]
pub struct StructType<'a> {
    pub tag: Option<crate::intern::Symbol>,
    pub is_union: bool,
    members: RefCell<Option<Vec<&'a Decl<'a>>>>,
}

impl<'a> StructType<'a> {
    pub fn new(tag: Option<crate::intern::Symbol>, is_union: bool) -> Self {
        StructType {
            tag,
            is_union,
            members: RefCell::new(None),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.members.borrow().is_some()
    }

    /// Attach the member list. Completion is monotonic; a second
    /// attachment is ignored (the parser rejects tag redefinition
    /// before it could happen).
    pub fn set_members(&self, members: Vec<&'a Decl<'a>>) {
        let mut slot = self.members.borrow_mut();
        if slot.is_none() {
            *slot = Some(members);
        }
    }

    pub fn members(&self) -> Option<Vec<&'a Decl<'a>>> {
        self.members.borrow().clone()
    }

    pub fn find_member(&self, name: crate::intern::Symbol) -> Option<&'a Decl<'a>> {
        self.members
            .borrow()
            .as_ref()?
            .iter()
            .copied()
            .find(|m| m.name == Some(name))
    }

    fn layout(&self) -> (u64, u64) {
        let members = self.members.borrow();
        let Some(members) = members.as_ref() else {
            return (0, 1);
        };
        let mut align = 1;
        let mut size = 0u64;
        for m in members.iter() {
            let mty = m.ty();
            let ma = mty.get().align().max(1);
            let ms = mty.get().size();
            align = align.max(ma);
            if self.is_union {
                size = size.max(ms);
            } else {
                size = round_up(size, ma).saturating_add(ms);
            }
        }
        (round_up(size, align), align)
    }
}

fn round_up(n: u64, align: u64) -> u64 {
    if align == 0 {
        return n;
    }
    n.div_ceil(align).saturating_mul(align)
}

#[derive(Debug)]
pub struct EnumType {
    pub tag: Option<crate::intern::Symbol>,
    complete: Cell<bool>,
}

impl EnumType {
    pub fn new(tag: Option<crate::intern::Symbol>) -> Self {
        EnumType {
            tag,
            complete: Cell::new(false),
        }
    }

    pub fn is_complete(&self) -> bool {
        self.complete.get()
    }

    pub fn set_complete(&self) {
        self.complete.set(true);
    }
}

#[derive(Debug)]
pub struct FuncType<'a> {
    pub ret: QualType<'a>,
    pub params: Vec<&'a Decl<'a>>,
    pub variadic: bool,
    /// The `f()` declarator form, compatible with any parameter list.
    pub unspecified: bool,
}

#[derive(Debug)]
pub enum Type<'a> {
    Void,
    Number(Spec),
    Pointer(QualType<'a>),
    Array(ArrayType<'a>),
    Struct(StructType<'a>),
    Enum(EnumType),
    Func(FuncType<'a>),
}

impl<'a> Type<'a> {
    pub fn number_spec(&self) -> Option<Spec> {
        match self {
            Type::Number(s) => Some(*s),
            _ => None,
        }
    }

    pub fn as_pointer(&self) -> Option<QualType<'a>> {
        match self {
            Type::Pointer(base) => Some(*base),
            _ => None,
        }
    }

    pub fn as_array(&self) -> Option<&ArrayType<'a>> {
        match self {
            Type::Array(a) => Some(a),
            _ => None,
        }
    }

    pub fn as_struct(&self) -> Option<&StructType<'a>> {
        match self {
            Type::Struct(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_enum(&self) -> Option<&EnumType> {
        match self {
            Type::Enum(e) => Some(e),
            _ => None,
        }
    }

    pub fn as_func(&self) -> Option<&FuncType<'a>> {
        match self {
            Type::Func(f) => Some(f),
            _ => None,
        }
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Void)
    }

    pub fn is_arith(&self) -> bool {
        matches!(self, Type::Number(_))
    }

    pub fn is_integer(&self) -> bool {
        match self {
            // `long double` carries the LONG bit, so floatness wins
            Type::Number(s) => s.intersects(Spec::INTEGER) && !s.intersects(Spec::FLOATING),
            _ => false,
        }
    }

    pub fn is_floating(&self) -> bool {
        match self {
            Type::Number(s) => s.intersects(Spec::FLOATING),
            _ => false,
        }
    }

    pub fn is_unsigned(&self) -> bool {
        match self {
            Type::Number(s) => s.contains(Spec::UNSIGNED),
            _ => false,
        }
    }

    pub fn is_char(&self) -> bool {
        match self {
            Type::Number(s) => s.contains(Spec::CHAR),
            _ => false,
        }
    }

    pub fn is_bool(&self) -> bool {
        matches!(self, Type::Number(s) if s.contains(Spec::BOOL))
    }

    pub fn is_pointer(&self) -> bool {
        matches!(self, Type::Pointer(_))
    }

    pub fn is_void_pointer(&self) -> bool {
        match self {
            Type::Pointer(base) => base.get().is_void(),
            _ => false,
        }
    }

    pub fn is_array(&self) -> bool {
        matches!(self, Type::Array(_))
    }

    pub fn is_struct(&self) -> bool {
        matches!(self, Type::Struct(_))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Type::Func(_))
    }

    pub fn is_scalar(&self) -> bool {
        matches!(self, Type::Number(_) | Type::Pointer(_))
    }

    pub fn is_aggregate(&self) -> bool {
        matches!(self, Type::Array(_) | Type::Struct(_))
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Type::Void => false,
            Type::Number(_) | Type::Pointer(_) | Type::Func(_) => true,
            Type::Array(a) => a.bound().is_some(),
            Type::Struct(s) => s.is_complete(),
            Type::Enum(e) => e.is_complete(),
        }
    }

    pub fn size(&self) -> u64 {
        match self {
            Type::Void => 0,
            Type::Number(s) => size_of_spec(*s),
            Type::Pointer(_) => SIZE_POINTER,
            Type::Array(a) => match a.bound() {
                Some(n) => a.elem.get().size().saturating_mul(n),
                None => 0,
            },
            Type::Struct(s) => s.layout().0,
            Type::Enum(_) => SIZE_INT,
            // function designators decay to pointers
            Type::Func(_) => SIZE_POINTER,
        }
    }

    pub fn align(&self) -> u64 {
        match self {
            Type::Void => 0,
            Type::Number(s) => size_of_spec(*s),
            Type::Pointer(_) | Type::Func(_) => SIZE_POINTER,
            Type::Array(a) => a.elem.get().align(),
            Type::Struct(s) => s.layout().1,
            Type::Enum(_) => SIZE_INT,
        }
    }

    pub fn is_compatible(&self, other: &Type<'a>) -> bool {
        self.compat(other, &mut Vec::new())
    }

    fn compat(&self, other: &Type<'a>, seen: &mut Vec<(usize, usize)>) -> bool {
        if std::ptr::eq(self, other) {
            return true;
        }
        match (self, other) {
            (Type::Void, Type::Void) => true,
            (Type::Number(a), Type::Number(b)) => a == b,
            (Type::Pointer(a), Type::Pointer(b)) => a.get().compat(b.get(), seen),
            (Type::Array(a), Type::Array(b)) => {
                let bounds_ok = match (a.bound(), b.bound()) {
                    (Some(x), Some(y)) => x == y,
                    _ => true,
                };
                bounds_ok && a.elem.get().compat(b.elem.get(), seen)
            }
            (Type::Struct(a), Type::Struct(b)) => {
                if a.is_union != b.is_union {
                    return false;
                }
                let key = (self as *const _ as usize, other as *const _ as usize);
                // a pair already under comparison is assumed compatible,
                // cutting off self-referential member chains
                if seen.contains(&key) {
                    return true;
                }
                let (Some(ma), Some(mb)) = (a.members(), b.members()) else {
                    // distinct incomplete instances are not compatible
                    return false;
                };
                if ma.len() != mb.len() {
                    return false;
                }
                seen.push(key);
                let ok = ma
                    .iter()
                    .zip(mb.iter())
                    .all(|(x, y)| x.ty().get().compat(y.ty().get(), seen));
                seen.pop();
                ok
            }
            (Type::Enum(_), Type::Enum(_)) => false,
            (Type::Func(a), Type::Func(b)) => {
                if !a.ret.get().compat(b.ret.get(), seen) {
                    return false;
                }
                if a.unspecified || b.unspecified {
                    return true;
                }
                a.variadic == b.variadic
                    && a.params.len() == b.params.len()
                    && a.params
                        .iter()
                        .zip(b.params.iter())
                        .all(|(x, y)| x.ty().get().compat(y.ty().get(), seen))
            }
            _ => false,
        }
    }

    pub fn to_string(&self, interner: &Interner) -> String {
        match self {
            Type::Void => "void".to_string(),
            Type::Number(s) => spec_to_string(*s),
            Type::Pointer(base) => format!("{}*", base.to_string(interner)),
            Type::Array(a) => match a.bound() {
                Some(n) => format!("{}[{}]", a.elem.to_string(interner), n),
                None => format!("{}[]", a.elem.to_string(interner)),
            },
            Type::Struct(s) => {
                let kw = if s.is_union { "union" } else { "struct" };
                match s.tag {
                    Some(tag) => format!("{} {}", kw, interner.resolve(tag)),
                    None => format!("{} <anonymous>", kw),
                }
            }
            Type::Enum(e) => match e.tag {
                Some(tag) => format!("enum {}", interner.resolve(tag)),
                None => "enum <anonymous>".to_string(),
            },
            Type::Func(f) => {
                if f.unspecified {
                    return format!("{} ()", f.ret.to_string(interner));
                }
                let mut params: Vec<String> = f
                    .params
                    .iter()
                    .map(|p| p.ty().to_string(interner))
                    .collect();
                if f.variadic {
                    params.push("...".to_string());
                }
                if params.is_empty() {
                    params.push("void".to_string());
                }
                format!("{} ({})", f.ret.to_string(interner), params.join(", "))
            }
        }
    }
}

/// A type together with a qualifier subset. Copyable; identity is
/// pointer identity of the underlying type plus qualifier equality.
#[derive(Clone, Copy, Debug)]
pub struct QualType<'a> {
    ty: &'a Type<'a>,
    qual: Qual,
}

impl<'a> PartialEq for QualType<'a> {
    fn eq(&self, other: &Self) -> bool {
        std::ptr::eq(self.ty, other.ty) && self.qual == other.qual
    }
}

impl<'a> QualType<'a> {
    pub fn new(ty: &'a Type<'a>, qual: Qual) -> Self {
        QualType { ty, qual }
    }

    pub fn unqual(ty: &'a Type<'a>) -> Self {
        QualType {
            ty,
            qual: Qual::empty(),
        }
    }

    pub fn get(self) -> &'a Type<'a> {
        self.ty
    }

    pub fn qual(self) -> Qual {
        self.qual
    }

    pub fn is_const(self) -> bool {
        self.qual.contains(Qual::CONST)
    }

    pub fn with_qual(self, qual: Qual) -> Self {
        QualType { ty: self.ty, qual }
    }

    pub fn add_qual(&mut self, qual: Qual) {
        self.qual |= qual;
    }

    pub fn unqualified(self) -> Self {
        self.with_qual(Qual::empty())
    }

    /// C99 6.3.2.1: arrays convert to pointers to their element type
    /// carrying the element qualifiers; function designators convert to
    /// pointers to the function; everything else passes through.
    pub fn decay(self, ctx: AstContext<'a>) -> Self {
        match self.ty {
            Type::Array(a) => QualType::unqual(ctx.pointer_to(a.elem)),
            Type::Func(_) => QualType::unqual(ctx.pointer_to(QualType::unqual(self.ty))),
            _ => self,
        }
    }

    pub fn is_compatible(self, other: QualType<'a>) -> bool {
        self.ty.is_compatible(other.ty)
    }

    pub fn to_string(self, interner: &Interner) -> String {
        let base = self.ty.to_string(interner);
        if self.qual.is_empty() {
            return base;
        }
        let quals = qual_to_string(self.qual);
        match self.ty {
            // prefix on base types, suffix on derived ones: `const int`
            // but `int* const`
            Type::Pointer(_) | Type::Array(_) | Type::Func(_) => format!("{} {}", base, quals),
            _ => format!("{} {}", quals, base),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::SourceLoc;

    fn loc() -> SourceLoc {
        SourceLoc::default()
    }

    #[test]
    fn long_long_builds_from_two_longs() {
        let mut acc = Spec::empty();
        acc = add_specifier(acc, Spec::LONG, loc()).unwrap();
        acc = add_specifier(acc, Spec::LONG, loc()).unwrap();
        assert_eq!(canonical(acc), Some(Spec::LLONG));
    }

    #[test]
    fn unsigned_long_int_is_legal() {
        let mut acc = Spec::empty();
        for s in [Spec::UNSIGNED, Spec::LONG, Spec::INT] {
            acc = add_specifier(acc, s, loc()).unwrap();
        }
        assert_eq!(canonical(acc), Some(Spec::UNSIGNED.union(Spec::LONG)));
    }

    #[test]
    fn void_combines_with_nothing() {
        let acc = add_specifier(Spec::empty(), Spec::VOID, loc()).unwrap();
        let err = add_specifier(acc, Spec::INT, loc()).unwrap_err();
        assert_eq!(err.kind, ErrorKind::BadSpecifier);
    }

    #[test]
    fn signed_and_unsigned_conflict() {
        let acc = add_specifier(Spec::empty(), Spec::SIGNED, loc()).unwrap();
        assert!(add_specifier(acc, Spec::UNSIGNED, loc()).is_err());
    }

    #[test]
    fn double_double_conflicts() {
        let acc = add_specifier(Spec::empty(), Spec::DOUBLE, loc()).unwrap();
        assert!(add_specifier(acc, Spec::DOUBLE, loc()).is_err());
    }

    #[test]
    fn canonical_folds_synonyms() {
        assert_eq!(canonical(Spec::SIGNED), Some(Spec::INT));
        assert_eq!(canonical(Spec::UNSIGNED), Some(Spec::UNSIGNED.union(Spec::INT)));
        assert_eq!(
            canonical(Spec::SHORT.union(Spec::INT).union(Spec::SIGNED)),
            Some(Spec::SHORT)
        );
        assert_eq!(
            canonical(Spec::SIGNED.union(Spec::CHAR)),
            Some(Spec::SIGNED.union(Spec::CHAR))
        );
        assert_eq!(
            canonical(Spec::LONG.union(Spec::DOUBLE)),
            Some(Spec::LONG.union(Spec::DOUBLE))
        );
    }

    #[test]
    fn rank_orders_integer_types() {
        assert!(rank(Spec::BOOL) < rank(Spec::CHAR));
        assert!(rank(Spec::CHAR) < rank(Spec::SHORT));
        assert!(rank(Spec::SHORT) < rank(Spec::INT));
        assert!(rank(Spec::INT) < rank(Spec::LONG));
        assert!(rank(Spec::LONG) < rank(Spec::LLONG));
        assert_eq!(rank(Spec::INT), rank(Spec::UNSIGNED.union(Spec::INT)));
    }

    #[test]
    fn promotion_lifts_small_types_to_int() {
        assert_eq!(promote_spec(Spec::BOOL), Spec::INT);
        assert_eq!(promote_spec(Spec::CHAR), Spec::INT);
        assert_eq!(promote_spec(Spec::UNSIGNED.union(Spec::CHAR)), Spec::INT);
        assert_eq!(promote_spec(Spec::SHORT), Spec::INT);
        assert_eq!(
            promote_spec(Spec::UNSIGNED.union(Spec::INT)),
            Spec::UNSIGNED.union(Spec::INT)
        );
        assert_eq!(promote_spec(Spec::LONG), Spec::LONG);
    }

    #[test]
    fn promotion_is_idempotent() {
        for s in [
            Spec::BOOL,
            Spec::CHAR,
            Spec::SHORT,
            Spec::INT,
            Spec::UNSIGNED.union(Spec::INT),
            Spec::LONG,
            Spec::LLONG,
            Spec::DOUBLE,
        ] {
            assert_eq!(promote_spec(promote_spec(s)), promote_spec(s));
        }
    }

    #[test]
    fn usual_conversion_prefers_floating() {
        assert_eq!(usual_arith_spec(Spec::INT, Spec::DOUBLE), Spec::DOUBLE);
        assert_eq!(usual_arith_spec(Spec::FLOAT, Spec::LLONG), Spec::FLOAT);
        assert_eq!(
            usual_arith_spec(Spec::DOUBLE, Spec::LONG.union(Spec::DOUBLE)),
            Spec::LONG.union(Spec::DOUBLE)
        );
    }

    #[test]
    fn usual_conversion_unsigned_wins_at_same_rank() {
        assert_eq!(
            usual_arith_spec(Spec::UNSIGNED.union(Spec::INT), Spec::INT),
            Spec::UNSIGNED.union(Spec::INT)
        );
    }

    #[test]
    fn usual_conversion_same_rank_signed_goes_unsigned() {
        // long and unsigned int share a size here, so the signed long
        // cannot represent all unsigned int values
        assert_eq!(
            usual_arith_spec(Spec::LONG, Spec::UNSIGNED.union(Spec::INT)),
            Spec::UNSIGNED.union(Spec::LONG)
        );
    }

    #[test]
    fn usual_conversion_promotes_small_operands() {
        assert_eq!(
            usual_arith_spec(Spec::UNSIGNED.union(Spec::CHAR), Spec::INT),
            Spec::INT
        );
    }

    #[test]
    fn storage_static_inline_pair_allowed() {
        let mut diags = Diagnostics::new();
        let acc = add_storage_class(Storage::STATIC, Storage::INLINE, loc(), &mut diags).unwrap();
        assert_eq!(acc, Storage::STATIC.union(Storage::INLINE));
        assert!(add_storage_class(acc, Storage::EXTERN, loc(), &mut diags).is_err());
    }

    #[test]
    fn register_warns() {
        let mut diags = Diagnostics::new();
        add_storage_class(Storage::empty(), Storage::REGISTER, loc(), &mut diags).unwrap();
        assert_eq!(diags.warnings().len(), 1);
    }

    #[test]
    fn duplicate_qualifier_warns_but_folds() {
        let mut diags = Diagnostics::new();
        let q = add_qualifier(Qual::CONST, Qual::CONST, loc(), &mut diags);
        assert_eq!(q, Qual::CONST);
        assert_eq!(diags.warnings().len(), 1);
    }

    #[test]
    fn spec_words_read_naturally() {
        assert_eq!(spec_to_string(Spec::UNSIGNED.union(Spec::INT)), "unsigned int");
        assert_eq!(spec_to_string(Spec::LONG.union(Spec::DOUBLE)), "long double");
        assert_eq!(
            spec_to_string(Spec::UNSIGNED.union(Spec::LLONG)),
            "unsigned long long"
        );
    }
}
