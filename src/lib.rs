//! cinder: a C99 compiler front end.
//!
//! Consumes a C source file and produces a typed, semantically
//! validated tree of declarations, statements and expressions suitable
//! for later code generation. The pipeline is the classic one: a
//! preprocessing character stream (trigraphs, line splicing), a greedy
//! tokenizer, a buffered token source, and a recursive-descent parser
//! whose node constructors enforce the C99 semantic rules at
//! construction time. All tree nodes live in bump arenas released in a
//! single epoch.

pub mod arena;
pub mod arena_ctx;
pub mod ast;
pub mod cli;
pub mod diag;
pub mod eval;
pub mod intern;
pub mod lexer;
pub mod parser;
pub mod scope;
pub mod sema;
pub mod stream;
pub mod style;
pub mod token;
pub mod tokens;
pub mod types;

pub use diag::{Diag, Diagnostics, ErrorKind, Level, PResult};
pub use parser::Parser;
pub use stream::{SourceFile, SourceLoc};

use arena::Arena;
use arena_ctx::AstContext;
use intern::Interner;
use lexer::Lexer;
use tokens::Tokens;

/// The result of checking one translation unit: accumulated warnings
/// plus either the number of file-scope declarations or the fatal
/// diagnostic that aborted the parse.
pub struct ParseOutcome {
    pub warnings: Vec<Diag>,
    pub result: Result<usize, Diag>,
}

/// Lex and parse a whole source file. The typed tree lives only for
/// the duration of the call; callers that need to walk it build the
/// arenas themselves and drive [`Parser`] directly.
pub fn check_source(file: &SourceFile) -> ParseOutcome {
    let mut interner = Interner::new();
    let tokens = match Lexer::new(file, &mut interner).lex_all() {
        Ok(tokens) => tokens,
        Err(diag) => {
            return ParseOutcome {
                warnings: Vec::new(),
                result: Err(diag),
            }
        }
    };
    let types = Arena::new();
    let exprs = Arena::new();
    let stmts = Arena::new();
    let decls = Arena::new();
    let labels = Arena::new();
    let ctx = AstContext::new(&types, &exprs, &stmts, &decls, &labels);
    let mut parser = Parser::new(Tokens::new(tokens), &interner, ctx);
    let result = parser.translation_unit().map(|unit| unit.len());
    ParseOutcome {
        warnings: parser.diags.take_warnings(),
        result,
    }
}
