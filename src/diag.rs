//! Diagnostics: the error taxonomy, the warning sink, and the terminal
//! renderer.
//!
//! Fatal diagnostics are ordinary values propagated with `Result` from
//! the lexer, the parser and the node constructors up to the top-level
//! parse entry; nothing is caught on the way, so a failed construction
//! abandons the enclosing parse. Warnings accumulate in [`Diagnostics`]
//! and never abort.

use crate::stream::{SourceFile, SourceLoc};
use crate::style::Style;
use std::fmt;

/// Categorical diagnostic kind. Tests match on these; messages are for
/// humans.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum ErrorKind {
    // lexical
    UnknownChar,
    UnterminatedLiteral,
    UnknownEscape,
    InvalidUcn,
    MalformedNumber,
    // syntactic
    ExpectedToken,
    UnexpectedToken,
    UnexpectedEof,
    // declarator
    BadReturnType,
    BadArrayElement,
    BadStorageClass,
    BadDeclarator,
    // type
    BadSpecifier,
    Redeclaration,
    IncompleteType,
    // semantic expression
    ScalarRequired,
    IntegerRequired,
    ArithmeticRequired,
    PointerRequired,
    BadOperand,
    LvalueRequired,
    AssignToConst,
    QualifierLoss,
    NotCallable,
    TooFewArguments,
    TooManyArguments,
    NotAMember,
    BadInitializer,
    ExcessInitializer,
    // scope
    Undeclared,
    Redefinition,
    TagMismatch,
    UnresolvedLabel,
    // control
    BreakOutsideLoop,
    ContinueOutsideLoop,
    ReturnOutsideFunction,
    ReturnValueInVoid,
    CaseOutsideSwitch,
    // constant expressions
    NotConstant,
}

/// A single diagnostic. `loc` is absent only for conditions with no
/// meaningful position (for instance a truncated token stream).
#[derive(Clone, Debug)]
pub struct Diag {
    pub kind: ErrorKind,
    pub loc: Option<SourceLoc>,
    pub msg: String,
}

impl Diag {
    pub fn new(kind: ErrorKind, loc: SourceLoc, msg: impl Into<String>) -> Diag {
        Diag {
            kind,
            loc: Some(loc),
            msg: msg.into(),
        }
    }

    pub fn without_loc(kind: ErrorKind, msg: impl Into<String>) -> Diag {
        Diag {
            kind,
            loc: None,
            msg: msg.into(),
        }
    }
}

impl fmt::Display for Diag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.loc {
            Some(loc) => write!(f, "{}:{}: {}", loc.line, loc.column, self.msg),
            None => write!(f, "{}", self.msg),
        }
    }
}

pub type PResult<T> = Result<T, Diag>;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Level {
    Warning,
    Error,
}

/// Accumulating sink for non-fatal diagnostics.
#[derive(Default)]
pub struct Diagnostics {
    warnings: Vec<Diag>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn warn(&mut self, diag: Diag) {
        self.warnings.push(diag);
    }

    pub fn warnings(&self) -> &[Diag] {
        &self.warnings
    }

    pub fn take_warnings(&mut self) -> Vec<Diag> {
        std::mem::take(&mut self.warnings)
    }
}

/// Render a diagnostic in the terminal shape:
///
/// ```text
/// In file <path>:<line>:<column>:
/// <source line, literal>
/// <caret + tilde run underlining the token>
/// error: <message>
/// ```
pub fn render(diag: &Diag, file: &SourceFile, level: Level) -> String {
    let label = match level {
        Level::Error => Style::bold_red("error"),
        Level::Warning => Style::bold_yellow("warning"),
    };

    let Some(loc) = diag.loc else {
        return format!("{}: {}", label, diag.msg);
    };

    let line = file.line_text(loc.line_begin);
    let pad = " ".repeat(loc.column.saturating_sub(1) as usize);
    let run = format!("^{}", "~".repeat(loc.length.saturating_sub(1) as usize));
    let run = match level {
        Level::Error => Style::red(&run),
        Level::Warning => Style::yellow(&run),
    };
    let header = Style::blue(&format!(
        "In file {}:{}:{}:",
        file.path.display(),
        loc.line,
        loc.column
    ));

    format!("{}\n{}\n{}{}\n{}: {}", header, line, pad, run, label, diag.msg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn file(text: &str) -> SourceFile {
        SourceFile {
            path: PathBuf::from("t.c"),
            text: text.to_string(),
        }
    }

    #[test]
    fn render_underlines_the_token() {
        let f = file("int x = $;\n");
        let diag = Diag::new(
            ErrorKind::UnknownChar,
            SourceLoc {
                line: 1,
                column: 9,
                length: 1,
                line_begin: 0,
            },
            "unknown character '$'",
        );
        let out = render(&diag, &f, Level::Error);
        assert!(out.contains("In file t.c:1:9:"));
        assert!(out.contains("int x = $;"));
        assert!(out.contains('^'));
        assert!(out.contains("unknown character"));
    }

    #[test]
    fn render_tilde_run_covers_token_length() {
        let f = file("return abc;\n");
        let diag = Diag::new(
            ErrorKind::Undeclared,
            SourceLoc {
                line: 1,
                column: 8,
                length: 3,
                line_begin: 0,
            },
            "use of undeclared identifier",
        );
        let out = render(&diag, &f, Level::Error);
        assert!(out.contains("^~~"));
    }

    #[test]
    fn warnings_accumulate_in_order() {
        let mut sink = Diagnostics::new();
        sink.warn(Diag::without_loc(ErrorKind::BadStorageClass, "first"));
        sink.warn(Diag::without_loc(ErrorKind::BadSpecifier, "second"));
        assert_eq!(sink.warnings().len(), 2);
        assert_eq!(sink.warnings()[0].msg, "first");
        let taken = sink.take_warnings();
        assert_eq!(taken.len(), 2);
        assert!(sink.warnings().is_empty());
    }

    #[test]
    fn display_includes_position() {
        let diag = Diag::new(
            ErrorKind::UnexpectedToken,
            SourceLoc {
                line: 3,
                column: 7,
                length: 1,
                line_begin: 0,
            },
            "unexpected token",
        );
        assert_eq!(format!("{}", diag), "3:7: unexpected token");
    }
}
