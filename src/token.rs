//! The token model: kinds, keyword and directive tables, and
//! classification predicates.

use crate::intern::Symbol;
use crate::stream::SourceLoc;

#[derive(Clone, Copy, PartialEq, Debug)]
pub enum TokenKind {
    Error,
    Eof,

    Ident(Symbol),
    /// Preprocessing number with integer shape.
    PpNumber(Symbol),
    /// Preprocessing number containing a `.` or an exponent.
    PpFloat(Symbol),
    /// Character constant, escapes already decoded and bytes folded.
    CharLit { value: u32, wide: bool },
    /// String literal, escapes already decoded and content interned.
    Str { sym: Symbol, wide: bool },

    Space,
    Newline,

    // punctuators; digraphs are folded into these during lexing
    LParen,
    RParen,
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    Semicolon,
    Comma,
    Colon,
    Question,
    Dot,
    Ellipsis,
    Arrow,
    Inc,
    Dec,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Tilde,
    Bang,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    EqEq,
    BangEq,
    AmpAmp,
    PipePipe,
    Assign,
    PlusAssign,
    MinusAssign,
    StarAssign,
    SlashAssign,
    PercentAssign,
    AmpAssign,
    PipeAssign,
    CaretAssign,
    ShlAssign,
    ShrAssign,
    Hash,
    HashHash,

    // keywords: storage class
    KwAuto,
    KwExtern,
    KwInline,
    KwRegister,
    KwStatic,
    KwTypedef,
    // keywords: qualifiers
    KwConst,
    KwRestrict,
    KwVolatile,
    // keywords: type specifiers
    KwBool,
    KwChar,
    KwComplex,
    KwDouble,
    KwEnum,
    KwFloat,
    KwImaginary,
    KwInt,
    KwLong,
    KwShort,
    KwSigned,
    KwStruct,
    KwUnion,
    KwUnsigned,
    KwVoid,
    // keywords: control flow
    KwBreak,
    KwCase,
    KwContinue,
    KwDefault,
    KwDo,
    KwElse,
    KwFor,
    KwGoto,
    KwIf,
    KwReturn,
    KwSwitch,
    KwWhile,
    // keywords: operators and literals
    KwSizeof,
    KwTrue,
    KwFalse,
}

/// Preprocessing directive names. The lexer emits `#` plus ordinary
/// identifiers; a preprocessor behind the `TokenSource` seam classifies
/// the identifier after a line-initial `#` with this table.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Directive {
    Include,
    Define,
    Undef,
    Ifdef,
    Ifndef,
    Elif,
    Endif,
    Line,
    Error,
    Pragma,
}

impl Directive {
    pub fn from_name(name: &str) -> Option<Directive> {
        Some(match name {
            "include" => Directive::Include,
            "define" => Directive::Define,
            "undef" => Directive::Undef,
            "ifdef" => Directive::Ifdef,
            "ifndef" => Directive::Ifndef,
            "elif" => Directive::Elif,
            "endif" => Directive::Endif,
            "line" => Directive::Line,
            "error" => Directive::Error,
            "pragma" => Directive::Pragma,
            _ => return None,
        })
    }
}

/// Keyword table consulted after an identifier has been scanned.
pub fn keyword(text: &str) -> Option<TokenKind> {
    use TokenKind::*;
    Some(match text {
        "auto" => KwAuto,
        "break" => KwBreak,
        "case" => KwCase,
        "char" => KwChar,
        "const" => KwConst,
        "continue" => KwContinue,
        "default" => KwDefault,
        "do" => KwDo,
        "double" => KwDouble,
        "else" => KwElse,
        "enum" => KwEnum,
        "extern" => KwExtern,
        "false" => KwFalse,
        "float" => KwFloat,
        "for" => KwFor,
        "goto" => KwGoto,
        "if" => KwIf,
        "inline" => KwInline,
        "int" => KwInt,
        "long" => KwLong,
        "register" => KwRegister,
        "restrict" => KwRestrict,
        "return" => KwReturn,
        "short" => KwShort,
        "signed" => KwSigned,
        "sizeof" => KwSizeof,
        "static" => KwStatic,
        "struct" => KwStruct,
        "switch" => KwSwitch,
        "true" => KwTrue,
        "typedef" => KwTypedef,
        "union" => KwUnion,
        "unsigned" => KwUnsigned,
        "void" => KwVoid,
        "volatile" => KwVolatile,
        "while" => KwWhile,
        "_Bool" => KwBool,
        "_Complex" => KwComplex,
        "_Imaginary" => KwImaginary,
        _ => return None,
    })
}

impl TokenKind {
    pub fn is_space(self) -> bool {
        matches!(self, TokenKind::Space | TokenKind::Newline)
    }

    pub fn is_assignment(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            Assign
                | PlusAssign
                | MinusAssign
                | StarAssign
                | SlashAssign
                | PercentAssign
                | AmpAssign
                | PipeAssign
                | CaretAssign
                | ShlAssign
                | ShrAssign
        )
    }

    pub fn is_storage_class(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KwAuto | KwTypedef | KwStatic | KwInline | KwRegister | KwExtern
        )
    }

    pub fn is_qualifier(self) -> bool {
        use TokenKind::*;
        matches!(self, KwConst | KwVolatile | KwRestrict)
    }

    pub fn is_type_specifier(self) -> bool {
        use TokenKind::*;
        matches!(
            self,
            KwVoid
                | KwBool
                | KwChar
                | KwShort
                | KwInt
                | KwLong
                | KwFloat
                | KwDouble
                | KwComplex
                | KwImaginary
                | KwSigned
                | KwUnsigned
                | KwStruct
                | KwUnion
                | KwEnum
        )
    }

    /// Human-readable shape of the token kind for diagnostics.
    pub fn describe(self) -> &'static str {
        use TokenKind::*;
        match self {
            Error => "invalid token",
            Eof => "end of file",
            Ident(_) => "identifier",
            PpNumber(_) | PpFloat(_) => "number",
            CharLit { .. } => "character constant",
            Str { .. } => "string literal",
            Space => "whitespace",
            Newline => "newline",
            LParen => "'('",
            RParen => "')'",
            LBrace => "'{'",
            RBrace => "'}'",
            LBracket => "'['",
            RBracket => "']'",
            Semicolon => "';'",
            Comma => "','",
            Colon => "':'",
            Question => "'?'",
            Dot => "'.'",
            Ellipsis => "'...'",
            Arrow => "'->'",
            Inc => "'++'",
            Dec => "'--'",
            Plus => "'+'",
            Minus => "'-'",
            Star => "'*'",
            Slash => "'/'",
            Percent => "'%'",
            Amp => "'&'",
            Pipe => "'|'",
            Caret => "'^'",
            Tilde => "'~'",
            Bang => "'!'",
            Shl => "'<<'",
            Shr => "'>>'",
            Lt => "'<'",
            Gt => "'>'",
            Le => "'<='",
            Ge => "'>='",
            EqEq => "'=='",
            BangEq => "'!='",
            AmpAmp => "'&&'",
            PipePipe => "'||'",
            Assign => "'='",
            PlusAssign => "'+='",
            MinusAssign => "'-='",
            StarAssign => "'*='",
            SlashAssign => "'/='",
            PercentAssign => "'%='",
            AmpAssign => "'&='",
            PipeAssign => "'|='",
            CaretAssign => "'^='",
            ShlAssign => "'<<='",
            ShrAssign => "'>>='",
            Hash => "'#'",
            HashHash => "'##'",
            KwAuto => "'auto'",
            KwBreak => "'break'",
            KwCase => "'case'",
            KwChar => "'char'",
            KwConst => "'const'",
            KwContinue => "'continue'",
            KwDefault => "'default'",
            KwDo => "'do'",
            KwDouble => "'double'",
            KwElse => "'else'",
            KwEnum => "'enum'",
            KwExtern => "'extern'",
            KwFalse => "'false'",
            KwFloat => "'float'",
            KwFor => "'for'",
            KwGoto => "'goto'",
            KwIf => "'if'",
            KwInline => "'inline'",
            KwInt => "'int'",
            KwLong => "'long'",
            KwRegister => "'register'",
            KwRestrict => "'restrict'",
            KwReturn => "'return'",
            KwShort => "'short'",
            KwSigned => "'signed'",
            KwSizeof => "'sizeof'",
            KwStatic => "'static'",
            KwStruct => "'struct'",
            KwSwitch => "'switch'",
            KwTrue => "'true'",
            KwTypedef => "'typedef'",
            KwUnion => "'union'",
            KwUnsigned => "'unsigned'",
            KwVoid => "'void'",
            KwVolatile => "'volatile'",
            KwWhile => "'while'",
            KwBool => "'_Bool'",
            KwComplex => "'_Complex'",
            KwImaginary => "'_Imaginary'",
        }
    }
}

#[derive(Clone, Copy, Debug)]
pub struct Token {
    pub loc: SourceLoc,
    pub kind: TokenKind,
}

impl Token {
    pub fn new(loc: SourceLoc, kind: TokenKind) -> Token {
        Token { loc, kind }
    }

    pub fn is(&self, kind: TokenKind) -> bool {
        self.kind == kind
    }

    /// The interned content, for token kinds that carry one.
    pub fn content(&self) -> Option<Symbol> {
        match self.kind {
            TokenKind::Ident(s)
            | TokenKind::PpNumber(s)
            | TokenKind::PpFloat(s)
            | TokenKind::Str { sym: s, .. } => Some(s),
            _ => None,
        }
    }
}
