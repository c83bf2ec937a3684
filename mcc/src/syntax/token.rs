use std::fmt;

/// Position of a token in the source text (1-based).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pos {
    pub line: usize,
    pub col: usize,
}

impl Pos {
    pub fn null() -> Self {
        Pos { line: 0, col: 0 }
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.col)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Ident(String),
    Number(i64),
    Char(char),
    Text(String),
    Comment(String),
    Error(String),

    // Keywords
    KwInt,      // "int"
    KwChar,     // "char"
    KwVoid,     // "void"
    KwStruct,   // "struct"
    KwClass,    // "class"
    KwExtends,  // "extends"
    KwSizeof,   // "sizeof"
    KwNew,      // "new"
    KwIf,       // "if"
    KwElse,     // "else"
    KwWhile,    // "while"
    KwReturn,   // "return"
    KwBreak,    // "break"
    KwContinue, // "continue"

    // Operators and punctuation
    Plus,        // "+"
    Minus,       // "-"
    Star,        // "*"
    Slash,       // "/"
    Percent,     // "%"
    Amp,         // "&"
    AmpAmp,      // "&&"
    PipePipe,    // "||"
    Equal,       // "="
    EqualEqual,  // "=="
    ExclEqual,   // "!="
    LAngle,      // "<"
    RAngle,      // ">"
    LAngleEqual, // "<="
    RAngleEqual, // ">="
    Dot,         // "."
    Comma,       // ","
    Semicolon,   // ";"
    LParen,      // "("
    RParen,      // ")"
    LBracket,    // "["
    RBracket,    // "]"
    LCurly,      // "{"
    RCurly,      // "}"
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub pos: Pos,
}

impl Token {
    pub fn new(kind: TokenKind, pos: Pos) -> Self {
        Token { kind, pos }
    }
}
