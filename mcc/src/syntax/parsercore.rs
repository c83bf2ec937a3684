use super::token::{Token, TokenKind};
use crate::error::Error;

pub struct Parser {
    tokens: Vec<Token>,
    idx: usize,
}

impl Parser {
    pub fn new(tokens: Vec<Token>) -> Self {
        // Comments and lexer error tokens carry no syntax
        let tokens = tokens
            .into_iter()
            .filter(|t| !matches!(t.kind, TokenKind::Comment(_) | TokenKind::Error(_)))
            .collect();
        Parser { tokens, idx: 0 }
    }
}

impl Parser {
    /// Peek : watch next token without consuming it
    pub fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.idx)
    }

    /// Peek n tokens ahead without consuming anything
    pub fn peek_nth(&self, n: usize) -> Option<&Token> {
        self.tokens.get(self.idx + n)
    }

    /// Next : consume next token and return it
    pub fn next(&mut self) -> Option<Token> {
        let token = self.tokens.get(self.idx).cloned();
        if token.is_some() {
            self.idx += 1;
        }
        token
    }

    /// Peek and check next token is match with condition
    pub fn check_if<F: Fn(&Token) -> bool>(&self, cond: F) -> bool {
        match self.peek() {
            Some(token) => cond(token),
            None => false,
        }
    }

    /// Consume if next token is match with condition
    pub fn consume_if<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Option<Token> {
        if self.check_if(cond) {
            self.next()
        } else {
            None
        }
    }

    /// Next token must be match with condition
    pub fn expect_tobe<F: Fn(&Token) -> bool>(&mut self, cond: F) -> Result<Token, Error> {
        match self.peek().cloned() {
            Some(token) => {
                if cond(&token) {
                    self.idx += 1;
                    Ok(token)
                } else {
                    Err(Error::UnexpectedToken {
                        kind: token.kind,
                        pos: token.pos,
                    })
                }
            }
            None => Err(Error::UnexpectedEof),
        }
    }
}

#[macro_export]
macro_rules! check {
    ($parser:expr, $kind:pat) => {
        $parser.check_if(|token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! expect {
    ($parser:expr, $kind:pat) => {
        $parser.expect_tobe(|token| matches!(&token.kind, $kind))
    };
}

#[macro_export]
macro_rules! optional {
    ($parser:expr, $trigger:pat, $following:expr) => {
        if check!($parser, $trigger) {
            expect!($parser, $trigger)?;
            Some($following)
        } else {
            None
        }
    };
    ($parser:expr, $trigger:pat) => {
        $parser.consume_if(|token| matches!(&token.kind, $trigger))
    };
}

/// Parse repeated elements with optional delimiters
/// 3 args: { element } terminal (no delimiter)
/// 4 args: [ element { delimiter element } ] terminal (with delimiter)
#[macro_export]
macro_rules! repeat {
    // Without delimiter: { element } terminal
    ($parser:expr, $elem:expr, $terminal:pat) => {{
        let mut items = Vec::new();
        while !check!($parser, $terminal) {
            items.push($elem?);
        }
        items
    }};

    // With delimiter: [ element { delimiter element } ] terminal
    ($parser:expr, $elem:expr, $delimiter:pat, $terminal:pat) => {{
        let mut items = Vec::new();
        if !check!($parser, $terminal) {
            items.push($elem?);
            while check!($parser, $delimiter) {
                expect!($parser, $delimiter)?;
                items.push($elem?);
            }
        }
        items
    }};
}
