pub mod ast;
pub mod lexer;
pub mod parser;
pub mod parsercore;
pub mod token;

use crate::error::Error;

/// Tokenize and parse one translation unit.
pub fn parse(code: &str) -> Result<ast::Ast, Error> {
    let tokens = lexer::Lexer::new(code).tokenize();
    parsercore::Parser::new(tokens).parse()
}
