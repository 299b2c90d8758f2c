//! Syntax analysis: tokens to class AST
//!
//! Grammar, one class per source file:
//!
//! ```text
//! class        := 'class' Ident '{' classVarDec* subroutine* '}'
//! classVarDec  := ('static' | 'field') type Ident (',' Ident)* ';'
//! subroutine   := ('constructor' | 'function' | 'method') ('void' | type) Ident
//!                 '(' params? ')' '{' varDec* statement* '}'
//! statement    := let | if | while | do | return
//! expression   := six left-associative levels, loosest first:
//!                 '|'  '&'  '='  '<' '>' '<=' '>='  '+' '-'  '*' '/'
//! term         := literal | 'this' | '(' expression ')' | ('-' | '~') term
//!               | Ident | Ident '[' expression ']' | call
//! call         := Ident '(' args ')' | Ident '.' Ident '(' args ')'
//! ```

pub mod error;
pub mod parser;

use crate::grammar::ast::nodes::ClassDecl;
use crate::logging::codes;
use crate::tokens::TokenStream;
use crate::log_success;

pub use error::{SyntaxError, SyntaxResult};
pub use parser::{create_parser, JackParser};

/// Parse a token stream into one class
pub fn parse_class(token_stream: TokenStream) -> SyntaxResult<ClassDecl> {
    run_parser(&mut JackParser::new(token_stream))
}

/// Parse one class with a caller-owned parser, leaving its token counters
/// readable afterwards
pub fn run_parser(parser: &mut JackParser) -> SyntaxResult<ClassDecl> {
    let class = parser.parse_program()?;

    log_success!(
        codes::success::AST_CONSTRUCTION_COMPLETE,
        "Class AST built",
        "class" => class.name.as_str(),
        "subroutines" => class.subroutines.len(),
        "tokens" => parser.tokens().consumed()
    );

    Ok(class)
}

/// Parse a complete source text into one class
pub fn parse_source(source: &str) -> SyntaxResult<ClassDecl> {
    parse_class(TokenStream::from_source(source)?)
}
