//! Source-text front end.
//!
//! - `lexer`   — logos-derived token enum and the peekable token stream
//! - `parser`  — recursive descent with precedence climbing
//! - `printer` — AST back to source text (debugging aid)

pub mod lexer;
pub mod parser;
pub mod printer;
