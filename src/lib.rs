// Falcon front-end library
//
// Hand-written scanner and Pratt parser for the Falcon scripting language,
// producing an owned AST for whatever evaluator or compiler sits downstream.

// Public modules
pub mod ast;
pub mod error;
pub mod lexer;
pub mod parser;
pub mod repl;
pub mod runner;
pub mod stack;
pub mod token;

// Re-export commonly used items
pub use ast::{BlockStatement, Expression, Identifier, Program, Statement};
pub use error::{ErrorKind, FalconError, Span};
pub use lexer::Lexer;
pub use parser::Parser;
pub use token::{Token, TokenKind};

// Re-export main functions
pub use repl::start as start_repl;
pub use runner::run;
