use crate::ast::Program;
use crate::error::FalconError;
use crate::parser::Parser;
use crate::repl::{print_tokens, Mode};
use std::io;
use tracing::info;

/// Parses a whole source text, returning the tree or every diagnostic recorded.
pub fn parse_source(source: &str) -> Result<Program, Vec<FalconError>> {
    let mut parser = Parser::from_source(source);
    let program = parser.parse_program();

    if parser.diagnostics().is_empty() {
        Ok(program)
    } else {
        Err(parser.diagnostics().to_vec())
    }
}

/// Runs a file's contents in the given mode. Returns `false` when any
/// diagnostic was reported.
pub fn run(source: &str, filename: Option<&str>, mode: Mode) -> bool {
    let mut stdout = io::stdout();

    match mode {
        Mode::Tokens => {
            if let Err(error) = print_tokens(source, &mut stdout) {
                eprintln!("Error writing output: {}", error);
                return false;
            }
            true
        }
        Mode::Ast => match parse_source(source) {
            Ok(program) => {
                info!(statements = program.statements.len(), "parsed program");
                println!("{}", program);
                true
            }
            Err(errors) => {
                for error in &errors {
                    error.report(source, filename);
                }
                false
            }
        },
    }
}
