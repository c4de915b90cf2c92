use crate::lexer::Lexer;
use crate::parser::Parser;
use clap::ValueEnum;
use std::io::{self, BufRead, Write};
use tracing::debug;

const PROMPT: &str = ">> ";

/// What the driver prints for each input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Mode {
    /// The raw token stream
    Tokens,
    /// The parsed tree in canonical form
    Ast,
}

/// State that lives across REPL lines. Created once per interactive run and
/// handed to every line by reference.
#[derive(Debug)]
pub struct Session {
    mode: Mode,
    lines_read: usize,
}

impl Session {
    pub fn new(mode: Mode) -> Self {
        Self {
            mode,
            lines_read: 0,
        }
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn lines_read(&self) -> usize {
        self.lines_read
    }

    /// Handles one line of input: either a `:tokens` / `:ast` mode switch or
    /// source text to scan or parse.
    pub fn handle_line<W: Write>(&mut self, line: &str, out: &mut W) -> io::Result<()> {
        self.lines_read += 1;

        match line {
            ":tokens" => {
                self.mode = Mode::Tokens;
                writeln!(out, "mode: tokens")
            }
            ":ast" => {
                self.mode = Mode::Ast;
                writeln!(out, "mode: ast")
            }
            source => match self.mode {
                Mode::Tokens => print_tokens(source, out),
                Mode::Ast => self.print_tree(source, out),
            },
        }
    }

    fn print_tree<W: Write>(&self, source: &str, out: &mut W) -> io::Result<()> {
        let mut parser = Parser::new(Lexer::new(source));
        let program = parser.parse_program();

        if !parser.diagnostics().is_empty() {
            debug!(count = parser.diagnostics().len(), line = self.lines_read, "parser errors");
            for diagnostic in parser.diagnostics() {
                diagnostic.report(source, None);
            }
            return print_parser_errors(out, &parser.errors());
        }

        if !program.statements.is_empty() {
            writeln!(out, "{}", program)?;
        }
        Ok(())
    }
}

pub fn print_tokens<W: Write>(source: &str, out: &mut W) -> io::Result<()> {
    for token in Lexer::new(source) {
        writeln!(out, "{}", token)?;
    }
    Ok(())
}

const FALCON: &str = r#"
.------._
.-"""'-.<')    '-._
(.--. _   '._       ''---.__.-'
'   ';'-.-'         '-    ._
  .--'''  '._      - '   .
   '""'-.    '---'    ,
         '\
           '\      .'
             ''. '
                 ''.
"#;

pub fn print_parser_errors<W: Write>(out: &mut W, errors: &[String]) -> io::Result<()> {
    write!(out, "{}", FALCON)?;
    writeln!(out, "Woops! We ran into some falcon feathers here!")?;
    writeln!(out, " parser errors:")?;
    for message in errors {
        writeln!(out, "\t{}", message)?;
    }
    Ok(())
}

/// Runs the interactive loop on stdin/stdout until EOF or `exit`.
pub fn start(mode: Mode) {
    println!("Falcon v{}", env!("CARGO_PKG_VERSION"));
    println!("Type ':tokens' or ':ast' to switch mode, 'exit' or Ctrl+D to quit");
    println!();

    let mut session = Session::new(mode);
    let stdin = io::stdin();
    let mut stdout = io::stdout();

    if let Err(error) = run_loop(&mut session, stdin.lock(), &mut stdout) {
        eprintln!("Error reading input: {}", error);
    }
}

/// The read loop proper, over any input and output.
pub fn run_loop<R: BufRead, W: Write>(
    session: &mut Session,
    input: R,
    out: &mut W,
) -> io::Result<()> {
    let mut lines = input.lines();

    loop {
        write!(out, "{}", PROMPT)?;
        out.flush()?;

        let line = match lines.next() {
            Some(line) => line?,
            None => {
                // EOF reached (Ctrl+D or piped input ended)
                writeln!(out)?;
                return Ok(());
            }
        };

        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "exit" || line == "quit" {
            writeln!(out, "Goodbye!")?;
            return Ok(());
        }

        session.handle_line(line, out)?;
    }
}
