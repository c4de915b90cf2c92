use ariadne::{Color, Config, Fmt, IndexType, Label, Report, ReportKind, Source};
use std::io;
use thiserror::Error;

/// Byte range into the source text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        Self { start, end }
    }

    pub fn single(pos: usize) -> Self {
        Self {
            start: pos,
            end: pos + 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    LexError,
    ParseError,
    IoError,
}

#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct FalconError {
    pub kind: ErrorKind,
    pub span: Span,
    pub message: String,
    pub help: Option<String>,
}

impl FalconError {
    pub fn new(kind: ErrorKind, span: Span, message: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: None,
        }
    }

    pub fn new_with_help(kind: ErrorKind, span: Span, message: String, help: String) -> Self {
        Self {
            kind,
            span,
            message,
            help: Some(help),
        }
    }

    pub fn lex_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::LexError, span, message)
    }

    pub fn lex_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::LexError, span, message, help)
    }

    pub fn parse_error(span: Span, message: String) -> Self {
        Self::new(ErrorKind::ParseError, span, message)
    }

    pub fn parse_error_with_help(span: Span, message: String, help: String) -> Self {
        Self::new_with_help(ErrorKind::ParseError, span, message, help)
    }

    pub fn io_error(message: String) -> Self {
        Self::new(ErrorKind::IoError, Span::default(), message)
    }

    /// Renders the diagnostic to stderr, labelling the offending span.
    pub fn report(&self, source: &str, filename: Option<&str>) {
        if let Err(err) = self.write_report(source, filename, Config::default(), io::stderr()) {
            tracing::warn!(error = %err, "failed to render diagnostic");
            eprintln!("{}", self.message);
        }
    }

    /// Writes the rendered diagnostic to `out`. Spans are byte offsets into `source`.
    pub fn write_report<W: io::Write>(
        &self,
        source: &str,
        filename: Option<&str>,
        config: Config,
        out: W,
    ) -> io::Result<()> {
        let filename = filename.unwrap_or("<repl>");

        let color = match self.kind {
            ErrorKind::LexError => Color::Red,
            ErrorKind::ParseError => Color::Yellow,
            ErrorKind::IoError => Color::Magenta,
        };

        let kind_str = match self.kind {
            ErrorKind::LexError => "Lexical Error",
            ErrorKind::ParseError => "Parse Error",
            ErrorKind::IoError => "I/O Error",
        };

        // Spans may point one past the last byte (EOF); clamp so the label stays in range.
        let end = self.span.end.min(source.len()).max(self.span.start.min(source.len()));
        let start = self.span.start.min(end);

        let mut report_builder = Report::build(ReportKind::Error, filename, start)
            .with_config(config.with_index_type(IndexType::Byte))
            .with_message(format!("{}: {}", kind_str.fg(color), self.message))
            .with_label(
                Label::new((filename, start..end))
                    .with_message(&self.message)
                    .with_color(color),
            );

        if let Some(ref help_text) = self.help {
            report_builder =
                report_builder.with_note(format!("{}: {}", "help".fg(Color::Cyan), help_text));
        }

        report_builder
            .finish()
            .write((filename, Source::from(source)), out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn display_is_the_bare_message() {
        let err = FalconError::parse_error_with_help(
            Span::new(4, 5),
            "expected next token to be =, got INT instead".to_string(),
            "bindings take the form `let name = value;`".to_string(),
        );
        assert_eq!(err.to_string(), "expected next token to be =, got INT instead");
        assert_eq!(err.kind, ErrorKind::ParseError);
        assert!(err.help.is_some());
    }

    #[test]
    fn labels_use_byte_offsets() {
        // '@' sits at byte 14 but char 13: the 'é' before it is two bytes.
        let source = "let s = \"é\"; @";
        let err = FalconError::lex_error(Span::single(14), "illegal character '@'".to_string());

        let mut out = Vec::new();
        err.write_report(source, None, Config::default().with_color(false), &mut out)
            .expect("render to memory");
        let rendered = String::from_utf8(out).expect("utf-8 output");

        assert!(rendered.contains("<repl>:1:14"), "{rendered}");
        assert!(rendered.contains("illegal character '@'"), "{rendered}");
    }

    #[test]
    fn single_span_covers_one_byte() {
        assert_eq!(Span::single(7), Span::new(7, 8));
    }
}
