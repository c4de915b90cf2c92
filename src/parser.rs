use crate::ast::{
    BlockStatement, Expression, Identifier, InfixOperator, PrefixOperator, Program, Statement,
};
use crate::error::FalconError;
use crate::lexer::Lexer;
use crate::stack::ensure_sufficient_stack;
use crate::token::{Token, TokenKind};
use tracing::{debug, trace};

type ParseResult<T = Expression> = Result<T, FalconError>;
type PrefixParseFn = fn(&mut Parser) -> ParseResult;
type InfixParseFn = fn(&mut Parser, Expression) -> ParseResult;

/// Binding power of operators, weakest first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    /// `==` `!=`
    Equals,
    /// `<` `>`
    LessGreater,
    /// `+` `-`
    Sum,
    /// `*` `/`
    Product,
    /// `-x` `!x`
    Prefix,
    /// `f(x)`
    Call,
    /// `a[i]`
    Index,
}

impl Precedence {
    fn of(kind: TokenKind) -> Self {
        match kind {
            TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
            TokenKind::Lt | TokenKind::Gt => Precedence::LessGreater,
            TokenKind::Plus | TokenKind::Minus => Precedence::Sum,
            TokenKind::Asterisk | TokenKind::Slash => Precedence::Product,
            TokenKind::LParen => Precedence::Call,
            TokenKind::LBracket => Precedence::Index,
            _ => Precedence::Lowest,
        }
    }
}

/// Pratt parser over a two-token window (`cur_token` + `peek_token`).
///
/// Grammar violations never abort the whole program: the offending statement
/// is dropped, its diagnostic recorded, and parsing resumes at the next
/// statement boundary. Callers must check [`Parser::errors`] after
/// [`Parser::parse_program`].
pub struct Parser {
    lexer: Lexer,
    errors: Vec<FalconError>,
    cur_token: Token,
    peek_token: Token,
    // `(` `[` `{` seen up to `cur_token` and not yet closed.
    delimiters: Vec<TokenKind>,
    // Whether `cur_token` closed the innermost open delimiter.
    closed_delimiter: bool,
}

impl Parser {
    pub fn new(lexer: Lexer) -> Self {
        let mut parser = Self {
            lexer,
            errors: Vec::new(),
            cur_token: Token::default(),
            peek_token: Token::default(),
            delimiters: Vec::new(),
            closed_delimiter: false,
        };
        parser.next_token();
        parser.next_token();
        parser
    }

    pub fn from_source(source: &str) -> Self {
        Self::new(Lexer::new(source))
    }

    /// Parses statements until `Eof`. Always returns a program, possibly
    /// partial when errors were recorded.
    pub fn parse_program(&mut self) -> Program {
        let mut program = Program::default();

        while !self.cur_token_is(TokenKind::Eof) {
            match self.parse_statement() {
                Ok(statement) => program.statements.push(statement),
                Err(error) => {
                    debug!(error = %error.message, start = error.span.start, "statement discarded");
                    self.errors.push(error);
                    self.synchronize();
                }
            }
            self.next_token();
        }

        program
    }

    /// Ordered diagnostic messages recorded so far.
    pub fn errors(&self) -> Vec<String> {
        self.errors.iter().map(|error| error.message.clone()).collect()
    }

    /// Full diagnostics, with spans and help notes, for rendering.
    pub fn diagnostics(&self) -> &[FalconError] {
        &self.errors
    }

    fn next_token(&mut self) {
        let next = self.lexer.next_token();
        self.cur_token = std::mem::replace(&mut self.peek_token, next);
        self.track_delimiter();
    }

    fn track_delimiter(&mut self) {
        let kind = self.cur_token.kind;
        self.closed_delimiter = false;

        let opener = match kind {
            TokenKind::LParen | TokenKind::LBracket | TokenKind::LBrace => {
                self.delimiters.push(kind);
                return;
            }
            TokenKind::RParen => TokenKind::LParen,
            TokenKind::RBracket => TokenKind::LBracket,
            TokenKind::RBrace => TokenKind::LBrace,
            _ => return,
        };

        // A stray closer leaves the stack alone.
        if self.delimiters.last() == Some(&opener) {
            self.delimiters.pop();
            self.closed_delimiter = true;
        }
    }

    fn parse_statement(&mut self) -> ParseResult<Statement> {
        debug!(kind = %self.cur_token.kind, start = self.cur_token.span.start, "parse_statement");

        match self.cur_token.kind {
            TokenKind::Let => self.parse_let_statement(),
            TokenKind::Return => self.parse_return_statement(),
            _ => self.parse_expression_statement(),
        }
    }

    /// let <identifier> = <expression>;
    fn parse_let_statement(&mut self) -> ParseResult<Statement> {
        let token = self.cur_token.clone();

        self.expect_peek_with_help(
            TokenKind::Ident,
            "A binding needs a name: let x = 5;".to_string(),
        )?;
        let name = Identifier::new(self.cur_token.clone());

        self.expect_peek_with_help(
            TokenKind::Assign,
            format!("Bind '{}' with '=': let {} = <expression>;", name.value, name.value),
        )?;
        self.next_token();

        let value = self.parse_expression(Precedence::Lowest)?;

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Ok(Statement::Let { token, name, value })
    }

    /// return [<expression>];
    fn parse_return_statement(&mut self) -> ParseResult<Statement> {
        let token = self.cur_token.clone();

        let value = match self.peek_token.kind {
            TokenKind::Semicolon | TokenKind::RBrace | TokenKind::Eof => None,
            _ => {
                self.next_token();
                Some(self.parse_expression(Precedence::Lowest)?)
            }
        };

        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Ok(Statement::Return { token, value })
    }

    fn parse_expression_statement(&mut self) -> ParseResult<Statement> {
        let token = self.cur_token.clone();
        let expression = self.parse_expression(Precedence::Lowest)?;

        // Semicolon is optional
        if self.peek_token_is(TokenKind::Semicolon) {
            self.next_token();
        }

        Ok(Statement::Expression { token, expression })
    }

    /// { <statement>* }
    fn parse_block_statement(&mut self) -> ParseResult<BlockStatement> {
        let token = self.cur_token.clone();
        self.next_token();

        let mut statements = Vec::new();
        while !self.cur_token_is(TokenKind::RBrace) {
            if self.cur_token_is(TokenKind::Eof) {
                return Err(FalconError::parse_error_with_help(
                    self.cur_token.span,
                    "expected next token to be }, got EOF instead".to_string(),
                    "Every '{' opening a block must be closed with a matching '}'.".to_string(),
                ));
            }
            statements.push(self.parse_statement()?);
            self.next_token();
        }

        Ok(BlockStatement { token, statements })
    }

    fn parse_expression(&mut self, precedence: Precedence) -> ParseResult {
        ensure_sufficient_stack(|| self.parse_expression_inner(precedence))
    }

    fn parse_expression_inner(&mut self, precedence: Precedence) -> ParseResult {
        trace!(kind = %self.cur_token.kind, ?precedence, "parse_expression");

        let prefix = self
            .prefix_parse_fn()
            .ok_or_else(|| self.no_prefix_parse_fn_error())?;
        let mut left = prefix(self)?;

        while !self.peek_token_is(TokenKind::Semicolon) && precedence < self.peek_precedence() {
            let infix = match self.infix_parse_fn() {
                Some(infix) => infix,
                None => return Ok(left),
            };
            self.next_token();
            left = infix(self, left)?;
        }

        Ok(left)
    }

    fn prefix_parse_fn(&self) -> Option<PrefixParseFn> {
        match self.cur_token.kind {
            TokenKind::Ident => Some(Parser::parse_identifier),
            TokenKind::Int => Some(Parser::parse_integer_literal),
            TokenKind::String => Some(Parser::parse_string_literal),
            TokenKind::True | TokenKind::False => Some(Parser::parse_boolean),
            TokenKind::Bang | TokenKind::Minus => Some(Parser::parse_prefix_expression),
            TokenKind::LParen => Some(Parser::parse_grouped_expression),
            TokenKind::If => Some(Parser::parse_if_expression),
            TokenKind::Function => Some(Parser::parse_function_literal),
            TokenKind::LBracket => Some(Parser::parse_array_literal),
            TokenKind::LBrace => Some(Parser::parse_hash_literal),
            _ => None,
        }
    }

    fn infix_parse_fn(&self) -> Option<InfixParseFn> {
        match self.peek_token.kind {
            TokenKind::Plus
            | TokenKind::Minus
            | TokenKind::Asterisk
            | TokenKind::Slash
            | TokenKind::Eq
            | TokenKind::NotEq
            | TokenKind::Lt
            | TokenKind::Gt => Some(Parser::parse_infix_expression),
            TokenKind::LParen => Some(Parser::parse_call_expression),
            TokenKind::LBracket => Some(Parser::parse_index_expression),
            _ => None,
        }
    }

    fn parse_identifier(&mut self) -> ParseResult {
        Ok(Expression::Identifier(Identifier::new(self.cur_token.clone())))
    }

    fn parse_integer_literal(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let value = token.literal.parse::<i64>().map_err(|_| {
            FalconError::parse_error_with_help(
                token.span,
                format!("could not parse {} as integer", token.literal),
                format!("Integer literals must fit in 64 bits (at most {}).", i64::MAX),
            )
        })?;
        Ok(Expression::Integer { token, value })
    }

    fn parse_string_literal(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let value = token.literal.clone();
        Ok(Expression::String { token, value })
    }

    fn parse_boolean(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let value = token.is(TokenKind::True);
        Ok(Expression::Boolean { token, value })
    }

    fn parse_prefix_expression(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let operator = match token.kind {
            TokenKind::Bang => PrefixOperator::Not,
            _ => PrefixOperator::Negate,
        };

        self.next_token();
        let right = self.parse_expression(Precedence::Prefix)?;

        Ok(Expression::Prefix {
            token,
            operator,
            right: Box::new(right),
        })
    }

    fn parse_infix_expression(&mut self, left: Expression) -> ParseResult {
        let token = self.cur_token.clone();
        let operator = match token.kind {
            TokenKind::Plus => InfixOperator::Add,
            TokenKind::Minus => InfixOperator::Subtract,
            TokenKind::Asterisk => InfixOperator::Multiply,
            TokenKind::Slash => InfixOperator::Divide,
            TokenKind::Eq => InfixOperator::Equal,
            TokenKind::NotEq => InfixOperator::NotEqual,
            TokenKind::Lt => InfixOperator::Less,
            _ => InfixOperator::Greater,
        };

        let precedence = self.cur_precedence();
        self.next_token();
        let right = self.parse_expression(precedence)?;

        Ok(Expression::Infix {
            token,
            left: Box::new(left),
            operator,
            right: Box::new(right),
        })
    }

    /// ( <expression> )
    fn parse_grouped_expression(&mut self) -> ParseResult {
        self.next_token();
        let expression = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek_with_help(
            TokenKind::RParen,
            "Every opening parenthesis '(' must have a matching closing parenthesis ')'."
                .to_string(),
        )?;
        Ok(expression)
    }

    /// if ( <condition> ) { ... } [else { ... }]
    fn parse_if_expression(&mut self) -> ParseResult {
        let token = self.cur_token.clone();

        self.expect_peek_with_help(
            TokenKind::LParen,
            "If expressions require parentheses around the condition: if (condition) { ... }"
                .to_string(),
        )?;
        self.next_token();
        let condition = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek_with_help(
            TokenKind::RParen,
            "If conditions must be enclosed in parentheses: if (condition) { ... }".to_string(),
        )?;
        self.expect_peek_with_help(
            TokenKind::LBrace,
            "The body of an if expression is a block: if (condition) { ... }".to_string(),
        )?;
        let consequence = self.parse_block_statement()?;

        let alternative = if self.peek_token_is(TokenKind::Else) {
            self.next_token();
            self.expect_peek_with_help(
                TokenKind::LBrace,
                "The else branch is a block: else { ... }".to_string(),
            )?;
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        Ok(Expression::If {
            token,
            condition: Box::new(condition),
            consequence,
            alternative,
        })
    }

    /// fn ( <parameters> ) { ... }
    fn parse_function_literal(&mut self) -> ParseResult {
        let token = self.cur_token.clone();

        self.expect_peek_with_help(
            TokenKind::LParen,
            "Function literals list their parameters in parentheses: fn(x, y) { ... }".to_string(),
        )?;
        let parameters = self.parse_function_parameters()?;
        self.expect_peek_with_help(
            TokenKind::LBrace,
            "The body of a function literal is a block: fn(x, y) { ... }".to_string(),
        )?;
        let body = self.parse_block_statement()?;

        Ok(Expression::Function {
            token,
            parameters,
            body,
        })
    }

    fn parse_function_parameters(&mut self) -> ParseResult<Vec<Identifier>> {
        let mut parameters = Vec::new();

        if self.peek_token_is(TokenKind::RParen) {
            self.next_token();
            return Ok(parameters);
        }

        self.expect_peek(TokenKind::Ident)?;
        parameters.push(Identifier::new(self.cur_token.clone()));

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.expect_peek(TokenKind::Ident)?;
            parameters.push(Identifier::new(self.cur_token.clone()));
        }

        self.expect_peek_with_help(
            TokenKind::RParen,
            "Parameters are identifiers separated by commas: fn(a, b) { ... }".to_string(),
        )?;
        Ok(parameters)
    }

    fn parse_call_expression(&mut self, function: Expression) -> ParseResult {
        let token = self.cur_token.clone();
        let arguments = self.parse_expression_list(TokenKind::RParen)?;

        Ok(Expression::Call {
            token,
            function: Box::new(function),
            arguments,
        })
    }

    fn parse_index_expression(&mut self, left: Expression) -> ParseResult {
        let token = self.cur_token.clone();

        self.next_token();
        let index = self.parse_expression(Precedence::Lowest)?;
        self.expect_peek_with_help(
            TokenKind::RBracket,
            "Index expressions must be closed with ']': items[0]".to_string(),
        )?;

        Ok(Expression::Index {
            token,
            left: Box::new(left),
            index: Box::new(index),
        })
    }

    /// [ <expression>, ... ]
    fn parse_array_literal(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let elements = self.parse_expression_list(TokenKind::RBracket)?;
        Ok(Expression::Array { token, elements })
    }

    /// { <expression> : <expression>, ... }
    fn parse_hash_literal(&mut self) -> ParseResult {
        let token = self.cur_token.clone();
        let mut pairs = Vec::new();

        while !self.peek_token_is(TokenKind::RBrace) {
            self.next_token();
            let key = self.parse_expression(Precedence::Lowest)?;

            self.expect_peek_with_help(
                TokenKind::Colon,
                "Hash entries require a colon between key and value: {\"key\": \"value\"}"
                    .to_string(),
            )?;
            self.next_token();
            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            if !self.peek_token_is(TokenKind::RBrace) {
                self.expect_peek_with_help(
                    TokenKind::Comma,
                    "Hash entries are separated by commas and closed with '}'.".to_string(),
                )?;
            }
        }

        self.expect_peek(TokenKind::RBrace)?;
        Ok(Expression::Hash { token, pairs })
    }

    /// Comma-separated expressions up to `end`; the opening delimiter is the current token.
    fn parse_expression_list(&mut self, end: TokenKind) -> ParseResult<Vec<Expression>> {
        let mut list = Vec::new();

        if self.peek_token_is(end) {
            self.next_token();
            return Ok(list);
        }

        self.next_token();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while self.peek_token_is(TokenKind::Comma) {
            self.next_token();
            self.next_token();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        self.expect_peek_with_help(
            end,
            format!("Separate items with ',' and close the list with '{}'.", end),
        )?;
        Ok(list)
    }

    fn cur_token_is(&self, kind: TokenKind) -> bool {
        self.cur_token.is(kind)
    }

    fn peek_token_is(&self, kind: TokenKind) -> bool {
        self.peek_token.is(kind)
    }

    fn cur_precedence(&self) -> Precedence {
        Precedence::of(self.cur_token.kind)
    }

    fn peek_precedence(&self) -> Precedence {
        Precedence::of(self.peek_token.kind)
    }

    /// Advances onto the peek token if it has the expected kind.
    fn expect_peek(&mut self, kind: TokenKind) -> ParseResult<()> {
        if self.peek_token_is(kind) {
            self.next_token();
            Ok(())
        } else {
            Err(self.peek_error(kind, None))
        }
    }

    fn expect_peek_with_help(&mut self, kind: TokenKind, help: String) -> ParseResult<()> {
        if self.peek_token_is(kind) {
            self.next_token();
            Ok(())
        } else {
            Err(self.peek_error(kind, Some(help)))
        }
    }

    fn peek_error(&self, expected: TokenKind, help: Option<String>) -> FalconError {
        let message = format!(
            "expected next token to be {}, got {} instead",
            expected, self.peek_token.kind
        );
        match help {
            Some(help) => FalconError::parse_error_with_help(self.peek_token.span, message, help),
            None => FalconError::parse_error(self.peek_token.span, message),
        }
    }

    fn no_prefix_parse_fn_error(&self) -> FalconError {
        let token = &self.cur_token;

        if token.is(TokenKind::Illegal) {
            if token.literal.starts_with('"') {
                return FalconError::lex_error_with_help(
                    token.span,
                    "unterminated string literal".to_string(),
                    "Close the string with a matching '\"'.".to_string(),
                );
            }
            return FalconError::lex_error(
                token.span,
                format!("illegal character '{}'", token.literal),
            );
        }

        let help = match token.kind {
            TokenKind::RParen => "Found ')' without matching '('. Check for unbalanced parentheses.",
            TokenKind::RBrace => "Found '}' without matching '{'. Check for unbalanced braces.",
            TokenKind::RBracket => "Found ']' without matching '['. Check for unbalanced brackets.",
            TokenKind::Eof => "Reached end of input while expecting an expression.",
            _ => "Expected a literal, identifier, prefix operator or parenthesized expression here.",
        };

        FalconError::parse_error_with_help(
            token.span,
            format!("no prefix parse function for {} found", token.kind),
            help.to_string(),
        )
    }

    /// Skips the rest of a failed statement: up to the next `;` outside any
    /// block, or past the `}` that closes the last delimiter still open.
    fn synchronize(&mut self) {
        while !self.cur_token_is(TokenKind::Eof) {
            match self.cur_token.kind {
                TokenKind::Semicolon => {
                    // `(` and `[` never span a `;`, so drop any left open.
                    let keep = self
                        .delimiters
                        .iter()
                        .rposition(|kind| *kind == TokenKind::LBrace)
                        .map_or(0, |i| i + 1);
                    self.delimiters.truncate(keep);
                    if self.delimiters.is_empty() {
                        return;
                    }
                }
                TokenKind::RBrace
                    if self.closed_delimiter
                        && self.delimiters.is_empty()
                        && !matches!(self.peek_token.kind, TokenKind::Semicolon | TokenKind::Else) =>
                {
                    return;
                }
                _ => {}
            }
            self.next_token();
        }
    }
}
