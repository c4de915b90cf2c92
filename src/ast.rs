//! Owned syntax tree. Every node keeps the token that introduced it so later
//! stages can point diagnostics back at the source.

use crate::error::Span;
use crate::stack::ensure_sufficient_stack;
use crate::token::Token;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Program {
    pub statements: Vec<Statement>,
}

impl Program {
    pub fn token_literal(&self) -> &str {
        self.statements
            .first()
            .map(Statement::token_literal)
            .unwrap_or("")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Statement {
    Let {
        token: Token,
        name: Identifier,
        value: Expression,
    },
    Return {
        token: Token,
        value: Option<Expression>,
    },
    Expression {
        token: Token,
        expression: Expression,
    },
}

impl Statement {
    pub fn token(&self) -> &Token {
        match self {
            Statement::Let { token, .. } => token,
            Statement::Return { token, .. } => token,
            Statement::Expression { token, .. } => token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }

    pub fn span(&self) -> Span {
        self.token().span
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Identifier {
    pub token: Token,
    pub value: String,
}

impl Identifier {
    pub fn new(token: Token) -> Self {
        let value = token.literal.clone();
        Self { token, value }
    }
}

/// `{ ... }` body of an `if` branch or a function literal.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockStatement {
    pub token: Token,
    pub statements: Vec<Statement>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    Identifier(Identifier),
    Integer {
        token: Token,
        value: i64,
    },
    String {
        token: Token,
        value: String,
    },
    Boolean {
        token: Token,
        value: bool,
    },
    Prefix {
        token: Token,
        operator: PrefixOperator,
        right: Box<Expression>,
    },
    Infix {
        token: Token,
        left: Box<Expression>,
        operator: InfixOperator,
        right: Box<Expression>,
    },
    If {
        token: Token,
        condition: Box<Expression>,
        consequence: BlockStatement,
        alternative: Option<BlockStatement>,
    },
    Function {
        token: Token,
        parameters: Vec<Identifier>,
        body: BlockStatement,
    },
    Call {
        token: Token,
        function: Box<Expression>,
        arguments: Vec<Expression>,
    },
    Array {
        token: Token,
        elements: Vec<Expression>,
    },
    Index {
        token: Token,
        left: Box<Expression>,
        index: Box<Expression>,
    },
    Hash {
        token: Token,
        pairs: Vec<(Expression, Expression)>,
    },
}

impl Expression {
    pub fn token(&self) -> &Token {
        match self {
            Expression::Identifier(ident) => &ident.token,
            Expression::Integer { token, .. } => token,
            Expression::String { token, .. } => token,
            Expression::Boolean { token, .. } => token,
            Expression::Prefix { token, .. } => token,
            Expression::Infix { token, .. } => token,
            Expression::If { token, .. } => token,
            Expression::Function { token, .. } => token,
            Expression::Call { token, .. } => token,
            Expression::Array { token, .. } => token,
            Expression::Index { token, .. } => token,
            Expression::Hash { token, .. } => token,
        }
    }

    pub fn token_literal(&self) -> &str {
        &self.token().literal
    }

    pub fn span(&self) -> Span {
        self.token().span
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOperator {
    Not,
    Negate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOperator {
    Add,
    Subtract,
    Multiply,
    Divide,
    Equal,
    NotEqual,
    Less,
    Greater,
}

impl fmt::Display for PrefixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            PrefixOperator::Not => write!(f, "!"),
            PrefixOperator::Negate => write!(f, "-"),
        }
    }
}

impl fmt::Display for InfixOperator {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let symbol = match self {
            InfixOperator::Add => "+",
            InfixOperator::Subtract => "-",
            InfixOperator::Multiply => "*",
            InfixOperator::Divide => "/",
            InfixOperator::Equal => "==",
            InfixOperator::NotEqual => "!=",
            InfixOperator::Less => "<",
            InfixOperator::Greater => ">",
        };
        write!(f, "{}", symbol)
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for (i, statement) in self.statements.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "{}", statement)?;
        }
        Ok(())
    }
}

impl fmt::Display for Statement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Statement::Let { name, value, .. } => write!(f, "let {} = {};", name, value),
            Statement::Return { value: Some(value), .. } => write!(f, "return {};", value),
            Statement::Return { value: None, .. } => write!(f, "return;"),
            Statement::Expression { expression, .. } => write!(f, "{}", expression),
        }
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.value)
    }
}

impl fmt::Display for BlockStatement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{{")?;
        for statement in &self.statements {
            write!(f, " {}", statement)?;
        }
        write!(f, " }}")
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        ensure_sufficient_stack(|| self.write_to(f))
    }
}

impl Expression {
    fn write_to(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Expression::Identifier(ident) => write!(f, "{}", ident),
            Expression::Integer { value, .. } => write!(f, "{}", value),
            Expression::String { value, .. } => write!(f, "{:?}", value),
            Expression::Boolean { value, .. } => write!(f, "{}", value),
            Expression::Prefix { operator, right, .. } => write!(f, "({}{})", operator, right),
            Expression::Infix {
                left,
                operator,
                right,
                ..
            } => write!(f, "({} {} {})", left, operator, right),
            Expression::If {
                condition,
                consequence,
                alternative,
                ..
            } => {
                write!(f, "if {} {}", condition, consequence)?;
                if let Some(alternative) = alternative {
                    write!(f, " else {}", alternative)?;
                }
                Ok(())
            }
            Expression::Function {
                parameters, body, ..
            } => {
                write!(f, "fn(")?;
                write_list(f, parameters)?;
                write!(f, ") {}", body)
            }
            Expression::Call {
                function,
                arguments,
                ..
            } => {
                write!(f, "{}(", function)?;
                write_list(f, arguments)?;
                write!(f, ")")
            }
            Expression::Array { elements, .. } => {
                write!(f, "[")?;
                write_list(f, elements)?;
                write!(f, "]")
            }
            Expression::Index { left, index, .. } => write!(f, "({}[{}])", left, index),
            Expression::Hash { pairs, .. } => {
                write!(f, "{{")?;
                for (i, (key, value)) in pairs.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", key, value)?;
                }
                write!(f, "}}")
            }
        }
    }
}
