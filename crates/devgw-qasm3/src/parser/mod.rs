//! Parser for `OpenQASM` 3.

mod expression;
mod lowering;
mod statement;

pub(crate) use lowering::lower_to_circuit;

use devgw_ir::Circuit;

use crate::ast::Program;
use crate::error::{ParseError, ParseResult};
use crate::lexer::{SpannedToken, Token, tokenize};

/// Parse a QASM3 source string into a Circuit.
pub fn parse(source: &str) -> ParseResult<Circuit> {
    let program = parse_ast(source)?;
    lower_to_circuit(&program)
}

/// Parse a QASM3 source string into an AST Program.
pub fn parse_ast(source: &str) -> ParseResult<Program> {
    let mut parser = Parser::new(source)?;
    parser.parse_program()
}

/// Parser state.
pub(super) struct Parser {
    pub(super) tokens: Vec<SpannedToken>,
    pub(super) pos: usize,
    /// Line of the most recently consumed token.
    pub(super) line: usize,
}

impl Parser {
    /// Create a new parser from source.
    fn new(source: &str) -> ParseResult<Self> {
        let tokens = tokenize(source).map_err(|(position, message)| ParseError::LexerError {
            position,
            message,
        })?;

        Ok(Self {
            tokens,
            pos: 0,
            line: 1,
        })
    }

    /// Check if we've reached the end.
    pub(super) fn is_eof(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    /// Peek at the current token.
    pub(super) fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos).map(|t| &t.token)
    }

    /// Advance and return the current token.
    pub(super) fn advance(&mut self) -> Option<Token> {
        let spanned = self.tokens.get(self.pos)?;
        self.line = spanned.line;
        let token = spanned.token.clone();
        self.pos += 1;
        Some(token)
    }

    /// Expect a specific token.
    #[allow(clippy::needless_pass_by_value)]
    pub(super) fn expect(&mut self, expected: Token) -> ParseResult<()> {
        let found = self
            .advance()
            .ok_or_else(|| ParseError::UnexpectedEof(format!("expected {expected}")))?;

        if std::mem::discriminant(&found) != std::mem::discriminant(&expected) {
            return Err(self.unexpected(expected.to_string(), &found));
        }
        Ok(())
    }

    /// Build an `UnexpectedToken` error at the current line.
    pub(super) fn unexpected(&self, expected: impl Into<String>, found: &Token) -> ParseError {
        ParseError::UnexpectedToken {
            line: self.line,
            expected: expected.into(),
            found: found.to_string(),
        }
    }

    /// Check if current token matches.
    pub(super) fn check(&self, token: &Token) -> bool {
        self.peek()
            .is_some_and(|t| std::mem::discriminant(t) == std::mem::discriminant(token))
    }

    /// Consume token if it matches.
    pub(super) fn consume(&mut self, token: &Token) -> bool {
        if self.check(token) {
            self.advance();
            true
        } else {
            false
        }
    }

    /// Parse the entire program.
    fn parse_program(&mut self) -> ParseResult<Program> {
        self.expect(Token::OpenQasm)?;
        let version = self.parse_version()?;
        self.expect(Token::Semicolon)?;

        let mut statements = Vec::new();
        while !self.is_eof() {
            statements.push(self.parse_statement()?);
        }

        Ok(Program {
            version,
            statements,
        })
    }

    /// Parse version number. Only the 3.x family is accepted.
    fn parse_version(&mut self) -> ParseResult<String> {
        let version = match self.advance() {
            Some(Token::FloatLiteral(v)) => format!("{v}"),
            Some(Token::IntLiteral(v)) => format!("{v}.0"),
            Some(other) => return Err(ParseError::InvalidVersion(other.to_string())),
            None => return Err(ParseError::UnexpectedEof("version number".into())),
        };
        if !version.starts_with('3') {
            return Err(ParseError::InvalidVersion(version));
        }
        Ok(version)
    }

    /// Parse an identifier.
    pub(super) fn parse_identifier(&mut self) -> ParseResult<String> {
        match self.advance() {
            Some(Token::Identifier(s)) => Ok(s),
            Some(other) => Err(self.unexpected("identifier", &other)),
            None => Err(ParseError::UnexpectedEof("identifier".into())),
        }
    }

    /// Parse an integer literal that fits a register index.
    pub(super) fn parse_index(&mut self) -> ParseResult<u32> {
        match self.advance() {
            Some(Token::IntLiteral(v)) => u32::try_from(v)
                .map_err(|_| ParseError::Generic(format!("index {v} exceeds u32 range"))),
            Some(other) => Err(self.unexpected("integer", &other)),
            None => Err(ParseError::UnexpectedEof("integer".into())),
        }
    }
}
