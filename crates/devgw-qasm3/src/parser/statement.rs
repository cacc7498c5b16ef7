//! Statement parsing for QASM3.

use devgw_ir::Duration;

use super::Parser;
use crate::ast::{BitRef, GateCall, QubitRef, Statement};
use crate::error::{ParseError, ParseResult};
use crate::lexer::Token;

impl Parser {
    /// Parse a statement.
    pub(super) fn parse_statement(&mut self) -> ParseResult<Statement> {
        let token = self
            .peek()
            .cloned()
            .ok_or_else(|| ParseError::UnexpectedEof("statement".into()))?;

        match token {
            Token::Include => self.parse_include(),
            Token::Qubit => self.parse_qubit_decl(),
            Token::Bit => self.parse_bit_decl(),
            Token::Measure => self.parse_measure(),
            Token::Reset => self.parse_reset(),
            Token::Barrier => self.parse_barrier(),
            Token::Delay => self.parse_delay(),
            Token::If => Err(ParseError::UnsupportedStatement("if".into())),
            Token::For => Err(ParseError::UnsupportedStatement("for".into())),
            Token::Gate => Err(ParseError::UnsupportedStatement("gate definition".into())),
            Token::Identifier(_) => self.parse_identifier_statement(),
            _ => Err(self.unexpected("statement", &token)),
        }
    }

    fn parse_include(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Include)?;
        let path = match self.advance() {
            Some(Token::StringLiteral(s)) => s,
            Some(other) => return Err(self.unexpected("string literal", &other)),
            None => return Err(ParseError::UnexpectedEof("include path".into())),
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Include(path))
    }

    /// `[n]` after a declaration keyword.
    fn parse_optional_size(&mut self) -> ParseResult<Option<u32>> {
        if self.consume(&Token::LBracket) {
            let size = self.parse_index()?;
            self.expect(Token::RBracket)?;
            Ok(Some(size))
        } else {
            Ok(None)
        }
    }

    fn parse_qubit_decl(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Qubit)?;
        let size = self.parse_optional_size()?;
        let name = self.parse_identifier()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::QubitDecl { name, size })
    }

    fn parse_bit_decl(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Bit)?;
        let size = self.parse_optional_size()?;
        let name = self.parse_identifier()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::BitDecl { name, size })
    }

    /// `measure q -> c;` or a bare `measure q;`.
    fn parse_measure(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Measure)?;
        let qubits = self.parse_qubit_refs()?;
        let bits = if self.consume(&Token::Arrow) {
            self.parse_bit_refs()?
        } else {
            vec![]
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Measure { qubits, bits })
    }

    fn parse_reset(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Reset)?;
        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Reset { qubits })
    }

    fn parse_barrier(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Barrier)?;
        let qubits = if self.check(&Token::Semicolon) {
            vec![]
        } else {
            self.parse_qubit_refs()?
        };
        self.expect(Token::Semicolon)?;
        Ok(Statement::Barrier { qubits })
    }

    /// `delay[100ns] $0, $1;`
    fn parse_delay(&mut self) -> ParseResult<Statement> {
        self.expect(Token::Delay)?;
        self.expect(Token::LBracket)?;
        let duration = match self.advance() {
            Some(Token::DurationLiteral((value, unit))) => Duration::new(value, unit)?,
            Some(other) => return Err(self.unexpected("duration literal", &other)),
            None => return Err(ParseError::UnexpectedEof("duration".into())),
        };
        self.expect(Token::RBracket)?;
        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;
        Ok(Statement::Delay { duration, qubits })
    }

    /// Gate call or assignment.
    fn parse_identifier_statement(&mut self) -> ParseResult<Statement> {
        let name = self.parse_identifier()?;

        if self.check(&Token::Eq) || self.check(&Token::LBracket) {
            return self.parse_assignment(name);
        }

        self.parse_gate_call(name)
    }

    /// `c = measure q;` or `c[0] = measure $0;`. Any other assignment is
    /// classical and rejected.
    fn parse_assignment(&mut self, target: String) -> ParseResult<Statement> {
        let index = if self.consume(&Token::LBracket) {
            let idx = self.parse_index()?;
            self.expect(Token::RBracket)?;
            Some(idx)
        } else {
            None
        };

        self.expect(Token::Eq)?;

        if !self.consume(&Token::Measure) {
            return Err(ParseError::UnsupportedStatement("classical assignment".into()));
        }
        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;

        let bits = match index {
            Some(idx) => vec![BitRef::single(&target, idx)],
            None => vec![BitRef::register(&target)],
        };
        Ok(Statement::Measure { qubits, bits })
    }

    fn parse_gate_call(&mut self, name: String) -> ParseResult<Statement> {
        let params = if self.consume(&Token::LParen) {
            let p = self.parse_expression_list()?;
            self.expect(Token::RParen)?;
            p
        } else {
            vec![]
        };

        let qubits = self.parse_qubit_refs()?;
        self.expect(Token::Semicolon)?;

        Ok(Statement::Gate(GateCall {
            name,
            params,
            qubits,
        }))
    }

    fn parse_qubit_refs(&mut self) -> ParseResult<Vec<QubitRef>> {
        let mut refs = vec![self.parse_qubit_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_qubit_ref()?);
        }
        Ok(refs)
    }

    fn parse_qubit_ref(&mut self) -> ParseResult<QubitRef> {
        if let Some(Token::PhysicalQubit(n)) = self.peek() {
            let n = *n;
            self.advance();
            return Ok(QubitRef::Physical(n));
        }

        let register = self.parse_identifier()?;
        let index = if self.consume(&Token::LBracket) {
            let index = self.parse_index()?;
            self.expect(Token::RBracket)?;
            Some(index)
        } else {
            None
        };
        Ok(QubitRef::Single { register, index })
    }

    fn parse_bit_refs(&mut self) -> ParseResult<Vec<BitRef>> {
        let mut refs = vec![self.parse_bit_ref()?];
        while self.consume(&Token::Comma) {
            refs.push(self.parse_bit_ref()?);
        }
        Ok(refs)
    }

    fn parse_bit_ref(&mut self) -> ParseResult<BitRef> {
        let register = self.parse_identifier()?;
        let index = if self.consume(&Token::LBracket) {
            let index = self.parse_index()?;
            self.expect(Token::RBracket)?;
            Some(index)
        } else {
            None
        };
        Ok(BitRef::Single { register, index })
    }
}
