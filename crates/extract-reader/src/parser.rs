use extract_core::{Atom, Call, Ident, List, ReadError, Value};

use crate::scanner::{Scanner, Token, TokenKind};

/// Parse a complete Extract script into its top-level expression list.
pub fn parse(src: &str) -> Result<List, ReadError> {
    Parser::new(Scanner::new(src)).parse()
}

/// Turns the scanner's token stream into expression trees. Holds a
/// one-token lookahead; tokens are pulled lazily from the scanner.
pub struct Parser<'src> {
    scanner: Scanner<'src>,
    peeked: Option<Token>,
}

impl<'src> Parser<'src> {
    pub fn new(scanner: Scanner<'src>) -> Parser<'src> {
        Parser {
            scanner,
            peeked: None,
        }
    }

    /// Parse expressions until end of input. A stray `)` at the top
    /// level is an unexpected token, not a clean end.
    pub fn parse(&mut self) -> Result<List, ReadError> {
        let mut exprs = Vec::new();
        while let Some(tok) = self.peek()? {
            if tok.kind == TokenKind::Rparen {
                return Err(unexpected(&tok, None));
            }
            exprs.push(self.expr()?);
        }
        Ok(exprs.into_iter().collect())
    }

    fn next(&mut self) -> Result<Option<Token>, ReadError> {
        if let Some(tok) = self.peeked.take() {
            return Ok(Some(tok));
        }
        self.scanner.next_token().transpose()
    }

    fn peek(&mut self) -> Result<Option<Token>, ReadError> {
        if self.peeked.is_none() {
            self.peeked = self.scanner.next_token().transpose()?;
        }
        Ok(self.peeked.clone())
    }

    fn expr(&mut self) -> Result<Value, ReadError> {
        let tok = self.next()?.ok_or(ReadError::UnexpectedEof)?;
        let mut expr = match tok.kind {
            TokenKind::Int(n) => Value::Int(n),
            TokenKind::Float(n) => Value::Float(n),
            TokenKind::Str(s) => Value::string(s),
            TokenKind::Ident(name) => Value::Ident(Ident::new(&name)),
            TokenKind::Atom(name) => Value::Atom(Atom::new(&name)),
            TokenKind::Lparen => self.call()?,
            TokenKind::Pin => self.pin()?,
            TokenKind::Rparen | TokenKind::Dot => return Err(unexpected(&tok, None)),
        };

        // Refs chain left-associatively: `A.b.c` is `(A.b).c`.
        while matches!(self.peek()?, Some(tok) if tok.kind == TokenKind::Dot) {
            self.next()?;
            expr = Value::reference(expr, self.ref_name()?);
        }
        Ok(expr)
    }

    /// The opening `(` has already been consumed.
    fn call(&mut self) -> Result<Value, ReadError> {
        let mut items = Vec::new();
        loop {
            match self.peek()? {
                None => return Err(ReadError::UnexpectedEof),
                Some(tok) if tok.kind == TokenKind::Rparen => {
                    self.next()?;
                    return Ok(Value::Call(Call(items.into_iter().collect())));
                }
                Some(_) => items.push(self.expr()?),
            }
        }
    }

    fn pin(&mut self) -> Result<Value, ReadError> {
        let tok = self.next()?.ok_or(ReadError::UnexpectedEof)?;
        match tok.kind {
            TokenKind::Ident(ref name) => Ok(Value::Pinned(Ident::new(name))),
            _ => Err(unexpected(&tok, Some("identifier"))),
        }
    }

    fn ref_name(&mut self) -> Result<Ident, ReadError> {
        let tok = self.next()?.ok_or(ReadError::UnexpectedEof)?;
        match tok.kind {
            TokenKind::Ident(ref name) => Ok(Ident::new(name)),
            _ => Err(unexpected(&tok, Some("identifier"))),
        }
    }
}

fn unexpected(tok: &Token, expected: Option<&str>) -> ReadError {
    ReadError::UnexpectedToken {
        line: tok.line,
        col: tok.col,
        got: tok.kind.to_string(),
        expected: expected.map(String::from),
    }
}
