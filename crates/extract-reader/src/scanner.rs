use std::fmt;
use std::iter::Peekable;
use std::str::Chars;

use extract_core::ReadError;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Lparen,
    Rparen,
    Dot,
    Pin,
    Int(i64),
    Float(f64),
    Str(String),
    Ident(String),
    Atom(String),
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Lparen => f.write_str("("),
            TokenKind::Rparen => f.write_str(")"),
            TokenKind::Dot => f.write_str("."),
            TokenKind::Pin => f.write_str("\\"),
            TokenKind::Int(n) => write!(f, "{n}"),
            TokenKind::Float(n) => write!(f, "{n}"),
            TokenKind::Str(s) => write!(f, "{s:?}"),
            TokenKind::Ident(name) => f.write_str(name),
            TokenKind::Atom(name) => write!(f, ":{name}"),
        }
    }
}

/// A token together with the position of its first character. Lines and
/// columns start at 1; the column resets on every newline.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub line: u32,
    pub col: u32,
    pub kind: TokenKind,
}

/// A pull scanner over Extract source text. Tokens are produced one at
/// a time as the caller asks for them; dropping the scanner mid-stream
/// is always safe.
pub struct Scanner<'src> {
    chars: Peekable<Chars<'src>>,
    line: u32,
    col: u32,
    // Splitting `30.foo` into Int and Dot produces two tokens from one
    // scan; the second waits here.
    pending: Option<Token>,
}

impl<'src> Scanner<'src> {
    pub fn new(src: &'src str) -> Scanner<'src> {
        Scanner {
            chars: src.chars().peekable(),
            line: 1,
            col: 1,
            pending: None,
        }
    }

    /// Produce the next token, or `None` at a clean end of input.
    pub fn next_token(&mut self) -> Option<Result<Token, ReadError>> {
        if let Some(tok) = self.pending.take() {
            return Some(Ok(tok));
        }

        self.skip_trivia();
        let (line, col) = (self.line, self.col);
        let c = self.bump()?;

        let kind = match c {
            '(' => Ok(TokenKind::Lparen),
            ')' => Ok(TokenKind::Rparen),
            '.' => Ok(TokenKind::Dot),
            '\\' => Ok(TokenKind::Pin),
            '"' => self.string(line, col).map(TokenKind::Str),
            '\'' => self.rune(line, col),
            ':' => self.atom(line, col),
            '0'..='9' => self.number(c, line, col),
            '_' | 'a'..='z' => Ok(TokenKind::Ident(self.ident(c))),
            'A'..='Z' => Ok(TokenKind::Atom(self.ident(c))),
            rune => Err(ReadError::UnexpectedRune { line, col, rune }),
        };

        Some(kind.map(|kind| Token { line, col, kind }))
    }

    fn skip_trivia(&mut self) {
        while let Some(&c) = self.chars.peek() {
            if c == '#' {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c.is_whitespace() {
                self.bump();
            } else {
                break;
            }
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    /// Scan the rest of an identifier whose first character was `first`.
    /// A `?` or `!` may appear only as the final character.
    fn ident(&mut self, first: char) -> String {
        let mut text = String::from(first);
        while let Some(&c) = self.chars.peek() {
            match c {
                '_' | 'a'..='z' | 'A'..='Z' | '0'..='9' => {
                    text.push(c);
                    self.bump();
                }
                '?' | '!' => {
                    text.push(c);
                    self.bump();
                    break;
                }
                _ => break,
            }
        }
        text
    }

    fn number(&mut self, first: char, line: u32, col: u32) -> Result<TokenKind, ReadError> {
        let mut text = String::from(first);
        while let Some(c @ '0'..='9') = self.chars.peek().copied() {
            text.push(c);
            self.bump();
        }

        if self.chars.peek() == Some(&'.') {
            let (dot_line, dot_col) = (self.line, self.col);
            self.bump();
            if matches!(self.chars.peek(), Some('0'..='9')) {
                text.push('.');
                while let Some(c @ '0'..='9') = self.chars.peek().copied() {
                    text.push(c);
                    self.bump();
                }
                return match text.parse::<f64>() {
                    Ok(n) => Ok(TokenKind::Float(n)),
                    Err(err) => Err(ReadError::Token {
                        line,
                        col,
                        cause: format!("parse float literal: {err}"),
                    }),
                };
            }
            // A dot with no digits after it belongs to the next token.
            self.pending = Some(Token {
                line: dot_line,
                col: dot_col,
                kind: TokenKind::Dot,
            });
        }

        match text.parse::<i64>() {
            Ok(n) => Ok(TokenKind::Int(n)),
            Err(err) => Err(ReadError::Token {
                line,
                col,
                cause: format!("parse integer literal: {err}"),
            }),
        }
    }

    fn string(&mut self, line: u32, col: u32) -> Result<String, ReadError> {
        let mut text = String::new();
        loop {
            let Some(c) = self.bump() else {
                return Err(ReadError::Token {
                    line,
                    col,
                    cause: String::from("unexpected EOF in string literal"),
                });
            };
            match c {
                '"' => return Ok(text),
                '\\' => {
                    let Some(escaped) = self.bump() else {
                        return Err(ReadError::Token {
                            line,
                            col,
                            cause: String::from("unexpected EOF in string literal"),
                        });
                    };
                    text.push(unescape(escaped, '"', line, col)?);
                }
                c => text.push(c),
            }
        }
    }

    fn rune(&mut self, line: u32, col: u32) -> Result<TokenKind, ReadError> {
        let eof = || ReadError::Token {
            line,
            col,
            cause: String::from("unexpected EOF in rune literal"),
        };

        let val = match self.bump().ok_or_else(eof)? {
            '\'' => {
                return Err(ReadError::Token {
                    line,
                    col,
                    cause: String::from("empty rune literal"),
                });
            }
            '\\' => {
                let escaped = self.bump().ok_or_else(eof)?;
                unescape(escaped, '\'', line, col)?
            }
            c => c,
        };

        if self.bump().ok_or_else(eof)? != '\'' {
            return Err(ReadError::Token {
                line,
                col,
                cause: String::from("rune literal contains more than one rune"),
            });
        }
        Ok(TokenKind::Int(val as i64))
    }

    fn atom(&mut self, line: u32, col: u32) -> Result<TokenKind, ReadError> {
        match self.chars.peek().copied() {
            Some('"') => {
                self.bump();
                self.string(line, col).map(TokenKind::Atom)
            }
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {
                self.bump();
                Ok(TokenKind::Atom(self.ident(c)))
            }
            Some(_) | None => Err(ReadError::Token {
                line,
                col,
                cause: String::from("atom literal missing name"),
            }),
        }
    }
}

fn unescape(c: char, quote: char, line: u32, col: u32) -> Result<char, ReadError> {
    match c {
        '\\' => Ok('\\'),
        'n' => Ok('\n'),
        't' => Ok('\t'),
        c if c == quote => Ok(c),
        c => Err(ReadError::Token {
            line,
            col,
            cause: format!("invalid escape sequence {c:?}"),
        }),
    }
}

impl Iterator for Scanner<'_> {
    type Item = Result<Token, ReadError>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}
