use std::rc::Rc;

use crate::location::SrcLoc;
use crate::token::{Token, TokenKind};

/// A single-pass scanner over raw source bytes.
///
/// The lexer never fails: malformed input turns into `TokenKind::Err`
/// tokens carrying a diagnostic message, and the parser decides what to do
/// with them. Once the end of input is reached, `next_token` keeps
/// returning `Eof`.
pub struct Lexer {
    file: Rc<str>,
    input: Vec<u8>,
    line: u32,
    col: u32,
    offset: usize, // next position to read
    ch: u8,        // current ASCII character, 0 at end of input
}

impl Lexer {
    pub fn new(file: &str, input: &str) -> Lexer {
        let mut l = Lexer {
            file: Rc::from(file),
            input: input.as_bytes().to_vec(),
            line: 1,
            col: 1,
            offset: 0,
            ch: 0,
        };

        // Read the first char to set the state
        l.read_char();
        l
    }

    pub fn next_token(&mut self) -> Token {
        self.skip_whitespace();

        let tok = match self.ch {
            b';' => self.make_token(TokenKind::Semicolon, ";"),
            b':' => self.make_token(TokenKind::Colon, ":"),
            b',' => self.make_token(TokenKind::Comma, ","),
            b'.' => self.make_token(TokenKind::Dot, "."),
            b'(' => self.make_token(TokenKind::LParen, "("),
            b')' => self.make_token(TokenKind::RParen, ")"),
            b'{' => self.make_token(TokenKind::LBrace, "{"),
            b'}' => self.make_token(TokenKind::RBrace, "}"),
            b'[' => self.make_token(TokenKind::LBracket, "["),
            b']' => self.make_token(TokenKind::RBracket, "]"),
            b'+' => self.make_token(TokenKind::Plus, "+"),
            b'-' => self.make_token(TokenKind::Minus, "-"),
            b'*' => self.make_token(TokenKind::Star, "*"),
            b'/' => self.make_token(TokenKind::Slash, "/"),

            b'=' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.make_token(TokenKind::Eq, "==")
                } else {
                    self.make_token(TokenKind::Assign, "=")
                }
            }
            b'!' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.make_token(TokenKind::NotEq, "!=")
                } else {
                    self.make_token(TokenKind::Bang, "!")
                }
            }
            b'<' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.make_token(TokenKind::LessEq, "<=")
                } else {
                    self.make_token(TokenKind::LessThan, "<")
                }
            }
            b'>' => {
                if self.peek_char() == b'=' {
                    self.read_char();
                    self.make_token(TokenKind::GreaterEq, ">=")
                } else {
                    self.make_token(TokenKind::GreaterThan, ">")
                }
            }

            b'"' => return self.read_string(),

            0 => self.make_token(TokenKind::Eof, "eof"),

            c if is_alpha(c) => return self.read_ident(),
            c if is_digit(c) => return self.read_num(),

            c => self.make_err(format!("unknown token '{}'", c as char)),
        };

        self.read_char(); // ready the next character
        tok
    }

    fn loc(&self) -> SrcLoc {
        SrcLoc::new(Rc::clone(&self.file), self.line, self.col)
    }

    /// Build a token at the current position and advance the column past it.
    fn make_token(&mut self, kind: TokenKind, word: &str) -> Token {
        let tok = Token::new(kind, word, self.loc());
        self.col += word.len() as u32;
        tok
    }

    fn make_err(&mut self, message: String) -> Token {
        Token::new(TokenKind::Err, message, self.loc())
    }

    /// Read the current and following characters as an identifier or keyword.
    fn read_ident(&mut self) -> Token {
        let start = self.offset - 1;

        while is_alpha(self.ch) || is_digit(self.ch) || self.ch == b'_' {
            self.read_char();
        }

        let word = String::from_utf8_lossy(&self.input[start..self.offset - 1]).into_owned();
        let kind = TokenKind::lookup_keyword(&word).unwrap_or(TokenKind::Ident);

        let tok = Token::new(kind, word, self.loc());
        self.col += tok.word.len() as u32;
        tok
    }

    /// Read the current and following characters as an integer or float
    /// literal. The numeric value itself is parsed later, by the parser.
    fn read_num(&mut self) -> Token {
        let start = self.offset - 1;

        let mut kind = TokenKind::Int;
        while is_digit(self.ch) {
            self.read_char();
        }

        if self.ch == b'.' {
            kind = TokenKind::Float;
            self.read_char();
            while is_digit(self.ch) {
                self.read_char();
            }
        }

        let word = String::from_utf8_lossy(&self.input[start..self.offset - 1]).into_owned();

        let tok = Token::new(kind, word, self.loc());
        self.col += tok.word.len() as u32;
        tok
    }

    /// Read a string literal. The stored word excludes the quotes and has
    /// escape sequences resolved.
    fn read_string(&mut self) -> Token {
        let loc = self.loc();
        self.col += 1; // opening quote

        let mut bytes: Vec<u8> = Vec::new();

        loop {
            self.read_char();
            match self.ch {
                0 => {
                    return Token::new(
                        TokenKind::Err,
                        "string literal not terminated".to_string(),
                        loc,
                    )
                }
                b'"' => break,
                b'\\' => {
                    self.read_char();
                    let resolved = match self.ch {
                        b'n' => b'\n',
                        b'r' => b'\r',
                        b't' => b'\t',
                        b'\\' => b'\\',
                        b'"' => b'"',
                        0 => {
                            return Token::new(
                                TokenKind::Err,
                                "string literal not terminated".to_string(),
                                loc,
                            )
                        }
                        c => {
                            return Token::new(
                                TokenKind::Err,
                                format!("invalid escape sequence '\\{}'", c as char),
                                loc,
                            )
                        }
                    };
                    bytes.push(resolved);
                    self.col += 2;
                }
                b'\n' => {
                    bytes.push(b'\n');
                    self.line += 1;
                    self.col = 1;
                }
                c => {
                    bytes.push(c);
                    self.col += 1;
                }
            }
        }

        self.read_char(); // move past the closing quote
        self.col += 1;

        Token::new(
            TokenKind::Str,
            String::from_utf8_lossy(&bytes).into_owned(),
            loc,
        )
    }

    fn read_char(&mut self) {
        if self.offset >= self.input.len() {
            self.ch = 0;
        } else {
            self.ch = self.input[self.offset];
        }

        self.offset += 1;
    }

    fn peek_char(&self) -> u8 {
        if self.offset >= self.input.len() {
            return 0;
        }

        self.input[self.offset]
    }

    fn skip_whitespace(&mut self) {
        loop {
            match self.ch {
                b' ' => self.col += 1,
                // tab characters count as 4 columns
                b'\t' => self.col += 4,
                b'\n' => {
                    self.col = 1;
                    self.line += 1;
                }
                // a bare carriage return rewinds the column but stays on
                // the same line
                b'\r' => self.col = 1,
                _ => return,
            }
            self.read_char();
        }
    }
}

fn is_alpha(c: u8) -> bool {
    c.is_ascii_alphabetic()
}

fn is_digit(c: u8) -> bool {
    c.is_ascii_digit()
}
