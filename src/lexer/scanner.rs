// Xn Scanner (Lexer)
// Converts source code into tokens

use crate::error::{Position, Span};
use crate::lexer::token::{Token, TokenKind};

/// Scanner that tokenizes xn source code
pub struct Scanner {
    source: Vec<char>,
    tokens: Vec<Token>,
    start: usize,
    current: usize,
    line: usize,
    column: usize,
    start_line: usize,
    start_column: usize,
}

impl Scanner {
    pub fn new(source: &str) -> Self {
        Self {
            source: source.chars().collect(),
            tokens: Vec::new(),
            start: 0,
            current: 0,
            line: 1,
            column: 1,
            start_line: 1,
            start_column: 1,
        }
    }

    /// Scan all tokens from the source
    pub fn scan_tokens(mut self) -> Vec<Token> {
        while !self.is_at_end() {
            self.start = self.current;
            self.start_line = self.line;
            self.start_column = self.column;
            self.scan_token();
        }

        self.tokens.push(Token::new(
            TokenKind::Eof,
            Span::single(self.line, self.column),
        ));
        self.tokens
    }

    fn scan_token(&mut self) {
        let c = self.advance();

        match c {
            ' ' | '\t' | '\r' | '\n' => {}

            '(' => self.add_token(TokenKind::LeftParen),
            ')' => self.add_token(TokenKind::RightParen),
            '{' => self.add_token(TokenKind::LeftBrace),
            '}' => self.add_token(TokenKind::RightBrace),
            '[' => self.add_token(TokenKind::LeftBracket),
            ']' => self.add_token(TokenKind::RightBracket),
            ',' => self.add_token(TokenKind::Comma),
            ';' => self.add_token(TokenKind::Semicolon),
            ':' => self.add_token(TokenKind::Colon),
            '.' => self.add_token(TokenKind::Dot),
            '*' => self.add_token(TokenKind::Star),
            '%' => self.add_token(TokenKind::Percent),
            '^' => self.add_token(TokenKind::BitXor),
            '~' => self.add_token(TokenKind::BitNot),

            '=' => {
                let kind = if self.match_char('=') {
                    TokenKind::Eq
                } else if self.match_char('>') {
                    TokenKind::FatArrow
                } else {
                    TokenKind::Assign
                };
                self.add_token(kind);
            }
            '+' => {
                let kind = if self.match_char('+') {
                    TokenKind::Inc
                } else {
                    TokenKind::Plus
                };
                self.add_token(kind);
            }
            '-' => {
                let kind = if self.match_char('-') {
                    TokenKind::Dec
                } else {
                    TokenKind::Minus
                };
                self.add_token(kind);
            }
            '!' => {
                let kind = if self.match_char('=') {
                    TokenKind::NotEq
                } else {
                    TokenKind::Bang
                };
                self.add_token(kind);
            }
            '<' => {
                let kind = if self.match_char('<') {
                    TokenKind::Lshift
                } else {
                    TokenKind::Less
                };
                self.add_token(kind);
            }
            '>' => {
                let kind = if self.match_char('>') {
                    TokenKind::Rshift
                } else {
                    TokenKind::Greater
                };
                self.add_token(kind);
            }
            '&' => {
                let kind = if self.match_char('&') {
                    TokenKind::And
                } else {
                    TokenKind::BitAnd
                };
                self.add_token(kind);
            }
            '|' => {
                let kind = if self.match_char('>') {
                    TokenKind::PipeOp
                } else if self.match_char('|') {
                    TokenKind::Or
                } else {
                    TokenKind::BitOr
                };
                self.add_token(kind);
            }
            '/' => {
                if self.match_char('/') {
                    while self.peek() != '\n' && !self.is_at_end() {
                        self.advance();
                    }
                } else if self.match_char('*') {
                    self.block_comment();
                } else {
                    self.add_token(TokenKind::Slash);
                }
            }

            '"' => self.string(),

            _ => {
                if c.is_ascii_digit() {
                    self.number();
                } else if is_ident_start(c) {
                    self.identifier();
                } else {
                    self.add_token(TokenKind::Illegal(c.to_string()));
                }
            }
        }
    }

    fn block_comment(&mut self) {
        while !self.is_at_end() {
            if self.peek() == '*' && self.peek_next() == '/' {
                self.advance();
                self.advance();
                return;
            }
            self.advance();
        }
        self.add_token(TokenKind::Illegal("unclosed block comment".to_string()));
    }

    /// Double-quoted string; the raw contents (including any `${…}`
    /// interpolation markers) are handed to the parser untouched.
    fn string(&mut self) {
        let mut value = String::new();
        while self.peek() != '"' && !self.is_at_end() {
            value.push(self.advance());
        }

        if self.is_at_end() {
            self.add_token(TokenKind::Illegal("unterminated string".to_string()));
            return;
        }

        self.advance(); // closing quote
        self.add_token(TokenKind::Str(value));
    }

    fn number(&mut self) {
        let mut is_float = false;
        while self.peek().is_ascii_digit() {
            self.advance();
        }
        if self.peek() == '.' && self.peek_next().is_ascii_digit() {
            is_float = true;
            self.advance();
            while self.peek().is_ascii_digit() {
                self.advance();
            }
        }

        let text: String = self.source[self.start..self.current].iter().collect();
        if is_float {
            match text.parse::<f64>() {
                Ok(v) => self.add_token(TokenKind::Float(v)),
                Err(_) => self.add_token(TokenKind::Illegal(text)),
            }
        } else {
            match text.parse::<i64>() {
                Ok(v) => self.add_token(TokenKind::Int(v)),
                Err(_) => self.add_token(TokenKind::Illegal(text)),
            }
        }
    }

    fn identifier(&mut self) {
        while is_ident_continue(self.peek()) {
            self.advance();
        }
        let text: String = self.source[self.start..self.current].iter().collect();
        let kind = TokenKind::lookup_ident(&text).unwrap_or(TokenKind::Identifier(text));
        self.add_token(kind);
    }

    fn add_token(&mut self, kind: TokenKind) {
        let span = Span::new(
            Position::new(self.start_line, self.start_column),
            Position::new(self.line, self.column.saturating_sub(1).max(1)),
        );
        self.tokens.push(Token::new(kind, span));
    }

    fn advance(&mut self) -> char {
        let c = self.source[self.current];
        self.current += 1;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        c
    }

    fn match_char(&mut self, expected: char) -> bool {
        if self.is_at_end() || self.source[self.current] != expected {
            return false;
        }
        self.advance();
        true
    }

    fn peek(&self) -> char {
        if self.is_at_end() {
            '\0'
        } else {
            self.source[self.current]
        }
    }

    fn peek_next(&self) -> char {
        if self.current + 1 >= self.source.len() {
            '\0'
        } else {
            self.source[self.current + 1]
        }
    }

    fn is_at_end(&self) -> bool {
        self.current >= self.source.len()
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_ident_continue(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        Scanner::new(source)
            .scan_tokens()
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_operators() {
        assert_eq!(
            kinds("= == => ++ -- |> || | << >> != ~"),
            vec![
                TokenKind::Assign,
                TokenKind::Eq,
                TokenKind::FatArrow,
                TokenKind::Inc,
                TokenKind::Dec,
                TokenKind::PipeOp,
                TokenKind::Or,
                TokenKind::BitOr,
                TokenKind::Lshift,
                TokenKind::Rshift,
                TokenKind::NotEq,
                TokenKind::BitNot,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_keywords_and_idents() {
        assert_eq!(
            kinds("set const x spawn in forty"),
            vec![
                TokenKind::Set,
                TokenKind::Const,
                TokenKind::Identifier("x".to_string()),
                TokenKind::Spawn,
                TokenKind::In,
                TokenKind::Identifier("forty".to_string()),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_numbers() {
        assert_eq!(
            kinds("42 3.5 7"),
            vec![
                TokenKind::Int(42),
                TokenKind::Float(3.5),
                TokenKind::Int(7),
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_skipped() {
        assert_eq!(
            kinds("1 // line\n/* block\nstill */ 2"),
            vec![TokenKind::Int(1), TokenKind::Int(2), TokenKind::Eof]
        );
    }

    #[test]
    fn test_string_keeps_interpolation_raw() {
        assert_eq!(
            kinds("\"a${x}b\""),
            vec![TokenKind::Str("a${x}b".to_string()), TokenKind::Eof]
        );
    }

    #[test]
    fn test_spans_track_lines() {
        let tokens = Scanner::new("set\nx").scan_tokens();
        assert_eq!(tokens[0].span.start.line, 1);
        assert_eq!(tokens[1].span.start.line, 2);
        assert_eq!(tokens[1].span.start.column, 1);
    }
}
