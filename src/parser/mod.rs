// Xn Parser
// Pratt parser producing the AST; collects errors instead of failing fast

use crate::ast::{Expr, MatchCase, Program, Stmt};
use crate::error::{Span, XnError};
use crate::lexer::{Scanner, Token, TokenKind};

/// Operator precedence, lowest binds loosest
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Pipe,        // |>
    Or,          // ||
    And,         // &&
    Equals,      // == !=
    LessGreater, // < >
    Sum,         // + -  (also postfix ++/--)
    Product,     // * / %  (also & | ^ << >>)
    Prefix,      // -x !x ~x
    Index,       // a[0]
    Dot,         // a.b
    Call,        // f(x)
}

fn token_precedence(kind: &TokenKind) -> Precedence {
    match kind {
        TokenKind::PipeOp => Precedence::Pipe,
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::Eq | TokenKind::NotEq => Precedence::Equals,
        TokenKind::Less | TokenKind::Greater => Precedence::LessGreater,
        TokenKind::Plus | TokenKind::Minus | TokenKind::Inc | TokenKind::Dec => Precedence::Sum,
        TokenKind::Star
        | TokenKind::Slash
        | TokenKind::Percent
        | TokenKind::BitAnd
        | TokenKind::BitOr
        | TokenKind::BitXor
        | TokenKind::Lshift
        | TokenKind::Rshift => Precedence::Product,
        TokenKind::LeftBracket => Precedence::Index,
        TokenKind::Dot => Precedence::Dot,
        TokenKind::LeftParen => Precedence::Call,
        _ => Precedence::Lowest,
    }
}

/// The xn parser
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    pub errors: Vec<XnError>,
    file: String,
}

impl Parser {
    pub fn new(tokens: Vec<Token>, file: impl Into<String>) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
            file: file.into(),
        }
    }

    /// Lex and parse a source string in one step
    pub fn parse_source(source: &str, file: impl Into<String>) -> (Program, Vec<XnError>) {
        let tokens = Scanner::new(source).scan_tokens();
        let mut parser = Parser::new(tokens, file);
        let program = parser.parse();
        (program, parser.errors)
    }

    pub fn parse(&mut self) -> Program {
        let mut program = Program::default();
        while !matches!(self.cur_kind(), TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                program.statements.push(stmt);
            }
            self.next();
        }
        program
    }

    // ==================== Token cursor ====================

    fn cur(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    fn peek(&self) -> &Token {
        &self.tokens[(self.pos + 1).min(self.tokens.len() - 1)]
    }

    fn cur_kind(&self) -> &TokenKind {
        &self.cur().kind
    }

    fn peek_kind(&self) -> &TokenKind {
        &self.peek().kind
    }

    fn cur_span(&self) -> Span {
        self.cur().span
    }

    fn next(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn peek_precedence(&self) -> Precedence {
        token_precedence(self.peek_kind())
    }

    fn cur_precedence(&self) -> Precedence {
        token_precedence(self.cur_kind())
    }

    fn error(&mut self, message: impl Into<String>, span: Span) {
        self.errors
            .push(XnError::syntax_error(message, span, &self.file));
    }

    fn error_here(&mut self, message: impl Into<String>) {
        let span = self.cur_span();
        self.error(message, span);
    }

    /// Consume the trailing semicolon if present
    fn skip_semicolon(&mut self) {
        if matches!(self.peek_kind(), TokenKind::Semicolon) {
            self.next();
        }
    }

    // ==================== Statements ====================

    fn parse_statement(&mut self) -> Option<Stmt> {
        match self.cur_kind() {
            TokenKind::Set => self.parse_set_statement(),
            TokenKind::Out => self.parse_out_statement(),
            TokenKind::Return => self.parse_return_statement(),
            TokenKind::If => self.parse_if_statement(),
            TokenKind::While => self.parse_while_statement(),
            TokenKind::For => self.parse_for_statement(),
            TokenKind::Spawn => self.parse_spawn_statement(),
            TokenKind::Import => self.parse_import_statement(),
            TokenKind::Throw => self.parse_throw_statement(),
            TokenKind::Break => self.parse_break_statement(),
            TokenKind::Continue => self.parse_continue_statement(),
            TokenKind::Identifier(_) if matches!(self.peek_kind(), TokenKind::Assign) => {
                self.parse_assign_statement()
            }
            TokenKind::Semicolon => None,
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_set_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next(); // past set

        let is_const = if matches!(self.cur_kind(), TokenKind::Const) {
            self.next();
            true
        } else {
            false
        };

        let name = match self.cur_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => {
                self.error_here("expected identifier after 'set'");
                return None;
            }
        };

        if !matches!(self.peek_kind(), TokenKind::Assign) {
            let span = self.peek().span;
            self.error("expected '=' in set statement", span);
            return None;
        }
        self.next(); // to =
        self.next(); // past =

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Stmt::Set {
            name,
            value,
            is_const,
            span,
        })
    }

    fn parse_assign_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        let name = match self.cur_kind() {
            TokenKind::Identifier(name) => name.clone(),
            _ => unreachable!("assign statement requires an identifier"),
        };

        self.next(); // to =
        self.next(); // past =

        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();

        Some(Stmt::Assign { name, value, span })
    }

    fn parse_out_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Stmt::Out { value, span })
    }

    fn parse_return_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Stmt::Return { value, span })
    }

    fn parse_throw_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();
        let value = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Stmt::Throw { value, span })
    }

    fn parse_break_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.skip_semicolon();
        Some(Stmt::Break { span })
    }

    fn parse_continue_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.skip_semicolon();
        Some(Stmt::Continue { span })
    }

    fn parse_import_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();
        let path = self.parse_expression(Precedence::Lowest)?;

        let alias = if matches!(self.peek_kind(), TokenKind::As) {
            self.next(); // to as
            self.next(); // past as
            match self.cur_kind() {
                TokenKind::Identifier(name) => Some(name.clone()),
                _ => {
                    self.error_here("expected identifier after 'as'");
                    return None;
                }
            }
        } else {
            None
        };

        self.skip_semicolon();
        Some(Stmt::Import { path, alias, span })
    }

    fn parse_spawn_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();

        let expr = self.parse_expression(Precedence::Lowest)?;
        if !matches!(expr, Expr::Call { .. }) {
            self.error("spawn requires a function call", span);
            return None;
        }

        self.skip_semicolon();
        Some(Stmt::Spawn { call: expr, span })
    }

    fn parse_if_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next(); // past if

        let condition = self.parse_expression(Precedence::Lowest)?;
        let consequence = self.parse_body()?;

        let alternative = if matches!(self.peek_kind(), TokenKind::Else) {
            self.next(); // to else
            Some(self.parse_body()?)
        } else {
            None
        };

        Some(Stmt::If {
            condition,
            consequence,
            alternative,
            span,
        })
    }

    fn parse_while_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next();
        let condition = self.parse_expression(Precedence::Lowest)?;
        let body = self.parse_body()?;
        Some(Stmt::While {
            condition,
            body,
            span,
        })
    }

    fn parse_for_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        self.next(); // past for

        // for x in expr { ... }
        if let TokenKind::Identifier(name) = self.cur_kind() {
            if matches!(self.peek_kind(), TokenKind::In) {
                let variable = name.clone();
                self.next(); // past ident
                self.next(); // past in
                let iterable = self.parse_expression(Precedence::Lowest)?;
                if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
                    self.error_here("expected '{' for for-in body");
                    return None;
                }
                self.next();
                let body = self.parse_block_statements();
                return Some(Stmt::ForIn {
                    variable,
                    iterable,
                    body,
                    span,
                });
            }
        }

        // C-style for ( init ; condition ; update ) { ... }
        if !matches!(self.cur_kind(), TokenKind::LeftParen) {
            self.error_here("expected '(' after 'for'");
            return None;
        }
        self.next(); // past (

        let init = Box::new(self.parse_statement()?);
        self.next(); // past ;

        let condition = self.parse_expression(Precedence::Lowest)?;
        self.next(); // past condition

        if !matches!(self.cur_kind(), TokenKind::Semicolon) {
            self.error_here("expected ';' after for condition");
            return None;
        }
        self.next(); // past ;

        let update = Box::new(self.parse_statement()?);

        if !matches!(self.peek_kind(), TokenKind::RightParen) {
            self.error_here("expected ')' after for update");
            return None;
        }
        self.next(); // to )

        if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.error_here("expected '{' for for-loop body");
            return None;
        }
        self.next(); // to {
        let body = self.parse_block_statements();

        Some(Stmt::For {
            init,
            condition,
            update,
            body,
            span,
        })
    }

    /// Braced block, or a single statement promoted to one (if/while bodies)
    fn parse_body(&mut self) -> Option<Vec<Stmt>> {
        if matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.next();
            Some(self.parse_block_statements())
        } else {
            self.next();
            let stmt = self.parse_statement()?;
            Some(vec![stmt])
        }
    }

    /// Current token is `{`; consumes through the matching `}`
    fn parse_block_statements(&mut self) -> Vec<Stmt> {
        let mut statements = Vec::new();
        self.next(); // past {

        while !matches!(self.cur_kind(), TokenKind::RightBrace | TokenKind::Eof) {
            if let Some(stmt) = self.parse_statement() {
                statements.push(stmt);
            }
            self.next();
        }
        statements
    }

    fn parse_expression_statement(&mut self) -> Option<Stmt> {
        let span = self.cur_span();
        let expr = self.parse_expression(Precedence::Lowest)?;
        self.skip_semicolon();
        Some(Stmt::Expression { expr, span })
    }

    // ==================== Expressions ====================

    fn parse_expression(&mut self, precedence: Precedence) -> Option<Expr> {
        let mut left = self.parse_prefix()?;

        while !matches!(self.peek_kind(), TokenKind::Semicolon)
            && precedence < self.peek_precedence()
        {
            left = match self.peek_kind() {
                TokenKind::Plus
                | TokenKind::Minus
                | TokenKind::Star
                | TokenKind::Slash
                | TokenKind::Percent
                | TokenKind::Eq
                | TokenKind::NotEq
                | TokenKind::Less
                | TokenKind::Greater
                | TokenKind::And
                | TokenKind::Or
                | TokenKind::BitAnd
                | TokenKind::BitOr
                | TokenKind::BitXor
                | TokenKind::Lshift
                | TokenKind::Rshift => {
                    self.next();
                    self.parse_infix_expression(left)?
                }
                TokenKind::Inc | TokenKind::Dec => {
                    self.next();
                    self.parse_postfix_expression(left)
                }
                TokenKind::PipeOp => {
                    self.next();
                    self.parse_pipe_expression(left)?
                }
                TokenKind::LeftParen => {
                    self.next();
                    self.parse_call_expression(left)?
                }
                TokenKind::LeftBracket => {
                    self.next();
                    self.parse_index_expression(left)?
                }
                TokenKind::Dot => {
                    self.next();
                    self.parse_member_expression(left)?
                }
                _ => return Some(left),
            };
        }

        Some(left)
    }

    fn parse_prefix(&mut self) -> Option<Expr> {
        let span = self.cur_span();
        match self.cur_kind().clone() {
            TokenKind::Int(value) => Some(Expr::Integer { value, span }),
            TokenKind::Float(value) => Some(Expr::Float { value, span }),
            TokenKind::Str(value) => self.parse_string_literal(&value, span),
            TokenKind::True => Some(Expr::Boolean { value: true, span }),
            TokenKind::False => Some(Expr::Boolean { value: false, span }),
            TokenKind::Identifier(name) => Some(Expr::Identifier { name, span }),
            TokenKind::Bang | TokenKind::Minus | TokenKind::BitNot => {
                let operator = self.cur_kind().to_string();
                self.next();
                let right = self.parse_expression(Precedence::Prefix)?;
                Some(Expr::Prefix {
                    operator,
                    right: Box::new(right),
                    span,
                })
            }
            TokenKind::LeftParen => self.parse_grouped_expression(),
            TokenKind::LeftBracket => self.parse_array_literal(span),
            TokenKind::LeftBrace => self.parse_hash_literal(span),
            TokenKind::Fn => self.parse_function_literal(span),
            TokenKind::Match => self.parse_match_expression(span),
            TokenKind::Try => self.parse_try_expression(span),
            TokenKind::Illegal(text) => {
                self.error(format!("illegal token: {}", text), span);
                None
            }
            other => {
                self.error(format!("unexpected token '{}' in expression", other), span);
                None
            }
        }
    }

    fn parse_infix_expression(&mut self, left: Expr) -> Option<Expr> {
        let span = self.cur_span();
        let operator = self.cur_kind().to_string();
        let precedence = self.cur_precedence();
        self.next();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Infix {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_postfix_expression(&mut self, left: Expr) -> Expr {
        let span = self.cur_span();
        let operator = self.cur_kind().to_string();
        Expr::Postfix {
            operator,
            left: Box::new(left),
            span,
        }
    }

    fn parse_pipe_expression(&mut self, left: Expr) -> Option<Expr> {
        let span = self.cur_span();
        let precedence = self.cur_precedence();
        self.next();
        let right = self.parse_expression(precedence)?;
        Some(Expr::Pipe {
            left: Box::new(left),
            right: Box::new(right),
            span,
        })
    }

    fn parse_grouped_expression(&mut self) -> Option<Expr> {
        self.next();
        let expr = self.parse_expression(Precedence::Lowest)?;
        if !matches!(self.peek_kind(), TokenKind::RightParen) {
            self.error_here("expected ')'");
            return None;
        }
        self.next();
        Some(expr)
    }

    fn parse_array_literal(&mut self, span: Span) -> Option<Expr> {
        let elements = self.parse_expression_list(&TokenKind::RightBracket)?;
        Some(Expr::Array { elements, span })
    }

    fn parse_hash_literal(&mut self, span: Span) -> Option<Expr> {
        let mut pairs = Vec::new();

        while !matches!(self.peek_kind(), TokenKind::RightBrace) {
            self.next();
            let key = self.parse_expression(Precedence::Lowest)?;

            if !matches!(self.peek_kind(), TokenKind::Colon) {
                self.error_here("expected ':' in hash literal");
                return None;
            }
            self.next(); // to colon
            self.next(); // past colon

            let value = self.parse_expression(Precedence::Lowest)?;
            pairs.push((key, value));

            match self.peek_kind() {
                TokenKind::Comma => self.next(),
                TokenKind::RightBrace => {}
                _ => {
                    self.error_here("expected ',' or '}' in hash literal");
                    return None;
                }
            }
        }
        self.next(); // consume }

        Some(Expr::HashLit { pairs, span })
    }

    fn parse_expression_list(&mut self, end: &TokenKind) -> Option<Vec<Expr>> {
        let mut list = Vec::new();

        if self.peek_kind() == end {
            self.next();
            return Some(list);
        }

        self.next();
        list.push(self.parse_expression(Precedence::Lowest)?);

        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.next();
            self.next();
            list.push(self.parse_expression(Precedence::Lowest)?);
        }

        if self.peek_kind() != end {
            self.error_here(format!("expected '{}'", end));
            return None;
        }
        self.next();
        Some(list)
    }

    fn parse_function_literal(&mut self, span: Span) -> Option<Expr> {
        if !matches!(self.peek_kind(), TokenKind::LeftParen) {
            self.error_here("expected '(' after 'fn'");
            return None;
        }
        self.next();

        let params = self.parse_function_parameters()?;

        if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.error_here("expected '{' for function body");
            return None;
        }
        self.next();
        let body = self.parse_block_statements();

        Some(Expr::Function { params, body, span })
    }

    fn parse_function_parameters(&mut self) -> Option<Vec<String>> {
        let mut params = Vec::new();

        if matches!(self.peek_kind(), TokenKind::RightParen) {
            self.next();
            return Some(params);
        }
        self.next();

        match self.cur_kind() {
            TokenKind::Identifier(name) => params.push(name.clone()),
            _ => {
                self.error_here("expected parameter name");
                return None;
            }
        }

        while matches!(self.peek_kind(), TokenKind::Comma) {
            self.next();
            self.next();
            match self.cur_kind() {
                TokenKind::Identifier(name) => params.push(name.clone()),
                _ => {
                    self.error_here("expected parameter name");
                    return None;
                }
            }
        }

        if !matches!(self.peek_kind(), TokenKind::RightParen) {
            self.error_here("expected ')' after parameters");
            return None;
        }
        self.next();
        Some(params)
    }

    fn parse_call_expression(&mut self, callee: Expr) -> Option<Expr> {
        let span = self.cur_span();
        let args = self.parse_expression_list(&TokenKind::RightParen)?;
        Some(Expr::Call {
            callee: Box::new(callee),
            args,
            span,
        })
    }

    fn parse_index_expression(&mut self, left: Expr) -> Option<Expr> {
        let span = self.cur_span();
        self.next();
        let index = self.parse_expression(Precedence::Lowest)?;
        if !matches!(self.peek_kind(), TokenKind::RightBracket) {
            self.error_here("expected ']'");
            return None;
        }
        self.next();
        Some(Expr::Index {
            left: Box::new(left),
            index: Box::new(index),
            span,
        })
    }

    fn parse_member_expression(&mut self, object: Expr) -> Option<Expr> {
        let span = self.cur_span();
        self.next(); // to member name
        let member = match self.cur_kind() {
            TokenKind::Identifier(name) => name.clone(),
            other => {
                let msg = format!("expected identifier after '.', got '{}'", other);
                self.error(msg, span);
                return None;
            }
        };
        Some(Expr::Member {
            object: Box::new(object),
            member,
            span,
        })
    }

    fn parse_match_expression(&mut self, span: Span) -> Option<Expr> {
        self.next(); // past match
        let value = self.parse_expression(Precedence::Lowest)?;

        if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.error_here("expected '{' after match value");
            return None;
        }
        self.next(); // to {

        let mut cases = Vec::new();
        while !matches!(self.peek_kind(), TokenKind::RightBrace | TokenKind::Eof) {
            self.next();
            let pattern = self.parse_expression(Precedence::Lowest)?;

            if !matches!(self.peek_kind(), TokenKind::FatArrow) {
                self.error_here("expected '=>' after match pattern");
                return None;
            }
            self.next(); // to =>
            self.next(); // past =>

            let body = if matches!(self.cur_kind(), TokenKind::LeftBrace) {
                self.parse_block_statements()
            } else {
                match self.parse_statement() {
                    Some(stmt) => vec![stmt],
                    None => return None,
                }
            };
            cases.push(MatchCase { pattern, body });

            if matches!(self.peek_kind(), TokenKind::Comma) {
                self.next();
            }
        }

        if !matches!(self.peek_kind(), TokenKind::RightBrace) {
            self.error_here("missing '}' in match expression");
            return None;
        }
        self.next(); // past }

        Some(Expr::Match {
            value: Box::new(value),
            cases,
            span,
        })
    }

    fn parse_try_expression(&mut self, span: Span) -> Option<Expr> {
        if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.error_here("expected '{' after 'try'");
            return None;
        }
        self.next();
        let block = self.parse_block_statements();

        if !matches!(self.peek_kind(), TokenKind::Catch) {
            self.error_here("expected 'catch' after try block");
            return None;
        }
        self.next(); // to catch

        let catch_param = if matches!(self.peek_kind(), TokenKind::LeftParen) {
            self.next(); // to (
            self.next(); // to ident
            let name = match self.cur_kind() {
                TokenKind::Identifier(name) => name.clone(),
                _ => {
                    self.error_here("expected identifier in catch");
                    return None;
                }
            };
            if !matches!(self.peek_kind(), TokenKind::RightParen) {
                self.error_here("expected ')' after catch parameter");
                return None;
            }
            self.next(); // to )
            Some(name)
        } else {
            None
        };

        if !matches!(self.peek_kind(), TokenKind::LeftBrace) {
            self.error_here("expected '{' after catch");
            return None;
        }
        self.next();
        let catch_block = self.parse_block_statements();

        Some(Expr::Try {
            block,
            catch_param,
            catch_block,
            span,
        })
    }

    /// Split `"a${expr}b"` into literal and sub-parsed expression parts
    fn parse_string_literal(&mut self, value: &str, span: Span) -> Option<Expr> {
        if !value.contains("${") {
            return Some(Expr::Str {
                value: value.to_string(),
                span,
            });
        }

        let mut parts = Vec::new();
        let mut rest = value;

        while !rest.is_empty() {
            match rest.find("${") {
                None => {
                    parts.push(Expr::Str {
                        value: rest.to_string(),
                        span,
                    });
                    break;
                }
                Some(idx) => {
                    if idx > 0 {
                        parts.push(Expr::Str {
                            value: rest[..idx].to_string(),
                            span,
                        });
                    }
                    rest = &rest[idx + 2..];

                    let end = match rest.find('}') {
                        Some(end) => end,
                        None => {
                            self.error("unterminated interpolation", span);
                            return None;
                        }
                    };

                    let inner = &rest[..end];
                    let tokens = Scanner::new(inner).scan_tokens();
                    let mut sub = Parser::new(tokens, &self.file);
                    let sub_program = sub.parse();
                    self.errors.extend(sub.errors);
                    if let Some(Stmt::Expression { expr, .. }) =
                        sub_program.statements.into_iter().next()
                    {
                        parts.push(expr);
                    }

                    rest = &rest[end + 1..];
                }
            }
        }

        Some(Expr::Interpolated { parts, span })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Program {
        let (program, errors) = Parser::parse_source(source, "<test>");
        assert!(errors.is_empty(), "parse errors: {:?}", errors);
        program
    }

    #[test]
    fn test_set_statement() {
        let program = parse("set x = 5;");
        assert_eq!(program.statements.len(), 1);
        match &program.statements[0] {
            Stmt::Set {
                name, is_const, ..
            } => {
                assert_eq!(name, "x");
                assert!(!is_const);
            }
            other => panic!("expected set statement, got {:?}", other),
        }
    }

    #[test]
    fn test_set_const_statement() {
        let program = parse("set const pi = 3.14;");
        match &program.statements[0] {
            Stmt::Set { name, is_const, .. } => {
                assert_eq!(name, "pi");
                assert!(is_const);
            }
            other => panic!("expected set statement, got {:?}", other),
        }
    }

    #[test]
    fn test_operator_precedence() {
        let cases = [
            ("1 + 2 * 3;", "(1 + (2 * 3))"),
            ("(1 + 2) * 3;", "((1 + 2) * 3)"),
            ("-a * b;", "((-a) * b)"),
            ("a + b > c;", "((a + b) > c)"),
            ("a || b && c;", "(a || (b && c))"),
            ("a |> f(b);", "(a |> f(b))"),
            ("a.b(1)[0];", "((a.b)(1)[0])"),
        ];
        for (source, expected) in cases {
            let program = parse(source);
            match &program.statements[0] {
                Stmt::Expression { expr, .. } => assert_eq!(expr.to_string(), expected),
                other => panic!("expected expression statement, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_postfix_expression() {
        let program = parse("i++;");
        match &program.statements[0] {
            Stmt::Expression { expr, .. } => assert_eq!(expr.to_string(), "(i++)"),
            other => panic!("expected expression statement, got {:?}", other),
        }
    }

    #[test]
    fn test_c_style_for() {
        let program = parse("for (set i = 0; i < 10; i = i + 1) { out i; }");
        match &program.statements[0] {
            Stmt::For { init, body, .. } => {
                assert!(matches!(**init, Stmt::Set { .. }));
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for statement, got {:?}", other),
        }
    }

    #[test]
    fn test_for_in() {
        let program = parse("for x in [1, 2, 3] { out x; }");
        match &program.statements[0] {
            Stmt::ForIn {
                variable, body, ..
            } => {
                assert_eq!(variable, "x");
                assert_eq!(body.len(), 1);
            }
            other => panic!("expected for-in statement, got {:?}", other),
        }
    }

    #[test]
    fn test_match_expression() {
        let program = parse("set r = match x { 1 => out 1, _ => out 0 };");
        match &program.statements[0] {
            Stmt::Set { value, .. } => match value {
                Expr::Match { cases, .. } => assert_eq!(cases.len(), 2),
                other => panic!("expected match, got {:?}", other),
            },
            other => panic!("expected set statement, got {:?}", other),
        }
    }

    #[test]
    fn test_try_catch() {
        let program = parse("set r = try { throw \"x\"; } catch (e) { e };");
        match &program.statements[0] {
            Stmt::Set { value, .. } => match value {
                Expr::Try { catch_param, .. } => {
                    assert_eq!(catch_param.as_deref(), Some("e"));
                }
                other => panic!("expected try, got {:?}", other),
            },
            other => panic!("expected set statement, got {:?}", other),
        }
    }

    #[test]
    fn test_spawn_requires_call() {
        let (_, errors) = Parser::parse_source("spawn x;", "<test>");
        assert!(!errors.is_empty());
    }

    #[test]
    fn test_spawn_call() {
        let program = parse("spawn f(1, 2);");
        assert!(matches!(program.statements[0], Stmt::Spawn { .. }));
    }

    #[test]
    fn test_import_with_alias() {
        let program = parse("import \"lib/utils\" as utils;");
        match &program.statements[0] {
            Stmt::Import { alias, .. } => assert_eq!(alias.as_deref(), Some("utils")),
            other => panic!("expected import statement, got {:?}", other),
        }
    }

    #[test]
    fn test_interpolated_string() {
        let program = parse("out \"sum: ${1 + 2}!\";");
        match &program.statements[0] {
            Stmt::Out { value, .. } => match value {
                Expr::Interpolated { parts, .. } => {
                    assert_eq!(parts.len(), 3);
                    assert!(matches!(parts[1], Expr::Infix { .. }));
                }
                other => panic!("expected interpolated string, got {:?}", other),
            },
            other => panic!("expected out statement, got {:?}", other),
        }
    }

    #[test]
    fn test_hash_literal() {
        let program = parse("set h = {\"a\": 1, 2: \"b\"};");
        match &program.statements[0] {
            Stmt::Set { value, .. } => match value {
                Expr::HashLit { pairs, .. } => assert_eq!(pairs.len(), 2),
                other => panic!("expected hash literal, got {:?}", other),
            },
            other => panic!("expected set statement, got {:?}", other),
        }
    }

    #[test]
    fn test_if_without_braces() {
        let program = parse("if x > 1 out x; else out 0;");
        match &program.statements[0] {
            Stmt::If {
                consequence,
                alternative,
                ..
            } => {
                assert_eq!(consequence.len(), 1);
                assert_eq!(alternative.as_ref().unwrap().len(), 1);
            }
            other => panic!("expected if statement, got {:?}", other),
        }
    }
}
