//! TOP Parser - recursive descent over the token stream
//!
//! Precedence, low to high: comparison/assignment (`is`, `equals`, `not`,
//! `greater`, `less`) < additive (`plus`, `minus`) < multiplicative
//! (`times`, `divided`) < primary. All operators associate left. After
//! `greater`/`less` a trailing `than` is consumed and discarded, as is `by`
//! after `divided`.
//!
//! Recovery is per line: when a statement fails to parse, the error is
//! recorded and the cursor skips past the next end-of-line token before
//! resuming. The program keeps every statement that parsed cleanly.

use crate::ast::{BinaryOp, Block, Expr, Function, Program, Stmt};
use crate::error::{TopError, TopResult};
use crate::lexer::{Token, TokenKind};

pub struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    errors: Vec<TopError>,
}

impl<'a> Parser<'a> {
    pub fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            errors: Vec::new(),
        }
    }

    pub fn parse(&mut self) -> Program {
        let mut statements = Vec::new();

        while !self.at_end() {
            match self.parse_statement() {
                Ok(Some(stmt)) => statements.push(stmt),
                Ok(None) => {}
                Err(err) => {
                    self.errors.push(err);
                    self.synchronize();
                }
            }
        }

        Program { statements }
    }

    /// Diagnostics collected during `parse`, in source order.
    pub fn errors(&self) -> &[TopError] {
        &self.errors
    }

    fn parse_statement(&mut self) -> TopResult<Option<Stmt>> {
        self.skip_eols();

        match self.peek_kind() {
            TokenKind::EndOfFile => Ok(None),
            TokenKind::Function => Ok(Some(self.parse_function()?)),
            TokenKind::Var | TokenKind::Const => Ok(Some(self.parse_var_decl()?)),
            TokenKind::If => Ok(Some(self.parse_if()?)),
            TokenKind::While => Ok(Some(self.parse_while()?)),
            TokenKind::Print => {
                self.advance();
                Ok(Some(Stmt::Print(self.parse_expression()?)))
            }
            TokenKind::Return => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                Ok(Some(Stmt::Return(value)))
            }
            TokenKind::LeftBrace => Ok(Some(Stmt::Block(self.parse_block()?))),
            // Anything else is an expression statement (assignment or call).
            _ => Ok(Some(Stmt::Expr(self.parse_expression()?))),
        }
    }

    fn parse_block(&mut self) -> TopResult<Block> {
        self.expect(TokenKind::LeftBrace, "Expected '{' at the beginning of a block")?;

        let mut statements = Vec::new();
        loop {
            self.skip_eols();
            if self.check(TokenKind::RightBrace) || self.at_end() {
                break;
            }
            if let Some(stmt) = self.parse_statement()? {
                statements.push(stmt);
            }
        }

        self.expect(TokenKind::RightBrace, "Expected '}' at the end of a block")?;
        Ok(Block { statements })
    }

    fn parse_var_decl(&mut self) -> TopResult<Stmt> {
        let is_const = self.peek_kind() == TokenKind::Const;
        self.advance();

        let name = self.expect_identifier("Expected identifier after 'var' or 'const'")?;
        self.expect(TokenKind::Is, "Expected 'is' after variable name")?;
        let init = self.parse_expression()?;

        Ok(Stmt::VarDecl {
            name,
            is_const,
            init,
        })
    }

    fn parse_function(&mut self) -> TopResult<Stmt> {
        self.advance(); // 'function'
        let name = self.expect_identifier("Expected function name")?;
        self.expect(TokenKind::LeftParen, "Expected '(' after function name")?;

        let mut params = Vec::new();
        if !self.check(TokenKind::RightParen) {
            params.push(self.expect_identifier("Expected parameter name")?);
            while self.check(TokenKind::Comma) {
                self.advance();
                params.push(self.expect_identifier("Expected parameter name after comma")?);
            }
        }
        self.expect(TokenKind::RightParen, "Expected ')' after parameters")?;

        let body = self.parse_block()?;
        Ok(Stmt::Function(Function { name, params, body }))
    }

    fn parse_if(&mut self) -> TopResult<Stmt> {
        self.advance(); // 'if'
        let condition = self.parse_expression()?;
        let then_block = self.parse_block()?;

        let else_block = if self.check(TokenKind::Else) {
            self.advance();
            Some(self.parse_block()?)
        } else {
            None
        };

        Ok(Stmt::If {
            condition,
            then_block,
            else_block,
        })
    }

    fn parse_while(&mut self) -> TopResult<Stmt> {
        self.advance(); // 'while'
        let condition = self.parse_expression()?;
        let body = self.parse_block()?;
        Ok(Stmt::While { condition, body })
    }

    fn parse_expression(&mut self) -> TopResult<Expr> {
        let mut left = self.parse_term()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Is => BinaryOp::Assign,
                TokenKind::Equals => BinaryOp::Eq,
                TokenKind::Not => BinaryOp::NotEq,
                TokenKind::Greater => BinaryOp::Gt,
                TokenKind::Less => BinaryOp::Lt,
                _ => break,
            };
            self.advance();

            // "greater than" / "less than" read as the bare comparison.
            if matches!(op, BinaryOp::Gt | BinaryOp::Lt) {
                self.eat_glue_word("than");
            }

            let right = self.parse_term()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_term(&mut self) -> TopResult<Expr> {
        let mut left = self.parse_factor()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Plus => BinaryOp::Add,
                TokenKind::Minus => BinaryOp::Sub,
                _ => break,
            };
            self.advance();

            let right = self.parse_factor()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_factor(&mut self) -> TopResult<Expr> {
        let mut left = self.parse_primary()?;

        loop {
            let op = match self.peek_kind() {
                TokenKind::Times => BinaryOp::Mul,
                TokenKind::Divided => BinaryOp::Div,
                _ => break,
            };
            self.advance();

            // "divided by" reads as plain division.
            if op == BinaryOp::Div {
                self.eat_glue_word("by");
            }

            let right = self.parse_primary()?;
            left = Expr::Binary {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    fn parse_primary(&mut self) -> TopResult<Expr> {
        match self.peek_kind() {
            TokenKind::Number => {
                let value = self.current().lexeme.parse().unwrap_or(0.0);
                self.advance();
                Ok(Expr::Number(value))
            }
            TokenKind::String => {
                let value = self.current().lexeme.clone();
                self.advance();
                Ok(Expr::String(value))
            }
            TokenKind::Identifier => {
                let name = self.current().lexeme.clone();
                self.advance();

                // An identifier followed by '(' is always a call.
                if self.check(TokenKind::LeftParen) {
                    self.advance();
                    let mut args = Vec::new();
                    if !self.check(TokenKind::RightParen) {
                        args.push(self.parse_expression()?);
                        while self.check(TokenKind::Comma) {
                            self.advance();
                            args.push(self.parse_expression()?);
                        }
                    }
                    self.expect(TokenKind::RightParen, "Expected ')' after function arguments")?;
                    Ok(Expr::Call { callee: name, args })
                } else {
                    Ok(Expr::Identifier(name))
                }
            }
            TokenKind::LeftParen => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RightParen, "Expected ')'")?;
                Ok(expr)
            }
            _ => Err(self.error(&format!(
                "Expected expression, found {}",
                self.describe_current()
            ))),
        }
    }

    fn eat_glue_word(&mut self, word: &str) {
        if self.peek_kind() == TokenKind::Identifier && self.current().lexeme == word {
            self.advance();
        }
    }

    /// Skip to just past the next end-of-line so parsing can resume.
    fn synchronize(&mut self) {
        while !self.at_end() && self.peek_kind() != TokenKind::Eol {
            self.advance();
        }
        if self.peek_kind() == TokenKind::Eol {
            self.advance();
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(
            self.peek_kind(),
            TokenKind::Eol | TokenKind::EndOfFile | TokenKind::RightBrace
        )
    }

    fn describe_current(&self) -> String {
        match self.peek_kind() {
            TokenKind::Eol => "end of line".to_string(),
            TokenKind::EndOfFile => "end of file".to_string(),
            _ => format!("'{}'", self.current().lexeme),
        }
    }

    fn expect(&mut self, kind: TokenKind, message: &str) -> TopResult<()> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            Err(self.error(message))
        }
    }

    fn expect_identifier(&mut self, message: &str) -> TopResult<String> {
        if self.peek_kind() == TokenKind::Identifier {
            let name = self.current().lexeme.clone();
            self.advance();
            Ok(name)
        } else {
            Err(self.error(message))
        }
    }

    fn error(&self, message: &str) -> TopError {
        let (line, column) = self
            .tokens
            .get(self.pos)
            .map(|t| (t.line, t.column))
            .unwrap_or((0, 0));
        TopError::parser(message, line, column)
    }

    fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len().saturating_sub(1))]
    }

    fn peek_kind(&self) -> TokenKind {
        self.tokens
            .get(self.pos)
            .map(|t| t.kind)
            .unwrap_or(TokenKind::EndOfFile)
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.peek_kind() == kind
    }

    fn at_end(&self) -> bool {
        self.peek_kind() == TokenKind::EndOfFile
    }

    fn advance(&mut self) {
        if !self.at_end() {
            self.pos += 1;
        }
    }

    fn skip_eols(&mut self) {
        while self.check(TokenKind::Eol) {
            self.advance();
        }
    }
}
