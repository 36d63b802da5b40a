//! Program descriptors and the parser that turns their text into statements.

use super::error::SynthesisError;
use super::lexer::{Lexer, Token, TokenKind};
use super::runtime::Library;

/// Source-level description of one compiled function.
///
/// `instructions` are statement fragments, typically assembled with the helpers in
/// [`fragment`](super::fragment); they are joined with `;` before parsing.
#[derive(Debug, Clone, Default)]
pub struct Program {
    pub name: String,
    pub locals: Vec<String>,
    pub lib: Library,
    pub instructions: Vec<String>,
}

impl Program {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn local(mut self, name: impl Into<String>) -> Self {
        self.locals.push(name.into());
        self
    }

    pub fn with_lib(mut self, lib: Library) -> Self {
        self.lib = lib;
        self
    }

    pub fn instruction(mut self, code: impl Into<String>) -> Self {
        self.instructions.push(code.into());
        self
    }

    pub fn instructions<I, S>(mut self, code: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.instructions.extend(code.into_iter().map(Into::into));
        self
    }

    pub fn source(&self) -> String {
        self.instructions.join(";\n")
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
    Expr(Expr),
    Assign {
        target: Expr,
        value: Expr,
    },
    If {
        cond: Expr,
        then: Vec<Stmt>,
        otherwise: Vec<Stmt>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Int(i64),
    Bool(bool),
    Str(String),
    Ident(String),
    Member {
        object: Box<Expr>,
        key: MemberKey,
    },
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Construct {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    Unary {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    Binary {
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Conditional {
        cond: Box<Expr>,
        then: Box<Expr>,
        otherwise: Box<Expr>,
    },
}

#[derive(Debug, Clone, PartialEq)]
pub enum MemberKey {
    Name(String),
    Index(Box<Expr>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    BitNot,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    LogicalOr,
    LogicalAnd,
    BitOr,
    BitXor,
    BitAnd,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    Shl,
    Shr,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl Expr {
    /// Short human-readable rendering used in diagnostics.
    pub fn describe(&self) -> String {
        match self {
            Expr::Int(value) => value.to_string(),
            Expr::Bool(value) => value.to_string(),
            Expr::Str(value) => format!("{value:?}"),
            Expr::Ident(name) => name.clone(),
            Expr::Member { object, key } => match key {
                MemberKey::Name(name) => format!("{}.{name}", object.describe()),
                MemberKey::Index(index) => format!("{}[{}]", object.describe(), index.describe()),
            },
            Expr::Call { callee, .. } => format!("{}(..)", callee.describe()),
            Expr::Construct { callee, .. } => format!("new {}(..)", callee.describe()),
            Expr::Unary { .. } | Expr::Binary { .. } | Expr::Conditional { .. } => {
                "an expression".into()
            }
        }
    }
}

pub fn parse(source: &str) -> Result<Vec<Stmt>, SynthesisError> {
    let mut parser = Parser::new(source);
    parser.parse_block_body(TokenKind::EOF)
}

/// Deepest syntax tree the parser will build. Parsing and lowering both recurse per level.
const MAX_NESTING: usize = 64;

/// Binary precedence levels, loosest first.
const LEVELS: &[&[(TokenKind, BinaryOp)]] = &[
    &[(TokenKind::DoublePipe, BinaryOp::LogicalOr)],
    &[(TokenKind::DoubleAmpersand, BinaryOp::LogicalAnd)],
    &[(TokenKind::Pipe, BinaryOp::BitOr)],
    &[(TokenKind::Caret, BinaryOp::BitXor)],
    &[(TokenKind::Ampersand, BinaryOp::BitAnd)],
    &[
        (TokenKind::DoubleEquals, BinaryOp::Eq),
        (TokenKind::BangEquals, BinaryOp::Ne),
    ],
    &[
        (TokenKind::LessThan, BinaryOp::Lt),
        (TokenKind::LessEquals, BinaryOp::Le),
        (TokenKind::GreaterThan, BinaryOp::Gt),
        (TokenKind::GreaterEquals, BinaryOp::Ge),
    ],
    &[
        (TokenKind::ShiftLeft, BinaryOp::Shl),
        (TokenKind::ShiftRight, BinaryOp::Shr),
    ],
    &[(TokenKind::Plus, BinaryOp::Add), (TokenKind::Dash, BinaryOp::Sub)],
    &[
        (TokenKind::Star, BinaryOp::Mul),
        (TokenKind::Slash, BinaryOp::Div),
        (TokenKind::Percent, BinaryOp::Rem),
    ],
];

struct Parser<'src> {
    lexer: Lexer<'src>,
    peeked: Option<Token>,
    depth: usize,
}

impl<'src> Parser<'src> {
    fn new(source: &'src str) -> Self {
        Self {
            lexer: Lexer::new(source),
            peeked: None,
            depth: 0,
        }
    }

    /// Claims one level of nesting; released by [`Parser::leave`].
    fn enter(&mut self) -> Result<(), SynthesisError> {
        self.depth += 1;
        if self.depth > MAX_NESTING {
            let token = self.peek()?;
            return Err(parse_error(token, "expression nested too deeply".into()));
        }
        Ok(())
    }

    fn leave(&mut self, levels: usize) {
        self.depth -= levels;
    }

    /// Statements up to (not including) `end`.
    fn parse_block_body(&mut self, end: TokenKind) -> Result<Vec<Stmt>, SynthesisError> {
        let mut statements = Vec::new();
        loop {
            if self.check(end)? {
                break;
            }
            if self.match_token(TokenKind::Semicolon)? {
                continue;
            }
            let stmt = self.parse_statement()?;
            let needs_separator = !matches!(stmt, Stmt::If { .. });
            statements.push(stmt);
            if needs_separator && !self.check(end)? {
                self.expect(TokenKind::Semicolon, "';' between statements")?;
            }
        }
        Ok(statements)
    }

    fn parse_statement(&mut self) -> Result<Stmt, SynthesisError> {
        self.enter()?;
        let stmt = self.parse_statement_inner()?;
        self.leave(1);
        Ok(stmt)
    }

    fn parse_statement_inner(&mut self) -> Result<Stmt, SynthesisError> {
        if self.check_keyword("if")? {
            return self.parse_if();
        }
        let expr = self.parse_expression()?;
        if self.match_token(TokenKind::Equals)? {
            let value = self.parse_expression()?;
            return Ok(Stmt::Assign {
                target: expr,
                value,
            });
        }
        Ok(Stmt::Expr(expr))
    }

    fn parse_if(&mut self) -> Result<Stmt, SynthesisError> {
        self.consume()?;
        self.expect(TokenKind::LParen, "'(' after 'if'")?;
        let cond = self.parse_expression()?;
        self.expect(TokenKind::RParen, "')' to close condition")?;
        let then = self.parse_branch()?;
        let otherwise = if self.check_keyword("else")? {
            self.consume()?;
            self.parse_branch()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If {
            cond,
            then,
            otherwise,
        })
    }

    fn parse_branch(&mut self) -> Result<Vec<Stmt>, SynthesisError> {
        if self.match_token(TokenKind::LBrace)? {
            let body = self.parse_block_body(TokenKind::RBrace)?;
            self.expect(TokenKind::RBrace, "'}' to close block")?;
            return Ok(body);
        }
        Ok(vec![self.parse_statement()?])
    }

    fn parse_expression(&mut self) -> Result<Expr, SynthesisError> {
        self.enter()?;
        let cond = self.parse_binary(0)?;
        if !self.match_token(TokenKind::Question)? {
            self.leave(1);
            return Ok(cond);
        }
        let then = self.parse_expression()?;
        self.expect(TokenKind::Colon, "':' in conditional expression")?;
        let otherwise = self.parse_expression()?;
        self.leave(1);
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_binary(&mut self, level: usize) -> Result<Expr, SynthesisError> {
        let Some(operators) = LEVELS.get(level) else {
            return self.parse_unary();
        };
        let mut expr = self.parse_binary(level + 1)?;
        // each operator in a left-associative chain wraps the tree one level deeper
        let mut chain = 0;
        'outer: loop {
            for (kind, op) in operators.iter() {
                if self.match_token(*kind)? {
                    self.enter()?;
                    chain += 1;
                    let rhs = self.parse_binary(level + 1)?;
                    expr = Expr::Binary {
                        op: *op,
                        lhs: Box::new(expr),
                        rhs: Box::new(rhs),
                    };
                    continue 'outer;
                }
            }
            break;
        }
        self.leave(chain);
        Ok(expr)
    }

    fn parse_unary(&mut self) -> Result<Expr, SynthesisError> {
        let op = match self.peek()?.kind {
            TokenKind::Bang => UnaryOp::Not,
            TokenKind::Dash => UnaryOp::Neg,
            TokenKind::Tilde => UnaryOp::BitNot,
            _ => return self.parse_postfix(),
        };
        self.consume()?;
        self.enter()?;
        let expr = self.parse_unary()?;
        self.leave(1);
        // fold negative literals so the full i64 range stays writable
        if let (UnaryOp::Neg, Expr::Int(value)) = (op, &expr) {
            return Ok(Expr::Int(value.wrapping_neg()));
        }
        Ok(Expr::Unary {
            op,
            expr: Box::new(expr),
        })
    }

    fn parse_postfix(&mut self) -> Result<Expr, SynthesisError> {
        let mut expr = self.parse_primary()?;
        let mut chain = 0;
        loop {
            if self.match_token(TokenKind::LParen)? {
                self.enter()?;
                chain += 1;
                let args = self.parse_argument_list()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
                continue;
            }
            if let Some(key) = self.parse_member_key()? {
                self.enter()?;
                chain += 1;
                expr = Expr::Member {
                    object: Box::new(expr),
                    key,
                };
                continue;
            }
            break;
        }
        self.leave(chain);
        Ok(expr)
    }

    fn parse_member_key(&mut self) -> Result<Option<MemberKey>, SynthesisError> {
        if self.match_token(TokenKind::Dot)? {
            let name = self.expect(TokenKind::Identifier, "property name after '.'")?;
            return Ok(Some(MemberKey::Name(name.lexeme)));
        }
        if self.match_token(TokenKind::LBracket)? {
            let index = self.parse_expression()?;
            self.expect(TokenKind::RBracket, "']' to close index")?;
            return Ok(Some(MemberKey::Index(Box::new(index))));
        }
        Ok(None)
    }

    fn parse_primary(&mut self) -> Result<Expr, SynthesisError> {
        let token = self.consume()?;
        match token.kind {
            TokenKind::LParen => {
                let expr = self.parse_expression()?;
                self.expect(TokenKind::RParen, "')' to close expression")?;
                Ok(expr)
            }
            TokenKind::Number => parse_int_literal(&token.lexeme)
                .map(Expr::Int)
                .ok_or_else(|| {
                    parse_error(&token, format!("invalid numeric literal '{}'", token.lexeme))
                }),
            TokenKind::String => Ok(Expr::Str(token.lexeme)),
            TokenKind::Identifier => match token.lexeme.as_str() {
                "true" => Ok(Expr::Bool(true)),
                "false" => Ok(Expr::Bool(false)),
                "new" => self.parse_construct(),
                "if" | "else" => Err(parse_error(
                    &token,
                    format!("'{}' is not valid in an expression", token.lexeme),
                )),
                _ => Ok(Expr::Ident(token.lexeme)),
            },
            _ => Err(parse_error(
                &token,
                format!("unexpected token '{}' in expression", token.lexeme),
            )),
        }
    }

    /// `new <member-expression>(args)`; the argument list is mandatory.
    fn parse_construct(&mut self) -> Result<Expr, SynthesisError> {
        self.enter()?;
        let mut callee = self.parse_primary()?;
        let mut chain = 1;
        while let Some(key) = self.parse_member_key()? {
            self.enter()?;
            chain += 1;
            callee = Expr::Member {
                object: Box::new(callee),
                key,
            };
        }
        self.expect(TokenKind::LParen, "'(' after constructor")?;
        let args = self.parse_argument_list()?;
        self.leave(chain);
        Ok(Expr::Construct {
            callee: Box::new(callee),
            args,
        })
    }

    fn parse_argument_list(&mut self) -> Result<Vec<Expr>, SynthesisError> {
        let mut args = Vec::new();
        if self.match_token(TokenKind::RParen)? {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expression()?);
            if self.match_token(TokenKind::Comma)? {
                continue;
            }
            self.expect(TokenKind::RParen, "')' to close argument list")?;
            break;
        }
        Ok(args)
    }

    fn expect(&mut self, kind: TokenKind, context: &str) -> Result<Token, SynthesisError> {
        let token = self.consume()?;
        if token.kind == kind {
            Ok(token)
        } else {
            let found = if token.kind == TokenKind::EOF {
                "end of input".to_string()
            } else {
                format!("'{}'", token.lexeme)
            };
            Err(parse_error(&token, format!("expected {context}, found {found}")))
        }
    }

    fn check_keyword(&mut self, keyword: &str) -> Result<bool, SynthesisError> {
        let token = self.peek()?;
        Ok(token.kind == TokenKind::Identifier && token.lexeme == keyword)
    }

    fn match_token(&mut self, kind: TokenKind) -> Result<bool, SynthesisError> {
        if self.check(kind)? {
            self.consume()?;
            Ok(true)
        } else {
            Ok(false)
        }
    }

    fn check(&mut self, kind: TokenKind) -> Result<bool, SynthesisError> {
        Ok(self.peek()?.kind == kind)
    }

    fn peek(&mut self) -> Result<&Token, SynthesisError> {
        let token = match self.peeked.take() {
            Some(token) => token,
            None => self.lexer.next_token()?,
        };
        Ok(self.peeked.insert(token))
    }

    fn consume(&mut self) -> Result<Token, SynthesisError> {
        if let Some(token) = self.peeked.take() {
            return Ok(token);
        }
        self.lexer.next_token()
    }
}

fn parse_error(token: &Token, message: String) -> SynthesisError {
    SynthesisError::Parse {
        line: token.line,
        column: token.column,
        message,
    }
}

fn parse_int_literal(lexeme: &str) -> Option<i64> {
    let cleaned = lexeme.replace('_', "");
    let (digits, radix) = match cleaned.get(..2) {
        Some("0x" | "0X") => (&cleaned[2..], 16),
        Some("0b" | "0B") => (&cleaned[2..], 2),
        Some("0o" | "0O") => (&cleaned[2..], 8),
        _ => (cleaned.as_str(), 10),
    };
    // hex/binary literals may spell the full 64-bit pattern
    let raw = u64::from_str_radix(digits, radix).ok()?;
    if radix == 10 {
        i64::try_from(raw).ok()
    } else {
        Some(raw as i64)
    }
}
