use std::fmt;

use crate::ast::{
    Block, ClassDecl, Expr, ExprKind, FunctionDecl, Import, Item, Member, Name, Param, ParseTree,
    Stmt, TypeName, TypeRef, VariableDecl,
};
use crate::stack::ensure_sufficient_stack;
use crate::token::{Category, FileId, Span, Token, TokenType};

/// Classifies a parser error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseErrorKind {
    /// Expected a particular keyword or symbol, found something else or EOF.
    Expected {
        expected: TokenType,
        found: Option<String>,
    },
    /// Expected an identifier.
    ExpectedName { found: Option<String> },
    /// Expected a primitive type keyword or a type name.
    ExpectedType { found: Option<String> },
    ExpectedExpression { found: Option<String> },
    /// Top level holds something other than an import, class, function, or global.
    ExpectedDeclaration { found: Option<String> },
    /// Left side of an assignment is not a name, member, or index.
    InvalidAssignmentTarget,
    /// Statements or expressions nest deeper than [`MAX_NESTING`].
    NestingTooDeep { limit: usize },
}

impl fmt::Display for ParseErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (what, found) = match self {
            Self::Expected { expected, found } => (format!("'{expected}'"), found),
            Self::ExpectedName { found } => ("identifier".to_string(), found),
            Self::ExpectedType { found } => ("type".to_string(), found),
            Self::ExpectedExpression { found } => ("expression".to_string(), found),
            Self::ExpectedDeclaration { found } => ("declaration".to_string(), found),
            Self::InvalidAssignmentTarget => return f.write_str("invalid assignment target"),
            Self::NestingTooDeep { limit } => {
                return write!(f, "nesting deeper than {limit} levels");
            }
        };
        match found {
            None => write!(f, "expected {what} before end of input"),
            Some(t) => write!(f, "expected {what}, got '{t}'"),
        }
    }
}

/// Error produced during parsing.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{kind} at line {}, column {}", span.line, span.column)]
pub struct ParseError {
    pub kind: ParseErrorKind,
    pub span: Span,
}

/// Parse a token stream into a [`ParseTree`].
///
/// Parsing stops at the first rule that fails. A trailing
/// [`TokenType::EndOfStream`] is optional.
///
/// # Errors
///
/// Returns `ParseError` on syntax errors such as a missing `;`,
/// unbalanced braces, or a token that cannot start an expression.
pub fn parse(tokens: &[Token]) -> Result<ParseTree, ParseError> {
    Parser::new(tokens).parse()
}

/// Deepest nesting of statements and expressions a tree may have.
///
/// Every nested statement, parenthesis, operator, and postfix suffix adds a
/// level, so a flat chain like `a + b + c` counts one level per operator.
pub const MAX_NESTING: usize = 256;

/// Binding strength of a binary operator. Higher binds tighter.
const fn binary_precedence(kind: TokenType) -> Option<u8> {
    use TokenType as T;
    let level = match kind {
        T::OrOr => 1,
        T::AndAnd => 2,
        T::BitOr => 3,
        T::BitXor => 4,
        T::BitAnd => 5,
        T::Eq | T::NotEq => 6,
        T::Less | T::Greater | T::LessEq | T::GreaterEq => 7,
        T::Shl | T::Shr => 8,
        T::Add | T::Sub => 9,
        T::Mul | T::Div | T::Mod => 10,
        _ => return None,
    };
    Some(level)
}

/// Keywords that can begin a type. `var` declares an inferred type.
fn is_type_keyword(kind: TokenType) -> bool {
    kind.category() == Category::Primitive || kind == TokenType::Var
}

const fn is_name(kind: TokenType) -> bool {
    matches!(kind, TokenType::Identifier | TokenType::MethodIdentifier)
}

struct Parser<'a> {
    tokens: &'a [Token],
    pos: usize,
    depth: usize,
}

impl<'a> Parser<'a> {
    const fn new(tokens: &'a [Token]) -> Self {
        Self {
            tokens,
            pos: 0,
            depth: 0,
        }
    }

    fn parse(mut self) -> Result<ParseTree, ParseError> {
        let file = self.tokens.first().map_or_else(FileId::default, Token::file);
        let mut tree = ParseTree {
            file,
            imports: Vec::new(),
            items: Vec::new(),
        };

        while let Some(token) = self.peek() {
            if token.kind == TokenType::Import {
                tree.imports.push(self.parse_import()?);
            } else {
                tree.items.push(self.parse_item()?);
            }
        }

        Ok(tree)
    }

    // ------------------------------------------------------------------
    // Declarations
    // ------------------------------------------------------------------

    fn parse_import(&mut self) -> Result<Import, ParseError> {
        let span = self.expect(TokenType::Import)?.span();
        let mut path = vec![self.expect_name()?.lexeme.clone()];
        while self.eat(TokenType::Dot) {
            path.push(self.expect_name()?.lexeme.clone());
        }
        self.expect(TokenType::Semicolon)?;
        Ok(Import { path, span })
    }

    fn parse_item(&mut self) -> Result<Item, ParseError> {
        let span = self.current_span();
        let modifiers = self.parse_modifiers();

        if matches!(
            self.peek_kind(),
            Some(TokenType::Class | TokenType::Struct)
        ) {
            return Ok(Item::Class(self.parse_class(modifiers, span)?));
        }
        if !self.peek_kind().is_some_and(|k| is_type_keyword(k) || k == TokenType::Identifier) {
            return Err(self.error_here(|found| ParseErrorKind::ExpectedDeclaration { found }));
        }

        Ok(match self.parse_member(modifiers, span)? {
            Member::Field(v) => Item::Variable(v),
            Member::Method(f) => Item::Function(f),
        })
    }

    fn parse_modifiers(&mut self) -> Vec<TokenType> {
        let mut modifiers = Vec::new();
        while let Some(kind) = self.peek_kind() {
            if kind.category() != Category::Modifier {
                break;
            }
            modifiers.push(kind);
            self.pos += 1;
        }
        modifiers
    }

    fn parse_class(
        &mut self,
        modifiers: Vec<TokenType>,
        span: Span,
    ) -> Result<ClassDecl, ParseError> {
        let keyword = self.peek_kind().unwrap_or(TokenType::Class);
        self.pos += 1;
        let name = self.expect_name()?.lexeme.clone();

        let base = if self.eat(TokenType::Extends) {
            let token = self.expect_name()?;
            Some(Name {
                text: token.lexeme.clone(),
                span: token.span(),
            })
        } else {
            None
        };

        self.expect(TokenType::LBrace)?;
        let mut members = Vec::new();
        while self.peek().is_some_and(|t| t.kind != TokenType::RBrace) {
            let start = self.current_span();
            let member_modifiers = self.parse_modifiers();
            members.push(self.parse_member(member_modifiers, start)?);
        }
        self.expect(TokenType::RBrace)?;

        Ok(ClassDecl {
            modifiers,
            keyword,
            name,
            base,
            members,
            span,
        })
    }

    /// `type NAME ( params ) block` or `type NAME (= expr)? ;`
    fn parse_member(&mut self, modifiers: Vec<TokenType>, span: Span) -> Result<Member, ParseError> {
        let ty = self.parse_type()?;
        let name = self.expect_name()?.lexeme.clone();

        if self.at(TokenType::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_block()?;
            return Ok(Member::Method(FunctionDecl {
                modifiers,
                return_type: ty,
                name,
                params,
                body,
                span,
            }));
        }

        let init = self.parse_initializer()?;
        self.expect(TokenType::Semicolon)?;
        Ok(Member::Field(VariableDecl {
            modifiers,
            ty,
            name,
            init,
            span,
        }))
    }

    fn parse_params(&mut self) -> Result<Vec<Param>, ParseError> {
        self.expect(TokenType::LParen)?;
        let mut params = Vec::new();
        if self.eat(TokenType::RParen) {
            return Ok(params);
        }
        loop {
            let ty = self.parse_type()?;
            let token = self.expect_name()?;
            params.push(Param {
                ty,
                name: token.lexeme.clone(),
                span: token.span(),
            });
            if !self.eat(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(params)
    }

    fn parse_type(&mut self) -> Result<TypeRef, ParseError> {
        let span = self.current_span();
        let name = match self.peek() {
            Some(t) if is_type_keyword(t.kind) => TypeName::Primitive(t.kind),
            Some(t) if is_name(t.kind) => TypeName::Named(t.lexeme.clone()),
            _ => return Err(self.error_here(|found| ParseErrorKind::ExpectedType { found })),
        };
        self.pos += 1;

        let mut array_depth = 0;
        while self.at(TokenType::LBracket) && self.peek_kind_at(1) == Some(TokenType::RBracket) {
            self.pos += 2;
            array_depth += 1;
        }

        Ok(TypeRef {
            name,
            array_depth,
            span,
        })
    }

    fn parse_initializer(&mut self) -> Result<Option<Expr>, ParseError> {
        if self.eat(TokenType::Assign) {
            Ok(Some(self.parse_expr()?))
        } else {
            Ok(None)
        }
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let span = self.expect(TokenType::LBrace)?.span();
        let mut statements = Vec::new();
        while self.peek().is_some_and(|t| t.kind != TokenType::RBrace) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenType::RBrace)?;
        Ok(Block { statements, span })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        self.descend()?;
        let statement = ensure_sufficient_stack(|| self.parse_statement_kind())?;
        self.depth -= 1;
        Ok(statement)
    }

    fn parse_statement_kind(&mut self) -> Result<Stmt, ParseError> {
        let span = self.current_span();
        match self.peek_kind() {
            Some(TokenType::LBrace) => Ok(Stmt::Block(self.parse_block()?)),
            Some(TokenType::If) => self.parse_if(),
            Some(TokenType::While) => {
                self.pos += 1;
                let condition = self.parse_condition()?;
                let body = Box::new(self.parse_statement()?);
                Ok(Stmt::While {
                    condition,
                    body,
                    span,
                })
            }
            Some(TokenType::Do) => {
                self.pos += 1;
                let body = Box::new(self.parse_statement()?);
                self.expect(TokenType::While)?;
                let condition = self.parse_condition()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::DoWhile {
                    body,
                    condition,
                    span,
                })
            }
            Some(TokenType::For) => self.parse_for(),
            Some(TokenType::Return) => {
                self.pos += 1;
                let value = if self.at(TokenType::Semicolon) {
                    None
                } else {
                    Some(self.parse_expr()?)
                };
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Return { value, span })
            }
            Some(TokenType::Break) => {
                self.pos += 1;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Break(span))
            }
            Some(TokenType::Continue) => {
                self.pos += 1;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Continue(span))
            }
            _ if self.at_declaration() => Ok(Stmt::Variable(self.parse_local()?)),
            _ => {
                let expr = self.parse_expr()?;
                self.expect(TokenType::Semicolon)?;
                Ok(Stmt::Expr(expr))
            }
        }
    }

    fn parse_if(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::If)?.span();
        let condition = self.parse_condition()?;
        let then_branch = Box::new(self.parse_statement()?);
        let else_branch = if self.eat(TokenType::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };
        Ok(Stmt::If {
            condition,
            then_branch,
            else_branch,
            span,
        })
    }

    fn parse_for(&mut self) -> Result<Stmt, ParseError> {
        let span = self.expect(TokenType::For)?.span();
        self.expect(TokenType::LParen)?;

        let init = if self.eat(TokenType::Semicolon) {
            None
        } else if self.at_declaration() {
            Some(Box::new(Stmt::Variable(self.parse_local()?)))
        } else {
            let expr = self.parse_expr()?;
            self.expect(TokenType::Semicolon)?;
            Some(Box::new(Stmt::Expr(expr)))
        };

        let condition = if self.at(TokenType::Semicolon) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenType::Semicolon)?;

        let step = if self.at(TokenType::RParen) {
            None
        } else {
            Some(self.parse_expr()?)
        };
        self.expect(TokenType::RParen)?;

        let body = Box::new(self.parse_statement()?);
        Ok(Stmt::For {
            init,
            condition,
            step,
            body,
            span,
        })
    }

    /// `( expr )` after `if` or `while`.
    fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        self.expect(TokenType::LParen)?;
        let condition = self.parse_expr()?;
        self.expect(TokenType::RParen)?;
        Ok(condition)
    }

    /// A statement is a declaration when it starts with a modifier or type
    /// keyword, or with `Name name` or `Name[]`.
    fn at_declaration(&self) -> bool {
        match self.peek_kind() {
            Some(kind) if is_type_keyword(kind) || kind.category() == Category::Modifier => true,
            Some(TokenType::Identifier) => match self.peek_kind_at(1) {
                Some(next) if is_name(next) => true,
                Some(TokenType::LBracket) => self.peek_kind_at(2) == Some(TokenType::RBracket),
                _ => false,
            },
            _ => false,
        }
    }

    fn parse_local(&mut self) -> Result<VariableDecl, ParseError> {
        let span = self.current_span();
        let modifiers = self.parse_modifiers();
        let ty = self.parse_type()?;
        let name = self.expect_name()?.lexeme.clone();
        let init = self.parse_initializer()?;
        self.expect(TokenType::Semicolon)?;
        Ok(VariableDecl {
            modifiers,
            ty,
            name,
            init,
            span,
        })
    }

    // ------------------------------------------------------------------
    // Expressions
    // ------------------------------------------------------------------

    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        self.descend()?;
        let expr = ensure_sufficient_stack(|| self.parse_assignment())?;
        self.depth -= 1;
        Ok(expr)
    }

    fn parse_assignment(&mut self) -> Result<Expr, ParseError> {
        let target = self.parse_binary(1)?;

        let Some(op) = self.peek_kind().filter(|k| k.is_assignment()) else {
            return Ok(target);
        };
        if !target.is_assignable() {
            return Err(ParseError {
                kind: ParseErrorKind::InvalidAssignmentTarget,
                span: target.span,
            });
        }
        self.pos += 1;

        // right associative: a = b = c
        let value = self.parse_expr()?;
        let span = target.span;
        Ok(Expr {
            kind: ExprKind::Assign {
                op,
                target: Box::new(target),
                value: Box::new(value),
            },
            span,
        })
    }

    fn parse_binary(&mut self, min_precedence: u8) -> Result<Expr, ParseError> {
        let mut lhs = self.parse_unary()?;
        let entered = self.depth;

        while let Some(op) = self.peek_kind() {
            let Some(precedence) = binary_precedence(op) else {
                break;
            };
            if precedence < min_precedence {
                break;
            }
            self.descend()?;
            self.pos += 1;
            let rhs = self.parse_binary(precedence + 1)?;
            let span = lhs.span;
            lhs = Expr {
                kind: ExprKind::Binary {
                    op,
                    lhs: Box::new(lhs),
                    rhs: Box::new(rhs),
                },
                span,
            };
        }

        self.depth = entered;
        Ok(lhs)
    }

    fn parse_unary(&mut self) -> Result<Expr, ParseError> {
        use TokenType as T;
        let span = self.current_span();
        match self.peek_kind() {
            Some(op @ (T::Not | T::Sub | T::Add | T::BitNot | T::Incre | T::Decre)) => {
                self.descend()?;
                self.pos += 1;
                let operand = ensure_sufficient_stack(|| self.parse_unary())?;
                self.depth -= 1;
                Ok(Expr {
                    kind: ExprKind::Unary {
                        op,
                        operand: Box::new(operand),
                    },
                    span,
                })
            }
            _ => self.parse_postfix(),
        }
    }

    fn parse_postfix(&mut self) -> Result<Expr, ParseError> {
        let mut expr = self.parse_primary()?;
        let entered = self.depth;

        loop {
            let span = expr.span;
            let kind = match self.peek_kind() {
                Some(TokenType::LParen) => ExprKind::Call {
                    callee: Box::new(expr),
                    args: self.parse_args()?,
                },
                Some(TokenType::LBracket) => {
                    self.pos += 1;
                    let index = self.parse_expr()?;
                    self.expect(TokenType::RBracket)?;
                    ExprKind::Index {
                        object: Box::new(expr),
                        index: Box::new(index),
                    }
                }
                Some(TokenType::Dot) => {
                    self.pos += 1;
                    let name = self.expect_name()?.lexeme.clone();
                    ExprKind::Member {
                        object: Box::new(expr),
                        name,
                    }
                }
                Some(op @ (TokenType::Incre | TokenType::Decre)) => {
                    self.pos += 1;
                    ExprKind::Postfix {
                        op,
                        operand: Box::new(expr),
                    }
                }
                _ => break,
            };
            self.descend()?;
            expr = Expr { kind, span };
        }

        self.depth = entered;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> Result<Expr, ParseError> {
        let Some(token) = self.peek() else {
            return Err(self.error_here(|found| ParseErrorKind::ExpectedExpression { found }));
        };
        let span = token.span();

        let kind = match token.kind {
            kind if kind.is_literal() => {
                self.pos += 1;
                ExprKind::Literal {
                    kind,
                    text: token.lexeme.clone(),
                }
            }
            kind if is_name(kind) => {
                self.pos += 1;
                ExprKind::Name(token.lexeme.clone())
            }
            TokenType::This => {
                self.pos += 1;
                ExprKind::This
            }
            TokenType::Null => {
                self.pos += 1;
                ExprKind::Null
            }
            TokenType::New => {
                self.pos += 1;
                let ty = self.parse_type()?;
                let args = self.parse_args()?;
                ExprKind::New { ty, args }
            }
            TokenType::LParen => {
                self.pos += 1;
                let inner = self.parse_expr()?;
                self.expect(TokenType::RParen)?;
                return Ok(inner);
            }
            function if function.category() == Category::MathFunction => {
                self.pos += 1;
                let args = self.parse_args()?;
                ExprKind::MathCall { function, args }
            }
            _ => {
                return Err(self.error_here(|found| ParseErrorKind::ExpectedExpression { found }));
            }
        };

        Ok(Expr { kind, span })
    }

    fn parse_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        self.expect(TokenType::LParen)?;
        let mut args = Vec::new();
        if self.eat(TokenType::RParen) {
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr()?);
            if !self.eat(TokenType::Comma) {
                break;
            }
        }
        self.expect(TokenType::RParen)?;
        Ok(args)
    }

    // ------------------------------------------------------------------
    // Token helpers
    // ------------------------------------------------------------------

    /// The current token, or `None` at the end of the stream.
    fn peek(&self) -> Option<&'a Token> {
        self.tokens
            .get(self.pos)
            .filter(|t| t.kind != TokenType::EndOfStream)
    }

    fn peek_kind(&self) -> Option<TokenType> {
        self.peek().map(Token::kind)
    }

    fn peek_kind_at(&self, offset: usize) -> Option<TokenType> {
        self.tokens
            .get(self.pos + offset)
            .map(Token::kind)
            .filter(|&k| k != TokenType::EndOfStream)
    }

    fn at(&self, kind: TokenType) -> bool {
        self.peek_kind() == Some(kind)
    }

    fn eat(&mut self, kind: TokenType) -> bool {
        if self.at(kind) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: TokenType) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if token.kind == expected => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here(|found| ParseErrorKind::Expected { expected, found })),
        }
    }

    fn expect_name(&mut self) -> Result<&'a Token, ParseError> {
        match self.peek() {
            Some(token) if is_name(token.kind) => {
                self.pos += 1;
                Ok(token)
            }
            _ => Err(self.error_here(|found| ParseErrorKind::ExpectedName { found })),
        }
    }

    /// Build an error at the current token, passing its text (or `None` at
    /// end of input) to `kind`.
    fn error_here(&self, kind: impl FnOnce(Option<String>) -> ParseErrorKind) -> ParseError {
        let found = self.peek().map(|t| t.lexeme.clone());
        ParseError {
            kind: kind(found),
            span: self.current_span(),
        }
    }

    /// Enter one more level of nesting, failing past [`MAX_NESTING`].
    /// Callers step back out with `self.depth -= 1` once the level parses.
    fn descend(&mut self) -> Result<(), ParseError> {
        if self.depth >= MAX_NESTING {
            return Err(ParseError {
                kind: ParseErrorKind::NestingTooDeep { limit: MAX_NESTING },
                span: self.current_span(),
            });
        }
        self.depth += 1;
        Ok(())
    }

    fn current_span(&self) -> Span {
        self.peek().map_or_else(|| self.eof_span(), Token::span)
    }

    fn eof_span(&self) -> Span {
        self.tokens.last().map_or_else(Span::default, Token::span)
    }
}
