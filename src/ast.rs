use crate::token::{FileId, Span, TokenType};

/// Syntax tree of one Cherry source file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseTree {
    pub file: FileId,
    pub imports: Vec<Import>,
    pub items: Vec<Item>,
}

/// `import a.b.c;`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Import {
    pub path: Vec<String>,
    pub span: Span,
}

/// Top-level declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Item {
    Class(ClassDecl),
    Function(FunctionDecl),
    Variable(VariableDecl),
}

/// `class Name extends Base { ... }` or `struct Name { ... }`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassDecl {
    pub modifiers: Vec<TokenType>,
    /// `class` or `struct`.
    pub keyword: TokenType,
    pub name: String,
    pub base: Option<Name>,
    pub members: Vec<Member>,
    pub span: Span,
}

/// Field or method inside a class body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Member {
    Field(VariableDecl),
    Method(FunctionDecl),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDecl {
    pub modifiers: Vec<TokenType>,
    pub return_type: TypeRef,
    pub name: String,
    pub params: Vec<Param>,
    pub body: Block,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Param {
    pub ty: TypeRef,
    pub name: String,
    pub span: Span,
}

/// Variable, field, or global declaration with an optional initializer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableDecl {
    pub modifiers: Vec<TokenType>,
    pub ty: TypeRef,
    pub name: String,
    pub init: Option<Expr>,
    pub span: Span,
}

/// A type annotation such as `int`, `Point`, or `string[][]`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeRef {
    pub name: TypeName,
    pub array_depth: u32,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeName {
    /// A primitive keyword, or `var` for an inferred type.
    Primitive(TokenType),
    /// A class or imported type.
    Named(String),
}

/// An identifier together with where it was written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Name {
    pub text: String,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub statements: Vec<Stmt>,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    Block(Block),
    Variable(VariableDecl),
    If {
        condition: Expr,
        then_branch: Box<Self>,
        else_branch: Option<Box<Self>>,
        span: Span,
    },
    While {
        condition: Expr,
        body: Box<Self>,
        span: Span,
    },
    DoWhile {
        body: Box<Self>,
        condition: Expr,
        span: Span,
    },
    For {
        init: Option<Box<Self>>,
        condition: Option<Expr>,
        step: Option<Expr>,
        body: Box<Self>,
        span: Span,
    },
    Return {
        value: Option<Expr>,
        span: Span,
    },
    Break(Span),
    Continue(Span),
    Expr(Expr),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExprKind {
    /// Literal token with its raw text.
    Literal { kind: TokenType, text: String },
    Name(String),
    This,
    Null,
    /// Prefix operator: `!x`, `-x`, `~x`, `++x`, `--x`.
    Unary { op: TokenType, operand: Box<Expr> },
    /// Postfix `x++` or `x--`.
    Postfix { op: TokenType, operand: Box<Expr> },
    Binary {
        op: TokenType,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    /// `=` or a compound assignment.
    Assign {
        op: TokenType,
        target: Box<Expr>,
        value: Box<Expr>,
    },
    Call { callee: Box<Expr>, args: Vec<Expr> },
    /// Call to a built-in math function such as `sqrt(x)`.
    MathCall { function: TokenType, args: Vec<Expr> },
    Member { object: Box<Expr>, name: String },
    Index { object: Box<Expr>, index: Box<Expr> },
    New { ty: TypeRef, args: Vec<Expr> },
}

impl ParseTree {
    /// Top-level functions in declaration order.
    pub fn functions(&self) -> impl Iterator<Item = &FunctionDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Function(f) => Some(f),
            _ => None,
        })
    }

    pub fn classes(&self) -> impl Iterator<Item = &ClassDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Class(c) => Some(c),
            _ => None,
        })
    }

    pub fn globals(&self) -> impl Iterator<Item = &VariableDecl> {
        self.items.iter().filter_map(|item| match item {
            Item::Variable(v) => Some(v),
            _ => None,
        })
    }
}

impl Item {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Class(c) => &c.name,
            Self::Function(f) => &f.name,
            Self::Variable(v) => &v.name,
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Class(c) => c.span,
            Self::Function(f) => f.span,
            Self::Variable(v) => v.span,
        }
    }
}

impl Member {
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Field(v) => &v.name,
            Self::Method(f) => &f.name,
        }
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        match self {
            Self::Field(v) => v.span,
            Self::Method(f) => f.span,
        }
    }
}

impl Import {
    /// The name the import brings into scope: its last path segment.
    #[must_use]
    pub fn binding(&self) -> &str {
        self.path.last().map_or("", String::as_str)
    }
}

impl VariableDecl {
    #[must_use]
    pub fn is_const(&self) -> bool {
        self.modifiers.contains(&TokenType::Const)
    }
}

impl TypeRef {
    #[must_use]
    pub const fn is_void(&self) -> bool {
        matches!(self.name, TypeName::Primitive(TokenType::Void)) && self.array_depth == 0
    }
}

impl Expr {
    /// Whether the expression can appear on the left of an assignment.
    #[must_use]
    pub const fn is_assignable(&self) -> bool {
        matches!(
            self.kind,
            ExprKind::Name(_) | ExprKind::Member { .. } | ExprKind::Index { .. }
        )
    }
}
