//! Token model shared by the scanner and the parser.

use std::fmt;

/// Identifies one input file within a compilation session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FileId(pub u32);

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Source location for error reporting. Both fields are 1-based.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Span {
    pub line: u32,
    pub column: u32,
}

impl Span {
    #[must_use]
    pub const fn new(line: u32, column: u32) -> Self {
        Self { line, column }
    }
}

impl Default for Span {
    fn default() -> Self {
        Self::new(1, 1)
    }
}

/// Coarse grouping of token types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Identifiers, the end-of-stream sentinel, and the error marker.
    Placeholder,
    Literal,
    /// Primitive and type keywords (`int`, `string`, ...).
    Primitive,
    /// Access and storage modifiers (`public`, `static`, ...).
    Modifier,
    /// Control-flow and declaration keywords.
    Keyword,
    /// Built-in math functions (`sqrt`, `pow`, ...).
    MathFunction,
    Symbol,
}

macro_rules! token_types {
    ($(
        $category:ident {
            $( $(#[$meta:meta])* $variant:ident => $surface:literal, )*
        }
    )*) => {
        /// Every lexical category the scanner can emit.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum TokenType {
            $($( $(#[$meta])* $variant, )*)*
        }

        impl TokenType {
            /// All token types in declaration order.
            pub const ALL: &'static [Self] = &[$($( Self::$variant, )*)*];

            /// The canonical surface text used in diagnostics.
            #[must_use]
            pub const fn surface(self) -> &'static str {
                match self {
                    $($( Self::$variant => $surface, )*)*
                }
            }

            #[must_use]
            pub const fn category(self) -> Category {
                match self {
                    $($( Self::$variant => Category::$category, )*)*
                }
            }

            /// Look up a token type by its canonical surface text.
            #[must_use]
            pub fn from_surface(text: &str) -> Option<Self> {
                match text {
                    $($( $surface => Some(Self::$variant), )*)*
                    _ => None,
                }
            }
        }
    };
}

token_types! {
    Placeholder {
        Identifier => "<identifier>",
        /// Identifier immediately followed by `(`.
        MethodIdentifier => "<method-identifier>",
        EndOfStream => "<end-of-stream>",
        Undefined => "<undefined>",
    }
    Literal {
        IntegerLiteral => "<integer>",
        RealLiteral => "<real>",
        HexLiteral => "<hex>",
        OctalLiteral => "<octal>",
        BinaryLiteral => "<binary>",
        CharacterLiteral => "<character>",
        StringLiteral => "<string>",
        /// `true` or `false`.
        BooleanLiteral => "<boolean>",
    }
    Primitive {
        Void => "void",
        Bool => "bool",
        Byte => "byte",
        UByte => "ubyte",
        Short => "short",
        UShort => "ushort",
        Int => "int",
        UInt => "uint",
        Long => "long",
        ULong => "ulong",
        Float => "float",
        Double => "double",
        Char => "char",
        String => "string",
        Auto => "auto",
    }
    Modifier {
        Public => "public",
        Private => "private",
        Protected => "protected",
        Internal => "internal",
        Static => "static",
        Const => "const",
        Final => "final",
        Extern => "extern",
        Volatile => "volatile",
        Abstract => "abstract",
        Override => "override",
        Virtual => "virtual",
        Inline => "inline",
        Mutable => "mutable",
    }
    Keyword {
        If => "if",
        Else => "else",
        While => "while",
        Do => "do",
        For => "for",
        Foreach => "foreach",
        In => "in",
        Switch => "switch",
        Case => "case",
        Default => "default",
        Break => "break",
        Continue => "continue",
        Return => "return",
        Goto => "goto",
        Try => "try",
        Catch => "catch",
        Finally => "finally",
        Throw => "throw",
        Class => "class",
        Struct => "struct",
        Enum => "enum",
        Interface => "interface",
        Union => "union",
        Namespace => "namespace",
        Import => "import",
        New => "new",
        Delete => "delete",
        This => "this",
        Super => "super",
        Null => "null",
        Var => "var",
        Func => "func",
        Operator => "operator",
        Typeof => "typeof",
        Sizeof => "sizeof",
        As => "as",
        Is => "is",
        Extends => "extends",
        Implements => "implements",
    }
    MathFunction {
        Abs => "abs",
        Sqrt => "sqrt",
        Pow => "pow",
        Sin => "sin",
        Cos => "cos",
        Tan => "tan",
        Asin => "asin",
        Acos => "acos",
        Atan => "atan",
        Log => "log",
        Ln => "ln",
        Exp => "exp",
        Floor => "floor",
        Ceil => "ceil",
        Round => "round",
        Min => "min",
        Max => "max",
    }
    Symbol {
        Add => "+",
        Sub => "-",
        Mul => "*",
        Div => "/",
        Mod => "%",
        Incre => "++",
        Decre => "--",
        AddEq => "+=",
        SubEq => "-=",
        MulEq => "*=",
        DivEq => "/=",
        ModEq => "%=",
        Assign => "=",
        Eq => "==",
        NotEq => "!=",
        Less => "<",
        Greater => ">",
        LessEq => "<=",
        GreaterEq => ">=",
        AndAnd => "&&",
        OrOr => "||",
        Not => "!",
        BitAnd => "&",
        BitOr => "|",
        BitXor => "^",
        BitNot => "~",
        Shl => "<<",
        Shr => ">>",
        AndEq => "&=",
        OrEq => "|=",
        XorEq => "^=",
        ShlEq => "<<=",
        ShrEq => ">>=",
        LParen => "(",
        RParen => ")",
        LBrace => "{",
        RBrace => "}",
        LBracket => "[",
        RBracket => "]",
        Semicolon => ";",
        Comma => ",",
        Dot => ".",
        Colon => ":",
        Question => "?",
        Arrow => "->",
        ColonColon => "::",
    }
}

impl TokenType {
    /// Stable ordinal of this type within [`TokenType::ALL`].
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Reserved word lookup. `true` and `false` map to [`TokenType::BooleanLiteral`].
    #[must_use]
    pub fn keyword(word: &str) -> Option<Self> {
        if word == "true" || word == "false" {
            return Some(Self::BooleanLiteral);
        }
        Self::from_surface(word).filter(|t| t.is_reserved())
    }

    /// Operator or punctuation lookup by exact text.
    #[must_use]
    pub fn symbol(text: &str) -> Option<Self> {
        Self::from_surface(text).filter(|t| t.category() == Category::Symbol)
    }

    /// Whether the type is spelled by a reserved word.
    #[must_use]
    pub const fn is_reserved(self) -> bool {
        matches!(
            self.category(),
            Category::Primitive | Category::Modifier | Category::Keyword | Category::MathFunction
        )
    }

    #[must_use]
    pub const fn is_literal(self) -> bool {
        matches!(self.category(), Category::Literal)
    }

    /// Whether the type is one of the assignment operators (`=`, `+=`, ...).
    #[must_use]
    pub const fn is_assignment(self) -> bool {
        matches!(
            self,
            Self::Assign
                | Self::AddEq
                | Self::SubEq
                | Self::MulEq
                | Self::DivEq
                | Self::ModEq
                | Self::AndEq
                | Self::OrEq
                | Self::XorEq
                | Self::ShlEq
                | Self::ShrEq
        )
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.surface())
    }
}

/// A single token with its type, raw text, and source location.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenType,
    pub lexeme: String,
    pub file: FileId,
    pub line: u32,
    pub column: u32,
}

impl Token {
    #[must_use]
    pub const fn new(kind: TokenType, lexeme: String, file: FileId, line: u32, column: u32) -> Self {
        Self {
            kind,
            lexeme,
            file,
            line,
            column,
        }
    }

    /// A token with no text yet, filled in while a lexeme accumulates.
    #[must_use]
    pub const fn empty(file: FileId) -> Self {
        Self::new(TokenType::Undefined, String::new(), file, 1, 1)
    }

    #[must_use]
    pub const fn kind(&self) -> TokenType {
        self.kind
    }

    #[must_use]
    pub fn lexeme(&self) -> &str {
        &self.lexeme
    }

    #[must_use]
    pub const fn file(&self) -> FileId {
        self.file
    }

    #[must_use]
    pub const fn span(&self) -> Span {
        Span::new(self.line, self.column)
    }

    pub const fn set_kind(&mut self, kind: TokenType) {
        self.kind = kind;
    }

    pub fn set_lexeme(&mut self, lexeme: impl Into<String>) {
        self.lexeme = lexeme.into();
    }

    pub const fn set_position(&mut self, line: u32, column: u32) {
        self.line = line;
        self.column = column;
    }
}
