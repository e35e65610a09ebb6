//! Token types for the document query lexer.

use super::Span;

/// Keywords of the backend query dialect that matter for query planning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keyword {
    // Projection
    Select,
    Distinct,
    Value,
    Top,
    As,

    // Clauses
    From,
    Join,
    In,
    Where,
    Order,
    Group,
    By,
    Asc,
    Desc,
    Offset,
    Limit,

    // Operators and literals
    And,
    Or,
    Not,
    Between,
    Like,
    Exists,
    Null,
    True,
    False,
    Undefined,

    // Aggregates
    Count,
    Sum,
    Avg,
    Min,
    Max,
}

impl Keyword {
    /// Attempts to parse a keyword from a string (case-insensitive).
    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "SELECT" => Some(Self::Select),
            "DISTINCT" => Some(Self::Distinct),
            "VALUE" => Some(Self::Value),
            "TOP" => Some(Self::Top),
            "AS" => Some(Self::As),
            "FROM" => Some(Self::From),
            "JOIN" => Some(Self::Join),
            "IN" => Some(Self::In),
            "WHERE" => Some(Self::Where),
            "ORDER" => Some(Self::Order),
            "GROUP" => Some(Self::Group),
            "BY" => Some(Self::By),
            "ASC" => Some(Self::Asc),
            "DESC" => Some(Self::Desc),
            "OFFSET" => Some(Self::Offset),
            "LIMIT" => Some(Self::Limit),
            "AND" => Some(Self::And),
            "OR" => Some(Self::Or),
            "NOT" => Some(Self::Not),
            "BETWEEN" => Some(Self::Between),
            "LIKE" => Some(Self::Like),
            "EXISTS" => Some(Self::Exists),
            "NULL" => Some(Self::Null),
            "TRUE" => Some(Self::True),
            "FALSE" => Some(Self::False),
            "UNDEFINED" => Some(Self::Undefined),
            "COUNT" => Some(Self::Count),
            "SUM" => Some(Self::Sum),
            "AVG" => Some(Self::Avg),
            "MIN" => Some(Self::Min),
            "MAX" => Some(Self::Max),
            _ => None,
        }
    }

    /// Returns the keyword as a string.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Select => "SELECT",
            Self::Distinct => "DISTINCT",
            Self::Value => "VALUE",
            Self::Top => "TOP",
            Self::As => "AS",
            Self::From => "FROM",
            Self::Join => "JOIN",
            Self::In => "IN",
            Self::Where => "WHERE",
            Self::Order => "ORDER",
            Self::Group => "GROUP",
            Self::By => "BY",
            Self::Asc => "ASC",
            Self::Desc => "DESC",
            Self::Offset => "OFFSET",
            Self::Limit => "LIMIT",
            Self::And => "AND",
            Self::Or => "OR",
            Self::Not => "NOT",
            Self::Between => "BETWEEN",
            Self::Like => "LIKE",
            Self::Exists => "EXISTS",
            Self::Null => "NULL",
            Self::True => "TRUE",
            Self::False => "FALSE",
            Self::Undefined => "UNDEFINED",
            Self::Count => "COUNT",
            Self::Sum => "SUM",
            Self::Avg => "AVG",
            Self::Min => "MIN",
            Self::Max => "MAX",
        }
    }
}

/// The kind of token.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer literal.
    Integer(i64),
    /// Floating-point literal.
    Float(f64),
    /// String literal, single- or double-quoted, escapes resolved.
    String(String),
    /// Named query parameter such as `@_1` (name without the `@`).
    Parameter(String),

    // Identifiers and keywords
    /// Identifier.
    Identifier(String),
    /// Keyword.
    Keyword(Keyword),

    // Operators
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Concat,
    Question,
    Coalesce,
    Ampersand,
    Pipe,
    Caret,
    Tilde,
    ShiftLeft,
    ShiftRight,
    ShiftRightZeroFill,

    // Delimiters
    LeftParen,
    RightParen,
    LeftBracket,
    RightBracket,
    LeftBrace,
    RightBrace,
    Comma,
    Dot,
    Colon,

    // Special
    /// End of input.
    Eof,
    /// Lexical error.
    Error(String),
}

impl TokenKind {
    /// Returns true for tokens that open a nesting level.
    #[must_use]
    pub const fn opens_group(&self) -> bool {
        matches!(self, Self::LeftParen | Self::LeftBracket | Self::LeftBrace)
    }

    /// Returns true for tokens that close a nesting level.
    #[must_use]
    pub const fn closes_group(&self) -> bool {
        matches!(
            self,
            Self::RightParen | Self::RightBracket | Self::RightBrace
        )
    }
}

/// A token with its kind and source location.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    /// The kind of token.
    pub kind: TokenKind,
    /// The source location.
    pub span: Span,
}

impl Token {
    /// Creates a new token.
    #[must_use]
    pub const fn new(kind: TokenKind, span: Span) -> Self {
        Self { kind, span }
    }

    /// Returns true if this is an end-of-file token.
    #[must_use]
    pub const fn is_eof(&self) -> bool {
        matches!(self.kind, TokenKind::Eof)
    }

    /// Returns true if this token is the given keyword.
    #[must_use]
    pub fn is_keyword(&self, keyword: Keyword) -> bool {
        self.kind == TokenKind::Keyword(keyword)
    }
}
