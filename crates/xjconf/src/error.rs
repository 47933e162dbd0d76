//! Error types for xjconf

use std::fmt;
use thiserror::Error;

/// Position in source markup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Pos {
    pub offset: usize,
    pub line: u32,
    pub col: u32,
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.offset, self.line, self.col)
    }
}

impl Pos {
    pub const fn new(offset: usize, line: u32, col: u32) -> Self {
        Self { offset, line, col }
    }
}

/// Span representing a range in source markup
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Span {
    pub start: Pos,
    pub end: Pos,
}

impl Span {
    pub const fn new(start: Pos, end: Pos) -> Self {
        Self { start, end }
    }

    pub const fn empty() -> Self {
        Self {
            start: Pos::new(0, 0, 0),
            end: Pos::new(0, 0, 0),
        }
    }

    /// True when the span carries no source location
    pub fn is_empty(&self) -> bool {
        *self == Self::empty()
    }
}

/// Error kind for detailed categorization
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    /// The schema itself is malformed
    Configuration,
    /// An element has no matching tag definition
    UnknownTag { tag: String },
    /// An attribute has no matching attribute definition
    UnknownAttribute { tag: String, attribute: String },
    /// A required attribute has neither a value nor a default
    MissingAttribute { tag: String, attribute: String },
    /// Text could not be converted to the declared type
    ValueConversion {
        tag: String,
        attribute: String,
        value: String,
        target: String,
    },
    /// A target object refused or did not know an accessor
    Accessor { tag: String, accessor: String },
    /// Two keyed children share a key and duplicates are rejected
    DuplicateKey { tag: String, key: String },
    /// A document inclusion could not be resolved
    Inclusion { href: String },
    /// Malformed markup
    Syntax,
    MaxDepthExceeded { max: u16 },
    MaxSizeExceeded { max: usize },
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "invalid schema configuration"),
            Self::UnknownTag { tag } => write!(f, "unknown tag <{tag}>"),
            Self::UnknownAttribute { tag, attribute } => {
                write!(f, "the attribute '{attribute}' has not been defined for the tag '{tag}'")
            }
            Self::MissingAttribute { tag, attribute } => {
                write!(f, "the attribute '{attribute}' is required for the tag '{tag}'")
            }
            Self::ValueConversion {
                tag,
                attribute,
                value,
                target,
            } => write!(
                f,
                "cannot convert '{value}' to {target} for '{attribute}' of the tag '{tag}'"
            ),
            Self::Accessor { tag, accessor } => {
                write!(f, "accessor '{accessor}' failed on the tag '{tag}'")
            }
            Self::DuplicateKey { tag, key } => {
                write!(f, "duplicate child key '{key}' in the tag '{tag}'")
            }
            Self::Inclusion { href } => write!(f, "cannot include '{href}'"),
            Self::Syntax => write!(f, "syntax error"),
            Self::MaxDepthExceeded { max } => write!(f, "max depth exceeded: {max}"),
            Self::MaxSizeExceeded { max } => write!(f, "max size exceeded: {max}"),
        }
    }
}

/// Main error type for xjconf
#[derive(Error, Clone, Debug, PartialEq)]
pub struct Error {
    kind: ErrorKind,
    span: Span,
    message: String,
}

impl Error {
    pub fn new(kind: ErrorKind, span: Span) -> Self {
        let message = kind.to_string();
        Self {
            kind,
            span,
            message,
        }
    }

    pub fn with_message(kind: ErrorKind, span: Span, message: impl Into<String>) -> Self {
        Self {
            kind,
            span,
            message: message.into(),
        }
    }

    /// Error without a source location
    pub fn from_kind(kind: ErrorKind) -> Self {
        Self::new(kind, Span::empty())
    }

    /// Schema misconfiguration with a free-form explanation
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::with_message(ErrorKind::Configuration, Span::empty(), message)
    }

    pub fn kind(&self) -> &ErrorKind {
        &self.kind
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    /// Append detail to the message, keeping kind and span
    pub fn context(mut self, detail: impl fmt::Display) -> Self {
        self.message = format!("{}: {detail}", self.message);
        self
    }

    /// Attach a location to an error raised without one
    pub fn or_at(self, pos: Pos) -> Self {
        if self.span.is_empty() {
            Self {
                span: Span::new(pos, pos),
                ..self
            }
        } else {
            self
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.span.is_empty() {
            write!(f, "{}", self.message)
        } else {
            write!(f, "error at {}: {}", self.span.start, self.message)
        }
    }
}

/// Result type alias for xjconf
pub type Result<T> = std::result::Result<T, Error>;
