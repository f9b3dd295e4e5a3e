//! PDF Parser Module
//!
//! Byte-level access to PDF files according to ISO 32000-1 Section 7.2
//! (lexical conventions) and Section 7.5 (file structure): a seekable
//! byte source, the tokenizer, header/`startxref` scanning and a reader for
//! direct objects.

pub mod header;
pub mod lexer;
pub mod objects;
pub mod source;

pub use self::header::{PdfHeader, PdfVersion};
pub use self::lexer::{
    hex_value, is_delimiter, is_whitespace, is_whitespace_with, Lexer, Token, TokenKind, Tokens,
};
pub use self::objects::{read_indirect_object, read_object};
pub use self::source::{ByteSource, FileSource, MemorySource};

/// Result type for parser operations
pub type ParseResult<T> = Result<T, ParseError>;

/// What exactly was wrong with malformed input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MalformedKind {
    #[error("PDF header signature not found")]
    HeaderNotFound,

    #[error("startxref not found")]
    StartxrefNotFound,

    #[error("'>' not expected")]
    UnexpectedGreaterThan,

    #[error("unterminated string")]
    UnterminatedString,

    #[error("unterminated hex string")]
    UnterminatedHexString,

    #[error("invalid hex digit 0x{0:02X} in string")]
    InvalidHexDigit(u8),

    #[error("position {0} is beyond the end of the file")]
    PositionOutOfRange(u64),
}

/// PDF Parser errors
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error("Malformed input near byte {offset}: {kind}")]
    Malformed { offset: u64, kind: MalformedKind },

    #[error("Unexpected token at byte {offset}: expected {expected}, found {found}")]
    UnexpectedToken {
        offset: u64,
        expected: String,
        found: String,
    },
}

impl ParseError {
    /// Approximate byte offset of the problem, when known
    pub fn offset(&self) -> Option<u64> {
        match self {
            ParseError::Io(_) => None,
            ParseError::Malformed { offset, .. } | ParseError::UnexpectedToken { offset, .. } => {
                Some(*offset)
            }
        }
    }

    /// The malformation, if this error is about the input bytes themselves
    pub fn malformed_kind(&self) -> Option<&MalformedKind> {
        match self {
            ParseError::Malformed { kind, .. } => Some(kind),
            _ => None,
        }
    }
}
