//! Error types for the swift_fin library.

use std::io;
use thiserror::Error;

/// Result type alias for library operations.
pub type Result<T> = std::result::Result<T, Error>;

/// A field text that does not satisfy its compiled notation.
///
/// `index` is the position of the offending token in the notation and
/// `offset` the byte offset into the field text where matching failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("subfield {index} at offset {offset}: {message}")]
pub struct SubfieldError {
    pub index: usize,
    pub offset: usize,
    pub message: String,
}

impl SubfieldError {
    pub(crate) fn new(index: usize, offset: usize, message: impl Into<String>) -> Self {
        Self {
            index,
            offset,
            message: message.into(),
        }
    }
}

/// Error types that can occur while framing, decoding, sequencing or rendering messages.
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error occurred during read or write operations.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Malformed notation string, raised when compiling it.
    #[error("invalid notation {notation:?} at offset {offset}: {message}")]
    NotationGrammar {
        notation: String,
        offset: usize,
        message: String,
    },

    /// Field text rejected by the subfield codec outside of a framed stream.
    ///
    /// The crate itself reports codec failures as [`Error::Field`]; this variant
    /// lets callers apply `?` to [`Notation::parse`](crate::Notation::parse) directly.
    #[error("subfield mismatch: {0}")]
    SubfieldMatch(#[from] SubfieldError),

    /// Field text rejected by the subfield codec while decoding a framed field.
    #[error("field :{tag}: at line {line}: {source}")]
    Field {
        line: usize,
        tag: String,
        #[source]
        source: SubfieldError,
    },

    /// Brace framing of the FIN envelope failed.
    #[error("block framing error at line {line}: {message}")]
    BlockFraming { line: usize, message: String },

    /// A line could not be framed into a `:tag:content` field.
    #[error("field framing error at line {line}: {message}")]
    FieldFraming { line: usize, message: String },

    /// A field arrived outside the set of tags legal at that point.
    #[error("unexpected field :{tag}: at line {line} after {}; expected one of {expected}", previous.as_deref().unwrap_or("start of page"))]
    UnexpectedField {
        line: usize,
        tag: String,
        previous: Option<String>,
        expected: String,
    },

    /// The stream ended before the page terminator was reached.
    #[error("unfinished page at line {line}: stream ended after {}", previous.as_deref().unwrap_or("start of page"))]
    UnfinishedPage {
        line: usize,
        previous: Option<String>,
    },

    /// Decoded field violates a message-level rule.
    #[error("invalid field :{tag}: at line {line}: {message}")]
    SemanticValidation {
        line: usize,
        tag: String,
        message: String,
    },

    /// Invalid date format.
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Invalid amount format.
    #[error("Invalid amount format: {0}")]
    InvalidAmount(String),

    /// Unknown message type name.
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
}

impl Error {
    pub(crate) fn semantic(line: usize, tag: &str, message: impl Into<String>) -> Self {
        Error::SemanticValidation {
            line,
            tag: tag.to_string(),
            message: message.into(),
        }
    }

    /// True for the two sequence error shapes, after which a caller may skip to the next page.
    pub fn is_sequence_error(&self) -> bool {
        matches!(
            self,
            Error::UnexpectedField { .. } | Error::UnfinishedPage { .. }
        )
    }
}
