//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// the file does not start with `xof `
    #[error("not an .x file, expected magic `xof ` but found {found:?}")]
    #[diagnostic(code(closers_x::invalid_magic))]
    InvalidMagic {
        /// The first bytes of the input
        found: Vec<u8>,
    },

    /// the format tag does not fit the requested operation
    #[error("unsupported .x format `{format}`, expected {expected}")]
    UnsupportedFormat {
        /// Format tag found in the header
        format: String,
        /// What the operation needs
        expected: &'static str,
    },

    /// a compressed chunk does not start with `CK`
    #[error("illegal MSZIP block header at offset {offset:#x}")]
    #[diagnostic(code(closers_x::invalid_block_signature))]
    InvalidBlockSignature {
        /// Position of the signature
        offset: usize,
    },

    /// a compressed chunk could not be inflated
    #[error("unable to inflate chunk at offset {offset:#x}: {message}")]
    Inflate {
        /// Position of the chunk
        offset: usize,
        /// Message reported by the inflater
        message: String,
    },

    /// a chunk did not inflate to its declared size
    #[error("chunk at offset {offset:#x} inflated to {found} bytes, expected {expected}")]
    ChunkSizeMismatch {
        /// Position of the chunk
        offset: usize,
        /// Declared decompressed size
        expected: usize,
        /// Actual decompressed size
        found: usize,
    },

    /// input ended in the middle of a structure
    #[error("unexpected end of input at offset {offset:#x}")]
    UnexpectedEof {
        /// Position where more input was needed
        offset: usize,
    },

    /// binary token tag that is not part of the format
    #[error("unknown token type {tag} at offset {offset:#x}")]
    UnknownToken {
        /// Position of the tag
        offset: usize,
        /// The tag read
        tag: u16,
    },

    /// a valid token in a place where it is not allowed
    #[error("expected {expected} at offset {offset:#x}, found {found}")]
    UnexpectedToken {
        /// Position of the token
        offset: usize,
        /// What the grammar allows here
        expected: &'static str,
        /// What was found
        found: String,
    },

    /// object type without a template
    #[error("unknown data object type `{name}` at offset {offset:#x}")]
    UnknownKind {
        /// Position of the name
        offset: usize,
        /// The name read
        name: String,
    },

    /// a text delimiter is missing
    #[error("expected `{expected}` at offset {offset:#x}, found `{found}`")]
    MissingDelimiter {
        /// Position of the delimiter
        offset: usize,
        /// Expected delimiter
        expected: char,
        /// What was found instead
        found: String,
    },

    /// an array ended early
    #[error("array at offset {offset:#x} ended after {found} of {expected} elements")]
    ArraySizeMismatch {
        /// Position of the terminator
        offset: usize,
        /// Declared element count
        expected: usize,
        /// Elements read before the terminator
        found: usize,
    },

    /// array size refers to a member that holds no integer
    #[error("array `{member}` at offset {offset:#x} has no size, `{size}` is not an integer member")]
    MissingArraySize {
        /// Position of the array
        offset: usize,
        /// The array member
        member: &'static str,
        /// The member that should hold the size
        size: &'static str,
    },

    /// numeric text that does not parse
    #[error("invalid number `{text}` at offset {offset:#x}")]
    InvalidNumber {
        /// Position of the text
        offset: usize,
        /// The text read
        text: String,
    },

    /// a string that is not closed on its line
    #[error("unterminated string at offset {offset:#x}")]
    UnterminatedString {
        /// Position of the opening quote
        offset: usize,
    },

    /// a child that its parent does not accept
    #[error("invalid child at offset {offset:#x}")]
    InvalidChild {
        /// Position after the child
        offset: usize,
        /// Why the child was refused
        #[source]
        source: ChildError,
    },

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Reasons for refusing a child in [`crate::object::DataObject::insert_child`]
#[derive(Error, Diagnostic, Debug, Clone, PartialEq, Eq)]
pub enum ChildError {
    /// the parent's template is closed
    #[error("{0} does not support open members")]
    NotOpen(&'static str),

    /// the parent restricts its children to other types
    #[error("restricted {parent} does not support {child} members")]
    Restricted {
        /// Type of the parent
        parent: &'static str,
        /// Type of the refused child
        child: &'static str,
    },

    /// references need a name
    #[error("data references must have a name")]
    EmptyReference,
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
