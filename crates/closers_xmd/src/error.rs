//! Error types that can be emitted from this library
//!

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent wrapper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent wrapper for [`serde_json::Error`]
    #[cfg(feature = "serde")]
    #[error(transparent)]
    JsonError(#[from] serde_json::Error),

    /// File does not start with the XMD magic
    #[error("xmd header mismatch, found {found:02x?}")]
    #[diagnostic(code(closers_xmd::invalid_magic))]
    InvalidMagic {
        /// The bytes found in place of the magic
        found: Vec<u8>,
    },

    /// Input ended in the middle of a record
    #[error("unexpected end of input at offset {offset:#x}")]
    UnexpectedEof {
        /// Position where more input was needed
        offset: u64,
    },

    /// Variable length integer without a final byte
    #[error("variable length integer at offset {offset:#x} is longer than {max} bytes")]
    VarIntTooLong {
        /// Position of the first byte
        offset: u64,
        /// Longest encoding accepted
        max: usize,
    },

    /// UTF-16 string with an odd byte length
    #[error("wide string at offset {offset:#x} has an odd length of {len} bytes")]
    OddStringLength {
        /// Position of the string data
        offset: u64,
        /// Declared length in bytes
        len: u32,
    },

    /// A keyframe does not hold one transform per bone
    #[error("keyframe {keyframe} of animation `{animation}` has {found} transforms, expected {expected}")]
    #[diagnostic(help("the bone count comes from the file header"))]
    BoneCountMismatch {
        /// Name of the animation
        animation: String,
        /// Index of the keyframe
        keyframe: usize,
        /// Bone count of the file
        expected: u32,
        /// Transforms in the keyframe
        found: usize,
    },

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
