//! Error types that can be emitted from this library

use miette::Diagnostic;
use thiserror::Error;

/// Error type for library
#[derive(Error, Diagnostic, Debug)]
pub enum Error {
    /// Transparent warpper for [`std::io::Error`]
    #[error(transparent)]
    IOError(#[from] std::io::Error),

    /// Transparent warpper for [`binrw::Error`]
    #[error(transparent)]
    BinRWError(#[from] binrw::Error),

    /// file does not start with a known CMF signature
    #[error("file is not a CMF archive or uses an unsupported version")]
    InvalidArchive,

    /// data ended before a complete structure could be read
    #[error("unexpected end of data at offset {offset:#x}")]
    UnexpectedEof {
        /// Position of the read that failed
        offset: usize,
    },

    /// the decrypted entry count does not fit inside the data
    #[error("entry table at offset {offset:#x} declares {count} entries which exceeds the available data")]
    InvalidEntryCount {
        /// Position of the entry count
        offset: usize,
        /// The decrypted entry count
        count: u32,
    },

    /// an entry points outside of the archive
    #[error("entry {name} spans {offset:#x}..{end:#x} which lies outside the archive ({archive_len} bytes)")]
    EntryOutOfBounds {
        /// Name of the offending entry
        name: String,
        /// Absolute start of the entry's data
        offset: u64,
        /// Absolute end of the entry's data
        end: u64,
        /// Total length of the archive
        archive_len: u64,
    },

    /// the name is too long for a 512 byte name field
    #[error("entry name {0} does not fit in 255 UTF-16 code units")]
    NameTooLong(String),

    /// unable to find requested file
    #[error("unable to find requested file")]
    FileNotFound(#[from] FileNotFoundError),

    /// {0}
    #[error("{0}")]
    CustomError(String),
}

/// Error type to provide further information when a file has not been found
#[derive(Error, Diagnostic, Debug)]
#[error("unable to find requested file")]
pub enum FileNotFoundError {
    /// at index {0}
    #[error("at index {0}")]
    Index(usize),

    /// by name {0}
    #[error("by name {0}")]
    Name(String),
}

/// Generic result type with crate's Error as its error variant
pub type Result<T> = core::result::Result<T, Error>;
