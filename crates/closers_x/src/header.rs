//! The 16 byte header shared by every encoding.

use std::{fmt, io::Cursor};

use binrw::{BinRead, BinWrite};

use crate::error::{Error, Result};

/// Magic at the start of every .x file
pub const MAGIC: [u8; 4] = *b"xof ";

/// Size of the header
pub const HEADER_SIZE: usize = 16;

/// Encoding of the data following the header
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little)]
pub enum Format {
    /// Tokenized binary
    #[brw(magic = b"bin ")]
    Binary,

    /// Plain text
    #[brw(magic = b"txt ")]
    Text,

    /// MSZIP compressed binary
    #[brw(magic = b"bzip")]
    CompressedBinary,

    /// MSZIP compressed text
    #[brw(magic = b"tzip")]
    CompressedText,
}

impl Format {
    /// The four byte tag of this format
    pub const fn tag(&self) -> &'static [u8; 4] {
        match self {
            Format::Binary => b"bin ",
            Format::Text => b"txt ",
            Format::CompressedBinary => b"bzip",
            Format::CompressedText => b"tzip",
        }
    }

    /// Whether the body is stored as MSZIP chunks
    pub const fn is_compressed(&self) -> bool {
        matches!(self, Format::CompressedBinary | Format::CompressedText)
    }

    /// The format of the body once inflated
    pub const fn decompressed(&self) -> Format {
        match self {
            Format::CompressedBinary => Format::Binary,
            Format::CompressedText => Format::Text,
            other => *other,
        }
    }
}

/// Width of floating point values in the file
#[derive(BinRead, BinWrite, Debug, Copy, Clone, Default, PartialEq, Eq)]
#[brw(little)]
pub enum FloatSize {
    /// 32 bit floats, tag `0032`
    #[default]
    #[brw(magic = b"0032")]
    F32,

    /// 64 bit floats, tag `0064`
    #[brw(magic = b"0064")]
    F64,
}

impl FloatSize {
    /// Size in bytes of a binary float
    pub const fn bytes(&self) -> usize {
        match self {
            FloatSize::F32 => 4,
            FloatSize::F64 => 8,
        }
    }

    /// The four character tag of this size
    pub const fn tag(&self) -> &'static str {
        match self {
            FloatSize::F32 => "0032",
            FloatSize::F64 => "0064",
        }
    }
}

/// Header of a .x file
#[derive(BinRead, BinWrite, Debug, Copy, Clone, PartialEq, Eq)]
#[brw(little, magic = b"xof ")]
pub struct XHeader {
    /// Major and minor version as four ASCII digits, `0303` for example
    pub version: [u8; 4],

    /// Encoding of the body
    pub format: Format,

    /// Width of floats in the body
    pub float_size: FloatSize,
}

impl XHeader {
    /// Read the header from the start of `bytes`.
    pub fn parse(bytes: &[u8]) -> Result<XHeader> {
        if !has_magic(bytes) {
            return Err(Error::InvalidMagic {
                found: bytes.iter().take(4).copied().collect(),
            });
        }
        if bytes.len() < HEADER_SIZE {
            return Err(Error::UnexpectedEof { offset: bytes.len() });
        }
        if Format::read(&mut Cursor::new(&bytes[8..12])).is_err() {
            return Err(Error::UnsupportedFormat {
                format: String::from_utf8_lossy(&bytes[8..12]).into_owned(),
                expected: "bin, txt, bzip or tzip",
            });
        }
        Ok(XHeader::read(&mut Cursor::new(&bytes[..HEADER_SIZE]))?)
    }

    /// The version digits as text
    pub fn version_str(&self) -> String {
        String::from_utf8_lossy(&self.version).into_owned()
    }

    /// Serialize the header
    pub fn to_bytes(&self) -> Result<Vec<u8>> {
        let mut out = Cursor::new(Vec::with_capacity(HEADER_SIZE));
        self.write(&mut out)?;
        Ok(out.into_inner())
    }
}

impl fmt::Display for XHeader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "xof {}{}{}",
            self.version_str(),
            String::from_utf8_lossy(self.format.tag()),
            self.float_size.tag()
        )
    }
}

/// Whether `bytes` starts with `xof `
pub fn has_magic(bytes: &[u8]) -> bool {
    bytes.starts_with(&MAGIC)
}

fn format_of(bytes: &[u8]) -> Option<&[u8]> {
    if has_magic(bytes) {
        bytes.get(8..12)
    } else {
        None
    }
}

/// Returns true if the file is compressed, either binary or text
pub fn is_compressed(bytes: &[u8]) -> bool {
    matches!(format_of(bytes), Some(b"bzip" | b"tzip"))
}

/// Returns true if the file is in uncompressed binary format
pub fn is_binary(bytes: &[u8]) -> bool {
    matches!(format_of(bytes), Some(b"bin "))
}

/// Returns true if the file is in uncompressed text format
pub fn is_text(bytes: &[u8]) -> bool {
    matches!(format_of(bytes), Some(b"txt "))
}
