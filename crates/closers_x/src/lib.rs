//! This library reads the DirectX **.x** model files used by *Closers*.
//!
//! # .X File Format Documentation
//!
//! A model file is a 16 byte header followed by a body in one of four encodings.
//!
//! | Offset (bytes) | Field      | Description                                           |
//! |----------------|------------|-------------------------------------------------------|
//! | 0x0000         | Magic      | `xof `                                                |
//! | 0x0004         | Version    | major and minor version as four digits, e.g. `0303`   |
//! | 0x0008         | Format     | `bin `, `txt `, `bzip` or `tzip`                      |
//! | 0x000C         | Float Size | `0032` or `0064`                                      |
//!
//! The body is a sequence of data objects. Every object is an instance of a template, which
//! lists the members the object holds in order. Templates marked as open accept nested objects
//! and references to other objects after their members.
//!
//! ```text
//! Frame Root {
//!  FrameTransformMatrix {
//!   1.000000,0.000000,0.000000,0.000000,
//!   ...
//!  }
//!  {Mesh01}
//! }
//! ```
//!
//! Compressed files carry their body as MSZIP chunks, see [`mszip`].
//!
//! # Example
//!
//! ```no_run
//! # fn main() -> closers_x::error::Result<()> {
//! let bytes = std::fs::read("MODEL.X")?;
//! let file = closers_x::decode(&bytes)?;
//!
//! for object in file.objects.iter().flat_map(|o| o.descendants()) {
//!     if let Some(name) = object.get("filename").and_then(|v| v.as_str()) {
//!         println!("{name}");
//!     }
//! }
//! println!("{file}");
//! # Ok(())
//! # }
//! ```

use std::fmt;

use tracing::instrument;

pub mod error;
pub mod header;
pub mod mszip;
pub mod object;
pub mod parse;
pub mod template;

pub use header::{is_binary, is_compressed, is_text, FloatSize, Format, XHeader};
pub use object::{Child, DataObject, Value};
pub use template::{Kind, Template};

use error::{Error, Result};

/// A parsed model file
#[derive(Debug, Clone, PartialEq)]
pub struct XFile {
    /// Header of the file, with the format of the parsed body
    pub header: XHeader,
    /// Top level objects in file order
    pub objects: Vec<DataObject>,
}

impl XFile {
    pub(crate) fn new(mut header: XHeader, objects: Vec<DataObject>) -> XFile {
        header.format = header.format.decompressed();
        XFile { header, objects }
    }

    /// Width of the floats in the source file
    pub fn float_size(&self) -> FloatSize {
        self.header.float_size
    }

    /// Version digits of the source file
    pub fn version_str(&self) -> String {
        self.header.version_str()
    }

    /// Every object in the file, depth first
    pub fn objects(&self) -> impl Iterator<Item = &DataObject> {
        self.objects
            .iter()
            .flat_map(|object| std::iter::once(object).chain(object.descendants()))
    }

    /// Names of the textures referenced anywhere in the file
    pub fn texture_filenames(&self) -> impl Iterator<Item = &str> {
        self.objects()
            .filter(|object| object.kind == Kind::TextureFilename)
            .filter_map(|object| object.get("filename").and_then(Value::as_str))
    }
}

impl fmt::Display for XFile {
    /// Render the file in the text encoding
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "xof {}txt {}\n\n",
            self.header.version_str(),
            self.header.float_size.tag()
        )?;
        for object in &self.objects {
            object.write_text(f, 0)?;
            f.write_str("\n")?;
        }
        Ok(())
    }
}

/// Parse a model file in any of its encodings.
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn decode(bytes: &[u8]) -> Result<XFile> {
    let header = XHeader::parse(bytes)?;
    match header.format.decompressed() {
        Format::Binary => parse::binary::parse(bytes),
        Format::Text => parse::text::parse(bytes),
        format => Err(Error::UnsupportedFormat {
            format: String::from_utf8_lossy(format.tag()).into_owned(),
            expected: "bin, txt, bzip or tzip",
        }),
    }
}

/// Convert a model file in any encoding to the text encoding.
pub fn to_text(bytes: &[u8]) -> Result<String> {
    Ok(decode(bytes)?.to_string())
}
