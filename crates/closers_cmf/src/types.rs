//! Base types for structure of CMF files.

use binrw::{BinRead, BinWrite};
use widestring::{U16CStr, U16Str};

use crate::compression::CompressionMethod;
use crate::error::{Error, Result};

/// Size in UTF-16 code units of the name field of an [`EntryRecord`]
pub const NAME_UNITS: usize = 256;

const fn widen<const N: usize>(ascii: &[u8]) -> [u8; N] {
    let mut out = [0u8; N];
    let mut i = 0;
    while i < ascii.len() {
        out[i * 2] = ascii[i];
        i += 1;
    }
    out
}

/// Signature at the start of a version 1 archive, UTF-16LE `"COMBINE FILE ver. 1.0\0"`
pub const SIGNATURE_V1: [u8; 44] = widen(b"COMBINE FILE ver. 1.0\0");

/// Signature at the start of a version 2 archive, UTF-16LE `"COMBINE FILE ver.2\0"`
pub const SIGNATURE_V2: [u8; 38] = widen(b"COMBINE FILE ver.2\0");

/// Format version of a CMF archive
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum ArchiveVersion {
    /// Archives starting with [`SIGNATURE_V1`]
    #[default]
    V1,

    /// Archives recognised by the version 2 check
    V2,
}

impl ArchiveVersion {
    /// Identify the archive version from the leading bytes of a file.
    ///
    /// The version 2 check compares against the first 38 bytes of [`SIGNATURE_V1`], which is how
    /// the game tooling identifies these archives. Files starting with [`SIGNATURE_V2`] are
    /// therefore rejected.
    // TODO: accept SIGNATURE_V2 once a genuine version 2 archive confirms the layout behind it
    pub fn detect(bytes: &[u8]) -> Result<ArchiveVersion> {
        if bytes.starts_with(&SIGNATURE_V1) {
            Ok(ArchiveVersion::V1)
        } else if bytes.starts_with(&SIGNATURE_V1[..SIGNATURE_V2.len()]) {
            Ok(ArchiveVersion::V2)
        } else {
            Err(Error::InvalidArchive)
        }
    }

    /// The signature written at the start of archives of this version
    pub fn signature(&self) -> &'static [u8] {
        match self {
            ArchiveVersion::V1 => &SIGNATURE_V1,
            ArchiveVersion::V2 => &SIGNATURE_V1[..SIGNATURE_V2.len()],
        }
    }
}

/// CMF entry record
///
/// The decrypted on-disk layout of a single entry in an entry table
#[derive(BinRead, BinWrite, Debug, Clone, PartialEq, Eq)]
#[brw(little)]
pub struct EntryRecord {
    /// The UTF-16 name of the entry, padded with nulls
    pub name: [u16; NAME_UNITS],

    /// The size of the data for this entry before compression
    pub size: u32,

    /// The size of the stored data for this entry when compressed
    pub size_compressed: u32,

    /// The offset of the data from the start of the data block
    pub relative_offset: u32,

    /// The compression applied to this entry's data, `0` for none
    pub compression_method: u32,
}

impl Default for EntryRecord {
    fn default() -> Self {
        Self {
            name: [0; NAME_UNITS],
            size: 0,
            size_compressed: 0,
            relative_offset: 0,
            compression_method: 0,
        }
    }
}

impl EntryRecord {
    /// Create a record with the given name, leaving the remaining fields empty
    pub fn with_name(name: &str) -> Result<EntryRecord> {
        let units: Vec<u16> = name.encode_utf16().collect();
        if units.len() >= NAME_UNITS {
            return Err(Error::NameTooLong(name.to_owned()));
        }

        let mut record = EntryRecord::default();
        record.name[..units.len()].copy_from_slice(&units);
        Ok(record)
    }

    /// Decode the name, stopping at the first null
    pub fn name(&self) -> String {
        match U16CStr::from_slice_truncate(&self.name) {
            Ok(name) => name.to_string_lossy(),
            Err(_) => U16Str::from_slice(&self.name).to_string_lossy(),
        }
    }

    /// Resolve this record against the start of the data block
    pub fn into_entry(self, data_offset: u32) -> FileEntry {
        FileEntry {
            name: self.name(),
            size: self.size,
            size_compressed: self.size_compressed,
            offset: self.relative_offset.wrapping_add(data_offset),
            compression_method: self.compression_method,
        }
    }
}

/// Structure representing a CMF file entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileEntry {
    /// Name of the file
    pub name: String,
    /// Size of the file when extracted
    pub size: u32,
    /// Size of the file in the archive when compressed
    pub size_compressed: u32,
    /// Absolute offset of the file's data
    pub offset: u32,
    /// Raw compression method, non-zero values mean zlib
    pub compression_method: u32,
}

impl FileEntry {
    /// Method of compressing the file in the archive
    pub fn compression(&self) -> CompressionMethod {
        CompressionMethod::from(self.compression_method)
    }

    /// Whether the stored data has to be inflated
    pub fn is_compressed(&self) -> bool {
        self.compression_method != 0
    }

    /// Number of bytes the entry occupies in the archive
    pub fn stored_size(&self) -> u32 {
        if self.is_compressed() {
            self.size_compressed
        } else {
            self.size
        }
    }

    /// Absolute end of the stored data
    pub fn end(&self) -> u64 {
        self.offset as u64 + self.stored_size() as u64
    }
}

/// A single record of a `HEADER.CMF` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArchiveHeader {
    /// Index of the archive the entries belong to
    pub index: u32,
    /// Checksum stored after the entry table
    pub checksum: u32,
    /// The decrypted entries
    pub entries: Vec<FileEntry>,
}

impl ArchiveHeader {
    /// Relative path of the archive described by this header
    pub fn archive_path(&self) -> String {
        format!("DAT{}/DAT{}.CMF", self.index / 500, self.index)
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use binrw::{BinRead, BinWrite};
    use pretty_assertions::assert_eq;

    use crate::error::{Error, Result};
    use crate::types::{
        ArchiveHeader, ArchiveVersion, EntryRecord, SIGNATURE_V1, SIGNATURE_V2,
    };

    #[test]
    fn signatures() {
        assert_eq!(
            &SIGNATURE_V1[..8],
            &[0x43, 0x00, 0x4F, 0x00, 0x4D, 0x00, 0x42, 0x00]
        );
        assert_eq!(&SIGNATURE_V1[40..], &[0x30, 0x00, 0x00, 0x00]);
        assert_eq!(&SIGNATURE_V2[34..], &[0x32, 0x00, 0x00, 0x00]);
    }

    #[test]
    fn detect_version() -> Result<()> {
        let mut input = SIGNATURE_V1.to_vec();
        input.extend_from_slice(&[0; 64]);
        assert_eq!(ArchiveVersion::detect(&input)?, ArchiveVersion::V1);

        input[40] = b'5';
        assert_eq!(ArchiveVersion::detect(&input)?, ArchiveVersion::V2);

        input[0] = b'X';
        assert!(matches!(
            ArchiveVersion::detect(&input),
            Err(Error::InvalidArchive)
        ));

        Ok(())
    }

    #[test]
    fn documented_v2_signature_rejected() {
        assert!(ArchiveVersion::detect(&SIGNATURE_V2).is_err());
    }

    #[test]
    fn read_record() -> Result<()> {
        let mut input = vec![0u8; 512];
        input[0] = b'A';
        input[2] = b'.';
        input[4] = b'X';
        #[rustfmt::skip]
        input.extend_from_slice(&[
            0x58, 0x02, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
            0x10, 0x00, 0x00, 0x00,
            0x00, 0x00, 0x00, 0x00,
        ]);

        let record = EntryRecord::read(&mut Cursor::new(input))?;
        assert_eq!(record.name(), "A.X");
        assert_eq!(record.size, 600);

        let entry = record.into_entry(0x278);
        assert_eq!(entry.offset, 0x288);
        assert_eq!(entry.stored_size(), 600);
        assert!(!entry.is_compressed());

        Ok(())
    }

    #[test]
    fn write_record() -> Result<()> {
        let mut record = EntryRecord::with_name("MOTION_STRIKER.XMD")?;
        record.size = 11;
        record.size_compressed = 19;
        record.compression_method = 1;

        let mut actual = Vec::new();
        record.write(&mut Cursor::new(&mut actual))?;
        assert_eq!(actual.len(), 528);
        assert_eq!(&actual[512..], &[11, 0, 0, 0, 19, 0, 0, 0, 0, 0, 0, 0, 1, 0, 0, 0]);

        let entry = EntryRecord::read(&mut Cursor::new(actual))?.into_entry(0);
        assert_eq!(entry.name, "MOTION_STRIKER.XMD");
        assert_eq!(entry.stored_size(), 19);

        Ok(())
    }

    #[test]
    fn name_too_long() {
        let name = "A".repeat(256);
        assert!(matches!(
            EntryRecord::with_name(&name),
            Err(Error::NameTooLong(_))
        ));
    }

    #[test]
    fn archive_path() {
        let header = ArchiveHeader {
            index: 1234,
            ..Default::default()
        };
        assert_eq!(header.archive_path(), "DAT2/DAT1234.CMF");
    }
}
