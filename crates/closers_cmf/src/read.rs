//! Types for reading CMF archives
//!

use indexmap::IndexMap;
use std::{
    fmt::{self, Debug},
    io::{self, Read, Seek, SeekFrom},
    sync::Arc,
};
use tracing::{debug, instrument, warn};

use crate::{
    cipher::{decrypt_word, ENTRY_KEYS},
    compression::{CmfBlockReader, CompressionMethod},
    error::{Error, FileNotFoundError, Result},
    table::{decrypt_entry_table, read_u32_at, RECORD_SIZE, TABLE_OFFSET},
    types::{ArchiveVersion, FileEntry},
};

/// A struct for reading an entry from a CMF file
pub struct CmfFile<'a, R: Read + Seek> {
    data: &'a FileEntry,
    reader: CmfBlockReader<'a, R>,
}

impl<R: Read + Seek> Debug for CmfFile<'_, R> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "CmfFile({:#?})", self.data)
    }
}

impl<R: Read + Seek> CmfFile<'_, R> {
    /// Get the name of the file
    ///
    /// # Warnings
    ///
    /// It is dangerous to use this name directly when extracting an archive.
    /// It may contain an absolute path, or break out of the current directory
    /// (`..\runtime`).
    pub fn name(&self) -> &str {
        &self.data.name
    }

    /// Get the size of the file, in bytes, when extracted
    pub fn size(&self) -> u64 {
        self.data.size as u64
    }

    /// Get the size of the file, in bytes, in the archive
    pub fn stored_size(&self) -> u64 {
        self.data.stored_size() as u64
    }

    /// Get the starting offset of the data of the file
    pub fn data_start(&self) -> u64 {
        self.data.offset as u64
    }

    /// Get the compression method used for this file
    pub fn compression_method(&self) -> CompressionMethod {
        self.data.compression()
    }

    /// Metadata of the entry being read
    pub fn entry(&self) -> &FileEntry {
        self.data
    }
}

impl<R: Read + Seek> Read for CmfFile<'_, R> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.reader.read(buf)
    }
}

#[derive(Debug)]
struct Shared {
    version: ArchiveVersion,
    files: IndexMap<Box<str>, FileEntry>,
    archive_len: u64,
}

/// CMF archive reader
///
/// ```no_run
/// use std::io::prelude::*;
///
/// fn list_cmf_contents(reader: impl Read + Seek) -> closers_cmf::error::Result<()> {
///     let mut cmf = closers_cmf::CmfArchive::new(reader)?;
///
///     for i in 0..cmf.len() {
///         let mut file = cmf.by_index(i)?;
///         println!("Filename: {}", file.name());
///         std::io::copy(&mut file, &mut std::io::stdout())?;
///     }
///
///     Ok(())
/// }
/// ```
pub struct CmfArchive<R> {
    reader: R,
    shared: Arc<Shared>,
}

impl<R: Clone> Clone for CmfArchive<R> {
    fn clone(&self) -> Self {
        CmfArchive {
            reader: self.reader.clone(),
            shared: self.shared.clone(),
        }
    }
}

impl<R> CmfArchive<R> {
    /// Total size of the files in the archive when extracted
    pub fn decompressed_size(&self) -> u128 {
        self.shared
            .files
            .values()
            .map(|file| file.size as u128)
            .sum()
    }

    /// Format version detected from the signature
    pub fn version(&self) -> ArchiveVersion {
        self.shared.version
    }
}

impl<R: Read + Seek> CmfArchive<R> {
    /// Read a CMF archive collecting the files it contains.
    #[instrument(skip_all, err)]
    pub fn new(mut reader: R) -> Result<CmfArchive<R>> {
        let shared = Self::get_metadata(&mut reader)?;
        Ok(CmfArchive {
            reader,
            shared: shared.into(),
        })
    }

    /// Number of entries contained in this CMF.
    pub fn len(&self) -> usize {
        self.shared.files.len()
    }

    /// Whether this CMF archive contains no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns an iterator over all the file names in this archive.
    pub fn file_names(&self) -> impl Iterator<Item = &str> {
        self.shared.files.keys().map(|s| s.as_ref())
    }

    /// Returns an iterator over the entries in table order.
    pub fn entries(&self) -> impl Iterator<Item = &FileEntry> {
        self.shared.files.values()
    }

    /// Get the index of a file entry by name, if it's present.
    #[inline(always)]
    pub fn index_for_name(&self, name: &str) -> Option<usize> {
        self.shared.files.get_index_of(name)
    }

    /// Search for a file entry by name
    pub fn by_name(&mut self, name: &str) -> Result<CmfFile<'_, R>> {
        let Some(index) = self.shared.files.get_index_of(name) else {
            return Err(Error::FileNotFound(FileNotFoundError::Name(
                name.to_owned(),
            )));
        };
        self.by_index(index)
    }

    /// Get a contained file by index
    ///
    /// Fails with [`Error::EntryOutOfBounds`] when the entry's data does not lie inside the archive.
    pub fn by_index(&mut self, file_number: usize) -> Result<CmfFile<'_, R>> {
        let (_, data) = self
            .shared
            .files
            .get_index(file_number)
            .ok_or(Error::FileNotFound(FileNotFoundError::Index(file_number)))?;

        if data.end() > self.shared.archive_len {
            return Err(Error::EntryOutOfBounds {
                name: data.name.clone(),
                offset: data.offset as u64,
                end: data.end(),
                archive_len: self.shared.archive_len,
            });
        }

        Ok(CmfFile {
            data,
            reader: CmfBlockReader::new(
                &mut self.reader,
                data.offset as u64,
                data.stored_size() as u64,
                data.compression(),
            )?,
        })
    }

    /// Read the whole content of a file, inflating it when needed
    pub fn read_file(&mut self, name: &str) -> Result<Vec<u8>> {
        let mut file = self.by_name(name)?;
        let mut buffer = Vec::with_capacity(file.size() as usize);
        file.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Read the bytes of an entry as stored in the archive, without inflating them
    pub fn read_stored(&mut self, file_number: usize) -> Result<Vec<u8>> {
        let entry = self.by_index(file_number)?.entry().clone();
        let mut reader = CmfBlockReader::new(
            &mut self.reader,
            entry.offset as u64,
            entry.stored_size() as u64,
            CompressionMethod::None,
        )?;

        let mut buffer = Vec::with_capacity(entry.stored_size() as usize);
        reader.read_to_end(&mut buffer)?;
        Ok(buffer)
    }

    /// Unwrap and return the inner reader object
    ///
    /// The position of the reader is undefined.
    pub fn into_inner(self) -> R {
        self.reader
    }

    fn get_metadata(reader: &mut R) -> Result<Shared> {
        let archive_len = reader.seek(SeekFrom::End(0))?;
        reader.seek(SeekFrom::Start(0))?;

        let mut prefix = vec![0u8; TABLE_OFFSET + 4];
        reader
            .read_exact(&mut prefix)
            .map_err(|_| Error::InvalidArchive)?;
        let version = ArchiveVersion::detect(&prefix)?;

        // The table is decrypted from a buffer holding the region up to its end
        let count = decrypt_word(read_u32_at(&prefix, TABLE_OFFSET)?, ENTRY_KEYS[0]);
        let table_len = (count as u64).saturating_mul(RECORD_SIZE as u64);
        if prefix.len() as u64 + table_len > archive_len {
            return Err(Error::InvalidEntryCount {
                offset: TABLE_OFFSET,
                count,
            });
        }
        let mut region = prefix;
        region.resize(region.len() + table_len as usize, 0);
        reader.read_exact(&mut region[TABLE_OFFSET + 4..])?;

        let table = decrypt_entry_table(&region, 0)?;
        debug!(?version, entries = table.entries.len(), "read archive table");

        let mut files = IndexMap::with_capacity(table.entries.len());
        for entry in table.entries {
            if entry.end() > archive_len {
                warn!(name = %entry.name, end = entry.end(), archive_len, "entry lies outside the archive");
            }
            if let Some(previous) = files.insert(entry.name.clone().into_boxed_str(), entry) {
                warn!(name = %previous.name, "duplicate entry name, keeping the last one");
            }
        }

        Ok(Shared {
            version,
            files,
            archive_len,
        })
    }
}

#[cfg(test)]
mod test {
    use std::io::{Cursor, Read};

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::{
        compression::CompressionMethod,
        error::{Error, Result},
        read::CmfArchive,
        table::encrypt_entry_table,
        types::{ArchiveVersion, EntryRecord, SIGNATURE_V1},
        write::{CmfWriter, CmfWriterOptions},
    };

    fn archive_with(records: Vec<EntryRecord>, data: &[u8]) -> Result<Vec<u8>> {
        let mut out = SIGNATURE_V1.to_vec();
        out.resize(0x64, 0);
        out.extend(encrypt_entry_table(&records)?);
        out.extend_from_slice(data);
        Ok(out)
    }

    #[test]
    fn read_invalid_signature() -> Result<()> {
        let mut input = archive_with(vec![], &[])?;
        input[0] = b'X';
        assert!(matches!(
            CmfArchive::new(Cursor::new(input)),
            Err(Error::InvalidArchive)
        ));
        Ok(())
    }

    #[test]
    fn read_truncated_archive() {
        let input = SIGNATURE_V1.to_vec();
        assert!(CmfArchive::new(Cursor::new(input)).is_err());
    }

    #[test]
    #[traced_test]
    fn read_empty_archive() -> Result<()> {
        let archive = CmfArchive::new(Cursor::new(archive_with(vec![], &[])?))?;
        assert!(archive.is_empty());
        assert_eq!(archive.version(), ArchiveVersion::V1);
        Ok(())
    }

    #[test]
    #[traced_test]
    fn read_uncompressed_entry() -> Result<()> {
        let mut record = EntryRecord::with_name("hello.txt")?;
        record.size = 11;

        let input = archive_with(vec![record], b"Hello World")?;
        let mut archive = CmfArchive::new(Cursor::new(input))?;
        assert_eq!(archive.len(), 1);

        let mut file = archive.by_index(0)?;
        assert_eq!(file.name(), "hello.txt");
        assert_eq!(file.data_start(), 0x68 + 528);
        assert_eq!(file.compression_method(), CompressionMethod::None);

        let mut buffer = Vec::new();
        file.read_to_end(&mut buffer)?;
        assert_eq!(buffer, b"Hello World");

        Ok(())
    }

    #[test]
    #[traced_test]
    fn read_compressed_entries() -> Result<()> {
        let mut first = EntryRecord::with_name("hello.txt")?;
        first.size = 11;
        first.size_compressed = 19;
        first.compression_method = 1;
        let mut second = EntryRecord::with_name("world.txt")?;
        second.size = 11;
        second.relative_offset = 19;

        #[rustfmt::skip]
        let data = [
            0x78, 0x9C, 0xF3, 0x48, 0xCD, 0xC9, 0xC9, 0x57, 0x08, 0xCF,
            0x2F, 0xCA, 0x49, 0x01, 0x00, 0x18, 0x0B, 0x04, 0x1D,
            0x57, 0x6F, 0x72, 0x6C, 0x64, 0x20, 0x48, 0x65, 0x6C, 0x6C, 0x6F,
        ];

        let input = archive_with(vec![first, second], &data)?;
        let mut archive = CmfArchive::new(Cursor::new(input))?;
        assert_eq!(archive.len(), 2);
        assert_eq!(
            archive.file_names().collect::<Vec<_>>(),
            vec!["hello.txt", "world.txt"]
        );

        assert_eq!(archive.read_file("hello.txt")?, b"Hello World");
        assert_eq!(archive.read_file("world.txt")?, b"World Hello");
        assert_eq!(archive.decompressed_size(), 22);
        assert_eq!(archive.read_stored(0)?, &data[..19]);
        assert_eq!(archive.read_stored(1)?, &data[19..]);

        Ok(())
    }

    #[test]
    #[traced_test]
    fn entry_out_of_bounds() -> Result<()> {
        let mut record = EntryRecord::with_name("big.dds")?;
        record.size = 100;

        let input = archive_with(vec![record], &[0; 10])?;
        let mut archive = CmfArchive::new(Cursor::new(input))?;
        assert!(matches!(
            archive.by_name("big.dds"),
            Err(Error::EntryOutOfBounds { offset: 0x278, end: 0x2DC, .. })
        ));
        Ok(())
    }

    #[test]
    fn file_not_found() -> Result<()> {
        let mut archive = CmfArchive::new(Cursor::new(archive_with(vec![], &[])?))?;
        assert!(matches!(
            archive.by_name("missing.x"),
            Err(Error::FileNotFound(_))
        ));
        assert!(matches!(archive.by_index(3), Err(Error::FileNotFound(_))));
        Ok(())
    }

    #[test]
    #[traced_test]
    fn read_written_archive() -> Result<()> {
        let mut writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
        writer.start_file("a.txt", CompressionMethod::Zlib)?;
        std::io::Write::write_all(&mut writer, b"first file")?;
        writer.start_file("b.txt", CompressionMethod::None)?;
        std::io::Write::write_all(&mut writer, b"second")?;
        let output = writer.finish()?.into_inner();

        let mut archive = CmfArchive::new(Cursor::new(output))?;
        assert_eq!(archive.read_file("a.txt")?, b"first file");
        assert_eq!(archive.read_file("b.txt")?, b"second");
        Ok(())
    }
}
