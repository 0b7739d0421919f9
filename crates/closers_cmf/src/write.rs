//! Types for writing CMF archives
//!

use bon::Builder;
use byteorder::{LittleEndian, WriteBytesExt};
use std::fmt::Debug;
use std::io::{self, Seek, Write};
use tracing::{debug, instrument, Level};

use crate::compression::{CmfBlockWriter, CompressionMethod};
use crate::error::{Error, Result};
use crate::table::{encrypt_entry_table, TABLE_OFFSET};
use crate::types::{ArchiveVersion, EntryRecord};

/// Options for how the CMF file should be written
#[derive(Debug, Clone, Copy, Default, Builder)]
pub struct CmfWriterOptions {
    /// The version whose signature is written at the start of the archive
    #[builder(default)]
    pub version: ArchiveVersion,
}

/// CMF archive generator
///
/// ```
/// # fn doit() -> closers_cmf::error::Result<()>
/// # {
/// # use closers_cmf::CmfWriter;
/// use std::io::Write;
/// use closers_cmf::write::CmfWriterOptions;
///
/// // We use a buffer here, though you'd normally use a `File`
/// let mut cmf = CmfWriter::new(std::io::Cursor::new(Vec::new()), CmfWriterOptions::default());
///
/// cmf.start_file("HELLO_WORLD.TXT", closers_cmf::CompressionMethod::None)?;
/// cmf.write_all(b"Hello, World!")?;
///
/// // Apply the changes you've made.
/// cmf.finish()?;
///
/// # Ok(())
/// # }
/// # doit().unwrap();
/// ```
pub struct CmfWriter<W: Write + Seek> {
    inner: W,
    options: CmfWriterOptions,
    records: Vec<EntryRecord>,
    data_block: Vec<u8>,
    current: Option<(EntryRecord, CmfBlockWriter<Vec<u8>>)>,
}

impl<W: Write + Seek> CmfWriter<W> {
    /// Initializes the archive.
    ///
    /// Before writing to this object, the [`CmfWriter::start_file`] function should be called.
    pub fn new(inner: W, options: CmfWriterOptions) -> CmfWriter<W> {
        CmfWriter {
            inner,
            options,
            records: Vec::new(),
            data_block: Vec::new(),
            current: None,
        }
    }

    /// Returns true if a file is currently open for writing.
    pub const fn is_writing_file(&self) -> bool {
        self.current.is_some()
    }

    /// Start a new file with the requested compression.
    #[instrument(skip(self, name), err)]
    pub fn start_file(&mut self, name: impl ToString, compression: CompressionMethod) -> Result<()> {
        self.finish_file()?;

        let mut record = EntryRecord::with_name(&name.to_string())?;
        record.compression_method = compression.into();
        record.relative_offset = u32::try_from(self.data_block.len())
            .map_err(|_| Error::CustomError("data block exceeds 4 GiB".to_owned()))?;

        self.current = Some((record, CmfBlockWriter::new(Vec::new(), compression)));
        Ok(())
    }

    #[instrument(skip(self), err)]
    fn finish_file(&mut self) -> Result<()> {
        let Some((mut record, block)) = self.current.take() else {
            return Ok(());
        };

        let size = block.total_in() as u32;
        let stored = block.finalize()?;

        record.size = size;
        record.size_compressed = if record.compression_method != 0 {
            stored.len() as u32
        } else {
            0
        };

        self.data_block.extend_from_slice(&stored);
        self.records.push(record);
        Ok(())
    }

    /// Finish the last file and write all other CMF file structures
    ///
    /// This will return the writer, but one should normally not append any data to the end of the file.
    #[instrument(skip(self), err)]
    pub fn finish(mut self) -> Result<W> {
        self.finish_file()?;

        let mut signature = self.options.version.signature().to_vec();
        signature.resize(TABLE_OFFSET, 0);

        self.inner.write_all(&signature)?;
        self.inner.write_all(&encrypt_entry_table(&self.records)?)?;
        self.inner.write_all(&self.data_block)?;

        debug!(
            entries = self.records.len(),
            data = self.data_block.len(),
            "wrote archive"
        );
        Ok(self.inner)
    }
}

impl<W: Write + Seek> Write for CmfWriter<W> {
    #[instrument(skip_all, err, ret(level = Level::TRACE), fields(size=buf.len()) )]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self.current.as_mut() {
            Some((_, block)) => block.write(buf),
            None => Err(io::Error::new(
                io::ErrorKind::Other,
                "No file has been started",
            )),
        }
    }

    #[instrument(skip(self), err)]
    fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }
}

/// One record of a `HEADER.CMF` file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HeaderRecord {
    /// Index of the archive described by the record
    pub index: u32,
    /// Checksum stored after the table
    pub checksum: u32,
    /// Entries of the archive
    pub records: Vec<EntryRecord>,
}

/// Write a single header record: a reserved block, the encrypted table, checksum and index.
pub fn write_header_record(writer: &mut impl Write, record: &HeaderRecord) -> Result<()> {
    let mut reserved = ArchiveVersion::V1.signature().to_vec();
    reserved.resize(TABLE_OFFSET, 0);

    writer.write_all(&reserved)?;
    writer.write_all(&encrypt_entry_table(&record.records)?)?;
    writer.write_u32::<LittleEndian>(record.checksum)?;
    writer.write_u32::<LittleEndian>(record.index)?;
    Ok(())
}

/// Build an inflated `HEADER.CMF` buffer.
///
/// Compress the result with [`crate::compression::deflate_header_file`] to get the stored form.
pub fn write_header_file(records: &[HeaderRecord]) -> Result<Vec<u8>> {
    let count = u32::try_from(records.len())
        .map_err(|_| Error::CustomError(format!("{} headers is too many", records.len())))?;

    let mut out = Vec::new();
    out.write_u32::<LittleEndian>(count)?;
    for record in records {
        write_header_record(&mut out, record)?;
    }
    Ok(out)
}

#[cfg(test)]
mod test {
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use crate::error::Result;
    use crate::{
        compression::CompressionMethod,
        table::decrypt_entry_table,
        types::{ArchiveVersion, SIGNATURE_V1},
        write::{CmfWriter, CmfWriterOptions},
    };
    use std::io::{Cursor, Write};

    #[traced_test]
    #[test]
    fn cmf_empty_write() -> Result<()> {
        let writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
        let result = writer.finish()?.into_inner();

        assert_eq!(result.len(), 0x68);
        assert_eq!(&result[..44], &SIGNATURE_V1);
        assert!(result[44..0x64].iter().all(|b| *b == 0));
        assert_eq!(decrypt_entry_table(&result, 0)?.entries.len(), 0);
        Ok(())
    }

    #[traced_test]
    #[test]
    fn cmf_write_entries() -> Result<()> {
        let mut writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
        writer.start_file("HELLO.TXT", CompressionMethod::None)?;
        writer.write_all(b"Hello World")?;
        writer.start_file("WORLD.TXT", CompressionMethod::Zlib)?;
        writer.write_all(b"World Hello")?;
        assert!(writer.is_writing_file());
        let result = writer.finish()?.into_inner();

        let table = decrypt_entry_table(&result, 0)?;
        assert_eq!(table.entries.len(), 2);

        let hello = &table.entries[0];
        assert_eq!(hello.offset as usize, table.next_pos);
        assert_eq!(hello.size, 11);
        assert_eq!(hello.size_compressed, 0);
        assert_eq!(
            &result[hello.offset as usize..hello.end() as usize],
            b"Hello World"
        );

        let world = &table.entries[1];
        assert_eq!(world.offset as usize, table.next_pos + 11);
        assert!(world.is_compressed());
        assert_eq!(world.end() as usize, result.len());
        Ok(())
    }

    #[test]
    fn write_without_file() {
        let mut writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
        assert!(writer.write_all(b"data").is_err());
    }

    #[test]
    fn write_v2_signature() -> Result<()> {
        let options = CmfWriterOptions::builder()
            .version(ArchiveVersion::V2)
            .build();
        let result = CmfWriter::new(Cursor::new(Vec::new()), options)
            .finish()?
            .into_inner();
        assert_eq!(ArchiveVersion::detect(&result)?, ArchiveVersion::V2);
        Ok(())
    }
}
