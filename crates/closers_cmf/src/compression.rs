//! Entry compression and decompression handling.

use std::io::{self, Read, Seek, Write};

use flate2::{read::ZlibDecoder, write::ZlibEncoder, Compression};
use tracing::instrument;

use crate::error::Result;

/// Identifies how the data of an entry is stored inside a CMF archive
///
/// Files added to a CMF can specify their compression method via [`crate::write::CmfWriter::start_file`]
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub enum CompressionMethod {
    /// Stores the data as it is
    #[default]
    None,

    /// Compress the data using Zlib
    Zlib,
}

impl From<u32> for CompressionMethod {
    fn from(value: u32) -> Self {
        match value {
            0 => CompressionMethod::None,
            _ => CompressionMethod::Zlib,
        }
    }
}

impl From<CompressionMethod> for u32 {
    fn from(value: CompressionMethod) -> Self {
        match value {
            CompressionMethod::None => 0,
            CompressionMethod::Zlib => 1,
        }
    }
}

pub(crate) enum CmfBlockReader<'a, R: Read + Seek> {
    Raw(io::Take<&'a mut R>),
    Compressed(Box<ZlibDecoder<io::Take<&'a mut R>>>),
}

impl<'a, R: Read + Seek> CmfBlockReader<'a, R> {
    #[tracing::instrument(skip(reader))]
    pub fn new(
        reader: &'a mut R,
        start: u64,
        limit: u64,
        compression: CompressionMethod,
    ) -> Result<Self> {
        reader.seek(io::SeekFrom::Start(start))?;

        let limit_reader = reader.by_ref().take(limit);
        Ok(match compression {
            CompressionMethod::None => CmfBlockReader::Raw(limit_reader),
            CompressionMethod::Zlib => {
                CmfBlockReader::Compressed(Box::new(ZlibDecoder::new(limit_reader)))
            }
        })
    }
}

impl<R: Read + Seek> Read for CmfBlockReader<'_, R> {
    #[instrument(skip_all, err)]
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            CmfBlockReader::Raw(r) => r.read(buf),
            CmfBlockReader::Compressed(r) => r.read(buf),
        }
    }

    #[instrument(skip_all, err)]
    fn read_to_end(&mut self, buf: &mut Vec<u8>) -> io::Result<usize> {
        match self {
            CmfBlockReader::Raw(r) => r.read_to_end(buf),
            CmfBlockReader::Compressed(r) => r.read_to_end(buf),
        }
    }
}

pub(crate) enum CmfBlockWriter<W: Write> {
    Raw(W, usize),
    Compressed(Box<ZlibEncoder<W>>),
}

impl<W: Write> CmfBlockWriter<W> {
    #[tracing::instrument(skip(writer))]
    pub fn new(writer: W, compression: CompressionMethod) -> Self {
        match compression {
            CompressionMethod::None => CmfBlockWriter::Raw(writer, 0),
            CompressionMethod::Zlib => CmfBlockWriter::Compressed(Box::new(ZlibEncoder::new(
                writer,
                Compression::default(),
            ))),
        }
    }

    #[instrument(skip(self), err)]
    pub fn finalize(self) -> io::Result<W> {
        match self {
            CmfBlockWriter::Raw(w, _) => Ok(w),
            CmfBlockWriter::Compressed(w) => w.finish(),
        }
    }

    pub fn total_in(&self) -> u64 {
        match self {
            CmfBlockWriter::Raw(_, c) => *c as u64,
            CmfBlockWriter::Compressed(w) => w.total_in(),
        }
    }
}

impl<W: Write> Write for CmfBlockWriter<W> {
    #[instrument(skip_all, err)]
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            CmfBlockWriter::Raw(w, c) => {
                let written = w.write(buf)?;
                *c += written;
                Ok(written)
            }
            CmfBlockWriter::Compressed(w) => w.write(buf),
        }
    }

    #[instrument(skip_all, err)]
    fn flush(&mut self) -> io::Result<()> {
        match self {
            CmfBlockWriter::Raw(w, _) => w.flush(),
            CmfBlockWriter::Compressed(w) => w.flush(),
        }
    }
}

/// Inflate a `HEADER.CMF` file, which is stored zlib-compressed as a whole.
#[instrument(skip(data), fields(len = data.len()), err)]
pub fn inflate_header_file(data: &[u8]) -> Result<Vec<u8>> {
    let mut out = Vec::with_capacity(data.len() * 4);
    ZlibDecoder::new(data).read_to_end(&mut out)?;
    Ok(out)
}

/// Compress a buffer the way `HEADER.CMF` is stored.
pub fn deflate_header_file(data: &[u8]) -> Result<Vec<u8>> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data)?;
    Ok(encoder.finish()?)
}
