//! MSZIP compressed bodies.
//!
//! A compressed file keeps the 16 byte header, with `bzip` or `tzip` as its format, followed by
//! the total decompressed size and a sequence of chunks:
//!
//! | Offset (bytes) | Field              | Description                                          |
//! |----------------|--------------------|------------------------------------------------------|
//! | 0x0000         | Decompressed Size  | 2 bytes: size of the chunk once inflated             |
//! | 0x0002         | Compressed Size    | 2 bytes: size of the signature and payload           |
//! | 0x0004         | Signature          | 2 bytes: `CK`                                        |
//! | 0x0006         | Payload            | `compressed - 2` bytes of raw deflate data           |
//!
//! Chunks are independent deflate streams, but each one may refer back into the output of the
//! chunk before it, which has to be installed as the inflater's dictionary.

use byteorder::{ByteOrder, LittleEndian};
use flate2::{Decompress, FlushDecompress, Status};
use tracing::{instrument, trace};

use crate::{
    error::{Error, Result},
    header::{XHeader, HEADER_SIZE},
};

/// Largest back reference deflate allows
pub const WINDOW_SIZE: usize = 32 * 1024;

/// Chunk signature
pub const BLOCK_SIGNATURE: [u8; 2] = *b"CK";

const BODY_OFFSET: usize = 0x14;

/// Inflate a compressed file into its `bin ` or `txt ` form.
#[instrument(skip(bytes), fields(len = bytes.len()), err)]
pub fn decompress(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut header = XHeader::parse(bytes)?;
    if !header.format.is_compressed() {
        return Err(Error::UnsupportedFormat {
            format: String::from_utf8_lossy(header.format.tag()).into_owned(),
            expected: "bzip or tzip",
        });
    }
    header.format = header.format.decompressed();

    let total = bytes
        .get(HEADER_SIZE..BODY_OFFSET)
        .map(LittleEndian::read_u32)
        .ok_or(Error::UnexpectedEof {
            offset: bytes.len(),
        })? as usize;

    let mut output = header.to_bytes()?;
    output.reserve(total.min(bytes.len().saturating_mul(64)));

    let mut offset = BODY_OFFSET;
    let mut previous = output.len()..output.len();
    while offset < bytes.len() {
        let prefix = bytes
            .get(offset..offset + 6)
            .ok_or(Error::UnexpectedEof { offset })?;
        let decompressed_size = LittleEndian::read_u16(&prefix[0..2]) as usize;
        let compressed_size = LittleEndian::read_u16(&prefix[2..4]) as usize;

        if prefix[4..6] != BLOCK_SIGNATURE {
            return Err(Error::InvalidBlockSignature { offset: offset + 4 });
        }

        let payload_start = offset + 6;
        let payload = compressed_size
            .checked_sub(2)
            .and_then(|len| bytes.get(payload_start..payload_start + len))
            .ok_or(Error::UnexpectedEof {
                offset: payload_start,
            })?;

        let chunk = inflate_chunk(payload, &output[previous], decompressed_size)
            .map_err(|err| match err {
                Error::Inflate { message, .. } => Error::Inflate { offset, message },
                Error::ChunkSizeMismatch {
                    expected, found, ..
                } => Error::ChunkSizeMismatch {
                    offset,
                    expected,
                    found,
                },
                other => other,
            })?;
        trace!(offset, decompressed_size, compressed_size, "inflated chunk");

        previous = output.len()..output.len() + chunk.len();
        output.extend_from_slice(&chunk);
        offset = payload_start + payload.len();
    }

    if output.len() - HEADER_SIZE != total {
        tracing::debug!(
            declared = total,
            actual = output.len() - HEADER_SIZE,
            "decompressed size differs from header"
        );
    }

    Ok(output)
}

/// Inflate one raw deflate chunk, seeded with the previous chunk's output.
///
/// Only the first 32 KiB of `dictionary` are installed, matching the window of an MSZIP chunk.
pub fn inflate_chunk(payload: &[u8], dictionary: &[u8], expected: usize) -> Result<Vec<u8>> {
    let inflate_error = |message: String| Error::Inflate { offset: 0, message };

    let mut inflater = Decompress::new(false);
    if !dictionary.is_empty() {
        let window = &dictionary[..dictionary.len().min(WINDOW_SIZE)];
        inflater
            .set_dictionary(window)
            .map_err(|err| inflate_error(err.to_string()))?;
    }

    let mut out = Vec::with_capacity(expected.max(64));
    loop {
        let consumed = inflater.total_in() as usize;
        let status = inflater
            .decompress_vec(&payload[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|err| inflate_error(err.to_string()))?;

        match status {
            Status::StreamEnd => break,
            _ if out.len() == out.capacity() => out.reserve(out.capacity()),
            _ => return Err(inflate_error("chunk ended before the final block".to_owned())),
        }
    }

    if out.len() != expected {
        return Err(Error::ChunkSizeMismatch {
            offset: 0,
            expected,
            found: out.len(),
        });
    }
    Ok(out)
}
