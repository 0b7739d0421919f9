//! Variable length integers.
//!
//! Values are stored seven bits at a time, least significant group first. Unlike LEB128 the high
//! bit marks the *last* byte of a value, so `0` is encoded as `0x80` and `300` as `0x2C 0x82`.

use std::io::{self, Read, Write};

/// Longest encoding of a `u32`
pub const MAX_LEN: usize = 5;

/// Flag set on the last byte of a value
pub const LAST_BYTE: u8 = 0x80;

/// Extends [`Read`] with a method for reading variable length integers
pub trait ReadVarIntExt: Read {
    /// Read a variable length integer.
    ///
    /// Fails with [`io::ErrorKind::InvalidData`] when no final byte is found within
    /// [`MAX_LEN`] bytes.
    fn read_varint(&mut self) -> io::Result<u32> {
        let mut value = 0u32;
        let mut byte = [0u8];
        for group in 0..MAX_LEN {
            self.read_exact(&mut byte)?;
            value |= u32::from(byte[0] & !LAST_BYTE) << (group * 7);
            if byte[0] & LAST_BYTE != 0 {
                return Ok(value);
            }
        }
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            "variable length integer has no final byte",
        ))
    }
}

impl<R: Read + ?Sized> ReadVarIntExt for R {}

/// Extends [`Write`] with a method for writing variable length integers
pub trait WriteVarIntExt: Write {
    /// Write a variable length integer, returning the number of bytes written
    fn write_varint(&mut self, value: u32) -> io::Result<usize> {
        let mut buffer = [0u8; MAX_LEN];
        let mut len = 0;
        let mut rest = value;
        loop {
            buffer[len] = (rest & 0x7F) as u8;
            len += 1;
            rest >>= 7;
            if rest == 0 {
                break;
            }
        }
        buffer[len - 1] |= LAST_BYTE;
        self.write_all(&buffer[..len])?;
        Ok(len)
    }
}

impl<W: Write + ?Sized> WriteVarIntExt for W {}

/// Number of bytes used to encode `value`
pub const fn encoded_len(value: u32) -> usize {
    match value {
        0..=0x7F => 1,
        0x80..=0x3FFF => 2,
        0x4000..=0x1F_FFFF => 3,
        0x20_0000..=0x0FFF_FFFF => 4,
        _ => 5,
    }
}

#[cfg(test)]
mod test {
    use std::io::Cursor;

    use pretty_assertions::assert_eq;

    use super::*;

    #[test]
    fn known_encodings() -> io::Result<()> {
        for (value, bytes) in [
            (0u32, &[0x80u8][..]),
            (1, &[0x81]),
            (127, &[0xFF]),
            (128, &[0x00, 0x81]),
            (300, &[0x2C, 0x82]),
            (16383, &[0x7F, 0xFF]),
            (16384, &[0x00, 0x00, 0x81]),
            (2_097_151, &[0x7F, 0x7F, 0xFF]),
            (2_097_152, &[0x00, 0x00, 0x00, 0x81]),
            (268_435_455, &[0x7F, 0x7F, 0x7F, 0xFF]),
            (268_435_456, &[0x00, 0x00, 0x00, 0x00, 0x81]),
            (u32::MAX, &[0x7F, 0x7F, 0x7F, 0x7F, 0x8F]),
        ] {
            let mut out = Vec::new();
            assert_eq!(out.write_varint(value)?, bytes.len());
            assert_eq!(out, bytes);
            assert_eq!(encoded_len(value), bytes.len());
            assert_eq!(Cursor::new(bytes).read_varint()?, value);
        }
        Ok(())
    }

    #[test]
    fn stops_at_final_byte() -> io::Result<()> {
        let mut cursor = Cursor::new([0x05, 0x81, 0x83, 0xFF]);
        assert_eq!(cursor.read_varint()?, 0x85);
        assert_eq!(cursor.read_varint()?, 3);
        assert_eq!(cursor.position(), 3);
        Ok(())
    }

    #[test]
    fn rejects_sixth_byte() {
        let err = Cursor::new([0x01, 0x01, 0x01, 0x01, 0x01, 0x81])
            .read_varint()
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidData);
    }

    #[test]
    fn input_ends_mid_value() {
        let err = Cursor::new([0x01, 0x02]).read_varint().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);

        let err = Cursor::new([0u8; 0]).read_varint().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
