//! Encrypted entry tables.

use std::io::Cursor;

use binrw::{BinRead, BinWrite};
use byteorder::{ByteOrder, LittleEndian};
use tracing::{instrument, trace};

use crate::{
    cipher::{decrypt_in_place, decrypt_word, encrypt_in_place, encrypt_word, ENTRY_KEYS},
    error::{Error, Result},
    types::{EntryRecord, FileEntry},
};

/// Offset of the entry count from the start of a table region
pub const TABLE_OFFSET: usize = 0x64;

/// Size of a single entry record
pub const RECORD_SIZE: usize = 528;

/// The entries of a decrypted table
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EntryTable {
    /// Entries in table order, offsets resolved against the end of the table
    pub entries: Vec<FileEntry>,

    /// Position right after the table, which is also where the data block starts
    pub next_pos: usize,
}

pub(crate) fn read_u32_at(buffer: &[u8], offset: usize) -> Result<u32> {
    buffer
        .get(offset..offset + 4)
        .map(LittleEndian::read_u32)
        .ok_or(Error::UnexpectedEof { offset })
}

/// Decrypt and parse the entry table of the region starting at `offset`.
///
/// The entry count lives at `offset + 0x64` and the records follow it. `buffer` is not modified,
/// the table is decrypted in a copy. Signature checks are left to [`crate::ArchiveVersion::detect`].
#[instrument(skip(buffer), fields(len = buffer.len()), err)]
pub fn decrypt_entry_table(buffer: &[u8], offset: usize) -> Result<EntryTable> {
    let count_pos = offset
        .checked_add(TABLE_OFFSET)
        .ok_or(Error::UnexpectedEof { offset })?;
    let count = decrypt_word(read_u32_at(buffer, count_pos)?, ENTRY_KEYS[0]);

    let table_start = count_pos + 4;
    let table_end = (count as usize)
        .checked_mul(RECORD_SIZE)
        .and_then(|size| size.checked_add(table_start))
        .filter(|end| *end <= buffer.len())
        .ok_or(Error::InvalidEntryCount {
            offset: count_pos,
            count,
        })?;

    let mut table = buffer[table_start..table_end].to_vec();
    decrypt_in_place(&mut table);

    let data_offset = u32::try_from(table_end)
        .map_err(|_| Error::CustomError(format!("table end {table_end:#x} exceeds 32 bits")))?;
    let entries = parse_records(&table, count)?
        .into_iter()
        .map(|record| record.into_entry(data_offset))
        .collect();

    trace!(count, table_end, "decrypted entry table");

    Ok(EntryTable {
        entries,
        next_pos: table_end,
    })
}

/// Parse already decrypted records.
pub fn parse_records(table: &[u8], count: u32) -> Result<Vec<EntryRecord>> {
    let mut reader = Cursor::new(table);
    (0..count)
        .map(|_| EntryRecord::read(&mut reader).map_err(Error::from))
        .collect()
}

/// Build the encrypted entry count followed by the encrypted records.
///
/// The output is what a reader expects at `offset + 0x64`.
pub fn encrypt_entry_table(records: &[EntryRecord]) -> Result<Vec<u8>> {
    let count = u32::try_from(records.len())
        .map_err(|_| Error::CustomError(format!("{} entries is too many", records.len())))?;

    let mut table = Vec::with_capacity(records.len() * RECORD_SIZE);
    {
        let mut writer = Cursor::new(&mut table);
        for record in records {
            record.write(&mut writer)?;
        }
    }
    encrypt_in_place(&mut table);

    let mut out = Vec::with_capacity(table.len() + 4);
    out.extend_from_slice(&encrypt_word(count, ENTRY_KEYS[0]).to_le_bytes());
    out.extend_from_slice(&table);
    Ok(out)
}
