//! This library handles reading from and creating **CMF** archives used by *Closers*.
//!
//! # CMF Archive Format Documentation
//!
//! The game ships its assets inside `DAT*.CMF` containers. Each container starts with a wide
//! string signature, followed by an encrypted table describing the files it holds and finally
//! the file data itself. A separate, zlib-compressed `HEADER.CMF` file repeats the entry tables
//! of every container so that a file can be located without opening each archive.
//!
//! ## File Structure
//!
//! | Offset (bytes)        | Field         | Description                                                     |
//! |-----------------------|---------------|-----------------------------------------------------------------|
//! | 0x0000                | Signature     | UTF-16LE `"COMBINE FILE ver. 1.0\0"` (version 1)                |
//! | 0x0064                | Entry Count   | 4 bytes: encrypted number of entries                            |
//! | 0x0068                | Entry Table   | `count * 528` bytes: encrypted entry records                    |
//! | 0x0068 + table size   | Data          | File data, addressed relative to this position                  |
//!
//! ### Entry Table
//!
//! The entry count and the table are encrypted as a flat stream of little-endian 32-bit words.
//! Every word has its most and least significant bytes exchanged and is XORed with one of three
//! keys. The keys cycle per word (`0xAC9372DE`, `0x8469AF01`, `0xDC39628F`) starting again with the
//! first key at the beginning of the table. The cycle runs across the whole table and is not
//! restarted for each record.
//!
//! Once decrypted, each 528 byte record has the following structure:
//!
//! | Offset (bytes) | Field              | Description                                                |
//! |----------------|--------------------|------------------------------------------------------------|
//! | 0x0000         | Name               | 512 bytes: UTF-16LE name, terminated by the first null     |
//! | 0x0200         | Size               | 4 bytes: size of the file when uncompressed                |
//! | 0x0204         | Compressed Size    | 4 bytes: size of the stored data when compressed           |
//! | 0x0208         | Offset             | 4 bytes: offset of the data relative to the data block     |
//! | 0x020C         | Compression        | 4 bytes: `0` stored as is, anything else is zlib           |
//!
//! ### Header File
//!
//! `HEADER.CMF` is zlib-compressed as a whole. Once inflated it starts with the number of
//! records, each record being a 0x64 byte reserved block, an encrypted entry table as described
//! above, then a checksum and the index of the container the table belongs to. The container
//! for index `n` lives at `DAT{n / 500}/DAT{n}.CMF`.
//!
//! ## Additional Information
//!
//! - **File Extension**: `.cmf`
//! - **Endianness**: Little-endian for all multi-byte integers
//!

pub mod cipher;
pub mod compression;
pub mod error;
pub mod header;
pub mod read;
pub mod table;
pub mod types;
pub mod write;

pub use compression::CompressionMethod;
pub use header::HeaderFileReader;
pub use read::CmfArchive;
pub use table::decrypt_entry_table;
pub use types::{ArchiveHeader, ArchiveVersion, FileEntry};
pub use write::CmfWriter;
