//! Reading `HEADER.CMF` files as a resumable task.
//!
//! A header file can list tens of thousands of tables. [`HeaderFileReader`] decodes a bounded
//! batch per [`HeaderFileReader::step`] so the caller decides when the next batch runs.
//!
//! ```no_run
//! use closers_cmf::header::{HeaderFileReader, Progress};
//!
//! fn headers(data: &[u8]) -> closers_cmf::error::Result<()> {
//!     let mut reader = HeaderFileReader::new(data)?;
//!     while let Progress::Pending { parsed, total } = reader.step()? {
//!         println!("{parsed}/{total}");
//!     }
//!     for header in reader.headers() {
//!         println!("{} holds {} files", header.archive_path(), header.entries.len());
//!     }
//!     Ok(())
//! }
//! ```

use bon::Builder;
use tracing::{debug, instrument};

use crate::{
    error::Result,
    table::{decrypt_entry_table, read_u32_at},
    types::ArchiveHeader,
};

/// Options for [`HeaderFileReader`]
#[derive(Builder, Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderReaderOptions {
    /// Number of headers decoded per step
    #[builder(default = 30)]
    pub batch_size: usize,
}

impl Default for HeaderReaderOptions {
    fn default() -> Self {
        Self::builder().build()
    }
}

/// Outcome of a single [`HeaderFileReader::step`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Progress {
    /// More headers remain
    Pending {
        /// Headers decoded so far
        parsed: usize,
        /// Headers declared by the file
        total: usize,
    },
    /// Every header has been decoded
    Complete,
}

/// Resumable reader over an inflated `HEADER.CMF` buffer
#[derive(Debug)]
pub struct HeaderFileReader<'a> {
    buffer: &'a [u8],
    pos: usize,
    total: usize,
    options: HeaderReaderOptions,
    headers: Vec<ArchiveHeader>,
}

impl<'a> HeaderFileReader<'a> {
    /// Start reading a header file with the default batch size
    pub fn new(buffer: &'a [u8]) -> Result<Self> {
        Self::with_options(buffer, HeaderReaderOptions::default())
    }

    /// Start reading a header file
    #[instrument(skip(buffer), fields(len = buffer.len()), err)]
    pub fn with_options(buffer: &'a [u8], options: HeaderReaderOptions) -> Result<Self> {
        let total = read_u32_at(buffer, 0)? as usize;
        debug!(total, "header file");

        Ok(Self {
            buffer,
            pos: 4,
            total,
            options,
            headers: Vec::with_capacity(total.min(buffer.len() / 0x68)),
        })
    }

    /// Decode the next batch of headers.
    ///
    /// A step after completion does nothing. A failed step leaves the reader at the header that
    /// failed.
    pub fn step(&mut self) -> Result<Progress> {
        let batch = self.options.batch_size.max(1);
        for _ in 0..batch {
            if self.is_complete() {
                break;
            }

            let table = decrypt_entry_table(self.buffer, self.pos)?;
            let checksum = read_u32_at(self.buffer, table.next_pos)?;
            let index = read_u32_at(self.buffer, table.next_pos + 4)?;
            self.pos = table.next_pos + 8;

            self.headers.push(ArchiveHeader {
                index,
                checksum,
                entries: table.entries,
            });
        }

        Ok(self.progress())
    }

    /// Current progress without doing any work
    pub fn progress(&self) -> Progress {
        if self.is_complete() {
            Progress::Complete
        } else {
            Progress::Pending {
                parsed: self.headers.len(),
                total: self.total,
            }
        }
    }

    /// Whether every declared header has been decoded
    pub fn is_complete(&self) -> bool {
        self.headers.len() >= self.total
    }

    /// Headers decoded so far
    pub fn headers(&self) -> &[ArchiveHeader] {
        &self.headers
    }

    /// Consume the reader, returning the decoded headers
    pub fn into_headers(self) -> Vec<ArchiveHeader> {
        self.headers
    }

    /// Drive the task to completion in the calling thread
    pub fn read_to_end(mut self) -> Result<Vec<ArchiveHeader>> {
        while let Progress::Pending { .. } = self.step()? {}
        Ok(self.headers)
    }
}
