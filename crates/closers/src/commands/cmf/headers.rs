use clap::Args;
use closers_cmf::{
    compression::inflate_header_file,
    header::{HeaderReaderOptions, Progress},
    ArchiveHeader, HeaderFileReader,
};
use miette::Result;
use std::path::PathBuf;
use tracing::{debug, info};

use crate::commands::read_input;

#[derive(Args)]
pub struct HeadersArgs {
    /// A HEADER.CMF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Number of headers decoded between progress reports
    #[arg(long, default_value_t = 30)]
    batch_size: usize,

    /// Only show the archives holding this file
    #[arg(short, long, value_name = "NAME")]
    name: Option<String>,
}

impl HeadersArgs {
    pub fn handle(&self) -> Result<()> {
        let options = HeaderReaderOptions::builder()
            .batch_size(self.batch_size)
            .build();
        let headers = read_headers(&read_input(&self.file)?, options)?;

        for header in &headers {
            match &self.name {
                Some(name) => {
                    if let Some(entry) = header.entries.iter().find(|e| &e.name == name) {
                        println!("{} {} {}", header.archive_path(), entry.offset, entry.size);
                    }
                }
                None => println!(
                    "{} {:>6} entries (checksum {:#010x})",
                    header.archive_path(),
                    header.entries.len(),
                    header.checksum
                ),
            }
        }
        Ok(())
    }
}

/// Inflate and decode a stored `HEADER.CMF`, reporting progress after every batch
pub fn read_headers(stored: &[u8], options: HeaderReaderOptions) -> Result<Vec<ArchiveHeader>> {
    let inflated = inflate_header_file(stored)?;
    debug!(stored = stored.len(), inflated = inflated.len(), "inflated header file");

    let mut reader = HeaderFileReader::with_options(&inflated, options)?;
    while let Progress::Pending { parsed, total } = reader.step()? {
        info!("decoded {parsed}/{total} headers");
    }
    Ok(reader.into_headers())
}
