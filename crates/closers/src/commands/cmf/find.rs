use clap::Args;
use closers_cmf::{header::HeaderReaderOptions, CmfArchive};
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{fs::File, io::Write, path::PathBuf};
use tracing::info;

use super::headers::read_headers;
use crate::commands::{create_output, has_extension, read_input};

#[derive(Args)]
pub struct FindArgs {
    /// The game's DAT directory holding HEADER.CMF
    #[arg(short, long, value_name = "DIR")]
    dat: PathBuf,

    /// Name of the file inside the archives, e.g. `MODEL\CHAR\SEHA.X`
    #[arg(short, long, value_name = "NAME")]
    name: String,

    /// Where to write the file
    #[arg(short, long, value_name = "FILE")]
    output: PathBuf,

    /// Write .X models in the text encoding
    #[arg(long, default_value_t = false)]
    text: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl FindArgs {
    pub fn handle(&self) -> Result<()> {
        let stored = read_input(&self.dat.join("HEADER.CMF"))?;
        let headers = read_headers(&stored, HeaderReaderOptions::default())?;

        let header = headers
            .iter()
            .find(|h| h.entries.iter().any(|e| e.name == self.name))
            .ok_or_else(|| miette!("{} is not listed in HEADER.CMF", self.name))?;

        let archive_path = self.dat.join(header.archive_path());
        info!("found {} in {}", self.name, archive_path.display());

        let f = File::open(&archive_path)
            .into_diagnostic()
            .context(format!("path: {}", archive_path.display()))?;
        let mut bytes = CmfArchive::new(f)?.read_file(&self.name)?;

        if self.text && has_extension(&self.output, "x") {
            bytes = closers_x::to_text(&bytes)?.into_bytes();
        }

        let mut out = create_output(&self.output, self.overwrite)?;
        out.write_all(&bytes).into_diagnostic()?;
        info!("wrote {} bytes to {}", bytes.len(), self.output.display());
        Ok(())
    }
}
