use clap::Args;
use closers_cmf::CmfArchive;
use miette::{Context, IntoDiagnostic, Result};
use owo_colors::{OwoColorize, Stream::Stdout};
use std::{fs::File, path::PathBuf};

#[derive(Args)]
pub struct ListArgs {
    /// An input CMF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let cmf = CmfArchive::new(f)?;

        println!(
            "{} ({:?}, {} entries, {} bytes extracted)",
            self.file.display(),
            cmf.version(),
            cmf.len(),
            cmf.decompressed_size()
        );
        for entry in cmf.entries() {
            let method = if entry.is_compressed() {
                format!("{}", "zlib".if_supports_color(Stdout, |t| t.green()))
            } else {
                format!("{}", "none".if_supports_color(Stdout, |t| t.dimmed()))
            };
            println!(
                "{:>10} {:>10} {:>10} {} {}",
                entry.offset,
                entry.size,
                entry.stored_size(),
                method,
                entry.name
            );
        }
        Ok(())
    }
}
