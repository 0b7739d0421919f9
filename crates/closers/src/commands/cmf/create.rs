use clap::Args;
use closers_cmf::{write::CmfWriterOptions, ArchiveVersion, CmfWriter, CompressionMethod};
use miette::miette;
use miette::{Context, IntoDiagnostic, Result};
use std::{fs::File, path::PathBuf};
use tracing::info;
use walkdir::WalkDir;

use crate::commands::create_output;

#[derive(Args)]
pub struct CreateArgs {
    /// An input directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// A target CMF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Store files without compressing them
    #[arg(long, default_value_t = false)]
    store: bool,

    /// Write the signature of the second archive version
    #[arg(long, default_value_t = false)]
    v2: bool,
}

impl CreateArgs {
    pub fn handle(&self) -> Result<()> {
        info!("creating {}", &self.file.display());

        let files = WalkDir::new(&self.directory)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| !e.file_type().is_dir())
            .collect::<Vec<_>>();

        if files.is_empty() {
            return Err(miette!("directory is empty"));
        }

        let out = create_output(&self.file, self.overwrite)?;
        let version = if self.v2 {
            ArchiveVersion::V2
        } else {
            ArchiveVersion::V1
        };
        let mut cmf = CmfWriter::new(out, CmfWriterOptions::builder().version(version).build());
        let compression = if self.store {
            CompressionMethod::None
        } else {
            CompressionMethod::Zlib
        };

        for file in files {
            let name = file
                .path()
                .strip_prefix(&self.directory)
                .into_diagnostic()?;
            let name = name
                .to_str()
                .ok_or(miette!("unable to convert {} to a string", name.display()))?
                .replace('/', "\\");
            info!("adding {name}");

            cmf.start_file(&name, compression)
                .context(format!("starting entry for {name}"))?;

            let mut f = File::open(file.path())
                .into_diagnostic()
                .context(format!("opening {}", file.path().display()))?;

            std::io::copy(&mut f, &mut cmf)
                .into_diagnostic()
                .context(format!("copying {}", file.path().display()))?;
        }

        cmf.finish().context("finalizing cmf file")?;

        Ok(())
    }
}
