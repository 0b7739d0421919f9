use clap::Args;
use closers_cmf::CmfArchive;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::{Read, Seek, Write},
    path::{Path, PathBuf},
};
use tracing::{info, warn};

use super::entry_path;
use crate::commands::{create_output, has_extension};

#[derive(Args)]
pub struct ExtractArgs {
    /// An input CMF file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// A target directory
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,

    /// Write .X models in the text encoding
    #[arg(long, default_value_t = false)]
    text: bool,
}

impl ExtractArgs {
    pub fn handle(&self) -> Result<()> {
        let f = File::open(&self.file)
            .into_diagnostic()
            .context(format!("path: {}", &self.file.display()))?;
        let mut cmf = CmfArchive::new(f)?;

        let failed = extract_all(&mut cmf, &self.directory, self.overwrite, self.text);
        if failed.is_empty() {
            Ok(())
        } else {
            for name in &failed {
                warn!("failed to extract {name}");
            }
            Err(miette!("{} of {} files failed to extract", failed.len(), cmf.len()))
        }
    }
}

/// Extract every entry of an archive below `directory`.
///
/// A failing entry is logged and skipped. Returns the names of the entries that failed.
pub fn extract_all<R: Read + Seek>(
    cmf: &mut CmfArchive<R>,
    directory: &Path,
    overwrite: bool,
    text: bool,
) -> Vec<String> {
    let mut failed = Vec::new();
    for i in 0..cmf.len() {
        let name = match cmf.by_index(i) {
            Ok(file) => file.name().to_owned(),
            Err(err) => {
                warn!(index = i, "{err}");
                failed.push(format!("#{i}"));
                continue;
            }
        };

        if let Err(err) = extract_one(cmf, i, &name, directory, overwrite, text) {
            warn!("{name}: {err:?}");
            failed.push(name);
        }
    }
    failed
}

fn extract_one<R: Read + Seek>(
    cmf: &mut CmfArchive<R>,
    index: usize,
    name: &str,
    directory: &Path,
    overwrite: bool,
    text: bool,
) -> Result<()> {
    let path = entry_path(directory, name)
        .ok_or_else(|| miette!("{name} would be written outside {}", directory.display()))?;
    info!("writing {}", path.display());

    let mut file = cmf.by_index(index)?;
    let mut bytes = Vec::with_capacity(file.size() as usize);
    file.read_to_end(&mut bytes).into_diagnostic()?;
    if text && has_extension(&path, "x") {
        bytes = closers_x::to_text(&bytes)?.into_bytes();
    }

    create_output(&path, overwrite)?
        .write_all(&bytes)
        .into_diagnostic()
}
