use std::{fs::File, path::Path};

use miette::{Context, IntoDiagnostic, Result};

pub mod cmf;
pub mod pack;
pub mod x;
pub mod xmd;

#[derive(clap::Subcommand)]
pub enum Commands {
    /// Handle CMF archives
    Cmf {
        #[command(subcommand)]
        command: cmf::CmfCommands,
    },
    /// Handle .X model files
    X {
        #[command(subcommand)]
        command: x::XCommands,
    },
    /// Handle XMD animation files
    Xmd {
        #[command(subcommand)]
        command: xmd::XmdCommands,
    },
    /// Repack archive entries into size bounded packs with a manifest
    Pack(pack::PackArgs),
}

impl Commands {
    pub fn handle(&self) -> Result<()> {
        match self {
            Commands::Cmf { command } => command.handle(),
            Commands::X { command } => command.handle(),
            Commands::Xmd { command } => command.handle(),
            Commands::Pack(pack) => pack.handle(),
        }
    }
}

/// Create an output file, refusing to replace an existing one unless asked to
pub(crate) fn create_output(path: &Path, overwrite: bool) -> Result<File> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)
            .into_diagnostic()
            .context(format!("creating {}", parent.display()))?;
    }

    if overwrite {
        File::create(path)
    } else {
        File::create_new(path)
    }
    .into_diagnostic()
    .context(format!("creating {}", path.display()))
}

/// Read a whole input file
pub(crate) fn read_input(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))
}

/// Whether the extension of `path` matches `extension`, ignoring case
pub(crate) fn has_extension(path: &Path, extension: &str) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case(extension))
}
