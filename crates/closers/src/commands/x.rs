use clap::{Args, Subcommand};
use itertools::Itertools;
use miette::{IntoDiagnostic, Result};
use std::{
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::commands::{create_output, has_extension, read_input};

#[derive(Subcommand)]
pub enum XCommands {
    /// Convert a model in any encoding to the text encoding
    Convert(ConvertArgs),
    /// List the textures referenced by models
    Textures(TexturesArgs),
}

impl XCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            XCommands::Convert(convert) => convert.handle(),
            XCommands::Textures(textures) => textures.handle(),
        }
    }
}

#[derive(Args)]
pub struct ConvertArgs {
    /// An input .X file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Where to write the text model, standard output when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only inflate compressed models, keeping their encoding
    #[arg(long, default_value_t = false)]
    inflate_only: bool,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ConvertArgs {
    pub fn handle(&self) -> Result<()> {
        let bytes = read_input(&self.file)?;
        let converted = if self.inflate_only {
            if closers_x::is_compressed(&bytes) {
                closers_x::mszip::decompress(&bytes)?
            } else {
                bytes
            }
        } else {
            closers_x::to_text(&bytes)?.into_bytes()
        };

        match &self.output {
            Some(path) => {
                let mut out = create_output(path, self.overwrite)?;
                out.write_all(&converted).into_diagnostic()?;
                info!("wrote {}", path.display());
            }
            None => std::io::stdout().write_all(&converted).into_diagnostic()?,
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct TexturesArgs {
    /// A .X file or a directory searched for them
    #[arg(short, long, value_name = "PATH")]
    path: PathBuf,

    /// Prefix each texture with the model referencing it
    #[arg(long, default_value_t = false)]
    per_model: bool,
}

impl TexturesArgs {
    pub fn handle(&self) -> Result<()> {
        let models = model_paths(&self.path);
        let mut all = Vec::new();

        for model in &models {
            let textures = match model_textures(model) {
                Ok(textures) => textures,
                Err(err) => {
                    warn!("{}: {err:?}", model.display());
                    continue;
                }
            };

            if self.per_model {
                for texture in &textures {
                    println!("{}\t{texture}", model.display());
                }
            }
            all.extend(textures);
        }

        if !self.per_model {
            for texture in all.iter().sorted().dedup() {
                println!("{texture}");
            }
        }
        Ok(())
    }
}

/// The models at `path`, a single file or every `.X` file below a directory
pub fn model_paths(path: &Path) -> Vec<PathBuf> {
    if path.is_file() {
        return vec![path.to_path_buf()];
    }

    WalkDir::new(path)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), "x"))
        .map(|e| e.into_path())
        .collect()
}

/// Texture file names referenced by a model
pub fn model_textures(path: &Path) -> Result<Vec<String>> {
    let file = closers_x::decode(&read_input(path)?)?;
    Ok(file.texture_filenames().map(str::to_owned).collect())
}
