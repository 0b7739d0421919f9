use clap::{Args, Subcommand};
use closers_xmd::{read::Progress, AnimationManifest, DecoderOptions, Xmd, XmdDecoder};
use miette::{IntoDiagnostic, Result};
use std::{io::Write, path::PathBuf};
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use crate::commands::{create_output, has_extension, read_input};

#[derive(Subcommand)]
pub enum XmdCommands {
    /// List the animations of an XMD file
    List(ListArgs),
    /// Map every XMD file below a directory to the animations it declares
    Manifest(ManifestArgs),
}

impl XmdCommands {
    pub fn handle(&self) -> Result<()> {
        match self {
            XmdCommands::List(list) => list.handle(),
            XmdCommands::Manifest(manifest) => manifest.handle(),
        }
    }
}

/// Decode an animation file, logging progress between batches
pub fn decode(bytes: &[u8], batch_size: usize) -> Result<Xmd> {
    let options = DecoderOptions::builder().batch_size(batch_size).build();
    let mut decoder = XmdDecoder::with_options(bytes, options)?;
    while let Progress::Pending {
        animations,
        total,
        keyframes,
    } = decoder.step()?
    {
        debug!("decoded {animations}/{total} animations, {keyframes} keyframes");
    }
    Ok(decoder.finish())
}

#[derive(Args)]
pub struct ListArgs {
    /// An input XMD file
    #[arg(short, long, value_name = "FILE")]
    file: PathBuf,

    /// Number of keyframes decoded per batch
    #[arg(long, default_value_t = 25)]
    batch_size: usize,
}

impl ListArgs {
    pub fn handle(&self) -> Result<()> {
        let xmd = decode(&read_input(&self.file)?, self.batch_size)?;

        println!("{} bones, {} animations", xmd.bone_count, xmd.animations.len());
        for animation in &xmd.animations {
            println!(
                "{:<32} {:<32} {:>8.3}s {:>6} keyframes",
                animation.name,
                animation.alt_name,
                animation.duration,
                animation.keyframes.len()
            );
        }
        Ok(())
    }
}

#[derive(Args)]
pub struct ManifestArgs {
    /// A directory searched for XMD files
    #[arg(short, long, value_name = "DIR")]
    directory: PathBuf,

    /// Where to write the JSON manifest, standard output when omitted
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Number of keyframes decoded per batch
    #[arg(long, default_value_t = 99999)]
    batch_size: usize,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl ManifestArgs {
    pub fn handle(&self) -> Result<()> {
        let (manifest, failed) = build_manifest(&self.directory, self.batch_size);
        for name in &failed {
            warn!("skipped {name}");
        }

        let json = manifest.to_json()?;
        match &self.output {
            Some(path) => {
                create_output(path, self.overwrite)?
                    .write_all(json.as_bytes())
                    .into_diagnostic()?;
                info!("wrote {} entries to {}", manifest.len(), path.display());
            }
            None => println!("{json}"),
        }
        Ok(())
    }
}

/// Collect the animation names of every XMD file below `directory`.
///
/// Files are keyed by their name without the directory. Files that fail to decode are logged and
/// returned separately.
pub fn build_manifest(
    directory: &std::path::Path,
    batch_size: usize,
) -> (AnimationManifest, Vec<String>) {
    let mut manifest = AnimationManifest::default();
    let mut failed = Vec::new();

    let files = WalkDir::new(directory)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file() && has_extension(e.path(), "xmd"));

    for file in files {
        let name = file.file_name().to_string_lossy().into_owned();
        match read_input(file.path()).and_then(|bytes| decode(&bytes, batch_size)) {
            Ok(xmd) => manifest.insert(name, &xmd),
            Err(err) => {
                warn!("{name}: {err:?}");
                failed.push(name);
            }
        }
    }
    (manifest, failed)
}

#[cfg(test)]
mod test {
    use closers_xmd::{Animation, Xmd};
    use miette::IntoDiagnostic;
    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::build_manifest;

    #[test]
    #[traced_test]
    fn manifest_skips_broken_files() -> miette::Result<()> {
        let directory = std::env::temp_dir().join(format!("closers-xmd-{}", std::process::id()));
        std::fs::create_dir_all(directory.join("ANI")).into_diagnostic()?;

        let xmd = Xmd {
            bone_count: 0,
            reserved: 0,
            animations: ["ATTACK_01", "STAND"]
                .into_iter()
                .map(|name| Animation {
                    name: name.into(),
                    ..Default::default()
                })
                .collect(),
        };
        std::fs::write(directory.join("ANI/SEHA.XMD"), xmd.to_bytes()?).into_diagnostic()?;
        std::fs::write(directory.join("ANI/BROKEN.XMD"), b"garbage").into_diagnostic()?;

        let (manifest, failed) = build_manifest(&directory, 25);
        assert_eq!(failed, vec!["BROKEN.XMD"]);
        assert_eq!(
            manifest.get("SEHA.XMD"),
            Some(&vec!["ATTACK_01".to_string(), "STAND".to_string()])
        );

        let _ = std::fs::remove_dir_all(&directory);
        Ok(())
    }
}
