use clap::Args;
use closers_cmf::CmfArchive;
use miette::{miette, Context, IntoDiagnostic, Result};
use std::{
    fs::File,
    io::Write,
    path::{Path, PathBuf},
};
use tracing::{info, warn};
use walkdir::WalkDir;

use crate::{
    commands::{create_output, has_extension},
    pack::{PackManifest, Packer, PACK_LIMIT},
};

#[derive(Args)]
pub struct PackArgs {
    /// A directory searched for CMF archives
    #[arg(short, long, value_name = "DIR")]
    dat: PathBuf,

    /// A target directory for the packs and `packs.json`
    #[arg(short, long, value_name = "DIR")]
    output: PathBuf,

    /// Only pack entries with one of these extensions
    #[arg(short, long, value_name = "EXT")]
    extension: Vec<String>,

    /// Size in bytes at which a pack is closed
    #[arg(long, default_value_t = PACK_LIMIT)]
    limit: usize,

    /// Allow overwriting the target
    #[arg(long, default_value_t = false)]
    overwrite: bool,
}

impl PackArgs {
    pub fn handle(&self) -> Result<()> {
        let archives = WalkDir::new(&self.dat)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_type().is_file() && has_extension(e.path(), "cmf"))
            .filter(|e| !e.file_name().eq_ignore_ascii_case("HEADER.CMF"))
            .map(|e| e.into_path())
            .collect::<Vec<_>>();

        if archives.is_empty() {
            return Err(miette!("no archives below {}", self.dat.display()));
        }

        let pack_dir = self.output.join("DAT");
        let mut packer = Packer::new(self.limit, |name: &str, data: &[u8]| {
            create_output(&pack_dir.join(name), self.overwrite)?
                .write_all(data)
                .into_diagnostic()
        });

        for archive in &archives {
            let mut cmf = match open_archive(archive) {
                Ok(cmf) => cmf,
                Err(err) => {
                    warn!("{}: {err:?}", archive.display());
                    continue;
                }
            };
            info!("packing {}", archive.display());
            self.pack_archive(&mut cmf, &mut packer)
                .wrap_err_with(|| format!("failed to write packs for {}", archive.display()))?;
        }

        let manifest: PackManifest = packer.finish()?;
        let json = serde_json::to_string(&manifest).into_diagnostic()?;
        create_output(&self.output.join("packs.json"), self.overwrite)?
            .write_all(json.as_bytes())
            .into_diagnostic()?;

        info!(
            packs = manifest.packs.len(),
            files = manifest.files.len(),
            "packing finished"
        );
        Ok(())
    }

    fn wanted(&self, name: &str) -> bool {
        self.extension.is_empty()
            || self
                .extension
                .iter()
                .any(|ext| has_extension(Path::new(&name.replace('\\', "/")), ext))
    }

    /// Add every wanted entry of `cmf`.
    ///
    /// Entries that cannot be read are skipped, only a failed pack write is returned.
    fn pack_archive<F>(&self, cmf: &mut CmfArchive<File>, packer: &mut Packer<F>) -> Result<()>
    where
        F: FnMut(&str, &[u8]) -> Result<()>,
    {
        let entries = cmf
            .entries()
            .map(|e| (e.name.clone(), e.stored_size(), e.is_compressed()))
            .collect::<Vec<_>>();
        for (index, (name, stored_size, compressed)) in entries.into_iter().enumerate() {
            if !self.wanted(&name) {
                continue;
            }
            if stored_size == 0 {
                warn!("{name} has size 0");
                continue;
            }

            match cmf.read_stored(index) {
                Ok(bytes) => packer.add(&name, &bytes, compressed)?,
                Err(err) => warn!("{name}: {err}"),
            }
        }
        Ok(())
    }
}

fn open_archive(path: &Path) -> Result<CmfArchive<File>> {
    let f = File::open(path)
        .into_diagnostic()
        .context(format!("path: {}", path.display()))?;
    Ok(CmfArchive::new(f)?)
}
