use std::path::{Component, Path, PathBuf};

pub mod create;
pub mod extract;
pub mod find;
pub mod headers;
pub mod list;

#[derive(clap::Subcommand)]
pub enum CmfCommands {
    /// List the entries of a CMF archive
    List(list::ListArgs),
    /// Extract a CMF archive into a directory
    Extract(extract::ExtractArgs),
    /// Decode a HEADER.CMF file
    Headers(headers::HeadersArgs),
    /// Locate a file through HEADER.CMF and extract it
    Find(find::FindArgs),
    /// Pack a directory into a CMF archive
    Create(create::CreateArgs),
}

impl CmfCommands {
    pub fn handle(&self) -> miette::Result<()> {
        match self {
            CmfCommands::List(list) => list.handle(),
            CmfCommands::Extract(extract) => extract.handle(),
            CmfCommands::Headers(headers) => headers.handle(),
            CmfCommands::Find(find) => find.handle(),
            CmfCommands::Create(create) => create.handle(),
        }
    }
}

/// Path below `directory` for an archive entry name.
///
/// Entry names use `\` as separator. Names that would leave `directory` give `None`.
pub fn entry_path(directory: &Path, name: &str) -> Option<PathBuf> {
    let relative = PathBuf::from(name.replace('\\', "/"));
    if relative
        .components()
        .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
    {
        Some(directory.join(relative))
    } else {
        None
    }
}

#[cfg(test)]
mod test {
    use std::path::Path;

    use pretty_assertions::assert_eq;

    use super::entry_path;

    #[test]
    fn entry_paths_stay_inside() {
        let out = Path::new("out");
        assert_eq!(
            entry_path(out, "MODEL\\CHAR\\SEHA.X"),
            Some(out.join("MODEL/CHAR/SEHA.X"))
        );
        assert_eq!(entry_path(out, "..\\runtime\\boot.ini"), None);
        assert_eq!(entry_path(out, "/etc/passwd"), None);
    }
}
