//! Packing archive entries into size bounded blobs.
//!
//! Entries are appended to `DATA{n}.PAK` in the order they are added. A pack is closed as soon
//! as it reaches the size limit, so a pack holds at least one entry and may exceed the limit by
//! the size of its last entry. Entries keep their stored form; the manifest records whether
//! they still need inflating.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

/// Default size at which a pack is closed
pub const PACK_LIMIT: usize = 25_000_000;

/// One entry inside a pack
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackedFile {
    /// Entry name inside its archive
    pub name: String,
    /// Byte offset inside the pack
    pub offset: usize,
    /// Stored size in bytes
    pub size: usize,
    /// Whether the bytes are zlib compressed
    pub compressed: bool,
}

/// The entries of one pack in pack order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Pack {
    /// Entries in the order they were appended
    pub files: Vec<PackedFile>,
}

/// Pack holding a file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileLocation {
    /// Name of the pack, `DATA{n}.PAK`
    pub archive: String,
}

/// Index of every pack and of the pack holding each file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackManifest {
    /// Packs keyed by name
    pub packs: BTreeMap<String, Pack>,
    /// Pack of each file keyed by entry name
    pub files: BTreeMap<String, FileLocation>,
}

/// Builds packs, handing each finished one to a sink along with its name
pub struct Packer<F> {
    limit: usize,
    index: usize,
    data: Vec<u8>,
    manifest: PackManifest,
    sink: F,
}

impl<F, E> Packer<F>
where
    F: FnMut(&str, &[u8]) -> Result<(), E>,
{
    pub fn new(limit: usize, sink: F) -> Self {
        Packer {
            limit,
            index: 0,
            data: Vec::new(),
            manifest: PackManifest::default(),
            sink,
        }
    }

    fn pack_name(&self) -> String {
        format!("DATA{}.PAK", self.index)
    }

    /// Append an entry to the current pack
    pub fn add(&mut self, name: &str, bytes: &[u8], compressed: bool) -> Result<(), E> {
        let pack_name = self.pack_name();
        if self.manifest.files.contains_key(name) {
            debug!(name, "file packed again, pointing at the newest copy");
        }

        self.manifest
            .packs
            .entry(pack_name.clone())
            .or_default()
            .files
            .push(PackedFile {
                name: name.to_owned(),
                offset: self.data.len(),
                size: bytes.len(),
                compressed,
            });
        self.manifest.files.insert(
            name.to_owned(),
            FileLocation {
                archive: pack_name,
            },
        );
        self.data.extend_from_slice(bytes);

        if self.data.len() >= self.limit {
            self.flush()?;
        }
        Ok(())
    }

    fn flush(&mut self) -> Result<(), E> {
        if self.data.is_empty() {
            return Ok(());
        }

        let name = self.pack_name();
        info!(pack = %name, size = self.data.len(), "pack finished");
        (self.sink)(&name, &self.data)?;

        self.index += 1;
        self.data.clear();
        Ok(())
    }

    /// Write out the last pack and return the manifest
    pub fn finish(mut self) -> Result<PackManifest, E> {
        self.flush()?;
        Ok(self.manifest)
    }
}

#[cfg(test)]
mod test {
    use std::convert::Infallible;

    use pretty_assertions::assert_eq;
    use tracing_test::traced_test;

    use super::*;

    #[test]
    #[traced_test]
    fn splits_at_limit() -> Result<(), Infallible> {
        let mut written = Vec::new();
        let mut packer = Packer::new(10, |name: &str, data: &[u8]| {
            written.push((name.to_owned(), data.len()));
            Ok::<_, Infallible>(())
        });

        packer.add("A.X", &[1; 4], false)?;
        packer.add("B.DDS", &[2; 8], true)?;
        packer.add("C.XMD", &[3; 3], false)?;
        packer.add("D.XMD", &[4; 10], true)?;
        packer.add("E.X", &[5; 1], false)?;
        let manifest = packer.finish()?;

        assert_eq!(
            written,
            vec![
                ("DATA0.PAK".to_owned(), 12),
                ("DATA1.PAK".to_owned(), 13),
                ("DATA2.PAK".to_owned(), 1)
            ]
        );
        assert_eq!(
            manifest.packs["DATA1.PAK"].files,
            vec![
                PackedFile {
                    name: "C.XMD".into(),
                    offset: 0,
                    size: 3,
                    compressed: false
                },
                PackedFile {
                    name: "D.XMD".into(),
                    offset: 3,
                    size: 10,
                    compressed: true
                },
            ]
        );
        assert_eq!(manifest.files["E.X"].archive, "DATA2.PAK");
        Ok(())
    }

    #[test]
    fn manifest_json_layout() -> Result<(), Box<dyn std::error::Error>> {
        let mut packer = Packer::new(PACK_LIMIT, |_: &str, _: &[u8]| Ok::<_, Infallible>(()));
        packer.add("A.X", b"abc", true)?;
        let manifest = packer.finish()?;

        assert_eq!(
            serde_json::to_string(&manifest)?,
            r#"{"packs":{"DATA0.PAK":{"files":[{"name":"A.X","offset":0,"size":3,"compressed":true}]}},"files":{"A.X":{"archive":"DATA0.PAK"}}}"#
        );
        Ok(())
    }

    #[test]
    fn sink_failure_is_returned() {
        let mut packer = Packer::new(4, |name: &str, _: &[u8]| {
            Err::<(), _>(format!("cannot write {name}"))
        });
        packer.add("A.X", &[0; 2], false).unwrap();
        assert_eq!(
            packer.add("B.X", &[0; 2], false),
            Err("cannot write DATA0.PAK".to_owned())
        );
    }

    #[test]
    fn empty_packer_writes_nothing() -> Result<(), Infallible> {
        let mut calls = 0;
        let manifest = Packer::new(PACK_LIMIT, |_: &str, _: &[u8]| {
            calls += 1;
            Ok::<_, Infallible>(())
        })
        .finish()?;
        assert_eq!(calls, 0);
        assert_eq!(manifest, PackManifest::default());
        Ok(())
    }
}
