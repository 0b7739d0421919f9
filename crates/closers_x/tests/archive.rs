use std::io::{Cursor, Write};

use closers_cmf::{write::CmfWriterOptions, CmfArchive, CmfWriter, CompressionMethod};
use closers_x::{decode, Kind};
use pretty_assertions::assert_eq;
use tracing_test::traced_test;

const MODEL: &str = "xof 0303txt 0032
Frame Root {
 FrameTransformMatrix {
  1.0,0.0,0.0,0.0,0.0,1.0,0.0,0.0,0.0,0.0,1.0,0.0,0.0,0.0,0.0,1.0;;
 }
 {Body}
}
";

fn model_entry() -> Vec<u8> {
    let mut bytes = MODEL.as_bytes().to_vec();
    bytes.resize(600, b' ');
    bytes
}

fn build_archive() -> Vec<u8> {
    let mut writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
    writer.start_file("A.X", CompressionMethod::None).unwrap();
    writer.write_all(&model_entry()).unwrap();
    writer.finish().unwrap().into_inner()
}

#[traced_test]
#[test]
fn model_from_archive() -> miette::Result<()> {
    let data = build_archive();

    let table = closers_cmf::decrypt_entry_table(&data, 0)?;
    assert_eq!(table.entries.len(), 1);

    let entry = &table.entries[0];
    assert_eq!(entry.name, "A.X");
    assert_eq!(entry.size, 600);
    assert_eq!(entry.offset as usize, 0x64 + 4 + 528);
    assert_eq!(entry.offset as usize, table.next_pos);

    let bytes = &data[entry.offset as usize..entry.end() as usize];
    assert_eq!(bytes, &model_entry()[..]);

    let file = decode(bytes)?;
    assert!(!file.objects.is_empty());
    assert_eq!(file.objects[0].kind, Kind::Frame);
    assert_eq!(file.objects[0].references().collect::<Vec<_>>(), vec!["Body"]);

    let mut archive = CmfArchive::new(Cursor::new(&data))?;
    assert_eq!(decode(&archive.read_file("A.X")?)?, file);
    Ok(())
}
