use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

fn get_input(files: usize) -> Vec<u8> {
    use closers_cmf::{write::CmfWriterOptions, CmfWriter, CompressionMethod};
    use std::io::{Cursor, Write};

    let mut writer = CmfWriter::new(Cursor::new(Vec::new()), CmfWriterOptions::default());
    for i in 0..files {
        writer
            .start_file(format!("TEXTURE\\FILE_{i:05}.DDS"), CompressionMethod::Zlib)
            .unwrap();
        writer.write_all(&[i as u8; 512]).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

pub mod table {
    use divan::Bencher;

    #[divan::bench(args = [10, 1000, 10000])]
    fn decrypt(bencher: Bencher, files: usize) {
        bencher
            .with_inputs(|| super::get_input(files))
            .bench_refs(|data| {
                divan::black_box(closers_cmf::decrypt_entry_table(data, 0).unwrap());
            });
    }
}

pub mod read {
    use closers_cmf::CmfArchive;
    use divan::Bencher;
    use std::io::{prelude::*, Cursor};

    #[divan::bench]
    fn open(bencher: Bencher) {
        bencher
            .with_inputs(|| super::get_input(1000))
            .bench_refs(|data| {
                divan::black_box(CmfArchive::new(Cursor::new(data)).unwrap());
            });
    }

    #[divan::bench(sample_count = 1)]
    fn read_file_all(bencher: Bencher) {
        let mut cmf = CmfArchive::new(Cursor::new(super::get_input(1000))).unwrap();

        bencher.bench_local(move || {
            let mut buffer = Vec::new();
            for i in 0..cmf.len() {
                let mut file = cmf.by_index(i).unwrap();
                file.read_to_end(&mut buffer).unwrap();
                buffer.clear();
            }
        });
    }
}
