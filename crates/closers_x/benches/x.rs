use divan::AllocProfiler;

#[global_allocator]
static ALLOC: AllocProfiler = AllocProfiler::system();

fn main() {
    divan::main();
}

const CUBE: &str = include_str!("../tests/resources/cube.x");

/// The cube file with its frame repeated `frames` times
fn get_input(frames: usize) -> Vec<u8> {
    let start = CUBE.find("Frame Scene_Root").unwrap();
    let end = CUBE.find("AnimationSet").unwrap();

    let mut text = CUBE[..start].to_owned();
    for _ in 0..frames {
        text.push_str(&CUBE[start..end]);
    }
    text.push_str(&CUBE[end..]);
    text.into_bytes()
}

/// Compress a text file into `tzip` chunks of at most 32 KiB
fn compress(bytes: &[u8]) -> Vec<u8> {
    use flate2::{Compress, Compression, FlushCompress};

    let mut out = b"xof 0303tzip0032".to_vec();
    out.extend_from_slice(&((bytes.len() - 16) as u32).to_le_bytes());

    let mut previous: &[u8] = &[];
    for chunk in bytes[16..].chunks(0x8000) {
        let mut compressor = Compress::new(Compression::default(), false);
        if !previous.is_empty() {
            compressor.set_dictionary(previous).unwrap();
        }
        let mut payload = Vec::with_capacity(chunk.len() + 1024);
        compressor
            .compress_vec(chunk, &mut payload, FlushCompress::Finish)
            .unwrap();

        out.extend_from_slice(&(chunk.len() as u16).to_le_bytes());
        out.extend_from_slice(&(payload.len() as u16 + 2).to_le_bytes());
        out.extend_from_slice(b"CK");
        out.extend_from_slice(&payload);
        previous = chunk;
    }
    out
}

pub mod text {
    use divan::Bencher;

    #[divan::bench(args = [1, 10, 100])]
    fn parse(bencher: Bencher, frames: usize) {
        bencher
            .with_inputs(|| super::get_input(frames))
            .bench_refs(|data| {
                divan::black_box(closers_x::decode(data).unwrap());
            });
    }

    #[divan::bench(args = [1, 10, 100])]
    fn serialize(bencher: Bencher, frames: usize) {
        let file = closers_x::decode(&super::get_input(frames)).unwrap();
        bencher.bench_local(|| divan::black_box(file.to_string()));
    }
}

pub mod mszip {
    use divan::Bencher;

    #[divan::bench(args = [10, 100])]
    fn decompress(bencher: Bencher, frames: usize) {
        bencher
            .with_inputs(|| super::compress(&super::get_input(frames)))
            .bench_refs(|data| {
                divan::black_box(closers_x::mszip::decompress(data).unwrap());
            });
    }
}
