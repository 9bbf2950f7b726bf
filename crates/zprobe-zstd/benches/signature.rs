use std::io::Cursor;

use zprobe_zstd::{compress_stream_with_level, matches, sniff};

fn make_data(size: usize) -> Vec<u8> {
    // Semi-realistic data: repeating pattern with some entropy
    (0..size)
        .map(|i| (i.wrapping_mul(7) ^ (i >> 3)) as u8)
        .collect()
}

#[divan::bench]
fn match_frame_magic() -> bool {
    matches(divan::black_box(&[0x28, 0xB5, 0x2F, 0xFD, 0x00, 0x00]), 6)
}

#[divan::bench]
fn match_skippable_magic() -> bool {
    matches(divan::black_box(&[0x5A, 0x2A, 0x4D, 0x18]), 4)
}

#[divan::bench]
fn reject_foreign_magic() -> bool {
    matches(divan::black_box(&[0x1F, 0x8B, 0x08, 0x00]), 4)
}

#[divan::bench]
fn sniff_cursor(bencher: divan::Bencher) {
    let data = make_data(4096);
    bencher.bench(|| sniff(Cursor::new(divan::black_box(&data))).unwrap());
}

#[divan::bench(args = [1024, 65536, 1048576])]
fn compress(bencher: divan::Bencher, size: usize) {
    let data = make_data(size);
    bencher
        .counter(divan::counter::BytesCount::new(size))
        .bench(|| {
            let mut out = Vec::with_capacity(size);
            compress_stream_with_level(divan::black_box(data.as_slice()), &mut out, 3).unwrap()
        });
}

fn main() {
    divan::main();
}
