//! Shared test utilities for `benchdata-core`.

use std::io::Write;

use flate2::{
    Compression,
    write::{DeflateEncoder, GzEncoder},
};

/// Zip compression method for an entry stored as-is.
pub(crate) const ZIP_STORED: u16 = 0;
/// Zip compression method for a deflated entry.
pub(crate) const ZIP_DEFLATED: u16 = 8;

pub(crate) fn gzip(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(bytes).expect("write gzip payload");
    encoder.finish().expect("finish gzip payload")
}

pub(crate) fn bzip2(bytes: &[u8]) -> Vec<u8> {
    let mut encoder = bzip2::write::BzEncoder::new(Vec::new(), bzip2::Compression::default());
    encoder.write_all(bytes).expect("write bzip2 payload");
    encoder.finish().expect("finish bzip2 payload")
}

fn le(value: u32, width: usize) -> Vec<u8> {
    (0..width)
        .map(|index| u8::try_from((value >> (8 * index)) & 0xff).expect("masked byte"))
        .collect()
}

/// Builds a single-entry zip archive holding `contents` under `name`.
///
/// Only the local file header is written; the decoder never reads the
/// central directory.
pub(crate) fn zip_entry(name: &str, contents: &[u8], method: u16) -> Vec<u8> {
    let body = if method == ZIP_DEFLATED {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(contents).expect("write deflate payload");
        encoder.finish().expect("finish deflate payload")
    } else {
        contents.to_vec()
    };
    let mut archive = le(0x0403_4b50, 4);
    archive.extend(le(20, 2));
    archive.extend(le(0, 2));
    archive.extend(le(u32::from(method), 2));
    archive.extend(le(0, 4));
    archive.extend(le(0, 4));
    archive.extend(le(u32::try_from(body.len()).expect("small body"), 4));
    archive.extend(le(u32::try_from(contents.len()).expect("small body"), 4));
    archive.extend(le(u32::try_from(name.len()).expect("short name"), 2));
    archive.extend(le(0, 2));
    archive.extend(name.as_bytes());
    archive.extend(body);
    archive
}
