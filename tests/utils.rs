//! Shared fixture-building helpers for the integration tests in this
//! directory. Each test binary that needs them declares `mod utils;`.

use flate2::write::ZlibEncoder;
use flate2::Compression;
use std::io::Write;

#[allow(dead_code)]
pub fn zlib(bytes: &[u8]) -> Vec<u8> {
    let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
    enc.write_all(bytes).unwrap();
    enc.finish().unwrap()
}

/// Big-endian encode `value` into exactly `width` bytes, as a classic xref
/// stream row field requires.
#[allow(dead_code)]
pub fn be_bytes(value: u64, width: usize) -> Vec<u8> {
    let full = value.to_be_bytes();
    full[full.len() - width..].to_vec()
}
