//! Byte/stream primitives (C1): DEFLATE inflate and big-endian integer decode.
//!
//! The PNG predictor lives in [`crate::predictor`]; this module only covers
//! the zlib layer and the packed-integer decode used by the xref-stream
//! parser.

use std::io::Read;

use flate2::read::ZlibDecoder;

use crate::error::{Error, Result};

/// Chunk size used to grow the output buffer while draining the decoder.
const CHUNK: usize = 16 * 1024;

/// Inflate an RFC 1950 (zlib) payload.
///
/// The caller supplies the already-delimited DEFLATE payload (the bytes
/// between `stream\n` and `\nendstream`, with no surrounding dictionary).
/// Output size is not known ahead of time, so the buffer grows in 16 KiB
/// chunks until the decoder reports end-of-stream.
pub fn inflate(bytes: &[u8]) -> Result<Vec<u8>> {
    let mut decoder = ZlibDecoder::new(bytes);
    let mut output = Vec::with_capacity(bytes.len() * 2);
    let mut chunk = [0_u8; CHUNK];

    loop {
        let n = decoder.read(&mut chunk).map_err(|_| Error::CorruptStream)?;
        if n == 0 {
            break;
        }
        output.extend_from_slice(&chunk[..n]);
    }

    Ok(output)
}

/// Decode a big-endian unsigned integer of the given byte width.
///
/// Width 0 returns 0; callers substitute the field's type-1 default
/// themselves (see the xref-stream entry decoder), since the "default"
/// differs per field.
pub fn unpack_be(bytes: &[u8]) -> u64 {
    bytes.iter().fold(0_u64, |acc, &b| (acc << 8) | u64::from(b))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(data: &[u8]) -> Vec<u8> {
        let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    #[test]
    fn round_trips_small_payload() {
        let data = b"the quick brown fox jumps over the lazy dog";
        let compressed = zlib(data);
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn round_trips_payload_larger_than_one_chunk() {
        let data: Vec<u8> = (0..CHUNK * 3 + 17).map(|i| (i % 251) as u8).collect();
        let compressed = zlib(&data);
        assert_eq!(inflate(&compressed).unwrap(), data);
    }

    #[test]
    fn rejects_garbage_as_corrupt_stream() {
        let garbage = b"this is definitely not a zlib stream";
        assert!(matches!(inflate(garbage), Err(Error::CorruptStream)));
    }

    #[test]
    fn unpack_be_widths() {
        assert_eq!(unpack_be(&[]), 0);
        assert_eq!(unpack_be(&[0x01]), 1);
        assert_eq!(unpack_be(&[0x01, 0x00]), 256);
        assert_eq!(unpack_be(&[0x00, 0x01, 0x02]), 0x0102);
    }
}
