//! Cross-reference stream parser (C5): decode a `/Type /XRef` object's
//! packed binary table into an [`Xref`].

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::inflate::{inflate, unpack_be};
use crate::predictor::{self, Predictor};
use crate::xref::{Xref, XrefEntry};

lazy_static! {
    static ref RE_FILTER: Regex = Regex::new(r"/Filter\s*/(\w+)").unwrap();
    static ref RE_SIZE: Regex = Regex::new(r"/Size\s+(\d+)").unwrap();
    static ref RE_W: Regex = Regex::new(r"/W\s*\[\s*(\d+)\s+(\d+)\s+(\d+)\s*\]").unwrap();
    static ref RE_INDEX: Regex = Regex::new(r"/Index\s*\[\s*([0-9\s]+)\]").unwrap();
    static ref RE_DECODE_PARMS: Regex = Regex::new(r"/(?:DecodeParms|DP)\s*<<([^>]*)>>").unwrap();
    static ref RE_PREDICTOR: Regex = Regex::new(r"/Predictor\s+(\d+)").unwrap();
    static ref RE_COLUMNS: Regex = Regex::new(r"/Columns\s+(\d+)").unwrap();
}

/// Decode an xref-stream dictionary plus its (already-extracted, still
/// zlib-encoded) body into an [`Xref`].
///
/// `dict_text` is the dictionary's inside text (no `<<`/`>>`); `raw_stream`
/// is the encoded bytes between `stream` and `endstream`. Only
/// `/Filter /FlateDecode` is supported; anything else is
/// [`Error::UnsupportedFilter`].
pub fn parse(dict_text: &[u8], raw_stream: &[u8]) -> Result<Xref> {
    let filter = RE_FILTER
        .captures(dict_text)
        .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
        .ok_or_else(|| Error::MalformedDocument("xref stream missing /Filter".into()))?;
    if filter != "FlateDecode" {
        return Err(Error::UnsupportedFilter(filter));
    }

    let size = int_field(&RE_SIZE, dict_text, "/Size")? as u32;

    let (w1, w2, w3) = {
        let caps = RE_W
            .captures(dict_text)
            .ok_or_else(|| Error::MalformedDocument("xref stream missing /W".into()))?;
        (
            parse_usize(&caps[1])?,
            parse_usize(&caps[2])?,
            parse_usize(&caps[3])?,
        )
    };

    let index_ranges = match RE_INDEX.captures(dict_text) {
        Some(caps) => parse_index_pairs(&caps[1])?,
        None => vec![(0, size)],
    };

    let columns = decode_parms_columns(dict_text)?;
    let predictor = decode_parms_predictor(dict_text)?;

    let inflated = inflate(raw_stream)?;
    let unfiltered = predictor::apply(predictor, &inflated, columns);

    let row_width = w1 + w2 + w3;
    if row_width == 0 {
        return Err(Error::MalformedDocument("xref stream /W sums to zero".into()));
    }

    let mut xref = Xref::new();
    let mut row_start = 0usize;
    for (first_obj, count) in index_ranges {
        for i in 0..count {
            if row_start + row_width > unfiltered.len() {
                return Err(Error::MalformedDocument("xref stream body shorter than /Index promises".into()));
            }
            let row = &unfiltered[row_start..row_start + row_width];
            row_start += row_width;

            let field_type = if w1 == 0 { 1 } else { unpack_be(&row[..w1]) };
            let field2 = unpack_be(&row[w1..w1 + w2]);
            let field3 = if w3 == 0 { 0 } else { unpack_be(&row[w1 + w2..]) };

            let entry = match field_type {
                0 => XrefEntry::Free,
                1 => XrefEntry::Normal { offset: field2, generation: field3 as u16 },
                2 => XrefEntry::Compressed { container: field2 as u32, index: field3 as u16 },
                other => {
                    return Err(Error::MalformedDocument(format!("xref stream entry has unknown type {other}")))
                }
            };
            xref.insert(first_obj + i, entry);
        }
    }

    Ok(xref)
}

fn int_field(re: &Regex, dict_text: &[u8], name: &str) -> Result<u64> {
    re.captures(dict_text)
        .and_then(|c| std::str::from_utf8(&c[1]).ok().and_then(|s| s.parse().ok()))
        .ok_or_else(|| Error::MalformedDocument(format!("xref stream missing {name}")))
}

fn parse_usize(text: &[u8]) -> Result<usize> {
    std::str::from_utf8(text)
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric /W entry".into()))
}

fn parse_index_pairs(text: &[u8]) -> Result<Vec<(u32, u32)>> {
    let text = std::str::from_utf8(text).map_err(|_| Error::MalformedDocument("non-UTF8 /Index".into()))?;
    let nums: Vec<u32> = text
        .split_whitespace()
        .map(|s| s.parse().map_err(|_| Error::MalformedDocument("non-numeric /Index entry".into())))
        .collect::<Result<_>>()?;
    if nums.len() % 2 != 0 || nums.is_empty() {
        return Err(Error::MalformedDocument("/Index must be pairs of integers".into()));
    }
    Ok(nums.chunks(2).map(|pair| (pair[0], pair[1])).collect())
}

fn decode_parms_columns(dict_text: &[u8]) -> Result<usize> {
    match RE_DECODE_PARMS.captures(dict_text) {
        Some(parms) => match RE_COLUMNS.captures(&parms[1]) {
            Some(caps) => parse_usize(&caps[1]),
            None => Ok(1),
        },
        None => Ok(1),
    }
}

fn decode_parms_predictor(dict_text: &[u8]) -> Result<Predictor> {
    match RE_DECODE_PARMS.captures(dict_text) {
        Some(parms) => match RE_PREDICTOR.captures(&parms[1]) {
            Some(caps) => {
                let code: i64 = std::str::from_utf8(&caps[1])
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::MalformedDocument("non-numeric /Predictor".into()))?;
                Predictor::from_code(code)
            }
            None => Ok(Predictor::None),
        },
        None => Ok(Predictor::None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::write::ZlibEncoder;
    use flate2::Compression;
    use std::io::Write;

    fn zlib(bytes: &[u8]) -> Vec<u8> {
        let mut enc = ZlibEncoder::new(Vec::new(), Compression::default());
        enc.write_all(bytes).unwrap();
        enc.finish().unwrap()
    }

    #[test]
    fn decodes_simple_table_without_predictor() {
        // W = [1 2 1]: type byte, 2-byte offset/container, 1-byte gen/index.
        let rows: &[u8] = &[
            0, 0, 0, 0, // free, next free 0, gen 0
            1, 0, 9, 0, // normal, offset 9, gen 0
            1, 0, 74, 0, // normal, offset 74, gen 0
        ];
        let body = zlib(rows);
        let dict = b"/Type/XRef/Size 3/W[1 2 1]/Filter/FlateDecode";
        let xref = parse(dict, &body).unwrap();
        assert_eq!(xref.get(0), Some(&XrefEntry::Free));
        assert_eq!(xref.get(1), Some(&XrefEntry::Normal { offset: 9, generation: 0 }));
        assert_eq!(xref.get(2), Some(&XrefEntry::Normal { offset: 74, generation: 0 }));
    }

    #[test]
    fn respects_discontinuous_index_ranges() {
        let rows: &[u8] = &[
            1, 0, 20, 0, // object 5
            2, 3, 0, // object 9, compressed in container 3 index 0
        ];
        let body = zlib(rows);
        let dict = b"/Type/XRef/Size 10/W[1 2 1]/Index[5 1 9 1]/Filter/FlateDecode";
        let xref = parse(dict, &body).unwrap();
        assert_eq!(xref.get(5), Some(&XrefEntry::Normal { offset: 20, generation: 0 }));
        assert_eq!(xref.get(9), Some(&XrefEntry::Compressed { container: 3, index: 0 }));
        assert_eq!(xref.get(0), None);
    }

    #[test]
    fn applies_png_up_predictor() {
        // One column of width 3 (W=[1 1 1]), two rows, predictor 12 columns 3.
        let row0 = [1u8, 0, 5];
        let row1 = [0u8, 0, 1]; // deltas: type stays 0, offset stays 0, gen +1
        let mut plain = Vec::new();
        plain.extend_from_slice(&row0);
        plain.extend_from_slice(&row1);
        let body = zlib(&plain);
        let dict = b"/Type/XRef/Size 2/W[1 1 1]/Filter/FlateDecode/DecodeParms<</Predictor 12/Columns 3>>";
        let xref = parse(dict, &body).unwrap();
        assert_eq!(xref.get(0), Some(&XrefEntry::Normal { offset: 0, generation: 5 }));
        assert_eq!(xref.get(1), Some(&XrefEntry::Normal { offset: 0, generation: 6 }));
    }

    #[test]
    fn rejects_non_flate_filter() {
        let dict = b"/Type/XRef/Size 1/W[1 1 1]/Filter/LZWDecode";
        assert!(matches!(parse(dict, &[]), Err(Error::UnsupportedFilter(f)) if f == "LZWDecode"));
    }

    #[test]
    fn key_order_of_decode_parms_does_not_matter() {
        let rows: &[u8] = &[1, 0, 1];
        let body = zlib(rows);
        let dict_a = b"/Filter/FlateDecode/DecodeParms<</Columns 3/Predictor 12>>/W[1 1 1]/Size 1/Type/XRef";
        let xref = parse(dict_a, &body).unwrap();
        assert_eq!(xref.get(0), Some(&XrefEntry::Normal { offset: 0, generation: 1 }));
    }
}
