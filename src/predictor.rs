//! Byte/stream primitives (C1): PNG-family row predictor reversal.
//!
//! Only predictor 1 ("None") and 2 ("Up", PDF code 10/12 respectively) are
//! required by the reference corpus. Sub/Average/Paeth/Optimum are
//! recognised but deliberately rejected rather than silently mis-decoded,
//! per the spec's explicit contract.

use crate::error::{Error, Result};

/// A `/Predictor` value as it appears in a `/DecodeParms` dictionary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Predictor {
    /// No predictor was applied (`/Predictor` absent or `1`).
    None,
    /// PNG "None" per-row tag (`/Predictor 10`).
    PngNone,
    /// PNG "Up" per-row tag (`/Predictor 12`).
    PngUp,
}

impl Predictor {
    /// Map a raw `/Predictor` integer to a [`Predictor`], rejecting anything
    /// this crate does not implement.
    pub fn from_code(code: i64) -> Result<Predictor> {
        match code {
            1 => Ok(Predictor::None),
            10 => Ok(Predictor::PngNone),
            12 => Ok(Predictor::PngUp),
            // 11 (Sub), 13 (Average), 14 (Paeth), 15 (Optimum) and anything
            // else: not implemented, must not be silently mis-decoded.
            other @ 0..=255 => Err(Error::UnsupportedPredictor(other as u8)),
            other => Err(Error::UnsupportedPredictor((other & 0xff) as u8)),
        }
    }
}

/// Reverse the PNG "Up" row predictor.
///
/// `bytes` is a flat stream of rows, each `columns` bytes wide, with no
/// per-row filter-tag byte (the PDF `/DecodeParms` convention already
/// strips it — every row in the stream uses the same predictor).
/// `output[i] = (input[i] + output[i - columns]) mod 256` for every row
/// after the first; the first row is passed through unchanged.
pub fn png_up_unfilter(bytes: &[u8], columns: usize) -> Vec<u8> {
    if columns == 0 {
        return bytes.to_vec();
    }

    let mut output = Vec::with_capacity(bytes.len());
    for (row_index, row) in bytes.chunks(columns).enumerate() {
        if row_index == 0 {
            output.extend_from_slice(row);
            continue;
        }
        let prior_start = output.len() - columns;
        for (i, &b) in row.iter().enumerate() {
            let prior = output[prior_start + i];
            output.push(b.wrapping_add(prior));
        }
    }
    output
}

/// The PNG "Up" row filter, the inverse of [`png_up_unfilter`]. Used only by
/// tests to check the round trip; the crate never re-encodes a document.
#[cfg(test)]
fn png_up_filter(bytes: &[u8], columns: usize) -> Vec<u8> {
    if columns == 0 {
        return bytes.to_vec();
    }

    let mut output = Vec::with_capacity(bytes.len());
    for (row_index, row) in bytes.chunks(columns).enumerate() {
        if row_index == 0 {
            output.extend_from_slice(row);
            continue;
        }
        let prior_start = output.len() - columns;
        for (i, &b) in row.iter().enumerate() {
            let prior = output[prior_start + i];
            output.push(b.wrapping_sub(prior));
        }
    }
    output
}

/// Apply the predictor named by `p` to an inflated xref-stream body.
/// `PngNone` and `None` are no-ops; `PngUp` reverses the Up filter.
pub fn apply(p: Predictor, bytes: &[u8], columns: usize) -> Vec<u8> {
    match p {
        Predictor::None | Predictor::PngNone => bytes.to_vec(),
        Predictor::PngUp => png_up_unfilter(bytes, columns),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::Rng;

    #[test]
    fn up_unfilter_inverts_up_filter_on_random_matrices() {
        let mut rng = rand::rng();
        for columns in 1..64 {
            for rows in 1..64 {
                let original: Vec<u8> = (0..columns * rows).map(|_| rng.random()).collect();
                let filtered = png_up_filter(&original, columns);
                let unfiltered = png_up_unfilter(&filtered, columns);
                assert_eq!(unfiltered, original, "columns={columns} rows={rows}");
            }
        }
    }

    #[test]
    fn first_row_passes_through_unchanged() {
        let row = vec![1, 2, 3, 4];
        assert_eq!(png_up_unfilter(&row, 4), row);
    }

    #[test]
    fn from_code_accepts_only_none_and_up() {
        assert_eq!(Predictor::from_code(1).unwrap(), Predictor::None);
        assert_eq!(Predictor::from_code(10).unwrap(), Predictor::PngNone);
        assert_eq!(Predictor::from_code(12).unwrap(), Predictor::PngUp);
    }

    #[test]
    fn from_code_rejects_sub_average_paeth_optimum() {
        for code in [11, 13, 14, 15] {
            assert!(matches!(Predictor::from_code(code), Err(Error::UnsupportedPredictor(c)) if c as i64 == code));
        }
    }
}
