//! Lexical probes (C2): locate `startxref`, the trailer dictionary, and
//! indirect-object headers by pattern search over the document buffer.
//!
//! These are byte-oriented regular expressions rather than a grammar-driven
//! parser: the PDF surface syntax here is deliberately treated as text to
//! grep, per the design this crate is grounded on. See §9 of SPEC_FULL.md
//! for the `endstream`-inside-a-stream hazard this implies.

use lazy_static::lazy_static;
use regex::bytes::{Captures, Regex};

use crate::error::{Error, Result};

lazy_static! {
    static ref RE_STARTXREF: Regex = Regex::new(r"startxref\s*(\d+)").unwrap();
    static ref RE_TRAILER: Regex = Regex::new(r"trailer\s*<<").unwrap();
    static ref RE_XREF_STREAM_OBJ: Regex =
        Regex::new(r"(\d+)\s+(\d+)\s+obj\s*<<((?:(?!/Type).)*?/Type\s*/XRef.*?>>)\s*stream").unwrap();
    static ref RE_LINEARIZED: Regex = Regex::new(r"/Linearized").unwrap();
    static ref RE_ENCRYPT: Regex = Regex::new(r"/Encrypt\s+(\d+)\s+(\d+)\s+R").unwrap();
}

/// Find the byte offset named by the last `startxref` token in the buffer.
/// Per §4.2, the *last* match is authoritative (a file may carry stray
/// earlier occurrences inside object bodies or incremental-update history).
pub fn find_startxref(buffer: &[u8]) -> Result<u64> {
    let mut last = None;
    for caps in RE_STARTXREF.captures_iter(buffer) {
        last = Some(caps);
    }
    let caps = last.ok_or_else(|| Error::MalformedDocument("no startxref token".into()))?;
    parse_u64(&caps, 1)
}

/// Find the textual `trailer <<...>>` dictionary, if this document uses the
/// classic trailer path. Returns the byte range of the dictionary's inside
/// (excluding the `<<`/`>>` delimiters).
pub fn find_trailer_dict(buffer: &[u8]) -> Option<(usize, usize)> {
    let m = RE_TRAILER.find(buffer)?;
    let inner_start = m.end();
    let inner_end = find_matching_close(buffer, inner_start)?;
    Some((inner_start, inner_end))
}

/// Find the indirect object whose dictionary declares `/Type /XRef`.
/// Returns `(obj_num, gen_num, dict_start, dict_end, stream_data_start)`
/// where `dict_start..dict_end` is the inside of the dictionary (excluding
/// `<<`/`>>`) and `stream_data_start` is the offset right after the
/// `stream` keyword's end-of-line.
pub fn find_xref_stream_object(buffer: &[u8]) -> Option<XrefStreamLocation> {
    let caps = RE_XREF_STREAM_OBJ.captures(buffer)?;
    let whole = caps.get(0)?;
    let obj_num = parse_u64(&caps, 1).ok()? as u32;
    let gen_num = parse_u64(&caps, 2).ok()? as u16;
    let dict = caps.get(3)?;
    let stream_kw_end = whole.end();
    let data_start = skip_stream_eol(buffer, stream_kw_end)?;
    Some(XrefStreamLocation {
        obj_start: whole.start(),
        obj_num,
        gen_num,
        dict_start: dict.start(),
        dict_end: dict.end() - 2, // drop trailing `>>`
        data_start,
    })
}

/// The position and dictionary bounds of an indirect object whose
/// dictionary contains `/Type /XRef`.
#[derive(Debug, Clone, Copy)]
pub struct XrefStreamLocation {
    /// Byte offset of the `N G obj` token.
    pub obj_start: usize,
    /// Object number.
    pub obj_num: u32,
    /// Generation number.
    pub gen_num: u16,
    /// Start of the dictionary's inside text.
    pub dict_start: usize,
    /// End of the dictionary's inside text.
    pub dict_end: usize,
    /// Start of the raw (still-encoded) stream data.
    pub data_start: usize,
}

/// True if the buffer names `/Linearized` in its first indirect object's
/// dictionary — a feature this crate refuses to handle (§1 non-goals).
pub fn is_linearized(buffer: &[u8]) -> bool {
    // Linearization dictionaries always appear in the header region; a
    // match anywhere near the start of the buffer is conclusive enough for
    // a "refuse to proceed" check, so no position bound is needed here.
    RE_LINEARIZED.is_match(&buffer[..buffer.len().min(2048)])
}

/// Find an `/Encrypt N G R` reference inside a trailer/xref-stream
/// dictionary substring, if present.
pub fn find_encrypt_ref(dict_text: &[u8]) -> Option<(u32, u16)> {
    let caps = RE_ENCRYPT.captures(dict_text)?;
    let obj_num = parse_u64(&caps, 1).ok()? as u32;
    let gen_num = parse_u64(&caps, 2).ok()? as u16;
    Some((obj_num, gen_num))
}

/// Isolate an indirect object's body starting at `offset`, up to (but not
/// including) the nearest following `endobj`. This is the textual-search
/// primitive the page layer uses against the finished index.
pub fn isolate_object_body(buffer: &[u8], offset: usize) -> Result<&[u8]> {
    let end = find_subslice(&buffer[offset..], b"endobj")
        .map(|rel| offset + rel)
        .ok_or_else(|| Error::MalformedDocument(format!("no endobj after offset {offset}")))?;
    Ok(&buffer[offset..end])
}

/// Locate the raw bytes of a `stream ... endstream` body within an object's
/// text, preferring `/Length` (resolved via `length_hint`, when given) to
/// delimit the end and falling back to the first literal `\nendstream`
/// otherwise — the mitigation for the regex-over-binary hazard in §9.
pub fn extract_stream_body<'a>(object_text: &'a [u8], length_hint: Option<usize>) -> Result<&'a [u8]> {
    let stream_kw = find_subslice(object_text, b"stream")
        .ok_or_else(|| Error::MalformedDocument("no stream keyword".into()))?;
    let data_start = skip_stream_eol(object_text, stream_kw + b"stream".len())
        .ok_or_else(|| Error::MalformedDocument("stream keyword not followed by EOL".into()))?;

    if let Some(len) = length_hint {
        let end = data_start + len;
        if end > object_text.len() {
            return Err(Error::MalformedDocument("declared /Length extends past object end".into()));
        }
        return Ok(&object_text[data_start..end]);
    }

    let rel_end = find_subslice(&object_text[data_start..], b"endstream")
        .ok_or_else(|| Error::MalformedDocument("no endstream".into()))?;
    let mut end = data_start + rel_end;
    // Trim the EOL that precedes `endstream` per the `stream\n...\nendstream`
    // grammar; tolerate either LF or CRLF.
    if end > data_start && object_text[end - 1] == b'\n' {
        end -= 1;
        if end > data_start && object_text[end - 1] == b'\r' {
            end -= 1;
        }
    }
    Ok(&object_text[data_start..end])
}

/// Find `needle` in `haystack`, crate-visible wrapper around the naive
/// search used throughout this module (dictionary names, `/Resources`,
/// `/Parent`, and similar short anchors the page layer looks for).
pub(crate) fn find_bytes(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    find_subslice(haystack, needle)
}

/// Find the first `<<...>>` dictionary at or after `pos` and return its
/// inside bounds (excluding the delimiters). Used to pull an inline
/// sub-dictionary value, e.g. `/Resources <<...>>`, out of a larger
/// dictionary's text.
pub(crate) fn dict_bounds_after(text: &[u8], pos: usize) -> Option<(usize, usize)> {
    let rel_start = find_subslice(&text[pos..], b"<<")?;
    let inner_start = pos + rel_start + 2;
    let inner_end = find_matching_close(text, inner_start)?;
    Some((inner_start, inner_end))
}

fn skip_stream_eol(buffer: &[u8], mut pos: usize) -> Option<usize> {
    // `stream` is followed by CRLF or LF (never a bare CR) before the raw
    // data begins.
    if buffer.get(pos) == Some(&b'\r') {
        pos += 1;
    }
    if buffer.get(pos) == Some(&b'\n') {
        pos += 1;
        return Some(pos);
    }
    None
}

/// Find the first occurrence of `needle` in `haystack`, naive but adequate
/// for the short anchors (`endobj`, `endstream`) this crate searches for.
fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|w| w == needle)
}

/// Walk forward from `start` (just past a dictionary's opening `<<`),
/// tracking nesting depth, to find the offset of the matching `>>`.
fn find_matching_close(buffer: &[u8], start: usize) -> Option<usize> {
    let mut depth = 1_i32;
    let mut i = start;
    while i + 1 < buffer.len() {
        if &buffer[i..i + 2] == b"<<" {
            depth += 1;
            i += 2;
        } else if &buffer[i..i + 2] == b">>" {
            depth -= 1;
            i += 2;
            if depth == 0 {
                return Some(i - 2);
            }
        } else {
            i += 1;
        }
    }
    None
}

fn parse_u64(caps: &Captures, group: usize) -> Result<u64> {
    let text = caps
        .get(group)
        .ok_or_else(|| Error::MalformedDocument("missing capture group".into()))?;
    std::str::from_utf8(text.as_bytes())
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric token".into()))
}
