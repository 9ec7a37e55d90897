//! Object-stream expander (C6): splice `/ObjStm`-packed objects back into the
//! document buffer as first-class indirect objects, and synthesize a fresh
//! classic xref/trailer tail so the rest of the pipeline can re-use the
//! C4 code path uniformly.

use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::inflate::inflate;
use crate::lex::{extract_stream_body, isolate_object_body};
use crate::trailer::DocumentRefs;
use crate::xref::{Xref, XrefEntry};

lazy_static! {
    static ref RE_FIRST: Regex = Regex::new(r"/First\s+(\d+)").unwrap();
    static ref RE_LENGTH: Regex = Regex::new(r"/Length\s+(\d+)").unwrap();
}

/// How a spliced-in object is written back into the document buffer.
///
/// `InPlace` is the only implemented strategy: it matches the byte-buffer
/// mutation this crate is grounded on. `Overlay` is reserved as a documented
/// alternative (a `HashMap<u32, Vec<u8>>` consulted ahead of the buffer) but
/// is not implemented.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SpliceStrategy {
    #[default]
    InPlace,
    Overlay,
}

/// One `/ObjStm` object's worth of work: the byte range it and its
/// surrounding `N G obj ... endobj` occupy in the *original* buffer, and the
/// already-unpacked `(obj_num, payload)` pairs it contained.
struct ContainerSplice {
    start: usize,
    end: usize,
    objects: Vec<(u32, Vec<u8>)>,
}

/// Expand every `/ObjStm` referenced by a `Compressed` xref entry, splice its
/// contained objects into the buffer, and rebuild a classic xref + trailer
/// tail. Returns the rewritten buffer, the now-`Compressed`-free xref, and
/// the byte offset of the freshly written `xref` keyword (the new
/// `startxref` target).
pub fn expand(buffer: &[u8], xref: &Xref, refs: &DocumentRefs, strategy: SpliceStrategy) -> Result<(Vec<u8>, Xref, u64)> {
    if strategy == SpliceStrategy::Overlay {
        return Err(Error::UnsupportedFeature("overlay splice strategy is not implemented"));
    }

    let mut container_ids: Vec<u32> = xref.compressed_entries().map(|(_, container, _)| container).collect();
    container_ids.sort_unstable();
    container_ids.dedup();

    let mut containers = Vec::with_capacity(container_ids.len());
    for container_id in container_ids {
        containers.push(splice_one_container(buffer, xref, container_id)?);
    }
    containers.sort_by_key(|c| c.start);

    let tail_start = find_tail_start(buffer)?;

    let mut new_buffer = Vec::with_capacity(buffer.len());
    let mut cursor = 0usize;
    let mut splice_offsets: HashMap<u32, u64> = HashMap::new();
    let mut replacements: Vec<(usize, usize, usize)> = Vec::with_capacity(containers.len());

    for container in &containers {
        new_buffer.extend_from_slice(&buffer[cursor..container.start]);
        let replacement_start_len = new_buffer.len();
        for (obj_num, payload) in &container.objects {
            splice_offsets.insert(*obj_num, new_buffer.len() as u64);
            new_buffer.extend_from_slice(payload);
        }
        replacements.push((container.start, container.end, new_buffer.len() - replacement_start_len));
        cursor = container.end;
    }

    if cursor > tail_start {
        return Err(Error::MalformedDocument("object stream extends past the document tail".into()));
    }
    new_buffer.extend_from_slice(&buffer[cursor..tail_start]);

    let container_ids: std::collections::HashSet<u32> =
        xref.compressed_entries().map(|(_, c, _)| c).collect::<std::collections::HashSet<_>>();

    let mut final_xref = Xref::new();
    for (obj_num, entry) in xref.iter() {
        match *entry {
            XrefEntry::Compressed { container, .. } => {
                let offset = *splice_offsets
                    .get(&obj_num)
                    .ok_or_else(|| Error::MalformedDocument(format!("object {obj_num} missing from ObjStm {container}")))?;
                final_xref.insert(obj_num, XrefEntry::Normal { offset, generation: 0 });
            }
            XrefEntry::Normal { offset, generation } => {
                if container_ids.contains(&obj_num) {
                    // The ObjStm object itself no longer exists as addressable text.
                    final_xref.insert(obj_num, XrefEntry::Free);
                } else {
                    let shifted = shift_offset(offset, &replacements);
                    final_xref.insert(obj_num, XrefEntry::Normal { offset: shifted, generation });
                }
            }
            XrefEntry::Free => {
                final_xref.insert(obj_num, XrefEntry::Free);
            }
        }
    }

    let new_xref_offset = new_buffer.len() as u64;
    write_tail(&mut new_buffer, &final_xref, refs);

    Ok((new_buffer, final_xref, new_xref_offset))
}

fn splice_one_container(buffer: &[u8], xref: &Xref, container_id: u32) -> Result<ContainerSplice> {
    let entry = xref.get(container_id).ok_or_else(|| {
        Error::MalformedDocument(format!("ObjStm {container_id} has no xref entry"))
    })?;
    let offset = match entry {
        XrefEntry::Normal { offset, .. } => *offset as usize,
        // §9 self-referential bootstrap: an ObjStm is never itself compressed.
        _ => {
            return Err(Error::MalformedDocument(format!(
                "ObjStm {container_id} is not a Normal xref entry"
            )))
        }
    };

    let body = isolate_object_body(buffer, offset)?;
    let end = offset + body.len() + b"endobj".len();

    let length_hint = RE_LENGTH
        .captures(body)
        .and_then(|c| std::str::from_utf8(&c[1]).ok())
        .and_then(|s| s.parse::<usize>().ok());
    let raw_stream = extract_stream_body(body, length_hint)?;
    let inflated = inflate(raw_stream)?;

    let first = match RE_FIRST.captures(body) {
        Some(c) => std::str::from_utf8(&c[1])
            .ok()
            .and_then(|s| s.parse::<usize>().ok())
            .ok_or_else(|| Error::MalformedDocument("non-numeric /First".into()))?,
        None => scan_header_end(&inflated)?,
    };

    if first > inflated.len() {
        return Err(Error::MalformedDocument("/First extends past ObjStm body".into()));
    }

    let mut pairs = parse_header_pairs(&inflated[..first])?;
    pairs.sort_by_key(|&(_, rel_offset)| rel_offset);

    let mut objects = Vec::with_capacity(pairs.len());
    for (i, &(obj_num, rel_offset)) in pairs.iter().enumerate() {
        let start = first + rel_offset;
        let stop = match pairs.get(i + 1) {
            Some(&(_, next_rel)) => first + next_rel,
            None => inflated.len(),
        };
        if start > stop || stop > inflated.len() {
            return Err(Error::MalformedDocument(format!("ObjStm {container_id} object {obj_num} out of bounds")));
        }
        let payload = &inflated[start..stop];
        let mut wrapped = Vec::with_capacity(payload.len() + 32);
        wrapped.extend_from_slice(format!("{obj_num} 0 obj").as_bytes());
        wrapped.extend_from_slice(payload);
        wrapped.extend_from_slice(b"\nendobj\n");
        objects.push((obj_num, wrapped));
    }

    Ok(ContainerSplice { start: offset, end, objects })
}

/// Fallback header-length discovery when `/First` is absent: keep reading
/// whitespace-separated integer pairs, tracking the byte offset just past
/// each one, until a token fails to parse as a number or the bytes run out.
fn scan_header_end(inflated: &[u8]) -> Result<usize> {
    let mut pos = 0usize;
    let mut last_pair_end = 0usize;
    let mut pair_count = 0usize;

    loop {
        let Some((first_num, after_first)) = read_token(inflated, pos) else { break };
        let Some((second_num, after_second)) = read_token(inflated, after_first) else { break };
        if first_num.parse::<u32>().is_err() || second_num.parse::<usize>().is_err() {
            break;
        }
        pair_count += 1;
        last_pair_end = after_second;
        pos = after_second;
    }

    if pair_count == 0 {
        return Err(Error::MalformedDocument("ObjStm header has no /First and no readable pairs".into()));
    }
    Ok(last_pair_end)
}

/// Read one whitespace-delimited token starting at `pos`, returning it and
/// the byte offset just past it.
fn read_token(bytes: &[u8], pos: usize) -> Option<(&str, usize)> {
    let mut start = pos;
    while start < bytes.len() && bytes[start].is_ascii_whitespace() {
        start += 1;
    }
    let mut end = start;
    while end < bytes.len() && !bytes[end].is_ascii_whitespace() {
        end += 1;
    }
    if end == start {
        return None;
    }
    std::str::from_utf8(&bytes[start..end]).ok().map(|s| (s, end))
}

fn parse_header_pairs(header: &[u8]) -> Result<Vec<(u32, usize)>> {
    let text = std::str::from_utf8(header).map_err(|_| Error::MalformedDocument("non-UTF8 ObjStm header".into()))?;
    let nums: Vec<&str> = text.split_whitespace().collect();
    if nums.len() % 2 != 0 {
        return Err(Error::MalformedDocument("ObjStm header has an odd number of integers".into()));
    }
    nums.chunks(2)
        .map(|pair| {
            let obj_num: u32 = pair[0].parse().map_err(|_| Error::MalformedDocument("bad ObjStm header obj_num".into()))?;
            let rel_offset: usize = pair[1].parse().map_err(|_| Error::MalformedDocument("bad ObjStm header offset".into()))?;
            Ok((obj_num, rel_offset))
        })
        .collect()
}

/// Remap a byte offset from the original buffer to its position in the
/// rebuilt one, given every `(start, end, new_len)` replacement applied
/// strictly left-to-right. Only replacements that end at or before
/// `original` can have shifted it.
fn shift_offset(original: u64, replacements: &[(usize, usize, usize)]) -> u64 {
    let mut delta: i64 = 0;
    for &(start, end, new_len) in replacements {
        if (end as u64) <= original {
            delta += new_len as i64 - (end - start) as i64;
        }
    }
    (original as i64 + delta) as u64
}

fn find_tail_start(buffer: &[u8]) -> Result<usize> {
    let eof_pos = rfind_subslice(buffer, b"%%EOF")
        .ok_or_else(|| Error::MalformedDocument("no %%EOF marker".into()))?;
    let endobj_pos = rfind_subslice(&buffer[..eof_pos], b"endobj")
        .ok_or_else(|| Error::MalformedDocument("no endobj before final %%EOF".into()))?;
    Ok(endobj_pos + b"endobj".len())
}

fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    (0..=haystack.len() - needle.len()).rev().find(|&i| &haystack[i..i + needle.len()] == needle)
}

/// Write a zero-padded fixed-width decimal, as the classic xref subsection
/// entry format requires (`oooooooooo ggggg`).
fn write_padded(buffer: &mut Vec<u8>, n: u64, width: usize) {
    let mut fmt = itoa::Buffer::new();
    let digits = fmt.format(n);
    for _ in digits.len()..width {
        buffer.push(b'0');
    }
    buffer.extend_from_slice(digits.as_bytes());
}

fn write_tail(buffer: &mut Vec<u8>, xref: &Xref, refs: &DocumentRefs) {
    let max_obj = xref.iter().map(|(n, _)| n).max().unwrap_or(0);
    let count = max_obj + 1;

    let xref_offset = buffer.len() as u64;
    buffer.extend_from_slice(b"xref\n");
    buffer.extend_from_slice(format!("0 {count}\n").as_bytes());
    for obj_num in 0..count {
        match xref.get(obj_num) {
            Some(XrefEntry::Normal { offset, generation }) => {
                write_padded(buffer, *offset, 10);
                buffer.push(b' ');
                write_padded(buffer, *generation as u64, 5);
                buffer.extend_from_slice(b" n \n");
            }
            Some(XrefEntry::Free) | None => {
                buffer.extend_from_slice(b"0000000000 65535 f \n");
            }
            Some(XrefEntry::Compressed { .. }) => unreachable!("final xref must not contain Compressed entries"),
        }
    }

    buffer.extend_from_slice(b"trailer\n<<");
    buffer.extend_from_slice(format!("/Size {count}/Root {} {} R", refs.root.0, refs.root.1).as_bytes());
    if let Some((n, g)) = refs.info {
        buffer.extend_from_slice(format!("/Info {n} {g} R").as_bytes());
    }
    if let Some([a, b]) = &refs.id {
        buffer.extend_from_slice(format!("/ID[<{a}><{b}>]").as_bytes());
    }
    buffer.extend_from_slice(b">>\n");
    buffer.extend_from_slice(format!("startxref\n{xref_offset}\n%%EOF\n").as_bytes());
}
