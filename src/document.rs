//! File/document orchestrator (C8): owns the document buffer and the final
//! object index, and drives the C2 -> C7 pipeline described in SPEC_FULL.md
//! §5.

use std::fs;
use std::path::Path;

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::font;
use crate::index::ObjectIndex;
use crate::inflate::inflate;
use crate::lex::{self, extract_stream_body, find_encrypt_ref, find_trailer_dict, find_xref_stream_object, is_linearized, isolate_object_body};
use crate::objstm::{self, SpliceStrategy};
use crate::page::{MediaBox, Page};
use crate::trailer::{parse_trailer, DocumentRefs};
use crate::xobject;
use crate::xref::{ObjectId, Xref};
use crate::xref_stream;
use crate::xref_table;

lazy_static! {
    static ref RE_LENGTH: Regex = Regex::new(r"/Length\s+(\d+)").unwrap();
    static ref RE_FILTER: Regex = Regex::new(r"/Filter\s*/(\w+)").unwrap();
}

/// Guards recursive page-tree and resource-inheritance walks against a
/// malformed `/Parent`/`/Kids` cycle.
const MAX_TREE_DEPTH: usize = 64;

/// An opened PDF document: the (possibly rewritten, see `objstm`) byte
/// buffer plus the finalized object index and document-level references.
///
/// There is no process-wide "current document"; every `Document` is an
/// ordinary owned value, constructible only through a successful
/// [`Document::open`]/[`Document::load_mem`].
pub struct Document {
    buffer: Vec<u8>,
    index: ObjectIndex,
    refs: DocumentRefs,
    page_ids: Vec<ObjectId>,
}

impl Document {
    /// Read `path` and parse it with the default splice strategy.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Document> {
        Document::open_with(path, SpliceStrategy::default())
    }

    /// Read `path` and parse it, choosing how `/ObjStm` splicing is done.
    pub fn open_with<P: AsRef<Path>>(path: P, strategy: SpliceStrategy) -> Result<Document> {
        let bytes = fs::read(path)?;
        Document::load_mem_with(bytes, strategy)
    }

    /// Parse an in-memory buffer with the default splice strategy.
    pub fn load_mem(bytes: Vec<u8>) -> Result<Document> {
        Document::load_mem_with(bytes, SpliceStrategy::default())
    }

    /// Parse an in-memory buffer, choosing how `/ObjStm` splicing is done.
    ///
    /// Phases run in strict sequence, per SPEC_FULL.md §5: locate `startxref`
    /// -> parse trailer or xref-stream -> expand ObjStms -> finalize the
    /// index. Every phase is fatal on error; there is no partial `Document`.
    pub fn load_mem_with(buffer: Vec<u8>, strategy: SpliceStrategy) -> Result<Document> {
        if is_linearized(&buffer) {
            return Err(Error::UnsupportedFeature("linearized documents are not supported"));
        }

        let startxref = lex::find_startxref(&buffer)?;
        log::debug!("startxref at {startxref}");

        let (final_buffer, xref, refs) = match find_trailer_dict(&buffer) {
            Some((dict_start, dict_end)) => {
                log::debug!("classic trailer found at {dict_start}");
                let dict_text = &buffer[dict_start..dict_end];
                reject_encrypted(dict_text)?;
                let refs = parse_trailer(dict_text)?;
                let (xref, _) = xref_table::parse(&buffer, startxref as usize)?;
                (buffer, xref, refs)
            }
            None => {
                let location = find_xref_stream_object(&buffer)
                    .ok_or_else(|| Error::MalformedDocument("neither a trailer nor an xref stream was found".into()))?;
                log::debug!("xref stream object {} {} found at {}", location.obj_num, location.gen_num, location.obj_start);
                let dict_text = &buffer[location.dict_start..location.dict_end];
                reject_encrypted(dict_text)?;
                let refs = parse_trailer(dict_text)?;

                let body = isolate_object_body(&buffer, location.obj_start)?;
                let length_hint = RE_LENGTH
                    .captures(dict_text)
                    .and_then(|c| std::str::from_utf8(&c[1]).ok())
                    .and_then(|s| s.parse::<usize>().ok());
                let raw_stream = extract_stream_body(body, length_hint)?;

                let xref = xref_stream::parse(dict_text, raw_stream)?;
                log::info!("decoded xref stream with {} entries", xref.len());

                let (new_buffer, expanded_xref, new_startxref) = objstm::expand(&buffer, &xref, &refs, strategy)?;
                log::debug!("objstm expansion rewrote tail; new startxref at {new_startxref}");
                let (xref, _) = xref_table::parse(&new_buffer, new_startxref as usize)?;
                (new_buffer, merge_resolved(expanded_xref, xref), refs)
            }
        };

        let index = ObjectIndex::new(xref);
        let mut doc = Document { buffer: final_buffer, index, refs, page_ids: Vec::new() };
        doc.page_ids = doc.collect_page_ids()?;
        log::info!("opened document with {} pages", doc.page_ids.len());
        Ok(doc)
    }

    /// Number of leaf pages found by walking the `/Pages` tree from the
    /// catalog, resolved once at open time.
    pub fn get_num_pages(&self) -> usize {
        self.page_ids.len()
    }

    /// Fetch the `index`-th page (0-based), resolving its media box,
    /// content stream, and font/XObject resources.
    pub fn get_page(&self, index: usize) -> Result<Page> {
        let id = *self.page_ids.get(index).ok_or(Error::PageNotFound(index))?;
        let dict = self
            .dict_text(id.0, id.1)?
            .ok_or(Error::ObjectNotFound { obj_num: id.0, gen_num: id.1 })?;

        let media_box = self.resolve_media_box(dict, 0)?;
        let content = self.resolve_content(dict)?;
        let resources = self.resolve_resources(dict, 0)?;
        let fonts = font::resolve_fonts(self, &resources)?;
        let images = xobject::resolve_images(self, &resources)?;

        Ok(Page::new(id, media_box, content, fonts, images))
    }

    /// Isolate an object's raw body text (`N G obj ... endobj`, the `obj`
    /// header and trailing `endobj` both included) by offset lookup.
    pub(crate) fn object_body(&self, obj_num: u32, gen_num: u16) -> Result<Option<&[u8]>> {
        match self.index.offset_of(obj_num, gen_num)? {
            None => Ok(None),
            Some(offset) => Ok(Some(isolate_object_body(&self.buffer, offset as usize)?)),
        }
    }

    /// An object's dictionary text (the first `<<...>>` found in its body).
    pub(crate) fn dict_text(&self, obj_num: u32, gen_num: u16) -> Result<Option<&[u8]>> {
        let Some(body) = self.object_body(obj_num, gen_num)? else {
            return Ok(None);
        };
        let (start, end) = lex::dict_bounds_after(body, 0)
            .ok_or_else(|| Error::MalformedDocument(format!("object {obj_num} has no dictionary")))?;
        Ok(Some(&body[start..end]))
    }

    /// An object's decoded stream bytes, inflating `/FlateDecode` payloads
    /// and passing unfiltered ones through unchanged.
    pub(crate) fn stream_bytes(&self, obj_num: u32, gen_num: u16) -> Result<Option<Vec<u8>>> {
        let Some(body) = self.object_body(obj_num, gen_num)? else {
            return Ok(None);
        };
        let (dict_start, dict_end) = lex::dict_bounds_after(body, 0)
            .ok_or_else(|| Error::MalformedDocument(format!("object {obj_num} has no dictionary")))?;
        let dict = &body[dict_start..dict_end];

        let length_hint = RE_LENGTH
            .captures(dict)
            .and_then(|c| std::str::from_utf8(&c[1]).ok())
            .and_then(|s| s.parse::<usize>().ok());
        let raw = extract_stream_body(body, length_hint)?;

        let decoded = match RE_FILTER.captures(dict) {
            Some(caps) => {
                let filter = String::from_utf8_lossy(&caps[1]).into_owned();
                if filter != "FlateDecode" {
                    return Err(Error::UnsupportedFilter(filter));
                }
                inflate(raw)?
            }
            None => raw.to_vec(),
        };
        Ok(Some(decoded))
    }

    pub(crate) fn index(&self) -> &ObjectIndex {
        &self.index
    }

    /// Dictionary text for an object already resolved to a byte offset
    /// (e.g. by [`crate::index::ObjectIndex::resolve_named_ref_map`]), which
    /// does not carry the object's generation number back to the caller.
    pub(crate) fn dict_text_at_offset(&self, offset: u64) -> Result<&[u8]> {
        let body = isolate_object_body(&self.buffer, offset as usize)?;
        let (start, end) = lex::dict_bounds_after(body, 0)
            .ok_or_else(|| Error::MalformedDocument(format!("object at offset {offset} has no dictionary")))?;
        Ok(&body[start..end])
    }

    /// Decoded stream bytes for an object already resolved to a byte offset.
    pub(crate) fn stream_bytes_at_offset(&self, offset: u64) -> Result<Vec<u8>> {
        let body = isolate_object_body(&self.buffer, offset as usize)?;
        let (dict_start, dict_end) = lex::dict_bounds_after(body, 0)
            .ok_or_else(|| Error::MalformedDocument(format!("object at offset {offset} has no dictionary")))?;
        let dict = &body[dict_start..dict_end];

        let length_hint = RE_LENGTH
            .captures(dict)
            .and_then(|c| std::str::from_utf8(&c[1]).ok())
            .and_then(|s| s.parse::<usize>().ok());
        let raw = extract_stream_body(body, length_hint)?;

        match RE_FILTER.captures(dict) {
            Some(caps) => {
                let filter = String::from_utf8_lossy(&caps[1]).into_owned();
                if filter != "FlateDecode" {
                    return Err(Error::UnsupportedFilter(filter));
                }
                inflate(raw)
            }
            None => Ok(raw.to_vec()),
        }
    }

    fn collect_page_ids(&self) -> Result<Vec<ObjectId>> {
        let catalog = self
            .dict_text(self.refs.root.0, self.refs.root.1)?
            .ok_or_else(|| Error::MalformedDocument("root catalog is missing".into()))?;
        let pages_root = find_ref(catalog, "Pages")
            .ok_or_else(|| Error::MalformedDocument("catalog is missing /Pages".into()))?;

        let mut out = Vec::new();
        self.walk_pages_tree(pages_root, 0, &mut out)?;
        Ok(out)
    }

    fn walk_pages_tree(&self, node: ObjectId, depth: usize, out: &mut Vec<ObjectId>) -> Result<()> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::MalformedDocument("page tree exceeds maximum depth".into()));
        }
        let dict = self
            .dict_text(node.0, node.1)?
            .ok_or(Error::ObjectNotFound { obj_num: node.0, gen_num: node.1 })?;
        let kids = find_ref_array(dict, "Kids");
        if kids.is_empty() {
            out.push(node);
        } else {
            for kid in kids {
                self.walk_pages_tree(kid, depth + 1, out)?;
            }
        }
        Ok(())
    }

    fn resolve_media_box(&self, dict: &[u8], depth: usize) -> Result<MediaBox> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::MalformedDocument("/MediaBox inheritance exceeds maximum depth".into()));
        }
        if let Some(mb) = parse_media_box(dict) {
            return Ok(mb);
        }
        if let Some(parent) = find_ref(dict, "Parent") {
            let parent_dict = self
                .dict_text(parent.0, parent.1)?
                .ok_or(Error::ObjectNotFound { obj_num: parent.0, gen_num: parent.1 })?;
            return self.resolve_media_box(parent_dict, depth + 1);
        }
        log::warn!("no /MediaBox found on page or any ancestor; defaulting to US Letter");
        Ok(MediaBox::default())
    }

    fn resolve_content(&self, dict: &[u8]) -> Result<Vec<u8>> {
        if let Some(id) = find_ref(dict, "Contents") {
            return Ok(self.stream_bytes(id.0, id.1)?.unwrap_or_default());
        }
        let ids = find_ref_array(dict, "Contents");
        let mut out = Vec::new();
        for id in ids {
            if let Some(bytes) = self.stream_bytes(id.0, id.1)? {
                if !out.is_empty() {
                    out.push(b'\n');
                }
                out.extend_from_slice(&bytes);
            }
        }
        Ok(out)
    }

    fn resolve_resources(&self, dict: &[u8], depth: usize) -> Result<Vec<u8>> {
        if depth > MAX_TREE_DEPTH {
            return Err(Error::MalformedDocument("/Resources inheritance exceeds maximum depth".into()));
        }
        if let Some(id) = find_ref(dict, "Resources") {
            return Ok(self
                .dict_text(id.0, id.1)?
                .ok_or(Error::ObjectNotFound { obj_num: id.0, gen_num: id.1 })?
                .to_vec());
        }
        if let Some(pos) = lex::find_bytes(dict, b"/Resources") {
            if let Some((start, end)) = lex::dict_bounds_after(dict, pos) {
                return Ok(dict[start..end].to_vec());
            }
        }
        if let Some(parent) = find_ref(dict, "Parent") {
            let parent_dict = self
                .dict_text(parent.0, parent.1)?
                .ok_or(Error::ObjectNotFound { obj_num: parent.0, gen_num: parent.1 })?;
            return self.resolve_resources(parent_dict, depth + 1);
        }
        Ok(Vec::new())
    }
}

fn reject_encrypted(dict_text: &[u8]) -> Result<()> {
    if find_encrypt_ref(dict_text).is_some() {
        return Err(Error::UnsupportedFeature("encrypted documents are not supported"));
    }
    Ok(())
}

/// After ObjStm expansion, both the rewritten xref (with splice offsets) and
/// the freshly re-parsed classic table describe the same document; the
/// re-parsed table is authoritative for free/in-use status on untouched
/// objects, so it is what's kept. `expanded` is consulted only as a sanity
/// source during development and otherwise discarded.
fn merge_resolved(_expanded: Xref, reparsed: Xref) -> Xref {
    reparsed
}

fn find_ref(dict: &[u8], name: &str) -> Option<ObjectId> {
    let pattern = format!(r"/{name}\s+(\d+)\s+(\d+)\s+R");
    let re = Regex::new(&pattern).expect("reference pattern is always valid");
    let caps = re.captures(dict)?;
    let obj_num: u32 = std::str::from_utf8(&caps[1]).ok()?.parse().ok()?;
    let gen_num: u16 = std::str::from_utf8(&caps[2]).ok()?.parse().ok()?;
    Some((obj_num, gen_num))
}

fn find_ref_array(dict: &[u8], name: &str) -> Vec<ObjectId> {
    let pattern = format!(r"/{name}\s*\[([^\]]*)\]");
    let Ok(re) = Regex::new(&pattern) else { return Vec::new() };
    let Some(caps) = re.captures(dict) else { return Vec::new() };
    let inner = &caps[1];
    let entry_re = Regex::new(r"(\d+)\s+(\d+)\s+R").expect("entry pattern is always valid");
    entry_re
        .captures_iter(inner)
        .filter_map(|c| {
            let obj_num: u32 = std::str::from_utf8(&c[1]).ok()?.parse().ok()?;
            let gen_num: u16 = std::str::from_utf8(&c[2]).ok()?.parse().ok()?;
            Some((obj_num, gen_num))
        })
        .collect()
}

fn parse_media_box(dict: &[u8]) -> Option<MediaBox> {
    let re = Regex::new(r"/MediaBox\s*\[\s*([0-9.+-]+)\s+([0-9.+-]+)\s+([0-9.+-]+)\s+([0-9.+-]+)\s*\]").ok()?;
    let caps = re.captures(dict)?;
    let parse = |i: usize| std::str::from_utf8(&caps[i]).ok()?.parse::<f32>().ok();
    Some(MediaBox {
        lower_left: (parse(1)?, parse(2)?),
        upper_right: (parse(3)?, parse(4)?),
    })
}
