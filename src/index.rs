//! Object index (C7): the final `(obj_num, gen_num) -> offset` lookup table
//! the page layer consumes, plus the named-reference resolvers built on top
//! of it.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::xref::{ObjectId, Xref, XrefEntry};

lazy_static! {
    static ref RE_REF: Regex = Regex::new(r"(\d+)\s+(\d+)\s+R").unwrap();
}

/// A finalized, `Compressed`-free cross-reference table, wrapped with the
/// named-reference resolvers the page layer is built on.
#[derive(Debug, Clone)]
pub(crate) struct ObjectIndex {
    xref: Xref,
}

impl ObjectIndex {
    /// Wrap a finalized table. Every entry must be `Normal` or `Free`;
    /// passing a table that still has `Compressed` entries is a caller bug.
    pub(crate) fn new(xref: Xref) -> ObjectIndex {
        debug_assert!(
            xref.iter().all(|(_, e)| !e.is_compressed()),
            "ObjectIndex requires a fully expanded xref"
        );
        ObjectIndex { xref }
    }

    /// Resolve `(obj_num, gen_num)` to a byte offset. `Ok(None)` means the
    /// slot is a free entry; `Err(ObjectNotFound)` means the object number
    /// was never declared by any xref subsection or `/Index` range.
    pub(crate) fn offset_of(&self, obj_num: u32, gen_num: u16) -> Result<Option<u64>> {
        match self.xref.get(obj_num) {
            Some(XrefEntry::Normal { offset, generation }) if *generation == gen_num => Ok(Some(*offset)),
            Some(XrefEntry::Normal { .. }) => Err(Error::ObjectNotFound { obj_num, gen_num }),
            Some(XrefEntry::Free) => Ok(None),
            Some(XrefEntry::Compressed { .. }) => {
                unreachable!("ObjectIndex must never hold a Compressed entry")
            }
            None => Err(Error::ObjectNotFound { obj_num, gen_num }),
        }
    }

    /// Find `/<name> N G R` in `dict_text` and resolve it to an offset.
    pub(crate) fn resolve_named_ref(&self, name: &str, dict_text: &[u8]) -> Result<Option<u64>> {
        let pattern = format!(r"/{name}\s+(\d+)\s+(\d+)\s+R");
        let re = Regex::new(&pattern).expect("named-ref pattern is always valid");
        let caps = re
            .captures(dict_text)
            .ok_or_else(|| Error::MalformedDocument(format!("missing /{name} reference")))?;
        let (obj_num, gen_num) = object_id(&caps)?;
        self.offset_of(obj_num, gen_num)
    }

    /// Find `/<name> [N1 G1 R N2 G2 R ...]` and resolve every element.
    pub(crate) fn resolve_named_ref_array(&self, name: &str, dict_text: &[u8]) -> Result<Vec<u64>> {
        let pattern = format!(r"/{name}\s*\[([^\]]*)\]");
        let re = Regex::new(&pattern).expect("named-ref-array pattern is always valid");
        let caps = re
            .captures(dict_text)
            .ok_or_else(|| Error::MalformedDocument(format!("missing /{name} array")))?;
        let inner = &caps[1];

        let mut offsets = Vec::new();
        for caps in RE_REF.captures_iter(inner) {
            let (obj_num, gen_num) = object_id(&caps)?;
            if let Some(off) = self.offset_of(obj_num, gen_num)? {
                offsets.push(off);
            }
        }
        Ok(offsets)
    }

    /// Find `/<name> << /K1 N1 G1 R /K2 N2 G2 R ... >>` and resolve every
    /// value, keyed by its dictionary name (without the leading `/`).
    ///
    /// A resources dictionary is free to omit `/Font` or `/XObject`
    /// entirely (a page with no images has no reason to declare one), so
    /// an absent map resolves to an empty list rather than an error.
    pub(crate) fn resolve_named_ref_map(&self, name: &str, dict_text: &[u8]) -> Result<Vec<(String, u64)>> {
        let outer_pattern = format!(r"/{name}\s*<<([^>]*)>>");
        let outer = Regex::new(&outer_pattern).expect("named-ref-map pattern is always valid");
        let Some(caps) = outer.captures(dict_text) else {
            return Ok(Vec::new());
        };
        let inner = &caps[1];

        let entry_re = Regex::new(r"/(\w+)\s+(\d+)\s+(\d+)\s+R").expect("entry pattern is always valid");
        let mut out = Vec::new();
        for caps in entry_re.captures_iter(inner) {
            let key = String::from_utf8_lossy(&caps[1]).into_owned();
            let obj_num: u32 = std::str::from_utf8(&caps[2]).unwrap().parse().unwrap();
            let gen_num: u16 = std::str::from_utf8(&caps[3]).unwrap().parse().unwrap();
            if let Some(off) = self.offset_of(obj_num, gen_num)? {
                out.push((key, off));
            }
        }
        Ok(out)
    }
}

fn object_id(caps: &regex::bytes::Captures) -> Result<ObjectId> {
    let obj_num = std::str::from_utf8(&caps[1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric object number in reference".into()))?;
    let gen_num = std::str::from_utf8(&caps[2])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric generation number in reference".into()))?;
    Ok((obj_num, gen_num))
}
