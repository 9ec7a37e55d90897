//! Cross-reference data model shared by the classic-table parser (C4), the
//! xref-stream parser (C5), and the ObjStm expander (C6).

use std::collections::BTreeMap;

/// `(object_number, generation_number)`.
pub type ObjectId = (u32, u16);

/// A single cross-reference entry, before it has been resolved to its final
/// `in_use` form by [`crate::objstm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum XrefEntry {
    /// A free (unused) object slot.
    Free,
    /// A live object at a byte offset in the document buffer.
    Normal {
        /// Byte offset of the `N G obj` header.
        offset: u64,
        /// Generation number.
        generation: u16,
    },
    /// An object packed into an `/ObjStm`, not yet spliced into the buffer.
    /// Never present in the [`crate::index::ObjectIndex`] handed to callers;
    /// [`crate::objstm`] rewrites every entry of this kind to `Normal`
    /// before the index is finalized.
    Compressed {
        /// Object number of the containing `/ObjStm`.
        container: u32,
        /// Index of this object within that stream.
        index: u16,
    },
}

impl XrefEntry {
    /// True for [`XrefEntry::Normal`].
    pub fn is_normal(&self) -> bool {
        matches!(self, XrefEntry::Normal { .. })
    }

    /// True for [`XrefEntry::Compressed`].
    pub fn is_compressed(&self) -> bool {
        matches!(self, XrefEntry::Compressed { .. })
    }
}

/// A cross-reference table: every entry seen across every subsection or
/// xref-stream `/Index` range parsed so far, keyed by object number.
///
/// Generation numbers are folded into the entry itself rather than into the
/// key, matching the classic table's one-entry-per-object-number shape; a
/// non-zero generation on a `Normal` entry is preserved in the entry value.
#[derive(Debug, Clone, Default)]
pub struct Xref {
    entries: BTreeMap<u32, XrefEntry>,
}

impl Xref {
    /// An empty table.
    pub fn new() -> Xref {
        Xref { entries: BTreeMap::new() }
    }

    /// Look up an entry by object number.
    pub fn get(&self, obj_num: u32) -> Option<&XrefEntry> {
        self.entries.get(&obj_num)
    }

    /// Insert or overwrite an entry. Per §4.4, the last write for a given
    /// object number wins within a table.
    pub fn insert(&mut self, obj_num: u32, entry: XrefEntry) {
        self.entries.insert(obj_num, entry);
    }

    /// Iterate `(obj_num, entry)` pairs in ascending object-number order.
    pub fn iter(&self) -> impl Iterator<Item = (u32, &XrefEntry)> {
        self.entries.iter().map(|(&k, v)| (k, v))
    }

    /// Number of entries (free and in-use) recorded so far.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if no entries have been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Object numbers whose entry is still [`XrefEntry::Compressed`].
    pub fn compressed_entries(&self) -> impl Iterator<Item = (u32, u32, u16)> + '_ {
        self.entries.iter().filter_map(|(&obj_num, entry)| match *entry {
            XrefEntry::Compressed { container, index } => Some((obj_num, container, index)),
            _ => None,
        })
    }

    /// Replace an entry in place; used by the ObjStm expander to turn a
    /// `Compressed` entry into a `Normal` one after splicing.
    pub fn set(&mut self, obj_num: u32, entry: XrefEntry) {
        self.entries.insert(obj_num, entry);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn last_insert_wins() {
        let mut xref = Xref::new();
        xref.insert(1, XrefEntry::Normal { offset: 10, generation: 0 });
        xref.insert(1, XrefEntry::Normal { offset: 99, generation: 0 });
        assert_eq!(xref.get(1), Some(&XrefEntry::Normal { offset: 99, generation: 0 }));
    }

    #[test]
    fn compressed_entries_filters_correctly() {
        let mut xref = Xref::new();
        xref.insert(1, XrefEntry::Normal { offset: 10, generation: 0 });
        xref.insert(2, XrefEntry::Compressed { container: 9, index: 0 });
        xref.insert(3, XrefEntry::Free);
        let compressed: Vec<_> = xref.compressed_entries().collect();
        assert_eq!(compressed, vec![(2, 9, 0)]);
    }
}
