//! Font mapping (C10): minimal `/Font` resource resolution backing the page
//! layer's text runs.

use std::collections::HashMap;

use crate::document::Document;
use crate::error::Result;

lazy_static::lazy_static! {
    static ref RE_BASE_FONT: regex::bytes::Regex = regex::bytes::Regex::new(r"/BaseFont\s*/([^\s/<>\[\]()]+)").unwrap();
    static ref RE_SUBTYPE: regex::bytes::Regex = regex::bytes::Regex::new(r"/Subtype\s*/([^\s/<>\[\]()]+)").unwrap();
}

/// `/BaseFont` and `/Subtype` of a single font resource, resolved from a
/// page's `/Resources /Font` dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FontInfo {
    pub base_font: String,
    pub subtype: String,
}

/// Resolve every entry of a `/Resources` dictionary's `/Font` sub-map to its
/// [`FontInfo`], keyed by the resource name used in a `Tf` operator.
pub(crate) fn resolve_fonts(doc: &Document, resources_dict: &[u8]) -> Result<HashMap<String, FontInfo>> {
    let mut out = HashMap::new();
    if resources_dict.is_empty() {
        return Ok(out);
    }

    for (name, offset) in doc.index().resolve_named_ref_map("Font", resources_dict)? {
        let dict = doc.dict_text_at_offset(offset)?;
        let base_font = RE_BASE_FONT
            .captures(dict)
            .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
            .unwrap_or_else(|| "Unknown".to_string());
        let subtype = RE_SUBTYPE
            .captures(dict)
            .map(|c| String::from_utf8_lossy(&c[1]).into_owned())
            .unwrap_or_else(|| "Type1".to_string());
        out.insert(name, FontInfo { base_font, subtype });
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_font_regex_strips_leading_slash() {
        let dict = b"/Type/Font/Subtype/TrueType/BaseFont/Arial-Bold";
        let caps = RE_BASE_FONT.captures(dict).unwrap();
        assert_eq!(&caps[1], b"Arial-Bold");
        let caps = RE_SUBTYPE.captures(dict).unwrap();
        assert_eq!(&caps[1], b"TrueType");
    }
}
