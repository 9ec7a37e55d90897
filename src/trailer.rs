//! Trailer parser (C3): extract `/Root`, `/Info`, `/ID`, and `/Encrypt` from
//! a trailer dictionary or an xref-stream dictionary.

use lazy_static::lazy_static;
use regex::bytes::Regex;

use crate::error::{Error, Result};
use crate::xref::ObjectId;

lazy_static! {
    static ref RE_ROOT: Regex = Regex::new(r"/Root\s+(\d+)\s+(\d+)\s+R").unwrap();
    static ref RE_INFO: Regex = Regex::new(r"/Info\s+(\d+)\s+(\d+)\s+R").unwrap();
    static ref RE_ID: Regex = Regex::new(r"/ID\s*\[\s*<([0-9A-Fa-f]+)>\s*<([0-9A-Fa-f]+)>\s*\]").unwrap();
}

/// The document-level references a trailer (or xref-stream dictionary)
/// carries: `/Root`, `/Info`, and `/ID`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRefs {
    /// The document catalog's object reference. Always present after a
    /// successful parse.
    pub root: ObjectId,
    /// The document info dictionary's object reference, if any.
    pub info: Option<ObjectId>,
    /// The two-part file identifier, kept verbatim as hex text.
    pub id: Option<[String; 2]>,
}

/// Parse `/Root`, `/Info`, and `/ID` out of a trailer dictionary's inside
/// text. Missing `/Info`/`/ID` are tolerated; missing `/Root` is fatal.
pub fn parse_trailer(dict_text: &[u8]) -> Result<DocumentRefs> {
    let root = match RE_ROOT.captures(dict_text) {
        Some(caps) => object_id(&caps)?,
        None => return Err(Error::MalformedDocument("trailer missing /Root".into())),
    };

    let info = match RE_INFO.captures(dict_text) {
        Some(caps) => Some(object_id(&caps)?),
        None => None,
    };

    let id = RE_ID.captures(dict_text).map(|caps| {
        [
            String::from_utf8_lossy(&caps[1]).into_owned(),
            String::from_utf8_lossy(&caps[2]).into_owned(),
        ]
    });

    if info.is_none() {
        log::warn!("trailer has no /Info entry");
    }
    if id.is_none() {
        log::warn!("trailer has no /ID entry");
    }

    Ok(DocumentRefs { root, info, id })
}

fn object_id(caps: &regex::bytes::Captures) -> Result<ObjectId> {
    let num = std::str::from_utf8(&caps[1])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric object number in reference".into()))?;
    let gen = std::str::from_utf8(&caps[2])
        .ok()
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| Error::MalformedDocument("non-numeric generation number in reference".into()))?;
    Ok((num, gen))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_trailer() {
        let dict = b"/Size 10/Root 1 0 R/Info 2 0 R/ID[<AABB><CCDD>]";
        let refs = parse_trailer(dict).unwrap();
        assert_eq!(refs.root, (1, 0));
        assert_eq!(refs.info, Some((2, 0)));
        assert_eq!(refs.id, Some(["AABB".to_string(), "CCDD".to_string()]));
    }

    #[test]
    fn tolerates_missing_info_and_id() {
        let dict = b"/Size 10/Root 1 0 R";
        let refs = parse_trailer(dict).unwrap();
        assert_eq!(refs.root, (1, 0));
        assert_eq!(refs.info, None);
        assert_eq!(refs.id, None);
    }

    #[test]
    fn missing_root_is_malformed() {
        let dict = b"/Size 10/Info 2 0 R";
        assert!(matches!(parse_trailer(dict), Err(Error::MalformedDocument(_))));
    }

    #[test]
    fn oversized_root_object_number_is_malformed_not_a_panic() {
        let dict = b"/Size 10/Root 99999999999999999999 0 R";
        assert!(matches!(parse_trailer(dict), Err(Error::MalformedDocument(_))));
    }
}
