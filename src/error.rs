//! Error types produced while resolving a document's cross-reference graph.

/// Result type alias used throughout this crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Every way `Document::open`/`Document::load_mem` can fail.
///
/// Every variant here is fatal: the core never recovers from a bad xref
/// entry or an unsupported filter, it only reports why it stopped.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// No `startxref`, no trailer, no xref stream, a truncated object, a
    /// missing mandatory dictionary key, or a violated structural invariant
    /// (e.g. an `/ObjStm` itself stored as a compressed xref entry).
    #[error("malformed document: {0}")]
    MalformedDocument(String),

    /// A zlib/DEFLATE stream failed to inflate.
    #[error("corrupt stream: could not inflate")]
    CorruptStream,

    /// A filter other than `/FlateDecode` was named on an xref stream or an
    /// `/ObjStm`.
    #[error("unsupported filter: {0}")]
    UnsupportedFilter(String),

    /// A `/Predictor` value outside `{10, 12}`.
    #[error("unsupported predictor: {0}")]
    UnsupportedPredictor(u8),

    /// A feature this crate deliberately does not implement: linearised
    /// PDFs, encryption, incremental updates beyond the last trailer, or the
    /// reserved `SpliceStrategy::Overlay`.
    #[error("unsupported feature: {0}")]
    UnsupportedFeature(&'static str),

    /// A lookup through `offset_of` or one of the named-reference resolvers
    /// failed against an index that claims totality over that object range.
    #[error("object not found: {obj_num} {gen_num} R")]
    ObjectNotFound {
        /// Object number that was looked up.
        obj_num: u32,
        /// Generation number that was looked up.
        gen_num: u16,
    },

    /// The requested page index is out of range.
    #[error("page {0} not found")]
    PageNotFound(usize),

    /// A file-system error while loading the document.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn messages_carry_their_payload() {
        let err = Error::UnsupportedPredictor(11);
        assert_eq!(err.to_string(), "unsupported predictor: 11");

        let err = Error::ObjectNotFound { obj_num: 7, gen_num: 0 };
        assert_eq!(err.to_string(), "object not found: 7 0 R");
    }

    #[test]
    fn error_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Error>();
    }
}
