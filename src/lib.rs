//! A read-only cross-reference resolver for PDF 1.5+ documents.
//!
//! The core of this crate turns a raw PDF byte buffer into a normalized
//! indirect-object index: it locates the trailer or xref stream, expands
//! any `/ObjStm` compressed object streams, applies PNG-family stream
//! predictors, and produces a uniform `(object_number, generation) -> byte
//! offset` lookup. A thin page layer built on top of that index exposes
//! page media boxes, text runs, and image XObjects.
//!
//! Start with [`Document::open`] or [`Document::load_mem`].
#![forbid(unsafe_code)]
#![deny(clippy::all)]

mod content;
mod document;
mod error;
mod font;
mod index;
mod inflate;
mod lex;
mod objstm;
mod page;
mod predictor;
mod trailer;
mod xobject;
mod xref;
mod xref_stream;
mod xref_table;

pub use crate::content::{FontRef, TextRun};
pub use crate::document::Document;
pub use crate::error::{Error, Result};
pub use crate::font::FontInfo;
pub use crate::objstm::SpliceStrategy;
pub use crate::page::{MediaBox, Page};
pub use crate::xobject::{ColorSpace, ImageXObject, Matrix};
pub use crate::xref::ObjectId;
