//! Page layer (C9): media box, text runs, and image XObjects for a single
//! page, resolved once by [`crate::document::Document::get_page`].

use std::collections::HashMap;

use crate::content::{self, TextRun};
use crate::font::FontInfo;
use crate::xobject::{self, ImageXObject};
use crate::xref::ObjectId;

/// A page's bounding box in default user space, inherited from the nearest
/// ancestor `/Pages` node when not set directly on the page object.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MediaBox {
    pub lower_left: (f32, f32),
    pub upper_right: (f32, f32),
}

impl Default for MediaBox {
    /// US Letter, used only when neither the page nor any ancestor declares
    /// a `/MediaBox` — a tolerant fallback this crate adds beyond the
    /// original source, which treats that case as undefined.
    fn default() -> Self {
        MediaBox { lower_left: (0.0, 0.0), upper_right: (612.0, 792.0) }
    }
}

/// A single resolved page: its object id, bounding box, decoded content
/// stream, and the font/image resources its content stream can reference.
pub struct Page {
    pub id: ObjectId,
    pub media_box: MediaBox,
    pub content: Vec<u8>,
    fonts: HashMap<String, FontInfo>,
    images: HashMap<String, ImageXObject>,
}

impl Page {
    pub(crate) fn new(
        id: ObjectId,
        media_box: MediaBox,
        content: Vec<u8>,
        fonts: HashMap<String, FontInfo>,
        images: HashMap<String, ImageXObject>,
    ) -> Page {
        Page { id, media_box, content, fonts, images }
    }

    /// Every text-showing run in this page's content stream, positioned by
    /// the most recent `Td`/`TD` operands in its enclosing `BT...ET` block.
    pub fn text_runs(&self) -> Vec<TextRun> {
        content::extract_text_runs(&self.content, &self.fonts)
    }

    /// Every image XObject this page's content stream places via `Do`,
    /// each carrying the CTM captured from its enclosing `q...cm...Q` block.
    pub fn image_xobjects(&self) -> Vec<ImageXObject> {
        xobject::place_images(&self.content, &self.images)
    }

    /// Look up a font by the resource name used in a `Tf` operator
    /// (e.g. `"F1"`).
    pub fn resolve_font(&self, name: &str) -> Option<&FontInfo> {
        self.fonts.get(name)
    }
}
