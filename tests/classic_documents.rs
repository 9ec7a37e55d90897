//! End-to-end coverage of the classic (non-stream) xref/trailer path,
//! exercising the public API all the way through page content, fonts and
//! image placement.

mod utils;
use utils::zlib;

use pdf_xref_core::{ColorSpace, Document, Error};

fn build(extra_after_size5: bool) -> Vec<u8> {
    let image_pixels = zlib(&[
        255, 0, 0, 0, 255, 0, // row 0: red, green
        0, 0, 255, 255, 255, 255, // row 1: blue, white
    ]);

    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.4\n");
    let mut offsets = vec![0usize; 8];

    offsets[1] = buf.len();
    buf.extend_from_slice(b"1 0 obj<</Type/Catalog/Pages 2 0 R>>endobj\n");

    offsets[2] = buf.len();
    buf.extend_from_slice(b"2 0 obj<</Type/Pages/Kids[3 0 R]/Count 1>>endobj\n");

    offsets[3] = buf.len();
    buf.extend_from_slice(
        b"3 0 obj<</Type/Page/Parent 2 0 R/MediaBox[0 0 612 792]/Contents 4 0 R/Resources 7 0 R>>endobj\n",
    );

    offsets[4] = buf.len();
    let content = b"BT /F1 12 Tf 100 700 Td (Hi) Tj ET\nq 1 0 0 1 50 50 cm /Im1 Do Q";
    buf.extend_from_slice(format!("4 0 obj<</Length {}>>stream\n", content.len()).as_bytes());
    buf.extend_from_slice(content);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    offsets[5] = buf.len();
    buf.extend_from_slice(b"5 0 obj<</Type/Font/Subtype/Type1/BaseFont/Helvetica>>endobj\n");

    offsets[6] = buf.len();
    buf.extend_from_slice(
        format!(
            "6 0 obj<</Type/XObject/Subtype/Image/Width 2/Height 2/BitsPerComponent 8/ColorSpace/DeviceRGB/Filter/FlateDecode/Length {}>>stream\n",
            image_pixels.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&image_pixels);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    offsets[7] = buf.len();
    buf.extend_from_slice(b"7 0 obj<</Font<</F1 5 0 R>>/XObject<</Im1 6 0 R>>>>endobj\n");

    let startxref = buf.len();
    buf.extend_from_slice(b"xref\n0 8\n0000000000 65535 f \n");
    for off in offsets.iter().skip(1) {
        buf.extend_from_slice(format!("{off:010} 00000 n \n").as_bytes());
    }
    if extra_after_size5 {
        // A blank line between the last entry and the trailer keyword, as
        // some writers emit; the subsection loop has already consumed its
        // declared entry count, so this is read back at the header level and
        // skipped there rather than mistaken for another subsection or entry.
        buf.extend_from_slice(b"\n");
    }
    buf.extend_from_slice(b"trailer\n<</Size 8/Root 1 0 R>>\n");
    buf.extend_from_slice(format!("startxref\n{startxref}\n%%EOF").as_bytes());
    buf
}

#[test]
fn opens_and_reports_page_count_and_media_box() {
    let doc = Document::load_mem(build(false)).unwrap();
    assert_eq!(doc.get_num_pages(), 1);
    let page = doc.get_page(0).unwrap();
    assert_eq!(page.media_box.lower_left, (0.0, 0.0));
    assert_eq!(page.media_box.upper_right, (612.0, 792.0));
}

#[test]
fn extracts_text_run_with_resolved_font() {
    let doc = Document::load_mem(build(false)).unwrap();
    let page = doc.get_page(0).unwrap();
    let runs = page.text_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "Hi");
    assert_eq!(runs[0].size, 12.0);
    assert_eq!(runs[0].x, 100.0);
    assert_eq!(runs[0].y, 700.0);

    let font = page.resolve_font(&runs[0].font).unwrap();
    assert_eq!(font.base_font, "Helvetica");
    assert_eq!(font.subtype, "Type1");
}

#[test]
fn places_image_xobject_with_matrix_and_decoded_pixels() {
    let doc = Document::load_mem(build(false)).unwrap();
    let page = doc.get_page(0).unwrap();
    let images = page.image_xobjects();
    assert_eq!(images.len(), 1);
    let img = &images[0];
    assert_eq!((img.width, img.height), (2, 2));
    assert_eq!(img.bits_per_component, 8);
    assert_eq!(img.color_space, ColorSpace::DeviceRgb);
    assert_eq!(img.data.len(), 12);
    assert_eq!(img.matrix, [1.0, 0.0, 0.0, 1.0, 50.0, 50.0]);
}

#[test]
fn second_page_index_is_reported_as_not_found() {
    let doc = Document::load_mem(build(false)).unwrap();
    assert!(matches!(doc.get_page(1), Err(Error::PageNotFound(1))));
}

#[test]
fn tolerates_blank_line_before_trailer_keyword() {
    let doc = Document::load_mem(build(true)).unwrap();
    assert_eq!(doc.get_num_pages(), 1);
    let page = doc.get_page(0).unwrap();
    assert_eq!(page.text_runs()[0].text, "Hi");
}
