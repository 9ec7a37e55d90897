//! End-to-end coverage of `/ObjStm` expansion reached through a full
//! `Document::load_mem` call: a cross-reference stream with `Compressed`
//! (type 2) entries pointing into a packed object stream.

mod utils;
use utils::zlib;

use pdf_xref_core::Document;

fn be2(offset: usize) -> (u8, u8) {
    ((offset >> 8) as u8, offset as u8)
}

#[test]
fn resolves_catalog_and_pages_packed_in_an_object_stream() {
    // Catalog (object 4) and Pages (object 5) live only inside the
    // /ObjStm at object 3; the page (6) and its content (7) are ordinary
    // textual objects; the xref stream itself is object 8.
    let obj4 = b"<</Type/Catalog/Pages 5 0 R>>";
    let obj5 = b"<</Type/Pages/Kids[6 0 R]/Count 1>>";
    let header = format!("4 0 5 {}", obj4.len());
    let mut plain = header.into_bytes();
    plain.push(b'\n');
    let first = plain.len();
    plain.extend_from_slice(obj4);
    plain.extend_from_slice(obj5);
    let compressed_objstm = zlib(&plain);

    let mut buf = Vec::new();
    buf.extend_from_slice(b"%PDF-1.5\n");

    let off3 = buf.len();
    buf.extend_from_slice(
        format!(
            "3 0 obj<</Type/ObjStm/N 2/First {first}/Filter/FlateDecode/Length {}>>stream\n",
            compressed_objstm.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&compressed_objstm);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    let off6 = buf.len();
    buf.extend_from_slice(
        b"6 0 obj<</Type/Page/Parent 5 0 R/MediaBox[0 0 400 500]/Contents 7 0 R/Resources<<>>>>endobj\n",
    );

    let off7 = buf.len();
    let content = b"BT /F1 10 Tf 20 30 Td (hello) Tj ET";
    buf.extend_from_slice(format!("7 0 obj<</Length {}>>stream\n", content.len()).as_bytes());
    buf.extend_from_slice(content);
    buf.extend_from_slice(b"\nendstream\nendobj\n");

    let self_offset = buf.len();

    let mut rows = Vec::new();
    rows.extend_from_slice(&[0, 0, 0, 0]); // object 0: free
    rows.extend_from_slice(&[0, 0, 0, 0]); // object 1: unused, free
    rows.extend_from_slice(&[0, 0, 0, 0]); // object 2: unused, free
    {
        let (hi, lo) = be2(off3);
        rows.extend_from_slice(&[1, hi, lo, 0]); // object 3: the ObjStm container
    }
    rows.extend_from_slice(&[2, 0, 3, 0]); // object 4: compressed in container 3, index 0
    rows.extend_from_slice(&[2, 0, 3, 1]); // object 5: compressed in container 3, index 1
    {
        let (hi, lo) = be2(off6);
        rows.extend_from_slice(&[1, hi, lo, 0]); // object 6: the page
    }
    {
        let (hi, lo) = be2(off7);
        rows.extend_from_slice(&[1, hi, lo, 0]); // object 7: the content stream
    }
    {
        let (hi, lo) = be2(self_offset);
        rows.extend_from_slice(&[1, hi, lo, 0]); // object 8: the xref stream itself
    }

    let body = zlib(&rows);
    buf.extend_from_slice(
        format!(
            "8 0 obj<</Type/XRef/Size 9/W[1 2 1]/Root 4 0 R/Filter/FlateDecode/Length {}>>stream\n",
            body.len()
        )
        .as_bytes(),
    );
    buf.extend_from_slice(&body);
    buf.extend_from_slice(b"\nendstream\nendobj\n");
    buf.extend_from_slice(format!("startxref\n{self_offset}\n%%EOF").as_bytes());

    let doc = Document::load_mem(buf).unwrap();
    assert_eq!(doc.get_num_pages(), 1);
    let page = doc.get_page(0).unwrap();
    assert_eq!(page.media_box.upper_right, (400.0, 500.0));
    let runs = page.text_runs();
    assert_eq!(runs.len(), 1);
    assert_eq!(runs[0].text, "hello");
}
