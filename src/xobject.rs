//! Image XObject extraction, backing [`crate::page::Page::image_xobjects`].

use std::collections::HashMap;

use crate::content::Token;
use crate::document::Document;
use crate::error::Result;

lazy_static::lazy_static! {
    static ref RE_WIDTH: regex::bytes::Regex = regex::bytes::Regex::new(r"/(?:Width|W)\s+(\d+)").unwrap();
    static ref RE_HEIGHT: regex::bytes::Regex = regex::bytes::Regex::new(r"/(?:Height|H)\s+(\d+)").unwrap();
    static ref RE_BPC: regex::bytes::Regex = regex::bytes::Regex::new(r"/(?:BitsPerComponent|BPC)\s+(\d+)").unwrap();
    static ref RE_COLOR_SPACE: regex::bytes::Regex = regex::bytes::Regex::new(r"/(?:ColorSpace|CS)\s*/(\w+)").unwrap();
    static ref RE_INTERPOLATE: regex::bytes::Regex = regex::bytes::Regex::new(r"/(?:Interpolate|I)\s+(true|false)").unwrap();
    static ref RE_SUBTYPE: regex::bytes::Regex = regex::bytes::Regex::new(r"/Subtype\s*/(\w+)").unwrap();
}

/// The color space named on an image XObject's dictionary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColorSpace {
    DeviceRgb,
    DeviceCmyk,
    Other(String),
}

/// The 6-element current transformation matrix captured from the `cm`
/// operator inside the `q ... cm ... Do ... Q` block that places an image.
pub type Matrix = [f32; 6];

/// A raster image XObject: its declared geometry/color space and decoded
/// bytes, placed by a matrix captured from the content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageXObject {
    pub width: u32,
    pub height: u32,
    pub bits_per_component: u8,
    pub color_space: ColorSpace,
    pub interpolate: bool,
    pub data: Vec<u8>,
    pub matrix: Matrix,
}

const IDENTITY: Matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];

/// Resolve every `/Subtype /Image` entry of a `/Resources /XObject`
/// sub-dictionary, with an identity placement matrix (overwritten per
/// occurrence by [`place_images`]).
pub(crate) fn resolve_images(doc: &Document, resources_dict: &[u8]) -> Result<HashMap<String, ImageXObject>> {
    let mut out = HashMap::new();
    if resources_dict.is_empty() {
        return Ok(out);
    }

    for (name, offset) in doc.index().resolve_named_ref_map("XObject", resources_dict)? {
        let dict = doc.dict_text_at_offset(offset)?;
        let is_image = RE_SUBTYPE.captures(dict).map(|c| &c[1] == b"Image").unwrap_or(false);
        if !is_image {
            continue;
        }

        let width = int_field(&RE_WIDTH, dict).unwrap_or(0);
        let height = int_field(&RE_HEIGHT, dict).unwrap_or(0);
        let bits_per_component = int_field(&RE_BPC, dict).unwrap_or(8) as u8;
        let color_space = RE_COLOR_SPACE
            .captures(dict)
            .map(|c| match &c[1] {
                b"DeviceRGB" => ColorSpace::DeviceRgb,
                b"DeviceCMYK" => ColorSpace::DeviceCmyk,
                other => ColorSpace::Other(String::from_utf8_lossy(other).into_owned()),
            })
            .unwrap_or(ColorSpace::Other("Unknown".to_string()));
        let interpolate = RE_INTERPOLATE.captures(dict).map(|c| &c[1] == b"true").unwrap_or(false);
        let data = doc.stream_bytes_at_offset(offset)?;

        out.insert(
            name,
            ImageXObject { width, height, bits_per_component, color_space, interpolate, data, matrix: IDENTITY },
        );
    }
    Ok(out)
}

fn int_field(re: &regex::bytes::Regex, dict: &[u8]) -> Option<u32> {
    re.captures(dict).and_then(|c| std::str::from_utf8(&c[1]).ok()).and_then(|s| s.parse().ok())
}

/// Scan a content stream for `q ... cm ... /Name Do ... Q` blocks, emitting
/// one [`ImageXObject`] per `Do` invocation with the CTM captured from the
/// most recent `cm` since the enclosing `q`.
pub(crate) fn place_images(content: &[u8], images: &HashMap<String, ImageXObject>) -> Vec<ImageXObject> {
    let tokens = crate::content::tokenize(content);
    let mut placed = Vec::new();
    let mut operands: Vec<f32> = Vec::new();
    let mut pending_name: Option<String> = None;
    let mut matrix_stack: Vec<Matrix> = vec![IDENTITY];
    let mut current = IDENTITY;

    for token in tokens {
        match token {
            Token::Num(n) => operands.push(n),
            Token::Name(n) => pending_name = Some(n),
            Token::Op(op) => {
                match op.as_str() {
                    "q" => matrix_stack.push(current),
                    "Q" => {
                        if let Some(m) = matrix_stack.pop() {
                            current = m;
                        }
                    }
                    "cm" => {
                        if operands.len() == 6 {
                            current = [operands[0], operands[1], operands[2], operands[3], operands[4], operands[5]];
                        }
                    }
                    "Do" => {
                        if let Some(name) = pending_name.take() {
                            if let Some(image) = images.get(&name) {
                                let mut placed_image = image.clone();
                                placed_image.matrix = current;
                                placed.push(placed_image);
                            }
                        }
                    }
                    _ => {}
                }
                operands.clear();
            }
            _ => {}
        }
    }

    placed
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_image() -> ImageXObject {
        ImageXObject {
            width: 10,
            height: 10,
            bits_per_component: 8,
            color_space: ColorSpace::DeviceRgb,
            interpolate: false,
            data: vec![0; 300],
            matrix: IDENTITY,
        }
    }

    #[test]
    fn places_image_with_captured_matrix() {
        let mut images = HashMap::new();
        images.insert("Im1".to_string(), sample_image());
        let content = b"q 2 0 0 2 50 60 cm /Im1 Do Q";
        let placed = place_images(content, &images);
        assert_eq!(placed.len(), 1);
        assert_eq!(placed[0].matrix, [2.0, 0.0, 0.0, 2.0, 50.0, 60.0]);
    }

    #[test]
    fn q_restores_prior_matrix_after_nested_block() {
        let mut images = HashMap::new();
        images.insert("Im1".to_string(), sample_image());
        let content = b"1 0 0 1 10 10 cm q 2 0 0 2 0 0 cm Q /Im1 Do";
        let placed = place_images(content, &images);
        assert_eq!(placed[0].matrix, [1.0, 0.0, 0.0, 1.0, 10.0, 10.0]);
    }

    #[test]
    fn unresolved_xobject_name_is_skipped() {
        let images = HashMap::new();
        let content = b"q 1 0 0 1 0 0 cm /Missing Do Q";
        assert!(place_images(content, &images).is_empty());
    }
}
