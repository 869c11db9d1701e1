//! Page layout inspection: page sizes and where image XObjects are painted.
//!
//! Walks each page's content stream tracking the current transformation
//! matrix through `q`/`Q`/`cm`, and records the bounding box of every image
//! drawn with `Do`. Form XObjects are not descended into.

use crate::error::{RescaleError, Result};
use crate::geometry::Rect;
use lopdf::content::Content;
use lopdf::{Dictionary, Document, Object, ObjectId, Stream};
use log::warn;
use std::collections::HashMap;

/// An image painted on a page
#[derive(Debug, Clone, PartialEq)]
pub struct PlacedImage {
    /// Resource name used by the content stream
    pub name: String,
    pub object_id: ObjectId,
    /// Width in pixels
    pub pixel_width: u32,
    /// Height in pixels
    pub pixel_height: u32,
    /// Filter/encoding
    pub filter: String,
    /// Bounding box on the page in points
    pub rect: Rect,
}

/// Size and images of one page
#[derive(Debug, Clone, PartialEq)]
pub struct PageLayout {
    pub page_number: u32,
    pub width: f32,
    pub height: f32,
    pub images: Vec<PlacedImage>,
}

/// 2D transformation matrix [a, b, c, d, e, f]
/// Represents: | a b 0 |
///             | c d 0 |
///             | e f 1 |
#[derive(Debug, Clone, Copy)]
struct Matrix {
    a: f32,
    b: f32,
    c: f32,
    d: f32,
    e: f32,
    f: f32,
}

impl Matrix {
    fn identity() -> Self {
        Matrix {
            a: 1.0,
            b: 0.0,
            c: 0.0,
            d: 1.0,
            e: 0.0,
            f: 0.0,
        }
    }

    fn from_operands(operands: &[Object]) -> Option<Self> {
        if operands.len() != 6 {
            return None;
        }
        let mut v = [0.0f32; 6];
        for (slot, operand) in v.iter_mut().zip(operands) {
            *slot = operand.as_float().ok()?;
        }
        Some(Matrix {
            a: v[0],
            b: v[1],
            c: v[2],
            d: v[3],
            e: v[4],
            f: v[5],
        })
    }

    /// Concatenate another matrix: self * other
    fn concat(&self, other: &Matrix) -> Matrix {
        Matrix {
            a: self.a * other.a + self.b * other.c,
            b: self.a * other.b + self.b * other.d,
            c: self.c * other.a + self.d * other.c,
            d: self.c * other.b + self.d * other.d,
            e: self.e * other.a + self.f * other.c + other.e,
            f: self.e * other.b + self.f * other.d + other.f,
        }
    }

    fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of the unit square, which is where images are painted.
    fn unit_square_bounds(&self) -> Rect {
        let corners = [
            self.apply(0.0, 0.0),
            self.apply(1.0, 0.0),
            self.apply(0.0, 1.0),
            self.apply(1.0, 1.0),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f32::INFINITY, f32::min);
        let max_x = corners.iter().map(|p| p.0).fold(f32::NEG_INFINITY, f32::max);
        let min_y = corners.iter().map(|p| p.1).fold(f32::INFINITY, f32::min);
        let max_y = corners.iter().map(|p| p.1).fold(f32::NEG_INFINITY, f32::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }
}

/// Look up a page attribute, following the `Parent` chain for inherited keys.
fn inherited<'a>(doc: &'a Document, page: &'a Dictionary, key: &[u8]) -> Option<&'a Object> {
    let mut current = page;
    // Bounded to survive Parent cycles
    for _ in 0..32 {
        if let Ok(value) = current.get(key) {
            return resolve(doc, value);
        }
        let parent_id = current.get(b"Parent").ok()?.as_reference().ok()?;
        current = doc.get_dictionary(parent_id).ok()?;
    }
    None
}

/// Resolve a reference to get the actual object
fn resolve<'a>(doc: &'a Document, obj: &'a Object) -> Option<&'a Object> {
    match obj {
        Object::Reference(id) => doc.get_object(*id).ok(),
        _ => Some(obj),
    }
}

fn media_box(doc: &Document, page: &Dictionary) -> (f32, f32) {
    let values: Vec<f32> = inherited(doc, page, b"MediaBox")
        .and_then(|obj| obj.as_array().ok())
        .map(|arr| arr.iter().filter_map(|v| v.as_float().ok()).collect())
        .unwrap_or_default();

    if values.len() == 4 {
        ((values[2] - values[0]).abs(), (values[3] - values[1]).abs())
    } else {
        // US Letter is the PDF default
        (612.0, 792.0)
    }
}

/// Get XObject names from page resources
fn xobjects(doc: &Document, page: &Dictionary) -> HashMap<Vec<u8>, ObjectId> {
    let mut result = HashMap::new();

    let xobj_dict = inherited(doc, page, b"Resources")
        .and_then(|res| res.as_dict().ok())
        .and_then(|res| res.get(b"XObject").ok())
        .and_then(|x| resolve(doc, x))
        .and_then(|x| x.as_dict().ok());

    if let Some(xobj_dict) = xobj_dict {
        for (name, value) in xobj_dict.iter() {
            if let Object::Reference(obj_id) = value {
                result.insert(name.clone(), *obj_id);
            }
        }
    }

    result
}

fn stream_filter(stream: &Stream) -> String {
    stream
        .dict
        .get(b"Filter")
        .ok()
        .and_then(|f| match f {
            Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
            Object::Array(arr) => arr.first().and_then(|f| match f {
                Object::Name(n) => Some(String::from_utf8_lossy(n).to_string()),
                _ => None,
            }),
            _ => None,
        })
        .unwrap_or_else(|| "raw".to_string())
}

fn dimension(stream: &Stream, key: &[u8]) -> u32 {
    stream
        .dict
        .get(key)
        .ok()
        .and_then(|v| v.as_i64().ok())
        .unwrap_or(0)
        .max(0) as u32
}

fn placed_images(doc: &Document, page_id: ObjectId, page: &Dictionary) -> Vec<PlacedImage> {
    let content_bytes = match doc.get_page_content(page_id) {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Could not read content of page {:?}: {}", page_id, e);
            return Vec::new();
        }
    };
    let content = match Content::decode(&content_bytes) {
        Ok(content) => content,
        Err(e) => {
            warn!("Could not parse content of page {:?}: {}", page_id, e);
            return Vec::new();
        }
    };

    let names = xobjects(doc, page);
    let mut images = Vec::new();
    let mut ctm = Matrix::identity();
    let mut stack: Vec<Matrix> = Vec::new();

    for op in &content.operations {
        match op.operator.as_str() {
            "q" => stack.push(ctm),
            "Q" => {
                if let Some(saved) = stack.pop() {
                    ctm = saved;
                }
            }
            "cm" => {
                if let Some(m) = Matrix::from_operands(&op.operands) {
                    ctm = m.concat(&ctm);
                }
            }
            "Do" => {
                let Some(name) = op.operands.first().and_then(|o| o.as_name().ok()) else {
                    continue;
                };
                let Some(&object_id) = names.get(name) else {
                    continue;
                };
                let Ok(Object::Stream(stream)) = doc.get_object(object_id) else {
                    continue;
                };
                let is_image = stream
                    .dict
                    .get(b"Subtype")
                    .and_then(|s| s.as_name())
                    .map(|s| s == b"Image")
                    .unwrap_or(false);
                if !is_image {
                    continue;
                }

                images.push(PlacedImage {
                    name: String::from_utf8_lossy(name).to_string(),
                    object_id,
                    pixel_width: dimension(stream, b"Width"),
                    pixel_height: dimension(stream, b"Height"),
                    filter: stream_filter(stream),
                    rect: ctm.unit_square_bounds(),
                });
            }
            _ => {}
        }
    }

    images
}

/// Describe every page of a PDF: its size and the images painted on it.
pub fn inspect_pdf_bytes(pdf_bytes: &[u8]) -> Result<Vec<PageLayout>> {
    let doc = Document::load_mem(pdf_bytes).map_err(|e| RescaleError::Load(e.to_string()))?;

    let mut layouts = Vec::new();
    for (page_number, page_id) in doc.get_pages() {
        let page = doc
            .get_dictionary(page_id)
            .map_err(|e| RescaleError::Load(format!("page {}: {}", page_number, e)))?;
        let (width, height) = media_box(&doc, page);

        layouts.push(PageLayout {
            page_number,
            width,
            height,
            images: placed_images(&doc, page_id, page),
        });
    }

    Ok(layouts)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::OutputDocument;
    use crate::geometry::PageTransform;
    use crate::options::ImageEncoding;
    use image::{Rgb, RgbImage};

    #[test]
    fn concat_applies_cm_in_pdf_order() {
        // translate then scale, as `2 0 0 2 0 0 cm` inside `1 0 0 1 10 20 cm`
        let operands = |values: [i64; 6]| -> Vec<Object> {
            values.iter().map(|v| Object::Integer(*v)).collect()
        };
        let translate = Matrix::from_operands(&operands([1, 0, 0, 1, 10, 20])).unwrap();
        let scale = Matrix::from_operands(&operands([2, 0, 0, 2, 0, 0])).unwrap();

        let ctm = scale.concat(&translate.concat(&Matrix::identity()));
        assert_eq!(ctm.unit_square_bounds(), Rect::new(10.0, 20.0, 2.0, 2.0));
    }

    #[test]
    fn reports_page_size_and_image_placement() {
        let transform = PageTransform::new(400.0, 300.0, 0.75, 72);
        let raster = RgbImage::from_pixel(300, 225, Rgb([0, 0, 255]));

        let mut output = OutputDocument::new();
        output
            .add_page(&transform, &raster, ImageEncoding::Flate, 85)
            .unwrap();
        output
            .add_page(&transform, &raster, ImageEncoding::Jpeg, 60)
            .unwrap();
        let bytes = output.finish(true).unwrap();

        let layouts = inspect_pdf_bytes(&bytes).unwrap();
        assert_eq!(layouts.len(), 2);

        let first = &layouts[0];
        assert_eq!(first.page_number, 1);
        assert_eq!((first.width, first.height), (400.0, 300.0));
        assert_eq!(first.images.len(), 1);

        let image = &first.images[0];
        assert_eq!(image.name, "Im0");
        assert_eq!((image.pixel_width, image.pixel_height), (300, 225));
        assert_eq!(image.filter, "FlateDecode");
        assert!((image.rect.x - 50.0).abs() < 0.01);
        assert!((image.rect.y - 37.5).abs() < 0.01);
        assert!((image.rect.width - 300.0).abs() < 0.01);
        assert!((image.rect.height - 225.0).abs() < 0.01);

        assert_eq!(layouts[1].images[0].filter, "DCTDecode");
    }

    #[test]
    fn rejects_non_pdf_bytes() {
        assert!(matches!(
            inspect_pdf_bytes(b"hello"),
            Err(RescaleError::Load(_))
        ));
    }
}
