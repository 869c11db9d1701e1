//! Output document writer: same-size pages with one placed raster each.

use crate::error::{RescaleError, Result};
use crate::geometry::PageTransform;
use crate::options::ImageEncoding;
use flate2::write::ZlibEncoder;
use flate2::Compression;
use image::RgbImage;
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Dictionary, Document, Object, ObjectId, Stream};
use std::io::Write;

/// Resource name of the page raster in every output page.
pub const IMAGE_RESOURCE_NAME: &str = "Im0";

/// Encode an RGB raster as a lossless FlateDecode image stream
fn encode_flate_stream(img: &RgbImage) -> Result<Stream> {
    let (width, height) = img.dimensions();

    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder
        .write_all(img.as_raw())
        .map_err(|e| RescaleError::Encode(format!("Failed to compress RGB data: {}", e)))?;
    let compressed = encoder
        .finish()
        .map_err(|e| RescaleError::Encode(format!("Failed to finish compression: {}", e)))?;

    let mut dict = image_dictionary(width, height);
    dict.set("Filter", Object::Name(b"FlateDecode".to_vec()));
    dict.set("Length", Object::Integer(compressed.len() as i64));

    Ok(Stream::new(dict, compressed).with_compression(false))
}

/// Encode an RGB raster as a JPEG (DCTDecode) image stream
fn encode_jpeg_stream(img: &RgbImage, quality: u8) -> Result<Stream> {
    let (width, height) = img.dimensions();
    if width > u16::MAX as u32 || height > u16::MAX as u32 {
        return Err(RescaleError::Encode(format!(
            "{}x{} px exceeds the JPEG size limit; lower the DPI or use flate encoding",
            width, height
        )));
    }

    let mut jpeg_bytes = Vec::new();
    let mut encoder = jpeg_encoder::Encoder::new(&mut jpeg_bytes, quality);
    encoder.set_sampling_factor(jpeg_encoder::SamplingFactor::R_4_2_0);
    encoder
        .encode(
            img.as_raw(),
            width as u16,
            height as u16,
            jpeg_encoder::ColorType::Rgb,
        )
        .map_err(|e| RescaleError::Encode(format!("Failed to encode JPEG: {}", e)))?;

    let mut dict = image_dictionary(width, height);
    dict.set("Filter", Object::Name(b"DCTDecode".to_vec()));
    dict.set("Length", Object::Integer(jpeg_bytes.len() as i64));

    Ok(Stream::new(dict, jpeg_bytes).with_compression(false))
}

fn image_dictionary(width: u32, height: u32) -> Dictionary {
    let mut dict = Dictionary::new();
    dict.set("Type", Object::Name(b"XObject".to_vec()));
    dict.set("Subtype", Object::Name(b"Image".to_vec()));
    dict.set("Width", Object::Integer(width as i64));
    dict.set("Height", Object::Integer(height as i64));
    dict.set("ColorSpace", Object::Name(b"DeviceRGB".to_vec()));
    dict.set("BitsPerComponent", Object::Integer(8));
    dict
}

/// Content stream that paints the page raster into the target rectangle.
fn placement_content(transform: &PageTransform) -> Result<Vec<u8>> {
    let target = transform.target;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    target.width.into(),
                    0.0f32.into(),
                    0.0f32.into(),
                    target.height.into(),
                    target.x.into(),
                    target.y.into(),
                ],
            ),
            Operation::new(
                "Do",
                vec![Object::Name(IMAGE_RESOURCE_NAME.as_bytes().to_vec())],
            ),
            Operation::new("Q", vec![]),
        ],
    };

    content
        .encode()
        .map_err(|e| RescaleError::Save(format!("Failed to encode content stream: {}", e)))
}

/// PDF being assembled page by page
pub struct OutputDocument {
    doc: Document,
    pages_id: ObjectId,
    page_ids: Vec<ObjectId>,
}

impl Default for OutputDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl OutputDocument {
    pub fn new() -> Self {
        let mut doc = Document::with_version("1.7");
        let pages_id = doc.new_object_id();

        Self {
            doc,
            pages_id,
            page_ids: Vec::new(),
        }
    }

    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Append a page the size of `transform`'s page with `raster` placed in
    /// its target rectangle.
    pub fn add_page(
        &mut self,
        transform: &PageTransform,
        raster: &RgbImage,
        encoding: ImageEncoding,
        quality: u8,
    ) -> Result<ObjectId> {
        let image_stream = match encoding {
            ImageEncoding::Flate => encode_flate_stream(raster)?,
            ImageEncoding::Jpeg => encode_jpeg_stream(raster, quality)?,
        };
        let image_id = self.doc.add_object(image_stream);

        let content_id = self
            .doc
            .add_object(Stream::new(Dictionary::new(), placement_content(transform)?));

        let page_id = self.doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => self.pages_id,
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                transform.page_width.into(),
                transform.page_height.into(),
            ],
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_RESOURCE_NAME => image_id },
            },
            "Contents" => content_id,
        });

        self.page_ids.push(page_id);
        Ok(page_id)
    }

    /// Close the page tree and serialize the document.
    pub fn finish(mut self, compress_streams: bool) -> Result<Vec<u8>> {
        if self.page_ids.is_empty() {
            return Err(RescaleError::EmptyDocument);
        }

        let kids: Vec<Object> = self.page_ids.iter().map(|id| Object::Reference(*id)).collect();
        let pages = dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => self.page_ids.len() as i64,
        };
        self.doc.objects.insert(self.pages_id, Object::Dictionary(pages));

        let catalog_id = self.doc.add_object(dictionary! {
            "Type" => "Catalog",
            "Pages" => self.pages_id,
        });
        self.doc.trailer.set("Root", catalog_id);

        if compress_streams {
            self.doc.compress();
        }

        let mut output_bytes = Vec::new();
        self.doc
            .save_to(&mut output_bytes)
            .map_err(|e| RescaleError::Save(e.to_string()))?;

        Ok(output_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn solid(width: u32, height: u32) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([200, 30, 30]))
    }

    fn image_stream_of_first_page(doc: &Document) -> Stream {
        let page_id = *doc.get_pages().get(&1).unwrap();
        let page = doc.get_dictionary(page_id).unwrap();
        let resources = page.get(b"Resources").unwrap().as_dict().unwrap();
        let xobjects = resources.get(b"XObject").unwrap().as_dict().unwrap();
        let image_id = xobjects
            .get(IMAGE_RESOURCE_NAME.as_bytes())
            .unwrap()
            .as_reference()
            .unwrap();
        doc.get_object(image_id).unwrap().as_stream().unwrap().clone()
    }

    #[test]
    fn empty_document_is_rejected() {
        let output = OutputDocument::new();
        assert!(matches!(output.finish(true), Err(RescaleError::EmptyDocument)));
    }

    #[test]
    fn page_keeps_input_size_and_flate_image() {
        let transform = PageTransform::new(300.0, 200.0, 0.8, 72);
        let mut output = OutputDocument::new();
        output
            .add_page(&transform, &solid(240, 160), ImageEncoding::Flate, 85)
            .unwrap();
        assert_eq!(output.page_count(), 1);

        let bytes = output.finish(true).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        assert_eq!(doc.get_pages().len(), 1);

        let page_id = *doc.get_pages().get(&1).unwrap();
        let media_box = doc
            .get_dictionary(page_id)
            .unwrap()
            .get(b"MediaBox")
            .unwrap()
            .as_array()
            .unwrap()
            .clone();
        assert_eq!(media_box[2].as_float().unwrap(), 300.0);
        assert_eq!(media_box[3].as_float().unwrap(), 200.0);

        let stream = image_stream_of_first_page(&doc);
        assert_eq!(stream.dict.get(b"Width").unwrap().as_i64().unwrap(), 240);
        assert_eq!(stream.dict.get(b"Height").unwrap().as_i64().unwrap(), 160);
        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"FlateDecode".as_slice()
        );
    }

    #[test]
    fn jpeg_encoding_produces_dct_stream() {
        let transform = PageTransform::new(100.0, 100.0, 0.5, 144);
        let mut output = OutputDocument::new();
        output
            .add_page(&transform, &solid(100, 100), ImageEncoding::Jpeg, 80)
            .unwrap();

        let bytes = output.finish(true).unwrap();
        let doc = Document::load_mem(&bytes).unwrap();
        let stream = image_stream_of_first_page(&doc);

        assert_eq!(
            stream.dict.get(b"Filter").unwrap().as_name().unwrap(),
            b"DCTDecode".as_slice()
        );
        // JPEG SOI marker survives untouched
        assert_eq!(&stream.content[..2], &[0xFF, 0xD8]);
    }

    #[test]
    fn placement_content_uses_target_rectangle() {
        let transform = PageTransform::new(200.0, 100.0, 0.5, 72);
        let content = Content::decode(&placement_content(&transform).unwrap()).unwrap();

        let cm = content
            .operations
            .iter()
            .find(|op| op.operator == "cm")
            .unwrap();
        let values: Vec<f32> = cm.operands.iter().map(|o| o.as_float().unwrap()).collect();
        assert_eq!(values, vec![100.0, 0.0, 0.0, 50.0, 50.0, 25.0]);
    }
}
