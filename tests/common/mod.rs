//! Fixture PDFs built with lopdf.

#![allow(dead_code)]

use lopdf::{dictionary, Document, Object, Stream};
use std::path::Path;

/// One page of a fixture: size in points and raw content operators.
pub struct FixturePage {
    pub width: i64,
    pub height: i64,
    pub content: String,
    pub crop_box: Option<[i64; 4]>,
    pub rotate: Option<i64>,
}

impl FixturePage {
    /// Page whose left half is filled black.
    pub fn half_black(width: i64, height: i64) -> Self {
        Self {
            width,
            height,
            content: format!("0 0 0 rg\n0 0 {} {} re\nf\n", width / 2, height),
            crop_box: None,
            rotate: None,
        }
    }

    pub fn with_crop_box(mut self, crop_box: [i64; 4]) -> Self {
        self.crop_box = Some(crop_box);
        self
    }

    pub fn with_rotation(mut self, degrees: i64) -> Self {
        self.rotate = Some(degrees);
        self
    }
}

pub fn build_pdf(pages: &[FixturePage]) -> Vec<u8> {
    let mut doc = Document::with_version("1.7");
    let pages_id = doc.new_object_id();

    let mut kids = Vec::new();
    for page in pages {
        let content_id = doc.add_object(Stream::new(
            lopdf::Dictionary::new(),
            page.content.clone().into_bytes(),
        ));
        let mut page_dict = dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "Resources" => dictionary! {},
            "MediaBox" => vec![
                Object::Integer(0),
                Object::Integer(0),
                Object::Integer(page.width),
                Object::Integer(page.height),
            ],
        };
        if let Some(crop_box) = page.crop_box {
            let values: Vec<Object> = crop_box.iter().map(|v| Object::Integer(*v)).collect();
            page_dict.set("CropBox", values);
        }
        if let Some(degrees) = page.rotate {
            page_dict.set("Rotate", degrees);
        }
        let page_id = doc.add_object(page_dict);
        kids.push(Object::Reference(page_id));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("save fixture");
    bytes
}

pub fn write_pdf(path: &Path, pages: &[FixturePage]) {
    std::fs::write(path, build_pdf(pages)).expect("write fixture");
}
