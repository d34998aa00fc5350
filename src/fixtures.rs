use std::io::Cursor;

use image::{DynamicImage, ImageFormat, Rgb, RgbImage, Rgba, RgbaImage};

use crate::model::{Attachment, CaseDocument, DisplayMode, Exhibit};

pub(crate) fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([120, 130, 140]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Png)
}

pub(crate) fn translucent_png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbaImage::from_pixel(width, height, Rgba([200, 40, 40, 128]));
    encode(DynamicImage::ImageRgba8(img), ImageFormat::Png)
}

pub(crate) fn jpeg_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = RgbImage::from_pixel(width, height, Rgb([90, 160, 60]));
    encode(DynamicImage::ImageRgb8(img), ImageFormat::Jpeg)
}

fn encode(img: DynamicImage, format: ImageFormat) -> Vec<u8> {
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, format).expect("encode fixture image");
    out.into_inner()
}

pub(crate) fn words(count: usize) -> String {
    const POOL: [&str; 10] = [
        "assessed", "value", "exceeds", "comparable", "sales", "within", "the", "same",
        "subdivision", "market",
    ];
    (0..count)
        .map(|i| POOL[i % POOL.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub(crate) fn photo_exhibit(title: &str, description: &str, bytes: Vec<u8>, mime: &str) -> Exhibit {
    Exhibit {
        title: title.to_string(),
        description: description.to_string(),
        display_mode: DisplayMode::Photo,
        attachments: vec![Attachment {
            image_bytes: bytes,
            mime_type: mime.to_string(),
        }],
    }
}

pub(crate) fn document_exhibit(
    title: &str,
    description: &str,
    bytes: Vec<u8>,
    mime: &str,
) -> Exhibit {
    Exhibit {
        display_mode: DisplayMode::Document,
        ..photo_exhibit(title, description, bytes, mime)
    }
}

pub(crate) fn case_with(letter_words: usize, exhibits: Vec<Exhibit>) -> CaseDocument {
    CaseDocument {
        letter_text: words(letter_words),
        property: None,
        exhibits,
    }
}
