//! PDF export: one square page per image, cover first, then pages in order.
//!
//! Rendering decodes and re-compresses every image, so callers on the async runtime
//! must run it inside `tokio::task::spawn_blocking`.

use std::io::Write;

use anyhow::{bail, Context};
use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
use flate2::{write::ZlibEncoder, Compression};
use image::{Rgb, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream};

use crate::errors::AppError;
use crate::models::book::ColoringBook;

/// Page edge in points (1024 px at 96 dpi).
const PAGE_SIZE_PT: i64 = 768;
const IMAGE_RESOURCE: &str = "Im0";

pub fn render_pdf(book: &ColoringBook) -> Result<Vec<u8>, AppError> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let images = std::iter::once(book.cover_image.as_str())
        .chain(book.pages.iter().map(|p| p.image_data.as_str()));

    let mut kids: Vec<Object> = Vec::new();
    for (index, data_uri) in images.enumerate() {
        let image = decode_data_uri(data_uri)
            .with_context(|| format!("Failed to decode image {index} for PDF export"))?;
        let page_id = add_image_page(&mut doc, pages_id, &image)?;
        kids.push(page_id.into());
    }

    let page_count = kids.len() as i64;
    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => page_count,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_SIZE_PT),
            Object::Integer(PAGE_SIZE_PT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).context("Failed to serialize PDF")?;
    Ok(buf)
}

/// `{child}_{theme}_MagicBook.pdf`, with whitespace runs collapsed to `_`.
pub fn pdf_file_name(book: &ColoringBook) -> String {
    format!(
        "{}_{}_MagicBook.pdf",
        filename_part(&book.child_name),
        filename_part(&book.theme)
    )
}

/// `Content-Disposition` value for a PDF download (RFC 6266).
///
/// The quoted `filename` is an ASCII fallback; `filename*` carries the exact UTF-8 name.
pub fn content_disposition(file_name: &str) -> String {
    let ascii: String = file_name
        .chars()
        .map(|c| if c.is_ascii() { c } else { '_' })
        .collect();
    format!(
        "attachment; filename=\"{ascii}\"; filename*=UTF-8''{}",
        urlencoding::encode(file_name)
    )
}

fn filename_part(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !c.is_control() && !matches!(c, '"' | '/' | '\\'))
        .collect()
}

fn add_image_page(
    doc: &mut Document,
    pages_id: ObjectId,
    image: &RgbImage,
) -> anyhow::Result<ObjectId> {
    let image_id = doc.add_object(image_xobject(image)?);

    // Scale the unit-square image to fill the page.
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    Object::Integer(PAGE_SIZE_PT),
                    Object::Integer(0),
                    Object::Integer(0),
                    Object::Integer(PAGE_SIZE_PT),
                    Object::Integer(0),
                    Object::Integer(0),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_RESOURCE.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));

    Ok(doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => dictionary! {
            "XObject" => dictionary! {
                IMAGE_RESOURCE => image_id,
            },
        },
    }))
}

fn image_xobject(image: &RgbImage) -> anyhow::Result<Stream> {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(image.as_raw())?;
    let data = encoder.finish()?;

    let dict = dictionary! {
        "Type" => "XObject",
        "Subtype" => "Image",
        "Width" => image.width() as i64,
        "Height" => image.height() as i64,
        "ColorSpace" => "DeviceRGB",
        "BitsPerComponent" => 8_i64,
        "Filter" => "FlateDecode",
    };
    Ok(Stream::new(dict, data))
}

fn decode_data_uri(uri: &str) -> anyhow::Result<RgbImage> {
    let (header, payload) = uri.split_once(',').context("image is not a data URI")?;
    if !header.starts_with("data:") || !header.ends_with(";base64") {
        bail!("unsupported data URI header: {header}");
    }
    let bytes = BASE64.decode(payload.trim())?;
    Ok(flatten_on_white(&image::load_from_memory(&bytes)?.to_rgba8()))
}

/// Composites onto a white page so transparent areas print as paper, not black.
fn flatten_on_white(image: &RgbaImage) -> RgbImage {
    RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let alpha = u16::from(a);
        let blend = |c: u8| ((u16::from(c) * alpha + 255 * (255 - alpha) + 127) / 255) as u8;
        Rgb([blend(r), blend(g), blend(b)])
    })
}
