//! Encodes paginated bitmaps into a PDF with `lopdf`.

use image::codecs::jpeg::JpegEncoder;
use image::{ExtendedColorType, RgbImage, RgbaImage};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document as PdfDocument, Object, ObjectId, Stream, StringFormat};
use serde::{Deserialize, Serialize};

use super::paginate::{mm_to_pt, Pagination};
use crate::diagnostics::{self, Category};
use crate::{Error, Result};

const IMAGE_NAME: &str = "Im0";

/// How page images are stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PageImageMode {
    /// One image object referenced by every page, shifted per page.
    #[default]
    Shared,
    /// A cropped image per page.
    Sliced,
}

/// Document information dictionary entries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PdfMetadata {
    pub title: String,
    pub subject: String,
    pub creator: String,
    pub producer: String,
}

impl PdfMetadata {
    /// Metadata for a file saved as `filename`; the title drops a trailing
    /// `.pdf`.
    pub fn for_filename(filename: &str, subject: &str, creator: &str, producer: &str) -> Self {
        let title = filename.strip_suffix(".pdf").unwrap_or(filename);
        PdfMetadata {
            title: title.to_string(),
            subject: subject.to_string(),
            creator: creator.to_string(),
            producer: producer.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AssembleOptions {
    pub jpeg_quality: u8,
    pub metadata: PdfMetadata,
    pub mode: PageImageMode,
}

/// Build the PDF for `pagination`.
///
/// A failed attempt is retried once from a half-resolution bitmap with the
/// same page geometry; the second failure is returned.
pub fn assemble(pagination: &Pagination, options: &AssembleOptions) -> Result<Vec<u8>> {
    match build_pdf(pagination, options) {
        Ok(bytes) => Ok(bytes),
        Err(e) => {
            diagnostics::emit(Category::Assembly, &format!("retrying at half resolution: {}", e));
            build_pdf(&pagination.downscaled(), options)
        }
    }
}

/// JPEG bytes of `image` composited onto white.
pub fn encode_jpeg(image: &RgbaImage, quality: u8) -> Result<Vec<u8>> {
    let rgb = RgbImage::from_fn(image.width(), image.height(), |x, y| {
        let [r, g, b, a] = image.get_pixel(x, y).0;
        let a = a as u32;
        let over_white = |c: u8| ((c as u32 * a + 255 * (255 - a) + 127) / 255) as u8;
        image::Rgb([over_white(r), over_white(g), over_white(b)])
    });
    let mut out = Vec::new();
    JpegEncoder::new_with_quality(&mut out, quality.clamp(1, 100)).encode(
        rgb.as_raw(),
        rgb.width(),
        rgb.height(),
        ExtendedColorType::Rgb8,
    )?;
    Ok(out)
}

fn add_image(doc: &mut PdfDocument, image: &RgbaImage, quality: u8) -> Result<ObjectId> {
    let jpeg = encode_jpeg(image, quality)?;
    let mut stream = Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => image.width() as i64,
            "Height" => image.height() as i64,
            "ColorSpace" => "DeviceRGB",
            "BitsPerComponent" => 8,
            "Filter" => "DCTDecode",
            "Interpolate" => false,
        },
        jpeg,
    );
    // Already DCT-compressed.
    stream.allows_compression = false;
    Ok(doc.add_object(stream))
}

/// Draw the page image `height_mm` tall at `top_mm` from the top edge, full
/// page width.
fn draw_image(page_w_pt: f64, page_h_pt: f64, top_mm: f64, height_mm: f64) -> Result<Vec<u8>> {
    let h = mm_to_pt(height_mm);
    let y = page_h_pt - mm_to_pt(top_mm) - h;
    let content = Content {
        operations: vec![
            Operation::new("q", vec![]),
            Operation::new(
                "cm",
                vec![
                    (page_w_pt as f32).into(),
                    0.into(),
                    0.into(),
                    (h as f32).into(),
                    0.into(),
                    (y as f32).into(),
                ],
            ),
            Operation::new("Do", vec![Object::Name(IMAGE_NAME.as_bytes().to_vec())]),
            Operation::new("Q", vec![]),
        ],
    };
    Ok(content.encode()?)
}

/// Rows of `bitmap` visible on page `index`.
fn page_band(pagination: &Pagination, index: usize) -> RgbaImage {
    let bitmap = pagination.bitmap();
    let px_per_mm = bitmap.height() as f64 / pagination.scaled_height_mm.max(f64::MIN_POSITIVE);
    let page_h = pagination.page.height_mm;
    let start = ((index as f64 * page_h * px_per_mm).round() as u32).min(bitmap.height() - 1);
    let end = (((index + 1) as f64 * page_h * px_per_mm).round() as u32).clamp(start + 1, bitmap.height());
    image::imageops::crop_imm(&**bitmap, 0, start, bitmap.width(), end - start).to_image()
}

fn build_pdf(pagination: &Pagination, options: &AssembleOptions) -> Result<Vec<u8>> {
    let bitmap = pagination.bitmap();
    if bitmap.width() == 0 || bitmap.height() == 0 {
        return Err(Error::AssemblyError("page bitmap is empty".into()));
    }
    let page = pagination.page;
    let (page_w, page_h) = (page.width_pt(), page.height_pt());
    let mut doc = PdfDocument::with_version("1.5");
    let pages_id = doc.new_object_id();

    let shared = match options.mode {
        PageImageMode::Shared => Some(add_image(&mut doc, pagination.bitmap(), options.jpeg_quality)?),
        PageImageMode::Sliced => None,
    };

    let mut kids: Vec<Object> = Vec::with_capacity(pagination.page_count());
    for placement in &pagination.placements {
        let (image_id, content) = match shared {
            Some(id) => (
                id,
                draw_image(page_w, page_h, placement.offset_mm, pagination.scaled_height_mm)?,
            ),
            None => {
                let band = page_band(pagination, placement.index);
                let band_h_mm = pagination.scaled_height_mm * band.height() as f64
                    / pagination.bitmap().height().max(1) as f64;
                (
                    add_image(&mut doc, &band, options.jpeg_quality)?,
                    draw_image(page_w, page_h, 0.0, band_h_mm)?,
                )
            }
        };
        let content_id = doc.add_object(Stream::new(dictionary! {}, content));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "MediaBox" => vec![0.into(), 0.into(), (page_w as f32).into(), (page_h as f32).into()],
            "Contents" => content_id,
            "Resources" => dictionary! {
                "XObject" => dictionary! { IMAGE_NAME => image_id },
            },
        });
        kids.push(page_id.into());
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
    let catalog_id = doc.add_object(dictionary! { "Type" => "Catalog", "Pages" => pages_id });
    let meta = &options.metadata;
    let literal = |s: &str| Object::String(s.as_bytes().to_vec(), StringFormat::Literal);
    let info_id = doc.add_object(dictionary! {
        "Title" => literal(&meta.title),
        "Subject" => literal(&meta.subject),
        "Creator" => literal(&meta.creator),
        "Producer" => literal(&meta.producer),
    });
    doc.trailer.set("Root", catalog_id);
    doc.trailer.set("Info", info_id);
    doc.compress();

    let mut out = Vec::new();
    doc.save_to(&mut out)?;
    log::debug!("assembled {} page(s), {} bytes", count, out.len());
    Ok(out)
}
