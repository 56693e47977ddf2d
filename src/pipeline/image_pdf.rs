//! Image → single-page PDF.
//!
//! The translation endpoint only lays out documents, so a photo or scan is
//! first placed on one PDF page. The page has a fixed size (US Letter,
//! 612 × 792 pt, by default); the image is scaled to fit inside it with its
//! aspect ratio preserved and anchored at the top-left corner. Small images
//! are scaled up as well.
//!
//! Decoding and PDF serialisation are CPU-bound, so [`image_file_to_pdf`]
//! runs them on the blocking pool.

use crate::error::TranslateError;
use printpdf::image_crate::{self, DynamicImage, GenericImageView, RgbImage};
use printpdf::{Image, ImageTransform, Mm, PdfDocument};
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info};

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Page size in PDF points (1/72 inch).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageBox {
    pub width_pt: f32,
    pub height_pt: f32,
}

impl Default for PageBox {
    fn default() -> Self {
        Self::LETTER
    }
}

impl PageBox {
    pub const LETTER: PageBox = PageBox {
        width_pt: 612.0,
        height_pt: 792.0,
    };

    pub const A4: PageBox = PageBox {
        width_pt: 595.28,
        height_pt: 841.89,
    };
}

/// Where the image lands on the page, in points from the bottom-left origin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Placement {
    /// Points per image pixel.
    pub scale: f32,
    pub width_pt: f32,
    pub height_pt: f32,
    pub x_pt: f32,
    pub y_pt: f32,
}

/// Fit a `px_w × px_h` image inside `page`, top-left anchored.
///
/// Returns `None` for zero-sized images.
pub fn fit_to_box(px_w: u32, px_h: u32, page: PageBox) -> Option<Placement> {
    if px_w == 0 || px_h == 0 {
        return None;
    }
    let scale = (page.width_pt / px_w as f32).min(page.height_pt / px_h as f32);
    let width_pt = px_w as f32 * scale;
    let height_pt = px_h as f32 * scale;
    Some(Placement {
        scale,
        width_pt,
        height_pt,
        x_pt: 0.0,
        // PDF y grows upwards; anchoring at the top leaves the slack below.
        y_pt: page.height_pt - height_pt,
    })
}

/// Decode the image at `path` and lay it out on a single PDF page.
pub async fn image_file_to_pdf(path: &Path, page: PageBox) -> Result<Vec<u8>, TranslateError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| TranslateError::ImageDecodeFailed {
            path: path.to_path_buf(),
            detail: e.to_string(),
        })?;
    let owned_path = path.to_path_buf();

    let pdf = tokio::task::spawn_blocking(move || image_to_pdf(&bytes, page, &owned_path))
        .await
        .map_err(|e| TranslateError::Internal(format!("Image conversion task panicked: {}", e)))??;

    info!("Converted {} to a {}-byte PDF", path.display(), pdf.len());
    Ok(pdf)
}

/// Blocking implementation: image bytes → PDF bytes. `origin` names the image in errors.
pub fn image_to_pdf(bytes: &[u8], page: PageBox, origin: &Path) -> Result<Vec<u8>, TranslateError> {
    let decode_err = |detail: String| TranslateError::ImageDecodeFailed {
        path: origin.to_path_buf(),
        detail,
    };

    let image = image_crate::load_from_memory(bytes).map_err(|e| decode_err(e.to_string()))?;
    let (w, h) = image.dimensions();
    let placement = fit_to_box(w, h, page).ok_or_else(|| decode_err("image has no pixels".into()))?;
    debug!(
        "Placing {}×{} px image at scale {:.3} ({:.1}×{:.1} pt)",
        w, h, placement.scale, placement.width_pt, placement.height_pt
    );

    let image = flatten_alpha(image);
    let title = origin
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("document");

    let (doc, page_idx, layer_idx) = PdfDocument::new(
        title,
        Mm(page.width_pt * MM_PER_PT),
        Mm(page.height_pt * MM_PER_PT),
        "Layer 1",
    );
    let layer = doc.get_page(page_idx).get_layer(layer_idx);

    // At 72 dpi one pixel is one point, so `scale` is points per pixel.
    Image::from_dynamic_image(&image).add_to_layer(
        layer,
        ImageTransform {
            translate_x: Some(Mm(placement.x_pt * MM_PER_PT)),
            translate_y: Some(Mm(placement.y_pt * MM_PER_PT)),
            rotate: None,
            scale_x: Some(placement.scale),
            scale_y: Some(placement.scale),
            dpi: Some(72.0),
        },
    );

    let mut buffer = Vec::new();
    {
        let mut writer = std::io::BufWriter::new(&mut buffer);
        doc.save(&mut writer)
            .map_err(|e| TranslateError::PdfBuildFailed(e.to_string()))?;
    }
    Ok(buffer)
}

/// Composite transparent pixels onto white; PDF image XObjects carry no alpha here.
fn flatten_alpha(image: DynamicImage) -> DynamicImage {
    if !image.color().has_alpha() {
        return DynamicImage::ImageRgb8(image.to_rgb8());
    }
    let rgba = image.to_rgba8();
    let flat = RgbImage::from_fn(rgba.width(), rgba.height(), |x, y| {
        let [r, g, b, a] = rgba.get_pixel(x, y).0;
        let a = a as u16;
        let blend = |c: u8| ((c as u16 * a + 255 * (255 - a)) / 255) as u8;
        image_crate::Rgb([blend(r), blend(g), blend(b)])
    });
    DynamicImage::ImageRgb8(flat)
}
