//! Splits one tall bitmap into fixed-height pages.
//!
//! The bitmap is scaled to the page width and placed on every page, shifted
//! up by one page height per page, so each page shows the next band of the
//! image. All lengths are in millimetres with the origin at the top-left of
//! the page.

use std::sync::Arc;

use image::RgbaImage;
use serde::{Deserialize, Serialize};

const MM_PER_INCH: f64 = 25.4;
const POINTS_PER_INCH: f64 = 72.0;

/// Remaining heights at or below this are rounding noise, not content.
const EPSILON_MM: f64 = 1e-6;

pub fn mm_to_pt(mm: f64) -> f64 {
    mm * POINTS_PER_INCH / MM_PER_INCH
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageSize {
    pub width_mm: f64,
    pub height_mm: f64,
}

impl PageSize {
    pub const A4: PageSize = PageSize { width_mm: 210.0, height_mm: 297.0 };

    pub fn width_pt(&self) -> f64 {
        mm_to_pt(self.width_mm)
    }

    pub fn height_pt(&self) -> f64 {
        mm_to_pt(self.height_mm)
    }
}

/// One page of output: the shared bitmap drawn full page width at
/// `(0, offset_mm)`.
#[derive(Debug, Clone)]
pub struct PagePlacement {
    pub index: usize,
    /// Zero or negative.
    pub offset_mm: f64,
    pub bitmap: Arc<RgbaImage>,
}

#[derive(Debug, Clone)]
pub struct Pagination {
    pub page: PageSize,
    /// Device pixels per CSS pixel of `bitmap`.
    pub oversampling: f64,
    /// Millimetres per CSS pixel.
    pub ratio: f64,
    /// Height of the whole bitmap once scaled to page width.
    pub scaled_height_mm: f64,
    pub placements: Vec<PagePlacement>,
}

impl Pagination {
    pub fn page_count(&self) -> usize {
        self.placements.len()
    }

    pub fn bitmap(&self) -> &Arc<RgbaImage> {
        &self.placements[0].bitmap
    }

    pub fn offsets_mm(&self) -> Vec<f64> {
        self.placements.iter().map(|p| p.offset_mm).collect()
    }

    /// The same layout drawn from a half-resolution bitmap.
    pub fn downscaled(&self) -> Pagination {
        let src = self.bitmap();
        let w = (src.width() / 2).max(1);
        let h = (src.height() / 2).max(1);
        let half = image::imageops::resize(&**src, w, h, image::imageops::FilterType::Triangle);
        let oversampling = self.oversampling * w as f64 / src.width() as f64;
        paginate(Arc::new(half), oversampling, self.page)
    }
}

/// Compute page placements for `bitmap`, rendered at `oversampling` device
/// pixels per CSS pixel.
///
/// Always yields at least one page. The last page's visible band is the
/// remaining `scaled_height - (n - 1) * page_height`, which lies in
/// `(0, page_height]` whenever there is more than one page.
pub fn paginate(bitmap: Arc<RgbaImage>, oversampling: f64, page: PageSize) -> Pagination {
    let oversampling = if oversampling.is_finite() && oversampling > 0.0 { oversampling } else { 1.0 };
    let css_width = bitmap.width() as f64 / oversampling;
    let css_height = bitmap.height() as f64 / oversampling;
    let ratio = if css_width > 0.0 { page.width_mm / css_width } else { 0.0 };
    let scaled_height_mm = css_height * ratio;

    let mut placements = vec![PagePlacement { index: 0, offset_mm: 0.0, bitmap: bitmap.clone() }];
    let page_h = page.height_mm;
    if page_h.is_finite() && page_h > 0.0 && scaled_height_mm.is_finite() {
        let mut k = 1usize;
        while scaled_height_mm - k as f64 * page_h > EPSILON_MM {
            placements.push(PagePlacement {
                index: k,
                offset_mm: -(k as f64) * page_h,
                bitmap: bitmap.clone(),
            });
            k += 1;
        }
    }

    log::debug!(
        "paginated {}x{} bitmap into {} page(s), scaled height {:.2}mm",
        bitmap.width(),
        bitmap.height(),
        placements.len(),
        scaled_height_mm
    );
    Pagination { page, oversampling, ratio, scaled_height_mm, placements }
}
