//! Rasterization: the capability that turns a live subtree into pixels.

pub mod layout;
pub mod paint;
pub mod raster;

use std::sync::Arc;

use image::RgbaImage;
use sha2::{Digest, Sha256};

use crate::dom::{Document, NodeId};
use crate::Result;

pub use raster::{blank_canvas, BoxRasterizer};

/// Callback run against the rasterizer's own snapshot of the document before
/// it samples pixels. Receives the snapshot and the capture target.
pub type CloneHook = Arc<dyn Fn(&mut Document, NodeId) + Send + Sync>;

/// Options for one rasterization call.
#[derive(Clone)]
pub struct RasterOptions {
    /// Output pixels per CSS pixel
    pub scale: f32,
    /// Capture window in CSS pixels, relative to the target's box
    pub width: u32,
    pub height: u32,
    pub x: i32,
    pub y: i32,
    /// Canvas fill behind the content
    pub background: String,
    /// Cross-origin images are requested with CORS credentials
    pub use_cors: bool,
    /// Cross-origin pixels may taint the canvas
    pub allow_taint: bool,
    pub on_clone: Option<CloneHook>,
}

impl Default for RasterOptions {
    fn default() -> Self {
        Self {
            scale: 1.0,
            width: 0,
            height: 0,
            x: 0,
            y: 0,
            background: "#ffffff".to_string(),
            use_cors: false,
            allow_taint: false,
            on_clone: None,
        }
    }
}

impl std::fmt::Debug for RasterOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterOptions")
            .field("scale", &self.scale)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("x", &self.x)
            .field("y", &self.y)
            .field("background", &self.background)
            .field("use_cors", &self.use_cors)
            .field("allow_taint", &self.allow_taint)
            .field("on_clone", &self.on_clone.is_some())
            .finish()
    }
}

/// Converts a subtree of a document into a bitmap of
/// `width * scale` by `height * scale` pixels.
///
/// Implementations must not mutate `doc`; anything they need to change is
/// done on their own snapshot, after running `options.on_clone`.
pub trait Rasterizer: Send + Sync {
    fn rasterize(&self, doc: &Document, target: NodeId, options: &RasterOptions) -> Result<RgbaImage>;
}

/// Hex SHA-256 of a bitmap's dimensions and pixels.
pub fn fingerprint(image: &RgbaImage) -> String {
    let mut hasher = Sha256::new();
    hasher.update(image.width().to_le_bytes());
    hasher.update(image.height().to_le_bytes());
    hasher.update(image.as_raw());
    hex::encode(hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fingerprint_tracks_pixels() {
        let a = blank_canvas(4, 4);
        let mut b = blank_canvas(4, 4);
        assert_eq!(fingerprint(&a), fingerprint(&b));
        b.put_pixel(0, 0, image::Rgba([0, 0, 0, 255]));
        assert_ne!(fingerprint(&a), fingerprint(&b));
        assert_ne!(fingerprint(&a), fingerprint(&blank_canvas(2, 8)));
    }
}
