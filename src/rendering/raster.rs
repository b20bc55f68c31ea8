/// Built-in rasterizer and the blank-canvas fallback

use image::{Rgba as Pixel, RgbaImage};

use super::layout::{layout_subtree, Rect};
use super::paint::{build_display_list, ImagePolicy, PaintCommand, PaintError};
use super::{RasterOptions, Rasterizer};
use crate::color::{parse_css_color, Rgba};
use crate::diagnostics::{self, Category};
use crate::dom::{Document, NodeId};
use crate::{Error, Result};

/// Largest canvas side [`BoxRasterizer`] will draw, in device pixels.
pub const MAX_CANVAS_DIMENSION: u32 = 32_767;

/// An opaque white canvas of the given pixel size.
///
/// Not bound by [`MAX_CANVAS_DIMENSION`]: the fallback page must keep the
/// aspect ratio of the capture it replaces. Zero sides become one pixel.
pub fn blank_canvas(width: u32, height: u32) -> RgbaImage {
    RgbaImage::from_pixel(width.max(1), height.max(1), Pixel([255, 255, 255, 255]))
}

/// Paints backgrounds, borders, image placeholders and text ink of a block
/// layout.
///
/// Like the browser-side rasterizers it stands in for, it works on its own
/// snapshot of the document and only understands legacy colour syntax.
#[derive(Debug, Clone, Copy, Default)]
pub struct BoxRasterizer;

impl BoxRasterizer {
    pub fn new() -> Self {
        BoxRasterizer
    }
}

impl Rasterizer for BoxRasterizer {
    fn rasterize(&self, doc: &Document, target: NodeId, options: &RasterOptions) -> Result<RgbaImage> {
        let mut snapshot = doc.clone();
        if let Some(hook) = &options.on_clone {
            hook(&mut snapshot, target);
        }
        if !snapshot.contains(target) {
            return Err(Error::CaptureError(format!("{:?} is not in the document", target)));
        }

        let scale = options.scale;
        if !(scale.is_finite() && scale > 0.0) {
            return Err(Error::CaptureError(format!("invalid scale {}", scale)));
        }
        let px_w = (options.width as f32 * scale).round() as u32;
        let px_h = (options.height as f32 * scale).round() as u32;
        if px_w == 0 || px_h == 0 || px_w > MAX_CANVAS_DIMENSION || px_h > MAX_CANVAS_DIMENSION {
            return Err(Error::CaptureError(format!("canvas size {}x{} is not drawable", px_w, px_h)));
        }

        let background = parse_css_color(&options.background)
            .map_err(|e| Error::CaptureError(e.to_string()))?;

        let boxes = layout_subtree(&snapshot, target, options.width as f32);
        let policy = ImagePolicy { use_cors: options.use_cors, allow_taint: options.allow_taint };
        let commands = build_display_list(&snapshot, &boxes, policy).map_err(|e| {
            if let PaintError::Color(ref c) = e {
                diagnostics::emit(Category::UnsupportedColorFunction, &c.to_string());
            }
            Error::CaptureError(e.to_string())
        })?;
        log::debug!("rasterizing {} paint commands into {}x{}", commands.len(), px_w, px_h);

        let mut canvas = RgbaImage::from_pixel(px_w, px_h, to_pixel(background));
        let (ox, oy) = (options.x as f32, options.y as f32);
        for cmd in &commands {
            let (rect, rgba) = match cmd {
                PaintCommand::SolidRect { rect, rgba } => (rect, rgba),
                PaintCommand::Text { rect, rgba, .. } => (rect, rgba),
            };
            let device = Rect {
                x: (rect.x - ox) * scale,
                y: (rect.y - oy) * scale,
                width: rect.width * scale,
                height: rect.height * scale,
            };
            fill_rect(&mut canvas, device, *rgba);
        }
        Ok(canvas)
    }
}

fn to_pixel(c: Rgba) -> Pixel<u8> {
    Pixel([c.r, c.g, c.b, (c.a.clamp(0.0, 1.0) * 255.0).round() as u8])
}

/// Source-over fill of a device-space rectangle, clipped to the canvas.
fn fill_rect(canvas: &mut RgbaImage, rect: Rect, color: Rgba) {
    let x0 = rect.x.round().max(0.0) as u32;
    let y0 = rect.y.round().max(0.0) as u32;
    let x1 = (rect.x + rect.width).round().clamp(0.0, canvas.width() as f32) as u32;
    let y1 = (rect.y + rect.height).round().clamp(0.0, canvas.height() as f32) as u32;
    let alpha = color.a.clamp(0.0, 1.0);
    if alpha <= 0.0 {
        return;
    }
    for y in y0..y1 {
        for x in x0..x1 {
            let dst = canvas.get_pixel_mut(x, y);
            if alpha >= 1.0 {
                *dst = Pixel([color.r, color.g, color.b, 255]);
                continue;
            }
            let blend = |s: u8, d: u8| (s as f32 * alpha + d as f32 * (1.0 - alpha)).round() as u8;
            let out_a = alpha + dst.0[3] as f32 / 255.0 * (1.0 - alpha);
            *dst = Pixel([
                blend(color.r, dst.0[0]),
                blend(color.g, dst.0[1]),
                blend(color.b, dst.0[2]),
                (out_a * 255.0).round() as u8,
            ]);
        }
    }
}
