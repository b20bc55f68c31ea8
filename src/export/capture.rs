//! Off-screen capture of a source element.
//!
//! The source is deep-copied into a fixed-position container far outside the
//! viewport, so the copy lays out at its natural size no matter how the live
//! preview is zoomed. The container is owned by an [`OffscreenContainer`]
//! guard and removed on every exit path.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use image::RgbaImage;

use super::sanitize::sanitize_subtree;
use crate::diagnostics::{self, Category};
use crate::dom::{Document, NodeId};
use crate::rendering::{blank_canvas, RasterOptions, Rasterizer};
use crate::{Error, ExportConfig, Result};

/// Class carried by every off-screen container.
pub const CONTAINER_CLASS: &str = "cvpress-offscreen";

static NEXT_CONTAINER: AtomicU64 = AtomicU64::new(1);

/// Capture window in CSS pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CaptureDimensions {
    pub width: u32,
    pub height: u32,
}

/// Natural (untransformed) size of `source`, floored at the configured
/// minimum. Elements without a box report the minimum.
pub fn capture_dimensions(doc: &Document, source: NodeId, min_width: u32, min_height: u32) -> CaptureDimensions {
    let (w, h) = doc.natural_size(source).unwrap_or((0.0, 0.0));
    CaptureDimensions {
        width: (w.ceil() as u32).max(min_width),
        height: (h.ceil() as u32).max(min_height),
    }
}

/// A detached copy of the source mounted in a hidden container at the end of
/// `<body>`. Dropping the guard removes the container.
pub struct OffscreenContainer<'a> {
    doc: &'a mut Document,
    node: NodeId,
    copy: NodeId,
    id: String,
    released: bool,
}

impl<'a> OffscreenContainer<'a> {
    /// Copy `source` into a new container sized to `dims` and attach it.
    pub fn mount(doc: &'a mut Document, source: NodeId, dims: CaptureDimensions) -> Result<Self> {
        let id = format!("{}-{}", CONTAINER_CLASS, NEXT_CONTAINER.fetch_add(1, Ordering::Relaxed));
        let node = doc.create_element("div");
        doc.set_attr(node, "id", &id)?;
        doc.set_attr(node, "class", CONTAINER_CLASS)?;
        doc.set_attr(
            node,
            "style",
            &format!(
                "position: fixed; left: -9999px; top: 0; width: {w}px; min-height: {h}px; \
                 background-color: #ffffff; z-index: -9999",
                w = dims.width,
                h = dims.height
            ),
        )?;
        let body = doc.body();
        doc.append_child(body, node)?;

        // From here on the guard owns the container.
        let mut guard = OffscreenContainer { doc, node, copy: node, id, released: false };
        guard.copy = guard.doc.deep_clone(source)?;
        let source_id = guard.doc.attr(source, "id").unwrap_or("source").to_string();
        let copy = guard.copy;
        if let Some(el) = guard.doc.element_mut(copy) {
            el.set_attr("id", &format!("{}-clone", source_id));
            el.style.set("width", &format!("{}px", dims.width));
            el.style.set("min-height", &format!("{}px", dims.height));
            el.style.set("background-color", "#ffffff");
        }
        guard.doc.append_child(node, copy)?;
        // Styles resolve against the attached copy.
        sanitize_subtree(guard.doc, copy);
        log::debug!("mounted {} ({}x{})", guard.id, dims.width, dims.height);
        Ok(guard)
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The copy of the source inside the container.
    pub fn copy(&self) -> NodeId {
        self.copy
    }

    pub fn doc(&self) -> &Document {
        self.doc
    }

    /// Remove the container now, reporting failure.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        self.doc
            .remove(self.node)
            .map_err(|e| Error::CleanupError(format!("{}: {}", self.id, e)))
    }
}

impl Drop for OffscreenContainer<'_> {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        if let Err(e) = self.doc.remove(self.node) {
            log::warn!("failed to remove off-screen container {}: {}", self.id, e);
        }
    }
}

/// Bitmap produced by [`capture`].
#[derive(Debug)]
pub struct Capture {
    pub bitmap: RgbaImage,
    pub dimensions: CaptureDimensions,
    /// The rasterizer failed and `bitmap` is a blank page.
    pub fell_back: bool,
}

/// Rasterize `source` off-screen.
///
/// Only a failure to build the container is returned as an error. A failing
/// rasterizer yields a white bitmap of the expected size, and a failure to
/// remove the container is logged.
pub async fn capture(
    doc: &mut Document,
    source: NodeId,
    config: &ExportConfig,
    rasterizer: &dyn Rasterizer,
) -> Result<Capture> {
    let dimensions = capture_dimensions(doc, source, config.min_width, config.min_height);
    let container = OffscreenContainer::mount(doc, source, dimensions)?;

    // Let pending layout settle before sampling.
    tokio::time::sleep(config.settle_delay()).await;

    let on_clone: crate::rendering::CloneHook = Arc::new(|snapshot: &mut Document, target: NodeId| {
        sanitize_subtree(snapshot, target);
    });
    let options = RasterOptions {
        scale: config.oversampling,
        width: dimensions.width,
        height: dimensions.height,
        x: 0,
        y: 0,
        background: "#ffffff".to_string(),
        use_cors: true,
        allow_taint: true,
        on_clone: Some(on_clone),
    };

    let (bitmap, fell_back) = match rasterizer.rasterize(container.doc(), container.node(), &options) {
        Ok(bitmap) => (bitmap, false),
        Err(e) => {
            diagnostics::emit(Category::Capture, &format!("canvas generation failed, using a blank page: {}", e));
            let w = (dimensions.width as f32 * config.oversampling).round() as u32;
            let h = (dimensions.height as f32 * config.oversampling).round() as u32;
            (blank_canvas(w, h), true)
        }
    };

    if let Err(e) = container.release() {
        log::warn!("{}", e);
    }
    Ok(Capture { bitmap, dimensions, fell_back })
}
