//! cvpress
//!
//! Client-side style document-to-PDF export for a résumé builder: capture a
//! live, styled subtree off-screen, neutralise styling the rasterizer cannot
//! reproduce, rasterize it at print resolution and slice the bitmap into A4
//! pages of a PDF file.
//!
//! # Features
//!
//! - **Headless document model**: parse HTML into a mutable tree with computed
//!   styles and laid-out boxes (`dom`)
//! - **Pluggable rasterizer**: anything implementing [`rendering::Rasterizer`];
//!   the built-in [`rendering::BoxRasterizer`] paints block layouts
//! - **Resilient export**: rasterization failures degrade to blank pages, the
//!   off-screen container is always removed, and only a missing source element
//!   fails the call
//! - **Enhancement contract** (feature `enhance`): typed request/response for the
//!   text-rewriting service and a tolerant completion parser
//!
//! # Example
//!
//! ```no_run
//! use cvpress::{Document, ExportConfig, Exporter, Viewport};
//!
//! # async fn run() -> cvpress::Result<()> {
//! let html = std::fs::read_to_string("resume.html")?;
//! let mut doc = Document::parse_html(&html, Viewport::default());
//! let exporter = Exporter::new(ExportConfig::default());
//! let report = exporter.generate_pdf(&mut doc, "resume-preview", "resume.pdf").await?;
//! println!("wrote {} pages", report.pages);
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub mod color;
pub mod diagnostics;
pub mod dom;
pub mod enhance;
pub mod error;
pub mod export;
pub mod rendering;

pub use dom::{Document, NodeId};
pub use error::{Error, Result};
pub use export::assemble::PageImageMode;
pub use export::paginate::PageSize;
pub use export::{generate_pdf, ExportReport, Exporter, DEFAULT_FILENAME};

/// Viewport dimensions of the page the document is laid out in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u32,
    pub height: u32,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 1280,
            height: 720,
        }
    }
}

/// Configuration for one [`Exporter`]
///
/// Defaults reproduce the browser export: an A4 floor of 794x1122 CSS pixels,
/// 2x oversampling, a 300 ms settle delay and JPEG quality 92.
///
/// ```
/// let cfg = cvpress::ExportConfig::default();
/// assert_eq!((cfg.min_width, cfg.min_height), (794, 1122));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExportConfig {
    /// Smallest capture width in CSS pixels
    pub min_width: u32,
    /// Smallest capture height in CSS pixels
    pub min_height: u32,
    /// Device pixels per CSS pixel in the captured bitmap
    pub oversampling: f32,
    /// Pause between attaching the off-screen copy and rasterizing it
    pub settle_delay_ms: u64,
    /// JPEG quality of the embedded page image (1-100)
    pub jpeg_quality: u8,
    /// Output page size
    pub page: PageSize,
    /// Shared full image per page, or one cropped image per page
    pub page_image_mode: PageImageMode,
    /// PDF Subject entry
    pub subject: String,
    /// PDF Creator entry
    pub creator: String,
    /// PDF Producer entry
    pub producer: String,
    /// Directory the default disk sink writes into
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            min_width: 794,
            min_height: 1122,
            oversampling: 2.0,
            settle_delay_ms: 300,
            jpeg_quality: 92,
            page: PageSize::A4,
            page_image_mode: PageImageMode::Shared,
            subject: "Professional Resume".to_string(),
            creator: "Dubai-CV-Pro".to_string(),
            producer: concat!("cvpress ", env!("CARGO_PKG_VERSION")).to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl ExportConfig {
    /// Load a JSON config; missing fields keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let cfg: ExportConfig = serde_json::from_str(&text)
            .map_err(|e| Error::ConfigError(format!("{}: {}", path.display(), e)))?;
        cfg.validate()?;
        Ok(cfg)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.oversampling.is_finite() && self.oversampling > 0.0) {
            return Err(Error::ConfigError(format!("oversampling must be positive, got {}", self.oversampling)));
        }
        if !(1..=100).contains(&self.jpeg_quality) {
            return Err(Error::ConfigError(format!("jpeg_quality must be in 1..=100, got {}", self.jpeg_quality)));
        }
        if !(self.page.width_mm > 0.0 && self.page.height_mm > 0.0) {
            return Err(Error::ConfigError(format!("page size must be positive, got {:?}", self.page)));
        }
        if self.min_width == 0 || self.min_height == 0 {
            return Err(Error::ConfigError("minimum capture size must be non-zero".into()));
        }
        Ok(())
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = ExportConfig::default();
        assert_eq!(config.oversampling, 2.0);
        assert_eq!(config.jpeg_quality, 92);
        assert_eq!(config.page, PageSize::A4);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: ExportConfig =
            serde_json::from_str(r#"{ "jpeg_quality": 80, "page_image_mode": "sliced" }"#).unwrap();
        assert_eq!(cfg.jpeg_quality, 80);
        assert_eq!(cfg.page_image_mode, PageImageMode::Sliced);
        assert_eq!(cfg.min_height, 1122);
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let cfg = ExportConfig { oversampling: 0.0, ..Default::default() };
        assert!(matches!(cfg.validate(), Err(Error::ConfigError(_))));
        let cfg = ExportConfig { jpeg_quality: 0, ..Default::default() };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn test_viewport() {
        let viewport = Viewport {
            width: 1920,
            height: 1080,
        };
        assert_eq!(viewport.width, 1920);
        assert_eq!(viewport.height, 1080);
    }
}
