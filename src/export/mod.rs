//! Document-to-PDF export.
//!
//! [`Exporter::generate_pdf`] runs the whole pipeline for one element:
//!
//! 1. locate the source element by id
//! 2. copy it into an off-screen container and sanitise the copy
//! 3. rasterize the copy (a blank page on failure)
//! 4. slice the bitmap into pages
//! 5. encode the PDF and hand it to the [`FileSink`]
//!
//! Only a missing source element and failures after rasterization are
//! reported as errors.

pub mod assemble;
pub mod capture;
pub mod paginate;
pub mod sanitize;
pub mod sink;

use std::sync::Arc;

use serde::Serialize;

use crate::diagnostics::{self, Category};
use crate::dom::{Document, NodeId};
use crate::rendering::{fingerprint, BoxRasterizer, Rasterizer};
use crate::{Error, ExportConfig, Result};

use assemble::{assemble, AssembleOptions, PdfMetadata};
use capture::{capture, CaptureDimensions};
use paginate::paginate;
pub use sink::{DiskSink, FileSink, MemorySink};

/// File name used when the caller does not supply one.
pub const DEFAULT_FILENAME: &str = "resume.pdf";

/// Outcome of a successful export.
#[derive(Debug, Clone, Serialize)]
pub struct ExportReport {
    pub filename: String,
    pub pages: usize,
    /// Vertical image offset of each page, in millimetres.
    pub offsets_mm: Vec<f64>,
    pub capture_width: u32,
    pub capture_height: u32,
    pub bitmap_width: u32,
    pub bitmap_height: u32,
    /// Rasterization failed and the pages are blank.
    pub blank: bool,
    /// SHA-256 of the captured bitmap.
    pub bitmap_sha256: String,
    pub bytes: usize,
}

/// Runs exports with one configuration, rasterizer and sink.
pub struct Exporter {
    config: ExportConfig,
    rasterizer: Arc<dyn Rasterizer>,
    sink: Arc<dyn FileSink>,
}

impl Exporter {
    /// Exporter using the built-in rasterizer and a disk sink rooted at
    /// `config.output_dir`.
    pub fn new(config: ExportConfig) -> Self {
        let sink = Arc::new(DiskSink::new(config.output_dir.clone()));
        Self {
            config,
            rasterizer: Arc::new(BoxRasterizer::new()),
            sink,
        }
    }

    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    pub fn with_sink(mut self, sink: Arc<dyn FileSink>) -> Self {
        self.sink = sink;
        self
    }

    pub fn config(&self) -> &ExportConfig {
        &self.config
    }

    /// Export the element with id `element_id` as `filename`.
    ///
    /// Fails with [`Error::NotFound`] before touching the document when no
    /// attached element has that id. Colour-function diagnostics are muted
    /// for the duration of the call.
    pub async fn generate_pdf(&self, doc: &mut Document, element_id: &str, filename: &str) -> Result<ExportReport> {
        self.config.validate()?;
        let filename = if filename.is_empty() { DEFAULT_FILENAME } else { filename };
        let source = doc
            .get_element_by_id(element_id)
            .ok_or_else(|| Error::NotFound(format!("resume element #{}", element_id)))?;

        let _muted = diagnostics::suppress(Category::UnsupportedColorFunction);
        let result = self.run(doc, source, filename).await;
        match &result {
            Ok(report) => log::info!(
                "exported #{} to {} ({} page(s){})",
                element_id,
                report.filename,
                report.pages,
                if report.blank { ", blank" } else { "" }
            ),
            Err(e) => log::error!("PDF generation failed: {}", e),
        }
        result
    }

    async fn run(&self, doc: &mut Document, source: NodeId, filename: &str) -> Result<ExportReport> {
        let captured = capture(doc, source, &self.config, self.rasterizer.as_ref()).await?;
        let CaptureDimensions { width, height } = captured.dimensions;
        let bitmap_sha256 = fingerprint(&captured.bitmap);
        let (bitmap_width, bitmap_height) = captured.bitmap.dimensions();

        let pagination = paginate(Arc::new(captured.bitmap), self.config.oversampling as f64, self.config.page);
        let options = AssembleOptions {
            jpeg_quality: self.config.jpeg_quality,
            metadata: PdfMetadata::for_filename(
                filename,
                &self.config.subject,
                &self.config.creator,
                &self.config.producer,
            ),
            mode: self.config.page_image_mode,
        };
        let bytes = assemble(&pagination, &options)?;
        self.sink.save(filename, &bytes)?;

        Ok(ExportReport {
            filename: filename.to_string(),
            pages: pagination.page_count(),
            offsets_mm: pagination.offsets_mm(),
            capture_width: width,
            capture_height: height,
            bitmap_width,
            bitmap_height,
            blank: captured.fell_back,
            bitmap_sha256,
            bytes: bytes.len(),
        })
    }
}

/// Export `element_id` with the default configuration into the current
/// directory.
pub async fn generate_pdf(doc: &mut Document, element_id: &str, filename: Option<&str>) -> Result<ExportReport> {
    Exporter::new(ExportConfig::default())
        .generate_pdf(doc, element_id, filename.unwrap_or(DEFAULT_FILENAME))
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Viewport;

    fn exporter(sink: Arc<MemorySink>) -> Exporter {
        let config = ExportConfig { settle_delay_ms: 0, ..Default::default() };
        Exporter::new(config).with_sink(sink)
    }

    #[tokio::test]
    async fn missing_element_is_not_found() {
        let mut doc = Document::parse_html("<body><p>hi</p></body>", Viewport::default());
        let sink = Arc::new(MemorySink::new());
        let before = doc.descendants(doc.root()).len();
        let err = exporter(sink.clone()).generate_pdf(&mut doc, "nope", "x.pdf").await.unwrap_err();
        assert!(matches!(err, Error::NotFound(_)));
        assert_eq!(doc.descendants(doc.root()).len(), before);
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn empty_filename_uses_default() {
        let mut doc = Document::parse_html(
            r#"<body><div id="resume-preview" style="width: 300px; height: 100px">Jane</div></body>"#,
            Viewport::default(),
        );
        let sink = Arc::new(MemorySink::new());
        let report = exporter(sink.clone()).generate_pdf(&mut doc, "resume-preview", "").await.unwrap();
        assert_eq!(report.filename, DEFAULT_FILENAME);
        assert_eq!(report.pages, 1);
        assert!(!report.blank);
        assert_eq!((report.capture_width, report.capture_height), (794, 1122));
        assert_eq!(sink.filenames(), vec![DEFAULT_FILENAME]);
    }
}
