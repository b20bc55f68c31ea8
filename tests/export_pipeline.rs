//! End-to-end export through the public API

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use cvpress::export::capture::CONTAINER_CLASS;
use cvpress::export::{DiskSink, FileSink, MemorySink};
use cvpress::rendering::{BoxRasterizer, RasterOptions, Rasterizer};
use cvpress::{Document, Error, ExportConfig, Exporter, NodeId, PageImageMode, Viewport};
use image::RgbaImage;

const TALL: &str = r#"<html><head><style>
  .section { border-bottom: 1px solid oklch(0.8 0.02 250); padding: 8px }
  h1 { color: lab(30% 20 -40) }
</style></head><body>
  <main style="transform: scale(0.6)">
    <div id="resume-preview" style="width: 794px; height: 2400px; color: oklch(0.3 0.05 260); background-color: #ffffff">
      <h1>Jane Doe</h1>
      <div class="section"><p>Led a team of 12 engineers across three regions.</p></div>
      <div class="section" style="filter: blur(1px)"><p>Cut onboarding time by 40%.</p></div>
    </div>
  </main>
</body></html>"#;

fn config() -> ExportConfig {
    ExportConfig { settle_delay_ms: 0, ..Default::default() }
}

fn tall_doc() -> Document {
    Document::parse_html(TALL, Viewport::default())
}

struct FailingRasterizer;

impl Rasterizer for FailingRasterizer {
    fn rasterize(&self, _: &Document, _: NodeId, _: &RasterOptions) -> cvpress::Result<RgbaImage> {
        Err(Error::CaptureError("canvas exploded".into()))
    }
}

/// Records what the rasterizer saw, then delegates.
#[derive(Default)]
struct Spy {
    calls: AtomicUsize,
    seen: Mutex<Option<(bool, String)>>,
}

impl Rasterizer for Spy {
    fn rasterize(&self, doc: &Document, target: NodeId, options: &RasterOptions) -> cvpress::Result<RgbaImage> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let id = doc.attr(target, "id").unwrap_or_default().to_string();
        *self.seen.lock().unwrap() = Some((doc.is_attached(target), id));
        assert_eq!(options.scale, 2.0);
        assert!(options.use_cors && options.allow_taint);
        assert_eq!(options.background, "#ffffff");
        BoxRasterizer::new().rasterize(doc, target, options)
    }
}

fn page_count(bytes: &[u8]) -> usize {
    lopdf::Document::load_mem(bytes).unwrap().get_pages().len()
}

#[tokio::test]
async fn tall_resume_spans_three_pages() {
    let mut doc = tall_doc();
    let sink = Arc::new(MemorySink::new());
    let report = Exporter::new(config())
        .with_sink(sink.clone())
        .generate_pdf(&mut doc, "resume-preview", "jane.pdf")
        .await
        .unwrap();

    assert_eq!((report.capture_width, report.capture_height), (794, 2400));
    assert_eq!((report.bitmap_width, report.bitmap_height), (1588, 4800));
    assert!(!report.blank, "sanitised copy should rasterize");
    assert_eq!(report.pages, 3);
    // One page height of 1122 css px at 210/794 mm per px is about 297mm.
    let px_page = 1122.0 * 210.0 / 794.0;
    for (k, offset) in report.offsets_mm.iter().enumerate() {
        assert_eq!(*offset, -(k as f64) * 297.0);
        assert!((offset + k as f64 * px_page).abs() < 1.0);
    }

    let bytes = sink.get("jane.pdf").expect("file saved");
    assert_eq!(bytes.len(), report.bytes);
    assert!(bytes.starts_with(b"%PDF-"));
    assert_eq!(page_count(&bytes), 3);
}

#[tokio::test]
async fn zoomed_preview_is_captured_at_natural_size() {
    let mut doc = tall_doc();
    let src = doc.get_element_by_id("resume-preview").unwrap();
    let on_screen = doc.bounding_box(src).unwrap();
    assert!(on_screen.height < 2400.0);

    let report = Exporter::new(config())
        .with_sink(Arc::new(MemorySink::new()))
        .generate_pdf(&mut doc, "resume-preview", "z.pdf")
        .await
        .unwrap();
    assert_eq!(report.capture_height, 2400);
}

#[tokio::test]
async fn rasterizer_failure_still_produces_a_file() {
    let mut doc = tall_doc();
    let sink = Arc::new(MemorySink::new());
    let report = Exporter::new(config())
        .with_rasterizer(Arc::new(FailingRasterizer))
        .with_sink(sink.clone())
        .generate_pdf(&mut doc, "resume-preview", "blank.pdf")
        .await
        .unwrap();

    assert!(report.blank);
    assert_eq!((report.bitmap_width, report.bitmap_height), (1588, 4800));
    assert_eq!(report.pages, 3);
    assert_eq!(page_count(&sink.get("blank.pdf").unwrap()), 3);
}

#[tokio::test]
async fn container_is_gone_after_success_and_failure() {
    let mut doc = tall_doc();
    let nodes_before = doc.descendants(doc.root()).len();

    let spy = Arc::new(Spy::default());
    Exporter::new(config())
        .with_rasterizer(spy.clone())
        .with_sink(Arc::new(MemorySink::new()))
        .generate_pdf(&mut doc, "resume-preview", "a.pdf")
        .await
        .unwrap();
    Exporter::new(config())
        .with_rasterizer(Arc::new(FailingRasterizer))
        .with_sink(Arc::new(MemorySink::new()))
        .generate_pdf(&mut doc, "resume-preview", "b.pdf")
        .await
        .unwrap();

    assert!(doc.elements_by_class(CONTAINER_CLASS).is_empty());
    assert!(doc.get_element_by_id("resume-preview-clone").is_none());
    assert_eq!(doc.descendants(doc.root()).len(), nodes_before);

    assert_eq!(spy.calls.load(Ordering::SeqCst), 1);
    let (attached, id) = spy.seen.lock().unwrap().clone().unwrap();
    assert!(attached, "rasterizer must see the mounted container");
    assert!(id.starts_with("cvpress-offscreen-"));
}

#[tokio::test]
async fn live_element_is_not_modified() {
    let mut doc = tall_doc();
    let src = doc.get_element_by_id("resume-preview").unwrap();
    let before = doc.element(src).unwrap().style.to_css_text();
    Exporter::new(config())
        .with_sink(Arc::new(MemorySink::new()))
        .generate_pdf(&mut doc, "resume-preview", "c.pdf")
        .await
        .unwrap();
    assert_eq!(doc.element(src).unwrap().style.to_css_text(), before);
}

#[tokio::test]
async fn missing_source_creates_nothing() {
    let mut doc = tall_doc();
    let nodes_before = doc.descendants(doc.root()).len();
    let sink = Arc::new(MemorySink::new());
    let spy = Arc::new(Spy::default());

    let err = Exporter::new(config())
        .with_rasterizer(spy.clone())
        .with_sink(sink.clone())
        .generate_pdf(&mut doc, "cover-letter", "x.pdf")
        .await
        .unwrap_err();

    assert!(matches!(err, Error::NotFound(_)));
    assert_eq!(doc.descendants(doc.root()).len(), nodes_before);
    assert_eq!(spy.calls.load(Ordering::SeqCst), 0);
    assert!(sink.is_empty());
}

#[tokio::test]
async fn sliced_mode_keeps_page_count() {
    let mut doc = tall_doc();
    let sink = Arc::new(MemorySink::new());
    let cfg = ExportConfig { page_image_mode: PageImageMode::Sliced, ..config() };
    let report = Exporter::new(cfg)
        .with_sink(sink.clone())
        .generate_pdf(&mut doc, "resume-preview", "sliced.pdf")
        .await
        .unwrap();
    assert_eq!(report.pages, 3);
    assert_eq!(page_count(&sink.get("sliced.pdf").unwrap()), 3);
}

#[tokio::test]
async fn capture_is_deterministic() {
    let run = || async {
        let mut doc = tall_doc();
        Exporter::new(config())
            .with_sink(Arc::new(MemorySink::new()))
            .generate_pdf(&mut doc, "resume-preview", "d.pdf")
            .await
            .unwrap()
            .bitmap_sha256
    };
    let a = run().await;
    let b = run().await;
    assert_eq!(a.len(), 64);
    assert_eq!(a, b);
}

struct BrokenSink;

impl FileSink for BrokenSink {
    fn save(&self, _: &str, _: &[u8]) -> cvpress::Result<()> {
        Err(Error::Io(std::io::Error::other("disk full")))
    }
}

#[tokio::test]
async fn sink_errors_are_reported_and_cleanup_still_happens() {
    let mut doc = tall_doc();
    let err = Exporter::new(config())
        .with_sink(Arc::new(BrokenSink))
        .generate_pdf(&mut doc, "resume-preview", "e.pdf")
        .await
        .unwrap_err();
    assert!(matches!(err, Error::Io(_)));
    assert!(doc.elements_by_class(CONTAINER_CLASS).is_empty());
}

#[tokio::test]
async fn disk_sink_receives_the_file() {
    let dir = std::env::temp_dir().join(format!("cvpress-e2e-{}", std::process::id()));
    let mut doc = tall_doc();
    let cfg = ExportConfig { output_dir: dir.clone(), ..config() };
    let report = Exporter::new(cfg)
        .with_sink(Arc::new(DiskSink::new(&dir)))
        .generate_pdf(&mut doc, "resume-preview", "disk.pdf")
        .await
        .unwrap();
    let bytes = std::fs::read(dir.join("disk.pdf")).unwrap();
    assert_eq!(bytes.len(), report.bytes);
    assert_eq!(page_count(&bytes), 3);
    std::fs::remove_dir_all(&dir).unwrap();
}
