use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;

use cvpress::export::assemble::{assemble, AssembleOptions, PageImageMode, PdfMetadata};
use cvpress::export::paginate::{paginate, PageSize};
use cvpress::rendering::{blank_canvas, BoxRasterizer, RasterOptions, Rasterizer};
use cvpress::{Document, Viewport};

const RESUME: &str = r#"<body><div id="resume-preview" style="width: 794px; padding: 24px">
  <h1 style="color: #1f2937">Jane Doe</h1>
  <p>Senior engineer with ten years of delivery across the Gulf region.</p>
  <div style="border-top: 2px solid #2563eb; padding: 12px"><p>Led a team of 12.</p><p>Cut costs by 30%.</p></div>
</div></body>"#;

fn bench_paginate(c: &mut Criterion) {
    let bitmap = Arc::new(blank_canvas(1588, 4800));
    c.bench_function("paginate_three_pages", |b| {
        b.iter(|| paginate(black_box(bitmap.clone()), 2.0, PageSize::A4))
    });
}

fn bench_assemble(c: &mut Criterion) {
    let pagination = paginate(Arc::new(blank_canvas(1588, 4800)), 2.0, PageSize::A4);
    let mut group = c.benchmark_group("assemble");
    group.sample_size(10);
    for mode in [PageImageMode::Shared, PageImageMode::Sliced] {
        let options = AssembleOptions {
            jpeg_quality: 92,
            metadata: PdfMetadata::for_filename("bench.pdf", "Professional Resume", "cvpress", "bench"),
            mode,
        };
        group.bench_function(format!("{:?}", mode), |b| {
            b.iter(|| assemble(black_box(&pagination), &options).unwrap())
        });
    }
    group.finish();
}

fn bench_rasterize(c: &mut Criterion) {
    let doc = Document::parse_html(RESUME, Viewport::default());
    let target = doc.get_element_by_id("resume-preview").unwrap();
    let options = RasterOptions { scale: 2.0, width: 794, height: 1122, ..Default::default() };
    let rasterizer = BoxRasterizer::new();
    c.bench_function("rasterize_a4", |b| {
        b.iter(|| rasterizer.rasterize(black_box(&doc), target, &options).unwrap())
    });
}

criterion_group!(benches, bench_paginate, bench_assemble, bench_rasterize);
criterion_main!(benches);
