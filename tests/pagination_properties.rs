//! Page count and coverage over a spread of content heights

use std::sync::Arc;

use cvpress::export::paginate::{paginate, PageSize};
use cvpress::rendering::blank_canvas;

#[test]
fn pages_cover_content_exactly() {
    let page = PageSize::A4;
    for css_height in [1, 500, 1122, 1123, 1500, 2244, 2245, 3000, 3366, 5000] {
        for oversampling in [1.0, 2.0] {
            let bitmap = blank_canvas((794.0 * oversampling) as u32, (css_height as f64 * oversampling) as u32);
            let p = paginate(Arc::new(bitmap), oversampling, page);
            let n = p.page_count();
            let h = p.scaled_height_mm;

            assert!(n >= 1);
            let expected = ((h / page.height_mm) - 1e-9).ceil().max(1.0) as usize;
            assert_eq!(n, expected, "height {}px at {}x", css_height, oversampling);

            if n > 1 {
                let last_band = h - (n - 1) as f64 * page.height_mm;
                assert!(last_band > 0.0 && last_band <= page.height_mm + 1e-9);
            }
            for (k, placement) in p.placements.iter().enumerate() {
                assert_eq!(placement.index, k);
                assert!(placement.offset_mm <= 0.0);
                if k > 0 {
                    let step = p.placements[k - 1].offset_mm - placement.offset_mm;
                    assert!((step - page.height_mm).abs() < 1e-9);
                }
            }
        }
    }
}

#[test]
fn custom_page_sizes_scale_to_width() {
    let letter = PageSize { width_mm: 215.9, height_mm: 279.4 };
    let p = paginate(Arc::new(blank_canvas(1000, 3000)), 1.0, letter);
    assert!((p.ratio - 0.2159).abs() < 1e-12);
    assert!((p.scaled_height_mm - 647.7).abs() < 1e-9);
    assert_eq!(p.page_count(), 3);
}
