//! Rewrites the styling of a cloned subtree into a form the rasterizer can
//! reproduce: hex colours only, no transforms, no filters.

use crate::color::{parse_css_color, to_hex};
use crate::dom::{Document, NodeId};

const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

fn is_transparent(value: &str) -> bool {
    match value.trim() {
        "" | "transparent" | "rgba(0, 0, 0, 0)" => true,
        v => parse_css_color(v).map(|c| c.is_transparent()).unwrap_or(false),
    }
}

/// Normalise every element in `root`'s subtree, `root` included.
///
/// Per element:
/// - `transform` becomes `none` and `transform-origin` becomes `initial`
/// - a non-transparent background colour is replaced by its hex form
/// - a non-transparent text colour is replaced by its hex form
/// - each non-transparent border side colour is replaced by its hex form
/// - `filter` and `backdrop-filter` are dropped
///
/// Colours are read from the resolved style, so values from stylesheets and
/// inheritance are pinned inline as well. Returns the number of elements
/// rewritten.
pub fn sanitize_subtree(doc: &mut Document, root: NodeId) -> usize {
    let mut touched = 0;
    for node in doc.descendants(root) {
        // Ancestors are rewritten first, so inherited colours resolve to
        // already-normalised values.
        let computed = doc.computed_style(node);
        let background = computed.get("background-color").to_string();
        let color = computed.get("color").to_string();
        let borders: Vec<String> = SIDES
            .iter()
            .map(|side| computed.get(&format!("border-{}-color", side)).to_string())
            .collect();
        let from_sheet: Vec<&str> = match doc.element(node) {
            Some(el) => ["filter", "backdrop-filter"]
                .into_iter()
                .filter(|p| doc.stylesheet().lookup(el, p).is_some_and(|v| v != "none"))
                .collect(),
            None => continue,
        };

        let Some(el) = doc.element_mut(node) else {
            continue;
        };
        el.style.set("transform", "none");
        el.style.set("transform-origin", "initial");
        if !is_transparent(&background) {
            el.style.set("background-color", &to_hex(&background));
        }
        if !is_transparent(&color) {
            el.style.set("color", &to_hex(&color));
        }
        for (side, value) in SIDES.iter().zip(&borders) {
            if !is_transparent(value) {
                el.style.set(&format!("border-{}-color", side), &to_hex(value));
            }
        }
        el.style.remove("filter");
        el.style.remove("backdrop-filter");
        for prop in from_sheet {
            // A stylesheet rule would apply again once the inline value is gone.
            el.style.set(prop, "none");
        }
        touched += 1;
    }
    log::debug!("sanitized {} elements under {:?}", touched, root);
    touched
}
