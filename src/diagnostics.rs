//! Categorised diagnostics with scoped suppression.
//!
//! The rasterizer reports every colour function it cannot parse. During an
//! export those reports are expected noise, so the exporter mutes the category
//! for the duration of one call with [`suppress`]. Muting is process-wide and
//! counted: overlapping exports each hold their own [`Suppression`], and the
//! category is live again once the last guard is dropped.

use std::sync::atomic::{AtomicUsize, Ordering};

const LOG_TARGET: &str = "cvpress::diagnostics";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// A colour function the rasterizer does not understand (`oklch`, `lab`, ...)
    UnsupportedColorFunction,
    /// Absorbed rasterization failures
    Capture,
    /// PDF encoding problems
    Assembly,
}

impl Category {
    const COUNT: usize = 3;

    fn index(self) -> usize {
        match self {
            Category::UnsupportedColorFunction => 0,
            Category::Capture => 1,
            Category::Assembly => 2,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Category::UnsupportedColorFunction => "unsupported-color-function",
            Category::Capture => "capture",
            Category::Assembly => "assembly",
        }
    }
}

#[allow(clippy::declare_interior_mutable_const)]
const ZERO: AtomicUsize = AtomicUsize::new(0);
static MUTED: [AtomicUsize; Category::COUNT] = [ZERO; Category::COUNT];

/// Emit a diagnostic. Returns `false` when the category is currently muted.
pub fn emit(category: Category, message: &str) -> bool {
    if is_suppressed(category) {
        log::trace!(target: LOG_TARGET, "[{}] (muted) {}", category.label(), message);
        return false;
    }
    log::warn!(target: LOG_TARGET, "[{}] {}", category.label(), message);
    true
}

pub fn is_suppressed(category: Category) -> bool {
    MUTED[category.index()].load(Ordering::SeqCst) > 0
}

/// Mute `category` until the returned guard is dropped.
#[must_use = "the category is unmuted as soon as the guard is dropped"]
pub fn suppress(category: Category) -> Suppression {
    MUTED[category.index()].fetch_add(1, Ordering::SeqCst);
    Suppression { category }
}

/// Guard returned by [`suppress`].
#[derive(Debug)]
pub struct Suppression {
    category: Category,
}

impl Drop for Suppression {
    fn drop(&mut self) {
        MUTED[self.category.index()].fetch_sub(1, Ordering::SeqCst);
    }
}
