/// Display list built from layout boxes

use url::Url;

use super::layout::{char_advance, BoxKind, LayoutBox, Rect};
use crate::color::{parse_css_color, ColorError, Rgba};
use crate::dom::Document;

/// Placeholder fill for images; pixels of the image itself are not decoded.
const IMAGE_PLACEHOLDER: Rgba = Rgba::rgb(229, 231, 235);

#[derive(Debug, Clone, PartialEq)]
pub enum PaintCommand {
    SolidRect { rect: Rect, rgba: Rgba },
    /// One line of text drawn as an ink bar spanning its glyphs.
    Text { rect: Rect, text: String, rgba: Rgba },
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaintError {
    Color(ColorError),
    Tainted(String),
}

impl std::fmt::Display for PaintError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PaintError::Color(e) => write!(f, "{}", e),
            PaintError::Tainted(src) => write!(f, "cross-origin image {} would taint the canvas", src),
        }
    }
}

/// Cross-origin handling for images.
#[derive(Debug, Clone, Copy, Default)]
pub struct ImagePolicy {
    pub use_cors: bool,
    pub allow_taint: bool,
}

fn color(style: &crate::dom::ComputedStyle, prop: &str) -> Result<Rgba, PaintError> {
    parse_css_color(style.get(prop)).map_err(PaintError::Color)
}

fn is_cross_origin(src: &str, base: Option<&Url>) -> bool {
    match (Url::parse(src), base) {
        // Relative URLs resolve against the document.
        (Err(_), _) => false,
        (Ok(url), _) if url.scheme() == "data" => false,
        (Ok(_), None) => true,
        (Ok(url), Some(base)) => url.origin() != base.origin(),
    }
}

/// Turn boxes into paint commands in painting order.
///
/// Every colour a box carries is parsed, drawn or not, so one unreadable
/// value anywhere in the subtree fails the whole list.
pub fn build_display_list(
    doc: &Document,
    boxes: &[LayoutBox],
    policy: ImagePolicy,
) -> Result<Vec<PaintCommand>, PaintError> {
    let mut cmds = Vec::new();
    for b in boxes {
        let screen = b.screen_rect();
        match b.kind {
            BoxKind::Text => {
                let rgba = color(&b.style, "color")?;
                let line_h = screen.height / b.lines.len().max(1) as f32;
                let advance = char_advance(b.style.font_size()) * b.scale.0;
                let ink_h = (b.style.font_size() * 0.6 * b.scale.1).min(line_h);
                for (i, line) in b.lines.iter().enumerate() {
                    let width = (line.chars().count() as f32 * advance).min(screen.width);
                    cmds.push(PaintCommand::Text {
                        rect: Rect {
                            x: screen.x,
                            y: screen.y + i as f32 * line_h + (line_h - ink_h) / 2.0,
                            width,
                            height: ink_h,
                        },
                        text: line.clone(),
                        rgba,
                    });
                }
            }
            BoxKind::Block | BoxKind::Image => {
                let background = color(&b.style, "background-color")?;
                color(&b.style, "color")?;
                if !background.is_transparent() {
                    cmds.push(PaintCommand::SolidRect { rect: screen, rgba: background });
                }
                if b.kind == BoxKind::Image {
                    if let Some(src) = doc.attr(b.node, "src") {
                        if is_cross_origin(src, doc.base_url()) && !policy.use_cors && !policy.allow_taint {
                            return Err(PaintError::Tainted(src.to_string()));
                        }
                    }
                    cmds.push(PaintCommand::SolidRect { rect: screen, rgba: IMAGE_PLACEHOLDER });
                }
                cmds.extend(border_commands(b, screen)?);
            }
        }
    }
    Ok(cmds)
}

fn border_commands(b: &LayoutBox, screen: Rect) -> Result<Vec<PaintCommand>, PaintError> {
    let border = &b.box_model.border;
    let (sx, sy) = b.scale;
    let top = border.top * sy;
    let right = border.right * sx;
    let bottom = border.bottom * sy;
    let left = border.left * sx;

    let sides = [
        ("top", top, Rect { x: screen.x, y: screen.y, width: screen.width, height: top }),
        ("right", right, Rect { x: screen.x + screen.width - right, y: screen.y, width: right, height: screen.height }),
        ("bottom", bottom, Rect { x: screen.x, y: screen.bottom() - bottom, width: screen.width, height: bottom }),
        ("left", left, Rect { x: screen.x, y: screen.y, width: left, height: screen.height }),
    ];
    let mut cmds = Vec::new();
    for (side, width, rect) in sides {
        let rgba = color(&b.style, &format!("border-{}-color", side))?;
        if width > 0.0 && !rgba.is_transparent() {
            cmds.push(PaintCommand::SolidRect { rect, rgba });
        }
    }
    Ok(cmds)
}
