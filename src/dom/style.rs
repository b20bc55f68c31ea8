//! Inline declarations, a minimal stylesheet and computed values.
//!
//! Only what the capture pipeline reads is modelled: box metrics, colours,
//! transforms and filters. Shorthands are expanded to longhands on insert so
//! that later per-side rewrites (`border-top-color`, ...) override cleanly.

use std::collections::HashMap;

use super::ElementData;
use crate::color::parse_css_color;

/// Properties resolved by [`super::Document::computed_style`].
pub const COMPUTED_PROPERTIES: &[&str] = &[
    "display",
    "color",
    "background-color",
    "border-top-color",
    "border-right-color",
    "border-bottom-color",
    "border-left-color",
    "border-top-style",
    "border-right-style",
    "border-bottom-style",
    "border-left-style",
    "border-top-width",
    "border-right-width",
    "border-bottom-width",
    "border-left-width",
    "padding-top",
    "padding-right",
    "padding-bottom",
    "padding-left",
    "margin-top",
    "margin-right",
    "margin-bottom",
    "margin-left",
    "width",
    "height",
    "min-height",
    "font-size",
    "line-height",
    "transform",
    "transform-origin",
    "filter",
    "backdrop-filter",
];

pub const SIDES: [&str; 4] = ["top", "right", "bottom", "left"];

const INHERITED: &[&str] = &["color", "font-size", "line-height"];

const BORDER_STYLES: &[&str] = &[
    "none", "hidden", "solid", "dashed", "dotted", "double", "groove", "ridge", "inset", "outset",
];

const INLINE_TAGS: &[&str] = &["span", "a", "strong", "em", "b", "i", "u", "small", "label", "code"];
const HIDDEN_TAGS: &[&str] = &["head", "style", "script", "title", "meta", "link", "template"];

pub fn is_color_property(prop: &str) -> bool {
    prop == "color" || prop.ends_with("-color")
}

/// Split a declaration value on whitespace outside parentheses.
pub fn split_tokens(value: &str) -> Vec<String> {
    let mut out = Vec::new();
    let mut cur = String::new();
    let mut depth = 0usize;
    for c in value.chars() {
        match c {
            '(' => {
                depth += 1;
                cur.push(c);
            }
            ')' => {
                depth = depth.saturating_sub(1);
                cur.push(c);
            }
            c if c.is_whitespace() && depth == 0 => {
                if !cur.is_empty() {
                    out.push(std::mem::take(&mut cur));
                }
            }
            c => cur.push(c),
        }
    }
    if !cur.is_empty() {
        out.push(cur);
    }
    out
}

/// Resolve a CSS length to pixels. `auto` and unknown units yield `None`.
pub fn parse_length(value: &str, font_size: f32, percent_base: f32) -> Option<f32> {
    let v = value.trim().to_ascii_lowercase();
    match v.as_str() {
        "0" => return Some(0.0),
        "thin" => return Some(1.0),
        "medium" => return Some(3.0),
        "thick" => return Some(5.0),
        _ => {}
    }
    let split = v
        .find(|c: char| !(c.is_ascii_digit() || c == '.' || c == '-' || c == '+'))
        .unwrap_or(v.len());
    let number: f32 = v[..split].parse().ok()?;
    let px = match &v[split..] {
        "" | "px" => number,
        "em" => number * font_size,
        "rem" => number * 16.0,
        "%" => number * percent_base / 100.0,
        "pt" => number * 96.0 / 72.0,
        "mm" => number * 96.0 / 25.4,
        "cm" => number * 96.0 / 2.54,
        "in" => number * 96.0,
        _ => return None,
    };
    px.is_finite().then_some(px)
}

/// Horizontal and vertical scale factors of a `transform` value.
///
/// Only `scale*()` and `matrix()` contribute; translations and rotations are
/// ignored by the block painter.
pub fn parse_scale(transform: &str) -> (f32, f32) {
    let mut sx = 1.0f32;
    let mut sy = 1.0f32;
    for token in split_tokens(transform) {
        let Some(open) = token.find('(') else { continue };
        let name = token[..open].trim().to_ascii_lowercase();
        let args: Vec<f32> = token[open + 1..]
            .trim_end_matches(')')
            .split(|c: char| c == ',' || c.is_whitespace())
            .filter(|s| !s.is_empty())
            .filter_map(|s| s.parse().ok())
            .collect();
        match (name.as_str(), args.as_slice()) {
            ("scale", [s]) => {
                sx *= s;
                sy *= s;
            }
            ("scale", [x, y, ..]) => {
                sx *= x;
                sy *= y;
            }
            ("scalex", [x]) => sx *= x,
            ("scaley", [y]) => sy *= y,
            ("matrix", [a, _, _, d, _, _]) => {
                sx *= a;
                sy *= d;
            }
            _ => {}
        }
    }
    (sx, sy)
}

fn box_values(tokens: &[String]) -> Option<[String; 4]> {
    let t = |i: usize| tokens[i].clone();
    match tokens.len() {
        1 => Some([t(0), t(0), t(0), t(0)]),
        2 => Some([t(0), t(1), t(0), t(1)]),
        3 => Some([t(0), t(1), t(2), t(1)]),
        4 => Some([t(0), t(1), t(2), t(3)]),
        _ => None,
    }
}

fn looks_like_color(token: &str) -> bool {
    let lower = token.to_ascii_lowercase();
    if lower.starts_with('#') || lower == "currentcolor" {
        return true;
    }
    if let Some(open) = lower.find('(') {
        let name = &lower[..open];
        return name != "url" && !name.ends_with("gradient") && !name.starts_with("calc");
    }
    parse_css_color(&lower).is_ok()
}

/// Split a `border`-style shorthand into width, style and colour.
fn border_parts(value: &str) -> (String, String, String) {
    let mut width = "medium".to_string();
    let mut style = "none".to_string();
    let mut color = "currentcolor".to_string();
    for token in split_tokens(value) {
        let lower = token.to_ascii_lowercase();
        if BORDER_STYLES.contains(&lower.as_str()) {
            style = lower;
        } else if parse_length(&lower, 16.0, 0.0).is_some() {
            width = lower;
        } else {
            color = token;
        }
    }
    (width, style, color)
}

/// Expand a declaration into the longhands it sets.
pub fn expand_declaration(prop: &str, value: &str) -> Vec<(String, String)> {
    let prop = prop.trim().to_ascii_lowercase();
    let value = value.trim();
    let per_side = |pattern: &str, values: [String; 4]| -> Vec<(String, String)> {
        SIDES
            .iter()
            .zip(values)
            .map(|(side, v)| (pattern.replace("{}", side), v))
            .collect()
    };

    match prop.as_str() {
        "border" => {
            let (w, s, c) = border_parts(value);
            let mut out = per_side("border-{}-width", [w.clone(), w.clone(), w.clone(), w]);
            out.extend(per_side("border-{}-style", [s.clone(), s.clone(), s.clone(), s]));
            out.extend(per_side("border-{}-color", [c.clone(), c.clone(), c.clone(), c]));
            out
        }
        "border-top" | "border-right" | "border-bottom" | "border-left" => {
            let (w, s, c) = border_parts(value);
            vec![
                (format!("{}-width", prop), w),
                (format!("{}-style", prop), s),
                (format!("{}-color", prop), c),
            ]
        }
        "border-color" | "border-width" | "border-style" | "padding" | "margin" => {
            let Some(values) = box_values(&split_tokens(value)) else {
                return Vec::new();
            };
            let pattern = match prop.as_str() {
                "border-color" => "border-{}-color",
                "border-width" => "border-{}-width",
                "border-style" => "border-{}-style",
                "padding" => "padding-{}",
                _ => "margin-{}",
            };
            per_side(pattern, values)
        }
        "background" => {
            let color = split_tokens(value)
                .into_iter()
                .rev()
                .find(|t| looks_like_color(t))
                .unwrap_or_else(|| "transparent".to_string());
            vec![("background-color".to_string(), color)]
        }
        _ => vec![(prop, value.to_string())],
    }
}

/// Parse `prop: value; prop: value` into (property, value) pairs.
fn parse_declarations(css: &str) -> Vec<(String, String)> {
    let mut out = Vec::new();
    for decl in css.split(';') {
        let Some((prop, value)) = decl.split_once(':') else { continue };
        let value = value.trim();
        let value = value.strip_suffix("!important").unwrap_or(value).trim();
        if prop.trim().is_empty() || value.is_empty() {
            continue;
        }
        out.push((prop.trim().to_ascii_lowercase(), value.to_string()));
    }
    out
}

/// Declarations carried by an element's `style` attribute.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InlineStyle {
    decls: Vec<(String, String)>,
}

impl InlineStyle {
    pub fn parse(css: &str) -> Self {
        let mut style = Self::default();
        for (prop, value) in parse_declarations(css) {
            style.set(&prop, &value);
        }
        style
    }

    /// Set a declaration; shorthands replace each of their longhands.
    pub fn set(&mut self, prop: &str, value: &str) {
        for (p, v) in expand_declaration(prop, value) {
            match self.decls.iter_mut().find(|(k, _)| *k == p) {
                Some(slot) => slot.1 = v,
                None => self.decls.push((p, v)),
            }
        }
    }

    pub fn get(&self, prop: &str) -> Option<&str> {
        self.decls
            .iter()
            .find(|(k, _)| k == prop)
            .map(|(_, v)| v.as_str())
    }

    /// Remove a single declaration. Returns whether it was present.
    pub fn remove(&mut self, prop: &str) -> bool {
        let before = self.decls.len();
        self.decls.retain(|(k, _)| k != prop);
        self.decls.len() != before
    }

    pub fn is_empty(&self) -> bool {
        self.decls.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.decls.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn to_css_text(&self) -> String {
        self.decls
            .iter()
            .map(|(k, v)| format!("{}: {};", k, v))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// `tag`, `.class`, `#id` or `*`, possibly combined (`div.card#main`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompoundSelector {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
}

impl CompoundSelector {
    pub fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty()
            || text
                .chars()
                .any(|c| c.is_whitespace() || matches!(c, '>' | '+' | '~' | ':' | '['))
        {
            return None;
        }

        let mut sel = CompoundSelector { tag: None, id: None, classes: Vec::new() };
        let mut rest = text;
        let head_len = rest.find(['.', '#']).unwrap_or(rest.len());
        let head = &rest[..head_len];
        if !head.is_empty() && head != "*" {
            sel.tag = Some(head.to_ascii_lowercase());
        }
        rest = &rest[head_len..];

        while let Some(marker) = rest.chars().next() {
            let body = &rest[1..];
            let len = body.find(['.', '#']).unwrap_or(body.len());
            if len == 0 {
                return None;
            }
            let name = body[..len].to_string();
            match marker {
                '.' => sel.classes.push(name),
                _ => sel.id = Some(name),
            }
            rest = &body[len..];
        }
        Some(sel)
    }

    /// (ids, classes, tags)
    pub fn specificity(&self) -> (u32, u32, u32) {
        (
            self.id.is_some() as u32,
            self.classes.len() as u32,
            self.tag.is_some() as u32,
        )
    }

    pub fn matches(&self, el: &ElementData) -> bool {
        if let Some(tag) = &self.tag {
            if *tag != el.tag {
                return false;
            }
        }
        if let Some(id) = &self.id {
            if el.attr("id") != Some(id.as_str()) {
                return false;
            }
        }
        self.classes.iter().all(|c| el.has_class(c))
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    selectors: Vec<CompoundSelector>,
    declarations: Vec<(String, String)>,
}

/// Rules gathered from the document's `<style>` elements.
#[derive(Debug, Clone, Default)]
pub struct Stylesheet {
    rules: Vec<Rule>,
}

impl Stylesheet {
    pub fn parse(css: &str) -> Self {
        let mut sheet = Self::default();
        sheet.push_css(css);
        sheet
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn push_css(&mut self, css: &str) {
        let css = strip_comments(css);
        let mut rest = css.as_str();
        while let Some(open) = rest.find('{') {
            let prelude = rest[..open].trim();
            let Some(close) = matching_brace(rest, open) else { break };
            let body = &rest[open + 1..close];
            rest = &rest[close + 1..];

            // At-rules (`@media`, `@font-face`, ...) are skipped wholesale.
            if prelude.starts_with('@') {
                log::debug!("skipping at-rule {}", prelude);
                continue;
            }
            let selectors: Vec<CompoundSelector> = prelude
                .split(',')
                .filter_map(|s| {
                    let parsed = CompoundSelector::parse(s);
                    if parsed.is_none() {
                        log::debug!("unsupported selector skipped: {}", s.trim());
                    }
                    parsed
                })
                .collect();
            if selectors.is_empty() {
                continue;
            }
            let declarations = parse_declarations(body)
                .into_iter()
                .flat_map(|(p, v)| expand_declaration(&p, &v))
                .collect();
            self.rules.push(Rule { selectors, declarations });
        }
    }

    /// Winning declared value for `prop` on `el`: highest specificity,
    /// later rules winning ties.
    pub fn lookup(&self, el: &ElementData, prop: &str) -> Option<&str> {
        let mut best: Option<((u32, u32, u32), &str)> = None;
        for rule in &self.rules {
            let Some(spec) = rule
                .selectors
                .iter()
                .filter(|s| s.matches(el))
                .map(CompoundSelector::specificity)
                .max()
            else {
                continue;
            };
            let Some(value) = rule
                .declarations
                .iter()
                .rev()
                .find(|(k, _)| k == prop)
                .map(|(_, v)| v.as_str())
            else {
                continue;
            };
            if best.map_or(true, |(b, _)| spec >= b) {
                best = Some((spec, value));
            }
        }
        best.map(|(_, v)| v)
    }
}

fn strip_comments(css: &str) -> String {
    let mut out = String::with_capacity(css.len());
    let mut rest = css;
    while let Some(start) = rest.find("/*") {
        out.push_str(&rest[..start]);
        match rest[start + 2..].find("*/") {
            Some(end) => rest = &rest[start + 2 + end + 2..],
            None => return out,
        }
    }
    out.push_str(rest);
    out
}

fn matching_brace(s: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, c) in s[open..].char_indices() {
        match c {
            '{' => depth += 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(open + i);
                }
            }
            _ => {}
        }
    }
    None
}

/// Resolved values for one element, keyed by longhand property name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    values: HashMap<String, String>,
}

impl ComputedStyle {
    pub fn get(&self, prop: &str) -> &str {
        self.values.get(prop).map(String::as_str).unwrap_or("")
    }

    pub fn font_size(&self) -> f32 {
        parse_length(self.get("font-size"), 16.0, 16.0).unwrap_or(16.0)
    }

    pub fn line_height(&self) -> f32 {
        let fs = self.font_size();
        let raw = self.get("line-height");
        if raw == "normal" || raw.is_empty() {
            return fs * 1.2;
        }
        match raw.parse::<f32>() {
            Ok(factor) => factor * fs,
            Err(_) => parse_length(raw, fs, fs).unwrap_or(fs * 1.2),
        }
    }

    /// Pixel value of a length property; `auto` and unknown values yield `None`.
    pub fn length(&self, prop: &str, percent_base: f32) -> Option<f32> {
        parse_length(self.get(prop), self.font_size(), percent_base)
    }

    /// Border width for one side, zero when the side's style draws nothing.
    pub fn border_width(&self, side: &str) -> f32 {
        match self.get(&format!("border-{}-style", side)) {
            "none" | "hidden" | "" => 0.0,
            _ => self.length(&format!("border-{}-width", side), 0.0).unwrap_or(0.0),
        }
    }

    pub fn is_displayed(&self) -> bool {
        self.get("display") != "none"
    }
}

fn initial_value(prop: &str, el: &ElementData) -> &'static str {
    match prop {
        "display" if HIDDEN_TAGS.contains(&el.tag.as_str()) => "none",
        "display" if INLINE_TAGS.contains(&el.tag.as_str()) => "inline",
        "display" => "block",
        "color" => "rgb(0, 0, 0)",
        "background-color" => "rgba(0, 0, 0, 0)",
        p if p.starts_with("border-") && p.ends_with("-color") => "currentcolor",
        p if p.starts_with("border-") && p.ends_with("-style") => "none",
        p if p.starts_with("border-") && p.ends_with("-width") => "medium",
        p if p.starts_with("padding-") || p.starts_with("margin-") => "0px",
        "min-height" => "0px",
        "width" | "height" => "auto",
        "font-size" => "16px",
        "line-height" => "normal",
        "transform" | "filter" | "backdrop-filter" => "none",
        "transform-origin" => "50% 50%",
        _ => "",
    }
}

/// Browsers report legacy colours as `rgb()`/`rgba()` but keep colour
/// functions they understand (`oklch()`, `lab()`, ...) verbatim.
fn serialize_color(value: &str, current: &str) -> String {
    if value.eq_ignore_ascii_case("currentcolor") {
        return current.to_string();
    }
    match parse_css_color(value) {
        Ok(c) => c.to_css(),
        Err(_) => value.trim().to_string(),
    }
}

/// Cascade one element given its parent's computed style.
pub(crate) fn compute(
    el: &ElementData,
    sheet: &Stylesheet,
    parent: Option<&ComputedStyle>,
) -> ComputedStyle {
    let mut values = HashMap::with_capacity(COMPUTED_PROPERTIES.len());

    let declared = |prop: &str| -> Option<String> {
        el.style
            .get(prop)
            .or_else(|| sheet.lookup(el, prop))
            .map(str::to_string)
    };
    let inherited = |prop: &str| parent.map(|p| p.get(prop).to_string());

    // `color` and `font-size` first: other properties resolve against them.
    for prop in ["font-size", "color"] {
        let raw = match declared(prop) {
            Some(v) if v != "inherit" => Some(v),
            _ => inherited(prop),
        }
        .unwrap_or_else(|| initial_value(prop, el).to_string());
        let value = if prop == "font-size" {
            let parent_fs = parent.map(ComputedStyle::font_size).unwrap_or(16.0);
            let px = parse_length(&raw, parent_fs, parent_fs).unwrap_or(parent_fs);
            format!("{}px", px)
        } else {
            let parent_color = parent.map(|p| p.get("color")).unwrap_or("rgb(0, 0, 0)");
            serialize_color(&raw, parent_color)
        };
        values.insert(prop.to_string(), value);
    }
    let current_color = values["color"].clone();

    for &prop in COMPUTED_PROPERTIES {
        if values.contains_key(prop) {
            continue;
        }
        let raw = match declared(prop) {
            Some(v) if v == "inherit" => inherited(prop),
            Some(v) => Some(v),
            None if INHERITED.contains(&prop) => inherited(prop),
            None => None,
        }
        .unwrap_or_else(|| initial_value(prop, el).to_string());
        let value = if is_color_property(prop) {
            serialize_color(&raw, &current_color)
        } else {
            raw
        };
        values.insert(prop.to_string(), value);
    }
    ComputedStyle { values }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn border_shorthand_expands_to_longhands() {
        let s = InlineStyle::parse("border: 2px solid red; border-left-color: blue");
        assert_eq!(s.get("border-top-width"), Some("2px"));
        assert_eq!(s.get("border-right-style"), Some("solid"));
        assert_eq!(s.get("border-bottom-color"), Some("red"));
        assert_eq!(s.get("border-left-color"), Some("blue"));
    }

    #[test]
    fn tokens_respect_parentheses() {
        let toks = split_tokens("1px solid oklch(0.5 0.1 200)");
        assert_eq!(toks, vec!["1px", "solid", "oklch(0.5 0.1 200)"]);
        let s = InlineStyle::parse("border-top: 1px solid oklch(0.5 0.1 200)");
        assert_eq!(s.get("border-top-color"), Some("oklch(0.5 0.1 200)"));
    }

    #[test]
    fn background_shorthand_picks_the_color() {
        let s = InlineStyle::parse("background: url(a.png) no-repeat #eee");
        assert_eq!(s.get("background-color"), Some("#eee"));
    }

    #[test]
    fn remove_and_serialise() {
        let mut s = InlineStyle::parse("filter: blur(2px); color: red");
        assert!(s.remove("filter"));
        assert!(!s.remove("filter"));
        assert_eq!(s.to_css_text(), "color: red;");
    }

    #[test]
    fn lengths_resolve_to_pixels() {
        assert_eq!(parse_length("12px", 16.0, 0.0), Some(12.0));
        assert_eq!(parse_length("1.5em", 10.0, 0.0), Some(15.0));
        assert_eq!(parse_length("50%", 16.0, 200.0), Some(100.0));
        assert_eq!(parse_length("auto", 16.0, 0.0), None);
    }

    #[test]
    fn scale_is_read_from_transforms() {
        assert_eq!(parse_scale("none"), (1.0, 1.0));
        assert_eq!(parse_scale("scale(0.5)"), (0.5, 0.5));
        assert_eq!(parse_scale("translate(10px, 0) scale(2, 3)"), (2.0, 3.0));
        assert_eq!(parse_scale("matrix(0.8, 0, 0, 0.8, 0, 0)"), (0.8, 0.8));
    }

    #[test]
    fn selector_specificity_orders_rules() {
        let sheet = Stylesheet::parse(
            "/* base */ div { color: red } .card { color: green } @media print { div { color: blue } } div.card#x { color: navy } p > a { color: pink }",
        );
        assert_eq!(sheet.len(), 3);
        let mut el = ElementData::new("div");
        el.set_attr("class", "card");
        assert_eq!(sheet.lookup(&el, "color"), Some("green"));
        el.set_attr("id", "x");
        assert_eq!(sheet.lookup(&el, "color"), Some("navy"));
    }
}
