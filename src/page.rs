// SPDX-License-Identifier: PMPL-1.0-or-later
//! Parsed page model with static style resolution.
//!
//! There is no layout engine here. Styles are resolved from `<style>`
//! blocks and inline `style` attributes: matching rules apply in source
//! order, the inline style last. Specificity is not computed. Rules inside
//! at-rules (`@media`, `@supports`) are not applied, but media query
//! preludes are recorded so analyzers can tell whether breakpoints exist.

use crate::error::{Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::BTreeMap;
use std::sync::LazyLock;

/// Root font size used to resolve rem/em lengths
pub const BASE_FONT_PX: f64 = 16.0;

/// Longest node snippet kept on an issue
const MAX_SNIPPET_LEN: usize = 250;

static CSS_COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)/\*.*?\*/").expect("valid regex"));

/// Parse a CSS selector, mapping failures into the crate error
pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|_| Error::Selector(css.to_string()))
}

/// A single `name: value` declaration
#[derive(Debug, Clone, PartialEq)]
pub struct Declaration {
    pub name: String,
    pub value: String,
}

/// A top-level style rule from a `<style>` block
#[derive(Debug)]
struct StyleRule {
    /// None when the selector is not understood by the matcher
    matcher: Option<Selector>,
    declarations: Vec<Declaration>,
}

/// Style properties resolved for one element
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ComputedStyle {
    properties: BTreeMap<String, String>,
}

impl ComputedStyle {
    pub fn get(&self, name: &str) -> Option<&str> {
        self.properties.get(name).map(|v| v.as_str())
    }

    /// Resolve a length property to pixels
    pub fn length_px(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(parse_length_px)
    }

    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    fn apply(&mut self, declarations: &[Declaration]) {
        for decl in declarations {
            self.properties.insert(decl.name.clone(), decl.value.clone());
        }
    }
}

/// A fetched page: URL, parsed DOM and stylesheet model
pub struct Page {
    url: String,
    document: Html,
    rules: Vec<StyleRule>,
    media_queries: Vec<String>,
    stylesheet_count: usize,
}

impl Page {
    /// Parse raw HTML into a page
    pub fn parse(url: &str, html: &str) -> Self {
        let document = Html::parse_document(html);
        let mut rules = Vec::new();
        let mut media_queries = Vec::new();
        let mut stylesheet_count = 0;

        if let Ok(style_sel) = Selector::parse("style") {
            for style in document.select(&style_sel) {
                let css = style.text().collect::<String>();
                parse_stylesheet(&css, &mut rules, &mut media_queries);
                stylesheet_count += 1;
            }
        }

        Self {
            url: url.to_string(),
            document,
            rules,
            media_queries,
            stylesheet_count,
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn document(&self) -> &Html {
        &self.document
    }

    /// Select elements by CSS selector
    pub fn select_all(&self, css: &str) -> Result<Vec<ElementRef<'_>>> {
        let sel = selector(css)?;
        Ok(self.document.select(&sel).collect())
    }

    /// First element matching a selector
    pub fn select_first(&self, css: &str) -> Result<Option<ElementRef<'_>>> {
        let sel = selector(css)?;
        Ok(self.document.select(&sel).next())
    }

    /// `@media` preludes seen in any stylesheet
    pub fn media_queries(&self) -> &[String] {
        &self.media_queries
    }

    /// Number of inline `<style>` blocks
    pub fn stylesheet_count(&self) -> usize {
        self.stylesheet_count
    }

    /// Resolve the style of an element: matching rules in source order,
    /// then its inline `style` attribute
    pub fn computed_style(&self, element: ElementRef<'_>) -> ComputedStyle {
        let mut style = ComputedStyle::default();

        for rule in &self.rules {
            if let Some(ref matcher) = rule.matcher {
                if matcher.matches(&element) {
                    style.apply(&rule.declarations);
                }
            }
        }

        if let Some(inline) = element.value().attr("style") {
            style.apply(&parse_declarations(inline));
        }

        style
    }

    /// Smallest side in pixels among the sides that resolve. None when
    /// neither width nor height can be resolved.
    pub fn smallest_side(&self, element: ElementRef<'_>) -> Option<f64> {
        let style = self.computed_style(element);
        let width = style
            .length_px("width")
            .or_else(|| style.length_px("min-width"))
            .or_else(|| attr_px(element, "width"));
        let height = style
            .length_px("height")
            .or_else(|| style.length_px("min-height"))
            .or_else(|| attr_px(element, "height"));

        match (width, height) {
            (Some(w), Some(h)) => Some(w.min(h)),
            (side, None) | (None, side) => side,
        }
    }
}

/// Trimmed text content of an element
pub fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Outer HTML of an element, truncated for reporting
pub fn node_snippet(element: ElementRef<'_>) -> String {
    let html = element.html();
    if html.len() <= MAX_SNIPPET_LEN {
        return html;
    }
    let mut end = MAX_SNIPPET_LEN;
    while !html.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}...", &html[..end])
}

fn attr_px(element: ElementRef<'_>, name: &str) -> Option<f64> {
    let value = element.value().attr(name)?.trim();
    value
        .parse::<f64>()
        .ok()
        .or_else(|| parse_length_px(value))
}

/// Resolve a CSS length to pixels. Percentages, `auto` and viewport units
/// are unresolvable without layout and yield None.
pub fn parse_length_px(value: &str) -> Option<f64> {
    let value = value.trim().to_lowercase();
    if value == "0" {
        return Some(0.0);
    }

    let (number, factor) = if let Some(n) = value.strip_suffix("px") {
        (n, 1.0)
    } else if let Some(n) = value.strip_suffix("rem") {
        (n, BASE_FONT_PX)
    } else if let Some(n) = value.strip_suffix("em") {
        (n, BASE_FONT_PX)
    } else if let Some(n) = value.strip_suffix("pt") {
        (n, 4.0 / 3.0)
    } else {
        return None;
    };

    number.trim().parse::<f64>().ok().map(|n| n * factor)
}

/// Split a declaration block into declarations, dropping `!important`
pub fn parse_declarations(block: &str) -> Vec<Declaration> {
    block
        .split(';')
        .filter_map(|decl| {
            let (name, value) = decl.split_once(':')?;
            let name = name.trim().to_lowercase();
            let mut value = value.trim();
            if let Some(idx) = value.to_ascii_lowercase().find("!important") {
                value = value[..idx].trim();
            }
            if name.is_empty() || value.is_empty() {
                return None;
            }
            Some(Declaration {
                name,
                value: value.to_string(),
            })
        })
        .collect()
}

/// Tokenize a stylesheet into top-level rules and at-rule preludes
fn parse_stylesheet(css: &str, rules: &mut Vec<StyleRule>, media_queries: &mut Vec<String>) {
    let css = CSS_COMMENT.replace_all(css, "");
    let bytes = css.as_bytes();
    let mut pos = 0;

    while pos < bytes.len() {
        let rest = &css[pos..];
        let trimmed = rest.trim_start();
        if trimmed.is_empty() {
            break;
        }
        pos += rest.len() - trimmed.len();

        let next_brace = trimmed.find('{');
        let next_semi = trimmed.find(';');

        // Statement at-rules such as @import or @charset
        if trimmed.starts_with('@') {
            if let Some(semi) = next_semi {
                if next_brace.map_or(true, |b| semi < b) {
                    pos += semi + 1;
                    continue;
                }
            }
        }

        let Some(open) = next_brace else { break };
        let Some(close) = matching_brace(trimmed, open) else { break };

        let prelude = trimmed[..open].trim();
        let body = &trimmed[open + 1..close];

        if let Some(at_rule) = prelude.strip_prefix('@') {
            if at_rule.to_lowercase().starts_with("media") {
                media_queries.push(prelude.to_string());
            }
        } else if !prelude.is_empty() {
            rules.push(StyleRule {
                matcher: Selector::parse(prelude).ok(),
                declarations: parse_declarations(body),
            });
        }

        pos += close + 1;
    }
}

/// Index of the `}` closing the `{` at `open`
fn matching_brace(text: &str, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (idx, ch) in text[open..].char_indices() {
        match ch {
            '{' => depth += 1,
            '}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(open + idx);
                }
            }
            _ => {}
        }
    }
    None
}
