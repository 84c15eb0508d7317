// SPDX-License-Identifier: PMPL-1.0-or-later
//! Rule engine: the WCAG-tagged rule set run before the custom analyzers.
//!
//! A [`RuleEngine`] produces violations, passed rule ids and incomplete rule
//! ids (rules that could not decide, e.g. contrast against an unknown
//! background). [`BuiltinRules`] is the default implementation. Each rule
//! carries WCAG tags and only runs when they intersect the configured tags.

use crate::error::{Error, Result};
use crate::issue::{AccessibilityIssue, Impact, IssueCategory};
use crate::page::{element_text, node_snippet, Page};
use regex::Regex;
use scraper::ElementRef;
use std::sync::LazyLock;
use tracing::debug;

/// Tags a rule configuration may select
pub const WCAG_TAGS: &[&str] = &[
    "wcag2a",
    "wcag2aa",
    "wcag21a",
    "wcag21aa",
    "wcag22a",
    "wcag22aa",
    "best-practice",
];

/// Minimum contrast for normal text (1.4.3)
pub const MIN_CONTRAST_RATIO: f64 = 4.5;

static RGB_COLOR: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"rgba?\(\s*(\d+)\s*,\s*(\d+)\s*,\s*(\d+)(?:\s*,\s*([\d.]+))?").expect("valid regex")
});

/// Alt values that say nothing about the image
const GENERIC_ALT_VALUES: &[&str] = &[
    "image", "photo", "picture", "icon", "graphic", "img", "banner", "untitled", "screenshot",
    "thumbnail", "placeholder",
];

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".svg", ".webp"];

/// Input types that need no label
const UNLABELLED_INPUT_TYPES: &[&str] = &["hidden", "submit", "button", "reset", "image"];

const FOCUSABLE: &str = "a[href], button, input, select, textarea, details, summary, [tabindex]";

/// WAI-ARIA 1.2 roles, abstract roles excluded
const VALID_ROLES: &[&str] = &[
    "alert", "alertdialog", "application", "article", "banner", "blockquote", "button", "caption",
    "cell", "checkbox", "code", "columnheader", "combobox", "complementary", "contentinfo",
    "definition", "deletion", "dialog", "directory", "document", "emphasis", "feed", "figure",
    "form", "generic", "grid", "gridcell", "group", "heading", "img", "insertion", "link", "list",
    "listbox", "listitem", "log", "main", "marquee", "math", "menu", "menubar", "menuitem",
    "menuitemcheckbox", "menuitemradio", "meter", "navigation", "none", "note", "option",
    "paragraph", "presentation", "progressbar", "radio", "radiogroup", "region", "row",
    "rowgroup", "rowheader", "scrollbar", "search", "searchbox", "separator", "slider",
    "spinbutton", "status", "strong", "subscript", "superscript", "switch", "tab", "table",
    "tablist", "tabpanel", "term", "textbox", "time", "timer", "toolbar", "tooltip", "tree",
    "treegrid", "treeitem",
];

/// Tag selection for a rule run
#[derive(Debug, Clone, PartialEq)]
pub struct RuleConfig {
    tags: Vec<String>,
}

impl RuleConfig {
    /// Build a configuration, rejecting unknown or empty tag lists
    pub fn new<S: AsRef<str>>(tags: &[S]) -> Result<Self> {
        if tags.is_empty() {
            return Err(Error::Validation("at least one rule tag is required".into()));
        }
        let mut selected = Vec::with_capacity(tags.len());
        for tag in tags {
            let tag = tag.as_ref().trim();
            if !WCAG_TAGS.contains(&tag) {
                return Err(Error::Validation(format!(
                    "unknown rule tag '{}' (expected one of: {})",
                    tag,
                    WCAG_TAGS.join(", ")
                )));
            }
            selected.push(tag.to_string());
        }
        Ok(Self { tags: selected })
    }

    fn selects(&self, rule_tags: &[&str]) -> bool {
        rule_tags.iter().any(|t| self.tags.iter().any(|s| s == t))
    }
}

impl Default for RuleConfig {
    fn default() -> Self {
        Self {
            tags: WCAG_TAGS.iter().map(|t| t.to_string()).collect(),
        }
    }
}

/// Output of one rule-engine run
#[derive(Debug, Clone, Default)]
pub struct RuleResults {
    pub violations: Vec<AccessibilityIssue>,
    /// Rule ids that ran and found nothing
    pub passes: Vec<String>,
    /// Rule ids that could not reach a verdict on some node
    pub incomplete: Vec<String>,
}

/// The seam where a rule engine plugs in
pub trait RuleEngine: Send + Sync {
    fn run(&self, page: &Page, config: &RuleConfig) -> Result<RuleResults>;
}

/// What a rule check found on a page
#[derive(Debug, Default)]
struct Outcome {
    failing: Vec<String>,
    undecided: Vec<String>,
}

struct Rule {
    id: &'static str,
    impact: Impact,
    tags: &'static [&'static str],
    wcag: &'static [&'static str],
    description: &'static str,
    help: &'static str,
    check: fn(&Page) -> Result<Outcome>,
}

const RULES: &[Rule] = &[
    Rule {
        id: "image-alt",
        impact: Impact::Critical,
        tags: &["wcag2a"],
        wcag: &["1.1.1"],
        description: "Images must have alternative text",
        help: "Add alt=\"description\" for informative images or alt=\"\" for decorative images",
        check: check_image_alt,
    },
    Rule {
        id: "label",
        impact: Impact::Critical,
        tags: &["wcag2a"],
        wcag: &["1.3.1", "4.1.2"],
        description: "Form elements must have labels",
        help: "Add a <label for=\"input-id\"> element or aria-label attribute",
        check: check_labels,
    },
    Rule {
        id: "button-name",
        impact: Impact::Critical,
        tags: &["wcag2a"],
        wcag: &["4.1.2"],
        description: "Buttons must have discernible text",
        help: "Give the button visible text, an aria-label or a title",
        check: check_button_names,
    },
    Rule {
        id: "link-name",
        impact: Impact::Serious,
        tags: &["wcag2a"],
        wcag: &["2.4.4", "4.1.2"],
        description: "Links must have discernible text",
        help: "Give the link text content, an aria-label or an image with alt text",
        check: check_link_names,
    },
    Rule {
        id: "html-has-lang",
        impact: Impact::Serious,
        tags: &["wcag2a"],
        wcag: &["3.1.1"],
        description: "<html> element must have a lang attribute",
        help: "Add lang=\"en\" (or the page's language) to the <html> element",
        check: check_html_lang,
    },
    Rule {
        id: "document-title",
        impact: Impact::Serious,
        tags: &["wcag2a"],
        wcag: &["2.4.2"],
        description: "Documents must have a non-empty <title> element",
        help: "Add a <title> that describes the page",
        check: check_document_title,
    },
    Rule {
        id: "color-contrast",
        impact: Impact::Serious,
        tags: &["wcag2aa"],
        wcag: &["1.4.3"],
        description: "Text must have a contrast ratio of at least 4.5:1 against its background",
        help: "Increase contrast between text color and background color to at least 4.5:1",
        check: check_color_contrast,
    },
    Rule {
        id: "tabindex",
        impact: Impact::Serious,
        tags: &["best-practice"],
        wcag: &["2.4.3"],
        description: "Elements should not have a tabindex greater than zero",
        help: "Use tabindex=\"0\" and order elements in the DOM instead",
        check: check_tabindex,
    },
    Rule {
        id: "aria-roles",
        impact: Impact::Critical,
        tags: &["wcag2a"],
        wcag: &["4.1.2"],
        description: "ARIA role values must be valid",
        help: "Use a role defined by WAI-ARIA, or remove the role attribute",
        check: check_aria_roles,
    },
    Rule {
        id: "aria-hidden-focus",
        impact: Impact::Serious,
        tags: &["wcag2a"],
        wcag: &["4.1.2"],
        description: "aria-hidden elements must not be focusable",
        help: "Remove aria-hidden=\"true\" or add tabindex=\"-1\" to remove it from the tab order",
        check: check_aria_hidden_focus,
    },
];

/// Built-in rule set
pub struct BuiltinRules;

impl RuleEngine for BuiltinRules {
    fn run(&self, page: &Page, config: &RuleConfig) -> Result<RuleResults> {
        let mut results = RuleResults::default();

        for rule in RULES.iter().filter(|r| config.selects(r.tags)) {
            let outcome = (rule.check)(page)?;
            debug!(
                "Rule {}: {} failing, {} undecided",
                rule.id,
                outcome.failing.len(),
                outcome.undecided.len()
            );

            if !outcome.undecided.is_empty() {
                results.incomplete.push(rule.id.to_string());
            }

            if outcome.failing.is_empty() {
                if outcome.undecided.is_empty() {
                    results.passes.push(rule.id.to_string());
                }
                continue;
            }

            results.violations.push(
                AccessibilityIssue::new(rule.id, rule.impact, rule.description)
                    .with_category(IssueCategory::Rules)
                    .with_wcag(rule.wcag)
                    .with_help(rule.help)
                    .with_nodes(outcome.failing),
            );
        }

        Ok(results)
    }
}

fn has_aria_name(el: ElementRef<'_>) -> bool {
    let attr = |name| el.value().attr(name).is_some_and(|v: &str| !v.trim().is_empty());
    attr("aria-label") || attr("aria-labelledby") || attr("title")
}

fn check_image_alt(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for img in page.select_all("img")? {
        let role = img.value().attr("role").unwrap_or("");
        if role == "presentation" || role == "none" {
            continue;
        }

        match img.value().attr("alt") {
            None if !has_aria_name(img) => outcome.failing.push(node_snippet(img)),
            None => {}
            Some(alt) => {
                let alt = alt.trim().to_lowercase();
                if IMAGE_EXTENSIONS.iter().any(|ext| alt.ends_with(ext)) {
                    outcome.failing.push(node_snippet(img));
                } else if GENERIC_ALT_VALUES.contains(&alt.as_str()) {
                    outcome.undecided.push(node_snippet(img));
                }
            }
        }
    }

    Ok(outcome)
}

fn check_labels(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    let label_fors: Vec<&str> = page
        .select_all("label[for]")?
        .into_iter()
        .filter_map(|l| l.value().attr("for"))
        .collect();

    for field in page.select_all("input, select, textarea")? {
        let input_type = field.value().attr("type").unwrap_or("text").to_lowercase();
        if field.value().name() == "input" && UNLABELLED_INPUT_TYPES.contains(&input_type.as_str()) {
            continue;
        }

        let has_label = field
            .value()
            .attr("id")
            .is_some_and(|id| label_fors.contains(&id));
        let is_wrapped = field
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|a| a.value().name() == "label");

        if !has_label && !is_wrapped && !has_aria_name(field) {
            outcome.failing.push(node_snippet(field));
        }
    }

    Ok(outcome)
}

fn check_button_names(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    let img_sel = crate::page::selector("img[alt]")?;

    for button in page.select_all("button, [role=\"button\"]")? {
        let image_name = button
            .select(&img_sel)
            .any(|img| img.value().attr("alt").is_some_and(|a| !a.trim().is_empty()));

        if element_text(button).is_empty() && !has_aria_name(button) && !image_name {
            outcome.failing.push(node_snippet(button));
        }
    }

    for input in page.select_all("input[type=\"submit\"], input[type=\"button\"], input[type=\"reset\"]")? {
        let input_type = input.value().attr("type").unwrap_or("");
        let has_value = input.value().attr("value").is_some_and(|v| !v.trim().is_empty());
        // submit and reset fall back to a browser-supplied label
        if input_type == "button" && !has_value && !has_aria_name(input) {
            outcome.failing.push(node_snippet(input));
        }
    }

    Ok(outcome)
}

fn check_link_names(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for link in page.select_all("a[href]")? {
        if !element_text(link).is_empty() || has_aria_name(link) {
            continue;
        }
        let image_name = link
            .descendants()
            .filter_map(ElementRef::wrap)
            .any(|d| d.value().name() == "img" && d.value().attr("alt").is_some_and(|a| !a.trim().is_empty()));
        if !image_name {
            outcome.failing.push(node_snippet(link));
        }
    }

    Ok(outcome)
}

fn check_html_lang(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    if let Some(html) = page.select_first("html")? {
        if !html.value().attr("lang").is_some_and(|l| !l.trim().is_empty()) {
            outcome.failing.push("<html>".to_string());
        }
    }
    Ok(outcome)
}

fn check_document_title(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    let titled = page
        .select_first("title")?
        .is_some_and(|t| !element_text(t).is_empty());
    if !titled {
        outcome.failing.push("<html>".to_string());
    }
    Ok(outcome)
}

fn check_color_contrast(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();

    for el in page.select_all("body, body *")? {
        let own_text = el
            .children()
            .filter_map(|c| c.value().as_text())
            .any(|t| !t.trim().is_empty());
        if !own_text {
            continue;
        }

        let Some(fg) = page.computed_style(el).get("color").and_then(parse_color) else {
            continue;
        };

        match resolve_background(page, el) {
            Some(bg) => {
                let ratio = contrast_ratio(fg, bg);
                if ratio < MIN_CONTRAST_RATIO {
                    outcome.failing.push(node_snippet(el));
                }
            }
            None => outcome.undecided.push(node_snippet(el)),
        }
    }

    Ok(outcome)
}

/// Nearest opaque background color on the element or its ancestors.
/// Images and gradients make the background unknown.
fn resolve_background(page: &Page, el: ElementRef<'_>) -> Option<(u8, u8, u8)> {
    let chain = std::iter::once(el).chain(el.ancestors().filter_map(ElementRef::wrap));
    for node in chain {
        let style = page.computed_style(node);
        for prop in ["background-color", "background"] {
            let Some(value) = style.get(prop) else { continue };
            let lower = value.to_lowercase();
            if lower.contains("url(") || lower.contains("gradient(") {
                return None;
            }
            if lower.trim() == "transparent" || is_translucent(&lower) {
                continue;
            }
            if let Some(color) = parse_color(&lower)
                .or_else(|| lower.split_whitespace().find_map(parse_color))
            {
                return Some(color);
            }
        }
    }
    None
}

fn is_translucent(value: &str) -> bool {
    RGB_COLOR
        .captures(value)
        .and_then(|c| c.get(4))
        .and_then(|a| a.as_str().parse::<f64>().ok())
        .is_some_and(|alpha| alpha < 1.0)
}

fn check_tabindex(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    for el in page.select_all("[tabindex]")? {
        let positive = el
            .value()
            .attr("tabindex")
            .and_then(|v| v.trim().parse::<i32>().ok())
            .is_some_and(|v| v > 0);
        if positive {
            outcome.failing.push(node_snippet(el));
        }
    }
    Ok(outcome)
}

fn check_aria_roles(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    for el in page.select_all("[role]")? {
        let role = el.value().attr("role").unwrap_or("").to_lowercase();
        let roles: Vec<&str> = role.split_whitespace().collect();
        // Fallback lists are valid when any listed role is known
        if roles.is_empty() || !roles.iter().any(|r| VALID_ROLES.contains(r)) {
            outcome.failing.push(node_snippet(el));
        }
    }
    Ok(outcome)
}

fn check_aria_hidden_focus(page: &Page) -> Result<Outcome> {
    let mut outcome = Outcome::default();
    let focusable = crate::page::selector(FOCUSABLE)?;

    for hidden in page.select_all("[aria-hidden=\"true\"]")? {
        let chain = std::iter::once(hidden).chain(hidden.select(&focusable));
        for el in chain {
            if !focusable.matches(&el) {
                continue;
            }
            let removed = el
                .value()
                .attr("tabindex")
                .and_then(|v| v.trim().parse::<i32>().ok())
                .is_some_and(|v| v < 0);
            if !removed && el.value().attr("disabled").is_none() {
                outcome.failing.push(node_snippet(el));
            }
        }
    }
    Ok(outcome)
}

/// Parse a CSS hex color (#rgb, #rrggbb) into (r, g, b) components
pub fn parse_hex_color(hex: &str) -> Option<(u8, u8, u8)> {
    let hex = hex.trim_start_matches('#');
    if !hex.is_ascii() {
        return None;
    }
    match hex.len() {
        3 => {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some((r, g, b))
        }
        6 => {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some((r, g, b))
        }
        _ => None,
    }
}

/// Parse an rgb() or rgba() color into (r, g, b)
pub fn parse_rgb_color(value: &str) -> Option<(u8, u8, u8)> {
    let caps = RGB_COLOR.captures(value)?;
    let r: u8 = caps[1].parse().ok()?;
    let g: u8 = caps[2].parse().ok()?;
    let b: u8 = caps[3].parse().ok()?;
    Some((r, g, b))
}

/// Parse any CSS color value into (r, g, b)
pub fn parse_color(value: &str) -> Option<(u8, u8, u8)> {
    let trimmed = value.trim().to_lowercase();
    if trimmed.starts_with('#') {
        parse_hex_color(&trimmed)
    } else if trimmed.starts_with("rgb") {
        parse_rgb_color(&trimmed)
    } else {
        parse_named_color(&trimmed)
    }
}

/// Parse a named CSS color
pub fn parse_named_color(name: &str) -> Option<(u8, u8, u8)> {
    match name {
        "white" => Some((255, 255, 255)),
        "black" => Some((0, 0, 0)),
        "red" => Some((255, 0, 0)),
        "green" => Some((0, 128, 0)),
        "blue" => Some((0, 0, 255)),
        "yellow" => Some((255, 255, 0)),
        "gray" | "grey" => Some((128, 128, 128)),
        "silver" => Some((192, 192, 192)),
        "maroon" => Some((128, 0, 0)),
        "olive" => Some((128, 128, 0)),
        "lime" => Some((0, 255, 0)),
        "aqua" | "cyan" => Some((0, 255, 255)),
        "teal" => Some((0, 128, 128)),
        "navy" => Some((0, 0, 128)),
        "fuchsia" | "magenta" => Some((255, 0, 255)),
        "purple" => Some((128, 0, 128)),
        "orange" => Some((255, 165, 0)),
        _ => None,
    }
}

/// Relative luminance per WCAG 2.x
/// <https://www.w3.org/TR/WCAG21/#dfn-relative-luminance>
pub fn relative_luminance(r: u8, g: u8, b: u8) -> f64 {
    let srgb = [r, g, b].map(|c| {
        let v = c as f64 / 255.0;
        if v <= 0.04045 {
            v / 12.92
        } else {
            ((v + 0.055) / 1.055).powf(2.4)
        }
    });
    0.2126 * srgb[0] + 0.7152 * srgb[1] + 0.0722 * srgb[2]
}

/// Contrast ratio between two colors, always >= 1.0
pub fn contrast_ratio(fg: (u8, u8, u8), bg: (u8, u8, u8)) -> f64 {
    let l1 = relative_luminance(fg.0, fg.1, fg.2);
    let l2 = relative_luminance(bg.0, bg.1, bg.2);
    let (lighter, darker) = if l1 > l2 { (l1, l2) } else { (l2, l1) };
    (lighter + 0.05) / (darker + 0.05)
}
