// SPDX-License-Identifier: PMPL-1.0-or-later
//! Responsive design analyzer - WCAG 1.4.4 Resize Text, 1.4.10 Reflow,
//! 2.5.5 / 2.5.8 Target Size
//!
//! Checks:
//! - Viewport meta present and not blocking zoom
//! - Touch targets at least 24px (AA) and 44px (AAA)
//! - Base font size at least 16px, no text under 12px
//! - No fixed widths wider than the 320px reflow viewport
//! - Stylesheets declare at least one media query
//!
//! Geometry comes from the static style model in [`crate::page`]; elements
//! whose size cannot be resolved are skipped.

use crate::analyzers::Analyzer;
use crate::error::Result;
use crate::issue::{AccessibilityIssue, Impact, IssueCategory};
use crate::page::{node_snippet, Page};

/// WCAG 2.5.8 (AA) minimum target size
pub const MIN_TARGET_PX: f64 = 24.0;
/// WCAG 2.5.5 (AAA) enhanced target size
pub const ENHANCED_TARGET_PX: f64 = 44.0;
/// Below this the page's base text is flagged
pub const MIN_BASE_FONT_PX: f64 = 16.0;
/// Below this any text is flagged
pub const MIN_TEXT_PX: f64 = 12.0;
/// Reflow viewport width
pub const REFLOW_WIDTH_PX: f64 = 320.0;

const INTERACTIVE: &str = "a[href], button, input:not([type=\"hidden\"]), select, textarea, [role=\"button\"], [onclick]";

/// Responsive design analyzer
pub struct ResponsiveAnalyzer;

impl Analyzer for ResponsiveAnalyzer {
    fn name(&self) -> &str {
        "Responsive Design Analyzer"
    }

    fn category(&self) -> IssueCategory {
        IssueCategory::Responsive
    }

    fn analyze(&self, page: &Page) -> Result<Vec<AccessibilityIssue>> {
        let mut issues = Vec::new();

        check_viewport(page, &mut issues)?;
        check_touch_targets(page, &mut issues)?;
        check_base_font_size(page, &mut issues)?;
        check_small_text(page, &mut issues)?;
        check_fixed_widths(page, &mut issues)?;
        check_breakpoints(page, &mut issues);

        Ok(issues
            .into_iter()
            .map(|i| i.with_category(IssueCategory::Responsive))
            .collect())
    }
}

/// Viewport meta must exist and must not disable or cap zoom
fn check_viewport(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let viewport = page
        .select_all("meta[name]")?
        .into_iter()
        .find(|m| m.value().attr("name").is_some_and(|n| n.eq_ignore_ascii_case("viewport")));

    let Some(meta) = viewport else {
        issues.push(
            AccessibilityIssue::new(
                "missing-viewport-meta",
                Impact::Moderate,
                "Page has no <meta name=\"viewport\">. Mobile browsers render it at desktop width, forcing horizontal scrolling.",
            )
            .with_wcag(&["1.4.10"])
            .with_help("Add <meta name=\"viewport\" content=\"width=device-width, initial-scale=1\">"),
        );
        return Ok(());
    };

    let content = meta.value().attr("content").unwrap_or("");
    let params = parse_viewport_content(content);
    let snippet = node_snippet(meta);

    let zoom_disabled = params
        .iter()
        .any(|(k, v)| k == "user-scalable" && (v == "no" || v == "0"));

    if zoom_disabled {
        issues.push(
            AccessibilityIssue::new(
                "disabled-zoom",
                Impact::Critical,
                "Viewport meta sets user-scalable=no. Users cannot zoom to read content.",
            )
            .with_wcag(&["1.4.4", "1.4.10"])
            .with_help("Remove user-scalable=no from the viewport meta content")
            .with_node(snippet.clone()),
        );
    }

    let max_scale = params
        .iter()
        .find(|(k, _)| k == "maximum-scale")
        .and_then(|(_, v)| v.parse::<f64>().ok());

    if let Some(scale) = max_scale {
        if scale < 2.0 {
            issues.push(
                AccessibilityIssue::new(
                    "limited-zoom",
                    Impact::Serious,
                    &format!(
                        "Viewport meta sets maximum-scale={}. Text must be resizable to 200%.",
                        scale
                    ),
                )
                .with_wcag(&["1.4.4"])
                .with_help("Remove maximum-scale or set it to at least 2")
                .with_node(snippet),
            );
        }
    }

    Ok(())
}

/// Split `width=device-width, initial-scale=1` into lowercase pairs
fn parse_viewport_content(content: &str) -> Vec<(String, String)> {
    content
        .split([',', ';'])
        .filter_map(|part| {
            let (k, v) = part.split_once('=')?;
            Some((k.trim().to_lowercase(), v.trim().to_lowercase()))
        })
        .collect()
}

fn check_touch_targets(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let mut critical = Vec::new();
    let mut moderate = Vec::new();

    for el in page.select_all(INTERACTIVE)? {
        let Some(side) = page.smallest_side(el) else { continue };

        if side < MIN_TARGET_PX {
            critical.push(node_snippet(el));
        } else if side < ENHANCED_TARGET_PX {
            moderate.push(node_snippet(el));
        }
    }

    if !critical.is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "critical-touch-target-size",
                Impact::Critical,
                &format!(
                    "{} interactive element(s) are smaller than {}px. Users with motor impairments cannot reliably activate them.",
                    critical.len(),
                    MIN_TARGET_PX
                ),
            )
            .with_wcag(&["2.5.8"])
            .with_help("Give interactive elements at least 24x24px, preferably 44x44px")
            .with_nodes(critical),
        );
    }

    if !moderate.is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "moderate-touch-target-size",
                Impact::Moderate,
                &format!(
                    "{} interactive element(s) are smaller than the recommended {}px.",
                    moderate.len(),
                    ENHANCED_TARGET_PX
                ),
            )
            .with_wcag(&["2.5.5"])
            .with_help("Use min-width and min-height of 44px for touch targets")
            .with_nodes(moderate),
        );
    }

    Ok(())
}

fn check_base_font_size(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for tag in ["html", "body"] {
        let Some(el) = page.select_first(tag)? else { continue };
        let Some(size) = page.computed_style(el).length_px("font-size") else { continue };

        if size < MIN_BASE_FONT_PX {
            issues.push(
                AccessibilityIssue::new(
                    "small-base-font-size",
                    Impact::Moderate,
                    &format!(
                        "Base font size on <{}> is {}px, below the recommended {}px.",
                        tag, size, MIN_BASE_FONT_PX
                    ),
                )
                .with_wcag(&["1.4.4"])
                .with_help("Set the base font size to at least 16px (1rem)")
                .with_node(format!("<{}>", tag)),
            );
            return Ok(());
        }
    }

    Ok(())
}

fn check_small_text(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let small: Vec<String> = page
        .select_all("body *")?
        .into_iter()
        .filter(|el| {
            page.computed_style(*el)
                .length_px("font-size")
                .is_some_and(|size| size < MIN_TEXT_PX)
        })
        .map(node_snippet)
        .collect();

    if !small.is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "small-text",
                Impact::Serious,
                &format!(
                    "{} element(s) use a font size under {}px.",
                    small.len(),
                    MIN_TEXT_PX
                ),
            )
            .with_wcag(&["1.4.4"])
            .with_help("Use relative font sizes of at least 0.75rem")
            .with_nodes(small),
        );
    }

    Ok(())
}

fn check_fixed_widths(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let wide: Vec<String> = page
        .select_all("body, body *")?
        .into_iter()
        .filter(|el| {
            let style = page.computed_style(*el);
            let width = style.length_px("width").or_else(|| style.length_px("min-width"));
            width.is_some_and(|w| w > REFLOW_WIDTH_PX)
        })
        .map(node_snippet)
        .collect();

    if !wide.is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "fixed-width-reflow",
                Impact::Serious,
                &format!(
                    "{} element(s) have a fixed width over {}px and will force horizontal scrolling on narrow screens.",
                    wide.len(),
                    REFLOW_WIDTH_PX
                ),
            )
            .with_wcag(&["1.4.10"])
            .with_help("Use max-width: 100% or relative widths instead of fixed pixel widths")
            .with_nodes(wide),
        );
    }

    Ok(())
}

fn check_breakpoints(page: &Page, issues: &mut Vec<AccessibilityIssue>) {
    if page.stylesheet_count() > 0 && page.media_queries().is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "no-responsive-breakpoints",
                Impact::Minor,
                "Stylesheets declare no @media queries. Layout may not adapt to small screens.",
            )
            .with_wcag(&["1.4.10"])
            .with_help("Add media queries for narrow viewports"),
        );
    }
}
