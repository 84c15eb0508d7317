// SPDX-License-Identifier: PMPL-1.0-or-later
//! HTML structure analyzer - WCAG 1.3.1 Info and Relationships, 2.4.x Navigable
//!
//! Checks the document outline and landmarks:
//! - Exactly one h1, no skipped heading levels, no empty headings
//! - A main landmark and a skip link when navigation precedes content
//! - Document language and title
//! - List items inside lists, tables with header cells
//! - Unique id attributes

use crate::analyzers::Analyzer;
use crate::error::Result;
use crate::issue::{AccessibilityIssue, Impact, IssueCategory, IssueDetails};
use crate::page::{element_text, node_snippet, Page};
use scraper::ElementRef;
use std::collections::BTreeMap;

/// HTML structure analyzer
pub struct StructureAnalyzer;

impl Analyzer for StructureAnalyzer {
    fn name(&self) -> &str {
        "HTML Structure Analyzer"
    }

    fn category(&self) -> IssueCategory {
        IssueCategory::Structure
    }

    fn analyze(&self, page: &Page) -> Result<Vec<AccessibilityIssue>> {
        let mut issues = Vec::new();

        check_h1_count(page, &mut issues)?;
        check_heading_order(page, &mut issues)?;
        check_empty_headings(page, &mut issues)?;
        check_main_landmark(page, &mut issues)?;
        check_skip_link(page, &mut issues)?;
        check_document_language(page, &mut issues)?;
        check_page_title(page, &mut issues)?;
        check_list_structure(page, &mut issues)?;
        check_table_headers(page, &mut issues)?;
        check_duplicate_ids(page, &mut issues)?;

        Ok(issues
            .into_iter()
            .map(|i| i.with_category(IssueCategory::Structure))
            .collect())
    }
}

fn structure(kind: &str, count: usize) -> IssueDetails {
    IssueDetails::Structure {
        structure_type: kind.to_string(),
        count,
    }
}

/// One h1 per page; more is one issue listing every h1, none is another
fn check_h1_count(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let h1s = page.select_all("h1")?;

    if h1s.len() > 1 {
        issues.push(
            AccessibilityIssue::new(
                "multiple-h1",
                Impact::Moderate,
                &format!(
                    "Page has {} <h1> elements. A page should have a single top-level heading.",
                    h1s.len()
                ),
            )
            .with_wcag(&["1.3.1", "2.4.6"])
            .with_help("Keep one <h1> for the page title and demote the others to <h2>")
            .with_nodes(h1s.iter().map(|h| node_snippet(*h)).collect())
            .with_details(structure("heading", h1s.len())),
        );
    } else if h1s.is_empty() && !page.select_all("h2, h3, h4, h5, h6")?.is_empty() {
        issues.push(
            AccessibilityIssue::new(
                "missing-h1",
                Impact::Moderate,
                "Page has headings but no <h1>. The first heading should describe the page.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Add an <h1> naming the page's main topic")
            .with_details(structure("heading", 0)),
        );
    }

    Ok(())
}

/// Heading levels must not skip (h2 followed by h4)
fn check_heading_order(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let headings = page.select_all("h1, h2, h3, h4, h5, h6")?;
    let mut skipped = Vec::new();
    let mut previous: Option<u8> = None;

    for heading in headings {
        let Some(level) = heading_level(heading.value().name()) else { continue };
        if let Some(prev) = previous {
            if level > prev + 1 {
                skipped.push(node_snippet(heading));
            }
        }
        previous = Some(level);
    }

    if !skipped.is_empty() {
        let count = skipped.len();
        issues.push(
            AccessibilityIssue::new(
                "heading-order",
                Impact::Moderate,
                "Heading levels are skipped. Screen reader users navigate by heading level and lose the outline.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Use consecutive heading levels, e.g. <h2> after <h1>")
            .with_nodes(skipped)
            .with_details(structure("heading", count)),
        );
    }

    Ok(())
}

fn heading_level(tag: &str) -> Option<u8> {
    tag.strip_prefix('h').and_then(|n| n.parse::<u8>().ok())
}

fn check_empty_headings(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let empty: Vec<String> = page
        .select_all("h1, h2, h3, h4, h5, h6")?
        .into_iter()
        .filter(|h| element_text(*h).is_empty() && h.value().attr("aria-label").is_none())
        .map(node_snippet)
        .collect();

    if !empty.is_empty() {
        let count = empty.len();
        issues.push(
            AccessibilityIssue::new(
                "empty-heading",
                Impact::Minor,
                "Heading element has no text content.",
            )
            .with_wcag(&["2.4.6"])
            .with_help("Give each heading text or remove the empty element")
            .with_nodes(empty)
            .with_details(structure("heading", count)),
        );
    }

    Ok(())
}

fn check_main_landmark(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    if page.select_first("body")?.is_none() {
        return Ok(());
    }

    if page.select_first("main, [role=\"main\"]")?.is_none() {
        issues.push(
            AccessibilityIssue::new(
                "missing-main-landmark",
                Impact::Moderate,
                "Page has no <main> landmark. Assistive technology cannot jump to the primary content.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Wrap the primary content in a <main> element")
            .with_details(structure("landmark", 0)),
        );
    }

    Ok(())
}

/// Pages with navigation need a way to bypass it
fn check_skip_link(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    if page.select_first("nav, [role=\"navigation\"]")?.is_none() {
        return Ok(());
    }

    // Main content starts at the first main landmark, else the first h1
    let has_main = page.select_first("main, [role=\"main\"]")?.is_some();
    let starts_content = |el: &ElementRef<'_>| {
        let name = el.value().name();
        if has_main {
            name == "main" || el.value().attr("role") == Some("main")
        } else {
            name == "h1"
        }
    };

    let has_skip_link = page
        .document()
        .root_element()
        .descendants()
        .filter_map(ElementRef::wrap)
        .take_while(|el| !starts_content(el))
        .any(|el| {
            el.value().name() == "a"
                && el
                    .value()
                    .attr("href")
                    .is_some_and(|h| h.starts_with('#') && h.len() > 1)
        });

    if !has_skip_link {
        issues.push(
            AccessibilityIssue::new(
                "missing-skip-link",
                Impact::Moderate,
                "Page has navigation but no in-page link to skip to the main content.",
            )
            .with_wcag(&["2.4.1"])
            .with_help("Add <a href=\"#main\" class=\"skip-link\">Skip to content</a> as the first focusable element")
            .with_details(structure("landmark", 0)),
        );
    }

    Ok(())
}

fn check_document_language(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let has_lang = page
        .select_first("html")?
        .and_then(|html| html.value().attr("lang"))
        .is_some_and(|lang| !lang.trim().is_empty());

    if !has_lang {
        issues.push(
            AccessibilityIssue::new(
                "missing-document-language",
                Impact::Serious,
                "The <html> element has no lang attribute. Screen readers cannot pick the right pronunciation.",
            )
            .with_wcag(&["3.1.1"])
            .with_help("Add lang=\"en\" (or the page's language) to the <html> element")
            .with_details(structure("document", 0)),
        );
    }

    Ok(())
}

fn check_page_title(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let has_title = page
        .select_first("title")?
        .is_some_and(|t| !element_text(t).is_empty());

    if !has_title {
        issues.push(
            AccessibilityIssue::new(
                "missing-page-title",
                Impact::Serious,
                "Page has no non-empty <title>.",
            )
            .with_wcag(&["2.4.2"])
            .with_help("Add a <title> describing the page's topic or purpose")
            .with_details(structure("document", 0)),
        );
    }

    Ok(())
}

fn check_list_structure(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let orphans: Vec<String> = page
        .select_all("li")?
        .into_iter()
        .filter(|li| {
            let parent_tag = li
                .parent()
                .and_then(|p| p.value().as_element().map(|e| e.name().to_string()));
            !matches!(parent_tag.as_deref(), Some("ul") | Some("ol") | Some("menu"))
        })
        .map(node_snippet)
        .collect();

    if !orphans.is_empty() {
        let count = orphans.len();
        issues.push(
            AccessibilityIssue::new(
                "invalid-list-structure",
                Impact::Serious,
                "List items appear outside a <ul>, <ol> or <menu>.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Wrap <li> elements in <ul> or <ol>")
            .with_nodes(orphans)
            .with_details(structure("list", count)),
        );
    }

    Ok(())
}

fn check_table_headers(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let th = crate::page::selector("th")?;
    let bare: Vec<String> = page
        .select_all("table")?
        .into_iter()
        .filter(|t| t.value().attr("role") != Some("presentation"))
        .filter(|t| t.select(&th).next().is_none())
        .map(node_snippet)
        .collect();

    if !bare.is_empty() {
        let count = bare.len();
        issues.push(
            AccessibilityIssue::new(
                "table-missing-headers",
                Impact::Serious,
                "Data table has no <th> header cells.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Mark header cells with <th scope=\"col\"> or <th scope=\"row\">")
            .with_nodes(bare)
            .with_details(structure("table", count)),
        );
    }

    Ok(())
}

fn check_duplicate_ids(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let mut seen: BTreeMap<String, usize> = BTreeMap::new();
    for el in page.select_all("[id]")? {
        if let Some(id) = el.value().attr("id") {
            *seen.entry(id.to_string()).or_insert(0) += 1;
        }
    }

    let duplicates: Vec<String> = seen
        .into_iter()
        .filter(|(_, n)| *n > 1)
        .map(|(id, _)| id)
        .collect();

    if !duplicates.is_empty() {
        let count = duplicates.len();
        issues.push(
            AccessibilityIssue::new(
                "duplicate-id",
                Impact::Minor,
                &format!("Duplicate id values: {}", duplicates.join(", ")),
            )
            .with_wcag(&["4.1.1"])
            .with_help("Make every id attribute unique; labels and ARIA references depend on it")
            .with_nodes(duplicates.into_iter().map(|id| format!("#{}", id)).collect())
            .with_details(structure("attribute", count)),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str) -> Vec<AccessibilityIssue> {
        let page = Page::parse("https://example.com", html);
        StructureAnalyzer.analyze(&page).expect("analysis succeeds")
    }

    fn with_id<'a>(issues: &'a [AccessibilityIssue], id: &str) -> Vec<&'a AccessibilityIssue> {
        issues.iter().filter(|i| i.id == id).collect()
    }

    #[test]
    fn test_accessible_page() {
        let html = r##"
            <html lang="en">
            <head><title>Home</title></head>
            <body>
                <a href="#main">Skip to content</a>
                <nav><ul><li><a href="/">Home</a></li></ul></nav>
                <main id="main">
                    <h1>Page Title</h1>
                    <h2>Section</h2>
                    <table><tr><th scope="col">Name</th></tr><tr><td>A</td></tr></table>
                </main>
            </body>
            </html>
        "##;
        let issues = analyze(html);
        assert!(issues.is_empty(), "Accessible page should have no issues: {:?}", issues);
    }

    #[test]
    fn test_multiple_h1_is_one_issue_with_every_node() {
        let html = r#"<html lang="en"><head><title>T</title></head><body><main>
            <h1>One</h1><h1>Two</h1><h1>Three</h1>
        </main></body></html>"#;
        let issues = analyze(html);
        let h1 = with_id(&issues, "multiple-h1");
        assert_eq!(h1.len(), 1);
        assert_eq!(h1[0].nodes.len(), 3);
        assert_eq!(h1[0].category, IssueCategory::Structure);
    }

    #[test]
    fn test_missing_h1() {
        let issues = analyze("<html><body><h2>Sub</h2></body></html>");
        assert_eq!(with_id(&issues, "missing-h1").len(), 1);
    }

    #[test]
    fn test_heading_skip() {
        let issues = analyze("<html><body><h1>Title</h1><h3>Skipped h2</h3></body></html>");
        let skip = with_id(&issues, "heading-order");
        assert_eq!(skip.len(), 1);
        assert_eq!(skip[0].nodes.len(), 1);
    }

    #[test]
    fn test_empty_heading() {
        let issues = analyze("<html><body><h1></h1></body></html>");
        assert_eq!(with_id(&issues, "empty-heading").len(), 1);
    }

    #[test]
    fn test_missing_lang_and_title() {
        let issues = analyze("<html><body><main><h1>x</h1></main></body></html>");
        assert_eq!(with_id(&issues, "missing-document-language").len(), 1);
        assert_eq!(with_id(&issues, "missing-page-title").len(), 1);
    }

    #[test]
    fn test_nav_without_skip_link() {
        let issues = analyze(r#"<html><body><nav><a href="/a">A</a></nav><main></main></body></html>"#);
        assert_eq!(with_id(&issues, "missing-skip-link").len(), 1);
    }

    #[test]
    fn test_in_page_link_after_main_is_not_a_skip_link() {
        let issues = analyze(
            r##"<html><body><nav><a href="/a">A</a></nav><main><h1>x</h1></main>
            <footer><a href="#top">Back to top</a></footer></body></html>"##,
        );
        assert_eq!(with_id(&issues, "missing-skip-link").len(), 1);
    }

    #[test]
    fn test_skip_link_before_main() {
        let issues = analyze(
            r##"<html><body><a href="#content">Skip to content</a><nav><a href="/a">A</a></nav>
            <main id="content"><h1>x</h1></main></body></html>"##,
        );
        assert!(with_id(&issues, "missing-skip-link").is_empty());

        let issues = analyze(
            r##"<html><body><nav><a href="#intro">Intro</a></nav><div><h1 id="intro">x</h1></div></body></html>"##,
        );
        assert!(with_id(&issues, "missing-skip-link").is_empty());
    }

    #[test]
    fn test_orphan_list_item() {
        let issues = analyze("<html><body><div><li>Loose</li></div></body></html>");
        assert_eq!(with_id(&issues, "invalid-list-structure").len(), 1);
    }

    #[test]
    fn test_table_without_headers() {
        let issues = analyze("<html><body><table><tr><td>1</td></tr></table></body></html>");
        assert_eq!(with_id(&issues, "table-missing-headers").len(), 1);
    }

    #[test]
    fn test_duplicate_ids() {
        let issues = analyze(r#"<html><body><p id="a"></p><p id="a"></p><p id="b"></p></body></html>"#);
        let dup = with_id(&issues, "duplicate-id");
        assert_eq!(dup.len(), 1);
        assert_eq!(dup[0].nodes, vec!["#a".to_string()]);
    }
}
