// SPDX-License-Identifier: PMPL-1.0-or-later
//! Document accessibility: PDF and Office files.
//!
//! Binary documents are not parsed. A URL that names a PDF or Office file
//! gets a fixed set of advisory issues that call for manual review. On HTML
//! pages, links to such documents are checked for a visible format hint.

use crate::analyzers::Analyzer;
use crate::error::Result;
use crate::issue::{AccessibilityIssue, Impact, IssueCategory, IssueDetails};
use crate::page::{element_text, node_snippet, Page};
use serde::{Deserialize, Serialize};

/// Document formats recognised by extension
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentKind {
    Pdf,
    Word,
    Excel,
    PowerPoint,
}

impl DocumentKind {
    /// Detect a document URL by its path extension
    pub fn from_url(url: &str) -> Option<Self> {
        let path = url.split(['?', '#']).next().unwrap_or("");
        let ext = path.rsplit_once('.')?.1.to_lowercase();
        match ext.as_str() {
            "pdf" => Some(DocumentKind::Pdf),
            "doc" | "docx" | "odt" | "rtf" => Some(DocumentKind::Word),
            "xls" | "xlsx" | "ods" => Some(DocumentKind::Excel),
            "ppt" | "pptx" | "odp" => Some(DocumentKind::PowerPoint),
            _ => None,
        }
    }

    /// Words a link text may use to announce this format
    fn format_hints(&self) -> &'static [&'static str] {
        match self {
            DocumentKind::Pdf => &["pdf"],
            DocumentKind::Word => &["doc", "word"],
            DocumentKind::Excel => &["xls", "excel", "spreadsheet"],
            DocumentKind::PowerPoint => &["ppt", "powerpoint", "slides", "presentation"],
        }
    }

    pub fn is_office(&self) -> bool {
        !matches!(self, DocumentKind::Pdf)
    }
}

impl std::fmt::Display for DocumentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DocumentKind::Pdf => write!(f, "pdf"),
            DocumentKind::Word => write!(f, "word"),
            DocumentKind::Excel => write!(f, "excel"),
            DocumentKind::PowerPoint => write!(f, "powerpoint"),
        }
    }
}

/// Advisory issues for a direct document URL
pub fn analyze_document_url(url: &str, kind: DocumentKind) -> Vec<AccessibilityIssue> {
    let details = IssueDetails::Document {
        document_type: kind.to_string(),
        url: url.to_string(),
    };

    let issues = if kind.is_office() {
        vec![
            AccessibilityIssue::new(
                "office-document-structure-unverified",
                Impact::Moderate,
                &format!(
                    "{} document structure (headings, lists, tables) cannot be verified automatically.",
                    kind
                ),
            )
            .with_wcag(&["1.3.1"])
            .with_help("Check the document with the authoring tool's accessibility checker"),
            AccessibilityIssue::new(
                "office-alt-text-unverified",
                Impact::Moderate,
                "Images and charts in the document may lack alternative text.",
            )
            .with_wcag(&["1.1.1"])
            .with_help("Add alt text to every image, chart and SmartArt object"),
        ]
    } else {
        vec![
            AccessibilityIssue::new(
                "pdf-tagging-unverified",
                Impact::Serious,
                "PDF tagging cannot be verified automatically. Untagged PDFs are unreadable by screen readers.",
            )
            .with_wcag(&["1.3.1"])
            .with_help("Export a tagged PDF and verify it with a PDF accessibility checker"),
            AccessibilityIssue::new(
                "pdf-language-unverified",
                Impact::Moderate,
                "The PDF's document language cannot be verified automatically.",
            )
            .with_wcag(&["3.1.1"])
            .with_help("Set the document language in the PDF properties"),
            AccessibilityIssue::new(
                "pdf-reading-order-unverified",
                Impact::Moderate,
                "The PDF's reading order cannot be verified automatically.",
            )
            .with_wcag(&["1.3.2"])
            .with_help("Check the tag order matches the visual reading order"),
        ]
    };

    issues
        .into_iter()
        .map(|i| {
            i.with_category(IssueCategory::Document)
                .with_node(url)
                .with_details(details.clone())
        })
        .collect()
}

/// Links to documents must say what format they open
pub struct DocumentLinkAnalyzer;

impl Analyzer for DocumentLinkAnalyzer {
    fn name(&self) -> &str {
        "Document Link Analyzer"
    }

    fn category(&self) -> IssueCategory {
        IssueCategory::Document
    }

    fn analyze(&self, page: &Page) -> Result<Vec<AccessibilityIssue>> {
        let mut issues = Vec::new();

        for link in page.select_all("a[href]")? {
            let href = link.value().attr("href").unwrap_or("");
            let Some(kind) = DocumentKind::from_url(href) else { continue };

            let label = format!(
                "{} {} {}",
                element_text(link),
                link.value().attr("aria-label").unwrap_or(""),
                link.value().attr("title").unwrap_or("")
            )
            .to_lowercase();

            if kind.format_hints().iter().any(|hint| label.contains(hint)) {
                continue;
            }

            issues.push(
                AccessibilityIssue::new(
                    "document-link-missing-format",
                    Impact::Minor,
                    &format!(
                        "Link opens a {} document but its text does not say so.",
                        kind
                    ),
                )
                .with_category(IssueCategory::Document)
                .with_wcag(&["2.4.4"])
                .with_help("Name the format and size in the link text, e.g. \"Annual report (PDF, 2 MB)\"")
                .with_node(node_snippet(link))
                .with_details(IssueDetails::Document {
                    document_type: kind.to_string(),
                    url: href.to_string(),
                }),
            );
        }

        Ok(issues)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_from_url() {
        assert_eq!(DocumentKind::from_url("https://x.org/report.PDF"), Some(DocumentKind::Pdf));
        assert_eq!(DocumentKind::from_url("/files/plan.docx?dl=1"), Some(DocumentKind::Word));
        assert_eq!(DocumentKind::from_url("/deck.pptx#p2"), Some(DocumentKind::PowerPoint));
        assert_eq!(DocumentKind::from_url("/sheet.xlsx"), Some(DocumentKind::Excel));
        assert_eq!(DocumentKind::from_url("https://x.org/index.html"), None);
        assert_eq!(DocumentKind::from_url("https://x.org/"), None);
    }

    #[test]
    fn test_pdf_advisories() {
        let issues = analyze_document_url("https://x.org/a.pdf", DocumentKind::Pdf);
        assert_eq!(issues.len(), 3);
        assert!(issues.iter().all(|i| i.category == IssueCategory::Document));
        assert!(issues.iter().any(|i| i.id == "pdf-tagging-unverified"));
        assert_eq!(issues[0].nodes, vec!["https://x.org/a.pdf".to_string()]);
    }

    #[test]
    fn test_office_advisories() {
        let issues = analyze_document_url("https://x.org/a.docx", DocumentKind::Word);
        let ids: Vec<_> = issues.iter().map(|i| i.id.as_str()).collect();
        assert_eq!(ids, vec!["office-document-structure-unverified", "office-alt-text-unverified"]);
    }

    #[test]
    fn test_document_links() {
        let html = r#"<html><body>
            <a href="/report.pdf">Annual report</a>
            <a href="/report2.pdf">Annual report (PDF, 2 MB)</a>
            <a href="/data.xlsx" aria-label="Budget spreadsheet">Budget</a>
            <a href="/about">About</a>
        </body></html>"#;
        let page = Page::parse("https://example.com", html);
        let issues = DocumentLinkAnalyzer.analyze(&page).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "document-link-missing-format");
        assert!(issues[0].nodes[0].contains("/report.pdf"));
    }
}
