// SPDX-License-Identifier: PMPL-1.0-or-later
//! Accessibility issue records and per-run results.
//!
//! Issues are built by analyzers and the rule engine with consuming
//! builder methods, then collected into an [`IssueSet`] and summarised
//! into a [`TestResult`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Severity of an issue, ordered so that `Critical > Serious > Moderate > Minor`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Impact {
    /// Cosmetic or best-practice gap
    Minor,
    /// Some users are hindered
    Moderate,
    /// Some users are blocked from parts of the page
    Serious,
    /// Content is unusable for affected users
    Critical,
}

impl Impact {
    /// All impacts, most severe first
    pub const ALL: [Impact; 4] = [Impact::Critical, Impact::Serious, Impact::Moderate, Impact::Minor];
}

impl std::fmt::Display for Impact {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Impact::Critical => write!(f, "critical"),
            Impact::Serious => write!(f, "serious"),
            Impact::Moderate => write!(f, "moderate"),
            Impact::Minor => write!(f, "minor"),
        }
    }
}

impl std::str::FromStr for Impact {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "critical" => Ok(Impact::Critical),
            "serious" => Ok(Impact::Serious),
            "moderate" => Ok(Impact::Moderate),
            "minor" => Ok(Impact::Minor),
            other => Err(format!("Unknown impact: {}", other)),
        }
    }
}

/// Which producer emitted an issue
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueCategory {
    Rules,
    Structure,
    Responsive,
    Media,
    Document,
    /// Synthetic issues for analyzers that failed
    Analysis,
}

impl std::fmt::Display for IssueCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            IssueCategory::Rules => "rules",
            IssueCategory::Structure => "structure",
            IssueCategory::Responsive => "responsive",
            IssueCategory::Media => "media",
            IssueCategory::Document => "document",
            IssueCategory::Analysis => "analysis",
        };
        f.write_str(name)
    }
}

/// Producer-specific detail payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum IssueDetails {
    Document {
        document_type: String,
        url: String,
    },
    Media {
        media_type: String,
        source: Option<String>,
    },
    Structure {
        structure_type: String,
        count: usize,
    },
}

/// A detected accessibility problem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessibilityIssue {
    /// Rule identifier (e.g. "multiple-h1")
    pub id: String,
    pub impact: Impact,
    pub description: String,
    /// Short remediation hint
    pub help: Option<String>,
    /// HTML fragments implicated
    pub nodes: Vec<String>,
    /// WCAG success criteria (e.g. "1.4.3")
    pub wcag_criteria: Vec<String>,
    pub category: IssueCategory,
    pub details: Option<IssueDetails>,
}

impl AccessibilityIssue {
    /// Create a new issue with no nodes or criteria
    pub fn new(id: &str, impact: Impact, description: &str) -> Self {
        Self {
            id: id.to_string(),
            impact,
            description: description.to_string(),
            help: None,
            nodes: Vec::new(),
            wcag_criteria: Vec::new(),
            category: IssueCategory::Rules,
            details: None,
        }
    }

    pub fn with_category(mut self, category: IssueCategory) -> Self {
        self.category = category;
        self
    }

    /// Set the WCAG criteria
    pub fn with_wcag(mut self, criteria: &[&str]) -> Self {
        self.wcag_criteria = criteria.iter().map(|c| c.to_string()).collect();
        self
    }

    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Add one implicated node
    pub fn with_node(mut self, node: impl Into<String>) -> Self {
        self.nodes.push(node.into());
        self
    }

    /// Replace the implicated nodes
    pub fn with_nodes(mut self, nodes: Vec<String>) -> Self {
        self.nodes = nodes;
        self
    }

    pub fn with_details(mut self, details: IssueDetails) -> Self {
        self.details = Some(details);
        self
    }
}

/// A collection of issues with aggregation methods
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssueSet {
    pub issues: Vec<AccessibilityIssue>,
}

impl IssueSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, issue: AccessibilityIssue) {
        self.issues.push(issue);
    }

    pub fn extend(&mut self, issues: impl IntoIterator<Item = AccessibilityIssue>) {
        self.issues.extend(issues);
    }

    /// Count issues per impact and category
    pub fn summarize(&self) -> Summary {
        let mut summary = Summary::default();
        for issue in &self.issues {
            match issue.impact {
                Impact::Critical => summary.critical += 1,
                Impact::Serious => summary.serious += 1,
                Impact::Moderate => summary.moderate += 1,
                Impact::Minor => summary.minor += 1,
            }
            *summary.by_category.entry(issue.category.to_string()).or_insert(0) += 1;
        }
        summary.total = self.issues.len();
        summary
    }
}

/// Issue counts for one test run
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Summary {
    pub critical: usize,
    pub serious: usize,
    pub moderate: usize,
    pub minor: usize,
    pub total: usize,
    /// Keyed by category name
    pub by_category: BTreeMap<String, usize>,
}

/// Outcome of auditing one URL
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResult {
    pub url: String,
    pub timestamp: DateTime<Utc>,
    /// Violations from the rule engine and every analyzer
    pub issues: Vec<AccessibilityIssue>,
    /// Rule ids that ran and found nothing
    pub passes: Vec<String>,
    /// Rule ids that need manual review
    pub incomplete: Vec<String>,
    /// Downgraded analyzer failures
    pub warnings: Vec<String>,
    pub summary: Summary,
}

impl TestResult {
    /// Build a result, computing the summary from the issues
    pub fn new(url: &str, issues: IssueSet) -> Self {
        let summary = issues.summarize();
        Self {
            url: url.to_string(),
            timestamp: Utc::now(),
            issues: issues.issues,
            passes: Vec::new(),
            incomplete: Vec::new(),
            warnings: Vec::new(),
            summary,
        }
    }

    pub fn has_critical(&self) -> bool {
        self.summary.critical > 0
    }

    /// Issues with a given rule id
    pub fn issues_with_id(&self, id: &str) -> Vec<&AccessibilityIssue> {
        self.issues.iter().filter(|i| i.id == id).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_impact_ordering() {
        assert!(Impact::Critical > Impact::Serious);
        assert!(Impact::Serious > Impact::Moderate);
        assert!(Impact::Moderate > Impact::Minor);
        assert_eq!(Impact::ALL.iter().max(), Some(&Impact::Critical));
    }

    #[test]
    fn test_impact_parse() {
        assert_eq!("Serious".parse::<Impact>().unwrap(), Impact::Serious);
        assert!("blocker".parse::<Impact>().is_err());
    }

    #[test]
    fn test_builder() {
        let issue = AccessibilityIssue::new("multiple-h1", Impact::Moderate, "Too many h1")
            .with_category(IssueCategory::Structure)
            .with_wcag(&["1.3.1", "2.4.6"])
            .with_node("<h1>A</h1>")
            .with_node("<h1>B</h1>");

        assert_eq!(issue.nodes.len(), 2);
        assert_eq!(issue.wcag_criteria, vec!["1.3.1".to_string(), "2.4.6".to_string()]);
        assert_eq!(issue.category, IssueCategory::Structure);
    }

    #[test]
    fn test_summary_counts() {
        let mut set = IssueSet::new();
        set.add(AccessibilityIssue::new("a", Impact::Critical, "a"));
        set.add(AccessibilityIssue::new("b", Impact::Minor, "b").with_category(IssueCategory::Media));
        set.add(AccessibilityIssue::new("c", Impact::Minor, "c").with_category(IssueCategory::Media));

        let summary = set.summarize();
        assert_eq!(summary.critical, 1);
        assert_eq!(summary.minor, 2);
        assert_eq!(summary.total, 3);
        assert_eq!(summary.by_category.get("media"), Some(&2));
        assert_eq!(summary.by_category.get("rules"), Some(&1));
    }

    #[test]
    fn test_details_serialization_is_tagged() {
        let issue = AccessibilityIssue::new("pdf-tagging-unverified", Impact::Moderate, "x").with_details(
            IssueDetails::Document {
                document_type: "pdf".into(),
                url: "https://example.com/a.pdf".into(),
            },
        );
        let json = serde_json::to_value(&issue).unwrap();
        assert_eq!(json["details"]["kind"], "document");
        assert_eq!(json["details"]["documentType"], "pdf");
        assert_eq!(json["wcagCriteria"], serde_json::json!([]));
    }
}
