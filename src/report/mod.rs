// SPDX-License-Identifier: PMPL-1.0-or-later
//! Report generation for test results.
//!
//! Supports multiple output formats:
//! - Text: human-readable issues with WCAG criterion references
//! - JSON: structured results for programmatic consumption
//! - SARIF: Static Analysis Results Interchange Format for IDE/CI integration

use crate::issue::{Impact, TestResult};
use crate::recommend::Recommendation;
use serde::Serialize;

/// Output format for reports
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable text
    Text,
    /// Structured JSON
    Json,
    /// SARIF for IDE/CI integration
    Sarif,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
            OutputFormat::Sarif => write!(f, "sarif"),
        }
    }
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "text" => Ok(OutputFormat::Text),
            "json" => Ok(OutputFormat::Json),
            "sarif" => Ok(OutputFormat::Sarif),
            other => Err(format!("Unknown output format: {}", other)),
        }
    }
}

/// Generate a report for one or more test results
pub fn generate_report(
    results: &[TestResult],
    recommendations: &[Recommendation],
    format: OutputFormat,
) -> String {
    match format {
        OutputFormat::Text => generate_text_report(results, recommendations),
        OutputFormat::Json => generate_json_report(results, recommendations),
        OutputFormat::Sarif => generate_sarif_report(results),
    }
}

/// Generate human-readable text report
fn generate_text_report(results: &[TestResult], recommendations: &[Recommendation]) -> String {
    let mut output = String::new();

    output.push_str("=== Auditbot WCAG Accessibility Report ===\n\n");

    for result in results {
        output.push_str(&format!("URL: {}\n", result.url));
        output.push_str(&format!("Tested: {}\n", result.timestamp.to_rfc3339()));

        if result.issues.is_empty() {
            output.push_str("No accessibility issues found.\n\n");
        } else {
            let s = &result.summary;
            output.push_str(&format!(
                "Found {} issue(s): {} critical, {} serious, {} moderate, {} minor\n",
                s.total, s.critical, s.serious, s.moderate, s.minor
            ));
            let categories: Vec<String> = s
                .by_category
                .iter()
                .map(|(cat, n)| format!("{} {}", cat, n))
                .collect();
            output.push_str(&format!("By category: {}\n\n", categories.join(", ")));
        }

        for impact in Impact::ALL {
            let issues: Vec<_> = result.issues.iter().filter(|i| i.impact == impact).collect();
            if issues.is_empty() {
                continue;
            }

            output.push_str(&format!("--- {} ({}) ---\n", impact, issues.len()));

            for issue in issues {
                output.push_str(&format!("[{}] {}\n", issue.id, issue.description));

                if !issue.wcag_criteria.is_empty() {
                    output.push_str(&format!("  WCAG: {}\n", issue.wcag_criteria.join(", ")));
                }
                if let Some(ref help) = issue.help {
                    output.push_str(&format!("  Fix: {}\n", help));
                }
                for node in issue.nodes.iter().take(3) {
                    output.push_str(&format!("  Element: {}\n", node));
                }
                if issue.nodes.len() > 3 {
                    output.push_str(&format!("  ... and {} more\n", issue.nodes.len() - 3));
                }
                output.push('\n');
            }
        }

        if !result.incomplete.is_empty() {
            output.push_str(&format!("Needs review: {}\n", result.incomplete.join(", ")));
        }
        for warning in &result.warnings {
            output.push_str(&format!("Warning: {}\n", warning));
        }
        output.push('\n');
    }

    if !recommendations.is_empty() {
        output.push_str("=== Recommendations ===\n\n");
        for rec in recommendations {
            output.push_str(&format!("[{}] {}\n", rec.issue_id, rec.summary));
            for (n, step) in rec.steps.iter().enumerate() {
                output.push_str(&format!("  {}. {}\n", n + 1, step));
            }
            for example in &rec.code_examples {
                output.push_str(&format!(
                    "  ```{}\n{}\n  ```\n",
                    example.language.as_deref().unwrap_or(""),
                    example.code
                ));
            }
            output.push('\n');
        }
    }

    if results.iter().any(|r| r.has_critical()) {
        output.push_str("RESULT: FAIL (critical issues found)\n");
    } else if results.iter().any(|r| !r.issues.is_empty()) {
        output.push_str("RESULT: PASS WITH ISSUES\n");
    } else {
        output.push_str("RESULT: PASS\n");
    }

    output
}

#[derive(Serialize)]
struct JsonReport<'a> {
    results: &'a [TestResult],
    #[serde(skip_serializing_if = "<[Recommendation]>::is_empty")]
    recommendations: &'a [Recommendation],
}

/// Generate JSON report
fn generate_json_report(results: &[TestResult], recommendations: &[Recommendation]) -> String {
    let report = JsonReport {
        results,
        recommendations,
    };
    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize results: {}\"}}", e)
    })
}

/// SARIF report structure (simplified)
#[derive(Debug, Serialize)]
struct SarifReport {
    #[serde(rename = "$schema")]
    schema: String,
    version: String,
    runs: Vec<SarifRun>,
}

#[derive(Debug, Serialize)]
struct SarifRun {
    tool: SarifTool,
    results: Vec<SarifResult>,
}

#[derive(Debug, Serialize)]
struct SarifTool {
    driver: SarifDriver,
}

#[derive(Debug, Serialize)]
struct SarifDriver {
    name: String,
    version: String,
    #[serde(rename = "informationUri")]
    information_uri: String,
}

#[derive(Debug, Serialize)]
struct SarifResult {
    #[serde(rename = "ruleId")]
    rule_id: String,
    level: String,
    message: SarifMessage,
    locations: Vec<SarifLocation>,
}

#[derive(Debug, Serialize)]
struct SarifMessage {
    text: String,
}

#[derive(Debug, Serialize)]
struct SarifLocation {
    #[serde(rename = "physicalLocation")]
    physical_location: SarifPhysicalLocation,
}

#[derive(Debug, Serialize)]
struct SarifPhysicalLocation {
    #[serde(rename = "artifactLocation")]
    artifact_location: SarifArtifactLocation,
}

#[derive(Debug, Serialize)]
struct SarifArtifactLocation {
    uri: String,
}

fn sarif_level(impact: Impact) -> &'static str {
    match impact {
        Impact::Critical | Impact::Serious => "error",
        Impact::Moderate => "warning",
        Impact::Minor => "note",
    }
}

/// Generate SARIF report
fn generate_sarif_report(results: &[TestResult]) -> String {
    let sarif_results: Vec<SarifResult> = results
        .iter()
        .flat_map(|r| r.issues.iter().map(move |issue| (r, issue)))
        .map(|(r, issue)| {
            let mut text = issue.description.clone();
            if !issue.wcag_criteria.is_empty() {
                text.push_str(&format!(" (WCAG {})", issue.wcag_criteria.join(", ")));
            }
            SarifResult {
                rule_id: issue.id.clone(),
                level: sarif_level(issue.impact).to_string(),
                message: SarifMessage { text },
                locations: vec![SarifLocation {
                    physical_location: SarifPhysicalLocation {
                        artifact_location: SarifArtifactLocation { uri: r.url.clone() },
                    },
                }],
            }
        })
        .collect();

    let report = SarifReport {
        schema: "https://json.schemastore.org/sarif-2.1.0.json".to_string(),
        version: "2.1.0".to_string(),
        runs: vec![SarifRun {
            tool: SarifTool {
                driver: SarifDriver {
                    name: "auditbot".to_string(),
                    version: env!("CARGO_PKG_VERSION").to_string(),
                    information_uri: "https://www.w3.org/WAI/WCAG22/quickref/".to_string(),
                },
            },
            results: sarif_results,
        }],
    };

    serde_json::to_string_pretty(&report).unwrap_or_else(|e| {
        format!("{{\"error\": \"Failed to serialize SARIF report: {}\"}}", e)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::issue::{AccessibilityIssue, IssueSet};

    fn sample_result() -> TestResult {
        let mut issues = IssueSet::new();
        issues.add(
            AccessibilityIssue::new("image-alt", Impact::Critical, "Images must have alternative text")
                .with_wcag(&["1.1.1"])
                .with_node("<img src=\"a.png\">"),
        );
        issues.add(AccessibilityIssue::new("missing-skip-link", Impact::Moderate, "No skip link"));
        TestResult::new("https://example.com/", issues)
    }

    #[test]
    fn test_text_report_empty() {
        let result = TestResult::new("https://example.com/", IssueSet::new());
        let report = generate_report(&[result], &[], OutputFormat::Text);
        assert!(report.contains("No accessibility issues found"));
        assert!(report.ends_with("RESULT: PASS\n"));
    }

    #[test]
    fn test_text_report_with_issues() {
        let report = generate_report(&[sample_result()], &[], OutputFormat::Text);
        assert!(report.contains("[image-alt]"));
        assert!(report.contains("--- critical (1) ---"));
        assert!(report.contains("WCAG: 1.1.1"));
        assert!(report.contains("RESULT: FAIL"));
    }

    #[test]
    fn test_json_report() {
        let report = generate_report(&[sample_result()], &[], OutputFormat::Json);
        let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");
        assert_eq!(parsed["results"][0]["summary"]["critical"], 1);
        assert_eq!(parsed["results"][0]["issues"][0]["wcagCriteria"][0], "1.1.1");
        assert!(parsed.get("recommendations").is_none());
    }

    #[test]
    fn test_sarif_report() {
        let report = generate_report(&[sample_result()], &[], OutputFormat::Sarif);
        let parsed: serde_json::Value = serde_json::from_str(&report).expect("valid JSON");
        assert_eq!(parsed["version"], "2.1.0");
        let results = parsed["runs"][0]["results"].as_array().unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0]["level"], "error");
        assert_eq!(results[1]["level"], "warning");
    }

    #[test]
    fn test_output_format_parse() {
        assert_eq!("text".parse::<OutputFormat>().unwrap(), OutputFormat::Text);
        assert_eq!("JSON".parse::<OutputFormat>().unwrap(), OutputFormat::Json);
        assert_eq!("sarif".parse::<OutputFormat>().unwrap(), OutputFormat::Sarif);
        assert!("xml".parse::<OutputFormat>().is_err());
    }
}
