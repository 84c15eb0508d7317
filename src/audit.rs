// SPDX-License-Identifier: PMPL-1.0-or-later
//! Test orchestration.
//!
//! An [`Auditor`] validates the URL, short-circuits document URLs to the
//! document advisories, fetches HTML through the proxy chain and runs the
//! rule engine followed by every analyzer over a scratch copy of the page.
//! A failing rule engine or analyzer never fails the run; it becomes a
//! warning plus one `analysis-error` issue.

use crate::analyzers::document::{analyze_document_url, DocumentKind};
use crate::analyzers::{default_analyzers, Analyzer};
use crate::config::Config;
use crate::error::Result;
use crate::fetch::{validate_url, PageFetcher};
use crate::issue::{AccessibilityIssue, Impact, IssueCategory, IssueSet, TestResult};
use crate::page::Page;
use crate::rules::{BuiltinRules, RuleConfig, RuleEngine};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Id of the issue emitted when a rule engine or analyzer fails
pub const ANALYSIS_ERROR_ID: &str = "analysis-error";

/// A parsed page held for the duration of one test. Dropping the guard
/// releases it, on success, error and unwind alike.
struct ScratchContainer {
    page: Page,
    open: Arc<AtomicUsize>,
}

impl ScratchContainer {
    fn open(url: &str, html: &str, open: &Arc<AtomicUsize>) -> Self {
        open.fetch_add(1, Ordering::SeqCst);
        Self {
            page: Page::parse(url, html),
            open: Arc::clone(open),
        }
    }

    fn page(&self) -> &Page {
        &self.page
    }
}

impl Drop for ScratchContainer {
    fn drop(&mut self) {
        self.open.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Runs accessibility tests against URLs or raw HTML
pub struct Auditor {
    fetcher: PageFetcher,
    rules: Box<dyn RuleEngine>,
    rule_config: RuleConfig,
    analyzers: Vec<Box<dyn Analyzer>>,
    containers: Arc<AtomicUsize>,
}

impl Auditor {
    /// Build an auditor with the built-in rules and default analyzers
    pub fn new(config: &Config) -> Result<Self> {
        Ok(Self {
            fetcher: PageFetcher::new(&config.fetch)?,
            rules: Box::new(BuiltinRules),
            rule_config: RuleConfig::new(config.analysis.tags.as_slice())?,
            analyzers: default_analyzers(),
            containers: Arc::new(AtomicUsize::new(0)),
        })
    }

    pub fn with_fetcher(mut self, fetcher: PageFetcher) -> Self {
        self.fetcher = fetcher;
        self
    }

    /// Replace the rule engine
    pub fn with_rule_engine(mut self, engine: impl RuleEngine + 'static) -> Self {
        self.rules = Box::new(engine);
        self
    }

    /// Append an analyzer after the defaults
    pub fn with_analyzer(mut self, analyzer: impl Analyzer + 'static) -> Self {
        self.analyzers.push(Box::new(analyzer));
        self
    }

    /// Scratch containers currently open
    pub fn active_containers(&self) -> usize {
        self.containers.load(Ordering::SeqCst)
    }

    /// Test a live URL
    pub async fn test_accessibility(&self, url: &str) -> Result<TestResult> {
        let parsed = validate_url(url)?;
        let target = parsed.to_string();

        if let Some(kind) = DocumentKind::from_url(parsed.path()) {
            info!("{} is a {} document, skipping HTML analysis", target, kind);
            let mut issues = IssueSet::new();
            issues.extend(analyze_document_url(&target, kind));
            return Ok(TestResult::new(&target, issues));
        }

        info!("Testing {}", target);
        let html = self.fetcher.fetch(&target).await?;
        Ok(self.test_html(&target, &html))
    }

    /// Test supplied markup as if it were served from `url`
    pub fn test_html(&self, url: &str, html: &str) -> TestResult {
        let container = ScratchContainer::open(url, html, &self.containers);
        let page = container.page();

        let mut issues = IssueSet::new();
        let mut warnings = Vec::new();
        let mut passes = Vec::new();
        let mut incomplete = Vec::new();

        match self.rules.run(page, &self.rule_config) {
            Ok(results) => {
                debug!(
                    "Rule engine on {}: {} violations, {} passes, {} incomplete",
                    page.url(),
                    results.violations.len(),
                    results.passes.len(),
                    results.incomplete.len()
                );
                issues.extend(results.violations);
                passes = results.passes;
                incomplete = results.incomplete;
            }
            Err(e) => downgrade("rule engine", &e, &mut issues, &mut warnings),
        }

        for analyzer in &self.analyzers {
            match analyzer.analyze(page) {
                Ok(found) => {
                    debug!("{}: {} issues", analyzer.name(), found.len());
                    let category = analyzer.category();
                    issues.extend(found.into_iter().map(|i| i.with_category(category)));
                }
                Err(e) => downgrade(analyzer.name(), &e, &mut issues, &mut warnings),
            }
        }

        let mut result = TestResult::new(url, issues);
        result.passes = passes;
        result.incomplete = incomplete;
        result.warnings = warnings;

        info!(
            "{}: {} issues ({} critical, {} serious)",
            url, result.summary.total, result.summary.critical, result.summary.serious
        );
        result
    }
}

fn downgrade(
    source: &str,
    error: &crate::error::Error,
    issues: &mut IssueSet,
    warnings: &mut Vec<String>,
) {
    let message = format!("{} failed: {}", source, error);
    warn!("{}", message);
    issues.add(
        AccessibilityIssue::new(ANALYSIS_ERROR_ID, Impact::Minor, &message)
            .with_category(IssueCategory::Analysis)
            .with_help("Part of the page could not be analyzed; re-run or check the page manually"),
    );
    warnings.push(message);
}
