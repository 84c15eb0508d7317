// SPDX-License-Identifier: PMPL-1.0-or-later
//! Custom accessibility analyzers.
//!
//! Each analyzer walks a parsed [`Page`] and emits issue records. Checks
//! inside an analyzer are independent predicates with fixed thresholds;
//! analyzers share no state and can run in any order.

pub mod document;
pub mod media;
pub mod responsive;
pub mod structure;

use crate::error::Result;
use crate::issue::{AccessibilityIssue, IssueCategory};
use crate::page::Page;

/// Trait implemented by all analyzers
pub trait Analyzer: Send + Sync {
    /// Human-readable name of this analyzer
    fn name(&self) -> &str;

    /// Category stamped on every issue this analyzer emits
    fn category(&self) -> IssueCategory;

    /// Analyze a page. An `Err` is downgraded by the caller to a single
    /// synthetic issue; it never aborts a test run.
    fn analyze(&self, page: &Page) -> Result<Vec<AccessibilityIssue>>;
}

/// The analyzers run on every HTML page, in run order
pub fn default_analyzers() -> Vec<Box<dyn Analyzer>> {
    vec![
        Box::new(structure::StructureAnalyzer),
        Box::new(responsive::ResponsiveAnalyzer),
        Box::new(media::MediaAnalyzer),
        Box::new(document::DocumentLinkAnalyzer),
    ]
}
