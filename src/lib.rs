// SPDX-License-Identifier: PMPL-1.0-or-later
//! Auditbot - WCAG accessibility auditor with reversible CSS remediation
//!
//! Auditbot fetches a page (directly or through a chain of CORS proxies),
//! runs a tag-filtered WCAG rule engine plus its own analyzers over it, and
//! can turn the resulting issues into CSS fixes that are stored as
//! comment-delimited blocks in a site's custom CSS and reverted byte-exactly.
//!
//! ## Analyzers
//!
//! - **Structure** (1.3.1/2.4.1/2.4.6): Headings, landmarks, skip links, tables
//! - **Responsive** (1.4.4/1.4.10/2.5.5/2.5.8): Viewport, font sizes, touch targets
//! - **Media** (1.2.x/1.4.2): Captions, transcripts, autoplay
//! - **Document** (1.3.1/2.4.4): PDF and Office advisories, link format hints
//!
//! ## Fixes
//!
//! Nine CSS templates are matched to issues by WCAG criterion. The
//! WordPress adapter persists them in the site's Additional CSS blob.

pub mod analyzers;
pub mod audit;
pub mod config;
pub mod error;
pub mod fetch;
pub mod fixes;
pub mod issue;
pub mod page;
pub mod recommend;
pub mod report;
pub mod retry;
pub mod rules;
pub mod scanner;

pub use audit::Auditor;
pub use config::Config;
pub use error::{Error, Result};
pub use fixes::FixEngine;
pub use issue::{AccessibilityIssue, Impact, IssueCategory, TestResult};
