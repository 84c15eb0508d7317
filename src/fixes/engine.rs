// SPDX-License-Identifier: PMPL-1.0-or-later
//! Fix generation, validation and platform dispatch

use super::platform::{GenericAdapter, PlatformAdapter, WordPressAdapter};
use super::store::KeyValueStore;
use super::templates::{find_template, FixTemplate};
use super::{AppliedFixes, FixOutcome, FixPayload, FixValidation, Platform, Website};
use crate::error::{Error, Result};
use crate::issue::AccessibilityIssue;
use chrono::Utc;
use scraper::{ElementRef, Html};
use std::sync::Arc;
use tracing::{debug, warn};

/// Turns issues into CSS fixes and records them per site
pub struct FixEngine {
    wordpress: WordPressAdapter,
    generic: GenericAdapter,
}

impl FixEngine {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            wordpress: WordPressAdapter::new(store),
            generic: GenericAdapter,
        }
    }

    /// First template, in declaration order, sharing a criterion with the issue
    pub fn select_template(issue: &AccessibilityIssue) -> Option<&'static FixTemplate> {
        find_template(&issue.wcag_criteria)
    }

    /// Build a fix for an issue. The same issue always yields the same
    /// template and selector.
    pub fn generate_fix(&self, issue: &AccessibilityIssue) -> Result<FixPayload> {
        let template = Self::select_template(issue)
            .ok_or_else(|| Error::NoMatchingTemplate(issue.wcag_criteria.join(", ")))?;

        let selector = issue
            .nodes
            .first()
            .and_then(|node| selector_for_node(node))
            .map(|s| match template.pseudo_class {
                Some(pseudo) => format!("{}{}", s, pseudo),
                None => s,
            })
            .unwrap_or_else(|| template.default_selector.to_string());

        debug!("Issue {} matched template {} on '{}'", issue.id, template.id, selector);

        let criteria: Vec<&str> = template.wcag_criteria.to_vec();
        Ok(FixPayload::new(
            &selector,
            template.properties(),
            &criteria,
            &format!("{}: {}", template.name, template.description),
        )
        .with_metadata("issueId", issue.id.clone())
        .with_metadata("templateId", template.id))
    }

    /// Structural checks only; CSS syntax is not validated. Everything
    /// accepted here survives a write to the CSS blob and a read back.
    pub fn validate_fix(fix: &FixPayload) -> FixValidation {
        let mut issues = Vec::new();

        if fix.id.is_empty() || fix.id.contains(char::is_whitespace) || fix.id.contains("*/") {
            issues.push("Fix id must be non-empty with no whitespace or '*/'".to_string());
        }

        let selector = &fix.target_selector;
        if selector.trim().is_empty() {
            issues.push("Target selector is required".to_string());
        } else if selector.trim() != selector {
            issues.push("Target selector must not start or end with whitespace".to_string());
        }
        if selector.contains(['<', '>']) {
            issues.push("Target selector must not contain '<' or '>'".to_string());
        }
        if selector.contains(['{', '}']) {
            issues.push("Target selector must not contain '{' or '}'".to_string());
        }

        if fix.css_properties.is_empty() {
            issues.push("At least one CSS property is required".to_string());
        }
        for (idx, prop) in fix.css_properties.iter().enumerate() {
            if prop.name.trim().is_empty() || prop.value.trim().is_empty() {
                issues.push(format!("CSS property {} needs a name and a value", idx + 1));
                continue;
            }
            if !prop
                .name
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
            {
                issues.push(format!("CSS property name '{}' is not a plain identifier", prop.name));
            }
            if prop.value.contains([';', '{', '}']) {
                issues.push(format!(
                    "CSS property '{}' value must not contain ';', '{{' or '}}'",
                    prop.name
                ));
            }
        }

        if fix.wcag_criteria.is_empty() {
            issues.push("At least one WCAG criterion is required".to_string());
        }
        if fix
            .wcag_criteria
            .iter()
            .any(|c| c.trim().is_empty() || c.contains([',', '\n']) || c.contains("*/"))
        {
            issues.push("WCAG criteria must be non-empty and contain no ',', newline or '*/'".to_string());
        }

        FixValidation {
            valid: issues.is_empty(),
            issues,
        }
    }

    fn adapter(&self, platform: &Platform) -> &dyn PlatformAdapter {
        match platform {
            Platform::WordPress { .. } => &self.wordpress,
            Platform::Generic => &self.generic,
        }
    }

    pub async fn apply_fix(&self, site: &Website, fix: &FixPayload) -> FixOutcome {
        let validation = Self::validate_fix(fix);
        if !validation.valid {
            return FixOutcome::failed(&fix.id, validation.issues.join("; "));
        }

        match self.adapter(&site.platform).apply(site, fix).await {
            Ok(applied_at) => FixOutcome::applied(&fix.id, applied_at),
            Err(e) => {
                warn!("Applying fix {} to site {} failed: {}", fix.id, site.id, e);
                FixOutcome::failed(&fix.id, e.to_string())
            }
        }
    }

    pub async fn revert_fix(&self, site: &Website, fix_id: &str) -> FixOutcome {
        match self.adapter(&site.platform).revert(site, fix_id).await {
            Ok(()) => FixOutcome::reverted(fix_id, Utc::now()),
            Err(e) => {
                warn!("Reverting fix {} on site {} failed: {}", fix_id, site.id, e);
                FixOutcome::failed(fix_id, e.to_string())
            }
        }
    }

    pub async fn list_applied_fixes(&self, site: &Website) -> AppliedFixes {
        match self.adapter(&site.platform).list(site).await {
            Ok(fixes) => AppliedFixes {
                success: true,
                fixes,
                error: None,
            },
            Err(e) => {
                warn!("Listing fixes for site {} failed: {}", site.id, e);
                AppliedFixes {
                    success: false,
                    fixes: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}

/// `#id`, else `tag.class`, else `tag`, from an HTML fragment
fn selector_for_node(node: &str) -> Option<String> {
    let fragment = Html::parse_fragment(node);
    let element = fragment
        .tree
        .root()
        .descendants()
        .filter_map(ElementRef::wrap)
        .find(|e| e.value().name() != "html")?;

    if let Some(id) = element.value().id().filter(|id| is_css_ident(id)) {
        return Some(format!("#{}", id));
    }

    let tag = element.value().name();
    match element.value().classes().find(|c| is_css_ident(c)) {
        Some(class) => Some(format!("{}.{}", tag, class)),
        None => Some(tag.to_string()),
    }
}

fn is_css_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '-' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}
