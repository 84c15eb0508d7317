// SPDX-License-Identifier: PMPL-1.0-or-later
//! CSS remediation: fix payloads, templates, and the per-platform stores
//! that record applied fixes.

pub mod css_block;
pub mod engine;
pub mod platform;
pub mod store;
pub mod templates;

pub use engine::FixEngine;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// One CSS declaration in a fix. Emitted with `!important`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CssProperty {
    pub name: String,
    pub value: String,
}

impl CssProperty {
    pub fn new(name: &str, value: &str) -> Self {
        Self {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

/// A proposed or applied remediation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixPayload {
    /// Unique within a site's CSS blob
    pub id: String,
    pub target_selector: String,
    pub css_properties: Vec<CssProperty>,
    pub wcag_criteria: Vec<String>,
    pub description: String,
    pub created_at: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl FixPayload {
    /// A fresh fix with a generated id
    pub fn new(
        target_selector: &str,
        css_properties: Vec<CssProperty>,
        wcag_criteria: &[&str],
        description: &str,
    ) -> Self {
        Self {
            id: new_fix_id(),
            target_selector: target_selector.trim().to_string(),
            css_properties,
            wcag_criteria: wcag_criteria.iter().map(|c| c.to_string()).collect(),
            description: description.to_string(),
            created_at: Utc::now(),
            applied_at: None,
            reverted_at: None,
            metadata: Map::new(),
        }
    }

    pub fn with_metadata(mut self, key: &str, value: impl Into<Value>) -> Self {
        self.metadata.insert(key.to_string(), value.into());
        self
    }
}

/// `fix-<uuid v4>`
pub fn new_fix_id() -> String {
    format!("fix-{}", uuid::Uuid::new_v4())
}

/// Credentials for the WordPress REST API
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WordPressCredentials {
    pub username: String,
    pub application_password: String,
}

/// Where a site's fixes are stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase", rename_all_fields = "camelCase")]
pub enum Platform {
    WordPress {
        api_url: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        credentials: Option<WordPressCredentials>,
    },
    Generic,
}

impl std::fmt::Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::WordPress { .. } => write!(f, "wordpress"),
            Platform::Generic => write!(f, "generic"),
        }
    }
}

/// A site that fixes are applied to
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Website {
    pub id: String,
    pub url: String,
    pub platform: Platform,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

impl Website {
    pub fn new(id: &str, url: &str, platform: Platform) -> Self {
        Self {
            id: id.to_string(),
            url: url.to_string(),
            platform,
            metadata: Map::new(),
        }
    }
}

/// Structural validation result
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FixValidation {
    pub valid: bool,
    pub issues: Vec<String>,
}

/// Result of applying or reverting a fix. Failures are values, not errors.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixOutcome {
    pub success: bool,
    pub fix_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reverted_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl FixOutcome {
    pub fn applied(fix_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            fix_id: fix_id.to_string(),
            applied_at: Some(at),
            reverted_at: None,
            error: None,
        }
    }

    pub fn reverted(fix_id: &str, at: DateTime<Utc>) -> Self {
        Self {
            success: true,
            fix_id: fix_id.to_string(),
            applied_at: None,
            reverted_at: Some(at),
            error: None,
        }
    }

    pub fn failed(fix_id: &str, error: impl Into<String>) -> Self {
        Self {
            success: false,
            fix_id: fix_id.to_string(),
            applied_at: None,
            reverted_at: None,
            error: Some(error.into()),
        }
    }
}

/// Fixes currently recorded for a site
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppliedFixes {
    pub success: bool,
    pub fixes: Vec<FixPayload>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
