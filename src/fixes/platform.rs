// SPDX-License-Identifier: PMPL-1.0-or-later
//! Platform adapters that persist applied fixes

use super::css_block;
use super::store::KeyValueStore;
use super::{FixPayload, Website};
use crate::error::{Error, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

/// Stores and retrieves applied fixes for one kind of platform
#[async_trait]
pub trait PlatformAdapter: Send + Sync {
    fn name(&self) -> &str;

    /// Record the fix, returning when it was applied
    async fn apply(&self, site: &Website, fix: &FixPayload) -> Result<DateTime<Utc>>;

    async fn revert(&self, site: &Website, fix_id: &str) -> Result<()>;

    async fn list(&self, site: &Website) -> Result<Vec<FixPayload>>;
}

/// WordPress sites: fixes live as comment-delimited blocks in the site's
/// Additional CSS blob
pub struct WordPressAdapter {
    store: Arc<dyn KeyValueStore>,
}

impl WordPressAdapter {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    fn key(site: &Website) -> String {
        format!("wp_custom_css_{}", site.id)
    }

    async fn load(&self, site: &Website) -> Result<String> {
        Ok(self.store.get(&Self::key(site)).await?.unwrap_or_default())
    }
}

#[async_trait]
impl PlatformAdapter for WordPressAdapter {
    fn name(&self) -> &str {
        "wordpress"
    }

    async fn apply(&self, site: &Website, fix: &FixPayload) -> Result<DateTime<Utc>> {
        let current = self.load(site).await?;
        if css_block::contains(&current, &fix.id) {
            return Err(Error::Validation(format!(
                "fix {} is already applied to site {}",
                fix.id, site.id
            )));
        }

        let applied_at = Utc::now();
        let updated = css_block::append(&current, &css_block::serialize(fix, applied_at));
        self.store.set(&Self::key(site), &updated).await?;

        info!("Applied fix {} to site {}", fix.id, site.id);
        Ok(applied_at)
    }

    async fn revert(&self, site: &Website, fix_id: &str) -> Result<()> {
        let current = self.load(site).await?;
        let updated = css_block::strip(&current, fix_id)?
            .ok_or_else(|| Error::FixNotFound(fix_id.to_string()))?;
        self.store.set(&Self::key(site), &updated).await?;

        info!("Reverted fix {} on site {}", fix_id, site.id);
        Ok(())
    }

    async fn list(&self, site: &Website) -> Result<Vec<FixPayload>> {
        let fixes = css_block::parse(&self.load(site).await?);
        debug!("Site {} has {} applied fixes", site.id, fixes.len());
        Ok(fixes)
    }
}

/// Fallback for platforms with no fix store
pub struct GenericAdapter;

#[async_trait]
impl PlatformAdapter for GenericAdapter {
    fn name(&self) -> &str {
        "generic"
    }

    async fn apply(&self, _site: &Website, _fix: &FixPayload) -> Result<DateTime<Utc>> {
        Err(Error::Unsupported("Applying fixes".into()))
    }

    async fn revert(&self, _site: &Website, _fix_id: &str) -> Result<()> {
        Err(Error::Unsupported("Reverting fixes".into()))
    }

    async fn list(&self, _site: &Website) -> Result<Vec<FixPayload>> {
        Ok(Vec::new())
    }
}
