// SPDX-License-Identifier: PMPL-1.0-or-later
//! Directory scanner for auditing static sites on disk.
//!
//! Walks directory trees, picks up HTML files, and runs each through the
//! same pipeline as a fetched page.

use crate::audit::Auditor;
use crate::error::Result;
use crate::issue::TestResult;
use std::path::Path;
use tracing::{info, warn};
use url::Url;
use walkdir::WalkDir;

/// File extensions to scan
const SCANNABLE_EXTENSIONS: &[&str] = &["html", "htm", "xhtml"];

/// Directories to skip
const SKIP_DIRS: &[&str] = &[
    "node_modules", ".git", "target", "dist", "build",
    "_build", "vendor", ".next", ".nuxt", "coverage",
];

/// `file://` URL for a path, or the plain path when it cannot be made absolute
fn file_url(path: &Path) -> String {
    path.canonicalize()
        .ok()
        .and_then(|p| Url::from_file_path(p).ok())
        .map(|u| u.to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Scan a directory, returning one result per HTML file in path order
pub fn scan_directory(auditor: &Auditor, dir: &Path) -> Result<Vec<TestResult>> {
    let mut results = Vec::new();

    info!("Scanning directory: {}", dir.display());

    let walker = WalkDir::new(dir)
        .follow_links(false)
        .sort_by_file_name()
        .into_iter()
        .filter_entry(|e| {
            // Skip hidden and excluded directories, but never the root
            let name = e.file_name().to_str().unwrap_or("");
            if e.depth() > 0 && e.file_type().is_dir() {
                return !SKIP_DIRS.contains(&name) && !name.starts_with('.');
            }
            true
        });

    for entry in walker {
        let entry = match entry {
            Ok(e) => e,
            Err(e) => {
                warn!("Skipping unreadable entry: {}", e);
                continue;
            }
        };

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let ext = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();

        if !SCANNABLE_EXTENSIONS.contains(&ext.as_str()) {
            continue;
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) => {
                warn!("Skipping {}: {}", path.display(), e);
                continue;
            }
        };

        results.push(auditor.test_html(&file_url(path), &content));
    }

    let issues: usize = results.iter().map(|r| r.summary.total).sum();
    info!("Scanned {} files, found {} issues", results.len(), issues);

    Ok(results)
}

/// Scan a single HTML file
pub fn scan_file(auditor: &Auditor, path: &Path) -> Result<TestResult> {
    let content = std::fs::read_to_string(path)?;
    Ok(auditor.test_html(&file_url(path), &content))
}
