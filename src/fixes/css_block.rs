// SPDX-License-Identifier: PMPL-1.0-or-later
//! Comment-delimited fix blocks inside a site's custom CSS.
//!
//! ```text
//! /* WCAG Fix ID: <id> */
//! /* Description: <description> */
//! /* WCAG Criteria: <criteria, comma-joined> */
//! /* Applied: <ISO-8601 timestamp> */
//! <selector> {
//!   <prop-name>: <prop-value> !important;
//! }
//! /* End Fix: <id> */
//! ```
//!
//! Applying appends a blank line and the block. Reverting removes both, so
//! apply followed by revert leaves the blob byte-identical.

use super::{CssProperty, FixPayload};
use crate::error::Result;
use chrono::{DateTime, SecondsFormat, Utc};
use regex::Regex;
use serde_json::Map;
use std::sync::LazyLock;
use tracing::warn;

/// Separator placed before every appended block
pub const BLOCK_SEPARATOR: &str = "\n\n";

/// Regex crate has no backreferences, so the end marker id is captured
/// separately and compared with the header id.
static FIX_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?s)/\* WCAG Fix ID: (?P<id>\S+) \*/\n/\* Description: (?P<description>.*?) \*/\n/\* WCAG Criteria: (?P<criteria>.*?) \*/\n/\* Applied: (?P<applied>.*?) \*/\n(?P<body>.*?)\n/\* End Fix: (?P<end>\S+) \*/",
    )
    .expect("valid regex")
});

static RULE_BODY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)^\s*(?P<selector>[^{]+?)\s*\{(?P<decls>.*)\}\s*$").expect("valid regex"));

static PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?P<name>[-\w]+)\s*:\s*(?P<value>[^;]+?)\s*(?:!important)?\s*;").expect("valid regex")
});

/// Description text safe to place inside a single-line comment
fn comment_safe(text: &str) -> String {
    text.replace("*/", "* /").replace(['\r', '\n'], " ")
}

/// Render a fix as a block stamped with `applied_at`
pub fn serialize(fix: &FixPayload, applied_at: DateTime<Utc>) -> String {
    let mut block = String::new();
    block.push_str(&format!("/* WCAG Fix ID: {} */\n", fix.id));
    block.push_str(&format!("/* Description: {} */\n", comment_safe(&fix.description)));
    block.push_str(&format!(
        "/* WCAG Criteria: {} */\n",
        comment_safe(&fix.wcag_criteria.join(", "))
    ));
    block.push_str(&format!(
        "/* Applied: {} */\n",
        applied_at.to_rfc3339_opts(SecondsFormat::Millis, true)
    ));
    block.push_str(&format!("{} {{\n", fix.target_selector));
    for prop in &fix.css_properties {
        block.push_str(&format!("  {}: {} !important;\n", prop.name, prop.value));
    }
    block.push_str("}\n");
    block.push_str(&format!("/* End Fix: {} */", fix.id));
    block
}

/// Blob with `block` appended
pub fn append(blob: &str, block: &str) -> String {
    format!("{}{}{}", blob, BLOCK_SEPARATOR, block)
}

/// Whether a block with this id is present
pub fn contains(blob: &str, fix_id: &str) -> bool {
    blob.contains(&format!("/* WCAG Fix ID: {} */", fix_id))
}

/// Remove the block for `fix_id` and its leading separator. None when the
/// id is not in the blob.
pub fn strip(blob: &str, fix_id: &str) -> Result<Option<String>> {
    let id = regex::escape(fix_id);
    let pattern = Regex::new(&format!(
        r"(?s)(?:\n\n)?/\* WCAG Fix ID: {id} \*/.*?/\* End Fix: {id} \*/"
    ))?;

    if !pattern.is_match(blob) {
        return Ok(None);
    }
    Ok(Some(pattern.replacen(blob, 1, "").into_owned()))
}

/// Every well-formed block in the blob, in order
pub fn parse(blob: &str) -> Vec<FixPayload> {
    let mut fixes = Vec::new();

    for caps in FIX_BLOCK.captures_iter(blob) {
        let id = &caps["id"];
        if id != &caps["end"] {
            warn!("Fix block {} closed by marker for {}, skipping", id, &caps["end"]);
            continue;
        }

        let applied_at = match DateTime::parse_from_rfc3339(caps["applied"].trim()) {
            Ok(ts) => ts.with_timezone(&Utc),
            Err(e) => {
                warn!("Fix block {} has unreadable timestamp: {}", id, e);
                continue;
            }
        };

        let Some(body) = RULE_BODY.captures(&caps["body"]) else {
            warn!("Fix block {} has no CSS rule body, skipping", id);
            continue;
        };

        let css_properties = PROPERTY
            .captures_iter(&body["decls"])
            .map(|p| CssProperty::new(&p["name"], &p["value"]))
            .collect();

        fixes.push(FixPayload {
            id: id.to_string(),
            target_selector: body["selector"].to_string(),
            css_properties,
            wcag_criteria: caps["criteria"]
                .split(',')
                .map(str::trim)
                .filter(|c| !c.is_empty())
                .map(String::from)
                .collect(),
            description: caps["description"].to_string(),
            created_at: applied_at,
            applied_at: Some(applied_at),
            reverted_at: None,
            metadata: Map::new(),
        });
    }

    fixes
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn sample_fix(id: &str) -> FixPayload {
        let mut fix = FixPayload::new(
            ".btn",
            vec![
                CssProperty::new("min-width", "44px"),
                CssProperty::new("min-height", "44px"),
                CssProperty::new("-webkit-tap-highlight-color", "rgba(0, 0, 0, 0.2)"),
            ],
            &["2.5.5", "2.5.8"],
            "Enlarge touch targets",
        );
        fix.id = id.to_string();
        fix
    }

    fn applied_at() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    #[test]
    fn test_serialize_exact_format() {
        let block = serialize(&sample_fix("fix-1"), applied_at());
        let expected = "/* WCAG Fix ID: fix-1 */\n\
/* Description: Enlarge touch targets */\n\
/* WCAG Criteria: 2.5.5, 2.5.8 */\n\
/* Applied: 2024-05-01T12:30:00.000Z */\n\
.btn {\n  min-width: 44px !important;\n  min-height: 44px !important;\n  -webkit-tap-highlight-color: rgba(0, 0, 0, 0.2) !important;\n}\n\
/* End Fix: fix-1 */";
        assert_eq!(block, expected);
    }

    #[test]
    fn test_parse_recovers_header_and_properties() {
        let fix = sample_fix("fix-abc");
        let blob = append("body { margin: 0; }", &serialize(&fix, applied_at()));

        let parsed = parse(&blob);
        assert_eq!(parsed.len(), 1);
        let p = &parsed[0];
        assert_eq!(p.id, fix.id);
        assert_eq!(p.description, fix.description);
        assert_eq!(p.wcag_criteria, fix.wcag_criteria);
        assert_eq!(p.target_selector, fix.target_selector);
        assert_eq!(p.css_properties, fix.css_properties);
        assert_eq!(p.applied_at, Some(applied_at()));
    }

    #[test]
    fn test_strip_restores_blob() {
        let original = "body { margin: 0; }\n";
        let one = append(original, &serialize(&sample_fix("fix-1"), applied_at()));
        let two = append(&one, &serialize(&sample_fix("fix-2"), applied_at()));

        assert_eq!(strip(&two, "fix-2").unwrap().as_deref(), Some(one.as_str()));
        let without_first = strip(&two, "fix-1").unwrap().unwrap();
        assert!(!contains(&without_first, "fix-1"));
        assert!(contains(&without_first, "fix-2"));
        assert!(without_first.starts_with(original));
        assert_eq!(strip(&without_first, "fix-2").unwrap().as_deref(), Some(original));
    }

    #[test]
    fn test_strip_unknown_id() {
        let blob = append("", &serialize(&sample_fix("fix-1"), applied_at()));
        assert_eq!(strip(&blob, "fix-9").unwrap(), None);
        // Regex metacharacters in ids match literally
        assert_eq!(strip(&blob, "fix-.").unwrap(), None);
    }

    #[test]
    fn test_description_cannot_close_comment() {
        let mut fix = sample_fix("fix-1");
        fix.description = "Evil */ body { display: none }\nnext".into();
        let blob = serialize(&fix, applied_at());
        let parsed = parse(&blob);
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].description, "Evil * / body { display: none } next");
    }

    #[test]
    fn test_mismatched_end_marker_skipped() {
        let block = serialize(&sample_fix("fix-1"), applied_at()).replace("End Fix: fix-1", "End Fix: fix-2");
        assert!(parse(&block).is_empty());
    }
}
