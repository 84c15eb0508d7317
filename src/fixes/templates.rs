// SPDX-License-Identifier: PMPL-1.0-or-later
//! Static CSS fix templates, matched against issues by WCAG criterion.
//!
//! Order matters: the first template whose criteria intersect an issue's
//! criteria wins.

use super::CssProperty;

/// A CSS remediation for a set of WCAG criteria
#[derive(Debug)]
pub struct FixTemplate {
    pub id: &'static str,
    pub name: &'static str,
    pub wcag_criteria: &'static [&'static str],
    pub default_selector: &'static str,
    /// Appended to selectors derived from an issue's node
    pub pseudo_class: Option<&'static str>,
    pub description: &'static str,
    properties: &'static [(&'static str, &'static str)],
}

impl FixTemplate {
    pub fn properties(&self) -> Vec<CssProperty> {
        self.properties
            .iter()
            .map(|(name, value)| CssProperty::new(name, value))
            .collect()
    }

    pub fn matches(&self, criteria: &[String]) -> bool {
        criteria
            .iter()
            .any(|c| self.wcag_criteria.contains(&c.as_str()))
    }
}

pub static TEMPLATES: &[FixTemplate] = &[
    FixTemplate {
        id: "color-contrast",
        name: "Contrast",
        wcag_criteria: &["1.4.3", "1.4.6"],
        default_selector: "body",
        pseudo_class: None,
        description: "Raise text contrast to at least 7:1",
        properties: &[("color", "#1a1a1a"), ("background-color", "#ffffff")],
    },
    FixTemplate {
        id: "focus-visible",
        name: "Focus indicator",
        wcag_criteria: &["2.4.7", "2.4.11"],
        default_selector: "a:focus-visible, button:focus-visible, input:focus-visible, select:focus-visible, textarea:focus-visible, [tabindex]:focus-visible",
        pseudo_class: Some(":focus-visible"),
        description: "Show a clear focus outline on interactive elements",
        properties: &[("outline", "3px solid #005fcc"), ("outline-offset", "2px")],
    },
    FixTemplate {
        id: "touch-target",
        name: "Touch target size",
        wcag_criteria: &["2.5.5", "2.5.8"],
        default_selector: "a, button, input, select, textarea, [role=\"button\"]",
        pseudo_class: None,
        description: "Enlarge interactive elements to at least 44 by 44 pixels",
        properties: &[
            ("min-width", "44px"),
            ("min-height", "44px"),
            ("display", "inline-block"),
        ],
    },
    FixTemplate {
        id: "text-resize",
        name: "Resizable text",
        wcag_criteria: &["1.4.4"],
        default_selector: "html",
        pseudo_class: None,
        description: "Use a relative root font size so text scales to 200%",
        properties: &[
            ("font-size", "100%"),
            ("-webkit-text-size-adjust", "100%"),
            ("text-size-adjust", "100%"),
        ],
    },
    FixTemplate {
        id: "reflow",
        name: "Reflow",
        wcag_criteria: &["1.4.10"],
        default_selector: "img, video, iframe, table, pre",
        pseudo_class: None,
        description: "Let wide content shrink to a 320px viewport",
        properties: &[
            ("max-width", "100%"),
            ("box-sizing", "border-box"),
            ("overflow-wrap", "break-word"),
        ],
    },
    FixTemplate {
        id: "text-spacing",
        name: "Text spacing",
        wcag_criteria: &["1.4.12"],
        default_selector: "p, li, dd, dt, blockquote",
        pseudo_class: None,
        description: "Apply the minimum line, letter, word and paragraph spacing",
        properties: &[
            ("line-height", "1.5"),
            ("letter-spacing", "0.12em"),
            ("word-spacing", "0.16em"),
            ("margin-bottom", "2em"),
        ],
    },
    FixTemplate {
        id: "link-distinction",
        name: "Link distinction",
        wcag_criteria: &["1.4.1"],
        default_selector: "a",
        pseudo_class: None,
        description: "Underline links so they do not rely on color alone",
        properties: &[("text-decoration", "underline")],
    },
    FixTemplate {
        id: "reduced-motion",
        name: "Reduced motion",
        wcag_criteria: &["2.3.3", "2.2.2"],
        default_selector: "*, *::before, *::after",
        pseudo_class: None,
        description: "Stop animations and transitions",
        properties: &[
            ("animation-duration", "0.01ms"),
            ("animation-iteration-count", "1"),
            ("transition-duration", "0.01ms"),
            ("scroll-behavior", "auto"),
        ],
    },
    FixTemplate {
        id: "non-text-contrast",
        name: "Non-text contrast",
        wcag_criteria: &["1.4.11"],
        default_selector: "input, select, textarea, button",
        pseudo_class: None,
        description: "Give form control boundaries at least 3:1 contrast",
        properties: &[("border", "1px solid #767676")],
    },
];

/// First template matching any of the criteria
pub fn find_template(criteria: &[String]) -> Option<&'static FixTemplate> {
    TEMPLATES.iter().find(|t| t.matches(criteria))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria(list: &[&str]) -> Vec<String> {
        list.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_first_match_wins() {
        // 1.4.3 and 1.4.11 both match; declaration order decides
        let t = find_template(&criteria(&["1.4.11", "1.4.3"])).unwrap();
        assert_eq!(t.id, "color-contrast");
    }

    #[test]
    fn test_no_match() {
        assert!(find_template(&criteria(&["1.1.1"])).is_none());
        assert!(find_template(&[]).is_none());
    }

    #[test]
    fn test_template_ids_unique() {
        let mut ids: Vec<_> = TEMPLATES.iter().map(|t| t.id).collect();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), TEMPLATES.len());
    }

    #[test]
    fn test_properties_have_no_semicolons() {
        for t in TEMPLATES {
            for p in t.properties() {
                assert!(!p.value.contains(';'), "{} {}", t.id, p.name);
            }
        }
    }
}
