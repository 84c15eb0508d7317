// SPDX-License-Identifier: PMPL-1.0-or-later
//! Media accessibility analyzer - WCAG 1.2.x Time-based Media, 1.4.2 Audio Control
//!
//! Checks media element accessibility:
//! - Video has captions/subtitles and audio description tracks
//! - Audio has a transcript reference
//! - Auto-playing media can be paused/stopped
//! - Media exposes controls
//! - Embedded players have a title
//! - Animated images are flagged for review

use crate::analyzers::Analyzer;
use crate::error::Result;
use crate::issue::{AccessibilityIssue, Impact, IssueCategory, IssueDetails};
use crate::page::{node_snippet, selector, Page};
use scraper::ElementRef;

/// Hosts whose iframes are video players
const VIDEO_HOSTS: &[&str] = &["youtube.com", "youtube-nocookie.com", "youtu.be", "vimeo.com", "dailymotion.com", "wistia"];

/// Media accessibility analyzer
pub struct MediaAnalyzer;

impl Analyzer for MediaAnalyzer {
    fn name(&self) -> &str {
        "Media Accessibility Analyzer"
    }

    fn category(&self) -> IssueCategory {
        IssueCategory::Media
    }

    fn analyze(&self, page: &Page) -> Result<Vec<AccessibilityIssue>> {
        let mut issues = Vec::new();

        check_video_tracks(page, &mut issues)?;
        check_audio_transcript(page, &mut issues)?;
        check_autoplay(page, &mut issues)?;
        check_controls(page, &mut issues)?;
        check_embedded_players(page, &mut issues)?;
        check_animated_images(page, &mut issues)?;

        Ok(issues
            .into_iter()
            .map(|i| i.with_category(IssueCategory::Media))
            .collect())
    }
}

fn media(kind: &str, el: ElementRef<'_>) -> IssueDetails {
    let source = el.value().attr("src").map(|s| s.to_string()).or_else(|| {
        selector("source")
            .ok()
            .and_then(|sel| el.select(&sel).next())
            .and_then(|s| s.value().attr("src"))
            .map(|s| s.to_string())
    });
    IssueDetails::Media {
        media_type: kind.to_string(),
        source,
    }
}

fn has_track(el: ElementRef<'_>, kinds: &[&str]) -> Result<bool> {
    let track_sel = selector("track")?;
    Ok(el.select(&track_sel).any(|track| {
        let kind = track.value().attr("kind").unwrap_or("subtitles");
        kinds.iter().any(|k| kind.eq_ignore_ascii_case(k))
    }))
}

/// Videos need captions (1.2.2) and audio description (1.2.5)
fn check_video_tracks(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for video in page.select_all("video")? {
        if !has_track(video, &["captions", "subtitles"])? {
            issues.push(
                AccessibilityIssue::new(
                    "video-missing-captions",
                    Impact::Critical,
                    "Video element has no captions or subtitles track. Deaf and hard-of-hearing users cannot access audio content.",
                )
                .with_wcag(&["1.2.2"])
                .with_help("Add <track kind=\"captions\" src=\"captions.vtt\" srclang=\"en\" label=\"English\"> inside the <video> element")
                .with_node(node_snippet(video))
                .with_details(media("video", video)),
            );
        }

        if !has_track(video, &["descriptions"])? {
            issues.push(
                AccessibilityIssue::new(
                    "video-missing-audio-description",
                    Impact::Moderate,
                    "Video element has no audio description track. Blind users may miss visual-only information.",
                )
                .with_wcag(&["1.2.5"])
                .with_help("Add <track kind=\"descriptions\"> or provide an audio-described version")
                .with_node(node_snippet(video))
                .with_details(media("video", video)),
            );
        }
    }

    Ok(())
}

fn check_audio_transcript(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for audio in page.select_all("audio")? {
        let has_transcript_ref = audio.value().attr("aria-describedby").is_some()
            || audio
                .value()
                .attr("aria-label")
                .is_some_and(|l| l.to_lowercase().contains("transcript"));

        if !has_transcript_ref {
            issues.push(
                AccessibilityIssue::new(
                    "audio-missing-transcript",
                    Impact::Serious,
                    "Audio element has no transcript reference. Provide a text transcript for deaf and hard-of-hearing users.",
                )
                .with_wcag(&["1.2.1"])
                .with_help("Add a transcript section and link it with aria-describedby")
                .with_node(node_snippet(audio))
                .with_details(media("audio", audio)),
            );
        }
    }

    Ok(())
}

/// Auto-playing media without controls; less severe when muted
fn check_autoplay(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for el in page.select_all("video[autoplay], audio[autoplay]")? {
        let tag = el.value().name();
        if el.value().attr("controls").is_some() {
            continue;
        }

        let impact = if el.value().attr("muted").is_some() {
            Impact::Moderate
        } else {
            Impact::Serious
        };

        issues.push(
            AccessibilityIssue::new(
                "autoplay-without-controls",
                impact,
                &format!(
                    "<{}> has autoplay but no controls attribute. Users must be able to pause or stop auto-playing media.",
                    tag
                ),
            )
            .with_wcag(&["1.4.2"])
            .with_help(&format!("Add the 'controls' attribute to the <{}> element", tag))
            .with_node(node_snippet(el))
            .with_details(media(tag, el)),
        );
    }

    Ok(())
}

/// Non-autoplay media still needs keyboard-operable controls
fn check_controls(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for el in page.select_all("video:not([autoplay]), audio:not([autoplay])")? {
        if el.value().attr("controls").is_some() {
            continue;
        }
        let tag = el.value().name();
        issues.push(
            AccessibilityIssue::new(
                "media-missing-controls",
                Impact::Serious,
                &format!("<{}> has no controls attribute and cannot be operated by keyboard.", tag),
            )
            .with_wcag(&["2.1.1"])
            .with_help("Add the 'controls' attribute or provide accessible custom controls")
            .with_node(node_snippet(el))
            .with_details(media(tag, el)),
        );
    }

    Ok(())
}

fn check_embedded_players(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    for frame in page.select_all("iframe[src]")? {
        let src = frame.value().attr("src").unwrap_or("").to_lowercase();
        if !VIDEO_HOSTS.iter().any(|h| src.contains(h)) {
            continue;
        }

        let titled = frame.value().attr("title").is_some_and(|t| !t.trim().is_empty());
        if !titled {
            issues.push(
                AccessibilityIssue::new(
                    "embedded-media-missing-title",
                    Impact::Serious,
                    "Embedded video player has no title attribute.",
                )
                .with_wcag(&["4.1.2"])
                .with_help("Add a title describing the embedded video, e.g. title=\"Product demo video\"")
                .with_node(node_snippet(frame))
                .with_details(media("embed", frame)),
            );
        }
    }

    Ok(())
}

fn check_animated_images(page: &Page, issues: &mut Vec<AccessibilityIssue>) -> Result<()> {
    let gifs: Vec<ElementRef<'_>> = page
        .select_all("img[src]")?
        .into_iter()
        .filter(|img| {
            img.value()
                .attr("src")
                .is_some_and(|s| s.split(['?', '#']).next().unwrap_or("").to_lowercase().ends_with(".gif"))
        })
        .collect();

    for img in gifs {
        issues.push(
            AccessibilityIssue::new(
                "animated-image",
                Impact::Minor,
                "Image may be animated. Animations longer than 5 seconds need a way to pause them.",
            )
            .with_wcag(&["2.2.2"])
            .with_help("Provide a pause control or use a static image with a link to the animation")
            .with_node(node_snippet(img))
            .with_details(media("image", img)),
        );
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn analyze(html: &str) -> Vec<AccessibilityIssue> {
        let page = Page::parse("https://example.com", html);
        MediaAnalyzer.analyze(&page).expect("analysis succeeds")
    }

    fn with_id<'a>(issues: &'a [AccessibilityIssue], id: &str) -> Vec<&'a AccessibilityIssue> {
        issues.iter().filter(|i| i.id == id).collect()
    }

    #[test]
    fn test_video_with_all_tracks() {
        let html = r#"
            <html><body>
                <video controls>
                    <source src="video.mp4" type="video/mp4">
                    <track kind="captions" src="captions.vtt" srclang="en" label="English">
                    <track kind="descriptions" src="desc.vtt" srclang="en">
                </video>
            </body></html>
        "#;
        let issues = analyze(html);
        assert!(issues.is_empty(), "unexpected: {:?}", issues);
    }

    #[test]
    fn test_video_no_captions() {
        let html = r#"<html><body><video controls><source src="video.mp4" type="video/mp4"></video></body></html>"#;
        let issues = analyze(html);
        let captions = with_id(&issues, "video-missing-captions");
        assert_eq!(captions.len(), 1);
        assert_eq!(captions[0].impact, Impact::Critical);
        assert_eq!(
            captions[0].details,
            Some(IssueDetails::Media {
                media_type: "video".into(),
                source: Some("video.mp4".into())
            })
        );
        assert_eq!(with_id(&issues, "video-missing-audio-description").len(), 1);
    }

    #[test]
    fn test_autoplay_no_controls() {
        let issues = analyze(r#"<html><body><video autoplay src="bg.mp4"></video></body></html>"#);
        let autoplay = with_id(&issues, "autoplay-without-controls");
        assert_eq!(autoplay.len(), 1);
        assert_eq!(autoplay[0].impact, Impact::Serious);
        // Autoplay media is not double-reported as missing controls
        assert!(with_id(&issues, "media-missing-controls").is_empty());
    }

    #[test]
    fn test_autoplay_muted_no_controls() {
        let issues = analyze(r#"<html><body><video autoplay muted src="bg.mp4"></video></body></html>"#);
        let autoplay = with_id(&issues, "autoplay-without-controls");
        assert_eq!(autoplay.len(), 1);
        assert_eq!(autoplay[0].impact, Impact::Moderate);
    }

    #[test]
    fn test_autoplay_with_controls() {
        let issues = analyze(r#"<html><body><video autoplay controls src="vid.mp4"></video></body></html>"#);
        assert!(with_id(&issues, "autoplay-without-controls").is_empty());
    }

    #[test]
    fn test_audio_no_transcript() {
        let issues = analyze(r#"<html><body><audio src="podcast.mp3" controls></audio></body></html>"#);
        assert_eq!(with_id(&issues, "audio-missing-transcript").len(), 1);
    }

    #[test]
    fn test_audio_missing_controls() {
        let issues = analyze(r#"<html><body><audio src="a.mp3" aria-describedby="t"></audio></body></html>"#);
        assert_eq!(with_id(&issues, "media-missing-controls").len(), 1);
    }

    #[test]
    fn test_untitled_youtube_embed() {
        let html = r#"<html><body>
            <iframe src="https://www.youtube.com/embed/abc"></iframe>
            <iframe src="https://maps.example.com/embed"></iframe>
            <iframe src="https://player.vimeo.com/video/1" title="Demo"></iframe>
        </body></html>"#;
        let issues = analyze(html);
        assert_eq!(with_id(&issues, "embedded-media-missing-title").len(), 1);
    }

    #[test]
    fn test_animated_gif() {
        let issues = analyze(r#"<html><body><img src="/spinner.GIF?v=2" alt="Loading"><img src="a.png" alt=""></body></html>"#);
        assert_eq!(with_id(&issues, "animated-image").len(), 1);
    }
}
