// SPDX-License-Identifier: PMPL-1.0-or-later
//! Integration tests for auditbot

use auditbot::config::{Config, FetchConfig};
use auditbot::fetch::PageFetcher;
use auditbot::fixes::store::{FileStore, KeyValueStore};
use auditbot::fixes::{Platform, Website};
use auditbot::report::{generate_report, OutputFormat};
use auditbot::{scanner, Auditor, Error, FixEngine, Impact};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const INACCESSIBLE: &str = r#"<!DOCTYPE html>
<html>
<head><title>Store</title></head>
<body>
  <h1>Store</h1>
  <h3>Deals</h3>
  <img src="banner.png">
  <p style="color: #999999; background-color: #ffffff">Limited time only</p>
  <button></button>
  <video src="promo.mp4" autoplay></video>
</body>
</html>"#;

const ACCESSIBLE: &str = r##"<!DOCTYPE html>
<html lang="en">
<head>
  <meta name="viewport" content="width=device-width, initial-scale=1">
  <title>Home</title>
</head>
<body>
  <a href="#main">Skip to content</a>
  <main id="main">
    <h1>Welcome</h1>
    <p>Plain text.</p>
  </main>
</body>
</html>"##;

fn fetch_config(server: &MockServer) -> FetchConfig {
    FetchConfig {
        initial_backoff_ms: 1,
        proxies: vec![
            format!("{}/proxy-a?url=", server.uri()),
            format!("{}/proxy-b?url=", server.uri()),
        ],
        ..FetchConfig::default()
    }
}

#[tokio::test]
async fn test_url_fetched_through_retried_proxy() {
    let server = MockServer::start().await;
    let target = format!("{}/shop", server.uri());
    let slow = ResponseTemplate::new(200)
        .set_body_string(INACCESSIBLE)
        .set_delay(Duration::from_secs(2));

    Mock::given(method("GET"))
        .and(path("/shop"))
        .respond_with(slow.clone())
        .mount(&server)
        .await;
    // First two proxy attempts time out, the third succeeds
    Mock::given(method("GET"))
        .and(path("/proxy-a"))
        .respond_with(slow)
        .up_to_n_times(2)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy-a"))
        .and(query_param("url", target.as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_string(INACCESSIBLE))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/proxy-b"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&fetch_config(&server))
        .unwrap()
        .with_timeout(Duration::from_millis(200));
    let auditor = Auditor::new(&Config::default()).unwrap().with_fetcher(fetcher);

    let result = auditor.test_accessibility(&target).await.unwrap();
    assert_eq!(result.url, target);
    assert!(result.has_critical());
    assert!(!result.issues_with_id("image-alt").is_empty());
    assert!(!result.issues_with_id("button-name").is_empty());
    assert!(!result.issues_with_id("heading-order").is_empty());
    assert!(!result.issues_with_id("video-missing-captions").is_empty());
    assert_eq!(result.summary.total, result.issues.len());
    assert_eq!(auditor.active_containers(), 0);
}

#[tokio::test]
async fn test_every_attempt_failing_is_reported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let fetcher = PageFetcher::new(&fetch_config(&server)).unwrap();
    let auditor = Auditor::new(&Config::default()).unwrap().with_fetcher(fetcher);

    match auditor.test_accessibility(&format!("{}/down", server.uri())).await {
        Err(Error::Fetch { causes, .. }) => {
            // One direct attempt plus four per proxy
            assert_eq!(causes.len(), 9);
            assert!(causes[0].starts_with("direct:"));
        }
        other => panic!("expected fetch error, got {:?}", other.map(|r| r.url)),
    }
}

#[test]
fn test_accessible_page_has_no_serious_issues() {
    let auditor = Auditor::new(&Config::default()).unwrap();
    let result = auditor.test_html("https://site.test/", ACCESSIBLE);

    let blocking: Vec<_> = result
        .issues
        .iter()
        .filter(|i| i.impact >= Impact::Serious)
        .map(|i| i.id.as_str())
        .collect();
    assert!(blocking.is_empty(), "unexpected issues: {:?}", blocking);
    assert!(result.warnings.is_empty());
}

#[tokio::test]
async fn test_fix_lifecycle_on_disk() {
    let temp = tempfile::tempdir().unwrap();
    let store = Arc::new(FileStore::new(temp.path()));
    let original = "body { font-family: serif; }";
    store.set("wp_custom_css_blog", original).await.unwrap();

    let auditor = Auditor::new(&Config::default()).unwrap();
    let result = auditor.test_html("https://blog.test/", INACCESSIBLE);

    let engine = FixEngine::new(store.clone());
    let site = Website::new(
        "blog",
        "https://blog.test/",
        Platform::WordPress {
            api_url: "https://blog.test/wp-json".into(),
            credentials: None,
        },
    );

    let fixes: Vec<_> = result
        .issues
        .iter()
        .filter_map(|issue| engine.generate_fix(issue).ok())
        .collect();
    assert!(!fixes.is_empty());

    for fix in &fixes {
        assert!(engine.apply_fix(&site, fix).await.success);
    }

    let blob = store.get("wp_custom_css_blog").await.unwrap().unwrap();
    assert!(blob.starts_with(original));
    assert!(blob.contains(&format!("/* WCAG Fix ID: {} */", fixes[0].id)));
    assert!(temp.path().join("wp_custom_css_blog.css").exists());

    let listed = engine.list_applied_fixes(&site).await;
    assert_eq!(
        listed.fixes.iter().map(|f| f.id.as_str()).collect::<Vec<_>>(),
        fixes.iter().map(|f| f.id.as_str()).collect::<Vec<_>>()
    );

    for fix in fixes.iter().rev() {
        assert!(engine.revert_fix(&site, &fix.id).await.success);
    }
    let restored = store.get("wp_custom_css_blog").await.unwrap().unwrap();
    assert_eq!(restored, original);
}

#[test]
fn test_scan_directory_reports_sarif() {
    let temp = tempfile::tempdir().unwrap();
    std::fs::write(temp.path().join("index.html"), ACCESSIBLE).unwrap();
    std::fs::create_dir(temp.path().join("shop")).unwrap();
    std::fs::write(temp.path().join("shop").join("index.html"), INACCESSIBLE).unwrap();

    let auditor = Auditor::new(&Config::default()).unwrap();
    let results = scanner::scan_directory(&auditor, temp.path()).unwrap();
    assert_eq!(results.len(), 2);
    assert!(results.iter().any(|r| r.has_critical()));

    let sarif = generate_report(&results, &[], OutputFormat::Sarif);
    let parsed: serde_json::Value = serde_json::from_str(&sarif).unwrap();
    let sarif_results = parsed["runs"][0]["results"].as_array().unwrap();
    assert!(sarif_results
        .iter()
        .any(|r| r["ruleId"] == "image-alt" && r["level"] == "error"));
}
