// SPDX-License-Identifier: PMPL-1.0-or-later
//! Page fetching with a CORS-proxy fallback chain.
//!
//! The target is requested directly once. On failure each configured proxy
//! is tried in order, with retries and exponential backoff per proxy. Every
//! failed attempt is kept so the final error lists all causes.

use crate::config::FetchConfig;
use crate::error::{Error, Result};
use crate::retry::{is_transient_error, RetryConfig, RetryPolicy};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Parse and check a target URL: http(s) with a host
pub fn validate_url(raw: &str) -> Result<Url> {
    let url = Url::parse(raw.trim())?;
    match url.scheme() {
        "http" | "https" => {}
        other => {
            return Err(Error::InvalidUrl(format!(
                "unsupported scheme '{}' in {}",
                other, raw
            )))
        }
    }
    if url.host_str().map_or(true, str::is_empty) {
        return Err(Error::InvalidUrl(format!("missing host in {}", raw)));
    }
    Ok(url)
}

/// Proxy request URL: the prefix followed by the percent-encoded target
pub fn proxy_url(prefix: &str, target: &str) -> String {
    let encoded: String = url::form_urlencoded::byte_serialize(target.as_bytes()).collect();
    format!("{}{}", prefix, encoded)
}

/// HTTP fetcher for audited pages
pub struct PageFetcher {
    client: Client,
    timeout: Duration,
    proxies: Vec<String>,
    retry: RetryConfig,
}

impl PageFetcher {
    pub fn new(config: &FetchConfig) -> Result<Self> {
        let client = Client::builder().user_agent(config.user_agent.as_str()).build()?;

        Ok(Self {
            client,
            timeout: config.timeout(),
            proxies: config.proxies.clone(),
            retry: config.retry_config()?,
        })
    }

    /// Override the per-request timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Fetch the HTML of `target`, falling back through the proxy chain
    pub async fn fetch(&self, target: &str) -> Result<String> {
        let mut causes = Vec::new();

        debug!("Fetching {} directly", target);
        match self.get_once(target).await {
            Ok(body) => return Ok(body),
            Err(e) => {
                warn!("Direct fetch of {} failed: {}", target, e);
                causes.push(format!("direct: {}", e));
            }
        }

        let policy = RetryPolicy::with_config(self.retry.clone());
        for prefix in &self.proxies {
            let proxied = proxy_url(prefix, target);
            debug!("Fetching {} via {}", target, prefix);

            let mut failures = Vec::new();
            let result = policy
                .execute(|| self.get_once(&proxied), is_transient_error, &mut failures)
                .await;
            causes.extend(failures.into_iter().map(|f| format!("{}: {}", prefix, f)));

            if let Ok(body) = result {
                info!("Fetched {} via {}", target, prefix);
                return Ok(body);
            }
        }

        Err(Error::Fetch {
            url: target.to_string(),
            causes,
        })
    }

    /// One GET with the per-request timeout. Bad status and empty bodies
    /// count as failures.
    async fn get_once(&self, url: &str) -> Result<String> {
        let response = self.client.get(url).timeout(self.timeout).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        if body.trim().is_empty() {
            return Err(Error::EmptyBody(url.to_string()));
        }
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> FetchConfig {
        FetchConfig {
            initial_backoff_ms: 1,
            proxies: vec![
                format!("{}/proxy-a?url=", server.uri()),
                format!("{}/proxy-b?url=", server.uri()),
            ],
            ..FetchConfig::default()
        }
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("https://example.com/page").is_ok());
        assert!(validate_url(" http://example.com ").is_ok());
        assert!(matches!(validate_url("not a url"), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_url("ftp://example.com"), Err(Error::InvalidUrl(_))));
        assert!(matches!(validate_url("file:///etc/passwd"), Err(Error::InvalidUrl(_))));
    }

    #[test]
    fn test_proxy_url_encodes_target() {
        assert_eq!(
            proxy_url("https://proxy.test/raw?url=", "https://example.com/a?b=c"),
            "https://proxy.test/raw?url=https%3A%2F%2Fexample.com%2Fa%3Fb%3Dc"
        );
    }

    #[tokio::test]
    async fn test_direct_fetch() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html></html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config(&server)).unwrap();
        let body = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(body, "<html></html>");
    }

    #[tokio::test]
    async fn test_falls_back_to_proxy() {
        let server = MockServer::start().await;
        let target = format!("{}/page", server.uri());

        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/proxy-a"))
            .and(query_param("url", target.as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxied</html>"))
            .expect(1)
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config(&server)).unwrap();
        let body = fetcher.fetch(&target).await.unwrap();
        assert_eq!(body, "<html>proxied</html>");
    }

    #[tokio::test]
    async fn test_empty_body_is_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(ResponseTemplate::new(200).set_body_string("   "))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/proxy-a"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<p>ok</p>"))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config(&server)).unwrap();
        let body = fetcher.fetch(&format!("{}/page", server.uri())).await.unwrap();
        assert_eq!(body, "<p>ok</p>");
    }

    #[tokio::test]
    async fn test_all_attempts_fail_lists_causes() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let fetcher = PageFetcher::new(&test_config(&server)).unwrap();
        let err = fetcher
            .fetch(&format!("{}/page", server.uri()))
            .await
            .unwrap_err();

        match err {
            Error::Fetch { causes, .. } => {
                // one direct attempt, then 1 + 3 retries for each of two proxies
                assert_eq!(causes.len(), 9);
                assert!(causes[0].starts_with("direct:"));
                assert!(causes.iter().all(|c| c.contains("503")));
            }
            other => panic!("expected fetch error, got {:?}", other),
        }
    }
}
