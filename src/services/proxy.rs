// src/services/proxy.rs

//! Redundant-endpoint HTTP access.
//!
//! A single logical request is retried across an ordered list of relay
//! endpoint templates until one succeeds. The first template is the
//! identity template (direct access).

use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use reqwest::Client;

use crate::error::{AppError, Result};
use crate::models::{ProxyConfig, SourceConfig};

/// Client that walks an ordered fallback chain of relay endpoints.
///
/// The endpoint cursor is sticky for the lifetime of the client: once a
/// request succeeds through endpoint N, the next request starts there.
/// Construct a fresh client per synchronization pass so a degraded pass
/// does not penalize the next one.
pub struct ProxyClient {
    client: Client,
    endpoints: Vec<String>,
    cursor: AtomicUsize,
}

impl ProxyClient {
    /// Create a new proxy client from configuration.
    pub fn new(source: &SourceConfig, proxy: &ProxyConfig) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&source.user_agent)
            .timeout(Duration::from_secs(source.timeout_secs))
            .build()?;
        Ok(Self::with_client(client, proxy.endpoints.clone()))
    }

    /// Create a proxy client over a prebuilt HTTP client.
    pub fn with_client(client: Client, endpoints: Vec<String>) -> Self {
        Self {
            client,
            endpoints,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Perform one logical request, trying each endpoint at most once.
    ///
    /// Returns the response body of the first endpoint that answers with a
    /// success status. Fails with [`AppError::ProxyExhausted`] once every
    /// endpoint has been tried.
    pub async fn request(&self, target_url: &str) -> Result<String> {
        let total = self.endpoints.len();
        if total == 0 {
            return Err(AppError::ProxyExhausted {
                url: target_url.to_string(),
                attempts: 0,
            });
        }

        let start = self.cursor.load(Ordering::Relaxed);
        let mut attempts = 0;

        for offset in 0..total {
            let index = (start + offset) % total;
            let endpoint = &self.endpoints[index];
            let request_url = Self::expand(endpoint, target_url);
            attempts += 1;

            match self.try_endpoint(&request_url).await {
                Ok(body) => {
                    self.cursor.store(index, Ordering::Relaxed);
                    log::debug!("Request for {target_url} served by endpoint #{index} ({endpoint})");
                    return Ok(body);
                }
                Err(error) => {
                    log::debug!("Endpoint #{index} failed for {target_url}: {error}");
                }
            }
        }

        Err(AppError::ProxyExhausted {
            url: target_url.to_string(),
            attempts,
        })
    }

    /// Substitute the target into an endpoint template.
    ///
    /// The identity template passes the target through untouched; relay
    /// templates receive it percent-encoded.
    fn expand(template: &str, target_url: &str) -> String {
        if template == "{url}" {
            target_url.to_string()
        } else {
            template.replace("{url}", &urlencoding::encode(target_url))
        }
    }

    async fn try_endpoint(&self, request_url: &str) -> Result<String> {
        let response = self.client.get(request_url).send().await?;
        if !response.status().is_success() {
            return Err(AppError::source(
                request_url,
                format!("HTTP status {}", response.status()),
            ));
        }
        Ok(response.text().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn chain(server: &MockServer, count: usize) -> Vec<String> {
        (0..count)
            .map(|i| format!("{}/relay{}?u={{url}}", server.uri(), i))
            .collect()
    }

    async fn mount(server: &MockServer, relay: usize, status: u16, body: &str, expect: u64) {
        Mock::given(method("GET"))
            .and(path(format!("/relay{relay}")))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .expect(expect)
            .mount(server)
            .await;
    }

    #[test]
    fn expand_identity_passes_target_through() {
        assert_eq!(
            ProxyClient::expand("{url}", "https://example.com/a?b=c"),
            "https://example.com/a?b=c"
        );
    }

    #[test]
    fn expand_relay_encodes_target() {
        let expanded = ProxyClient::expand("https://relay.test/?url={url}", "https://e.com/?a=b");
        assert_eq!(expanded, "https://relay.test/?url=https%3A%2F%2Fe.com%2F%3Fa%3Db");
    }

    #[tokio::test]
    async fn falls_through_to_last_working_endpoint() {
        let server = MockServer::start().await;
        mount(&server, 0, 500, "", 1).await;
        mount(&server, 1, 503, "", 1).await;
        mount(&server, 2, 404, "", 1).await;
        mount(&server, 3, 200, "payload", 1).await;

        let client = ProxyClient::with_client(Client::new(), chain(&server, 4));
        let body = client.request("https://upstream.test/page").await.unwrap();
        assert_eq!(body, "payload");
    }

    #[tokio::test]
    async fn exhausts_after_every_endpoint_fails() {
        let server = MockServer::start().await;
        for relay in 0..4 {
            mount(&server, relay, 500, "", 1).await;
        }

        let client = ProxyClient::with_client(Client::new(), chain(&server, 4));
        let error = client.request("https://upstream.test/page").await.unwrap_err();
        match error {
            AppError::ProxyExhausted { attempts, .. } => assert_eq!(attempts, 4),
            other => panic!("expected ProxyExhausted, got {other}"),
        }
    }

    #[tokio::test]
    async fn cursor_sticks_to_winning_endpoint() {
        let server = MockServer::start().await;
        // relay0 always fails; relay1 succeeds. The second request must
        // start at relay1 directly, so relay0 is hit exactly once.
        mount(&server, 0, 500, "", 1).await;
        mount(&server, 1, 200, "ok", 2).await;

        let client = ProxyClient::with_client(Client::new(), chain(&server, 2));
        client.request("https://upstream.test/a").await.unwrap();
        client.request("https://upstream.test/b").await.unwrap();
    }

    #[tokio::test]
    async fn wraps_around_from_cursor_position() {
        let server = MockServer::start().await;
        // Request one: relay0 fails once, relay1 answers, cursor lands on
        // relay1. Request two: relay1 now fails, so the chain wraps back
        // around to relay0.
        Mock::given(method("GET"))
            .and(path("/relay0"))
            .respond_with(ResponseTemplate::new(500))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay0"))
            .respond_with(ResponseTemplate::new(200).set_body_string("wrapped"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay1"))
            .respond_with(ResponseTemplate::new(200).set_body_string("direct"))
            .up_to_n_times(1)
            .with_priority(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/relay1"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ProxyClient::with_client(Client::new(), chain(&server, 2));
        assert_eq!(client.request("https://upstream.test/a").await.unwrap(), "direct");
        assert_eq!(client.request("https://upstream.test/b").await.unwrap(), "wrapped");
    }
}
