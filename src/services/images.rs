// src/services/images.rs

//! Image location resolution.
//!
//! Two resolution paths: structured `File:` tokens derive a canonical
//! bucketed asset URL locally, numeric asset ids go through the asset
//! delivery endpoint (and therefore the proxy chain).

use regex::Regex;
use serde::Deserialize;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::models::SourceConfig;
use crate::services::ProxyClient;

/// Resolves image references to fetchable URLs.
pub struct ImageResolver<'a> {
    proxy: &'a ProxyClient,
    config: &'a SourceConfig,
}

/// Asset delivery response envelope.
#[derive(Debug, Deserialize)]
struct AssetLocations {
    #[serde(default)]
    locations: Vec<AssetLocation>,
}

#[derive(Debug, Deserialize)]
struct AssetLocation {
    #[serde(default)]
    location: Option<String>,
}

impl<'a> ImageResolver<'a> {
    pub fn new(proxy: &'a ProxyClient, config: &'a SourceConfig) -> Self {
        Self { proxy, config }
    }

    /// Derive the canonical bucketed URL for a `File:` token.
    ///
    /// The asset store shards files into a two-level directory keyed by a
    /// hex digest of the (space-normalized) filename: first hex char,
    /// then first two. No network access required.
    pub fn file_token_url(&self, filename: &str) -> String {
        let normalized = filename.trim().replace(' ', "_");
        let digest = hex::encode(Sha256::digest(normalized.as_bytes()));
        format!(
            "{}/{}/{}/{}",
            self.config.static_asset_base.trim_end_matches('/'),
            &digest[..1],
            &digest[..2],
            normalized
        )
    }

    /// Resolve a numeric asset id through the delivery endpoint.
    pub async fn resolve_asset_id(&self, asset_id: &str) -> Result<String> {
        let target = format!(
            "{}/{}",
            self.config.asset_delivery_base.trim_end_matches('/'),
            asset_id
        );

        let body = self.proxy.request(&target).await?;
        let response: AssetLocations = serde_json::from_str(&body)?;
        response
            .locations
            .into_iter()
            .find_map(|l| l.location)
            .ok_or_else(|| AppError::source(asset_id, "no asset location in response"))
    }
}

/// Truncate a static-asset URL at its image extension, dropping revision
/// and scaling suffixes.
pub fn trim_static_url(url: &str) -> String {
    let pattern = Regex::new(r"(?i)^https://static\.wikia\.nocookie\.net/.+?\.(?:png|jpe?g|gif)");
    match pattern.ok().and_then(|p| p.find(url)) {
        Some(m) => m.as_str().to_string(),
        None => url.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fixtures() -> (ProxyClient, SourceConfig) {
        (
            ProxyClient::with_client(Client::new(), vec!["{url}".to_string()]),
            SourceConfig::default(),
        )
    }

    #[test]
    fn file_token_url_is_deterministic_and_bucketed() {
        let (proxy, config) = fixtures();
        let resolver = ImageResolver::new(&proxy, &config);

        let first = resolver.file_token_url("Accelerator Preview.png");
        let second = resolver.file_token_url("Accelerator Preview.png");
        assert_eq!(first, second);

        // Two-level bucket: .../<h>/<hh>/Accelerator_Preview.png
        let tail = first
            .strip_prefix(&format!("{}/", config.static_asset_base))
            .unwrap();
        let parts: Vec<&str> = tail.split('/').collect();
        assert_eq!(parts.len(), 3);
        assert_eq!(parts[0].len(), 1);
        assert_eq!(parts[1].len(), 2);
        assert!(parts[1].starts_with(parts[0]));
        assert_eq!(parts[2], "Accelerator_Preview.png");
    }

    #[test]
    fn trim_static_url_drops_revision_suffix() {
        let url = "https://static.wikia.nocookie.net/tower-defense-sim/images/2/23/Slasher.png/revision/latest?cb=123";
        assert_eq!(
            trim_static_url(url),
            "https://static.wikia.nocookie.net/tower-defense-sim/images/2/23/Slasher.png"
        );
    }

    #[test]
    fn trim_static_url_keeps_foreign_urls() {
        let url = "https://example.com/picture.png?x=1";
        assert_eq!(trim_static_url(url), url);
    }

    #[tokio::test]
    async fn resolves_asset_id_through_delivery_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v2/assetId/12345"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                r#"{"locations":[{"location":"https://cdn.example.com/asset.png"}]}"#,
            ))
            .mount(&server)
            .await;

        let (proxy, mut config) = fixtures();
        config.asset_delivery_base = format!("{}/v2/assetId", server.uri());
        let resolver = ImageResolver::new(&proxy, &config);

        let url = resolver.resolve_asset_id("12345").await.unwrap();
        assert_eq!(url, "https://cdn.example.com/asset.png");
    }

    #[tokio::test]
    async fn missing_location_is_an_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"locations":[]}"#))
            .mount(&server)
            .await;

        let (proxy, mut config) = fixtures();
        config.asset_delivery_base = format!("{}/v2/assetId", server.uri());
        let resolver = ImageResolver::new(&proxy, &config);

        assert!(resolver.resolve_asset_id("99").await.is_err());
    }
}
