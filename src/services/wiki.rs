// src/services/wiki.rs

//! Render-API access to the wiki source.
//!
//! Every page the engine reads (the index and each submission sub-page)
//! comes back as rendered HTML wrapped in the MediaWiki `action=parse`
//! JSON envelope.

use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::services::ProxyClient;

/// Wrapper over [`ProxyClient`] for the wiki render API.
pub struct WikiClient<'a> {
    proxy: &'a ProxyClient,
    api_base: &'a str,
}

/// Envelope of an `action=parse` response.
#[derive(Debug, Deserialize)]
struct ParseResponse {
    #[serde(default)]
    parse: Option<ParseBody>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct ParseBody {
    #[serde(default)]
    text: Option<RenderedText>,
}

#[derive(Debug, Deserialize)]
struct RenderedText {
    /// The rendered HTML lives under the `*` key.
    #[serde(rename = "*")]
    html: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    #[serde(default)]
    info: String,
}

impl<'a> WikiClient<'a> {
    pub fn new(proxy: &'a ProxyClient, api_base: &'a str) -> Self {
        Self { proxy, api_base }
    }

    /// Fetch a page and return its rendered HTML.
    pub async fn fetch_page_html(&self, page: &str) -> Result<String> {
        let target = format!(
            "{}?action=parse&format=json&origin=*&disablepp=true&prop=text&page={}",
            self.api_base,
            urlencoding::encode(page)
        );

        let body = self.proxy.request(&target).await?;
        let response: ParseResponse = serde_json::from_str(&body)?;

        if let Some(error) = response.error {
            return Err(AppError::source(page, format!("API error: {}", error.info)));
        }

        response
            .parse
            .and_then(|p| p.text)
            .map(|t| t.html)
            .filter(|html| !html.trim().is_empty())
            .ok_or_else(|| AppError::source(page, "no rendered content in API response"))
    }
}
