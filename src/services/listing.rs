// src/services/listing.rs

//! Listing discovery.
//!
//! Resolves the index page into an ordered, deduplicated sequence of bare
//! catalog entries. Fails open: a caller always receives a usable,
//! non-empty result, falling back to a fixed placeholder set when the
//! index cannot be parsed.

use std::collections::HashSet;

use scraper::{Html, Selector};
use url::Url;

use crate::error::{AppError, Result};
use crate::models::entry::UNKNOWN_AUTHOR;
use crate::models::{AllowLists, CatalogEntry, EntryFlags, SourceConfig};
use crate::services::WikiClient;
use crate::utils::{percent_decode, resolve_url};

/// Result of listing resolution.
#[derive(Debug)]
pub struct ListingOutcome {
    /// Bare entries in document order
    pub entries: Vec<CatalogEntry>,
    /// True when the fixed placeholder set was substituted
    pub used_fallback: bool,
}

/// Service that turns the index page into bare entries.
pub struct ListingResolver<'a> {
    config: &'a SourceConfig,
    allow: &'a AllowLists,
}

impl<'a> ListingResolver<'a> {
    pub fn new(config: &'a SourceConfig, allow: &'a AllowLists) -> Self {
        Self { config, allow }
    }

    /// Fetch and parse the index page.
    ///
    /// Only full proxy exhaustion propagates; every parse-level failure
    /// (including an empty listing) degrades to the fallback set.
    pub async fn resolve(&self, wiki: &WikiClient<'_>) -> Result<ListingOutcome> {
        let html = match wiki.fetch_page_html(&self.config.index_page).await {
            Ok(html) => html,
            Err(error) if error.is_proxy_exhausted() => return Err(error),
            Err(error) => {
                log::warn!("Index fetch failed: {error}. Using fallback entries.");
                return Ok(ListingOutcome {
                    entries: fallback_entries(),
                    used_fallback: true,
                });
            }
        };

        let entries = match self.parse_listing(&html) {
            Ok(entries) if !entries.is_empty() => entries,
            Ok(_) => {
                log::warn!("Index page yielded no entries. Using fallback entries.");
                return Ok(ListingOutcome {
                    entries: fallback_entries(),
                    used_fallback: true,
                });
            }
            Err(error) => {
                log::warn!("Index parse failed: {error}. Using fallback entries.");
                return Ok(ListingOutcome {
                    entries: fallback_entries(),
                    used_fallback: true,
                });
            }
        };

        log::info!("Found {} entries on the index page", entries.len());
        Ok(ListingOutcome {
            entries,
            used_fallback: false,
        })
    }

    /// Extract bare entries from the rendered index HTML.
    ///
    /// Keeps only category-tree nodes whose link target carries the
    /// submission marker; navigational and category-only nodes are
    /// dropped. Duplicate ids keep their first occurrence.
    pub fn parse_listing(&self, html: &str) -> Result<Vec<CatalogEntry>> {
        let document = Html::parse_document(html);
        let item_sel = parse_selector(".CategoryTreeItem")?;
        let link_sel = parse_selector("a")?;

        let base = Url::parse(&self.config.api_base).ok();
        let mut seen = HashSet::new();
        let mut entries = Vec::new();

        for item in document.select(&item_sel) {
            let Some(link) = item.select(&link_sel).next() else {
                continue;
            };
            let href = link.value().attr("href").unwrap_or("");
            if href.is_empty() || !href.contains(&self.config.submission_marker) {
                continue;
            }

            let mut full_text = link.text().collect::<String>().trim().to_string();
            if full_text.is_empty() {
                full_text = "Unknown Tower".to_string();
            }
            if let Some(stripped) = full_text.strip_prefix("User blog:") {
                full_text = stripped.to_string();
            }

            let name = full_text
                .rsplit('/')
                .next()
                .unwrap_or(full_text.as_str())
                .to_string();
            let author = full_text
                .split_once('/')
                .map(|(author, _)| author.to_string())
                .unwrap_or_else(|| UNKNOWN_AUTHOR.to_string());

            let page_id = match href.strip_prefix("/wiki/") {
                Some(rest) if !rest.is_empty() => percent_decode(rest),
                _ => full_text.clone(),
            };

            if !seen.insert(page_id.clone()) {
                continue;
            }

            let url = match &base {
                Some(base) => resolve_url(base, href),
                None => href.to_string(),
            };

            let flags = self.allow.flags_for(&full_text);
            entries.push(CatalogEntry::bare(page_id, name, author, url, flags));
        }

        Ok(entries)
    }
}

/// Fixed placeholder set served when the index is unusable.
///
/// Mostly placeholder data so the presentation layer always has cards to
/// render.
pub fn fallback_entries() -> Vec<CatalogEntry> {
    let placeholders = [
        (
            "GAIA",
            "Nishijou",
            "GAIA is an Earth Simulator developed by the GAI Computer Corporation.",
            "https://static.wikia.nocookie.net/tower-defense-sim/images/2/23/SlasherReworkUpgrade4.png",
        ),
        (
            "Noah II",
            "Takumi",
            "Noah II is a second-generation artificial Gigalomaniac device developed by N.O.Z.O.M.I.",
            "https://static.wikia.nocookie.net/tower-defense-sim/images/a/ab/MiniLevel4.png",
        ),
        (
            "Pyro Mage",
            "Takuru",
            "Deals fire damage over time to enemies in a wide area.",
            "https://static.wikia.nocookie.net/tower-defense-sim/images/9/92/MinigunnerUpgradeLevel3.png",
        ),
        (
            "Shadow Assassin",
            "Miyashiro",
            "Stealthy tower with high critical damage and hidden detection.",
            "https://static.wikia.nocookie.net/tower-defense-sim/images/c/c4/MinigunnerUpgradeLevel2.png",
        ),
    ];

    placeholders
        .into_iter()
        .map(|(name, author, description, image)| {
            let mut entry =
                CatalogEntry::bare(name, name, author, String::new(), EntryFlags::default());
            entry.description = Some(description.to_string());
            entry.image = image.to_string();
            entry
        })
        .collect()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Client;
    use wiremock::matchers::method;
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use crate::services::ProxyClient;

    const INDEX_HTML: &str = r#"
        <div class="CategoryTreeSection">
          <div class="CategoryTreeItem"><a href="/wiki/User_blog:Gabonnie/Accelerator">User blog:Gabonnie/Accelerator</a></div>
          <div class="CategoryTreeItem"><a href="/wiki/User_blog:Raspbelle/Crook%20Boss">User blog:Raspbelle/Crook Boss</a></div>
          <div class="CategoryTreeItem"><a href="/wiki/Category:Towers">Towers</a></div>
          <div class="CategoryTreeItem"><a href="/wiki/User_blog:Solo">User blog:Solo</a></div>
        </div>
    "#;

    fn resolver_fixtures() -> (SourceConfig, AllowLists) {
        let mut allow = AllowLists::default();
        allow.approved.insert("Gabonnie/Accelerator".to_string());
        (SourceConfig::default(), allow)
    }

    #[test]
    fn keeps_submission_nodes_in_document_order() {
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing(INDEX_HTML).unwrap();

        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].name, "Accelerator");
        assert_eq!(entries[0].author, "Gabonnie");
        assert_eq!(entries[1].id, "User_blog:Raspbelle/Crook Boss");
        assert_eq!(entries[2].name, "Solo");
    }

    #[test]
    fn missing_separator_falls_back_to_unknown_author() {
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing(INDEX_HTML).unwrap();

        assert_eq!(entries[2].author, UNKNOWN_AUTHOR);
    }

    #[test]
    fn flags_come_from_registries() {
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing(INDEX_HTML).unwrap();

        assert!(entries[0].verified);
        assert!(!entries[0].unverified);
        assert!(entries[1].unverified);
    }

    #[test]
    fn duplicate_ids_keep_first_occurrence() {
        let html = r#"
            <div class="CategoryTreeItem"><a href="/wiki/User_blog:A/X">User blog:A/X</a></div>
            <div class="CategoryTreeItem"><a href="/wiki/User_blog:A/X">User blog:A/X duplicate</a></div>
        "#;
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing(html).unwrap();

        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].name, "X");
    }

    #[test]
    fn entry_url_is_absolutized_against_the_wiki() {
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing(INDEX_HTML).unwrap();

        assert_eq!(
            entries[0].url,
            "https://tds.fandom.com/wiki/User_blog:Gabonnie/Accelerator"
        );
    }

    #[test]
    fn garbage_markup_yields_no_entries() {
        let (config, allow) = resolver_fixtures();
        let resolver = ListingResolver::new(&config, &allow);
        let entries = resolver.parse_listing("<p>nothing here</p>").unwrap();
        assert!(entries.is_empty());
    }

    #[test]
    fn fallback_set_is_non_empty_and_unverified() {
        let entries = fallback_entries();
        assert!(!entries.is_empty());
        assert!(entries.iter().all(|e| e.unverified));
        assert!(entries.iter().all(|e| e.description.is_some()));
    }

    #[tokio::test]
    async fn api_error_resolves_to_fallback_set() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(r#"{"error":{"info":"no such page"}}"#),
            )
            .mount(&server)
            .await;

        let (mut config, allow) = resolver_fixtures();
        config.api_base = format!("{}/api.php", server.uri());
        let proxy = ProxyClient::with_client(Client::new(), vec!["{url}".to_string()]);
        let wiki = WikiClient::new(&proxy, &config.api_base);

        let resolver = ListingResolver::new(&config, &allow);
        let outcome = resolver.resolve(&wiki).await.unwrap();
        assert!(outcome.used_fallback);
        assert_eq!(outcome.entries.len(), fallback_entries().len());
    }

    #[tokio::test]
    async fn proxy_exhaustion_propagates() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let (mut config, allow) = resolver_fixtures();
        config.api_base = format!("{}/api.php", server.uri());
        let proxy = ProxyClient::with_client(Client::new(), vec!["{url}".to_string()]);
        let wiki = WikiClient::new(&proxy, &config.api_base);

        let resolver = ListingResolver::new(&config, &allow);
        let error = resolver.resolve(&wiki).await.unwrap_err();
        assert!(error.is_proxy_exhausted());
    }
}
