// src/services/enrich.rs

//! Per-entry enrichment.
//!
//! Fetches a submission's own page and extracts the extended fields. The
//! source has no schema contract, so extraction is a pipeline of
//! independent best-effort extractors: a later step failing never
//! invalidates an earlier step's result, and the enrichment call as a
//! whole never fails past its own boundary.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::Result;
use crate::models::{CatalogEntry, SourceConfig, Tag};
use crate::services::images::trim_static_url;
use crate::services::{ImageResolver, WikiClient};

/// Service that enriches one bare entry from its sub-page.
pub struct EntryEnricher<'a> {
    wiki: &'a WikiClient<'a>,
    images: &'a ImageResolver<'a>,
    config: &'a SourceConfig,
}

impl<'a> EntryEnricher<'a> {
    pub fn new(
        wiki: &'a WikiClient<'a>,
        images: &'a ImageResolver<'a>,
        config: &'a SourceConfig,
    ) -> Self {
        Self {
            wiki,
            images,
            config,
        }
    }

    /// Enrich an entry, swallowing every failure at the boundary.
    ///
    /// The entry comes back regardless; the error string (when present)
    /// feeds the progress payload.
    pub async fn enrich_entry(&self, mut entry: CatalogEntry) -> (CatalogEntry, Option<String>) {
        match self.enrich(&mut entry).await {
            Ok(()) => (entry, None),
            Err(error) => {
                log::warn!("Enrich failed for {}: {}", entry.name, error);
                (entry, Some(error.to_string()))
            }
        }
    }

    async fn enrich(&self, entry: &mut CatalogEntry) -> Result<()> {
        let html = self.wiki.fetch_page_html(&entry.id).await?;

        // All markup work happens synchronously; only an unresolved
        // numeric asset id needs a further network round-trip.
        let pending_asset = self.apply_markup(entry, &html);

        if let Some(asset_id) = pending_asset {
            match self.images.resolve_asset_id(&asset_id).await {
                Ok(url) => entry.image = url,
                Err(error) => {
                    log::warn!("Asset {asset_id} lookup failed for {}: {error}", entry.name);
                }
            }
        }
        Ok(())
    }

    /// Run the extraction pipeline over the rendered page.
    ///
    /// Returns a numeric asset id still needing network resolution.
    fn apply_markup(&self, entry: &mut CatalogEntry, html: &str) -> Option<String> {
        let document = Html::parse_document(html);
        let content_text: String = document.root_element().text().collect();

        // 1. Description; its pipe-delimited tail may carry the date
        if let Some(extracted) = extract_description(&document) {
            entry.description = Some(extracted.text);
            if let Some(date) = extracted.upload_date {
                entry.upload_date = date;
            }
        }

        // 2. Image: embedded first, then File: token, then asset id
        if let Some(src) = extract_embedded_image(&document) {
            entry.image = trim_static_url(&src);
        }
        if entry.has_placeholder_image() {
            if let Some(file) = find_file_token(&content_text) {
                entry.image = self.images.file_token_url(&file);
            }
        }
        let pending_asset = if entry.has_placeholder_image() {
            find_asset_id(&content_text)
        } else {
            None
        };

        // 3. Classification tag
        if entry.tag.is_none() {
            entry.tag = extract_tag(&content_text);
        }

        // 4. Payload or link to another submission, never both
        match extract_payload(&document, &self.config.submission_marker) {
            PayloadOutcome::Linked(href) => entry.linked_entry = Some(href),
            PayloadOutcome::Data { value, json_name } => {
                entry.payload = Some(value);
                entry.json_name = json_name;
            }
            PayloadOutcome::Absent => {}
        }

        // 5. Upload date, unless the description tail already set it
        if entry.has_sentinel_date() {
            if let Some(date) = extract_upload_date(&document, &content_text) {
                entry.upload_date = date;
            }
        }

        pending_asset
    }
}

/// Description region content, split from its optional date tail.
#[derive(Debug, PartialEq)]
struct DescriptionExtract {
    text: String,
    upload_date: Option<String>,
}

fn extract_description(document: &Html) -> Option<DescriptionExtract> {
    let desc_sel = Selector::parse("#desc").ok()?;
    if let Some(region) = document.select(&desc_sel).next() {
        let raw = region.text().collect::<String>().trim().to_string();
        if !raw.is_empty() {
            return Some(split_date_tail(&raw));
        }
    }

    // Generic fallback: first non-empty paragraph
    let p_sel = Selector::parse("p").ok()?;
    for paragraph in document.select(&p_sel) {
        let text = paragraph.text().collect::<String>().trim().to_string();
        if !text.is_empty() {
            return Some(DescriptionExtract {
                text,
                upload_date: None,
            });
        }
    }
    None
}

/// Strip a trailing `last updated: …` pipe segment into the date slot.
fn split_date_tail(raw: &str) -> DescriptionExtract {
    const PREFIX: &str = "last updated:";

    if raw.contains('|') {
        let segments: Vec<&str> = raw.split('|').collect();
        if let Some(last) = segments.last() {
            let trimmed = last.trim();
            let matches_prefix = trimmed
                .get(..PREFIX.len())
                .is_some_and(|head| head.eq_ignore_ascii_case(PREFIX));
            if matches_prefix {
                let date = trimmed[PREFIX.len()..].trim().to_string();
                let text = segments[..segments.len() - 1]
                    .iter()
                    .map(|s| s.trim())
                    .filter(|s| !s.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ");
                return DescriptionExtract {
                    text,
                    upload_date: (!date.is_empty()).then_some(date),
                };
            }
        }
    }

    DescriptionExtract {
        text: raw.to_string(),
        upload_date: None,
    }
}

/// First embedded image that is not an icon and not inside a code region.
fn extract_embedded_image(document: &Html) -> Option<String> {
    let img_sel = Selector::parse("img").ok()?;
    for img in document.select(&img_sel) {
        let inside_pre = img
            .ancestors()
            .filter_map(ElementRef::wrap)
            .any(|ancestor| ancestor.value().name() == "pre");
        if inside_pre {
            continue;
        }

        let src = img.value().attr("src").unwrap_or("");
        if src.is_empty() || src.contains("favicon") || src.contains("icon") {
            continue;
        }
        return Some(src.to_string());
    }
    None
}

/// Structured `File:` reference token in the page text.
fn find_file_token(text: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)File:([\w\-. ()]+?\.(?:png|jpe?g|gif|webp))").ok()?;
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
}

/// Numeric external-asset-id token in the page text.
fn find_asset_id(text: &str) -> Option<String> {
    let pattern = Regex::new(r"(?i)RobloxID(\d+)").ok()?;
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
}

/// Earliest case-sensitive occurrence of a classification keyword.
fn extract_tag(text: &str) -> Option<Tag> {
    [Tag::New, Tag::Rework, Tag::Rebalance]
        .into_iter()
        .filter_map(|tag| text.find(tag.keyword()).map(|pos| (pos, tag)))
        .min_by_key(|(pos, _)| *pos)
        .map(|(_, tag)| tag)
}

/// Outcome of inspecting the preformatted payload region.
#[derive(Debug)]
enum PayloadOutcome {
    /// The region is just an anchor to another submission page
    Linked(String),
    /// The region parses as structured data
    Data {
        value: serde_json::Value,
        json_name: Option<String>,
    },
    /// No region, or unparseable content
    Absent,
}

fn extract_payload(document: &Html, marker: &str) -> PayloadOutcome {
    let Some(region) = select_payload_region(document) else {
        return PayloadOutcome::Absent;
    };

    if let Some(href) = submission_anchor(&region, marker) {
        return PayloadOutcome::Linked(href);
    }

    let text = region.text().collect::<String>();
    match serde_json::from_str::<serde_json::Value>(text.trim()) {
        Ok(value) => {
            let json_name = value
                .as_object()
                .and_then(|object| object.keys().next().cloned());
            PayloadOutcome::Data { value, json_name }
        }
        Err(error) => {
            log::debug!("No valid JSON in payload region: {error}");
            PayloadOutcome::Absent
        }
    }
}

fn select_payload_region(document: &Html) -> Option<ElementRef<'_>> {
    let preferred = Selector::parse("pre#towerdata").ok()?;
    if let Some(region) = document.select(&preferred).next() {
        return Some(region);
    }
    let any = Selector::parse("pre").ok()?;
    document.select(&any).next()
}

/// Anchor inside the payload region that points at another submission
/// page (`…<marker>author/title`).
fn submission_anchor(region: &ElementRef<'_>, marker: &str) -> Option<String> {
    let anchor_sel = Selector::parse("a[href]").ok()?;
    for anchor in region.select(&anchor_sel) {
        let href = anchor.value().attr("href").unwrap_or("");
        if let Some((_, rest)) = href.split_once(marker) {
            if rest.contains('/') {
                return Some(href.to_string());
            }
        }
    }
    None
}

fn extract_upload_date(document: &Html, text: &str) -> Option<String> {
    let date_sel = Selector::parse("#upload-date").ok()?;
    if let Some(region) = document.select(&date_sel).next() {
        let value = region.text().collect::<String>().trim().to_string();
        if !value.is_empty() {
            return Some(value);
        }
    }

    let pattern = Regex::new(r"(?i)last updated:\s*([^|\n]+)").ok()?;
    pattern
        .captures(text)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().trim().to_string())
        .filter(|s| !s.is_empty())
}
