//! Catalog entry data structure.

use serde::{Deserialize, Serialize};

use super::EntryFlags;

/// Sentinel shown while an entry's image has not been resolved.
pub const PLACEHOLDER_IMAGE: &str =
    "https://static.wikia.nocookie.net/tower-defense-sim/images/4/4a/Site-favicon.ico";

/// Sentinel shown while an entry's upload date has not been resolved.
pub const DATE_SENTINEL: &str = "Recently";

/// Author shown when a listing entry carries no `author/title` separator.
pub const UNKNOWN_AUTHOR: &str = "Unknown contributor";

/// Classification tag declared somewhere on a submission page.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Tag {
    New,
    Rework,
    Rebalance,
}

impl Tag {
    /// The exact (case-sensitive) word that marks this tag in page text.
    pub fn keyword(&self) -> &'static str {
        match self {
            Tag::New => "New",
            Tag::Rework => "Rework",
            Tag::Rebalance => "Rebalance",
        }
    }
}

/// A community tower submission tracked by the catalog.
///
/// Constructed bare from the listing page, then enriched in place from the
/// submission's own page. Enrichment never clears a field once set.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatalogEntry {
    /// Canonical page identifier (percent-decoded page title). Dedup key.
    pub id: String,

    /// Display name (path segment after the last `/`)
    pub name: String,

    /// Submitting author (path segment before the first `/`)
    pub author: String,

    /// Canonical page locator
    pub url: String,

    /// Resolved image location; placeholder sentinel until resolved
    pub image: String,

    /// Free-text description from the submission page
    #[serde(default)]
    pub description: Option<String>,

    /// Classification tag declared on the page
    #[serde(default)]
    pub tag: Option<Tag>,

    /// Upload date; `"Recently"` when unresolvable
    pub upload_date: String,

    /// Machine-readable submission body, when the page embeds one.
    /// Mutually exclusive with `linked_entry`.
    #[serde(default)]
    pub payload: Option<serde_json::Value>,

    /// First key of `payload` (the declared submission name)
    #[serde(default)]
    pub json_name: Option<String>,

    /// Set when the page merely links to another submission page
    #[serde(default)]
    pub linked_entry: Option<String>,

    /// Entry appears in the featured registry
    pub featured: bool,

    /// Entry appears in the highlights registry
    pub highlighted: bool,

    /// Entry appears in the approved registry
    pub verified: bool,

    /// Complement of `verified`
    pub unverified: bool,

    /// Entry is exempt from verification requirements
    pub grandfathered: bool,
}

impl CatalogEntry {
    /// Construct a bare, listing-derived entry with sentinel defaults.
    pub fn bare(
        id: impl Into<String>,
        name: impl Into<String>,
        author: impl Into<String>,
        url: impl Into<String>,
        flags: EntryFlags,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            author: author.into(),
            url: url.into(),
            image: PLACEHOLDER_IMAGE.to_string(),
            description: None,
            tag: None,
            upload_date: DATE_SENTINEL.to_string(),
            payload: None,
            json_name: None,
            linked_entry: None,
            featured: flags.featured,
            highlighted: flags.highlighted,
            verified: flags.verified,
            unverified: flags.unverified,
            grandfathered: flags.grandfathered,
        }
    }

    /// True while the image is still the placeholder sentinel.
    pub fn has_placeholder_image(&self) -> bool {
        self.image.is_empty() || self.image == PLACEHOLDER_IMAGE
    }

    /// True while the upload date is still the sentinel.
    pub fn has_sentinel_date(&self) -> bool {
        self.upload_date.is_empty() || self.upload_date == DATE_SENTINEL
    }
}
