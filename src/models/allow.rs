//! Allow-list registries for entry flags.
//!
//! The registries are plain sets of fully-qualified `Author/Title` names
//! supplied as static configuration. They are injected into the listing
//! resolver at construction, not read from ambient state.

use std::collections::HashSet;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::Result;

/// Flag set computed for one entry by registry membership.
///
/// `verified` and `unverified` are complementary: an entry absent from the
/// approved registry is always `unverified`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EntryFlags {
    pub featured: bool,
    pub highlighted: bool,
    pub verified: bool,
    pub unverified: bool,
    pub grandfathered: bool,
}

impl Default for EntryFlags {
    fn default() -> Self {
        Self {
            featured: false,
            highlighted: false,
            verified: false,
            unverified: true,
            grandfathered: false,
        }
    }
}

/// The four submission registries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AllowLists {
    /// Submissions that passed verification
    #[serde(default)]
    pub approved: HashSet<String>,

    /// Submissions highlighted as featured content
    #[serde(default)]
    pub featured: HashSet<String>,

    /// Submissions exempt from verification requirements
    #[serde(default)]
    pub grandfathered: HashSet<String>,

    /// Submissions shown in the highlights section
    #[serde(default)]
    pub highlights: HashSet<String>,
}

impl AllowLists {
    /// Load registries from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load registries or fall back to empty sets if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Registry load failed from {:?}: {}. Using empty registries.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Compute the flag set for a fully-qualified `Author/Title` name.
    pub fn flags_for(&self, qualified_name: &str) -> EntryFlags {
        let verified = self.approved.contains(qualified_name);
        EntryFlags {
            featured: self.featured.contains(qualified_name),
            highlighted: self.highlights.contains(qualified_name),
            verified,
            unverified: !verified,
            grandfathered: self.grandfathered.contains(qualified_name),
        }
    }
}
