//! Expansion of user-supplied locators into item locators.

use std::sync::Arc;

use tracing::{debug, info};

use super::{MetadataResolver, ResolveMode};
use crate::{Error, Result};

/// Placeholder replaced by the entry identifier in an item template.
pub const ID_PLACEHOLDER: &str = "{id}";

/// Default canonical item locator for playlist entries.
pub const DEFAULT_ITEM_TEMPLATE: &str = "https://www.youtube.com/watch?v={id}";

/// What a user-supplied locator points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LocatorKind {
    #[default]
    Single,
    Playlist,
}

/// Turns a locator into an ordered list of item locators.
pub struct LocatorExpander {
    resolver: Arc<dyn MetadataResolver>,
    item_template: String,
}

impl LocatorExpander {
    pub fn new(resolver: Arc<dyn MetadataResolver>) -> Self {
        Self::with_item_template(resolver, DEFAULT_ITEM_TEMPLATE)
    }

    /// Use a custom template; `{id}` is replaced by the entry identifier.
    pub fn with_item_template(
        resolver: Arc<dyn MetadataResolver>,
        item_template: impl Into<String>,
    ) -> Self {
        Self {
            resolver,
            item_template: item_template.into(),
        }
    }

    /// Build the canonical item locator for an entry identifier.
    pub fn item_locator(&self, id: &str) -> String {
        self.item_template.replace(ID_PLACEHOLDER, id)
    }

    /// Expand a locator.
    ///
    /// Single locators come back unchanged. Playlists are resolved in flat
    /// mode; entries without an identifier are skipped. Blank input and
    /// resolver failures are errors, callers treat them as "nothing to add".
    pub async fn expand(&self, locator: &str, kind: LocatorKind) -> Result<Vec<String>> {
        if locator.trim().is_empty() {
            return Err(Error::resolution(locator, "empty locator"));
        }

        match kind {
            LocatorKind::Single => Ok(vec![locator.to_string()]),
            LocatorKind::Playlist => {
                let listing = self.resolver.resolve(locator, ResolveMode::Flat).await?;
                let total = listing.entries.len();

                let items: Vec<String> = listing
                    .entries
                    .iter()
                    .filter_map(|entry| entry.id.as_deref())
                    .map(str::trim)
                    .filter(|id| !id.is_empty())
                    .map(|id| self.item_locator(id))
                    .collect();

                if items.len() < total {
                    debug!(
                        skipped = total - items.len(),
                        "Skipped playlist entries without an identifier"
                    );
                }
                info!(locator = %locator, items = items.len(), "Expanded playlist");
                Ok(items)
            }
        }
    }
}
