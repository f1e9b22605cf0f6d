//! Media metadata as reported by the resolver and fetch collaborators.
//!
//! The shapes follow yt-dlp's info JSON closely enough to deserialize it
//! directly; unknown fields are ignored.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Codec value used by resolvers to mark an absent stream component.
pub const CODEC_NONE: &str = "none";

/// One encoded stream candidate for an item.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamDescriptor {
    #[serde(default)]
    pub format_id: String,
    /// Container extension (e.g., "mp4", "webm").
    #[serde(default)]
    pub ext: Option<String>,
    #[serde(default)]
    pub vcodec: Option<String>,
    #[serde(default)]
    pub acodec: Option<String>,
    /// Dynamic-range label, e.g. "SDR", "HDR10", "HLG".
    #[serde(default)]
    pub dynamic_range: Option<String>,
}

impl StreamDescriptor {
    /// Whether the stream carries video.
    ///
    /// A missing codec and the `"none"` sentinel both mean no video.
    pub fn has_video(&self) -> bool {
        self.vcodec
            .as_deref()
            .map(str::trim)
            .is_some_and(|codec| !codec.is_empty() && codec != CODEC_NONE)
    }
}

/// A flat playlist entry. Only the identifier is needed for expansion.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
}

/// Resolver output for a locator.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemMetadata {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub uploader: Option<String>,
    /// Item-level dynamic-range label, if the resolver reports one.
    #[serde(default)]
    pub dynamic_range: Option<String>,
    /// Candidate streams in resolver order.
    #[serde(default, rename = "formats")]
    pub streams: Vec<StreamDescriptor>,
    /// Playlist entries (flat mode only).
    #[serde(default)]
    pub entries: Vec<PlaylistEntry>,
}

impl ItemMetadata {
    pub fn new(title: impl Into<String>, uploader: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            uploader: Some(uploader.into()),
            ..Default::default()
        }
    }

    pub fn with_dynamic_range(mut self, label: impl Into<String>) -> Self {
        self.dynamic_range = Some(label.into());
        self
    }

    pub fn with_stream(mut self, stream: StreamDescriptor) -> Self {
        self.streams.push(stream);
        self
    }

    pub fn with_entries(mut self, entries: Vec<PlaylistEntry>) -> Self {
        self.entries = entries;
        self
    }
}

/// What the fetch collaborator hands back after a successful download.
#[derive(Debug, Clone)]
pub struct FetchResult {
    /// The downloaded file, before the final remux.
    pub downloaded_path: PathBuf,
    /// Metadata as seen at fetch time; may differ from add time.
    pub metadata: ItemMetadata,
}
