//! Stream selector for picking the video stream of an item.
//!
//! Selection is positional: the resolver already orders candidates, so the
//! first stream that carries video wins. The same rule derives the effective
//! dynamic-range label at add time and again at fetch time.

use tracing::debug;

use crate::domain::{ItemMetadata, NON_HDR, StreamDescriptor};

/// Outcome of a selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selection<'a> {
    /// The chosen video stream, if any stream carries video.
    pub stream: Option<&'a StreamDescriptor>,
    /// Effective dynamic-range label for the item.
    pub dynamic_range: String,
}

/// Stream selector for choosing the best video stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct StreamSelector;

impl StreamSelector {
    pub fn new() -> Self {
        Self
    }

    /// Select the first video-capable stream in resolver order.
    pub fn select_best<'a>(&self, streams: &'a [StreamDescriptor]) -> Option<&'a StreamDescriptor> {
        streams.iter().find(|s| s.has_video())
    }

    /// Select the video stream and derive the effective dynamic range.
    pub fn select<'a>(&self, item: &'a ItemMetadata) -> Selection<'a> {
        let stream = self.select_best(&item.streams);
        if stream.is_none() && !item.streams.is_empty() {
            debug!(
                streams = item.streams.len(),
                "No video-capable stream reported, falling back to item-level dynamic range"
            );
        }

        let dynamic_range = effective_dynamic_range(item.dynamic_range.as_deref(), stream);
        Selection {
            stream,
            dynamic_range,
        }
    }
}

/// Effective label: item-level if non-empty, else the selected stream's, else [`NON_HDR`].
pub fn effective_dynamic_range(
    item_label: Option<&str>,
    selected: Option<&StreamDescriptor>,
) -> String {
    item_label
        .filter(|label| !label.trim().is_empty())
        .or_else(|| {
            selected
                .and_then(|s| s.dynamic_range.as_deref())
                .filter(|label| !label.trim().is_empty())
        })
        .unwrap_or(NON_HDR)
        .to_string()
}
