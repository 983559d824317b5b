use serde::{Deserialize, Serialize};

/// Metadata scraped from a bookmarked page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageMetadata {
    pub title: String,
    pub description: String,
    /// Inlined `data:` URI of the page's preview image.
    pub thumbnail: Option<String>,
    /// The page was blocked or unreachable; `title` holds the host name.
    pub fetch_failed: bool,
}
