//! Page metadata fetcher.
//!
//! Used when a record is created or edited to fill in its title and thumbnail.
//! Fetching never fails at the interface: an unreachable or blocking site
//! yields metadata flagged `fetch_failed` with the host name as title.

use std::collections::HashMap;

use async_trait::async_trait;

use crate::types::page::PageMetadata;

pub const TITLE_NOT_FOUND: &str = "Title not found";
pub const DESCRIPTION_NOT_FOUND: &str = "No description found";

/// Source of page metadata.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> PageMetadata;
}

/// Host name of `url` without a leading `www.`; the whole input when it does
/// not parse as a URL with a host.
pub fn host_name(url: &str) -> String {
    url::Url::parse(url)
        .ok()
        .and_then(|parsed| {
            parsed
                .host_str()
                .map(|host| host.strip_prefix("www.").unwrap_or(host).to_string())
        })
        .filter(|host| !host.is_empty())
        .unwrap_or_else(|| url.to_string())
}

/// Metadata for a page that could not be fetched.
pub fn fallback_metadata(url: &str) -> PageMetadata {
    PageMetadata {
        title: host_name(url),
        description: DESCRIPTION_NOT_FOUND.to_string(),
        thumbnail: None,
        fetch_failed: true,
    }
}

/// Title, description and image URL found in a page's HTML.
#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPage {
    pub title: String,
    pub description: String,
    pub image_url: Option<String>,
}

/// Extracts `og:title`/`<title>`, `og:description`/`description` and
/// `og:image` from raw HTML.
pub fn parse_page(html: &str) -> ParsedPage {
    let metas = meta_tags(html);
    let meta = |key: &str| {
        metas
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(key))
            .map(|(_, v)| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    let title = meta("og:title")
        .or_else(|| title_tag(html))
        .unwrap_or_else(|| TITLE_NOT_FOUND.to_string());
    let description = meta("og:description")
        .or_else(|| meta("description"))
        .unwrap_or_else(|| DESCRIPTION_NOT_FOUND.to_string());

    ParsedPage {
        title,
        description,
        image_url: meta("og:image"),
    }
}

/// Collects `(property-or-name, content)` pairs of every `<meta>` tag.
fn meta_tags(html: &str) -> Vec<(String, String)> {
    // ASCII lowercasing keeps byte offsets valid for slicing `html`.
    let lower = html.to_ascii_lowercase();
    let mut out = Vec::new();
    let mut cursor = 0;
    while let Some(found) = lower[cursor..].find("<meta") {
        let start = cursor + found + "<meta".len();
        let end = match lower[start..].find('>') {
            Some(e) => start + e,
            None => break,
        };
        let attrs = parse_attributes(&html[start..end]);
        let key = attrs
            .get("property")
            .or_else(|| attrs.get("name"))
            .cloned();
        if let (Some(key), Some(content)) = (key, attrs.get("content")) {
            out.push((key, decode_entities(content)));
        }
        cursor = end + 1;
    }
    out
}

/// Parses `key="value"`, `key='value'` and `key=value` attributes.
fn parse_attributes(raw: &str) -> HashMap<String, String> {
    let mut attrs = HashMap::new();
    let mut chars = raw.char_indices().peekable();
    while let Some(&(i, c)) = chars.peek() {
        if c.is_whitespace() || c == '/' {
            chars.next();
            continue;
        }
        let key_start = i;
        let mut key_end = raw.len();
        while let Some(&(j, c)) = chars.peek() {
            if c == '=' || c.is_whitespace() {
                key_end = j;
                break;
            }
            chars.next();
        }
        let key = raw[key_start..key_end].to_ascii_lowercase();
        while let Some(&(_, c)) = chars.peek() {
            if c.is_whitespace() {
                chars.next();
            } else {
                break;
            }
        }
        if let Some(&(_, '=')) = chars.peek() {
            chars.next();
            while let Some(&(_, c)) = chars.peek() {
                if c.is_whitespace() {
                    chars.next();
                } else {
                    break;
                }
            }
            let value = match chars.peek() {
                Some(&(j, q)) if q == '"' || q == '\'' => {
                    chars.next();
                    let value_start = j + 1;
                    let mut value_end = raw.len();
                    for (k, c) in chars.by_ref() {
                        if c == q {
                            value_end = k;
                            break;
                        }
                    }
                    raw[value_start..value_end.max(value_start)].to_string()
                }
                Some(&(j, _)) => {
                    let mut value_end = raw.len();
                    while let Some(&(k, c)) = chars.peek() {
                        if c.is_whitespace() {
                            value_end = k;
                            break;
                        }
                        chars.next();
                    }
                    raw[j..value_end].to_string()
                }
                None => String::new(),
            };
            attrs.insert(key, value);
        } else if !key.is_empty() {
            attrs.insert(key, String::new());
        }
    }
    attrs
}

fn title_tag(html: &str) -> Option<String> {
    let lower = html.to_ascii_lowercase();
    let open = lower.find("<title")?;
    let content_start = open + lower[open..].find('>')? + 1;
    let content_end = content_start + lower[content_start..].find("</title")?;
    let title = decode_entities(html[content_start..content_end].trim());
    if title.is_empty() {
        None
    } else {
        Some(title)
    }
}

fn decode_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&#x27;", "'")
        .replace("&amp;", "&")
}

/// Builds a `data:` URI for an inlined image.
pub fn data_uri(mime: &str, bytes: &[u8]) -> String {
    use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};
    format!("data:{};base64,{}", mime, BASE64.encode(bytes))
}

/// Offline fetcher serving fixed metadata per URL; unknown URLs fall back to
/// the host name.
#[derive(Default)]
pub struct StaticPageFetcher {
    pages: HashMap<String, PageMetadata>,
}

impl StaticPageFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, url: &str, page: PageMetadata) -> Self {
        self.pages.insert(url.to_string(), page);
        self
    }
}

#[async_trait]
impl PageFetcher for StaticPageFetcher {
    async fn fetch(&self, url: &str) -> PageMetadata {
        self.pages
            .get(url)
            .cloned()
            .unwrap_or_else(|| fallback_metadata(url))
    }
}

#[cfg(feature = "network")]
pub use http::HttpPageFetcher;

#[cfg(feature = "network")]
mod http {
    use std::time::Duration;

    use async_trait::async_trait;

    use super::{data_uri, fallback_metadata, parse_page, PageFetcher};
    use crate::types::errors::FetchError;
    use crate::types::page::PageMetadata;

    /// Fetches pages over HTTP with `reqwest`.
    pub struct HttpPageFetcher {
        client: reqwest::Client,
    }

    impl HttpPageFetcher {
        pub fn new(timeout_secs: u64) -> Result<Self, FetchError> {
            let client = reqwest::Client::builder()
                .timeout(Duration::from_secs(timeout_secs.max(1)))
                .build()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            Ok(Self { client })
        }

        async fn fetch_page(&self, url: &str) -> Result<PageMetadata, FetchError> {
            let resp = self
                .client
                .get(url)
                .send()
                .await
                .map_err(|e| FetchError::Network(e.to_string()))?;
            if resp.status() == reqwest::StatusCode::FORBIDDEN {
                return Err(FetchError::Blocked(url.to_string()));
            }
            let resp = resp
                .error_for_status()
                .map_err(|e| FetchError::Network(e.to_string()))?;
            let base = resp.url().clone();
            let html = resp.text().await.map_err(|e| FetchError::Parse(e.to_string()))?;
            let parsed = parse_page(&html);

            let thumbnail = match parsed.image_url.as_deref().and_then(|u| base.join(u).ok()) {
                Some(image_url) => self.fetch_image(image_url).await,
                None => None,
            };

            Ok(PageMetadata {
                title: parsed.title,
                description: parsed.description,
                thumbnail,
                fetch_failed: false,
            })
        }

        async fn fetch_image(&self, url: reqwest::Url) -> Option<String> {
            let resp = match self.client.get(url.clone()).send().await.and_then(|r| r.error_for_status()) {
                Ok(resp) => resp,
                Err(e) => {
                    tracing::debug!(url = %url, error = %e, "preview image unavailable");
                    return None;
                }
            };
            let mime = resp
                .headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok())
                .unwrap_or("image/jpeg")
                .to_string();
            let bytes = resp.bytes().await.ok()?;
            Some(data_uri(&mime, &bytes))
        }
    }

    #[async_trait]
    impl PageFetcher for HttpPageFetcher {
        async fn fetch(&self, url: &str) -> PageMetadata {
            match self.fetch_page(url).await {
                Ok(page) => page,
                Err(e) => {
                    tracing::warn!(url, error = %e, "page fetch failed; using host name");
                    fallback_metadata(url)
                }
            }
        }
    }
}
