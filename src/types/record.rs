use serde::{Deserialize, Serialize};

use crate::types::config::StoreConfig;
use crate::types::errors::StoreError;

/// Author recorded when a submission carries no identity.
pub const ANONYMOUS_AUTHOR: &str = "guest";

fn default_author() -> String {
    ANONYMOUS_AUTHOR.to_string()
}

/// One catalogued bookmark.
///
/// Field aliases accept record files written by earlier deployments
/// (`user`, `date`, `image`, `error403`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record {
    pub id: u64,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub comment: String,
    #[serde(default)]
    pub rating: f64,
    #[serde(default)]
    pub likes: u64,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default = "default_author", alias = "user")]
    pub author: String,
    #[serde(default, alias = "date")]
    pub created_date: String,
    #[serde(default, alias = "image", skip_serializing_if = "Option::is_none")]
    pub thumbnail: Option<String>,
    #[serde(default, alias = "error403")]
    pub fetch_failed: bool,
}

/// Raw submission for a new or edited record, before normalization.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordInput {
    pub url: String,
    pub comment: String,
    pub rating: Option<f64>,
    /// Comma-separated tag list as typed by the user.
    pub tags: String,
    pub author: Option<String>,
}

/// A `RecordInput` after trimming, clamping and splitting.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedInput {
    pub url: String,
    pub comment: String,
    pub rating: f64,
    pub tags: Vec<String>,
    pub author: String,
}

impl RecordInput {
    /// Applies the catalog's input rules.
    ///
    /// # Errors
    /// Returns `StoreError::InvalidInput` for a non-finite rating.
    pub fn normalize(&self, config: &StoreConfig) -> Result<NormalizedInput, StoreError> {
        let rating = normalize_rating(self.rating, config.default_rating, config.rating_scale)?;
        let author = match self.author.as_deref().map(str::trim) {
            Some(a) if !a.is_empty() => a.to_string(),
            _ => config.anonymous_author.clone(),
        };
        Ok(NormalizedInput {
            url: self.url.trim().to_string(),
            comment: collapse_newlines(&self.comment),
            rating,
            tags: parse_tags(&self.tags, config.max_tags),
            author,
        })
    }
}

/// Declared purpose of a save, from which the backup guard decides whether an
/// empty commit is legitimate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveIntent {
    Append,
    Update,
    DeleteOne,
    DeleteAll,
    /// Bulk removal of records nobody liked.
    Cleanup,
}

impl SaveIntent {
    /// Whether committing an empty collection is an expected outcome.
    pub fn allows_empty(self) -> bool {
        matches!(self, SaveIntent::DeleteOne | SaveIntent::DeleteAll)
    }
}

/// Collapses every run of line breaks into a single `\n`.
pub fn collapse_newlines(text: &str) -> String {
    let unified = text.replace("\r\n", "\n").replace('\r', "\n");
    let mut out = String::with_capacity(unified.len());
    let mut prev_newline = false;
    for ch in unified.chars() {
        if ch == '\n' {
            if !prev_newline {
                out.push(ch);
            }
            prev_newline = true;
        } else {
            out.push(ch);
            prev_newline = false;
        }
    }
    out
}

/// Splits a comma-separated tag list: trims entries, drops blanks, keeps the
/// first `max` in order. Duplicates are kept.
pub fn parse_tags(raw: &str, max: usize) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .take(max)
        .map(str::to_string)
        .collect()
}

/// Defaults a missing rating and clamps it into `0..=scale`.
pub fn normalize_rating(rating: Option<f64>, default: f64, scale: f64) -> Result<f64, StoreError> {
    let value = rating.unwrap_or(default);
    if !value.is_finite() {
        return Err(StoreError::InvalidInput(format!("rating must be a number, got {}", value)));
    }
    Ok(value.clamp(0.0, scale))
}

/// Next id: one past the current maximum, or 1 for an empty collection.
///
/// Ids are not tombstoned: once the highest record is deleted, its id is
/// handed out again by the next add.
///
/// # Errors
/// Returns `StoreError::InvalidInput` when the maximum id is `u64::MAX`.
pub fn next_id(records: &[Record]) -> Result<u64, StoreError> {
    records
        .iter()
        .map(|r| r.id)
        .max()
        .unwrap_or(0)
        .checked_add(1)
        .ok_or_else(|| StoreError::InvalidInput("record id space exhausted".to_string()))
}

/// Star bar for a rating: filled stars for the whole part, hollow up to `scale`.
pub fn render_stars(rating: f64, scale: f64) -> String {
    let total = if scale.is_finite() && scale > 0.0 { scale.floor() as usize } else { 0 };
    let filled = if rating.is_finite() && rating > 0.0 {
        (rating.floor() as usize).min(total)
    } else {
        0
    };
    let mut out = "★".repeat(filled);
    out.push_str(&"☆".repeat(total - filled));
    out
}
