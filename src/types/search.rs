use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::types::errors::MirrorError;
use crate::types::record::Record;

/// Structured filter for catalog searches. Every bound is inclusive and every
/// field is optional; an all-`None` criteria matches everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchCriteria {
    /// Free text matched against title and comment.
    pub text: Option<String>,
    pub tag: Option<String>,
    pub author: Option<String>,
    /// `YYYY-MM-DD`
    pub date_from: Option<String>,
    /// `YYYY-MM-DD`
    pub date_to: Option<String>,
    pub rating_min: Option<f64>,
    pub rating_max: Option<f64>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl SearchCriteria {
    /// Trims string fields and drops blank ones, then checks dates and ratings.
    ///
    /// # Errors
    /// Returns `MirrorError::InvalidQuery` for a malformed date or a
    /// non-finite rating bound.
    pub fn normalized(&self) -> Result<Self, MirrorError> {
        let criteria = Self {
            text: non_blank(&self.text),
            tag: non_blank(&self.tag),
            author: non_blank(&self.author),
            date_from: non_blank(&self.date_from),
            date_to: non_blank(&self.date_to),
            rating_min: self.rating_min,
            rating_max: self.rating_max,
        };
        for date in [&criteria.date_from, &criteria.date_to].into_iter().flatten() {
            NaiveDate::parse_from_str(date, "%Y-%m-%d")
                .map_err(|e| MirrorError::InvalidQuery(format!("bad date '{}': {}", date, e)))?;
        }
        for bound in [criteria.rating_min, criteria.rating_max].into_iter().flatten() {
            if !bound.is_finite() {
                return Err(MirrorError::InvalidQuery(format!("bad rating bound {}", bound)));
            }
        }
        Ok(criteria)
    }

    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }

    /// Lower-cased words of the text query.
    pub fn terms(&self) -> Vec<String> {
        self.text
            .as_deref()
            .map(|t| t.split_whitespace().map(str::to_lowercase).collect())
            .unwrap_or_default()
    }

    /// In-memory evaluation of the criteria, used when the mirror is unavailable.
    /// With a text query, at least one term must occur in the title or comment
    /// (case-insensitive).
    pub fn matches(&self, record: &Record) -> bool {
        if let Some(tag) = &self.tag {
            if !record.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(author) = &self.author {
            if &record.author != author {
                return false;
            }
        }
        if let Some(from) = &self.date_from {
            if record.created_date.as_str() < from.as_str() {
                return false;
            }
        }
        if let Some(to) = &self.date_to {
            if record.created_date.as_str() > to.as_str() {
                return false;
            }
        }
        if let Some(min) = self.rating_min {
            if record.rating < min {
                return false;
            }
        }
        if let Some(max) = self.rating_max {
            if record.rating > max {
                return false;
            }
        }
        let terms = self.terms();
        if terms.is_empty() {
            return true;
        }
        let haystack = format!("{}\n{}", record.title, record.comment).to_lowercase();
        terms.iter().any(|term| haystack.contains(term.as_str()))
    }

    /// Occurrence count of the text terms, a crude relevance score for the
    /// in-memory path.
    pub fn relevance(&self, record: &Record) -> usize {
        let haystack = format!("{}\n{}", record.title, record.comment).to_lowercase();
        self.terms()
            .iter()
            .map(|term| haystack.matches(term.as_str()).count())
            .sum()
    }
}
