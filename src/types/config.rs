use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::types::errors::ConfigError;

/// Upper bound for a single search page.
pub const MAX_PAGE_SIZE: usize = 500;

/// How the store serializes its load-mutate-save cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LockMode {
    /// In-process mutex only. Correct when a single process owns the data directory.
    Process,
    /// In-process mutex plus an advisory lock on the marker file, for several
    /// processes on one machine.
    File,
}

/// Store configuration, persisted as JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub data_dir: PathBuf,
    pub records_file: String,
    pub mirror_file: String,
    pub rating_scale: f64,
    pub default_rating: f64,
    pub max_tags: usize,
    pub page_size: usize,
    pub anonymous_author: String,
    pub lock_mode: LockMode,
    /// Offset of the calendar used to stamp `created_date`.
    pub utc_offset_hours: i32,
    pub fetch_timeout_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            records_file: "projects.json".to_string(),
            mirror_file: "search.db".to_string(),
            rating_scale: 10.0,
            default_rating: 5.0,
            max_tags: 5,
            page_size: MAX_PAGE_SIZE,
            anonymous_author: "guest".to_string(),
            lock_mode: LockMode::File,
            utc_offset_hours: 9,
            fetch_timeout_secs: 10,
        }
    }
}

impl StoreConfig {
    /// Config rooted at `data_dir` with every other value defaulted.
    pub fn with_data_dir<P: Into<PathBuf>>(data_dir: P) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Self::default()
        }
    }

    pub fn records_path(&self) -> PathBuf {
        self.data_dir.join(&self.records_file)
    }

    /// The single backup generation lives next to the records file.
    pub fn backup_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.bak", self.records_file))
    }

    /// Empty marker file whose only purpose is to carry the advisory lock.
    pub fn lock_path(&self) -> PathBuf {
        self.data_dir.join(format!("{}.lock", self.records_file))
    }

    pub fn mirror_path(&self) -> PathBuf {
        self.data_dir.join(&self.mirror_file)
    }

    /// Page size actually used by searches, clamped to `1..=MAX_PAGE_SIZE`.
    pub fn effective_page_size(&self) -> usize {
        self.page_size.clamp(1, MAX_PAGE_SIZE)
    }

    /// Rejects values that would make normalization or searching meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.rating_scale.is_finite() || self.rating_scale <= 0.0 {
            return Err(ConfigError::InvalidValue(format!(
                "rating_scale must be positive, got {}",
                self.rating_scale
            )));
        }
        if !(0.0..=self.rating_scale).contains(&self.default_rating) {
            return Err(ConfigError::InvalidValue(format!(
                "default_rating {} is outside 0..={}",
                self.default_rating, self.rating_scale
            )));
        }
        if self.page_size == 0 {
            return Err(ConfigError::InvalidValue("page_size must be at least 1".to_string()));
        }
        if self.records_file.trim().is_empty() {
            return Err(ConfigError::InvalidValue("records_file cannot be empty".to_string()));
        }
        if !(-12..=14).contains(&self.utc_offset_hours) {
            return Err(ConfigError::InvalidValue(format!(
                "utc_offset_hours {} is not a valid offset",
                self.utc_offset_hours
            )));
        }
        Ok(())
    }
}
