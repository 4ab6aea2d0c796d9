//! Tariff records, the persisted dataset envelope, and the error enums
//! shared by the fetch, extract, and write stages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tag stamped on every record harvested from the CBSA tariff site.
pub const SOURCE_TAG: &str = "CBSA";

/// Duty-rate placeholder used when a page omits the rate.
pub const NOT_AVAILABLE: &str = "N/A";

/// Version of the dataset layout written by the JSON sink.
pub const SCHEMA_VERSION: &str = "1.0";

/// One tariff classification entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HsCodeRecord {
    /// Canonical dotted code (`DD.DD.DD.DD…`). Dedup key.
    #[serde(rename = "hs_code")]
    pub code: String,
    /// Trimmed, non-empty label.
    pub description: String,
    /// Free-text rate, or [`NOT_AVAILABLE`].
    pub duty_rate: String,
    /// 0–99, where 0 means the code carried no usable chapter digits.
    pub chapter: u8,
    /// Originating site tag.
    pub source: String,
    /// When the record was extracted. Not part of identity.
    pub scraped_at: DateTime<Utc>,
}

/// Run-level metadata written ahead of the codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetMetadata {
    pub total_codes: usize,
    pub scraped_at: DateTime<Utc>,
    pub source: String,
    pub version: String,
}

/// The persisted artifact: metadata plus the deduplicated codes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub metadata: DatasetMetadata,
    pub codes: Vec<HsCodeRecord>,
}

impl Dataset {
    /// Wrap a final record list, stamping count, time, source, and version.
    pub fn new(codes: Vec<HsCodeRecord>, generated_at: DateTime<Utc>) -> Self {
        Self {
            metadata: DatasetMetadata {
                total_codes: codes.len(),
                scraped_at: generated_at,
                source: SOURCE_TAG.to_string(),
                version: SCHEMA_VERSION.to_string(),
            },
            codes,
        }
    }
}

/// Transport-level failure of a single page fetch.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("request to {url} timed out")]
    Timeout { url: String },

    #[error("connection to {url} failed: {message}")]
    Connection { url: String, message: String },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("request to {url} failed: {message}")]
    Unknown { url: String, message: String },
}

impl FetchError {
    /// Short, stable label used in logs and the fetch ledger.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Timeout { .. } => "timeout",
            FetchError::Connection { .. } => "connection",
            FetchError::Status { .. } => "status",
            FetchError::Unknown { .. } => "unknown",
        }
    }

    /// HTTP status, if the server answered at all.
    pub fn status(&self) -> Option<u16> {
        match self {
            FetchError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether another attempt could plausibly succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Connection { .. } => true,
            FetchError::Status { status, .. } => *status >= 500,
            FetchError::Unknown { .. } => false,
        }
    }
}

/// Failure to read one result item or table row.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("missing {0}")]
    MissingField(&'static str),

    #[error("row has {found} cells, expected at least {expected}")]
    TooFewCells { found: usize, expected: usize },

    #[error("invalid selector `{0}`")]
    InvalidSelector(String),
}

/// Failure to persist the final collection.
#[derive(thiserror::Error, Debug)]
pub enum WriteError {
    #[error("I/O error on {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{} is a directory, not a file", .0.display())]
    IsDirectory(PathBuf),

    #[error("serialization failed: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),
}

impl WriteError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WriteError::Io {
            path: path.into(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_serializes_with_stable_field_names() {
        let record = HsCodeRecord {
            code: "01.01.21.00".to_string(),
            description: "Pure-bred breeding horses".to_string(),
            duty_rate: "Free".to_string(),
            chapter: 1,
            source: SOURCE_TAG.to_string(),
            scraped_at: Utc::now(),
        };

        let value = serde_json::to_value(&record).unwrap();
        let obj = value.as_object().unwrap();
        let mut keys: Vec<_> = obj.keys().map(String::as_str).collect();
        keys.sort_unstable();
        assert_eq!(
            keys,
            vec![
                "chapter",
                "description",
                "duty_rate",
                "hs_code",
                "scraped_at",
                "source"
            ]
        );
        assert_eq!(obj["hs_code"], "01.01.21.00");
    }

    #[test]
    fn test_dataset_metadata_counts_codes() {
        let dataset = Dataset::new(Vec::new(), Utc::now());
        assert_eq!(dataset.metadata.total_codes, 0);
        assert_eq!(dataset.metadata.source, "CBSA");
        assert_eq!(dataset.metadata.version, SCHEMA_VERSION);

        let value = serde_json::to_value(&dataset).unwrap();
        assert!(value["metadata"]["total_codes"].is_number());
        assert!(value["codes"].as_array().unwrap().is_empty());
    }

    #[test]
    fn test_fetch_error_retry_policy() {
        let url = "https://example.com".to_string();
        assert!(FetchError::Timeout { url: url.clone() }.is_retryable());
        assert!(FetchError::Status {
            url: url.clone(),
            status: 503
        }
        .is_retryable());
        assert!(!FetchError::Status {
            url: url.clone(),
            status: 404
        }
        .is_retryable());
        assert!(!FetchError::Unknown {
            url,
            message: "bad body".to_string()
        }
        .is_retryable());
    }
}
