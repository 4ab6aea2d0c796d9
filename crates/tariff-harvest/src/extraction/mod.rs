//! Turning fetched markup into tariff records.
//!
//! Each extractor walks a page item by item and produces one
//! `Result<RawFields, ParseError>` per item. [`fold_items`] then partitions
//! the results: failures are logged and counted, successes are normalized
//! and stamped. One bad item never costs its siblings.

pub mod chapter;
pub mod markup;
pub mod search;

pub use chapter::extract_chapter_table;
pub use markup::{HtmlPage, MarkupNode};
pub use search::extract_search_results;

use crate::normalize::normalize;
use crate::types::{HsCodeRecord, ParseError, NOT_AVAILABLE, SOURCE_TAG};
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

/// Fields read from one result item or table row, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawFields {
    pub raw_code: String,
    pub description: String,
    pub duty_rate: Option<String>,
    /// Chapter imposed by the page; when `None` it is derived from the code.
    pub chapter: Option<u8>,
}

impl RawFields {
    /// Normalize the code and stamp source and extraction time.
    pub fn into_record(self, scraped_at: DateTime<Utc>) -> HsCodeRecord {
        let normalized = normalize(&self.raw_code);
        HsCodeRecord {
            code: normalized.code,
            description: self.description,
            duty_rate: self
                .duty_rate
                .filter(|rate| !rate.is_empty())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string()),
            chapter: self.chapter.unwrap_or(normalized.chapter),
            source: SOURCE_TAG.to_string(),
            scraped_at,
        }
    }
}

/// Records pulled from one page, plus how many items were skipped.
#[derive(Debug, Clone, Default)]
pub struct Extraction {
    pub records: Vec<HsCodeRecord>,
    pub skipped: usize,
}

/// Partition per-item results into stamped records and a skip count.
///
/// `what` names the item kind in log lines ("result item", "row").
pub fn fold_items<I>(items: I, what: &str, scraped_at: DateTime<Utc>) -> Extraction
where
    I: IntoIterator<Item = Result<RawFields, ParseError>>,
{
    let mut extraction = Extraction::default();
    for (index, item) in items.into_iter().enumerate() {
        match item {
            Ok(fields) => extraction.records.push(fields.into_record(scraped_at)),
            Err(e) => {
                warn!("skipping {what} {index}: {e}");
                extraction.skipped += 1;
            }
        }
    }
    debug!(
        "extracted {} {what}(s), skipped {}",
        extraction.records.len(),
        extraction.skipped
    );
    extraction
}

/// Text of the first element matching `selector`, failing if it is absent or blank.
pub(crate) fn required_text<N: MarkupNode>(
    node: &N,
    selector: &str,
    field: &'static str,
) -> Result<String, ParseError> {
    let text = node
        .find_first(selector)?
        .map(|n| n.text())
        .ok_or(ParseError::MissingField(field))?;
    if text.is_empty() {
        return Err(ParseError::MissingField(field));
    }
    Ok(text)
}
