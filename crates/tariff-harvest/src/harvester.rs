//! Harvester: drives the run plan through fetch, extract and merge.
//!
//! Inputs are processed strictly one after another. Every request passes
//! through the [`Pacer`] first, so consecutive requests are at least
//! `delay_ms` apart regardless of input kind. A failed input is logged and
//! contributes nothing; the run always moves on to the next one. The
//! collection is handed back whole at the end and written exactly once by
//! the caller.

use crate::acquisition::{PageSource, Pacer};
use crate::audit::FetchLedger;
use crate::collection::{CodeCollection, MergeStats};
use crate::extraction::{extract_chapter_table, extract_search_results, Extraction, HtmlPage};
use crate::types::{FetchError, ParseError};
use chrono::{DateTime, Utc};
use std::fmt;
use std::time::{Duration, Instant};
use tracing::{info, info_span, warn, Instrument};

/// First retry delay; doubles on each further attempt.
pub const RETRY_BASE_DELAY: Duration = Duration::from_millis(500);

/// One unit of work in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestInput {
    /// Keyword search.
    Category(String),
    /// Chapter table, 1..=99.
    Chapter(u8),
}

impl HarvestInput {
    pub fn kind(&self) -> &'static str {
        match self {
            HarvestInput::Category(_) => "category",
            HarvestInput::Chapter(_) => "chapter",
        }
    }

    pub fn key(&self) -> String {
        match self {
            HarvestInput::Category(keyword) => keyword.clone(),
            HarvestInput::Chapter(chapter) => format!("{chapter:02}"),
        }
    }
}

impl fmt::Display for HarvestInput {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind(), self.key())
    }
}

/// URL shapes of the tariff site.
#[derive(Debug, Clone)]
pub struct Endpoints {
    base: String,
}

/// A request ready to hand to a [`PageSource`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub url: String,
    pub query: Vec<(&'static str, String)>,
}

impl PageRequest {
    /// Full URL with the query string encoded, for logs and the ledger.
    pub fn display_url(&self) -> String {
        match url::Url::parse(&self.url) {
            Ok(mut url) if !self.query.is_empty() => {
                url.query_pairs_mut()
                    .extend_pairs(self.query.iter().map(|(k, v)| (*k, v.as_str())));
                url.to_string()
            }
            _ => self.url.clone(),
        }
    }
}

impl Endpoints {
    pub fn new(base_url: &str) -> Result<Self, url::ParseError> {
        url::Url::parse(base_url)?;
        Ok(Self {
            base: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    /// `{base}/search`, queried with `q=<keyword>`.
    pub fn search_url(&self) -> String {
        format!("{}/search", self.base)
    }

    /// `{base}/chapter-NN`, chapter zero-padded to two digits.
    pub fn chapter_url(&self, chapter: u8) -> String {
        format!("{}/chapter-{chapter:02}", self.base)
    }

    pub fn request_for(&self, input: &HarvestInput) -> PageRequest {
        match input {
            HarvestInput::Category(keyword) => PageRequest {
                url: self.search_url(),
                query: vec![("q", keyword.clone())],
            },
            HarvestInput::Chapter(chapter) => PageRequest {
                url: self.chapter_url(*chapter),
                query: Vec::new(),
            },
        }
    }
}

/// What happened to a single input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputOutcome {
    /// Page fetched and read; some items may have been skipped.
    Harvested {
        records: usize,
        skipped: usize,
        merge: MergeStats,
    },
    /// Every fetch attempt failed.
    FetchFailed { error: FetchError, attempts: u32 },
    /// Page fetched but could not be walked at all.
    Unreadable { error: ParseError },
}

impl InputOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, InputOutcome::Harvested { .. })
    }
}

/// Result of a whole run.
#[derive(Debug)]
pub struct HarvestReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub elapsed: Duration,
    pub outcomes: Vec<(HarvestInput, InputOutcome)>,
    pub collection: CodeCollection,
}

impl HarvestReport {
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|(_, o)| o.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Records extracted across all inputs, before deduplication.
    pub fn extracted(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                InputOutcome::Harvested { records, .. } => *records,
                _ => 0,
            })
            .sum()
    }

    /// Items and rows dropped during extraction.
    pub fn skipped(&self) -> usize {
        self.outcomes
            .iter()
            .map(|(_, o)| match o {
                InputOutcome::Harvested { skipped, .. } => *skipped,
                _ => 0,
            })
            .sum()
    }

    /// Merge statistics summed over every input.
    pub fn merge_totals(&self) -> MergeStats {
        let mut totals = MergeStats::default();
        for (_, outcome) in &self.outcomes {
            if let InputOutcome::Harvested { merge, .. } = outcome {
                totals.absorb(*merge);
            }
        }
        totals
    }
}

/// Sequential harvester over any [`PageSource`].
pub struct Harvester<S: PageSource> {
    source: S,
    endpoints: Endpoints,
    pacer: Pacer,
    max_retries: u32,
    retry_base: Duration,
    ledger: Option<FetchLedger>,
    run_id: String,
}

impl<S: PageSource> Harvester<S> {
    pub fn new(source: S, endpoints: Endpoints, pacer: Pacer) -> Self {
        Self {
            source,
            endpoints,
            pacer,
            max_retries: 0,
            retry_base: RETRY_BASE_DELAY,
            ledger: None,
            run_id: uuid::Uuid::new_v4().to_string(),
        }
    }

    /// Allow up to `max_retries` extra attempts on retryable failures.
    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base(mut self, base: Duration) -> Self {
        self.retry_base = base;
        self
    }

    /// Record every fetch attempt to `ledger`. The ledger's run id is adopted.
    pub fn with_ledger(mut self, ledger: FetchLedger) -> Self {
        self.run_id = ledger.run_id().to_string();
        self.ledger = Some(ledger);
        self
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Harvest every input in `plan`, in order.
    pub async fn run(&mut self, plan: &[HarvestInput]) -> HarvestReport {
        let started_at = Utc::now();
        let clock = Instant::now();
        let mut collection = CodeCollection::new();
        let mut outcomes = Vec::with_capacity(plan.len());

        info!(
            "run {} starting: {} input(s) against {}",
            self.run_id,
            plan.len(),
            self.endpoints.base()
        );

        for input in plan {
            let span = info_span!("harvest", kind = input.kind(), key = %input.key());
            let outcome = self
                .harvest_one(input, &mut collection)
                .instrument(span)
                .await;
            outcomes.push((input.clone(), outcome));
        }

        let report = HarvestReport {
            run_id: self.run_id.clone(),
            started_at,
            elapsed: clock.elapsed(),
            outcomes,
            collection,
        };

        info!(
            "run {} finished in {:.1}s: {} ok, {} failed, {} unique codes",
            report.run_id,
            report.elapsed.as_secs_f64(),
            report.succeeded(),
            report.failed(),
            report.collection.len()
        );
        report
    }

    async fn harvest_one(
        &mut self,
        input: &HarvestInput,
        collection: &mut CodeCollection,
    ) -> InputOutcome {
        let request = self.endpoints.request_for(input);
        let display_url = request.display_url();
        let query: Vec<(&str, &str)> = request
            .query
            .iter()
            .map(|(k, v)| (*k, v.as_str()))
            .collect();

        let mut attempt: u32 = 0;
        loop {
            self.pacer.wait().await;
            let started = Instant::now();
            let result = self.source.fetch(&request.url, &query).await;
            let duration_ms = started.elapsed().as_millis() as u64;

            let page = match result {
                Ok(page) => page,
                Err(error) => {
                    self.record(input, &display_url, error.kind(), error.status(), duration_ms, 0);

                    if error.is_retryable() && attempt < self.max_retries {
                        let delay = self
                            .retry_base
                            .saturating_mul(2u32.saturating_pow(attempt));
                        attempt += 1;
                        warn!(
                            "{error}; retrying in {}ms (attempt {}/{})",
                            delay.as_millis(),
                            attempt,
                            self.max_retries
                        );
                        tokio::time::sleep(delay).await;
                        continue;
                    }

                    warn!("skipping {input}: {error}");
                    return InputOutcome::FetchFailed {
                        error,
                        attempts: attempt + 1,
                    };
                }
            };

            return match extract_page(input, &page.body, Utc::now()) {
                Ok(extraction) => {
                    let records = extraction.records.len();
                    let skipped = extraction.skipped;
                    self.record(input, &page.url, "ok", Some(page.status), duration_ms, records);

                    let merge = collection.merge(extraction.records);
                    info!(
                        "{input}: {records} record(s), {skipped} skipped, {} new, {} replaced",
                        merge.inserted, merge.replaced
                    );
                    InputOutcome::Harvested {
                        records,
                        skipped,
                        merge,
                    }
                }
                Err(error) => {
                    self.record(input, &page.url, "parse", Some(page.status), duration_ms, 0);
                    warn!("skipping {input}: {error}");
                    InputOutcome::Unreadable { error }
                }
            };
        }
    }

    fn record(
        &mut self,
        input: &HarvestInput,
        url: &str,
        outcome: &str,
        status: Option<u16>,
        duration_ms: u64,
        records: usize,
    ) {
        if let Some(ledger) = self.ledger.as_mut() {
            let label = input.to_string();
            if let Err(e) = ledger.log_fetch(&label, url, outcome, status, duration_ms, records) {
                warn!("failed to write fetch ledger: {e:#}");
            }
        }
    }
}

/// Parse a fetched body and run the extractor matching the input kind.
///
/// Kept synchronous: the parsed document never lives across an await.
pub fn extract_page(
    input: &HarvestInput,
    body: &str,
    scraped_at: DateTime<Utc>,
) -> Result<Extraction, ParseError> {
    let page = HtmlPage::parse(body);
    let root = page.root();
    match input {
        HarvestInput::Category(_) => extract_search_results(&root, scraped_at),
        HarvestInput::Chapter(chapter) => extract_chapter_table(&root, *chapter, scraped_at),
    }
}
