//! `tariff-harvest run`: harvest the configured inputs and write the dataset.

use crate::acquisition::{HttpFetcher, Pacer};
use crate::audit::FetchLedger;
use crate::config::{HarvestConfig, HarvestMode, SinkKind};
use crate::harvester::{Endpoints, HarvestReport, Harvester, InputOutcome};
use crate::sink::open_sinks;
use anyhow::{bail, Context, Result};
use clap::Args;
use std::path::PathBuf;
use tracing::{error, info};

/// Flags for the run command. Each one overrides the config file and environment.
#[derive(Args, Debug, Clone, Default)]
pub struct RunArgs {
    /// JSON config file.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Which inputs to harvest.
    #[arg(long, value_enum)]
    pub mode: Option<HarvestMode>,

    /// Search keyword. Repeat to replace the default category list.
    #[arg(long = "category", value_name = "KEYWORD")]
    pub categories: Vec<String>,

    /// First chapter to fetch in chapter mode.
    #[arg(long)]
    pub first_chapter: Option<u8>,

    /// Last chapter to fetch in chapter mode.
    #[arg(long)]
    pub last_chapter: Option<u8>,

    /// Dataset destination(s).
    #[arg(long, value_enum)]
    pub sink: Option<SinkKind>,

    /// JSON artifact path.
    #[arg(long, short)]
    pub output: Option<PathBuf>,

    /// SQLite cache path.
    #[arg(long)]
    pub database: Option<PathBuf>,

    /// Root URL of the tariff site.
    #[arg(long)]
    pub base_url: Option<String>,

    /// Minimum delay between requests, in milliseconds.
    #[arg(long)]
    pub delay_ms: Option<u64>,

    /// Per-request timeout, in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,

    /// Extra attempts for timeouts, connection errors and 5xx responses.
    #[arg(long)]
    pub max_retries: Option<u32>,

    /// Append every fetch attempt to this JSONL file.
    #[arg(long)]
    pub audit_log: Option<PathBuf>,
}

impl RunArgs {
    /// Overlay explicitly given flags onto `config`.
    pub fn apply_to(&self, config: &mut HarvestConfig) {
        if let Some(mode) = self.mode {
            config.mode = mode;
        }
        if !self.categories.is_empty() {
            config.categories = self.categories.clone();
        }
        if let Some(first) = self.first_chapter {
            config.first_chapter = first;
        }
        if let Some(last) = self.last_chapter {
            config.last_chapter = last;
        }
        if let Some(sink) = self.sink {
            config.sink = sink;
        }
        if let Some(output) = &self.output {
            config.output = output.clone();
        }
        if let Some(database) = &self.database {
            config.database = Some(database.clone());
        }
        if let Some(base_url) = &self.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(delay_ms) = self.delay_ms {
            config.delay_ms = delay_ms;
        }
        if let Some(timeout_ms) = self.timeout_ms {
            config.timeout_ms = timeout_ms;
        }
        if let Some(max_retries) = self.max_retries {
            config.max_retries = max_retries;
        }
        if let Some(audit_log) = &self.audit_log {
            config.audit_log = Some(audit_log.clone());
        }
    }
}

/// Build the effective configuration: file, then environment, then flags.
pub fn resolve_config(
    args: &RunArgs,
    env: impl Fn(&str) -> Option<String>,
) -> Result<HarvestConfig> {
    let mut config = match &args.config {
        Some(path) => HarvestConfig::load(path)?,
        None => HarvestConfig::default(),
    };
    config.apply_env_with(env);
    args.apply_to(&mut config);
    config.validate().context("invalid configuration")?;
    Ok(config)
}

/// Totals of a finished run, as shown to the user.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: String,
    pub inputs: usize,
    pub succeeded: usize,
    pub failed: Vec<String>,
    pub extracted: usize,
    pub skipped: usize,
    pub discarded: usize,
    pub unique_codes: usize,
    pub destinations: Vec<String>,
}

impl RunSummary {
    fn from_report(report: &HarvestReport, destinations: Vec<String>) -> Self {
        let failed = report
            .outcomes
            .iter()
            .filter_map(|(input, outcome)| match outcome {
                InputOutcome::Harvested { .. } => None,
                InputOutcome::FetchFailed { error, .. } => Some(format!("{input} ({error})")),
                InputOutcome::Unreadable { error } => Some(format!("{input} ({error})")),
            })
            .collect();

        Self {
            run_id: report.run_id.clone(),
            inputs: report.outcomes.len(),
            succeeded: report.succeeded(),
            failed,
            extracted: report.extracted(),
            skipped: report.skipped(),
            discarded: report.merge_totals().discarded,
            unique_codes: report.collection.len(),
            destinations,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("  run:        {}\n", self.run_id));
        out.push_str(&format!(
            "  inputs:     {} ({} ok, {} failed)\n",
            self.inputs,
            self.succeeded,
            self.failed.len()
        ));
        out.push_str(&format!(
            "  records:    {} extracted, {} skipped, {} discarded\n",
            self.extracted, self.skipped, self.discarded
        ));
        out.push_str(&format!("  unique:     {}\n", self.unique_codes));
        for destination in &self.destinations {
            out.push_str(&format!("  written:    {destination}\n"));
        }
        for failure in &self.failed {
            out.push_str(&format!("  failed:     {failure}\n"));
        }
        out
    }
}

/// Harvest with a resolved configuration and write every configured sink.
///
/// Sinks are opened before the first request so an unusable destination
/// aborts the run up front. Per-input failures never fail the run; a sink
/// that cannot be written does.
pub async fn execute(config: &HarvestConfig) -> Result<RunSummary> {
    let mut sinks = open_sinks(config).context("failed to open dataset destination")?;

    let fetcher = HttpFetcher::new(&config.user_agent, config.timeout())?;
    let endpoints = Endpoints::new(&config.base_url)
        .with_context(|| format!("invalid base URL: {}", config.base_url))?;
    let mut harvester = Harvester::new(fetcher, endpoints, Pacer::from_millis(config.delay_ms))
        .with_retries(config.max_retries);

    if let Some(path) = &config.audit_log {
        let ledger = FetchLedger::open(path, harvester.run_id())?;
        harvester = harvester.with_ledger(ledger);
    }

    let plan = config.plan();
    let report = harvester.run(&plan).await;

    let destinations = sinks.iter().map(|s| s.describe()).collect();
    let summary = RunSummary::from_report(&report, destinations);
    let records = report.collection.into_records();

    let mut write_failures = Vec::new();
    for sink in sinks.iter_mut() {
        match sink.write(&records) {
            Ok(()) => info!("wrote {} record(s) to {}", records.len(), sink.describe()),
            Err(e) => {
                error!("failed to write {}: {e}", sink.describe());
                write_failures.push(format!("{}: {e}", sink.describe()));
            }
        }
    }
    if !write_failures.is_empty() {
        bail!(
            "{} of {} destination(s) could not be written: {}",
            write_failures.len(),
            sinks.len(),
            write_failures.join("; ")
        );
    }

    Ok(summary)
}

/// Run the harvest command.
pub async fn run(args: &RunArgs) -> Result<()> {
    let config = resolve_config(args, |key| std::env::var(key).ok())?;
    let summary = execute(&config).await?;
    print!("{}", summary.render());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{DEFAULT_BASE_URL, ENV_OUTPUT};
    use tempfile::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn test_flags_beat_env_and_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("harvest.json");
        std::fs::write(
            &file,
            r#"{ "output": "from-file.json", "delay_ms": 250, "mode": "all" }"#,
        )
        .unwrap();

        let args = RunArgs {
            config: Some(file.clone()),
            ..RunArgs::default()
        };
        let env = |key: &str| (key == ENV_OUTPUT).then(|| "from-env.json".to_string());

        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.output, PathBuf::from("from-env.json"));
        assert_eq!(config.delay_ms, 250);
        assert_eq!(config.mode, HarvestMode::All);

        let args = RunArgs {
            config: Some(file),
            output: Some(PathBuf::from("from-flag.json")),
            categories: vec!["cotton".to_string()],
            ..RunArgs::default()
        };
        let config = resolve_config(&args, env).unwrap();
        assert_eq!(config.output, PathBuf::from("from-flag.json"));
        assert_eq!(config.categories, vec!["cotton".to_string()]);
    }

    #[test]
    fn test_defaults_without_file_or_env() {
        let config = resolve_config(&RunArgs::default(), no_env).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.mode, HarvestMode::Categories);
    }

    #[test]
    fn test_invalid_flags_are_rejected() {
        let args = RunArgs {
            first_chapter: Some(50),
            last_chapter: Some(20),
            mode: Some(HarvestMode::Chapters),
            ..RunArgs::default()
        };
        assert!(resolve_config(&args, no_env).is_err());
    }

    #[test]
    fn test_summary_render() {
        let summary = RunSummary {
            run_id: "r1".to_string(),
            inputs: 3,
            succeeded: 2,
            failed: vec!["category:metals (request to x timed out)".to_string()],
            extracted: 5,
            skipped: 1,
            discarded: 0,
            unique_codes: 4,
            destinations: vec!["json:hs_codes.json".to_string()],
        };
        let text = summary.render();
        assert!(text.contains("3 (2 ok, 1 failed)"));
        assert!(text.contains("written:    json:hs_codes.json"));
        assert!(text.contains("failed:     category:metals"));
    }
}
