//! JSONL fetch ledger: one line per fetch attempt, append-only.

use anyhow::{Context, Result};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::Path;

/// A single fetch attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchEvent {
    pub timestamp: String,
    pub run_id: String,
    /// Harvest input label, e.g. `category:cotton` or `chapter:07`.
    pub input: String,
    pub url: String,
    /// `ok`, or the fetch error kind.
    pub outcome: String,
    pub status: Option<u16>,
    pub duration_ms: u64,
    pub records: usize,
}

/// Append-only JSONL ledger.
pub struct FetchLedger {
    file: File,
    run_id: String,
}

impl FetchLedger {
    /// Open or create the ledger file.
    pub fn open(path: &Path, run_id: &str) -> Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("failed to open fetch ledger: {}", path.display()))?;

        Ok(Self {
            file,
            run_id: run_id.to_string(),
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Log an event as-is.
    pub fn log(&mut self, event: &FetchEvent) -> Result<()> {
        let json = serde_json::to_string(event)?;
        writeln!(self.file, "{json}")?;
        Ok(())
    }

    /// Log a fetch attempt, stamping time and run id.
    pub fn log_fetch(
        &mut self,
        input: &str,
        url: &str,
        outcome: &str,
        status: Option<u16>,
        duration_ms: u64,
        records: usize,
    ) -> Result<()> {
        let event = FetchEvent {
            timestamp: Utc::now().to_rfc3339(),
            run_id: self.run_id.clone(),
            input: input.to_string(),
            url: url.to_string(),
            outcome: outcome.to_string(),
            status,
            duration_ms,
            records,
        };
        self.log(&event)
    }
}
