//! SQLite code cache with upsert-by-code semantics.
//!
//! A code seen for the first time is inserted. A known code has its
//! description, duty rate, chapter and `last_updated` overwritten; `source`
//! keeps the value from the first insert.

use super::DatasetSink;
use crate::types::{HsCodeRecord, WriteError};
use chrono::Utc;
use rusqlite::Connection;
use std::path::{Path, PathBuf};
use tracing::info;

const SCHEMA: &str = "CREATE TABLE IF NOT EXISTS hs_code_cache (
    hs_code TEXT PRIMARY KEY,
    description TEXT NOT NULL,
    duty_rate TEXT NOT NULL,
    chapter INTEGER NOT NULL,
    source TEXT NOT NULL,
    last_updated TEXT NOT NULL
);";

const UPSERT: &str = "INSERT INTO hs_code_cache
    (hs_code, description, duty_rate, chapter, source, last_updated)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6)
    ON CONFLICT (hs_code) DO UPDATE SET
        description = excluded.description,
        duty_rate = excluded.duty_rate,
        chapter = excluded.chapter,
        last_updated = excluded.last_updated";

/// A cached row, as read back from the table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CachedCode {
    pub hs_code: String,
    pub description: String,
    pub duty_rate: String,
    pub chapter: u8,
    pub source: String,
    pub last_updated: String,
}

pub struct SqliteSink {
    db: Connection,
    location: String,
}

impl SqliteSink {
    /// Open or create the cache database at `path`.
    pub fn open(path: &Path) -> Result<Self, WriteError> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
            }
        }
        let db = Connection::open(path)?;
        Self::init(db, path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self, WriteError> {
        Self::init(Connection::open_in_memory()?, ":memory:".to_string())
    }

    fn init(db: Connection, location: String) -> Result<Self, WriteError> {
        db.execute_batch(SCHEMA)?;
        Ok(Self { db, location })
    }

    /// Default cache location, `~/.tariff-harvest/hs_codes.db`.
    pub fn default_path() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("/tmp"))
            .join(".tariff-harvest")
            .join("hs_codes.db")
    }

    pub fn count(&self) -> Result<usize, WriteError> {
        let n: i64 = self
            .db
            .query_row("SELECT COUNT(*) FROM hs_code_cache", [], |row| row.get(0))?;
        Ok(n as usize)
    }

    pub fn lookup(&self, hs_code: &str) -> Result<Option<CachedCode>, WriteError> {
        let mut stmt = self.db.prepare(
            "SELECT hs_code, description, duty_rate, chapter, source, last_updated
             FROM hs_code_cache WHERE hs_code = ?1",
        )?;

        let result = stmt.query_row(rusqlite::params![hs_code], |row| {
            Ok(CachedCode {
                hs_code: row.get(0)?,
                description: row.get(1)?,
                duty_rate: row.get(2)?,
                chapter: row.get(3)?,
                source: row.get(4)?,
                last_updated: row.get(5)?,
            })
        });

        match result {
            Ok(code) => Ok(Some(code)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

impl DatasetSink for SqliteSink {
    fn describe(&self) -> String {
        format!("sqlite:{}", self.location)
    }

    fn write(&mut self, records: &[HsCodeRecord]) -> Result<(), WriteError> {
        let updated_at = Utc::now().to_rfc3339();
        let tx = self.db.transaction()?;
        {
            let mut stmt = tx.prepare_cached(UPSERT)?;
            for record in records {
                stmt.execute(rusqlite::params![
                    record.code,
                    record.description,
                    record.duty_rate,
                    record.chapter,
                    record.source,
                    updated_at,
                ])?;
            }
        }
        tx.commit()?;

        info!("upserted {} HS codes into {}", records.len(), self.location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn record(code: &str, description: &str, rate: &str, source: &str) -> HsCodeRecord {
        HsCodeRecord {
            code: code.to_string(),
            description: description.to_string(),
            duty_rate: rate.to_string(),
            chapter: 44,
            source: source.to_string(),
            scraped_at: Utc::now(),
        }
    }

    #[test]
    fn test_insert_then_update_by_code() {
        let mut sink = SqliteSink::open_in_memory().unwrap();

        sink.write(&[
            record("44.07.11", "Pine lumber", "Free", "CBSA"),
            record("44.07.12", "Fir lumber", "Free", "CBSA"),
        ])
        .unwrap();
        assert_eq!(sink.count().unwrap(), 2);

        sink.write(&[record("44.07.11", "Pine lumber, sawn", "2%", "OTHER")])
            .unwrap();
        assert_eq!(sink.count().unwrap(), 2);

        let pine = sink.lookup("44.07.11").unwrap().unwrap();
        assert_eq!(pine.description, "Pine lumber, sawn");
        assert_eq!(pine.duty_rate, "2%");
        assert_eq!(pine.chapter, 44);
        assert_eq!(pine.source, "CBSA");
        assert!(!pine.last_updated.is_empty());
    }

    #[test]
    fn test_lookup_missing_code() {
        let sink = SqliteSink::open_in_memory().unwrap();
        assert!(sink.lookup("99.99.99").unwrap().is_none());
    }

    #[test]
    fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("cache/hs_codes.db");

        {
            let mut sink = SqliteSink::open(&path).unwrap();
            sink.write(&[record("44.01.11", "Fuel wood", "Free", "CBSA")])
                .unwrap();
        }

        let sink = SqliteSink::open(&path).unwrap();
        assert_eq!(sink.count().unwrap(), 1);
        assert!(sink.describe().ends_with("hs_codes.db"));
    }
}
