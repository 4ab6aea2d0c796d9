//! Pretty-printed JSON dataset file.
//!
//! The dataset is serialized into a sibling `.tmp` file and renamed over the
//! destination, so a reader sees either the previous artifact or the new
//! one. Non-ASCII text is written verbatim as UTF-8.

use super::DatasetSink;
use crate::types::{Dataset, HsCodeRecord, WriteError};
use chrono::Utc;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub struct JsonFileSink {
    path: PathBuf,
}

impl JsonFileSink {
    /// Prepare a sink at `path`, creating missing parent directories.
    ///
    /// Fails unless `path` can be written: it must not be a directory, and a
    /// scratch file must be creatable beside it.
    pub fn create(path: &Path) -> Result<Self, WriteError> {
        if path.is_dir() {
            return Err(WriteError::IsDirectory(path.to_path_buf()));
        }
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| WriteError::io(parent, e))?;
            }
        }

        let sink = Self {
            path: path.to_path_buf(),
        };
        let tmp = sink.temp_path();
        File::create(&tmp).map_err(|e| WriteError::io(&tmp, e))?;
        fs::remove_file(&tmp).map_err(|e| WriteError::io(&tmp, e))?;
        Ok(sink)
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }

    fn write_temp(tmp: &Path, dataset: &Dataset) -> Result<(), WriteError> {
        let file = File::create(tmp).map_err(|e| WriteError::io(tmp, e))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, dataset)?;
        writer
            .write_all(b"\n")
            .and_then(|_| writer.flush())
            .map_err(|e| WriteError::io(tmp, e))
    }
}

impl DatasetSink for JsonFileSink {
    fn describe(&self) -> String {
        format!("json:{}", self.path.display())
    }

    fn write(&mut self, records: &[HsCodeRecord]) -> Result<(), WriteError> {
        let dataset = Dataset::new(records.to_vec(), Utc::now());
        let tmp = self.temp_path();

        let result = Self::write_temp(&tmp, &dataset).and_then(|()| {
            fs::rename(&tmp, &self.path).map_err(|e| WriteError::io(&self.path, e))
        });
        if let Err(e) = result {
            // The scratch file may or may not exist at this point.
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }

        info!(
            "saved {} HS codes to {}",
            dataset.metadata.total_codes,
            self.path.display()
        );
        Ok(())
    }
}
