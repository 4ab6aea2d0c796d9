//! Run-wide record collection keyed by canonical code.
//!
//! Last write wins: a record whose code is already present replaces the
//! stored one wholesale, with no field-level merge. Records whose code
//! normalized to the empty string are discarded rather than piled into a
//! shared `""` slot.

use crate::types::HsCodeRecord;
use std::collections::BTreeMap;
use tracing::warn;

/// What a single merge did.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MergeStats {
    pub inserted: usize,
    pub replaced: usize,
    pub discarded: usize,
}

impl MergeStats {
    pub fn absorb(&mut self, other: MergeStats) {
        self.inserted += other.inserted;
        self.replaced += other.replaced;
        self.discarded += other.discarded;
    }
}

/// Deduplicated records, iterated in code order.
#[derive(Debug, Clone, Default)]
pub struct CodeCollection {
    records: BTreeMap<String, HsCodeRecord>,
}

impl CodeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite each incoming record by code, in order.
    pub fn merge<I>(&mut self, incoming: I) -> MergeStats
    where
        I: IntoIterator<Item = HsCodeRecord>,
    {
        let mut stats = MergeStats::default();
        for record in incoming {
            if record.code.is_empty() {
                warn!(
                    "discarding record without a usable code: {:?}",
                    record.description
                );
                stats.discarded += 1;
                continue;
            }
            match self.records.insert(record.code.clone(), record) {
                Some(_) => stats.replaced += 1,
                None => stats.inserted += 1,
            }
        }
        stats
    }

    pub fn get(&self, code: &str) -> Option<&HsCodeRecord> {
        self.records.get(code)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &HsCodeRecord> {
        self.records.values()
    }

    /// Consume the collection into records sorted by code.
    pub fn into_records(self) -> Vec<HsCodeRecord> {
        self.records.into_values().collect()
    }
}

/// Functional form of [`CodeCollection::merge`].
pub fn merge(mut existing: CodeCollection, incoming: Vec<HsCodeRecord>) -> CodeCollection {
    existing.merge(incoming);
    existing
}
