//! Fetch auditing.

pub mod ledger;

pub use ledger::{FetchEvent, FetchLedger};
