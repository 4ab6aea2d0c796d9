//! CLI subcommand implementations for the `tariff-harvest` binary.

pub mod normalize_cmd;
pub mod run_cmd;
