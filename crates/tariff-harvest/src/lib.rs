// Copyright 2026 Cortex Contributors
// SPDX-License-Identifier: Apache-2.0

//! tariff-harvest: builds a deduplicated dataset of Harmonized System tariff
//! codes from the CBSA customs tariff site.
//!
//! Pipeline: [`harvester::Harvester`] walks the run plan, fetching each page
//! through [`acquisition`], reading records out of it with [`extraction`],
//! and merging them into a [`collection::CodeCollection`]. The final
//! collection is handed to every configured [`sink`].

pub mod acquisition;
pub mod audit;
pub mod cli;
pub mod collection;
pub mod config;
pub mod extraction;
pub mod harvester;
pub mod normalize;
pub mod sink;
pub mod types;
