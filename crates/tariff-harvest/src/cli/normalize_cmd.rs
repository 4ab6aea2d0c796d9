//! `tariff-harvest normalize <raw>...`: print canonical codes and chapters.

use crate::normalize::normalize;
use anyhow::{bail, Result};

/// One output line per input: `<raw>\t<code>\t<chapter>`.
pub fn render(raw: &[String]) -> Vec<String> {
    raw.iter()
        .map(|input| {
            let normalized = normalize(input);
            format!("{input}\t{}\t{:02}", normalized.code, normalized.chapter)
        })
        .collect()
}

/// Run the normalize command.
pub fn run(raw: &[String]) -> Result<()> {
    if raw.is_empty() {
        bail!("nothing to normalize; pass one or more raw codes");
    }
    for line in render(raw) {
        println!("{line}");
    }
    Ok(())
}
