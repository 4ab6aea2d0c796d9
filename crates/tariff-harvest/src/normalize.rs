//! Canonical HS-code formatting.
//!
//! Raw codes on tariff pages come as `0101.21.00`, `0101 21 00`, `01012100`
//! and so on. Everything that is not an ASCII digit is dropped, then the
//! digits are regrouped the way the tariff site prints them: three pairs
//! followed by whatever remains (`DD.DD.DD.DD`, `DD.DD.DD.DDDD`).

/// A canonical code plus the chapter taken from its first two digits.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedCode {
    pub code: String,
    pub chapter: u8,
}

/// Minimum digit count before pair grouping applies.
const GROUPING_THRESHOLD: usize = 6;

/// Normalize a raw code string. Total: never fails, may return an empty code.
pub fn normalize(raw: &str) -> NormalizedCode {
    let digits: String = raw.chars().filter(char::is_ascii_digit).collect();
    let chapter = chapter_of(&digits);

    let code = if digits.len() < GROUPING_THRESHOLD {
        digits
    } else {
        group_digits(&digits)
    };

    NormalizedCode { code, chapter }
}

fn chapter_of(digits: &str) -> u8 {
    digits
        .get(..2)
        .and_then(|pair| pair.parse().ok())
        .unwrap_or(0)
}

// `digits` is ASCII-only, so byte slicing is char-aligned.
fn group_digits(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + 3);
    out.push_str(&digits[0..2]);
    out.push('.');
    out.push_str(&digits[2..4]);
    out.push('.');
    out.push_str(&digits[4..6]);
    if digits.len() > GROUPING_THRESHOLD {
        out.push('.');
        out.push_str(&digits[6..]);
    }
    out
}
