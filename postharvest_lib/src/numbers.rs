//! Parsing of abbreviated engagement counts as rendered in post footers.

use std::sync::OnceLock;

use regex::Regex;

/// Converts a displayed count to an integer.
///
/// Accepts `1.5K`, `2.3M` (case-insensitive suffix, fractional remainder
/// truncated) and plain digit groups with thousands separators (`1,234`).
/// Anything else, including the empty string, yields 0.
pub fn parse_count(raw: &str) -> u64 {
    let cleaned = raw.trim();
    if cleaned.is_empty() {
        return 0;
    }
    let (num_str, mult) = match cleaned.chars().last() {
        Some('K') | Some('k') => (&cleaned[..cleaned.len() - 1], 1_000),
        Some('M') | Some('m') => (&cleaned[..cleaned.len() - 1], 1_000_000),
        _ => return parse_int(cleaned).unwrap_or(0),
    };
    scale_decimal(num_str.trim(), mult).unwrap_or(0)
}

/// Pulls the first count out of an accessibility label such as
/// `"1,234 Likes. Like"` or `"1.5K Reposts"`.
pub fn parse_count_label(label: &str) -> u64 {
    static COUNT_RE: OnceLock<Option<Regex>> = OnceLock::new();
    let re = COUNT_RE.get_or_init(|| Regex::new(r"(?i)\d[\d,]*(?:\.\d+)?[km]?").ok());
    re.as_ref()
        .and_then(|re| re.find(label))
        .map(|m| parse_count(m.as_str()))
        .unwrap_or(0)
}

fn parse_int(raw: &str) -> Option<u64> {
    let cleaned = raw.replace(',', "");
    if cleaned.is_empty() || !cleaned.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    cleaned.parse().ok()
}

// Exact `whole.frac * mult`, truncated. Float multiplication would turn
// "2.3M" into 2_299_999.
fn scale_decimal(raw: &str, mult: u64) -> Option<u64> {
    let (whole, frac) = match raw.split_once('.') {
        Some((whole, frac)) => (whole, frac),
        None => (raw, ""),
    };
    if whole.is_empty() && frac.is_empty() {
        return None;
    }
    let whole = if whole.is_empty() { 0 } else { parse_int(whole)? };
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let mut value = u128::from(whole) * u128::from(mult);
    // Digits past the multiplier's precision can only contribute a remainder.
    let precision = mult.to_string().len() - 1;
    let frac = &frac[..frac.len().min(precision)];
    if !frac.is_empty() {
        let digits: u128 = frac.parse().ok()?;
        let denom = 10u128.pow(frac.len() as u32);
        value += digits * u128::from(mult) / denom;
    }
    u64::try_from(value).ok()
}
