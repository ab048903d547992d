use chrono::NaiveDate;

use crate::error::HarvestError;

pub const MAX_QUERY_LENGTH: usize = 512;
pub const MAX_LABEL_LENGTH: usize = 120;

/// Page size bounds accepted by the recent-search endpoint.
pub const MIN_API_RESULTS: u32 = 10;
pub const MAX_API_RESULTS: u32 = 100;

/// Strip ASCII control characters (0x00-0x1F except space 0x20), trim whitespace,
/// and enforce a byte-length limit.
pub fn sanitize_text(input: &str, max_len: usize) -> Result<String, HarvestError> {
    if input.len() > max_len {
        return Err(HarvestError::InvalidInput(format!(
            "input exceeds maximum length of {} bytes",
            max_len
        )));
    }
    let sanitized: String = input
        .chars()
        .filter(|c| !c.is_ascii_control() || *c == ' ')
        .collect::<String>()
        .trim()
        .to_string();
    if sanitized.is_empty() {
        return Err(HarvestError::InvalidInput(
            "input is empty after sanitization".to_string(),
        ));
    }
    Ok(sanitized)
}

/// Validate query text. The operator grammar is opaque here; only length and
/// control characters are checked.
pub fn validate_query(input: &str) -> Result<String, HarvestError> {
    sanitize_text(input, MAX_QUERY_LENGTH)
}

/// Turn a query label into a filename stem: alphanumerics, space, `_` and `-`
/// survive, everything else becomes `_`, then spaces become `_`.
pub fn sanitize_label(label: &str) -> String {
    let safe: String = label
        .chars()
        .take(MAX_LABEL_LENGTH)
        .map(|c| {
            if c.is_alphanumeric() || c == ' ' || c == '_' || c == '-' {
                c
            } else {
                '_'
            }
        })
        .collect();
    let safe = safe.trim().replace(' ', "_");
    if safe.is_empty() {
        "query".to_string()
    } else {
        safe
    }
}

/// Validate a date string in YYYY-MM-DD format.
pub fn validate_date(input: &str) -> Result<NaiveDate, HarvestError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        HarvestError::InvalidInput(format!("invalid date '{}'. Use YYYY-MM-DD format", input))
    })
}

/// Validate the per-request result count for the recent-search endpoint.
pub fn validate_max_results(n: u32) -> Result<u32, HarvestError> {
    if (MIN_API_RESULTS..=MAX_API_RESULTS).contains(&n) {
        Ok(n)
    } else {
        Err(HarvestError::InvalidInput(format!(
            "max results must be between {} and {}, got {}",
            MIN_API_RESULTS, MAX_API_RESULTS, n
        )))
    }
}

/// Validate a count that must be at least 1 (targets, iteration caps, thresholds).
pub fn validate_positive(name: &str, n: usize) -> Result<usize, HarvestError> {
    if n == 0 {
        return Err(HarvestError::InvalidInput(format!(
            "{} must be at least 1",
            name
        )));
    }
    Ok(n)
}
