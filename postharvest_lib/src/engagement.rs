//! Engagement scoring and run reports. Pure functions over collected records.

use std::cmp::Reverse;
use std::collections::{HashMap, HashSet};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use chrono::{DateTime, FixedOffset};
use serde::Serialize;
use tracing::warn;

use crate::error::HarvestError;
use crate::record::PostRecord;

/// `likes + 2 * reshares + replies + quotes`; missing counts are zero.
/// Saturates at `u64::MAX`.
pub fn engagement_score(record: &PostRecord) -> u64 {
    record
        .like_count
        .saturating_add(record.retweet_count.saturating_mul(2))
        .saturating_add(record.reply_count.unwrap_or(0))
        .saturating_add(record.quote_count.unwrap_or(0))
}

fn saturating_total(values: impl Iterator<Item = u64>) -> u64 {
    values.fold(0u64, u64::saturating_add)
}

/// Stable sort, highest score first. Ties keep their input order.
pub fn rank_by_engagement(records: &[PostRecord]) -> Vec<&PostRecord> {
    let mut ranked: Vec<&PostRecord> = records.iter().collect();
    ranked.sort_by_key(|r| Reverse(engagement_score(r)));
    ranked
}

pub fn top_n(records: &[PostRecord], n: usize) -> Vec<&PostRecord> {
    let mut ranked = rank_by_engagement(records);
    ranked.truncate(n);
    ranked
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Summary {
    pub total: usize,
    pub unique_authors: usize,
    pub earliest: Option<String>,
    pub latest: Option<String>,
    pub likes: u64,
    pub retweets: u64,
    pub replies: u64,
    pub quotes: u64,
    pub mean_score: f64,
    /// `(language, count)` by descending count, then language.
    pub top_languages: Vec<(String, usize)>,
}

pub fn summarize(records: &[PostRecord], top_k_langs: usize) -> Summary {
    let total = records.len();
    let unique_authors = records
        .iter()
        .map(|r| r.username.as_str())
        .collect::<HashSet<_>>()
        .len();

    let (earliest, latest) = date_bounds(records);

    let mut lang_counts: HashMap<&str, usize> = HashMap::new();
    for lang in records.iter().filter_map(|r| r.language.as_deref()) {
        *lang_counts.entry(lang).or_default() += 1;
    }
    let mut top_languages: Vec<(String, usize)> = lang_counts
        .into_iter()
        .map(|(lang, count)| (lang.to_string(), count))
        .collect();
    top_languages.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
    top_languages.truncate(top_k_langs);

    let score_sum: u128 = records.iter().map(|r| u128::from(engagement_score(r))).sum();
    let mean_score = if total == 0 {
        0.0
    } else {
        score_sum as f64 / total as f64
    };

    Summary {
        total,
        unique_authors,
        earliest,
        latest,
        likes: saturating_total(records.iter().map(|r| r.like_count)),
        retweets: saturating_total(records.iter().map(|r| r.retweet_count)),
        replies: saturating_total(records.iter().filter_map(|r| r.reply_count)),
        quotes: saturating_total(records.iter().filter_map(|r| r.quote_count)),
        mean_score,
        top_languages,
    }
}

/// Compares as instants when every non-empty date parses as RFC 3339,
/// otherwise as strings.
fn date_bounds(records: &[PostRecord]) -> (Option<String>, Option<String>) {
    let dates: Vec<&str> = records
        .iter()
        .map(|r| r.date.as_str())
        .filter(|d| !d.is_empty())
        .collect();
    if dates.is_empty() {
        return (None, None);
    }

    let parsed: Option<Vec<(DateTime<FixedOffset>, &str)>> = dates
        .iter()
        .map(|d| DateTime::parse_from_rfc3339(d).ok().map(|t| (t, *d)))
        .collect();

    match parsed {
        Some(pairs) => {
            let min = pairs.iter().min_by_key(|(t, _)| *t).map(|(_, d)| d.to_string());
            let max = pairs.iter().max_by_key(|(t, _)| *t).map(|(_, d)| d.to_string());
            (min, max)
        }
        None => (
            dates.iter().min().map(|d| d.to_string()),
            dates.iter().max().map(|d| d.to_string()),
        ),
    }
}

/// Reads a raw JSONL file for reporting. Lines that do not deserialize into a
/// record are skipped with a warning.
pub fn load_records(path: &Path) -> Result<Vec<PostRecord>, HarvestError> {
    let file = File::open(path)?;
    let mut records = Vec::new();
    let mut skipped = 0usize;
    for line in BufReader::new(file).split(b'\n') {
        let line = line?;
        if line.iter().all(u8::is_ascii_whitespace) {
            continue;
        }
        match serde_json::from_slice::<PostRecord>(&line) {
            Ok(r) => records.push(r),
            Err(_) => skipped += 1,
        }
    }
    if skipped > 0 {
        warn!(path = %path.display(), skipped, "skipped unreadable lines");
    }
    Ok(records)
}

/// Drops repeated identities, keeping the highest-scoring copy of each.
/// The result is ranked by engagement.
pub fn dedup_records(records: Vec<PostRecord>) -> Vec<PostRecord> {
    let mut records = records;
    records.sort_by_key(|r| Reverse(engagement_score(r)));
    let mut seen = HashSet::new();
    records.retain(|r| seen.insert(r.identity_key()));
    records
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::Backend;

    fn rec(user: &str, date: &str, likes: u64, rts: u64, replies: Option<u64>) -> PostRecord {
        PostRecord {
            id: None,
            url: None,
            username: user.to_string(),
            display_name: String::new(),
            date: date.to_string(),
            text: String::new(),
            image: None,
            like_count: likes,
            retweet_count: rts,
            reply_count: replies,
            quote_count: None,
            language: None,
            hashtags: vec![],
            user_verified: None,
            user_followers: None,
            author_id: None,
            query: String::new(),
            source: Backend::Browser,
        }
    }

    #[test]
    fn score_weights_reshares_double() {
        assert_eq!(engagement_score(&rec("a", "d", 10, 3, Some(2))), 18);
        let mut r = rec("a", "d", 1, 0, None);
        r.quote_count = Some(4);
        assert_eq!(engagement_score(&r), 5);
    }

    #[test]
    fn score_and_totals_saturate_on_huge_counts() {
        let huge = rec("a", "2025-01-01T00:00:00Z", u64::MAX, 1, Some(1));
        assert_eq!(engagement_score(&huge), u64::MAX);
        let mut reshared = rec("b", "2025-01-02T00:00:00Z", 0, u64::MAX / 2 + 1, None);
        reshared.quote_count = Some(3);
        assert_eq!(engagement_score(&reshared), u64::MAX);

        let small = rec("c", "2025-01-03T00:00:00Z", 4, 0, None);
        let pair = [small.clone(), huge.clone()];
        let ranked = rank_by_engagement(&pair);
        assert_eq!(ranked[0].username, "a");

        let s = summarize(&[huge, small], 3);
        assert_eq!(s.likes, u64::MAX);
        assert!(s.mean_score > 1e18);
    }

    #[test]
    fn load_records_skips_invalid_utf8_lines() {
        use std::io::Write;
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"{\"username\":\"a\",\"date\":\"d1\",\"source\":\"browser\"}\n")
            .unwrap();
        file.write_all(b"{\"username\":\"b\",\"date\":\"\xe4\xb8\",\"source\":\"browser\"}\n")
            .unwrap();
        file.write_all(b"{\"username\":\"c\",\"date\":\"d3\",\"source\":\"browser\"}")
            .unwrap();
        file.flush().unwrap();

        let records = load_records(file.path()).unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["a", "c"]);
    }

    #[test]
    fn ranking_is_non_increasing_and_stable() {
        let batch = vec![
            rec("a", "1", 5, 0, None),
            rec("b", "2", 50, 0, None),
            rec("c", "3", 5, 0, None),
            rec("d", "4", 0, 10, None),
            rec("e", "5", 1, 0, Some(1)),
        ];
        let ranked = rank_by_engagement(&batch);
        let scores: Vec<u64> = ranked.iter().map(|r| engagement_score(r)).collect();
        assert!(scores.windows(2).all(|w| w[0] >= w[1]));
        let names: Vec<&str> = ranked.iter().map(|r| r.username.as_str()).collect();
        assert_eq!(names, vec!["b", "d", "a", "c", "e"]);

        let top = top_n(&batch, 3);
        assert_eq!(top.len(), 3);
        assert_eq!(top[0].username, "b");
        assert_eq!(top[2].username, "a");
        assert_eq!(top_n(&batch, 10).len(), 5);
    }

    #[test]
    fn summary_totals() {
        let mut a = rec("a", "2025-01-02T00:00:00Z", 10, 1, Some(1));
        a.language = Some("en".into());
        let mut b = rec("a", "2025-01-01T00:00:00+08:00", 0, 0, None);
        b.language = Some("zh".into());
        let mut c = rec("c", "2025-01-03T00:00:00Z", 2, 0, None);
        c.language = Some("zh".into());
        let s = summarize(&[a, b, c], 1);
        assert_eq!(s.total, 3);
        assert_eq!(s.unique_authors, 2);
        assert_eq!(s.earliest.as_deref(), Some("2025-01-01T00:00:00+08:00"));
        assert_eq!(s.latest.as_deref(), Some("2025-01-03T00:00:00Z"));
        assert_eq!(s.likes, 12);
        assert_eq!(s.retweets, 1);
        assert_eq!(s.replies, 1);
        assert_eq!(s.quotes, 0);
        assert!((s.mean_score - 5.0).abs() < 1e-9);
        assert_eq!(s.top_languages, vec![("zh".to_string(), 2)]);
    }

    #[test]
    fn summary_falls_back_to_string_order() {
        let s = summarize(&[rec("a", "Mon Jan 06", 0, 0, None), rec("b", "Fri Jan 03", 0, 0, None)], 3);
        assert_eq!(s.earliest.as_deref(), Some("Fri Jan 03"));
        assert_eq!(s.latest.as_deref(), Some("Mon Jan 06"));
    }

    #[test]
    fn empty_summary() {
        let s = summarize(&[], 5);
        assert_eq!(s.total, 0);
        assert_eq!(s.earliest, None);
        assert_eq!(s.mean_score, 0.0);
    }

    #[test]
    fn dedup_keeps_highest_scoring_copy() {
        let low = rec("a", "d", 1, 0, None);
        let high = rec("a", "d", 9, 0, None);
        let other = rec("b", "d", 5, 0, None);
        let out = dedup_records(vec![low, other, high]);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].like_count, 9);
        assert_eq!(out[1].username, "b");
    }
}
