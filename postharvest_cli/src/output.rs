use anyhow::Result;
use postharvest_lib::{engagement_score, rank_by_engagement, PostRecord, QueryOutcome, RunSummary, Summary};
use serde::Serialize;
use tabled::settings::Style;
use tabled::{Table, Tabled};

#[derive(Clone, Debug)]
pub enum OutputFormat {
    Table,
    Json,
    Csv,
    Markdown,
}

#[derive(Tabled, Serialize)]
struct QueryRow {
    #[tabled(rename = "Label")]
    #[serde(rename = "Label")]
    label: String,
    #[tabled(rename = "New")]
    #[serde(rename = "New")]
    new_records: usize,
    #[tabled(rename = "Duplicates")]
    #[serde(rename = "Duplicates")]
    duplicates: usize,
    #[tabled(rename = "Skipped")]
    #[serde(rename = "Skipped")]
    skipped: usize,
    #[tabled(rename = "Failed")]
    #[serde(rename = "Failed")]
    item_failures: usize,
    #[tabled(rename = "Iterations")]
    #[serde(rename = "Iterations")]
    iterations: usize,
    #[tabled(rename = "Stopped")]
    #[serde(rename = "Stopped")]
    stop_reason: String,
    #[tabled(rename = "Output")]
    #[serde(rename = "Output")]
    output: String,
}

#[derive(Tabled, Serialize)]
struct PostRow {
    #[tabled(rename = "Score")]
    #[serde(rename = "Score")]
    score: u64,
    #[tabled(rename = "Author")]
    #[serde(rename = "Author")]
    author: String,
    #[tabled(rename = "Date")]
    #[serde(rename = "Date")]
    date: String,
    #[tabled(rename = "Likes")]
    #[serde(rename = "Likes")]
    likes: u64,
    #[tabled(rename = "Reposts")]
    #[serde(rename = "Reposts")]
    reposts: u64,
    #[tabled(rename = "Replies")]
    #[serde(rename = "Replies")]
    replies: String,
    #[tabled(rename = "Lang")]
    #[serde(rename = "Lang")]
    lang: String,
    #[tabled(rename = "Text")]
    #[serde(rename = "Text")]
    text: String,
}

#[derive(Tabled, Serialize)]
struct MetricRow {
    #[tabled(rename = "Metric")]
    #[serde(rename = "Metric")]
    metric: String,
    #[tabled(rename = "Value")]
    #[serde(rename = "Value")]
    value: String,
}

#[derive(Serialize)]
struct RunJson<'a> {
    queries: &'a [QueryOutcomeJson],
    top: Vec<&'a PostRecord>,
}

#[derive(Serialize)]
struct QueryOutcomeJson {
    label: String,
    query: String,
    output: String,
    new_records: usize,
    duplicates: usize,
    skipped: usize,
    item_failures: usize,
    iterations: usize,
    stop_reason: String,
}

#[derive(Serialize)]
struct ReportJson<'a> {
    summary: &'a Summary,
    top: &'a [&'a PostRecord],
}

// -- Row builders --

fn build_query_rows(outcomes: &[QueryOutcome]) -> Vec<QueryRow> {
    outcomes
        .iter()
        .map(|q| QueryRow {
            label: q.label.clone(),
            new_records: q.new_records,
            duplicates: q.duplicates,
            skipped: q.skipped,
            item_failures: q.item_failures,
            iterations: q.iterations,
            stop_reason: q.stop_reason.to_string(),
            output: q.output.display().to_string(),
        })
        .collect()
}

fn build_post_rows(posts: &[&PostRecord]) -> Vec<PostRow> {
    posts
        .iter()
        .map(|p| PostRow {
            score: engagement_score(p),
            author: format!("@{}", p.username),
            date: p.date.clone(),
            likes: p.like_count,
            reposts: p.retweet_count,
            replies: p.reply_count.map(|n| n.to_string()).unwrap_or_default(),
            lang: p.language.clone().unwrap_or_default(),
            text: truncate_text(&p.text, 60),
        })
        .collect()
}

fn build_summary_rows(summary: &Summary) -> Vec<MetricRow> {
    let row = |metric: &str, value: String| MetricRow {
        metric: metric.to_string(),
        value,
    };
    let languages = summary
        .top_languages
        .iter()
        .map(|(lang, count)| format!("{} ({})", lang, count))
        .collect::<Vec<_>>()
        .join(", ");
    vec![
        row("Posts", summary.total.to_string()),
        row("Authors", summary.unique_authors.to_string()),
        row("Earliest", summary.earliest.clone().unwrap_or_default()),
        row("Latest", summary.latest.clone().unwrap_or_default()),
        row("Likes", summary.likes.to_string()),
        row("Reposts", summary.retweets.to_string()),
        row("Replies", summary.replies.to_string()),
        row("Quotes", summary.quotes.to_string()),
        row("Mean score", format!("{:.1}", summary.mean_score)),
        row("Languages", languages),
    ]
}

fn query_json(outcomes: &[QueryOutcome]) -> Vec<QueryOutcomeJson> {
    outcomes
        .iter()
        .map(|q| QueryOutcomeJson {
            label: q.label.clone(),
            query: q.query.clone(),
            output: q.output.display().to_string(),
            new_records: q.new_records,
            duplicates: q.duplicates,
            skipped: q.skipped,
            item_failures: q.item_failures,
            iterations: q.iterations,
            stop_reason: q.stop_reason.to_string(),
        })
        .collect()
}

// -- Rendering --

fn render<T: Tabled>(rows: Vec<T>, markdown: bool) -> String {
    let mut table = Table::new(rows);
    if markdown {
        table.with(Style::markdown());
    }
    table.to_string()
}

fn print_csv<T: Serialize>(rows: &[T]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(std::io::stdout());
    for row in rows {
        wtr.serialize(row)?;
    }
    wtr.flush()?;
    Ok(())
}

pub fn print_json<T: Serialize>(data: &T) {
    match serde_json::to_string_pretty(data) {
        Ok(json) => println!("{}", json),
        Err(e) => eprintln!("Failed to serialize to JSON: {}", e),
    }
}

/// Per-query totals followed by the run's top posts. CSV carries the
/// per-query rows only.
pub fn print_run(summary: &RunSummary, top: usize, format: &OutputFormat) -> Result<()> {
    let mut ranked = rank_by_engagement(&summary.records);
    ranked.truncate(top);
    match format {
        OutputFormat::Table | OutputFormat::Markdown => {
            let markdown = matches!(format, OutputFormat::Markdown);
            println!("{}", render(build_query_rows(&summary.queries), markdown));
            if !ranked.is_empty() {
                println!();
                println!("{}", render(build_post_rows(&ranked), markdown));
            }
        }
        OutputFormat::Json => {
            let queries = query_json(&summary.queries);
            print_json(&RunJson {
                queries: &queries,
                top: ranked,
            });
        }
        OutputFormat::Csv => print_csv(&build_query_rows(&summary.queries))?,
    }
    Ok(())
}

/// Summary metrics followed by the ranked posts. CSV carries the ranked
/// posts only.
pub fn print_report(summary: &Summary, top: &[&PostRecord], format: &OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table | OutputFormat::Markdown => {
            let markdown = matches!(format, OutputFormat::Markdown);
            println!("{}", render(build_summary_rows(summary), markdown));
            if !top.is_empty() {
                println!();
                println!("{}", render(build_post_rows(top), markdown));
            }
        }
        OutputFormat::Json => print_json(&ReportJson { summary, top }),
        OutputFormat::Csv => print_csv(&build_post_rows(top))?,
    }
    Ok(())
}

/// Single-line preview of at most `max` characters.
fn truncate_text(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        flat
    } else {
        let cut: String = flat.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", cut)
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
