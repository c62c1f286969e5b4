//! Markdown and JSON rendering of query results.
//!
//! JSON output is the envelope as callers receive it. Markdown output is a
//! human-readable summary with one section per computed stat.

use crate::apps::AppsPayload;
use crate::models::{
    ComputedStat, KeywordScore, Reply, Sentiment, SentimentShares, StatValues, StatsRequest,
    StatsResponse, TrendSeries,
};
use anyhow::{Context, Result};
use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::io::Write;
use std::path::Path;

/// Generate a complete Markdown report for a stats query.
pub fn generate_markdown_report(request: &StatsRequest, response: &StatsResponse) -> String {
    let mut output = String::new();

    // Title
    output.push_str("# Review Statistics\n\n");

    // Query section
    output.push_str(&generate_query_section(request));

    match response {
        StatsResponse::Success { stats, .. } => {
            if stats.is_empty() {
                output.push_str("_No known stats were requested._\n\n");
            }
            for stat in stats {
                output.push_str(&generate_stat_section(stat));
            }
        }
        StatsResponse::Error { message } => {
            output.push_str(&format!("**Error:** {}\n\n", message));
        }
    }

    // Footer
    output.push_str(&generate_footer());

    output
}

/// Generate the query section.
fn generate_query_section(request: &StatsRequest) -> String {
    let mut section = String::new();

    section.push_str("## Query\n\n");
    section.push_str(&format!("- **App:** {}\n", request.app_id_store));
    section.push_str(&format!("- **Version:** {}\n", request.version));
    section.push_str(&format!(
        "- **Window:** {} to {}\n",
        request.start_date.format("%Y-%m-%d"),
        request.end_date.format("%Y-%m-%d")
    ));
    section.push('\n');

    section
}

/// Generate the section of one stat, picked by result shape.
fn generate_stat_section(stat: &ComputedStat) -> String {
    let mut section = format!("## {}\n\n", stat.name);

    match &stat.values {
        StatValues::Count { total } => {
            section.push_str(&format!("**Total reviews:** {}\n\n", total));
        }
        StatValues::Distribution(shares) => section.push_str(&generate_shares_table(shares)),
        StatValues::Trend(series) => section.push_str(&generate_trend_table(series)),
        StatValues::Keywords(groups) => {
            section.push_str("### Positive\n\n");
            section.push_str(&generate_keyword_table(&groups.positive));
            section.push_str("### Negative\n\n");
            section.push_str(&generate_keyword_table(&groups.negative));
        }
        StatValues::Reviews(reviews) => section.push_str(&generate_reviews_list(reviews)),
        StatValues::Error { error } => {
            section.push_str(&format!("> ⚠️ {}\n\n", error));
        }
    }

    section
}

fn generate_shares_table(shares: &SentimentShares) -> String {
    let mut table = String::new();

    table.push_str("| Sentiment | Share |\n");
    table.push_str("|:---|---:|\n");
    for sentiment in Sentiment::ALL {
        table.push_str(&format!(
            "| {} | {:.1}% |\n",
            sentiment,
            shares.get(sentiment)
        ));
    }
    table.push('\n');

    table
}

fn generate_trend_table(series: &TrendSeries) -> String {
    let mut table = String::new();

    table.push_str("| Day | Share | Reviews |\n");
    table.push_str("|:---|---:|---:|\n");
    for ((label, value), total) in series
        .labels
        .iter()
        .zip(series.data.iter())
        .zip(series.totals.iter())
    {
        let share = match value {
            Some(value) => format!("{:.1}%", value),
            None => "n/a".to_string(),
        };
        table.push_str(&format!("| {} | {} | {} |\n", label, share, total));
    }
    table.push('\n');

    table
}

fn generate_keyword_table(keywords: &[KeywordScore]) -> String {
    if keywords.is_empty() {
        return "_None._\n\n".to_string();
    }

    let mut table = String::new();

    table.push_str("| Keyword | Share of reviews |\n");
    table.push_str("|:---|---:|\n");
    for score in keywords {
        table.push_str(&format!("| {} | {:.1}% |\n", score.keyword, score.percentage));
    }
    table.push('\n');

    table
}

fn generate_reviews_list(reviews: &BTreeMap<String, String>) -> String {
    let mut list = format!("{} review(s)\n\n", reviews.len());

    for (hash, fields) in reviews {
        list.push_str(&format!("- `{}`: `{}`\n", hash, fields));
    }
    list.push('\n');

    list
}

/// Generate a Markdown summary of the app catalog.
pub fn generate_apps_markdown(reply: &Reply<AppsPayload>) -> String {
    let mut output = String::new();

    output.push_str("# Apps\n\n");

    match reply {
        Reply::Success(payload) if payload.apps.is_empty() => {
            output.push_str("_No tracked app has reviews yet._\n\n");
        }
        Reply::Success(payload) => {
            output.push_str("| App | Key | First review | Last review | Versions |\n");
            output.push_str("|:---|:---|:---:|:---:|:---|\n");
            for (app_id_store, info) in &payload.apps {
                output.push_str(&format!(
                    "| {} | `{}` | {} | {} | {} |\n",
                    info.name,
                    app_id_store,
                    info.min_date.format("%Y-%m-%d"),
                    info.max_date.format("%Y-%m-%d"),
                    info.versions.join(", ")
                ));
            }
            output.push('\n');
        }
        Reply::Error { message } => {
            output.push_str(&format!("**Error:** {}\n\n", message));
        }
    }

    output.push_str(&generate_footer());

    output
}

/// Generate the report footer.
fn generate_footer() -> String {
    let mut footer = String::new();

    footer.push_str("---\n\n");
    footer.push_str(&format!(
        "*Generated by reviewstats v{} on {}*\n",
        env!("CARGO_PKG_VERSION"),
        Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    ));

    footer
}

/// Generate a JSON document.
pub fn generate_json_report<T: Serialize>(value: &T) -> Result<String> {
    serde_json::to_string_pretty(value).map_err(Into::into)
}

/// Write rendered output to a file.
pub fn write_report(content: &str, path: &Path) -> Result<()> {
    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    Ok(())
}
