//! Sentiment trend over the query window.
//!
//! Produces one entry per calendar day of the window, including days with no
//! reviews. Days without reviews get a `null` percentage so that "no data"
//! stays distinguishable from "0%".

use super::{percentage, Calculator, StatContext};
use crate::error::StatError;
use crate::models::{DateWindow, ReviewRecord, Sentiment, StatValues, TrendSeries};
use chrono::NaiveDate;
use tracing::debug;

/// Chart label format: full month name and 2-digit day ("May 21").
pub const LABEL_FORMAT: &str = "%B %d";

/// Daily share of reviews with one polarity.
#[derive(Debug, Clone, Copy)]
pub struct SentimentOverTime {
    polarity: Sentiment,
}

impl SentimentOverTime {
    pub fn new(polarity: Sentiment) -> Self {
        Self { polarity }
    }
}

impl Default for SentimentOverTime {
    fn default() -> Self {
        Self::new(Sentiment::Negative)
    }
}

#[derive(Debug, Default, Clone, Copy)]
struct DayCount {
    total: usize,
    matching: usize,
}

/// Chart label for a day.
pub fn day_label(day: NaiveDate) -> String {
    day.format(LABEL_FORMAT).to_string()
}

/// Build the trend series for `window`, tracking `polarity`.
///
/// Records dated outside the window are ignored.
pub fn trend_series(records: &[ReviewRecord], window: &DateWindow, polarity: Sentiment) -> TrendSeries {
    let days = window.len_days();

    let (counts, outside) = records.iter().fold(
        (vec![DayCount::default(); days], 0usize),
        |(mut counts, outside), record| {
            if !window.contains(record.date) {
                return (counts, outside + 1);
            }
            let index = (record.date - window.start).num_days() as usize;
            let day = &mut counts[index];
            day.total += 1;
            if record.sentiment == Some(polarity) {
                day.matching += 1;
            }
            (counts, outside)
        },
    );

    if outside > 0 {
        debug!(
            "Ignored {} review(s) dated outside {}..={}",
            outside, window.start, window.end
        );
    }

    TrendSeries {
        labels: window.days().map(day_label).collect(),
        data: counts
            .iter()
            .map(|day| (day.total > 0).then(|| percentage(day.matching, day.total)))
            .collect(),
        totals: counts.iter().map(|day| day.total).collect(),
    }
}

impl Calculator for SentimentOverTime {
    fn uses_window(&self) -> bool {
        true
    }

    fn compute(
        &self,
        records: &[ReviewRecord],
        context: &StatContext,
    ) -> Result<StatValues, StatError> {
        let window = context.window.ok_or(StatError::MissingWindow)?;
        if !window.is_ordered() {
            return Err(StatError::InvertedWindow {
                start: window.start.to_string(),
                end: window.end.to_string(),
            });
        }

        Ok(StatValues::Trend(trend_series(records, &window, self.polarity)))
    }
}
