//! Overall sentiment distribution.

use super::{percentage, Calculator, StatContext};
use crate::error::StatError;
use crate::models::{ReviewRecord, Sentiment, SentimentShares, StatValues};
use tracing::debug;

/// Percentage of records in each of the four sentiment categories.
///
/// Records without a recognized sentiment count toward the total but toward
/// no category, so the four shares may sum to less than 100.
#[derive(Debug, Clone, Copy, Default)]
pub struct OverallSentiment;

#[derive(Debug, Default, Clone, Copy)]
struct Counts {
    positive: usize,
    negative: usize,
    neutral: usize,
    mixed: usize,
}

impl Counts {
    fn add(mut self, sentiment: Option<Sentiment>) -> Self {
        match sentiment {
            Some(Sentiment::Positive) => self.positive += 1,
            Some(Sentiment::Negative) => self.negative += 1,
            Some(Sentiment::Neutral) => self.neutral += 1,
            Some(Sentiment::Mixed) => self.mixed += 1,
            None => {}
        }
        self
    }
}

/// Compute the four shares for a record list.
pub fn sentiment_shares(records: &[ReviewRecord]) -> SentimentShares {
    let total = records.len();
    let counts = records
        .iter()
        .fold(Counts::default(), |counts, record| counts.add(record.sentiment));

    SentimentShares {
        positive: percentage(counts.positive, total),
        negative: percentage(counts.negative, total),
        neutral: percentage(counts.neutral, total),
        mixed: percentage(counts.mixed, total),
    }
}

impl Calculator for OverallSentiment {
    fn compute(
        &self,
        records: &[ReviewRecord],
        _context: &StatContext,
    ) -> Result<StatValues, StatError> {
        let shares = sentiment_shares(records);
        if !records.is_empty() && shares.sum() < 100.0 - 1e-9 {
            debug!(
                "Shares sum to {:.1}%, some reviews have no recognized sentiment",
                shares.sum()
            );
        }
        Ok(StatValues::Distribution(shares))
    }
}
