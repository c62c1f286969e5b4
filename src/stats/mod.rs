//! Statistics calculators.
//!
//! Each calculator is a pure function from a list of review records to one
//! named result. The [`StatRegistry`] maps the stat names callers send to
//! calculators and runs the requested ones in request order.

pub mod keywords;
pub mod num_reviews;
pub mod overall_sentiment;
pub mod raw_reviews;
pub mod registry;
pub mod sentiment_over_time;

pub use keywords::TopKeywords;
pub use num_reviews::NumReviews;
pub use overall_sentiment::OverallSentiment;
pub use raw_reviews::RawReviews;
pub use registry::StatRegistry;
pub use sentiment_over_time::SentimentOverTime;

use crate::error::StatError;
use crate::models::{DateWindow, ReviewRecord, Sentiment, StatValues};

/// Number of keywords returned per polarity unless configured otherwise.
pub const DEFAULT_TOP_KEYWORDS: usize = 4;

/// Read-only context of one query.
///
/// Each calculator sees only the parts it declares through
/// [`Calculator::uses_window`] and [`Calculator::uses_ignore_list`].
#[derive(Debug, Clone, PartialEq)]
pub struct StatContext {
    /// Query window, both ends inclusive.
    pub window: Option<DateWindow>,
    /// Substrings excluded from keyword counting.
    pub ignore_list: Vec<String>,
}

impl StatContext {
    pub fn new(window: DateWindow, ignore_list: Vec<String>) -> Self {
        Self {
            window: Some(window),
            ignore_list,
        }
    }

    /// The part of this context `calculator` reads.
    pub fn scoped_to(&self, calculator: &dyn Calculator) -> StatContext {
        StatContext {
            window: self.window.filter(|_| calculator.uses_window()),
            ignore_list: if calculator.uses_ignore_list() {
                self.ignore_list.clone()
            } else {
                Vec::new()
            },
        }
    }
}

/// A single statistic over a record list.
///
/// Implementations must not mutate shared state; the registry may run
/// several of them at once over the same records.
pub trait Calculator: Send + Sync {
    /// Whether this calculator reads [`StatContext::window`].
    fn uses_window(&self) -> bool {
        false
    }

    /// Whether this calculator reads [`StatContext::ignore_list`].
    ///
    /// The service only fetches the ignore list when a requested calculator
    /// returns `true` here.
    fn uses_ignore_list(&self) -> bool {
        false
    }

    /// Compute the stat values for `records`.
    fn compute(&self, records: &[ReviewRecord], context: &StatContext)
        -> Result<StatValues, StatError>;
}

/// Tunables for the built-in calculators.
#[derive(Debug, Clone, PartialEq)]
pub struct StatOptions {
    /// Keywords returned per polarity group.
    pub top_keywords: usize,
    /// Polarity tracked by `sentimentOverTime`.
    pub trend_polarity: Sentiment,
}

impl Default for StatOptions {
    fn default() -> Self {
        Self {
            top_keywords: DEFAULT_TOP_KEYWORDS,
            trend_polarity: Sentiment::Negative,
        }
    }
}

/// `part / whole * 100`, or `0` when `whole` is zero.
pub(crate) fn percentage(part: usize, whole: usize) -> f64 {
    if whole == 0 {
        0.0
    } else {
        part as f64 / whole as f64 * 100.0
    }
}
