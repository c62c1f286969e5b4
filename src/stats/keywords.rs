//! Top keywords per polarity.
//!
//! Keywords of positive and negative reviews are lower-cased, filtered
//! against the ignore list (substring match) and counted. The most frequent
//! ones are reported with their occurrence count as a percentage of the
//! group's review count.
//!
//! Ranking is by descending count. Keywords with equal counts keep the order
//! in which they were first seen in the input.

use super::{percentage, Calculator, StatContext, DEFAULT_TOP_KEYWORDS};
use crate::error::StatError;
use crate::models::{KeywordGroups, KeywordScore, ReviewRecord, Sentiment, StatValues};
use std::collections::HashMap;

/// Keyword ranking for positive and negative reviews.
#[derive(Debug, Clone, Copy)]
pub struct TopKeywords {
    top_n: usize,
}

impl TopKeywords {
    pub fn new(top_n: usize) -> Self {
        Self { top_n }
    }
}

impl Default for TopKeywords {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_KEYWORDS)
    }
}

/// Lower-cased, non-blank ignore-list entries.
pub fn normalize_ignore_list(entries: &[String]) -> Vec<String> {
    entries
        .iter()
        .map(|entry| entry.trim().to_lowercase())
        .filter(|entry| !entry.is_empty())
        .collect()
}

/// Whether a lower-cased keyword contains any normalized ignore entry.
pub fn is_ignored(keyword: &str, ignore: &[String]) -> bool {
    ignore.iter().any(|entry| keyword.contains(entry.as_str()))
}

/// Occurrence counts in first-seen order.
fn count_keywords<I>(keywords: I) -> Vec<(String, usize)>
where
    I: IntoIterator<Item = String>,
{
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut counts: Vec<(String, usize)> = Vec::new();

    for keyword in keywords {
        match index.get(&keyword) {
            Some(&slot) => counts[slot].1 += 1,
            None => {
                index.insert(keyword.clone(), counts.len());
                counts.push((keyword, 1));
            }
        }
    }

    counts
}

/// Rank the keywords of one polarity group.
pub fn rank_keywords(
    records: &[ReviewRecord],
    polarity: Sentiment,
    ignore: &[String],
    top_n: usize,
) -> Vec<KeywordScore> {
    let group: Vec<&ReviewRecord> = records
        .iter()
        .filter(|record| record.sentiment == Some(polarity))
        .collect();

    let mut counts = count_keywords(
        group
            .iter()
            .flat_map(|record| record.keywords.iter())
            .map(|keyword| keyword.to_lowercase())
            .filter(|keyword| !is_ignored(keyword, ignore)),
    );

    // Stable sort keeps first-seen order among equal counts.
    counts.sort_by(|a, b| b.1.cmp(&a.1));
    counts.truncate(top_n);

    counts
        .into_iter()
        .map(|(keyword, count)| KeywordScore {
            keyword,
            percentage: percentage(count, group.len()),
        })
        .collect()
}

impl Calculator for TopKeywords {
    fn uses_ignore_list(&self) -> bool {
        true
    }

    fn compute(
        &self,
        records: &[ReviewRecord],
        context: &StatContext,
    ) -> Result<StatValues, StatError> {
        let ignore = normalize_ignore_list(&context.ignore_list);

        Ok(StatValues::Keywords(KeywordGroups {
            positive: rank_keywords(records, Sentiment::Positive, &ignore, self.top_n),
            negative: rank_keywords(records, Sentiment::Negative, &ignore, self.top_n),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::DateWindow;
    use crate::stats::test_support::{date, review};
    use proptest::prelude::*;

    fn keyword_review(hash: &str, sentiment: Sentiment, keywords: &[&str]) -> ReviewRecord {
        review(hash, date(2001, 5, 21), Some(sentiment)).with_keywords(keywords.iter().copied())
    }

    fn context(ignore: &[&str]) -> StatContext {
        let day = date(2001, 5, 21);
        StatContext::new(
            DateWindow::new(day, day),
            ignore.iter().map(|s| s.to_string()).collect(),
        )
    }

    fn groups(values: StatValues) -> KeywordGroups {
        match values {
            StatValues::Keywords(groups) => groups,
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    fn score(keyword: &str, percentage: f64) -> KeywordScore {
        KeywordScore {
            keyword: keyword.to_string(),
            percentage,
        }
    }

    #[test]
    fn test_keywords_by_polarity() {
        let records = vec![
            keyword_review("abcdef", Sentiment::Positive, &["present always", "present sometimes"]),
            keyword_review("a1b2c3", Sentiment::Negative, &["present always", "present sometimes"]),
            keyword_review("123456", Sentiment::Negative, &["present always"]),
            keyword_review("123457", Sentiment::Negative, &["present always"]),
            keyword_review("alsdkj", Sentiment::Mixed, &["won't include mixed"]),
            keyword_review("34895f", Sentiment::Positive, &["present always"]),
            keyword_review("asldf4", Sentiment::Neutral, &["won't include neutral"]),
        ];

        let result = groups(TopKeywords::default().compute(&records, &context(&[])).unwrap());

        assert_eq!(
            result.positive,
            vec![score("present always", 100.0), score("present sometimes", 50.0)]
        );
        assert_eq!(
            result.negative,
            vec![
                score("present always", 100.0),
                score("present sometimes", 1.0 / 3.0 * 100.0)
            ]
        );
    }

    #[test]
    fn test_keywords_are_lower_cased_before_counting() {
        let records = vec![
            keyword_review("a", Sentiment::Positive, &["Battery"]),
            keyword_review("b", Sentiment::Positive, &["BATTERY"]),
        ];

        let result = groups(TopKeywords::default().compute(&records, &context(&[])).unwrap());
        assert_eq!(result.positive, vec![score("battery", 100.0)]);
    }

    #[test]
    fn test_ignore_list_is_case_insensitive_substring() {
        let records = vec![
            keyword_review("a", Sentiment::Negative, &["App crashes", "login", "the app"]),
            keyword_review("b", Sentiment::Negative, &["Login screen"]),
        ];

        let result = groups(
            TopKeywords::default()
                .compute(&records, &context(&["APP", "  "]))
                .unwrap(),
        );
        assert_eq!(
            result.negative,
            vec![score("login", 50.0), score("login screen", 50.0)]
        );
    }

    #[test]
    fn test_top_n_with_first_seen_tie_break() {
        let records = vec![
            keyword_review("a", Sentiment::Positive, &["e", "d", "c", "b", "a"]),
            keyword_review("b", Sentiment::Positive, &["a"]),
        ];

        let result = groups(TopKeywords::default().compute(&records, &context(&[])).unwrap());
        let names: Vec<_> = result.positive.iter().map(|k| k.keyword.as_str()).collect();
        assert_eq!(names, vec!["a", "e", "d", "c"]);
    }

    #[test]
    fn test_custom_top_n() {
        let records = vec![keyword_review("a", Sentiment::Positive, &["x", "y", "z"])];
        let result = groups(TopKeywords::new(2).compute(&records, &context(&[])).unwrap());
        assert_eq!(result.positive.len(), 2);
        assert!(result.negative.is_empty());
    }

    #[test]
    fn test_no_keywords_yields_empty_groups() {
        let records = vec![keyword_review("a", Sentiment::Positive, &[])];
        let result = groups(TopKeywords::default().compute(&records, &context(&[])).unwrap());
        assert_eq!(result, KeywordGroups::default());
    }

    fn keyword_strategy() -> impl Strategy<Value = String> {
        prop::sample::select(vec!["speed", "crash", "Login", "price", "ads", "dark mode", "sync"])
            .prop_map(String::from)
    }

    proptest! {
        #[test]
        fn never_more_than_top_n(
            lists in prop::collection::vec(prop::collection::vec(keyword_strategy(), 0..8), 0..20),
            positive in prop::collection::vec(any::<bool>(), 20)
        ) {
            let records: Vec<_> = lists
                .iter()
                .enumerate()
                .map(|(i, kws)| {
                    let sentiment = if positive[i] { Sentiment::Positive } else { Sentiment::Negative };
                    review(&i.to_string(), date(2020, 1, 1), Some(sentiment)).with_keywords(kws.clone())
                })
                .collect();

            let result = groups(TopKeywords::default().compute(&records, &context(&[])).unwrap());
            prop_assert!(result.positive.len() <= DEFAULT_TOP_KEYWORDS);
            prop_assert!(result.negative.len() <= DEFAULT_TOP_KEYWORDS);
        }

        #[test]
        fn ignore_filter_is_idempotent(
            lists in prop::collection::vec(prop::collection::vec(keyword_strategy(), 0..8), 1..20),
            ignore in prop::collection::vec(prop::sample::select(vec!["a", "IN", "sync", "zz"]), 0..3)
        ) {
            let records: Vec<_> = lists
                .iter()
                .enumerate()
                .map(|(i, kws)| review(&i.to_string(), date(2020, 1, 1), Some(Sentiment::Positive)).with_keywords(kws.clone()))
                .collect();
            let ignore: Vec<String> = ignore.into_iter().map(String::from).collect();
            let normalized = normalize_ignore_list(&ignore);

            let once = rank_keywords(&records, Sentiment::Positive, &normalized, usize::MAX);

            let filtered: Vec<_> = records
                .iter()
                .map(|r| {
                    let kept: Vec<String> = r
                        .keywords
                        .iter()
                        .filter(|k| !is_ignored(&k.to_lowercase(), &normalized))
                        .cloned()
                        .collect();
                    r.clone().with_keywords(kept)
                })
                .collect();
            let twice = rank_keywords(&filtered, Sentiment::Positive, &normalized, usize::MAX);

            prop_assert_eq!(&once, &twice);
            for entry in &once {
                prop_assert!(!is_ignored(&entry.keyword, &normalized));
            }
        }
    }
}
