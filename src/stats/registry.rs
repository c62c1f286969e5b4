//! Stat registry and dispatcher.
//!
//! Maps stat names to calculators and runs the requested ones. Unknown names
//! are skipped with a warning. A calculator that fails or panics produces an
//! error entry under its own name; every other stat is still returned.
//! Output order always equals request order.

use super::{
    Calculator, NumReviews, OverallSentiment, RawReviews, SentimentOverTime, StatContext,
    StatOptions, TopKeywords,
};
use crate::error::StatError;
use crate::models::{ComputedStat, RequestedStat, ReviewRecord, StatValues};
use futures::future::join_all;
use std::any::Any;
use std::collections::HashMap;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, warn};

pub const RAW_REVIEWS: &str = "rawReviews";
pub const NUM_REVIEWS: &str = "numReviews";
pub const OVERALL_SENTIMENT: &str = "overallSentiment";
pub const SENTIMENT_OVER_TIME: &str = "sentimentOverTime";
pub const KEYWORDS: &str = "keywords";

/// Name-keyed set of calculators.
#[derive(Clone, Default)]
pub struct StatRegistry {
    calculators: HashMap<String, Arc<dyn Calculator>>,
}

impl std::fmt::Debug for StatRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatRegistry")
            .field("names", &self.names())
            .finish()
    }
}

impl StatRegistry {
    /// An empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry with the five built-in calculators.
    pub fn with_defaults(options: &StatOptions) -> Self {
        let mut registry = Self::new();
        registry.register(RAW_REVIEWS, RawReviews);
        registry.register(NUM_REVIEWS, NumReviews);
        registry.register(OVERALL_SENTIMENT, OverallSentiment);
        registry.register(
            SENTIMENT_OVER_TIME,
            SentimentOverTime::new(options.trend_polarity),
        );
        registry.register(KEYWORDS, TopKeywords::new(options.top_keywords));
        registry
    }

    /// Register (or replace) the calculator for `name`.
    pub fn register<C>(&mut self, name: impl Into<String>, calculator: C)
    where
        C: Calculator + 'static,
    {
        self.calculators.insert(name.into(), Arc::new(calculator));
    }

    pub fn get(&self, name: &str) -> Option<&Arc<dyn Calculator>> {
        self.calculators.get(name)
    }

    /// Registered names, sorted.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.calculators.keys().cloned().collect();
        names.sort();
        names
    }

    /// Whether any requested, registered calculator reads the ignore list.
    pub fn needs_ignore_list(&self, requested: &[RequestedStat]) -> bool {
        requested
            .iter()
            .filter_map(|stat| self.get(&stat.name))
            .any(|calculator| calculator.uses_ignore_list())
    }

    /// Calculators for `requested`, in order, skipping unknown names.
    fn resolve(&self, requested: &[RequestedStat]) -> Vec<(String, Arc<dyn Calculator>)> {
        requested
            .iter()
            .filter_map(|stat| match self.get(&stat.name) {
                Some(calculator) => Some((stat.name.clone(), Arc::clone(calculator))),
                None => {
                    warn!("No calculator registered for stat {}, skipping", stat.name);
                    None
                }
            })
            .collect()
    }

    /// Run the requested stats one after another on the calling thread.
    pub fn run(
        &self,
        records: &[ReviewRecord],
        requested: &[RequestedStat],
        context: &StatContext,
    ) -> Vec<ComputedStat> {
        self.resolve(requested)
            .into_iter()
            .map(|(name, calculator)| {
                debug!("Computing {} over {} review(s)", name, records.len());
                let context = context.scoped_to(calculator.as_ref());
                let outcome = catch_unwind(AssertUnwindSafe(|| calculator.compute(records, &context)))
                    .unwrap_or_else(|panic| Err(StatError::Panicked(panic_message(panic.as_ref()))));
                finish(name, outcome)
            })
            .collect()
    }

    /// Run the requested stats concurrently on the blocking pool.
    ///
    /// Results are collected back in request order.
    pub async fn run_parallel(
        &self,
        records: Arc<Vec<ReviewRecord>>,
        requested: &[RequestedStat],
        context: &StatContext,
    ) -> Vec<ComputedStat> {
        let tasks = self.resolve(requested).into_iter().map(|(name, calculator)| {
            let records = Arc::clone(&records);
            let context = context.scoped_to(calculator.as_ref());
            async move {
                debug!("Spawning {} over {} review(s)", name, records.len());
                let handle =
                    tokio::task::spawn_blocking(move || calculator.compute(&records, &context));
                let outcome = match handle.await {
                    Ok(outcome) => outcome,
                    Err(join_error) if join_error.is_panic() => Err(StatError::Panicked(
                        panic_message(join_error.into_panic().as_ref()),
                    )),
                    Err(join_error) => Err(StatError::Panicked(join_error.to_string())),
                };
                finish(name, outcome)
            }
        });

        join_all(tasks).await
    }
}

fn finish(name: String, outcome: Result<StatValues, StatError>) -> ComputedStat {
    match outcome {
        Ok(values) => ComputedStat::new(name, values),
        Err(e) => {
            warn!("Stat {} failed: {}", name, e);
            ComputedStat::new(
                name,
                StatValues::Error {
                    error: e.to_string(),
                },
            )
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DateWindow, Sentiment};
    use crate::stats::test_support::{date, review};
    use proptest::prelude::*;

    struct Exploding;

    impl Calculator for Exploding {
        fn compute(&self, _: &[ReviewRecord], _: &StatContext) -> Result<StatValues, StatError> {
            panic!("exploded");
        }
    }

    fn records() -> Vec<ReviewRecord> {
        vec![
            review("abcdef", date(2018, 5, 21), Some(Sentiment::Positive)),
            review("123456", date(2018, 5, 24), Some(Sentiment::Negative)),
        ]
    }

    fn context() -> StatContext {
        StatContext::new(DateWindow::new(date(2018, 5, 21), date(2018, 5, 24)), vec![])
    }

    fn requested(names: &[&str]) -> Vec<RequestedStat> {
        names.iter().map(|n| RequestedStat::named(*n)).collect()
    }

    fn names_of(stats: &[ComputedStat]) -> Vec<&str> {
        stats.iter().map(|s| s.name.as_str()).collect()
    }

    #[test]
    fn test_defaults_are_registered() {
        let registry = StatRegistry::with_defaults(&StatOptions::default());
        assert_eq!(
            registry.names(),
            vec![KEYWORDS, NUM_REVIEWS, OVERALL_SENTIMENT, RAW_REVIEWS, SENTIMENT_OVER_TIME]
        );
    }

    #[test]
    fn test_run_in_request_order_skipping_unknown() {
        let registry = StatRegistry::with_defaults(&StatOptions::default());
        let stats = registry.run(
            &records(),
            &requested(&["overallSentiment", "bogus", "rawReviews", "numReviews"]),
            &context(),
        );

        assert_eq!(names_of(&stats), vec!["overallSentiment", "rawReviews", "numReviews"]);
        assert_eq!(stats[2].values, StatValues::Count { total: 2 });
        match &stats[0].values {
            StatValues::Distribution(shares) => {
                assert_eq!(shares.positive, 50.0);
                assert_eq!(shares.negative, 50.0);
                assert_eq!(shares.neutral, 0.0);
                assert_eq!(shares.mixed, 0.0);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[test]
    fn test_failing_stat_is_isolated() {
        let mut registry = StatRegistry::with_defaults(&StatOptions::default());
        registry.register("exploding", Exploding);

        let inverted = StatContext::new(DateWindow::new(date(2018, 5, 24), date(2018, 5, 21)), vec![]);
        let stats = registry.run(
            &records(),
            &requested(&["numReviews", "exploding", "sentimentOverTime", "numReviews"]),
            &inverted,
        );

        assert_eq!(
            names_of(&stats),
            vec!["numReviews", "exploding", "sentimentOverTime", "numReviews"]
        );
        assert_eq!(
            stats[1].values,
            StatValues::Error {
                error: "calculator panicked: exploded".to_string()
            }
        );
        assert!(stats[2].values.is_error());
        assert_eq!(stats[3].values, StatValues::Count { total: 2 });
    }

    #[test]
    fn test_needs_ignore_list() {
        let registry = StatRegistry::with_defaults(&StatOptions::default());
        assert!(registry.needs_ignore_list(&requested(&["numReviews", "keywords"])));
        assert!(!registry.needs_ignore_list(&requested(&["numReviews", "sentimentOverTime"])));
        assert!(!registry.needs_ignore_list(&requested(&["unknown"])));
    }

    #[test]
    fn test_configured_trend_polarity() {
        let options = StatOptions {
            trend_polarity: Sentiment::Positive,
            ..StatOptions::default()
        };
        let registry = StatRegistry::with_defaults(&options);
        let stats = registry.run(&records(), &requested(&["sentimentOverTime"]), &context());

        match &stats[0].values {
            StatValues::Trend(series) => {
                assert_eq!(series.data, vec![Some(100.0), None, None, Some(0.0)]);
            }
            other => panic!("unexpected shape: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_parallel_matches_sequential() {
        let mut registry = StatRegistry::with_defaults(&StatOptions::default());
        registry.register("exploding", Exploding);
        let wanted = requested(&[
            "keywords",
            "exploding",
            "sentimentOverTime",
            "missing",
            "rawReviews",
            "overallSentiment",
            "numReviews",
        ]);

        let sequential = registry.run(&records(), &wanted, &context());
        let parallel = registry
            .run_parallel(Arc::new(records()), &wanted, &context())
            .await;

        assert_eq!(sequential, parallel);
        assert_eq!(parallel.len(), 6);
    }

    /// Reports what it was handed: one per ignore entry, ten for a window.
    struct ContextEcho {
        window: bool,
        ignore_list: bool,
    }

    impl Calculator for ContextEcho {
        fn uses_window(&self) -> bool {
            self.window
        }

        fn uses_ignore_list(&self) -> bool {
            self.ignore_list
        }

        fn compute(
            &self,
            _: &[ReviewRecord],
            context: &StatContext,
        ) -> Result<StatValues, StatError> {
            let total = context.ignore_list.len() + if context.window.is_some() { 10 } else { 0 };
            Ok(StatValues::Count { total })
        }
    }

    #[tokio::test]
    async fn test_calculators_see_only_declared_context() {
        let mut registry = StatRegistry::new();
        registry.register("nothing", ContextEcho { window: false, ignore_list: false });
        registry.register("window", ContextEcho { window: true, ignore_list: false });
        registry.register("both", ContextEcho { window: true, ignore_list: true });

        let context = StatContext::new(
            DateWindow::new(date(2018, 5, 21), date(2018, 5, 24)),
            vec!["app".to_string(), "the".to_string()],
        );
        let wanted = requested(&["nothing", "window", "both"]);

        let totals = |stats: Vec<ComputedStat>| -> Vec<StatValues> {
            stats.into_iter().map(|s| s.values).collect()
        };
        let expected = vec![
            StatValues::Count { total: 0 },
            StatValues::Count { total: 10 },
            StatValues::Count { total: 12 },
        ];

        assert_eq!(totals(registry.run(&records(), &wanted, &context)), expected);
        assert_eq!(
            totals(registry.run_parallel(Arc::new(records()), &wanted, &context).await),
            expected
        );
    }

    #[test]
    fn test_trend_without_window_is_a_stat_error() {
        let context = StatContext {
            window: None,
            ignore_list: vec![],
        };
        let result = SentimentOverTime::default().compute(&records(), &context);
        assert_eq!(result, Err(StatError::MissingWindow));
    }

    proptest! {
        #[test]
        fn output_order_follows_request_order(
            picks in prop::collection::vec(
                prop::sample::select(vec![
                    "rawReviews", "numReviews", "overallSentiment",
                    "sentimentOverTime", "keywords", "nope", "other",
                ]),
                0..16,
            )
        ) {
            let registry = StatRegistry::with_defaults(&StatOptions::default());
            let stats = registry.run(&records(), &requested(&picks), &context());

            let expected: Vec<&str> = picks
                .iter()
                .copied()
                .filter(|name| registry.get(name).is_some())
                .collect();
            prop_assert_eq!(names_of(&stats), expected);
        }
    }
}
