//! Stats query processing.
//!
//! Fetches the records for a [`StatsRequest`], resolves the context the
//! requested calculators need and runs them through the registry.

use crate::models::{StatsRequest, StatsResponse};
use crate::stats::{StatContext, StatRegistry};
use crate::store::{staged_name, ParameterStore, ReviewSource};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Message returned when the review source fails.
pub const REVIEW_STORE_ERROR: &str = "Error retrieving reviews from the review store";

/// Runtime options of [`StatsService`].
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOptions {
    /// Deployment stage appended to parameter names.
    pub stage: String,
    /// Unstaged name of the keyword ignore list.
    pub ignore_list_key: String,
    /// Upper bound on the ignore-list lookup.
    pub lookup_timeout: Duration,
    /// Run calculators on the blocking pool instead of in sequence.
    pub parallel: bool,
}

impl Default for ServiceOptions {
    fn default() -> Self {
        Self {
            stage: "dev".to_string(),
            ignore_list_key: "ignoreList".to_string(),
            lookup_timeout: Duration::from_millis(2000),
            parallel: false,
        }
    }
}

/// Answers stats queries against a review source.
pub struct StatsService {
    reviews: Arc<dyn ReviewSource>,
    parameters: Arc<dyn ParameterStore>,
    registry: StatRegistry,
    options: ServiceOptions,
}

impl StatsService {
    pub fn new(
        reviews: Arc<dyn ReviewSource>,
        parameters: Arc<dyn ParameterStore>,
        registry: StatRegistry,
        options: ServiceOptions,
    ) -> Self {
        Self {
            reviews,
            parameters,
            registry,
            options,
        }
    }

    /// Process one query.
    ///
    /// A review-source failure fails the whole query. Everything else
    /// (unknown stats, a failing calculator, an unavailable ignore list) is
    /// absorbed and logged.
    pub async fn process(&self, request: &StatsRequest) -> StatsResponse {
        let window = request.window();
        info!(
            "Stats query for {} version {} from {} to {} ({} stat(s))",
            request.app_id_store,
            request.version,
            window.start,
            window.end,
            request.stats.len()
        );

        let records = match self
            .reviews
            .query(&request.app_id_store, &request.version, &window)
            .await
        {
            Ok(records) => records,
            Err(e) => {
                error!("Review query failed for {}: {}", request.app_id_store, e);
                return StatsResponse::error(REVIEW_STORE_ERROR);
            }
        };
        debug!("Review source returned {} record(s)", records.len());

        let ignore_list = if self.registry.needs_ignore_list(&request.stats) {
            self.ignore_list().await
        } else {
            Vec::new()
        };
        let context = StatContext::new(window, ignore_list);

        let stats = if self.options.parallel {
            self.registry
                .run_parallel(Arc::new(records), &request.stats, &context)
                .await
        } else {
            self.registry.run(&records, &request.stats, &context)
        };

        let failed = stats.iter().filter(|stat| stat.values.is_error()).count();
        if failed > 0 {
            warn!("{} of {} stat(s) failed for {}", failed, stats.len(), request.app_id_store);
        }

        StatsResponse::Success {
            app_id_store: request.app_id_store.clone(),
            version: request.version.clone(),
            stats,
        }
    }

    /// The staged ignore list, or an empty list when it cannot be read in time.
    pub async fn ignore_list(&self) -> Vec<String> {
        let name = staged_name(&self.options.ignore_list_key, &self.options.stage);

        match tokio::time::timeout(self.options.lookup_timeout, self.parameters.get_list(&name)).await
        {
            Ok(Ok(list)) => {
                debug!("Ignore list {} has {} entr(ies)", name, list.len());
                list
            }
            Ok(Err(e)) => {
                warn!("Could not read ignore list {}, not filtering: {}", name, e);
                Vec::new()
            }
            Err(_) => {
                warn!(
                    "Ignore list lookup for {} timed out after {:?}, not filtering",
                    name, self.options.lookup_timeout
                );
                Vec::new()
            }
        }
    }
}
