//! App catalog: which tracked apps have reviews, over which dates and versions.

use crate::models::{Reply, ReviewRecord};
use crate::settings::{App, APP_LIST_KEY};
use crate::store::{staged_name, ParameterStore, ReviewSource};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use tracing::{debug, warn};

/// What a dashboard needs to build a query form for one app.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppInfo {
    pub name: String,
    #[serde(serialize_with = "serialize_date")]
    pub min_date: NaiveDate,
    #[serde(serialize_with = "serialize_date")]
    pub max_date: NaiveDate,
    pub versions: Vec<String>,
}

fn serialize_date<S>(date: &NaiveDate, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    serializer.serialize_str(&date.format("%Y-%m-%d").to_string())
}

/// Catalog keyed by `appIdStore`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AppsPayload {
    pub apps: BTreeMap<String, AppInfo>,
}

/// Summarize one app's reviews. `None` when there are none.
pub fn summarize(app: &App, records: &[ReviewRecord]) -> Option<AppInfo> {
    let min_date = records.iter().map(|r| r.date).min()?;
    let max_date = records.iter().map(|r| r.date).max()?;
    let versions: BTreeSet<&str> = records.iter().map(|r| r.version.as_str()).collect();

    Some(AppInfo {
        name: app.to_string(),
        min_date,
        max_date,
        versions: versions.into_iter().map(String::from).collect(),
    })
}

/// Builds the app catalog from the app list and the review source.
pub struct AppCatalog {
    reviews: Arc<dyn ReviewSource>,
    parameters: Arc<dyn ParameterStore>,
    stage: String,
}

impl AppCatalog {
    pub fn new(
        reviews: Arc<dyn ReviewSource>,
        parameters: Arc<dyn ParameterStore>,
        stage: impl Into<String>,
    ) -> Self {
        Self {
            reviews,
            parameters,
            stage: stage.into(),
        }
    }

    pub async fn list(&self) -> Reply<AppsPayload> {
        let name = staged_name(APP_LIST_KEY, &self.stage);

        let raw = match self.parameters.get(&name).await {
            Ok(Some(raw)) => raw,
            Ok(None) => return Reply::error("Unable to get app list from the parameter store."),
            Err(e) => {
                warn!("Could not read {}: {}", name, e);
                return Reply::error("Unable to get app list from the parameter store.");
            }
        };

        let app_list: Vec<App> = match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                warn!("App list {} is not valid JSON: {}", name, e);
                return Reply::error("Unable to parse app list from JSON.");
            }
        };

        let mut apps = BTreeMap::new();
        for app in &app_list {
            let app_id_store = app.app_id_store();

            let records = match self.reviews.query_app(&app_id_store).await {
                Ok(records) => records,
                Err(e) => {
                    warn!("Could not read reviews of {}, skipping: {}", app_id_store, e);
                    continue;
                }
            };

            match summarize(app, &records) {
                Some(info) => {
                    apps.insert(app_id_store, info);
                }
                None => debug!("No reviews yet for {}", app_id_store),
            }
        }

        Reply::Success(AppsPayload { apps })
    }
}
