//! Operator settings kept in the parameter store.
//!
//! Covers the keyword ignore list, the list of tracked apps and free-form
//! named settings. All names are staged (`appList` -> `appList-dev`) before
//! they reach the store.

use crate::models::Reply;
use crate::store::{staged_name, ParameterStore};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{info, warn};

/// Unstaged parameter name of the app list.
pub const APP_LIST_KEY: &str = "appList";

/// Stores an app can be tracked in.
pub const VALID_STORES: [&str; 2] = ["App Store", "Google Play"];

/// A tracked app.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct App {
    pub name: String,
    pub store: String,
    pub app_id: String,
}

impl App {
    pub fn new(name: impl Into<String>, store: impl Into<String>, app_id: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            store: store.into(),
            app_id: app_id.into(),
        }
    }

    /// Key under which the app's reviews are stored.
    pub fn app_id_store(&self) -> String {
        format!("{}*{}", self.app_id, self.store)
    }

    /// Reject unknown stores and app ids outside `[0-9A-Za-z._]+`.
    pub fn check_validity(&self) -> Result<(), String> {
        if !VALID_STORES.contains(&self.store.as_str()) {
            return Err(format!("Invalid store {}.", self.store));
        }

        let valid_id = !self.app_id.is_empty()
            && self
                .app_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.' || c == '_');
        if !valid_id {
            return Err(format!("Invalid appId {}.", self.app_id));
        }

        Ok(())
    }

    fn same_app(&self, other: &App) -> bool {
        self.app_id == other.app_id && self.store == other.store
    }
}

impl fmt::Display for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.store)
    }
}

/// A named setting value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Setting {
    pub name: String,
    pub value: String,
}

impl Setting {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IgnoreListPayload {
    pub ignore_list: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppListPayload {
    pub app_list: Vec<App>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SettingsPayload {
    pub settings: Vec<Setting>,
}

/// Reads and updates operator settings.
pub struct SettingsService {
    parameters: Arc<dyn ParameterStore>,
    stage: String,
    ignore_list_key: String,
}

impl SettingsService {
    pub fn new(
        parameters: Arc<dyn ParameterStore>,
        stage: impl Into<String>,
        ignore_list_key: impl Into<String>,
    ) -> Self {
        Self {
            parameters,
            stage: stage.into(),
            ignore_list_key: ignore_list_key.into(),
        }
    }

    fn staged(&self, name: &str) -> String {
        staged_name(name, &self.stage)
    }

    async fn load_list<T: DeserializeOwned>(&self, name: &str) -> Result<Vec<T>, String> {
        let raw = match self.parameters.get(name).await {
            Ok(raw) => raw,
            Err(e) => {
                warn!("Could not read {}: {}", name, e);
                return Err(format!("Could not retrieve {} from the parameter store.", name));
            }
        };

        match raw {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str(&raw).map_err(|e| {
                warn!("Parameter {} is not a valid list: {}", name, e);
                "Unable to parse list from JSON.".to_string()
            }),
        }
    }

    async fn write_list<T: Serialize>(&self, name: &str, list: &[T]) -> Result<(), String> {
        let json = serde_json::to_string(list)
            .map_err(|_| "Unable to serialize updated list to JSON.".to_string())?;

        self.parameters.put(name, &json).await.map_err(|e| {
            warn!("Could not write {}: {}", name, e);
            format!("Could not write {} to the parameter store.", name)
        })
    }

    // Ignore list

    pub async fn get_ignore_list(&self) -> Reply<IgnoreListPayload> {
        let name = self.staged(&self.ignore_list_key);
        match self.load_list::<String>(&name).await {
            Ok(ignore_list) => Reply::Success(IgnoreListPayload { ignore_list }),
            Err(message) => Reply::error(message),
        }
    }

    pub async fn add_ignored_keyword(&self, keyword: &str) -> Reply<IgnoreListPayload> {
        let name = self.staged(&self.ignore_list_key);
        let mut list: Vec<String> = match self.load_list(&name).await {
            Ok(list) => list,
            Err(message) => return Reply::error(message),
        };

        if list.iter().any(|existing| existing == keyword) {
            return Reply::error(format!("Keyword {} already exists in the list.", keyword));
        }
        list.push(keyword.to_string());

        if let Err(message) = self.write_list(&name, &list).await {
            return Reply::error(message);
        }
        info!("Added {} to {}", keyword, name);
        Reply::Success(IgnoreListPayload { ignore_list: list })
    }

    pub async fn delete_ignored_keyword(&self, keyword: &str) -> Reply<IgnoreListPayload> {
        let name = self.staged(&self.ignore_list_key);
        let list: Vec<String> = match self.load_list(&name).await {
            Ok(list) => list,
            Err(message) => return Reply::error(message),
        };

        if !list.iter().any(|existing| existing == keyword) {
            return Reply::error(format!("No keyword {} present in list.", keyword));
        }
        let list: Vec<String> = list.into_iter().filter(|k| k != keyword).collect();

        if let Err(message) = self.write_list(&name, &list).await {
            return Reply::error(message);
        }
        info!("Removed {} from {}", keyword, name);
        Reply::Success(IgnoreListPayload { ignore_list: list })
    }

    // App list

    pub async fn get_app_list(&self) -> Reply<AppListPayload> {
        match self.load_list::<App>(&self.staged(APP_LIST_KEY)).await {
            Ok(app_list) => Reply::Success(AppListPayload { app_list }),
            Err(message) => Reply::error(message),
        }
    }

    pub async fn add_app(&self, app: &App) -> Reply<AppListPayload> {
        if let Err(message) = app.check_validity() {
            return Reply::error(message);
        }

        let name = self.staged(APP_LIST_KEY);
        let mut app_list: Vec<App> = match self.load_list(&name).await {
            Ok(list) => list,
            Err(message) => return Reply::error(message),
        };

        if app_list.iter().any(|existing| existing.same_app(app)) {
            return Reply::error(format!(
                "App with id {} already exists in the list.",
                app.app_id
            ));
        }
        app_list.push(app.clone());

        if let Err(message) = self.write_list(&name, &app_list).await {
            return Reply::error(message);
        }
        info!("Added app {}", app);
        Reply::Success(AppListPayload { app_list })
    }

    pub async fn delete_app(&self, app: &App) -> Reply<AppListPayload> {
        if let Err(message) = app.check_validity() {
            return Reply::error(message);
        }

        let name = self.staged(APP_LIST_KEY);
        let app_list: Vec<App> = match self.load_list(&name).await {
            Ok(list) => list,
            Err(message) => return Reply::error(message),
        };

        if !app_list.iter().any(|existing| existing.same_app(app)) {
            return Reply::error(format!("No app with id {} present in list.", app.app_id));
        }
        let app_list: Vec<App> = app_list
            .into_iter()
            .filter(|existing| !existing.same_app(app))
            .collect();

        if let Err(message) = self.write_list(&name, &app_list).await {
            return Reply::error(message);
        }
        info!("Removed app {}", app);
        Reply::Success(AppListPayload { app_list })
    }

    // Named settings

    /// Every requested setting, or an error naming the first one missing.
    pub async fn get_settings(&self, names: &[String]) -> Reply<SettingsPayload> {
        let mut settings = Vec::with_capacity(names.len());

        for name in names {
            match self.parameters.get(&self.staged(name)).await {
                Ok(Some(value)) => settings.push(Setting::new(name.clone(), value)),
                Ok(None) => {
                    return Reply::error(format!(
                        "Could not retrieve {} from the parameter store.",
                        name
                    ))
                }
                Err(e) => {
                    warn!("Could not read setting {}: {}", name, e);
                    return Reply::error(format!(
                        "Could not retrieve {} from the parameter store.",
                        name
                    ));
                }
            }
        }

        Reply::Success(SettingsPayload { settings })
    }

    /// Persist each setting in order, stopping at the first failure.
    pub async fn set_settings(&self, settings: &[Setting]) -> Reply<SettingsPayload> {
        for setting in settings {
            let name = self.staged(&setting.name);
            if let Err(e) = self.parameters.put(&name, &setting.value).await {
                warn!("Could not write setting {}: {}", name, e);
                return Reply::error(format!(
                    "Could not write {} to the parameter store.",
                    setting.name
                ));
            }
            info!("Set {} = {}", name, setting.value);
        }

        Reply::Success(SettingsPayload {
            settings: settings.to_vec(),
        })
    }
}
