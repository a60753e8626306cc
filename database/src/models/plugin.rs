use chrono::{DateTime, Utc};
use plugreg_core::validation::{
    ensure_valid, is_plugin_description_valid, is_plugin_engine_valid, is_plugin_name_valid,
    is_plugin_type_valid, is_plugin_version_valid,
};
use plugreg_core::{Error, PluginType, Result, SortSpec};
use serde::{Deserialize, Serialize};
use serde_json::Value as JsonValue;
use sqlx::FromRow;

/// Largest page `list_plugins_for_api` will return
pub const MAX_PAGE_SIZE: i64 = 100;

/// Plugin model
///
/// The `storage` column is never selected here; it is only reachable through
/// the storage queries.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Plugin {
    pub id: i64,
    pub name: String,
    #[sqlx(rename = "type")]
    pub plugin_type: PluginType,
    pub version: String,
    pub enabled: bool,
    pub uninstalled: bool,
    pub peertube_engine: String,
    pub description: Option<String>,
    pub settings: Option<String>, // JSON object
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Plugin {
    /// Parsed settings document, if one was ever written
    pub fn settings_document(&self) -> Option<JsonValue> {
        self.settings
            .as_ref()
            .and_then(|s| serde_json::from_str(s).ok())
    }

    /// Value stored under `key` in the settings document
    pub fn setting(&self, key: &str) -> Option<JsonValue> {
        self.settings_document()
            .and_then(|doc| doc.get(key).cloned())
    }

    /// Active means enabled and still installed
    pub fn is_active(&self) -> bool {
        self.enabled && !self.uninstalled
    }

    /// npm package name this record was installed from
    pub fn npm_name(&self) -> String {
        plugreg_core::build_npm_name(&self.name, self.plugin_type)
    }

    /// Public representation returned to API consumers
    pub fn to_formatted_json(&self) -> FormattedPlugin {
        FormattedPlugin {
            name: self.name.clone(),
            plugin_type: self.plugin_type.as_i32(),
            version: self.version.clone(),
            enabled: self.enabled,
            uninstalled: self.uninstalled,
            peertube_engine: self.peertube_engine.clone(),
            description: self.description.clone(),
            settings: self.settings_document(),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// Plugin as exposed to API consumers (never carries `storage`)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FormattedPlugin {
    pub name: String,
    #[serde(rename = "type")]
    pub plugin_type: i32,
    pub version: String,
    pub enabled: bool,
    pub uninstalled: bool,
    pub peertube_engine: String,
    pub description: Option<String>,
    pub settings: Option<JsonValue>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Input for installing a plugin or theme
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreatePlugin {
    pub name: String,
    pub plugin_type: PluginType,
    pub version: String,
    pub peertube_engine: String,
    pub description: Option<String>,
}

impl CreatePlugin {
    /// Validate every column before it reaches the database
    pub fn validate(&self) -> Result<()> {
        ensure_valid("name", self.name.as_str(), is_plugin_name_valid)?;
        ensure_valid("type", &self.plugin_type.as_i32(), |t: &i32| {
            is_plugin_type_valid(*t)
        })?;
        ensure_valid("version", self.version.as_str(), is_plugin_version_valid)?;
        ensure_valid(
            "peertubeEngine",
            self.peertube_engine.as_str(),
            is_plugin_engine_valid,
        )?;

        if let Some(ref description) = self.description {
            ensure_valid("description", description.as_str(), is_plugin_description_valid)?;
        }

        Ok(())
    }
}

/// Filters, ordering and pagination for `list_plugins_for_api`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PluginListQuery {
    pub start: i64,
    pub count: i64,
    pub sort: SortSpec,
    pub plugin_type: Option<PluginType>,
    /// `None` lists both installed and uninstalled rows
    pub uninstalled: Option<bool>,
}

impl Default for PluginListQuery {
    fn default() -> Self {
        Self {
            start: 0,
            count: 15,
            sort: SortSpec::default(),
            plugin_type: None,
            uninstalled: None,
        }
    }
}

impl PluginListQuery {
    pub fn validate(&self) -> Result<()> {
        if self.start < 0 {
            return Err(Error::invalid("start", "must not be negative"));
        }
        if !(0..=MAX_PAGE_SIZE).contains(&self.count) {
            return Err(Error::invalid(
                "count",
                format!("must be between 0 and {}", MAX_PAGE_SIZE),
            ));
        }
        Ok(())
    }
}
