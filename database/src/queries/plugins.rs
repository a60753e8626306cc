//! Plugin registry queries

use std::collections::HashMap;

use anyhow::Context;
use chrono::Utc;
use plugreg_core::{normalize_plugin_name, type_from_npm_name, Error, PluginType, Result, ResultList};
use serde_json::Value as JsonValue;
use sqlx::{Pool, Sqlite};
use tracing::{debug, info, instrument};

use crate::models::{CreatePlugin, Plugin, PluginListQuery};

/// JSON document columns of the `plugin` table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Document {
    Settings,
    Storage,
}

impl Document {
    fn column(&self) -> &'static str {
        match self {
            Document::Settings => "settings",
            Document::Storage => "storage",
        }
    }

    /// Field name reported when a key is rejected
    fn key_field(&self) -> &'static str {
        match self {
            Document::Settings => "settingName",
            Document::Storage => "storageKey",
        }
    }
}

// ============================================================================
// Lookups
// ============================================================================

/// List plugins and themes that are enabled and not uninstalled
#[instrument(skip(pool))]
pub async fn list_enabled_plugins_and_themes(pool: &Pool<Sqlite>) -> Result<Vec<Plugin>> {
    sqlx::query_as::<_, Plugin>(
        r#"
        SELECT id, name, type, version, enabled, uninstalled, peertube_engine,
               description, settings, created_at, updated_at
        FROM plugin
        WHERE enabled = 1 AND uninstalled = 0
        ORDER BY name
        "#,
    )
    .fetch_all(pool)
    .await
    .context("Failed to list enabled plugins")
    .map_err(|e| Error::DatabaseError(format!("{:#}", e)))
}

/// List every installed plugin, optionally restricted to one kind
#[instrument(skip(pool))]
pub async fn list_installed_plugins(
    pool: &Pool<Sqlite>,
    plugin_type: Option<PluginType>,
) -> Result<Vec<Plugin>> {
    let mut query = String::from(
        r#"
        SELECT id, name, type, version, enabled, uninstalled, peertube_engine,
               description, settings, created_at, updated_at
        FROM plugin
        WHERE uninstalled = 0
        "#,
    );
    if plugin_type.is_some() {
        query.push_str(" AND type = ?");
    }
    query.push_str(" ORDER BY name");

    let mut q = sqlx::query_as::<_, Plugin>(&query);
    if let Some(plugin_type) = plugin_type {
        q = q.bind(plugin_type);
    }

    q.fetch_all(pool)
        .await
        .context("Failed to list installed plugins")
        .map_err(|e| Error::DatabaseError(format!("{:#}", e)))
}

/// Load a plugin by its registry name
#[instrument(skip(pool))]
pub async fn load_plugin(pool: &Pool<Sqlite>, name: &str) -> Result<Option<Plugin>> {
    let plugin = sqlx::query_as::<_, Plugin>(
        r#"
        SELECT id, name, type, version, enabled, uninstalled, peertube_engine,
               description, settings, created_at, updated_at
        FROM plugin
        WHERE name = ?
        "#,
    )
    .bind(name)
    .fetch_optional(pool)
    .await
    .context("Failed to load plugin")
    .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    if plugin.is_none() {
        debug!(name, "Plugin not found");
    }

    Ok(plugin)
}

/// Load a plugin by npm package name (`peertube-plugin-foo`, `peertube-theme-bar`)
#[instrument(skip(pool))]
pub async fn load_plugin_by_npm_name(pool: &Pool<Sqlite>, npm_name: &str) -> Result<Option<Plugin>> {
    let plugin_type = type_from_npm_name(npm_name)?;
    let name = normalize_plugin_name(npm_name);

    Ok(load_plugin(pool, &name)
        .await?
        .filter(|p| p.plugin_type == plugin_type))
}

/// Paginated, filtered and sorted listing with the total number of matches
#[instrument(skip(pool))]
pub async fn list_plugins_for_api(
    pool: &Pool<Sqlite>,
    query: &PluginListQuery,
) -> Result<ResultList<Plugin>> {
    query.validate()?;

    let mut conditions: Vec<&str> = Vec::new();
    if query.plugin_type.is_some() {
        conditions.push("type = ?");
    }
    if query.uninstalled.is_some() {
        conditions.push("uninstalled = ?");
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    let count_sql = format!("SELECT COUNT(*) FROM plugin {}", where_clause);
    let mut count_q = sqlx::query_as::<_, (i64,)>(&count_sql);
    if let Some(plugin_type) = query.plugin_type {
        count_q = count_q.bind(plugin_type);
    }
    if let Some(uninstalled) = query.uninstalled {
        count_q = count_q.bind(uninstalled);
    }

    let (total,) = count_q
        .fetch_one(pool)
        .await
        .context("Failed to count plugins")
        .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    let rows_sql = format!(
        r#"
        SELECT id, name, type, version, enabled, uninstalled, peertube_engine,
               description, settings, created_at, updated_at
        FROM plugin
        {}
        ORDER BY {}
        LIMIT ? OFFSET ?
        "#,
        where_clause,
        query.sort.order_by()
    );
    let mut rows_q = sqlx::query_as::<_, Plugin>(&rows_sql);
    if let Some(plugin_type) = query.plugin_type {
        rows_q = rows_q.bind(plugin_type);
    }
    if let Some(uninstalled) = query.uninstalled {
        rows_q = rows_q.bind(uninstalled);
    }

    let data = rows_q
        .bind(query.count)
        .bind(query.start)
        .fetch_all(pool)
        .await
        .context("Failed to list plugins")
        .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    Ok(ResultList { total, data })
}

// ============================================================================
// Installation lifecycle
// ============================================================================

/// Register a newly installed plugin (enabled, not uninstalled)
#[instrument(skip(pool, input), fields(name = %input.name))]
pub async fn install_plugin(pool: &Pool<Sqlite>, input: &CreatePlugin) -> Result<Plugin> {
    input.validate()?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO plugin (name, type, version, enabled, uninstalled, peertube_engine,
                            description, created_at, updated_at)
        VALUES (?, ?, ?, 1, 0, ?, ?, ?, ?)
        "#,
    )
    .bind(&input.name)
    .bind(input.plugin_type)
    .bind(&input.version)
    .bind(&input.peertube_engine)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .map_err(|e| insert_error(&input.name, e))?;

    info!(name = %input.name, version = %input.version, "Plugin installed");
    reload(pool, &input.name).await
}

/// Install or reinstall; an existing row keeps its settings and storage
#[instrument(skip(pool, input), fields(name = %input.name))]
pub async fn upsert_plugin(pool: &Pool<Sqlite>, input: &CreatePlugin) -> Result<Plugin> {
    input.validate()?;

    let now = Utc::now();
    sqlx::query(
        r#"
        INSERT INTO plugin (name, type, version, enabled, uninstalled, peertube_engine,
                            description, created_at, updated_at)
        VALUES (?, ?, ?, 1, 0, ?, ?, ?, ?)
        ON CONFLICT(name) DO UPDATE SET
            type = excluded.type,
            version = excluded.version,
            enabled = 1,
            uninstalled = 0,
            peertube_engine = excluded.peertube_engine,
            description = excluded.description,
            updated_at = excluded.updated_at
        "#,
    )
    .bind(&input.name)
    .bind(input.plugin_type)
    .bind(&input.version)
    .bind(&input.peertube_engine)
    .bind(&input.description)
    .bind(now)
    .bind(now)
    .execute(pool)
    .await
    .context("Failed to upsert plugin")
    .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    info!(name = %input.name, version = %input.version, "Plugin registered");
    reload(pool, &input.name).await
}

/// Enable or disable a plugin; returns whether a row matched
#[instrument(skip(pool))]
pub async fn set_plugin_enabled(pool: &Pool<Sqlite>, name: &str, enabled: bool) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE plugin
        SET enabled = ?, updated_at = ?
        WHERE name = ?
        "#,
    )
    .bind(enabled)
    .bind(Utc::now())
    .bind(name)
    .execute(pool)
    .await
    .context("Failed to update plugin enabled flag")
    .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    let matched = result.rows_affected() > 0;
    if matched {
        info!(name, enabled, "Plugin enabled flag updated");
    }
    Ok(matched)
}

/// Mark a plugin uninstalled (and disabled); the row is kept
#[instrument(skip(pool))]
pub async fn uninstall_plugin(pool: &Pool<Sqlite>, name: &str) -> Result<bool> {
    let result = sqlx::query(
        r#"
        UPDATE plugin
        SET enabled = 0, uninstalled = 1, updated_at = ?
        WHERE name = ?
        "#,
    )
    .bind(Utc::now())
    .bind(name)
    .execute(pool)
    .await
    .context("Failed to uninstall plugin")
    .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    let matched = result.rows_affected() > 0;
    if matched {
        info!(name, "Plugin uninstalled");
    }
    Ok(matched)
}

// ============================================================================
// Settings and storage documents
// ============================================================================

/// Read one setting; `None` when the plugin, its settings or the key are absent
#[instrument(skip(pool))]
pub async fn get_setting(pool: &Pool<Sqlite>, name: &str, key: &str) -> Result<Option<JsonValue>> {
    let document = fetch_document(pool, Document::Settings, name).await?;
    Ok(document.and_then(|doc| doc.get(key).cloned()))
}

/// Read several settings at once, keeping only the keys that are present
#[instrument(skip(pool))]
pub async fn get_settings(
    pool: &Pool<Sqlite>,
    name: &str,
    keys: &[&str],
) -> Result<HashMap<String, JsonValue>> {
    let document = fetch_document(pool, Document::Settings, name).await?;

    let mut result = HashMap::new();
    if let Some(doc) = document {
        for key in keys {
            if let Some(value) = doc.get(*key) {
                result.insert((*key).to_string(), value.clone());
            }
        }
    }
    Ok(result)
}

/// Merge one key into the settings document; a missing plugin is not an error
#[instrument(skip(pool, value))]
pub async fn set_setting(pool: &Pool<Sqlite>, name: &str, key: &str, value: &JsonValue) -> Result<()> {
    merge_document_key(pool, Document::Settings, name, key, value).await
}

/// Read one value from the plugin-owned storage document
#[instrument(skip(pool))]
pub async fn get_storage_data(pool: &Pool<Sqlite>, name: &str, key: &str) -> Result<Option<JsonValue>> {
    let document = fetch_document(pool, Document::Storage, name).await?;
    Ok(document.and_then(|doc| doc.get(key).cloned()))
}

/// Merge one key into the plugin-owned storage document
#[instrument(skip(pool, value))]
pub async fn store_storage_data(
    pool: &Pool<Sqlite>,
    name: &str,
    key: &str,
    value: &JsonValue,
) -> Result<()> {
    merge_document_key(pool, Document::Storage, name, key, value).await
}

// ============================================================================
// Helpers
// ============================================================================

async fn reload(pool: &Pool<Sqlite>, name: &str) -> Result<Plugin> {
    load_plugin(pool, name)
        .await?
        .ok_or_else(|| Error::DatabaseError(format!("Plugin {} vanished after write", name)))
}

fn insert_error(name: &str, err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db_err) if db_err.is_unique_violation() => {
            Error::AlreadyExists(name.to_string())
        }
        _ => Error::DatabaseError(format!("Failed to install plugin: {}", err)),
    }
}

/// JSON path addressing a top-level key
///
/// SQLite copies a quoted path label into the document verbatim, so labels
/// that would need JSON escaping cannot be addressed.
fn json_key_path(document: Document, key: &str) -> Result<String> {
    if key.is_empty() || key.chars().any(|c| c == '"' || c == '\\' || c.is_control()) {
        return Err(Error::invalid(
            document.key_field(),
            format!("{:?} cannot be used as a key", key),
        ));
    }
    Ok(format!("$.\"{}\"", key))
}

async fn fetch_document(pool: &Pool<Sqlite>, document: Document, name: &str) -> Result<Option<JsonValue>> {
    let sql = format!("SELECT {} FROM plugin WHERE name = ?", document.column());

    let row = sqlx::query_as::<_, (Option<String>,)>(&sql)
        .bind(name)
        .fetch_optional(pool)
        .await
        .with_context(|| format!("Failed to read plugin {}", document.column()))
        .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    match row {
        None => {
            debug!(name, "Plugin not found");
            Ok(None)
        }
        Some((None,)) => Ok(None),
        Some((Some(raw),)) => Ok(Some(serde_json::from_str(&raw)?)),
    }
}

async fn merge_document_key(
    pool: &Pool<Sqlite>,
    document: Document,
    name: &str,
    key: &str,
    value: &JsonValue,
) -> Result<()> {
    let path = json_key_path(document, key)?;
    let encoded = serde_json::to_string(value)?;

    let sql = format!(
        "UPDATE plugin SET {col} = json_set(COALESCE({col}, '{{}}'), ?, json(?)), updated_at = ? WHERE name = ?",
        col = document.column()
    );

    let result = sqlx::query(&sql)
        .bind(path)
        .bind(encoded)
        .bind(Utc::now())
        .bind(name)
        .execute(pool)
        .await
        .with_context(|| format!("Failed to update plugin {}", document.column()))
        .map_err(|e| Error::DatabaseError(format!("{:#}", e)))?;

    if result.rows_affected() == 0 {
        debug!(name, key, "No plugin to update");
    }

    Ok(())
}
