//! Plugin kinds and npm package naming

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::{Error, Result};

/// Kind of installed extension, stored as a small integer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(rename_all = "lowercase")]
#[repr(i32)]
pub enum PluginType {
    Plugin = 1,
    Theme = 2,
}

impl PluginType {
    /// Prefix of npm packages of this kind
    pub fn npm_prefix(&self) -> &'static str {
        match self {
            PluginType::Plugin => "peertube-plugin-",
            PluginType::Theme => "peertube-theme-",
        }
    }

    pub fn as_i32(&self) -> i32 {
        *self as i32
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PluginType::Plugin => "plugin",
            PluginType::Theme => "theme",
        }
    }
}

impl TryFrom<i32> for PluginType {
    type Error = Error;

    fn try_from(value: i32) -> Result<Self> {
        match value {
            1 => Ok(PluginType::Plugin),
            2 => Ok(PluginType::Theme),
            other => Err(Error::invalid("type", format!("unknown plugin type {}", other))),
        }
    }
}

impl FromStr for PluginType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "plugin" | "1" => Ok(PluginType::Plugin),
            "theme" | "2" => Ok(PluginType::Theme),
            other => Err(Error::invalid("type", format!("unknown plugin type {:?}", other))),
        }
    }
}

impl fmt::Display for PluginType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Full npm package name for a registry name
pub fn build_npm_name(name: &str, plugin_type: PluginType) -> String {
    format!("{}{}", plugin_type.npm_prefix(), name)
}

/// Kind encoded in an npm package name prefix
pub fn type_from_npm_name(npm_name: &str) -> Result<PluginType> {
    [PluginType::Plugin, PluginType::Theme]
        .into_iter()
        .find(|t| npm_name.starts_with(t.npm_prefix()))
        .ok_or_else(|| Error::invalid("npmName", format!("{:?} has no known prefix", npm_name)))
}

/// Strip the npm prefix, leaving the name stored in the registry
pub fn normalize_plugin_name(npm_name: &str) -> String {
    [PluginType::Plugin, PluginType::Theme]
        .iter()
        .find_map(|t| npm_name.strip_prefix(t.npm_prefix()))
        .unwrap_or(npm_name)
        .to_string()
}
