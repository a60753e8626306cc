//! Core library for plugreg
//!
//! This crate defines the error type, plugin kinds, field validators and
//! listing types shared by the database layer and the command line.

pub mod error;
pub mod plugin;
pub mod types;
pub mod validation;

// Re-exports
pub use error::{Error, Result};
pub use plugin::{build_npm_name, normalize_plugin_name, type_from_npm_name, PluginType};
pub use types::{ResultList, SortColumn, SortDirection, SortSpec};
