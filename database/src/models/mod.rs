// Database models

pub mod plugin;

pub use plugin::*;
