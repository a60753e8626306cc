//! Database query modules

pub mod plugins;

pub use plugins::*;
