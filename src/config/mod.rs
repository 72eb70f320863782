//! Configuration for save operations
//!
//! This module provides the `SaveConfig` struct, its builder and its getters.

pub mod builder;
pub mod getters;
pub mod types;

pub use builder::SaveConfigBuilder;
pub use types::{ApiCredentials, SaveConfig};
