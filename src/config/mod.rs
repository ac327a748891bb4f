// src/config/mod.rs

//! Configuration loading and validation for clusterherd.
//!
//! Responsibilities:
//! - Define the TOML-backed data model (`model.rs`).
//! - Load a config file from disk (`loader.rs`).
//! - Validate and resolve it into a [`HarnessConfig`] (`validate.rs`).

pub mod loader;
pub mod model;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{
    BuildSection, ClientConfig, ClientSection, ClusterConfig, ClusterSection, HarnessConfig,
    MilestoneSpec, MonitorConfig, MonitorSection, OutputSection, RawConfigFile,
};
pub use validate::validate_config;
