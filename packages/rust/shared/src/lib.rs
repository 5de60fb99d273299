//! Shared types, error model, and configuration for the harvester.
//!
//! This crate is the foundation depended on by all other harvester crates.
//! It provides:
//! - [`HarvestError`] — the unified error type
//! - Domain types ([`DedupPolicy`], [`Credentials`])
//! - Configuration ([`AppConfig`], config loading, credential resolution)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, BrowserConfig, CredentialsConfig, DefaultsConfig, ExportConfig, config_dir,
    config_file_path, init_config, load_config, load_config_from, resolve_credentials,
    resolve_downloads_dir,
};
pub use error::{HarvestError, Result};
pub use types::{Credentials, DedupPolicy};
