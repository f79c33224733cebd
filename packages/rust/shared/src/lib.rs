//! Shared types, error model, and configuration for RosterSync.
//!
//! This crate is the foundation depended on by all other RosterSync crates.
//! It provides:
//! - [`RosterSyncError`] — the unified error type
//! - Domain types ([`TeamMember`], [`Committee`], [`RosterDocument`], [`RawRow`])
//! - Configuration ([`AppConfig`], secrets resolution, config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, RepoConfig, RosterConfig, Secrets, SecretsConfig, config_dir, config_file_path,
    init_config, load_config, load_config_from, resolve_secrets,
};
pub use error::{Result, RosterSyncError};
pub use types::{Committee, RawRow, RosterDocument, TeamMember};
