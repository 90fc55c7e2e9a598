//! Configuration type definitions.

use serde::{Deserialize, Serialize};

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Source API configuration (Bubble Data API).
    pub source: SourceConfig,

    /// Target database configuration (PostgreSQL).
    pub target: TargetConfig,

    /// Migration behavior configuration.
    #[serde(default)]
    pub migration: MigrationConfig,
}

/// Source API (Bubble) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Base URL of the Data API, e.g. `https://app.example.com/api/1.1`.
    pub base_url: String,

    /// Bearer token for the Data API.
    pub token: String,

    /// Hard per-page maximum imposed by the source system (default: 100).
    /// `limit` query values are clamped to this.
    #[serde(default = "default_page_max")]
    pub page_max: i64,

    /// Optional JSON-encoded constraints array applied to every list call,
    /// for server-side filtering (e.g. restrict to one company during a
    /// targeted repair run).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub constraints: Option<serde_json::Value>,
}

/// Target database (PostgreSQL) configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Database host.
    pub host: String,

    /// Database port (default: 5432).
    #[serde(default = "default_pg_port")]
    pub port: u16,

    /// Database name.
    pub database: String,

    /// Username.
    pub user: String,

    /// Password.
    pub password: String,

    /// Maximum pooled connections (default: 4).
    #[serde(default = "default_max_connections")]
    pub max_connections: usize,
}

/// Migration behavior configuration.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MigrationConfig {
    /// Records per source page fetch. Balances API round trips against
    /// memory; no correctness dependency on its value.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub batch_size: Option<i64>,

    /// Preview mode: count what would migrate without writing anything.
    #[serde(default)]
    pub dry_run: bool,

    /// Exit non-zero when a run finishes with failed records.
    #[serde(default)]
    pub strict: bool,
}

impl MigrationConfig {
    pub fn get_batch_size(&self) -> i64 {
        self.batch_size.unwrap_or(100)
    }
}

// Default value functions for serde

fn default_page_max() -> i64 {
    100
}

fn default_pg_port() -> u16 {
    5432
}

fn default_max_connections() -> usize {
    4
}
