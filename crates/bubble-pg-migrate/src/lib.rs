//! # bubble-pg-migrate
//!
//! Entity migration engine for moving a Bubble.io application database into
//! PostgreSQL.
//!
//! The engine extracts paginated JSON records from the Bubble Data API,
//! transforms them into relational rows, and records every
//! `(source_id, entity_type) -> destination_id` pair in a durable mapping
//! ledger so that:
//!
//! - **Interdependent entities** (companies, users, sheets, questions,
//!   choices, answers, tags) migrate in dependency order
//! - **Interrupted runs resume** without creating duplicates
//! - **Forward references** are filled in by a second linking pass once the
//!   referenced entity type has migrated
//!
//! ## Example
//!
//! ```rust,no_run
//! use bubble_pg_migrate::{Config, Migrator};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> bubble_pg_migrate::Result<()> {
//!     let config = Config::load("config.yaml")?;
//!     let migrator = Migrator::connect(&config).await?;
//!     let report = migrator.run_all(&CancellationToken::new()).await?;
//!     println!("Migrated {} records", report.total_migrated());
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod linker;
pub mod mapping;
pub mod migrator;
pub mod source;
pub mod target;
pub mod transform;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenient access
pub use config::{Config, MigrationConfig, SourceConfig, TargetConfig};
pub use error::{MigrateError, Result};
pub use linker::{LinkReport, LinkStats, Linker};
pub use mapping::{MappingStore, PgMappingStore};
pub use migrator::{EntityStats, MigrationReport, Migrator};
pub use source::{BubbleClient, Page, SourceApi, SourceRecord};
pub use target::{DestValue, DestinationStore, NewRow, PgDestination};
pub use transform::{EntityTransform, EntityType, DEPENDENCY_ORDER};
