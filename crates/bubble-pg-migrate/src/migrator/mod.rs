//! Migration driver - per-entity-type workflow coordinator.
//!
//! For one entity type the driver streams source pages, skips records the
//! mapping ledger already knows, transforms and upserts the rest, and
//! records a mapping entry immediately after every successful write. A bad
//! record is logged and counted, never fatal; a failed page fetch is fatal
//! to the run but leaves the ledger consistent, so the run is resumable.

use crate::config::{Config, MigrationConfig};
use crate::error::Result;
use crate::linker::Linker;
use crate::mapping::{MappingStore, PgMappingStore};
use crate::source::{stream_pages, BubbleClient, SourceApi, SourceRecord};
use crate::target::{connect_pool, DestinationStore, PgDestination};
use crate::transform::{transform_for, EntityTransform, EntityType, ResolvedRefs, DEPENDENCY_ORDER};
use chrono::{DateTime, Utc};
use futures::TryStreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// Per-entity-type counters for one run. Transient; logged, not persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityStats {
    /// Records transformed, written, and mapped this run (in dry-run mode:
    /// records that would have been).
    pub migrated: u64,

    /// Records already present in the mapping ledger.
    pub skipped: u64,

    /// Records that failed transform or write; logged and left for a later
    /// run or a human.
    pub failed: u64,
}

/// Result of one entity-type run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityReport {
    /// Entity type migrated.
    pub entity: EntityType,

    #[serde(flatten)]
    pub stats: EntityStats,
}

/// Result of a full dependency-ordered migration run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MigrationReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,

    /// When the run completed.
    pub completed_at: DateTime<Utc>,

    /// Total duration in seconds.
    pub duration_seconds: f64,

    /// Whether this was a dry run.
    pub dry_run: bool,

    /// Per-entity results in execution order.
    pub entities: Vec<EntityReport>,
}

impl MigrationReport {
    pub fn total_migrated(&self) -> u64 {
        self.entities.iter().map(|e| e.stats.migrated).sum()
    }

    pub fn total_skipped(&self) -> u64 {
        self.entities.iter().map(|e| e.stats.skipped).sum()
    }

    pub fn total_failed(&self) -> u64 {
        self.entities.iter().map(|e| e.stats.failed).sum()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Migration driver.
///
/// Owns no persistent state of its own: it coordinates the source client,
/// the mapping ledger, and the destination store.
pub struct Migrator {
    source: Arc<dyn SourceApi>,
    mappings: Arc<dyn MappingStore>,
    destination: Arc<dyn DestinationStore>,
    batch_size: i64,
    dry_run: bool,
}

impl Migrator {
    /// Create a driver over explicit collaborators.
    pub fn new(
        source: Arc<dyn SourceApi>,
        mappings: Arc<dyn MappingStore>,
        destination: Arc<dyn DestinationStore>,
        migration: &MigrationConfig,
    ) -> Self {
        Self {
            source,
            mappings,
            destination,
            batch_size: migration.get_batch_size(),
            dry_run: migration.dry_run,
        }
    }

    /// Connect the production collaborators from configuration: the source
    /// HTTP client and a shared PostgreSQL pool for the destination store
    /// and the mapping ledger (whose table is created if missing).
    pub async fn connect(config: &Config) -> Result<Self> {
        let source = Arc::new(BubbleClient::new(&config.source)?);
        let pool = connect_pool(&config.target).await?;

        let mappings = PgMappingStore::new(pool.clone());
        mappings.ensure_schema().await?;

        let destination = PgDestination::new(pool);

        Ok(Self::new(
            source,
            Arc::new(mappings),
            Arc::new(destination),
            &config.migration,
        ))
    }

    /// A second-pass linker over the same mapping ledger and destination.
    pub fn linker(&self) -> Linker {
        Linker::new(self.mappings.clone(), self.destination.clone())
    }

    /// Total source record count for an entity type (scope preview).
    pub async fn count(&self, entity: EntityType) -> Result<i64> {
        self.source.count_all(entity).await
    }

    /// Delete all mapping entries for an entity type.
    pub async fn reset_entity(&self, entity: EntityType) -> Result<u64> {
        self.mappings.reset_entity(entity).await
    }

    /// Verify both boundaries are reachable: one source API call and one
    /// mapping-ledger read.
    pub async fn health_check(&self) -> Result<()> {
        let companies = self.source.count_all(EntityType::Company).await?;
        self.mappings.is_migrated("health-check", EntityType::Company).await?;
        info!("Health check passed ({} companies at source)", companies);
        Ok(())
    }

    /// Migrate every entity type in dependency order.
    pub async fn run_all(&self, cancel: &CancellationToken) -> Result<MigrationReport> {
        let started_at = Utc::now();
        let mut entities = Vec::with_capacity(DEPENDENCY_ORDER.len());

        for entity in DEPENDENCY_ORDER {
            if cancel.is_cancelled() {
                info!("Cancellation requested, stopping before '{}'", entity);
                break;
            }
            let stats = self.run_entity(entity, cancel).await?;
            entities.push(EntityReport { entity, stats });
        }

        let completed_at = Utc::now();
        let report = MigrationReport {
            started_at,
            completed_at,
            duration_seconds: (completed_at - started_at).num_milliseconds() as f64 / 1000.0,
            dry_run: self.dry_run,
            entities,
        };

        info!(
            "Migration run complete: {} migrated, {} skipped, {} failed in {:.1}s",
            report.total_migrated(),
            report.total_skipped(),
            report.total_failed(),
            report.duration_seconds
        );

        Ok(report)
    }

    /// Migrate one entity type.
    pub async fn run_entity(
        &self,
        entity: EntityType,
        cancel: &CancellationToken,
    ) -> Result<EntityStats> {
        let transform = transform_for(entity);

        // Progress denominator only; termination comes from the page stream.
        let total = self.source.count_all(entity).await?;
        info!(
            "{}: migrating {} source records (batch size {}{})",
            entity,
            total,
            self.batch_size,
            if self.dry_run { ", dry run" } else { "" }
        );

        let mut stats = EntityStats::default();
        let mut processed: i64 = 0;

        let mut pages = Box::pin(stream_pages(self.source.clone(), entity, self.batch_size));

        while let Some(batch) = pages.try_next().await? {
            if cancel.is_cancelled() {
                info!("{}: cancellation requested, stopping between batches", entity);
                break;
            }

            let refs = self.resolve_refs(transform.as_ref(), &batch).await?;

            for rec in &batch {
                self.process_record(transform.as_ref(), rec, &refs, &mut stats)
                    .await?;
            }

            processed += batch.len() as i64;
            info!(
                "{}: {}/{} processed (migrated {}, skipped {}, failed {})",
                entity, processed, total, stats.migrated, stats.skipped, stats.failed
            );
        }

        info!(
            "{}: done. migrated {}, skipped {}, failed {}",
            entity, stats.migrated, stats.skipped, stats.failed
        );
        Ok(stats)
    }

    /// Batch-resolve every declared FK reference for one page of records.
    async fn resolve_refs(
        &self,
        transform: &dyn EntityTransform,
        batch: &[SourceRecord],
    ) -> Result<ResolvedRefs> {
        let mut refs = ResolvedRefs::default();

        for spec in transform.references() {
            let mut source_ids: Vec<String> = batch
                .iter()
                .filter_map(|rec| {
                    rec.opt_str(spec.source_field)
                        .ok()
                        .flatten()
                        .map(str::to_string)
                })
                .collect();
            source_ids.sort_unstable();
            source_ids.dedup();

            if source_ids.is_empty() {
                continue;
            }

            let found = self.mappings.destination_ids(&source_ids, spec.entity).await?;
            for (source_id, destination_id) in found {
                refs.insert(spec.entity, source_id, destination_id);
            }
        }

        Ok(refs)
    }

    /// Process one record: skip, transform-and-write, or fail.
    ///
    /// Only mapping-ledger failures propagate (the ledger being unreachable
    /// makes every subsequent idempotency answer meaningless); transform and
    /// write failures are counted and the run continues.
    async fn process_record(
        &self,
        transform: &dyn EntityTransform,
        rec: &SourceRecord,
        refs: &ResolvedRefs,
        stats: &mut EntityStats,
    ) -> Result<()> {
        let entity = transform.entity();

        let source_id = match rec.source_id() {
            Ok(id) => id.to_string(),
            Err(e) => {
                warn!("{}: record without usable _id: {}", entity, e);
                stats.failed += 1;
                return Ok(());
            }
        };

        if self.mappings.is_migrated(&source_id, entity).await? {
            stats.skipped += 1;
            return Ok(());
        }

        if self.dry_run {
            stats.migrated += 1;
            return Ok(());
        }

        let row = match transform.build_row(rec, refs) {
            Ok(row) => row,
            Err(e) => {
                warn!("{}: transform failed for {}: {}", entity, source_id, e);
                stats.failed += 1;
                return Ok(());
            }
        };

        let destination_id = match self.destination.upsert(&row).await {
            Ok(id) => id,
            Err(e) => {
                warn!("{}: write failed for {}: {}", entity, source_id, e);
                stats.failed += 1;
                return Ok(());
            }
        };

        // Destination write first, mapping second; the bubble_id upsert makes
        // a crash between the two harmless on re-run.
        let inserted = self
            .mappings
            .record_mapping(&source_id, destination_id, entity)
            .await?;

        if inserted {
            stats.migrated += 1;
        } else {
            // Another process recorded this mapping first.
            stats.skipped += 1;
        }

        Ok(())
    }
}

impl std::fmt::Display for EntityStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "migrated {}, skipped {}, failed {}",
            self.migrated, self.skipped, self.failed
        )
    }
}
