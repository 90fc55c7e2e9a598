//! Identifier mapping store: the durable `(source_id, entity_type) ->
//! destination_id` ledger.
//!
//! The ledger is both the permanent audit trail of the migration and its
//! idempotency gate: a record with a mapping entry is never migrated twice.
//! Entries are never updated; they are deleted only by an explicit reset.

use crate::error::{MigrateError, Result};
use crate::transform::EntityType;
use async_trait::async_trait;
use deadpool_postgres::Pool;
use std::collections::HashMap;
use tracing::{debug, info};
use uuid::Uuid;

/// Trait for mapping-store operations.
#[async_trait]
pub trait MappingStore: Send + Sync {
    /// Idempotency gate: has this source record already been migrated?
    async fn is_migrated(&self, source_id: &str, entity: EntityType) -> Result<bool>;

    /// Single lookup. `None` means "not yet migrated" — callers leave the
    /// foreign key null for now; it is never an error.
    async fn destination_id(&self, source_id: &str, entity: EntityType) -> Result<Option<Uuid>>;

    /// Batch lookup for high-fan-out entities. Source ids with no mapping
    /// are simply absent from the result map.
    async fn destination_ids(
        &self,
        source_ids: &[String],
        entity: EntityType,
    ) -> Result<HashMap<String, Uuid>>;

    /// Record a mapping immediately after a successful destination write.
    /// Atomic insert-if-absent: returns `true` if this call created the
    /// entry, `false` if a concurrent run (or an earlier crashed one)
    /// already recorded it. Never an error on conflict.
    async fn record_mapping(
        &self,
        source_id: &str,
        destination_id: Uuid,
        entity: EntityType,
    ) -> Result<bool>;

    /// Explicit reset: delete all mappings for one entity type. Returns the
    /// number of entries removed. Repair-tool surface; the next run will
    /// re-migrate (and upsert over) every record of the entity.
    async fn reset_entity(&self, entity: EntityType) -> Result<u64>;
}

/// PostgreSQL mapping store implementation.
pub struct PgMappingStore {
    pool: Pool,
}

impl PgMappingStore {
    pub fn new(pool: Pool) -> Self {
        Self { pool }
    }

    /// Create the ledger table if it does not exist. The composite primary
    /// key is the uniqueness constraint the whole engine leans on.
    pub async fn ensure_schema(&self) -> Result<()> {
        let client = self.client().await?;
        client
            .batch_execute(
                "CREATE TABLE IF NOT EXISTS id_map (
                    source_id      text NOT NULL,
                    entity_type    text NOT NULL,
                    destination_id uuid NOT NULL,
                    created_at     timestamptz NOT NULL DEFAULT now(),
                    PRIMARY KEY (source_id, entity_type)
                )",
            )
            .await?;
        debug!("Mapping ledger schema ensured");
        Ok(())
    }

    async fn client(&self) -> Result<deadpool_postgres::Object> {
        self.pool
            .get()
            .await
            .map_err(|e| MigrateError::pool(e.to_string(), "getting mapping-store connection"))
    }
}

#[async_trait]
impl MappingStore for PgMappingStore {
    async fn is_migrated(&self, source_id: &str, entity: EntityType) -> Result<bool> {
        let client = self.client().await?;
        let row = client
            .query_one(
                "SELECT EXISTS(SELECT 1 FROM id_map WHERE source_id = $1 AND entity_type = $2)",
                &[&source_id, &entity.object_name()],
            )
            .await?;
        Ok(row.get(0))
    }

    async fn destination_id(&self, source_id: &str, entity: EntityType) -> Result<Option<Uuid>> {
        let client = self.client().await?;
        let row = client
            .query_opt(
                "SELECT destination_id FROM id_map WHERE source_id = $1 AND entity_type = $2",
                &[&source_id, &entity.object_name()],
            )
            .await?;
        Ok(row.map(|r| r.get(0)))
    }

    async fn destination_ids(
        &self,
        source_ids: &[String],
        entity: EntityType,
    ) -> Result<HashMap<String, Uuid>> {
        if source_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let client = self.client().await?;
        let rows = client
            .query(
                "SELECT source_id, destination_id FROM id_map
                 WHERE entity_type = $1 AND source_id = ANY($2)",
                &[&entity.object_name(), &source_ids],
            )
            .await?;

        Ok(rows
            .into_iter()
            .map(|r| (r.get::<_, String>(0), r.get::<_, Uuid>(1)))
            .collect())
    }

    async fn record_mapping(
        &self,
        source_id: &str,
        destination_id: Uuid,
        entity: EntityType,
    ) -> Result<bool> {
        let client = self.client().await?;
        let inserted = client
            .execute(
                "INSERT INTO id_map (source_id, entity_type, destination_id)
                 VALUES ($1, $2, $3)
                 ON CONFLICT (source_id, entity_type) DO NOTHING",
                &[&source_id, &entity.object_name(), &destination_id],
            )
            .await?;
        Ok(inserted == 1)
    }

    async fn reset_entity(&self, entity: EntityType) -> Result<u64> {
        let client = self.client().await?;
        let deleted = client
            .execute(
                "DELETE FROM id_map WHERE entity_type = $1",
                &[&entity.object_name()],
            )
            .await?;
        info!("Reset {} mapping entries for '{}'", deleted, entity);
        Ok(deleted)
    }
}
