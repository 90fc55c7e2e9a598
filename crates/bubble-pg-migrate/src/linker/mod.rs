//! Second-pass reference linker.
//!
//! The migration pass leaves an FK NULL whenever the referent had not been
//! migrated yet, keeping the raw source reference in a companion column. The
//! linker sweeps those rows after all entity types have run: for every
//! declared reference it pulls the pending rows, resolves the raw source ids
//! through the mapping ledger in chunks, and fills in the FKs it can. Rows
//! whose referent is still unmapped are reported, not failed, so the linker
//! can run again after the next migration pass.

use crate::error::Result;
use crate::mapping::MappingStore;
use crate::target::DestinationStore;
use crate::transform::{transform_for, EntityType, Reference, DEPENDENCY_ORDER};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, warn};

/// Mapping-ledger lookups per batch during the linking sweep.
const LOOKUP_CHUNK: usize = 500;

/// Counters for one reference column sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkStats {
    /// Rows found with a NULL FK and a raw source reference.
    pub pending: u64,

    /// Rows whose FK was filled in this sweep.
    pub linked: u64,

    /// Rows whose referent has no mapping entry yet.
    pub unresolved: u64,
}

impl LinkStats {
    fn absorb(&mut self, other: LinkStats) {
        self.pending += other.pending;
        self.linked += other.linked;
        self.unresolved += other.unresolved;
    }
}

/// Result of a full linking sweep.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LinkReport {
    /// Per-entity stats in execution order.
    pub entities: Vec<(EntityType, LinkStats)>,
}

impl LinkReport {
    pub fn total_linked(&self) -> u64 {
        self.entities.iter().map(|(_, s)| s.linked).sum()
    }

    pub fn total_unresolved(&self) -> u64 {
        self.entities.iter().map(|(_, s)| s.unresolved).sum()
    }

    /// Convert to JSON string.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Second-pass linker over the mapping ledger and destination store.
pub struct Linker {
    mappings: Arc<dyn MappingStore>,
    destination: Arc<dyn DestinationStore>,
}

impl Linker {
    pub fn new(mappings: Arc<dyn MappingStore>, destination: Arc<dyn DestinationStore>) -> Self {
        Self { mappings, destination }
    }

    /// Sweep every declared reference of every entity type.
    pub async fn link_all(&self) -> Result<LinkReport> {
        let mut entities = Vec::new();

        for entity in DEPENDENCY_ORDER {
            let stats = self.link_entity(entity).await?;
            if stats.pending > 0 {
                entities.push((entity, stats));
            }
        }

        let report = LinkReport { entities };
        info!(
            "Linking sweep complete: {} linked, {} still unresolved",
            report.total_linked(),
            report.total_unresolved()
        );
        Ok(report)
    }

    /// Sweep the declared references of one entity type.
    pub async fn link_entity(&self, entity: EntityType) -> Result<LinkStats> {
        let transform = transform_for(entity);
        let mut stats = LinkStats::default();

        for spec in transform.references() {
            let sweep = self.link_reference(transform.table(), spec).await?;
            stats.absorb(sweep);
        }

        Ok(stats)
    }

    /// Fill in one FK column: fetch the pending rows, resolve their raw
    /// source ids in chunks, update the resolvable ones.
    async fn link_reference(&self, table: &str, spec: &Reference) -> Result<LinkStats> {
        let pending = self
            .destination
            .pending_links(table, spec.id_column, spec.raw_column)
            .await?;

        let mut stats = LinkStats {
            pending: pending.len() as u64,
            ..LinkStats::default()
        };
        if pending.is_empty() {
            return Ok(stats);
        }

        info!(
            "{}.{}: {} rows pending link to '{}'",
            table,
            spec.id_column,
            pending.len(),
            spec.entity
        );

        for chunk in pending.chunks(LOOKUP_CHUNK) {
            let mut source_ids: Vec<String> =
                chunk.iter().map(|(_, raw)| raw.clone()).collect();
            source_ids.sort_unstable();
            source_ids.dedup();

            let resolved = self.mappings.destination_ids(&source_ids, spec.entity).await?;

            for (row_id, raw) in chunk {
                match resolved.get(raw) {
                    Some(destination_id) => {
                        self.destination
                            .set_link(table, spec.id_column, *row_id, *destination_id)
                            .await?;
                        stats.linked += 1;
                    }
                    None => stats.unresolved += 1,
                }
            }
        }

        if stats.unresolved > 0 {
            warn!(
                "{}.{}: {} rows still reference unmigrated '{}' records",
                table, spec.id_column, stats.unresolved, spec.entity
            );
        }

        Ok(stats)
    }
}
