//! In-memory fakes behind the engine's three seams, shared by unit tests.

use crate::error::{MigrateError, Result};
use crate::mapping::MappingStore;
use crate::source::{Page, SourceApi, SourceRecord};
use crate::target::{DestValue, DestinationStore, NewRow, NullType};
use crate::transform::EntityType;
use async_trait::async_trait;
use serde_json::json;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use uuid::Uuid;

/// Fake source API serving records from memory, with knobs for stale
/// `remaining` counts and injected page-fetch failures.
#[derive(Default)]
pub struct MemorySource {
    records: Mutex<HashMap<EntityType, Vec<SourceRecord>>>,
    calls: AtomicUsize,
    stale_remaining: Option<i64>,
    fail_at_page: Option<usize>,
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed `n` generic records for an entity type (ids `t1..tn`).
    pub fn with_records(entity: EntityType, n: usize) -> Self {
        let source = Self::new();
        for i in 1..=n {
            source.add(
                entity,
                json!({"_id": format!("t{}", i), "Name": format!("record-{}", i)}),
            );
        }
        source
    }

    pub fn add(&self, entity: EntityType, record: serde_json::Value) {
        let rec = SourceRecord::new(record.as_object().expect("object record").clone());
        self.records.lock().unwrap().entry(entity).or_default().push(rec);
    }

    /// Report this value as `remaining` once the real remainder hits zero,
    /// simulating a source with stale counts.
    pub fn stale_remaining(mut self, remaining: i64) -> Self {
        self.stale_remaining = Some(remaining);
        self
    }

    /// Fail the nth `list` call (zero-based) with an API error.
    pub fn fail_at_page(mut self, page: usize) -> Self {
        self.fail_at_page = Some(page);
        self
    }

    pub fn list_calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SourceApi for MemorySource {
    async fn list(&self, entity: EntityType, cursor: i64, limit: i64) -> Result<Page> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_at_page == Some(call) {
            return Err(MigrateError::Api {
                entity: entity.to_string(),
                status: 503,
                message: "injected failure".into(),
            });
        }

        let records = self.records.lock().unwrap();
        let all = records.get(&entity).cloned().unwrap_or_default();
        let start = (cursor.max(0) as usize).min(all.len());
        let end = (start + limit.max(0) as usize).min(all.len());
        let results: Vec<SourceRecord> = all[start..end].to_vec();

        let mut remaining = (all.len() - end) as i64;
        if remaining == 0 {
            if let Some(stale) = self.stale_remaining {
                remaining = stale;
            }
        }

        Ok(Page {
            count: results.len() as i64,
            results,
            remaining,
        })
    }
}

/// Fake mapping store over a hash map.
#[derive(Default)]
pub struct MemoryMappings {
    entries: Mutex<HashMap<(String, EntityType), Uuid>>,
}

impl MemoryMappings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn get(&self, source_id: &str, entity: EntityType) -> Option<Uuid> {
        self.entries
            .lock()
            .unwrap()
            .get(&(source_id.to_string(), entity))
            .copied()
    }
}

#[async_trait]
impl MappingStore for MemoryMappings {
    async fn is_migrated(&self, source_id: &str, entity: EntityType) -> Result<bool> {
        Ok(self.get(source_id, entity).is_some())
    }

    async fn destination_id(&self, source_id: &str, entity: EntityType) -> Result<Option<Uuid>> {
        Ok(self.get(source_id, entity))
    }

    async fn destination_ids(
        &self,
        source_ids: &[String],
        entity: EntityType,
    ) -> Result<HashMap<String, Uuid>> {
        let entries = self.entries.lock().unwrap();
        Ok(source_ids
            .iter()
            .filter_map(|sid| {
                entries
                    .get(&(sid.clone(), entity))
                    .map(|dest| (sid.clone(), *dest))
            })
            .collect())
    }

    async fn record_mapping(
        &self,
        source_id: &str,
        destination_id: Uuid,
        entity: EntityType,
    ) -> Result<bool> {
        let mut entries = self.entries.lock().unwrap();
        let key = (source_id.to_string(), entity);
        if entries.contains_key(&key) {
            return Ok(false);
        }
        entries.insert(key, destination_id);
        Ok(true)
    }

    async fn reset_entity(&self, entity: EntityType) -> Result<u64> {
        let mut entries = self.entries.lock().unwrap();
        let before = entries.len();
        entries.retain(|(_, e), _| *e != entity);
        Ok((before - entries.len()) as u64)
    }
}

/// One stored destination row.
#[derive(Debug, Clone)]
pub struct StoredRow {
    pub id: Uuid,
    pub values: HashMap<&'static str, DestValue>,
}

impl StoredRow {
    pub fn bubble_id(&self) -> &str {
        match self.values.get("bubble_id") {
            Some(DestValue::Text(id)) => id,
            _ => panic!("stored row without bubble_id"),
        }
    }
}

/// Fake destination store with upsert-on-bubble_id semantics and injectable
/// per-record write failures.
#[derive(Default)]
pub struct MemoryDestination {
    tables: Mutex<HashMap<String, Vec<StoredRow>>>,
    fail_bubble_ids: Mutex<HashSet<String>>,
}

impl MemoryDestination {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make writes for this source id fail, simulating a constraint
    /// violation or transient I/O error.
    pub fn fail_writes_for(&self, bubble_id: &str) {
        self.fail_bubble_ids.lock().unwrap().insert(bubble_id.to_string());
    }

    pub fn rows(&self, table: &str) -> Vec<StoredRow> {
        self.tables
            .lock()
            .unwrap()
            .get(table)
            .cloned()
            .unwrap_or_default()
    }

    pub fn row_count(&self, table: &str) -> usize {
        self.rows(table).len()
    }
}

#[async_trait]
impl DestinationStore for MemoryDestination {
    async fn upsert(&self, row: &NewRow) -> Result<Uuid> {
        let bubble_id = row.bubble_id().expect("row without bubble_id").to_string();

        if self.fail_bubble_ids.lock().unwrap().contains(&bubble_id) {
            return Err(MigrateError::pool("injected write failure", bubble_id));
        }

        let values: HashMap<&'static str, DestValue> = row
            .columns
            .iter()
            .map(|c| (c.name, c.value.clone()))
            .collect();

        let mut tables = self.tables.lock().unwrap();
        let rows = tables.entry(row.table.to_string()).or_default();

        if let Some(existing) = rows.iter_mut().find(|r| r.bubble_id() == bubble_id) {
            existing.values = values;
            return Ok(existing.id);
        }

        let id = Uuid::new_v4();
        rows.push(StoredRow { id, values });
        Ok(id)
    }

    async fn pending_links(
        &self,
        table: &str,
        id_column: &str,
        raw_column: &str,
    ) -> Result<Vec<(Uuid, String)>> {
        let tables = self.tables.lock().unwrap();
        let rows = match tables.get(table) {
            Some(rows) => rows,
            None => return Ok(Vec::new()),
        };

        Ok(rows
            .iter()
            .filter(|r| matches!(r.values.get(id_column), Some(DestValue::Null(NullType::Uuid))))
            .filter_map(|r| match r.values.get(raw_column) {
                Some(DestValue::Text(raw)) => Some((r.id, raw.clone())),
                _ => None,
            })
            .collect())
    }

    async fn set_link(
        &self,
        table: &str,
        id_column: &str,
        row_id: Uuid,
        destination_id: Uuid,
    ) -> Result<()> {
        let mut tables = self.tables.lock().unwrap();
        if let Some(rows) = tables.get_mut(table) {
            if let Some(row) = rows.iter_mut().find(|r| r.id == row_id) {
                // The fake mirrors the SQL UPDATE: overwrite the id column key
                let key = row
                    .values
                    .keys()
                    .copied()
                    .find(|k| *k == id_column)
                    .expect("unknown link column");
                row.values.insert(key, DestValue::Uuid(destination_id));
            }
        }
        Ok(())
    }
}
