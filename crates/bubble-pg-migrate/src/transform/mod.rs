//! Per-entity transform functions.
//!
//! Each entity type gets one transform that maps a source record shape into
//! a destination row. Foreign-key fields are resolved through pre-fetched
//! mapping-store lookups ([`ResolvedRefs`]); when the referent has not been
//! migrated yet the destination FK stays NULL and the raw source reference
//! is kept in a companion `*_bubble_id` column for the second linking pass.

mod answer;
mod choice;
mod company;
mod question;
mod section;
mod sheet;
mod subsection;
mod tag;
mod user;

pub use answer::AnswerTransform;
pub use choice::ChoiceTransform;
pub use company::CompanyTransform;
pub use question::QuestionTransform;
pub use section::SectionTransform;
pub use sheet::SheetTransform;
pub use subsection::SubsectionTransform;
pub use tag::TagTransform;
pub use user::UserTransform;

use crate::error::{MigrateError, Result};
use crate::source::SourceRecord;
use crate::target::{Column, DestValue, NewRow, NullType};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use uuid::Uuid;

/// Entity types known to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityType {
    Company,
    User,
    Tag,
    Section,
    Subsection,
    Sheet,
    Question,
    Choice,
    Answer,
}

/// Migration order: entities with no foreign keys first, then each level of
/// the reference chain. Running in this order maximizes how many FKs resolve
/// on the first pass; anything left over is the linker's job.
pub const DEPENDENCY_ORDER: [EntityType; 9] = [
    EntityType::Company,
    EntityType::Tag,
    EntityType::Section,
    EntityType::User,
    EntityType::Subsection,
    EntityType::Sheet,
    EntityType::Question,
    EntityType::Choice,
    EntityType::Answer,
];

impl EntityType {
    /// Object name in the source API path (`/obj/{name}`).
    pub fn object_name(&self) -> &'static str {
        match self {
            EntityType::Company => "company",
            EntityType::User => "user",
            EntityType::Tag => "tag",
            EntityType::Section => "section",
            EntityType::Subsection => "subsection",
            EntityType::Sheet => "sheet",
            EntityType::Question => "question",
            EntityType::Choice => "choice",
            EntityType::Answer => "answer",
        }
    }

    /// Parse a CLI-supplied entity name.
    pub fn parse(name: &str) -> Result<Self> {
        DEPENDENCY_ORDER
            .iter()
            .copied()
            .find(|e| e.object_name() == name.to_lowercase())
            .ok_or_else(|| MigrateError::UnknownEntity(name.to_string()))
    }
}

impl fmt::Display for EntityType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.object_name())
    }
}

/// A declared foreign-key reference from one entity type to another.
#[derive(Debug, Clone, Copy)]
pub struct Reference {
    /// Field on the source record holding the referenced source id.
    pub source_field: &'static str,

    /// Entity type the reference points at.
    pub entity: EntityType,

    /// Destination FK column (uuid, nullable).
    pub id_column: &'static str,

    /// Destination column retaining the raw source reference.
    pub raw_column: &'static str,
}

/// Pre-fetched `(entity, source_id) -> destination_id` lookups for one batch.
#[derive(Debug, Default)]
pub struct ResolvedRefs(HashMap<(EntityType, String), Uuid>);

impl ResolvedRefs {
    pub fn insert(&mut self, entity: EntityType, source_id: String, destination_id: Uuid) {
        self.0.insert((entity, source_id), destination_id);
    }

    pub fn get(&self, entity: EntityType, source_id: &str) -> Option<Uuid> {
        self.0.get(&(entity, source_id.to_string())).copied()
    }
}

/// Trait implemented once per entity type.
pub trait EntityTransform: Send + Sync {
    /// The entity type this transform handles.
    fn entity(&self) -> EntityType;

    /// Destination table name.
    fn table(&self) -> &'static str;

    /// Foreign-key references this entity declares.
    fn references(&self) -> &'static [Reference] {
        &[]
    }

    /// Map one source record into a destination row. Fails closed on
    /// missing or malformed required fields; the driver records the failure
    /// and continues with the next record.
    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow>;
}

/// Look up the transform for an entity type.
pub fn transform_for(entity: EntityType) -> Box<dyn EntityTransform> {
    match entity {
        EntityType::Company => Box::new(CompanyTransform),
        EntityType::User => Box::new(UserTransform),
        EntityType::Tag => Box::new(TagTransform),
        EntityType::Section => Box::new(SectionTransform),
        EntityType::Subsection => Box::new(SubsectionTransform),
        EntityType::Sheet => Box::new(SheetTransform),
        EntityType::Question => Box::new(QuestionTransform),
        EntityType::Choice => Box::new(ChoiceTransform),
        EntityType::Answer => Box::new(AnswerTransform),
    }
}

/// Builder for destination rows. Seeds the `bubble_id` traceability column
/// from the source id.
pub struct RowBuilder {
    table: &'static str,
    columns: Vec<Column>,
}

impl RowBuilder {
    pub fn new(table: &'static str, source_id: &str) -> Self {
        Self {
            table,
            columns: vec![Column {
                name: "bubble_id",
                value: DestValue::Text(source_id.to_string()),
            }],
        }
    }

    pub fn text(mut self, name: &'static str, value: &str) -> Self {
        self.columns.push(Column {
            name,
            value: DestValue::Text(value.to_string()),
        });
        self
    }

    pub fn opt_text(mut self, name: &'static str, value: Option<&str>) -> Self {
        let value = match value {
            Some(v) => DestValue::Text(v.to_string()),
            None => DestValue::Null(NullType::Text),
        };
        self.columns.push(Column { name, value });
        self
    }

    pub fn opt_bool(mut self, name: &'static str, value: Option<bool>) -> Self {
        let value = match value {
            Some(v) => DestValue::Bool(v),
            None => DestValue::Null(NullType::Bool),
        };
        self.columns.push(Column { name, value });
        self
    }

    pub fn opt_i64(mut self, name: &'static str, value: Option<i64>) -> Self {
        let value = match value {
            Some(v) => DestValue::I64(v),
            None => DestValue::Null(NullType::I64),
        };
        self.columns.push(Column { name, value });
        self
    }

    pub fn opt_f64(mut self, name: &'static str, value: Option<f64>) -> Self {
        let value = match value {
            Some(v) => DestValue::F64(v),
            None => DestValue::Null(NullType::F64),
        };
        self.columns.push(Column { name, value });
        self
    }

    pub fn opt_timestamp(mut self, name: &'static str, value: Option<DateTime<Utc>>) -> Self {
        let value = match value {
            Some(v) => DestValue::Timestamp(v),
            None => DestValue::Null(NullType::Timestamp),
        };
        self.columns.push(Column { name, value });
        self
    }

    /// Add the FK pair for a declared reference: the resolved destination id
    /// (NULL when the referent has not migrated yet) and the raw source
    /// reference retained for the linker.
    pub fn reference(
        mut self,
        spec: &Reference,
        rec: &SourceRecord,
        refs: &ResolvedRefs,
    ) -> Result<Self> {
        let raw = rec.opt_str(spec.source_field)?;
        let resolved = raw.and_then(|source_id| refs.get(spec.entity, source_id));

        let id_value = match resolved {
            Some(id) => DestValue::Uuid(id),
            None => DestValue::Null(NullType::Uuid),
        };
        self.columns.push(Column {
            name: spec.id_column,
            value: id_value,
        });

        let raw_value = match raw {
            Some(source_id) => DestValue::Text(source_id.to_string()),
            None => DestValue::Null(NullType::Text),
        };
        self.columns.push(Column {
            name: spec.raw_column,
            value: raw_value,
        });

        Ok(self)
    }

    pub fn build(self) -> NewRow {
        NewRow {
            table: self.table,
            columns: self.columns,
        }
    }
}
