//! Tag records. No foreign keys.

use super::{EntityTransform, EntityType, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

pub struct TagTransform;

impl EntityTransform for TagTransform {
    fn entity(&self) -> EntityType {
        EntityType::Tag
    }

    fn table(&self) -> &'static str {
        "tags"
    }

    fn build_row(&self, rec: &SourceRecord, _refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("name", rec.str_field("Name")?)
            .opt_text("color", rec.opt_str("Color")?)
            .build())
    }
}
