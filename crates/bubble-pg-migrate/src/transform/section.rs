//! Questionnaire section records. No foreign keys.

use super::{EntityTransform, EntityType, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

pub struct SectionTransform;

impl EntityTransform for SectionTransform {
    fn entity(&self) -> EntityType {
        EntityType::Section
    }

    fn table(&self) -> &'static str {
        "sections"
    }

    fn build_row(&self, rec: &SourceRecord, _refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("title", rec.str_field("Title")?)
            .opt_i64("position", rec.opt_i64("Order")?)
            .build())
    }
}
