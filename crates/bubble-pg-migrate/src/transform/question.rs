//! Question records. References the parent subsection.

use super::{EntityTransform, EntityType, Reference, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

static REFS: [Reference; 1] = [Reference {
    source_field: "Subsection",
    entity: EntityType::Subsection,
    id_column: "subsection_id",
    raw_column: "subsection_bubble_id",
}];

pub struct QuestionTransform;

impl EntityTransform for QuestionTransform {
    fn entity(&self) -> EntityType {
        EntityType::Question
    }

    fn table(&self) -> &'static str {
        "questions"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("prompt", rec.str_field("Text")?)
            .opt_i64("position", rec.opt_i64("Order")?)
            .opt_bool("required", rec.opt_bool("Required")?)
            .reference(&REFS[0], rec, refs)?
            .build())
    }
}
