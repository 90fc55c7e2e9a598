//! Answer choice records. References the parent question.

use super::{EntityTransform, EntityType, Reference, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

static REFS: [Reference; 1] = [Reference {
    source_field: "Question",
    entity: EntityType::Question,
    id_column: "question_id",
    raw_column: "question_bubble_id",
}];

pub struct ChoiceTransform;

impl EntityTransform for ChoiceTransform {
    fn entity(&self) -> EntityType {
        EntityType::Choice
    }

    fn table(&self) -> &'static str {
        "choices"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("label", rec.str_field("Label")?)
            .opt_i64("position", rec.opt_i64("Order")?)
            .reference(&REFS[0], rec, refs)?
            .build())
    }
}
