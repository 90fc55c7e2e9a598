//! Questionnaire subsection records. References the parent section.

use super::{EntityTransform, EntityType, Reference, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

static REFS: [Reference; 1] = [Reference {
    source_field: "Section",
    entity: EntityType::Section,
    id_column: "section_id",
    raw_column: "section_bubble_id",
}];

pub struct SubsectionTransform;

impl EntityTransform for SubsectionTransform {
    fn entity(&self) -> EntityType {
        EntityType::Subsection
    }

    fn table(&self) -> &'static str {
        "subsections"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("title", rec.str_field("Title")?)
            .opt_i64("position", rec.opt_i64("Order")?)
            .reference(&REFS[0], rec, refs)?
            .build())
    }
}
