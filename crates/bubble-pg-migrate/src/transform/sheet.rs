//! Compliance sheet records. References the owning company.

use super::{EntityTransform, EntityType, Reference, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

static REFS: [Reference; 1] = [Reference {
    source_field: "Company",
    entity: EntityType::Company,
    id_column: "company_id",
    raw_column: "company_bubble_id",
}];

pub struct SheetTransform;

impl EntityTransform for SheetTransform {
    fn entity(&self) -> EntityType {
        EntityType::Sheet
    }

    fn table(&self) -> &'static str {
        "sheets"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("title", rec.str_field("Title")?)
            .opt_text("status", rec.opt_str("Status")?)
            .reference(&REFS[0], rec, refs)?
            .opt_timestamp("source_created_at", rec.opt_timestamp("Created Date")?)
            .build())
    }
}
