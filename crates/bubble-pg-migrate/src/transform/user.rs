//! User records. References the owning company.

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

pub struct UserTransform;

impl EntityTransform for UserTransform {
    fn entity(&self) -> EntityType {
        EntityType::User
    }

    fn table(&self) -> &'static str {
        "users"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        // The source system's built-in user object carries the address under
        // a lowercase "email" key, unlike app-defined fields.
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("email", rec.str_field("email")?)
            .opt_text("full_name", rec.opt_str("Name")?)
            .reference(&REFS[0], rec, refs)?
            .opt_timestamp("source_created_at", rec.opt_timestamp("Created Date")?)
            .build())
    }
}
