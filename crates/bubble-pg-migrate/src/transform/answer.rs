//! Answer records.
//!
//! The highest-fan-out entity (answers can number in the hundreds of
//! thousands) and the deepest in the reference chain: each answer points at
//! its parent question, the sheet it belongs to, and optionally the selected
//! choice. All three references are batch-resolved by the driver.

use super::{EntityTransform, EntityType, Reference, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

static REFS: [Reference; 3] = [
    Reference {
        source_field: "Parent Question",
        entity: EntityType::Question,
        id_column: "question_id",
        raw_column: "question_bubble_id",
    },
    Reference {
        source_field: "Sheet",
        entity: EntityType::Sheet,
        id_column: "sheet_id",
        raw_column: "sheet_bubble_id",
    },
    Reference {
        source_field: "Choice",
        entity: EntityType::Choice,
        id_column: "choice_id",
        raw_column: "choice_bubble_id",
    },
];

pub struct AnswerTransform;

impl EntityTransform for AnswerTransform {
    fn entity(&self) -> EntityType {
        EntityType::Answer
    }

    fn table(&self) -> &'static str {
        "answers"
    }

    fn references(&self) -> &'static [Reference] {
        &REFS
    }

    fn build_row(&self, rec: &SourceRecord, refs: &ResolvedRefs) -> Result<NewRow> {
        let mut builder = RowBuilder::new(self.table(), rec.source_id()?)
            .opt_text("value", rec.opt_str("Value")?);
        for spec in &REFS {
            builder = builder.reference(spec, rec, refs)?;
        }
        Ok(builder
            .opt_timestamp("source_created_at", rec.opt_timestamp("Created Date")?)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::{DestValue, NullType};
    use serde_json::json;
    use uuid::Uuid;

    fn answer_record() -> SourceRecord {
        SourceRecord::new(
            json!({
                "_id": "1700x500",
                "Value": "Yes, annually",
                "Parent Question": "1699x42",
                "Sheet": "1699x7"
            })
            .as_object()
            .unwrap()
            .clone(),
        )
    }

    #[test]
    fn test_unresolved_referent_leaves_fk_null_and_keeps_raw() {
        // Question not yet migrated: FK null, raw source id retained
        let row = AnswerTransform
            .build_row(&answer_record(), &ResolvedRefs::default())
            .unwrap();

        assert_eq!(
            row.value_of("question_id"),
            Some(&DestValue::Null(NullType::Uuid))
        );
        assert_eq!(
            row.value_of("question_bubble_id"),
            Some(&DestValue::Text("1699x42".into()))
        );
        // Absent choice reference: both columns null
        assert_eq!(
            row.value_of("choice_id"),
            Some(&DestValue::Null(NullType::Uuid))
        );
        assert_eq!(
            row.value_of("choice_bubble_id"),
            Some(&DestValue::Null(NullType::Text))
        );
    }

    #[test]
    fn test_resolved_referent_fills_fk() {
        let question_dest = Uuid::new_v4();
        let mut refs = ResolvedRefs::default();
        refs.insert(EntityType::Question, "1699x42".into(), question_dest);

        let row = AnswerTransform.build_row(&answer_record(), &refs).unwrap();
        assert_eq!(
            row.value_of("question_id"),
            Some(&DestValue::Uuid(question_dest))
        );
    }
}
