//! Company records. No foreign keys; migrates first.

use super::{EntityTransform, EntityType, ResolvedRefs, RowBuilder};
use crate::error::Result;
use crate::source::SourceRecord;
use crate::target::NewRow;

pub struct CompanyTransform;

impl EntityTransform for CompanyTransform {
    fn entity(&self) -> EntityType {
        EntityType::Company
    }

    fn table(&self) -> &'static str {
        "companies"
    }

    fn build_row(&self, rec: &SourceRecord, _refs: &ResolvedRefs) -> Result<NewRow> {
        Ok(RowBuilder::new(self.table(), rec.source_id()?)
            .text("name", rec.str_field("Name")?)
            .opt_text("domain", rec.opt_str("Domain")?)
            .opt_bool("active", rec.opt_bool("Active")?)
            .opt_timestamp("source_created_at", rec.opt_timestamp("Created Date")?)
            .build())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::target::DestValue;
    use serde_json::json;

    #[test]
    fn test_company_row() {
        let rec = SourceRecord::new(
            json!({
                "_id": "1688x100",
                "Name": "Acme Chemicals",
                "Domain": "acme.example",
                "Active": true,
                "Created Date": "2021-06-29T14:00:00.000Z"
            })
            .as_object()
            .unwrap()
            .clone(),
        );

        let row = CompanyTransform
            .build_row(&rec, &ResolvedRefs::default())
            .unwrap();
        assert_eq!(row.table, "companies");
        assert_eq!(
            row.value_of("name"),
            Some(&DestValue::Text("Acme Chemicals".into()))
        );
        assert_eq!(
            row.value_of("bubble_id"),
            Some(&DestValue::Text("1688x100".into()))
        );
    }

    #[test]
    fn test_missing_name_fails_closed() {
        let rec = SourceRecord::new(
            json!({"_id": "1688x101"}).as_object().unwrap().clone(),
        );
        assert!(CompanyTransform
            .build_row(&rec, &ResolvedRefs::default())
            .is_err());
    }
}
