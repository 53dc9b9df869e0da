//! Read access to committed research.

use rusqlite::{OptionalExtension, params};
use serde::Serialize;

use super::database::SharedDatabase;
use super::staging::{
    EMAIL_DRAFT_SELECT, PROSPECT_SELECT, RESEARCH_ANSWER_SELECT, StagingTable,
    email_draft_from_row, prospect_from_row, research_answer_from_row,
};
use crate::types::{EmailDraftSet, Prospect, ResearchAnswer, Result, ResultExt};

/// Row counts for one entity in staging and permanent storage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: &'static str,
    pub staging: usize,
    pub permanent: usize,
}

pub struct PermanentRecords {
    db: SharedDatabase,
}

impl PermanentRecords {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    pub fn prospect(&self, buyer_identifier: &str) -> Result<Option<Prospect>> {
        let conn = self.db.connection()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM prospects WHERE buyer_identifier = ?1",
                PROSPECT_SELECT
            ),
            params![buyer_identifier],
            prospect_from_row,
        )
        .optional()
        .with_context_fn(|| format!("Failed to load prospect {}", buyer_identifier))
    }

    /// Committed answers for one buyer, ordered by topic.
    pub fn research_answers_for(&self, buyer_identifier: &str) -> Result<Vec<ResearchAnswer>> {
        let conn = self.db.connection()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {} FROM research_answers WHERE buyer_id = ?1 ORDER BY topic_id",
            RESEARCH_ANSWER_SELECT
        ))?;
        let answers = stmt
            .query_map(params![buyer_identifier], research_answer_from_row)?
            .collect::<rusqlite::Result<Vec<_>>>()
            .with_context_fn(|| format!("Failed to load answers for {}", buyer_identifier))?;
        Ok(answers)
    }

    pub fn email_drafts_for(&self, buyer_identifier: &str) -> Result<Option<EmailDraftSet>> {
        let conn = self.db.connection()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM email_drafts WHERE buyer_identifier = ?1",
                EMAIL_DRAFT_SELECT
            ),
            params![buyer_identifier],
            email_draft_from_row,
        )
        .optional()
        .with_context_fn(|| format!("Failed to load drafts for {}", buyer_identifier))
    }

    pub fn table_counts(&self) -> Result<Vec<TableCount>> {
        StagingTable::ALL
            .iter()
            .map(|table| {
                Ok(TableCount {
                    table: table.permanent_name(),
                    staging: self.db.count_rows(table.staging_name())?,
                    permanent: self.db.count_rows(table.permanent_name())?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn records() -> (SharedDatabase, PermanentRecords) {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let db = Arc::new(db);
        (db.clone(), PermanentRecords::new(db))
    }

    #[test]
    fn test_missing_buyer() {
        let (_, records) = records();
        assert!(records.prospect("nobody").unwrap().is_none());
        assert!(records.email_drafts_for("nobody").unwrap().is_none());
        assert!(records.research_answers_for("nobody").unwrap().is_empty());
    }

    #[test]
    fn test_table_counts_cover_every_entity() {
        let (db, records) = records();
        db.connection().unwrap().execute(
            "INSERT INTO topics_staging (topic_identifier, title, created_at) VALUES ('Q3_a', 'a', 'now')",
            [],
        )
        .unwrap();

        let counts = records.table_counts().unwrap();
        assert_eq!(counts.len(), 8);
        let topics = counts.iter().find(|c| c.table == "topics").unwrap();
        assert_eq!(topics.staging, 1);
        assert_eq!(topics.permanent, 0);
    }
}
