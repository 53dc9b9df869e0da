//! Staging commit protocol
//!
//! Transfers everything in staging to the permanent tables in one bounded
//! transaction, then clears staging in a second transaction. Entity groups
//! run in a fixed order so later groups can reference earlier ones:
//! campaigns, users, campaign users, seller-side scripts, topics,
//! prospects, research answers, email drafts.

use std::time::Duration;

use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use super::database::{Deadline, SharedDatabase};
use super::staging::{StagingSnapshot, StagingTable, delete_all, now, read_snapshot};
use crate::config::StorageConfig;
use crate::types::{ResearchError, Result, ServiceResponse};

/// Rows transferred per entity group
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransferResults {
    pub campaigns: usize,
    pub users: usize,
    pub campaign_users: usize,
    pub sell_side_scripts: usize,
    pub topics: usize,
    pub prospects: usize,
    pub research_answers: usize,
    pub email_drafts: usize,
}

pub struct StagingCommitter {
    db: SharedDatabase,
    max_wait: Duration,
    timeout: Duration,
    chunk_size: usize,
}

impl StagingCommitter {
    pub fn new(db: SharedDatabase, config: &StorageConfig) -> Self {
        Self {
            db,
            max_wait: Duration::from_secs(config.commit_max_wait_secs),
            timeout: Duration::from_secs(config.commit_timeout_secs),
            chunk_size: config.sell_side_chunk_size.max(1),
        }
    }

    /// Move staging into permanent storage.
    ///
    /// Never returns `Err`: failures become a `Failed` response and leave
    /// staging intact for another attempt.
    #[instrument(skip(self))]
    pub fn commit(&self) -> ServiceResponse<TransferResults> {
        let snapshot = match self.snapshot() {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(error = %e, "Failed to read staging tables");
                return ServiceResponse::failed(format!("An error occurred: {}", e));
            }
        };

        for (table, count) in snapshot.counts() {
            info!(table = table.staging_name(), rows = count, "Staged rows found");
        }

        if snapshot.is_empty() {
            return ServiceResponse::nothing_to_commit("No data to commit in temp tables.");
        }

        let results = match self.transfer(&snapshot) {
            Ok(results) => results,
            Err(e) => {
                warn!(error = %e, "Commit transaction rolled back");
                return ServiceResponse::failed(format!(
                    "Failed to commit data to permanent tables: {}",
                    e
                ));
            }
        };

        info!(?results, "Committed staging to permanent tables");

        // Permanent data is authoritative; stale staging is reset by the next run
        if let Err(e) = self.db.transaction(|conn| delete_all(conn, &StagingTable::ALL)) {
            warn!(error = %e, "Failed to clear staging tables after commit");
        }

        ServiceResponse::ok("Successfully committed data to permanent tables", results)
    }

    fn snapshot(&self) -> Result<StagingSnapshot> {
        let conn = self.db.connection()?;
        read_snapshot(&conn)
    }

    fn transfer(&self, snapshot: &StagingSnapshot) -> Result<TransferResults> {
        self.db
            .bounded_transaction(self.max_wait, self.timeout, |conn, deadline| {
                let mut results = TransferResults::default();

                results.campaigns = stage(deadline, "campaigns", || upsert_campaigns(conn, snapshot))?;
                results.users = stage(deadline, "users", || insert_new_users(conn, snapshot))?;
                results.campaign_users =
                    stage(deadline, "campaign users", || insert_campaign_users(conn, snapshot))?;
                results.sell_side_scripts = stage(deadline, "seller-side scripts", || {
                    insert_sell_side_scripts(conn, snapshot, self.chunk_size, deadline)
                })?;
                results.topics = stage(deadline, "topics", || upsert_topics(conn, snapshot))?;
                results.prospects =
                    stage(deadline, "prospects", || upsert_prospects(conn, snapshot))?;
                results.research_answers = stage(deadline, "research answers", || {
                    upsert_research_answers(conn, snapshot)
                })?;
                results.email_drafts =
                    stage(deadline, "email drafts", || upsert_email_drafts(conn, snapshot))?;

                Ok(results)
            })
    }
}

/// Run one entity group after checking the deadline, tagging failures with the group.
fn stage<F>(deadline: &Deadline, name: &str, f: F) -> Result<usize>
where
    F: FnOnce() -> Result<usize>,
{
    deadline.check(name)?;
    f().map_err(|e| match e {
        ResearchError::Commit { .. } => e,
        other => ResearchError::commit(name, other.to_string()),
    })
}

fn upsert_campaigns(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO campaigns
         (name, company_name, company_site, product_id, product_name, product_category,
          vertical_1, vertical_2, vertical_3, active, created_at, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?11)
         ON CONFLICT(name) DO UPDATE SET
            company_name = excluded.company_name,
            company_site = excluded.company_site,
            product_id = excluded.product_id,
            product_name = excluded.product_name,
            product_category = excluded.product_category,
            vertical_1 = excluded.vertical_1,
            vertical_2 = excluded.vertical_2,
            vertical_3 = excluded.vertical_3,
            active = excluded.active,
            updated_at = excluded.updated_at",
    )?;
    for c in &snapshot.campaigns {
        stmt.execute(params![
            c.name,
            c.company_name,
            c.company_site,
            c.product_id,
            c.product_name,
            c.product_category,
            c.vertical_1,
            c.vertical_2,
            c.vertical_3,
            c.active,
            now(),
        ])
        .map_err(|e| ResearchError::commit("campaigns", format!("{}: {}", c.name, e)))?;
    }
    Ok(snapshot.campaigns.len())
}

/// Existing users are left untouched.
fn insert_new_users(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO users (email, password_hint, role_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut inserted = 0;
    for u in &snapshot.users {
        inserted += stmt.execute(params![u.email, u.password_hint, u.role_id, now()])?;
    }
    Ok(inserted)
}

fn insert_campaign_users(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO campaign_users (user_email, campaign_name, user_queue_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    let mut inserted = 0;
    for m in &snapshot.campaign_users {
        inserted += stmt.execute(params![m.user_email, m.campaign_name, m.user_queue_id, now()])?;
    }
    Ok(inserted)
}

fn insert_sell_side_scripts(
    conn: &Connection,
    snapshot: &StagingSnapshot,
    chunk_size: usize,
    deadline: &Deadline,
) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT OR IGNORE INTO sell_side_scripts
         (category, topic_id, product_id,
          industry_1, industry_2, industry_3, industry_4, industry_5,
          function_1, function_2, function_3, function_4, function_5, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    let mut inserted = 0;
    for chunk in snapshot.sell_side_scripts.chunks(chunk_size) {
        deadline.check("seller-side scripts")?;
        for s in chunk {
            let i = |n: usize| s.industries.get(n);
            let f = |n: usize| s.functions.get(n);
            inserted += stmt.execute(params![
                s.category.as_str(),
                s.topic_id,
                s.product_id,
                i(0),
                i(1),
                i(2),
                i(3),
                i(4),
                f(0),
                f(1),
                f(2),
                f(3),
                f(4),
                now(),
            ])?;
        }
    }
    Ok(inserted)
}

fn upsert_topics(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO topics (topic_identifier, title, category, detail, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(topic_identifier) DO UPDATE SET
            title = excluded.title,
            category = excluded.category,
            detail = excluded.detail,
            updated_at = excluded.updated_at",
    )?;
    for t in &snapshot.topics {
        stmt.execute(params![t.topic_identifier, t.title, t.category, t.detail, now()])
            .map_err(|e| {
                ResearchError::commit("topics", format!("{}: {}", t.topic_identifier, e))
            })?;
    }
    Ok(snapshot.topics.len())
}

fn upsert_prospects(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO prospects
         (buyer_identifier, campaign_name, s_no, f_name, l_name, company, title, industry,
          function, website, linkedin, location, email, phone, case_study_id, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)
         ON CONFLICT(buyer_identifier) DO UPDATE SET
            campaign_name = excluded.campaign_name,
            s_no = excluded.s_no,
            f_name = excluded.f_name,
            l_name = excluded.l_name,
            company = excluded.company,
            title = excluded.title,
            industry = excluded.industry,
            function = excluded.function,
            website = excluded.website,
            linkedin = excluded.linkedin,
            location = excluded.location,
            email = excluded.email,
            phone = excluded.phone,
            case_study_id = excluded.case_study_id,
            updated_at = excluded.updated_at",
    )?;
    for p in &snapshot.prospects {
        stmt.execute(params![
            p.buyer_identifier,
            p.campaign_name,
            p.s_no,
            p.f_name,
            p.l_name,
            p.company,
            p.title,
            p.industry,
            p.function,
            p.website,
            p.linkedin,
            p.location,
            p.email,
            p.phone,
            p.case_study_id,
            now(),
        ])
        .map_err(|e| ResearchError::commit("prospects", format!("{}: {}", p.buyer_identifier, e)))?;
    }
    Ok(snapshot.prospects.len())
}

fn upsert_research_answers(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO research_answers (buyer_id, product_id, topic_id, description, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5)
         ON CONFLICT(buyer_id, topic_id) DO UPDATE SET
            product_id = excluded.product_id,
            description = excluded.description,
            updated_at = excluded.updated_at",
    )?;
    for a in &snapshot.research_answers {
        stmt.execute(params![a.buyer_id, a.product_id, a.topic_id, a.description, now()])
            .map_err(|e| {
                ResearchError::commit(
                    "research answers",
                    format!("buyer {} topic {}: {}", a.buyer_id, a.topic_id, e),
                )
            })?;
    }
    Ok(snapshot.research_answers.len())
}

fn upsert_email_drafts(conn: &Connection, snapshot: &StagingSnapshot) -> Result<usize> {
    let mut stmt = conn.prepare(
        "INSERT INTO email_drafts
         (buyer_identifier, email_pas, email_aida, email_fab, linkedin_1, linkedin_2, updated_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
         ON CONFLICT(buyer_identifier) DO UPDATE SET
            email_pas = excluded.email_pas,
            email_aida = excluded.email_aida,
            email_fab = excluded.email_fab,
            linkedin_1 = excluded.linkedin_1,
            linkedin_2 = excluded.linkedin_2,
            updated_at = excluded.updated_at",
    )?;
    for d in &snapshot.email_drafts {
        stmt.execute(params![
            d.buyer_identifier,
            d.email_pas,
            d.email_aida,
            d.email_fab,
            d.linkedin_1,
            d.linkedin_2,
            now(),
        ])
        .map_err(|e| {
            ResearchError::commit("email drafts", format!("{}: {}", d.buyer_identifier, e))
        })?;
    }
    Ok(snapshot.email_drafts.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::staging::{ResearchBatch, SetupBatch, StagingStore};
    use crate::storage::{Database, PermanentRecords};
    use crate::types::{
        Campaign, EmailDraftSet, Prospect, ResearchAnswer, ResponseStatus, RunId, ScriptCategory,
        SellSideScript, Topic, User,
    };
    use std::sync::Arc;

    struct Fixture {
        db: SharedDatabase,
        staging: StagingStore,
        committer: StagingCommitter,
        records: PermanentRecords,
    }

    fn fixture() -> Fixture {
        fixture_with(StorageConfig::default())
    }

    fn fixture_with(config: StorageConfig) -> Fixture {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let db = Arc::new(db);
        Fixture {
            staging: StagingStore::new(db.clone()),
            committer: StagingCommitter::new(db.clone(), &config),
            records: PermanentRecords::new(db.clone()),
            db,
        }
    }

    fn prospect(n: usize, company: &str) -> Prospect {
        Prospect {
            buyer_identifier: format!("Q3{}Buyer{}", n, n),
            campaign_name: "Q3".to_string(),
            s_no: n.to_string(),
            f_name: format!("Buyer{}", n),
            l_name: String::new(),
            company: company.to_string(),
            title: "CTO".to_string(),
            industry: "Retail".to_string(),
            function: "IT".to_string(),
            website: String::new(),
            linkedin: String::new(),
            location: String::new(),
            email: String::new(),
            phone: String::new(),
            case_study_id: None,
        }
    }

    fn topics(n: usize) -> Vec<Topic> {
        (1..=n)
            .map(|i| Topic::new("Q3", &format!("topic_{}", i), "buy", "detail"))
            .collect()
    }

    fn setup(campaign: &str) -> SetupBatch {
        SetupBatch {
            campaign: Some(Campaign {
                name: campaign.to_string(),
                company_name: "Nimbus".to_string(),
                company_site: String::new(),
                product_id: Some(1),
                product_name: "Agents".to_string(),
                product_category: "AI".to_string(),
                vertical_1: None,
                vertical_2: None,
                vertical_3: None,
                active: true,
            }),
            users: vec![User {
                email: "rep@nimbus.example".to_string(),
                password_hint: None,
                role_id: Some(2),
            }],
            campaign_users: Vec::new(),
            topics: topics(10),
        }
    }

    fn answers(buyer: &str, n: usize) -> Vec<ResearchAnswer> {
        (1..=n)
            .map(|i| ResearchAnswer {
                buyer_id: buyer.to_string(),
                product_id: Some(1),
                topic_id: Topic::identifier("Q3", &format!("topic_{}", i)),
                description: format!("answer {}", i),
            })
            .collect()
    }

    fn stage_research(f: &Fixture, batch: ResearchBatch) {
        f.staging
            .stage_research(&RunId::generate(), "Q3", &batch, 0)
            .unwrap();
    }

    #[test]
    fn test_nothing_to_commit() {
        let f = fixture();
        let response = f.committer.commit();
        assert_eq!(response.status, ResponseStatus::NothingToCommit);
        assert_eq!(response.message, "No data to commit in temp tables.");
    }

    #[test]
    fn test_commit_transfers_and_clears_staging() {
        let f = fixture();
        f.staging.stage_setup(&setup("Q3")).unwrap();
        f.staging
            .stage_sell_side(&[SellSideScript {
                category: ScriptCategory::SelfIntro,
                topic_id: "Q3_self_introduction".to_string(),
                product_id: Some(1),
                industries: vec!["Hi, I run Nimbus".to_string()],
                functions: Vec::new(),
            }])
            .unwrap();
        let buyer = prospect(1, "Acme");
        stage_research(
            &f,
            ResearchBatch {
                research_answers: answers(&buyer.buyer_identifier, 3),
                email_drafts: vec![EmailDraftSet::empty(&buyer.buyer_identifier)],
                prospects: vec![buyer.clone()],
            },
        );

        let response = f.committer.commit();
        assert!(response.is_ok(), "{}", response.message);
        let results = response.data.unwrap();
        assert_eq!(results.campaigns, 1);
        assert_eq!(results.users, 1);
        assert_eq!(results.sell_side_scripts, 1);
        assert_eq!(results.topics, 10);
        assert_eq!(results.prospects, 1);
        assert_eq!(results.research_answers, 3);
        assert_eq!(results.email_drafts, 1);

        assert!(f.staging.snapshot().unwrap().is_empty());
        assert_eq!(
            f.records.research_answers_for(&buyer.buyer_identifier).unwrap().len(),
            3
        );
    }

    #[test]
    fn test_prospect_upsert_overwrites() {
        let f = fixture();

        stage_research(
            &f,
            ResearchBatch {
                prospects: vec![prospect(1, "Acme")],
                ..Default::default()
            },
        );
        assert!(f.committer.commit().is_ok());

        stage_research(
            &f,
            ResearchBatch {
                prospects: vec![prospect(1, "Acme Holdings")],
                ..Default::default()
            },
        );
        assert!(f.committer.commit().is_ok());

        assert_eq!(f.db.count_rows("prospects").unwrap(), 1);
        let stored = f.records.prospect("Q31Buyer1").unwrap().unwrap();
        assert_eq!(stored.company, "Acme Holdings");
    }

    #[test]
    fn test_existing_users_untouched() {
        let f = fixture();
        f.staging.stage_setup(&setup("Q3")).unwrap();
        assert!(f.committer.commit().is_ok());

        let mut again = setup("Q3");
        again.users[0].role_id = Some(9);
        f.staging.stage_setup(&again).unwrap();
        let results = f.committer.commit().data.unwrap();
        assert_eq!(results.users, 0);

        let conn = f.db.connection().unwrap();
        let role: i64 = conn
            .query_row("SELECT role_id FROM users WHERE email = 'rep@nimbus.example'", [], |r| {
                r.get(0)
            })
            .unwrap();
        assert_eq!(role, 2);
    }

    #[test]
    fn test_commit_is_all_or_nothing() {
        let f = fixture();
        f.staging.stage_setup(&setup("Q3")).unwrap();

        let buyer = prospect(1, "Acme");
        let mut staged = answers(&buyer.buyer_identifier, 10);
        // No such prospect: violates the foreign key on the 5th answer
        staged[4].buyer_id = "ghost".to_string();
        stage_research(
            &f,
            ResearchBatch {
                prospects: vec![buyer],
                research_answers: staged,
                email_drafts: Vec::new(),
            },
        );

        let response = f.committer.commit();
        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.message.contains("research answers"));

        for table in ["campaigns", "users", "topics", "prospects", "research_answers"] {
            assert_eq!(f.db.count_rows(table).unwrap(), 0, "{} not rolled back", table);
        }
        // Staging kept for a retry
        assert_eq!(f.staging.snapshot().unwrap().research_answers.len(), 10);
    }

    #[test]
    fn test_commit_timeout_leaves_staging() {
        let f = fixture_with(StorageConfig {
            commit_timeout_secs: 0,
            ..Default::default()
        });
        f.staging.stage_setup(&setup("Q3")).unwrap();

        let response = f.committer.commit();
        assert_eq!(response.status, ResponseStatus::Failed);
        assert!(response.message.contains("campaigns"), "{}", response.message);

        assert_eq!(f.db.count_rows("campaigns").unwrap(), 0);
        assert_eq!(f.db.count_rows("users").unwrap(), 0);
        let staged = f.staging.snapshot().unwrap();
        assert_eq!(staged.campaigns.len(), 1);
        assert!(!staged.topics.is_empty());
    }
}
