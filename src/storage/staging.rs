//! Staging tables
//!
//! Staging holds the output of one in-flight run until it is committed.
//! Writers clear the tables they own before restaging; the commit protocol
//! reads a [`StagingSnapshot`] and clears everything once the transfer
//! succeeds.

use rusqlite::{Connection, Row, params};
use serde::Serialize;

use super::database::SharedDatabase;
use crate::types::{
    Campaign, CampaignUser, EmailDraftSet, Prospect, ResearchAnswer, Result, ResultExt, RunId,
    ScriptCategory, SellSideScript, Topic, User,
};

/// Every staging table, in commit order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StagingTable {
    Campaigns,
    Users,
    CampaignUsers,
    SellSideScripts,
    Topics,
    Prospects,
    ResearchAnswers,
    EmailDrafts,
}

impl StagingTable {
    pub const ALL: [StagingTable; 8] = [
        Self::Campaigns,
        Self::Users,
        Self::CampaignUsers,
        Self::SellSideScripts,
        Self::Topics,
        Self::Prospects,
        Self::ResearchAnswers,
        Self::EmailDrafts,
    ];

    /// Tables owned by a research run and reset before it starts
    pub const RESEARCH: [StagingTable; 3] =
        [Self::ResearchAnswers, Self::EmailDrafts, Self::Prospects];

    /// Tables owned by campaign setup
    pub const SETUP: [StagingTable; 4] =
        [Self::Campaigns, Self::Users, Self::CampaignUsers, Self::Topics];

    pub fn staging_name(&self) -> &'static str {
        match self {
            Self::Campaigns => "campaigns_staging",
            Self::Users => "users_staging",
            Self::CampaignUsers => "campaign_users_staging",
            Self::SellSideScripts => "sell_side_scripts_staging",
            Self::Topics => "topics_staging",
            Self::Prospects => "prospects_staging",
            Self::ResearchAnswers => "research_answers_staging",
            Self::EmailDrafts => "email_drafts_staging",
        }
    }

    pub fn permanent_name(&self) -> &'static str {
        match self {
            Self::Campaigns => "campaigns",
            Self::Users => "users",
            Self::CampaignUsers => "campaign_users",
            Self::SellSideScripts => "sell_side_scripts",
            Self::Topics => "topics",
            Self::Prospects => "prospects",
            Self::ResearchAnswers => "research_answers",
            Self::EmailDrafts => "email_drafts",
        }
    }
}

/// Full contents of staging, read once at the start of a commit.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StagingSnapshot {
    pub campaigns: Vec<Campaign>,
    pub users: Vec<User>,
    pub campaign_users: Vec<CampaignUser>,
    pub sell_side_scripts: Vec<SellSideScript>,
    pub topics: Vec<Topic>,
    pub prospects: Vec<Prospect>,
    pub research_answers: Vec<ResearchAnswer>,
    pub email_drafts: Vec<EmailDraftSet>,
}

impl StagingSnapshot {
    pub fn is_empty(&self) -> bool {
        self.campaigns.is_empty()
            && self.users.is_empty()
            && self.campaign_users.is_empty()
            && self.sell_side_scripts.is_empty()
            && self.topics.is_empty()
            && self.prospects.is_empty()
            && self.research_answers.is_empty()
            && self.email_drafts.is_empty()
    }

    pub fn counts(&self) -> Vec<(StagingTable, usize)> {
        vec![
            (StagingTable::Campaigns, self.campaigns.len()),
            (StagingTable::Users, self.users.len()),
            (StagingTable::CampaignUsers, self.campaign_users.len()),
            (StagingTable::SellSideScripts, self.sell_side_scripts.len()),
            (StagingTable::Topics, self.topics.len()),
            (StagingTable::Prospects, self.prospects.len()),
            (StagingTable::ResearchAnswers, self.research_answers.len()),
            (StagingTable::EmailDrafts, self.email_drafts.len()),
        ]
    }
}

/// Output of one research run, staged atomically
#[derive(Debug, Clone, Default)]
pub struct ResearchBatch {
    pub prospects: Vec<Prospect>,
    pub research_answers: Vec<ResearchAnswer>,
    pub email_drafts: Vec<EmailDraftSet>,
}

/// Output of campaign setup, staged atomically
#[derive(Debug, Clone, Default)]
pub struct SetupBatch {
    pub campaign: Option<Campaign>,
    pub users: Vec<User>,
    pub campaign_users: Vec<CampaignUser>,
    pub topics: Vec<Topic>,
}

pub struct StagingStore {
    db: SharedDatabase,
}

impl StagingStore {
    pub fn new(db: SharedDatabase) -> Self {
        Self { db }
    }

    // =========================================================================
    // Reset
    // =========================================================================

    /// Delete every row from the given staging tables in one transaction.
    pub fn clear(&self, tables: &[StagingTable]) -> Result<()> {
        self.db.transaction(|conn| delete_all(conn, tables))
    }

    pub fn clear_all(&self) -> Result<()> {
        self.clear(&StagingTable::ALL)
    }

    // =========================================================================
    // Writes
    // =========================================================================

    /// Stage a research run and record it in `staging_runs`.
    pub fn stage_research(
        &self,
        run_id: &RunId,
        campaign_name: &str,
        batch: &ResearchBatch,
        elapsed_ms: u64,
    ) -> Result<()> {
        self.db.transaction(|conn| {
            insert_prospects(conn, &batch.prospects)?;
            insert_research_answers(conn, &batch.research_answers)?;
            insert_email_drafts(conn, &batch.email_drafts)?;
            conn.execute(
                "INSERT INTO staging_runs
                 (run_id, campaign_name, prospects, research_answers, email_drafts, elapsed_ms, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    run_id.as_str(),
                    campaign_name,
                    batch.prospects.len() as i64,
                    batch.research_answers.len() as i64,
                    batch.email_drafts.len() as i64,
                    elapsed_ms as i64,
                    now(),
                ],
            )
            .with_context("Failed to record staging run")?;
            Ok(())
        })
    }

    /// Replace staged campaign, users, campaign users and topics.
    pub fn stage_setup(&self, batch: &SetupBatch) -> Result<()> {
        self.db.transaction(|conn| {
            delete_all(conn, &StagingTable::SETUP)?;
            if let Some(campaign) = &batch.campaign {
                insert_campaign(conn, campaign)?;
            }
            insert_users(conn, &batch.users)?;
            insert_campaign_users(conn, &batch.campaign_users)?;
            insert_topics(conn, &batch.topics)?;
            Ok(())
        })
    }

    /// Replace staged seller-side scripts.
    pub fn stage_sell_side(&self, scripts: &[SellSideScript]) -> Result<()> {
        self.db.transaction(|conn| {
            delete_all(conn, &[StagingTable::SellSideScripts])?;
            insert_sell_side_scripts(conn, scripts)
        })
    }

    // =========================================================================
    // Reads
    // =========================================================================

    pub fn snapshot(&self) -> Result<StagingSnapshot> {
        let conn = self.db.connection()?;
        read_snapshot(&conn)
    }

    pub fn topics(&self) -> Result<Vec<Topic>> {
        let conn = self.db.connection()?;
        find_all(&conn, TOPIC_SELECT, "topics_staging", topic_from_row)
    }

    pub fn research_answers(&self) -> Result<Vec<ResearchAnswer>> {
        let conn = self.db.connection()?;
        find_all(
            &conn,
            RESEARCH_ANSWER_SELECT,
            "research_answers_staging",
            research_answer_from_row,
        )
    }

    pub fn email_drafts(&self) -> Result<Vec<EmailDraftSet>> {
        let conn = self.db.connection()?;
        find_all(&conn, EMAIL_DRAFT_SELECT, "email_drafts_staging", email_draft_from_row)
    }

    pub fn prospects(&self) -> Result<Vec<Prospect>> {
        let conn = self.db.connection()?;
        find_all(&conn, PROSPECT_SELECT, "prospects_staging", prospect_from_row)
    }

    /// Number of recorded research runs
    pub fn run_count(&self) -> Result<usize> {
        self.db.count_rows("staging_runs")
    }
}

// =============================================================================
// Table Helpers
// =============================================================================

pub(crate) fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

pub(crate) fn delete_all(conn: &Connection, tables: &[StagingTable]) -> Result<()> {
    for table in tables {
        conn.execute(&format!("DELETE FROM {}", table.staging_name()), [])
            .with_context_fn(|| format!("Failed to clear {}", table.staging_name()))?;
    }
    Ok(())
}

pub(crate) fn read_snapshot(conn: &Connection) -> Result<StagingSnapshot> {
    Ok(StagingSnapshot {
        campaigns: find_all(conn, CAMPAIGN_SELECT, "campaigns_staging", campaign_from_row)?,
        users: find_all(conn, USER_SELECT, "users_staging", user_from_row)?,
        campaign_users: find_all(
            conn,
            CAMPAIGN_USER_SELECT,
            "campaign_users_staging",
            campaign_user_from_row,
        )?,
        sell_side_scripts: find_all(
            conn,
            SELL_SIDE_SELECT,
            "sell_side_scripts_staging",
            sell_side_from_row,
        )?,
        topics: find_all(conn, TOPIC_SELECT, "topics_staging", topic_from_row)?,
        prospects: find_all(conn, PROSPECT_SELECT, "prospects_staging", prospect_from_row)?,
        research_answers: find_all(
            conn,
            RESEARCH_ANSWER_SELECT,
            "research_answers_staging",
            research_answer_from_row,
        )?,
        email_drafts: find_all(
            conn,
            EMAIL_DRAFT_SELECT,
            "email_drafts_staging",
            email_draft_from_row,
        )?,
    })
}

/// `SELECT {columns} FROM {table} ORDER BY id`
pub(crate) fn find_all<T>(
    conn: &Connection,
    columns: &str,
    table: &str,
    map: fn(&Row<'_>) -> rusqlite::Result<T>,
) -> Result<Vec<T>> {
    let sql = format!("SELECT {} FROM {} ORDER BY id", columns, table);
    let mut stmt = conn
        .prepare(&sql)
        .with_context_fn(|| format!("Failed to read {}", table))?;
    let rows = stmt
        .query_map([], map)
        .with_context_fn(|| format!("Failed to read {}", table))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .with_context_fn(|| format!("Failed to decode {}", table))?;
    Ok(rows)
}

// =============================================================================
// Inserts
// =============================================================================

fn insert_campaign(conn: &Connection, c: &Campaign) -> Result<()> {
    conn.execute(
        "INSERT INTO campaigns_staging
         (name, company_name, company_site, product_id, product_name, product_category,
          vertical_1, vertical_2, vertical_3, active, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
        params![
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
        ],
    )
    .with_context("Failed to stage campaign")?;
    Ok(())
}

fn insert_users(conn: &Connection, users: &[User]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO users_staging (email, password_hint, role_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for user in users {
        stmt.execute(params![user.email, user.password_hint, user.role_id, now()])
            .with_context("Failed to stage user")?;
    }
    Ok(())
}

fn insert_campaign_users(conn: &Connection, members: &[CampaignUser]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO campaign_users_staging (user_email, campaign_name, user_queue_id, created_at)
         VALUES (?1, ?2, ?3, ?4)",
    )?;
    for m in members {
        stmt.execute(params![m.user_email, m.campaign_name, m.user_queue_id, now()])
            .with_context("Failed to stage campaign user")?;
    }
    Ok(())
}

fn insert_topics(conn: &Connection, topics: &[Topic]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO topics_staging (topic_identifier, title, category, detail, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for t in topics {
        stmt.execute(params![t.topic_identifier, t.title, t.category, t.detail, now()])
            .with_context("Failed to stage topic")?;
    }
    Ok(())
}

pub(crate) fn insert_prospects(conn: &Connection, prospects: &[Prospect]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO prospects_staging
         (buyer_identifier, campaign_name, s_no, f_name, l_name, company, title, industry,
          function, website, linkedin, location, email, phone, case_study_id, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
    )?;
    for p in prospects {
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
        .with_context_fn(|| format!("Failed to stage prospect {}", p.buyer_identifier))?;
    }
    Ok(())
}

pub(crate) fn insert_research_answers(conn: &Connection, answers: &[ResearchAnswer]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO research_answers_staging (buyer_id, product_id, topic_id, description, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5)",
    )?;
    for a in answers {
        stmt.execute(params![a.buyer_id, a.product_id, a.topic_id, a.description, now()])
            .with_context("Failed to stage research answer")?;
    }
    Ok(())
}

fn insert_email_drafts(conn: &Connection, drafts: &[EmailDraftSet]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO email_drafts_staging
         (buyer_identifier, email_pas, email_aida, email_fab, linkedin_1, linkedin_2, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
    )?;
    for d in drafts {
        stmt.execute(params![
            d.buyer_identifier,
            d.email_pas,
            d.email_aida,
            d.email_fab,
            d.linkedin_1,
            d.linkedin_2,
            now(),
        ])
        .with_context("Failed to stage email drafts")?;
    }
    Ok(())
}

fn insert_sell_side_scripts(conn: &Connection, scripts: &[SellSideScript]) -> Result<()> {
    let mut stmt = conn.prepare(
        "INSERT INTO sell_side_scripts_staging
         (category, topic_id, product_id,
          industry_1, industry_2, industry_3, industry_4, industry_5,
          function_1, function_2, function_3, function_4, function_5, created_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
    )?;
    for s in scripts {
        let i = |n: usize| s.industries.get(n);
        let f = |n: usize| s.functions.get(n);
        stmt.execute(params![
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
        ])
        .with_context("Failed to stage seller-side script")?;
    }
    Ok(())
}

// =============================================================================
// Row Mapping (shared with permanent tables; column names match)
// =============================================================================

pub(crate) const CAMPAIGN_SELECT: &str = "name, company_name, company_site, product_id, \
    product_name, product_category, vertical_1, vertical_2, vertical_3, active";
pub(crate) const USER_SELECT: &str = "email, password_hint, role_id";
pub(crate) const CAMPAIGN_USER_SELECT: &str = "user_email, campaign_name, user_queue_id";
pub(crate) const TOPIC_SELECT: &str = "title, category, detail, topic_identifier";
pub(crate) const PROSPECT_SELECT: &str = "buyer_identifier, campaign_name, s_no, f_name, \
    l_name, company, title, industry, function, website, linkedin, location, email, phone, \
    case_study_id";
pub(crate) const RESEARCH_ANSWER_SELECT: &str = "buyer_id, product_id, topic_id, description";
pub(crate) const EMAIL_DRAFT_SELECT: &str =
    "buyer_identifier, email_pas, email_aida, email_fab, linkedin_1, linkedin_2";
pub(crate) const SELL_SIDE_SELECT: &str = "category, topic_id, product_id, \
    industry_1, industry_2, industry_3, industry_4, industry_5, \
    function_1, function_2, function_3, function_4, function_5";

pub(crate) fn campaign_from_row(row: &Row<'_>) -> rusqlite::Result<Campaign> {
    Ok(Campaign {
        name: row.get(0)?,
        company_name: row.get(1)?,
        company_site: row.get(2)?,
        product_id: row.get(3)?,
        product_name: row.get(4)?,
        product_category: row.get(5)?,
        vertical_1: row.get(6)?,
        vertical_2: row.get(7)?,
        vertical_3: row.get(8)?,
        active: row.get(9)?,
    })
}

pub(crate) fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        email: row.get(0)?,
        password_hint: row.get(1)?,
        role_id: row.get(2)?,
    })
}

pub(crate) fn campaign_user_from_row(row: &Row<'_>) -> rusqlite::Result<CampaignUser> {
    Ok(CampaignUser {
        user_email: row.get(0)?,
        campaign_name: row.get(1)?,
        user_queue_id: row.get(2)?,
    })
}

pub(crate) fn topic_from_row(row: &Row<'_>) -> rusqlite::Result<Topic> {
    Ok(Topic {
        title: row.get(0)?,
        category: row.get(1)?,
        detail: row.get(2)?,
        topic_identifier: row.get(3)?,
    })
}

pub(crate) fn prospect_from_row(row: &Row<'_>) -> rusqlite::Result<Prospect> {
    Ok(Prospect {
        buyer_identifier: row.get(0)?,
        campaign_name: row.get(1)?,
        s_no: row.get(2)?,
        f_name: row.get(3)?,
        l_name: row.get(4)?,
        company: row.get(5)?,
        title: row.get(6)?,
        industry: row.get(7)?,
        function: row.get(8)?,
        website: row.get(9)?,
        linkedin: row.get(10)?,
        location: row.get(11)?,
        email: row.get(12)?,
        phone: row.get(13)?,
        case_study_id: row.get(14)?,
    })
}

pub(crate) fn research_answer_from_row(row: &Row<'_>) -> rusqlite::Result<ResearchAnswer> {
    Ok(ResearchAnswer {
        buyer_id: row.get(0)?,
        product_id: row.get(1)?,
        topic_id: row.get(2)?,
        description: row.get(3)?,
    })
}

pub(crate) fn email_draft_from_row(row: &Row<'_>) -> rusqlite::Result<EmailDraftSet> {
    Ok(EmailDraftSet {
        buyer_identifier: row.get(0)?,
        email_pas: row.get(1)?,
        email_aida: row.get(2)?,
        email_fab: row.get(3)?,
        linkedin_1: row.get(4)?,
        linkedin_2: row.get(5)?,
    })
}

pub(crate) fn sell_side_from_row(row: &Row<'_>) -> rusqlite::Result<SellSideScript> {
    let category: String = row.get(0)?;
    let category = ScriptCategory::parse(&category).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            0,
            rusqlite::types::Type::Text,
            format!("unknown script category {:?}", category).into(),
        )
    })?;

    let columns = |start: usize| -> rusqlite::Result<Vec<String>> {
        let mut values = Vec::new();
        for idx in start..start + 5 {
            if let Some(v) = row.get::<_, Option<String>>(idx)? {
                values.push(v);
            }
        }
        Ok(values)
    };

    Ok(SellSideScript {
        category,
        topic_id: row.get(1)?,
        product_id: row.get(2)?,
        industries: columns(3)?,
        functions: columns(8)?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use std::sync::Arc;

    fn store() -> StagingStore {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        StagingStore::new(Arc::new(db))
    }

    fn prospect(id: &str) -> Prospect {
        Prospect {
            buyer_identifier: format!("Q3{}Ada", id),
            campaign_name: "Q3".to_string(),
            s_no: id.to_string(),
            f_name: "Ada".to_string(),
            l_name: String::new(),
            company: "Acme".to_string(),
            title: "CTO".to_string(),
            industry: "Retail".to_string(),
            function: "Engineering".to_string(),
            website: String::new(),
            linkedin: String::new(),
            location: String::new(),
            email: String::new(),
            phone: String::new(),
            case_study_id: None,
        }
    }

    #[test]
    fn test_stage_research_and_read_back() {
        let store = store();
        let batch = ResearchBatch {
            prospects: vec![prospect("1")],
            research_answers: vec![ResearchAnswer {
                buyer_id: "Q31Ada".to_string(),
                product_id: Some(7),
                topic_id: "Q3_news".to_string(),
                description: "Acme opened a plant".to_string(),
            }],
            email_drafts: vec![EmailDraftSet::empty("Q31Ada")],
        };

        store
            .stage_research(&RunId::from("run-1"), "Q3", &batch, 12)
            .unwrap();

        let snapshot = store.snapshot().unwrap();
        assert_eq!(snapshot.prospects, batch.prospects);
        assert_eq!(snapshot.research_answers, batch.research_answers);
        assert_eq!(snapshot.email_drafts, batch.email_drafts);
        assert_eq!(store.run_count().unwrap(), 1);
    }

    #[test]
    fn test_clear_only_touches_named_tables() {
        let store = store();
        store
            .stage_setup(&SetupBatch {
                topics: vec![Topic::new("Q3", "news", "buy", "What is new at {buyer_company}?")],
                ..Default::default()
            })
            .unwrap();
        store
            .stage_research(
                &RunId::generate(),
                "Q3",
                &ResearchBatch {
                    prospects: vec![prospect("1")],
                    ..Default::default()
                },
                0,
            )
            .unwrap();

        store.clear(&StagingTable::RESEARCH).unwrap();
        let snapshot = store.snapshot().unwrap();
        assert!(snapshot.prospects.is_empty());
        assert_eq!(snapshot.topics.len(), 1);

        store.clear_all().unwrap();
        assert!(store.snapshot().unwrap().is_empty());
    }

    #[test]
    fn test_sell_side_columns_round_trip() {
        let store = store();
        let script = SellSideScript {
            category: ScriptCategory::ValueProp,
            topic_id: "Q3_valueprop_industry".to_string(),
            product_id: Some(3),
            industries: vec!["Retail pitch".to_string(), "Energy pitch".to_string()],
            functions: Vec::new(),
        };
        store.stage_sell_side(std::slice::from_ref(&script)).unwrap();
        assert_eq!(store.snapshot().unwrap().sell_side_scripts, vec![script]);
    }
}
