//! Campaign Workbook & Setup
//!
//! A campaign arrives as a workbook of flat key-value rows: settings,
//! buy-side and sell-side questions, prospects, case studies, personas and
//! campaign users. Spreadsheet parsing happens upstream; this module loads
//! the rows from JSON or YAML and stages the campaign-level records.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};

use crate::storage::{SetupBatch, StagingStore};
use crate::types::{
    Campaign, CampaignDetails, CampaignUser, Prospect, ResearchError, Result, Row, ServiceResponse,
    Topic, User, first_value, row_string,
};

/// All sheets of one campaign workbook
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceWorkbook {
    pub settings: Vec<Row>,
    #[serde(alias = "buyside-questions")]
    pub buyside_questions: Vec<Row>,
    #[serde(alias = "sellside-questions")]
    pub sellside_questions: Vec<Row>,
    pub prospects: Vec<Row>,
    #[serde(alias = "case-studies")]
    pub case_studies: Vec<Row>,
    pub personas: Vec<Row>,
    pub camp_users: Vec<Row>,
}

impl SourceWorkbook {
    /// Load a workbook, picking the format from the file extension.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            ResearchError::Input(format!("Cannot read workbook {}: {}", path.display(), e))
        })?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("json") => Ok(serde_json::from_str(&content)?),
            Some("yaml" | "yml") => Ok(serde_yaml::from_str(&content)?),
            _ => Err(ResearchError::Input(format!(
                "Unsupported workbook format: {} (expected .json, .yaml or .yml)",
                path.display()
            ))),
        }
    }

    pub fn details(&self) -> CampaignDetails {
        CampaignDetails::from_settings(&self.settings)
    }

    pub fn buyside_topics(&self, campaign_name: &str) -> Vec<Topic> {
        self.buyside_questions
            .iter()
            .map(|row| Topic::from_row(row, campaign_name))
            .collect()
    }

    pub fn sellside_topics(&self, campaign_name: &str) -> Vec<Topic> {
        self.sellside_questions
            .iter()
            .map(|row| Topic::from_row(row, campaign_name))
            .collect()
    }

    pub fn prospects(&self, campaign_name: &str) -> Vec<Prospect> {
        self.prospects
            .iter()
            .map(|row| Prospect::from_row(row, campaign_name))
            .collect()
    }

    /// Case study text for a `study-no`, matched as text
    pub fn case_study(&self, study_no: &str) -> Option<String> {
        self.case_studies
            .iter()
            .find(|row| row_string(row, "study-no") == study_no)
            .map(|row| row_string(row, "value"))
            .filter(|text| !text.is_empty())
    }

    /// First non-empty value of every persona row
    pub fn persona_names(&self) -> Vec<String> {
        self.personas.iter().filter_map(first_value).collect()
    }
}

/// What campaign setup staged
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SetupSummary {
    pub campaign: String,
    pub users: usize,
    pub campaign_users: usize,
    pub topics: usize,
}

/// Stages the campaign, its users and its topics.
pub struct CampaignSetup {
    staging: StagingStore,
}

impl CampaignSetup {
    pub fn new(staging: StagingStore) -> Self {
        Self { staging }
    }

    #[instrument(skip_all)]
    pub fn stage(&self, workbook: &SourceWorkbook) -> ServiceResponse<SetupSummary> {
        let details = workbook.details();
        if details.campaign_name.is_empty() {
            return ServiceResponse::failed("Campaign name missing from settings");
        }

        let batch = Self::batch(workbook, &details);
        let summary = SetupSummary {
            campaign: details.campaign_name.clone(),
            users: batch.users.len(),
            campaign_users: batch.campaign_users.len(),
            topics: batch.topics.len(),
        };

        if let Err(e) = self.staging.stage_setup(&batch) {
            warn!(error = %e, "Failed to stage campaign setup");
            return ServiceResponse::failed(format!("Failed to stage campaign setup: {}", e));
        }

        info!(
            campaign = %summary.campaign,
            users = summary.users,
            topics = summary.topics,
            "Campaign setup staged"
        );
        ServiceResponse::ok("Successfully staged campaign setup", summary)
    }

    fn batch(workbook: &SourceWorkbook, details: &CampaignDetails) -> SetupBatch {
        let name = &details.campaign_name;

        let mut topics = workbook.buyside_topics(name);
        topics.extend(workbook.sellside_topics(name));

        SetupBatch {
            campaign: Some(Campaign::from(details)),
            users: workbook.camp_users.iter().filter_map(User::from_row).collect(),
            campaign_users: workbook
                .camp_users
                .iter()
                .filter_map(|row| CampaignUser::from_row(row, name))
                .collect(),
            topics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Database;
    use crate::types::ResponseStatus;
    use std::io::Write;
    use std::sync::Arc;

    const WORKBOOK_YAML: &str = r#"
settings:
  - { setting: campaign_name, value: Q3 }
  - { setting: company, value: Nimbus }
  - { setting: product_id, value: 7 }
  - { setting: industry_1, value: Retail }
buyside-questions:
  - { title: hobbies, category: personal, detail: "What does {f_name} enjoy?" }
sellside-questions:
  - { id: 1, title: intro, category: self_introduction, detail: "Introduce {company_name}" }
prospects:
  - { id: 1, f_name: Ada, l_name: King, company: Acme, casestudy_no: 2 }
case-studies:
  - { study-no: 2, value: "Helped Beta cut costs." }
personas:
  - { name: "Finance leader" }
camp_users:
  - { user_email: rep@nimbus.example, role_id: 2, user_queueID: q1 }
  - { password_hint: orphan }
"#;

    fn write_workbook(ext: &str, content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(ext).tempfile().unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_yaml_workbook() {
        let file = write_workbook(".yaml", WORKBOOK_YAML);
        let workbook = SourceWorkbook::load(file.path()).unwrap();

        assert_eq!(workbook.details().campaign_name, "Q3");
        assert_eq!(workbook.buyside_topics("Q3")[0].topic_identifier, "Q3_hobbies");
        assert_eq!(workbook.prospects("Q3")[0].buyer_identifier, "Q31AdaKing");
        assert_eq!(workbook.case_study("2").as_deref(), Some("Helped Beta cut costs."));
        assert_eq!(workbook.case_study("9"), None);
        assert_eq!(workbook.persona_names(), vec!["Finance leader"]);
    }

    #[test]
    fn test_load_json_workbook() {
        let file = write_workbook(
            ".json",
            r#"{"settings": [{"setting": "campaign_name", "value": "Q4"}], "prospects": []}"#,
        );
        let workbook = SourceWorkbook::load(file.path()).unwrap();
        assert_eq!(workbook.details().campaign_name, "Q4");
        assert!(workbook.prospects.is_empty());
    }

    #[test]
    fn test_unsupported_or_missing_workbook() {
        let file = write_workbook(".csv", "a,b");
        assert!(matches!(
            SourceWorkbook::load(file.path()),
            Err(ResearchError::Input(_))
        ));
        assert!(matches!(
            SourceWorkbook::load(Path::new("/nonexistent/workbook.json")),
            Err(ResearchError::Input(_))
        ));
    }

    #[test]
    fn test_setup_stages_campaign_records() {
        let file = write_workbook(".yml", WORKBOOK_YAML);
        let workbook = SourceWorkbook::load(file.path()).unwrap();

        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let staging = StagingStore::new(Arc::new(db));
        let setup = CampaignSetup::new(staging);

        let response = setup.stage(&workbook);
        assert!(response.is_ok(), "{}", response.message);
        let summary = response.data.unwrap();
        assert_eq!(summary.users, 1);
        assert_eq!(summary.campaign_users, 1);
        assert_eq!(summary.topics, 2);

        // Restaging replaces rather than appends
        assert!(setup.stage(&workbook).is_ok());
        let snapshot = setup.staging.snapshot().unwrap();
        assert_eq!(snapshot.campaigns.len(), 1);
        assert_eq!(snapshot.topics.len(), 2);
        assert_eq!(snapshot.campaigns[0].product_id, Some(7));
    }

    #[test]
    fn test_setup_requires_campaign_name() {
        let db = Database::open_in_memory().unwrap();
        db.initialize().unwrap();
        let setup = CampaignSetup::new(StagingStore::new(Arc::new(db)));

        let response = setup.stage(&SourceWorkbook::default());
        assert_eq!(response.status, ResponseStatus::Failed);
    }
}
